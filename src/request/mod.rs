//! Layered request configuration.
//!
//! A request is described by a stack of [`ConfigLayer`]s folded left to right
//! by [`merge`]. Static layers overlay field by field, with headers merged per
//! key. Transform layers receive everything accumulated so far and return a
//! full replacement.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use reqwest::Method;

pub const ACCEPT: &str = "Accept";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

static BUILTIN_DEFAULTS: Lazy<ConfigLayer> = Lazy::new(|| {
    ConfigLayer::Static(
        RequestConfig::new()
            .with_header(ACCEPT, APPLICATION_JSON)
            .with_header(CONTENT_TYPE, APPLICATION_JSON),
    )
});

/// The layer every client places underneath its own defaults.
pub fn builtin_defaults() -> &'static ConfigLayer {
    &BUILTIN_DEFAULTS
}

/// Credentials attached to the outgoing request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Basic {
        username: String,
        password: Option<String>,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// One layer's worth of request parameters.
///
/// Every scalar field is optional so that a layer only overrides what it
/// names. Header keys are compared case-sensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConfig {
    pub method: Option<Method>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub credentials: Option<Credentials>,
    pub query: Option<Vec<(String, String)>>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query = Some(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Overlay `other` on top of `self`.
    fn overlay(mut self, other: &RequestConfig) -> Self {
        self.headers.extend(
            other
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        if let Some(method) = other.method.as_ref() {
            self.method = Some(method.clone());
        }
        if let Some(body) = other.body.as_ref() {
            self.body = Some(body.clone());
        }
        if let Some(credentials) = other.credentials.as_ref() {
            self.credentials = Some(credentials.clone());
        }
        if let Some(query) = other.query.as_ref() {
            self.query = Some(query.clone());
        }
        self
    }
}

pub type ConfigTransform = Arc<dyn Fn(RequestConfig) -> RequestConfig + Send + Sync>;

/// A single entry in the merge stack.
#[derive(Clone)]
pub enum ConfigLayer {
    Static(RequestConfig),
    Transform(ConfigTransform),
}

impl ConfigLayer {
    pub fn transform<F>(f: F) -> Self
    where
        F: Fn(RequestConfig) -> RequestConfig + Send + Sync + 'static,
    {
        Self::Transform(Arc::new(f))
    }

    pub fn apply(&self, acc: RequestConfig) -> RequestConfig {
        match self {
            Self::Static(config) => acc.overlay(config),
            Self::Transform(f) => f(acc),
        }
    }
}

impl From<RequestConfig> for ConfigLayer {
    fn from(config: RequestConfig) -> Self {
        Self::Static(config)
    }
}

impl fmt::Debug for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(config) => f.debug_tuple("Static").field(config).finish(),
            Self::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

/// Fold `layers` in order into one effective configuration.
///
/// Absent layers are skipped; an empty stack yields [`RequestConfig::default`].
pub fn merge<'a, I>(layers: I) -> RequestConfig
where
    I: IntoIterator<Item = Option<&'a ConfigLayer>>,
{
    layers
        .into_iter()
        .flatten()
        .fold(RequestConfig::default(), |acc, layer| layer.apply(acc))
}
