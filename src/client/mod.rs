//! Request orchestration.
//!
//! [`FetchClient`] turns one logical request into: configuration merge, an
//! optional cache read, at most one network call, response classification,
//! and an optional cache write.

mod classify;
mod error;

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use reqwest::header::{CONTENT_LENGTH, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::cache::{Cache, CacheOptions, InMemoryCache, RequestIdentity};
use crate::config::{ClientSettings, DEFAULT_USER_AGENT};
use crate::request::{ConfigLayer, Credentials, RequestConfig, builtin_defaults, merge};

pub use error::FetchError;

pub const METRIC_REQUEST_MS: &str = "jsonfetch_request_ms";

/// JSON HTTP client with per-request opt-in caching.
///
/// Cloning is cheap and clones share the transport and the cache.
#[derive(Clone)]
pub struct FetchClient {
    http: Client,
    base: Option<Url>,
    defaults: Option<ConfigLayer>,
    cache: Arc<dyn Cache>,
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("base", &self.base.as_ref().map(Url::as_str))
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct FetchClientBuilder {
    base: Option<String>,
    user_agent: Option<String>,
    defaults: Option<ConfigLayer>,
    cache: Option<Arc<dyn Cache>>,
    http: Option<Client>,
}

impl FetchClientBuilder {
    /// Base URL that relative locators are joined onto.
    pub fn base_url(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Ignored when a prebuilt transport is supplied through [`Self::http_client`].
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Instance defaults, merged between the built-in defaults and each call's configuration.
    pub fn defaults(mut self, defaults: impl Into<ConfigLayer>) -> Self {
        self.defaults = Some(defaults.into());
        self
    }

    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn http_client(mut self, http: Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<FetchClient, FetchError> {
        let base = self.base.as_deref().map(Url::parse).transpose()?;
        let http = match self.http {
            Some(http) => http,
            None => {
                let user_agent = self
                    .user_agent
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
                Client::builder().user_agent(user_agent).build()?
            }
        };
        let cache = self.cache.unwrap_or_else(|| Arc::new(InMemoryCache::new()));

        Ok(FetchClient {
            http,
            base,
            defaults: self.defaults,
            cache,
        })
    }
}

impl FetchClient {
    pub fn builder() -> FetchClientBuilder {
        FetchClientBuilder::default()
    }

    /// Build a client from resolved settings, with an optional credential default.
    pub fn from_settings(
        settings: &ClientSettings,
        credentials: Option<Credentials>,
    ) -> Result<Self, FetchError> {
        let mut defaults = RequestConfig::new();
        defaults.headers.clone_from(&settings.headers);
        defaults.credentials = credentials;

        let mut builder = Self::builder()
            .user_agent(settings.user_agent.clone())
            .defaults(defaults);
        if let Some(base) = settings.base_url.as_ref() {
            builder = builder.base_url(base.as_str());
        }
        builder.build()
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub async fn get(
        &self,
        locator: &str,
        config: Option<&ConfigLayer>,
        cache: Option<&CacheOptions>,
    ) -> Result<Value, FetchError> {
        self.dispatch(locator, config, Some(verb(Method::GET, None)), cache)
            .await
    }

    /// [`Self::get`] followed by a typed decode of the result.
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        locator: &str,
        config: Option<&ConfigLayer>,
        cache: Option<&CacheOptions>,
    ) -> Result<T, FetchError> {
        let value = self.get(locator, config, cache).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post(
        &self,
        locator: &str,
        body: Option<&Value>,
        config: Option<&ConfigLayer>,
        cache: Option<&CacheOptions>,
    ) -> Result<Value, FetchError> {
        self.dispatch(locator, config, Some(verb(Method::POST, body)), cache)
            .await
    }

    pub async fn put(
        &self,
        locator: &str,
        body: Option<&Value>,
        config: Option<&ConfigLayer>,
        cache: Option<&CacheOptions>,
    ) -> Result<Value, FetchError> {
        self.dispatch(locator, config, Some(verb(Method::PUT, body)), cache)
            .await
    }

    pub async fn patch(
        &self,
        locator: &str,
        body: Option<&Value>,
        config: Option<&ConfigLayer>,
        cache: Option<&CacheOptions>,
    ) -> Result<Value, FetchError> {
        self.dispatch(locator, config, Some(verb(Method::PATCH, body)), cache)
            .await
    }

    pub async fn delete(
        &self,
        locator: &str,
        body: Option<&Value>,
        config: Option<&ConfigLayer>,
        cache: Option<&CacheOptions>,
    ) -> Result<Value, FetchError> {
        self.dispatch(locator, config, Some(verb(Method::DELETE, body)), cache)
            .await
    }

    /// Issue a request described entirely by `config`; the method defaults to GET.
    pub async fn fetch(
        &self,
        locator: &str,
        config: Option<&ConfigLayer>,
        cache: Option<&CacheOptions>,
    ) -> Result<Value, FetchError> {
        self.dispatch(locator, config, None, cache).await
    }

    pub async fn raise_expire_events(&self, events: &[&str]) {
        self.cache.raise_expire_events(events).await;
    }

    #[instrument(skip_all, fields(locator = %locator, cacheable = cache.is_some()))]
    async fn dispatch(
        &self,
        locator: &str,
        config: Option<&ConfigLayer>,
        verb: Option<ConfigLayer>,
        cache: Option<&CacheOptions>,
    ) -> Result<Value, FetchError> {
        let effective = merge([
            Some(builtin_defaults()),
            self.defaults.as_ref(),
            config,
            verb.as_ref(),
        ]);
        let url = self.target(locator, &effective)?;
        let body = effective.body.clone().map(Value::String);
        let identity = RequestIdentity::new(url.as_str(), body);

        if cache.is_some() {
            if let Some(hit) = self.cache.read(&identity).await {
                debug!("Serving response from cache");
                return Ok(hit);
            }
        }

        let started_at = Instant::now();
        let response = self.send(url, &effective).await?;
        let decoded = read_json(response).await;
        histogram!(METRIC_REQUEST_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        let Some(value) = decoded? else {
            debug!("Response declared an empty body");
            return Ok(Value::Null);
        };

        if let Some(options) = cache {
            self.cache.store(&identity, value.clone(), options).await;
        }
        Ok(value)
    }

    fn resolve(&self, locator: &str) -> Result<Url, FetchError> {
        match self.base.as_ref() {
            Some(base) => base.join(locator).map_err(FetchError::Url),
            None => Url::parse(locator).map_err(FetchError::Url),
        }
    }

    /// The URL a request goes to: `locator` joined onto the base, plus the query pairs.
    /// It is also the locator half of the cache identity.
    fn target(&self, locator: &str, config: &RequestConfig) -> Result<Url, FetchError> {
        let mut url = self.resolve(locator)?;
        if let Some(query) = config.query.as_ref().filter(|query| !query.is_empty()) {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn send(&self, url: Url, config: &RequestConfig) -> Result<Response, FetchError> {
        let method = config.method.clone().unwrap_or(Method::GET);
        debug!(%method, %url, "Dispatching request");

        let mut req = self.http.request(method, url);
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::InvalidHeader(format!("{name}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::InvalidHeader(format!("{name}: {e}")))?;
            req = req.header(header_name, header_value);
        }
        req = match config.credentials.as_ref() {
            Some(Credentials::Bearer(token)) => req.bearer_auth(token),
            Some(Credentials::Basic { username, password }) => {
                req.basic_auth(username, password.as_ref())
            }
            None => req,
        };
        if let Some(body) = config.body.as_ref() {
            req = req.body(body.clone());
        }

        Ok(req.send().await?)
    }
}

fn verb(method: Method, body: Option<&Value>) -> ConfigLayer {
    let mut layer = RequestConfig::new().with_method(method);
    layer.body = body.map(Value::to_string);
    ConfigLayer::Static(layer)
}

/// Decode a response; `Ok(None)` for a success that declares no content.
async fn read_json(response: Response) -> Result<Option<Value>, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(match response.bytes().await {
            Ok(body) => classify::classify_failure(status, &body),
            Err(_) => FetchError::Status(status),
        });
    }

    if declares_empty_body(&response) {
        return Ok(None);
    }

    let bytes = response.bytes().await?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn declares_empty_body(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == "0")
}
