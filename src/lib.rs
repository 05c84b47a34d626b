//! JSON fetch client with layered request configuration and an opt-in,
//! event-invalidated response cache.
//!
//! - [`request`]: configuration layers and the merge that folds them.
//! - [`cache`]: the cache contract and the in-memory backend.
//! - [`client`]: the orchestrator tying merge, cache, and transport together.
//! - [`config`] and [`telemetry`]: settings loading and log/metric setup for
//!   binaries embedding the client.

pub mod cache;
pub mod client;
pub mod config;
pub mod request;
pub mod telemetry;

pub use cache::{Cache, CacheOptions, InMemoryCache, RequestIdentity};
pub use client::{FetchClient, FetchClientBuilder, FetchError};
pub use request::{ConfigLayer, Credentials, RequestConfig, merge};
