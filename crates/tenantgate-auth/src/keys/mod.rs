//! Tenant-aware signing key resolution.
//!
//! - [`cache`] - bounded TTL/LRU cache of resolved keys
//! - [`jwks`] - remote key-set fetching and PEM wrapping
//! - [`resolver`] - the cache → tenant → algorithm → fetch orchestration
//! - [`types`] - algorithms, token views, cache keys, key material

pub mod cache;
pub mod error;
pub mod jwks;
pub mod resolver;
pub mod types;

pub use cache::{KeyCache, KeyCacheConfig};
pub use error::KeyResolutionError;
pub use jwks::{
    HttpKeySetFetcher, KeySetFetcher, KeySetFetcherConfig, RemoteKey, RemoteKeySet,
    certificate_to_pem, key_set_url,
};
pub use resolver::{KeyResolver, decode_tenant_secret};
pub use types::{CacheKey, KeyMaterial, SigningAlgorithm, TokenHeader, TokenPayload};
