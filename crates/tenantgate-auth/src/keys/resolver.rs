//! Tenant-aware signing key resolution.
//!
//! [`KeyResolver`] turns an unverified token header and payload into the key
//! that must verify its signature:
//!
//! 1. **Cache check** - `issuer|audience` in the [`KeyCache`]; a usable hit
//!    returns immediately.
//! 2. **Tenant lookup** - the issuer must belong to a tenant in the
//!    [`TenantDirectory`], otherwise `InvalidIssuer` (no network call).
//! 3. **Algorithm dispatch**
//!    - symmetric: the tenant's base64 secret, decoded
//!    - asymmetric: the issuer's key set is fetched and the certificate whose
//!      `kid` matches the header is wrapped as PEM
//!
//! Successful resolutions are cached; failures never are.
//!
//! # Fetch coalescing
//!
//! Concurrent misses for the same issuer share one in-flight key-set fetch.
//! Each waiter then selects its own `kid` from the shared result. The fetch
//! runs on its own task, so a caller that gives up never leaves a parked
//! future behind for later callers.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;

use super::cache::KeyCache;
use super::error::KeyResolutionError;
use super::jwks::{KeySetFetcher, RemoteKeySet, certificate_to_pem};
use super::types::{KeyMaterial, SigningAlgorithm, TokenHeader, TokenPayload};
use crate::storage::{Tenant, TenantDirectory};

/// Lenient base64 engine for tenant secrets: standard alphabet, padding
/// optional.
const SECRET_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

type KeySetResult = Result<Arc<RemoteKeySet>, KeyResolutionError>;
type InFlightFetch = Shared<BoxFuture<'static, KeySetResult>>;
type InFlightMap = Arc<Mutex<HashMap<String, InFlightFetch>>>;

/// Decodes a tenant's base64 secret into raw key bytes.
///
/// # Errors
///
/// Returns `MalformedKey` if the secret is not valid base64.
pub fn decode_tenant_secret(secret: &str) -> Result<Vec<u8>, KeyResolutionError> {
    SECRET_ENGINE
        .decode(secret.trim())
        .map_err(|e| KeyResolutionError::malformed_key(format!("tenant secret is not base64: {e}")))
}

/// Resolves verification keys for tenant tokens.
pub struct KeyResolver {
    cache: Arc<KeyCache>,
    directory: Arc<dyn TenantDirectory>,
    fetcher: Arc<dyn KeySetFetcher>,
    in_flight: InFlightMap,
}

impl KeyResolver {
    /// Creates a resolver over the given cache, directory and fetcher.
    pub fn new(
        cache: Arc<KeyCache>,
        directory: Arc<dyn TenantDirectory>,
        fetcher: Arc<dyn KeySetFetcher>,
    ) -> Self {
        Self {
            cache,
            directory,
            fetcher,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the key cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<KeyCache> {
        &self.cache
    }

    /// Returns the tenant directory.
    #[must_use]
    pub fn directory(&self) -> &Arc<dyn TenantDirectory> {
        &self.directory
    }

    /// Resolves the key that verifies a token with this header and payload.
    ///
    /// # Errors
    ///
    /// - `InvalidIssuer` if no tenant owns the issuer
    /// - `UnsupportedAlgorithm` for a symmetric token of a tenant without a secret
    /// - `MalformedKey` for an undecodable secret or an empty certificate chain
    /// - `KeyNotFound` if the key set has no key with the header's `kid`
    /// - `Network` / `Protocol` from the key-set fetch, unchanged
    pub async fn resolve(
        &self,
        header: &TokenHeader,
        payload: &TokenPayload,
    ) -> Result<KeyMaterial, KeyResolutionError> {
        let cache_key = payload.cache_key();

        if let Some(material) = self.cache.get(&cache_key) {
            if material.serves(header) {
                tracing::trace!(cache_key = %cache_key, "Key cache hit");
                return Ok(material);
            }
            tracing::debug!(
                cache_key = %cache_key,
                cached = %material.algorithm(),
                requested = %header.algorithm,
                "Cached key does not match token header, resolving again"
            );
        }

        let tenant = self.directory.find_by_issuer(&payload.issuer).ok_or_else(|| {
            tracing::debug!(issuer = %payload.issuer, "No tenant for issuer");
            KeyResolutionError::invalid_issuer(&payload.issuer)
        })?;

        let material = match header.algorithm {
            SigningAlgorithm::Symmetric => Self::symmetric_key(&tenant)?,
            SigningAlgorithm::Asymmetric => self.asymmetric_key(header, payload).await?,
        };

        tracing::debug!(
            tenant = %tenant.name,
            cache_key = %cache_key,
            algorithm = %header.algorithm,
            "Resolved signing key"
        );
        self.cache.set(cache_key, material.clone());
        Ok(material)
    }

    fn symmetric_key(tenant: &Tenant) -> Result<KeyMaterial, KeyResolutionError> {
        let secret = tenant.symmetric_secret.as_deref().ok_or_else(|| {
            tracing::debug!(tenant = %tenant.name, "Tenant has no symmetric secret");
            KeyResolutionError::unsupported_algorithm(SigningAlgorithm::Symmetric.as_str())
        })?;
        decode_tenant_secret(secret).map(KeyMaterial::Secret)
    }

    async fn asymmetric_key(
        &self,
        header: &TokenHeader,
        payload: &TokenPayload,
    ) -> Result<KeyMaterial, KeyResolutionError> {
        let key_set = self.fetch_key_set(&payload.issuer).await?;
        let kid = header.key_id.as_deref();

        let key = key_set
            .find(kid)
            .ok_or_else(|| KeyResolutionError::key_not_found(&payload.issuer, kid))?;

        let certificate = key
            .x5c
            .first()
            .filter(|cert| !cert.trim().is_empty())
            .ok_or_else(|| {
                KeyResolutionError::malformed_key(format!(
                    "key {} has no certificate",
                    kid.unwrap_or_default()
                ))
            })?;

        Ok(KeyMaterial::PublicKeyPem {
            kid: header.key_id.clone(),
            pem: certificate_to_pem(certificate),
        })
    }

    /// Fetches an issuer's key set, joining a fetch already in flight.
    async fn fetch_key_set(&self, issuer: &str) -> KeySetResult {
        let fetch = {
            let mut in_flight = self.in_flight.lock();
            if let Some(existing) = in_flight.get(issuer) {
                tracing::trace!(issuer, "Joining in-flight key set fetch");
                existing.clone()
            } else {
                let fetch = Self::start_fetch(
                    Arc::clone(&self.fetcher),
                    Arc::clone(&self.in_flight),
                    issuer.to_string(),
                );
                in_flight.insert(issuer.to_string(), fetch.clone());
                fetch
            }
        };

        fetch.await
    }

    /// Spawns the fetch so it runs to completion even if every waiter is
    /// dropped. The task clears its own map entry once it finishes.
    fn start_fetch(
        fetcher: Arc<dyn KeySetFetcher>,
        in_flight: InFlightMap,
        issuer: String,
    ) -> InFlightFetch {
        let task = tokio::spawn(async move {
            let result = fetcher.fetch_key_set(&issuer).await.map(Arc::new);
            in_flight.lock().remove(&issuer);
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Key set fetch task failed");
                Err(KeyResolutionError::network("key set fetch aborted"))
            })
        }
        .boxed()
        .shared()
    }
}
