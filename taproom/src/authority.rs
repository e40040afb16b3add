//! The authority that verifies bearer tokens against the provider's keys
//!
//! An [`Authority`] owns the current key-set snapshot, the validation plan,
//! and (when keys come from a remote provider) the HTTP client used to
//! fetch them. It is cheap to clone and safe to share across request
//! handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;

use crate::{
    config::AuthConfig,
    error::AuthError,
    jwk::Jwk,
    jwks::Jwks,
    jwt::{self, Claims, Validator},
    permission::Permission,
    types::KeyId,
};

/// How long a key-set fetch may take before it is abandoned
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct VolatileData {
    jwks: Jwks,
    fetched_at: Option<Instant>,
}

#[derive(Debug)]
struct RemoteOptions {
    jwks_url: String,
    client: reqwest::Client,
    refresh_interval: Option<Duration>,
}

#[derive(Debug)]
struct Inner {
    data: ArcSwap<VolatileData>,
    remote: Option<RemoteOptions>,
    validator: Validator,
}

/// Verifies and authorizes bearer tokens
///
/// All failure modes surface as [`AuthError`]; nothing is retried or
/// recovered internally apart from a single key-set refresh when a token
/// names a key the current snapshot does not have.
#[derive(Clone, Debug)]
#[must_use]
pub struct Authority {
    inner: Arc<Inner>,
}

impl Authority {
    /// Constructs an authority over a fixed, local key set
    ///
    /// No network access is ever performed. A token naming a key outside
    /// `jwks` is rejected outright.
    pub fn new(jwks: Jwks, validator: Validator) -> Self {
        Self {
            inner: Arc::new(Inner {
                data: ArcSwap::from_pointee(VolatileData {
                    jwks,
                    fetched_at: None,
                }),
                remote: None,
                validator,
            }),
        }
    }

    /// Constructs an authority that fetches keys from a remote JWKS URL
    ///
    /// Without a refresh interval the key set is fetched anew for every
    /// verification, matching the provider's published keys exactly at the
    /// cost of one HTTP round trip per request. Call
    /// [`remote_cached`][Self::remote_cached] to reuse a snapshot instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be
    /// constructed.
    pub fn remote(jwks_url: impl Into<String>, validator: Validator) -> Result<Self, AuthError> {
        Self::build_remote(jwks_url.into(), validator, None)
    }

    /// Constructs a remote authority that caches the key set
    ///
    /// The snapshot is reused until `refresh_interval` has elapsed, then
    /// refreshed on the next verification. A token naming an unknown key
    /// additionally forces one refresh before being rejected, so that a
    /// provider key rotation inside the interval does not fail requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be
    /// constructed.
    pub fn remote_cached(
        jwks_url: impl Into<String>,
        validator: Validator,
        refresh_interval: Duration,
    ) -> Result<Self, AuthError> {
        Self::build_remote(jwks_url.into(), validator, Some(refresh_interval))
    }

    /// Constructs a remote authority from environment-derived configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be
    /// constructed.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::build_remote(config.jwks_url(), config.validator(), config.refresh_interval())
    }

    fn build_remote(
        jwks_url: String,
        validator: Validator,
        refresh_interval: Option<Duration>,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(AuthError::KeySetFetch)?;

        Ok(Self {
            inner: Arc::new(Inner {
                data: ArcSwap::from_pointee(VolatileData {
                    jwks: Jwks::default(),
                    fetched_at: None,
                }),
                remote: Some(RemoteOptions {
                    jwks_url,
                    client,
                    refresh_interval,
                }),
                validator,
            }),
        })
    }

    /// The validation plan applied to every token
    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.inner.validator
    }

    /// Fetches the key set from the provider and swaps in a new snapshot
    ///
    /// On a local authority this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails or the response is not a valid
    /// key set.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let Some(remote) = &self.inner.remote else {
            return Ok(());
        };

        let jwks = remote
            .client
            .get(&remote.jwks_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(AuthError::KeySetFetch)?
            .json::<Jwks>()
            .await
            .map_err(AuthError::KeySetFetch)?;

        tracing::debug!(keys = jwks.keys().len(), "refreshed signing key set");

        self.inner.data.store(Arc::new(VolatileData {
            jwks,
            fetched_at: Some(Instant::now()),
        }));

        Ok(())
    }

    fn get_key(&self, kid: &KeyId) -> Option<Jwk> {
        self.inner.data.load().jwks.get_key(kid).cloned()
    }

    async fn resolve_key(&self, kid: &KeyId) -> Result<Jwk, AuthError> {
        let Some(remote) = &self.inner.remote else {
            return self
                .get_key(kid)
                .ok_or_else(|| AuthError::UnknownKey(kid.clone()));
        };

        let refreshed = match remote.refresh_interval {
            None => {
                self.refresh().await?;
                true
            }
            Some(interval) => {
                let stale = self
                    .inner
                    .data
                    .load()
                    .fetched_at
                    .is_none_or(|at| at.elapsed() >= interval);
                if stale {
                    self.refresh().await?;
                }
                stale
            }
        };

        if let Some(key) = self.get_key(kid) {
            return Ok(key);
        }

        // The provider may have rotated keys within the cache interval.
        if !refreshed {
            self.refresh().await?;
            if let Some(key) = self.get_key(kid) {
                return Ok(key);
            }
        }

        Err(AuthError::UnknownKey(kid.clone()))
    }

    /// Authenticates a request and checks its permission grant
    ///
    /// Runs the whole pipeline: bearer extraction, token decomposition,
    /// key resolution, signature and claims verification, then the
    /// permission check. `required` of `None` means no particular
    /// permission is needed, but the token must still carry a
    /// `permissions` claim.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] describing the first stage that failed.
    /// Verification is all-or-nothing; no partial success is observable.
    pub async fn authorize(
        &self,
        header: Option<&str>,
        required: Option<&Permission>,
    ) -> Result<Claims, AuthError> {
        let token = jwt::extract_bearer(header)?;
        let decomposed = jwt::decompose(token)?;

        let kid = decomposed.kid().cloned().ok_or(AuthError::MissingKeyId)?;
        let key = self.resolve_key(&kid).await?;

        let claims = decomposed.verify(&key, &self.inner.validator)?;

        let permissions = claims
            .permissions()
            .ok_or(AuthError::MissingPermissionsClaim)?;

        if let Some(required) = required {
            if !permissions.contains(required) {
                tracing::debug!(permission = %required, "permission not granted");
                return Err(AuthError::InsufficientPermission(required.clone()));
            }
        }

        Ok(claims)
    }
}
