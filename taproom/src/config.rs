//! Identity-provider configuration
//!
//! The provider is identified by its tenant domain; the issuer URL and the
//! JWKS discovery URL are both derived from it, so they can never disagree.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::{jwa::Algorithm, jwt::Validator, types::Issuer};

/// An error loading configuration from the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    /// An environment variable held a value that could not be parsed
    #[error("environment variable {0} is not a valid value")]
    InvalidVar(&'static str),
}

/// Settings for the identity provider this service trusts
#[derive(Clone, Debug)]
#[must_use]
pub struct AuthConfig {
    domain: String,
    audience: String,
    refresh_interval: Option<Duration>,
}

impl AuthConfig {
    /// Constructs a configuration for the given tenant domain and audience
    pub fn new(domain: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            audience: audience.into(),
            refresh_interval: None,
        }
    }

    /// Loads configuration from the environment
    ///
    /// `AUTH_DOMAIN` and `AUTH_AUDIENCE` are required.
    /// `AUTH_JWKS_REFRESH_SECS`, when set, enables key-set caching with
    /// the given interval; when unset, keys are fetched per verification.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let domain =
            env::var("AUTH_DOMAIN").map_err(|_| ConfigError::MissingVar("AUTH_DOMAIN"))?;
        let audience =
            env::var("AUTH_AUDIENCE").map_err(|_| ConfigError::MissingVar("AUTH_AUDIENCE"))?;

        let refresh_interval = match env::var("AUTH_JWKS_REFRESH_SECS") {
            Ok(secs) => Some(Duration::from_secs(
                secs.parse()
                    .map_err(|_| ConfigError::InvalidVar("AUTH_JWKS_REFRESH_SECS"))?,
            )),
            Err(_) => None,
        };

        Ok(Self {
            domain,
            audience,
            refresh_interval,
        })
    }

    /// Enables key-set caching with the given refresh interval
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// The tenant domain, e.g. `dev-tenant.us.auth0.com`
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The audience value expected in every token's `aud` claim
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// The issuer URL expected in every token's `iss` claim
    pub fn issuer(&self) -> Issuer {
        Issuer::new(format!("https://{}/", self.domain))
    }

    /// The discovery URL the signing key set is published at
    #[must_use]
    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.domain)
    }

    /// How long a fetched key set may be reused, if caching is enabled
    #[must_use]
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval
    }

    /// The validation plan implied by this configuration
    pub fn validator(&self) -> Validator {
        Validator::default()
            .add_approved_algorithm(Algorithm::Rs256)
            .add_allowed_audience(self.audience.as_str())
            .require_issuer(self.issuer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_provider_urls_from_the_domain() {
        let config = AuthConfig::new("dev-tenant.us.auth0.com", "taproom_api");

        assert_eq!(config.issuer().as_str(), "https://dev-tenant.us.auth0.com/");
        assert_eq!(
            config.jwks_url(),
            "https://dev-tenant.us.auth0.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn caching_is_off_by_default() {
        let config = AuthConfig::new("dev-tenant.us.auth0.com", "taproom_api");
        assert!(config.refresh_interval().is_none());

        let cached = config.with_refresh_interval(Duration::from_secs(300));
        assert_eq!(cached.refresh_interval(), Some(Duration::from_secs(300)));
    }
}
