//! Server configuration sourced from the environment

use std::env;
use std::net::SocketAddr;

use taproom::config::ConfigError;
use taproom::AuthConfig;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";

/// Settings for the HTTP server and the identity provider it trusts
#[derive(Clone, Debug)]
#[must_use]
pub struct ServerConfig {
    listen_addr: SocketAddr,
    auth: AuthConfig,
}

impl ServerConfig {
    /// Loads configuration from the environment
    ///
    /// `LISTEN_ADDR` is optional and defaults to `0.0.0.0:8000`; the
    /// identity-provider variables are documented on
    /// [`AuthConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_owned())
            .parse()
            .map_err(|_| ConfigError::InvalidVar("LISTEN_ADDR"))?;

        Ok(Self {
            listen_addr,
            auth: AuthConfig::from_env()?,
        })
    }

    /// The socket address the server binds to
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// The identity-provider settings
    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }
}
