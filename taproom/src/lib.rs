//! Bearer-token authentication and authorization for the taproom drinks API.
//!
//! Tokens are issued by an external identity provider and arrive in the
//! `Authorization` header using the `Bearer` scheme. This crate verifies
//! them end to end:
//!
//! 1. extract the compact token from the header value,
//! 2. resolve the signing key from the provider's published JWKS by the
//!    token's declared key ID (`kid`),
//! 3. verify the RS256 signature and the standard claims (audience, issuer,
//!    expiry), and
//! 4. check that a required permission is present in the token's
//!    `permissions` claim.
//!
//! The whole pipeline is exposed as [`Authority::authorize`], which returns
//! the verified [`Claims`] or a single [`AuthError`] describing exactly
//! where verification stopped. Nothing here touches the protected resources
//! themselves; callers receive the claims as a plain value and decide what
//! to do with them.
//!
//! # Example
//!
//! ```no_run
//! use taproom::{AuthConfig, Authority, Permission};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::new("issuer.example.com", "taproom_api");
//! let authority = Authority::from_config(&config)?;
//!
//! let required = Permission::from_static("get:drinks-detail");
//! let claims = authority
//!     .authorize(Some("Bearer eyJhbGciOi..."), Some(&required))
//!     .await?;
//!
//! println!("authorized subject: {:?}", claims.sub());
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod authority;
pub mod b64;
pub mod clock;
pub mod config;
pub mod error;
pub mod jwa;
pub mod jwk;
pub mod jwks;
pub mod jwt;
pub mod permission;
mod types;

#[doc(inline)]
pub use authority::Authority;
#[doc(inline)]
pub use config::AuthConfig;
#[doc(inline)]
pub use error::AuthError;
#[doc(inline)]
pub use jwk::Jwk;
#[doc(inline)]
pub use jwks::Jwks;
#[doc(inline)]
pub use jwt::{Claims, Validator};
#[doc(inline)]
pub use permission::{Permission, PermissionSet};
pub use types::{Audience, Issuer, KeyId, Subject};
