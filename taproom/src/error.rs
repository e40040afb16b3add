//! The authentication and authorization failure taxonomy
//!
//! Every failure in the verification pipeline terminates the request and
//! surfaces as a single [`AuthError`]. Each error maps to a stable
//! machine-readable code, a human-readable description, and the HTTP status
//! the boundary layer must reply with. The mapping is part of the API
//! contract and is exercised by the tests in `tests/authority.rs`.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{permission::Permission, types::KeyId};

/// An error occurring when validating the claims of a token
#[derive(Debug, Error)]
pub enum ClaimsRejected {
    /// The token algorithm is not acceptable
    #[error("invalid algorithm")]
    InvalidAlgorithm,

    /// The token audience does not match the expected audience
    #[error("invalid audience")]
    InvalidAudience,

    /// The token issuer does not match the expected issuer
    #[error("invalid issuer")]
    InvalidIssuer,

    /// The token is expired according to the `exp` claim
    #[error("token expired")]
    TokenExpired,

    /// A required claim is missing
    #[error("required {0} claim missing")]
    MissingRequiredClaim(&'static str),
}

/// An error occurring while verifying a token signature against a JWK
#[derive(Debug, Error)]
pub enum JwkVerifyError {
    /// The key cannot verify signatures produced by the token's algorithm
    #[error("key incompatible with token algorithm")]
    IncompatibleAlgorithm,

    /// The signature did not match
    #[error("signature mismatch")]
    SignatureMismatch,
}

/// An error occurring while verifying a compact token
#[derive(Debug, Error)]
pub enum JwtVerifyError {
    /// The token does not have a discernible header, payload, and signature
    #[error("malformed JWT")]
    MalformedToken,

    /// The token header segment could not be decoded
    #[error("malformed JWT header")]
    MalformedTokenHeader(#[source] Box<dyn StdError + Send + Sync + 'static>),

    /// The token payload segment could not be decoded
    #[error("malformed JWT payload")]
    MalformedTokenPayload(#[source] Box<dyn StdError + Send + Sync + 'static>),

    /// The token signature segment could not be decoded
    #[error("malformed JWT signature")]
    MalformedTokenSignature(#[source] Box<dyn StdError + Send + Sync + 'static>),

    /// The token was rejected by the signing key
    #[error("token rejected by JWK")]
    JwkVerify(#[from] JwkVerifyError),

    /// The token was rejected by the claims validator
    #[error("token rejected by claims validator")]
    ClaimsRejected(#[from] ClaimsRejected),
}

pub(crate) fn malformed_jwt_header(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> JwtVerifyError {
    JwtVerifyError::MalformedTokenHeader(source.into())
}

pub(crate) fn malformed_jwt_payload(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> JwtVerifyError {
    JwtVerifyError::MalformedTokenPayload(source.into())
}

pub(crate) fn malformed_jwt_signature(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> JwtVerifyError {
    JwtVerifyError::MalformedTokenSignature(source.into())
}

/// A terminal authentication or authorization failure
///
/// Produced at the point the verification pipeline stops and propagated,
/// unmodified, to the boundary that converts it into an HTTP response.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header was presented
    #[error("authorization header missing")]
    MissingAuthorization,

    /// The `Authorization` header is not a well-formed bearer credential
    #[error("authorization header malformed")]
    MalformedAuthorization,

    /// The token header does not declare a key ID
    #[error("token header does not declare a key id")]
    MissingKeyId,

    /// No key in the fetched key set matches the token's key ID
    #[error("no key in the key set matches key id {0:?}")]
    UnknownKey(KeyId),

    /// The key set could not be fetched from the identity provider
    #[error("unable to fetch the signing key set")]
    KeySetFetch(#[source] reqwest::Error),

    /// The token failed signature or claims verification
    #[error("invalid JWT")]
    Verification(#[from] JwtVerifyError),

    /// The token is valid but carries no `permissions` claim at all
    #[error("permissions claim missing from token")]
    MissingPermissionsClaim,

    /// The token's `permissions` claim does not grant the required permission
    #[error("permission {0:?} not granted")]
    InsufficientPermission(Permission),
}

impl AuthError {
    /// The machine-readable error code for the boundary response
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingAuthorization => "authorization_header_missing",
            Self::MalformedAuthorization => "invalid_header",
            Self::MissingKeyId => "invalid_token_header",
            Self::UnknownKey(_) | Self::KeySetFetch(_) => "invalid_header",
            Self::Verification(err) => match err {
                JwtVerifyError::ClaimsRejected(ClaimsRejected::TokenExpired) => "token_expired",
                JwtVerifyError::ClaimsRejected(ClaimsRejected::InvalidAlgorithm) => {
                    "invalid_header"
                }
                JwtVerifyError::ClaimsRejected(_) => "invalid_claims",
                _ => "invalid_header",
            },
            Self::MissingPermissionsClaim => "Invalid claims.",
            Self::InsufficientPermission(_) => "unauthorized_access",
        }
    }

    /// The HTTP status code the boundary layer must reply with
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::MissingPermissionsClaim => 400,
            Self::InsufficientPermission(_) => 403,
            _ => 401,
        }
    }

    /// A human-readable description for the boundary response
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingAuthorization => "The authorization header is missing.",
            Self::MalformedAuthorization => "The authorization header is invalid.",
            Self::MissingKeyId => "Token header malformed.",
            Self::UnknownKey(_) | Self::KeySetFetch(_) => "Invalid header.",
            Self::Verification(err) => match err {
                JwtVerifyError::ClaimsRejected(ClaimsRejected::TokenExpired) => {
                    "Token has expired."
                }
                JwtVerifyError::ClaimsRejected(ClaimsRejected::InvalidAlgorithm) => {
                    "Invalid header."
                }
                JwtVerifyError::ClaimsRejected(_) => "Invalid claims error.",
                _ => "Invalid header.",
            },
            Self::MissingPermissionsClaim => "Permissions not included in JWT.",
            Self::InsufficientPermission(_) => {
                "The user does not have permission to access this resource."
            }
        }
    }
}
