//! RSA verification keys reconstructed from JWKS entries
//!
//! Only the `kty`, `kid`, `use`, `n`, and `e` members of a key-set entry
//! are consumed. The modulus and exponent are enough to verify an RS256
//! signature; no PEM or DER round trip is needed.

use serde::{Deserialize, Serialize};

use crate::{b64::Base64Url, error::JwkVerifyError, jwa::Algorithm, types::KeyId};

/// The key type of a JWKS entry
///
/// Anything other than `RSA` fails deserialization, which causes the
/// key-set parser to skip the entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    /// An RSA public key
    #[serde(rename = "RSA")]
    Rsa,
}

/// The intended usage of a key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Usage {
    /// The key is used for verifying signatures
    #[serde(rename = "sig")]
    Signing,

    /// The key is used for encryption
    #[serde(rename = "enc")]
    Encryption,
}

/// A single public signing key from the identity provider's key set
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Jwk {
    kty: KeyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<KeyId>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    usage: Option<Usage>,
    n: Base64Url,
    e: Base64Url,
}

impl Jwk {
    /// Constructs a key from its public modulus and exponent
    pub fn from_components(modulus: impl Into<Base64Url>, exponent: impl Into<Base64Url>) -> Self {
        Self {
            kty: KeyType::Rsa,
            kid: None,
            usage: None,
            n: modulus.into(),
            e: exponent.into(),
        }
    }

    /// Sets the key ID
    pub fn with_key_id(self, kid: impl Into<KeyId>) -> Self {
        Self {
            kid: Some(kid.into()),
            ..self
        }
    }

    /// Sets the key's intended usage
    pub fn with_usage(self, usage: Usage) -> Self {
        Self {
            usage: Some(usage),
            ..self
        }
    }

    /// The key ID, if the entry declares one
    #[must_use]
    pub fn key_id(&self) -> Option<&KeyId> {
        self.kid.as_ref()
    }

    /// The intended usage of the key, if the entry declares one
    #[must_use]
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// Verifies `signature` over `message` for the declared algorithm
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm is not RS256 or if the signature
    /// does not match.
    pub fn verify(
        &self,
        alg: Algorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), JwkVerifyError> {
        match alg {
            Algorithm::Rs256 => {
                let pk = ring::signature::RsaPublicKeyComponents {
                    n: self.n.as_slice(),
                    e: self.e.as_slice(),
                };

                pk.verify(
                    &ring::signature::RSA_PKCS1_2048_8192_SHA256,
                    message,
                    signature,
                )
                .map_err(|_| JwkVerifyError::SignatureMismatch)
            }
            Algorithm::Unknown => Err(JwkVerifyError::IncompatibleAlgorithm),
        }
    }
}
