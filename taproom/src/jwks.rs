//! The identity provider's published key set

use serde::{Deserialize, Serialize};

use crate::{jwk::Jwk, types::KeyId};

/// A JSON Web Key Set (JWKS)
///
/// Deserialization is lenient: entries that are not RSA verification keys
/// (other key types, missing components) are skipped with a warning rather
/// than failing the whole set, since providers routinely publish keys for
/// purposes this verifier does not care about.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "JwksDto")]
pub struct Jwks {
    keys: Vec<Jwk>,
}

impl Jwks {
    /// Adds a key to the set
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// A view of the keys in this set
    #[must_use]
    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// Finds the key whose ID exactly equals `kid`
    ///
    /// Matching is exact string equality and the first match wins. A
    /// duplicate `kid` in the set is a provider configuration anomaly; the
    /// first-seen entry is used deterministically.
    #[must_use]
    pub fn get_key(&self, kid: &KeyId) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.key_id() == Some(kid))
    }
}

#[derive(Deserialize)]
struct JwksDto {
    keys: Vec<MaybeJwk>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeJwk {
    Jwk(Jwk),
    Unknown(UnknownKey),
}

#[derive(Deserialize)]
struct UnknownKey {
    #[serde(default)]
    kid: Option<KeyId>,
    #[serde(default)]
    kty: Option<String>,
}

impl From<JwksDto> for Jwks {
    fn from(dto: JwksDto) -> Self {
        let mut keys = Vec::with_capacity(dto.keys.len());

        for entry in dto.keys {
            match entry {
                MaybeJwk::Jwk(jwk) => keys.push(jwk),
                MaybeJwk::Unknown(key) => {
                    tracing::warn!(
                        jwk.kid = ?key.kid,
                        jwk.kty = ?key.kty,
                        "ignoring unusable JWKS entry"
                    );
                }
            }
        }

        Self { keys }
    }
}
