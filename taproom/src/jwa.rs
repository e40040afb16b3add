//! The signature algorithms this verifier is willing to work with
//!
//! The identity provider signs tokens with RS256 and nothing else. Any
//! other declared algorithm, including `none`, is rejected before a
//! signature check is ever attempted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A declared token signing algorithm
///
/// Deserialization never fails on an unrecognized name; unknown algorithms
/// are carried as [`Algorithm::Unknown`] so that rejection happens in the
/// verifier, where it maps to the proper failure code, rather than as a
/// parse error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    #[serde(rename = "RS256")]
    Rs256,

    /// Any algorithm this verifier does not support
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Rs256 => f.write_str("RS256"),
            Self::Unknown => f.write_str("<unsupported>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_rs256() {
        let alg: Algorithm = serde_json::from_str("\"RS256\"").unwrap();
        assert_eq!(alg, Algorithm::Rs256);
    }

    #[test]
    fn unknown_algorithms_deserialize_without_error() {
        for name in ["none", "HS256", "RS384", "ES256"] {
            let alg: Algorithm = serde_json::from_str(&format!("\"{name}\"")).unwrap();
            assert_eq!(alg, Algorithm::Unknown);
        }
    }
}
