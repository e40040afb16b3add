//! Permission strings and the `permissions` claim
//!
//! A permission is an opaque capability label such as `post:drinks`. The
//! same lexical rules apply as for OAuth2 scope tokens ([RFC 6749 §3.3][]):
//! non-empty, printable ASCII, excluding space, double quote, and
//! backslash.
//!
//! [RFC 6749 §3.3]: https://datatracker.ietf.org/doc/html/rfc6749#section-3.3

use std::collections::{hash_set, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An invalid permission string
#[derive(Debug, Error)]
pub enum InvalidPermission {
    /// The permission was the empty string
    #[error("permission cannot be empty")]
    EmptyString,
    /// The permission contained an invalid byte
    #[error("invalid permission byte at position {position}: 0x{value:02x}")]
    InvalidByte {
        /// The index in the permission where the invalid byte was found
        position: usize,
        /// The invalid byte value
        value: u8,
    },
}

/// A single permission granting access to one capability
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[repr(transparent)]
pub struct Permission(String);

impl Permission {
    /// Constructs a permission from a static string, panicking if invalid
    ///
    /// Intended for the fixed permission names attached to route handlers,
    /// where an invalid string is a programming error.
    #[must_use]
    pub fn from_static(value: &'static str) -> Self {
        Self::try_from(value).expect("static permission strings must be valid")
    }

    /// A view of the underlying string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), InvalidPermission> {
        if s.is_empty() {
            Err(InvalidPermission::EmptyString)
        } else if let Some((position, &value)) = s
            .as_bytes()
            .iter()
            .enumerate()
            .find(|(_, &b)| b <= 0x20 || b == 0x22 || b == 0x5C || 0x7F <= b)
        {
            Err(InvalidPermission::InvalidByte { position, value })
        } else {
            Ok(())
        }
    }
}

impl TryFrom<&'_ str> for Permission {
    type Error = InvalidPermission;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for Permission {
    type Error = InvalidPermission;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl FromStr for Permission {
    type Err = InvalidPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum PermissionSetDto {
    String(String),
    Array(Vec<Permission>),
}

impl TryFrom<PermissionSetDto> for PermissionSet {
    type Error = InvalidPermission;

    fn try_from(dto: PermissionSetDto) -> Result<Self, Self::Error> {
        match dto {
            PermissionSetDto::String(s) => s.split_whitespace().map(Permission::try_from).collect(),
            PermissionSetDto::Array(arr) => Ok(arr.into_iter().collect()),
        }
    }
}

impl From<PermissionSet> for PermissionSetDto {
    fn from(set: PermissionSet) -> Self {
        PermissionSetDto::Array(set.0.into_iter().collect())
    }
}

/// The set of permissions granted by a token
///
/// Deserializes from either a JSON array of strings (the identity
/// provider's native form) or a single space-delimited string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PermissionSetDto", into = "PermissionSetDto")]
#[must_use]
pub struct PermissionSet(HashSet<Permission>);

impl PermissionSet {
    /// Produces an empty permission set
    #[must_use]
    pub fn empty() -> Self {
        Self(HashSet::new())
    }

    /// Constructs a set containing a single permission
    pub fn single(permission: Permission) -> Self {
        let mut set = Self::empty();
        set.insert(permission);
        set
    }

    /// Adds a permission to the set
    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    /// Whether the set grants the given permission
    #[must_use]
    pub fn contains(&self, permission: &Permission) -> bool {
        self.0.contains(permission)
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the permissions in the set
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }
}

impl IntoIterator for PermissionSet {
    type Item = Permission;
    type IntoIter = hash_set::IntoIter<Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Permission> for PermissionSet {
    fn extend<I: IntoIterator<Item = Permission>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_typical_permission() {
        let p = Permission::try_from("get:drinks-detail").unwrap();
        assert_eq!(p.as_str(), "get:drinks-detail");
    }

    #[test]
    fn rejects_the_empty_string() {
        assert!(matches!(
            Permission::try_from(""),
            Err(InvalidPermission::EmptyString)
        ));
    }

    #[test]
    fn rejects_embedded_whitespace() {
        assert!(matches!(
            Permission::try_from("post drinks"),
            Err(InvalidPermission::InvalidByte { .. })
        ));
    }

    #[test]
    fn rejects_non_ascii() {
        assert!(matches!(
            Permission::try_from("post:drinks\u{2603}"),
            Err(InvalidPermission::InvalidByte { .. })
        ));
    }

    #[test]
    fn deserializes_from_an_array() {
        let set: PermissionSet =
            serde_json::from_str(r#"["get:drinks-detail","post:drinks"]"#).unwrap();
        assert!(set.contains(&Permission::from_static("post:drinks")));
        assert!(!set.contains(&Permission::from_static("delete:drinks")));
    }

    #[test]
    fn deserializes_from_a_space_delimited_string() {
        let set: PermissionSet = serde_json::from_str(r#""get:drinks-detail post:drinks""#).unwrap();
        assert!(set.contains(&Permission::from_static("get:drinks-detail")));
    }

    #[test]
    fn an_empty_array_is_an_empty_set() {
        let set: PermissionSet = serde_json::from_str("[]").unwrap();
        assert!(set.is_empty());
    }
}
