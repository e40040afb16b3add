//! Compact token handling: extraction, decomposition, and validation
//!
//! A bearer token is an opaque three-segment string, `header.payload.signature`,
//! each segment base64url-encoded. The header is decoded early (and
//! untrusted) solely to learn which key should verify the token; the payload
//! is only decoded after the signature checks out.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    b64::Base64Url,
    clock::{Clock, System, UnixTime},
    error::{self, AuthError, ClaimsRejected, JwtVerifyError},
    jwa::Algorithm,
    jwk::Jwk,
    permission::PermissionSet,
    types::{Audience, Issuer, KeyId, Subject},
};

/// Extracts the bearer token from an `Authorization` header value
///
/// The header must split on whitespace into exactly two parts, the first of
/// which must equal `bearer` case-insensitively.
///
/// # Errors
///
/// Returns [`AuthError::MissingAuthorization`] if no header was presented
/// and [`AuthError::MalformedAuthorization`] for any other violation.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingAuthorization)?;

    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::MalformedAuthorization),
    }
}

/// The header segment of a token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Headers {
    alg: Algorithm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<KeyId>,
}

impl Headers {
    /// Constructs headers declaring the given signing algorithm
    pub const fn new(alg: Algorithm) -> Self {
        Self { alg, kid: None }
    }

    /// Constructs headers with a signing algorithm and key ID
    pub fn with_key_id(alg: Algorithm, kid: impl Into<KeyId>) -> Self {
        Self {
            alg,
            kid: Some(kid.into()),
        }
    }

    /// The declared signing algorithm
    #[must_use]
    pub fn alg(&self) -> Algorithm {
        self.alg
    }

    /// The declared key ID, if any
    #[must_use]
    pub fn kid(&self) -> Option<&KeyId> {
        self.kid.as_ref()
    }
}

/// A decomposed token whose header has been parsed but whose signature has
/// not yet been checked
///
/// The header values here are untrusted; they are only suitable for
/// electing the verification key.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Decomposed<'a> {
    header: Headers,
    message: &'a str,
    payload: &'a str,
    signature: Base64Url,
}

macro_rules! expect_two {
    ($iter:expr) => {{
        let mut i = $iter;
        match (i.next(), i.next(), i.next()) {
            (Some(first), Some(second), None) => Some((first, second)),
            _ => None,
        }
    }};
}

/// Splits a compact token into its parts, parsing the header segment
///
/// # Errors
///
/// Returns an error if the token does not have three segments or if the
/// header segment cannot be decoded.
pub fn decompose(token: &str) -> Result<Decomposed<'_>, JwtVerifyError> {
    let (s_str, message) =
        expect_two!(token.rsplitn(2, '.')).ok_or(JwtVerifyError::MalformedToken)?;
    let (payload, h_str) =
        expect_two!(message.rsplitn(2, '.')).ok_or(JwtVerifyError::MalformedToken)?;

    let h_raw = Base64Url::from_encoded(h_str).map_err(error::malformed_jwt_header)?;
    let signature = Base64Url::from_encoded(s_str).map_err(error::malformed_jwt_signature)?;
    let header: Headers =
        serde_json::from_slice(h_raw.as_slice()).map_err(error::malformed_jwt_header)?;

    Ok(Decomposed {
        header,
        message,
        payload,
        signature,
    })
}

impl<'a> Decomposed<'a> {
    /// The untrusted key ID declared by the token header
    #[must_use]
    pub fn kid(&self) -> Option<&KeyId> {
        self.header.kid()
    }

    /// The untrusted algorithm declared by the token header
    #[must_use]
    pub fn alg(&self) -> Algorithm {
        self.header.alg()
    }

    /// Verifies the signature against `key` and validates the claims
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not match or the claims are
    /// rejected by the validator.
    pub fn verify(self, key: &Jwk, validator: &Validator) -> Result<Claims, JwtVerifyError> {
        self.verify_with_clock(key, validator, &System)
    }

    /// Verifies the token, sourcing the current time from `clock`
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not match or the claims are
    /// rejected by the validator.
    pub fn verify_with_clock<C: Clock>(
        self,
        key: &Jwk,
        validator: &Validator,
        clock: &C,
    ) -> Result<Claims, JwtVerifyError> {
        key.verify(
            self.header.alg(),
            self.message.as_bytes(),
            self.signature.as_slice(),
        )?;

        let p_raw = Base64Url::from_encoded(self.payload).map_err(error::malformed_jwt_payload)?;
        let claims: Claims =
            serde_json::from_slice(p_raw.as_slice()).map_err(error::malformed_jwt_payload)?;

        validator.validate_with_clock(&self.header, &claims, clock)?;

        Ok(claims)
    }
}

/// A set of zero or more [`Audience`]s
///
/// The `aud` claim may be a single string or an array of strings; both
/// forms deserialize into this set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany<Audience>", into = "OneOrMany<Audience>")]
#[repr(transparent)]
#[must_use]
pub struct Audiences(Vec<Audience>);

impl Audiences {
    /// An empty audience set
    #[inline]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// An audience set with a single audience
    #[inline]
    pub fn single(aud: impl Into<Audience>) -> Self {
        Self(vec![aud.into()])
    }

    /// Indicates whether the audience set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates through references to the audiences in the set
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Audience> {
        self.0.iter()
    }
}

/// A value that serializes as itself when single and as an array otherwise
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl From<OneOrMany<Audience>> for Audiences {
    #[inline]
    fn from(vals: OneOrMany<Audience>) -> Self {
        match vals {
            OneOrMany::One(x) => Self(vec![x]),
            OneOrMany::Many(v) => Self(v),
        }
    }
}

impl From<Audiences> for OneOrMany<Audience> {
    #[inline]
    fn from(vec: Audiences) -> Self {
        let mut vals = vec.0;
        if vals.len() == 1 {
            if let Some(only) = vals.pop() {
                return Self::One(only);
            }
        }
        Self::Many(vals)
    }
}

impl From<Vec<Audience>> for Audiences {
    #[inline]
    fn from(vals: Vec<Audience>) -> Self {
        Self(vals)
    }
}

impl From<Audience> for Audiences {
    #[inline]
    fn from(aud: Audience) -> Self {
        Self::single(aud)
    }
}

/// The verified payload of a token
///
/// Produced only after the signature has been verified against a key whose
/// ID matches the token's declared key ID. Passed downstream by value and
/// never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Audiences::is_empty")]
    aud: Audiences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<Issuer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<Subject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    permissions: Option<PermissionSet>,
}

impl Claims {
    /// Constructs a new, empty claim set
    pub const fn new() -> Self {
        Self {
            aud: Audiences::empty(),
            iss: None,
            sub: None,
            iat: None,
            exp: None,
            permissions: None,
        }
    }

    /// The `aud` claim
    pub fn aud(&self) -> &Audiences {
        &self.aud
    }

    /// The `iss` claim, if present
    #[must_use]
    pub fn iss(&self) -> Option<&Issuer> {
        self.iss.as_ref()
    }

    /// The `sub` claim, if present
    #[must_use]
    pub fn sub(&self) -> Option<&Subject> {
        self.sub.as_ref()
    }

    /// The `iat` claim, if present
    #[must_use]
    pub fn iat(&self) -> Option<UnixTime> {
        self.iat
    }

    /// The `exp` claim, if present
    #[must_use]
    pub fn exp(&self) -> Option<UnixTime> {
        self.exp
    }

    /// The `permissions` claim
    ///
    /// `None` means the claim was absent from the token, which is a
    /// distinct, detectable state from an empty permission set.
    #[must_use]
    pub fn permissions(&self) -> Option<&PermissionSet> {
        self.permissions.as_ref()
    }

    /// Sets the `aud` claim
    pub fn with_audience(mut self, aud: impl Into<Audiences>) -> Self {
        self.aud = aud.into();
        self
    }

    /// Sets the `iss` claim
    pub fn with_issuer(mut self, iss: impl Into<Issuer>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Sets the `sub` claim
    pub fn with_subject(mut self, sub: impl Into<Subject>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Sets the `iat` claim
    pub fn with_issued_at(mut self, time: UnixTime) -> Self {
        self.iat = Some(time);
        self
    }

    /// Sets the `exp` claim
    pub fn with_expiration(mut self, time: UnixTime) -> Self {
        self.exp = Some(time);
        self
    }

    /// Sets the `exp` claim to `secs` seconds from now on the system clock
    pub fn with_future_expiration(self, secs: u64) -> Self {
        let now = System.now();
        self.with_expiration(UnixTime(now.0 + secs))
    }

    /// Sets the `permissions` claim
    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = Some(permissions);
        self
    }
}

impl Default for Claims {
    fn default() -> Self {
        Self::new()
    }
}

/// The validation plan applied to every verified token
///
/// By default no algorithms are approved (so every token is rejected) and
/// expiration is enforced with no grace period.
#[derive(Clone, Debug)]
#[must_use]
pub struct Validator {
    approved_algorithms: Vec<Algorithm>,
    allowed_audiences: Vec<Audience>,
    issuer: Option<Issuer>,
    leeway: Duration,
    validate_exp: bool,
}

impl Default for Validator {
    #[inline]
    fn default() -> Self {
        Self {
            approved_algorithms: Vec::new(),
            allowed_audiences: Vec::new(),
            issuer: None,
            leeway: Duration::default(),
            validate_exp: true,
        }
    }
}

impl Validator {
    /// Approves a single signing algorithm
    #[inline]
    pub fn add_approved_algorithm(mut self, alg: Algorithm) -> Self {
        self.approved_algorithms.push(alg);
        self
    }

    /// Adds an audience to the set of allowed audiences
    #[inline]
    pub fn add_allowed_audience(mut self, audience: impl Into<Audience>) -> Self {
        self.allowed_audiences.push(audience.into());
        self
    }

    /// Requires that tokens specify a particular issuer
    #[inline]
    pub fn require_issuer(mut self, issuer: impl Into<Issuer>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Allows a grace period on either side of the `exp` claim
    #[inline]
    pub fn with_leeway(self, leeway: Duration) -> Self {
        Self { leeway, ..self }
    }

    /// Skips expiration checks
    #[inline]
    pub fn ignore_expiration(self) -> Self {
        Self {
            validate_exp: false,
            ..self
        }
    }

    pub(crate) fn validate_with_clock<C: Clock>(
        &self,
        header: &Headers,
        claims: &Claims,
        clock: &C,
    ) -> Result<(), ClaimsRejected> {
        let now = clock.now();

        if !self.approved_algorithms.iter().any(|&a| header.alg() == a) {
            return Err(ClaimsRejected::InvalidAlgorithm);
        }

        if self.validate_exp {
            if let Some(exp) = claims.exp() {
                if exp.0 < now.0.saturating_sub(self.leeway.as_secs()) {
                    return Err(ClaimsRejected::TokenExpired);
                }
            } else {
                return Err(ClaimsRejected::MissingRequiredClaim("exp"));
            }
        }

        if !self.allowed_audiences.is_empty() {
            if claims.aud().is_empty() {
                return Err(ClaimsRejected::MissingRequiredClaim("aud"));
            }

            let found = claims
                .aud()
                .iter()
                .any(|a| self.allowed_audiences.iter().any(|e| a == e));
            if !found {
                return Err(ClaimsRejected::InvalidAudience);
            }
        }

        if let Some(expected_iss) = &self.issuer {
            if let Some(iss) = claims.iss() {
                if iss != expected_iss {
                    return Err(ClaimsRejected::InvalidIssuer);
                }
            } else {
                return Err(ClaimsRejected::MissingRequiredClaim("iss"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use crate::clock::TestClock;
    use crate::permission::Permission;

    use super::*;

    #[test]
    fn extracts_a_bearer_token() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(extract_bearer(Some("bEaReR abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn missing_header_is_its_own_failure() {
        assert!(matches!(
            extract_bearer(None),
            Err(AuthError::MissingAuthorization)
        ));
    }

    #[test]
    fn rejects_malformed_header_values() {
        for value in [
            "Token abc.def.ghi",
            "Bearer",
            "Bearer abc def",
            "abc.def.ghi",
            "",
        ] {
            assert!(
                matches!(
                    extract_bearer(Some(value)),
                    Err(AuthError::MalformedAuthorization)
                ),
                "value {value:?} should be rejected",
            );
        }
    }

    #[test]
    fn decomposes_a_three_segment_token() -> Result<()> {
        let header = Base64Url::from_raw(&br#"{"alg":"RS256","kid":"K1"}"#[..]);
        let token = format!("{header}.cGF5bG9hZA.c2lnbmF0dXJl");

        let decomposed = decompose(&token)?;
        assert_eq!(decomposed.alg(), Algorithm::Rs256);
        assert_eq!(decomposed.kid().unwrap().as_str(), "K1");
        Ok(())
    }

    #[test]
    fn header_without_kid_decomposes_cleanly() -> Result<()> {
        let header = Base64Url::from_raw(&br#"{"alg":"RS256"}"#[..]);
        let token = format!("{header}.cGF5bG9hZA.c2lnbmF0dXJl");

        let decomposed = decompose(&token)?;
        assert!(decomposed.kid().is_none());
        Ok(())
    }

    #[test]
    fn rejects_tokens_without_three_segments() {
        assert!(matches!(
            decompose("abc"),
            Err(JwtVerifyError::MalformedToken)
        ));
        assert!(matches!(
            decompose("abc.def"),
            Err(JwtVerifyError::MalformedToken)
        ));
    }

    #[test]
    fn rejects_an_undecodable_header_segment() {
        assert!(matches!(
            decompose("!!!.cGF5bG9hZA.c2ln"),
            Err(JwtVerifyError::MalformedTokenHeader(_))
        ));
    }

    #[test]
    fn rejects_a_header_that_is_not_json() {
        let header = Base64Url::from_raw(&b"not json"[..]);
        let token = format!("{header}.cGF5bG9hZA.c2ln");
        assert!(matches!(
            decompose(&token),
            Err(JwtVerifyError::MalformedTokenHeader(_))
        ));
    }

    fn validator() -> Validator {
        Validator::default()
            .add_approved_algorithm(Algorithm::Rs256)
            .add_allowed_audience("taproom_api")
            .require_issuer("https://issuer.example.com/")
    }

    fn valid_claims() -> Claims {
        Claims::new()
            .with_audience(Audience::new("taproom_api"))
            .with_issuer("https://issuer.example.com/")
            .with_expiration(UnixTime(1000))
    }

    #[test]
    fn accepts_valid_claims() {
        let clock = TestClock::new(UnixTime(500));
        let header = Headers::new(Algorithm::Rs256);
        assert!(validator()
            .validate_with_clock(&header, &valid_claims(), &clock)
            .is_ok());
    }

    #[test]
    fn rejects_an_expired_token() {
        let clock = TestClock::new(UnixTime(1500));
        let header = Headers::new(Algorithm::Rs256);
        let err = validator()
            .validate_with_clock(&header, &valid_claims(), &clock)
            .unwrap_err();
        assert!(matches!(err, ClaimsRejected::TokenExpired));
    }

    #[test]
    fn leeway_tolerates_a_recently_expired_token() {
        let clock = TestClock::new(UnixTime(1030));
        let header = Headers::new(Algorithm::Rs256);
        assert!(validator()
            .with_leeway(Duration::from_secs(60))
            .validate_with_clock(&header, &valid_claims(), &clock)
            .is_ok());
    }

    #[test]
    fn rejects_a_missing_expiration() {
        let clock = TestClock::new(UnixTime(500));
        let header = Headers::new(Algorithm::Rs256);
        let claims = Claims::new()
            .with_audience(Audience::new("taproom_api"))
            .with_issuer("https://issuer.example.com/");
        let err = validator()
            .validate_with_clock(&header, &claims, &clock)
            .unwrap_err();
        assert!(matches!(err, ClaimsRejected::MissingRequiredClaim("exp")));
    }

    #[test]
    fn rejects_a_wrong_audience() {
        let clock = TestClock::new(UnixTime(500));
        let header = Headers::new(Algorithm::Rs256);
        let claims = valid_claims().with_audience(Audience::new("some_other_api"));
        let err = validator()
            .validate_with_clock(&header, &claims, &clock)
            .unwrap_err();
        assert!(matches!(err, ClaimsRejected::InvalidAudience));
    }

    #[test]
    fn accepts_a_matching_audience_within_a_set() {
        let clock = TestClock::new(UnixTime(500));
        let header = Headers::new(Algorithm::Rs256);
        let claims = valid_claims().with_audience(vec![
            Audience::new("some_other_api"),
            Audience::new("taproom_api"),
        ]);
        assert!(validator()
            .validate_with_clock(&header, &claims, &clock)
            .is_ok());
    }

    #[test]
    fn rejects_a_wrong_issuer() {
        let clock = TestClock::new(UnixTime(500));
        let header = Headers::new(Algorithm::Rs256);
        let claims = valid_claims().with_issuer("https://imposter.example.com/");
        let err = validator()
            .validate_with_clock(&header, &claims, &clock)
            .unwrap_err();
        assert!(matches!(err, ClaimsRejected::InvalidIssuer));
    }

    #[test]
    fn the_default_validator_approves_no_algorithms() {
        let clock = TestClock::new(UnixTime(500));
        let header = Headers::new(Algorithm::Rs256);
        let err = Validator::default()
            .validate_with_clock(&header, &valid_claims(), &clock)
            .unwrap_err();
        assert!(matches!(err, ClaimsRejected::InvalidAlgorithm));
    }

    #[test]
    fn rejects_an_unapproved_algorithm() {
        let clock = TestClock::new(UnixTime(500));
        let header: Headers = serde_json::from_str(r#"{"alg":"none"}"#).unwrap();
        let err = validator()
            .validate_with_clock(&header, &valid_claims(), &clock)
            .unwrap_err();
        assert!(matches!(err, ClaimsRejected::InvalidAlgorithm));
    }

    #[test]
    fn aud_deserializes_from_string_or_array() {
        let single: Claims = serde_json::from_str(r#"{"aud":"taproom_api"}"#).unwrap();
        let many: Claims = serde_json::from_str(r#"{"aud":["taproom_api","other"]}"#).unwrap();

        assert_eq!(single.aud().iter().count(), 1);
        assert_eq!(many.aud().iter().count(), 2);
    }

    #[test]
    fn absent_permissions_differ_from_empty_permissions() {
        let absent: Claims = serde_json::from_str(r#"{"sub":"barista"}"#).unwrap();
        let empty: Claims = serde_json::from_str(r#"{"sub":"barista","permissions":[]}"#).unwrap();

        assert!(absent.permissions().is_none());
        assert!(empty.permissions().is_some_and(PermissionSet::is_empty));
    }

    #[test]
    fn permissions_round_trip_through_serialization() -> Result<()> {
        let claims = Claims::new()
            .with_subject("barista")
            .with_permissions(PermissionSet::single(Permission::from_static(
                "get:drinks-detail",
            )));

        let reparsed: Claims = serde_json::from_str(&serde_json::to_string(&claims)?)?;
        assert_eq!(reparsed.permissions(), claims.permissions());
        Ok(())
    }
}
