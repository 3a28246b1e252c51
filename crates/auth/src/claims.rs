//! JWT claims model and HS256 codec for the bearer transport.
//!
//! The token carries the **principal only** (subject + email). Membership,
//! company and role are deliberately absent: they are resolved fresh per
//! request through [`crate::MembershipResolver`], so a role change or removal
//! takes effect on the next request instead of living on in stale tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PrincipalId;

/// Claims embedded in every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject — the principal identifier.
    pub sub: PrincipalId,
    /// E-mail of the principal at issue time (display only, never authz).
    pub email: String,
    /// Issued-at (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration (UTC Unix timestamp).
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// HS256 encode/decode for [`JwtClaims`].
///
/// The credential service that issues sessions shares the signing secret with
/// this API; signature verification is all that ties the two together.
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a token for `sub`, valid for `ttl` from `now`.
    pub fn issue(
        &self,
        sub: PrincipalId,
        email: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = JwtClaims {
            sub,
            email: email.into(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        if claims.exp <= claims.iat {
            return Err(TokenError::InvalidTimeWindow);
        }

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<JwtClaims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<JwtClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_roundtrip() {
        let codec = Hs256TokenCodec::new(b"test-secret");
        let sub = PrincipalId::new();

        let token = codec
            .issue(sub, "alice@example.com", Utc::now(), Duration::minutes(15))
            .unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.sub, sub);
        assert_eq!(claims.email, "alice@example.com");
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = Hs256TokenCodec::new(b"test-secret");

        let token = codec
            .issue(
                PrincipalId::new(),
                "bob@example.com",
                Utc::now() - Duration::hours(2),
                Duration::minutes(15),
            )
            .unwrap();

        assert_eq!(codec.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let codec = Hs256TokenCodec::new(b"test-secret");
        let other = Hs256TokenCodec::new(b"other-secret");

        let token = codec
            .issue(
                PrincipalId::new(),
                "carol@example.com",
                Utc::now(),
                Duration::minutes(15),
            )
            .unwrap();

        assert!(matches!(
            other.verify(&token).unwrap_err(),
            TokenError::Invalid(_)
        ));
    }

    #[test]
    fn zero_ttl_is_an_invalid_window() {
        let codec = Hs256TokenCodec::new(b"test-secret");
        let err = codec
            .issue(
                PrincipalId::new(),
                "dave@example.com",
                Utc::now(),
                Duration::seconds(0),
            )
            .unwrap_err();
        assert_eq!(err, TokenError::InvalidTimeWindow);
    }
}
