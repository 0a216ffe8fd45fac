use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

/// Separator between the identifier and the purpose tag in a token payload.
pub const DELIMITER: &str = "||";

/// Reasons a token can be refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, malformed payload, wrong flavour, or purpose mismatch.
    #[error("Token is invalid")]
    Invalid,

    /// The token verified but is older than the allowed age.
    #[error("Token has expired")]
    Expired,

    /// The identifier contains the payload delimiter.
    #[error("Identifier must not contain \"||\"")]
    InvalidIdentifier,

    /// The signing primitive failed.
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    /// `"{identifier}||{kind}"`
    data: String,
    /// Creation time in unix milliseconds, only present on timestamped tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ts: Option<i64>,
}

/// Signs and verifies purpose-bound tokens under one HMAC key.
///
/// Tokens are JWT compact strings (base64url segments joined by `.`), so they
/// can be dropped into URLs and hidden form fields without further encoding.
///
/// # Examples
///
/// ```
/// use pathfork::auth::TokenSigner;
///
/// let signer = TokenSigner::new(b"an-example-secret-that-is-long-enough");
/// let token = signer.sign("writer@example.com", "verify-email").unwrap();
///
/// assert_eq!(
///     signer.verify("verify-email", &token).unwrap(),
///     "writer@example.com"
/// );
/// assert!(signer.verify("reset-password", &token).is_err());
/// ```
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Signs `identifier` for the purpose `kind`, without an expiry.
    pub fn sign(&self, identifier: &str, kind: &str) -> Result<String, TokenError> {
        self.encode(identifier, kind, None)
    }

    /// Signs `identifier` for the purpose `kind`, stamped with the current time.
    pub fn sign_timestamped(&self, identifier: &str, kind: &str) -> Result<String, TokenError> {
        self.encode(identifier, kind, Some(now_millis()))
    }

    /// Verifies a plain token and returns the identifier it carries.
    ///
    /// Timestamped tokens are refused here; use [`Self::verify_timestamped`].
    pub fn verify(&self, kind: &str, token: &str) -> Result<String, TokenError> {
        let claims = self.decode(token)?;
        if claims.ts.is_some() {
            return Err(TokenError::Invalid);
        }

        identifier_for_kind(&claims.data, kind)
    }

    /// Verifies a timestamped token no older than `max_age_minutes`.
    ///
    /// An age equal to the limit already counts as expired, so a limit of
    /// zero refuses every token.
    pub fn verify_timestamped(
        &self,
        kind: &str,
        token: &str,
        max_age_minutes: u64,
    ) -> Result<String, TokenError> {
        let claims = self.decode(token)?;
        let created = claims.ts.ok_or(TokenError::Invalid)?;

        let age_ms = now_millis().saturating_sub(created);
        let max_age_ms = i64::try_from(max_age_minutes)
            .unwrap_or(i64::MAX)
            .saturating_mul(60_000);
        if age_ms >= max_age_ms {
            return Err(TokenError::Expired);
        }

        identifier_for_kind(&claims.data, kind)
    }

    fn encode(&self, identifier: &str, kind: &str, ts: Option<i64>) -> Result<String, TokenError> {
        if identifier.contains(DELIMITER) {
            return Err(TokenError::InvalidIdentifier);
        }

        let claims = TokenClaims {
            data: format!("{identifier}{DELIMITER}{kind}"),
            ts,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                TokenError::Invalid
            })
    }
}

fn identifier_for_kind(data: &str, kind: &str) -> Result<String, TokenError> {
    match data.split_once(DELIMITER) {
        Some((identifier, bound)) if bound == kind => Ok(identifier.to_string()),
        _ => Err(TokenError::Invalid),
    }
}

fn now_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"test-secret-test-secret-test-secret!")
    }

    #[test]
    fn plain_token_round_trips() {
        let signer = signer();
        let token = signer.sign("a@b.com", "verify-email").unwrap();

        assert_eq!(signer.verify("verify-email", &token).unwrap(), "a@b.com");
    }

    #[test]
    fn token_is_url_safe() {
        let token = signer().sign("a@b.com", "verify-email").unwrap();

        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        );
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let signer = signer();
        let token = signer.sign("a@b.com", "verify-email").unwrap();

        assert_eq!(signer.verify("csrf", &token), Err(TokenError::Invalid));
    }

    #[test]
    fn timestamped_token_round_trips_within_age() {
        let signer = signer();
        let token = signer.sign_timestamped("a@b.com", "csrf").unwrap();

        assert_eq!(signer.verify_timestamped("csrf", &token, 1).unwrap(), "a@b.com");
    }

    #[test]
    fn zero_max_age_is_always_expired() {
        let signer = signer();
        let token = signer.sign_timestamped("a@b.com", "csrf").unwrap();

        assert_eq!(
            signer.verify_timestamped("csrf", &token, 0),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn expiry_is_reported_before_kind_mismatch() {
        let signer = signer();
        let token = signer.sign_timestamped("a@b.com", "csrf").unwrap();

        assert_eq!(
            signer.verify_timestamped("reset-password", &token, 0),
            Err(TokenError::Expired)
        );
        assert_eq!(
            signer.verify_timestamped("reset-password", &token, 5),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn flavours_do_not_mix() {
        let signer = signer();
        let plain = signer.sign("a@b.com", "csrf").unwrap();
        let stamped = signer.sign_timestamped("a@b.com", "csrf").unwrap();

        assert_eq!(
            signer.verify_timestamped("csrf", &plain, 10),
            Err(TokenError::Invalid)
        );
        assert_eq!(signer.verify("csrf", &stamped), Err(TokenError::Invalid));
    }

    #[test]
    fn tampered_or_foreign_tokens_fail() {
        let token = signer().sign("a@b.com", "verify-email").unwrap();
        let other = TokenSigner::new(b"another-secret-another-secret-another");

        assert_eq!(other.verify("verify-email", &token), Err(TokenError::Invalid));

        let mut tampered = token.clone();
        tampered.push('x');
        assert_eq!(
            signer().verify("verify-email", &tampered),
            Err(TokenError::Invalid)
        );
        assert_eq!(signer().verify("verify-email", "garbage"), Err(TokenError::Invalid));
    }

    #[test]
    fn delimiter_in_identifier_is_refused() {
        assert_eq!(
            signer().sign("a||b", "verify-email"),
            Err(TokenError::InvalidIdentifier)
        );
        assert_eq!(
            signer().sign_timestamped("a||b", "csrf"),
            Err(TokenError::InvalidIdentifier)
        );
    }
}
