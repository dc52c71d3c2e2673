//! JWT token management

use chrono::Utc;
use gatekeeper_db::AccountRole;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthError, TokenRejection};

/// Upper bound on token lifetime (24 hours)
pub const MAX_TOKEN_TTL_SECS: i64 = 24 * 3600;

/// Largest clock-skew tolerance accepted on `exp` (5 minutes)
pub const MAX_CLOCK_SKEW_SECS: u64 = 300;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    /// Account role
    pub role: AccountRole,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Numeric account ID carried in `sub`
    pub fn subject_id(&self) -> Result<i64, TokenRejection> {
        self.sub.parse().map_err(|_| TokenRejection::Malformed)
    }
}

/// Reject lifetimes that are non-positive or longer than a day
pub fn validate_ttl(ttl_secs: i64) -> Result<(), AuthError> {
    if ttl_secs <= 0 || ttl_secs > MAX_TOKEN_TTL_SECS {
        return Err(AuthError::Configuration(format!(
            "token TTL must be between 1 and {} seconds, got {}",
            MAX_TOKEN_TTL_SECS, ttl_secs
        )));
    }
    Ok(())
}

/// JWT manager for token generation and validation
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    leeway_secs: u64,
}

impl JwtManager {
    /// Create a new JWT manager
    ///
    /// `leeway_secs` is the clock-skew tolerance applied to `exp`, at most
    /// [`MAX_CLOCK_SKEW_SECS`].
    pub fn new(secret: &str, leeway_secs: u64) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration(
                "JWT signing secret must not be empty".to_string(),
            ));
        }
        if leeway_secs > MAX_CLOCK_SKEW_SECS {
            return Err(AuthError::Configuration(format!(
                "clock skew tolerance must be at most {} seconds, got {}",
                MAX_CLOCK_SKEW_SECS, leeway_secs
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            leeway_secs,
        })
    }

    /// Issue a signed token for an account
    pub fn issue(
        &self,
        subject_id: i64,
        role: AccountRole,
        ttl_secs: i64,
    ) -> Result<String, AuthError> {
        validate_ttl(ttl_secs)?;

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject_id.to_string(),
            role,
            iat: now,
            exp: now + ttl_secs,
        };

        debug!("Issuing token for account: {}", subject_id);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {}", e)))
    }

    /// Verify a token's signature and expiry and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenRejection> {
        if token.split('.').count() != 3 {
            return Err(TokenRejection::Malformed);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(map_jwt_error)?;

        // The library accepts exp == now; a token is dead at its expiry instant
        let now = Utc::now().timestamp();
        if token_data.claims.exp <= now - self.leeway_secs as i64 {
            return Err(TokenRejection::Expired);
        }

        token_data.claims.subject_id()?;
        Ok(token_data.claims)
    }
}

/// Maps jsonwebtoken errors to rejection reasons
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> TokenRejection {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => TokenRejection::BadSignature,
        ErrorKind::ExpiredSignature => TokenRejection::Expired,
        _ => TokenRejection::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-long-enough";

    #[test]
    fn test_token_issue_and_verify() {
        let manager = JwtManager::new(SECRET, 0).unwrap();

        let token = manager.issue(1, AccountRole::Admin, 3600).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = manager.verify(&token).unwrap();
        assert_eq!(claims.sub, "1");
        assert_eq!(claims.subject_id().unwrap(), 1);
        assert_eq!(claims.role, AccountRole::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_ttl_bounds() {
        let manager = JwtManager::new(SECRET, 0).unwrap();

        assert!(matches!(
            manager.issue(1, AccountRole::User, 0),
            Err(AuthError::Configuration(_))
        ));
        assert!(matches!(
            manager.issue(1, AccountRole::User, -5),
            Err(AuthError::Configuration(_))
        ));
        assert!(matches!(
            manager.issue(1, AccountRole::User, MAX_TOKEN_TTL_SECS + 1),
            Err(AuthError::Configuration(_))
        ));
        assert!(manager.issue(1, AccountRole::User, MAX_TOKEN_TTL_SECS).is_ok());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            JwtManager::new("", 0),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn test_expired_token_with_valid_signature() {
        let manager = JwtManager::new(SECRET, 0).unwrap();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "1".to_string(),
            role: AccountRole::Admin,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::default(), &claims, &manager.encoding_key).unwrap();

        assert_eq!(manager.verify(&token), Err(TokenRejection::Expired));
    }

    #[test]
    fn test_token_dead_at_exact_expiry() {
        let manager = JwtManager::new(SECRET, 0).unwrap();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "1".to_string(),
            role: AccountRole::User,
            iat: now - 60,
            exp: now,
        };
        let token = encode(&Header::default(), &claims, &manager.encoding_key).unwrap();

        assert_eq!(manager.verify(&token), Err(TokenRejection::Expired));
    }

    #[test]
    fn test_oversized_leeway_rejected() {
        for leeway in [MAX_CLOCK_SKEW_SECS + 1, 365 * 24 * 3600, u64::MAX] {
            assert!(
                matches!(
                    JwtManager::new(SECRET, leeway),
                    Err(AuthError::Configuration(_))
                ),
                "leeway {} should be rejected",
                leeway
            );
        }
        assert!(JwtManager::new(SECRET, MAX_CLOCK_SKEW_SECS).is_ok());
    }

    #[test]
    fn test_day_old_token_rejected_at_max_leeway() {
        let manager = JwtManager::new(SECRET, MAX_CLOCK_SKEW_SECS).unwrap();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "1".to_string(),
            role: AccountRole::Admin,
            iat: now - 2 * 86400,
            exp: now - 86400,
        };
        let token = encode(&Header::default(), &claims, &manager.encoding_key).unwrap();

        assert_eq!(manager.verify(&token), Err(TokenRejection::Expired));
    }

    #[test]
    fn test_leeway_tolerates_small_skew() {
        let manager = JwtManager::new(SECRET, 30).unwrap();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "1".to_string(),
            role: AccountRole::User,
            iat: now - 100,
            exp: now - 5,
        };
        let token = encode(&Header::default(), &claims, &manager.encoding_key).unwrap();

        assert!(manager.verify(&token).is_ok());
    }

    #[test]
    fn test_wrong_key_is_bad_signature() {
        let issuer = JwtManager::new(SECRET, 0).unwrap();
        let verifier = JwtManager::new("another-secret-entirely-different", 0).unwrap();

        let token = issuer.issue(1, AccountRole::Admin, 3600).unwrap();
        assert_eq!(verifier.verify(&token), Err(TokenRejection::BadSignature));
    }

    #[test]
    fn test_malformed_tokens() {
        let manager = JwtManager::new(SECRET, 0).unwrap();

        assert_eq!(manager.verify("invalid-token"), Err(TokenRejection::Malformed));
        assert_eq!(manager.verify(""), Err(TokenRejection::Malformed));
        assert_eq!(manager.verify("a.b"), Err(TokenRejection::Malformed));
        assert_eq!(manager.verify("a.b.c.d"), Err(TokenRejection::Malformed));
        assert_eq!(manager.verify("!!!.@@@.###"), Err(TokenRejection::Malformed));
    }

    #[test]
    fn test_non_numeric_subject_is_malformed() {
        let manager = JwtManager::new(SECRET, 0).unwrap();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "not-a-number".to_string(),
            role: AccountRole::User,
            iat: now,
            exp: now + 600,
        };
        let token = encode(&Header::default(), &claims, &manager.encoding_key).unwrap();

        assert_eq!(manager.verify(&token), Err(TokenRejection::Malformed));
    }

    #[test]
    fn test_tampered_claims_fail_signature() {
        let manager = JwtManager::new(SECRET, 0).unwrap();
        let user_token = manager.issue(2, AccountRole::User, 3600).unwrap();
        let admin_token = manager.issue(2, AccountRole::Admin, 3600).unwrap();

        // Splice the admin claims onto the user token's signature
        let user_parts: Vec<&str> = user_token.split('.').collect();
        let admin_parts: Vec<&str> = admin_token.split('.').collect();
        let forged = format!("{}.{}.{}", user_parts[0], admin_parts[1], user_parts[2]);

        assert_eq!(manager.verify(&forged), Err(TokenRejection::BadSignature));
    }
}
