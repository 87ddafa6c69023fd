//! services/api/src/adapters/token.rs
//!
//! HS256 JWT implementation of the `TokenService` port.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use libre_research_core::domain::User;
use libre_research_core::ports::{PortError, PortResult, TokenService};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct JwtTokenAdapter {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtTokenAdapter {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }
}

impl TokenService for JwtTokenAdapter {
    fn issue_token(&self, user: &User) -> PortResult<String> {
        let now = Utc::now().timestamp();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or_else(|| {
                error!("Token lifetime of {:?} overflows the expiry timestamp", self.ttl);
                PortError::Unexpected("Failed to issue token".to_string())
            })?;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now,
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to sign token: {:?}", e);
            PortError::Unexpected("Failed to issue token".to_string())
        })
    }

    fn verify_token(&self, token: &str) -> PortResult<Uuid> {
        let data = decode::<Claims>(token, &self.decoding_key, &Self::validation()).map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            PortError::Unauthorized(format!("Could not validate credentials: {}", e))
        })?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| {
            PortError::Unauthorized("Could not validate credentials: malformed subject".to_string())
        })
    }
}
