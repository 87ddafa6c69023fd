//! crates/libre_research_core/src/auth.rs
//!
//! Account registration, credential checks, and bearer-token authentication.

use crate::domain::User;
use crate::ports::{DatabaseService, PasswordService, PortError, PortResult, TokenService};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Incorrect email or password";

/// Orchestrates the user store, the password hasher, and the token signer.
#[derive(Clone)]
pub struct AuthService {
    db: Arc<dyn DatabaseService>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
}

impl AuthService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            db,
            passwords,
            tokens,
        }
    }

    /// Creates an account. Emails are compared case-insensitively.
    pub async fn register(&self, email: &str, password: &str) -> PortResult<User> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(PortError::Validation("Password must not be empty".to_string()));
        }

        let hashed = self.passwords.hash_password(password)?;
        let user = self.db.create_user(&email, &hashed).await.map_err(|e| match e {
            PortError::Conflict(_) => PortError::Conflict("Email already registered".to_string()),
            other => other,
        })?;

        info!(user_id = %user.id, "Registered new user");
        Ok(user)
    }

    /// Checks credentials and issues a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> PortResult<String> {
        let email = email.trim().to_lowercase();
        let credentials = match self.db.get_user_by_email(&email).await {
            Ok(credentials) => credentials,
            Err(PortError::NotFound(_)) => {
                return Err(PortError::Unauthorized(INVALID_CREDENTIALS.to_string()))
            }
            Err(e) => return Err(e),
        };

        if !self
            .passwords
            .verify_password(password, &credentials.hashed_password)
        {
            warn!(user_id = %credentials.user.id, "Rejected login with wrong password");
            return Err(PortError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.tokens.issue_token(&credentials.user)
    }

    /// Resolves a bearer token to the user it was issued for.
    pub async fn authenticate(&self, token: &str) -> PortResult<User> {
        let user_id = self.tokens.verify_token(token)?;
        match self.db.get_user_by_id(user_id).await {
            Ok(user) => Ok(user),
            Err(PortError::NotFound(_)) => {
                Err(PortError::Unauthorized("User not found".to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        self.db.get_user_by_id(user_id).await
    }
}

/// Trims and lower-cases an email, rejecting anything that is not `local@domain.tld`.
fn normalize_email(email: &str) -> PortResult<String> {
    let email = email.trim().to_lowercase();
    let invalid = || PortError::Validation(format!("'{}' is not a valid email address", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let well_formed = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);

    if well_formed {
        Ok(email)
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeDb, FakePasswords, FakeTokens};
    use pretty_assertions::assert_eq;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(FakeDb::default()),
            Arc::new(FakePasswords),
            Arc::new(FakeTokens),
        )
    }

    #[tokio::test]
    async fn registered_user_can_log_in_and_authenticate() {
        let auth = service();
        let user = auth.register("Ada@Example.com", "hunter22").await.unwrap();
        assert_eq!(user.email, "ada@example.com");

        let token = auth.login("ada@example.com", "hunter22").await.unwrap();
        let resolved = auth.authenticate(&token).await.unwrap();
        assert_eq!(resolved, user);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let auth = service();
        auth.register("ada@example.com", "pw").await.unwrap();
        let err = auth.register(" ADA@example.com ", "other").await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let auth = service();
        auth.register("ada@example.com", "pw").await.unwrap();

        let wrong = auth.login("ada@example.com", "nope").await.unwrap_err();
        let unknown = auth.login("bob@example.com", "pw").await.unwrap_err();
        assert_eq!(wrong, unknown);
        assert!(matches!(wrong, PortError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let err = service().authenticate("not-a-token").await.unwrap_err();
        assert!(matches!(err, PortError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn token_for_vanished_user_is_unauthorized() {
        let auth = service();
        let token = format!("token:{}", Uuid::new_v4());
        let err = auth.authenticate(&token).await.unwrap_err();
        assert_eq!(err, PortError::Unauthorized("User not found".to_string()));
    }

    #[tokio::test]
    async fn rejects_malformed_input() {
        let auth = service();
        for email in ["", "no-at-sign", "@example.com", "a@nodot", "a@.com", "a b@x.com"] {
            let err = auth.register(email, "pw").await.unwrap_err();
            assert!(matches!(err, PortError::Validation(_)), "accepted {email:?}");
        }
        let err = auth.register("ada@example.com", "").await.unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[tokio::test]
    async fn profiles_are_looked_up_by_id() {
        let auth = service();
        let user = auth.register("ada@example.com", "pw").await.unwrap();
        assert_eq!(auth.get_user(user.id).await.unwrap(), user);

        let err = auth.get_user(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }
}
