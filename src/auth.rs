use async_trait::async_trait;
use ulid::Ulid;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials for user {0}")]
    InvalidCredentials(Ulid),
}

/// Resolves the caller identity presented in a connection's startup frame.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, tenant: &str, user: Ulid, password: &str) -> Result<(), AuthError>;
}

/// Single shared password for every tenant and user.
#[derive(Debug)]
pub struct PasswordAuthenticator {
    password: String,
}

impl PasswordAuthenticator {
    pub fn new(password: String) -> Self {
        Self { password }
    }
}

#[async_trait]
impl Authenticator for PasswordAuthenticator {
    async fn authenticate(&self, _tenant: &str, user: Ulid, password: &str) -> Result<(), AuthError> {
        if password == self.password {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials(user))
        }
    }
}
