use crate::config::AdminConfig;

/// Request header carrying the administrator credential.
pub const ADMIN_CREDENTIAL_HEADER: &str = "x-admin-password";

/// Gate in front of moderation routes, swappable for a real credential scheme.
pub trait AdminAuthorizer: Send + Sync {
    fn authorize(&self, credential: Option<&str>) -> Result<(), AuthorizationError>;
}

/// Why an admin request was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("admin access is not configured")]
    NotConfigured,
    #[error("admin credential missing")]
    MissingCredential,
    #[error("admin credential rejected")]
    Rejected,
}

/// Compares the presented credential with a single configured password.
#[derive(Clone, Default)]
pub struct SharedSecretAuthorizer {
    secret: Option<String>,
}

impl SharedSecretAuthorizer {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(config.password.clone())
    }
}

impl AdminAuthorizer for SharedSecretAuthorizer {
    fn authorize(&self, credential: Option<&str>) -> Result<(), AuthorizationError> {
        let secret = self
            .secret
            .as_deref()
            .ok_or(AuthorizationError::NotConfigured)?;
        match credential {
            None => Err(AuthorizationError::MissingCredential),
            Some(presented) if presented == secret => Ok(()),
            Some(_) => Err(AuthorizationError::Rejected),
        }
    }
}
