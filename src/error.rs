//! Error types for the deployment composer.
//!
//! No `anyhow` leakage. Explicit, typed errors.

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("invalid deployment request: {0}")]
    Validation(String),

    #[error("network provisioning failed: {0}")]
    Network(String),

    #[error("secret store operation failed: {0}")]
    Secret(String),

    #[error("database provisioning failed: {0}")]
    Database(String),

    #[error("certificate issuance failed: {0}")]
    Certificate(String),

    #[error("container service provisioning failed: {0}")]
    Service(String),

    #[error("DNS record creation failed: {0}")]
    Dns(String),

    #[error("invalid topology: {0}")]
    Topology(String),

    #[error("plan rendering failed: {0}")]
    Render(String),

    #[error("invalid composer state: {0}")]
    InvalidState(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl ComposeError {
    /// Whether this error might be recoverable by retrying the same
    /// provisioning request through the external engine.
    ///
    /// Validation, state, and topology errors are deterministic and will
    /// fail the same way again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ComposeError::Network(_)
                | ComposeError::Secret(_)
                | ComposeError::Database(_)
                | ComposeError::Certificate(_)
                | ComposeError::Service(_)
                | ComposeError::Dns(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ComposeError::Validation("customDomain.email is empty".to_string());
        assert_eq!(
            err.to_string(),
            "invalid deployment request: customDomain.email is empty"
        );

        let err = ComposeError::Database("cluster timed out".to_string());
        assert_eq!(
            err.to_string(),
            "database provisioning failed: cluster timed out"
        );

        let err = ComposeError::Topology("duplicate node id".to_string());
        assert_eq!(err.to_string(), "invalid topology: duplicate node id");

        let err = ComposeError::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "storage error: disk full");

        let err = ComposeError::Crypto("wrong password".to_string());
        assert_eq!(err.to_string(), "crypto error: wrong password");
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(ComposeError::Network("test".to_string()).is_recoverable());
        assert!(ComposeError::Secret("test".to_string()).is_recoverable());
        assert!(ComposeError::Database("test".to_string()).is_recoverable());
        assert!(ComposeError::Certificate("test".to_string()).is_recoverable());
        assert!(ComposeError::Service("test".to_string()).is_recoverable());
        assert!(ComposeError::Dns("test".to_string()).is_recoverable());

        assert!(!ComposeError::Validation("test".to_string()).is_recoverable());
        assert!(!ComposeError::Topology("test".to_string()).is_recoverable());
        assert!(!ComposeError::InvalidState("test".to_string()).is_recoverable());
        assert!(!ComposeError::Storage("test".to_string()).is_recoverable());
        assert!(!ComposeError::Crypto("test".to_string()).is_recoverable());
        assert!(!ComposeError::Parse("test".to_string()).is_recoverable());
    }
}
