//! Error types shared by the whitelist core

use thiserror::Error;

/// Errors surfaced by the whitelist service and its stores
#[derive(Debug, Error)]
pub enum WhitelistError {
    /// Database could not be opened, read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The mint schedule is missing, unreadable or inconsistent
    #[error("Schedule configuration error: {0}")]
    Schedule(String),

    /// An environment variable holds an unusable value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Administrative operation called outside the permitted environment
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request payload failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A store call kept failing until the retry budget ran out
    #[error("Operation failed after {attempts} attempts")]
    RetryExhausted { attempts: u32 },
}

/// Errors raised inside the redb layer keep their kind; anything else is a
/// storage failure.
impl From<anyhow::Error> for WhitelistError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<WhitelistError>() {
            Ok(inner) => inner,
            Err(other) => WhitelistError::Storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, WhitelistError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_anyhow_keeps_inner_kind() {
        let wrapped = anyhow::Error::new(WhitelistError::Serialization("bad bytes".into()));
        assert!(matches!(
            WhitelistError::from(wrapped),
            WhitelistError::Serialization(msg) if msg == "bad bytes"
        ));

        let plain = anyhow!("Failed to begin read: locked");
        assert!(matches!(
            WhitelistError::from(plain),
            WhitelistError::Storage(msg) if msg == "Failed to begin read: locked"
        ));
    }
}
