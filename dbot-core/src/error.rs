//! Error types for the bot core.
//!
//! [`DbotError`] is the error every transport operation returns.

use thiserror::Error;

/// Top-level error for dbot (transport, config, IO).
#[derive(Error, Debug)]
pub enum DbotError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type for core operations; uses [`DbotError`].
pub type Result<T> = std::result::Result<T, DbotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = DbotError::Transport("chat not found".to_string());
        assert_eq!(err.to_string(), "Transport error: chat not found");
    }

    #[test]
    fn test_io_error_converts() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(DbotError::Io(_))));
    }
}
