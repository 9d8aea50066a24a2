use thiserror::Error;

/// Main error type for Magnetar operations
#[derive(Error, Debug)]
pub enum MagnetarError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Snapshot version {actual} is not supported (expected <= {expected})")]
    IncompatibleSnapshot { expected: u32, actual: u32 },

    #[error("Update pipeline is stopped")]
    PipelineClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Magnetar operations
pub type Result<T> = std::result::Result<T, MagnetarError>;

impl MagnetarError {
    /// Restore treats corrupt snapshots the same as plain I/O failures:
    /// the caller logs and starts with an empty index.
    pub fn is_restore_recoverable(&self) -> bool {
        matches!(
            self,
            MagnetarError::Io(_)
                | MagnetarError::CorruptSnapshot(_)
                | MagnetarError::IncompatibleSnapshot { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MagnetarError::Config("missing feature_spaces".to_string());
        assert_eq!(err.to_string(), "Config error: missing feature_spaces");
    }

    #[test]
    fn test_restore_recoverable() {
        assert!(MagnetarError::CorruptSnapshot("bad magic".into()).is_restore_recoverable());
        assert!(MagnetarError::IncompatibleSnapshot {
            expected: 1,
            actual: 9
        }
        .is_restore_recoverable());
        assert!(!MagnetarError::PipelineClosed.is_restore_recoverable());
    }
}
