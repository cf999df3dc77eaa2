//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a settings file could not be turned into [`MatchfeedSettings`](crate::MatchfeedSettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON, or a field has the wrong shape.
    #[error("malformed settings in {}: {source}", path.display())]
    Json {
        /// File that failed.
        path: PathBuf,
        /// Parser error, with line and column when available.
        #[source]
        source: serde_json::Error,
    },
    /// A value parsed but cannot be served (zero capacity, bad `wsPath`).
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

impl SettingsError {
    pub(crate) fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_file() {
        let err = SettingsError::Io {
            path: PathBuf::from("/etc/matchfeed.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/etc/matchfeed.json"));
        assert!(msg.contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn json_error_names_the_file() {
        let source = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err = SettingsError::json(std::path::Path::new("settings.json"), source);
        assert!(matches!(err, SettingsError::Json { .. }));
        assert!(err.to_string().starts_with("malformed settings in settings.json"));
    }

    #[test]
    fn invalid_value_display() {
        let err = SettingsError::InvalidValue("wsPath must start with '/'".into());
        assert_eq!(
            err.to_string(),
            "invalid settings value: wsPath must start with '/'"
        );
    }
}
