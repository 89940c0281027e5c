use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, parsing, or validating the
/// debugger configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file was not found.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to create the default global config file.
    #[error("failed to create default config: {0}")]
    CreateDefault(String),

    /// TOML parsing failed.
    #[error("TOML parse error: {0}")]
    Parse(String),

    /// A config value failed validation.
    #[error("validation error: {field}: {message}")]
    Validation {
        /// The dotted field path (e.g. `target.main_class`).
        field: String,
        /// Human-readable description of the violation.
        message: String,
    },

    /// An I/O error occurred while reading or writing config files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_contains_path() {
        let err = ConfigError::NotFound(PathBuf::from("/tmp/jdbg.toml"));
        let msg = err.to_string();
        assert!(msg.contains("/tmp/jdbg.toml"));
        assert!(msg.contains("config file not found"));
    }

    #[test]
    fn create_default_display_contains_reason() {
        let err = ConfigError::CreateDefault("read-only file system".into());
        assert_eq!(
            err.to_string(),
            "failed to create default config: read-only file system"
        );
    }

    #[test]
    fn parse_display_contains_details() {
        let err = ConfigError::Parse("expected `]`".into());
        assert_eq!(err.to_string(), "TOML parse error: expected `]`");
    }

    #[test]
    fn validation_display_contains_field_and_message() {
        let err = ConfigError::Validation {
            field: "target.main_class".into(),
            message: "not a Java class name".into(),
        };
        assert_eq!(
            err.to_string(),
            "validation error: target.main_class: not a Java class name"
        );
    }

    #[test]
    fn io_error_display_contains_inner() {
        let inner = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no access");
        let err = ConfigError::from(inner);
        assert!(err.to_string().contains("no access"));
    }
}
