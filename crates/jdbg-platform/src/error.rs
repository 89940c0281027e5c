use thiserror::Error;

/// Errors that can occur during platform operations.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("path error: {0}")]
    Path(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_error_display_contains_message() {
        let err = PlatformError::Path("bad path".into());
        assert!(err.to_string().contains("path error"));
        assert!(err.to_string().contains("bad path"));
    }

    #[test]
    fn io_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "dir missing");
        let err = PlatformError::from(io_err);
        assert!(matches!(err, PlatformError::Io(_)));
        assert!(err.to_string().contains("dir missing"));
    }
}
