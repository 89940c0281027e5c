//! jdbg-platform: per-user directories and log-file housekeeping.

pub mod error;
pub mod logging;
pub mod paths;

pub use error::PlatformError;
pub use paths::{DefaultPaths, PlatformPaths};
