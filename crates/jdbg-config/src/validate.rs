use std::sync::OnceLock;

use regex::Regex;

use crate::config::Config;
use crate::error::ConfigError;

/// Dotted Java identifier, e.g. `Test` or `com.example.Main$Inner`.
const CLASS_NAME_PATTERN: &str = r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$";

fn class_name_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CLASS_NAME_PATTERN).ok()).as_ref()
}

/// Returns `true` if `name` looks like a loadable Java class name.
pub fn is_valid_class_name(name: &str) -> bool {
    class_name_regex().is_some_and(|re| re.is_match(name))
}

/// Validate a [`Config`], returning all detected violations.
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if let Some(main_class) = &config.target.main_class {
        if !is_valid_class_name(main_class) {
            errors.push(ConfigError::Validation {
                field: "target.main_class".to_string(),
                message: format!("'{main_class}' is not a Java class name"),
            });
        }
    }

    if config.target.java.trim().is_empty() {
        errors.push(ConfigError::Validation {
            field: "target.java".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    if config.target.javac.trim().is_empty() {
        errors.push(ConfigError::Validation {
            field: "target.javac".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    if let Some(line) = config.session.breakpoints.iter().find(|l| **l == 0) {
        errors.push(ConfigError::Validation {
            field: "session.breakpoints".to_string(),
            message: format!("line numbers start at 1, got {line}"),
        });
    }

    if config.session.connect_timeout_ms < 100 {
        errors.push(ConfigError::Validation {
            field: "session.connect_timeout_ms".to_string(),
            message: format!(
                "must be at least 100, got {}",
                config.session.connect_timeout_ms
            ),
        });
    }

    if !(1..=600).contains(&config.session.request_timeout_secs) {
        errors.push(ConfigError::Validation {
            field: "session.request_timeout_secs".to_string(),
            message: format!(
                "must be 1\u{2013}600, got {}",
                config.session.request_timeout_secs
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_default_config_passes() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn class_names_accepted_and_rejected() {
        assert!(is_valid_class_name("Test"));
        assert!(is_valid_class_name("com.example.Main"));
        assert!(is_valid_class_name("Outer$Inner"));
        assert!(!is_valid_class_name("1Test"));
        assert!(!is_valid_class_name("com..Main"));
        assert!(!is_valid_class_name("Test.java"));
        assert!(!is_valid_class_name(""));
    }

    #[test]
    fn bad_main_class_rejected() {
        let mut cfg = Config::default();
        cfg.target.main_class = Some("my-app".into());
        let errs = validate(&cfg).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].to_string().contains("target.main_class"));
    }

    #[test]
    fn zero_breakpoint_line_rejected() {
        let mut cfg = Config::default();
        cfg.session.breakpoints = vec![4, 0];
        let errs = validate(&cfg).unwrap_err();
        assert!(errs[0].to_string().contains("session.breakpoints"));
    }

    #[test]
    fn request_timeout_bounds() {
        let mut cfg = Config::default();
        cfg.session.request_timeout_secs = 0;
        assert!(validate(&cfg).is_err());
        cfg.session.request_timeout_secs = 600;
        assert!(validate(&cfg).is_ok());
        cfg.session.request_timeout_secs = 601;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn multiple_errors_returned() {
        let mut cfg = Config::default();
        cfg.target.java = String::new();
        cfg.target.javac = " ".into();
        cfg.session.connect_timeout_ms = 5;
        let errs = validate(&cfg).unwrap_err();
        assert_eq!(errs.len(), 3);
    }
}
