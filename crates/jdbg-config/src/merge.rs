use crate::config::Config;
use crate::error::ConfigError;

/// Top-level tables a config layer may contain.
pub const SECTIONS: [&str; 3] = ["target", "session", "log"];

/// Layer an overlay TOML fragment on top of `base`.
///
/// Every section is a flat table, so layering works one key at a time: a key
/// present in the overlay replaces the base value whole. Lists are not
/// concatenated, so a project `[session] breakpoints` or `[target] classpath`
/// replaces the global list. Command-line breakpoints are appended after all
/// layers by the binary.
///
/// # Errors
///
/// `Parse` for malformed TOML or values of the wrong type, `Validation` for
/// an unknown section or a section that is not a table.
pub fn merge_configs(base: &Config, overlay_toml: &str) -> Result<Config, ConfigError> {
    let overlay: toml::Table =
        toml::from_str(overlay_toml).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let mut merged = match toml::Value::try_from(base) {
        Ok(toml::Value::Table(table)) => table,
        Ok(_) => toml::Table::new(),
        Err(e) => return Err(ConfigError::Parse(e.to_string())),
    };

    for (section, value) in overlay {
        let toml::Value::Table(keys) = value else {
            return Err(section_error(&section, "expected a table"));
        };
        if !SECTIONS.contains(&section.as_str()) {
            return Err(section_error(&section, "unknown section"));
        }
        let slot = merged
            .entry(section)
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if let toml::Value::Table(existing) = slot {
            existing.extend(keys);
        }
    }

    toml::Value::Table(merged)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
}

fn section_error(section: &str, message: &str) -> ConfigError {
    ConfigError::Validation {
        field: section.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn merge_empty_overlay_returns_base() {
        let base = Config::default();
        let merged = merge_configs(&base, "").expect("merge empty");
        assert_eq!(merged, base);
    }

    #[test]
    fn merge_overrides_main_class_keeps_rest() {
        let base = Config::default();
        let merged = merge_configs(&base, "[target]\nmain_class = \"Test\"\n").expect("merge");
        assert_eq!(merged.target.main_class.as_deref(), Some("Test"));
        assert_eq!(merged.target.java, "java");
        assert!(merged.target.compile);
    }

    #[test]
    fn project_breakpoints_replace_global_list() {
        let global = merge_configs(
            &Config::default(),
            "[session]\nbreakpoints = [1, 2]\nconnect_timeout_ms = 900\n\
             [target]\nclasspath = [\"a\"]\n",
        )
        .expect("global layer");
        let merged = merge_configs(
            &global,
            "[session]\nbreakpoints = [7]\n[target]\nclasspath = [\"b\"]\n",
        )
        .expect("project layer");
        assert_eq!(merged.session.breakpoints, vec![7]);
        assert_eq!(merged.target.classpath, vec![PathBuf::from("b")]);
        // Keys the project layer leaves out keep the global value.
        assert_eq!(merged.session.connect_timeout_ms, 900);
    }

    #[test]
    fn empty_list_clears_inherited_breakpoints() {
        let mut base = Config::default();
        base.session.breakpoints = vec![3, 4];
        let merged = merge_configs(&base, "[session]\nbreakpoints = []\n").expect("merge");
        assert!(merged.session.breakpoints.is_empty());
    }

    #[test]
    fn unknown_section_is_rejected() {
        let err = merge_configs(&Config::default(), "[debugger]\nport = 5005\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "debugger"));
    }

    #[test]
    fn scalar_section_is_rejected() {
        let err = merge_configs(&Config::default(), "session = 3\n").unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref message, .. } if message.contains("table"))
        );
    }

    #[test]
    fn wrong_value_type_is_parse_error() {
        let result = merge_configs(&Config::default(), "[session]\nbreakpoints = \"7\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn merge_invalid_overlay_returns_parse_error() {
        let result = merge_configs(&Config::default(), "{{invalid}}");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn merge_preserves_unrelated_sections() {
        let base = Config::default();
        let merged = merge_configs(&base, "[log]\nlevel = \"debug\"\n").expect("merge");
        assert_eq!(merged.target, base.target);
        assert_eq!(merged.session, base.session);
    }
}
