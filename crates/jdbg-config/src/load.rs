use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;
use crate::merge::merge_configs;
use crate::validate::validate;

/// Name of the per-project configuration directory.
const PROJECT_DIR_NAME: &str = ".jdbg";

/// Content written into a newly-created default config file.
const DEFAULT_CONFIG_CONTENT: &str = r#"# jdbg configuration
# Uncomment and edit settings below to override defaults.

# [target]
# main_class = "Test"
# source_dir = "."
# classpath = ["."]
# java = "java"
# javac = "javac"
# compile = true
# vm_args = []
# program_args = []

# [session]
# breakpoints = []
# connect_timeout_ms = 10000
# request_timeout_secs = 10

# [log]
# level = "info"
"#;

/// Load and merge configuration.
///
/// 1. Reads the global config from `config_dir/config.toml`, creating it
///    with commented-out defaults if it does not exist.
/// 2. Optionally reads a project config from `.jdbg/config.toml`, walking
///    upward from `project_dir`.
/// 3. Merges: `Config::default() <- global <- project`.
/// 4. Validates the merged result.
pub fn load_config(config_dir: &Path, project_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let global_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir)?;
    }

    if !global_path.exists() {
        std::fs::write(&global_path, DEFAULT_CONFIG_CONTENT)
            .map_err(|e| ConfigError::CreateDefault(e.to_string()))?;
        tracing::info!("created default config at {}", global_path.display());
    }

    let mut config = Config::default();

    let global_content = std::fs::read_to_string(&global_path)?;
    if has_non_comment_content(&global_content) {
        config = merge_configs(&config, &global_content)?;
    }

    if let Some(proj) = project_dir {
        if let Some(project_path) = find_project_config(proj) {
            tracing::debug!("merging project config {}", project_path.display());
            let project_content = std::fs::read_to_string(&project_path)?;
            config = merge_configs(&config, &project_content)?;
        }
    }

    first_violation(validate(&config))?;
    Ok(config)
}

/// Load a single explicit config file on top of the defaults.
pub fn load_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let config = merge_configs(&Config::default(), &content)?;
    first_violation(validate(&config))?;
    Ok(config)
}

/// Walk from `start` upward looking for `.jdbg/config.toml`.
fn find_project_config(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(PROJECT_DIR_NAME).join("config.toml");
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Returns `true` when the content has at least one non-empty,
/// non-comment line.
fn has_non_comment_content(content: &str) -> bool {
    content.lines().any(|l| {
        let trimmed = l.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    })
}

fn first_violation(result: Result<(), Vec<ConfigError>>) -> Result<(), ConfigError> {
    result.map_err(|errors| {
        errors
            .into_iter()
            .next()
            .unwrap_or_else(|| ConfigError::Validation {
                field: "unknown".to_string(),
                message: "validation failed".to_string(),
            })
    })
}

/// Parse a TOML string directly into a validated [`Config`].
pub fn load_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
    first_violation(validate(&config))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_config_creates_default_when_missing() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");

        let config = load_config(&cfg_dir, None).unwrap();
        assert_eq!(config, Config::default());
        assert!(cfg_dir.join("config.toml").exists());
    }

    #[test]
    fn load_config_reads_existing_global() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[target]\nmain_class = \"Test\"\n",
        )
        .unwrap();

        let config = load_config(&cfg_dir, None).unwrap();
        assert_eq!(config.target.main_class.as_deref(), Some("Test"));
        assert_eq!(config.target.javac, "javac");
    }

    #[test]
    fn load_config_merges_project_over_global() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[session]\nbreakpoints = [3]\n[log]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let proj_dir = tmp.path().join("project");
        let dot_dir = proj_dir.join(".jdbg");
        std::fs::create_dir_all(&dot_dir).unwrap();
        std::fs::write(dot_dir.join("config.toml"), "[session]\nbreakpoints = [9, 12]\n")
            .unwrap();

        let config = load_config(&cfg_dir, Some(&proj_dir)).unwrap();
        assert_eq!(config.session.breakpoints, vec![9, 12]);
        assert_eq!(config.log.level, crate::config::LogLevel::Debug);
    }

    #[test]
    fn load_config_rejects_invalid_project_values() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        let proj_dir = tmp.path().join("project");
        std::fs::create_dir_all(proj_dir.join(".jdbg")).unwrap();
        std::fs::write(
            proj_dir.join(".jdbg").join("config.toml"),
            "[session]\nrequest_timeout_secs = 0\n",
        )
        .unwrap();

        let result = load_config(&cfg_dir, Some(&proj_dir));
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn load_file_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = load_file(&tmp.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn load_file_reads_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("debug.toml");
        std::fs::write(&path, "[target]\ncompile = false\n").unwrap();
        let config = load_file(&path).unwrap();
        assert!(!config.target.compile);
    }

    #[test]
    fn load_from_str_parses_and_validates() {
        let config = load_from_str("[target]\nmain_class = \"demo.Main\"\n").unwrap();
        assert_eq!(config.target.main_class.as_deref(), Some("demo.Main"));
        assert!(load_from_str("{{bad}}").is_err());
        assert!(load_from_str("[target]\nmain_class = \"9lives\"\n").is_err());
    }

    #[test]
    fn find_project_config_walks_up() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("repo");
        std::fs::create_dir_all(root.join(".jdbg")).unwrap();
        std::fs::write(root.join(".jdbg").join("config.toml"), "").unwrap();
        let deep = root.join("src").join("pkg");
        std::fs::create_dir_all(&deep).unwrap();

        let found = find_project_config(&deep).unwrap();
        assert!(found.ends_with(".jdbg/config.toml"));
    }

    #[test]
    fn default_config_content_is_comment_only() {
        assert!(!has_non_comment_content(DEFAULT_CONFIG_CONTENT));
        assert!(has_non_comment_content("# c\n[log]\n"));
    }
}
