use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Log verbosity level.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Most verbose; includes every protocol packet.
    Trace,
    /// Every debug event and command.
    Debug,
    /// Session lifecycle (default).
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// The `tracing` filter directive for this level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How the target program is built and launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Fully qualified name of the class whose `main` is debugged.
    #[serde(default)]
    pub main_class: Option<String>,
    /// Directory holding the main class's source file.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    /// Class path entries passed to the target VM.
    #[serde(default = "default_classpath")]
    pub classpath: Vec<PathBuf>,
    /// The `java` launcher.
    #[serde(default = "default_java")]
    pub java: String,
    /// The `javac` compiler.
    #[serde(default = "default_javac")]
    pub javac: String,
    /// Compile the main source file with debug information before launch.
    #[serde(default = "default_true")]
    pub compile: bool,
    /// Extra arguments for the target VM.
    #[serde(default)]
    pub vm_args: Vec<String>,
    /// Arguments passed to the target program's `main`.
    #[serde(default)]
    pub program_args: Vec<String>,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_classpath() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_java() -> String {
    "java".to_string()
}

fn default_javac() -> String {
    "javac".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            main_class: None,
            source_dir: default_source_dir(),
            classpath: default_classpath(),
            java: default_java(),
            javac: default_javac(),
            compile: true,
            vm_args: Vec::new(),
            program_args: Vec::new(),
        }
    }
}

/// Debug session behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Source lines registered as breakpoints before the first command.
    #[serde(default)]
    pub breakpoints: Vec<u32>,
    /// How long to keep retrying the connection to a freshly launched VM.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Timeout for a single protocol request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            breakpoints: Vec::new(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log verbosity level.
    #[serde(default)]
    pub level: LogLevel,
    /// Optional path to a log file.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
        }
    }
}

/// Top-level jdbg configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Target build and launch settings.
    #[serde(default)]
    pub target: TargetConfig,
    /// Session behaviour.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Path of the main class's source file, e.g. `src/pkg/Main.java`.
    pub fn source_file(&self, main_class: &str) -> PathBuf {
        let relative = format!("{}.java", main_class.replace('.', "/"));
        self.target.source_dir.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert!(cfg.target.main_class.is_none());
        assert_eq!(cfg.target.source_dir, PathBuf::from("."));
        assert_eq!(cfg.target.classpath, vec![PathBuf::from(".")]);
        assert_eq!(cfg.target.java, "java");
        assert_eq!(cfg.target.javac, "javac");
        assert!(cfg.target.compile);
        assert!(cfg.session.breakpoints.is_empty());
        assert_eq!(cfg.session.connect_timeout_ms, 10_000);
        assert_eq!(cfg.session.request_timeout_secs, 10);
        assert_eq!(cfg.log.level, LogLevel::Info);
        assert!(cfg.log.file.is_none());
    }

    #[test]
    fn serde_roundtrip_preserves_values() {
        let cfg = Config {
            target: TargetConfig {
                main_class: Some("demo.Main".into()),
                source_dir: PathBuf::from("src"),
                classpath: vec![PathBuf::from("out"), PathBuf::from("lib/x.jar")],
                java: "/opt/jdk/bin/java".into(),
                javac: "/opt/jdk/bin/javac".into(),
                compile: false,
                vm_args: vec!["-Xmx64m".into()],
                program_args: vec!["one".into()],
            },
            session: SessionConfig {
                breakpoints: vec![9, 14],
                connect_timeout_ms: 500,
                request_timeout_secs: 30,
            },
            log: LogConfig {
                level: LogLevel::Debug,
                file: Some(PathBuf::from("/tmp/jdbg.log")),
            },
        };
        let text = toml::to_string(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str("[session]\nbreakpoints = [3]\n").unwrap();
        assert_eq!(cfg.session.breakpoints, vec![3]);
        assert_eq!(cfg.session.request_timeout_secs, 10);
        assert_eq!(cfg.target, TargetConfig::default());
    }

    #[test]
    fn log_level_snake_case() {
        let cfg: Config = toml::from_str("[log]\nlevel = \"warn\"\n").unwrap();
        assert_eq!(cfg.log.level, LogLevel::Warn);
        assert_eq!(cfg.log.level.as_filter(), "warn");
    }

    #[test]
    fn source_file_maps_packages_to_directories() {
        let mut cfg = Config::default();
        cfg.target.source_dir = PathBuf::from("src");
        assert_eq!(
            cfg.source_file("demo.app.Main"),
            PathBuf::from("src/demo/app/Main.java")
        );
        assert_eq!(cfg.source_file("Test"), PathBuf::from("src/Test.java"));
    }
}
