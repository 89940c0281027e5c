mod cli;
mod console;
mod launch;
mod repl;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use jdbg_config::validate::is_valid_class_name;
use jdbg_config::{load_config, load_file, Config};
use jdbg_debug::{spawn_event_pump, Controller, JdwpTarget, SessionSettings};
use jdbg_jdwp::JdwpClient;
use jdbg_platform::logging::{
    default_log_file_path, ensure_log_dir, log_level_to_filter, rotate_log_files,
    DEFAULT_MAX_LOG_FILES, DEFAULT_MAX_LOG_SIZE,
};
use jdbg_platform::paths::{DefaultPaths, PlatformPaths};

use crate::cli::{CliArgs, USAGE};
use crate::console::StdConsole;
use crate::launch::TargetProcess;

/// Send tracing output to a log file so it never interleaves with the
/// operator console. `RUST_LOG` overrides `level`.
fn init_logging(log_path: &Path, level: &str) {
    if let Err(e) = ensure_log_dir(log_path) {
        eprintln!("jdbg: cannot create log directory: {}", e);
        return;
    }
    if let Err(e) = rotate_log_files(log_path, DEFAULT_MAX_LOG_SIZE, DEFAULT_MAX_LOG_FILES) {
        eprintln!("jdbg: log rotation failed: {}", e);
    }
    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("jdbg: cannot open log file {}: {}", log_path.display(), e);
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(file))
        .with_env_filter(filter)
        .with_ansi(false)
        .init();
}

fn load_configuration(args: &CliArgs, paths: &dyn PlatformPaths) -> Result<Config> {
    let mut config = match &args.config_file {
        Some(path) => load_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let project_dir = std::env::current_dir().ok();
            match load_config(&paths.config_dir(), project_dir.as_deref()) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("jdbg: config error, using defaults: {}", e);
                    Config::default()
                }
            }
        }
    };
    config.session.breakpoints.extend(&args.breakpoints);
    if let Some(main_class) = &args.main_class {
        config.target.main_class = Some(main_class.clone());
    }
    Ok(config)
}

async fn debug_session(config: Config, main_class: String) -> Result<()> {
    let source_file = config.source_file(&main_class);
    if config.target.compile {
        launch::compile(&config.target, &source_file).await?;
    }

    let process = TargetProcess::spawn(&config.target, &main_class)?;
    let (client, raw_events) = JdwpClient::connect_with_retry(
        process.agent,
        Duration::from_millis(config.session.connect_timeout_ms),
        Duration::from_secs(config.session.request_timeout_secs),
    )
    .await
    .with_context(|| format!("failed to attach to {}", main_class))?;
    match client.version().await {
        Ok(version) => info!(
            "attached to {} {} (JDWP {}.{})",
            version.vm_name, version.vm_version, version.jdwp_major, version.jdwp_minor
        ),
        Err(e) => error!("version query failed: {}", e),
    }

    let target = Arc::new(JdwpTarget::new(client));
    let events = spawn_event_pump(target.clone(), raw_events);
    let settings = SessionSettings {
        main_class: main_class.clone(),
        source_file,
        breakpoints: config.session.breakpoints.clone(),
    };
    let (mut controller, listener) =
        Controller::start(target, events, Arc::new(StdConsole::new()), settings)
            .await
            .context("failed to prepare the debug session")?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let outcome = repl::run(&mut controller, stdin, &mut std::io::stdout()).await;

    listener.abort();
    process.shutdown().await;
    info!("session for {} ended", main_class);
    outcome
}

fn run() -> Result<()> {
    let args = CliArgs::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let paths = DefaultPaths::new().context("failed to detect platform paths")?;
    let config = load_configuration(&args, &paths)?;

    let log_path: PathBuf = config
        .log
        .file
        .clone()
        .unwrap_or_else(|| default_log_file_path(&paths));
    let level = match &args.log_level {
        Some(level) => log_level_to_filter(level),
        None => config.log.level.as_filter(),
    };
    init_logging(&log_path, level);

    let main_class = config
        .target
        .main_class
        .clone()
        .with_context(|| format!("no main class given\n{USAGE}"))?;
    if !is_valid_class_name(&main_class) {
        anyhow::bail!("invalid main class '{}'", main_class);
    }
    info!("jdbg starting for {}", main_class);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(debug_session(config, main_class))
}

fn main() {
    if let Err(e) = run() {
        eprintln!("jdbg: {:#}", e);
        std::process::exit(1);
    }
}
