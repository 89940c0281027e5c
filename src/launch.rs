//! Compiling and launching the target VM.

use std::ffi::OsString;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use jdbg_config::TargetConfig;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command as TokioCommand};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

/// Grace period for the target to exit on its own after `quit`.
const EXIT_GRACE_SECS: u64 = 2;

/// Compile the main source file with debug information.
pub async fn compile(target: &TargetConfig, source: &Path) -> Result<()> {
    let mut args: Vec<OsString> = vec!["-g".into(), "-d".into(), target.source_dir.clone().into()];
    if !target.classpath.is_empty() {
        args.push("-cp".into());
        args.push(classpath(target)?);
    }
    args.push(source.as_os_str().to_owned());

    tracing::info!("compiling {}", source.display());
    let status = TokioCommand::new(&target.javac)
        .args(&args)
        .stdin(Stdio::null())
        .status()
        .await
        .with_context(|| format!("failed to run {}", target.javac))?;
    if !status.success() {
        bail!("Error compiling {} ({})", source.display(), status);
    }
    Ok(())
}

/// Pick a port nobody listens on by binding port 0.
pub fn free_port() -> Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .context("failed to find a free port for the debug agent")?;
    Ok(listener.local_addr()?.port())
}

fn classpath(target: &TargetConfig) -> Result<OsString> {
    std::env::join_paths(&target.classpath).context("invalid classpath entry")
}

/// Arguments for `java`: the suspended debug agent, VM options, class path,
/// main class, program arguments.
pub fn java_args(target: &TargetConfig, main_class: &str, port: u16) -> Result<Vec<OsString>> {
    let mut args: Vec<OsString> = vec![format!(
        "-agentlib:jdwp=transport=dt_socket,server=y,suspend=y,address=127.0.0.1:{port}"
    )
    .into()];
    args.extend(target.vm_args.iter().map(OsString::from));
    if !target.classpath.is_empty() {
        args.push("-cp".into());
        args.push(classpath(target)?);
    }
    args.push(main_class.into());
    args.extend(target.program_args.iter().map(OsString::from));
    Ok(args)
}

/// A running target VM and the tasks relaying its output.
pub struct TargetProcess {
    child: Child,
    relays: Vec<JoinHandle<()>>,
    /// Where its debug agent listens.
    pub agent: SocketAddr,
}

impl TargetProcess {
    /// Start `main_class` halted under the debug agent.
    pub fn spawn(target: &TargetConfig, main_class: &str) -> Result<Self> {
        let port = free_port()?;
        let args = java_args(target, main_class, port)?;
        tracing::info!("launching {} {:?}", target.java, args);

        let mut child = TokioCommand::new(&target.java)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to launch {}", target.java))?;

        let mut relays = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            relays.push(relay(stdout, tokio::io::stdout(), "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            relays.push(relay(stderr, tokio::io::stderr(), "stderr"));
        }

        Ok(Self {
            child,
            relays,
            agent: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
        })
    }

    /// Wait briefly for the VM to exit, then kill it.
    pub async fn shutdown(mut self) {
        match timeout(Duration::from_secs(EXIT_GRACE_SECS), self.child.wait()).await {
            Ok(Ok(status)) => tracing::info!("target exited with {}", status),
            Ok(Err(e)) => tracing::warn!("waiting for target failed: {}", e),
            Err(_) => {
                tracing::warn!("target still running after {}s, killing it", EXIT_GRACE_SECS);
                if let Err(e) = self.child.kill().await {
                    tracing::error!("failed to kill target: {}", e);
                }
            }
        }
        // Drain whatever output is left.
        for relay in self.relays {
            let _ = relay.await;
        }
    }
}

/// Copy a child stream to ours byte for byte until it closes.
fn relay<R, W>(mut from: R, mut to: W, name: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        match tokio::io::copy(&mut from, &mut to).await {
            Ok(n) => tracing::debug!("target {} closed after {} bytes", name, n),
            Err(e) => tracing::warn!("relaying target {} failed: {}", name, e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn launch_java_args_order() {
        let target = TargetConfig {
            vm_args: vec!["-Xmx64m".into()],
            program_args: vec!["a".into(), "b".into()],
            classpath: vec![PathBuf::from("out")],
            ..TargetConfig::default()
        };
        let args = java_args(&target, "demo.Main", 5005).unwrap();
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-agentlib:jdwp=transport=dt_socket,server=y,suspend=y,address=127.0.0.1:5005",
                "-Xmx64m",
                "-cp",
                "out",
                "demo.Main",
                "a",
                "b",
            ]
        );
    }

    #[test]
    fn launch_free_port_is_bindable() {
        let port = free_port().unwrap();
        assert!(port > 0);
        TcpListener::bind((Ipv4Addr::LOCALHOST, port)).unwrap();
    }

    #[tokio::test]
    async fn launch_relay_copies_bytes() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut child_out, from) = tokio::io::duplex(64);
        let (to, mut console) = tokio::io::duplex(64);
        let handle = relay(from, to, "stdout");

        child_out.write_all(b"hello\n\x00bytes").await.unwrap();
        drop(child_out);
        handle.await.unwrap();

        let mut seen = Vec::new();
        console.read_to_end(&mut seen).await.unwrap();
        assert_eq!(seen, b"hello\n\x00bytes");
    }
}
