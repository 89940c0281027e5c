//! The operator loop: prompt, read a line, run it, wait for its response.

use std::io::Write;

use anyhow::Result;
use jdbg_debug::{Controller, Response, TargetVm};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Shown before every command.
pub const PROMPT: &str = "$ ";

/// Run commands from `input` until a command or the target answers `QUIT`.
/// End of input counts as `quit`.
pub async fn run<T, R, W>(controller: &mut Controller<T>, input: R, prompt: &mut W) -> Result<()>
where
    T: TargetVm,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(prompt, "{PROMPT}")?;
        prompt.flush()?;

        // No command is pending here, so anything the listener sends is
        // unsolicited: usually QUIT because the target died.
        let line = tokio::select! {
            line = lines.next_line() => line?,
            response = controller.next_response() => {
                if response == Response::Quit {
                    tracing::info!("target ended while idle");
                    return Ok(());
                }
                tracing::warn!("discarding unsolicited {}", response);
                continue;
            }
        };

        let Some(line) = line else {
            tracing::info!("end of input, quitting");
            controller.execute("quit").await;
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = controller.execute(&line).await;
        tracing::debug!("{:?} -> {}", line, response);
        if response == Response::Quit {
            return Ok(());
        }
    }
}
