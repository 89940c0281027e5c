//! Terminal console for the operator.

use std::io::{self, IsTerminal, Write};

use crossterm::style::Stylize;
use jdbg_debug::{Console, Tone};

/// Writes session output to stdout, styled when stdout is a terminal.
pub struct StdConsole {
    styled: bool,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            styled: io::stdout().is_terminal(),
        }
    }
}

impl Console for StdConsole {
    fn write(&self, tone: Tone, text: &str) {
        let mut out = io::stdout().lock();
        let result = if self.styled {
            match tone {
                Tone::Plain => writeln!(out, "{text}"),
                Tone::Highlight => writeln!(out, "{}", text.bold().reverse()),
                Tone::Warning => writeln!(out, "{}", text.yellow()),
                Tone::Error => writeln!(out, "{}", text.red()),
            }
        } else {
            writeln!(out, "{text}")
        };
        if let Err(e) = result.and_then(|_| out.flush()) {
            tracing::warn!("console write failed: {}", e);
        }
    }
}
