//! Operator-facing output.

/// How a line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    /// The current line in `show-state`.
    Highlight,
    Warning,
    Error,
}

/// Where the session writes everything the operator reads.
pub trait Console: Send + Sync {
    /// Write one line (no trailing newline in `text`).
    fn write(&self, tone: Tone, text: &str);

    fn line(&self, text: &str) {
        self.write(Tone::Plain, text);
    }

    fn highlight(&self, text: &str) {
        self.write(Tone::Highlight, text);
    }

    fn warn(&self, text: &str) {
        self.write(Tone::Warning, text);
    }

    fn error(&self, text: &str) {
        self.write(Tone::Error, text);
    }
}

/// Collects output in memory.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: std::sync::Mutex<Vec<(Tone, String)>>,
}

#[cfg(any(test, feature = "testing"))]
impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, Vec<(Tone, String)>> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every line written so far, with its tone.
    pub fn lines(&self) -> Vec<(Tone, String)> {
        self.guard().clone()
    }

    /// Everything written so far, newline separated.
    pub fn text(&self) -> String {
        self.guard()
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.guard().iter().any(|(_, text)| text.contains(needle))
    }

    /// Forget everything written so far.
    pub fn clear(&self) {
        self.guard().clear();
    }
}

#[cfg(any(test, feature = "testing"))]
impl Console for MemoryConsole {
    fn write(&self, tone: Tone, text: &str) {
        // Multi-line messages are split so assertions can match per line.
        let mut lines = self.guard();
        for part in text.split('\n') {
            lines.push((tone, part.to_string()));
        }
    }
}
