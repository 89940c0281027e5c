//! Line breakpoints and their installation in the target.

use crate::console::Console;
use crate::error::{BreakpointError, TargetError};
use crate::target::TargetVm;
use crate::types::{RequestId, RequestKind, TypeRef};

/// A requested source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    /// Source line (1-based).
    pub line: u32,
    pub enabled: bool,
    /// Requests installed for this line; empty until the class is loaded
    /// and the line has code.
    pub requests: Vec<RequestId>,
    /// The loaded class has no code at this line; not retried until the
    /// class loads again.
    pub no_code: bool,
}

impl Breakpoint {
    pub fn new(line: u32) -> Self {
        Self {
            line,
            enabled: true,
            requests: Vec::new(),
            no_code: false,
        }
    }

    pub fn is_installed(&self) -> bool {
        !self.requests.is_empty()
    }
}

/// Breakpoints in insertion order, plus the class they resolve against.
#[derive(Debug, Clone, Default)]
pub struct BreakpointRegistry {
    entries: Vec<Breakpoint>,
    loaded_class: Option<TypeRef>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a breakpoint. Duplicate lines are kept; returns `true` when
    /// `line` was already registered.
    pub fn add(&mut self, line: u32) -> bool {
        let duplicate = self.contains(line);
        if duplicate {
            tracing::warn!("breakpoint at line {} registered twice", line);
        }
        self.entries.push(Breakpoint::new(line));
        duplicate
    }

    /// Remove the first breakpoint at `line`.
    pub fn remove(&mut self, line: u32) -> Result<Breakpoint, BreakpointError> {
        let pos = self
            .entries
            .iter()
            .position(|bp| bp.line == line)
            .ok_or(BreakpointError::NotFound(line))?;
        Ok(self.entries.remove(pos))
    }

    /// Set the enablement flag of every breakpoint at `line`.
    pub fn set_enabled(&mut self, line: u32, enabled: bool) -> Result<(), BreakpointError> {
        let mut found = false;
        for bp in self.entries.iter_mut().filter(|bp| bp.line == line) {
            bp.enabled = enabled;
            found = true;
        }
        if found {
            Ok(())
        } else {
            Err(BreakpointError::NotFound(line))
        }
    }

    /// Detach the requests of every breakpoint at `line`.
    pub fn take_requests(&mut self, line: u32) -> Vec<RequestId> {
        self.entries
            .iter_mut()
            .filter(|bp| bp.line == line)
            .flat_map(|bp| std::mem::take(&mut bp.requests))
            .collect()
    }

    pub fn contains(&self, line: u32) -> bool {
        self.entries.iter().any(|bp| bp.line == line)
    }

    pub fn list(&self) -> &[Breakpoint] {
        &self.entries
    }

    /// Registered lines in insertion order.
    pub fn lines(&self) -> Vec<u32> {
        self.entries.iter().map(|bp| bp.line).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The class breakpoints resolve against, once it has loaded.
    pub fn loaded_class(&self) -> Option<&TypeRef> {
        self.loaded_class.as_ref()
    }

    /// A (re)load gives every line another chance to resolve.
    pub fn set_loaded_class(&mut self, class: TypeRef) {
        self.loaded_class = Some(class);
        for bp in &mut self.entries {
            bp.no_code = false;
        }
    }

    /// Indices of enabled breakpoints still to be installed.
    pub fn pending(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, bp)| bp.enabled && !bp.is_installed() && !bp.no_code)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn mark_no_code(&mut self, index: usize) {
        if let Some(bp) = self.entries.get_mut(index) {
            bp.no_code = true;
        }
    }

    /// Record a request installed for the breakpoint at `index`.
    pub fn record_request(&mut self, index: usize, request: RequestId) {
        if let Some(bp) = self.entries.get_mut(index) {
            bp.requests.push(request);
        }
    }

    /// Text shown by `list-breakpoints`.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "Currently no breakpoints".to_string();
        }
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|bp| {
                if bp.enabled {
                    bp.line.to_string()
                } else {
                    format!("{} (disabled)", bp.line)
                }
            })
            .collect();
        format!("Current breakpoints (line numbers): {}", lines.join(", "))
    }
}

/// Install a breakpoint for `line` at the first code location the line
/// has in `class`. A line without code is reported and skipped.
pub async fn install<T: TargetVm>(
    target: &T,
    class: &TypeRef,
    line: u32,
    console: &dyn Console,
) -> Result<Option<RequestId>, TargetError> {
    let locations = target.line_locations(class, line).await?;
    let Some(location) = locations.first() else {
        tracing::warn!("no code at line {} in {}", line, class.name);
        console.warn(&format!(
            "Warning: Could not set breakpoint in line {}, no such code location found in class {}.",
            line, class.name
        ));
        return Ok(None);
    };
    let id = target.set_breakpoint(location).await?;
    tracing::debug!("breakpoint {} installed at {} ({})", id, line, location);
    Ok(Some(id))
}

/// Install every enabled breakpoint that has no request yet. Failures are
/// reported per line and do not stop the others.
pub async fn resolve_pending<T: TargetVm>(
    target: &T,
    registry: &mut BreakpointRegistry,
    console: &dyn Console,
) {
    let Some(class) = registry.loaded_class().cloned() else {
        return;
    };
    for index in registry.pending() {
        let line = registry.list()[index].line;
        match install(target, &class, line, console).await {
            Ok(Some(id)) => registry.record_request(index, id),
            Ok(None) => registry.mark_no_code(index),
            Err(e) => {
                tracing::error!("installing breakpoint at line {} failed: {}", line, e);
                console.error(&format!("Could not set breakpoint in line {line}: {e}"));
            }
        }
    }
}

/// Clear breakpoint requests, logging failures.
pub async fn clear_requests<T: TargetVm>(target: &T, requests: Vec<RequestId>) {
    for id in requests {
        if let Err(e) = target.clear_request(RequestKind::Breakpoint, id).await {
            tracing::warn!("clearing breakpoint request {} failed: {}", id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::MemoryConsole;
    use crate::fake::{FakeCall, FakeTarget};

    fn class() -> TypeRef {
        TypeRef::class(1, "Test")
    }

    #[test]
    fn breakpoint_add_and_list_in_order() {
        let mut reg = BreakpointRegistry::new();
        reg.add(12);
        reg.add(4);
        reg.add(9);
        assert_eq!(reg.lines(), vec![12, 4, 9]);
        assert_eq!(
            reg.render(),
            "Current breakpoints (line numbers): 12, 4, 9"
        );
    }

    #[test]
    fn breakpoint_duplicates_are_kept() {
        let mut reg = BreakpointRegistry::new();
        assert!(!reg.add(5));
        assert!(reg.add(5));
        assert_eq!(reg.lines(), vec![5, 5]);
    }

    #[test]
    fn breakpoint_remove_first_match() {
        let mut reg = BreakpointRegistry::new();
        reg.add(5);
        reg.add(7);
        reg.add(5);
        let removed = reg.remove(5).unwrap();
        assert_eq!(removed.line, 5);
        assert_eq!(reg.lines(), vec![7, 5]);
    }

    #[test]
    fn breakpoint_remove_unknown_line() {
        let mut reg = BreakpointRegistry::new();
        assert_eq!(reg.remove(3), Err(BreakpointError::NotFound(3)));
    }

    #[test]
    fn breakpoint_render_empty_and_disabled() {
        let mut reg = BreakpointRegistry::new();
        assert_eq!(reg.render(), "Currently no breakpoints");
        reg.add(3);
        reg.set_enabled(3, false).unwrap();
        assert_eq!(
            reg.render(),
            "Current breakpoints (line numbers): 3 (disabled)"
        );
        assert!(reg.set_enabled(4, true).is_err());
    }

    #[test]
    fn breakpoint_pending_skips_disabled_and_installed() {
        let mut reg = BreakpointRegistry::new();
        reg.add(1);
        reg.add(2);
        reg.add(3);
        reg.set_enabled(2, false).unwrap();
        reg.record_request(2, RequestId(9));
        assert_eq!(reg.pending(), vec![0]);
        assert_eq!(reg.take_requests(3), vec![RequestId(9)]);
        assert_eq!(reg.pending(), vec![0, 2]);
    }

    #[tokio::test]
    async fn breakpoint_install_uses_first_location() {
        let target = FakeTarget::new();
        target.with_code_at(&class(), 6);
        let console = MemoryConsole::new();
        let id = install(&target, &class(), 6, &console).await.unwrap();
        assert!(id.is_some());
        assert_eq!(
            target.count(|c| matches!(c, FakeCall::SetBreakpoint { line: Some(6), .. })),
            1
        );
    }

    #[tokio::test]
    async fn breakpoint_install_without_code_warns() {
        let target = FakeTarget::new();
        let console = MemoryConsole::new();
        let id = install(&target, &class(), 2, &console).await.unwrap();
        assert!(id.is_none());
        assert!(console.contains(
            "Warning: Could not set breakpoint in line 2, no such code location found in class Test."
        ));
        assert!(target.calls().is_empty());
    }

    #[tokio::test]
    async fn breakpoint_resolve_pending_records_requests() {
        let target = FakeTarget::new();
        target.with_code_at(&class(), 4);
        let console = MemoryConsole::new();
        let mut reg = BreakpointRegistry::new();
        reg.add(4);
        reg.add(5);

        // Nothing happens before the class is known.
        resolve_pending(&target, &mut reg, &console).await;
        assert!(target.calls().is_empty());

        reg.set_loaded_class(class());
        resolve_pending(&target, &mut reg, &console).await;
        assert!(reg.list()[0].is_installed());
        assert!(!reg.list()[1].is_installed());
        assert!(console.contains("line 5"));
    }

    #[tokio::test]
    async fn breakpoint_line_without_code_warns_once_per_load() {
        let target = FakeTarget::new();
        target.with_code_at(&class(), 8);
        let console = MemoryConsole::new();
        let mut reg = BreakpointRegistry::new();
        reg.set_loaded_class(class());
        reg.add(5);
        resolve_pending(&target, &mut reg, &console).await;

        // A later, unrelated breakpoint does not retry line 5.
        reg.add(8);
        resolve_pending(&target, &mut reg, &console).await;
        let warnings = |console: &MemoryConsole| {
            console
                .lines()
                .iter()
                .filter(|(_, text)| text.contains("Could not set breakpoint in line 5"))
                .count()
        };
        assert_eq!(warnings(&console), 1);
        assert!(reg.list()[1].is_installed());
        assert!(reg.pending().is_empty());

        // Loading the class again retries it.
        reg.set_loaded_class(class());
        assert_eq!(reg.pending(), vec![0]);
        resolve_pending(&target, &mut reg, &console).await;
        assert_eq!(warnings(&console), 2);
    }
}
