//! Shared session state.
//!
//! The controller and the listener both hold the [`Session`]. Its state sits
//! behind one async mutex; the response channel has a single slot, so at
//! most one answer is ever pending.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::breakpoint::{self, BreakpointRegistry};
use crate::console::Console;
use crate::error::TargetError;
use crate::response::Response;
use crate::target::TargetVm;
use crate::types::{Location, RequestId, ThreadId};

/// Where the target is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionState {
    /// Launched and halted before `main`; nothing has been resumed yet.
    NotStarted,
    Running,
    /// Halted at a breakpoint, step or method entry.
    Suspended(Location),
    /// Halted by an event whose location could not be read.
    Halted,
    Terminated,
}

/// Break-on-method-entry toggle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodEntryToggle {
    pub enabled: bool,
    pub request: Option<RequestId>,
}

/// Fixed parameters of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// The class whose `main` is debugged.
    pub main_class: String,
    /// Source shown by `show-state`.
    pub source_file: PathBuf,
    /// Lines registered before the first command.
    pub breakpoints: Vec<u32>,
}

impl SessionSettings {
    pub fn new(main_class: impl Into<String>) -> Self {
        let main_class = main_class.into();
        let source_file = PathBuf::from(format!("{}.java", main_class.replace('.', "/")));
        Self {
            main_class,
            source_file,
            breakpoints: Vec::new(),
        }
    }

    /// Class filter covering the main class and its nested classes.
    pub fn class_pattern(&self) -> String {
        format!("{}*", self.main_class)
    }
}

/// Mutable state shared by the controller and the listener.
#[derive(Debug)]
pub struct SessionState {
    pub execution: ExecutionState,
    /// The thread under observation, known from the first event.
    pub thread: Option<ThreadId>,
    pub breakpoints: BreakpointRegistry,
    /// The step request in flight, if any.
    pub active_step: Option<RequestId>,
    pub method_entry: MethodEntryToggle,
    /// Set by `quit`; the target's death is then expected and not answered.
    pub quit_requested: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            execution: ExecutionState::NotStarted,
            thread: None,
            breakpoints: BreakpointRegistry::new(),
            active_step: None,
            method_entry: MethodEntryToggle::default(),
            quit_requested: false,
        }
    }

    pub fn current_location(&self) -> Option<&Location> {
        match &self.execution {
            ExecutionState::Suspended(location) => Some(location),
            _ => None,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(
            self.execution,
            ExecutionState::Suspended(_) | ExecutionState::Halted
        )
    }

    pub fn is_terminated(&self) -> bool {
        self.execution == ExecutionState::Terminated
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// One debugging session against one target.
pub struct Session<T> {
    target: Arc<T>,
    state: Mutex<SessionState>,
    responses: mpsc::Sender<Response>,
    console: Arc<dyn Console>,
    settings: SessionSettings,
}

impl<T: TargetVm> Session<T> {
    /// Create a session and the receiving end of its response slot.
    pub fn new(
        target: Arc<T>,
        console: Arc<dyn Console>,
        settings: SessionSettings,
    ) -> (Arc<Self>, mpsc::Receiver<Response>) {
        let (responses, rx) = mpsc::channel(1);
        let mut state = SessionState::new();
        for line in &settings.breakpoints {
            state.breakpoints.add(*line);
        }
        let session = Arc::new(Self {
            target,
            state: Mutex::new(state),
            responses,
            console,
            settings,
        });
        (session, rx)
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn state(&self) -> &Mutex<SessionState> {
        &self.state
    }

    pub fn console(&self) -> &dyn Console {
        self.console.as_ref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub(crate) fn responses(&self) -> &mpsc::Sender<Response> {
        &self.responses
    }

    /// Watch for the main class to load and, if it already has, resolve
    /// the configured breakpoints right away.
    pub async fn prepare(&self) -> Result<(), TargetError> {
        let request = self
            .target
            .watch_class_load(&self.settings.main_class)
            .await?;
        tracing::debug!(
            "watching loads of {} with request {}",
            self.settings.main_class,
            request
        );

        if let Some(class) = self.target.loaded_class(&self.settings.main_class).await? {
            tracing::info!("{} is already loaded", class.name);
            let mut state = self.state.lock().await;
            state.breakpoints.set_loaded_class(class);
            breakpoint::resolve_pending(self.target(), &mut state.breakpoints, self.console())
                .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::MemoryConsole;
    use crate::fake::{FakeCall, FakeTarget};
    use crate::types::TypeRef;

    #[test]
    fn session_settings_defaults() {
        let settings = SessionSettings::new("demo.Main");
        assert_eq!(settings.source_file, PathBuf::from("demo/Main.java"));
        assert_eq!(settings.class_pattern(), "demo.Main*");
    }

    #[test]
    fn session_state_starts_not_started() {
        let state = SessionState::new();
        assert_eq!(state.execution, ExecutionState::NotStarted);
        assert!(state.current_location().is_none());
        assert!(!state.is_suspended());
        assert!(!state.is_terminated());
    }

    #[tokio::test]
    async fn session_registers_configured_breakpoints() {
        let mut settings = SessionSettings::new("Test");
        settings.breakpoints = vec![3, 8];
        let (session, _rx) = Session::new(
            Arc::new(FakeTarget::new()),
            Arc::new(MemoryConsole::new()),
            settings,
        );
        assert_eq!(session.state().lock().await.breakpoints.lines(), vec![3, 8]);
    }

    #[tokio::test]
    async fn session_prepare_watches_main_class() {
        let target = Arc::new(FakeTarget::new());
        let (session, _rx) = Session::new(
            target.clone(),
            Arc::new(MemoryConsole::new()),
            SessionSettings::new("Test"),
        );
        session.prepare().await.unwrap();
        assert_eq!(target.calls(), vec![FakeCall::WatchClassLoad("Test".into())]);
    }

    #[tokio::test]
    async fn session_prepare_resolves_against_loaded_class() {
        let class = TypeRef::class(1, "Test");
        let target = Arc::new(FakeTarget::new());
        target.with_loaded_class(&class);
        target.with_code_at(&class, 5);
        let mut settings = SessionSettings::new("Test");
        settings.breakpoints = vec![5];
        let (session, _rx) =
            Session::new(target.clone(), Arc::new(MemoryConsole::new()), settings);

        session.prepare().await.unwrap();
        let state = session.state().lock().await;
        assert!(state.breakpoints.list()[0].is_installed());
        assert_eq!(state.breakpoints.loaded_class(), Some(&class));
    }
}
