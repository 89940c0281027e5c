//! The session controller: runs operator commands.
//!
//! Every command yields exactly one [`Response`]. Commands that only read
//! or change local state answer immediately; `run` and the step commands
//! resume the target and leave the answer to the event listener.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::breakpoint;
use crate::command::{Command, HELP_TEXT};
use crate::console::Console;
use crate::error::{DebugError, TargetError};
use crate::event::EventBatch;
use crate::inspect::{self, Inspector};
use crate::listener::run_listener;
use crate::program_state;
use crate::response::Response;
use crate::session::{ExecutionState, Session, SessionSettings, SessionState};
use crate::step;
use crate::target::TargetVm;
use crate::types::{Frame, RequestKind, StepKind, ThreadId};

/// How a handler answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Answer now.
    Now(Response),
    /// The listener answers when the target stops.
    Deferred,
}

/// Drives one session from operator input.
pub struct Controller<T> {
    session: Arc<Session<T>>,
    responses: mpsc::Receiver<Response>,
}

impl<T: TargetVm> Controller<T> {
    pub fn new(session: Arc<Session<T>>, responses: mpsc::Receiver<Response>) -> Self {
        Self { session, responses }
    }

    /// Create a session, prepare the target and spawn the event listener.
    pub async fn start(
        target: Arc<T>,
        events: mpsc::Receiver<EventBatch>,
        console: Arc<dyn Console>,
        settings: SessionSettings,
    ) -> Result<(Self, JoinHandle<()>), TargetError> {
        let (session, responses) = Session::new(target, console, settings);
        session.prepare().await?;
        let listener = tokio::spawn(run_listener(session.clone(), events));
        tracing::info!("session started for {}", session.settings().main_class);
        Ok((Self::new(session, responses), listener))
    }

    pub fn session(&self) -> &Arc<Session<T>> {
        &self.session
    }

    /// Run one command line. Its response becomes available through
    /// [`Controller::next_response`].
    pub async fn handle(&self, line: &str) {
        let console = self.session.console();
        let reply = match Command::parse(line) {
            Ok(command) => {
                tracing::debug!("command {:?}", command);
                self.dispatch(command).await
            }
            Err(e) => Err(e.into()),
        };
        let reply = reply.unwrap_or_else(|e| {
            tracing::debug!("command failed: {}", e);
            console.error(&e.to_string());
            Reply::Now(Response::Nok)
        });

        if let Reply::Now(response) = reply {
            match self.session.responses().try_send(response) {
                Ok(()) => {}
                Err(TrySendError::Full(dropped)) => {
                    tracing::warn!("response slot occupied; dropping {}", dropped);
                }
                Err(TrySendError::Closed(dropped)) => {
                    tracing::debug!("response channel closed; dropping {}", dropped);
                }
            }
        }
    }

    /// Wait for the answer to the last command.
    pub async fn next_response(&mut self) -> Response {
        self.responses.recv().await.unwrap_or(Response::Quit)
    }

    /// An answer already waiting, e.g. `QUIT` after the target died while
    /// the operator was idle.
    pub fn try_next_response(&mut self) -> Option<Response> {
        self.responses.try_recv().ok()
    }

    /// Run a command and wait for its response.
    pub async fn execute(&mut self, line: &str) -> Response {
        self.handle(line).await;
        self.next_response().await
    }

    async fn dispatch(&self, command: Command) -> Result<Reply, DebugError> {
        let mut state = self.session.state().lock().await;
        match command {
            Command::Quit => self.quit(&mut state).await,
            Command::Run => self.run(&mut state).await,
            Command::Locals => self.locals(&state).await,
            Command::Globals => self.globals(&state).await,
            Command::SetBreakpoint(line) => self.set_breakpoint(&mut state, line).await,
            Command::RemoveBreakpoint(line) => self.remove_breakpoint(&mut state, line).await,
            Command::ListBreakpoints => {
                self.console().line(&state.breakpoints.render());
                Ok(Reply::Now(Response::Ok))
            }
            Command::EnableBreakpoint(line) => self.enable_breakpoint(&mut state, line).await,
            Command::DisableBreakpoint(line) => self.disable_breakpoint(&mut state, line).await,
            Command::StepOver => {
                step::step(&self.session, &mut state, StepKind::Over).await?;
                Ok(Reply::Deferred)
            }
            Command::StepInto => {
                step::step(&self.session, &mut state, StepKind::Into).await?;
                Ok(Reply::Deferred)
            }
            Command::PrintValue { name, index } => self.print_value(&state, &name, index).await,
            Command::PrintField { name, field } => self.print_field(&state, &name, &field).await,
            Command::ShowState => self.show_state(&state),
            Command::StackTrace => self.stack_trace(&state).await,
            Command::MethodEntry => self.toggle_method_entry(&mut state).await,
            Command::Help => {
                self.console().line(HELP_TEXT);
                Ok(Reply::Now(Response::Ok))
            }
        }
    }

    fn console(&self) -> &dyn Console {
        self.session.console()
    }

    fn target(&self) -> &T {
        self.session.target()
    }

    // -----------------------------------------------------------------------
    // Execution control
    // -----------------------------------------------------------------------

    async fn quit(&self, state: &mut SessionState) -> Result<Reply, DebugError> {
        if state.is_terminated() {
            // A QUIT from the listener may still sit in the slot; the reply
            // below is then dropped as a duplicate.
            return Ok(Reply::Now(Response::Quit));
        }
        state.quit_requested = true;
        if let Err(e) = self.target().exit(0).await {
            tracing::debug!("exit request failed, target likely gone: {}", e);
        }
        tracing::info!("quit requested");
        Ok(Reply::Now(Response::Quit))
    }

    async fn run(&self, state: &mut SessionState) -> Result<Reply, DebugError> {
        match state.execution {
            ExecutionState::Terminated => return Err(DebugError::Terminated),
            ExecutionState::Running => return Err(DebugError::AlreadyRunning),
            ExecutionState::NotStarted | ExecutionState::Suspended(_) | ExecutionState::Halted => {}
        }
        self.target().resume().await?;
        state.execution = ExecutionState::Running;
        Ok(Reply::Deferred)
    }

    async fn toggle_method_entry(&self, state: &mut SessionState) -> Result<Reply, DebugError> {
        if state.method_entry.enabled {
            if let Some(request) = state.method_entry.request.take() {
                self.target()
                    .clear_request(RequestKind::MethodEntry, request)
                    .await?;
            }
            state.method_entry.enabled = false;
        } else {
            let pattern = self.session.settings().class_pattern();
            let request = self.target().set_method_entry(&pattern).await?;
            state.method_entry.request = Some(request);
            state.method_entry.enabled = true;
        }
        let label = if state.method_entry.enabled { "on" } else { "off" };
        self.console()
            .line(&format!("Break on method entry: {label}."));
        Ok(Reply::Now(Response::Ok))
    }

    // -----------------------------------------------------------------------
    // Breakpoints
    // -----------------------------------------------------------------------

    async fn set_breakpoint(&self, state: &mut SessionState, line: u32) -> Result<Reply, DebugError> {
        if state.breakpoints.add(line) {
            self.console()
                .warn(&format!("Note: line {line} already has a breakpoint."));
        }
        // Late additions resolve against the class if it has loaded.
        breakpoint::resolve_pending(self.target(), &mut state.breakpoints, self.console()).await;
        self.console()
            .line(&format!("Breakpoint in line {line} added."));
        Ok(Reply::Now(Response::Ok))
    }

    async fn remove_breakpoint(
        &self,
        state: &mut SessionState,
        line: u32,
    ) -> Result<Reply, DebugError> {
        let removed = state.breakpoints.remove(line)?;
        breakpoint::clear_requests(self.target(), removed.requests).await;
        self.console()
            .line(&format!("Breakpoint in line {line} removed."));
        Ok(Reply::Now(Response::Ok))
    }

    async fn enable_breakpoint(
        &self,
        state: &mut SessionState,
        line: u32,
    ) -> Result<Reply, DebugError> {
        state.breakpoints.set_enabled(line, true)?;
        breakpoint::resolve_pending(self.target(), &mut state.breakpoints, self.console()).await;
        self.console()
            .line(&format!("Breakpoint in line {line} enabled."));
        Ok(Reply::Now(Response::Ok))
    }

    async fn disable_breakpoint(
        &self,
        state: &mut SessionState,
        line: u32,
    ) -> Result<Reply, DebugError> {
        state.breakpoints.set_enabled(line, false)?;
        let requests = state.breakpoints.take_requests(line);
        breakpoint::clear_requests(self.target(), requests).await;
        self.console()
            .line(&format!("Breakpoint in line {line} disabled."));
        Ok(Reply::Now(Response::Ok))
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// The observed thread and its innermost frame.
    async fn top_frame(&self, state: &SessionState) -> Result<(ThreadId, Frame), DebugError> {
        if state.is_terminated() {
            return Err(DebugError::Terminated);
        }
        let thread = state.thread.ok_or(DebugError::NoFrames)?;
        let frames = self.target().frames(thread).await?;
        let frame = frames.into_iter().next().ok_or(DebugError::NoFrames)?;
        Ok((thread, frame))
    }

    fn inspector(&self, state: &SessionState, thread: ThreadId) -> Inspector<'_, T> {
        Inspector::new(self.target(), thread, state.is_suspended())
    }

    async fn locals(&self, state: &SessionState) -> Result<Reply, DebugError> {
        let (thread, frame) = self.top_frame(state).await?;
        let locals = self.target().locals(thread, &frame).await?;
        if locals.is_empty() {
            self.console().line("No visible local variables.");
        }
        let inspector = self.inspector(state, thread);
        for var in &locals {
            let text = inspector.binding(&var.name, &var.type_name, &var.value).await?;
            self.console().line(&text);
        }
        Ok(Reply::Now(Response::Ok))
    }

    async fn globals(&self, state: &SessionState) -> Result<Reply, DebugError> {
        let (thread, frame) = self.top_frame(state).await?;
        let fields = self.target().fields(&frame.location.class).await?;
        let this = self.target().this_object(thread, &frame).await?;
        let inspector = self.inspector(state, thread);
        for field in &fields {
            let value = if field.is_static {
                self.target().static_value(field).await?
            } else if let Some(this) = &this {
                self.target().instance_value(this, field).await?
            } else {
                // Static context: instance fields have no value here.
                continue;
            };
            let text = inspector.binding(&field.name, &field.type_name, &value).await?;
            self.console().line(&text);
        }
        Ok(Reply::Now(Response::Ok))
    }

    async fn print_value(
        &self,
        state: &SessionState,
        name: &str,
        index: Option<usize>,
    ) -> Result<Reply, DebugError> {
        let (thread, frame) = self.top_frame(state).await?;
        let resolved = inspect::lookup(self.target(), thread, &frame, name).await?;
        let inspector = self.inspector(state, thread);
        let text = match index {
            None => {
                inspector
                    .binding(name, &resolved.type_name, &resolved.value)
                    .await?
            }
            Some(index) => {
                let element = inspect::element(name, &resolved.value, index)?;
                let rendered = inspector.render(element).await?;
                if element.is_null() {
                    format!("{name}[{index}] = {rendered}")
                } else {
                    format!("{name}[{index}]: {} = {rendered}", element.type_name())
                }
            }
        };
        self.console().line(&text);
        Ok(Reply::Now(Response::Ok))
    }

    async fn print_field(
        &self,
        state: &SessionState,
        name: &str,
        field: &str,
    ) -> Result<Reply, DebugError> {
        let (thread, frame) = self.top_frame(state).await?;
        let holder = inspect::lookup(self.target(), thread, &frame, name).await?;
        let resolved = inspect::object_field(self.target(), name, &holder.value, field).await?;
        let text = self
            .inspector(state, thread)
            .binding(&format!("{name}.{field}"), &resolved.type_name, &resolved.value)
            .await?;
        self.console().line(&text);
        Ok(Reply::Now(Response::Ok))
    }

    fn show_state(&self, state: &SessionState) -> Result<Reply, DebugError> {
        let source = program_state::load(&self.session.settings().source_file)?;
        let current = state.current_location().and_then(|l| l.line);
        let lines = state.breakpoints.lines();
        for line in program_state::render(&source, current, &lines) {
            if line.current {
                self.console().highlight(&line.text);
            } else {
                self.console().line(&line.text);
            }
        }
        Ok(Reply::Now(Response::Ok))
    }

    async fn stack_trace(&self, state: &SessionState) -> Result<Reply, DebugError> {
        if !state.is_suspended() {
            return Err(DebugError::NotSuspended);
        }
        let thread = state.thread.ok_or(DebugError::NoFrames)?;
        let frames = self.target().frames(thread).await?;
        if frames.is_empty() {
            return Err(DebugError::NoFrames);
        }
        self.console().line("Stack trace:");
        for (depth, frame) in frames.iter().enumerate() {
            let line = frame
                .location
                .line
                .map_or_else(|| "?".to_string(), |l| l.to_string());
            self.console().line(&format!(
                "  #{depth} {} (line {line})",
                frame.location.qualified_method()
            ));
        }
        Ok(Reply::Now(Response::Ok))
    }
}
