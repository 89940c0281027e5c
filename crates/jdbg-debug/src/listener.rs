//! The event listener.
//!
//! Consumes event batches from the target, updates the session state, and
//! answers the waiting command with at most one response per batch.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::breakpoint;
use crate::error::DebugError;
use crate::event::{DebugEvent, EventBatch};
use crate::response::Response;
use crate::session::{ExecutionState, Session, SessionState};
use crate::target::TargetVm;
use crate::types::RequestKind;

/// Run until the session ends. A closed event source counts as a
/// disconnect.
pub async fn run_listener<T: TargetVm>(
    session: Arc<Session<T>>,
    mut events: mpsc::Receiver<EventBatch>,
) {
    tracing::debug!("event listener started");
    loop {
        let batch = match events.recv().await {
            Some(batch) => batch,
            None => EventBatch::single(DebugEvent::Disconnect),
        };

        let response = process_batch(&session, batch).await;

        if let Some(response) = response {
            tracing::debug!("listener answers {}", response);
            if session.responses().send(response).await.is_err() {
                tracing::debug!("response receiver dropped; listener exiting");
                break;
            }
            if response == Response::Quit {
                break;
            }
        }

        if session.state().lock().await.is_terminated() {
            break;
        }
    }
    tracing::debug!("event listener stopped");
}

/// Handle every event of a batch and fold their responses.
pub async fn process_batch<T: TargetVm>(session: &Session<T>, batch: EventBatch) -> Option<Response> {
    let mut state = session.state().lock().await;
    let mut folded: Option<Response> = None;

    for event in batch.events {
        tracing::debug!("debug event: {:?}", event);
        let answers = event.answers_command();
        let response = match handle_event(session, &mut state, event).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("handling debug event failed: {}", e);
                session.console().error(&format!("Error: {e}"));
                if answers {
                    halt_if_running(&mut state);
                }
                answers.then_some(Response::Nok)
            }
        };
        if let Some(r) = response {
            folded = Some(folded.map_or(r, |f| f.combine(r)));
        }
    }
    folded
}

async fn handle_event<T: TargetVm>(
    session: &Session<T>,
    state: &mut SessionState,
    event: DebugEvent,
) -> Result<Option<Response>, DebugError> {
    let target = session.target();
    let console = session.console();

    match event {
        DebugEvent::ProcessStart { thread } => {
            state.thread = Some(thread);
            Ok(None)
        }
        DebugEvent::ClassLoad { thread, class } => {
            tracing::info!("{} loaded", class.name);
            state.thread.get_or_insert(thread);
            state.breakpoints.set_loaded_class(class);
            breakpoint::resolve_pending(target, &mut state.breakpoints, console).await;
            target.resume().await?;
            Ok(None)
        }
        DebugEvent::Breakpoint {
            thread,
            location,
            request,
        } => {
            if let Some(step) = state.active_step.take() {
                tracing::debug!("breakpoint {} pre-empts step {}", request, step);
                if let Err(e) = target.clear_request(RequestKind::Step, step).await {
                    tracing::warn!("clearing step request {} failed: {}", step, e);
                }
            }
            console.line(&format!(
                "Breakpoint hit in {} at {}",
                location.qualified_method(),
                location
            ));
            state.thread = Some(thread);
            state.execution = ExecutionState::Suspended(location);
            Ok(Some(Response::Ok))
        }
        DebugEvent::Step {
            thread,
            location,
            request,
        } => {
            if let Err(e) = target.clear_request(RequestKind::Step, request).await {
                tracing::warn!("clearing step request {} failed: {}", request, e);
            }
            if state.active_step == Some(request) {
                state.active_step = None;
            }
            console.line(&format!(
                "Step completed in {} at {}",
                location.qualified_method(),
                location
            ));
            state.thread = Some(thread);
            state.execution = ExecutionState::Suspended(location);
            Ok(Some(Response::Ok))
        }
        DebugEvent::MethodEntry {
            thread, location, ..
        } => {
            if !state.method_entry.enabled {
                // Queued before the toggle went off.
                target.resume().await?;
                return Ok(None);
            }
            console.line(&format!(
                "Entered method {} at {}",
                location.qualified_method(),
                location
            ));
            state.thread = Some(thread);
            state.execution = ExecutionState::Suspended(location);
            Ok(Some(Response::Ok))
        }
        DebugEvent::ProcessExit | DebugEvent::Disconnect => {
            if state.is_terminated() {
                return Ok(None);
            }
            state.execution = ExecutionState::Terminated;
            state.active_step = None;
            if state.quit_requested {
                // `quit` already answered.
                return Ok(None);
            }
            console.line("Program terminated.");
            Ok(Some(Response::Quit))
        }
        DebugEvent::Malformed(reason) => {
            tracing::error!("malformed debug event: {}", reason);
            console.error(&format!("Error: could not read debug event: {reason}"));
            // A command is waiting only while the target runs.
            Ok(halt_if_running(state).then_some(Response::Nok))
        }
        DebugEvent::Other { description } => {
            tracing::debug!("unhandled event {}", description);
            halt_if_running(state);
            Ok(Some(Response::Ok))
        }
    }
}

/// Events that answer a command suspend every thread. Without a location to
/// record, leave the session in a state `run` and the step commands accept.
fn halt_if_running(state: &mut SessionState) -> bool {
    if state.execution != ExecutionState::Running {
        return false;
    }
    state.execution = ExecutionState::Halted;
    true
}
