//! One-shot step requests.

use crate::error::DebugError;
use crate::session::{ExecutionState, Session, SessionState};
use crate::target::TargetVm;
use crate::types::{RequestKind, StepKind, StepScope};

/// Install a step request on the observed thread and resume the target.
///
/// The request is scoped to the current receiver when the frame has one,
/// otherwise to the main class pattern, so it does not fire inside library
/// code. The listener answers the command when the step fires.
pub async fn step<T: TargetVm>(
    session: &Session<T>,
    state: &mut SessionState,
    kind: StepKind,
) -> Result<(), DebugError> {
    match state.execution {
        ExecutionState::Suspended(_) | ExecutionState::Halted => {}
        ExecutionState::Terminated => return Err(DebugError::Terminated),
        _ => return Err(DebugError::NotSuspended),
    }
    let thread = state.thread.ok_or(DebugError::NoFrames)?;
    let target = session.target();

    let frames = target.frames(thread).await?;
    let frame = frames.first().ok_or(DebugError::NoFrames)?;
    let scope = match target.this_object(thread, frame).await? {
        Some(this) => StepScope::Instance(this.id),
        None => StepScope::ClassPattern(session.settings().class_pattern()),
    };

    // At most one step request may exist per thread.
    if let Some(stale) = state.active_step.take() {
        if let Err(e) = target.clear_request(RequestKind::Step, stale).await {
            tracing::warn!("clearing stale step request {} failed: {}", stale, e);
        }
    }

    let request = target.set_step(thread, kind, &scope).await?;
    tracing::debug!("step {:?} installed as {} with scope {:?}", kind, request, scope);

    if let Err(e) = target.resume().await {
        if let Err(clear) = target.clear_request(RequestKind::Step, request).await {
            tracing::warn!("clearing step request {} failed: {}", request, clear);
        }
        return Err(e.into());
    }
    state.active_step = Some(request);
    state.execution = ExecutionState::Running;
    Ok(())
}
