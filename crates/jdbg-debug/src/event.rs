//! Debug events as the session sees them.

use crate::types::{Location, RequestId, ThreadId, TypeRef};

/// One notification from the target.
#[derive(Debug, Clone, PartialEq)]
pub enum DebugEvent {
    /// The VM started; its main thread is suspended.
    ProcessStart { thread: ThreadId },
    /// A class matching the watched pattern was loaded. All threads are
    /// suspended until the session resumes them.
    ClassLoad { thread: ThreadId, class: TypeRef },
    Breakpoint {
        thread: ThreadId,
        location: Location,
        request: RequestId,
    },
    Step {
        thread: ThreadId,
        location: Location,
        request: RequestId,
    },
    MethodEntry {
        thread: ThreadId,
        location: Location,
        request: RequestId,
    },
    /// The VM is shutting down.
    ProcessExit,
    /// The connection to the VM is gone.
    Disconnect,
    /// The event source failed to decode or translate an event.
    Malformed(String),
    /// Anything the session does not act on.
    Other { description: String },
}

impl DebugEvent {
    /// Whether this event is the stop an operator command waits for.
    pub fn answers_command(&self) -> bool {
        matches!(
            self,
            DebugEvent::Breakpoint { .. }
                | DebugEvent::Step { .. }
                | DebugEvent::MethodEntry { .. }
                | DebugEvent::Other { .. }
        )
    }
}

/// Events the target reported together.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventBatch {
    pub events: Vec<DebugEvent>,
}

impl EventBatch {
    pub fn new(events: Vec<DebugEvent>) -> Self {
        Self { events }
    }

    pub fn single(event: DebugEvent) -> Self {
        Self {
            events: vec![event],
        }
    }
}
