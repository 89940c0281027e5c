//! jdbg-debug: the debugging session engine.
//!
//! A [`Session`] is shared by two actors. The [`Controller`] runs operator
//! commands; the event listener consumes [`EventBatch`]es from the target.
//! Both reach the VM through the [`TargetVm`] trait, implemented over JDWP
//! by [`JdwpTarget`] and in memory by `FakeTarget` (feature `testing`).
//! Every command is answered with exactly one [`Response`].

pub mod breakpoint;
pub mod command;
pub mod console;
pub mod controller;
pub mod error;
pub mod event;
#[cfg(any(test, feature = "testing"))]
pub mod fake;
pub mod inspect;
pub mod jdwp_target;
pub mod listener;
pub mod program_state;
pub mod response;
pub mod session;
pub mod step;
pub mod target;
pub mod types;
pub mod value;

pub use command::Command;
pub use console::{Console, Tone};
pub use controller::{Controller, Reply};
pub use error::{DebugError, TargetError};
pub use event::{DebugEvent, EventBatch};
pub use jdwp_target::{spawn_event_pump, JdwpTarget};
pub use response::Response;
pub use session::{ExecutionState, Session, SessionSettings, SessionState};
pub use target::TargetVm;
