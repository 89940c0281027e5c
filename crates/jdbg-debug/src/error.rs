//! Debug session error types.

use std::path::PathBuf;

use jdbg_jdwp::JdwpError;
use thiserror::Error;

/// Failures talking to the target VM.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The wire protocol reported a failure.
    #[error(transparent)]
    Protocol(#[from] JdwpError),

    /// A remote method call made to render a value failed.
    #[error("could not invoke {method}: {reason}")]
    Invocation {
        /// `name` and signature of the method.
        method: String,
        /// What went wrong.
        reason: String,
    },

    /// The target lacks information the operation needs.
    #[error("{0}")]
    Unavailable(String),
}

/// Failures while rendering a value.
#[derive(Debug, Error)]
pub enum InspectError {
    /// Objects can only be rendered while the target thread is halted.
    #[error("cannot inspect objects while the target is running")]
    NotSuspended,

    /// The remote call behind an object's display form failed.
    #[error(transparent)]
    Target(#[from] TargetError),
}

/// Malformed operator input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The verb is not in the command set.
    #[error("Invalid command '{0}'. Type 'help' for a list of commands.")]
    Unknown(String),

    /// Too many or too few arguments.
    #[error("Invalid number of arguments.\nUsage: {usage}")]
    ArgumentCount {
        /// Usage line of the command.
        usage: &'static str,
    },

    /// A line argument is not a positive integer.
    #[error("could not convert {0} to integer line number")]
    BadLine(String),

    /// An index argument is not a non-negative integer.
    #[error("could not convert {0} to integer index")]
    BadIndex(String),
}

/// Breakpoint registry lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BreakpointError {
    /// No breakpoint is registered at that line.
    #[error("No breakpoint yet in line number {0}")]
    NotFound(u32),
}

/// Everything a command can fail with. Each is reported to the operator
/// and answered with `NOK`.
#[derive(Debug, Error)]
pub enum DebugError {
    /// Bad command line.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Unknown breakpoint.
    #[error(transparent)]
    Breakpoint(#[from] BreakpointError),

    /// Rendering a value failed.
    #[error(transparent)]
    Inspect(#[from] InspectError),

    /// The target rejected a request.
    #[error(transparent)]
    Target(#[from] TargetError),

    /// The command needs a halted target.
    #[error("Not at any breakpoint. Use 'run' first.")]
    NotSuspended,

    /// No thread has been observed, or it has no frames.
    #[error("No frames initialized yet")]
    NoFrames,

    /// The command needs a live target.
    #[error("The program has terminated.")]
    Terminated,

    /// `run` while the program is already running.
    #[error("The program is already running.")]
    AlreadyRunning,

    /// Neither a visible local nor a field of the current class.
    #[error("No visible variable or field with name '{0}' found.")]
    UnknownName(String),

    /// An instance field was requested from a static context.
    #[error("{0} is an instance field but the current frame has no 'this'")]
    NoReceiver(String),

    /// `print-field` on a primitive, string, array or null.
    #[error("{0} not an object.")]
    NotAnObject(String),

    /// `print-field` with an unknown field name.
    #[error("{var} has no field called {field}.")]
    NoSuchField {
        /// The variable that was inspected.
        var: String,
        /// The missing field.
        field: String,
    },

    /// An index was given for a value that is not an array.
    #[error("{0} is not an array")]
    NotAnArray(String),

    /// The index is beyond the array's length.
    #[error("Index out of range.")]
    IndexOutOfRange,

    /// The program source could not be read for `show-state`.
    #[error("could not read {}: {source}", .path.display())]
    Source {
        /// The source file that was tried.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl From<JdwpError> for DebugError {
    fn from(e: JdwpError) -> Self {
        DebugError::Target(TargetError::Protocol(e))
    }
}
