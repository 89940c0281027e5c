//! JDWP error types.

use thiserror::Error;

use crate::protocol::error_name;

/// Errors from JDWP client operations.
#[derive(Debug, Error)]
pub enum JdwpError {
    /// Socket-level failure.
    #[error("JDWP I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer did not answer with the JDWP handshake.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Could not connect to the target VM before the deadline.
    #[error("could not connect to {addr} within {millis} ms")]
    ConnectTimeout {
        /// The address that was tried.
        addr: String,
        /// How long connecting was retried.
        millis: u64,
    },

    /// A packet or field could not be decoded.
    #[error("malformed packet: {0}")]
    Decode(String),

    /// Request timed out waiting for its reply.
    #[error("request {command_set}/{command} timed out after {secs}s")]
    Timeout {
        /// Command set of the request.
        command_set: u8,
        /// Command within the set.
        command: u8,
        /// Timeout that elapsed.
        secs: u64,
    },

    /// The VM answered with a non-zero error code.
    #[error("VM error {code} ({name})", name = vm_error_name(.code))]
    Vm {
        /// JDWP error constant.
        code: u16,
    },

    /// The connection is closed; no further requests can be made.
    #[error("connection to target VM closed")]
    Disconnected,
}

fn vm_error_name(code: &u16) -> &'static str {
    error_name(*code)
}

impl JdwpError {
    /// The JDWP error code if this is a VM-side rejection.
    pub fn vm_code(&self) -> Option<u16> {
        match self {
            JdwpError::Vm { code } => Some(*code),
            _ => None,
        }
    }
}
