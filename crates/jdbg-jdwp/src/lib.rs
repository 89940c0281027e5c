//! jdbg-jdwp: Java Debug Wire Protocol client.
//!
//! Provides the wire protocol pieces (handshake, packet framing, body
//! codec, composite event decoding) and [`JdwpClient`], an async client
//! that multiplexes commands over one connection to a target VM.

pub mod client;
pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod protocol;
pub mod transport;

pub use client::{EventStream, JdwpClient, VersionInfo, REQUEST_TIMEOUT_SECS};
pub use error::JdwpError;
pub use events::{Event, EventSet};
