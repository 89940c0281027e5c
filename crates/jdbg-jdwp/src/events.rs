//! Decoding of `Event.Composite` packets.

use crate::codec::PacketReader;
use crate::error::JdwpError;
use crate::protocol::{event_kind, IdSizes, Location, TypeTag};

/// A single event inside a composite.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    VmStart {
        request_id: i32,
        thread: u64,
    },
    SingleStep {
        request_id: i32,
        thread: u64,
        location: Location,
    },
    Breakpoint {
        request_id: i32,
        thread: u64,
        location: Location,
    },
    MethodEntry {
        request_id: i32,
        thread: u64,
        location: Location,
    },
    MethodExit {
        request_id: i32,
        thread: u64,
        location: Location,
    },
    Exception {
        request_id: i32,
        thread: u64,
        location: Location,
        exception: u64,
        catch_location: Option<Location>,
    },
    ThreadStart {
        request_id: i32,
        thread: u64,
    },
    ThreadDeath {
        request_id: i32,
        thread: u64,
    },
    ClassPrepare {
        request_id: i32,
        thread: u64,
        type_tag: TypeTag,
        type_id: u64,
        signature: String,
        status: i32,
    },
    ClassUnload {
        request_id: i32,
        signature: String,
    },
    VmDeath {
        request_id: i32,
    },
}

impl Event {
    /// Short name used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Event::VmStart { .. } => "VMStart",
            Event::SingleStep { .. } => "SingleStep",
            Event::Breakpoint { .. } => "Breakpoint",
            Event::MethodEntry { .. } => "MethodEntry",
            Event::MethodExit { .. } => "MethodExit",
            Event::Exception { .. } => "Exception",
            Event::ThreadStart { .. } => "ThreadStart",
            Event::ThreadDeath { .. } => "ThreadDeath",
            Event::ClassPrepare { .. } => "ClassPrepare",
            Event::ClassUnload { .. } => "ClassUnload",
            Event::VmDeath { .. } => "VMDeath",
        }
    }
}

/// All events the VM reported together, with the suspend policy it applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSet {
    pub suspend_policy: u8,
    pub events: Vec<Event>,
}

/// Decode the body of an `Event.Composite` command.
pub fn decode_composite(data: &[u8], sizes: IdSizes) -> Result<EventSet, JdwpError> {
    let mut r = PacketReader::new(data, sizes);
    let suspend_policy = r.u8()?;
    let count = r.count()?;
    let mut events = Vec::with_capacity(count);
    for _ in 0..count {
        events.push(decode_event(&mut r)?);
    }
    Ok(EventSet {
        suspend_policy,
        events,
    })
}

fn decode_event(r: &mut PacketReader<'_>) -> Result<Event, JdwpError> {
    let kind = r.u8()?;
    let request_id = r.i32()?;
    let event = match kind {
        event_kind::VM_START => Event::VmStart {
            request_id,
            thread: r.object_id()?,
        },
        event_kind::SINGLE_STEP => Event::SingleStep {
            request_id,
            thread: r.object_id()?,
            location: r.location()?,
        },
        event_kind::BREAKPOINT => Event::Breakpoint {
            request_id,
            thread: r.object_id()?,
            location: r.location()?,
        },
        event_kind::METHOD_ENTRY => Event::MethodEntry {
            request_id,
            thread: r.object_id()?,
            location: r.location()?,
        },
        event_kind::METHOD_EXIT => Event::MethodExit {
            request_id,
            thread: r.object_id()?,
            location: r.location()?,
        },
        event_kind::EXCEPTION => {
            let thread = r.object_id()?;
            let location = r.location()?;
            let (_tag, exception) = r.tagged_object_id()?;
            let catch_location = optional_location(r)?;
            Event::Exception {
                request_id,
                thread,
                location,
                exception,
                catch_location,
            }
        }
        event_kind::THREAD_START => Event::ThreadStart {
            request_id,
            thread: r.object_id()?,
        },
        event_kind::THREAD_DEATH => Event::ThreadDeath {
            request_id,
            thread: r.object_id()?,
        },
        event_kind::CLASS_PREPARE => Event::ClassPrepare {
            request_id,
            thread: r.object_id()?,
            type_tag: r.type_tag()?,
            type_id: r.reference_type_id()?,
            signature: r.string()?,
            status: r.i32()?,
        },
        event_kind::CLASS_UNLOAD => Event::ClassUnload {
            request_id,
            signature: r.string()?,
        },
        event_kind::VM_DEATH => Event::VmDeath { request_id },
        other => {
            return Err(JdwpError::Decode(format!(
                "unsupported event kind {other} in composite"
            )))
        }
    };
    Ok(event)
}

/// Uncaught exceptions report a catch location whose type tag is zero.
fn optional_location(r: &mut PacketReader<'_>) -> Result<Option<Location>, JdwpError> {
    let raw_tag = r.u8()?;
    let class_id = r.reference_type_id()?;
    let method_id = r.method_id()?;
    let index = r.u64()?;
    Ok(TypeTag::from_byte(raw_tag).map(|type_tag| Location {
        type_tag,
        class_id,
        method_id,
        index,
    }))
}
