//! Handles and descriptors for things living in the target VM.

use std::fmt;

use crate::value::Value;

/// A thread in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u64);

/// An object in the target heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u64);

/// A stack frame; only valid while its thread stays suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// An installed event request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub i32);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of reference type a [`TypeRef`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Array,
}

/// A loaded reference type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub id: u64,
    /// Dotted name, e.g. `java.util.ArrayList`.
    pub name: String,
    pub kind: TypeKind,
}

impl TypeRef {
    pub fn class(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: TypeKind::Class,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub id: u64,
    pub name: String,
}

/// A resolved code position: method, source line and bytecode offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub class: TypeRef,
    pub method: MethodRef,
    /// `None` when the class was compiled without line information.
    pub line: Option<u32>,
    pub code_index: u64,
}

impl Location {
    /// `Class.method`
    pub fn qualified_method(&self) -> String {
        format!("{}.{}", self.class.name, self.method.name)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Line: {}, bci: {}", line, self.code_index),
            None => write!(f, "Line: ?, bci: {}", self.code_index),
        }
    }
}

/// One frame of a suspended thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: FrameId,
    pub location: Location,
}

/// A visible local variable and its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    /// Declared type, e.g. `int[]`.
    pub type_name: String,
    pub value: Value,
}

/// A field declared by `declaring` or one of its supertypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub id: u64,
    pub name: String,
    pub type_name: String,
    pub is_static: bool,
    pub declaring: TypeRef,
}

/// Kinds of event requests the session installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Breakpoint,
    Step,
    MethodEntry,
    ClassLoad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Step to the next line, running through calls.
    Over,
    /// Step to the next line, stopping inside calls.
    Into,
}

/// Restricts where a step request may fire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepScope {
    /// Only while executing on this receiver.
    Instance(ObjectId),
    /// Only in classes matching this pattern (`Test*`).
    ClassPattern(String),
}
