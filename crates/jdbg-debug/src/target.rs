//! The protocol-client abstraction the session engine drives.

use std::future::Future;

use crate::error::TargetError;
use crate::types::{
    Field, Frame, Location, RequestId, RequestKind, StepKind, StepScope, ThreadId, TypeRef,
    Variable,
};
use crate::value::{ObjectRef, Value};

/// Method used to render collection-like objects.
pub const TO_ARRAY: (&str, &str) = ("toArray", "()[Ljava/lang/Object;");

/// Method used to render every other object.
pub const TO_STRING: (&str, &str) = ("toString", "()Ljava/lang/String;");

/// A debuggable VM.
///
/// Every call is a round trip to the target. Frame, local and invocation
/// calls need the thread to be suspended.
pub trait TargetVm: Send + Sync + 'static {
    /// Resume every thread.
    fn resume(&self) -> impl Future<Output = Result<(), TargetError>> + Send;

    /// Terminate the VM with `code`.
    fn exit(&self, code: i32) -> impl Future<Output = Result<(), TargetError>> + Send;

    /// Look up a class that is already loaded.
    fn loaded_class(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<TypeRef>, TargetError>> + Send;

    /// Report (and suspend on) loads of classes matching `pattern`.
    fn watch_class_load(
        &self,
        pattern: &str,
    ) -> impl Future<Output = Result<RequestId, TargetError>> + Send;

    /// Code locations of `line` in `class`, lowest offset first per method.
    fn line_locations(
        &self,
        class: &TypeRef,
        line: u32,
    ) -> impl Future<Output = Result<Vec<Location>, TargetError>> + Send;

    fn set_breakpoint(
        &self,
        location: &Location,
    ) -> impl Future<Output = Result<RequestId, TargetError>> + Send;

    /// A one-shot, line-granular step on `thread`.
    fn set_step(
        &self,
        thread: ThreadId,
        kind: StepKind,
        scope: &StepScope,
    ) -> impl Future<Output = Result<RequestId, TargetError>> + Send;

    /// Break on entry to methods of classes matching `pattern`.
    fn set_method_entry(
        &self,
        pattern: &str,
    ) -> impl Future<Output = Result<RequestId, TargetError>> + Send;

    fn clear_request(
        &self,
        kind: RequestKind,
        id: RequestId,
    ) -> impl Future<Output = Result<(), TargetError>> + Send;

    /// Frames of a suspended thread, innermost first.
    fn frames(
        &self,
        thread: ThreadId,
    ) -> impl Future<Output = Result<Vec<Frame>, TargetError>> + Send;

    /// Locals visible at the frame's current position.
    fn locals(
        &self,
        thread: ThreadId,
        frame: &Frame,
    ) -> impl Future<Output = Result<Vec<Variable>, TargetError>> + Send;

    /// The frame's receiver; `None` in static methods.
    fn this_object(
        &self,
        thread: ThreadId,
        frame: &Frame,
    ) -> impl Future<Output = Result<Option<ObjectRef>, TargetError>> + Send;

    /// Fields of `ty` and its superclasses, own fields first.
    fn fields(&self, ty: &TypeRef) -> impl Future<Output = Result<Vec<Field>, TargetError>> + Send;

    fn static_value(&self, field: &Field)
        -> impl Future<Output = Result<Value, TargetError>> + Send;

    fn instance_value(
        &self,
        object: &ObjectRef,
        field: &Field,
    ) -> impl Future<Output = Result<Value, TargetError>> + Send;

    /// Call a zero-argument method on `object` in `thread` and return its
    /// result. Failures, including exceptions thrown by the method, are
    /// [`TargetError::Invocation`].
    fn invoke_method(
        &self,
        thread: ThreadId,
        object: &ObjectRef,
        name: &str,
        signature: &str,
    ) -> impl Future<Output = Result<Value, TargetError>> + Send;
}
