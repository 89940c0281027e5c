//! A scripted in-memory [`TargetVm`] that records every request.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::TargetError;
use crate::target::TargetVm;
use crate::types::{
    Field, Frame, FrameId, Location, MethodRef, ObjectId, RequestId, RequestKind, StepKind,
    StepScope, ThreadId, TypeRef, Variable,
};
use crate::value::{ObjectRef, Value};

/// A request the session made.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeCall {
    Resume,
    Exit(i32),
    WatchClassLoad(String),
    SetBreakpoint { line: Option<u32>, id: RequestId },
    SetStep {
        thread: ThreadId,
        kind: StepKind,
        scope: StepScope,
        id: RequestId,
    },
    SetMethodEntry(String),
    ClearRequest(RequestKind, RequestId),
    Invoke { object: ObjectId, method: String },
}

#[derive(Debug, Default)]
struct FakeState {
    loaded: HashMap<String, TypeRef>,
    lines: HashMap<(u64, u32), Vec<Location>>,
    frames: Vec<Frame>,
    locals: Vec<Variable>,
    this: Option<ObjectRef>,
    fields: HashMap<u64, Vec<Field>>,
    static_values: HashMap<u64, Value>,
    instance_values: HashMap<(u64, u64), Value>,
    invocations: HashMap<(u64, String), Value>,
    fail_invocations: bool,
    calls: Vec<FakeCall>,
    next_request: i32,
}

/// In-memory target. Configure it with the `with_*`/`set_*` methods, then
/// inspect [`FakeTarget::calls`].
#[derive(Debug, Default)]
pub struct FakeTarget {
    state: Mutex<FakeState>,
}

impl FakeTarget {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A location in `class.method` at `line`.
    pub fn location(class: &TypeRef, method: &str, line: u32) -> Location {
        Location {
            class: class.clone(),
            method: MethodRef {
                id: u64::from(line) + 1000,
                name: method.to_string(),
            },
            line: Some(line),
            code_index: u64::from(line) * 4,
        }
    }

    /// Mark `name` as loaded, e.g. when the session attaches late.
    pub fn with_loaded_class(&self, class: &TypeRef) {
        self.state().loaded.insert(class.name.clone(), class.clone());
    }

    /// Give `line` of `class` executable code in `main`.
    pub fn with_code_at(&self, class: &TypeRef, line: u32) {
        let location = Self::location(class, "main", line);
        self.state()
            .lines
            .entry((class.id, line))
            .or_default()
            .push(location);
    }

    pub fn set_frames(&self, frames: Vec<Frame>) {
        self.state().frames = frames;
    }

    /// Shorthand for a single frame at `location`.
    pub fn set_single_frame(&self, location: Location) {
        self.set_frames(vec![Frame {
            id: FrameId(1),
            location,
        }]);
    }

    pub fn set_locals(&self, locals: Vec<Variable>) {
        self.state().locals = locals;
    }

    pub fn set_this(&self, this: Option<ObjectRef>) {
        self.state().this = this;
    }

    /// Declare a field; its value comes from `set_static_value` or
    /// `set_instance_value`.
    pub fn with_field(&self, ty: &TypeRef, field: Field) {
        self.state().fields.entry(ty.id).or_default().push(field);
    }

    pub fn set_static_value(&self, field: &Field, value: Value) {
        self.state().static_values.insert(field.id, value);
    }

    pub fn set_instance_value(&self, object: &ObjectRef, field: &Field, value: Value) {
        self.state()
            .instance_values
            .insert((object.id.0, field.id), value);
    }

    /// What `object.method()` returns when invoked.
    pub fn on_invoke(&self, object: &ObjectRef, method: &str, result: Value) {
        self.state()
            .invocations
            .insert((object.id.0, method.to_string()), result);
    }

    /// Make every invocation fail.
    pub fn fail_invocations(&self) {
        self.state().fail_invocations = true;
    }

    /// Every request made so far.
    pub fn calls(&self) -> Vec<FakeCall> {
        self.state().calls.clone()
    }

    /// How many recorded requests satisfy `pred`.
    pub fn count(&self, pred: impl Fn(&FakeCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: FakeCall) {
        self.state().calls.push(call);
    }

    fn next_request(&self) -> RequestId {
        let mut state = self.state();
        state.next_request += 1;
        RequestId(state.next_request)
    }
}

impl TargetVm for FakeTarget {
    async fn resume(&self) -> Result<(), TargetError> {
        self.record(FakeCall::Resume);
        Ok(())
    }

    async fn exit(&self, code: i32) -> Result<(), TargetError> {
        self.record(FakeCall::Exit(code));
        Ok(())
    }

    async fn loaded_class(&self, name: &str) -> Result<Option<TypeRef>, TargetError> {
        Ok(self.state().loaded.get(name).cloned())
    }

    async fn watch_class_load(&self, pattern: &str) -> Result<RequestId, TargetError> {
        self.record(FakeCall::WatchClassLoad(pattern.to_string()));
        Ok(self.next_request())
    }

    async fn line_locations(&self, class: &TypeRef, line: u32) -> Result<Vec<Location>, TargetError> {
        Ok(self
            .state()
            .lines
            .get(&(class.id, line))
            .cloned()
            .unwrap_or_default())
    }

    async fn set_breakpoint(&self, location: &Location) -> Result<RequestId, TargetError> {
        let id = self.next_request();
        self.record(FakeCall::SetBreakpoint {
            line: location.line,
            id,
        });
        Ok(id)
    }

    async fn set_step(
        &self,
        thread: ThreadId,
        kind: StepKind,
        scope: &StepScope,
    ) -> Result<RequestId, TargetError> {
        let id = self.next_request();
        self.record(FakeCall::SetStep {
            thread,
            kind,
            scope: scope.clone(),
            id,
        });
        Ok(id)
    }

    async fn set_method_entry(&self, pattern: &str) -> Result<RequestId, TargetError> {
        self.record(FakeCall::SetMethodEntry(pattern.to_string()));
        Ok(self.next_request())
    }

    async fn clear_request(&self, kind: RequestKind, id: RequestId) -> Result<(), TargetError> {
        self.record(FakeCall::ClearRequest(kind, id));
        Ok(())
    }

    async fn frames(&self, _thread: ThreadId) -> Result<Vec<Frame>, TargetError> {
        Ok(self.state().frames.clone())
    }

    async fn locals(&self, _thread: ThreadId, _frame: &Frame) -> Result<Vec<Variable>, TargetError> {
        Ok(self.state().locals.clone())
    }

    async fn this_object(
        &self,
        _thread: ThreadId,
        _frame: &Frame,
    ) -> Result<Option<ObjectRef>, TargetError> {
        Ok(self.state().this.clone())
    }

    async fn fields(&self, ty: &TypeRef) -> Result<Vec<Field>, TargetError> {
        Ok(self.state().fields.get(&ty.id).cloned().unwrap_or_default())
    }

    async fn static_value(&self, field: &Field) -> Result<Value, TargetError> {
        Ok(self
            .state()
            .static_values
            .get(&field.id)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn instance_value(&self, object: &ObjectRef, field: &Field) -> Result<Value, TargetError> {
        Ok(self
            .state()
            .instance_values
            .get(&(object.id.0, field.id))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn invoke_method(
        &self,
        _thread: ThreadId,
        object: &ObjectRef,
        name: &str,
        signature: &str,
    ) -> Result<Value, TargetError> {
        self.record(FakeCall::Invoke {
            object: object.id,
            method: name.to_string(),
        });
        let state = self.state();
        if state.fail_invocations {
            return Err(TargetError::Invocation {
                method: format!("{name}{signature}"),
                reason: "threw java.lang.IllegalStateException".into(),
            });
        }
        state
            .invocations
            .get(&(object.id.0, name.to_string()))
            .cloned()
            .ok_or_else(|| TargetError::Invocation {
                method: format!("{name}{signature}"),
                reason: format!("no such method on {}", object.type_name),
            })
    }
}
