//! [`TargetVm`] over a JDWP connection.
//!
//! Translates between the session's resolved view (class names, method
//! names, source lines, materialised strings and arrays) and the raw ids
//! the wire protocol speaks. Signatures, method lists, line tables and
//! field lists never change for a loaded class and are cached.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use jdbg_jdwp::protocol::{
    self as wire, error_code, event_kind, invoke_options, signature_to_name, step_depth,
    step_size, suspend_policy, tag, LineTable, MethodInfo, Modifier, TypeTag,
};
use jdbg_jdwp::{Event, EventSet, EventStream, JdwpClient, JdwpError};
use tokio::sync::{mpsc, Mutex};

use crate::error::TargetError;
use crate::event::{DebugEvent, EventBatch};
use crate::target::TargetVm;
use crate::types::{
    Field, Frame, FrameId, Location, MethodRef, ObjectId, RequestId, RequestKind, StepKind,
    StepScope, ThreadId, TypeKind, TypeRef, Variable,
};
use crate::value::{ArrayValue, ObjectRef, Value};

type ConvertFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, TargetError>> + Send + 'a>>;

/// A target VM reached through its JDWP agent.
pub struct JdwpTarget {
    client: JdwpClient,
    signatures: Mutex<HashMap<u64, String>>,
    methods: Mutex<HashMap<u64, Vec<MethodInfo>>>,
    line_tables: Mutex<HashMap<(u64, u64), Option<LineTable>>>,
    fields: Mutex<HashMap<u64, Vec<Field>>>,
}

impl JdwpTarget {
    pub fn new(client: JdwpClient) -> Self {
        Self {
            client,
            signatures: Mutex::new(HashMap::new()),
            methods: Mutex::new(HashMap::new()),
            line_tables: Mutex::new(HashMap::new()),
            fields: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &JdwpClient {
        &self.client
    }

    // -----------------------------------------------------------------------
    // Cached lookups
    // -----------------------------------------------------------------------

    async fn signature(&self, ref_type: u64) -> Result<String, JdwpError> {
        if let Some(sig) = self.signatures.lock().await.get(&ref_type) {
            return Ok(sig.clone());
        }
        let sig = self.client.signature(ref_type).await?;
        self.signatures.lock().await.insert(ref_type, sig.clone());
        Ok(sig)
    }

    async fn type_ref(&self, type_tag: TypeTag, id: u64) -> Result<TypeRef, JdwpError> {
        let signature = self.signature(id).await?;
        Ok(TypeRef {
            id,
            name: signature_to_name(&signature),
            kind: kind_of(type_tag),
        })
    }

    async fn methods(&self, ref_type: u64) -> Result<Vec<MethodInfo>, JdwpError> {
        if let Some(methods) = self.methods.lock().await.get(&ref_type) {
            return Ok(methods.clone());
        }
        let methods = self.client.methods(ref_type).await?;
        self.methods.lock().await.insert(ref_type, methods.clone());
        Ok(methods)
    }

    /// The method's line table, `None` for classes compiled without line
    /// information and for native or abstract methods.
    async fn line_table(&self, ref_type: u64, method: u64) -> Result<Option<LineTable>, JdwpError> {
        if let Some(table) = self.line_tables.lock().await.get(&(ref_type, method)) {
            return Ok(table.clone());
        }
        let table = match self.client.line_table(ref_type, method).await {
            Ok(table) => Some(table),
            Err(e) if is_absent(&e) || e.vm_code() == Some(error_code::NATIVE_METHOD) => None,
            Err(e) => return Err(e),
        };
        self.line_tables
            .lock()
            .await
            .insert((ref_type, method), table.clone());
        Ok(table)
    }

    /// Resolve a wire location into class, method and source line.
    async fn location(&self, raw: &wire::Location) -> Result<Location, JdwpError> {
        let class = self.type_ref(raw.type_tag, raw.class_id).await?;
        let name = self
            .methods(raw.class_id)
            .await?
            .into_iter()
            .find(|m| m.id == raw.method_id)
            .map(|m| m.name)
            .unwrap_or_else(|| format!("<method {}>", raw.method_id));
        let line = self
            .line_table(raw.class_id, raw.method_id)
            .await?
            .and_then(|table| table.line_for(raw.index))
            .and_then(|line| u32::try_from(line).ok());
        Ok(Location {
            class,
            method: MethodRef {
                id: raw.method_id,
                name,
            },
            line,
            code_index: raw.index,
        })
    }

    async fn object_ref(&self, id: u64) -> Result<ObjectRef, JdwpError> {
        let (type_tag, type_id) = self.client.object_reference_type(id).await?;
        let ty = self.type_ref(type_tag, type_id).await?;
        Ok(ObjectRef {
            id: ObjectId(id),
            type_id,
            type_name: ty.name,
        })
    }

    /// Convert a wire value, reading strings and arrays in full.
    fn convert(&self, raw: wire::Value) -> ConvertFuture<'_> {
        Box::pin(async move {
            let value = match raw {
                wire::Value::Boolean(v) => Value::Boolean(v),
                wire::Value::Byte(v) => Value::Byte(v),
                wire::Value::Char(v) => {
                    Value::Char(char::from_u32(u32::from(v)).unwrap_or(char::REPLACEMENT_CHARACTER))
                }
                wire::Value::Short(v) => Value::Short(v),
                wire::Value::Int(v) => Value::Int(v),
                wire::Value::Long(v) => Value::Long(v),
                wire::Value::Float(v) => Value::Float(v),
                wire::Value::Double(v) => Value::Double(v),
                wire::Value::Void => Value::Void,
                wire::Value::Object { id: 0, .. } => Value::Null,
                wire::Value::Object { tag: tag::STRING, id } => {
                    Value::Str(self.client.string_value(id).await?)
                }
                wire::Value::Object { tag: tag::ARRAY, id } => {
                    let (type_tag, type_id) = self.client.object_reference_type(id).await?;
                    let ty = self.type_ref(type_tag, type_id).await?;
                    let length = self.client.array_length(id).await?;
                    let raw_elements = if length == 0 {
                        Vec::new()
                    } else {
                        self.client.array_values(id, 0, length).await?
                    };
                    let mut elements = Vec::with_capacity(raw_elements.len());
                    for element in raw_elements {
                        elements.push(self.convert(element).await?);
                    }
                    Value::Array(ArrayValue {
                        type_name: ty.name,
                        elements,
                    })
                }
                wire::Value::Object { id, .. } => Value::Object(self.object_ref(id).await?),
            };
            Ok(value)
        })
    }

    /// Find `name` with `signature` on `class` or its superclasses.
    async fn find_method(
        &self,
        class: u64,
        name: &str,
        signature: &str,
    ) -> Result<Option<(u64, u64)>, JdwpError> {
        let mut current = Some(class);
        while let Some(ty) = current {
            let methods = self.methods(ty).await?;
            if let Some(m) = methods
                .iter()
                .find(|m| m.name == name && m.signature == signature)
            {
                return Ok(Some((ty, m.id)));
            }
            current = self.client.superclass(ty).await?;
        }
        Ok(None)
    }

    async fn set_request(&self, kind: u8, modifiers: &[Modifier]) -> Result<RequestId, TargetError> {
        let id = self
            .client
            .set_event_request(kind, suspend_policy::ALL, modifiers)
            .await?;
        Ok(RequestId(id))
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    async fn translate_set(&self, set: EventSet) -> EventBatch {
        let mut events = Vec::with_capacity(set.events.len());
        for event in set.events {
            events.push(self.translate(event).await);
        }
        EventBatch::new(events)
    }

    async fn translate(&self, event: Event) -> DebugEvent {
        match event {
            Event::VmStart { thread, .. } => DebugEvent::ProcessStart {
                thread: ThreadId(thread),
            },
            Event::ClassPrepare {
                thread,
                type_tag,
                type_id,
                signature,
                ..
            } => {
                let class = TypeRef {
                    id: type_id,
                    name: signature_to_name(&signature),
                    kind: kind_of(type_tag),
                };
                self.signatures.lock().await.insert(type_id, signature);
                DebugEvent::ClassLoad {
                    thread: ThreadId(thread),
                    class,
                }
            }
            Event::Breakpoint {
                request_id,
                thread,
                location,
            } => match self.location(&location).await {
                Ok(location) => DebugEvent::Breakpoint {
                    thread: ThreadId(thread),
                    location,
                    request: RequestId(request_id),
                },
                Err(e) => DebugEvent::Malformed(format!("breakpoint location: {e}")),
            },
            Event::SingleStep {
                request_id,
                thread,
                location,
            } => match self.location(&location).await {
                Ok(location) => DebugEvent::Step {
                    thread: ThreadId(thread),
                    location,
                    request: RequestId(request_id),
                },
                Err(e) => DebugEvent::Malformed(format!("step location: {e}")),
            },
            Event::MethodEntry {
                request_id,
                thread,
                location,
            } => match self.location(&location).await {
                Ok(location) => DebugEvent::MethodEntry {
                    thread: ThreadId(thread),
                    location,
                    request: RequestId(request_id),
                },
                Err(e) => DebugEvent::Malformed(format!("method entry location: {e}")),
            },
            Event::VmDeath { .. } => DebugEvent::ProcessExit,
            other => DebugEvent::Other {
                description: other.kind_name().to_string(),
            },
        }
    }
}

/// Translate raw composites into event batches for the listener. When the
/// connection closes a final [`DebugEvent::Disconnect`] is delivered.
pub fn spawn_event_pump(target: Arc<JdwpTarget>, mut raw: EventStream) -> mpsc::Receiver<EventBatch> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        while let Some(item) = raw.recv().await {
            let batch = match item {
                Ok(set) => target.translate_set(set).await,
                Err(e) => {
                    tracing::warn!("undecodable event composite: {}", e);
                    EventBatch::single(DebugEvent::Malformed(e.to_string()))
                }
            };
            if tx.send(batch).await.is_err() {
                return;
            }
        }
        tracing::debug!("event stream closed");
        let _ = tx.send(EventBatch::single(DebugEvent::Disconnect)).await;
    });
    rx
}

impl TargetVm for JdwpTarget {
    async fn resume(&self) -> Result<(), TargetError> {
        Ok(self.client.resume().await?)
    }

    async fn exit(&self, code: i32) -> Result<(), TargetError> {
        Ok(self.client.exit(code).await?)
    }

    async fn loaded_class(&self, name: &str) -> Result<Option<TypeRef>, TargetError> {
        let classes = self
            .client
            .classes_by_signature(&wire::class_signature(name))
            .await?;
        Ok(classes.first().map(|c| TypeRef {
            id: c.id,
            name: name.to_string(),
            kind: kind_of(c.type_tag),
        }))
    }

    async fn watch_class_load(&self, pattern: &str) -> Result<RequestId, TargetError> {
        self.set_request(
            event_kind::CLASS_PREPARE,
            &[Modifier::ClassMatch(pattern.to_string())],
        )
        .await
    }

    async fn line_locations(&self, class: &TypeRef, line: u32) -> Result<Vec<Location>, TargetError> {
        let target_line = i32::try_from(line).unwrap_or(i32::MAX);
        let mut found = Vec::new();
        for method in self.methods(class.id).await? {
            let Some(table) = self.line_table(class.id, method.id).await? else {
                continue;
            };
            if let Some(index) = table.first_index_of(target_line) {
                found.push(Location {
                    class: class.clone(),
                    method: MethodRef {
                        id: method.id,
                        name: method.name,
                    },
                    line: Some(line),
                    code_index: index,
                });
            }
        }
        Ok(found)
    }

    async fn set_breakpoint(&self, location: &Location) -> Result<RequestId, TargetError> {
        let raw = wire::Location {
            type_tag: tag_of(location.class.kind),
            class_id: location.class.id,
            method_id: location.method.id,
            index: location.code_index,
        };
        self.set_request(event_kind::BREAKPOINT, &[Modifier::LocationOnly(raw)])
            .await
    }

    async fn set_step(
        &self,
        thread: ThreadId,
        kind: StepKind,
        scope: &StepScope,
    ) -> Result<RequestId, TargetError> {
        self.set_request(event_kind::SINGLE_STEP, &step_modifiers(thread, kind, scope))
            .await
    }

    async fn set_method_entry(&self, pattern: &str) -> Result<RequestId, TargetError> {
        self.set_request(
            event_kind::METHOD_ENTRY,
            &[Modifier::ClassMatch(pattern.to_string())],
        )
        .await
    }

    async fn clear_request(&self, kind: RequestKind, id: RequestId) -> Result<(), TargetError> {
        Ok(self.client.clear_event_request(event_kind_of(kind), id.0).await?)
    }

    async fn frames(&self, thread: ThreadId) -> Result<Vec<Frame>, TargetError> {
        let raw = self.client.frames(thread.0).await?;
        let mut frames = Vec::with_capacity(raw.len());
        for (id, location) in raw {
            frames.push(Frame {
                id: FrameId(id),
                location: self.location(&location).await?,
            });
        }
        Ok(frames)
    }

    async fn locals(&self, thread: ThreadId, frame: &Frame) -> Result<Vec<Variable>, TargetError> {
        let location = &frame.location;
        let table = match self
            .client
            .variable_table(location.class.id, location.method.id)
            .await
        {
            Ok(table) => table,
            Err(e) if is_absent(&e) => {
                return Err(TargetError::Unavailable(format!(
                    "no local variable information for {}; compile with -g",
                    location.qualified_method()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let visible: Vec<_> = table
            .into_iter()
            .filter(|v| v.is_visible_at(location.code_index) && v.name != "this")
            .collect();
        if visible.is_empty() {
            return Ok(Vec::new());
        }
        let slots: Vec<(i32, u8)> = visible
            .iter()
            .map(|v| (v.slot, v.signature.bytes().next().unwrap_or(tag::OBJECT)))
            .collect();
        let values = self.client.frame_values(thread.0, frame.id.0, &slots).await?;

        let mut locals = Vec::with_capacity(visible.len());
        for (slot, raw) in visible.into_iter().zip(values) {
            locals.push(Variable {
                type_name: signature_to_name(&slot.signature),
                name: slot.name,
                value: self.convert(raw).await?,
            });
        }
        Ok(locals)
    }

    async fn this_object(
        &self,
        thread: ThreadId,
        frame: &Frame,
    ) -> Result<Option<ObjectRef>, TargetError> {
        match self.client.this_object(thread.0, frame.id.0).await? {
            Some(id) => Ok(Some(self.object_ref(id).await?)),
            None => Ok(None),
        }
    }

    async fn fields(&self, ty: &TypeRef) -> Result<Vec<Field>, TargetError> {
        if let Some(fields) = self.fields.lock().await.get(&ty.id) {
            return Ok(fields.clone());
        }

        let mut all = Vec::new();
        let mut current = Some(ty.clone());
        while let Some(declaring) = current {
            for info in self.client.fields(declaring.id).await? {
                all.push(Field {
                    id: info.id,
                    is_static: info.is_static(),
                    type_name: signature_to_name(&info.signature),
                    name: info.name,
                    declaring: declaring.clone(),
                });
            }
            current = match declaring.kind {
                TypeKind::Class => match self.client.superclass(declaring.id).await? {
                    Some(id) => Some(self.type_ref(TypeTag::Class, id).await?),
                    None => None,
                },
                TypeKind::Interface | TypeKind::Array => None,
            };
        }

        self.fields.lock().await.insert(ty.id, all.clone());
        Ok(all)
    }

    async fn static_value(&self, field: &Field) -> Result<Value, TargetError> {
        let values = self
            .client
            .static_values(field.declaring.id, &[field.id])
            .await?;
        let raw = values.into_iter().next().ok_or_else(|| {
            JdwpError::Decode(format!("no value returned for field {}", field.name))
        })?;
        self.convert(raw).await
    }

    async fn instance_value(&self, object: &ObjectRef, field: &Field) -> Result<Value, TargetError> {
        let values = self.client.object_values(object.id.0, &[field.id]).await?;
        let raw = values.into_iter().next().ok_or_else(|| {
            JdwpError::Decode(format!("no value returned for field {}", field.name))
        })?;
        self.convert(raw).await
    }

    async fn invoke_method(
        &self,
        thread: ThreadId,
        object: &ObjectRef,
        name: &str,
        signature: &str,
    ) -> Result<Value, TargetError> {
        let failed = |reason: String| TargetError::Invocation {
            method: format!("{}.{name}{signature}", object.type_name),
            reason,
        };

        let (class, method) = self
            .find_method(object.type_id, name, signature)
            .await?
            .ok_or_else(|| failed("no such method".to_string()))?;
        let result = self
            .client
            .invoke_method(
                object.id.0,
                thread.0,
                class,
                method,
                invoke_options::SINGLE_THREADED,
            )
            .await
            .map_err(|e| failed(e.to_string()))?;

        if result.exception != 0 {
            let thrown = match self.object_ref(result.exception).await {
                Ok(exception) => exception.type_name,
                Err(_) => "an exception".to_string(),
            };
            return Err(failed(format!("threw {thrown}")));
        }
        self.convert(result.value).await
    }
}

fn is_absent(e: &JdwpError) -> bool {
    e.vm_code() == Some(error_code::ABSENT_INFORMATION)
}

fn kind_of(type_tag: TypeTag) -> TypeKind {
    match type_tag {
        TypeTag::Class => TypeKind::Class,
        TypeTag::Interface => TypeKind::Interface,
        TypeTag::Array => TypeKind::Array,
    }
}

fn tag_of(kind: TypeKind) -> TypeTag {
    match kind {
        TypeKind::Class => TypeTag::Class,
        TypeKind::Interface => TypeTag::Interface,
        TypeKind::Array => TypeTag::Array,
    }
}

fn event_kind_of(kind: RequestKind) -> u8 {
    match kind {
        RequestKind::Breakpoint => event_kind::BREAKPOINT,
        RequestKind::Step => event_kind::SINGLE_STEP,
        RequestKind::MethodEntry => event_kind::METHOD_ENTRY,
        RequestKind::ClassLoad => event_kind::CLASS_PREPARE,
    }
}

/// Line-granular, single-shot step filtered to `scope`.
fn step_modifiers(thread: ThreadId, kind: StepKind, scope: &StepScope) -> Vec<Modifier> {
    let depth = match kind {
        StepKind::Over => step_depth::OVER,
        StepKind::Into => step_depth::INTO,
    };
    let filter = match scope {
        StepScope::Instance(object) => Modifier::InstanceOnly(object.0),
        StepScope::ClassPattern(pattern) => Modifier::ClassMatch(pattern.clone()),
    };
    vec![
        Modifier::Step {
            thread: thread.0,
            size: step_size::LINE,
            depth,
        },
        filter,
        Modifier::Count(1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use jdbg_jdwp::codec::PacketWriter;
    use jdbg_jdwp::protocol::{command_set, event_command, IdSizes};
    use jdbg_jdwp::transport::{encode_command, encode_reply, read_packet, HANDSHAKE};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    #[test]
    fn jdwp_target_step_modifiers() {
        let modifiers = step_modifiers(
            ThreadId(4),
            StepKind::Into,
            &StepScope::ClassPattern("Test*".into()),
        );
        assert_eq!(
            modifiers,
            vec![
                Modifier::Step {
                    thread: 4,
                    size: step_size::LINE,
                    depth: step_depth::INTO
                },
                Modifier::ClassMatch("Test*".into()),
                Modifier::Count(1),
            ]
        );

        let modifiers = step_modifiers(ThreadId(4), StepKind::Over, &StepScope::Instance(ObjectId(9)));
        assert!(matches!(
            modifiers[0],
            Modifier::Step {
                depth: step_depth::OVER,
                ..
            }
        ));
        assert_eq!(modifiers[1], Modifier::InstanceOnly(9));
    }

    #[test]
    fn jdwp_target_request_kinds() {
        assert_eq!(event_kind_of(RequestKind::Breakpoint), event_kind::BREAKPOINT);
        assert_eq!(event_kind_of(RequestKind::Step), event_kind::SINGLE_STEP);
        assert_eq!(event_kind_of(RequestKind::MethodEntry), event_kind::METHOD_ENTRY);
        assert_eq!(event_kind_of(RequestKind::ClassLoad), event_kind::CLASS_PREPARE);
    }

    #[test]
    fn jdwp_target_type_kinds_round_trip() {
        for tag in [TypeTag::Class, TypeTag::Interface, TypeTag::Array] {
            assert_eq!(tag_of(kind_of(tag)), tag);
        }
    }

    fn id_sizes_body() -> Vec<u8> {
        let mut w = PacketWriter::new(IdSizes::default());
        for _ in 0..5 {
            w.i32(8);
        }
        w.into_bytes()
    }

    async fn bootstrap(server: &mut DuplexStream) {
        let mut buf = [0u8; 14];
        server.read_exact(&mut buf).await.unwrap();
        server.write_all(HANDSHAKE).await.unwrap();
        let request = read_packet(server).await.unwrap();
        server
            .write_all(&encode_reply(request.id(), 0, &id_sizes_body()))
            .await
            .unwrap();
    }

    async fn connect() -> (Arc<JdwpTarget>, EventStream, DuplexStream) {
        let (client_end, mut server) = tokio::io::duplex(4096);
        let vm = tokio::spawn(async move {
            bootstrap(&mut server).await;
            server
        });
        let (client, events) = JdwpClient::from_stream(client_end, Duration::from_secs(5))
            .await
            .unwrap();
        let server = vm.await.unwrap();
        (Arc::new(JdwpTarget::new(client)), events, server)
    }

    #[tokio::test]
    async fn jdwp_target_pump_translates_and_reports_disconnect() {
        let (target, raw, mut server) = connect().await;
        let mut batches = spawn_event_pump(target, raw);

        let mut w = PacketWriter::new(IdSizes::default());
        w.u8(suspend_policy::ALL)
            .i32(2)
            .u8(event_kind::CLASS_PREPARE)
            .i32(3)
            .object_id(1)
            .u8(TypeTag::Class.to_byte())
            .reference_type_id(42)
            .string("Ldemo/Main;")
            .i32(7)
            .u8(event_kind::VM_DEATH)
            .i32(0);
        server
            .write_all(&encode_command(
                200,
                command_set::EVENT,
                event_command::COMPOSITE,
                &w.into_bytes(),
            ))
            .await
            .unwrap();

        let batch = batches.recv().await.unwrap();
        assert_eq!(
            batch.events,
            vec![
                DebugEvent::ClassLoad {
                    thread: ThreadId(1),
                    class: TypeRef::class(42, "demo.Main"),
                },
                DebugEvent::ProcessExit,
            ]
        );

        drop(server);
        let last = batches.recv().await.unwrap();
        assert_eq!(last.events, vec![DebugEvent::Disconnect]);
    }

    #[tokio::test]
    async fn jdwp_target_loaded_class_lookup() {
        let (target, _raw, mut server) = connect().await;
        let vm = tokio::spawn(async move {
            let request = read_packet(&mut server).await.unwrap();
            let mut w = PacketWriter::new(IdSizes::default());
            w.i32(1).u8(TypeTag::Class.to_byte()).reference_type_id(42).i32(7);
            server
                .write_all(&encode_reply(request.id(), 0, &w.into_bytes()))
                .await
                .unwrap();
            server
        });
        let class = target.loaded_class("demo.Main").await.unwrap();
        let _server = vm.await.unwrap();
        assert_eq!(class, Some(TypeRef::class(42, "demo.Main")));
    }

    #[tokio::test]
    async fn jdwp_target_absent_variable_table_is_unavailable() {
        let (target, _raw, mut server) = connect().await;
        let vm = tokio::spawn(async move {
            let request = read_packet(&mut server).await.unwrap();
            server
                .write_all(&encode_reply(
                    request.id(),
                    error_code::ABSENT_INFORMATION,
                    &[],
                ))
                .await
                .unwrap();
            server
        });
        let class = TypeRef::class(42, "demo.Main");
        let frame = Frame {
            id: FrameId(1),
            location: Location {
                class,
                method: MethodRef {
                    id: 5,
                    name: "main".into(),
                },
                line: Some(3),
                code_index: 0,
            },
        };
        let err = target.locals(ThreadId(1), &frame).await.unwrap_err();
        let _server = vm.await.unwrap();
        assert!(matches!(err, TargetError::Unavailable(_)));
        assert!(err.to_string().contains("compile with -g"));
    }
}
