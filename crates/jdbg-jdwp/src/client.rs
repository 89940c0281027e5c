//! JDWP client connected to a single target VM.
//!
//! Owns a writer task and a reader task over the connection. Replies are
//! routed to waiting commands through the [`Dispatcher`]; event composites
//! are decoded and forwarded on the event channel handed out at connect time.
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{timeout, Duration, Instant};

use crate::codec::{PacketReader, PacketWriter};
use crate::dispatcher::{DispatchResult, Dispatcher};
use crate::error::JdwpError;
use crate::events::{decode_composite, EventSet};
use crate::protocol::*;
use crate::transport::{encode_command, handshake, read_packet, Packet};

/// Default timeout for a single command (seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Pause between connection attempts while the VM is starting.
const CONNECT_RETRY_MILLIS: u64 = 50;

/// Decoded event composites, or the reason one could not be decoded.
pub type EventStream = mpsc::Receiver<Result<EventSet, JdwpError>>;

/// Reply to `VirtualMachine.Version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub description: String,
    pub jdwp_major: i32,
    pub jdwp_minor: i32,
    pub vm_version: String,
    pub vm_name: String,
}

/// A connection to a target VM's debug agent.
pub struct JdwpClient {
    writer_tx: mpsc::Sender<Vec<u8>>,
    dispatcher: Arc<Mutex<Dispatcher>>,
    connected: Arc<AtomicBool>,
    next_id: AtomicU32,
    sizes: IdSizes,
    request_timeout: Duration,
}

impl JdwpClient {
    /// Connect, retrying until `deadline` elapses. A freshly launched VM
    /// needs a moment before its agent listens.
    pub async fn connect_with_retry(
        addr: SocketAddr,
        deadline: Duration,
        request_timeout: Duration,
    ) -> Result<(Self, EventStream), JdwpError> {
        let started = Instant::now();
        loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    return Self::from_stream(stream, request_timeout).await;
                }
                Err(e) if started.elapsed() < deadline => {
                    tracing::trace!("connect to {} failed, retrying: {}", addr, e);
                    tokio::time::sleep(Duration::from_millis(CONNECT_RETRY_MILLIS)).await;
                }
                Err(e) => {
                    tracing::debug!("giving up on {}: {}", addr, e);
                    return Err(JdwpError::ConnectTimeout {
                        addr: addr.to_string(),
                        millis: deadline.as_millis() as u64,
                    });
                }
            }
        }
    }

    /// Run the handshake over an established stream and start the I/O tasks.
    pub async fn from_stream<S>(
        mut stream: S,
        request_timeout: Duration,
    ) -> Result<(Self, EventStream), JdwpError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        handshake(&mut stream).await?;

        // Event decoding needs the id sizes, so ask for them before the
        // reader task exists. Events that overtake the reply are kept.
        const BOOTSTRAP_ID: u32 = 1;
        stream
            .write_all(&encode_command(
                BOOTSTRAP_ID,
                command_set::VIRTUAL_MACHINE,
                vm_command::ID_SIZES,
                &[],
            ))
            .await?;
        stream.flush().await?;

        let mut early = Vec::new();
        let sizes = loop {
            match read_packet(&mut stream).await? {
                Packet::Reply {
                    id,
                    error_code: code,
                    data,
                } if id == BOOTSTRAP_ID => {
                    if code != error_code::NONE {
                        return Err(JdwpError::Vm { code });
                    }
                    break parse_id_sizes(&data)?;
                }
                other => early.push(other),
            }
        };
        tracing::debug!("JDWP connected, id sizes {:?}", sizes);

        let (mut reader, mut writer) = tokio::io::split(stream);
        let dispatcher = Arc::new(Mutex::new(Dispatcher::new()));
        let connected = Arc::new(AtomicBool::new(true));
        let (events_tx, events_rx) = mpsc::channel(64);

        for packet in early {
            route(packet, &dispatcher, &events_tx, sizes).await;
        }

        // Writer task: sends encoded packets to the VM
        let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(64);
        tokio::spawn(async move {
            while let Some(packet) = writer_rx.recv().await {
                if writer.write_all(&packet).await.is_err() {
                    break;
                }
                if writer.flush().await.is_err() {
                    break;
                }
            }
        });

        // Reader task: routes replies and events until the connection drops
        let reader_dispatcher = dispatcher.clone();
        let reader_connected = connected.clone();
        tokio::spawn(async move {
            loop {
                match read_packet(&mut reader).await {
                    Ok(packet) => route(packet, &reader_dispatcher, &events_tx, sizes).await,
                    Err(e) => {
                        tracing::debug!("JDWP reader stopped: {}", e);
                        break;
                    }
                }
            }
            reader_connected.store(false, Ordering::Release);
            reader_dispatcher.lock().await.cancel_all();
        });

        let client = Self {
            writer_tx,
            dispatcher,
            connected,
            next_id: AtomicU32::new(BOOTSTRAP_ID + 1),
            sizes,
            request_timeout,
        };
        Ok((client, events_rx))
    }

    /// Identifier sizes negotiated at connect time.
    pub fn id_sizes(&self) -> IdSizes {
        self.sizes
    }

    /// Whether the reader still sees an open connection.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn writer(&self) -> PacketWriter {
        PacketWriter::new(self.sizes)
    }

    /// Send a command and wait for its reply body.
    pub async fn send_command(
        &self,
        command_set: u8,
        command: u8,
        data: Vec<u8>,
    ) -> Result<Vec<u8>, JdwpError> {
        if !self.is_connected() {
            return Err(JdwpError::Disconnected);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let rx = self.dispatcher.lock().await.register(id);
        tracing::trace!("-> #{} {}/{} ({} bytes)", id, command_set, command, data.len());

        if self
            .writer_tx
            .send(encode_command(id, command_set, command, &data))
            .await
            .is_err()
        {
            self.dispatcher.lock().await.cancel(id);
            return Err(JdwpError::Disconnected);
        }

        let result = match timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => return Err(JdwpError::Disconnected),
            Err(_) => {
                self.dispatcher.lock().await.cancel(id);
                return Err(JdwpError::Timeout {
                    command_set,
                    command,
                    secs: self.request_timeout.as_secs(),
                });
            }
        };

        match result {
            DispatchResult::Success(body) => Ok(body),
            DispatchResult::Error(code) => Err(JdwpError::Vm { code }),
        }
    }

    // -----------------------------------------------------------------------
    // VirtualMachine
    // -----------------------------------------------------------------------

    pub async fn version(&self) -> Result<VersionInfo, JdwpError> {
        let body = self
            .send_command(command_set::VIRTUAL_MACHINE, vm_command::VERSION, Vec::new())
            .await?;
        let mut r = PacketReader::new(&body, self.sizes);
        Ok(VersionInfo {
            description: r.string()?,
            jdwp_major: r.i32()?,
            jdwp_minor: r.i32()?,
            vm_version: r.string()?,
            vm_name: r.string()?,
        })
    }

    pub async fn classes_by_signature(&self, signature: &str) -> Result<Vec<LoadedClass>, JdwpError> {
        let mut w = self.writer();
        w.string(signature);
        let body = self
            .send_command(
                command_set::VIRTUAL_MACHINE,
                vm_command::CLASSES_BY_SIGNATURE,
                w.into_bytes(),
            )
            .await?;
        let mut r = PacketReader::new(&body, self.sizes);
        let n = r.count()?;
        let mut classes = Vec::with_capacity(n);
        for _ in 0..n {
            classes.push(LoadedClass {
                type_tag: r.type_tag()?,
                id: r.reference_type_id()?,
                status: r.i32()?,
            });
        }
        Ok(classes)
    }

    pub async fn resume(&self) -> Result<(), JdwpError> {
        self.send_command(command_set::VIRTUAL_MACHINE, vm_command::RESUME, Vec::new())
            .await
            .map(|_| ())
    }

    pub async fn exit(&self, code: i32) -> Result<(), JdwpError> {
        let mut w = self.writer();
        w.i32(code);
        self.send_command(command_set::VIRTUAL_MACHINE, vm_command::EXIT, w.into_bytes())
            .await
            .map(|_| ())
    }

    // -----------------------------------------------------------------------
    // ReferenceType / ClassType
    // -----------------------------------------------------------------------

    pub async fn signature(&self, ref_type: u64) -> Result<String, JdwpError> {
        let mut w = self.writer();
        w.reference_type_id(ref_type);
        let body = self
            .send_command(
                command_set::REFERENCE_TYPE,
                reference_type_command::SIGNATURE,
                w.into_bytes(),
            )
            .await?;
        PacketReader::new(&body, self.sizes).string()
    }

    pub async fn fields(&self, ref_type: u64) -> Result<Vec<FieldInfo>, JdwpError> {
        let mut w = self.writer();
        w.reference_type_id(ref_type);
        let body = self
            .send_command(
                command_set::REFERENCE_TYPE,
                reference_type_command::FIELDS,
                w.into_bytes(),
            )
            .await?;
        let mut r = PacketReader::new(&body, self.sizes);
        let n = r.count()?;
        let mut fields = Vec::with_capacity(n);
        for _ in 0..n {
            fields.push(FieldInfo {
                id: r.field_id()?,
                name: r.string()?,
                signature: r.string()?,
                mod_bits: r.i32()?,
            });
        }
        Ok(fields)
    }

    pub async fn methods(&self, ref_type: u64) -> Result<Vec<MethodInfo>, JdwpError> {
        let mut w = self.writer();
        w.reference_type_id(ref_type);
        let body = self
            .send_command(
                command_set::REFERENCE_TYPE,
                reference_type_command::METHODS,
                w.into_bytes(),
            )
            .await?;
        let mut r = PacketReader::new(&body, self.sizes);
        let n = r.count()?;
        let mut methods = Vec::with_capacity(n);
        for _ in 0..n {
            methods.push(MethodInfo {
                id: r.method_id()?,
                name: r.string()?,
                signature: r.string()?,
                mod_bits: r.i32()?,
            });
        }
        Ok(methods)
    }

    /// Values of static fields.
    pub async fn static_values(&self, ref_type: u64, fields: &[u64]) -> Result<Vec<Value>, JdwpError> {
        let mut w = self.writer();
        w.reference_type_id(ref_type).i32(fields.len() as i32);
        for field in fields {
            w.field_id(*field);
        }
        let body = self
            .send_command(
                command_set::REFERENCE_TYPE,
                reference_type_command::GET_VALUES,
                w.into_bytes(),
            )
            .await?;
        self.read_values(&body)
    }

    /// Direct superclass, or `None` for `java.lang.Object`.
    pub async fn superclass(&self, class: u64) -> Result<Option<u64>, JdwpError> {
        let mut w = self.writer();
        w.reference_type_id(class);
        let body = self
            .send_command(
                command_set::CLASS_TYPE,
                class_type_command::SUPERCLASS,
                w.into_bytes(),
            )
            .await?;
        let id = PacketReader::new(&body, self.sizes).reference_type_id()?;
        Ok((id != 0).then_some(id))
    }

    // -----------------------------------------------------------------------
    // Method
    // -----------------------------------------------------------------------

    pub async fn line_table(&self, ref_type: u64, method: u64) -> Result<LineTable, JdwpError> {
        let mut w = self.writer();
        w.reference_type_id(ref_type).method_id(method);
        let body = self
            .send_command(command_set::METHOD, method_command::LINE_TABLE, w.into_bytes())
            .await?;
        PacketReader::new(&body, self.sizes).line_table()
    }

    pub async fn variable_table(
        &self,
        ref_type: u64,
        method: u64,
    ) -> Result<Vec<VariableSlot>, JdwpError> {
        let mut w = self.writer();
        w.reference_type_id(ref_type).method_id(method);
        let body = self
            .send_command(
                command_set::METHOD,
                method_command::VARIABLE_TABLE,
                w.into_bytes(),
            )
            .await?;
        let mut r = PacketReader::new(&body, self.sizes);
        let _arg_count = r.i32()?;
        let n = r.count()?;
        let mut slots = Vec::with_capacity(n);
        for _ in 0..n {
            slots.push(VariableSlot {
                code_index: r.u64()?,
                name: r.string()?,
                signature: r.string()?,
                length: r.i32()? as u32,
                slot: r.i32()?,
            });
        }
        Ok(slots)
    }

    // -----------------------------------------------------------------------
    // ObjectReference / StringReference / ArrayReference
    // -----------------------------------------------------------------------

    pub async fn object_reference_type(&self, object: u64) -> Result<(TypeTag, u64), JdwpError> {
        let mut w = self.writer();
        w.object_id(object);
        let body = self
            .send_command(
                command_set::OBJECT_REFERENCE,
                object_reference_command::REFERENCE_TYPE,
                w.into_bytes(),
            )
            .await?;
        let mut r = PacketReader::new(&body, self.sizes);
        Ok((r.type_tag()?, r.reference_type_id()?))
    }

    /// Values of instance fields.
    pub async fn object_values(&self, object: u64, fields: &[u64]) -> Result<Vec<Value>, JdwpError> {
        let mut w = self.writer();
        w.object_id(object).i32(fields.len() as i32);
        for field in fields {
            w.field_id(*field);
        }
        let body = self
            .send_command(
                command_set::OBJECT_REFERENCE,
                object_reference_command::GET_VALUES,
                w.into_bytes(),
            )
            .await?;
        self.read_values(&body)
    }

    /// Invoke a zero-argument instance method in `thread`.
    pub async fn invoke_method(
        &self,
        object: u64,
        thread: u64,
        class: u64,
        method: u64,
        options: i32,
    ) -> Result<InvokeResult, JdwpError> {
        let mut w = self.writer();
        w.object_id(object)
            .object_id(thread)
            .reference_type_id(class)
            .method_id(method)
            .i32(0)
            .i32(options);
        let body = self
            .send_command(
                command_set::OBJECT_REFERENCE,
                object_reference_command::INVOKE_METHOD,
                w.into_bytes(),
            )
            .await?;
        let mut r = PacketReader::new(&body, self.sizes);
        let value = r.value()?;
        let (_tag, exception) = r.tagged_object_id()?;
        Ok(InvokeResult { value, exception })
    }

    pub async fn string_value(&self, string: u64) -> Result<String, JdwpError> {
        let mut w = self.writer();
        w.object_id(string);
        let body = self
            .send_command(
                command_set::STRING_REFERENCE,
                string_reference_command::VALUE,
                w.into_bytes(),
            )
            .await?;
        PacketReader::new(&body, self.sizes).string()
    }

    pub async fn array_length(&self, array: u64) -> Result<usize, JdwpError> {
        let mut w = self.writer();
        w.object_id(array);
        let body = self
            .send_command(
                command_set::ARRAY_REFERENCE,
                array_reference_command::LENGTH,
                w.into_bytes(),
            )
            .await?;
        PacketReader::new(&body, self.sizes).count()
    }

    pub async fn array_values(
        &self,
        array: u64,
        first: usize,
        length: usize,
    ) -> Result<Vec<Value>, JdwpError> {
        let mut w = self.writer();
        w.object_id(array).i32(first as i32).i32(length as i32);
        let body = self
            .send_command(
                command_set::ARRAY_REFERENCE,
                array_reference_command::GET_VALUES,
                w.into_bytes(),
            )
            .await?;
        let mut r = PacketReader::new(&body, self.sizes);
        let region_tag = r.u8()?;
        let n = r.count()?;
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            // Object regions tag every element; primitive regions do not.
            let value = if is_object_tag(region_tag) {
                r.value()?
            } else {
                r.untagged_value(region_tag)?
            };
            values.push(value);
        }
        Ok(values)
    }

    // -----------------------------------------------------------------------
    // ThreadReference / StackFrame
    // -----------------------------------------------------------------------

    /// All frames of a suspended thread, innermost first.
    pub async fn frames(&self, thread: u64) -> Result<Vec<(u64, Location)>, JdwpError> {
        let mut w = self.writer();
        w.object_id(thread).i32(0).i32(-1);
        let body = self
            .send_command(
                command_set::THREAD_REFERENCE,
                thread_reference_command::FRAMES,
                w.into_bytes(),
            )
            .await?;
        let mut r = PacketReader::new(&body, self.sizes);
        let n = r.count()?;
        let mut frames = Vec::with_capacity(n);
        for _ in 0..n {
            frames.push((r.frame_id()?, r.location()?));
        }
        Ok(frames)
    }

    /// Values of local slots; each slot is paired with its signature tag.
    pub async fn frame_values(
        &self,
        thread: u64,
        frame: u64,
        slots: &[(i32, u8)],
    ) -> Result<Vec<Value>, JdwpError> {
        let mut w = self.writer();
        w.object_id(thread).frame_id(frame).i32(slots.len() as i32);
        for (slot, sig_tag) in slots {
            w.i32(*slot).u8(*sig_tag);
        }
        let body = self
            .send_command(
                command_set::STACK_FRAME,
                stack_frame_command::GET_VALUES,
                w.into_bytes(),
            )
            .await?;
        self.read_values(&body)
    }

    /// The frame's `this`, or `None` in static and native methods.
    pub async fn this_object(&self, thread: u64, frame: u64) -> Result<Option<u64>, JdwpError> {
        let mut w = self.writer();
        w.object_id(thread).frame_id(frame);
        let body = self
            .send_command(
                command_set::STACK_FRAME,
                stack_frame_command::THIS_OBJECT,
                w.into_bytes(),
            )
            .await?;
        let (_tag, id) = PacketReader::new(&body, self.sizes).tagged_object_id()?;
        Ok((id != 0).then_some(id))
    }

    // -----------------------------------------------------------------------
    // EventRequest
    // -----------------------------------------------------------------------

    /// Install an event request; returns its request id.
    pub async fn set_event_request(
        &self,
        kind: u8,
        policy: u8,
        modifiers: &[Modifier],
    ) -> Result<i32, JdwpError> {
        let mut w = self.writer();
        w.u8(kind).u8(policy).i32(modifiers.len() as i32);
        for modifier in modifiers {
            w.modifier(modifier);
        }
        let body = self
            .send_command(
                command_set::EVENT_REQUEST,
                event_request_command::SET,
                w.into_bytes(),
            )
            .await?;
        let id = PacketReader::new(&body, self.sizes).i32()?;
        tracing::debug!("event request {} installed for kind {}", id, kind);
        Ok(id)
    }

    pub async fn clear_event_request(&self, kind: u8, request_id: i32) -> Result<(), JdwpError> {
        let mut w = self.writer();
        w.u8(kind).i32(request_id);
        self.send_command(
            command_set::EVENT_REQUEST,
            event_request_command::CLEAR,
            w.into_bytes(),
        )
        .await
        .map(|_| ())
    }

    fn read_values(&self, body: &[u8]) -> Result<Vec<Value>, JdwpError> {
        let mut r = PacketReader::new(body, self.sizes);
        let n = r.count()?;
        (0..n).map(|_| r.value()).collect()
    }
}

fn parse_id_sizes(data: &[u8]) -> Result<IdSizes, JdwpError> {
    let mut r = PacketReader::new(data, IdSizes::default());
    let mut next = || -> Result<usize, JdwpError> { r.count() };
    Ok(IdSizes {
        field_id: next()?,
        method_id: next()?,
        object_id: next()?,
        reference_type_id: next()?,
        frame_id: next()?,
    })
}

async fn route(
    packet: Packet,
    dispatcher: &Mutex<Dispatcher>,
    events_tx: &mpsc::Sender<Result<EventSet, JdwpError>>,
    sizes: IdSizes,
) {
    match packet {
        Packet::Reply {
            id,
            error_code,
            data,
        } => {
            dispatcher.lock().await.resolve(id, error_code, data);
        }
        Packet::Command {
            command_set: command_set::EVENT,
            command: event_command::COMPOSITE,
            data,
            ..
        } => {
            let decoded = decode_composite(&data, sizes);
            if let Err(e) = &decoded {
                tracing::error!("undecodable event composite: {}", e);
            }
            // The receiver goes away once the session is over.
            let _ = events_tx.send(decoded).await;
        }
        Packet::Command {
            command_set,
            command,
            ..
        } => {
            tracing::warn!("ignoring VM command {}/{}", command_set, command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::transport::{encode_reply, HANDSHAKE};
    use tokio::io::{AsyncReadExt, DuplexStream};

    fn id_sizes_body() -> Vec<u8> {
        let mut w = PacketWriter::new(IdSizes::default());
        for _ in 0..5 {
            w.i32(8);
        }
        w.into_bytes()
    }

    fn vm_start_composite() -> Vec<u8> {
        let mut w = PacketWriter::new(IdSizes::default());
        w.u8(suspend_policy::ALL)
            .i32(1)
            .u8(event_kind::VM_START)
            .i32(0)
            .object_id(1);
        encode_command(100, command_set::EVENT, event_command::COMPOSITE, &w.into_bytes())
    }

    /// Plays the VM side of the handshake and id-size negotiation, sending a
    /// VMStart event before the reply like a real agent may.
    async fn fake_vm_bootstrap(server: &mut DuplexStream) {
        let mut buf = [0u8; 14];
        server.read_exact(&mut buf).await.unwrap();
        server.write_all(HANDSHAKE).await.unwrap();
        let request = read_packet(server).await.unwrap();
        server.write_all(&vm_start_composite()).await.unwrap();
        server
            .write_all(&encode_reply(request.id(), 0, &id_sizes_body()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn client_connects_and_delivers_early_events() {
        let (client_end, mut server) = tokio::io::duplex(4096);
        let vm = tokio::spawn(async move {
            fake_vm_bootstrap(&mut server).await;
            server
        });
        let (client, mut events) = JdwpClient::from_stream(client_end, Duration::from_secs(5))
            .await
            .unwrap();
        let _server = vm.await.unwrap();

        assert_eq!(client.id_sizes(), IdSizes::default());
        let set = events.recv().await.unwrap().unwrap();
        assert_eq!(
            set.events,
            vec![Event::VmStart {
                request_id: 0,
                thread: 1
            }]
        );
    }

    #[tokio::test]
    async fn client_version_round_trip() {
        let (client_end, mut server) = tokio::io::duplex(4096);
        let vm = tokio::spawn(async move {
            fake_vm_bootstrap(&mut server).await;
            let request = read_packet(&mut server).await.unwrap();
            let mut w = PacketWriter::new(IdSizes::default());
            w.string("Java Debug Wire Protocol")
                .i32(17)
                .i32(0)
                .string("17.0.2")
                .string("OpenJDK 64-Bit Server VM");
            server
                .write_all(&encode_reply(request.id(), 0, &w.into_bytes()))
                .await
                .unwrap();
            server
        });
        let (client, _events) = JdwpClient::from_stream(client_end, Duration::from_secs(5))
            .await
            .unwrap();
        let version = client.version().await.unwrap();
        let _server = vm.await.unwrap();
        assert_eq!(version.jdwp_major, 17);
        assert_eq!(version.vm_version, "17.0.2");
    }

    #[tokio::test]
    async fn client_maps_vm_error_codes() {
        let (client_end, mut server) = tokio::io::duplex(4096);
        let vm = tokio::spawn(async move {
            fake_vm_bootstrap(&mut server).await;
            let request = read_packet(&mut server).await.unwrap();
            server
                .write_all(&encode_reply(
                    request.id(),
                    error_code::THREAD_NOT_SUSPENDED,
                    &[],
                ))
                .await
                .unwrap();
            server
        });
        let (client, _events) = JdwpClient::from_stream(client_end, Duration::from_secs(5))
            .await
            .unwrap();
        let err = client.frames(1).await.unwrap_err();
        let _server = vm.await.unwrap();
        assert_eq!(err.vm_code(), Some(error_code::THREAD_NOT_SUSPENDED));
    }

    #[tokio::test]
    async fn client_reports_disconnect_and_closes_events() {
        let (client_end, mut server) = tokio::io::duplex(4096);
        let vm = tokio::spawn(async move {
            fake_vm_bootstrap(&mut server).await;
            drop(server);
        });
        let (client, mut events) = JdwpClient::from_stream(client_end, Duration::from_secs(5))
            .await
            .unwrap();
        vm.await.unwrap();

        // The buffered VMStart still arrives, then the stream ends.
        assert!(events.recv().await.is_some());
        assert!(events.recv().await.is_none());
        assert!(!client.is_connected());
        assert!(matches!(
            client.resume().await,
            Err(JdwpError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn client_forwards_undecodable_events_as_errors() {
        let (client_end, mut server) = tokio::io::duplex(4096);
        let vm = tokio::spawn(async move {
            fake_vm_bootstrap(&mut server).await;
            let garbage = encode_command(7, command_set::EVENT, event_command::COMPOSITE, &[2]);
            server.write_all(&garbage).await.unwrap();
            server
        });
        let (_client, mut events) = JdwpClient::from_stream(client_end, Duration::from_secs(5))
            .await
            .unwrap();
        let _server = vm.await.unwrap();
        assert!(events.recv().await.unwrap().is_ok());
        assert!(events.recv().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn client_connect_with_retry_times_out() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let result = JdwpClient::connect_with_retry(
            addr,
            Duration::from_millis(120),
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(JdwpError::ConnectTimeout { .. })));
    }
}
