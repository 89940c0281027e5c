//! JDWP protocol constants and wire-level data types.

// ---------------------------------------------------------------------------
// Command sets and commands
// ---------------------------------------------------------------------------

/// Command set identifiers.
pub mod command_set {
    pub const VIRTUAL_MACHINE: u8 = 1;
    pub const REFERENCE_TYPE: u8 = 2;
    pub const CLASS_TYPE: u8 = 3;
    pub const METHOD: u8 = 6;
    pub const OBJECT_REFERENCE: u8 = 9;
    pub const STRING_REFERENCE: u8 = 10;
    pub const THREAD_REFERENCE: u8 = 11;
    pub const ARRAY_REFERENCE: u8 = 13;
    pub const EVENT_REQUEST: u8 = 15;
    pub const STACK_FRAME: u8 = 16;
    pub const EVENT: u8 = 64;
}

/// VirtualMachine commands (set 1).
pub mod vm_command {
    pub const VERSION: u8 = 1;
    pub const CLASSES_BY_SIGNATURE: u8 = 2;
    pub const ID_SIZES: u8 = 7;
    pub const RESUME: u8 = 9;
    pub const EXIT: u8 = 10;
}

/// ReferenceType commands (set 2).
pub mod reference_type_command {
    pub const SIGNATURE: u8 = 1;
    pub const FIELDS: u8 = 4;
    pub const METHODS: u8 = 5;
    pub const GET_VALUES: u8 = 6;
}

/// ClassType commands (set 3).
pub mod class_type_command {
    pub const SUPERCLASS: u8 = 1;
}

/// Method commands (set 6).
pub mod method_command {
    pub const LINE_TABLE: u8 = 1;
    pub const VARIABLE_TABLE: u8 = 2;
}

/// ObjectReference commands (set 9).
pub mod object_reference_command {
    pub const REFERENCE_TYPE: u8 = 1;
    pub const GET_VALUES: u8 = 2;
    pub const INVOKE_METHOD: u8 = 6;
}

/// StringReference commands (set 10).
pub mod string_reference_command {
    pub const VALUE: u8 = 1;
}

/// ThreadReference commands (set 11).
pub mod thread_reference_command {
    pub const FRAMES: u8 = 6;
}

/// ArrayReference commands (set 13).
pub mod array_reference_command {
    pub const LENGTH: u8 = 1;
    pub const GET_VALUES: u8 = 2;
}

/// EventRequest commands (set 15).
pub mod event_request_command {
    pub const SET: u8 = 1;
    pub const CLEAR: u8 = 2;
}

/// StackFrame commands (set 16).
pub mod stack_frame_command {
    pub const GET_VALUES: u8 = 1;
    pub const THIS_OBJECT: u8 = 3;
}

/// Event commands (set 64).
pub mod event_command {
    pub const COMPOSITE: u8 = 100;
}

// ---------------------------------------------------------------------------
// Event requests
// ---------------------------------------------------------------------------

/// Event kinds.
pub mod event_kind {
    pub const SINGLE_STEP: u8 = 1;
    pub const BREAKPOINT: u8 = 2;
    pub const EXCEPTION: u8 = 4;
    pub const THREAD_START: u8 = 6;
    pub const THREAD_DEATH: u8 = 7;
    pub const CLASS_PREPARE: u8 = 8;
    pub const CLASS_UNLOAD: u8 = 9;
    pub const METHOD_ENTRY: u8 = 40;
    pub const METHOD_EXIT: u8 = 41;
    pub const VM_START: u8 = 90;
    pub const VM_DEATH: u8 = 99;
}

/// Suspend policies.
pub mod suspend_policy {
    pub const NONE: u8 = 0;
    pub const EVENT_THREAD: u8 = 1;
    pub const ALL: u8 = 2;
}

/// Step sizes.
pub mod step_size {
    pub const MIN: i32 = 0;
    pub const LINE: i32 = 1;
}

/// Step depths.
pub mod step_depth {
    pub const INTO: i32 = 0;
    pub const OVER: i32 = 1;
    pub const OUT: i32 = 2;
}

/// Options for `ObjectReference.InvokeMethod`.
pub mod invoke_options {
    pub const SINGLE_THREADED: i32 = 0x01;
}

/// Field and method modifier bits.
pub mod modifier {
    pub const STATIC: i32 = 0x0008;
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Selected JDWP error codes.
pub mod error_code {
    pub const NONE: u16 = 0;
    pub const INVALID_THREAD: u16 = 10;
    pub const THREAD_NOT_SUSPENDED: u16 = 13;
    pub const INVALID_OBJECT: u16 = 20;
    pub const INVALID_CLASS: u16 = 21;
    pub const INVALID_METHODID: u16 = 23;
    pub const INVALID_FIELDID: u16 = 25;
    pub const INVALID_FRAMEID: u16 = 30;
    pub const INVALID_SLOT: u16 = 35;
    pub const NOT_FOUND: u16 = 41;
    pub const NOT_IMPLEMENTED: u16 = 99;
    pub const ABSENT_INFORMATION: u16 = 101;
    pub const INVALID_EVENT_TYPE: u16 = 102;
    pub const VM_DEAD: u16 = 112;
    pub const INTERNAL: u16 = 113;
    pub const INVALID_TAG: u16 = 500;
    pub const ALREADY_INVOKING: u16 = 502;
    pub const INVALID_INDEX: u16 = 503;
    pub const INVALID_LENGTH: u16 = 504;
    pub const INVALID_STRING: u16 = 506;
    pub const NATIVE_METHOD: u16 = 511;
    pub const INVALID_COUNT: u16 = 512;
}

/// Symbolic name of a JDWP error code.
pub fn error_name(code: u16) -> &'static str {
    use error_code::*;
    match code {
        NONE => "NONE",
        INVALID_THREAD => "INVALID_THREAD",
        THREAD_NOT_SUSPENDED => "THREAD_NOT_SUSPENDED",
        INVALID_OBJECT => "INVALID_OBJECT",
        INVALID_CLASS => "INVALID_CLASS",
        INVALID_METHODID => "INVALID_METHODID",
        INVALID_FIELDID => "INVALID_FIELDID",
        INVALID_FRAMEID => "INVALID_FRAMEID",
        INVALID_SLOT => "INVALID_SLOT",
        NOT_FOUND => "NOT_FOUND",
        NOT_IMPLEMENTED => "NOT_IMPLEMENTED",
        ABSENT_INFORMATION => "ABSENT_INFORMATION",
        INVALID_EVENT_TYPE => "INVALID_EVENT_TYPE",
        VM_DEAD => "VM_DEAD",
        INTERNAL => "INTERNAL",
        INVALID_TAG => "INVALID_TAG",
        ALREADY_INVOKING => "ALREADY_INVOKING",
        INVALID_INDEX => "INVALID_INDEX",
        INVALID_LENGTH => "INVALID_LENGTH",
        INVALID_STRING => "INVALID_STRING",
        NATIVE_METHOD => "NATIVE_METHOD",
        INVALID_COUNT => "INVALID_COUNT",
        _ => "UNKNOWN",
    }
}

// ---------------------------------------------------------------------------
// Value tags
// ---------------------------------------------------------------------------

/// Value tags (the first signature byte of a value's type).
pub mod tag {
    pub const ARRAY: u8 = b'[';
    pub const BYTE: u8 = b'B';
    pub const CHAR: u8 = b'C';
    pub const OBJECT: u8 = b'L';
    pub const FLOAT: u8 = b'F';
    pub const DOUBLE: u8 = b'D';
    pub const INT: u8 = b'I';
    pub const LONG: u8 = b'J';
    pub const SHORT: u8 = b'S';
    pub const VOID: u8 = b'V';
    pub const BOOLEAN: u8 = b'Z';
    pub const STRING: u8 = b's';
    pub const THREAD: u8 = b't';
    pub const THREAD_GROUP: u8 = b'g';
    pub const CLASS_LOADER: u8 = b'l';
    pub const CLASS_OBJECT: u8 = b'c';
}

/// Returns `true` for tags whose values are object ids.
pub fn is_object_tag(t: u8) -> bool {
    matches!(
        t,
        tag::ARRAY
            | tag::OBJECT
            | tag::STRING
            | tag::THREAD
            | tag::THREAD_GROUP
            | tag::CLASS_LOADER
            | tag::CLASS_OBJECT
    )
}

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Variable-width identifier sizes reported by `VirtualMachine.IDSizes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSizes {
    pub field_id: usize,
    pub method_id: usize,
    pub object_id: usize,
    pub reference_type_id: usize,
    pub frame_id: usize,
}

impl Default for IdSizes {
    /// Eight bytes for everything, which is what HotSpot reports.
    fn default() -> Self {
        Self {
            field_id: 8,
            method_id: 8,
            object_id: 8,
            reference_type_id: 8,
            frame_id: 8,
        }
    }
}

/// Kind of a reference type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Class,
    Interface,
    Array,
}

impl TypeTag {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(TypeTag::Class),
            2 => Some(TypeTag::Interface),
            3 => Some(TypeTag::Array),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            TypeTag::Class => 1,
            TypeTag::Interface => 2,
            TypeTag::Array => 3,
        }
    }
}

/// An executable code position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub type_tag: TypeTag,
    pub class_id: u64,
    pub method_id: u64,
    pub index: u64,
}

/// A value as it travels on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Void,
    /// Any object reference; `tag` refines what kind of object it is and
    /// `id == 0` is `null`.
    Object { tag: u8, id: u64 },
}

impl Value {
    /// Signature tag of this value.
    pub fn tag(&self) -> u8 {
        match self {
            Value::Boolean(_) => tag::BOOLEAN,
            Value::Byte(_) => tag::BYTE,
            Value::Char(_) => tag::CHAR,
            Value::Short(_) => tag::SHORT,
            Value::Int(_) => tag::INT,
            Value::Long(_) => tag::LONG,
            Value::Float(_) => tag::FLOAT,
            Value::Double(_) => tag::DOUBLE,
            Value::Void => tag::VOID,
            Value::Object { tag, .. } => *tag,
        }
    }
}

/// A method as listed by `ReferenceType.Methods`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub id: u64,
    pub name: String,
    pub signature: String,
    pub mod_bits: i32,
}

/// A field as listed by `ReferenceType.Fields`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub id: u64,
    pub name: String,
    pub signature: String,
    pub mod_bits: i32,
}

impl FieldInfo {
    pub fn is_static(&self) -> bool {
        self.mod_bits & modifier::STATIC != 0
    }
}

/// One row of a method's line table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    pub code_index: u64,
    pub line: i32,
}

/// A method's line table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineTable {
    pub start: i64,
    pub end: i64,
    pub lines: Vec<LineEntry>,
}

impl LineTable {
    /// The source line covering `index`: the entry with the greatest code
    /// index not beyond it.
    pub fn line_for(&self, index: u64) -> Option<i32> {
        self.lines
            .iter()
            .filter(|e| e.code_index <= index)
            .max_by_key(|e| e.code_index)
            .map(|e| e.line)
    }

    /// Lowest code index for `line`, if the line has code in this method.
    pub fn first_index_of(&self, line: i32) -> Option<u64> {
        self.lines
            .iter()
            .filter(|e| e.line == line)
            .map(|e| e.code_index)
            .min()
    }
}

/// One entry of a method's variable table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSlot {
    pub code_index: u64,
    pub name: String,
    pub signature: String,
    pub length: u32,
    pub slot: i32,
}

impl VariableSlot {
    /// Whether the variable is in scope at `index`.
    pub fn is_visible_at(&self, index: u64) -> bool {
        index >= self.code_index && index < self.code_index + u64::from(self.length)
    }
}

/// A loaded class as returned by `ClassesBySignature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedClass {
    pub type_tag: TypeTag,
    pub id: u64,
    pub status: i32,
}

/// Reply to `ObjectReference.InvokeMethod`.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeResult {
    pub value: Value,
    /// Id of a thrown exception, `0` when the call returned normally.
    pub exception: u64,
}

/// Modifiers attached to an `EventRequest.Set`.
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    Count(i32),
    ThreadOnly(u64),
    ClassMatch(String),
    LocationOnly(Location),
    Step { thread: u64, size: i32, depth: i32 },
    InstanceOnly(u64),
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// JNI signature for a class name: `demo.Main` → `Ldemo/Main;`.
pub fn class_signature(name: &str) -> String {
    format!("L{};", name.replace('.', "/"))
}

/// Human-readable type name for a JNI signature.
///
/// `I` → `int`, `Ljava/lang/String;` → `java.lang.String`, `[[J` → `long[][]`.
pub fn signature_to_name(signature: &str) -> String {
    let dims = signature.bytes().take_while(|b| *b == b'[').count();
    let element = &signature[dims..];
    let base = match element.as_bytes().first() {
        Some(b'Z') => "boolean".to_string(),
        Some(b'B') => "byte".to_string(),
        Some(b'C') => "char".to_string(),
        Some(b'S') => "short".to_string(),
        Some(b'I') => "int".to_string(),
        Some(b'J') => "long".to_string(),
        Some(b'F') => "float".to_string(),
        Some(b'D') => "double".to_string(),
        Some(b'V') => "void".to_string(),
        Some(b'L') => element
            .trim_start_matches('L')
            .trim_end_matches(';')
            .replace('/', "."),
        _ => element.to_string(),
    };
    format!("{base}{}", "[]".repeat(dims))
}
