//! Values read from the target.
//!
//! Strings and arrays arrive fully materialised; any other object stays a
//! reference whose display form has to be fetched remotely.

use crate::types::{ObjectId, TypeKind, TypeRef};

/// A value read from the target. Never written back.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Array(ArrayValue),
    Object(ObjectRef),
    Null,
    /// Result of a `void` method.
    Void,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    /// Array type name, e.g. `int[]`.
    pub type_name: String,
    pub elements: Vec<Value>,
}

/// An object with no intrinsic text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub type_id: u64,
    /// Runtime class name.
    pub type_name: String,
}

impl ObjectRef {
    /// The object's runtime class.
    pub fn type_ref(&self) -> TypeRef {
        TypeRef {
            id: self.type_id,
            name: self.type_name.clone(),
            kind: TypeKind::Class,
        }
    }
}

impl Value {
    /// Runtime type name.
    pub fn type_name(&self) -> String {
        match self {
            Value::Boolean(_) => "boolean".into(),
            Value::Byte(_) => "byte".into(),
            Value::Char(_) => "char".into(),
            Value::Short(_) => "short".into(),
            Value::Int(_) => "int".into(),
            Value::Long(_) => "long".into(),
            Value::Float(_) => "float".into(),
            Value::Double(_) => "double".into(),
            Value::Str(_) => "java.lang.String".into(),
            Value::Array(array) => array.type_name.clone(),
            Value::Object(object) => object.type_name.clone(),
            Value::Null => "null".into(),
            Value::Void => "void".into(),
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}
