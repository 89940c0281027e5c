//! Value rendering and variable lookup.
//!
//! Primitives, strings and arrays render locally. Objects have no text form
//! of their own, so the inspector asks the target: collection-like objects
//! are converted with `toArray()`, everything else with `toString()`, and
//! the returned value is rendered in turn.

use std::future::Future;
use std::pin::Pin;

use crate::error::{DebugError, InspectError};
use crate::target::{TargetVm, TO_ARRAY, TO_STRING};
use crate::types::{Frame, ThreadId};
use crate::value::{ObjectRef, Value};

/// Runtime classes rendered through `toArray()`.
pub const COLLECTION_TYPES: &[&str] = &[
    "java.util.ArrayList",
    "java.util.LinkedList",
    "java.util.ArrayDeque",
    "java.util.HashSet",
    "java.util.LinkedHashSet",
    "java.util.TreeSet",
    "java.util.Vector",
];

type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<String, InspectError>> + Send + 'a>>;

/// Text for values that need no remote call.
pub fn format_local(value: &Value) -> Option<String> {
    let text = match value {
        Value::Boolean(v) => v.to_string(),
        Value::Byte(v) => v.to_string(),
        Value::Char(c) => format!("'{c}'"),
        Value::Short(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Long(v) => format!("{v}L"),
        Value::Float(v) => format!("{v:?}f"),
        Value::Double(v) => format!("{v:?}"),
        Value::Str(s) => format!("\"{s}\""),
        Value::Null => "null".to_string(),
        Value::Void => "void".to_string(),
        Value::Array(_) | Value::Object(_) => return None,
    };
    Some(text)
}

/// Renders values in the context of one thread.
pub struct Inspector<'a, T> {
    target: &'a T,
    thread: ThreadId,
    suspended: bool,
}

impl<'a, T: TargetVm> Inspector<'a, T> {
    /// `suspended` says whether `thread` is halted; objects can only be
    /// rendered if it is.
    pub fn new(target: &'a T, thread: ThreadId, suspended: bool) -> Self {
        Self {
            target,
            thread,
            suspended,
        }
    }

    /// Render `value`, recursing into arrays and remote display forms.
    pub fn render<'v>(&'v self, value: &'v Value) -> RenderFuture<'v> {
        Box::pin(async move {
            if let Some(text) = format_local(value) {
                return Ok(text);
            }
            match value {
                Value::Array(array) => {
                    let mut parts = Vec::with_capacity(array.elements.len());
                    for element in &array.elements {
                        parts.push(self.render(element).await?);
                    }
                    Ok(format!("[{}]", parts.join(", ")))
                }
                Value::Object(object) => {
                    let display = self.display_form(object).await?;
                    self.render(&display).await
                }
                _ => Ok(String::new()),
            }
        })
    }

    /// Ask the target for the value that stands in for `object`.
    async fn display_form(&self, object: &ObjectRef) -> Result<Value, InspectError> {
        if !self.suspended {
            return Err(InspectError::NotSuspended);
        }
        let (name, signature) = if COLLECTION_TYPES.contains(&object.type_name.as_str()) {
            TO_ARRAY
        } else {
            TO_STRING
        };
        tracing::debug!("rendering {} via {}{}", object.type_name, name, signature);
        Ok(self
            .target
            .invoke_method(self.thread, object, name, signature)
            .await?)
    }

    /// `name: type = value`
    pub async fn binding(&self, name: &str, type_name: &str, value: &Value) -> Result<String, InspectError> {
        Ok(format!("{}: {} = {}", name, type_name, self.render(value).await?))
    }
}

/// A name resolved in the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Declared type.
    pub type_name: String,
    pub value: Value,
}

/// Find `name` among the frame's visible locals, then among the fields of
/// the frame's declaring class.
pub async fn lookup<T: TargetVm>(
    target: &T,
    thread: ThreadId,
    frame: &Frame,
    name: &str,
) -> Result<Resolved, DebugError> {
    let locals = target.locals(thread, frame).await?;
    if let Some(var) = locals.into_iter().find(|v| v.name == name) {
        return Ok(Resolved {
            type_name: var.type_name,
            value: var.value,
        });
    }

    let fields = target.fields(&frame.location.class).await?;
    let Some(field) = fields.into_iter().find(|f| f.name == name) else {
        return Err(DebugError::UnknownName(name.to_string()));
    };
    let value = if field.is_static {
        target.static_value(&field).await?
    } else {
        let this = target
            .this_object(thread, frame)
            .await?
            .ok_or_else(|| DebugError::NoReceiver(name.to_string()))?;
        target.instance_value(&this, &field).await?
    };
    Ok(Resolved {
        type_name: field.type_name,
        value,
    })
}

/// Pick element `index` of an array value for `print-value name index`.
pub fn element<'v>(name: &str, value: &'v Value, index: usize) -> Result<&'v Value, DebugError> {
    let array = value
        .as_array()
        .ok_or_else(|| DebugError::NotAnArray(name.to_string()))?;
    array.elements.get(index).ok_or(DebugError::IndexOutOfRange)
}

/// Read field `field` of the object held by `name`.
pub async fn object_field<T: TargetVm>(
    target: &T,
    name: &str,
    value: &Value,
    field: &str,
) -> Result<Resolved, DebugError> {
    let object = value
        .as_object()
        .ok_or_else(|| DebugError::NotAnObject(name.to_string()))?;
    let fields = target.fields(&object.type_ref()).await?;
    let found = fields
        .into_iter()
        .find(|f| f.name == field)
        .ok_or_else(|| DebugError::NoSuchField {
            var: name.to_string(),
            field: field.to_string(),
        })?;
    let value = if found.is_static {
        target.static_value(&found).await?
    } else {
        target.instance_value(object, &found).await?
    };
    Ok(Resolved {
        type_name: found.type_name,
        value,
    })
}
