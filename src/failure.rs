//! Captured failures and the values they carry.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::PanicHookInfo;

/// Opaque identifier assigned by the capture coordinator, unique per overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FailureId(pub u64);

impl fmt::Display for FailureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which source delivered a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOrigin {
    /// Uncaught failure reported outside of rendering (panic hook, host hub).
    Ambient,
    /// Failure that escaped while producing the protected subtree's output.
    RenderTime,
}

/// An error-shaped value: a name, a message and possibly a stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorValue {
    #[serde(default = "default_error_name")]
    pub name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

fn default_error_name() -> String {
    "Error".to_string()
}

/// Whatever was thrown.
///
/// Only error-shaped payloads have frames; anything else is displayed as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum FailurePayload {
    Error(ErrorValue),
    Value(serde_json::Value),
}

impl FailurePayload {
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        FailurePayload::Error(ErrorValue {
            name: name.into(),
            message: message.into(),
            stack: None,
        })
    }

    /// Attach a stack trace. Non-error payloads are returned unchanged.
    pub fn with_stack(self, stack: impl Into<String>) -> Self {
        match self {
            FailurePayload::Error(mut e) => {
                e.stack = Some(stack.into());
                FailurePayload::Error(e)
            }
            other => other,
        }
    }

    /// Interpret a JSON value reported by a host.
    ///
    /// Objects with a string `message` are errors; everything else is a plain
    /// value.
    pub fn from_json(value: serde_json::Value) -> Self {
        let error_shaped = value
            .as_object()
            .is_some_and(|obj| obj.get("message").is_some_and(serde_json::Value::is_string));
        if error_shaped && let Ok(error) = serde_json::from_value::<ErrorValue>(value.clone()) {
            return FailurePayload::Error(error);
        }
        FailurePayload::Value(value)
    }

    /// Payload for a panic seen by the panic hook. The panic location becomes
    /// a one-frame stack.
    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let message = panic_message(info.payload());
        let stack = info.location().map(|loc| {
            format!(
                "panic: {}\n    at {}:{}:{}",
                message,
                loc.file(),
                loc.line(),
                loc.column()
            )
        });
        FailurePayload::Error(ErrorValue {
            name: "panic".to_string(),
            message,
            stack,
        })
    }

    /// Payload for a panic caught by `catch_unwind`; no location is available.
    pub fn from_panic_payload(payload: &(dyn Any + Send)) -> Self {
        FailurePayload::error("panic", panic_message(payload))
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            FailurePayload::Error(e) => Some(e),
            FailurePayload::Value(_) => None,
        }
    }

    pub fn stack(&self) -> Option<&str> {
        self.as_error().and_then(|e| e.stack.as_deref())
    }
}

impl fmt::Display for FailurePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePayload::Error(e) if e.message.is_empty() => write!(f, "{}", e.name),
            FailurePayload::Error(e) => write!(f, "{}: {}", e.name, e.message),
            FailurePayload::Value(serde_json::Value::String(s)) => write!(f, "{s}"),
            FailurePayload::Value(v) => write!(f, "{v}"),
        }
    }
}

/// Extract the message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// One captured failure. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFailure {
    pub id: FailureId,
    pub value: FailurePayload,
    pub origin: FailureOrigin,
}
