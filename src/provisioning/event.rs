use serde_json::Value;

use crate::error::{Error, Result};

/// Canonical internal form of a user-creation event.
///
/// Every supported delivery format normalizes to this before the shared
/// provisioning logic runs. `email` is advisory only; the workflow
/// re-fetches the canonical record from the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct UserCreated {
    pub uid: String,
    pub email: Option<String>,
}

impl UserCreated {
    /// Adapter for the structured audit-log delivery format:
    ///
    /// ```json
    /// {"protoPayload": {"resourceName": "projects/<project>/users/<uid>"}}
    /// ```
    ///
    /// The uid is the trailing segment of the resource name. This format
    /// never carries an email.
    pub fn from_audit_log(payload: &Value) -> Result<Self> {
        let resource_name = payload
            .get("protoPayload")
            .and_then(|p| p.get("resourceName"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::malformed_payload(format!(
                    "audit-log event missing protoPayload.resourceName (payload keys: {})",
                    payload_shape(payload)
                ))
            })?;

        let uid = resource_name.rsplit('/').next().unwrap_or("");
        if uid.is_empty() {
            return Err(Error::malformed_payload(format!(
                "audit-log resourceName has no trailing uid segment: {:?}",
                resource_name
            )));
        }

        Ok(Self {
            uid: uid.to_string(),
            email: None,
        })
    }

    /// Adapter for the simplified direct delivery format:
    ///
    /// ```json
    /// {"uid": "<uid>", "email": "<email>"}
    /// ```
    pub fn from_direct(payload: &Value) -> Result<Self> {
        let uid = payload
            .get("uid")
            .and_then(Value::as_str)
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| {
                Error::malformed_payload(format!(
                    "direct event missing uid (payload keys: {})",
                    payload_shape(payload)
                ))
            })?;

        let email = payload
            .get("email")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
            .map(str::to_string);

        Ok(Self {
            uid: uid.to_string(),
            email,
        })
    }
}

/// Top-level key summary for logging unrecognized payloads without
/// echoing their contents.
fn payload_shape(payload: &Value) -> String {
    match payload {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("{{{}}}", keys.join(", "))
        }
        other => format!("non-object ({})", value_kind(other)),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
