//! Requirements codec.
//!
//! Decoding fails closed: a record missing any of the binding fields is an
//! error, never a partially populated value.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;

use crate::error::{CodecError, CodecResult};
use crate::requirements::PaymentRequirements;

/// Serialize requirements to their canonical JSON form.
pub fn encode(requirements: &PaymentRequirements) -> CodecResult<String> {
    requirements.validate()?;
    Ok(serde_json::to_string(requirements)?)
}

/// Parse requirements from JSON.
pub fn decode(json: &str) -> CodecResult<PaymentRequirements> {
    let value: Value = serde_json::from_str(json)?;
    decode_value(value)
}

/// Parse requirements from an already-parsed JSON value.
pub fn decode_value(value: Value) -> CodecResult<PaymentRequirements> {
    let Value::Object(ref object) = value else {
        return Err(CodecError::invalid("requirements", "not a JSON object"));
    };

    for field in PaymentRequirements::REQUIRED_FIELDS {
        match object.get(field) {
            None | Some(Value::Null) => return Err(CodecError::MissingField(field.to_string())),
            Some(_) => {}
        }
    }

    let requirements: PaymentRequirements = serde_json::from_value(value)?;
    requirements.validate()?;
    Ok(requirements)
}

/// Encode requirements as base64 JSON, for transport in a header.
pub fn encode_header(requirements: &PaymentRequirements) -> CodecResult<String> {
    Ok(STANDARD.encode(encode(requirements)?))
}

/// Decode requirements from a base64 JSON header value.
pub fn decode_header(header: &str) -> CodecResult<PaymentRequirements> {
    let bytes = STANDARD.decode(header.trim())?;
    decode(&String::from_utf8(bytes)?)
}
