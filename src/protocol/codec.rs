//! JSON codec with discriminant routing.
//!
//! Decoding looks at the discriminant fields a message type declares. A payload
//! whose discriminant is missing or carries an unknown value is not for this
//! handler and decodes to `Ok(None)`. A recognised discriminant with a broken
//! body is a [`CodecError`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("malformed `{discriminant}` message: {source}")]
    Malformed { discriminant: &'static str, #[source] source: serde_json::Error },
    #[error("cannot encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A message that travels as a flat JSON object.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Discriminant fields with the values each accepts; `None` accepts any value.
    const ROUTES: &'static [(&'static str, Option<&'static [&'static str]>)];
}

pub fn encode<T: WireMessage>(message: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(message).map_err(CodecError::Encode)
}

pub fn decode<T: WireMessage>(payload: &[u8]) -> Result<Option<T>, CodecError> {
    let value: Value = serde_json::from_slice(payload).map_err(CodecError::Syntax)?;
    let Value::Object(fields) = &value else { return Err(CodecError::NotAnObject) };

    let route = T::ROUTES.iter().find(|(field, accepted)| match (fields.get(*field), accepted) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(v), Some(values)) => v.as_str().is_some_and(|s| values.contains(&s)),
    });
    let Some((discriminant, _)) = route else { return Ok(None) };

    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| CodecError::Malformed { discriminant, source })
}

/// Decodes for a subscription callback: failures are logged and dropped,
/// unknown discriminants are skipped quietly.
pub fn decode_or_log<T: WireMessage>(topic: &str, payload: &[u8]) -> Option<T> {
    match decode::<T>(payload) {
        Ok(Some(message)) => Some(message),
        Ok(None) => {
            tracing::debug!(topic = %topic, "Ignoring message with unknown discriminant");
            None
        }
        Err(e) => {
            tracing::warn!(topic = %topic, error = %e, "Dropping undecodable message");
            None
        }
    }
}
