//! Metric key routing and decoding.
//!
//! Keys have the shape `[<prefix>]<name>[__<base64(json properties)>]`.

use base64::alphabet;
use base64::engine::{general_purpose, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::telemetry::Properties;

/// Prefix of the metrics statsd generates about itself.
pub const INTERNAL_PREFIX: &str = "statsd.";

/// Separates the metric name from its encoded properties.
pub const PROPERTIES_DELIMITER: &str = "__";

/// Standard alphabet, padding optional. statsd strips `=` from keys before
/// they reach a backend.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Error, Debug)]
pub enum PropertiesError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// A key split into its metric name and the outcome of decoding its properties.
///
/// `Ok(None)` means the key carried no properties segment.
#[derive(Debug)]
pub struct ParsedKey {
    pub name: String,
    pub properties: Result<Option<Properties>, PropertiesError>,
}

/// Whether `key` should be forwarded to a destination with the given routing rules.
///
/// Internal `statsd.` keys are dropped unless `forward_internal` is set, and a
/// configured prefix must match the start of the key literally.
pub fn should_process(key: &str, prefix: Option<&str>, forward_internal: bool) -> bool {
    if !forward_internal && key.starts_with(INTERNAL_PREFIX) {
        return false;
    }

    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => key.starts_with(prefix),
        None => true,
    }
}

/// Strips the routing prefix and splits the rest into name and properties.
///
/// A delimiter at position 0 does not count: the whole key becomes the name.
pub fn parse_key(key: &str, prefix: Option<&str>) -> ParsedKey {
    let key = match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => key.strip_prefix(prefix).unwrap_or(key),
        None => key,
    };

    match key.find(PROPERTIES_DELIMITER) {
        Some(end_of_name) if end_of_name > 0 => ParsedKey {
            name: key[..end_of_name].to_string(),
            properties: decode_properties(&key[end_of_name + PROPERTIES_DELIMITER.len()..])
                .map(Some),
        },
        _ => ParsedKey {
            name: key.to_string(),
            properties: Ok(None),
        },
    }
}

/// Decodes a base64 → UTF-8 → JSON object payload into string properties.
///
/// Padding is optional and the URL-safe `-`/`_` characters are accepted in
/// place of `+`/`/`. String values are kept verbatim; other values are
/// stringified.
pub fn decode_properties(payload: &str) -> Result<Properties, PropertiesError> {
    let bytes = match LENIENT.decode(payload) {
        Ok(bytes) => bytes,
        Err(e) if payload.contains(['-', '_']) => {
            let standard: String = payload
                .chars()
                .map(|c| match c {
                    '-' => '+',
                    '_' => '/',
                    c => c,
                })
                .collect();
            LENIENT.decode(standard).map_err(|_| e)?
        }
        Err(e) => return Err(e.into()),
    };
    let text = String::from_utf8(bytes)?;
    match serde_json::from_str::<Value>(&text)? {
        Value::Object(map) => Ok(into_properties(map)),
        Value::Array(_) => Err(PropertiesError::NotAnObject("an array")),
        Value::String(_) => Err(PropertiesError::NotAnObject("a string")),
        Value::Number(_) => Err(PropertiesError::NotAnObject("a number")),
        Value::Bool(_) => Err(PropertiesError::NotAnObject("a boolean")),
        Value::Null => Err(PropertiesError::NotAnObject("null")),
    }
}

/// Builds a key in the wire format, the inverse of `parse_key` without a prefix.
pub fn encode_key(name: &str, properties: Option<&Properties>) -> Result<String, serde_json::Error> {
    match properties {
        Some(properties) => {
            let json = serde_json::to_string(properties)?;
            Ok(format!(
                "{}{}{}",
                name,
                PROPERTIES_DELIMITER,
                general_purpose::STANDARD.encode(json)
            ))
        }
        None => Ok(name.to_string()),
    }
}

fn into_properties(map: Map<String, Value>) -> Properties {
    map.into_iter()
        .map(|(k, v)| match v {
            Value::String(s) => (k, s),
            other => (k, other.to_string()),
        })
        .collect()
}
