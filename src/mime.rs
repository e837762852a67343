// MIME-type parameter parser and validation for codec configuration strings.
//
// Example input: "interface=stream; type=pdu; schema=fbs; swc_id=23; ecu_id=5"

use std::collections::HashMap;

use crate::error::{NCodecError, Result};

/// Parsed, validated codec configuration.
pub type MimeMap = HashMap<String, String>;

const REQUIRED_KEYS: [&str; 3] = ["interface", "type", "schema"];

const ALLOWED_KEYS: [&str; 9] = [
    "type",
    "schema",
    "interface",
    "bus",
    "bus_id",
    "node_id",
    "interface_id",
    "swc_id",
    "ecu_id",
];

/// Parse and validate a codec MIME configuration string into a key→value map.
///
/// Tokens are separated by any run of whitespace or semicolons; each token is
/// split once on `=`. Later tokens override earlier ones for the same key.
pub fn decode_mime_type(mime_type: &str) -> Result<MimeMap> {
    if mime_type.trim().is_empty() {
        return Err(NCodecError::config("empty mimetype"));
    }

    let mut map = MimeMap::new();
    for token in mime_type.split(|c: char| c == ';' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        let mut parts = token.splitn(2, '=');
        let key = parts.next().unwrap_or("").trim();
        let value = parts.next().unwrap_or("").trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        map.insert(key.to_string(), value.to_string());
    }

    for key in REQUIRED_KEYS {
        if !map.contains_key(key) {
            return Err(NCodecError::config("missing required mimetype parameter"));
        }
    }

    match map.get("type").map(String::as_str) {
        Some("can") | Some("pdu") => {}
        Some(other) => return Err(NCodecError::config(format!("unsupported type: {other}"))),
        None => unreachable!("checked by required-keys pass above"),
    }

    match map.get("interface").map(String::as_str) {
        Some("stream") => {}
        Some(other) => return Err(NCodecError::config(format!("wrong interface: {other}"))),
        None => unreachable!("checked by required-keys pass above"),
    }

    match map.get("schema").map(String::as_str) {
        Some("fbs") => {}
        Some(other) => return Err(NCodecError::config(format!("wrong schema: {other}"))),
        None => unreachable!("checked by required-keys pass above"),
    }

    for key in map.keys() {
        if !ALLOWED_KEYS.contains(&key.as_str()) {
            return Err(NCodecError::config(format!(
                "unexpected mimetype parameter: {key}"
            )));
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_valid_mime() {
        let map = decode_mime_type("interface=stream;type=pdu;schema=fbs").unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("interface").unwrap(), "stream");
        assert_eq!(map.get("type").unwrap(), "pdu");
        assert_eq!(map.get("schema").unwrap(), "fbs");
    }

    #[test]
    fn whitespace_and_semicolon_separators_mix() {
        let map = decode_mime_type("interface=stream  type=can;  schema=fbs").unwrap();
        assert_eq!(map.get("type").unwrap(), "can");
    }

    #[test]
    fn later_token_overrides_earlier() {
        let map = decode_mime_type("interface=stream;type=can;schema=fbs;type=can").unwrap();
        assert_eq!(map.get("type").unwrap(), "can");
    }

    #[test]
    fn empty_input_is_config_error() {
        assert!(decode_mime_type("").is_err());
        assert!(decode_mime_type("   ").is_err());
    }

    #[test]
    fn missing_required_key_is_config_error() {
        assert!(decode_mime_type("interface=stream;type=pdu").is_err());
        assert!(decode_mime_type("type=pdu;schema=fbs").is_err());
    }

    #[test]
    fn unsupported_type_message() {
        let err = decode_mime_type("interface=stream;type=xyz;schema=fbs").unwrap_err();
        assert!(err.to_string().contains("unsupported type: xyz"));
    }

    #[test]
    fn wrong_interface_rejected() {
        assert!(decode_mime_type("interface=socket;type=pdu;schema=fbs").is_err());
    }

    #[test]
    fn wrong_schema_rejected() {
        assert!(decode_mime_type("interface=stream;type=pdu;schema=json").is_err());
    }

    #[test]
    fn unknown_key_rejected() {
        let err =
            decode_mime_type("interface=stream;type=pdu;schema=fbs;frobnicate=1").unwrap_err();
        assert!(err.to_string().contains("unexpected mimetype parameter"));
    }

    #[test]
    fn whitelisted_keys_accepted() {
        let map = decode_mime_type(
            "interface=stream;type=can;schema=fbs;bus=can0;bus_id=1;node_id=2;interface_id=3;swc_id=4;ecu_id=5",
        )
        .unwrap();
        assert_eq!(map.len(), 8);
    }
}
