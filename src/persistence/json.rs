//! JSON snapshot encoding.
//!
//! ```json
//! {
//!   "version": 1,
//!   "timestamp": 1700000000,
//!   "entries": [{ "key": "a", "value": "eA==" }]
//! }
//! ```
//!
//! Values are standard base64 so arbitrary bytes survive the text format.

use crate::error::SnapshotError;
use crate::persistence::{SnapshotDocument, SNAPSHOT_VERSION};

/// Encodes a document as indented JSON followed by a newline.
pub fn encode(document: &SnapshotDocument) -> Result<Vec<u8>, SnapshotError> {
    let mut out = serde_json::to_vec_pretty(document)?;
    out.push(b'\n');
    Ok(out)
}

/// Decodes a JSON document and checks its version.
pub fn decode(bytes: &[u8]) -> Result<SnapshotDocument, SnapshotError> {
    let document: SnapshotDocument = serde_json::from_slice(bytes)?;
    if document.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            expected: SNAPSHOT_VERSION,
            found: document.version,
        });
    }
    Ok(document)
}

/// Serde adapter storing `Vec<u8>` as a base64 string.
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = <Option<String>>::deserialize(deserializer)?;
        match encoded {
            Some(text) => STANDARD.decode(text.as_bytes()).map_err(D::Error::custom),
            // A nil byte slice is written as null
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::SnapshotRecord;

    fn sample() -> SnapshotDocument {
        SnapshotDocument {
            version: SNAPSHOT_VERSION,
            timestamp: 1_700_000_000,
            entries: vec![
                SnapshotRecord::new("a", b"x".to_vec()),
                SnapshotRecord::new("empty", Vec::new()),
                SnapshotRecord::new("键", vec![0, 159, 146, 150]),
            ],
        }
    }

    #[test]
    fn test_encode_is_indented_base64() {
        let text = String::from_utf8(encode(&sample()).unwrap()).unwrap();

        assert!(text.contains("\n  \"version\": 1"));
        assert!(text.contains("\"value\": \"eA==\""));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_decode_roundtrip() {
        let doc = sample();
        assert_eq!(decode(&encode(&doc).unwrap()).unwrap(), doc);
    }

    #[test]
    fn test_decode_accepts_null_value() {
        let text = r#"{"version":1,"timestamp":5,"entries":[{"key":"k","value":null}]}"#;
        let doc = decode(text.as_bytes()).unwrap();
        assert_eq!(doc.entries, vec![SnapshotRecord::new("k", Vec::new())]);
    }

    #[test]
    fn test_decode_rejects_other_version() {
        let text = r#"{"version":2,"timestamp":5,"entries":[]}"#;
        let err = decode(text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::UnsupportedVersion {
                expected: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(b"{not json"), Err(SnapshotError::Json(_))));
        assert!(matches!(
            decode(br#"{"version":1,"timestamp":0,"entries":[{"key":"k","value":"***"}]}"#),
            Err(SnapshotError::Json(_))
        ));
    }
}
