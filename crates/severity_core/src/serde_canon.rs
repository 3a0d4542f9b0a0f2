//! Canonical JSON serialization for model artifacts
//!
//! - Sorted map keys at every depth
//! - No whitespace
//! - Shortest round-trip float formatting (serde_json/ryu)
//! - Blake3 hashing of the canonical bytes

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanonicalError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Serialize a value to canonical JSON (sorted keys, no whitespace)
///
/// serde_json writes NaN and infinities as `null`; callers validate floats
/// before serializing.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    let json_value = serde_json::to_value(value)
        .map_err(|e| CanonicalError::SerializationError(e.to_string()))?;

    let canonical = canonicalize_value(&json_value);
    serde_json::to_string(&canonical).map_err(|e| CanonicalError::SerializationError(e.to_string()))
}

fn canonicalize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> = map
                .iter()
                .map(|(k, v)| (k, canonicalize_value(v)))
                .collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(arr) => Value::Array(arr.iter().map(canonicalize_value).collect()),
        other => other.clone(),
    }
}

/// Compute Blake3 hash of canonical JSON representation
pub fn hash_canonical<T: Serialize>(value: &T) -> Result<[u8; 32], CanonicalError> {
    let json = to_canonical_json(value)?;
    Ok(*blake3::hash(json.as_bytes()).as_bytes())
}

/// Compute Blake3 hash and return as hex string
pub fn hash_canonical_hex<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    Ok(hex::encode(hash_canonical(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::QuantileCut;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Summary {
        samples: usize,
        accuracy: f64,
        cut: QuantileCut,
    }

    fn summary(accuracy: f64) -> Summary {
        Summary {
            samples: 40,
            accuracy,
            cut: QuantileCut {
                edges: vec![1.0, 2.5, 4.0, 9.0],
            },
        }
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        let json = to_canonical_json(&summary(0.5)).unwrap();
        assert_eq!(
            json,
            r#"{"accuracy":0.5,"cut":{"edges":[1.0,2.5,4.0,9.0]},"samples":40}"#
        );
    }

    #[test]
    fn test_hash_deterministic() {
        let hash1 = hash_canonical_hex(&summary(0.5)).unwrap();
        let hash2 = hash_canonical_hex(&summary(0.5)).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_hash_changes_with_data() {
        let hash1 = hash_canonical_hex(&summary(0.5)).unwrap();
        let hash2 = hash_canonical_hex(&summary(0.75)).unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_floats_roundtrip_exactly() {
        let value: f64 = 0.1 + 0.2;
        let json = to_canonical_json(&vec![value]).unwrap();
        let back: Vec<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0].to_bits(), value.to_bits());
    }
}
