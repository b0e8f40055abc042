//! Wire envelope for fast-tier values.
//!
//! Responses round-trip through a small JSON envelope, gzip-compressed on
//! the wire. Pricing responses compress well (repeated field names, long
//! rationale strings), which keeps Redis memory bounded.

use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FastStoreError, Result};

/// Envelope stored under the cache key in the fast tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    /// Opaque pricing response.
    pub response: Value,

    /// When the entry was computed.
    pub created_at: DateTime<Utc>,

    /// When the entry expires in the durable tier.
    pub ttl_at: DateTime<Utc>,
}

impl CacheEnvelope {
    /// Creates an envelope stamped with the current time.
    #[must_use]
    pub fn new(response: Value, ttl_at: DateTime<Utc>) -> Self {
        Self {
            response,
            created_at: Utc::now(),
            ttl_at,
        }
    }

    /// Encodes the envelope as gzip-compressed JSON.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(self).map_err(|e| FastStoreError::codec(e.to_string()))?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&json)
            .and_then(|()| encoder.finish())
            .map_err(|e| FastStoreError::codec(e.to_string()))
    }

    /// Decodes an envelope from gzip-compressed JSON.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut decoder = GzDecoder::new(bytes);
        let mut json = Vec::new();
        decoder
            .read_to_end(&mut json)
            .map_err(|e| FastStoreError::codec(e.to_string()))?;

        serde_json::from_slice(&json).map_err(|e| FastStoreError::codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_envelope_round_trip() {
        let envelope = CacheEnvelope::new(
            json!({"unit_price": 14.25, "currency": "USD"}),
            Utc::now() + Duration::days(7),
        );

        let decoded = CacheEnvelope::decode(&envelope.encode().expect("encode"))
            .expect("decode");
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = CacheEnvelope::decode(b"definitely not gzip");
        assert!(matches!(result, Err(FastStoreError::Codec(_))));
    }

    #[test]
    fn test_encoding_compresses_repetitive_payloads() {
        let line_items: Vec<Value> = (0..50)
            .map(|i| json!({"operation": "cnc_milling_setup", "minutes": i}))
            .collect();
        let envelope = CacheEnvelope::new(json!({"line_items": line_items}), Utc::now());

        let encoded = envelope.encode().expect("encode");
        let plain = serde_json::to_vec(&envelope).expect("plain json");
        assert!(encoded.len() < plain.len());
    }
}
