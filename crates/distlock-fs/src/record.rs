use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use distlock_core::DriverError;
use serde::{Deserialize, Serialize};

/// On-disk lock record, one JSON file per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Record {
    /// Hex-encoded lock value
    pub value: String,
    /// Wall-clock expiry. Records outlive the process that wrote them, so
    /// a monotonic clock cannot be used here.
    pub expires_at: DateTime<Utc>,
}

impl Record {
    pub fn new(value: &[u8], ttl: Duration, now: DateTime<Utc>) -> Result<Self, DriverError> {
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| DriverError::Internal(format!("TTL out of range: {:?}", ttl)))?;
        Ok(Self {
            value: hex::encode(value),
            expires_at,
        })
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn decode_value(&self) -> Result<Bytes, DriverError> {
        hex::decode(&self.value)
            .map(Bytes::from)
            .map_err(|e| DriverError::Serialization(format!("Invalid record value: {}", e)))
    }

    pub fn from_json(data: &[u8]) -> Result<Self, DriverError> {
        serde_json::from_slice(data)
            .map_err(|e| DriverError::Serialization(format!("Failed to parse record: {}", e)))
    }

    pub fn to_json(&self) -> Result<Vec<u8>, DriverError> {
        serde_json::to_vec(self)
            .map_err(|e| DriverError::Serialization(format!("Failed to serialize record: {}", e)))
    }
}
