//! Stored record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of device identifier an order was placed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Imei,
    Sn,
}

/// One submitted unlock order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Provider order id, or a `local-<millis>` fallback when the provider
    /// did not return one.
    pub id: String,
    pub service_id: String,
    pub device_kind: DeviceKind,
    pub device_value: String,
    pub status: String,
    /// The provider's response payload, as received.
    pub raw: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn new(
        id: Option<String>,
        service_id: String,
        device_kind: DeviceKind,
        device_value: String,
        status: Option<String>,
        raw: serde_json::Value,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: id.unwrap_or_else(|| format!("local-{}", created_at.timestamp_millis())),
            service_id,
            device_kind,
            device_value,
            status: status.unwrap_or_else(|| "submitted".to_string()),
            raw,
            created_at,
        }
    }
}

/// The full persisted state: one cached services payload plus the order log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheState {
    #[serde(default)]
    pub services: Option<serde_json::Value>,
    #[serde(default)]
    pub services_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
}
