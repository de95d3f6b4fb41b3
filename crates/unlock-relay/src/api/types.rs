//! API request and response types.

use dhru_client::{Discovery, ProbeResult};
use order_store::OrderRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Request to place an unlock order.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    /// Provider service id
    #[serde(default, alias = "serviceId", alias = "serviceid")]
    pub service_id: Option<String>,

    /// Device identifier, classified as IMEI or serial number server-side
    #[serde(default, alias = "imeiOrSn")]
    pub imei_or_sn: Option<String>,

    #[serde(default)]
    pub imei: Option<String>,

    #[serde(default)]
    pub sn: Option<String>,

    /// Extra provider-specific form fields passed through verbatim
    #[serde(default)]
    pub additional_fields: HashMap<String, Value>,
}

impl PlaceOrderRequest {
    /// The device identifier, whichever field it arrived in.
    pub fn device_value(&self) -> Option<&str> {
        self.imei_or_sn
            .as_deref()
            .or(self.imei.as_deref())
            .or(self.sn.as_deref())
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub endpoint_discovered: bool,
    pub field_map_discovered: bool,
    pub orders_recorded: usize,
}

/// Account balance, normalized.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub ok: bool,
    pub status: u16,
    pub balance: Option<Value>,
    pub currency: Option<String>,
    pub error: Option<String>,
    pub raw_preview: String,
}

/// Service list response.
#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub ok: bool,
    pub status: u16,
    pub services: Value,
    pub cached: bool,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_preview: Option<String>,
}

/// Widget service-details response.
#[derive(Debug, Serialize)]
pub struct ServiceDetailsResponse {
    pub service_id: String,
    pub details: Value,
}

/// Order placement response.
#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub ok: bool,
    pub status: u16,
    /// Recorded only when the provider accepted the order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderRecord>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub raw_preview: String,
}

/// Local order log response.
#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<OrderRecord>,
    pub total: usize,
}

/// Provider order-status response.
#[derive(Debug, Serialize)]
pub struct OrderStatusResponse {
    pub ok: bool,
    pub status: u16,
    pub order_id: String,
    pub provider_status: Option<String>,
    pub error: Option<String>,
    pub raw_preview: String,
}

/// Order status served from the local log when provider lookups are
/// disabled.
#[derive(Debug, Serialize)]
pub struct LocalOrderStatusResponse {
    pub order: OrderRecord,
    pub stub: bool,
}

/// Diagnostic probe report.
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub timestamp: String,
    pub base_url: String,
    pub discovery: Discovery,
    pub results: Vec<ProbeResult>,
}
