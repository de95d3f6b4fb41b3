//! Field-name normalization for inconsistent provider payloads.
//!
//! Different deployments spell the same field a dozen ways
//! (`serviceid`/`service_id`/`ServiceID`, `balance`/`Balance`/
//! `account_balance`, ...). These helpers probe the known aliases in a fixed
//! order and produce stable records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const SERVICE_ID_KEYS: &[&str] = &[
    "serviceid",
    "service_id",
    "id",
    "serviceId",
    "ServiceID",
    "SERVICEID",
];
const SERVICE_NAME_KEYS: &[&str] = &[
    "servicename",
    "name",
    "service_name",
    "ServiceName",
    "SERVICENAME",
];
const PRICE_KEYS: &[&str] = &["price", "cost", "rate", "amount", "Price", "Credit", "credit"];
const DELIVERY_TIME_KEYS: &[&str] = &[
    "time",
    "processingtime",
    "processing_time",
    "delivery_time",
    "deliverytime",
    "Time",
    "DeliveryTime",
];
const MIN_KEYS: &[&str] = &["min", "min_qty", "minimum", "Min"];
const MAX_KEYS: &[&str] = &["max", "max_qty", "maximum", "Max"];
const ACTIVE_KEYS: &[&str] = &["active", "status", "is_active"];
const CATEGORY_KEYS: &[&str] = &["category", "group", "category_name"];

/// A provider service entry with the alias soup collapsed.
///
/// Values stay as raw JSON because providers return numbers and strings
/// interchangeably for the same field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub service_id: Option<Value>,
    pub name: Option<Value>,
    pub price: Option<Value>,
    pub delivery_time: Option<Value>,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub active: Option<Value>,
    pub category: Option<Value>,
}

/// Normalized account balance.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceInfo {
    pub balance: Option<Value>,
    pub currency: Option<String>,
}

/// Normalized order-placement outcome.
#[derive(Debug, Clone, Serialize)]
pub struct OrderInfo {
    pub order_id: Option<String>,
    pub message: Option<String>,
    pub status: Option<String>,
}

/// Normalized order-status outcome.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStatusInfo {
    pub order_id: Option<String>,
    pub provider_status: Option<String>,
}

/// Tolerant JSON parse; providers return HTML error pages often enough that
/// a failed parse is an expected outcome, not an error.
pub fn parse_json(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    serde_json::from_str(text).ok()
}

/// First non-null value among the given keys.
fn first_of<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let obj = value.as_object()?;
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// First non-null value at a dotted path like `account_info.balance`.
fn at_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Render a JSON scalar as a plain string (numbers lose no precision,
/// strings lose their quotes). Objects and arrays are not ids.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extract the list of services from any of the known payload wrappings.
pub fn extract_service_list(payload: &Value) -> Vec<Value> {
    if let Some(list) = payload.as_array() {
        return list.clone();
    }
    for keys in [
        &["services"][..],
        &["service"][..],
        &["data", "services"][..],
        &["data"][..],
        &["service_list"][..],
    ] {
        if let Some(list) = at_path(payload, keys).and_then(Value::as_array) {
            return list.clone();
        }
    }
    Vec::new()
}

/// Collapse one service entry; non-object entries are dropped.
pub fn normalize_service(entry: &Value) -> Option<Service> {
    if !entry.is_object() {
        return None;
    }
    Some(Service {
        service_id: first_of(entry, SERVICE_ID_KEYS).cloned(),
        name: first_of(entry, SERVICE_NAME_KEYS).cloned(),
        price: first_of(entry, PRICE_KEYS).cloned(),
        delivery_time: first_of(entry, DELIVERY_TIME_KEYS).cloned(),
        min: first_of(entry, MIN_KEYS).cloned(),
        max: first_of(entry, MAX_KEYS).cloned(),
        active: first_of(entry, ACTIVE_KEYS).cloned(),
        category: first_of(entry, CATEGORY_KEYS).cloned(),
    })
}

/// Extract balance and currency from the flat, `account_info`, and `data`
/// payload shapes.
pub fn extract_balance(payload: &Value) -> BalanceInfo {
    let balance = first_of(payload, &["balance", "Balance", "account_balance"])
        .or_else(|| at_path(payload, &["account_info", "balance"]))
        .or_else(|| at_path(payload, &["data", "balance"]))
        .cloned();

    let currency = first_of(payload, &["currency", "Currency"])
        .or_else(|| at_path(payload, &["account_info", "currency"]))
        .or_else(|| at_path(payload, &["data", "currency"]))
        .and_then(value_to_string);

    BalanceInfo { balance, currency }
}

/// Extract order id, human message, and status from a placement response.
pub fn extract_order(payload: &Value) -> OrderInfo {
    OrderInfo {
        order_id: extract_order_id(payload),
        message: first_of(payload, &["message", "msg", "error"]).and_then(value_to_string),
        status: first_of(payload, &["status", "result"]).and_then(value_to_string),
    }
}

/// Extract order id and the provider's own status word from a status
/// response.
pub fn extract_order_status(payload: &Value) -> OrderStatusInfo {
    OrderStatusInfo {
        order_id: extract_order_id(payload),
        provider_status: first_of(payload, &["status", "order_status", "state"])
            .and_then(value_to_string),
    }
}

fn extract_order_id(payload: &Value) -> Option<String> {
    first_of(payload, &["orderid", "order_id", "orderId"])
        .or_else(|| at_path(payload, &["order", "id"]))
        .and_then(value_to_string)
}

/// The provider's error message, wherever it put one.
pub fn extract_error_message(payload: &Value) -> Option<String> {
    first_of(payload, &["error", "message", "msg"]).and_then(value_to_string)
}
