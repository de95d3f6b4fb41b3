//! HTTP request handlers.

use super::types::*;
use super::AppState;
use crate::error::RelayError;
use crate::validation;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use dhru_client::normalize::{self, Service};
use dhru_client::{DhruError, ProviderReply};
use order_store::{DeviceKind, OrderRecord};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let discovery = state.client.discovery().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        endpoint_discovered: discovery.endpoint.is_some(),
        field_map_discovered: discovery.field_map.is_some(),
        orders_recorded: state.store.order_count().await,
    })
}

/// Reseller account balance.
pub async fn balance(State(state): State<AppState>) -> Result<Json<BalanceResponse>, RelayError> {
    let reply = state.client.request(&["accountinfo", "balance"], &[]).await?;

    let parsed = normalize::parse_json(&reply.text);
    let (balance, currency) = match parsed.as_ref().map(normalize::extract_balance) {
        Some(info) => (info.balance, info.currency),
        None => (None, None),
    };
    let error = parsed
        .as_ref()
        .and_then(|v| normalize::extract_error_message(v));

    Ok(Json(BalanceResponse {
        ok: reply.ok(),
        status: reply.status.as_u16(),
        balance,
        currency,
        error,
        raw_preview: state.client.preview(&reply.text),
    }))
}

/// Service catalog, cached and reshaped for resale.
pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<ServicesResponse>, RelayError> {
    if let Some(services) = state.store.cached_services().await {
        return Ok(Json(ServicesResponse {
            ok: true,
            status: 200,
            services,
            cached: true,
            error: None,
            raw_preview: None,
        }));
    }

    let reply = state.client.request(&["services"], &[]).await?;

    let parsed = normalize::parse_json(&reply.text);
    let error = parsed
        .as_ref()
        .and_then(|v| normalize::extract_error_message(v));

    let entries = parsed
        .as_ref()
        .map(normalize::extract_service_list)
        .unwrap_or_default();
    let mut services: Vec<Service> = entries
        .iter()
        .filter_map(normalize::normalize_service)
        .collect();

    services = filter_services(services, &state.relay.allow_list, &state.relay.block_list);
    apply_profit_margin(&mut services, state.relay.profit_margin_percent);

    let services = serde_json::to_value(&services).map_err(|e| RelayError::Storage(e.to_string()))?;

    if reply.ok() {
        if let Err(e) = state
            .store
            .put_services(services.clone(), state.relay.services_ttl)
            .await
        {
            warn!(error = %e, "failed to persist services cache");
        }
    }

    Ok(Json(ServicesResponse {
        ok: reply.ok(),
        status: reply.status.as_u16(),
        services,
        cached: false,
        error,
        raw_preview: Some(state.client.preview(&reply.text)),
    }))
}

/// Widget-dialect service details for one service.
pub async fn service_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceDetailsResponse>, RelayError> {
    let service_id = validation::validate_service_id(&id)?;

    // Fixed widget fields the panels expect alongside the id.
    let fields = [
        ("serviceid", service_id.as_str()),
        ("chosen", "1"),
        ("charge", "0"),
        ("cart", ""),
        ("direct", ""),
        ("nommd5id", ""),
    ];

    let details = state
        .client
        .post_widget(
            &state.relay.service_details_path,
            &fields,
            state.relay.auth_placement,
        )
        .await?;

    Ok(Json(ServiceDetailsResponse {
        service_id,
        details,
    }))
}

/// Place an unlock order.
pub async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>, RelayError> {
    let service_id = validation::validate_service_id(request.service_id.as_deref().unwrap_or(""))?;
    let device = validation::validate_device_input(request.device_value().unwrap_or(""))?;

    let extra: Vec<(String, String)> = request
        .additional_fields
        .iter()
        .filter_map(|(k, v)| normalize::value_to_string(v).map(|v| (k.clone(), v)))
        .collect();

    // Parameter-name candidates; deployments disagree on both the id and
    // the device field.
    let device_fields: &[&str] = match device.kind {
        DeviceKind::Imei => &["imei", "imei_custom"],
        DeviceKind::Sn => &["sn", "imei"],
    };

    let mut result: Option<ProviderReply> = None;
    'attempts: for &device_field in device_fields {
        for id_field in ["serviceid", "service_id"] {
            let mut params: Vec<(&str, &str)> = vec![
                (id_field, service_id.as_str()),
                (device_field, device.value.as_str()),
            ];
            for (k, v) in &extra {
                params.push((k.as_str(), v.as_str()));
            }

            let attempt = state.client.request(&["placeorder"], &params).await?;
            let ok = attempt.ok();
            if result.is_none() || ok {
                result = Some(attempt);
            }
            if ok {
                break 'attempts;
            }
        }
    }
    let reply = result.ok_or(RelayError::Provider(DhruError::NoUsableResponse))?;

    let parsed = normalize::parse_json(&reply.text);
    let (order_id, message, status) = match parsed.as_ref().map(normalize::extract_order) {
        Some(info) => (info.order_id, info.message, info.status),
        None => (None, None, None),
    };
    let error = parsed
        .as_ref()
        .and_then(|v| normalize::extract_error_message(v));

    let order = if reply.ok() {
        let raw = parsed
            .clone()
            .unwrap_or_else(|| json!({ "raw": state.client.preview(&reply.text) }));
        let record = OrderRecord::new(
            order_id,
            service_id.clone(),
            device.kind,
            device.value.clone(),
            status,
            raw,
        );
        if let Err(e) = state.store.add_order(record.clone()).await {
            warn!(error = %e, "failed to persist order record");
        }
        info!(order_id = %record.id, service_id = %service_id, "order recorded");
        Some(record)
    } else {
        warn!(
            service_id = %service_id,
            status = reply.status.as_u16(),
            "provider rejected order"
        );
        None
    };

    Ok(Json(PlaceOrderResponse {
        ok: reply.ok(),
        status: reply.status.as_u16(),
        order,
        message,
        error,
        raw_preview: state.client.preview(&reply.text),
    }))
}

/// The local order log.
pub async fn list_orders(State(state): State<AppState>) -> Json<OrdersResponse> {
    let orders = state.store.orders().await;
    let total = orders.len();
    Json(OrdersResponse { orders, total })
}

/// Order status, from the provider or the local log.
pub async fn order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, RelayError> {
    let order_id = validation::validate_order_id(&id)?;

    if !state.relay.order_status_enabled {
        let order = state
            .store
            .find_order(&order_id)
            .await
            .ok_or_else(|| RelayError::OrderNotFound(order_id.clone()))?;
        return Ok(Json(LocalOrderStatusResponse { order, stub: true }).into_response());
    }

    let mut result: Option<ProviderReply> = None;
    for field in ["orderid", "order_id", "id"] {
        let attempt = state
            .client
            .request(&["orderstatus"], &[(field, order_id.as_str())])
            .await?;
        let ok = attempt.ok();
        if result.is_none() || ok {
            result = Some(attempt);
        }
        if ok {
            break;
        }
    }
    let reply = result.ok_or(RelayError::Provider(DhruError::NoUsableResponse))?;

    let parsed = normalize::parse_json(&reply.text);
    let (extracted_id, provider_status) = match parsed.as_ref().map(normalize::extract_order_status)
    {
        Some(info) => (info.order_id, info.provider_status),
        None => (None, None),
    };
    let error = parsed
        .as_ref()
        .and_then(|v| normalize::extract_error_message(v));

    Ok(Json(OrderStatusResponse {
        ok: reply.ok(),
        status: reply.status.as_u16(),
        order_id: extracted_id.unwrap_or(order_id),
        provider_status,
        error,
        raw_preview: state.client.preview(&reply.text),
    })
    .into_response())
}

/// Diagnostic endpoint: run the probe matrix against the provider.
pub async fn provider_probe(State(state): State<AppState>) -> impl IntoResponse {
    let results = state
        .client
        .run_probe_matrix(&state.relay.service_details_path)
        .await;
    let discovery = state.client.discovery().await;

    let report = ProbeResponse {
        timestamp: Utc::now().to_rfc3339(),
        base_url: state.client.base_url().to_string(),
        discovery,
        results,
    };

    ([(header::CACHE_CONTROL, "no-store")], Json(report))
}

/// Apply the allow/block id filters to a normalized service list.
///
/// Entries without a recognizable id survive the block list but not an
/// allow list.
fn filter_services(services: Vec<Service>, allow: &[String], block: &[String]) -> Vec<Service> {
    services
        .into_iter()
        .filter(|service| {
            let id = service
                .service_id
                .as_ref()
                .and_then(normalize::value_to_string);
            match id {
                Some(id) => {
                    (allow.is_empty() || allow.contains(&id)) && !block.contains(&id)
                }
                None => allow.is_empty(),
            }
        })
        .collect()
}

/// Mark numeric prices up by the configured margin, rounded to cents.
/// String prices pass through untouched.
fn apply_profit_margin(services: &mut [Service], margin_percent: f64) {
    if margin_percent == 0.0 {
        return;
    }
    for service in services {
        if let Some(price) = service.price.as_ref().and_then(Value::as_f64) {
            let marked_up = (price * (1.0 + margin_percent / 100.0) * 100.0).round() / 100.0;
            if let Some(number) = serde_json::Number::from_f64(marked_up) {
                service.price = Some(Value::Number(number));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: &str, price: Value) -> Service {
        Service {
            service_id: Some(json!(id)),
            name: Some(json!("Unlock")),
            price: Some(price),
            delivery_time: None,
            min: None,
            max: None,
            active: None,
            category: None,
        }
    }

    #[test]
    fn allow_list_keeps_only_listed_ids() {
        let services = vec![
            service("101", json!(5.0)),
            service("102", json!(5.0)),
            service("103", json!(5.0)),
        ];
        let kept = filter_services(services, &["102".to_string()], &[]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].service_id, Some(json!("102")));
    }

    #[test]
    fn block_list_removes_listed_ids() {
        let services = vec![service("101", json!(5.0)), service("102", json!(5.0))];
        let kept = filter_services(services, &[], &["101".to_string()]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].service_id, Some(json!("102")));
    }

    #[test]
    fn numeric_ids_match_string_filters() {
        let services = vec![service("101", json!(5.0))];
        let mut numeric = services.clone();
        numeric[0].service_id = Some(json!(101));
        let kept = filter_services(numeric, &["101".to_string()], &[]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn margin_marks_up_numeric_prices_only() {
        let mut services = vec![
            service("101", json!(10.0)),
            service("102", json!("4.50 USD")),
        ];
        apply_profit_margin(&mut services, 15.0);

        assert_eq!(services[0].price, Some(json!(11.5)));
        assert_eq!(services[1].price, Some(json!("4.50 USD")));
    }

    #[test]
    fn margin_rounds_to_cents() {
        let mut services = vec![service("101", json!(9.99))];
        apply_profit_margin(&mut services, 10.0);
        assert_eq!(services[0].price, Some(json!(10.99)));
    }

    #[test]
    fn zero_margin_is_a_no_op() {
        let mut services = vec![service("101", json!(10.0))];
        apply_profit_margin(&mut services, 0.0);
        assert_eq!(services[0].price, Some(json!(10.0)));
    }
}
