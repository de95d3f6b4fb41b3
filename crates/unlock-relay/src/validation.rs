//! Input validation for service ids and device identifiers.

use crate::error::RelayError;
use order_store::DeviceKind;

/// A validated IMEI or serial number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInput {
    pub kind: DeviceKind,
    pub value: String,
}

/// Trimmed input, `None` when empty.
pub fn normalize_input(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Service ids are opaque provider strings; accept 3-60 chars after trim.
pub fn validate_service_id(value: &str) -> Result<String, RelayError> {
    let value = normalize_input(value).ok_or(RelayError::InvalidServiceId)?;
    if (3..=60).contains(&value.len()) {
        Ok(value)
    } else {
        Err(RelayError::InvalidServiceId)
    }
}

/// Order ids follow the same opaque-string rule as service ids.
pub fn validate_order_id(value: &str) -> Result<String, RelayError> {
    let value = normalize_input(value).ok_or(RelayError::InvalidOrderId)?;
    if (3..=60).contains(&value.len()) {
        Ok(value)
    } else {
        Err(RelayError::InvalidOrderId)
    }
}

/// Classify and validate a device identifier.
///
/// All-digit inputs are treated as IMEIs: 14-16 digits, with a Luhn check
/// when exactly 15 (the check digit only exists at that length). Anything
/// else is a serial number: 5-40 chars from `[A-Za-z0-9._-]`.
pub fn validate_device_input(value: &str) -> Result<DeviceInput, RelayError> {
    let value = normalize_input(value)
        .ok_or_else(|| RelayError::InvalidDevice("a device IMEI or serial number is required".into()))?;

    if value.chars().all(|c| c.is_ascii_digit()) {
        if !(14..=16).contains(&value.len()) {
            return Err(RelayError::InvalidDevice(
                "an IMEI must be 14 to 16 digits".into(),
            ));
        }
        if value.len() == 15 && !luhn_check(&value) {
            return Err(RelayError::InvalidDevice(
                "the IMEI failed its Luhn check".into(),
            ));
        }
        return Ok(DeviceInput {
            kind: DeviceKind::Imei,
            value,
        });
    }

    let charset_ok = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if charset_ok && (5..=40).contains(&value.len()) {
        return Ok(DeviceInput {
            kind: DeviceKind::Sn,
            value,
        });
    }

    Err(RelayError::InvalidDevice(
        "a serial number must be 5 to 40 characters from [A-Za-z0-9._-]".into(),
    ))
}

/// Luhn checksum over an all-digit string.
pub fn luhn_check(value: &str) -> bool {
    let mut sum = 0u32;
    let mut double = false;
    for c in value.chars().rev() {
        let mut digit = match c.to_digit(10) {
            Some(d) => d,
            None => return false,
        };
        if double {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
        double = !double;
    }
    sum % 10 == 0
}
