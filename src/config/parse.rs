use std::time::Duration;

use http::Method;

use crate::error::ConfigError;

use super::types::DurationValue;

/// Parses `500ms`, `10s`, `1m30s`, `2h`, or bare seconds. Zero is allowed.
pub(crate) fn parse_duration_value(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("Duration must not be empty.".to_owned());
    }
    if value.starts_with('-') {
        return Err(format!("Duration '{}' must not be negative.", value));
    }
    if value.bytes().all(|byte| byte.is_ascii_digit()) {
        let secs: u64 = value
            .parse()
            .map_err(|err| format!("Invalid duration '{}': {}", value, err))?;
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = value;
    while !rest.is_empty() {
        let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits_len == 0 {
            return Err(format!("Invalid duration '{}'.", value));
        }
        let (num_part, tail) = rest.split_at(digits_len);
        let unit_len = tail
            .bytes()
            .take_while(|byte| byte.is_ascii_alphabetic())
            .count();
        let (unit, tail) = tail.split_at(unit_len);
        let number: u64 = num_part
            .parse()
            .map_err(|err| format!("Invalid duration '{}': {}", value, err))?;

        let part = match unit {
            "ms" => Duration::from_millis(number),
            "s" => Duration::from_secs(number),
            "m" => Duration::from_secs(
                number
                    .checked_mul(60)
                    .ok_or_else(|| "Duration overflow.".to_owned())?,
            ),
            "h" => Duration::from_secs(
                number
                    .checked_mul(3_600)
                    .ok_or_else(|| "Duration overflow.".to_owned())?,
            ),
            "" => return Err(format!("Missing unit in duration '{}'.", value)),
            other => return Err(format!("Invalid duration unit '{}'.", other)),
        };
        total = total
            .checked_add(part)
            .ok_or_else(|| "Duration overflow.".to_owned())?;
        rest = tail;
    }

    Ok(total)
}

impl DurationValue {
    pub(crate) fn to_duration(&self, field: &str) -> Result<Duration, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidDuration {
            field: field.to_owned(),
            message,
        };
        match self {
            DurationValue::Seconds(secs) => u64::try_from(*secs)
                .map(Duration::from_secs)
                .map_err(|_err| invalid(format!("{} must not be negative.", secs))),
            DurationValue::Text(text) => parse_duration_value(text).map_err(invalid),
        }
    }
}

pub(crate) fn parse_header(value: &str) -> Result<(String, String), ConfigError> {
    match value.split_once(':') {
        Some((key, header)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), header.trim().to_owned()))
        }
        _ => Err(ConfigError::InvalidHeader {
            value: value.to_owned(),
        }),
    }
}

pub(crate) fn parse_method(index: usize, value: &str) -> Result<Method, ConfigError> {
    Method::from_bytes(value.trim().to_ascii_uppercase().as_bytes()).map_err(|_err| {
        ConfigError::InvalidMethod {
            index,
            method: value.to_owned(),
        }
    })
}

/// Converts a config integer to a count, rejecting negatives.
pub(crate) fn non_negative(context: &str, field: &'static str, value: i64) -> Result<u64, ConfigError> {
    u64::try_from(value).map_err(|_err| ConfigError::NegativeValue {
        context: context.to_owned(),
        field,
        value,
    })
}
