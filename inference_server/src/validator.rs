use crate::error::PredictionError;
use feature_processing::{FeatureVector, PriceBar};
use log::warn;
use serde_json::Value;

/// Fields every bar must carry, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 5] = ["open", "close", "high", "low", "volume"];

/// Validate a request object and coerce it into a `PriceBar`.
///
/// Presence of all fields is checked before any value is coerced, so a
/// missing field is reported even when another field is malformed.
pub fn parse_bar(payload: &Value) -> Result<PriceBar, PredictionError> {
    let object = payload
        .as_object()
        .ok_or_else(|| PredictionError::InvalidInput {
            field: "body".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !object.contains_key(**f)) {
        return Err(PredictionError::MissingField(missing.to_string()));
    }

    let field = |name: &str| coerce(name, &object[name]);
    Ok(PriceBar {
        open: field("open")?,
        close: field("close")?,
        high: field("high")?,
        low: field("low")?,
        volume: field("volume")?,
    })
}

/// Reject bars whose derived features overflow, e.g. a huge close over a
/// tiny open. The model never sees a non-finite value.
pub fn check_features(features: &FeatureVector) -> Result<(), PredictionError> {
    match features.iter().find(|(_, value)| !value.is_finite()) {
        Some((name, value)) => Err(PredictionError::InvalidInput {
            field: name.to_string(),
            reason: format!("derived feature is not a finite number ({value})"),
        }),
        None => Ok(()),
    }
}

/// Numbers, numeric strings and booleans are accepted. The result must be
/// finite and non-negative.
fn coerce(field: &str, value: &Value) -> Result<f64, PredictionError> {
    let invalid = |reason: String| PredictionError::InvalidInput {
        field: field.to_string(),
        reason,
    };

    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("{n} is not representable as a float")))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("could not convert string to float: '{s}'")))?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => return Err(invalid("value is null".to_string())),
        Value::Array(_) | Value::Object(_) => {
            return Err(invalid("expected a number".to_string()));
        }
    };

    if !number.is_finite() {
        return Err(invalid(format!("{number} is not a finite number")));
    }
    if number < 0.0 {
        warn!("Rejected negative {field}: {number}");
        return Err(invalid(format!("{field} cannot be negative")));
    }
    Ok(number)
}
