//! Turns the regressor's predicted price change into a trend call.

use crate::error::PredictionError;
use crate::misc::{BatchPrediction, PredictionResult, Trend, timestamp_now};
use feature_processing::{PriceBar, pct_of_open};
use serde_json::Value;

/// Cutoff used by `/api/predict`.
pub const SINGLE_THRESHOLD: f64 = 0.1;
/// Cutoff used by `/api/batch-predict`. Wider than the single-bar cutoff;
/// the two endpoints have always classified differently.
pub const BATCH_THRESHOLD: f64 = 0.5;

const DIRECTIONAL_BASE: f64 = 80.0;
const DIRECTIONAL_SLOPE: f64 = 5.0;
const DIRECTIONAL_CAP: f64 = 99.0;
const NEUTRAL_BASE: f64 = 60.0;
const NEUTRAL_SLOPE: f64 = 30.0;

/// Both cutoffs are exclusive: a value exactly at `threshold` is Neutral.
pub fn classify(raw: f64, threshold: f64) -> Trend {
    if raw > threshold {
        Trend::Up
    } else if raw < -threshold {
        Trend::Down
    } else {
        Trend::Neutral
    }
}

/// Confidence for a single-bar call. Directional calls start at 80 and grow
/// with the predicted magnitude up to 99; neutral calls sit in [60, 63],
/// highest when the prediction is exactly zero.
pub fn confidence(raw: f64, trend: Trend) -> f64 {
    match trend {
        Trend::Up | Trend::Down => {
            (DIRECTIONAL_BASE + raw.abs() * DIRECTIONAL_SLOPE).min(DIRECTIONAL_CAP)
        }
        Trend::Neutral => NEUTRAL_BASE + (SINGLE_THRESHOLD - raw.abs()) * NEUTRAL_SLOPE,
    }
}

/// Round to two decimals. Values too large to scale are already coarser
/// than a hundredth and are returned as is.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 100.0
}

/// Every reported number must be finite; an overflow is blamed on the input.
fn finite(field: &str, value: f64) -> Result<f64, PredictionError> {
    if value.is_finite() {
        Ok(round2(value))
    } else {
        Err(PredictionError::InvalidInput {
            field: field.to_string(),
            reason: format!("derived {field} is not a finite number"),
        })
    }
}

pub fn interpret(raw: f64, bar: &PriceBar) -> Result<PredictionResult, PredictionError> {
    let trend = classify(raw, SINGLE_THRESHOLD);
    let actual_change = bar.close - bar.open;

    Ok(PredictionResult {
        trend,
        confidence: finite("confidence", confidence(raw, trend))?,
        price_change: finite("price_change", actual_change)?,
        price_change_percentage: finite(
            "price_change_percentage",
            pct_of_open(actual_change, bar.open),
        )?,
        predicted_price_change: finite("predicted_price_change", raw)?,
        predicted_price_change_percentage: finite(
            "predicted_price_change_percentage",
            pct_of_open(raw, bar.open),
        )?,
        volatility: finite("volatility", pct_of_open(bar.high - bar.low, bar.open))?,
        input_data: *bar,
        timestamp: timestamp_now(),
    })
}

pub fn interpret_batch_item(raw: f64, input: Value) -> BatchPrediction {
    BatchPrediction {
        trend: classify(raw, BATCH_THRESHOLD),
        predicted_change: round2(raw),
        input,
    }
}
