use feature_processing::PriceBar;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

/// Response of `POST /api/predict`.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub trend: Trend,
    pub confidence: f64,
    pub price_change: f64,
    pub price_change_percentage: f64,
    pub predicted_price_change: f64,
    pub predicted_price_change_percentage: f64,
    pub volatility: f64,
    pub input_data: PriceBar,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchPrediction {
    pub trend: Trend,
    pub predicted_change: f64,
    /// The request item exactly as it was received.
    pub input: Value,
}

/// Response of `POST /api/batch-predict`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub predictions: Vec<BatchPrediction>,
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub model_loaded: bool,
    pub timestamp: String,
}

/// Local wall-clock time in ISO 8601 without an offset.
pub fn timestamp_now() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}
