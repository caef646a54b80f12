use serde::{Deserialize, Serialize};

/// A single OHLCV observation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}

/// Feature names in the order the regression model was trained on.
pub const FEATURE_NAMES: [&str; 15] = [
    "open_price",
    "close_price",
    "high_price",
    "low_price",
    "volume",
    "price_change_percent",
    "volatility",
    "moving_avg_5",
    "moving_avg_10",
    "rsi",
    "macd",
    "bollinger_upper",
    "bollinger_lower",
    "momentum",
    "avg_volume_5",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub open_price: f64,
    pub close_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub volume: f64,
    pub price_change_percent: f64,
    pub volatility: f64,
    pub moving_avg_5: f64,
    pub moving_avg_10: f64,
    pub rsi: f64,
    pub macd: f64,
    pub bollinger_upper: f64,
    pub bollinger_lower: f64,
    pub momentum: f64,
    pub avg_volume_5: f64,
}

impl FeatureVector {
    /// Look up a feature by its model-facing name.
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "open_price" => self.open_price,
            "close_price" => self.close_price,
            "high_price" => self.high_price,
            "low_price" => self.low_price,
            "volume" => self.volume,
            "price_change_percent" => self.price_change_percent,
            "volatility" => self.volatility,
            "moving_avg_5" => self.moving_avg_5,
            "moving_avg_10" => self.moving_avg_10,
            "rsi" => self.rsi,
            "macd" => self.macd,
            "bollinger_upper" => self.bollinger_upper,
            "bollinger_lower" => self.bollinger_lower,
            "momentum" => self.momentum,
            "avg_volume_5" => self.avg_volume_5,
            _ => return None,
        };
        Some(value)
    }

    /// Values in `FEATURE_NAMES` order.
    pub fn values(&self) -> Vec<f64> {
        self.iter().map(|(_, value)| value).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES
            .iter()
            .map(move |&name| (name, self.get(name).unwrap_or_default()))
    }
}
