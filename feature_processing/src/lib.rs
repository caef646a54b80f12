//! Single-bar feature engineering for the price-change model.

pub mod misc;
pub mod processor;
pub mod schema;

pub use misc::{FEATURE_NAMES, FeatureVector, PriceBar};
pub use processor::{engineer, pct_of_open};
pub use schema::FeatureSchema;
