use crate::engine::InferenceEngine;
use crate::error::PredictionError;
use crate::interpreter::{interpret, interpret_batch_item};
use crate::misc::{BatchPrediction, BatchResponse, PredictionResult};
use crate::validator::{check_features, parse_bar};
use feature_processing::engineer;
use log::debug;
use serde_json::Value;

/// Validate, engineer, infer and interpret one bar.
pub fn predict_single(
    engine: &InferenceEngine,
    payload: &Value,
) -> Result<PredictionResult, PredictionError> {
    if !engine.is_loaded() {
        return Err(PredictionError::ModelNotLoaded);
    }

    let bar = parse_bar(payload)?;
    let features = engineer(&bar);
    check_features(&features)?;
    let raw = engine.infer(&features)?;

    let result = interpret(raw, &bar)?;
    debug!("Predicted {:?} (raw {raw}) for {bar:?}", result.trend);
    Ok(result)
}

/// Run every item of `{"data": [...]}` through the single-bar pipeline, in
/// order. The first failing item aborts the whole batch.
pub fn predict_batch(
    engine: &InferenceEngine,
    payload: &Value,
) -> Result<BatchResponse, PredictionError> {
    if !engine.is_loaded() {
        return Err(PredictionError::ModelNotLoaded);
    }

    let items = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or(PredictionError::InvalidBatchFormat)?;

    let predictions = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            predict_item(engine, item).map_err(|source| PredictionError::BatchItem {
                index,
                source: Box::new(source),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Batch of {} predictions completed", predictions.len());
    Ok(BatchResponse { predictions })
}

fn predict_item(engine: &InferenceEngine, item: &Value) -> Result<BatchPrediction, PredictionError> {
    let bar = parse_bar(item)?;
    let features = engineer(&bar);
    check_features(&features)?;
    let raw = engine.infer(&features)?;
    Ok(interpret_batch_item(raw, item.clone()))
}
