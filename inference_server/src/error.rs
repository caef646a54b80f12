use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("request body must contain a `data` array")]
    InvalidBatchFormat,

    #[error("no regression model is loaded; check the configured model path")]
    ModelNotLoaded,

    #[error("model inference failed: {0}")]
    Inference(String),

    #[error("item {index}: {source}")]
    BatchItem {
        index: usize,
        source: Box<PredictionError>,
    },
}

/// JSON envelope returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl PredictionError {
    pub fn status(&self) -> StatusCode {
        match self {
            PredictionError::MissingField(_)
            | PredictionError::InvalidInput { .. }
            | PredictionError::InvalidBody(_)
            | PredictionError::InvalidBatchFormat => StatusCode::BAD_REQUEST,
            PredictionError::ModelNotLoaded | PredictionError::Inference(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PredictionError::BatchItem { source, .. } => source.status(),
        }
    }

    /// Short label for the `error` field of the envelope.
    pub fn label(&self) -> String {
        match self {
            PredictionError::MissingField(field) => format!("Missing required field: {field}"),
            PredictionError::InvalidInput { .. } => "Invalid input values".to_string(),
            PredictionError::InvalidBody(_) => "Invalid JSON body".to_string(),
            PredictionError::InvalidBatchFormat => "Invalid input format".to_string(),
            PredictionError::ModelNotLoaded => "Model not loaded".to_string(),
            PredictionError::Inference(_) => "Prediction failed".to_string(),
            PredictionError::BatchItem { .. } => "Batch prediction failed".to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.label(),
            message: self.to_string(),
        }
    }
}

impl IntoResponse for PredictionError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
