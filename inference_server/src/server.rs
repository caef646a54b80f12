use crate::config::ServerConfig;
use crate::engine::InferenceEngine;
use crate::error::PredictionError;
use crate::misc::{BatchResponse, HealthStatus, PredictionResult, timestamp_now};
use crate::pipeline::{predict_batch, predict_single};
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::response::IntoResponse;
use axum::{
    Router,
    extract::State,
    response::{Json, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared application state: the model handle, loaded once at startup.
#[derive(Clone)]
struct AppState {
    engine: Arc<InferenceEngine>,
}

/// GET /api/health reports liveness and whether a model is loaded.
async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        model_loaded: state.engine.is_loaded(),
        timestamp: timestamp_now(),
    })
}

/// POST /api/predict classifies one OHLCV bar.
async fn predict(State(state): State<AppState>, body: Bytes) -> Response {
    let result = run_blocking(state.engine, body, predict_single).await;
    respond::<PredictionResult>(result, "Prediction")
}

/// POST /api/batch-predict classifies every bar of `{"data": [...]}`.
async fn batch_predict(State(state): State<AppState>, body: Bytes) -> Response {
    let result = run_blocking(state.engine, body, predict_batch).await;
    respond::<BatchResponse>(result, "Batch prediction")
}

fn parse_body(body: &[u8]) -> Result<Value, PredictionError> {
    serde_json::from_slice(body).map_err(|e| PredictionError::InvalidBody(e.to_string()))
}

/// Model calls may take a while, so they run on the blocking pool instead
/// of the async workers.
async fn run_blocking<T, F>(
    engine: Arc<InferenceEngine>,
    body: Bytes,
    handler: F,
) -> Result<T, PredictionError>
where
    T: Send + 'static,
    F: FnOnce(&InferenceEngine, &Value) -> Result<T, PredictionError> + Send + 'static,
{
    if !engine.is_loaded() {
        return Err(PredictionError::ModelNotLoaded);
    }
    let payload = parse_body(&body)?;
    tokio::task::spawn_blocking(move || handler(&engine, &payload))
        .await
        .map_err(|e| PredictionError::Inference(format!("prediction task failed: {e}")))?
}

fn respond<T: serde::Serialize>(result: Result<T, PredictionError>, what: &str) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            if e.status().is_server_error() {
                error!("{what} failed: {e}");
            } else {
                warn!("{what} rejected: {e}");
            }
            e.into_response()
        }
    }
}

pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    Ok(listener)
}

pub struct Server {
    state: AppState,
}

impl Server {
    pub fn init(engine: Arc<InferenceEngine>) -> Self {
        Self {
            state: AppState { engine },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/health", get(health))
            .route("/api/predict", post(predict))
            .route("/api/batch-predict", post(batch_predict))
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("HTTP server running on {}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }

    /// Bind `host:port` (hostnames are resolved) and serve until Ctrl+C.
    pub async fn run(&self, config: &ServerConfig) -> Result<()> {
        let listener = bind(config).await?;
        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal, initiating graceful shutdown");
        })
        .await
    }
}
