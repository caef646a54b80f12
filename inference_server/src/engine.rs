use crate::config::ModelConfig;
use crate::error::PredictionError;
use anyhow::{Result, anyhow};
use feature_processing::{FeatureSchema, FeatureVector};
use log::{debug, error, info, warn};
use ndarray::Array2;
use ort::session::Session;
use ort::value::Value;
use parking_lot::{Mutex, MutexGuard};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A trained model that maps one feature row to a predicted price change.
pub trait Regressor: Send + Sync {
    fn predict(&self, row: &[f64]) -> Result<f64>;

    /// Column order the model was fitted with, if known.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    fn name(&self) -> &str;
}

/// Fixed set of exclusively-locked slots. `acquire` takes the first idle
/// slot and only waits when every slot is busy.
pub struct SessionPool<T> {
    slots: Vec<Mutex<T>>,
    next: AtomicUsize,
}

impl<T> SessionPool<T> {
    pub fn new(items: Vec<T>) -> Self {
        assert!(!items.is_empty(), "session pool needs at least one slot");
        Self {
            slots: items.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn acquire(&self) -> MutexGuard<'_, T> {
        let start = self.next.fetch_add(1, Ordering::Relaxed);
        let n = self.slots.len();
        for offset in 0..n {
            if let Some(guard) = self.slots[(start + offset) % n].try_lock() {
                return guard;
            }
        }
        self.slots[start % n].lock()
    }
}

pub struct OnnxRegressor {
    // Running a session needs exclusive access, so requests share a pool.
    sessions: SessionPool<Session>,
    feature_names: Option<Vec<String>>,
}

impl OnnxRegressor {
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let sessions = (0..config.sessions.max(1))
            .map(|_| Self::open_session(config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            sessions: SessionPool::new(sessions),
            feature_names: config.feature_names.clone(),
        })
    }

    fn open_session(config: &ModelConfig) -> Result<Session> {
        Session::builder()
            .map_err(|e| anyhow!("failed to create ONNX session builder: {e}"))?
            .with_intra_threads(config.intra_threads)
            .map_err(|e| anyhow!("failed to set intra-op threads: {e}"))?
            .commit_from_file(&config.path)
            .map_err(|e| anyhow!("failed to load ONNX model {:?}: {e}", config.path))
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        let input: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        let input_array = Array2::from_shape_vec((1, row.len()), input)?;
        let input_value = Value::from_array(input_array)
            .map_err(|e| anyhow!("input tensor creation failed: {e}"))?;

        let mut session = self.sessions.acquire();
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| anyhow!("session run failed: {e}"))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| anyhow!("model produced no outputs"))?;

        // skl2onnx exports emit float32, but accept float64 graphs as well.
        if let Ok((_, data)) = output_value.try_extract_tensor::<f32>() {
            return data
                .first()
                .map(|&v| f64::from(v))
                .ok_or_else(|| anyhow!("empty output tensor"));
        }
        let (_, data) = output_value
            .try_extract_tensor::<f64>()
            .map_err(|e| anyhow!("unsupported output tensor: {e}"))?;
        data.first()
            .copied()
            .ok_or_else(|| anyhow!("empty output tensor"))
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// Read-only model handle shared by every request.
pub struct InferenceEngine {
    model: Option<Arc<dyn Regressor>>,
    schema: Option<FeatureSchema>,
}

impl InferenceEngine {
    pub fn new(model: Arc<dyn Regressor>) -> Self {
        let schema = model.feature_names().map(FeatureSchema::new);
        if let Some(schema) = &schema {
            info!("Model expects {} features: {:?}", schema.len(), schema.names());
            let missing = schema.missing();
            if !missing.is_empty() {
                warn!("Features not produced by the engineer will be zero-filled: {missing:?}");
            }
        }

        Self {
            model: Some(model),
            schema,
        }
    }

    /// Engine with no model; every inference fails with `ModelNotLoaded`.
    pub fn unloaded() -> Self {
        Self {
            model: None,
            schema: None,
        }
    }

    /// Load the configured ONNX model. A missing or unreadable file leaves
    /// the engine unloaded so the service can still report its health.
    pub fn from_config(config: &ModelConfig) -> Self {
        if !Path::new(&config.path).exists() {
            warn!(
                "Model file not found at {:?}. Predictions are disabled until a model is provided.",
                config.path
            );
            return Self::unloaded();
        }

        match OnnxRegressor::load(config) {
            Ok(model) => {
                info!(
                    "Loaded ONNX model from {:?} ({} sessions)",
                    config.path,
                    model.sessions.len()
                );
                Self::new(Arc::new(model))
            }
            Err(e) => {
                error!("Error loading model: {e:#}");
                Self::unloaded()
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Row handed to the model: schema-aligned when the model declares its
    /// columns, canonical order otherwise.
    pub fn align(&self, features: &FeatureVector) -> Vec<f64> {
        match &self.schema {
            Some(schema) => schema.reindex(features),
            None => features.values(),
        }
    }

    pub fn infer(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        let model = self.model.as_ref().ok_or(PredictionError::ModelNotLoaded)?;
        let row = self.align(features);
        debug!("Input features for {}: {:?}", model.name(), row);

        let raw = model
            .predict(&row)
            .map_err(|e| PredictionError::Inference(format!("{e:#}")))?;
        debug!("Raw prediction: {raw}");

        if !raw.is_finite() {
            return Err(PredictionError::Inference(format!(
                "model returned a non-finite value: {raw}"
            )));
        }
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_processing::{PriceBar, engineer};
    use std::path::PathBuf;

    /// Sums the row it receives and records its width.
    struct SumModel {
        names: Option<Vec<String>>,
        last_width: Mutex<usize>,
    }

    impl Regressor for SumModel {
        fn predict(&self, row: &[f64]) -> Result<f64> {
            *self.last_width.lock() = row.len();
            Ok(row.iter().sum())
        }

        fn feature_names(&self) -> Option<&[String]> {
            self.names.as_deref()
        }

        fn name(&self) -> &str {
            "sum"
        }
    }

    struct ConstModel(f64);

    impl Regressor for ConstModel {
        fn predict(&self, _row: &[f64]) -> Result<f64> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "const"
        }
    }

    fn features() -> FeatureVector {
        engineer(&PriceBar {
            open: 100.0,
            close: 105.0,
            high: 107.0,
            low: 99.0,
            volume: 1000.0,
        })
    }

    #[test]
    fn reindexes_to_declared_schema_before_predicting() {
        let model = Arc::new(SumModel {
            names: Some(vec!["close_price".into(), "unknown".into(), "macd".into()]),
            last_width: Mutex::new(0),
        });
        let engine = InferenceEngine::new(model.clone());

        let raw = engine.infer(&features()).unwrap();
        assert_eq!(raw, 110.0);
        assert_eq!(*model.last_width.lock(), 3);
    }

    #[test]
    fn uses_canonical_order_without_schema() {
        let model = Arc::new(SumModel {
            names: None,
            last_width: Mutex::new(0),
        });
        let engine = InferenceEngine::new(model.clone());

        engine.infer(&features()).unwrap();
        assert_eq!(*model.last_width.lock(), 15);
        assert_eq!(engine.align(&features()), features().values());
    }

    #[test]
    fn unloaded_engine_reports_model_unavailable() {
        let engine = InferenceEngine::unloaded();
        assert!(!engine.is_loaded());
        assert!(matches!(
            engine.infer(&features()),
            Err(PredictionError::ModelNotLoaded)
        ));
    }

    #[test]
    fn rejects_non_finite_output() {
        let engine = InferenceEngine::new(Arc::new(ConstModel(f64::NAN)));
        assert!(matches!(
            engine.infer(&features()),
            Err(PredictionError::Inference(_))
        ));
    }

    #[test]
    fn pool_hands_out_idle_slots_before_waiting() {
        let pool = SessionPool::new(vec![0usize, 1, 2]);
        let first = pool.acquire();
        let second = pool.acquire();
        let third = pool.acquire();

        let mut held = vec![*first, *second, *third];
        held.sort();
        assert_eq!(held, vec![0, 1, 2]);

        drop(second);
        let again = pool.acquire();
        assert_eq!(*again, held[1]);
    }

    #[test]
    fn concurrent_callers_use_separate_slots() {
        let pool = Arc::new(SessionPool::new(vec![(), ()]));
        let held = pool.acquire();
        let other = Arc::clone(&pool);
        // Would block forever if the second slot were not handed out.
        std::thread::spawn(move || {
            let _slot = other.acquire();
        })
        .join()
        .unwrap();
        drop(held);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn missing_model_file_leaves_engine_unloaded() {
        let config = ModelConfig {
            path: PathBuf::from("no/such/model.onnx"),
            feature_names: None,
            intra_threads: 1,
            sessions: 2,
        };
        assert!(!InferenceEngine::from_config(&config).is_loaded());
    }
}
