pub mod config;
pub mod engine;
pub mod error;
pub mod interpreter;
pub mod logger;
pub mod misc;
pub mod pipeline;
pub mod server;
pub mod validator;

pub use engine::{InferenceEngine, OnnxRegressor, Regressor};
pub use error::PredictionError;
pub use server::Server;
