use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "inference.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// ONNX export of the trained regressor.
    pub path: PathBuf,
    /// Column order the model was fitted with. ONNX graphs do not record
    /// column names, so they are declared here. When absent the engineered
    /// vector is passed in its canonical order.
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub intra_threads: usize,
    /// Independent sessions, so this many inferences can run at once.
    pub sessions: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
}

impl AppConfig {
    /// Defaults, then the TOML file at `path` if it exists, then
    /// `INFERENCE__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("model.path", "model/price_change.onnx")?
            .set_default("model.intra_threads", 1)?
            .set_default("model.sessions", 2)?
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("INFERENCE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        cfg.try_deserialize()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let path =
            std::env::var("INFERENCE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_defaults_without_a_file() {
        let cfg = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.model.intra_threads, 1);
        assert_eq!(cfg.model.sessions, 2);
        assert_eq!(cfg.model.path, PathBuf::from("model/price_change.onnx"));
        assert!(cfg.model.feature_names.is_none());
    }

    #[test]
    fn reads_feature_names_from_toml() {
        let path = std::env::temp_dir().join(format!("inference-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[server]\nport = 8081\n\n[model]\npath = \"m.onnx\"\nfeature_names = [\"close_price\", \"rsi\"]\n",
        )
        .unwrap();

        let cfg = AppConfig::load(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.server.port, 8081);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.model.path, PathBuf::from("m.onnx"));
        assert_eq!(
            cfg.model.feature_names,
            Some(vec!["close_price".to_string(), "rsi".to_string()])
        );
    }
}
