use facecast_core::pipeline::{DEFAULT_JPEG_QUALITY, DEFAULT_RESIZE_WIDTH};
use facecast_core::{MatchMetric, PipelineOptions};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value {value:?} for {key}: {reason}")]
    Env {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid bind address {0:?}")]
    BindAddress(String),
    #[error("encodings file not found: {0}")]
    EncodingsNotFound(PathBuf),
    #[error("{0}")]
    Invalid(String),
}

/// Server configuration: defaults, then an optional TOML file, then `FACECAST_*` variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listen address (default: 127.0.0.1:5000).
    pub bind: String,
    /// JSON file with known face encodings and names.
    pub encodings: PathBuf,
    /// Directory uploaded archives are extracted into.
    pub dataset_dir: PathBuf,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    pub match_metric: MatchMetric,
    /// Match threshold; the metric's default when unset.
    pub match_threshold: Option<f32>,
    /// Frame width used for detection.
    pub resize_width: u32,
    pub jpeg_quality: u8,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            encodings: PathBuf::from("encodings.json"),
            dataset_dir: PathBuf::from("dataset"),
            model_dir: facecast_core::default_model_dir(),
            match_metric: MatchMetric::Cosine,
            match_threshold: None,
            resize_width: DEFAULT_RESIZE_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Build and validate the configuration for this process.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: display, source })
    }

    /// Override fields from `FACECAST_*` variables looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FACECAST_BIND") {
            self.bind = v;
        }
        if let Some(v) = lookup("FACECAST_ENCODINGS") {
            self.encodings = PathBuf::from(v);
        }
        if let Some(v) = lookup("FACECAST_DATASET_DIR") {
            self.dataset_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("FACECAST_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = env_parse(&lookup, "FACECAST_MATCH_METRIC")? {
            self.match_metric = v;
        }
        if let Some(v) = env_parse(&lookup, "FACECAST_MATCH_THRESHOLD")? {
            self.match_threshold = Some(v);
        }
        if let Some(v) = env_parse(&lookup, "FACECAST_RESIZE_WIDTH")? {
            self.resize_width = v;
        }
        if let Some(v) = env_parse(&lookup, "FACECAST_JPEG_QUALITY")? {
            self.jpeg_quality = v;
        }
        if let Some(v) = env_parse(&lookup, "FACECAST_MAX_UPLOAD_BYTES")? {
            self.max_upload_bytes = v;
        }
        Ok(())
    }

    /// Reject settings that would only fail once serving has started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if !self.encodings.is_file() {
            return Err(ConfigError::EncodingsNotFound(self.encodings.clone()));
        }
        if self.resize_width == 0 {
            return Err(ConfigError::Invalid("resize_width must be greater than 0".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if !self.threshold().is_finite() {
            return Err(ConfigError::Invalid("match_threshold must be finite".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max_upload_bytes must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::BindAddress(self.bind.clone()))
    }

    /// Effective match threshold for the configured metric.
    pub fn threshold(&self) -> f32 {
        self.match_threshold
            .unwrap_or_else(|| self.match_metric.default_threshold())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            resize_width: self.resize_width,
            jpeg_quality: self.jpeg_quality,
        }
    }
}

fn env_parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    let parsed = value.trim().parse::<T>();
    match parsed {
        Ok(v) => Ok(Some(v)),
        Err(e) => Err(ConfigError::Env {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn with_encodings(dir: &tempfile::TempDir) -> Config {
        let encodings = dir.path().join("encodings.json");
        std::fs::write(&encodings, r#"{"encodings": [], "names": []}"#).unwrap();
        Config {
            encodings,
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.resize_width, 400);
        assert_eq!(config.jpeg_quality, 95);
        assert_eq!(config.match_metric, MatchMetric::Cosine);
        assert!((config.threshold() - 0.40).abs() < 1e-6);
    }

    #[test]
    fn test_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facecast.toml");
        std::fs::write(
            &path,
            "bind = \"0.0.0.0:8080\"\nmatch_metric = \"euclidean\"\nresize_width = 320\n",
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.match_metric, MatchMetric::Euclidean);
        assert!((config.threshold() - 0.6).abs() < 1e-6);
        assert_eq!(config.resize_width, 320);
        assert_eq!(config.jpeg_quality, 95);
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facecast.toml");
        std::fs::write(&path, "detection-method = \"hog\"\n").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("FACECAST_BIND", "127.0.0.1:9000"),
                ("FACECAST_MATCH_THRESHOLD", "0.55"),
                ("FACECAST_JPEG_QUALITY", "80"),
                ("FACECAST_DATASET_DIR", "/srv/faces"),
            ]))
            .unwrap();
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.match_threshold, Some(0.55));
        assert_eq!(config.jpeg_quality, 80);
        assert_eq!(config.dataset_dir, PathBuf::from("/srv/faces"));
    }

    #[test]
    fn test_env_parse_error_names_key() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("FACECAST_RESIZE_WIDTH", "wide")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "FACECAST_RESIZE_WIDTH", .. }));
    }

    #[test]
    fn test_validate_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(with_encodings(&dir).validate().is_ok());
    }

    #[test]
    fn test_validate_missing_encodings() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            encodings: dir.path().join("missing.json"),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EncodingsNotFound(_))));
    }

    #[test]
    fn test_validate_bad_bind() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            bind: "localhost".into(),
            ..with_encodings(&dir)
        };
        assert!(matches!(config.validate(), Err(ConfigError::BindAddress(_))));
    }

    #[test]
    fn test_validate_jpeg_quality_range() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            jpeg_quality: 0,
            ..with_encodings(&dir)
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_zero_width() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            resize_width: 0,
            ..with_encodings(&dir)
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
