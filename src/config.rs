//! Configuration management for the prediction service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub encoding: EncodingConfig,
    #[serde(default)]
    pub requests: RequestConfig,
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject prediction requests arrive on
    pub predict_subject: String,
    /// Queue group shared by service instances, if any
    #[serde(default)]
    pub queue_group: Option<String>,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Directory containing schemas and classifier artifacts
    pub models_dir: String,
    /// Feature schema file name inside `models_dir`
    #[serde(default = "default_feature_schema_file")]
    pub feature_schema_file: String,
    /// Label schema file name inside `models_dir`
    #[serde(default = "default_label_schema_file")]
    pub label_schema_file: String,
    /// Refuse artifacts that carry no schema checksums
    #[serde(default = "default_require_checksums")]
    pub require_checksums: bool,
    /// Number of threads for ONNX inference per model (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_feature_schema_file() -> String {
    "cols.json".to_string()
}

fn default_label_schema_file() -> String {
    "label_map.json".to_string()
}

fn default_require_checksums() -> bool {
    true
}

fn default_onnx_threads() -> usize {
    1
}

/// Names of the feature columns with special encoding rules
#[derive(Debug, Clone, Deserialize)]
pub struct EncodingConfig {
    #[serde(default = "default_age_column")]
    pub age_column: String,
    #[serde(default = "default_gender_column")]
    pub gender_column: String,
}

fn default_age_column() -> String {
    crate::feature_extractor::AGE_COLUMN.to_string()
}

fn default_gender_column() -> String {
    crate::feature_extractor::GENDER_COLUMN.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            age_column: default_age_column(),
            gender_column: default_gender_column(),
        }
    }
}

/// Request parsing policy
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestConfig {
    /// Fall back to the default age instead of rejecting an unparseable one
    #[serde(default)]
    pub lenient_age: bool,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum requests processed concurrently
    pub workers: usize,
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

fn default_report_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: default_report_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with
    /// `SYMPTOM_ENSEMBLE__SECTION__KEY` environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("SYMPTOM_ENSEMBLE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                predict_subject: "symptoms.predict".to_string(),
                queue_group: None,
            },
            models: ModelsConfig {
                models_dir: "model".to_string(),
                feature_schema_file: default_feature_schema_file(),
                label_schema_file: default_label_schema_file(),
                require_checksums: true,
                onnx_threads: 1,
            },
            encoding: EncodingConfig::default(),
            requests: RequestConfig::default(),
            pipeline: PipelineConfig { workers: 8 },
            metrics: MetricsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
