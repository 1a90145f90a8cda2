//! Configuration resolution for geoloc-resolver
//!
//! **Priority:** command line → environment → TOML file → built-in default.
//!
//! Command-line and environment values both arrive through `CliArgs` (clap reads
//! the environment for any flag not given). TOML values come from the file found by
//! `geoloc_common::config::ConfigFileLocator`. Service credentials have no default;
//! startup fails if they are not configured anywhere.

use crate::pipeline::{
    PipelineSettings, DEFAULT_CALL_TIMEOUT, DEFAULT_MODEL_THRESHOLD, DEFAULT_PATTERN_THRESHOLD,
    DEFAULT_WORKERS,
};
use clap::Parser;
use geoloc_common::config::{is_valid_key, LoggingConfig};
use geoloc_common::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const MODULE_NAME: &str = "geoloc-resolver";

pub const DEFAULT_BROKERS: &str = "localhost:9092";
pub const DEFAULT_INPUT_TOPIC: &str = "address-resolve";
pub const DEFAULT_OUTPUT_TOPIC: &str = "address-processed";
pub const DEFAULT_MESSAGE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_GEOCODER_BASE_URL: &str = crate::geocoding::google_client::DEFAULT_BASE_URL;

// ============================================================================
// Command Line
// ============================================================================

/// Command-line arguments for geoloc-resolver
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "geoloc-resolver")]
#[command(about = "Resolves free-text location mentions to geocoded places")]
#[command(version)]
pub struct CliArgs {
    /// TOML configuration file (overrides $GEOLOC_CONFIG and the default locations)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Kafka bootstrap servers
    #[arg(long, env = "GEOLOC_KAFKA_BROKERS")]
    pub brokers: Option<String>,

    /// Kafka consumer group
    #[arg(long, env = "GEOLOC_KAFKA_GROUP_ID")]
    pub group_id: Option<String>,

    #[arg(long, env = "GEOLOC_KAFKA_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Topic carrying inbound entry batches
    #[arg(long, env = "GEOLOC_INPUT_TOPIC")]
    pub input_topic: Option<String>,

    /// Topic receiving resolved output batches
    #[arg(long, env = "GEOLOC_OUTPUT_TOPIC")]
    pub output_topic: Option<String>,

    /// Producer delivery timeout
    #[arg(long, env = "GEOLOC_MESSAGE_TIMEOUT_MS")]
    pub message_timeout_ms: Option<u64>,

    /// Maximum concurrent external calls per stage
    #[arg(long, env = "GEOLOC_POOL_SIZE")]
    pub pool_size: Option<usize>,

    /// Deadline for each model or geocoder call
    #[arg(long, env = "GEOLOC_CALL_TIMEOUT_SECS")]
    pub call_timeout_secs: Option<u64>,

    /// Address-extraction model endpoint
    #[arg(long, env = "GEOLOC_NER_ENDPOINT")]
    pub ner_endpoint: Option<String>,

    #[arg(long, env = "GEOLOC_NER_API_KEY", hide_env_values = true)]
    pub ner_api_key: Option<String>,

    #[arg(long, env = "GEOLOC_GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,
}

// ============================================================================
// TOML File
// ============================================================================

/// On-disk configuration (every key optional)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResolverToml {
    pub kafka: KafkaSection,
    pub pipeline: PipelineSection,
    pub ner: NerSection,
    pub geocoder: GeocoderSection,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KafkaSection {
    pub brokers: Option<String>,
    pub group_id: Option<String>,
    pub client_id: Option<String>,
    pub input_topic: Option<String>,
    pub output_topic: Option<String>,
    pub message_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub pool_size: Option<usize>,
    pub pattern_threshold: Option<f32>,
    pub model_threshold: Option<f32>,
    pub call_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NerSection {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeocoderSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub requests_per_second: Option<u32>,
}

// ============================================================================
// Resolved Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct KafkaConfig {
    pub brokers: String,
    pub group_id: String,
    pub client_id: String,
    pub input_topic: String,
    pub output_topic: String,
    pub message_timeout: Duration,
}

#[derive(Clone, PartialEq)]
pub struct NerConfig {
    pub endpoint: String,
    pub api_key: String,
}

impl fmt::Debug for NerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NerConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq)]
pub struct GeocoderConfig {
    pub api_key: String,
    pub base_url: String,
    pub requests_per_second: Option<u32>,
}

impl fmt::Debug for GeocoderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeocoderConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

/// Fully resolved startup configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    pub kafka: KafkaConfig,
    pub pipeline: PipelineSettings,
    pub ner: NerConfig,
    pub geocoder: GeocoderConfig,
    pub logging: LoggingConfig,
}

impl ResolverConfig {
    /// Merge command line/environment over the TOML file, then validate
    ///
    /// # Errors
    /// `Error::Config` when a credential is missing or a tunable is out of range.
    pub fn resolve(cli: &CliArgs, file: ResolverToml) -> Result<Self> {
        let ResolverToml {
            kafka,
            pipeline,
            ner,
            geocoder,
            logging,
        } = file;

        let kafka = KafkaConfig {
            brokers: pick(&cli.brokers, kafka.brokers, DEFAULT_BROKERS),
            group_id: pick(&cli.group_id, kafka.group_id, MODULE_NAME),
            client_id: pick(&cli.client_id, kafka.client_id, MODULE_NAME),
            input_topic: pick(&cli.input_topic, kafka.input_topic, DEFAULT_INPUT_TOPIC),
            output_topic: pick(&cli.output_topic, kafka.output_topic, DEFAULT_OUTPUT_TOPIC),
            message_timeout: Duration::from_millis(
                cli.message_timeout_ms
                    .or(kafka.message_timeout_ms)
                    .unwrap_or(DEFAULT_MESSAGE_TIMEOUT_MS),
            ),
        };

        let pipeline = PipelineSettings {
            pattern_threshold: pipeline
                .pattern_threshold
                .unwrap_or(DEFAULT_PATTERN_THRESHOLD),
            model_threshold: pipeline.model_threshold.unwrap_or(DEFAULT_MODEL_THRESHOLD),
            workers: cli.pool_size.or(pipeline.pool_size).unwrap_or(DEFAULT_WORKERS),
            call_timeout: cli
                .call_timeout_secs
                .or(pipeline.call_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CALL_TIMEOUT),
        };

        let ner = NerConfig {
            endpoint: require(
                &cli.ner_endpoint,
                ner.endpoint,
                "NER endpoint",
                "ner-endpoint",
                "GEOLOC_NER_ENDPOINT",
                "[ner] endpoint",
            )?,
            api_key: require(
                &cli.ner_api_key,
                ner.api_key,
                "NER API key",
                "ner-api-key",
                "GEOLOC_NER_API_KEY",
                "[ner] api_key",
            )?,
        };

        let geocoder = GeocoderConfig {
            api_key: require(
                &cli.google_api_key,
                geocoder.api_key,
                "Google geocoding API key",
                "google-api-key",
                "GEOLOC_GOOGLE_API_KEY",
                "[geocoder] api_key",
            )?,
            base_url: geocoder
                .base_url
                .filter(|url| is_valid_key(url))
                .unwrap_or_else(|| DEFAULT_GEOCODER_BASE_URL.to_string()),
            requests_per_second: geocoder.requests_per_second.filter(|rps| *rps > 0),
        };

        let config = Self {
            kafka,
            pipeline,
            ner,
            geocoder,
            logging,
        };
        config.validate()?;
        Ok(config)
    }

    /// Range checks on resolved tunables
    pub fn validate(&self) -> Result<()> {
        let pipeline = &self.pipeline;

        if pipeline.workers == 0 {
            return Err(Error::Config("pool_size must be at least 1".to_string()));
        }
        for (name, value) in [
            ("pattern_threshold", pipeline.pattern_threshold),
            ("model_threshold", pipeline.model_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be within [0.0, 1.0], got {}",
                    name, value
                )));
            }
        }
        if pipeline.call_timeout.is_zero() {
            return Err(Error::Config(
                "call_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.kafka.message_timeout.is_zero() {
            return Err(Error::Config(
                "message_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.kafka.input_topic == self.kafka.output_topic {
            return Err(Error::Config(format!(
                "input and output topics must differ (both '{}')",
                self.kafka.input_topic
            )));
        }
        Ok(())
    }
}

fn pick(cli: &Option<String>, file: Option<String>, default: &str) -> String {
    cli.clone()
        .filter(|v| is_valid_key(v))
        .or_else(|| file.filter(|v| is_valid_key(v)))
        .unwrap_or_else(|| default.to_string())
}

fn require(
    cli: &Option<String>,
    file: Option<String>,
    what: &str,
    flag: &str,
    env_var: &str,
    toml_key: &str,
) -> Result<String> {
    cli.clone()
        .filter(|v| is_valid_key(v))
        .or_else(|| file.filter(|v| is_valid_key(v)))
        .ok_or_else(|| {
            Error::Config(format!(
                "{} not configured. Please configure using one of:\n\
                 1. Command line: --{}\n\
                 2. Environment: {}=...\n\
                 3. TOML config: {} = \"...\"",
                what, flag, env_var,
                toml_key
            ))
        })
}
