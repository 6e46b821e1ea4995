//! Configuration module for the relay server.
//!
//! Configuration is sourced from environment variables, with `.env` files
//! honored through dotenvy in `main`. The provider API key is the only
//! required value; the process fails fast at startup when it is absent.
//!
//! # Example
//! ```rust,no_run
//! use scribe_relay::config::ServerConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::env;
use std::str::FromStr;

use thiserror::Error;
use zeroize::Zeroize;

use crate::core::transcription::{TranscriptionConfig, VadConfig};

/// Default listen host.
const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port.
const DEFAULT_PORT: u16 = 4000;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The provider API key is missing
    #[error("OPENAI_API_KEY must be set")]
    MissingApiKey,

    /// An environment variable holds a value that does not parse
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Environment variable name
        name: &'static str,
        /// The offending value
        value: String,
    },
}

/// Server configuration.
///
/// Contains all configuration needed to run the relay:
/// - Server settings (host, port)
/// - The OpenAI API key for the upstream transcription session
/// - Transcription settings (model, language, VAD parameters)
/// - Security settings (CORS)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    /// OpenAI API key for the realtime transcription endpoint (required)
    pub openai_api_key: String,

    // Transcription settings
    /// Transcription model (e.g., "gpt-4o-transcribe")
    pub transcription_model: String,
    /// Input language as an ISO-639-1 code
    pub transcription_language: String,
    /// Voice-activity-detection parameters for the session configuration
    pub vad: VadConfig,
    /// Input noise reduction mode ("near_field" or "far_field"), if any
    pub noise_reduction: Option<String>,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

/// Zeroize the API key when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        self.openai_api_key.zeroize();
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails fast when `OPENAI_API_KEY` is unset or empty, or when a numeric
    /// variable holds a value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_api_key = match env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => return Err(ConfigError::MissingApiKey),
        };

        let host = env_or("HOST", DEFAULT_HOST);
        let port = parse_env("PORT", DEFAULT_PORT)?;

        let vad = VadConfig {
            threshold: parse_env("VAD_THRESHOLD", VadConfig::default().threshold)?,
            prefix_padding_ms: parse_env(
                "VAD_PREFIX_PADDING_MS",
                VadConfig::default().prefix_padding_ms,
            )?,
            silence_duration_ms: parse_env(
                "VAD_SILENCE_DURATION_MS",
                VadConfig::default().silence_duration_ms,
            )?,
        };

        Ok(Self {
            host,
            port,
            openai_api_key,
            transcription_model: env_or("TRANSCRIPTION_MODEL", "gpt-4o-transcribe"),
            transcription_language: env_or("TRANSCRIPTION_LANGUAGE", "en"),
            vad,
            noise_reduction: env::var("NOISE_REDUCTION").ok().filter(|v| !v.is_empty()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .filter(|v| !v.is_empty()),
        })
    }

    /// The listen address as `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the upstream provider configuration from this server config.
    pub fn transcription_config(&self) -> TranscriptionConfig {
        TranscriptionConfig {
            api_key: self.openai_api_key.clone(),
            provider: "openai".to_string(),
            model: self.transcription_model.clone(),
            language: self.transcription_language.clone(),
            vad: self.vad,
            noise_reduction: self.noise_reduction.clone(),
            ..Default::default()
        }
    }
}

/// Read an environment variable with a fallback default.
fn env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default when unset.
fn parse_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        _ => Ok(default),
    }
}
