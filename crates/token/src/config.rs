//! Configuration loading and validation for the `pagination-token` binary.
//!
//! All values are read from environment variables. The process exits with a
//! clear error message if any required variable is missing or invalid.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use pagination_token::{Charset, KeyId, PipelineConfig};

/// Validated command configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// KMS key id, ARN, or alias tokens are encrypted under. **Required.**
    pub kms_key_id: String,

    /// Token time-to-live in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Charset for binary attribute values (`utf-8` or `latin-1`).
    #[serde(default)]
    pub binary_charset: Charset,

    /// Override for the KMS endpoint, e.g. a local emulator.
    #[serde(default)]
    pub kms_endpoint_url: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_token_ttl_secs() -> u64 {
    300
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.kms_key_id.trim().is_empty() {
            anyhow::bail!("KMS_KEY_ID is required and must not be empty");
        }
        if self.token_ttl_secs == 0 {
            anyhow::bail!("TOKEN_TTL_SECS must be > 0");
        }
        if let Some(url) = &self.kms_endpoint_url {
            if url.trim().is_empty() {
                anyhow::bail!("KMS_ENDPOINT_URL must not be empty when set");
            }
        }
        Ok(())
    }

    /// The pipeline configuration described by these settings.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let key_id = KeyId::new(self.kms_key_id.clone()).context("invalid KMS_KEY_ID")?;
        Ok(PipelineConfig::new(key_id)
            .with_ttl(Duration::from_secs(self.token_ttl_secs))
            .with_charset(self.binary_charset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            kms_key_id: "alias/pagination".into(),
            token_ttl_secs: default_token_ttl_secs(),
            binary_charset: Charset::default(),
            kms_endpoint_url: None,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_token_ttl_secs(), 300);
        assert_eq!(default_log_level(), "info");
        assert_eq!(Charset::default(), Charset::Utf8);
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_key_id() {
        let cfg = Config {
            kms_key_id: "  ".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_ttl() {
        let cfg = Config {
            token_ttl_secs: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_endpoint() {
        let cfg = Config {
            kms_endpoint_url: Some("".into()),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn pipeline_config_carries_settings() {
        let cfg = Config {
            token_ttl_secs: 60,
            binary_charset: Charset::Latin1,
            ..valid()
        };
        let pipeline = cfg.pipeline_config().unwrap();
        assert_eq!(pipeline.key_id.as_str(), "alias/pagination");
        assert_eq!(pipeline.ttl, Duration::from_secs(60));
        assert_eq!(pipeline.charset, Charset::Latin1);
    }

    #[test]
    fn deserialises_from_config_source() {
        let cfg = config::Config::builder()
            .set_override("kms_key_id", "alias/pagination")
            .unwrap()
            .set_override("token_ttl_secs", "120")
            .unwrap()
            .set_override("binary_charset", "latin-1")
            .unwrap()
            .build()
            .unwrap();
        let c: Config = cfg.try_deserialize().unwrap();
        assert_eq!(c.token_ttl_secs, 120);
        assert_eq!(c.binary_charset, Charset::Latin1);
        assert_eq!(c.kms_endpoint_url, None);
        assert_eq!(c.log_level, "info");
    }
}
