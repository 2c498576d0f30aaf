use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::crypto::{verifier_from_file, verifier_from_text, KeyType, SignatureVerifier};
use crate::error::VerificationError;

/// Prefix for environment overrides, e.g. `TLOG_VERIFIER_PUBLIC_KEY`.
pub const ENV_PREFIX: &str = "TLOG_VERIFIER";

pub const DEFAULT_LOG_FILTER: &str = "tlog_verifier=info,tlog_verify=info";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    #[serde(default)]
    pub key_type: KeyType,
    /// Public key of the log, hex or PEM.
    #[serde(default)]
    pub public_key: Option<String>,
    /// File holding the public key. Ignored when `public_key` is set.
    #[serde(default)]
    pub public_key_path: Option<String>,
    #[serde(default)]
    pub expected_origin: Option<String>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            key_type: KeyType::default(),
            public_key: None,
            public_key_path: None,
            expected_origin: None,
            log_filter: default_log_filter(),
        }
    }
}

impl VerifierConfig {
    /// Load from environment variables only.
    pub fn load() -> Result<Self, VerificationError> {
        Self::load_from(None)
    }

    /// Load defaults, then `path` if given, then environment overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self, VerificationError> {
        let mut builder = ::config::Config::builder()
            .set_default("key_type", KeyType::default().as_str())?
            .set_default("log_filter", DEFAULT_LOG_FILTER)?;

        if let Some(path) = path {
            if !path.exists() {
                return Err(VerificationError::ConfigError(format!(
                    "Configuration file not found: {:?}",
                    path
                )));
            }
            builder = builder.add_source(::config::File::from(path));
        }

        let settings = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX))
            .build()?;
        let config: VerifierConfig = settings.try_deserialize()?;

        info!("Configuration loaded");
        Ok(config)
    }

    /// Build the signature verifier for the configured public key.
    pub fn resolve_verifier(&self) -> Result<Arc<dyn SignatureVerifier>, VerificationError> {
        match (&self.public_key, &self.public_key_path) {
            (Some(public_key), _) => verifier_from_text(self.key_type, public_key),
            (None, Some(path)) => verifier_from_file(self.key_type, Path::new(path)),
            (None, None) => Err(VerificationError::ConfigError(
                "No public key configured: set public_key or public_key_path".to_string(),
            )),
        }
    }
}
