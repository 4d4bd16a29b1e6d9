//! Configuration loading and validation for the field encryption service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::{EncryptionKey, KEY_LEN};

/// Hex-encoded key material. `Debug` never prints the contents.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretHex(String);

impl SecretHex {
    fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretHex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for SecretHex {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// AES-256 key, exactly 64 hex characters with no padding. **Required.**
    pub encryption_key: SecretHex,

    /// Port the HTTP(S) server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// PEM certificate chain. Set together with `tls_key_path` to serve HTTPS.
    #[serde(default)]
    pub tls_cert_path: Option<String>,

    /// PEM private key. Set together with `tls_cert_path` to serve HTTPS.
    #[serde(default)]
    pub tls_key_path: Option<String>,

    /// YAML or JSON field policy file. The embedded policy is used when unset.
    #[serde(default)]
    pub field_policy_path: Option<String>,

    /// Largest request body the ingress filter will buffer.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// OTLP/gRPC endpoint for trace export. Export is off when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
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

    /// Parse the configured key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not exactly [`KEY_LEN`] bytes of hex.
    pub fn encryption_key(&self) -> Result<EncryptionKey> {
        EncryptionKey::from_hex(self.encryption_key.expose()).context("ENCRYPTION_KEY is invalid")
    }

    /// Certificate and key paths when TLS is configured.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(self.encryption_key.expose(), "ENCRYPTION_KEY")?;
        self.encryption_key()?;

        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => {
                ensure_non_empty(cert, "TLS_CERT_PATH")?;
                ensure_non_empty(key, "TLS_KEY_PATH")?;
            }
            (None, None) => {}
            _ => anyhow::bail!("TLS_CERT_PATH and TLS_KEY_PATH must be set together"),
        }

        if let Some(path) = &self.field_policy_path {
            ensure_non_empty(path, "FIELD_POLICY_PATH")?;
        }
        if self.max_body_bytes == 0 {
            anyhow::bail!("MAX_BODY_BYTES must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4";

    fn valid() -> Config {
        Config {
            encryption_key: KEY.into(),
            listen_port: default_listen_port(),
            tls_cert_path: None,
            tls_key_path: None,
            field_policy_path: None,
            max_body_bytes: default_max_body_bytes(),
            otel_exporter_otlp_endpoint: None,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_listen_port(), 8080);
        assert_eq!(default_max_body_bytes(), 1_048_576);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn valid_config_passes() {
        let cfg = valid();
        cfg.validate().unwrap();
        assert_eq!(cfg.encryption_key().unwrap().fingerprint().len(), 16);
        assert!(cfg.tls_paths().is_none());
    }

    #[test]
    fn validate_rejects_empty_key() {
        let cfg = Config {
            encryption_key: "".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_short_padded_or_non_hex_key() {
        let non_hex = "zz".repeat(KEY_LEN);
        let padded = format!(" {KEY}\n");
        for bad in [&KEY[..62], non_hex.as_str(), padded.as_str()] {
            let cfg = Config {
                encryption_key: bad.into(),
                ..valid()
            };
            assert!(cfg.validate().is_err(), "accepted {} chars", bad.len());
        }
    }

    #[test]
    fn validate_requires_both_tls_paths() {
        let cfg = Config {
            tls_cert_path: Some("/etc/tls/cert.pem".into()),
            ..valid()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            tls_cert_path: Some("/etc/tls/cert.pem".into()),
            tls_key_path: Some("/etc/tls/key.pem".into()),
            ..valid()
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.tls_paths(), Some(("/etc/tls/cert.pem", "/etc/tls/key.pem")));
    }

    #[test]
    fn validate_rejects_zero_body_limit() {
        let cfg = Config {
            max_body_bytes: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let printed = format!("{:?}", valid());
        assert!(!printed.contains(KEY));
        assert!(printed.contains("[REDACTED]"));
    }
}
