//! Configuration management with environment variable support.
//!
//! This module provides [`Config`] for loading and validating StegoCrypt settings
//! from JSON files and environment variables.
//!
//! ## Environment Variables
//!
//! - `STEGOCRYPT_CIPHER_VARIANT`: Override nonce layout (`standard` or `legacy`)
//! - `STEGOCRYPT_COMPRESS`: Override payload compression (`true`/`false`)
//! - `STEGOCRYPT_KDF_ITERATIONS`: Override PBKDF2 iteration count
//! - `STEGOCRYPT_CONFIG`: Override config file path

use crate::crypto::{CipherVariant, PasswordCipher};
use crate::kdf::DEFAULT_ITERATIONS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable names for configuration overrides
pub const ENV_CIPHER_VARIANT: &str = "STEGOCRYPT_CIPHER_VARIANT";
pub const ENV_COMPRESS: &str = "STEGOCRYPT_COMPRESS";
pub const ENV_KDF_ITERATIONS: &str = "STEGOCRYPT_KDF_ITERATIONS";
pub const ENV_CONFIG_PATH: &str = "STEGOCRYPT_CONFIG";

/// Shortest password accepted when hiding data
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cipher_variant: CipherVariant,
    pub compress: bool,
    pub kdf_iterations: u32,
    pub min_password_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cipher_variant: CipherVariant::Standard,
            compress: true,
            kdf_iterations: DEFAULT_ITERATIONS,
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

impl Config {
    /// Load config from file path
    pub fn load(path: &str) -> Result<Self> {
        let s =
            fs::read_to_string(path).with_context(|| format!("reading config file {}", path))?;
        let mut config: Config =
            serde_json::from_str(&s).with_context(|| format!("parsing config file {}", path))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with environment variable overrides
    /// Priority: ENV vars > config file > defaults
    pub fn load_with_env(path: Option<&str>) -> Result<Self> {
        let config_path = path
            .map(String::from)
            .or_else(|| env::var(ENV_CONFIG_PATH).ok());

        let mut config = match config_path {
            Some(ref p) if Path::new(p).exists() => {
                info!(path = p, "loading config from file");
                let s = fs::read_to_string(p)
                    .with_context(|| format!("reading config file {}", p))?;
                serde_json::from_str(&s).with_context(|| format!("parsing config file {}", p))?
            }
            _ => {
                debug!("using default configuration");
                Config::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to config
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(variant) = env::var(ENV_CIPHER_VARIANT) {
            debug!(variant = %variant, "overriding cipher_variant from environment");
            self.cipher_variant = variant.parse()?;
        }

        if let Ok(compress) = env::var(ENV_COMPRESS) {
            debug!(compress = %compress, "overriding compress from environment");
            self.compress = parse_bool(&compress)
                .with_context(|| format!("{} must be true or false", ENV_COMPRESS))?;
        }

        if let Ok(iterations) = env::var(ENV_KDF_ITERATIONS) {
            debug!(iterations = %iterations, "overriding kdf_iterations from environment");
            self.kdf_iterations = iterations
                .trim()
                .parse()
                .with_context(|| format!("{} must be a positive integer", ENV_KDF_ITERATIONS))?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.kdf_iterations == 0 {
            anyhow::bail!("kdf_iterations must be greater than zero");
        }

        if self.kdf_iterations != DEFAULT_ITERATIONS {
            warn!(
                iterations = self.kdf_iterations,
                default = DEFAULT_ITERATIONS,
                "non-default kdf_iterations - images will only open with the same setting"
            );
        }

        if self.min_password_len < DEFAULT_MIN_PASSWORD_LEN {
            warn!(
                min_password_len = self.min_password_len,
                "min_password_len below {} weakens password protection", DEFAULT_MIN_PASSWORD_LEN
            );
        }

        if self.cipher_variant == CipherVariant::Legacy {
            info!("legacy 16-byte nonce layout selected");
        }

        Ok(())
    }

    /// Cipher matching this configuration
    pub fn cipher(&self) -> PasswordCipher {
        PasswordCipher::new(self.cipher_variant).with_iterations(self.kdf_iterations)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.cipher_variant, CipherVariant::Standard);
        assert!(cfg.compress);
        assert_eq!(cfg.kdf_iterations, 100_000);
        assert_eq!(cfg.min_password_len, 8);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"cipher_variant":"legacy"}"#).unwrap();
        assert_eq!(cfg.cipher_variant, CipherVariant::Legacy);
        assert!(cfg.compress);
        assert_eq!(cfg.kdf_iterations, DEFAULT_ITERATIONS);
    }

    #[test]
    fn test_json_round_trip() {
        let cfg = Config {
            compress: false,
            ..Config::default()
        };
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        assert!(json.contains("\"standard\""));
        assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), cfg);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let cfg = Config {
            kdf_iterations: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_unknown_variant_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{"cipher_variant":"chacha"}"#).is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool(" TRUE "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_cipher_from_config() {
        let cfg = Config {
            cipher_variant: CipherVariant::Legacy,
            kdf_iterations: 5_000,
            ..Config::default()
        };
        let cipher = cfg.cipher();
        assert_eq!(cipher.variant(), CipherVariant::Legacy);
        assert_eq!(cipher.iterations(), 5_000);
    }
}
