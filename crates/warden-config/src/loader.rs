//! Configuration loading from files and environment.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};
use warden_types::Address;

use crate::types::WardenConfig;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
	/// Load configuration from file
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<WardenConfig> {
		let path = path.as_ref();
		info!("Loading configuration from {:?}", path);

		let contents = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {:?}", path))?;

		let config = match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Self::from_toml(&contents)?,
			Some("json") => Self::from_json(&contents)?,
			_ => anyhow::bail!("Unsupported config format: {:?}", path),
		};

		Self::validate_config(&config)?;
		Ok(config)
	}

	/// Load from TOML string
	pub fn from_toml(contents: &str) -> Result<WardenConfig> {
		toml::from_str(contents).map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))
	}

	/// Load from JSON string
	pub fn from_json(contents: &str) -> Result<WardenConfig> {
		serde_json::from_str(contents).context("Failed to parse JSON")
	}

	/// Load from environment variables with optional file override
	pub fn from_env_and_file(file_path: Option<&Path>) -> Result<WardenConfig> {
		let mut config = if let Some(path) = file_path {
			Self::from_file(path)?
		} else {
			WardenConfig::default()
		};

		Self::apply_env_overrides(&mut config)?;

		Self::validate_config(&config)?;
		Ok(config)
	}

	/// Apply environment variable overrides
	fn apply_env_overrides(config: &mut WardenConfig) -> Result<()> {
		if let Ok(address) = std::env::var("WARDEN_RELAY_ADDRESS") {
			debug!("Overriding relay address from environment");
			config.relay.address = address
				.parse::<Address>()
				.context("WARDEN_RELAY_ADDRESS is not a valid address")?;
		}

		if let Ok(level) = std::env::var("WARDEN_LOG_LEVEL") {
			debug!("Overriding log level from environment");
			config.monitoring.log_level = level;
		}

		if let Ok(limit) = std::env::var("WARDEN_DEFAULT_LIMIT") {
			debug!("Overriding default daily limit from environment");
			config.limits.default_limit = limit
				.parse::<u128>()
				.context("WARDEN_DEFAULT_LIMIT is not a valid wei amount")?;
		}

		Ok(())
	}

	/// Validate configuration
	fn validate_config(config: &WardenConfig) -> Result<()> {
		if config.relay.block_bound == 0 {
			anyhow::bail!("relay.block_bound must be positive");
		}
		if config.relay.event_capacity == 0 {
			anyhow::bail!("relay.event_capacity must be positive");
		}
		if config.limits.security_window_secs == 0 {
			anyhow::bail!("limits.security_window_secs must be positive");
		}
		if config.limits.limit_period_secs == 0 {
			anyhow::bail!("limits.limit_period_secs must be positive");
		}
		if config.limits.default_limit == 0 {
			anyhow::bail!("limits.default_limit must be positive");
		}
		Ok(())
	}
}

/// Load configuration from standard locations
pub fn load_config() -> Result<WardenConfig> {
	// Check for config file in order:
	// 1. Environment variable CONFIG_FILE
	// 2. ./config.toml
	// 3. /etc/warden/config.toml
	// 4. Default config with env overrides

	if let Ok(path) = std::env::var("CONFIG_FILE") {
		return ConfigLoader::from_env_and_file(Some(Path::new(&path)));
	}

	let paths = ["./config.toml", "./config/warden.toml", "/etc/warden/config.toml"];

	for path in &paths {
		if Path::new(path).exists() {
			return ConfigLoader::from_env_and_file(Some(Path::new(path)));
		}
	}

	ConfigLoader::from_env_and_file(None)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_config_validates() {
		let config = WardenConfig::default();
		assert!(ConfigLoader::validate_config(&config).is_ok());
	}

	#[test]
	fn test_toml_parsing() {
		let toml = r#"
[relay]
address = "0x5af0d9cb7efad6a2d7e3b0b1e4b8d9f0a1b2c3d4"
block_bound = 5000
refund_base_gas = 30000
refund_limit_gas = 10000
event_capacity = 256

[limits]
security_period_secs = 86400
security_window_secs = 86400
limit_period_secs = 86400
default_limit = 1000000000000000000

[monitoring]
log_level = "debug"
"#;

		let config = ConfigLoader::from_toml(toml).unwrap();
		assert_eq!(config.relay.block_bound, 5_000);
		assert_eq!(config.relay.event_capacity, 256);
		assert_eq!(config.limits.default_limit, 1_000_000_000_000_000_000);
		assert_eq!(config.monitoring.log_level, "debug");
	}

	#[test]
	fn test_json_parsing() {
		let json = r#"{
			"relay": {
				"address": "0x5af0d9cb7efad6a2d7e3b0b1e4b8d9f0a1b2c3d4",
				"block_bound": 10000,
				"refund_base_gas": 30000,
				"refund_limit_gas": 10000,
				"event_capacity": 1000
			},
			"limits": {
				"security_period_secs": 3600,
				"security_window_secs": 3600,
				"limit_period_secs": 86400,
				"default_limit": 1000000
			},
			"monitoring": {
				"log_level": "info"
			}
		}"#;

		let config = ConfigLoader::from_json(json).unwrap();
		assert_eq!(config.limits.security_period_secs, 3_600);
		assert_eq!(config.limits.default_limit, 1_000_000);
	}

	#[test]
	fn test_validation_rejects_zero_window() {
		let mut config = WardenConfig::default();
		config.limits.security_window_secs = 0;

		let result = ConfigLoader::validate_config(&config);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("security_window_secs"));
	}

	#[test]
	fn test_validation_rejects_zero_block_bound() {
		let mut config = WardenConfig::default();
		config.relay.block_bound = 0;

		assert!(ConfigLoader::validate_config(&config).is_err());
	}
}
