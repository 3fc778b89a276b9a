//! Configuration types for the warden core.

use serde::{Deserialize, Serialize};
use warden_types::Address;

/// Complete warden configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WardenConfig {
	/// Relay engine settings
	pub relay: RelayConfig,
	/// Spending-limit settings
	pub limits: LimitsConfig,
	/// Monitoring and logging
	pub monitoring: MonitoringConfig,
}

/// Relay engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
	/// Engine identity mixed into every sign-hash.
	pub address: Address,
	/// Forward-looking replay window for block-bounded nonces.
	pub block_bound: u64,
	/// Fixed gas overhead billed for the refund path.
	pub refund_base_gas: u64,
	/// Additional overhead billed when the refund is limit-checked.
	pub refund_limit_gas: u64,
	/// Event bus capacity.
	pub event_capacity: usize,
}

/// Spending-limit settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
	/// Delay before limit changes, pending transfers and whitelist
	/// additions take effect.
	pub security_period_secs: u64,
	/// Width of the pending-transfer execution window.
	pub security_window_secs: u64,
	/// Length of one spending window.
	pub limit_period_secs: u64,
	/// Default daily limit for wallets without an explicit one, in wei.
	pub default_limit: u128,
}

/// Monitoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
	/// Log level
	pub log_level: String,
}

impl Default for WardenConfig {
	fn default() -> Self {
		Self {
			relay: RelayConfig {
				address: Address::ZERO,
				block_bound: 10_000,
				refund_base_gas: 30_000,
				refund_limit_gas: 10_000,
				event_capacity: 1_000,
			},
			limits: LimitsConfig {
				security_period_secs: 24 * 3600,
				security_window_secs: 24 * 3600,
				limit_period_secs: 24 * 3600,
				default_limit: 1_000_000_000_000_000_000,
			},
			monitoring: MonitoringConfig {
				log_level: "info".to_string(),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_config() {
		let config = WardenConfig::default();
		assert_eq!(config.relay.block_bound, 10_000);
		assert_eq!(config.limits.limit_period_secs, 86_400);
		assert_eq!(config.monitoring.log_level, "info");
	}

	#[test]
	fn test_config_round_trips_through_toml() {
		let config = WardenConfig::default();
		let serialized = toml::to_string(&config).unwrap();
		let reparsed: WardenConfig = toml::from_str(&serialized).unwrap();
		assert_eq!(reparsed.relay.address, config.relay.address);
		assert_eq!(reparsed.limits.default_limit, config.limits.default_limit);
	}
}
