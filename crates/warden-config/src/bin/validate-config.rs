//! Configuration validation utility
//!
//! Usage: cargo run --bin validate-config config/example.toml

use std::env;
use std::process;

use warden_config::ConfigLoader;

fn main() {
	tracing_subscriber::fmt::init();

	let args: Vec<String> = env::args().collect();

	if args.len() != 2 {
		eprintln!("Usage: {} <config-file>", args[0]);
		process::exit(1);
	}

	let config_path = &args[1];

	println!("Validating configuration file: {}", config_path);

	match ConfigLoader::from_file(config_path) {
		Ok(config) => {
			println!("Configuration is valid!");
			println!("Relay engine address: {}", config.relay.address);
			println!("Nonce block bound: {}", config.relay.block_bound);
			println!(
				"Security period: {}s, execution window: {}s",
				config.limits.security_period_secs, config.limits.security_window_secs
			);
			println!("Default daily limit: {} wei", config.limits.default_limit);
			println!("Log level: {}", config.monitoring.log_level);
		}
		Err(e) => {
			eprintln!("Configuration validation failed:");
			eprintln!("{}", e);
			process::exit(1);
		}
	}
}
