//! Shared primitives and the host-supplied execution environment.

use std::sync::atomic::{AtomicU64, Ordering};

// Re-export commonly used ethereum types
pub use alloy_primitives::{eip191_hash_message, keccak256, Address, Bytes, B256, U256};

/// Block number
pub type BlockNumber = u64;

/// Timestamp (Unix seconds)
pub type Timestamp = u64;

/// Pseudo-address denoting the chain's native token.
pub const ETH_TOKEN: Address = Address::repeat_byte(0xee);

/// One native unit in wei.
pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

/// Execution environment for a single relayed call.
///
/// The host supplies block height, wall-clock time, the submitting
/// relayer and a gas meter; the core never reads ambient time or meters
/// gas itself.
#[derive(Debug)]
pub struct CallEnv {
	pub block_number: BlockNumber,
	pub timestamp: Timestamp,
	/// Address that submitted the call; receives the refund when the
	/// request names no refund address.
	pub relayer: Address,
	pub gas: GasMeter,
}

impl CallEnv {
	pub fn new(
		block_number: BlockNumber,
		timestamp: Timestamp,
		relayer: Address,
		gas_start: u64,
	) -> Self {
		Self {
			block_number,
			timestamp,
			relayer,
			gas: GasMeter::new(gas_start),
		}
	}
}

/// Gas accounting handle, decremented by the host as work is metered.
#[derive(Debug)]
pub struct GasMeter {
	start: u64,
	remaining: AtomicU64,
}

impl GasMeter {
	pub fn new(start: u64) -> Self {
		Self {
			start,
			remaining: AtomicU64::new(start),
		}
	}

	pub fn remaining(&self) -> u64 {
		self.remaining.load(Ordering::Relaxed)
	}

	/// Gas spent since entry.
	pub fn used(&self) -> u64 {
		self.start - self.remaining()
	}

	/// Records gas spent by the host.
	pub fn consume(&self, amount: u64) {
		self.remaining
			.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |remaining| {
				Some(remaining.saturating_sub(amount))
			})
			.ok();
	}
}
