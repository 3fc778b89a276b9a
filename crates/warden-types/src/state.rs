//! Per-wallet mutable state tracked by the relay and limit subsystems.
//!
//! All of it lives in one explicit record, [`WalletState`], that is
//! loaded per call, mutated as a working copy and persisted only when
//! the call succeeds. Wallet identity is always an explicit parameter;
//! there is no hidden global map.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::common::{Address, Timestamp, B256, U256};

/// Sentinel limit value meaning "no daily limit".
pub const LIMIT_DISABLED: u128 = u128::MAX;

/// Replay-protection state for one wallet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayerState {
	/// Last consumed nonce; advanced only for single-owner-signature
	/// requests.
	pub nonce: U256,
	/// Consumed signed-hashes for every other signature policy.
	pub used_hashes: HashSet<B256>,
}

/// A spending ceiling that can only change after a security delay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Limit {
	pub current: u128,
	pub pending: u128,
	/// When the pending value becomes effective; zero when no change is
	/// staged.
	pub change_after: Timestamp,
}

impl Limit {
	pub fn new(current: u128) -> Self {
		Self {
			current,
			pending: 0,
			change_after: 0,
		}
	}

	/// Effective limit at `now`: the staged value once its delay elapsed.
	pub fn effective(&self, now: Timestamp) -> u128 {
		if self.change_after != 0 && self.change_after < now {
			self.pending
		} else {
			self.current
		}
	}
}

/// Cumulative spend within the current rolling window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DailySpent {
	pub already_spent: u128,
	/// End of the window; a timestamp at or past this means the window
	/// has rolled over and the spend logically reset.
	pub period_end: Timestamp,
}

/// The explicit per-wallet record owned by the relay/limit subsystems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletState {
	pub relayer: RelayerState,
	pub limit: Limit,
	pub daily: DailySpent,
	/// Pending transfer key -> executable-after timestamp. Expired
	/// entries stay in place; the block-number salt in the key keeps
	/// identical later transfers from colliding with them.
	pub pending_transfers: HashMap<B256, Timestamp>,
	/// Whitelisted recipient -> trusted-after timestamp.
	pub whitelist: HashMap<Address, Timestamp>,
}

impl WalletState {
	pub fn new(default_limit: u128) -> Self {
		Self {
			relayer: RelayerState::default(),
			limit: Limit::new(default_limit),
			daily: DailySpent::default(),
			pending_transfers: HashMap::new(),
			whitelist: HashMap::new(),
		}
	}
}
