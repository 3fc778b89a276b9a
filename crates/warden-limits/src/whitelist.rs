//! Recipient whitelist with delayed activation.

use warden_types::{Address, Timestamp, WalletState};

use crate::{LimitsParams, TransferError};

/// Whitelisted recipients are exempt from the daily limit. Additions
/// only become trusted after the security period; removal is immediate.
#[derive(Debug, Clone, Copy)]
pub struct Whitelist {
	params: LimitsParams,
}

impl Whitelist {
	pub fn new(params: LimitsParams) -> Self {
		Self { params }
	}

	/// Records a recipient; returns the timestamp from which it is
	/// trusted.
	pub fn add(
		&self,
		state: &mut WalletState,
		now: Timestamp,
		target: Address,
	) -> Result<Timestamp, TransferError> {
		if state.whitelist.contains_key(&target) {
			return Err(TransferError::AlreadyWhitelisted);
		}
		let whitelist_after = now + self.params.security_period;
		state.whitelist.insert(target, whitelist_after);
		Ok(whitelist_after)
	}

	pub fn remove(&self, state: &mut WalletState, target: Address) -> Result<(), TransferError> {
		state
			.whitelist
			.remove(&target)
			.map(|_| ())
			.ok_or(TransferError::NotWhitelisted)
	}

	pub fn is_trusted(state: &WalletState, target: Address, now: Timestamp) -> bool {
		state
			.whitelist
			.get(&target)
			.is_some_and(|whitelist_after| *whitelist_after <= now)
	}
}
