//! Daily spending limits and escrowed pending transfers.
//!
//! This crate owns the value-gating half of the core: rolling-window
//! spend accounting against a delayed-change ceiling, the escrow state
//! machine for transfers that exceed it, the recipient whitelist, and
//! the transfer module that exposes these as relayable wallet
//! operations.

use thiserror::Error;

pub mod daily;
pub mod pending;
pub mod transfers;
pub mod whitelist;

pub use daily::DailyLimitTracker;
pub use pending::{ActionKind, PendingTransferQueue};
pub use transfers::TransferModule;
pub use whitelist::Whitelist;

/// Timing parameters shared by the limit subsystem.
#[derive(Debug, Clone, Copy)]
pub struct LimitsParams {
	/// Delay before limit changes, pending transfers and whitelist
	/// additions take effect, in seconds.
	pub security_period: u64,
	/// Width of the execution window that opens once a pending transfer
	/// matures, in seconds.
	pub security_window: u64,
	/// Length of one spending window, in seconds.
	pub limit_period: u64,
}

impl Default for LimitsParams {
	fn default() -> Self {
		Self {
			security_period: 24 * 3600,
			security_window: 24 * 3600,
			limit_period: 24 * 3600,
		}
	}
}

/// Errors that can occur in the limit subsystem.
#[derive(Debug, Error)]
pub enum TransferError {
	#[error("wallet is locked")]
	WalletLocked,
	#[error("amount exceeds the daily allowance")]
	DailyLimitExceeded,
	#[error("a matching transfer is already pending")]
	DuplicatePendingTransfer,
	#[error("unknown pending transfer")]
	UnknownPendingTransfer,
	#[error("outside of the execution window")]
	OutsideExecutionWindow,
	#[error("target already whitelisted")]
	AlreadyWhitelisted,
	#[error("target not whitelisted")]
	NotWhitelisted,
	#[error("forbidden call target")]
	ForbiddenTarget,
	#[error("value overflow in price conversion")]
	ValueOverflow,
	#[error("storage error: {0}")]
	Storage(#[from] warden_storage::StorageError),
}
