//! Wallet events and the broadcast bus carrying them.
//!
//! Events are the observable outcomes of the core; external indexers
//! rely on their order, so they are published from the same call that
//! committed the state they describe.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::common::{Address, Bytes, Timestamp, B256, U256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalletEvent {
	TransactionExecuted {
		wallet: Address,
		success: bool,
		returned: Bytes,
		sign_hash: B256,
	},
	Refund {
		wallet: Address,
		refund_address: Address,
		refund_token: Address,
		refund_amount: U256,
	},
	LimitChanged {
		wallet: Address,
		new_limit: u128,
		start_after: Timestamp,
	},
	PendingTransferCreated {
		wallet: Address,
		id: B256,
		execute_after: Timestamp,
		token: Address,
		to: Address,
		amount: U256,
		data: Bytes,
	},
	PendingTransferExecuted {
		wallet: Address,
		id: B256,
	},
	PendingTransferCanceled {
		wallet: Address,
		id: B256,
	},
	Transfer {
		wallet: Address,
		token: Address,
		to: Address,
		amount: U256,
		data: Bytes,
	},
	Approved {
		wallet: Address,
		token: Address,
		spender: Address,
		amount: U256,
	},
	CalledContract {
		wallet: Address,
		target: Address,
		value: U256,
		data: Bytes,
	},
	AddedToWhitelist {
		wallet: Address,
		target: Address,
		whitelist_after: Timestamp,
	},
	RemovedFromWhitelist {
		wallet: Address,
		target: Address,
	},
}

/// Broadcast bus for wallet events.
///
/// Each subscriber receives its own copy of every event published after
/// the subscription was created.
pub struct EventBus {
	sender: broadcast::Sender<WalletEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns an error when nobody is listening, which callers are free
	/// to ignore.
	pub fn publish(
		&self,
		event: WalletEvent,
	) -> Result<(), broadcast::error::SendError<WalletEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}
