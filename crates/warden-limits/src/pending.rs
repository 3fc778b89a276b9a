//! Escrow state machine for transfers held behind a security delay.

use warden_types::{keccak256, Address, BlockNumber, Timestamp, WalletState, B256, U256};

use crate::{LimitsParams, TransferError};

/// Kind of escrowed action, part of the pending-transfer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActionKind {
	Transfer = 0,
}

/// Time-delayed escrow for transfers over the limit or to untrusted
/// recipients.
///
/// An entry matures `security_period` after creation, is executable for
/// `security_window` seconds, and after that stays in place as a stale
/// tombstone: the block-number salt in the key means an identical
/// transfer created later never collides with it.
#[derive(Debug, Clone, Copy)]
pub struct PendingTransferQueue {
	params: LimitsParams,
}

impl PendingTransferQueue {
	pub fn new(params: LimitsParams) -> Self {
		Self { params }
	}

	/// Key of a pending transfer.
	pub fn transfer_id(
		kind: ActionKind,
		token: Address,
		to: Address,
		amount: U256,
		data: &[u8],
		block: BlockNumber,
	) -> B256 {
		let mut buf = Vec::with_capacity(1 + 20 + 20 + 32 + data.len() + 8);
		buf.push(kind as u8);
		buf.extend_from_slice(token.as_slice());
		buf.extend_from_slice(to.as_slice());
		buf.extend_from_slice(&amount.to_be_bytes::<32>());
		buf.extend_from_slice(data);
		buf.extend_from_slice(&block.to_be_bytes());
		keccak256(buf)
	}

	/// Escrows a transfer. Returns the timestamp at which it becomes
	/// executable.
	pub fn create(
		&self,
		state: &mut WalletState,
		now: Timestamp,
		id: B256,
	) -> Result<Timestamp, TransferError> {
		if state.pending_transfers.contains_key(&id) {
			return Err(TransferError::DuplicatePendingTransfer);
		}
		let execute_after = now + self.params.security_period;
		state.pending_transfers.insert(id, execute_after);
		Ok(execute_after)
	}

	/// Clears a matured entry.
	///
	/// Too-early and expired attempts are rejected with the same window
	/// error; callers distinguish them by inspecting timestamps. Expired
	/// entries stay in place.
	pub fn execute(
		&self,
		state: &mut WalletState,
		now: Timestamp,
		id: B256,
	) -> Result<(), TransferError> {
		let execute_after = *state
			.pending_transfers
			.get(&id)
			.ok_or(TransferError::UnknownPendingTransfer)?;
		if now < execute_after || now >= execute_after + self.params.security_window {
			return Err(TransferError::OutsideExecutionWindow);
		}
		state.pending_transfers.remove(&id);
		Ok(())
	}

	/// Removes an entry unconditionally; owner cancellation works at any
	/// point before execution.
	pub fn cancel(&self, state: &mut WalletState, id: B256) -> Result<(), TransferError> {
		state
			.pending_transfers
			.remove(&id)
			.map(|_| ())
			.ok_or(TransferError::UnknownPendingTransfer)
	}

	pub fn execute_after(&self, state: &WalletState, id: B256) -> Option<Timestamp> {
		state.pending_transfers.get(&id).copied()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn queue() -> PendingTransferQueue {
		PendingTransferQueue::new(LimitsParams {
			security_period: 100,
			security_window: 50,
			limit_period: 86_400,
		})
	}

	fn sample_id(block: BlockNumber) -> B256 {
		PendingTransferQueue::transfer_id(
			ActionKind::Transfer,
			Address::repeat_byte(0x01),
			Address::repeat_byte(0x02),
			U256::from(1_000u64),
			b"payload",
			block,
		)
	}

	#[test]
	fn test_execution_window_bounds() {
		let queue = queue();
		let mut state = WalletState::new(0);
		let id = sample_id(7);

		let execute_after = queue.create(&mut state, 10, id).unwrap();
		assert_eq!(execute_after, 110);

		// Too early.
		assert!(matches!(
			queue.execute(&mut state, 109, id),
			Err(TransferError::OutsideExecutionWindow)
		));
		// At or past the window's end.
		assert!(matches!(
			queue.execute(&mut state, 160, id),
			Err(TransferError::OutsideExecutionWindow)
		));
		// Expired entries stay in place, permanently unexecutable.
		assert_eq!(queue.execute_after(&state, id), Some(110));

		queue.execute(&mut state, 110, id).unwrap();
		assert!(matches!(
			queue.execute(&mut state, 111, id),
			Err(TransferError::UnknownPendingTransfer)
		));
	}

	#[test]
	fn test_duplicate_creation_rejected_within_a_block() {
		let queue = queue();
		let mut state = WalletState::new(0);

		queue.create(&mut state, 10, sample_id(7)).unwrap();
		assert!(matches!(
			queue.create(&mut state, 11, sample_id(7)),
			Err(TransferError::DuplicatePendingTransfer)
		));

		// The block number salts the key, so the same transfer created
		// in a later block gets a fresh entry.
		queue.create(&mut state, 12, sample_id(8)).unwrap();
		assert_eq!(state.pending_transfers.len(), 2);
	}

	#[test]
	fn test_cancel_clears_at_any_time() {
		let queue = queue();
		let mut state = WalletState::new(0);
		let id = sample_id(1);

		queue.create(&mut state, 0, id).unwrap();
		queue.cancel(&mut state, id).unwrap();
		assert!(matches!(
			queue.cancel(&mut state, id),
			Err(TransferError::UnknownPendingTransfer)
		));
	}
}
