//! Value-moving wallet operations relayed through the engine.
//!
//! Payloads are ABI-encoded calls against the interface below; the
//! module classifies each selector's signature requirement and executes
//! the operation with the wallet's authority against the in-flight
//! state record.

use std::sync::Arc;

use alloy_sol_types::{sol, SolInterface};
use async_trait::async_trait;
use tracing::debug;
use warden_storage::{GuardianStore, PriceOracle, TokenLedger, WalletRegistry};
use warden_types::{
	Address, Bytes, CallEnv, EventBus, ModuleError, SignaturePolicy, SignatureRequirement,
	WalletEvent, WalletModule, WalletState, B256, ETH_TOKEN, LIMIT_DISABLED, ONE_ETHER, U256,
};

use crate::{
	daily::DailyLimitTracker,
	pending::{ActionKind, PendingTransferQueue},
	whitelist::Whitelist,
	LimitsParams, TransferError,
};

sol! {
	/// Wallet operations accepted by the transfer module.
	interface ITransfers {
		function transferToken(address wallet, address token, address to, uint256 amount, bytes data) external;
		function approveToken(address wallet, address token, address spender, uint256 amount) external;
		function callContract(address wallet, address target, uint256 value, bytes data) external;
		function approvedTransfer(address wallet, address token, address to, uint256 amount, bytes data) external;
		function executePendingTransfer(address wallet, address token, address to, uint256 amount, bytes data, uint256 creationBlock) external;
		function cancelPendingTransfer(address wallet, bytes32 id) external;
		function addToWhitelist(address wallet, address target) external;
		function removeFromWhitelist(address wallet, address target) external;
		function changeLimit(address wallet, uint256 newLimit) external;
		function disableLimit(address wallet) external;
	}
}

/// Transfer manager: moves value out of the wallet under the daily
/// limit, escrowing oversized or untrusted transfers behind the
/// security delay.
pub struct TransferModule {
	registry: Arc<dyn WalletRegistry>,
	guardians: Arc<dyn GuardianStore>,
	oracle: Arc<dyn PriceOracle>,
	ledger: Arc<dyn TokenLedger>,
	daily: DailyLimitTracker,
	pending: PendingTransferQueue,
	whitelist: Whitelist,
	events: EventBus,
}

impl TransferModule {
	pub fn new(
		params: LimitsParams,
		registry: Arc<dyn WalletRegistry>,
		guardians: Arc<dyn GuardianStore>,
		oracle: Arc<dyn PriceOracle>,
		ledger: Arc<dyn TokenLedger>,
		events: EventBus,
	) -> Self {
		Self {
			registry,
			guardians,
			oracle,
			ledger,
			daily: DailyLimitTracker::new(params),
			pending: PendingTransferQueue::new(params),
			whitelist: Whitelist::new(params),
			events,
		}
	}

	/// Wei value of a token amount, via the price oracle for non-native
	/// tokens.
	async fn ether_value(&self, token: Address, amount: U256) -> Result<u128, TransferError> {
		let wei = if token == ETH_TOKEN {
			amount
		} else {
			let price = self.oracle.token_price(token).await?;
			amount
				.checked_mul(price)
				.ok_or(TransferError::ValueOverflow)?
				/ U256::from(ONE_ETHER)
		};
		Ok(u128::try_from(wei).unwrap_or(u128::MAX))
	}

	async fn pay(
		&self,
		wallet: Address,
		token: Address,
		to: Address,
		amount: U256,
		data: &Bytes,
	) -> Result<(), TransferError> {
		self.ledger.transfer(wallet, token, to, amount).await?;
		self.events
			.publish(WalletEvent::Transfer {
				wallet,
				token,
				to,
				amount,
				data: data.clone(),
			})
			.ok();
		Ok(())
	}

	async fn transfer_token(
		&self,
		env: &CallEnv,
		wallet: Address,
		state: &mut WalletState,
		call: ITransfers::transferTokenCall,
	) -> Result<Bytes, TransferError> {
		let value = self.ether_value(call.token, call.amount).await?;
		if Whitelist::is_trusted(state, call.to, env.timestamp)
			|| self.daily.check_and_update(state, env.timestamp, value)
		{
			self.pay(wallet, call.token, call.to, call.amount, &call.data)
				.await?;
			return Ok(Bytes::new());
		}

		// Over the allowance and not trusted: escrow instead of failing.
		let id = PendingTransferQueue::transfer_id(
			ActionKind::Transfer,
			call.token,
			call.to,
			call.amount,
			&call.data,
			env.block_number,
		);
		let execute_after = self.pending.create(state, env.timestamp, id)?;
		debug!(%wallet, %id, execute_after, "transfer escrowed behind the security delay");
		self.events
			.publish(WalletEvent::PendingTransferCreated {
				wallet,
				id,
				execute_after,
				token: call.token,
				to: call.to,
				amount: call.amount,
				data: call.data.clone(),
			})
			.ok();
		Ok(Bytes::from(id.to_vec()))
	}

	async fn approve_token(
		&self,
		env: &CallEnv,
		wallet: Address,
		state: &mut WalletState,
		call: ITransfers::approveTokenCall,
	) -> Result<Bytes, TransferError> {
		if !Whitelist::is_trusted(state, call.spender, env.timestamp) {
			let value = self.ether_value(call.token, call.amount).await?;
			if !self.daily.check_and_update(state, env.timestamp, value) {
				return Err(TransferError::DailyLimitExceeded);
			}
		}
		self.ledger
			.approve(wallet, call.token, call.spender, call.amount)
			.await?;
		self.events
			.publish(WalletEvent::Approved {
				wallet,
				token: call.token,
				spender: call.spender,
				amount: call.amount,
			})
			.ok();
		Ok(Bytes::new())
	}

	async fn call_contract(
		&self,
		env: &CallEnv,
		wallet: Address,
		state: &mut WalletState,
		call: ITransfers::callContractCall,
	) -> Result<Bytes, TransferError> {
		// Calling the wallet or one of its modules would let an
		// arbitrary payload bypass module authorization.
		if call.target == wallet
			|| self
				.registry
				.is_authorised_module(wallet, call.target)
				.await?
		{
			return Err(TransferError::ForbiddenTarget);
		}
		if !Whitelist::is_trusted(state, call.target, env.timestamp) {
			let value = u128::try_from(call.value).unwrap_or(u128::MAX);
			if !self.daily.check_and_update(state, env.timestamp, value) {
				return Err(TransferError::DailyLimitExceeded);
			}
		}
		if call.value > U256::ZERO {
			self.ledger
				.transfer(wallet, ETH_TOKEN, call.target, call.value)
				.await?;
		}
		self.events
			.publish(WalletEvent::CalledContract {
				wallet,
				target: call.target,
				value: call.value,
				data: call.data.clone(),
			})
			.ok();
		Ok(Bytes::new())
	}

	async fn approved_transfer(
		&self,
		wallet: Address,
		call: ITransfers::approvedTransferCall,
	) -> Result<Bytes, TransferError> {
		// Guardian co-signed: the quorum replaces the daily limit.
		self.pay(wallet, call.token, call.to, call.amount, &call.data)
			.await?;
		Ok(Bytes::new())
	}

	async fn execute_pending_transfer(
		&self,
		env: &CallEnv,
		wallet: Address,
		state: &mut WalletState,
		call: ITransfers::executePendingTransferCall,
	) -> Result<Bytes, TransferError> {
		let block = u64::try_from(call.creationBlock).unwrap_or(u64::MAX);
		let id = PendingTransferQueue::transfer_id(
			ActionKind::Transfer,
			call.token,
			call.to,
			call.amount,
			&call.data,
			block,
		);
		self.pending.execute(state, env.timestamp, id)?;
		self.pay(wallet, call.token, call.to, call.amount, &call.data)
			.await?;
		self.events
			.publish(WalletEvent::PendingTransferExecuted { wallet, id })
			.ok();
		Ok(Bytes::new())
	}

	fn cancel_pending_transfer(
		&self,
		wallet: Address,
		state: &mut WalletState,
		id: B256,
	) -> Result<Bytes, TransferError> {
		self.pending.cancel(state, id)?;
		self.events
			.publish(WalletEvent::PendingTransferCanceled { wallet, id })
			.ok();
		Ok(Bytes::new())
	}

	fn add_to_whitelist(
		&self,
		env: &CallEnv,
		wallet: Address,
		state: &mut WalletState,
		target: Address,
	) -> Result<Bytes, TransferError> {
		let whitelist_after = self.whitelist.add(state, env.timestamp, target)?;
		self.events
			.publish(WalletEvent::AddedToWhitelist {
				wallet,
				target,
				whitelist_after,
			})
			.ok();
		Ok(Bytes::new())
	}

	fn remove_from_whitelist(
		&self,
		wallet: Address,
		state: &mut WalletState,
		target: Address,
	) -> Result<Bytes, TransferError> {
		self.whitelist.remove(state, target)?;
		self.events
			.publish(WalletEvent::RemovedFromWhitelist { wallet, target })
			.ok();
		Ok(Bytes::new())
	}

	fn change_limit(
		&self,
		env: &CallEnv,
		wallet: Address,
		state: &mut WalletState,
		new_limit: u128,
	) -> Result<Bytes, TransferError> {
		let start_after = self.daily.change_limit(state, env.timestamp, new_limit);
		self.events
			.publish(WalletEvent::LimitChanged {
				wallet,
				new_limit,
				start_after,
			})
			.ok();
		Ok(Bytes::new())
	}
}

#[async_trait]
impl WalletModule for TransferModule {
	async fn required_signatures(
		&self,
		wallet: Address,
		data: &[u8],
	) -> Result<SignatureRequirement, ModuleError> {
		use ITransfers::ITransfersCalls as Calls;

		let call = Calls::abi_decode(data, true).map_err(|e| ModuleError::Decode(e.to_string()))?;
		let requirement = match call {
			Calls::executePendingTransfer(_) => SignatureRequirement::anyone(),
			Calls::approvedTransfer(_) => {
				let guardians = self
					.guardians
					.guardian_count(wallet)
					.await
					.map_err(|e| ModuleError::Storage(e.to_string()))?;
				SignatureRequirement::new(1 + guardians.div_ceil(2), SignaturePolicy::Required)
			}
			_ => SignatureRequirement::owner(),
		};
		Ok(requirement)
	}

	async fn invoke(
		&self,
		env: &CallEnv,
		wallet: Address,
		state: &mut WalletState,
		data: &[u8],
	) -> Result<Bytes, ModuleError> {
		use ITransfers::ITransfersCalls as Calls;

		let call = Calls::abi_decode(data, true).map_err(|e| ModuleError::Decode(e.to_string()))?;
		if self
			.registry
			.is_locked(wallet)
			.await
			.map_err(|e| ModuleError::Storage(e.to_string()))?
		{
			return Err(ModuleError::Execution(
				TransferError::WalletLocked.to_string(),
			));
		}

		let result = match call {
			Calls::transferToken(c) => self.transfer_token(env, wallet, state, c).await,
			Calls::approveToken(c) => self.approve_token(env, wallet, state, c).await,
			Calls::callContract(c) => self.call_contract(env, wallet, state, c).await,
			Calls::approvedTransfer(c) => self.approved_transfer(wallet, c).await,
			Calls::executePendingTransfer(c) => {
				self.execute_pending_transfer(env, wallet, state, c).await
			}
			Calls::cancelPendingTransfer(c) => self.cancel_pending_transfer(wallet, state, c.id),
			Calls::addToWhitelist(c) => self.add_to_whitelist(env, wallet, state, c.target),
			Calls::removeFromWhitelist(c) => self.remove_from_whitelist(wallet, state, c.target),
			Calls::changeLimit(c) => self.change_limit(
				env,
				wallet,
				state,
				u128::try_from(c.newLimit).unwrap_or(LIMIT_DISABLED),
			),
			Calls::disableLimit(_) => self.change_limit(env, wallet, state, LIMIT_DISABLED),
		};
		result.map_err(|e| ModuleError::Execution(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_sol_types::SolCall;
	use warden_storage::implementations::memory::{
		FixedPriceOracle, InMemoryDirectory, InMemoryLedger,
	};

	const WALLET: Address = Address::repeat_byte(0x11);
	const OWNER: Address = Address::repeat_byte(0x12);
	const MODULE: Address = Address::repeat_byte(0x13);
	const RECIPIENT: Address = Address::repeat_byte(0x14);
	const RELAYER: Address = Address::repeat_byte(0x15);

	fn params() -> LimitsParams {
		LimitsParams {
			security_period: 100,
			security_window: 50,
			limit_period: 86_400,
		}
	}

	fn setup() -> (TransferModule, Arc<InMemoryLedger>) {
		let directory = Arc::new(InMemoryDirectory::new());
		directory.register(WALLET, OWNER, vec![MODULE], vec![]);

		let ledger = Arc::new(InMemoryLedger::new());
		ledger.fund(WALLET, ETH_TOKEN, U256::from(10_000_000u64));

		let module = TransferModule::new(
			params(),
			directory.clone(),
			directory,
			Arc::new(FixedPriceOracle::new()),
			ledger.clone(),
			EventBus::new(64),
		);
		(module, ledger)
	}

	fn env(block: u64, timestamp: u64) -> CallEnv {
		CallEnv::new(block, timestamp, RELAYER, 1_000_000)
	}

	fn transfer_data(amount: u64) -> Vec<u8> {
		ITransfers::transferTokenCall {
			wallet: WALLET,
			token: ETH_TOKEN,
			to: RECIPIENT,
			amount: U256::from(amount),
			data: Bytes::new(),
		}
		.abi_encode()
	}

	#[tokio::test]
	async fn test_transfer_within_limit_moves_funds() {
		let (module, ledger) = setup();
		let mut state = WalletState::new(1_000_000);

		module
			.invoke(&env(1, 10), WALLET, &mut state, &transfer_data(999_999))
			.await
			.unwrap();

		assert_eq!(
			ledger.balance(RECIPIENT, ETH_TOKEN).await.unwrap(),
			U256::from(999_999u64)
		);
		assert_eq!(state.daily.already_spent, 999_999);
	}

	#[tokio::test]
	async fn test_transfer_over_limit_is_escrowed_then_executed() {
		let (module, ledger) = setup();
		let mut state = WalletState::new(1_000_000);

		module
			.invoke(&env(1, 10), WALLET, &mut state, &transfer_data(999_999))
			.await
			.unwrap();

		// 2 wei over the remaining allowance of 1: escrowed, not moved.
		let returned = module
			.invoke(&env(2, 11), WALLET, &mut state, &transfer_data(2))
			.await
			.unwrap();
		assert_eq!(returned.len(), 32);
		assert_eq!(state.pending_transfers.len(), 1);
		assert_eq!(
			ledger.balance(RECIPIENT, ETH_TOKEN).await.unwrap(),
			U256::from(999_999u64)
		);

		// Matured: executable within the window, exactly once.
		let execute = ITransfers::executePendingTransferCall {
			wallet: WALLET,
			token: ETH_TOKEN,
			to: RECIPIENT,
			amount: U256::from(2u64),
			data: Bytes::new(),
			creationBlock: U256::from(2u64),
		}
		.abi_encode();
		module
			.invoke(&env(3, 111), WALLET, &mut state, &execute)
			.await
			.unwrap();
		assert_eq!(
			ledger.balance(RECIPIENT, ETH_TOKEN).await.unwrap(),
			U256::from(1_000_001u64)
		);
		assert!(state.pending_transfers.is_empty());

		let err = module
			.invoke(&env(4, 112), WALLET, &mut state, &execute)
			.await
			.unwrap_err();
		assert!(err.to_string().contains("unknown pending transfer"));
	}

	#[tokio::test]
	async fn test_whitelisted_recipient_bypasses_limit() {
		let (module, ledger) = setup();
		let mut state = WalletState::new(1_000);

		let add = ITransfers::addToWhitelistCall {
			wallet: WALLET,
			target: RECIPIENT,
		}
		.abi_encode();
		module
			.invoke(&env(1, 10), WALLET, &mut state, &add)
			.await
			.unwrap();

		// Not yet trusted: over-limit transfer gets escrowed.
		module
			.invoke(&env(2, 20), WALLET, &mut state, &transfer_data(5_000))
			.await
			.unwrap();
		assert_eq!(state.pending_transfers.len(), 1);

		// Past the activation delay the limit no longer applies.
		module
			.invoke(&env(3, 111), WALLET, &mut state, &transfer_data(5_000))
			.await
			.unwrap();
		assert_eq!(
			ledger.balance(RECIPIENT, ETH_TOKEN).await.unwrap(),
			U256::from(5_000u64)
		);
		assert_eq!(state.daily.already_spent, 0);
	}

	#[tokio::test]
	async fn test_approve_over_limit_fails_outright() {
		let (module, _) = setup();
		let mut state = WalletState::new(1_000);

		let approve = ITransfers::approveTokenCall {
			wallet: WALLET,
			token: ETH_TOKEN,
			spender: RECIPIENT,
			amount: U256::from(5_000u64),
		}
		.abi_encode();
		let err = module
			.invoke(&env(1, 10), WALLET, &mut state, &approve)
			.await
			.unwrap_err();
		assert!(err.to_string().contains("daily allowance"));
	}

	#[tokio::test]
	async fn test_call_contract_rejects_wallet_and_modules() {
		let (module, _) = setup();
		let mut state = WalletState::new(1_000_000);

		for target in [WALLET, MODULE] {
			let call = ITransfers::callContractCall {
				wallet: WALLET,
				target,
				value: U256::ZERO,
				data: Bytes::new(),
			}
			.abi_encode();
			let err = module
				.invoke(&env(1, 10), WALLET, &mut state, &call)
				.await
				.unwrap_err();
			assert!(err.to_string().contains("forbidden call target"));
		}
	}

	#[tokio::test]
	async fn test_classification_per_selector() {
		let (module, _) = setup();

		let requirement = module
			.required_signatures(WALLET, &transfer_data(1))
			.await
			.unwrap();
		assert_eq!(requirement, SignatureRequirement::owner());

		let execute = ITransfers::executePendingTransferCall {
			wallet: WALLET,
			token: ETH_TOKEN,
			to: RECIPIENT,
			amount: U256::ZERO,
			data: Bytes::new(),
			creationBlock: U256::ZERO,
		}
		.abi_encode();
		assert_eq!(
			module.required_signatures(WALLET, &execute).await.unwrap(),
			SignatureRequirement::anyone()
		);

		let err = module
			.required_signatures(WALLET, &[0xde, 0xad, 0xbe, 0xef])
			.await
			.unwrap_err();
		assert!(matches!(err, ModuleError::Decode(_)));
	}

	#[tokio::test]
	async fn test_locked_wallet_rejects_operations() {
		let directory = Arc::new(InMemoryDirectory::new());
		directory.register(WALLET, OWNER, vec![MODULE], vec![]);
		directory.set_locked(WALLET, true);

		let module = TransferModule::new(
			params(),
			directory.clone(),
			directory,
			Arc::new(FixedPriceOracle::new()),
			Arc::new(InMemoryLedger::new()),
			EventBus::new(64),
		);
		let mut state = WalletState::new(1_000_000);

		let err = module
			.invoke(&env(1, 10), WALLET, &mut state, &transfer_data(1))
			.await
			.unwrap_err();
		assert!(err.to_string().contains("locked"));
	}

	#[tokio::test]
	async fn test_guardian_quorum_scales_with_count() {
		let directory = Arc::new(InMemoryDirectory::new());
		directory.register(
			WALLET,
			OWNER,
			vec![MODULE],
			vec![
				Address::repeat_byte(0x21),
				Address::repeat_byte(0x22),
				Address::repeat_byte(0x23),
			],
		);
		let module = TransferModule::new(
			params(),
			directory.clone(),
			directory,
			Arc::new(FixedPriceOracle::new()),
			Arc::new(InMemoryLedger::new()),
			EventBus::new(64),
		);

		let approved = ITransfers::approvedTransferCall {
			wallet: WALLET,
			token: ETH_TOKEN,
			to: RECIPIENT,
			amount: U256::from(1u64),
			data: Bytes::new(),
		}
		.abi_encode();
		// Owner plus a majority of three guardians.
		assert_eq!(
			module.required_signatures(WALLET, &approved).await.unwrap(),
			SignatureRequirement::new(3, SignaturePolicy::Required)
		);
	}
}
