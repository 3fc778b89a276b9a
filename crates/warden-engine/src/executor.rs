//! Orchestration of a single relayed call.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use warden_limits::{DailyLimitTracker, LimitsParams};
use warden_storage::{GuardianStore, PriceOracle, TokenLedger, WalletRegistry, WalletStateStore};
use warden_types::{
	eip191_hash_message, keccak256, Address, Bytes, CallEnv, EventBus, RelayRequest,
	SignaturePolicy, WalletEvent, WalletModule, B256, U256,
};

use crate::{
	refund::{GasRefundAccountant, DEFAULT_REFUND_BASE_GAS, DEFAULT_REFUND_LIMIT_GAS},
	replay::ReplayGuard,
	signature, RelayError,
};

/// Result of a relayed submission.
///
/// `success` reflects the inner action; the relay itself succeeded
/// whenever this value is returned at all. A relayer uses the flag to
/// decide whether to retry with fresh parameters.
#[derive(Debug, Clone)]
pub struct RelayOutcome {
	pub success: bool,
	pub returned: Bytes,
	pub sign_hash: B256,
}

/// Relay engine: validates a quorum of off-chain signatures against the
/// module-declared policy, enforces uniqueness, executes the action and
/// reimburses the relayer.
pub struct RelayEngine {
	/// Engine identity mixed into every sign-hash, domain-separating it
	/// from other engines and from raw transactions.
	address: Address,
	modules: HashMap<Address, Arc<dyn WalletModule>>,
	registry: Arc<dyn WalletRegistry>,
	guardians: Arc<dyn GuardianStore>,
	states: Arc<dyn WalletStateStore>,
	replay: ReplayGuard,
	refund: GasRefundAccountant,
	events: EventBus,
}

impl RelayEngine {
	pub fn builder(address: Address) -> EngineBuilder {
		EngineBuilder::new(address)
	}

	pub fn events(&self) -> &EventBus {
		&self.events
	}

	/// Canonical hash signers commit to, binding every request
	/// parameter, wrapped as an Ethereum signed message.
	pub fn sign_hash(&self, request: &RelayRequest) -> B256 {
		let mut message =
			Vec::with_capacity(2 + 20 + 20 + 32 + request.data.len() + 32 * 3 + 20 + 20);
		message.extend_from_slice(&[0x19, 0x00]);
		message.extend_from_slice(self.address.as_slice());
		message.extend_from_slice(request.module.as_slice());
		message.extend_from_slice(&U256::ZERO.to_be_bytes::<32>());
		message.extend_from_slice(&request.data);
		message.extend_from_slice(&request.nonce.to_be_bytes::<32>());
		message.extend_from_slice(&U256::from(request.gas_price).to_be_bytes::<32>());
		message.extend_from_slice(&U256::from(request.gas_limit).to_be_bytes::<32>());
		message.extend_from_slice(request.refund_token.as_slice());
		message.extend_from_slice(request.refund_address.as_slice());
		eip191_hash_message(keccak256(message))
	}

	/// Executes one relayed submission.
	///
	/// All checks happen against a working copy of the wallet's state
	/// record, persisted only on success; any error leaves the wallet
	/// exactly as it was.
	pub async fn execute(
		&self,
		env: &CallEnv,
		request: &RelayRequest,
	) -> Result<RelayOutcome, RelayError> {
		if env.gas.remaining() < request.gas_limit {
			return Err(RelayError::InsufficientGas);
		}
		verify_wallet_payload(request)?;
		if request.module == self.address {
			// The engine classifies nothing itself; relaying to it can
			// never authenticate.
			return Err(RelayError::UnknownModule);
		}
		let module = self
			.modules
			.get(&request.module)
			.ok_or(RelayError::UnknownModule)?;
		if !self
			.registry
			.is_authorised_module(request.wallet, request.module)
			.await?
		{
			return Err(RelayError::ModuleNotAuthorised);
		}

		let requirement = module
			.required_signatures(request.wallet, &request.data)
			.await
			.map_err(RelayError::Classification)?;
		if requirement.count == 0 && requirement.policy != SignaturePolicy::Anyone {
			return Err(RelayError::InvalidRequirement);
		}
		if request.signatures.len() != requirement.count * signature::SIGNATURE_LEN {
			return Err(RelayError::SignatureLength);
		}

		let sign_hash = self.sign_hash(request);
		let mut state = self.states.load(request.wallet).await?;
		self.replay.check_and_consume(
			&mut state.relayer,
			env,
			request.nonce,
			sign_hash,
			&requirement,
		)?;

		// Guardian membership is only read when the policy can involve
		// one.
		let guardians = if requirement.policy != SignaturePolicy::Required
			|| requirement.count > 1
		{
			self.guardians.guardians(request.wallet).await?
		} else {
			Vec::new()
		};
		let owner = self.registry.owner(request.wallet).await?;
		signature::validate_signatures(
			sign_hash,
			&request.signatures,
			owner,
			&guardians,
			requirement.policy,
		)?;

		// The inner action must not abort the relay: a failure stays
		// billable and non-replayable. Its own effects are rolled back
		// to the post-consumption checkpoint.
		let checkpoint = state.clone();
		let (success, returned) = match module
			.invoke(env, request.wallet, &mut state, &request.data)
			.await
		{
			Ok(returned) => (true, returned),
			Err(error) => {
				debug!(wallet = %request.wallet, %error, "relayed action failed");
				state = checkpoint;
				(false, Bytes::new())
			}
		};

		self.refund
			.settle(env, request, &requirement, &mut state)
			.await?;
		self.states.store(request.wallet, state).await?;

		self.events
			.publish(WalletEvent::TransactionExecuted {
				wallet: request.wallet,
				success,
				returned: returned.clone(),
				sign_hash,
			})
			.ok();
		Ok(RelayOutcome {
			success,
			returned,
			sign_hash,
		})
	}
}

/// The payload's first argument (bytes 4..36) must name the same wallet
/// the relayer declared, so a signed payload cannot be submitted against
/// a different wallet.
fn verify_wallet_payload(request: &RelayRequest) -> Result<(), RelayError> {
	if request.data.len() < 36 || request.data[16..36] != request.wallet.as_slice()[..] {
		return Err(RelayError::WalletMismatch);
	}
	Ok(())
}

/// Wires the relay engine from its collaborators.
pub struct EngineBuilder {
	address: Address,
	modules: HashMap<Address, Arc<dyn WalletModule>>,
	registry: Option<Arc<dyn WalletRegistry>>,
	guardians: Option<Arc<dyn GuardianStore>>,
	states: Option<Arc<dyn WalletStateStore>>,
	oracle: Option<Arc<dyn PriceOracle>>,
	ledger: Option<Arc<dyn TokenLedger>>,
	events: EventBus,
	limits: LimitsParams,
	block_bound: u64,
	refund_base_gas: u64,
	refund_limit_gas: u64,
}

impl EngineBuilder {
	pub fn new(address: Address) -> Self {
		Self {
			address,
			modules: HashMap::new(),
			registry: None,
			guardians: None,
			states: None,
			oracle: None,
			ledger: None,
			events: EventBus::new(1000),
			limits: LimitsParams::default(),
			block_bound: ReplayGuard::DEFAULT_BLOCK_BOUND,
			refund_base_gas: DEFAULT_REFUND_BASE_GAS,
			refund_limit_gas: DEFAULT_REFUND_LIMIT_GAS,
		}
	}

	pub fn with_module(mut self, address: Address, module: Arc<dyn WalletModule>) -> Self {
		self.modules.insert(address, module);
		self
	}

	pub fn with_registry(mut self, registry: Arc<dyn WalletRegistry>) -> Self {
		self.registry = Some(registry);
		self
	}

	pub fn with_guardians(mut self, guardians: Arc<dyn GuardianStore>) -> Self {
		self.guardians = Some(guardians);
		self
	}

	pub fn with_states(mut self, states: Arc<dyn WalletStateStore>) -> Self {
		self.states = Some(states);
		self
	}

	pub fn with_oracle(mut self, oracle: Arc<dyn PriceOracle>) -> Self {
		self.oracle = Some(oracle);
		self
	}

	pub fn with_ledger(mut self, ledger: Arc<dyn TokenLedger>) -> Self {
		self.ledger = Some(ledger);
		self
	}

	pub fn with_events(mut self, events: EventBus) -> Self {
		self.events = events;
		self
	}

	pub fn with_limits(mut self, limits: LimitsParams) -> Self {
		self.limits = limits;
		self
	}

	pub fn with_block_bound(mut self, block_bound: u64) -> Self {
		self.block_bound = block_bound;
		self
	}

	pub fn with_refund_overheads(mut self, base_gas: u64, limit_gas: u64) -> Self {
		self.refund_base_gas = base_gas;
		self.refund_limit_gas = limit_gas;
		self
	}

	pub fn build(self) -> Result<RelayEngine, RelayError> {
		if self.modules.contains_key(&self.address) {
			return Err(RelayError::Config(
				"a module cannot live at the engine's own address".into(),
			));
		}
		let registry = self
			.registry
			.ok_or_else(|| RelayError::Config("wallet registry not provided".into()))?;
		let guardians = self
			.guardians
			.ok_or_else(|| RelayError::Config("guardian store not provided".into()))?;
		let states = self
			.states
			.ok_or_else(|| RelayError::Config("wallet state store not provided".into()))?;
		let oracle = self
			.oracle
			.ok_or_else(|| RelayError::Config("price oracle not provided".into()))?;
		let ledger = self
			.ledger
			.ok_or_else(|| RelayError::Config("token ledger not provided".into()))?;

		let refund = GasRefundAccountant::new(
			oracle,
			ledger,
			DailyLimitTracker::new(self.limits),
			self.events.clone(),
			self.refund_base_gas,
			self.refund_limit_gas,
		);
		Ok(RelayEngine {
			address: self.address,
			modules: self.modules,
			registry,
			guardians,
			states,
			replay: ReplayGuard::new(self.block_bound),
			refund,
			events: self.events,
		})
	}
}
