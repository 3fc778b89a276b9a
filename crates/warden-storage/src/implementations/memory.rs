//! In-memory storage backends for the warden system.
//!
//! These back the collaborator traits with concurrent maps. They are the
//! reference implementations used by the test suites and by
//! single-process hosts; a production deployment would put a database or
//! chain state behind the same traits.

use async_trait::async_trait;
use dashmap::DashMap;
use warden_types::{Address, WalletState, U256};

use crate::{
	GuardianStore, PriceOracle, StorageError, TokenLedger, WalletRegistry, WalletStateStore,
};

#[derive(Debug, Clone)]
struct WalletRecord {
	owner: Address,
	locked: bool,
	modules: Vec<Address>,
	guardians: Vec<Address>,
}

/// Wallet directory holding owner, lock, module and guardian data.
#[derive(Default)]
pub struct InMemoryDirectory {
	wallets: DashMap<Address, WalletRecord>,
}

impl InMemoryDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(
		&self,
		wallet: Address,
		owner: Address,
		modules: Vec<Address>,
		guardians: Vec<Address>,
	) {
		self.wallets.insert(
			wallet,
			WalletRecord {
				owner,
				locked: false,
				modules,
				guardians,
			},
		);
	}

	pub fn set_locked(&self, wallet: Address, locked: bool) {
		if let Some(mut record) = self.wallets.get_mut(&wallet) {
			record.locked = locked;
		}
	}

	pub fn add_guardian(&self, wallet: Address, guardian: Address) {
		if let Some(mut record) = self.wallets.get_mut(&wallet) {
			if !record.guardians.contains(&guardian) {
				record.guardians.push(guardian);
			}
		}
	}

	pub fn revoke_module(&self, wallet: Address, module: Address) {
		if let Some(mut record) = self.wallets.get_mut(&wallet) {
			record.modules.retain(|known| *known != module);
		}
	}
}

#[async_trait]
impl WalletRegistry for InMemoryDirectory {
	async fn owner(&self, wallet: Address) -> Result<Address, StorageError> {
		self.wallets
			.get(&wallet)
			.map(|record| record.owner)
			.ok_or(StorageError::UnknownWallet)
	}

	async fn is_locked(&self, wallet: Address) -> Result<bool, StorageError> {
		self.wallets
			.get(&wallet)
			.map(|record| record.locked)
			.ok_or(StorageError::UnknownWallet)
	}

	async fn is_authorised_module(
		&self,
		wallet: Address,
		module: Address,
	) -> Result<bool, StorageError> {
		self.wallets
			.get(&wallet)
			.map(|record| record.modules.contains(&module))
			.ok_or(StorageError::UnknownWallet)
	}
}

#[async_trait]
impl GuardianStore for InMemoryDirectory {
	async fn guardians(&self, wallet: Address) -> Result<Vec<Address>, StorageError> {
		self.wallets
			.get(&wallet)
			.map(|record| record.guardians.clone())
			.ok_or(StorageError::UnknownWallet)
	}
}

/// Per-wallet state records, created on first use with a default limit.
pub struct InMemoryStateStore {
	default_limit: u128,
	states: DashMap<Address, WalletState>,
}

impl InMemoryStateStore {
	pub fn new(default_limit: u128) -> Self {
		Self {
			default_limit,
			states: DashMap::new(),
		}
	}
}

#[async_trait]
impl WalletStateStore for InMemoryStateStore {
	async fn load(&self, wallet: Address) -> Result<WalletState, StorageError> {
		Ok(self
			.states
			.get(&wallet)
			.map(|state| state.clone())
			.unwrap_or_else(|| WalletState::new(self.default_limit)))
	}

	async fn store(&self, wallet: Address, state: WalletState) -> Result<(), StorageError> {
		self.states.insert(wallet, state);
		Ok(())
	}
}

/// Static token prices, keyed by token address.
#[derive(Default)]
pub struct FixedPriceOracle {
	prices: DashMap<Address, U256>,
}

impl FixedPriceOracle {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_price(&self, token: Address, price: U256) {
		self.prices.insert(token, price);
	}
}

#[async_trait]
impl PriceOracle for FixedPriceOracle {
	async fn token_price(&self, token: Address) -> Result<U256, StorageError> {
		self.prices
			.get(&token)
			.map(|price| *price)
			.ok_or(StorageError::UnknownToken)
	}
}

/// Balance book keyed by `(holder, token)`.
#[derive(Default)]
pub struct InMemoryLedger {
	balances: DashMap<(Address, Address), U256>,
	allowances: DashMap<(Address, Address, Address), U256>,
}

impl InMemoryLedger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Credits a holder out of thin air; test and genesis setup only.
	pub fn fund(&self, holder: Address, token: Address, amount: U256) {
		*self.balances.entry((holder, token)).or_insert(U256::ZERO) += amount;
	}
}

#[async_trait]
impl TokenLedger for InMemoryLedger {
	async fn balance(&self, holder: Address, token: Address) -> Result<U256, StorageError> {
		Ok(self
			.balances
			.get(&(holder, token))
			.map(|balance| *balance)
			.unwrap_or(U256::ZERO))
	}

	async fn transfer(
		&self,
		from: Address,
		token: Address,
		to: Address,
		amount: U256,
	) -> Result<(), StorageError> {
		{
			let mut from_balance = self.balances.entry((from, token)).or_insert(U256::ZERO);
			if *from_balance < amount {
				return Err(StorageError::InsufficientFunds {
					needed: amount,
					available: *from_balance,
				});
			}
			*from_balance -= amount;
		}
		*self.balances.entry((to, token)).or_insert(U256::ZERO) += amount;
		Ok(())
	}

	async fn approve(
		&self,
		owner: Address,
		token: Address,
		spender: Address,
		amount: U256,
	) -> Result<(), StorageError> {
		self.allowances.insert((owner, token, spender), amount);
		Ok(())
	}

	async fn allowance(
		&self,
		owner: Address,
		token: Address,
		spender: Address,
	) -> Result<U256, StorageError> {
		Ok(self
			.allowances
			.get(&(owner, token, spender))
			.map(|allowance| *allowance)
			.unwrap_or(U256::ZERO))
	}
}
