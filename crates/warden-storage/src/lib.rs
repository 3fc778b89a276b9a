//! Storage collaborators for the warden system.
//!
//! The relay engine and modules consume these traits synchronously
//! within a call; the backends behind them decide where the data
//! actually lives. In-memory implementations suitable for tests and
//! single-process hosts are provided under [`implementations`].

use async_trait::async_trait;
use thiserror::Error;
use warden_types::{Address, WalletState, U256};

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur in a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
	/// The wallet is not known to the directory.
	#[error("unknown wallet")]
	UnknownWallet,
	/// No price is configured for the token.
	#[error("unknown token")]
	UnknownToken,
	/// A transfer was attempted beyond the held balance.
	#[error("insufficient funds: need {needed}, have {available}")]
	InsufficientFunds { needed: U256, available: U256 },
	/// Error that occurs in the storage backend.
	#[error("backend error: {0}")]
	Backend(String),
}

/// Read-only wallet directory: owner, lock flag and authorised modules.
#[async_trait]
pub trait WalletRegistry: Send + Sync {
	async fn owner(&self, wallet: Address) -> Result<Address, StorageError>;

	async fn is_locked(&self, wallet: Address) -> Result<bool, StorageError>;

	async fn is_authorised_module(
		&self,
		wallet: Address,
		module: Address,
	) -> Result<bool, StorageError>;
}

/// Read-only guardian set lookup.
#[async_trait]
pub trait GuardianStore: Send + Sync {
	async fn guardians(&self, wallet: Address) -> Result<Vec<Address>, StorageError>;

	async fn guardian_count(&self, wallet: Address) -> Result<usize, StorageError> {
		Ok(self.guardians(wallet).await?.len())
	}
}

/// Load/store of the explicit per-wallet state record.
///
/// A call loads the record once, works on a copy and stores it back only
/// on success, which is what makes every rejection atomic.
#[async_trait]
pub trait WalletStateStore: Send + Sync {
	async fn load(&self, wallet: Address) -> Result<WalletState, StorageError>;

	async fn store(&self, wallet: Address, state: WalletState) -> Result<(), StorageError>;
}

/// Token price lookup.
///
/// Prices are scaled such that `ether_value = amount * price / 10^18`;
/// for a token with `d` decimals and a whole-token price of `W` wei this
/// is `W * 10^18 / 10^d`.
#[async_trait]
pub trait PriceOracle: Send + Sync {
	async fn token_price(&self, token: Address) -> Result<U256, StorageError>;
}

/// Balance book for native and token value held by wallets.
#[async_trait]
pub trait TokenLedger: Send + Sync {
	async fn balance(&self, holder: Address, token: Address) -> Result<U256, StorageError>;

	async fn transfer(
		&self,
		from: Address,
		token: Address,
		to: Address,
		amount: U256,
	) -> Result<(), StorageError>;

	async fn approve(
		&self,
		owner: Address,
		token: Address,
		spender: Address,
		amount: U256,
	) -> Result<(), StorageError>;

	async fn allowance(
		&self,
		owner: Address,
		token: Address,
		spender: Address,
	) -> Result<U256, StorageError>;
}
