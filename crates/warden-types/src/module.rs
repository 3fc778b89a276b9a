//! The module collaborator interface invoked through the relay engine.

use async_trait::async_trait;
use thiserror::Error;

use crate::common::{Address, Bytes, CallEnv};
use crate::request::SignatureRequirement;
use crate::state::WalletState;

/// Errors surfaced by a wallet module.
#[derive(Debug, Error)]
pub enum ModuleError {
	/// The payload could not be decoded into a known operation.
	#[error("undecodable module payload: {0}")]
	Decode(String),
	/// The operation itself failed.
	#[error("{0}")]
	Execution(String),
	/// A storage collaborator failed.
	#[error("storage error: {0}")]
	Storage(String),
}

/// A contract-like module that executes actions with the wallet's
/// authority.
///
/// Modules never act independently: the relay engine authenticates the
/// request first and hands the module the wallet's in-flight state
/// record.
#[async_trait]
pub trait WalletModule: Send + Sync {
	/// Classifies a payload: how many signatures are needed and under
	/// which policy. A pure read with no side effects.
	async fn required_signatures(
		&self,
		wallet: Address,
		data: &[u8],
	) -> Result<SignatureRequirement, ModuleError>;

	/// Executes the payload against the in-flight state record.
	async fn invoke(
		&self,
		env: &CallEnv,
		wallet: Address,
		state: &mut WalletState,
		data: &[u8],
	) -> Result<Bytes, ModuleError>;
}
