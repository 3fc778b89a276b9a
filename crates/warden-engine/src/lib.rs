//! Meta-transaction relay engine: signature authorization, replay
//! protection and relayer gas refunds.
//!
//! A relayer submits a pre-signed [`RelayRequest`]; the engine verifies
//! the signer quorum against the policy declared by the target module,
//! consumes the request's uniqueness token, executes the action and
//! reimburses the relayer. Every rejection is atomic: nothing is
//! persisted for a failed call.
//!
//! [`RelayRequest`]: warden_types::RelayRequest

use thiserror::Error;
use warden_storage::StorageError;
use warden_types::ModuleError;

pub mod executor;
pub mod refund;
pub mod replay;
pub mod signature;

pub use executor::{EngineBuilder, RelayEngine, RelayOutcome};
pub use refund::GasRefundAccountant;
pub use replay::{ReplayGuard, ReplayScheme};

/// Errors terminating a relayed submission.
#[derive(Debug, Error)]
pub enum RelayError {
	#[error("not enough gas provided")]
	InsufficientGas,
	#[error("wallet mismatch between request and payload")]
	WalletMismatch,
	#[error("unknown target module")]
	UnknownModule,
	#[error("module not authorised for this wallet")]
	ModuleNotAuthorised,
	#[error("invalid signature requirement")]
	InvalidRequirement,
	#[error("invalid signature blob length")]
	SignatureLength,
	#[error("duplicate request")]
	DuplicateRequest,
	#[error("nonce block bound exceeded")]
	NonceBlockOutOfBounds,
	#[error("invalid signatures")]
	InvalidSignatures,
	#[error("refund exceeds the daily allowance")]
	RefundOverLimit,
	#[error("refund conversion failed")]
	RefundConversion,
	#[error("classification failed: {0}")]
	Classification(ModuleError),
	#[error("engine configuration error: {0}")]
	Config(String),
	#[error(transparent)]
	Storage(#[from] StorageError),
}
