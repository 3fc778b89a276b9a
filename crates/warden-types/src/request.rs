//! Relayed requests and signature policies.

use serde::{Deserialize, Serialize};

use crate::common::{Address, Bytes, U256};

/// Per-action rule for whose signature must come first.
///
/// The policy is determined by the target module for each payload, never
/// by the relay engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignaturePolicy {
	/// The first signer must be the wallet owner.
	Required,
	/// The first signer may be the owner; any non-owner signer must be a
	/// guardian.
	Optional,
	/// No signature is needed; zero signatures are accepted.
	Anyone,
}

/// Signature requirement a module declares for a specific payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequirement {
	pub count: usize,
	pub policy: SignaturePolicy,
}

impl SignatureRequirement {
	pub fn new(count: usize, policy: SignaturePolicy) -> Self {
		Self { count, policy }
	}

	/// The common case: a single owner signature.
	pub fn owner() -> Self {
		Self::new(1, SignaturePolicy::Required)
	}

	/// No authorization at all.
	pub fn anyone() -> Self {
		Self::new(0, SignaturePolicy::Anyone)
	}
}

/// A pre-signed action submitted by a relayer on behalf of a wallet.
///
/// `data` is the ABI-encoded module call: a 4-byte selector followed by
/// the 32-byte wallet argument, which must match `wallet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest {
	pub wallet: Address,
	pub module: Address,
	pub data: Bytes,
	pub nonce: U256,
	/// Concatenated 65-byte secp256k1 signatures, sorted by signer.
	pub signatures: Bytes,
	pub gas_price: u64,
	pub gas_limit: u64,
	pub refund_token: Address,
	/// Zero means "pay the submitting relayer".
	pub refund_address: Address,
}
