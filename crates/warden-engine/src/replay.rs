//! Dual replay protection: block-bounded incremental nonces for the
//! single-owner-signature path, consumed-hash tracking otherwise.

use warden_types::{CallEnv, RelayerState, SignaturePolicy, SignatureRequirement, B256, U256};

use crate::RelayError;

/// Scheme applied to a request, selected from its signature requirement.
///
/// An incremental nonce is cheap and naturally ordered, but only safe
/// when a single linear history exists, which is the lone-owner case.
/// Multi-signer and unsigned paths get consumed-hash tracking, allowing
/// unordered, concurrently-valid authorizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayScheme {
	Nonce,
	SignedHash,
}

impl ReplayScheme {
	pub fn for_requirement(requirement: &SignatureRequirement) -> Self {
		if requirement.count == 1 && requirement.policy == SignaturePolicy::Required {
			ReplayScheme::Nonce
		} else {
			ReplayScheme::SignedHash
		}
	}
}

/// Per-wallet uniqueness check for relayed requests.
#[derive(Debug, Clone, Copy)]
pub struct ReplayGuard {
	/// How far past the current block a nonce's block component may
	/// point. Keeps a relayer from sitting on a validly signed request
	/// indefinitely.
	block_bound: u64,
}

impl ReplayGuard {
	pub const DEFAULT_BLOCK_BOUND: u64 = 10_000;

	pub fn new(block_bound: u64) -> Self {
		Self { block_bound }
	}

	/// Consumes the request's uniqueness token or rejects it as a
	/// replay.
	///
	/// Nonces carry a block number in their high 128 bits and a
	/// free-form counter in the low 128; they must strictly increase
	/// per wallet.
	pub fn check_and_consume(
		&self,
		state: &mut RelayerState,
		env: &CallEnv,
		nonce: U256,
		signed_hash: B256,
		requirement: &SignatureRequirement,
	) -> Result<(), RelayError> {
		match ReplayScheme::for_requirement(requirement) {
			ReplayScheme::Nonce => {
				if nonce <= state.nonce {
					return Err(RelayError::DuplicateRequest);
				}
				if nonce >> 128 > U256::from(env.block_number + self.block_bound) {
					return Err(RelayError::NonceBlockOutOfBounds);
				}
				state.nonce = nonce;
				Ok(())
			}
			ReplayScheme::SignedHash => {
				if !state.used_hashes.insert(signed_hash) {
					return Err(RelayError::DuplicateRequest);
				}
				Ok(())
			}
		}
	}
}

impl Default for ReplayGuard {
	fn default() -> Self {
		Self::new(Self::DEFAULT_BLOCK_BOUND)
	}
}

/// Packs a block bound and counter into the nonce layout signers use.
pub fn bounded_nonce(block: u64, counter: u64) -> U256 {
	(U256::from(block) << 128) | U256::from(counter)
}

#[cfg(test)]
mod tests {
	use super::*;
	use warden_types::{Address, SignaturePolicy};

	fn env(block: u64) -> CallEnv {
		CallEnv::new(block, 0, Address::ZERO, 1_000_000)
	}

	fn owner_requirement() -> SignatureRequirement {
		SignatureRequirement::new(1, SignaturePolicy::Required)
	}

	#[test]
	fn test_scheme_selection() {
		assert_eq!(
			ReplayScheme::for_requirement(&owner_requirement()),
			ReplayScheme::Nonce
		);
		assert_eq!(
			ReplayScheme::for_requirement(&SignatureRequirement::new(
				2,
				SignaturePolicy::Required
			)),
			ReplayScheme::SignedHash
		);
		assert_eq!(
			ReplayScheme::for_requirement(&SignatureRequirement::anyone()),
			ReplayScheme::SignedHash
		);
		assert_eq!(
			ReplayScheme::for_requirement(&SignatureRequirement::new(
				1,
				SignaturePolicy::Optional
			)),
			ReplayScheme::SignedHash
		);
	}

	#[test]
	fn test_nonce_must_strictly_increase() {
		let guard = ReplayGuard::default();
		let mut state = RelayerState::default();
		let hash = B256::ZERO;

		guard
			.check_and_consume(
				&mut state,
				&env(100),
				bounded_nonce(100, 1),
				hash,
				&owner_requirement(),
			)
			.unwrap();

		// Equal and lower nonces are replays.
		for counter in [1, 0] {
			let err = guard
				.check_and_consume(
					&mut state,
					&env(100),
					bounded_nonce(100, counter),
					hash,
					&owner_requirement(),
				)
				.unwrap_err();
			assert!(matches!(err, RelayError::DuplicateRequest));
		}

		guard
			.check_and_consume(
				&mut state,
				&env(100),
				bounded_nonce(100, 2),
				hash,
				&owner_requirement(),
			)
			.unwrap();
	}

	#[test]
	fn test_nonce_block_bound_enforced() {
		let guard = ReplayGuard::new(10_000);
		let mut state = RelayerState::default();

		let err = guard
			.check_and_consume(
				&mut state,
				&env(100),
				bounded_nonce(10_101, 0),
				B256::ZERO,
				&owner_requirement(),
			)
			.unwrap_err();
		assert!(matches!(err, RelayError::NonceBlockOutOfBounds));
		// A rejected nonce is not consumed.
		assert_eq!(state.nonce, U256::ZERO);

		guard
			.check_and_consume(
				&mut state,
				&env(100),
				bounded_nonce(10_100, 0),
				B256::ZERO,
				&owner_requirement(),
			)
			.unwrap();
	}

	#[test]
	fn test_signed_hash_consumed_once() {
		let guard = ReplayGuard::default();
		let mut state = RelayerState::default();
		let requirement = SignatureRequirement::new(2, SignaturePolicy::Required);
		let hash = B256::repeat_byte(0x01);

		guard
			.check_and_consume(&mut state, &env(1), U256::ZERO, hash, &requirement)
			.unwrap();
		let err = guard
			.check_and_consume(&mut state, &env(1), U256::ZERO, hash, &requirement)
			.unwrap_err();
		assert!(matches!(err, RelayError::DuplicateRequest));

		// Other hashes stay independently valid; ordering is not assumed.
		guard
			.check_and_consume(
				&mut state,
				&env(1),
				U256::ZERO,
				B256::repeat_byte(0x02),
				&requirement,
			)
			.unwrap();
	}
}
