//! Quorum signature validation against an ordered, duplicate-free
//! signer requirement.

use alloy_primitives::PrimitiveSignature;
use warden_types::{Address, SignaturePolicy, B256};

use crate::RelayError;

/// Length of one encoded secp256k1 signature (r || s || v).
pub const SIGNATURE_LEN: usize = 65;

/// Validates a concatenated signature blob over `signed_hash`.
///
/// Recovered addresses must be strictly increasing from the second
/// signature onward, which enforces both sortedness and the absence of
/// duplicate signers; the first signer sets the ordering baseline.
/// Under `Required` the first signer must be the owner; under
/// `Optional` an owner first signer is accepted and skipped from the
/// guardian check. Every other signer must be a current guardian.
pub fn validate_signatures(
	signed_hash: B256,
	signatures: &[u8],
	owner: Address,
	guardians: &[Address],
	policy: SignaturePolicy,
) -> Result<(), RelayError> {
	if signatures.len() % SIGNATURE_LEN != 0 {
		return Err(RelayError::InvalidSignatures);
	}
	if signatures.is_empty() {
		return match policy {
			SignaturePolicy::Anyone => Ok(()),
			_ => Err(RelayError::InvalidSignatures),
		};
	}

	let mut previous: Option<Address> = None;
	for (index, encoded) in signatures.chunks(SIGNATURE_LEN).enumerate() {
		let signature =
			PrimitiveSignature::try_from(encoded).map_err(|_| RelayError::InvalidSignatures)?;
		let signer = signature
			.recover_address_from_prehash(&signed_hash)
			.map_err(|_| RelayError::InvalidSignatures)?;

		if previous.is_some_and(|last| signer <= last) {
			return Err(RelayError::InvalidSignatures);
		}
		previous = Some(signer);

		if index == 0 {
			match policy {
				SignaturePolicy::Required if signer != owner => {
					return Err(RelayError::InvalidSignatures)
				}
				SignaturePolicy::Required => continue,
				SignaturePolicy::Optional if signer == owner => continue,
				_ => {}
			}
		}
		if !guardians.contains(&signer) {
			return Err(RelayError::InvalidSignatures);
		}
	}
	Ok(())
}
