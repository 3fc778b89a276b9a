//! Relayer gas reimbursement in the wallet's chosen refund token.

use std::sync::Arc;

use warden_limits::DailyLimitTracker;
use warden_storage::{PriceOracle, TokenLedger};
use warden_types::{
	CallEnv, EventBus, RelayRequest, SignaturePolicy, SignatureRequirement, WalletEvent,
	WalletState, ETH_TOKEN, ONE_ETHER, U256,
};

use crate::RelayError;

/// Default fixed cost of the refund path itself, which cannot meter
/// itself.
pub const DEFAULT_REFUND_BASE_GAS: u64 = 30_000;

/// Default additional cost of the limit-accounting path.
pub const DEFAULT_REFUND_LIMIT_GAS: u64 = 10_000;

/// Computes and pays the relayer's reimbursement.
///
/// Refunds are only issued for owner-approved actions, so a guardian- or
/// anyone-initiated action can never drain wallet funds through refunds.
/// Guardian co-signed actions are exempt from the daily-limit check on
/// their refund.
pub struct GasRefundAccountant {
	oracle: Arc<dyn PriceOracle>,
	ledger: Arc<dyn TokenLedger>,
	daily: DailyLimitTracker,
	events: EventBus,
	base_gas: u64,
	limit_gas: u64,
}

impl GasRefundAccountant {
	pub fn new(
		oracle: Arc<dyn PriceOracle>,
		ledger: Arc<dyn TokenLedger>,
		daily: DailyLimitTracker,
		events: EventBus,
		base_gas: u64,
		limit_gas: u64,
	) -> Self {
		Self {
			oracle,
			ledger,
			daily,
			events,
			base_gas,
			limit_gas,
		}
	}

	/// Settles the refund for a completed relayed call.
	///
	/// An error here fails the whole relay; the caller discards the
	/// working state record, so nothing of the call survives.
	pub async fn settle(
		&self,
		env: &CallEnv,
		request: &RelayRequest,
		requirement: &SignatureRequirement,
		state: &mut WalletState,
	) -> Result<(), RelayError> {
		if request.gas_price == 0 || requirement.policy != SignaturePolicy::Required {
			return Ok(());
		}

		let mut consumed = env.gas.used() + self.base_gas;
		if requirement.count == 1 {
			consumed += self.limit_gas;
			let refund_wei =
				u128::from(consumed.min(request.gas_limit)) * u128::from(request.gas_price);
			if !self.daily.check_and_update(state, env.timestamp, refund_wei) {
				return Err(RelayError::RefundOverLimit);
			}
			self.pay(env, request, refund_wei).await
		} else {
			let refund_wei =
				u128::from(consumed.min(request.gas_limit)) * u128::from(request.gas_price);
			self.pay(env, request, refund_wei).await
		}
	}

	async fn pay(
		&self,
		env: &CallEnv,
		request: &RelayRequest,
		refund_wei: u128,
	) -> Result<(), RelayError> {
		let amount = if request.refund_token == ETH_TOKEN {
			U256::from(refund_wei)
		} else {
			let price = self.oracle.token_price(request.refund_token).await?;
			U256::from(refund_wei)
				.checked_mul(U256::from(ONE_ETHER))
				.and_then(|scaled| scaled.checked_div(price))
				.ok_or(RelayError::RefundConversion)?
		};
		let refund_address = if request.refund_address.is_zero() {
			env.relayer
		} else {
			request.refund_address
		};

		self.ledger
			.transfer(request.wallet, request.refund_token, refund_address, amount)
			.await?;
		self.events
			.publish(WalletEvent::Refund {
				wallet: request.wallet,
				refund_address,
				refund_token: request.refund_token,
				refund_amount: amount,
			})
			.ok();
		Ok(())
	}
}
