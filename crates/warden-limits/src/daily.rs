//! Rolling-window spend accounting with delayed limit changes.

use warden_types::{Timestamp, WalletState, LIMIT_DISABLED};

use crate::LimitsParams;

/// Tracks spending against a wallet's daily ceiling.
///
/// Limit changes are deferred by the security period, so a compromised
/// signing key cannot raise the cap and drain funds in one step.
#[derive(Debug, Clone, Copy)]
pub struct DailyLimitTracker {
	params: LimitsParams,
}

impl DailyLimitTracker {
	pub fn new(params: LimitsParams) -> Self {
		Self { params }
	}

	/// Stages a new limit that becomes effective after the security
	/// period. Overwrites any previously staged change, promoting it
	/// first if its delay already elapsed. Returns the activation time.
	pub fn change_limit(
		&self,
		state: &mut WalletState,
		now: Timestamp,
		target: u128,
	) -> Timestamp {
		let change_after = now + self.params.security_period;
		state.limit.current = state.limit.effective(now);
		state.limit.pending = target;
		state.limit.change_after = change_after;
		change_after
	}

	/// Stages the sentinel that turns the limit off entirely.
	pub fn disable_limit(&self, state: &mut WalletState, now: Timestamp) -> Timestamp {
		self.change_limit(state, now, LIMIT_DISABLED)
	}

	/// Effective limit at `now`.
	pub fn current_limit(&self, state: &WalletState, now: Timestamp) -> u128 {
		state.limit.effective(now)
	}

	/// Remaining allowance in the current window.
	pub fn unspent(&self, state: &WalletState, now: Timestamp) -> u128 {
		let limit = state.limit.effective(now);
		if limit == LIMIT_DISABLED {
			return LIMIT_DISABLED;
		}
		if now >= state.daily.period_end {
			limit
		} else {
			limit.saturating_sub(state.daily.already_spent)
		}
	}

	/// Debits `amount` against the window if it fits.
	///
	/// A zero amount or a disabled limit always passes without touching
	/// state. A refusal leaves the window untouched; callers route the
	/// action through the pending-transfer path instead.
	pub fn check_and_update(&self, state: &mut WalletState, now: Timestamp, amount: u128) -> bool {
		if amount == 0 {
			return true;
		}
		let limit = state.limit.effective(now);
		if limit == LIMIT_DISABLED {
			return true;
		}
		if state.daily.period_end <= now {
			if amount <= limit {
				state.daily.already_spent = amount;
				state.daily.period_end = now + self.params.limit_period;
				return true;
			}
			return false;
		}
		match state.daily.already_spent.checked_add(amount) {
			Some(total) if total <= limit => {
				state.daily.already_spent = total;
				true
			}
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tracker() -> DailyLimitTracker {
		DailyLimitTracker::new(LimitsParams {
			security_period: 100,
			security_window: 100,
			limit_period: 86_400,
		})
	}

	#[test]
	fn test_limit_change_is_delayed() {
		let tracker = tracker();
		let mut state = WalletState::new(1_000);

		let change_after = tracker.change_limit(&mut state, 50, 5_000);
		assert_eq!(change_after, 150);

		// The old ceiling holds through the whole delay.
		assert_eq!(tracker.current_limit(&state, 50), 1_000);
		assert_eq!(tracker.current_limit(&state, 150), 1_000);
		assert_eq!(tracker.current_limit(&state, 151), 5_000);
	}

	#[test]
	fn test_restaging_promotes_an_effective_change() {
		let tracker = tracker();
		let mut state = WalletState::new(1_000);

		tracker.change_limit(&mut state, 0, 5_000);
		// The first change became effective; staging another must not
		// resurrect the original 1_000.
		tracker.change_limit(&mut state, 200, 7_000);
		assert_eq!(tracker.current_limit(&state, 250), 5_000);
		assert_eq!(tracker.current_limit(&state, 301), 7_000);
	}

	#[test]
	fn test_spend_accumulates_within_a_window() {
		let tracker = tracker();
		let mut state = WalletState::new(1_000);

		assert!(tracker.check_and_update(&mut state, 10, 600));
		assert!(tracker.check_and_update(&mut state, 20, 400));
		assert_eq!(tracker.unspent(&state, 30), 0);
		assert!(!tracker.check_and_update(&mut state, 30, 1));

		// The refused debit left the window untouched.
		assert_eq!(state.daily.already_spent, 1_000);
	}

	#[test]
	fn test_windows_roll_over_independently() {
		let tracker = tracker();
		let mut state = WalletState::new(1_000);

		assert!(tracker.check_and_update(&mut state, 10, 900));
		let period_end = state.daily.period_end;

		// Both spends individually fit; across windows the total may
		// exceed a single window's limit.
		assert!(tracker.check_and_update(&mut state, period_end, 900));
		assert_eq!(state.daily.already_spent, 900);
		assert_eq!(state.daily.period_end, period_end + 86_400);
	}

	#[test]
	fn test_disabled_limit_allows_everything() {
		let tracker = tracker();
		let mut state = WalletState::new(1_000);

		tracker.disable_limit(&mut state, 0);
		assert!(!tracker.check_and_update(&mut state, 50, 2_000));
		// Effective only after the delay.
		assert!(tracker.check_and_update(&mut state, 101, u128::MAX - 1));
		assert_eq!(tracker.unspent(&state, 101), LIMIT_DISABLED);
	}

	#[test]
	fn test_zero_amount_never_touches_state() {
		let tracker = tracker();
		let mut state = WalletState::new(1_000);

		assert!(tracker.check_and_update(&mut state, 10, 0));
		assert_eq!(state.daily.already_spent, 0);
		assert_eq!(state.daily.period_end, 0);
	}
}
