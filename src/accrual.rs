//! Pro-rata salary accrual.

use crate::employee::{EmployeeRecord, Timestamp};

/// Length of the pay period the weekly rate is quoted over.
pub const SECONDS_PER_WEEK: u64 = 7 * 24 * 60 * 60;

/// Pay earned but not yet settled, in accounting units, together with the
/// time the amount was computed up to.
///
/// Settling must advance the checkpoint to exactly `settled_until`, never to
/// the wall clock: for a terminated employee the two differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accrual {
    pub amount: u128,
    pub settled_until: Timestamp,
}

/// Amount owed to `record` at `now`, in accounting units.
///
/// Zero for an absent record, and zero when the effective end time is not
/// past the checkpoint (clock skew or an already settled period).
///
/// # Examples
///
/// ```
/// use payroll_engine::accrual::accrued;
/// use payroll_engine::employee::EmployeeRecord;
///
/// let rate = 1000 * 10u128.pow(18);
/// let record = EmployeeRecord::new(rate, 0);
/// assert_eq!(accrued(&record, 2 * 86_400), 285_714_285_714_285_714_285);
/// ```
pub fn accrued(record: &EmployeeRecord, now: Timestamp) -> u128 {
    quote(record, now).amount
}

/// Like [`accrued`], also returning the checkpoint the amount runs up to.
pub fn quote(record: &EmployeeRecord, now: Timestamp) -> Accrual {
    if !record.is_registered() {
        return Accrual {
            amount: 0,
            settled_until: record.last_settled_at,
        };
    }

    let end_time = record.end_time(now);
    if end_time <= record.last_settled_at {
        return Accrual {
            amount: 0,
            settled_until: record.last_settled_at,
        };
    }

    let elapsed = u128::from(end_time - record.last_settled_at);
    Accrual {
        amount: pro_rata(record.weekly_rate, elapsed),
        settled_until: end_time,
    }
}

/// `floor(weekly_rate * elapsed / SECONDS_PER_WEEK)`.
///
/// Split into whole weeks of rate and the remainder so the product stays in
/// range for any realistic rate and duration.
fn pro_rata(weekly_rate: u128, elapsed: u128) -> u128 {
    let week = u128::from(SECONDS_PER_WEEK);
    let whole = (weekly_rate / week).saturating_mul(elapsed);
    let partial = (weekly_rate % week) * elapsed / week;
    whole.saturating_add(partial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ONE: u128 = 1_000_000_000_000_000_000;
    const DAY: u64 = 86_400;

    #[test]
    fn test_absent_record_accrues_nothing() {
        let record = EmployeeRecord::default();
        assert_eq!(accrued(&record, 1_000_000), 0);
    }

    #[test]
    fn test_two_days_at_thousand_per_week() {
        let record = EmployeeRecord::new(1000 * ONE, 10_000);
        let quote = quote(&record, 10_000 + 2 * DAY);
        assert_eq!(quote.amount, 285_714_285_714_285_714_285);
        assert_eq!(quote.settled_until, 10_000 + 2 * DAY);
    }

    #[test]
    fn test_full_week_pays_full_rate() {
        let record = EmployeeRecord::new(1000 * ONE, 0);
        assert_eq!(accrued(&record, SECONDS_PER_WEEK), 1000 * ONE);
    }

    #[test]
    fn test_clock_behind_checkpoint_accrues_nothing() {
        let record = EmployeeRecord::new(1000 * ONE, 10_000);
        let quote = quote(&record, 9_000);
        assert_eq!(quote.amount, 0);
        assert_eq!(quote.settled_until, 10_000);
    }

    #[test]
    fn test_termination_caps_accrual() {
        let mut record = EmployeeRecord::new(1000 * ONE, 0);
        record.terminate(DAY);

        let at_termination = accrued(&record, DAY);
        assert_eq!(accrued(&record, 30 * DAY), at_termination);
        assert_eq!(quote(&record, 30 * DAY).settled_until, DAY);
    }

    #[test]
    fn test_each_settlement_truncates_independently() {
        // A single second is worth less than one unit at this rate.
        let mut record = EmployeeRecord::new(SECONDS_PER_WEEK as u128 - 1, 0);
        let first = quote(&record, 1);
        assert_eq!(first.amount, 0);

        // Checkpoint at the quoted time, then the rest of the week.
        record.checkpoint(first.settled_until);
        let rest = accrued(&record, SECONDS_PER_WEEK);
        assert_eq!(first.amount + rest, SECONDS_PER_WEEK as u128 - 2);
    }

    #[test]
    fn test_pro_rata_matches_direct_formula() {
        let rate = 1234 * ONE + 5678;
        let elapsed = 3 * DAY as u128 + 17;
        let direct = rate * elapsed / SECONDS_PER_WEEK as u128;
        assert_eq!(pro_rata(rate, elapsed), direct);
    }

    proptest! {
        #[test]
        fn accrual_is_monotonic_in_time(
            rate in 1u128..(1_000_000 * ONE),
            start in 0u64..1_000_000,
            a in 0u64..(10 * SECONDS_PER_WEEK),
            b in 0u64..(10 * SECONDS_PER_WEEK),
        ) {
            let record = EmployeeRecord::new(rate, start);
            let (early, late) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(accrued(&record, start + early) <= accrued(&record, start + late));
        }

        #[test]
        fn pro_rata_is_exact(rate in 1u128..(1_000_000_000 * ONE), elapsed in 0u128..(520 * 604_800)) {
            prop_assert_eq!(pro_rata(rate, elapsed), rate * elapsed / 604_800);
        }
    }
}
