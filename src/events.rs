//! Events emitted by successful operations.

use crate::decimal::{format_units, ACCOUNTING_DECIMALS, NATIVE_DECIMALS, STABLE_DECIMALS};
use crate::employee::{Address, Currency};
use std::fmt;

/// A state change observable by callers.
///
/// Events are only recorded for operations that complete; a failed
/// operation emits nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayrollEvent {
    /// Employee (re-)registered at `weekly_rate` accounting units.
    EmployeeRegistered { employee: Address, weekly_rate: u128 },

    /// Employee terminated; accrual frozen.
    EmployeeTerminated { employee: Address },

    /// Accrued pay settled. `amount` is in the paid currency's precision.
    Withdrawal {
        employee: Address,
        currency: Currency,
        amount: u128,
    },

    /// Preferred payout currency changed.
    CurrencySwitched {
        employee: Address,
        currency: Currency,
    },

    /// Circuit breaker engaged.
    Paused,

    /// Circuit breaker released.
    Unpaused,
}

impl PayrollEvent {
    /// Short event name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            PayrollEvent::EmployeeRegistered { .. } => "registered",
            PayrollEvent::EmployeeTerminated { .. } => "terminated",
            PayrollEvent::Withdrawal { .. } => "withdrawal",
            PayrollEvent::CurrencySwitched { .. } => "currency_switched",
            PayrollEvent::Paused => "paused",
            PayrollEvent::Unpaused => "unpaused",
        }
    }

    /// Employee the event concerns, if any.
    pub fn employee(&self) -> Option<Address> {
        match self {
            PayrollEvent::EmployeeRegistered { employee, .. }
            | PayrollEvent::EmployeeTerminated { employee }
            | PayrollEvent::Withdrawal { employee, .. }
            | PayrollEvent::CurrencySwitched { employee, .. } => Some(*employee),
            PayrollEvent::Paused | PayrollEvent::Unpaused => None,
        }
    }

    /// `(currency, human-readable amount)` columns for reports.
    pub fn detail(&self) -> (String, String) {
        match self {
            PayrollEvent::EmployeeRegistered { weekly_rate, .. } => (
                "accounting".to_string(),
                format_units(*weekly_rate, ACCOUNTING_DECIMALS),
            ),
            PayrollEvent::Withdrawal {
                currency, amount, ..
            } => {
                let decimals = match currency {
                    Currency::Stable => STABLE_DECIMALS,
                    Currency::Native => NATIVE_DECIMALS,
                };
                (currency.to_string(), format_units(*amount, decimals))
            }
            PayrollEvent::CurrencySwitched { currency, .. } => {
                (currency.to_string(), String::new())
            }
            _ => (String::new(), String::new()),
        }
    }
}

impl fmt::Display for PayrollEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (currency, amount) = self.detail();
        write!(f, "{}", self.name())?;
        if let Some(employee) = self.employee() {
            write!(f, " employee={}", employee)?;
        }
        if !currency.is_empty() {
            write!(f, " currency={}", currency)?;
        }
        if !amount.is_empty() {
            write!(f, " amount={}", amount)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdrawal_detail_uses_currency_precision() {
        let stable = PayrollEvent::Withdrawal {
            employee: Address(7),
            currency: Currency::Stable,
            amount: 285_714_286,
        };
        assert_eq!(
            stable.detail(),
            ("stable".to_string(), "285.714286".to_string())
        );

        let native = PayrollEvent::Withdrawal {
            employee: Address(7),
            currency: Currency::Native,
            amount: 142_857_143_000_000_000,
        };
        assert_eq!(native.detail().1, "0.142857143");
    }

    #[test]
    fn test_display() {
        let event = PayrollEvent::EmployeeRegistered {
            employee: Address(7),
            weekly_rate: 1000 * 10u128.pow(18),
        };
        assert_eq!(
            event.to_string(),
            "registered employee=7 currency=accounting amount=1000"
        );
        assert_eq!(PayrollEvent::Paused.to_string(), "paused");
        assert_eq!(PayrollEvent::Paused.employee(), None);
    }
}
