//! Employee record model.
//!
//! A record exists per address once the address has been registered. It is
//! never deleted: termination freezes accrual but keeps the record so the
//! employee can still withdraw pay earned before termination.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Opaque participant identity (employee, HR authority, or asset).
///
/// `Address::NULL` is never a valid employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize)]
#[serde(transparent)]
pub struct Address(pub u64);

impl Address {
    /// The null address.
    pub const NULL: Self = Address(0);

    /// Returns `true` for the null address.
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address(value)
    }
}

/// Currency an employee is paid in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Currency {
    /// Paid directly from the stable asset treasury.
    #[default]
    Stable,

    /// Paid in the native asset, bought through the exchange.
    Native,
}

impl Currency {
    /// The other currency.
    pub fn toggled(self) -> Self {
        match self {
            Currency::Stable => Currency::Native,
            Currency::Native => Currency::Stable,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Stable => write!(f, "stable"),
            Currency::Native => write!(f, "native"),
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stable" => Ok(Currency::Stable),
            "native" => Ok(Currency::Native),
            other => Err(format!("unknown currency '{}'", other)),
        }
    }
}

/// An employee's payroll state.
///
/// # Invariants
///
/// - `weekly_rate == 0` means the address was never registered
/// - `terminated_at.is_none()` means the employee is active
/// - when terminated, `terminated_at >= employed_since` and nothing accrues
///   past `terminated_at`
/// - `last_settled_at` never passes the effective end time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmployeeRecord {
    /// Salary per week in accounting units (18 decimal places).
    pub weekly_rate: u128,

    /// Time of the latest (re-)registration.
    pub employed_since: Timestamp,

    /// Time of termination, `None` while active.
    pub terminated_at: Option<Timestamp>,

    /// Accrual checkpoint: last settlement, or `employed_since`.
    pub last_settled_at: Timestamp,

    /// Payout currency for the next settlement.
    pub preferred_currency: Currency,
}

impl EmployeeRecord {
    /// Creates a fresh record starting at `now`, paid in the stable asset.
    pub fn new(weekly_rate: u128, now: Timestamp) -> Self {
        EmployeeRecord {
            weekly_rate,
            employed_since: now,
            terminated_at: None,
            last_settled_at: now,
            preferred_currency: Currency::Stable,
        }
    }

    /// Returns `true` if this record was ever registered.
    pub fn is_registered(&self) -> bool {
        self.weekly_rate != 0
    }

    /// Returns `true` if registered and not terminated.
    pub fn is_active(&self) -> bool {
        self.is_registered() && self.terminated_at.is_none()
    }

    /// Termination time as reported externally: 0 while active.
    pub fn terminated_at_or_zero(&self) -> Timestamp {
        self.terminated_at.unwrap_or(0)
    }

    /// Time accrual stops at: termination if terminated, else `now`.
    pub fn end_time(&self, now: Timestamp) -> Timestamp {
        self.terminated_at.unwrap_or(now)
    }

    /// Freezes accrual at `now`.
    ///
    /// Returns `false` if the record is absent or already terminated.
    pub fn terminate(&mut self, now: Timestamp) -> bool {
        if !self.is_active() {
            return false;
        }

        // Never before the last checkpoint.
        self.terminated_at = Some(now.max(self.last_settled_at));
        true
    }

    /// Moves the accrual checkpoint forward to `settled_at`.
    pub fn checkpoint(&mut self, settled_at: Timestamp) {
        if settled_at > self.last_settled_at {
            self.last_settled_at = settled_at;
        }
    }

    /// Verifies the record invariants.
    #[cfg(debug_assertions)]
    pub fn check_invariant(&self, now: Timestamp) -> bool {
        if !self.is_registered() {
            return true;
        }
        if self.last_settled_at < self.employed_since {
            return false;
        }
        match self.terminated_at {
            None => true,
            Some(at) => at >= self.employed_since && self.last_settled_at <= at,
        }
    }
}
