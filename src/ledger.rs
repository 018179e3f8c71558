//! Employee ledger: records, lifecycle, and the active-employee count.
//!
//! # Invariants
//!
//! - `active_count` equals the number of records that are registered and
//!   not terminated; only `register` (+1) and `terminate` (-1) change it
//! - records are never removed; re-registration overwrites

use crate::employee::{Address, EmployeeRecord, Timestamp};
use crate::error::{EngineError, Result};
use crate::events::PayrollEvent;
use log::debug;
use std::collections::HashMap;

/// Employee records keyed by address.
#[derive(Debug, Clone)]
pub struct EmployeeLedger {
    /// The only principal allowed to register and terminate.
    hr_authority: Address,

    /// One record per address ever registered.
    records: HashMap<Address, EmployeeRecord>,

    /// Registered, non-terminated employees.
    active_count: u64,
}

impl EmployeeLedger {
    /// Creates an empty ledger administered by `hr_authority`.
    pub fn new(hr_authority: Address) -> Self {
        EmployeeLedger {
            hr_authority,
            records: HashMap::new(),
            active_count: 0,
        }
    }

    /// Fails with `Unauthorized` unless `caller` is the HR authority.
    pub fn ensure_hr(&self, caller: Address) -> Result<()> {
        if caller != self.hr_authority {
            return Err(EngineError::Unauthorized { caller });
        }
        Ok(())
    }

    /// Registers `employee` at `weekly_rate` accounting units per week.
    ///
    /// A previously terminated employee gets a completely fresh record:
    /// new employment start, new checkpoint, stable currency.
    pub fn register(
        &mut self,
        caller: Address,
        employee: Address,
        weekly_rate: u128,
        now: Timestamp,
    ) -> Result<PayrollEvent> {
        self.ensure_hr(caller)?;
        if employee.is_null() {
            return Err(EngineError::InvalidEmployee);
        }
        if weekly_rate == 0 {
            return Err(EngineError::InvalidRate);
        }
        if self.record(employee).is_active() {
            return Err(EngineError::AlreadyRegistered { employee });
        }

        self.records
            .insert(employee, EmployeeRecord::new(weekly_rate, now));
        self.active_count += 1;

        debug!(
            "Registered employee {} at weekly rate {} from {}",
            employee, weekly_rate, now
        );
        Ok(PayrollEvent::EmployeeRegistered {
            employee,
            weekly_rate,
        })
    }

    /// Terminates `employee` at `now`. Accrual stops; the record stays.
    pub fn terminate(
        &mut self,
        caller: Address,
        employee: Address,
        now: Timestamp,
    ) -> Result<PayrollEvent> {
        self.ensure_hr(caller)?;

        let record = self
            .records
            .get_mut(&employee)
            .ok_or(EngineError::NotRegistered { employee })?;
        if !record.terminate(now) {
            return Err(EngineError::NotRegistered { employee });
        }
        self.active_count -= 1;

        debug!(
            "Terminated employee {} at {}",
            employee,
            record.terminated_at_or_zero()
        );
        Ok(PayrollEvent::EmployeeTerminated { employee })
    }

    /// `(weekly_rate, employed_since, terminated_at)`; all zero when absent.
    pub fn info(&self, employee: Address) -> (u128, Timestamp, Timestamp) {
        let record = self.record(employee);
        (
            record.weekly_rate,
            record.employed_since,
            record.terminated_at_or_zero(),
        )
    }

    /// Number of registered, non-terminated employees.
    pub fn active_count(&self) -> u64 {
        self.active_count
    }

    /// Copy of the record for `employee`; the zero record when absent.
    pub fn record(&self, employee: Address) -> EmployeeRecord {
        self.records.get(&employee).copied().unwrap_or_default()
    }

    /// Overwrites an existing record. Used by settlement to checkpoint and
    /// to roll back; it never creates records or touches the active count.
    pub(crate) fn replace(&mut self, employee: Address, record: EmployeeRecord) {
        if let Some(slot) = self.records.get_mut(&employee) {
            *slot = record;
        }
    }

    /// All records, sorted by address.
    pub fn records(&self) -> Vec<(Address, EmployeeRecord)> {
        let mut records: Vec<_> = self.records.iter().map(|(a, r)| (*a, *r)).collect();
        records.sort_by_key(|(address, _)| *address);
        records
    }

    /// Verifies that `active_count` matches the records.
    #[cfg(debug_assertions)]
    pub fn check_invariant(&self) -> bool {
        let active = self.records.values().filter(|r| r.is_active()).count() as u64;
        active == self.active_count
    }
}
