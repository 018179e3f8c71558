//! Core payroll settlement engine.
//!
//! Owns the employee ledger and the circuit breaker, and drives every
//! withdrawal-class operation through the same sequence:
//!
//! 1. guard: take the settlement lock, check the caller has a record, check
//!    the breaker
//! 2. quote: compute what is owed at `now`
//! 3. checkpoint: advance `last_settled_at` before any funds move
//! 4. payout: transfer stable directly, or price through the oracle and buy
//!    native through the exchange
//! 5. emit the withdrawal event
//!
//! Operations run as serialized transactions. Every state-changing
//! operation holds the settlement lock for its whole duration: calls from
//! other threads wait their turn, while a collaborator calling back into the
//! engine mid-payout fails with `ReentrantCall`. Even without the lock it
//! would find nothing owed because the checkpoint has already moved.
//! Read-only queries never take the lock.
//!
//! A failed operation restores the record it checkpointed and emits no
//! events. Effects already performed by collaborators (a completed swap
//! before a rejected transfer) are theirs to revert.

use crate::accrual;
use crate::breaker::CircuitBreaker;
use crate::config::EngineConfig;
use crate::decimal::{
    mul_div, pow10, rescale, ACCOUNTING_DECIMALS, NATIVE_DECIMALS, STABLE_DECIMALS,
};
use crate::employee::{Address, Currency, EmployeeRecord, Timestamp};
use crate::error::{EngineError, Result};
use crate::events::PayrollEvent;
use crate::exchange::{ExchangeAdapter, SwapRoute};
use crate::external::{NativeTransfer, NativeUnwrapper, PriceFeed, StableToken, SwapRouter};
use crate::ledger::EmployeeLedger;
use crate::oracle::PriceOracle;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// Handles to every external collaborator the engine pays through.
#[derive(Clone)]
pub struct Collaborators {
    pub stable: Arc<dyn StableToken>,
    pub native: Arc<dyn NativeTransfer>,
    pub feed: Arc<dyn PriceFeed>,
    pub router: Arc<dyn SwapRouter>,
    pub unwrapper: Arc<dyn NativeUnwrapper>,
}

/// Outcome of a completed settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Currency the employee was paid in.
    pub currency: Currency,

    /// Amount paid, in that currency's precision.
    pub amount: u128,

    /// Amount owed, in accounting units.
    pub owed: u128,

    /// New accrual checkpoint.
    pub settled_until: Timestamp,
}

/// Serializes state-changing operations.
///
/// Callers on other threads wait for their turn. A call from the thread that
/// is already inside an operation (a collaborator calling back mid-payout)
/// fails with `ReentrantCall` instead of deadlocking.
struct OperationGate {
    turn: Mutex<()>,

    /// Thread currently inside an operation.
    owner: Mutex<Option<ThreadId>>,
}

impl OperationGate {
    fn new() -> Self {
        OperationGate {
            turn: Mutex::new(()),
            owner: Mutex::new(None),
        }
    }

    fn enter(&self) -> Result<SettlementLock<'_>> {
        let current = thread::current().id();
        if *self.owner() == Some(current) {
            return Err(EngineError::ReentrantCall);
        }

        let turn = self.turn.lock().unwrap_or_else(PoisonError::into_inner);
        *self.owner() = Some(current);
        Ok(SettlementLock { gate: self, _turn: turn })
    }

    fn owner(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped ownership of the operation gate. Released on drop, so every exit
/// path (including `?`) frees it.
struct SettlementLock<'a> {
    gate: &'a OperationGate,
    _turn: MutexGuard<'a, ()>,
}

impl Drop for SettlementLock<'_> {
    fn drop(&mut self) {
        // Cleared before `_turn` is released, so the next owner never sees a
        // stale id.
        *self.gate.owner() = None;
    }
}

/// The payroll engine.
///
/// Shareable across threads (`&self` methods); concurrent state-changing
/// calls run one after another. Wrap in an `Arc` to hand a reference to
/// collaborators.
pub struct PayrollEngine {
    config: EngineConfig,

    ledger: Mutex<EmployeeLedger>,

    breaker: CircuitBreaker,

    /// Single-writer settlement lock.
    gate: OperationGate,

    /// Events of completed operations, in emission order.
    journal: Mutex<Vec<PayrollEvent>>,

    stable: Arc<dyn StableToken>,
    native: Arc<dyn NativeTransfer>,
    oracle: PriceOracle,
    exchange: ExchangeAdapter,
    unwrapper: Arc<dyn NativeUnwrapper>,
}

impl PayrollEngine {
    /// Creates an engine with an empty ledger and an open breaker.
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        let route = SwapRoute {
            input_asset: config.stable_asset,
            output_asset: config.wrapped_native_asset,
            fee: config.pool_fee,
            recipient: config.treasury,
        };

        PayrollEngine {
            ledger: Mutex::new(EmployeeLedger::new(config.hr_authority)),
            breaker: CircuitBreaker::new(),
            gate: OperationGate::new(),
            journal: Mutex::new(Vec::new()),
            stable: collaborators.stable,
            native: collaborators.native,
            oracle: PriceOracle::new(collaborators.feed),
            exchange: ExchangeAdapter::new(collaborators.router, route),
            unwrapper: collaborators.unwrapper,
            config,
        }
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // HR operations
    // ---------------------------------------------------------------------

    /// Registers `employee` at `weekly_rate` accounting units per week.
    pub fn register(
        &self,
        caller: Address,
        employee: Address,
        weekly_rate: u128,
        now: Timestamp,
    ) -> Result<()> {
        let _lock = self.gate.enter()?;
        let event = self.ledger().register(caller, employee, weekly_rate, now)?;
        self.commit(vec![event]);
        Ok(())
    }

    /// Terminates `employee` at `now`.
    pub fn terminate(&self, caller: Address, employee: Address, now: Timestamp) -> Result<()> {
        let _lock = self.gate.enter()?;
        let event = self.ledger().terminate(caller, employee, now)?;
        self.commit(vec![event]);
        Ok(())
    }

    /// Engages the circuit breaker. No-op if already paused.
    pub fn pause(&self, caller: Address) -> Result<()> {
        let _lock = self.gate.enter()?;
        self.ledger().ensure_hr(caller)?;
        if self.breaker.engage() {
            self.commit(vec![PayrollEvent::Paused]);
        }
        Ok(())
    }

    /// Releases the circuit breaker. No-op if not paused.
    pub fn unpause(&self, caller: Address) -> Result<()> {
        let _lock = self.gate.enter()?;
        self.ledger().ensure_hr(caller)?;
        if self.breaker.release() {
            self.commit(vec![PayrollEvent::Unpaused]);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Employee operations
    // ---------------------------------------------------------------------

    /// Pays `caller` everything accrued up to `now` in their preferred
    /// currency.
    ///
    /// Terminated employees may still withdraw pay accrued before their
    /// termination. Fails with `NothingToWithdraw` if nothing is owed.
    pub fn withdraw(&self, caller: Address, now: Timestamp) -> Result<Settlement> {
        let _lock = self.gate.enter()?;
        let record = self.guard(caller)?;

        let mut events = Vec::new();
        let settlement = self
            .settle(caller, record, now, &mut events)?
            .ok_or(EngineError::NothingToWithdraw { employee: caller })?;

        self.commit(events);
        Ok(settlement)
    }

    /// Settles anything owed in the current currency, then flips the
    /// preferred currency. Returns the new currency.
    ///
    /// Only active employees may switch. With nothing owed the switch
    /// happens without a withdrawal.
    ///
    /// A terminated caller is rejected with `Unauthorized` before any
    /// settlement is attempted, so that error takes precedence over every
    /// payout failure (`TransferFailed`, `SlippageExceeded`, ...). Checking
    /// it after the payout would hand out funds the rollback cannot reclaim.
    pub fn switch_currency(&self, caller: Address, now: Timestamp) -> Result<Currency> {
        let _lock = self.gate.enter()?;
        let record = self.guard(caller)?;
        if !record.is_active() {
            return Err(EngineError::Unauthorized { caller });
        }

        let mut events = Vec::new();
        self.settle(caller, record, now, &mut events)?;

        let currency = {
            let mut ledger = self.ledger();
            let mut updated = ledger.record(caller);
            updated.preferred_currency = updated.preferred_currency.toggled();
            ledger.replace(caller, updated);
            updated.preferred_currency
        };
        events.push(PayrollEvent::CurrencySwitched {
            employee: caller,
            currency,
        });

        self.commit(events);
        Ok(currency)
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// `(weekly_rate, employed_since, terminated_at)`; all zero when absent.
    pub fn info(&self, employee: Address) -> (u128, Timestamp, Timestamp) {
        self.ledger().info(employee)
    }

    /// Number of registered, non-terminated employees.
    pub fn active_count(&self) -> u64 {
        self.ledger().active_count()
    }

    /// Pay accrued by `employee` at `now`, in accounting units. Zero when
    /// absent.
    pub fn accrued(&self, employee: Address, now: Timestamp) -> u128 {
        accrual::accrued(&self.ledger().record(employee), now)
    }

    /// Currency the next settlement pays in.
    pub fn preferred_currency(&self, employee: Address) -> Currency {
        self.ledger().record(employee).preferred_currency
    }

    /// Full record for `employee`; the zero record when absent.
    pub fn record(&self, employee: Address) -> EmployeeRecord {
        self.ledger().record(employee)
    }

    /// All records, sorted by address.
    pub fn records(&self) -> Vec<(Address, EmployeeRecord)> {
        self.ledger().records()
    }

    /// Returns `true` while payouts are paused.
    pub fn is_paused(&self) -> bool {
        self.breaker.is_engaged()
    }

    /// Copy of the event journal.
    pub fn events(&self) -> Vec<PayrollEvent> {
        self.journal().clone()
    }

    /// Drains the event journal.
    pub fn take_events(&self) -> Vec<PayrollEvent> {
        std::mem::take(&mut *self.journal())
    }

    // ---------------------------------------------------------------------
    // Settlement internals
    // ---------------------------------------------------------------------

    /// Caller must have a record (active or terminated) and payouts must not
    /// be paused.
    fn guard(&self, caller: Address) -> Result<EmployeeRecord> {
        let record = self.ledger().record(caller);
        if !record.is_registered() {
            return Err(EngineError::Unauthorized { caller });
        }
        self.breaker.ensure_open()?;
        Ok(record)
    }

    /// Quotes, checkpoints, and pays out. `None` when nothing is owed.
    ///
    /// On payout failure the original record is put back before returning
    /// the error.
    fn settle(
        &self,
        employee: Address,
        record: EmployeeRecord,
        now: Timestamp,
        events: &mut Vec<PayrollEvent>,
    ) -> Result<Option<Settlement>> {
        let quote = accrual::quote(&record, now);
        if quote.amount == 0 {
            debug!("Nothing owed to {} at {}", employee, now);
            return Ok(None);
        }

        let mut checkpointed = record;
        checkpointed.checkpoint(quote.settled_until);
        // The ledger guard is a temporary: it must not be held while
        // collaborators run, or a callback reading the ledger would deadlock.
        self.ledger().replace(employee, checkpointed);

        let currency = record.preferred_currency;
        let amount = match self.pay_out(employee, currency, quote.amount, now) {
            Ok(amount) => amount,
            Err(e) => {
                warn!("Settlement for {} failed, rolling back: {}", employee, e);
                self.ledger().replace(employee, record);
                return Err(e);
            }
        };

        events.push(PayrollEvent::Withdrawal {
            employee,
            currency,
            amount,
        });
        Ok(Some(Settlement {
            currency,
            amount,
            owed: quote.amount,
            settled_until: quote.settled_until,
        }))
    }

    /// Moves `owed` accounting units to `employee` in `currency`. Returns the
    /// amount paid in that currency's precision.
    fn pay_out(
        &self,
        employee: Address,
        currency: Currency,
        owed: u128,
        now: Timestamp,
    ) -> Result<u128> {
        match currency {
            Currency::Stable => {
                let amount = rescale(owed, ACCOUNTING_DECIMALS, STABLE_DECIMALS);
                if !self.stable.transfer(employee, amount) {
                    return Err(EngineError::TransferFailed {
                        to: employee,
                        amount,
                    });
                }
                Ok(amount)
            }
            Currency::Native => {
                let price = self.oracle.latest_price()?;
                let expected_out = mul_div(
                    rescale(owed, ACCOUNTING_DECIMALS, NATIVE_DECIMALS),
                    pow10(price.decimals),
                    price.value,
                )
                .ok_or(EngineError::ArithmeticOverflow)?;
                let min_out = mul_div(
                    expected_out,
                    u128::from(self.config.slippage_tolerance),
                    100,
                )
                .ok_or(EngineError::ArithmeticOverflow)?;

                let amount_in = rescale(owed, ACCOUNTING_DECIMALS, STABLE_DECIMALS);
                let deadline = now.saturating_add(self.config.swap_deadline_secs);
                let amount_out = self.exchange.swap(amount_in, min_out, deadline, now)?;

                self.unwrapper.unwrap_native(amount_out).map_err(|e| {
                    debug!("Unwrap of {} failed: {}", amount_out, e);
                    EngineError::TransferFailed {
                        to: employee,
                        amount: amount_out,
                    }
                })?;
                if !self.native.send(employee, amount_out) {
                    return Err(EngineError::TransferFailed {
                        to: employee,
                        amount: amount_out,
                    });
                }
                Ok(amount_out)
            }
        }
    }

    /// Records the events of a completed operation.
    fn commit(&self, events: Vec<PayrollEvent>) {
        let mut journal = self.journal();
        for event in events {
            info!("{}", event);
            journal.push(event);
        }
    }

    fn ledger(&self) -> MutexGuard<'_, EmployeeLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn journal(&self) -> MutexGuard<'_, Vec<PayrollEvent>> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedMarket;

    const HR: Address = Address(1);
    const ALICE: Address = Address(100);
    const BOB: Address = Address(200);
    const ONE: u128 = 1_000_000_000_000_000_000;
    const DAY: u64 = 86_400;
    const T0: u64 = 1_700_000_000;

    fn setup() -> (PayrollEngine, Arc<SimulatedMarket>) {
        let config = EngineConfig::with_hr(HR);
        let market = SimulatedMarket::new(config.treasury, 200_000_000_000, 8);
        market.fund_stable(config.treasury, 1_000_000_000_000);
        let engine = PayrollEngine::new(config, market.collaborators());
        (engine, market)
    }

    #[test]
    fn test_stable_withdrawal_pays_pro_rata() {
        let (engine, market) = setup();
        engine.register(HR, ALICE, 1000 * ONE, T0).unwrap();

        let settlement = engine.withdraw(ALICE, T0 + 2 * DAY).unwrap();
        assert_eq!(settlement.owed, 285_714_285_714_285_714_285);
        assert_eq!(settlement.amount, 285_714_286);
        assert_eq!(settlement.currency, Currency::Stable);
        assert_eq!(market.stable_balance(ALICE), 285_714_286);
        assert_eq!(engine.record(ALICE).last_settled_at, T0 + 2 * DAY);
    }

    #[test]
    fn test_second_withdrawal_at_same_time_owes_nothing() {
        let (engine, market) = setup();
        engine.register(HR, ALICE, 1000 * ONE, T0).unwrap();
        engine.withdraw(ALICE, T0 + DAY).unwrap();

        let err = engine.withdraw(ALICE, T0 + DAY).unwrap_err();
        assert!(matches!(err, EngineError::NothingToWithdraw { .. }));
        assert_eq!(market.stable_balance(ALICE), 142_857_143);
    }

    #[test]
    fn test_native_withdrawal_buys_through_exchange() {
        let (engine, market) = setup();
        engine.register(HR, ALICE, 1000 * ONE, T0).unwrap();
        assert_eq!(engine.switch_currency(ALICE, T0).unwrap(), Currency::Native);

        let settlement = engine.withdraw(ALICE, T0 + 2 * DAY).unwrap();
        assert_eq!(settlement.currency, Currency::Native);
        // 285.714286 stable at 2000 per native unit
        assert_eq!(settlement.amount, 142_857_143_000_000_000);
        assert_eq!(market.native_balance(ALICE), 142_857_143_000_000_000);
        assert_eq!(market.stable_balance(ALICE), 0);
    }

    #[test]
    fn test_unregistered_caller_is_unauthorized() {
        let (engine, _) = setup();
        let err = engine.withdraw(BOB, T0).unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized { caller } if caller == BOB));
        let err = engine.switch_currency(BOB, T0).unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized { .. }));
    }

    #[test]
    fn test_paused_engine_rejects_withdrawals() {
        let (engine, market) = setup();
        engine.register(HR, ALICE, 1000 * ONE, T0).unwrap();
        engine.pause(HR).unwrap();
        assert!(engine.is_paused());

        let err = engine.withdraw(ALICE, T0 + DAY).unwrap_err();
        assert!(matches!(err, EngineError::Paused));
        let err = engine.switch_currency(ALICE, T0 + DAY).unwrap_err();
        assert!(matches!(err, EngineError::Paused));
        assert_eq!(market.stable_balance(ALICE), 0);

        engine.unpause(HR).unwrap();
        assert!(engine.withdraw(ALICE, T0 + DAY).is_ok());
    }

    #[test]
    fn test_only_hr_can_pause() {
        let (engine, _) = setup();
        let err = engine.pause(ALICE).unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized { .. }));
        assert!(!engine.is_paused());
    }

    #[test]
    fn test_failed_transfer_rolls_back_checkpoint() {
        let (engine, market) = setup();
        engine.register(HR, ALICE, 1000 * ONE, T0).unwrap();
        engine.take_events();
        market.set_reject_transfers(true);

        let before = engine.record(ALICE);
        let err = engine.withdraw(ALICE, T0 + DAY).unwrap_err();
        assert!(matches!(err, EngineError::TransferFailed { .. }));
        assert_eq!(engine.record(ALICE), before);
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_lock_is_released_after_failure() {
        let (engine, market) = setup();
        engine.register(HR, ALICE, 1000 * ONE, T0).unwrap();
        market.set_reject_transfers(true);
        assert!(engine.withdraw(ALICE, T0 + DAY).is_err());

        market.set_reject_transfers(false);
        assert!(engine.withdraw(ALICE, T0 + DAY).is_ok());
    }

    #[test]
    fn test_gate_rejects_nested_enter_on_same_thread() {
        let gate = OperationGate::new();
        let lock = gate.enter().unwrap();
        assert!(matches!(gate.enter(), Err(EngineError::ReentrantCall)));
        drop(lock);
        assert!(gate.enter().is_ok());
    }

    #[test]
    fn test_gate_makes_other_threads_wait() {
        let gate = OperationGate::new();
        let lock = gate.enter().unwrap();

        std::thread::scope(|s| {
            let waiter = s.spawn(|| gate.enter().map(|_| ()));
            std::thread::sleep(std::time::Duration::from_millis(50));
            assert!(!waiter.is_finished());

            drop(lock);
            assert!(waiter.join().unwrap().is_ok());
        });
    }

    #[test]
    fn test_events_in_order() {
        let (engine, _) = setup();
        engine.register(HR, ALICE, 1000 * ONE, T0).unwrap();
        engine.switch_currency(ALICE, T0 + DAY).unwrap();

        let names: Vec<_> = engine.events().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["registered", "withdrawal", "currency_switched"]);
    }
}
