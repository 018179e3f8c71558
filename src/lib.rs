//! # Payroll Engine
//!
//! A payroll ledger and settlement engine: employees accrue salary
//! continuously and withdraw it in a stable asset or in a native asset bought
//! through an exchange at an oracle-checked price.
//!
//! ## Design Principles
//!
//! - **Integer fixed-point arithmetic**: accrual in 18-decimal accounting
//!   units, payouts rescaled with round-half-up to each asset's precision
//! - **Checkpoint before payout**: the accrual checkpoint moves before any
//!   funds do, under a single-writer settlement lock
//! - **All-or-nothing operations**: a failed operation leaves the ledger
//!   unchanged and emits no events
//! - **Narrow collaborator contracts**: tokens, oracle, and exchange are
//!   traits; a simulated market implements all of them for replay and tests
//!
//! ## Example
//!
//! ```
//! use payroll_engine::{Address, EngineConfig, PayrollEngine, SimulatedMarket};
//!
//! let hr = Address(1);
//! let alice = Address(100);
//! let config = EngineConfig::with_hr(hr);
//! let market = SimulatedMarket::new(config.treasury, 200_000_000_000, 8);
//! market.fund_stable(config.treasury, 1_000_000_000_000);
//!
//! let engine = PayrollEngine::new(config, market.collaborators());
//! engine.register(hr, alice, 1000 * 10u128.pow(18), 0).unwrap();
//!
//! let paid = engine.withdraw(alice, 2 * 86_400).unwrap();
//! assert_eq!(paid.amount, 285_714_286);
//! ```

pub mod accrual;
pub mod breaker;
pub mod command;
pub mod config;
pub mod decimal;
pub mod employee;
pub mod engine;
pub mod error;
pub mod events;
pub mod exchange;
pub mod external;
pub mod ledger;
pub mod oracle;
pub mod replay;
pub mod sim;

pub use command::{CommandKind, CommandRecord, ParsedCommand};
pub use config::EngineConfig;
pub use employee::{Address, Currency, EmployeeRecord, Timestamp};
pub use engine::{Collaborators, PayrollEngine, Settlement};
pub use error::{EngineError, Result};
pub use events::PayrollEvent;
pub use sim::SimulatedMarket;
