//! Error types for the payroll engine.

use crate::employee::Address;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur during engine operation.
///
/// Every variant is fatal to the operation that produced it. The engine never
/// retries internally; a failed operation leaves the ledger unchanged.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Caller lacks the HR role, has no employee record, or is terminated
    /// where an active employee is required
    #[error("Unauthorized caller {caller}")]
    Unauthorized { caller: Address },

    /// Employee already has an active record
    #[error("Employee {employee} is already registered")]
    AlreadyRegistered { employee: Address },

    /// Employee has no record or is already terminated
    #[error("Employee {employee} is not registered")]
    NotRegistered { employee: Address },

    /// The null address cannot be registered
    #[error("Invalid employee address")]
    InvalidEmployee,

    /// Weekly rate must be positive
    #[error("Weekly rate must be greater than zero")]
    InvalidRate,

    /// No pay has accrued since the last settlement
    #[error("Nothing to withdraw for employee {employee}")]
    NothingToWithdraw { employee: Address },

    /// The circuit breaker is engaged
    #[error("Payouts are paused")]
    Paused,

    /// Another state-changing operation holds the settlement lock
    #[error("Operation already in progress")]
    ReentrantCall,

    /// The price feed could not be queried
    #[error("Price oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// The price feed returned a non-positive price
    #[error("Oracle returned invalid price {price}")]
    OraclePriceInvalid { price: i128 },

    /// The exchange could not execute the swap
    #[error("Exchange unavailable: {0}")]
    ExchangeUnavailable(String),

    /// Realized exchange output fell below the minimum
    #[error("Slippage exceeded: got {amount_out}, required at least {min_amount_out}")]
    SlippageExceeded { amount_out: u128, min_amount_out: u128 },

    /// The swap was attempted after its deadline
    #[error("Swap deadline {deadline} expired at {now}")]
    DeadlineExpired { deadline: u64, now: u64 },

    /// A payout transfer was rejected
    #[error("Transfer of {amount} to {to} failed")]
    TransferFailed { to: Address, amount: u128 },

    /// Conversion arithmetic exceeded the working integer width
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid command record
    #[error("Invalid command at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Missing input file argument
    #[error("Missing input file argument. Usage: payroll-engine <commands.csv> [--hr <addr>] [--price <decimal>] [--fill <percent>] [--treasury <decimal>] [--events]")]
    MissingArgument,

    /// Unrecognized or malformed command-line flag
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
