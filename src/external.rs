//! Contracts the engine requires from its external collaborators.
//!
//! The engine never implements token, oracle, or exchange logic. It calls
//! these traits and maps every failure to a specific [`EngineError`] kind in
//! the adapters (`oracle`, `exchange`) or the settlement engine.
//!
//! Implementations take `&self` and must be `Send + Sync`: a collaborator may
//! hold a handle back to the engine and call into it while a payout is in
//! progress. The engine's settlement lock rejects such calls.
//!
//! [`EngineError`]: crate::error::EngineError

use crate::employee::{Address, Timestamp};
use thiserror::Error;

/// Failure reported by a collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExternalError(pub String);

impl ExternalError {
    pub fn new(message: impl Into<String>) -> Self {
        ExternalError(message.into())
    }
}

/// Transfers of the stable payment asset out of the engine's custody.
pub trait StableToken: Send + Sync {
    /// Moves `amount` (stable asset precision) to `to`. `false` on rejection.
    fn transfer(&self, to: Address, amount: u128) -> bool;
}

/// Plain transfers of the native asset out of the engine's custody.
pub trait NativeTransfer: Send + Sync {
    /// Sends `amount` (native precision) to `to`. `false` on rejection.
    fn send(&self, to: Address, amount: u128) -> bool;
}

/// One price observation from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRound {
    /// Accounting-unit value of one whole native unit, scaled by the feed's
    /// decimals. May be non-positive on a broken feed.
    pub answer: i128,

    /// When the feed last updated this answer.
    pub updated_at: Timestamp,
}

/// Latest-price feed for the native asset.
pub trait PriceFeed: Send + Sync {
    /// Decimal places of [`PriceRound::answer`].
    fn decimals(&self) -> u32;

    /// The most recent round.
    fn latest_round(&self) -> std::result::Result<PriceRound, ExternalError>;
}

/// Parameters for a single-hop exact-input swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactInputSingleParams {
    pub input_asset: Address,
    pub output_asset: Address,
    pub fee: u32,
    pub recipient: Address,
    pub deadline: Timestamp,
    pub amount_in: u128,
    pub min_amount_out: u128,
}

/// Exchange router. Pulls `amount_in` of the input asset from the engine's
/// custody and credits the output asset to `recipient`.
pub trait SwapRouter: Send + Sync {
    /// Executes the swap and returns the realized output amount.
    fn exact_input_single(
        &self,
        params: &ExactInputSingleParams,
    ) -> std::result::Result<u128, ExternalError>;
}

/// Converts the wrapped native asset held by the engine into the directly
/// transferable native asset, 1:1.
pub trait NativeUnwrapper: Send + Sync {
    fn unwrap_native(&self, amount: u128) -> std::result::Result<(), ExternalError>;
}
