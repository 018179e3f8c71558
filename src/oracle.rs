//! Price oracle adapter.
//!
//! Every conversion re-queries the feed; nothing is cached. The feed's own
//! update guarantees are trusted as-is, so a stale but positive answer is
//! accepted.

use crate::error::{EngineError, Result};
use crate::external::PriceFeed;
use log::debug;
use std::sync::Arc;

/// A validated, strictly positive price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Price {
    /// Accounting-unit value of one whole native unit, scaled by `decimals`.
    pub value: u128,

    /// Decimal places of `value`.
    pub decimals: u32,
}

/// Wraps a [`PriceFeed`] with validity checks.
#[derive(Clone)]
pub struct PriceOracle {
    feed: Arc<dyn PriceFeed>,
}

impl PriceOracle {
    pub fn new(feed: Arc<dyn PriceFeed>) -> Self {
        PriceOracle { feed }
    }

    /// Queries the feed for the current price.
    ///
    /// Fails with `OracleUnavailable` if the feed cannot be reached and with
    /// `OraclePriceInvalid` if the answer is zero or negative.
    pub fn latest_price(&self) -> Result<Price> {
        let round = self
            .feed
            .latest_round()
            .map_err(|e| EngineError::OracleUnavailable(e.to_string()))?;

        if round.answer <= 0 {
            return Err(EngineError::OraclePriceInvalid {
                price: round.answer,
            });
        }

        let price = Price {
            value: round.answer.unsigned_abs(),
            decimals: self.feed.decimals(),
        };
        debug!(
            "Oracle price {} ({} decimals) updated at {}",
            price.value, price.decimals, round.updated_at
        );
        Ok(price)
    }
}
