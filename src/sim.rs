//! In-process simulated market.
//!
//! One object standing in for every external collaborator: a stable token
//! ledger, native and wrapped-native balances, a settable price feed, and a
//! constant-price exchange. The CLI replays command files against it and the
//! tests use it to drive the engine end to end.
//!
//! The simulated router fills at the oracle price scaled by a fill ratio and
//! never enforces `min_amount_out` itself, so slippage checks are left to the
//! engine's exchange adapter.

use crate::decimal::{mul_div, pow10, rescale, NATIVE_DECIMALS, STABLE_DECIMALS};
use crate::employee::{Address, Timestamp};
use crate::engine::Collaborators;
use crate::external::{
    ExactInputSingleParams, ExternalError, NativeTransfer, NativeUnwrapper, PriceFeed,
    PriceRound, StableToken, SwapRouter,
};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct MarketState {
    stable: HashMap<Address, u128>,
    native: HashMap<Address, u128>,
    wrapped: HashMap<Address, u128>,
    price: i128,
    price_updated_at: Timestamp,
    fill_percent: u32,
    feed_online: bool,
    router_online: bool,
    reject_transfers: bool,
}

/// Simulated token balances, price feed, and exchange.
#[derive(Debug)]
pub struct SimulatedMarket {
    /// Custody address whose balances fund payouts and swaps.
    treasury: Address,
    price_decimals: u32,
    state: Mutex<MarketState>,
}

impl SimulatedMarket {
    /// Creates a market quoting one native unit at `price` (scaled by
    /// `price_decimals`) with all balances empty and a 100% fill.
    pub fn new(treasury: Address, price: i128, price_decimals: u32) -> Arc<Self> {
        Arc::new(SimulatedMarket {
            treasury,
            price_decimals,
            state: Mutex::new(MarketState {
                stable: HashMap::new(),
                native: HashMap::new(),
                wrapped: HashMap::new(),
                price,
                price_updated_at: 0,
                fill_percent: 100,
                feed_online: true,
                router_online: true,
                reject_transfers: false,
            }),
        })
    }

    /// Handles for wiring this market into an engine.
    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            stable: self.clone(),
            native: self.clone(),
            feed: self.clone(),
            router: self.clone(),
            unwrapper: self.clone(),
        }
    }

    /// Mints `amount` of the stable asset to `holder`.
    pub fn fund_stable(&self, holder: Address, amount: u128) {
        *self.state().stable.entry(holder).or_insert(0) += amount;
    }

    /// Sets the feed answer.
    pub fn set_price(&self, price: i128, updated_at: Timestamp) {
        let mut state = self.state();
        state.price = price;
        state.price_updated_at = updated_at;
    }

    /// Percentage of the oracle-implied output the exchange delivers.
    pub fn set_fill_percent(&self, percent: u32) {
        self.state().fill_percent = percent;
    }

    pub fn set_feed_online(&self, online: bool) {
        self.state().feed_online = online;
    }

    pub fn set_router_online(&self, online: bool) {
        self.state().router_online = online;
    }

    /// Makes every stable and native transfer report rejection.
    pub fn set_reject_transfers(&self, reject: bool) {
        self.state().reject_transfers = reject;
    }

    pub fn stable_balance(&self, holder: Address) -> u128 {
        self.state().stable.get(&holder).copied().unwrap_or(0)
    }

    pub fn native_balance(&self, holder: Address) -> u128 {
        self.state().native.get(&holder).copied().unwrap_or(0)
    }

    pub fn wrapped_balance(&self, holder: Address) -> u128 {
        self.state().wrapped.get(&holder).copied().unwrap_or(0)
    }

    fn state(&self) -> MutexGuard<'_, MarketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Moves `amount` between two entries of `balances`. `false` if `from` is
/// short.
fn move_balance(
    balances: &mut HashMap<Address, u128>,
    from: Address,
    to: Address,
    amount: u128,
) -> bool {
    let available = balances.get(&from).copied().unwrap_or(0);
    if available < amount {
        return false;
    }
    balances.insert(from, available - amount);
    *balances.entry(to).or_insert(0) += amount;
    true
}

impl StableToken for SimulatedMarket {
    fn transfer(&self, to: Address, amount: u128) -> bool {
        let mut state = self.state();
        if state.reject_transfers {
            return false;
        }
        move_balance(&mut state.stable, self.treasury, to, amount)
    }
}

impl NativeTransfer for SimulatedMarket {
    fn send(&self, to: Address, amount: u128) -> bool {
        let mut state = self.state();
        if state.reject_transfers {
            return false;
        }
        move_balance(&mut state.native, self.treasury, to, amount)
    }
}

impl PriceFeed for SimulatedMarket {
    fn decimals(&self) -> u32 {
        self.price_decimals
    }

    fn latest_round(&self) -> Result<PriceRound, ExternalError> {
        let state = self.state();
        if !state.feed_online {
            return Err(ExternalError::new("price feed offline"));
        }
        Ok(PriceRound {
            answer: state.price,
            updated_at: state.price_updated_at,
        })
    }
}

impl SwapRouter for SimulatedMarket {
    fn exact_input_single(&self, params: &ExactInputSingleParams) -> Result<u128, ExternalError> {
        let mut state = self.state();
        if !state.router_online {
            return Err(ExternalError::new("router offline"));
        }
        if state.price <= 0 {
            return Err(ExternalError::new("pool has no liquidity"));
        }

        let at_price = mul_div(
            rescale(params.amount_in, STABLE_DECIMALS, NATIVE_DECIMALS),
            pow10(self.price_decimals),
            state.price.unsigned_abs(),
        )
        .ok_or_else(|| ExternalError::new("swap amount overflow"))?;
        let amount_out = mul_div(at_price, u128::from(state.fill_percent), 100)
            .ok_or_else(|| ExternalError::new("swap amount overflow"))?;

        let treasury = self.treasury;
        if !move_balance(&mut state.stable, treasury, Address::NULL, params.amount_in) {
            return Err(ExternalError::new("insufficient input balance"));
        }
        *state.wrapped.entry(params.recipient).or_insert(0) += amount_out;

        debug!(
            "Simulated swap: {} in, {} out to {}",
            params.amount_in, amount_out, params.recipient
        );
        Ok(amount_out)
    }
}

impl NativeUnwrapper for SimulatedMarket {
    fn unwrap_native(&self, amount: u128) -> Result<(), ExternalError> {
        let mut state = self.state();
        let wrapped = state.wrapped.get(&self.treasury).copied().unwrap_or(0);
        if wrapped < amount {
            return Err(ExternalError::new("insufficient wrapped balance"));
        }
        state.wrapped.insert(self.treasury, wrapped - amount);
        *state.native.entry(self.treasury).or_insert(0) += amount;
        Ok(())
    }
}
