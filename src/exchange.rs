//! Exchange adapter.
//!
//! The caller decides the minimum acceptable output; this adapter only
//! enforces it, together with the swap deadline.

use crate::employee::{Address, Timestamp};
use crate::error::{EngineError, Result};
use crate::external::{ExactInputSingleParams, SwapRouter};
use log::debug;
use std::sync::Arc;

/// Fixed routing for the payout swap: stable asset in, wrapped native out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRoute {
    pub input_asset: Address,
    pub output_asset: Address,
    pub fee: u32,
    pub recipient: Address,
}

/// Wraps a [`SwapRouter`] with deadline and slippage enforcement.
#[derive(Clone)]
pub struct ExchangeAdapter {
    router: Arc<dyn SwapRouter>,
    route: SwapRoute,
}

impl ExchangeAdapter {
    pub fn new(router: Arc<dyn SwapRouter>, route: SwapRoute) -> Self {
        ExchangeAdapter { router, route }
    }

    /// Swaps at most `amount_in` for at least `min_amount_out`.
    ///
    /// Fails with `DeadlineExpired` if `now` is past `deadline`,
    /// `ExchangeUnavailable` if the router fails, and `SlippageExceeded` if
    /// the realized output is below `min_amount_out`. The deadline is also
    /// passed to the router so it can enforce it on its own clock.
    pub fn swap(
        &self,
        amount_in: u128,
        min_amount_out: u128,
        deadline: Timestamp,
        now: Timestamp,
    ) -> Result<u128> {
        if now > deadline {
            return Err(EngineError::DeadlineExpired { deadline, now });
        }

        let params = ExactInputSingleParams {
            input_asset: self.route.input_asset,
            output_asset: self.route.output_asset,
            fee: self.route.fee,
            recipient: self.route.recipient,
            deadline,
            amount_in,
            min_amount_out,
        };

        let amount_out = self
            .router
            .exact_input_single(&params)
            .map_err(|e| EngineError::ExchangeUnavailable(e.to_string()))?;

        if amount_out < min_amount_out {
            return Err(EngineError::SlippageExceeded {
                amount_out,
                min_amount_out,
            });
        }

        debug!(
            "Swapped {} of asset {} for {} of asset {} (min {})",
            amount_in, params.input_asset, amount_out, params.output_asset, min_amount_out
        );
        Ok(amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::ExternalError;
    use std::sync::Mutex;

    /// Router returning a fixed output and remembering the last request.
    struct FixedRouter {
        out: std::result::Result<u128, ExternalError>,
        last: Mutex<Option<ExactInputSingleParams>>,
    }

    impl SwapRouter for FixedRouter {
        fn exact_input_single(
            &self,
            params: &ExactInputSingleParams,
        ) -> std::result::Result<u128, ExternalError> {
            *self.last.lock().unwrap() = Some(*params);
            self.out.clone()
        }
    }

    fn route() -> SwapRoute {
        SwapRoute {
            input_asset: Address(10),
            output_asset: Address(11),
            fee: 3000,
            recipient: Address(99),
        }
    }

    fn adapter(out: std::result::Result<u128, ExternalError>) -> (ExchangeAdapter, Arc<FixedRouter>) {
        let router = Arc::new(FixedRouter {
            out,
            last: Mutex::new(None),
        });
        (ExchangeAdapter::new(router.clone(), route()), router)
    }

    #[test]
    fn test_swap_meeting_minimum_succeeds() {
        let (exchange, router) = adapter(Ok(1_000));
        assert_eq!(exchange.swap(500, 980, 1_300, 1_000).unwrap(), 1_000);

        let params = router.last.lock().unwrap().unwrap();
        assert_eq!(params.amount_in, 500);
        assert_eq!(params.min_amount_out, 980);
        assert_eq!(params.deadline, 1_300);
        assert_eq!(params.recipient, Address(99));
        assert_eq!(params.fee, 3000);
    }

    #[test]
    fn test_swap_exactly_at_minimum_succeeds() {
        let (exchange, _) = adapter(Ok(980));
        assert_eq!(exchange.swap(500, 980, 1_300, 1_000).unwrap(), 980);
    }

    #[test]
    fn test_short_output_is_slippage() {
        let (exchange, _) = adapter(Ok(979));
        let err = exchange.swap(500, 980, 1_300, 1_000).unwrap_err();
        assert!(matches!(
            err,
            EngineError::SlippageExceeded {
                amount_out: 979,
                min_amount_out: 980
            }
        ));
    }

    #[test]
    fn test_expired_deadline_never_reaches_router() {
        let (exchange, router) = adapter(Ok(1_000));
        let err = exchange.swap(500, 980, 1_300, 1_301).unwrap_err();
        assert!(matches!(err, EngineError::DeadlineExpired { .. }));
        assert!(router.last.lock().unwrap().is_none());
    }

    #[test]
    fn test_router_failure_is_unavailable() {
        let (exchange, _) = adapter(Err(ExternalError::new("pool drained")));
        let err = exchange.swap(500, 980, 1_300, 1_000).unwrap_err();
        assert!(matches!(err, EngineError::ExchangeUnavailable(_)));
    }
}
