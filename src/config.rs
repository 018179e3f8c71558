//! Engine configuration, fixed at construction.

use crate::employee::Address;

/// Default exchange fee tier (0.3%).
pub const DEFAULT_POOL_FEE: u32 = 3000;

/// Default minimum output, in percent of the oracle-implied amount.
pub const DEFAULT_SLIPPAGE_TOLERANCE: u32 = 98;

/// Default swap deadline, in seconds after the operation's timestamp.
pub const DEFAULT_SWAP_DEADLINE_SECS: u64 = 300;

/// Static engine parameters.
///
/// The HR authority is compared by value on every privileged call and can
/// only be changed by building a new engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// The only principal allowed to register, terminate, and pause.
    pub hr_authority: Address,

    /// Address holding the engine's funds; receives swap output.
    pub treasury: Address,

    /// Stable payment asset (exchange input).
    pub stable_asset: Address,

    /// Wrapped native asset (exchange output).
    pub wrapped_native_asset: Address,

    /// Exchange fee tier passed through to the router.
    pub pool_fee: u32,

    /// Minimum accepted swap output as a percentage of the expected output.
    pub slippage_tolerance: u32,

    /// Seconds the exchange may take before the swap is rejected.
    pub swap_deadline_secs: u64,
}

impl EngineConfig {
    /// Default configuration with the given HR authority.
    pub fn with_hr(hr_authority: Address) -> Self {
        EngineConfig {
            hr_authority,
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            hr_authority: Address(1),
            treasury: Address(1_000),
            stable_asset: Address(1_001),
            wrapped_native_asset: Address(1_002),
            pool_fee: DEFAULT_POOL_FEE,
            slippage_tolerance: DEFAULT_SLIPPAGE_TOLERANCE,
            swap_deadline_secs: DEFAULT_SWAP_DEADLINE_SECS,
        }
    }
}
