//! Process-wide payout circuit breaker.

use crate::error::{EngineError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// Gate consulted before any payout. Engaged means paused.
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    engaged: AtomicBool,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while payouts are paused.
    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }

    /// Pauses payouts. Returns `false` if already paused.
    pub fn engage(&self) -> bool {
        !self.engaged.swap(true, Ordering::SeqCst)
    }

    /// Resumes payouts. Returns `false` if not paused.
    pub fn release(&self) -> bool {
        self.engaged.swap(false, Ordering::SeqCst)
    }

    /// Fails fast with `Paused` while engaged.
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_engaged() {
            return Err(EngineError::Paused);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_open() {
        let breaker = CircuitBreaker::new();
        assert!(!breaker.is_engaged());
        assert!(breaker.ensure_open().is_ok());
    }

    #[test]
    fn test_engage_and_release() {
        let breaker = CircuitBreaker::new();
        assert!(breaker.engage());
        assert!(!breaker.engage());
        assert!(matches!(breaker.ensure_open(), Err(EngineError::Paused)));

        assert!(breaker.release());
        assert!(!breaker.release());
        assert!(breaker.ensure_open().is_ok());
    }
}
