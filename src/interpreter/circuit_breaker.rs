//! # Circuit Breaker
//!
//! Stops calling the interpretation service after repeated failures so a
//! broken collaborator fails fast instead of stalling every edit request.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;

/// Observable state of a [`CircuitBreaker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation, requests pass through
    Closed,
    /// Failure threshold reached, requests fail fast
    Open,
    /// Reset timeout elapsed, the next request is a trial
    HalfOpen,
}

#[derive(Debug, Default)]
struct FailureWindow {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

/// Circuit breaker guarding calls to the interpretation service
///
/// Uses `RecoveryConfig` for:
/// - `circuit_breaker_threshold`: consecutive failures before opening
/// - `circuit_breaker_reset_secs`: time before a trial request is allowed
///
/// A failure while half-open opens the circuit again for a full reset period.
#[derive(Debug)]
pub struct CircuitBreaker {
    window: Mutex<FailureWindow>,
    threshold: u32,
    reset_after: Duration,
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    ///
    /// ```rust
    /// use meal_patch::config::RecoveryConfig;
    /// use meal_patch::interpreter::{BreakerState, CircuitBreaker};
    ///
    /// let breaker = CircuitBreaker::new(&RecoveryConfig::default());
    /// assert_eq!(breaker.state(), BreakerState::Closed);
    /// ```
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            window: Mutex::new(FailureWindow::default()),
            threshold: config.circuit_breaker_threshold.max(1),
            reset_after: Duration::from_secs(config.circuit_breaker_reset_secs),
        }
    }

    pub fn state(&self) -> BreakerState {
        let window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        if window.consecutive_failures < self.threshold {
            return BreakerState::Closed;
        }
        match window.last_failure {
            Some(at) if at.elapsed() < self.reset_after => BreakerState::Open,
            _ => BreakerState::HalfOpen,
        }
    }

    /// Whether requests should be refused without trying
    pub fn is_open(&self) -> bool {
        self.state() == BreakerState::Open
    }

    pub fn record_failure(&self) {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        window.consecutive_failures = window.consecutive_failures.saturating_add(1);
        window.last_failure = Some(Instant::now());
    }

    pub fn record_success(&self) {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        *window = FailureWindow::default();
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: u32, reset_secs: u64) -> RecoveryConfig {
        RecoveryConfig {
            circuit_breaker_threshold: threshold,
            circuit_breaker_reset_secs: reset_secs,
            ..RecoveryConfig::default()
        }
    }

    #[test]
    fn test_opens_at_threshold() {
        let breaker = CircuitBreaker::new(&config(3, 60));
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);

        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(breaker.is_open());
    }

    #[test]
    fn test_success_closes() {
        let breaker = CircuitBreaker::new(&config(1, 60));
        breaker.record_failure();
        assert!(breaker.is_open());

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[test]
    fn test_half_open_after_reset_timeout() {
        let breaker = CircuitBreaker::new(&config(1, 0));
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(!breaker.is_open());
    }
}
