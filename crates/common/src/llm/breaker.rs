//! Per-purpose circuit breaker for provider calls
//!
//! Generation calls run for minutes; hammering a dead endpoint once per
//! request would pin worker time on guaranteed failures. After a run of
//! consecutive failures the breaker opens and calls short-circuit with
//! `CircuitBreakerOpen` until the cool-down elapses.

use crate::db::models::LlmPurpose;
use crate::errors::{AppError, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    open_until: Option<Instant>,
}

/// Breakers keyed by LLM purpose
pub struct BreakerRegistry {
    threshold: u32,
    cooldown: Duration,
    states: Mutex<HashMap<LlmPurpose, BreakerState>>,
}

impl BreakerRegistry {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Fail fast if the breaker for this purpose is open
    pub fn check(&self, purpose: LlmPurpose) -> Result<()> {
        let mut states = self.states.lock().expect("breaker lock poisoned");
        let state = states.entry(purpose).or_default();

        if let Some(open_until) = state.open_until {
            if Instant::now() < open_until {
                return Err(AppError::CircuitBreakerOpen {
                    purpose: String::from(purpose),
                });
            }
            // Cool-down elapsed; allow a probe call
            state.open_until = None;
            state.consecutive_failures = 0;
        }

        Ok(())
    }

    /// Record a successful call, closing the breaker
    pub fn record_success(&self, purpose: LlmPurpose) {
        let mut states = self.states.lock().expect("breaker lock poisoned");
        let state = states.entry(purpose).or_default();
        state.consecutive_failures = 0;
        state.open_until = None;
    }

    /// Record a failed call, opening the breaker at the threshold
    pub fn record_failure(&self, purpose: LlmPurpose) {
        let mut states = self.states.lock().expect("breaker lock poisoned");
        let state = states.entry(purpose).or_default();
        state.consecutive_failures += 1;

        if state.consecutive_failures >= self.threshold {
            state.open_until = Some(Instant::now() + self.cooldown);
            tracing::warn!(
                purpose = %String::from(purpose),
                failures = state.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Circuit breaker opened"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_opens_at_threshold() {
        let registry = BreakerRegistry::new(3, Duration::from_secs(60));

        for _ in 0..2 {
            registry.record_failure(LlmPurpose::Report);
        }
        assert!(registry.check(LlmPurpose::Report).is_ok());

        registry.record_failure(LlmPurpose::Report);
        assert!(matches!(
            registry.check(LlmPurpose::Report),
            Err(AppError::CircuitBreakerOpen { .. })
        ));
    }

    #[test]
    fn test_breakers_are_independent_per_purpose() {
        let registry = BreakerRegistry::new(1, Duration::from_secs(60));

        registry.record_failure(LlmPurpose::Report);
        assert!(registry.check(LlmPurpose::Report).is_err());
        assert!(registry.check(LlmPurpose::Critique).is_ok());
    }

    #[test]
    fn test_success_closes_breaker() {
        let registry = BreakerRegistry::new(2, Duration::from_secs(60));

        registry.record_failure(LlmPurpose::Report);
        registry.record_success(LlmPurpose::Report);
        registry.record_failure(LlmPurpose::Report);
        assert!(registry.check(LlmPurpose::Report).is_ok());
    }

    #[test]
    fn test_cooldown_allows_probe() {
        let registry = BreakerRegistry::new(1, Duration::from_millis(1));

        registry.record_failure(LlmPurpose::Report);
        std::thread::sleep(Duration::from_millis(5));
        assert!(registry.check(LlmPurpose::Report).is_ok());
    }
}
