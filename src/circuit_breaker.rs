use failsafe::{backoff, failure_policy, Config, StateMachine};
use std::time::Duration;

/// Circuit breaker guarding the company-registry API.
pub type RegistryCircuitBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Creates a circuit breaker for registry lookups so that an unavailable or
/// rate-limiting registry fails fast instead of holding every request for the
/// whole retry schedule.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failed lookups trigger OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: Normal operation, lookups pass through.
/// - **OPEN**: Too many failures, lookups fail fast.
/// - **HALF_OPEN**: Testing if the registry recovered.
pub fn create_registry_circuit_breaker() -> RegistryCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}
