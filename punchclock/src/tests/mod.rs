mod mock_engine;

use crate::orchestrator::FlowTimings;
use crate::retry::RetryPolicy;
use crate::session::Session;
use mock_engine::MockEngine;
use std::time::Duration;

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .with_test_writer()
        .try_init();
}

/// Three passes, no backoff, single probes
pub fn immediate_policy() -> RetryPolicy {
    FlowTimings::immediate().main_policy
}

pub fn zero_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO)
}

pub fn session_for(engine: &MockEngine) -> Session {
    Session::new(std::sync::Arc::new(engine.clone()))
}
