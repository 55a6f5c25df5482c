//! Shared helpers for envoy's integration tests: log capture, a hang guard
//! for tests that spawn real processes, config builders and a fake stage
//! backend.

pub mod builders;
pub mod fake_backend;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for any single test that spawns processes.
pub const TEST_LIMIT: Duration = Duration::from_secs(10);

static INIT: Once = Once::new();

/// Route envoy's stage and session events into the test harness output.
///
/// The filter comes from `ENVOY_LOG` (the variable the library itself
/// reads), then `RUST_LOG`, and defaults to `envoy=debug` so a failing test
/// shows every spawn, timeout and kill that led up to it.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("ENVOY_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("envoy=debug"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Fail the test instead of hanging when a process outlives [`TEST_LIMIT`].
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_LIMIT, f).await {
        Ok(out) => out,
        Err(_) => panic!("test still waiting on a process after {TEST_LIMIT:?}"),
    }
}
