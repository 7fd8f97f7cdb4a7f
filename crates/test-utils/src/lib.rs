pub mod builders;
pub mod flaky_repo;

use std::sync::Once;
use squadron::events::{EngineEvent, Subscription};
use tracing_subscriber::{fmt, EnvFilter};

/// Return type for tests that use `?`.
pub type TestResult = anyhow::Result<()>;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Kinds of every event queued on `sub`, in delivery order.
pub fn drain_kinds(sub: &mut Subscription) -> Vec<&'static str> {
    sub.drain().iter().map(EngineEvent::kind).collect()
}
