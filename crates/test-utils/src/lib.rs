pub mod builders;
pub mod fake_runner;
pub mod flaky_store;

use std::sync::Once;

use backup_sentinel::store::SqliteStore;
use tempfile::TempDir;
use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{ConfigFileBuilder, NotificationBuilder};
pub use fake_runner::FakeActionRunner;
pub use flaky_store::FlakyStore;

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

/// A file-backed store in a fresh temp directory. Keep the `TempDir` alive
/// for as long as the store is used.
pub fn temp_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("creating temp dir");
    let store = SqliteStore::open(
        dir.path().join("sentinel.db"),
        std::time::Duration::from_secs(5),
    )
    .expect("opening temp store");
    (dir, store)
}
