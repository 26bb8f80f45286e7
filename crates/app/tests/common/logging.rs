//! Shared test logging helper: writes each test's logs to its own file under
//! `target/test-logs/<name>.log` instead of interleaving on stderr.

use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_test_logging(name: &str) {
    INIT.call_once(|| {
        let _ = std::fs::create_dir_all("target/test-logs");
    });

    let level = std::env::var("AURALINK_TEST_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string());
    let path = format!("target/test-logs/{name}.log");
    let file = match std::fs::File::create(&path) {
        Ok(f) => f,
        Err(_) => return,
    };

    let _ = tracing_subscriber::fmt()
        .with_writer(move || file.try_clone().expect("clone log file handle"))
        .with_env_filter(tracing_subscriber::EnvFilter::new(level.clone()))
        .with_ansi(false)
        .try_init();
}
