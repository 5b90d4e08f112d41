pub mod config;
pub mod core_state;
pub mod dashboard;
pub mod gateway;
pub mod models;
pub mod query_cache;
pub mod ranking;
pub mod upload;
pub mod workflow;

use tracing_subscriber::EnvFilter;

pub use core_state::{ConsoleState, CoreError};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise [`config::default_log_filter`].
/// Calling it twice is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
