//! Tracing subscriber setup.
//!
//! The engine only emits `tracing` events; applications that want to see
//! them call [`init_logging`] once or install their own subscriber.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install a global subscriber. `RUST_LOG` overrides `level`. Returns false
/// when another subscriber was already installed.
pub fn init_logging(level: Level, json_output: bool) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lightning_frame={},warn", level)));

    let registry = Registry::default().with(env_filter);
    let installed = if json_output {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_thread_names(true);
        registry.with(fmt_layer).try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(true);
        registry.with(fmt_layer).try_init()
    };
    installed.is_ok()
}
