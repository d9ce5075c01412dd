//! Tracing subscriber setup.
//!
//! `RUST_LOG` overrides the default filter in both modes.

pub mod activity_layer;

pub use activity_layer::{ACTIVITY_TARGET, ActivityEvent, ActivityLayer};

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter for the server binary.
pub const DEFAULT_SERVER_FILTER: &str = "info,mtchat_server=debug,mtchat_application=debug";
/// Default filter for the terminal client; keeps stderr quiet.
pub const DEFAULT_CLIENT_FILTER: &str = "warn";

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into())
}

/// Installs a formatted subscriber on stdout.
pub fn init_tracing(default_filter: &str) {
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .try_init()
    {
        eprintln!("tracing already initialized: {e}");
    }
}

/// Installs a stderr subscriber plus an [`ActivityLayer`] and returns the
/// receiver of activity events.
pub fn init_with_activity(default_filter: &str) -> mpsc::UnboundedReceiver<ActivityEvent> {
    let (activity, receiver) = ActivityLayer::channel();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter(default_filter));
    if let Err(e) = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(activity)
        .try_init()
    {
        eprintln!("tracing already initialized: {e}");
    }
    receiver
}
