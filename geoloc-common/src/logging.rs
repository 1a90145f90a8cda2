//! Tracing initialization shared by geoloc binaries
//!
//! The subscriber is installed before configuration is loaded so config-file
//! discovery is logged. The configured level is applied afterwards through
//! `LogFilterHandle`.

use crate::{Error, Result};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Directive used until the configured level is known
pub const STARTUP_DIRECTIVE: &str = "info";

/// Handle for swapping the log filter after startup
pub struct LogFilterHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    /// `RUST_LOG` was set; it wins over any configured level
    from_env: bool,
}

impl LogFilterHandle {
    /// Apply the configured filter directive
    ///
    /// No-op when `RUST_LOG` is set.
    pub fn apply(&self, directive: &str) -> Result<()> {
        if self.from_env {
            return Ok(());
        }
        let filter = parse_filter(directive)?;
        self.handle
            .reload(filter)
            .map_err(|e| Error::Internal(format!("Failed to update log filter: {}", e)))
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence; `default_directive` applies when it is unset.
pub fn init_tracing(default_directive: &str) -> Result<LogFilterHandle> {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (parse_filter(default_directive)?, false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Internal(format!("Tracing already initialized: {}", e)))?;

    Ok(LogFilterHandle { handle, from_env })
}

fn parse_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directive, e)))
}
