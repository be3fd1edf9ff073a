use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingSettings;

/// Environment variable that overrides `logging.filter`.
pub const LOG_ENV: &str = "ENCORE_LOG";

/// Pick the filter directive: `ENCORE_LOG` wins over the configured one.
fn filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber writing to `logging.file`.
///
/// The terminal is owned by the UI, so without a log file nothing is
/// installed and events are dropped. Returns whether logging is active.
pub fn init(settings: &LoggingSettings) -> io::Result<bool> {
    let Some(path) = settings.file.as_ref() else {
        return Ok(false);
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let installed = tracing_subscriber::registry()
        .with(filter(settings))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_thread_names(true)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .is_ok();
    Ok(installed)
}
