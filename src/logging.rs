use std::io::Write;

use chrono::Local;
use env_logger::{Builder, Env};
use log::{Level, SetLoggerError};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Installs env_logger with timestamped lines.
///
/// `RUST_LOG` overrides `default_filter`.
pub fn init(default_filter: &str) -> Result<(), SetLoggerError> {
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}",
                format_line(
                    &Local::now().to_rfc3339(),
                    record.level(),
                    record.target(),
                    &record.args().to_string()
                )
            )
        })
        .try_init()
}

fn format_line(timestamp: &str, level: Level, target: &str, message: &str) -> String {
    format!("{timestamp} [{level:<5}] {target}: {message}")
}
