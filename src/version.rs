// Package identity, stamped into the startup log line.

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// e.g. `tiered-metrics 0.3.0`
pub fn banner() -> String {
    format!("{NAME} {VERSION}")
}
