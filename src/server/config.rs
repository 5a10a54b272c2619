//! Server configuration and command line arguments.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;

/// Configuration for running a [`TravelServer`](super::TravelServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on. The benchmark environment fixes this to 80.
    pub port: u16,
    /// Path to the zip archive loaded before the listener starts.
    pub data_path: PathBuf,
    /// Path to the options file whose first line carries the
    /// data-generation timestamp.
    pub options_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 80,
            data_path: PathBuf::from("/tmp/data/data.zip"),
            options_path: PathBuf::from("/tmp/data/options.txt"),
        }
    }
}

/// Command line arguments for the travels server binary.
#[derive(Debug, Parser)]
#[command(name = "travels", about = "In-memory travel-tracking data service")]
pub struct CliArgs {
    /// Port to listen on.
    #[arg(long, default_value_t = 80)]
    pub port: u16,

    /// Path to the data archive.
    #[arg(long, default_value = "/tmp/data/data.zip")]
    pub data: PathBuf,

    /// Path to the options file.
    #[arg(long, default_value = "/tmp/data/options.txt")]
    pub options: PathBuf,
}

impl CliArgs {
    pub fn to_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            data_path: self.data.clone(),
            options_path: self.options.clone(),
        }
    }
}

/// The fixed "now" used by the age filters: the first line of the options
/// file when it parses as a signed decimal, the system clock otherwise.
/// Pinning "now" to the data-generation timestamp keeps benchmark answers
/// reproducible.
pub fn read_data_timestamp(path: &Path) -> i64 {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(
                "failed to read options file {}: {}, using system time",
                path.display(),
                err
            );
            return system_now();
        }
    };
    let first_line = content.lines().next().map(str::trim).unwrap_or("");
    match first_line.parse::<i64>() {
        Ok(ts) => ts,
        Err(_) => {
            tracing::warn!(
                "invalid timestamp {:?} in {}, using system time",
                first_line,
                path.display()
            );
            system_now()
        }
    }
}

fn system_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
