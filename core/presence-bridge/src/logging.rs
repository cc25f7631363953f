//! Logging setup.
//!
//! Stdout carries the host protocol, so logs go to a daily-rolling file under
//! `~/.editor-presence/logs/` (stderr when no home directory exists).

use fs_err as fs;
use std::env;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEBUG_ENV: &str = "EDITOR_PRESENCE_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "presence-bridge.log";

pub fn log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".editor-presence").join("logs"))
}

fn debug_enabled() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn env_filter() -> EnvFilter {
    if debug_enabled() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Installs the global subscriber. Keep the guard alive for the process
/// lifetime or buffered lines are lost.
pub fn init() -> Option<WorkerGuard> {
    let dir = log_dir().filter(|dir| fs::create_dir_all(dir).is_ok());

    match dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .try_init();
            None
        }
    }
}
