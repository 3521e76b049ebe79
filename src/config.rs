//! Demo configuration loading from environment variables.
//!
//! All values are loaded from `PARFOR_*` environment variables with
//! sensible defaults. Invalid values fall back to defaults without
//! crashing; command-line arguments override whatever was loaded here.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `PARFOR_THREADS` | 0 | Worker threads (0 = one per core) |
//! | `PARFOR_CHUNK` | 1 | Blocks claimed per atomic operation |
//! | `PARFOR_BLOCK_KB` | 256 | Compression block size (KiB) |
//! | `PARFOR_LEVEL` | 6 | Compression level (0-9) |
//! | `PARFOR_PIN` | 0 | Pin workers to cores (1 = on) |
//! | `PARFOR_REALTIME` | 0 | Attempt SCHED_FIFO per worker (1 = on) |
//! | `PARFOR_LOG` | info | Log filter directives |
//! | `PARFOR_LOG_JSON` | 0 | JSON log output (1 = on) |

use crate::telemetry::{LogConfig, LogFormat};

/// Demo defaults loaded from the environment.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub threads: usize,
    pub chunk: i64,
    pub block_bytes: usize,
    pub level: u32,
    pub pin: bool,
    pub realtime: bool,
    pub log: LogConfig,
}

/// Parse a `usize` value, returning `default` on missing or invalid.
fn parse_usize(val: Option<&str>, default: usize) -> usize {
    val.and_then(|v| v.parse::<usize>().ok()).unwrap_or(default)
}

/// Parse an `i64` value, returning `default` on missing or invalid.
fn parse_i64(val: Option<&str>, default: i64) -> i64 {
    val.and_then(|v| v.parse::<i64>().ok()).unwrap_or(default)
}

/// Parse a `u32` value, returning `default` on missing or invalid.
fn parse_u32(val: Option<&str>, default: u32) -> u32 {
    val.and_then(|v| v.parse::<u32>().ok()).unwrap_or(default)
}

/// Parse a boolean flag: `1`/`true`/`yes` (any case) enable it.
fn parse_flag(val: Option<&str>, default: bool) -> bool {
    match val {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        None => default,
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Load demo configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    let block_kb = parse_usize(env("PARFOR_BLOCK_KB").as_deref(), 256).max(1);
    let level = parse_u32(env("PARFOR_LEVEL").as_deref(), 6).min(9);

    EnvConfig {
        threads: parse_usize(env("PARFOR_THREADS").as_deref(), 0),
        chunk: parse_i64(env("PARFOR_CHUNK").as_deref(), 1),
        block_bytes: block_kb * 1024,
        level,
        pin: parse_flag(env("PARFOR_PIN").as_deref(), false),
        realtime: parse_flag(env("PARFOR_REALTIME").as_deref(), false),
        log: LogConfig {
            format: if parse_flag(env("PARFOR_LOG_JSON").as_deref(), false) {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            level: env("PARFOR_LOG").unwrap_or_else(|| "info".to_string()),
        },
    }
}
