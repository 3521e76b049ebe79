//! parfor: a dynamically load-balanced parallel-for primitive.
//!
//! Given a half-open index range, [`parallel_for`] distributes chunks of
//! indices across a fixed pool of worker threads so that every index runs
//! exactly once, with throughput close to linear in thread count even
//! when per-index cost is uneven.
//!
//! # Design
//!
//! - **One shared cursor**: the only cross-thread mutable state is a
//!   single cache-padded atomic counter; claiming work is one
//!   `fetch_add`, with no locks and no task queue.
//! - **Fresh pool per call**: workers are spawned at the start of an
//!   invocation and all joined before it returns; nothing persists
//!   across calls.
//! - **Best-effort placement**: CPU pinning ([`Options::PIN_CORE`]) and
//!   realtime escalation ([`Options::REALTIME`]) degrade with a log line
//!   when the platform or privileges refuse them, never with an error.

pub mod cli;
pub mod config;
pub mod scheduler;
pub mod telemetry;

pub use scheduler::{parallel_for, Options, ScheduleConfig, ScheduleError};
