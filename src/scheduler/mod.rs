//! Chunk-claiming parallel-for scheduler.
//!
//! A single shared atomic cursor hands out chunks of an index range to a
//! fixed pool of worker threads; optional CPU pinning and best-effort
//! realtime escalation shape where and how those workers run.

mod affinity;
mod cursor;
mod realtime;
mod run;
mod worker;

pub use run::{parallel_for, Options, ScheduleConfig, ScheduleError};
