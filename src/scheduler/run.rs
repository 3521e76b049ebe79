//! The `parallel_for` lifecycle: validate, resolve topology, spawn
//! workers, join them all, surface one status.

use std::thread;

use bitflags::bitflags;
use thiserror::Error;

use super::affinity::Topology;
use super::cursor::SharedCursor;
use super::worker::WorkerDescriptor;

bitflags! {
    /// Scheduler option flags. Independent and freely combinable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Options: u32 {
        /// Bind each worker thread to one CPU, round-robin over the
        /// process's allowed set.
        const PIN_CORE = 1 << 0;
        /// Request the highest-priority SCHED_FIFO class per worker.
        /// Best effort; refusal degrades to normal priority.
        const REALTIME = 1 << 1;
    }
}

/// Tuning knobs for one [`parallel_for`] invocation.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Number of consecutive indices claimed per atomic operation.
    /// Values `<= 0` are normalized to 1 by the scheduler.
    pub chunk: i64,
    /// Worker count; `0` means one per resolvable core. Reduced to the
    /// enumerable core count when [`Options::PIN_CORE`] is set.
    pub threads: usize,
    /// Option flags.
    pub options: Options,
    /// Worker stack size in bytes (`0` = platform default).
    pub stack_size: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            chunk: 1,
            threads: 0,
            options: Options::empty(),
            stack_size: 0,
        }
    }
}

impl ScheduleConfig {
    /// Config with a specific worker count.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads,
            ..Default::default()
        }
    }

    /// Config with a specific claim granularity.
    pub fn with_chunk(chunk: i64) -> Self {
        Self {
            chunk,
            ..Default::default()
        }
    }
}

/// Fatal scheduling outcomes. Affinity and realtime refusals are not in
/// this taxonomy; they degrade with a diagnostic log line only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// The caller supplied `end <= begin`. Detected before any resource
    /// is allocated.
    #[error("empty or inverted index range")]
    InvalidRange,
    /// Worker bookkeeping could not be allocated. No threads were
    /// created; retrying with fewer workers is safe.
    #[error("failed to allocate worker state")]
    AllocationFailure,
    /// A worker thread could not be created. Every already-running worker
    /// was joined before this surfaced; their progress stands, but full
    /// coverage of the range is not guaranteed.
    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawnFailure(String),
}

impl ScheduleError {
    /// Numeric status code of the original C interface. A successful run
    /// corresponds to `0`.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidRange => -1,
            Self::AllocationFailure => -2,
            Self::ThreadSpawnFailure(_) => -3,
        }
    }
}

/// Execute `body` once for every index in `begin..end`, distributing
/// chunks of indices across a fresh pool of worker threads.
///
/// Work is claimed dynamically: each worker repeatedly grabs the next
/// `chunk` indices from a shared atomic cursor, so threads that finish
/// early simply claim more. Within one claimed chunk the indices are
/// visited in increasing order; across chunks and threads there is no
/// ordering guarantee, only the exactly-once guarantee.
///
/// The call blocks until every worker has been joined, also on the error
/// paths, so no worker ever outlives the invocation. A panic inside
/// `body` is resumed on the caller after the join barrier.
///
/// ```
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use parfor::{parallel_for, ScheduleConfig};
///
/// let sum = AtomicU64::new(0);
/// parallel_for(1, 101, &ScheduleConfig::with_chunk(8), |i| {
///     sum.fetch_add(i as u64, Ordering::Relaxed);
/// })
/// .unwrap();
/// assert_eq!(sum.load(Ordering::Relaxed), 5050);
/// ```
pub fn parallel_for<F>(
    begin: i64,
    end: i64,
    config: &ScheduleConfig,
    body: F,
) -> Result<(), ScheduleError>
where
    F: Fn(i64) + Sync,
{
    if end <= begin {
        return Err(ScheduleError::InvalidRange);
    }
    let chunk = config.chunk.max(1);
    let pin = config.options.contains(Options::PIN_CORE);
    let realtime = config.options.contains(Options::REALTIME);

    let topology = Topology::resolve(pin);
    let nthreads = effective_threads(config.threads, pin, &topology);

    let cursor = SharedCursor::new(begin, end, chunk);

    let mut descriptors: Vec<WorkerDescriptor<'_, F>> = Vec::new();
    descriptors
        .try_reserve_exact(nthreads)
        .map_err(|_| ScheduleError::AllocationFailure)?;
    for index in 0..nthreads {
        descriptors.push(WorkerDescriptor {
            index,
            core: pin.then(|| topology.core_for(index)),
            realtime,
            cursor: &cursor,
            body: &body,
        });
    }

    thread::scope(|scope| {
        let mut handles = Vec::new();
        handles
            .try_reserve_exact(nthreads)
            .map_err(|_| ScheduleError::AllocationFailure)?;

        for descriptor in descriptors {
            let index = descriptor.index;
            match spawn_worker(scope, config.stack_size, descriptor) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    tracing::warn!(
                        worker = index,
                        error = %err,
                        "worker spawn failed, joining already-started workers"
                    );
                    // Returning drops the unspawned descriptors; the scope
                    // joins every running worker before this error escapes
                    // parallel_for.
                    return Err(ScheduleError::ThreadSpawnFailure(err.to_string()));
                }
            }
        }

        for handle in handles {
            if let Err(payload) = handle.join() {
                // A callback panic belongs to the caller. The scope joins
                // the remaining workers while this unwinds.
                std::panic::resume_unwind(payload);
            }
        }
        Ok(())
    })
}

/// Resolve the worker count: `0` defaults to the core count, and pinned
/// runs never exceed the number of enumerable cores.
fn effective_threads(requested: usize, pin: bool, topology: &Topology) -> usize {
    let cores = topology.core_count().max(1);
    let threads = if requested == 0 { cores } else { requested };
    if pin && threads > cores {
        tracing::debug!(
            requested = threads,
            clamped = cores,
            "more workers than pinnable cores, clamping"
        );
        return cores;
    }
    threads
}

fn spawn_worker<'scope, 'env, F>(
    scope: &'scope thread::Scope<'scope, 'env>,
    stack_size: usize,
    descriptor: WorkerDescriptor<'env, F>,
) -> std::io::Result<thread::ScopedJoinHandle<'scope, ()>>
where
    F: Fn(i64) + Sync,
{
    #[cfg(test)]
    if fault::should_fail_spawn(descriptor.index) {
        return Err(std::io::Error::other("injected spawn failure"));
    }

    let mut builder = thread::Builder::new().name(format!("parfor-{}", descriptor.index));
    if stack_size > 0 {
        builder = builder.stack_size(stack_size);
    }
    builder.spawn_scoped(scope, move || descriptor.run())
}

#[cfg(test)]
pub(crate) mod fault {
    //! Test-only seam for forcing a spawn failure at a given worker index.
    //! Consulted on the spawning thread, so arming is test-local.

    use std::cell::Cell;

    thread_local! {
        static FAIL_SPAWN_AT: Cell<Option<usize>> = Cell::new(None);
    }

    pub(crate) fn fail_spawn_at(index: usize) {
        FAIL_SPAWN_AT.with(|cell| cell.set(Some(index)));
    }

    pub(crate) fn reset() {
        FAIL_SPAWN_AT.with(|cell| cell.set(None));
    }

    pub(crate) fn should_fail_spawn(index: usize) -> bool {
        FAIL_SPAWN_AT.with(|cell| cell.get()) == Some(index)
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
