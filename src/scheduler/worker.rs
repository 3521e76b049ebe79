//! Per-worker state and the claim/execute loop.

use super::affinity;
use super::cursor::SharedCursor;
use super::realtime;

/// Everything one worker thread needs for the duration of a run. Built by
/// the invocation, moved into its thread at spawn, dropped at join.
pub(crate) struct WorkerDescriptor<'a, F> {
    /// Worker index, also used in the thread name.
    pub(crate) index: usize,
    /// Core to pin to, or `None` for an unpinned worker.
    pub(crate) core: Option<usize>,
    /// Whether to attempt SCHED_FIFO escalation before claiming work.
    pub(crate) realtime: bool,
    pub(crate) cursor: &'a SharedCursor,
    pub(crate) body: &'a F,
}

impl<F: Fn(i64) + Sync> WorkerDescriptor<'_, F> {
    /// Worker entry point: establish affinity and scheduling class, then
    /// claim chunks until the range is exhausted.
    ///
    /// Affinity is applied here, inside the new thread, before the first
    /// claim. A sibling worker's early claim can still run unpinned for
    /// one chunk; pinning is a placement hint, not a correctness
    /// requirement, so the window is tolerated.
    pub(crate) fn run(self) {
        if let Some(core) = self.core {
            if let Err(err) = affinity::pin_current_thread(core) {
                tracing::debug!(
                    worker = self.index,
                    core,
                    error = %err,
                    "could not pin worker, continuing unpinned"
                );
            }
        }
        if self.realtime {
            realtime::request_realtime();
        }

        // Deliberately no yield or backoff between claims: at realistic
        // chunk sizes the single fetch_add is cheaper than any
        // coordination that would avoid it.
        while let Some((start, stop)) = self.cursor.claim() {
            for index in start..stop {
                (self.body)(index);
            }
        }
    }
}
