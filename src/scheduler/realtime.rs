//! Best-effort escalation of a worker thread to the SCHED_FIFO realtime
//! class at maximum priority.
//!
//! Escalation usually requires CAP_SYS_NICE or an rtprio rlimit, so
//! failure is the common case on unprivileged systems. Workers continue
//! at normal priority; the failure is logged once per process, not once
//! per worker, so a wide pool does not flood the log.

use std::sync::Once;

static ESCALATION_WARNING: Once = Once::new();

/// Try to move the calling thread to the highest-priority FIFO realtime
/// class. Returns whether escalation took effect; failure is never an
/// error to the caller.
pub(crate) fn request_realtime() -> bool {
    match set_fifo_max_priority() {
        Ok(()) => true,
        Err(err) => {
            ESCALATION_WARNING.call_once(|| {
                if err.kind() == std::io::ErrorKind::PermissionDenied {
                    tracing::warn!(
                        error = %err,
                        "realtime scheduling unavailable, continuing at normal priority \
                         (needs CAP_SYS_NICE or an rtprio rlimit)"
                    );
                } else {
                    tracing::warn!(
                        error = %err,
                        "realtime scheduling unavailable, continuing at normal priority"
                    );
                }
            });
            false
        }
    }
}

#[cfg(unix)]
fn set_fifo_max_priority() -> std::io::Result<()> {
    // SAFETY: sched_get_priority_max has no preconditions;
    // pthread_setschedparam reads a fully-initialized sched_param and
    // returns its error code directly rather than through errno.
    unsafe {
        let max = libc::sched_get_priority_max(libc::SCHED_FIFO);
        if max < 0 {
            return Err(std::io::Error::last_os_error());
        }

        let mut param: libc::sched_param = std::mem::zeroed();
        param.sched_priority = max;

        let rc = libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param);
        if rc != 0 {
            return Err(std::io::Error::from_raw_os_error(rc));
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_fifo_max_priority() -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "realtime scheduling classes are not supported on this platform",
    ))
}
