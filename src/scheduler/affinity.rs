//! CPU topology discovery and per-thread core pinning.
//!
//! Pinning respects cgroups, cpusets, and taskset constraints: the allowed
//! set is read with `sched_getaffinity`, so a process confined to CPUs 4-7
//! enumerates exactly those ids rather than the host's full range.
//!
//! Only Linux exposes per-thread affinity here; everywhere else the
//! capability reports `Unsupported` and callers degrade to unpinned
//! workers.

use std::io;

/// Upper bound on core indices accepted by the pinning API.
///
/// `cpu_set_t` is a fixed bitmask; indices at or beyond its width would be
/// undefined behavior in the `CPU_SET` macro, so they are rejected first.
#[cfg(target_os = "linux")]
pub(crate) const CPU_SET_CAPACITY: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

#[cfg(not(target_os = "linux"))]
pub(crate) const CPU_SET_CAPACITY: usize = 1024;

/// Resolved view of the CPUs available to this process.
///
/// When the allowed set could be enumerated, `core_ids` holds the ordered
/// id list and assignment is round-robin over it. When enumeration failed
/// or yielded nothing, only `core_count` is known and ids are synthesized
/// as `t % core_count`.
#[derive(Debug, Clone)]
pub(crate) struct Topology {
    core_ids: Option<Vec<usize>>,
    core_count: usize,
}

impl Topology {
    /// Resolve the topology. Enumerating the allowed-CPU set is only worth
    /// the syscall when workers will actually be pinned.
    pub(crate) fn resolve(enumerate_ids: bool) -> Self {
        if enumerate_ids {
            match allowed_core_ids() {
                Some(ids) if !ids.is_empty() => {
                    let core_count = ids.len();
                    return Self {
                        core_ids: Some(ids),
                        core_count,
                    };
                }
                _ => {
                    tracing::debug!(
                        "allowed-CPU enumeration unavailable, falling back to online count"
                    );
                }
            }
        }
        Self {
            core_ids: None,
            core_count: online_core_count(),
        }
    }

    #[cfg(test)]
    pub(crate) fn synthetic(core_ids: Option<Vec<usize>>, core_count: usize) -> Self {
        Self {
            core_ids,
            core_count,
        }
    }

    pub(crate) fn core_count(&self) -> usize {
        self.core_count
    }

    /// Deterministic round-robin core assignment for worker `t`.
    pub(crate) fn core_for(&self, t: usize) -> usize {
        match &self.core_ids {
            Some(ids) => ids[t % ids.len()],
            None => t % self.core_count,
        }
    }
}

/// Ordered list of CPU ids in the process's allowed set, or `None` when
/// the set cannot be read on this platform.
#[cfg(target_os = "linux")]
fn allowed_core_ids() -> Option<Vec<usize>> {
    // SAFETY: a zeroed cpu_set_t is a valid empty mask; pid 0 queries the
    // calling thread.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        let rc = libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &mut set);
        if rc != 0 {
            return None;
        }
        Some(
            (0..CPU_SET_CAPACITY)
                .filter(|&core| libc::CPU_ISSET(core, &set))
                .collect(),
        )
    }
}

#[cfg(not(target_os = "linux"))]
fn allowed_core_ids() -> Option<Vec<usize>> {
    None
}

/// Online-processor count, minimum 1. Used whenever the explicit id list
/// is unavailable.
pub(crate) fn online_core_count() -> usize {
    num_cpus::get().max(1)
}

/// Pin the calling thread to a single core.
///
/// Fails (rather than invoking undefined behavior) for out-of-range ids,
/// for ids outside the allowed set, and on platforms without per-thread
/// affinity.
#[cfg(target_os = "linux")]
pub(crate) fn pin_current_thread(core: usize) -> io::Result<()> {
    if core >= CPU_SET_CAPACITY {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("core index {core} exceeds CPU set capacity {CPU_SET_CAPACITY}"),
        ));
    }

    // SAFETY: the index was bounds-checked above; pthread_setaffinity_np
    // returns its error code directly rather than through errno.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);

        let rc = libc::pthread_setaffinity_np(
            libc::pthread_self(),
            std::mem::size_of::<libc::cpu_set_t>(),
            &set,
        );
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc));
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn pin_current_thread(_core: usize) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "per-thread CPU affinity is not supported on this platform",
    ))
}
