//! Thin platform shims: thread id and per-thread CPU-time snapshots.
//!
//! `getrusage(RUSAGE_THREAD)` is Linux-specific; other Unix targets fall
//! back to `RUSAGE_SELF` (process-wide), which is what the original did for
//! non-Linux builds too (see the `#ifdef __linux__` in
//! `examples/original_source/src/profiler_core.c`).

use crate::record::RUsageSnapshot;

#[cfg(target_os = "linux")]
const RUSAGE_THREAD: libc::c_int = 1;

/// The kernel thread id, cached per call (cheap syscall, not cached here
/// since callers already cache it in thread-local state).
pub fn current_tid() -> u32 {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "linux")] {
            unsafe { libc::syscall(libc::SYS_gettid) as u32 }
        } else {
            unsafe { libc::pthread_self() as usize as u32 }
        }
    }
}

fn timeval_to_us(tv: libc::timeval) -> i64 {
    (tv.tv_sec as i64) * 1_000_000 + tv.tv_usec as i64
}

/// Captures the calling thread's accumulated user/kernel CPU time.
pub fn rusage_snapshot() -> RUsageSnapshot {
    unsafe {
        let mut usage: libc::rusage = std::mem::zeroed();
        cfg_if::cfg_if! {
            if #[cfg(target_os = "linux")] {
                libc::getrusage(RUSAGE_THREAD, &mut usage);
            } else {
                libc::getrusage(libc::RUSAGE_SELF, &mut usage);
            }
        }
        RUsageSnapshot {
            user_time_us: timeval_to_us(usage.ru_utime),
            kernel_time_us: timeval_to_us(usage.ru_stime),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tid_is_nonzero() {
        assert_ne!(current_tid(), 0);
    }

    #[test]
    fn rusage_snapshot_is_non_negative() {
        let snap = rusage_snapshot();
        assert!(snap.user_time_us >= 0);
        assert!(snap.kernel_time_us >= 0);
    }
}
