//! Sampling engine: interval timer + `SIGPROF` handler (spec §4.2,
//! component C5).
//!
//! The handler only ever touches: the `enabled` flag (atomic), the current
//! thread's previous-sample timestamp, call stack, and function map. It
//! never allocates, locks, or calls into `register`/`enter`/`leave` —
//! mutations of those same thread-local structures are masked out via
//! [`crate::sigguard::SigProfGuard`], so by the time the handler runs it
//! only ever observes a settled state (spec §9).

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::instrumentation::{with_call_stack, with_function_map};

static ENABLED: AtomicBool = AtomicBool::new(false);

thread_local! {
    static PREVIOUS_SAMPLE: Cell<Option<Instant>> = const { Cell::new(None) };
}

/// Samples the current thread's call-stack top and credits it with the
/// wall-clock interval since the previous delivery. The first delivery
/// after each `start` only initializes the baseline and credits nothing
/// (spec §4.2).
extern "C" fn profiling_handler(_sig: libc::c_int) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let now = Instant::now();
    let previous = PREVIOUS_SAMPLE.with(|cell| cell.replace(Some(now)));
    let Some(previous) = previous else {
        return;
    };
    let interval_us = now.duration_since(previous).as_micros() as u64;

    with_call_stack(|stack| {
        let Some(top) = stack.top() else {
            return;
        };
        let _ = with_function_map(|functions| {
            if let Some(record) = functions.find_mut(&top) {
                record.sampling_ticks_us += interval_us;
            }
        });
    });
}

/// Owns the sampling interval and the installed `SIGPROF` handler /
/// `setitimer` configuration. One instance is expected per process; `start`
/// and `stop` are the only mutating operations and are meant to be called
/// from a single coordinating thread (spec §5).
pub struct Sampler {
    interval: Duration,
}

impl Sampler {
    /// Installs the `SIGPROF` handler. Does not arm the timer — call
    /// [`Sampler::start`] for that.
    pub fn new(interval: Duration) -> Self {
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = profiling_handler as usize;
            libc::sigemptyset(&mut action.sa_mask);
            action.sa_flags = 0;
            libc::sigaction(libc::SIGPROF, &action, std::ptr::null_mut());
        }
        Sampler { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arms the repeating interval timer and flips the enable flag.
    pub fn start(&self) {
        ENABLED.store(true, Ordering::Relaxed);
        let micros = self.interval.as_micros() as libc::suseconds_t;
        let interval_spec = libc::timeval {
            tv_sec: (micros / 1_000_000) as libc::time_t,
            tv_usec: (micros % 1_000_000) as libc::suseconds_t,
        };
        let timer = libc::itimerval {
            it_interval: interval_spec,
            it_value: interval_spec,
        };
        unsafe {
            libc::setitimer(libc::ITIMER_PROF, &timer, std::ptr::null_mut());
        }
    }

    /// Disarms the timer and clears the enable flag.
    pub fn stop(&self) {
        ENABLED.store(false, Ordering::Relaxed);
        let zero = libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        let timer = libc::itimerval {
            it_interval: zero,
            it_value: zero,
        };
        unsafe {
            libc::setitimer(libc::ITIMER_PROF, &timer, std::ptr::null_mut());
        }
    }
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Default sampling interval (spec §4.2: 10ms, 100 samples/second).
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);
