//! Blocks `SIGPROF` for the duration of a thread-local mutation (spec §9,
//! "Signal-handler reentrancy into mutable shared state").
//!
//! The sampling handler and `register`/`enter`/`leave` run on the same OS
//! thread and never truly race each other, but the handler can still
//! preempt a mutation mid-flight (e.g. partway through relinking a hash
//! chain). Masking `SIGPROF` around each mutating section guarantees the
//! handler only ever observes a fully-settled thread-local state, which is
//! what lets [`crate::sampler`] and [`crate::instrumentation`] use ordinary
//! `RefCell` borrows instead of raw pointers.

use std::mem::MaybeUninit;

/// RAII guard that blocks `SIGPROF` on construction and restores the prior
/// signal mask on drop.
pub struct SigProfGuard {
    previous: libc::sigset_t,
}

impl SigProfGuard {
    pub fn block() -> Self {
        unsafe {
            let mut set: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut set);
            libc::sigaddset(&mut set, libc::SIGPROF);
            let mut previous = MaybeUninit::<libc::sigset_t>::zeroed().assume_init();
            libc::pthread_sigmask(libc::SIG_BLOCK, &set, &mut previous);
            SigProfGuard { previous }
        }
    }
}

impl Drop for SigProfGuard {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_sigmask(libc::SIG_SETMASK, &self.previous, std::ptr::null_mut());
        }
    }
}
