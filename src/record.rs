//! Per-function statistics cell (spec §3, component C2).

use std::time::Instant;

use crate::name::FunctionName;

/// A snapshot of per-thread CPU-time counters taken at `enter`/`leave`,
/// sourced from `getrusage(RUSAGE_THREAD)` on Linux (spec §4.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct RUsageSnapshot {
    pub user_time_us: i64,
    pub kernel_time_us: i64,
}

/// One instance per (thread, function name). See spec §3 for the field
/// semantics and the `wall >= user + kernel - epsilon` invariant.
#[derive(Clone)]
pub struct FunctionRecord {
    pub name: FunctionName,
    pub addr: Option<usize>,
    pub wall_time_us: u64,
    pub sampling_ticks_us: u64,
    pub user_time_us: u64,
    pub kernel_time_us: u64,
    pub wait_time_us: u64,
    pub call_count: u64,
    pub active: bool,
    pub thread_id: u32,

    /// Baseline captured at `enter`; cleared on `leave`. Not meaningful
    /// across re-entrant calls to the same name on the same thread because
    /// the call stack, not the record, tracks nesting.
    pub(crate) start_wall: Option<Instant>,
    pub(crate) start_rusage: Option<RUsageSnapshot>,
}

impl Default for FunctionRecord {
    fn default() -> Self {
        FunctionRecord {
            name: FunctionName::default(),
            addr: None,
            wall_time_us: 0,
            sampling_ticks_us: 0,
            user_time_us: 0,
            kernel_time_us: 0,
            wait_time_us: 0,
            call_count: 0,
            active: false,
            thread_id: 0,
            start_wall: None,
            start_rusage: None,
        }
    }
}

impl FunctionRecord {
    pub fn new(name: FunctionName) -> Self {
        FunctionRecord {
            name,
            ..Default::default()
        }
    }

    /// Records one `enter`: bumps the call count, marks active, and takes
    /// fresh wall/rusage baselines.
    pub fn mark_entered(&mut self, wall: Instant, rusage: RUsageSnapshot) {
        self.call_count += 1;
        self.active = true;
        self.start_wall = Some(wall);
        self.start_rusage = Some(rusage);
    }

    /// Records one `leave`: accumulates wall/user/kernel/wait deltas from
    /// the baselines set by the matching `enter`. A `leave` with no prior
    /// `enter` baseline (e.g. after a call-stack reset) is a no-op on the
    /// deltas but still clears `active`, matching the tolerant-misuse
    /// policy of spec §4.3/§7.
    pub fn mark_left(&mut self, wall: Instant, rusage: RUsageSnapshot) {
        if let (Some(start_wall), Some(start_rusage)) = (self.start_wall, self.start_rusage) {
            let wall_delta_us = wall.duration_since(start_wall).as_micros() as u64;
            let user_delta_us = (rusage.user_time_us - start_rusage.user_time_us).max(0) as u64;
            let kernel_delta_us = (rusage.kernel_time_us - start_rusage.kernel_time_us).max(0) as u64;
            let wait_delta_us = (wall_delta_us as i64 - (user_delta_us + kernel_delta_us) as i64).max(0) as u64;

            self.wall_time_us += wall_delta_us;
            self.user_time_us += user_delta_us;
            self.kernel_time_us += kernel_delta_us;
            self.wait_time_us += wait_delta_us;
        }
        self.active = false;
        self.start_wall = None;
        self.start_rusage = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn wait_time_never_negative() {
        let mut record = FunctionRecord::new(FunctionName::new("f"));
        let start = Instant::now();
        record.mark_entered(start, RUsageSnapshot::default());
        sleep(Duration::from_millis(5));
        record.mark_left(Instant::now(), RUsageSnapshot::default());
        assert!(record.wall_time_us >= 5_000);
        assert_eq!(record.user_time_us, 0);
        assert_eq!(record.kernel_time_us, 0);
        assert!(record.wait_time_us > 0);
        assert!(!record.active);
    }

    #[test]
    fn unmatched_leave_does_not_corrupt_accumulators() {
        let mut record = FunctionRecord::new(FunctionName::new("f"));
        record.mark_left(Instant::now(), RUsageSnapshot::default());
        assert_eq!(record.wall_time_us, 0);
        assert!(!record.active);
    }
}
