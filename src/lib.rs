//! An in-process, signal-driven function-level profiler: instrument call
//! sites with `register`/`enter`/`leave` (or the `profile_scope!`/
//! `profile_function!` macros), sample the active call stack on a `SIGPROF`
//! timer, and export the results as a flat text report, a Graphviz DOT call
//! graph, or a `gprof`-compatible `gmon.out`.

pub mod call_graph;
pub mod call_stack;
pub mod error;
pub mod gmon;
pub mod hash;
pub mod instrumentation;
pub mod macros;
pub mod name;
pub mod platform;
pub mod record;
pub mod registry;
pub mod report;
pub mod runner;
pub mod sampler;
pub mod sigguard;
pub mod symbols;
pub mod workloads;

pub use error::{ProfilerError, Result};
pub use instrumentation::{enter, leave, register, ScopeGuard};
pub use sampler::{Sampler, DEFAULT_INTERVAL};

/// Installs the `SIGPROF` handler and arms the sampling timer at the given
/// interval, returning the [`Sampler`] so the caller can `stop()` it later
/// (spec §4.2).
pub fn start_profiling(interval: std::time::Duration) -> Sampler {
    let sampler = Sampler::new(interval);
    sampler.start();
    sampler
}

/// Disarms the sampling timer (spec §4.2).
pub fn stop_profiling(sampler: &Sampler) {
    sampler.stop();
}
