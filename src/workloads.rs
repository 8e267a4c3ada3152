//! Demo workloads (spec §6 collaborator), grounded on
//! `examples/original_source/src/workloads.c`'s three workload shapes:
//! single-threaded, multi-threaded with distinct per-thread call trees, and
//! shared-test where several threads call the *same* function names.

use std::fs::OpenOptions;
use std::io::Write;
use std::thread;
use std::time::Duration;

use crate::instrumentation::publish_and_cleanup_current_thread;
use crate::report::flat::print_current_thread_report;
use crate::{profile_function, profile_scope};

fn function_a() {
    let _guard = profile_function!();
    for i in 0..1_000_000u64 {
        std::hint::black_box(i);
    }
}

fn function_b() {
    let _guard = profile_function!();
    for i in 0..500_000u64 {
        std::hint::black_box(i);
    }
    function_a();
}

fn function_c() {
    let _guard = profile_function!();
    for i in 0..2_000_000u64 {
        std::hint::black_box(i);
    }
    function_b();
}

/// Creates synchronous file I/O so wait and kernel time become visible.
fn function_io_heavy() {
    let _guard = profile_function!();
    let path = std::env::temp_dir().join(format!("scopeprof_io_{}.tmp", std::process::id()));
    let Ok(mut file) = OpenOptions::new().write(true).create(true).truncate(true).open(&path) else {
        return;
    };
    let buffer = [b'A'; 4096];
    for _ in 0..1000 {
        let _ = file.write_all(&buffer);
    }
    let _ = file.sync_all();
    drop(file);
    let _ = std::fs::remove_file(&path);
}

/// Generates many small syscalls to surface kernel-mode accounting.
fn function_syscall_heavy() {
    let _guard = profile_function!();
    for _ in 0..100_000u32 {
        std::hint::black_box(std::process::id());
    }
}

/// Burns CPU cycles with floating-point math to emphasize user time.
fn function_cpu_heavy() {
    let _guard = profile_function!();
    let mut result = 0.0f64;
    for i in 0..2_000_000u32 {
        result += i as f64 * 3.14159;
        result /= i as f64 + 1.0;
    }
    std::hint::black_box(result);
}

/// Sleeps to produce wait time with minimal CPU usage.
fn function_sleep_test() {
    let _guard = profile_function!();
    thread::sleep(Duration::from_millis(100));
}

/// Mixes CPU, file I/O, and sleep in one profiled function.
fn function_mixed() {
    let _guard = profile_function!();
    let mut sum = 0u64;
    for i in 0..100_000u64 {
        sum += i;
    }
    std::hint::black_box(sum);

    let path = std::env::temp_dir().join(format!("scopeprof_mixed_{}.tmp", std::process::id()));
    if let Ok(mut file) = OpenOptions::new().write(true).create(true).truncate(true).open(&path) {
        let _ = file.write_all(b"test");
        drop(file);
        let _ = std::fs::remove_file(&path);
    }

    thread::sleep(Duration::from_millis(50));
}

fn thread_worker_cpu() {
    let _guard = profile_scope!("thread_worker_cpu");
    println!("Thread: starting CPU-intensive work");
    for _ in 0..3 {
        function_cpu_heavy();
    }
    println!("Thread: CPU work done");
    drop(_guard);
    publish_and_cleanup_current_thread();
}

fn thread_worker_io() {
    let _guard = profile_scope!("thread_worker_io");
    println!("Thread: starting I/O-intensive work");
    function_io_heavy();
    println!("Thread: I/O work done");
    drop(_guard);
    publish_and_cleanup_current_thread();
}

fn thread_worker_sleep() {
    let _guard = profile_scope!("thread_worker_sleep");
    println!("Thread: starting sleep work");
    for _ in 0..5 {
        function_sleep_test();
    }
    println!("Thread: sleep work done");
    drop(_guard);
    publish_and_cleanup_current_thread();
}

fn thread_worker_mixed() {
    let _guard = profile_scope!("thread_worker_mixed");
    println!("Thread: starting mixed work");
    function_a();
    function_b();
    function_c();
    function_mixed();
    println!("Thread: mixed work done");
    drop(_guard);
    publish_and_cleanup_current_thread();
}

fn thread_worker_shared(thread_num: u64) {
    for _ in 0..(thread_num + 1) {
        function_a();
        function_cpu_heavy();
    }
    publish_and_cleanup_current_thread();
}

/// Runs the single-threaded demo sequence and returns the current-thread
/// flat report.
pub fn run_single_threaded_tests() -> String {
    println!("\n{}", "=".repeat(40));
    println!("Single-threaded Tests");
    println!("{}", "=".repeat(40));

    for _ in 0..3 {
        let _guard = profile_scope!("main_loop");
        function_a();
        function_b();
        function_c();
        for i in 0..1_000_000u64 {
            std::hint::black_box(i);
        }
    }

    println!("Running CPU-heavy test...");
    function_cpu_heavy();

    println!("Running I/O-heavy test...");
    function_io_heavy();

    println!("Running syscall-heavy test (100k calls)...");
    function_syscall_heavy();

    println!("Running sleep test (100ms sleep - should show wait time)...");
    function_sleep_test();

    println!("Running mixed workload test (CPU + I/O + Sleep)...");
    function_mixed();

    print_current_thread_report()
}

/// Spawns four threads, each calling the same function names, so their
/// published snapshots overlap in the global registry (spec §6).
pub fn run_shared_function_test() {
    println!("\n{}", "=".repeat(40));
    println!("Shared Function Test");
    println!("{}", "=".repeat(40));
    println!("Testing multiple threads calling same functions...\n");

    let handles: Vec<_> = (0..4)
        .map(|i| thread::spawn(move || thread_worker_shared(i + 1)))
        .collect();
    for handle in handles {
        let _ = handle.join();
    }

    println!("All threads completed!");
}

/// Spawns four threads with distinct call trees (spec §6).
pub fn run_multi_threaded_tests() {
    println!("\n{}", "=".repeat(40));
    println!("Multi-threaded Tests");
    println!("{}", "=".repeat(40));
    println!("Creating 4 threads with different workloads...\n");

    let workers: Vec<fn()> = vec![thread_worker_cpu, thread_worker_io, thread_worker_sleep, thread_worker_mixed];
    let handles: Vec<_> = workers.into_iter().map(|f| thread::spawn(f)).collect();
    for handle in handles {
        let _ = handle.join();
    }

    println!("\n{}", "=".repeat(40));
    println!("All threads completed!");
    println!("{}", "=".repeat(40));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn single_threaded_run_produces_nonempty_report() {
        let report = run_single_threaded_tests();
        assert!(report.contains("function_a"));
        assert!(report.contains("main_loop"));
    }

    #[test]
    fn shared_function_test_publishes_one_snapshot_per_thread() {
        let before = registry::snapshot_count();
        run_shared_function_test();
        assert_eq!(registry::snapshot_count(), before + 4);
    }
}
