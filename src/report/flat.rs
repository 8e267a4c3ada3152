//! Flat per-function tables and caller listings (spec §4.5; the callers
//! section is the supplemented feature described in `SPEC_FULL.md` §C.1).

use std::fmt::Write as _;

use crate::call_graph::CallGraph;
use crate::hash::ChainedMap;
use crate::instrumentation::{current_thread_id, with_caller_graph, with_function_map};
use crate::record::FunctionRecord;
use crate::registry::{self, MAX_GLOBAL_FUNCTIONS};

const HEADER: &str = "Function                      Calls      Total(ms)  Self(ms)   User(s)    Sys(s)     Wait(s)    Self%      Total/call";
const RULE: &str = "------------------------------------------------------------------------------------------------------------------------------------------";

fn render_flat_table(out: &mut String, functions: &ChainedMap<FunctionRecord>) {
    let total_self_time_us: u64 = functions.iter().map(|(_, r)| r.sampling_ticks_us).sum();

    let _ = writeln!(out, "{HEADER}");
    let _ = writeln!(out, "{RULE}");
    for (name, record) in functions.iter() {
        if record.call_count == 0 {
            continue;
        }
        let self_time_us = record.sampling_ticks_us;
        let total_ms = record.wall_time_us as f64 / 1000.0;
        let self_ms = self_time_us as f64 / 1000.0;
        let user_s = record.user_time_us as f64 / 1_000_000.0;
        let sys_s = record.kernel_time_us as f64 / 1_000_000.0;
        let wait_s = record.wait_time_us as f64 / 1_000_000.0;
        let self_percent = if total_self_time_us > 0 {
            self_time_us as f64 * 100.0 / total_self_time_us as f64
        } else {
            0.0
        };
        let avg_total = if record.call_count > 0 { total_ms / record.call_count as f64 } else { 0.0 };
        let _ = writeln!(
            out,
            "{:<30} {:>10} {:>10.2} {:>10.2} {:>10.4} {:>10.4} {:>10.4} {:>9.2}% {:>10.3}",
            name, record.call_count, total_ms, self_ms, user_s, sys_s, wait_s, self_percent, avg_total
        );
    }
    let _ = writeln!(out, "{RULE}");
}

fn render_callers_section(out: &mut String, functions: &ChainedMap<FunctionRecord>, callers: &CallGraph) {
    let _ = writeln!(out, "\n--- Callers (counts) ---");
    for (callee, record) in functions.iter() {
        if record.call_count == 0 {
            continue;
        }
        let _ = write!(out, "{callee:<30} <- ");
        let mut has_caller = false;
        for (caller, count) in callers.callers_of(callee) {
            has_caller = true;
            let _ = write!(out, "{caller}({count}) ");
        }
        if !has_caller {
            let _ = write!(out, "[none]");
        }
        let _ = writeln!(out);
    }
}

/// Renders the live calling thread's flat profile and caller section
/// directly from its thread-local tables; no snapshot is required
/// (`SPEC_FULL.md` §C.2 — single-threaded / live mode).
pub fn print_current_thread_report() -> String {
    let mut out = String::new();
    let rendered = with_function_map(|functions| {
        let _ = writeln!(out, "\n=== Profiling Results (Thread {}) ===", current_thread_id());
        render_flat_table(&mut out, functions);
        let _ = with_caller_graph(|callers| render_callers_section(&mut out, functions, callers));
    });
    if rendered.is_none() {
        let _ = writeln!(out, "(no profiling data for this thread)");
    }
    out
}

/// Renders one published snapshot's flat profile and callers section.
pub fn print_thread_report(snapshot: &registry::ThreadSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Thread {} Report ===", snapshot.thread_id);
    render_flat_table(&mut out, &snapshot.functions);
    render_callers_section(&mut out, &snapshot.functions, &snapshot.callers);
    out
}

/// Renders every published snapshot, one after another.
pub fn print_per_thread_reports() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", "=".repeat(80));
    let _ = writeln!(out, "Per-Thread Profiling Reports");
    let _ = writeln!(out, "{}", "=".repeat(80));
    registry::with_snapshots(|snapshots| {
        let _ = writeln!(out, "Total threads: {}", snapshots.len());
        for snapshot in snapshots {
            out.push_str(&print_thread_report(snapshot));
        }
    });
    out
}

struct MergedRow {
    name: String,
    total_time_us: u64,
    user_time_us: u64,
    kernel_time_us: u64,
    wait_time_us: u64,
    call_count: u64,
    thread_count: u32,
}

/// Aggregates every published snapshot's per-function statistics into one
/// row per globally registered name, in registration order (spec §4.5,
/// "Merged report").
pub fn print_merged_report() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", "=".repeat(80));
    let _ = writeln!(out, "Merged Profiling Report (All Threads)");
    let _ = writeln!(out, "{}", "=".repeat(80));

    let thread_count = registry::snapshot_count();
    let _ = writeln!(out, "Total threads: {thread_count}");
    if thread_count == 0 {
        let _ = writeln!(out, "No thread data collected.");
        return out;
    }

    let names = registry::global_names();
    let mut merged: Vec<MergedRow> = names
        .iter()
        .take(MAX_GLOBAL_FUNCTIONS)
        .map(|name| MergedRow {
            name: name.to_string(),
            total_time_us: 0,
            user_time_us: 0,
            kernel_time_us: 0,
            wait_time_us: 0,
            call_count: 0,
            thread_count: 0,
        })
        .collect();

    registry::with_snapshots(|snapshots| {
        for snapshot in snapshots {
            for (fname, record) in snapshot.functions.iter() {
                if record.call_count == 0 {
                    continue;
                }
                if let Some(row) = merged.iter_mut().find(|r| r.name == fname.as_str()) {
                    row.total_time_us += record.wall_time_us;
                    row.user_time_us += record.user_time_us;
                    row.kernel_time_us += record.kernel_time_us;
                    row.wait_time_us += record.wait_time_us;
                    row.call_count += record.call_count;
                    row.thread_count += 1;
                }
            }
        }
    });

    let _ = writeln!(
        out,
        "\n{:<30} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Function", "Calls", "Threads", "Total(ms)", "User(s)", "Sys(s)", "Wait(s)", "Avg/call", "Total/call"
    );
    let _ = writeln!(out, "{RULE}");

    for row in merged.iter().filter(|r| r.call_count > 0) {
        let total_ms = row.total_time_us as f64 / 1000.0;
        let user_s = row.user_time_us as f64 / 1_000_000.0;
        let sys_s = row.kernel_time_us as f64 / 1_000_000.0;
        let wait_s = row.wait_time_us as f64 / 1_000_000.0;
        let avg_per_call = total_ms / row.call_count as f64;
        let _ = writeln!(
            out,
            "{:<30} {:>10} {:>10} {:>10.2} {:>10.4} {:>10.4} {:>10.4} {:>10.3} {:>10.3}",
            row.name, row.call_count, row.thread_count, total_ms, user_s, sys_s, wait_s, avg_per_call, avg_per_call
        );
    }
    let _ = writeln!(out, "{RULE}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrumentation::{enter, leave, register};

    #[test]
    fn current_thread_report_lists_called_functions() {
        let token = register("flat_report_test_fn");
        enter(token);
        leave(token);
        let report = print_current_thread_report();
        assert!(report.contains("flat_report_test_fn"));
        assert!(report.contains("Callers"));
    }

    #[test]
    fn callers_section_marks_uncalled_functions_as_none() {
        let a = register("flat_report_caller_a");
        let b = register("flat_report_caller_b");
        enter(a);
        enter(b);
        leave(b);
        leave(a);
        let report = print_current_thread_report();
        assert!(report.contains("flat_report_caller_b <- flat_report_caller_a(1)"));
    }
}
