//! DOT call-graph export (spec §4.5): one file per mode, `dot -Tpng` ready.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{ProfilerError, Result};
use crate::registry::{self, MAX_GLOBAL_FUNCTIONS};
use crate::report::color_for_percentage;

/// Caps the number of distinct merged edges rendered, matching the
/// original's fixed 10,000-entry edge table. Overflow is logged once rather
/// than silently dropped (resolved Open Question, `SPEC_FULL.md` §D.3).
const MAX_MERGED_EDGES: usize = 10_000;

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|source| ProfilerError::DotFileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes one DOT file with a subgraph cluster per published thread
/// snapshot, nodes named `T<tid>_<function>` so identically named functions
/// in different threads don't collide (spec §4.5).
pub fn export_dot_per_thread(path: &Path) -> Result<()> {
    let mut out = String::new();
    let _ = writeln!(out, "digraph CallGraph {{");
    let _ = writeln!(out, "    rankdir=LR;");
    let _ = writeln!(out, "    node [shape=box, style=filled];\n");

    let total_self_time_us: u64 = registry::with_snapshots(|snapshots| {
        snapshots
            .iter()
            .flat_map(|s| s.functions.iter())
            .map(|(_, r)| r.sampling_ticks_us)
            .sum()
    });

    registry::with_snapshots(|snapshots| {
        for snapshot in snapshots {
            let _ = writeln!(out, "    // Thread {}", snapshot.thread_id);
            let _ = writeln!(out, "    subgraph cluster_{} {{", snapshot.thread_id);
            let _ = writeln!(out, "        label=\"Thread {}\";", snapshot.thread_id);
            let _ = writeln!(out, "        style=dashed;");
            for (name, record) in snapshot.functions.iter() {
                if record.call_count == 0 {
                    continue;
                }
                let self_time_us = record.sampling_ticks_us;
                let percent = if total_self_time_us > 0 {
                    self_time_us as f64 * 100.0 / total_self_time_us as f64
                } else {
                    0.0
                };
                let color = color_for_percentage(percent);
                let _ = writeln!(
                    out,
                    "        \"T{}_{}\" [label=\"{}\\n{:.1}%\\n{} calls\", fillcolor=\"{}\"];",
                    snapshot.thread_id, name, name, percent, record.call_count, color
                );
            }
            let _ = writeln!(out, "    }}\n");
        }

        let _ = writeln!(out, "    // Call relationships");
        for snapshot in snapshots {
            for (caller, callee, count) in snapshot.callers.iter_edges() {
                if count == 0 {
                    continue;
                }
                let _ = writeln!(
                    out,
                    "    \"T{}_{}\" -> \"T{}_{}\" [label=\"{}\"];",
                    snapshot.thread_id, caller, snapshot.thread_id, callee, count
                );
            }
        }
    });

    let _ = writeln!(out, "}}");
    write_file(path, &out)?;
    log::info!("call graph exported to {}", path.display());
    Ok(())
}

struct MergedFunction {
    name: String,
    self_time_us: u64,
    call_count: u64,
    thread_count: u32,
}

/// Writes one DOT file aggregating every published snapshot into shared
/// nodes keyed purely by function name and deduplicated edges (spec §4.5).
pub fn export_dot_merged(path: &Path) -> Result<()> {
    let mut out = String::new();
    let _ = writeln!(out, "digraph MergedCallGraph {{");
    let _ = writeln!(out, "    rankdir=LR;");
    let _ = writeln!(out, "    node [shape=box, style=filled];\n");

    let names = registry::global_names();
    let mut merged: Vec<MergedFunction> = names
        .iter()
        .take(MAX_GLOBAL_FUNCTIONS)
        .map(|n| MergedFunction {
            name: n.to_string(),
            self_time_us: 0,
            call_count: 0,
            thread_count: 0,
        })
        .collect();

    let mut edges: Vec<(String, String, u64)> = Vec::new();
    let mut dropped_edges = 0usize;

    registry::with_snapshots(|snapshots| {
        for snapshot in snapshots {
            for (fname, record) in snapshot.functions.iter() {
                if record.call_count == 0 {
                    continue;
                }
                if let Some(row) = merged.iter_mut().find(|r| r.name == fname.as_str()) {
                    row.self_time_us += record.sampling_ticks_us;
                    row.call_count += record.call_count;
                    row.thread_count += 1;
                }
            }
            for (caller, callee, count) in snapshot.callers.iter_edges() {
                if count == 0 {
                    continue;
                }
                if let Some(existing) = edges
                    .iter_mut()
                    .find(|(c, ce, _)| c == caller.as_str() && ce == callee.as_str())
                {
                    existing.2 += count;
                } else if edges.len() < MAX_MERGED_EDGES {
                    edges.push((caller.to_string(), callee.to_string(), count));
                } else {
                    dropped_edges += 1;
                }
            }
        }
    });

    let total_self_time_us: u64 = merged.iter().map(|m| m.self_time_us).sum();

    let _ = writeln!(out, "    // Functions (merged from all threads)");
    for row in merged.iter().filter(|r| r.call_count > 0) {
        let percent = if total_self_time_us > 0 {
            row.self_time_us as f64 * 100.0 / total_self_time_us as f64
        } else {
            0.0
        };
        let color = color_for_percentage(percent);
        let _ = writeln!(
            out,
            "    \"{}\" [label=\"{}\\n{:.1}%\\n{} calls\\n{} threads\", fillcolor=\"{}\"];",
            row.name, row.name, percent, row.call_count, row.thread_count, color
        );
    }

    let _ = writeln!(out, "\n    // Call relationships");
    for (caller, callee, count) in &edges {
        let _ = writeln!(out, "    \"{caller}\" -> \"{callee}\" [label=\"{count}\"];");
    }

    let _ = writeln!(out, "}}");
    write_file(path, &out)?;

    if dropped_edges > 0 {
        log::warn!("merged call graph export dropped {dropped_edges} edges past the {MAX_MERGED_EDGES}-edge cap");
    }
    log::info!("merged call graph exported to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn per_thread_export_writes_digraph_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("callgraph.dot");
        export_dot_per_thread(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("digraph CallGraph {"));
        assert!(contents.trim_end().ends_with('}'));
    }

    #[test]
    fn merged_export_writes_digraph_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("callgraph_merged.dot");
        export_dot_merged(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("digraph MergedCallGraph {"));
    }
}
