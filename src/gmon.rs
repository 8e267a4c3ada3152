//! `gmon.out` binary writer (spec §4.6, component C9).
//!
//! Layout: a 20-byte header, one histogram record, then zero or more call
//! arc records, all multi-byte values in host byte order at host pointer
//! width — written with `to_ne_bytes()` rather than an explicit-endianness
//! crate, since "host order" is exactly what native byte order already is.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::{ProfilerError, Result};
use crate::instrumentation::{current_thread_id, with_caller_graph, with_function_map};
use crate::record::FunctionRecord;
use crate::registry;
use crate::sampler::DEFAULT_INTERVAL;

const GMON_MAGIC: &[u8; 4] = b"gmon";
const GMON_VERSION: u32 = 1;
const TAG_TIME_HIST: u8 = 0;
const TAG_CG_ARC: u8 = 1;
const MAX_BINS: usize = 65_536;
const TAIL_PAD: usize = 4096;

struct AddressedFunction {
    addr: usize,
    sampling_ticks_us: u64,
}

fn collect_addressed(merged: bool) -> Vec<AddressedFunction> {
    let mut out = Vec::new();
    let mut push_record = |record: &FunctionRecord| {
        if let Some(addr) = record.addr {
            out.push(AddressedFunction {
                addr,
                sampling_ticks_us: record.sampling_ticks_us,
            });
        }
    };
    if merged {
        registry::with_snapshots(|snapshots| {
            for snapshot in snapshots {
                for (_, record) in snapshot.functions.iter() {
                    push_record(record);
                }
            }
        });
    } else {
        let _ = with_function_map(|functions| {
            for (_, record) in functions.iter() {
                push_record(record);
            }
        });
    }
    out
}

struct CallerArc {
    from_pc: usize,
    to_pc: usize,
    count: u64,
}

fn collect_arcs(merged: bool) -> Vec<CallerArc> {
    let mut out = Vec::new();
    if merged {
        registry::with_snapshots(|snapshots| {
            for snapshot in snapshots {
                for (caller, callee, count) in snapshot.callers.iter_edges() {
                    if count == 0 {
                        continue;
                    }
                    let from_pc = snapshot.functions.find(caller).and_then(|r| r.addr);
                    let to_pc = snapshot.functions.find(callee).and_then(|r| r.addr);
                    if let (Some(from_pc), Some(to_pc)) = (from_pc, to_pc) {
                        out.push(CallerArc { from_pc, to_pc, count });
                    }
                }
            }
        });
    } else {
        let _ = with_function_map(|functions| {
            let _ = with_caller_graph(|graph| {
                for (caller, callee, count) in graph.iter_edges() {
                    if count == 0 {
                        continue;
                    }
                    let from_pc = functions.find(caller).and_then(|r| r.addr);
                    let to_pc = functions.find(callee).and_then(|r| r.addr);
                    if let (Some(from_pc), Some(to_pc)) = (from_pc, to_pc) {
                        out.push(CallerArc { from_pc, to_pc, count });
                    }
                }
            });
        });
    }
    out
}

fn write_ptr(w: &mut impl Write, value: usize) -> io::Result<()> {
    w.write_all(&value.to_ne_bytes())
}

/// Writes a `gmon.out`-compatible file to `path`.
///
/// `merged=true` iterates the snapshot registry under its lock; `merged=false`
/// iterates the calling thread's live tables without locking (spec §4.6,
/// "Mode selection"). `interval` controls the bin-credit divisor (resolved
/// Open Question D.1); pass [`DEFAULT_INTERVAL`] unless the sampler was
/// started with a different period.
pub fn export_gmon(path: &Path, merged: bool, interval: Duration) -> Result<()> {
    let addressed = collect_addressed(merged);

    let low_pc = addressed.iter().map(|f| f.addr).min();
    let high_pc = addressed.iter().map(|f| f.addr).max();
    let (low_pc, high_pc) = match (low_pc, high_pc) {
        (Some(lo), Some(hi)) if hi >= lo => (lo, hi),
        _ => return Err(ProfilerError::NoKnownAddresses),
    };
    let high_pc = high_pc + TAIL_PAD;

    let addr_range = high_pc - low_pc;
    let bin_bytes = 2usize;
    let mut bin_count = (addr_range / bin_bytes).clamp(1, MAX_BINS);
    if bin_count == 0 {
        bin_count = 1;
    }
    let bin_width = addr_range as f64 / bin_count as f64;

    let mut histogram = vec![0u16; bin_count];
    let interval_us = interval.as_micros().max(1) as u64;
    for f in &addressed {
        if f.sampling_ticks_us == 0 {
            continue;
        }
        let bin = (((f.addr - low_pc) as f64) / bin_width) as usize;
        let bin = bin.min(bin_count - 1);
        let samples = (f.sampling_ticks_us / interval_us).min(u16::MAX as u64) as u16;
        histogram[bin] = histogram[bin].saturating_add(samples);
    }

    let file = File::create(path).map_err(|source| ProfilerError::GmonFileCreate {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    let result = (|| -> io::Result<()> {
        writer.write_all(GMON_MAGIC)?;
        writer.write_all(&GMON_VERSION.to_ne_bytes())?;
        writer.write_all(&[0u8; 12])?;

        writer.write_all(&[TAG_TIME_HIST])?;
        write_ptr(&mut writer, low_pc)?;
        write_ptr(&mut writer, high_pc)?;
        writer.write_all(&(bin_count as u32).to_ne_bytes())?;
        let prof_rate = (1_000_000u64 / interval_us.max(1)) as u32;
        writer.write_all(&prof_rate.to_ne_bytes())?;
        let mut dimen = [b' '; 15];
        dimen[..7].copy_from_slice(b"seconds");
        writer.write_all(&dimen)?;
        writer.write_all(b"s")?;
        for bin in &histogram {
            writer.write_all(&bin.to_ne_bytes())?;
        }

        for arc in collect_arcs(merged) {
            let count = arc.count.min(u32::MAX as u64) as u32;
            writer.write_all(&[TAG_CG_ARC])?;
            write_ptr(&mut writer, arc.from_pc)?;
            write_ptr(&mut writer, arc.to_pc)?;
            writer.write_all(&count.to_ne_bytes())?;
        }

        writer.flush()
    })();

    result.map_err(|source| ProfilerError::GmonFileWrite {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!(
        "gmon.out exported to {} ({} mode, thread {})",
        path.display(),
        if merged { "merged" } else { "single-threaded" },
        current_thread_id(),
    );
    Ok(())
}

/// Convenience wrapper using the default 10ms sampling interval.
pub fn export_gmon_default_interval(path: &Path, merged: bool) -> Result<()> {
    export_gmon(path, merged, DEFAULT_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrumentation::{enter, leave, register};
    use tempfile::tempdir;

    #[test]
    fn emission_fails_without_known_addresses() {
        // A thread with no instrumentation at all has no live function map,
        // so the collector sees zero addressed functions.
        let dir = tempdir().unwrap();
        let path = dir.path().join("gmon.out");
        // Ensure this thread has no function map by construction of a
        // throwaway OS thread.
        let result = std::thread::spawn(move || export_gmon(&path, false, DEFAULT_INTERVAL))
            .join()
            .unwrap();
        assert!(matches!(result, Err(ProfilerError::NoKnownAddresses)));
    }

    #[test]
    fn header_and_histogram_sum_match_expected() {
        let token = register("gmon_test_function");
        enter(token);
        leave(token);
        let _ = with_function_map(|functions| {
            let record = functions.find_mut(&token).unwrap();
            record.addr = Some(0x1000);
            record.sampling_ticks_us = 50_000;
        });

        let dir = tempdir().unwrap();
        let path = dir.path().join("gmon.out");
        export_gmon(&path, false, DEFAULT_INTERVAL).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], GMON_MAGIC);
        assert_eq!(u32::from_ne_bytes(bytes[4..8].try_into().unwrap()), 1);
        assert_eq!(bytes[20], TAG_TIME_HIST);
    }
}
