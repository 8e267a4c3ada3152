//! CLI surface for the demo binary (spec §6), implemented with `clap`
//! derive in the style of `examples/mstange-samply/samply/src/cli.rs`
//! rather than the hand-rolled `argv` scan of
//! `examples/original_source/src/main.c`'s `parse_args`. Every flag named
//! there is preserved.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportMode {
    PerThread,
    Merged,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DotMode {
    PerThread,
    Merged,
}

/// An in-process function-level profiler with gmon.out and symbol-table
/// export, demonstrated here against a small set of synthetic workloads.
#[derive(Debug, Parser)]
#[command(name = "scopeprof", version, about)]
pub struct Opt {
    /// Run the multi-threaded demo (four threads, distinct call trees).
    #[arg(long)]
    pub multi_threaded: bool,

    /// Run the shared-function demo; multiple threads call the same names.
    /// Implies --multi-threaded.
    #[arg(long)]
    pub shared_test: bool,

    /// Report mode for the textual profile.
    #[arg(long, value_enum, default_value = "per-thread")]
    pub report_mode: ReportMode,

    /// Export the call graph to Graphviz DOT format.
    #[arg(long)]
    pub export_dot: bool,

    /// DOT export mode.
    #[arg(long, value_enum, default_value = "merged")]
    pub dot_mode: DotMode,

    /// Export a gmon.out binary file for gprof analysis.
    #[arg(long)]
    pub export_gmon: bool,

    /// Resolve captured addresses via an ELF .symtab or a System.map file.
    /// With no value, resolves against this process's own binary.
    #[arg(long, num_args = 0..=1, default_missing_value = "/proc/self/exe")]
    pub resolve_symbols: Option<PathBuf>,

    /// Treat the --resolve-symbols path as a System.map-style text listing.
    #[arg(long)]
    pub sysmap: bool,
}

impl Opt {
    pub fn wants_multi_threaded(&self) -> bool {
        self.multi_threaded || self.shared_test
    }
}
