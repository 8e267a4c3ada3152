//! Demo binary: parses the CLI surface, runs the selected workload set
//! under the sampling profiler, and emits the requested reports/exports
//! (spec §6), mirroring `examples/original_source/src/main.c`'s `main()`.

use std::path::PathBuf;

use clap::Parser;

use scopeprof::instrumentation::publish_and_cleanup_current_thread;
use scopeprof::report::{dot, flat};
use scopeprof::{gmon, registry, symbols};

mod cli;
use cli::{DotMode, Opt, ReportMode};

fn run_selected_workload(opt: &Opt) {
    if opt.shared_test {
        scopeprof::workloads::run_shared_function_test();
    } else if opt.multi_threaded {
        scopeprof::workloads::run_multi_threaded_tests();
    } else {
        let report = scopeprof::workloads::run_single_threaded_tests();
        print!("{report}");
    }
}

fn emit_reports(opt: &Opt) {
    match opt.report_mode {
        ReportMode::PerThread => print!("{}", flat::print_per_thread_reports()),
        ReportMode::Merged => print!("{}", flat::print_merged_report()),
        ReportMode::Both => {
            print!("{}", flat::print_per_thread_reports());
            print!("{}", flat::print_merged_report());
        }
    }
}

fn maybe_export_dot(opt: &Opt) {
    if !opt.export_dot {
        return;
    }
    println!("\n{}", "=".repeat(80));
    println!("Exporting Call Graph");
    println!("{}", "=".repeat(80));

    let result = match opt.dot_mode {
        DotMode::PerThread => dot::export_dot_per_thread(&PathBuf::from("callgraph_per_thread.dot")),
        DotMode::Merged => dot::export_dot_merged(&PathBuf::from("callgraph_merged.dot")),
    };
    if let Err(e) = result {
        log::error!("DOT export failed: {e}");
    }
}

fn maybe_export_gmon(opt: &Opt, merged: bool) {
    if !opt.export_gmon {
        return;
    }
    println!("\n{}", "=".repeat(80));
    println!(
        "Exporting gmon.out ({} mode)",
        if merged { "merged" } else { "single-threaded" }
    );
    println!("{}", "=".repeat(80));
    if let Err(e) = gmon::export_gmon_default_interval(&PathBuf::from("gmon.out"), merged) {
        log::error!("gmon.out export failed: {e}");
    }
}

fn maybe_print_symbol_report(opt: &Opt) {
    let Some(path) = &opt.resolve_symbols else {
        return;
    };
    let Some(table) = symbols::load_symbol_table(path, opt.sysmap) else {
        return;
    };

    let functions: Vec<(String, Option<usize>)> = if opt.wants_multi_threaded() {
        let names = registry::global_names();
        let mut merged: Vec<(String, Option<usize>)> = names.iter().map(|n| (n.to_string(), None)).collect();
        registry::with_snapshots(|snapshots| {
            for snapshot in snapshots {
                for (name, record) in snapshot.functions.iter() {
                    if let Some(entry) = merged.iter_mut().find(|(n, _)| n == name.as_str()) {
                        if entry.1.is_none() {
                            entry.1 = record.addr;
                        }
                    }
                }
            }
        });
        merged
    } else {
        let mut rows = Vec::new();
        let _ = scopeprof::instrumentation::with_function_map(|functions| {
            for (name, record) in functions.iter() {
                rows.push((name.to_string(), record.addr));
            }
        });
        rows
    };

    let rows = symbols::cross_report(&functions, Some(&table));
    println!("\n{}", "=".repeat(80));
    println!("ELF Symbol Resolution Report");
    println!("{}", "=".repeat(80));
    println!("{:<40} {:<18} {:<18} {}", "Function (profiler)", "Profiler Addr", "ELF Addr", "Match?");
    for row in &rows {
        let profiler_addr = row.captured_addr.map(|a| format!("{a:#018x}")).unwrap_or_else(|| "(none)".to_string());
        let elf_addr = row.resolved.as_ref().map(|s| format!("{:#018x}", s.addr)).unwrap_or_else(|| "(none)".to_string());
        let elf_name = row.resolved.as_ref().map(|s| s.name.as_str()).unwrap_or("(not found)");
        println!("{:<40} {:<18} {:<18} {} ({})", row.name, profiler_addr, elf_addr, row.status(), elf_name);
    }
    let matched = rows.iter().filter(|r| r.status() == "OK").count();
    println!("\nSummary: {matched}/{} functions matched ELF symbols", rows.len());

    println!("\n--- All Loaded Function Symbols ---");
    println!("{:<18} {:<10} {}", "Address", "Size", "Name");
    for symbol in table.iter() {
        println!("{:#018x} {:<10} {}", symbol.addr, symbol.size, symbol.name);
    }
}

fn main() {
    env_logger::init();

    let opt = Opt::parse();

    println!("{}", "=".repeat(46));
    println!("scopeprof - Multi-threaded Profiler Demo");
    println!("{}", "=".repeat(46));

    let sampler = scopeprof::start_profiling(scopeprof::DEFAULT_INTERVAL);
    run_selected_workload(&opt);
    scopeprof::stop_profiling(&sampler);

    if opt.wants_multi_threaded() {
        publish_and_cleanup_current_thread();
        emit_reports(&opt);
        maybe_export_dot(&opt);
        maybe_export_gmon(&opt, true);
        maybe_print_symbol_report(&opt);
        registry::cleanup_snapshots();
    } else {
        maybe_print_symbol_report(&opt);
        maybe_export_gmon(&opt, false);
    }

    println!("\nProfiling stopped.");
}
