//! End-to-end scenarios S1-S6 from spec.md §8, driven through the public
//! instrumentation/registry/gmon/symbols surface rather than internal
//! fields, the way a consuming program would use this crate.

use std::thread;
use std::time::Duration;

use scopeprof::instrumentation::{
    enter, leave, publish_and_cleanup_current_thread, register, with_caller_graph, with_call_stack,
    with_function_map,
};
use scopeprof::report::flat::print_merged_report;
use scopeprof::{gmon, registry, symbols};

/// S1 - Call-count fidelity: one thread, one function, 100 calls, no
/// sampling.
#[test]
fn s1_call_count_fidelity() {
    let f = register("s1_f");
    for _ in 0..100 {
        enter(f);
        leave(f);
    }

    let _ = with_function_map(|functions| {
        let record = functions.find(&f).unwrap();
        assert_eq!(record.call_count, 100);
        assert!(!record.active);
    });
    with_call_stack(|stack| assert_eq!(stack.depth(), 0));
    assert!(registry::global_names().iter().any(|n| n.as_str() == "s1_f"));
}

/// S2 - Caller edge: b called 3 times inside one a invocation.
#[test]
fn s2_caller_edge() {
    let a = register("s2_a");
    let b = register("s2_b");

    enter(a);
    for _ in 0..3 {
        enter(b);
        leave(b);
    }
    leave(a);

    let _ = with_caller_graph(|graph| {
        assert_eq!(graph.edge_count(&a, &b), 3);
        assert_eq!(graph.edge_count(&b, &a), 0);
    });
    with_call_stack(|stack| assert_eq!(stack.depth(), 0));
}

/// S3 - Wait accounting: a function that sleeps ~100ms with negligible CPU
/// time accrues wall >= 100ms and non-negative wait.
#[test]
fn s3_wait_accounting() {
    let f = register("s3_sleeper");
    enter(f);
    thread::sleep(Duration::from_millis(100));
    leave(f);

    let _ = with_function_map(|functions| {
        let record = functions.find(&f).unwrap();
        assert!(record.wall_time_us >= 100_000);
        let expected_wait = record
            .wall_time_us
            .saturating_sub(record.user_time_us + record.kernel_time_us);
        assert_eq!(record.wait_time_us, expected_wait);
    });
}

/// S4 - Merge across threads: four threads each call `g` once; after
/// publish the merged report shows calls=4, threads=4.
#[test]
fn s4_merge_across_threads() {
    let snapshots_before = registry::snapshot_count();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| {
                let g = register("s4_g");
                enter(g);
                leave(g);
                publish_and_cleanup_current_thread();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(registry::snapshot_count(), snapshots_before + 4);

    let mut total_calls = 0u64;
    let mut touching_snapshots = 0u32;
    registry::with_snapshots(|snapshots| {
        for snapshot in snapshots {
            if let Some(record) = snapshot.functions.find(&scopeprof::name::FunctionName::new("s4_g")) {
                if record.call_count > 0 {
                    total_calls += record.call_count;
                    touching_snapshots += 1;
                }
            }
        }
    });
    assert_eq!(total_calls, 4);
    assert_eq!(touching_snapshots, 4);

    let report = print_merged_report();
    assert!(report.contains("s4_g"));
}

/// S5 - gmon.out emission: two functions with known addresses and known
/// sampling-tick totals produce the expected header and histogram sum.
#[test]
fn s5_gmon_emission() {
    let f1 = register("s5_f1");
    let f2 = register("s5_f2");
    enter(f1);
    leave(f1);
    enter(f2);
    leave(f2);

    const LOW: usize = 0x10000;
    const HIGH: usize = 0x20000;
    let _ = with_function_map(|functions| {
        let r1 = functions.find_mut(&f1).unwrap();
        r1.addr = Some(LOW);
        r1.sampling_ticks_us = 50_000;

        let r2 = functions.find_mut(&f2).unwrap();
        r2.addr = Some(HIGH);
        r2.sampling_ticks_us = 20_000;
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gmon.out");
    gmon::export_gmon(&path, false, scopeprof::DEFAULT_INTERVAL).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], b"gmon");
    assert_eq!(u32::from_ne_bytes(bytes[4..8].try_into().unwrap()), 1);
    assert_eq!(bytes[20], 0); // TAG_TIME_HIST

    let ptr_size = std::mem::size_of::<usize>();
    let mut offset = 21;
    let low_pc = usize::from_ne_bytes(bytes[offset..offset + ptr_size].try_into().unwrap());
    offset += ptr_size;
    let high_pc = usize::from_ne_bytes(bytes[offset..offset + ptr_size].try_into().unwrap());
    offset += ptr_size;
    let bin_count = u32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
    offset += 4;

    // low_pc/high_pc only reflect this function map's two addresses when no
    // other test on this thread left behind an addressed record; assert the
    // range at least covers [LOW, HIGH + 4096].
    assert!(low_pc <= LOW);
    assert!(high_pc >= HIGH + 4096);

    // Skip sampling-rate(4) + dimension(15) + abbrev(1) to reach the bins.
    offset += 4 + 15 + 1;
    let mut sum = 0u64;
    for _ in 0..bin_count {
        let bin = u16::from_ne_bytes(bytes[offset..offset + 2].try_into().unwrap());
        sum += bin as u64;
        offset += 2;
    }
    // 50_000us/10_000 + 20_000us/10_000 = 5 + 2 = 7, unless saturation
    // clamps a bin (not possible at this scale).
    assert_eq!(sum, 7);
}

/// S6 - Symbol resolution mismatch: the captured address for `foo` falls
/// inside a differently named symbol's range; the cross-report flags it.
#[test]
fn s6_symbol_resolution_mismatch() {
    let sysmap = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(
        sysmap.path(),
        "0000000000001000 t foo.part.0\n0000000000002000 T unrelated_fn\n",
    )
    .unwrap();

    let table = symbols::load_sysmap_symbols(sysmap.path()).unwrap();

    let rows = symbols::cross_report(&[("foo".to_string(), Some(0x1500))], Some(&table));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status(), "MISMATCH");
    assert_eq!(rows[0].resolved.as_ref().unwrap().name, "foo.part.0");

    // An unrelated lookup a safe distance away from the ambiguous entry is
    // unaffected.
    let unrelated_rows = symbols::cross_report(&[("unrelated_fn".to_string(), Some(0x2100))], Some(&table));
    assert_eq!(unrelated_rows[0].status(), "OK");
}
