//! Quantified invariants from spec.md §8 not already pinned down by the
//! S1-S6 scenarios in `tests/scenarios.rs`.

use std::thread;

use scopeprof::instrumentation::{enter, leave, register, with_call_stack};
use scopeprof::registry;

/// Property 1 (spec §8): `wait_time = max(0, wall - user - kernel)` after
/// every `leave`, even across many repeated enter/leave pairs.
#[test]
fn wait_time_identity_holds_after_every_leave() {
    let f = register("prop_wait_identity");
    for _ in 0..20 {
        enter(f);
        leave(f);
    }
    let _ = scopeprof::instrumentation::with_function_map(|functions| {
        let record = functions.find(&f).unwrap();
        let expected = record.wall_time_us.saturating_sub(record.user_time_us + record.kernel_time_us);
        assert_eq!(record.wait_time_us, expected);
    });
}

/// Property 2 (spec §8): call-stack depth after a matched enter+leave pair
/// equals the depth before it, including nested pairs.
#[test]
fn call_stack_depth_is_preserved_across_nesting() {
    let outer = register("prop_stack_outer");
    let inner = register("prop_stack_inner");

    let before = with_call_stack(|s| s.depth());
    enter(outer);
    enter(inner);
    leave(inner);
    leave(outer);
    let after = with_call_stack(|s| s.depth());
    assert_eq!(before, after);
}

/// Round-trip idempotence (spec §8): `register(name)` called N times on one
/// thread produces exactly one live record and at most one global-registry
/// insertion.
#[test]
fn register_idempotence_across_many_calls() {
    let before = registry::global_names().len();
    let mut token = None;
    for _ in 0..50 {
        let t = register("prop_register_idempotent");
        if let Some(prev) = token {
            assert_eq!(prev, t);
        }
        token = Some(t);
    }
    let after = registry::global_names();
    let occurrences = after.iter().filter(|n| n.as_str() == "prop_register_idempotent").count();
    assert_eq!(occurrences, 1);
    assert_eq!(after.len(), before + 1);
}

/// Property 4 (spec §8): in the merged report, for each function name, the
/// sum of any accumulator equals the sum of that accumulator over all
/// published snapshots. Checked directly against the snapshot registry
/// (rather than by parsing report text) across a small thread fan-out with
/// varied call counts per thread.
#[test]
fn merged_sum_matches_sum_over_snapshots() {
    let before = registry::snapshot_count();

    let handles: Vec<_> = (1..=3u64)
        .map(|n| {
            thread::spawn(move || {
                let h = register("prop_merge_h");
                for _ in 0..n {
                    enter(h);
                    leave(h);
                }
                scopeprof::instrumentation::publish_and_cleanup_current_thread();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(registry::snapshot_count(), before + 3);

    let mut total_calls = 0u64;
    let mut touching_snapshots = 0u32;
    registry::with_snapshots(|snapshots| {
        for snapshot in snapshots {
            if let Some(record) = snapshot.functions.find(&scopeprof::name::FunctionName::new("prop_merge_h")) {
                if record.call_count > 0 {
                    total_calls += record.call_count;
                    touching_snapshots += 1;
                }
            }
        }
    });
    assert_eq!(total_calls, 1 + 2 + 3);
    assert_eq!(touching_snapshots, 3);
}
