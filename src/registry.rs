//! Process-wide mutex-guarded state: the global function registry and the
//! snapshot registry (spec §3/§4.4, component C7).
//!
//! Lock order: the registry mutex and the snapshot mutex are never held
//! across each other's critical sections (spec §9).

use std::sync::Mutex;

use crate::call_graph::CallGraph;
use crate::hash::ChainedMap;
use crate::name::FunctionName;
use crate::record::FunctionRecord;

pub const MAX_GLOBAL_FUNCTIONS: usize = 1000;
pub const MAX_THREADS: usize = 64;

/// A thread's captured statistics, owned by the snapshot registry once
/// published. Never mutated after creation.
pub struct ThreadSnapshot {
    pub thread_id: u32,
    pub functions: ChainedMap<FunctionRecord>,
    pub callers: CallGraph,
}

struct GlobalRegistryState {
    names: Vec<FunctionName>,
}

static GLOBAL_REGISTRY: Mutex<Option<GlobalRegistryState>> = Mutex::new(None);
static SNAPSHOTS: Mutex<Vec<ThreadSnapshot>> = Mutex::new(Vec::new());

fn with_registry<R>(f: impl FnOnce(&mut GlobalRegistryState) -> R) -> R {
    let mut guard = GLOBAL_REGISTRY.lock().unwrap_or_else(|poison| poison.into_inner());
    let state = guard.get_or_insert_with(|| GlobalRegistryState {
        names: Vec::with_capacity(MAX_GLOBAL_FUNCTIONS),
    });
    f(state)
}

/// Inserts `name` into the global registry if not already present.
/// Invariant: names are inserted at most once; overflow past
/// [`MAX_GLOBAL_FUNCTIONS`] is a logged, non-fatal degradation (spec §7).
pub fn register_global_name(name: &FunctionName) {
    with_registry(|state| {
        if state.names.iter().any(|n| n == name) {
            return;
        }
        if state.names.len() >= MAX_GLOBAL_FUNCTIONS {
            log::warn!("global function registry full, dropping registration of {name}");
            return;
        }
        state.names.push(*name);
    });
}

/// The full set of registered function names, in first-registration order
/// — the stable enumeration the merged report iterates over.
pub fn global_names() -> Vec<FunctionName> {
    with_registry(|state| state.names.clone())
}

/// Deep-copies the given thread-local tables into a freshly published
/// snapshot. Soft-fails (logs and drops the publication) once
/// [`MAX_THREADS`] snapshots are already held, per spec §4.4/§7.
pub fn publish_snapshot(thread_id: u32, functions: &ChainedMap<FunctionRecord>, callers: &CallGraph) {
    let mut snapshots = SNAPSHOTS.lock().unwrap_or_else(|poison| poison.into_inner());
    if snapshots.len() >= MAX_THREADS {
        log::warn!("snapshot registry full ({MAX_THREADS} threads), dropping publication for thread {thread_id}");
        return;
    }
    snapshots.push(ThreadSnapshot {
        thread_id,
        functions: functions.deep_clone(),
        callers: callers.deep_clone(),
    });
}

/// Runs `f` with exclusive read access to every published snapshot, in
/// publication order.
pub fn with_snapshots<R>(f: impl FnOnce(&[ThreadSnapshot]) -> R) -> R {
    let snapshots = SNAPSHOTS.lock().unwrap_or_else(|poison| poison.into_inner());
    f(&snapshots)
}

pub fn snapshot_count() -> usize {
    SNAPSHOTS.lock().unwrap_or_else(|poison| poison.into_inner()).len()
}

/// Frees every stored snapshot (spec §4.4: run only after reporting
/// completes).
pub fn cleanup_snapshots() {
    SNAPSHOTS.lock().unwrap_or_else(|poison| poison.into_inner()).clear();
}
