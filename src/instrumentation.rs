//! `register` / `enter` / `leave` (spec §4.3, component C6) — the surface
//! instrumented programs call directly or through [`crate::macros`].

use std::cell::{Cell, RefCell};
use std::time::Instant;

use crate::call_graph::CallGraph;
use crate::call_stack::CallStack;
use crate::hash::ChainedMap;
use crate::name::FunctionName;
use crate::platform;
use crate::record::FunctionRecord;
use crate::registry;
use crate::sigguard::SigProfGuard;

const FUNCTION_MAP_CAPACITY: usize = 512;

thread_local! {
    static THREAD_ID: Cell<Option<u32>> = const { Cell::new(None) };
    static FUNCTIONS: RefCell<Option<ChainedMap<FunctionRecord>>> = const { RefCell::new(None) };
    static CALLER_GRAPH: RefCell<Option<CallGraph>> = const { RefCell::new(None) };
    static CALL_STACK: RefCell<CallStack> = RefCell::new(CallStack::new());
}

fn ensure_thread_id() -> u32 {
    THREAD_ID.with(|cell| {
        if let Some(tid) = cell.get() {
            return tid;
        }
        let tid = platform::current_tid();
        cell.set(Some(tid));
        tid
    })
}

/// Thread id cached for the current thread on its first instrumentation
/// call, or `0` if the thread has not instrumented anything yet.
pub fn current_thread_id() -> u32 {
    THREAD_ID.with(|cell| cell.get().unwrap_or(0))
}

/// Read-only access to the current thread's function map, used by the
/// sampling handler and by [`crate::report`]/[`crate::gmon`] in
/// single-threaded mode. Returns `false` from `f`'s perspective (by simply
/// not calling it) when the thread has never registered anything.
pub fn with_function_map<R>(f: impl FnOnce(&mut ChainedMap<FunctionRecord>) -> R) -> Option<R> {
    FUNCTIONS.with(|cell| cell.borrow_mut().as_mut().map(f))
}

pub fn with_call_stack<R>(f: impl FnOnce(&CallStack) -> R) -> R {
    CALL_STACK.with(|cell| f(&cell.borrow()))
}

pub fn with_caller_graph<R>(f: impl FnOnce(&mut CallGraph) -> R) -> Option<R> {
    CALLER_GRAPH.with(|cell| cell.borrow_mut().as_mut().map(f))
}

/// Captures the registration call site's address. The original captures
/// `__builtin_return_address(0)` and resolves it with `dladdr` to the
/// containing function's start (`dli_saddr`); the nearest portable
/// equivalent is `backtrace::Frame::symbol_address`, which is the start of
/// the function containing the frame's instruction pointer rather than the
/// instruction pointer itself. Must be called directly from `register`'s own
/// body (not from within a nested closure passed to `with`/`thread_local!`),
/// so the walk is exactly two frames deep: this function, then `register`,
/// then `register`'s caller — the instrumented call site.
fn capture_caller_address() -> Option<usize> {
    let mut depth = 0usize;
    let mut found = None;
    backtrace::trace(|frame| {
        depth += 1;
        if depth == 2 {
            found = Some(frame.symbol_address() as usize);
            return false;
        }
        true
    });
    found
}

/// Idempotent per thread. See spec §4.3 for the full contract.
pub fn register(name: &str) -> FunctionName {
    let fname = FunctionName::new(name);
    ensure_thread_id();
    registry::register_global_name(&fname);

    // Captured before taking any lock/closure nesting, so the frame walk in
    // `capture_caller_address` always sees `register` as its immediate
    // caller (see that function's doc comment) regardless of whether this
    // turns out to be the first registration.
    let needs_addr = FUNCTIONS.with(|cell| match cell.borrow().as_ref() {
        Some(map) => map.find(&fname).is_none(),
        None => true,
    });
    let caller_addr = if needs_addr { capture_caller_address() } else { None };

    let _guard = SigProfGuard::block();
    FUNCTIONS.with(|cell| {
        let mut slot = cell.borrow_mut();
        let map = slot.get_or_insert_with(|| ChainedMap::with_capacity(FUNCTION_MAP_CAPACITY));
        let is_first_registration = map.find(&fname).is_none();
        let record = map.entry_or_insert_with(&fname, || FunctionRecord::new(fname));
        if is_first_registration {
            record.thread_id = current_thread_id();
            if record.addr.is_none() {
                record.addr = caller_addr;
            }
        }
    });
    CALLER_GRAPH.with(|cell| {
        cell.borrow_mut().get_or_insert_with(CallGraph::new);
    });

    fname
}

/// Looks up (or defensively creates) the function record, bumps its call
/// count, takes fresh timing baselines, records the caller->callee edge,
/// and pushes the name onto the call stack (spec §4.3).
pub fn enter(token: FunctionName) {
    let _guard = SigProfGuard::block();

    let wall = Instant::now();
    let rusage = platform::rusage_snapshot();
    let tid = current_thread_id();

    FUNCTIONS.with(|cell| {
        let mut slot = cell.borrow_mut();
        let map = slot.get_or_insert_with(|| ChainedMap::with_capacity(FUNCTION_MAP_CAPACITY));
        let record = map.entry_or_insert_with(&token, || FunctionRecord::new(token));
        if record.thread_id == 0 {
            record.thread_id = tid;
        }
        record.mark_entered(wall, rusage);
    });

    let caller = CALL_STACK.with(|cell| cell.borrow().top());
    if let Some(caller) = caller {
        CALLER_GRAPH.with(|cell| {
            let mut slot = cell.borrow_mut();
            let graph = slot.get_or_insert_with(CallGraph::new);
            graph.record_edge(&caller, &token);
        });
    }

    CALL_STACK.with(|cell| {
        cell.borrow_mut().push(token);
    });
}

/// Computes wall/user/kernel/wait deltas from the `enter` baselines,
/// accumulates them, clears `active`, and pops the call stack if its top
/// matches `token` (spec §4.3).
pub fn leave(token: FunctionName) {
    let _guard = SigProfGuard::block();

    let wall = Instant::now();
    let rusage = platform::rusage_snapshot();

    FUNCTIONS.with(|cell| {
        if let Some(map) = cell.borrow_mut().as_mut() {
            if let Some(record) = map.find_mut(&token) {
                record.mark_left(wall, rusage);
            }
        }
    });

    CALL_STACK.with(|cell| {
        cell.borrow_mut().pop_if_top(&token);
    });
}

/// RAII pairing of `enter`/`leave` that guarantees `leave` runs on every
/// control-flow exit from the scope, including early returns and unwinds
/// (spec §4.3/§6).
pub struct ScopeGuard {
    token: FunctionName,
}

impl ScopeGuard {
    pub fn new(token: FunctionName) -> Self {
        enter(token);
        ScopeGuard { token }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        leave(self.token);
    }
}

/// Registers `name` (once per thread, via the macro-local cache built by
/// [`crate::macros::profile_scope`]) and enters it, returning a guard that
/// leaves on drop.
pub fn enter_scope(name: &str) -> ScopeGuard {
    ScopeGuard::new(register(name))
}

/// Deep-copies this thread's tables into the snapshot registry, then
/// releases the thread-local originals (spec §4.4, "the thread's final
/// instrumentation act").
pub fn publish_and_cleanup_current_thread() {
    let tid = current_thread_id();
    let published = FUNCTIONS.with(|functions| {
        CALLER_GRAPH.with(|callers| {
            let functions = functions.borrow();
            let callers = callers.borrow();
            match (functions.as_ref(), callers.as_ref()) {
                (Some(functions), Some(callers)) if !functions.is_empty() => {
                    registry::publish_snapshot(tid, functions, callers);
                    true
                }
                _ => false,
            }
        })
    });
    if published {
        cleanup_current_thread();
    }
}

/// Frees the current thread's local tables without publishing a snapshot.
pub fn cleanup_current_thread() {
    FUNCTIONS.with(|cell| *cell.borrow_mut() = None);
    CALLER_GRAPH.with(|cell| *cell.borrow_mut() = None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent_per_thread() {
        let before = registry::global_names().len();
        let a = register("instrumentation_test_fn_unique");
        let b = register("instrumentation_test_fn_unique");
        assert_eq!(a, b);
        let after = registry::global_names().len();
        assert_eq!(after, before + 1);
        let _ = with_function_map(|map| assert_eq!(map.len(), 1));
    }

    #[test]
    fn call_count_fidelity() {
        let token = register("instrumentation_test_call_count");
        for _ in 0..100 {
            enter(token);
            leave(token);
        }
        let _ = with_function_map(|map| {
            let record = map.find(&token).unwrap();
            assert_eq!(record.call_count, 100);
            assert!(!record.active);
        });
        with_call_stack(|stack| assert_eq!(stack.depth(), 0));
    }

    #[test]
    fn caller_edge_counts_nested_calls() {
        let a = register("instrumentation_test_caller_a");
        let b = register("instrumentation_test_caller_b");
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

    #[test]
    fn scope_guard_leaves_on_early_return() {
        fn body(token: FunctionName, early: bool) {
            let _guard = ScopeGuard::new(token);
            if early {
                return;
            }
        }

        let token = register("instrumentation_test_scope_guard");
        body(token, true);
        with_call_stack(|stack| assert_eq!(stack.depth(), 0));
    }
}
