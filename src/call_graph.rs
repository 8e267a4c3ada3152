//! Caller -> callee edge graph (spec §3/§4, component C3).
//!
//! Two-level ownership: an outer [`ChainedMap`] keyed by caller name owns an
//! inner `ChainedMap<u64>` keyed by callee name, created lazily on the first
//! edge so the graph stays sparse instead of pre-allocating an O(N^2)
//! matrix (spec §9).

use crate::hash::ChainedMap;
use crate::name::FunctionName;

pub const CALLER_MAP_CAPACITY: usize = 128;
pub const CALLEE_MAP_CAPACITY: usize = 64;

pub struct CallGraph {
    callers: ChainedMap<ChainedMap<u64>>,
}

impl CallGraph {
    pub fn new() -> Self {
        CallGraph {
            callers: ChainedMap::with_capacity(CALLER_MAP_CAPACITY),
        }
    }

    /// Increments the `(caller, callee)` edge count by one, creating the
    /// callee table for `caller` if this is its first outgoing edge.
    pub fn record_edge(&mut self, caller: &FunctionName, callee: &FunctionName) {
        let callees = self
            .callers
            .entry_or_insert_with(caller, || ChainedMap::with_capacity(CALLEE_MAP_CAPACITY));
        let count = callees.entry_or_insert_with(callee, || 0);
        *count += 1;
    }

    pub fn edge_count(&self, caller: &FunctionName, callee: &FunctionName) -> u64 {
        self.callers
            .find(caller)
            .and_then(|callees| callees.find(callee))
            .copied()
            .unwrap_or(0)
    }

    /// Every `(caller, callee, count)` triple, caller-bucket-major order.
    pub fn iter_edges(&self) -> impl Iterator<Item = (&FunctionName, &FunctionName, u64)> {
        self.callers
            .iter()
            .flat_map(|(caller, callees)| callees.iter().map(move |(callee, count)| (caller, callee, *count)))
    }

    /// Names that called `callee` at least once, with their counts.
    pub fn callers_of<'a>(&'a self, callee: &'a FunctionName) -> impl Iterator<Item = (&'a FunctionName, u64)> {
        self.callers.iter().filter_map(move |(caller, callees)| {
            callees.find(callee).filter(|&&count| count > 0).map(|&count| (caller, count))
        })
    }

    pub fn deep_clone(&self) -> Self {
        let mut dst = ChainedMap::with_capacity(CALLER_MAP_CAPACITY);
        for (caller, callees) in self.callers.iter() {
            let dst_callees = dst.entry_or_insert_with(caller, || ChainedMap::with_capacity(CALLEE_MAP_CAPACITY));
            for (callee, count) in callees.iter() {
                *dst_callees.entry_or_insert_with(callee, || 0) = *count;
            }
        }
        CallGraph { callers: dst }
    }
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}
