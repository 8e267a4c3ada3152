//! Chained hash map keyed by [`FunctionName`] (spec §4.1, component C1).
//!
//! Fixed bucket count chosen at construction time, djb2 hashing, singly
//! linked collision chains, no resizing, no deletion. Iteration is
//! bucket-major, chain-minor, matching the original's traversal order so
//! report output is deterministic for a given insertion history.

use crate::name::FunctionName;

/// djb2 over the name bytes, matching the original's `hash_string`.
fn djb2(name: &str) -> u64 {
    let mut hash: u64 = 5381;
    for &byte in name.as_bytes() {
        hash = hash.wrapping_shl(5).wrapping_add(hash).wrapping_add(byte as u64);
    }
    hash
}

struct Node<V> {
    key: FunctionName,
    value: V,
    next: Option<Box<Node<V>>>,
}

/// A fixed-capacity, append-only chained hash map from [`FunctionName`] to
/// `V`.
pub struct ChainedMap<V> {
    buckets: Vec<Option<Box<Node<V>>>>,
    capacity: usize,
    len: usize,
}

impl<V> ChainedMap<V> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut buckets = Vec::with_capacity(capacity);
        buckets.resize_with(capacity, || None);
        ChainedMap {
            buckets,
            capacity,
            len: 0,
        }
    }

    fn bucket_index(&self, key: &FunctionName) -> usize {
        (djb2(key.as_str()) % self.capacity as u64) as usize
    }

    pub fn find(&self, key: &FunctionName) -> Option<&V> {
        let mut cur = self.buckets[self.bucket_index(key)].as_deref();
        while let Some(node) = cur {
            if &node.key == key {
                return Some(&node.value);
            }
            cur = node.next.as_deref();
        }
        None
    }

    pub fn find_mut(&mut self, key: &FunctionName) -> Option<&mut V> {
        let idx = self.bucket_index(key);
        let mut cur = self.buckets[idx].as_deref_mut();
        while let Some(node) = cur {
            if &node.key == key {
                return Some(&mut node.value);
            }
            cur = node.next.as_deref_mut();
        }
        None
    }

    /// Returns the existing entry for `key`, or inserts one built from
    /// `make_value` and returns that.
    pub fn entry_or_insert_with<F: FnOnce() -> V>(&mut self, key: &FunctionName, make_value: F) -> &mut V {
        let idx = self.bucket_index(key);
        // Two-pass borrow: search first (immutable via raw pointer walk is
        // awkward under the borrow checker with a singly linked Option<Box>
        // chain), so just check presence, then insert-or-fetch.
        let mut found = false;
        {
            let mut cur = self.buckets[idx].as_deref();
            while let Some(node) = cur {
                if &node.key == key {
                    found = true;
                    break;
                }
                cur = node.next.as_deref();
            }
        }
        if !found {
            let node = Box::new(Node {
                key: *key,
                value: make_value(),
                next: self.buckets[idx].take(),
            });
            self.buckets[idx] = Some(node);
            self.len += 1;
        }
        let mut cur = self.buckets[idx].as_deref_mut();
        loop {
            match cur {
                Some(node) if &node.key == key => return &mut node.value,
                Some(node) => cur = node.next.as_deref_mut(),
                None => unreachable!("entry was just inserted"),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bucket-major, chain-minor iteration, matching the original's nested
    /// `for bucket { while entry }` traversal.
    pub fn iter(&self) -> impl Iterator<Item = (&FunctionName, &V)> {
        self.buckets.iter().flat_map(|bucket| {
            let mut cur = bucket.as_deref();
            std::iter::from_fn(move || {
                let node = cur?;
                cur = node.next.as_deref();
                Some((&node.key, &node.value))
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&FunctionName, &mut V)> {
        self.buckets.iter_mut().flat_map(|bucket| {
            let mut cur = bucket.as_deref_mut();
            std::iter::from_fn(move || {
                let node = cur.take()?;
                cur = node.next.as_deref_mut();
                Some((&node.key, &mut node.value))
            })
        })
    }
}

impl<V: Clone> ChainedMap<V> {
    /// Deep-copies every entry into a freshly allocated map of the same
    /// capacity (spec §4.4: thread snapshots must own an independent copy).
    pub fn deep_clone(&self) -> Self {
        let mut dst = ChainedMap::with_capacity(self.capacity);
        for (key, value) in self.iter() {
            *dst.entry_or_insert_with(key, || value.clone()) = value.clone();
        }
        dst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_find() {
        let mut map: ChainedMap<u32> = ChainedMap::with_capacity(4);
        let key = FunctionName::new("f");
        *map.entry_or_insert_with(&key, || 0) = 7;
        assert_eq!(map.find(&key), Some(&7));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn repeated_insert_is_idempotent() {
        let mut map: ChainedMap<u32> = ChainedMap::with_capacity(4);
        let key = FunctionName::new("f");
        map.entry_or_insert_with(&key, || 1);
        map.entry_or_insert_with(&key, || 99);
        assert_eq!(map.len(), 1);
        assert_eq!(map.find(&key), Some(&1));
    }

    #[test]
    fn collisions_chain_correctly() {
        let mut map: ChainedMap<u32> = ChainedMap::with_capacity(1);
        for i in 0..20 {
            let key = FunctionName::new(&format!("f{i}"));
            *map.entry_or_insert_with(&key, || i) = i;
        }
        assert_eq!(map.len(), 20);
        for i in 0..20 {
            let key = FunctionName::new(&format!("f{i}"));
            assert_eq!(map.find(&key), Some(&i));
        }
    }

    #[test]
    fn deep_clone_is_independent() {
        let mut map: ChainedMap<u32> = ChainedMap::with_capacity(4);
        let key = FunctionName::new("f");
        *map.entry_or_insert_with(&key, || 1) = 1;
        let mut clone = map.deep_clone();
        *clone.entry_or_insert_with(&key, || 0) = 2;
        assert_eq!(map.find(&key), Some(&1));
        assert_eq!(clone.find(&key), Some(&2));
    }
}
