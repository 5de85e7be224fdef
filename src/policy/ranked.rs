use std::collections::{BTreeSet, HashMap};

use crate::translation::Vpn;

/// Resident pages ordered by a policy-specific key. The page with the
/// smallest key is the next victim.
#[derive(Debug, Clone)]
pub struct RankedPages<K> {
    keys: HashMap<Vpn, K>,
    order: BTreeSet<(K, Vpn)>,
}

impl<K> Default for RankedPages<K> {
    fn default() -> Self {
        RankedPages {
            keys: HashMap::new(),
            order: BTreeSet::new(),
        }
    }
}

impl<K: Ord + Copy> RankedPages<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the key of `vpn`
    pub fn insert(&mut self, vpn: Vpn, key: K) {
        if let Some(old) = self.keys.insert(vpn, key) {
            self.order.remove(&(old, vpn));
        }
        self.order.insert((key, vpn));
    }

    /// Recompute the key of a tracked page. Returns false if `vpn` is not tracked.
    pub fn rekey(&mut self, vpn: Vpn, f: impl FnOnce(K) -> K) -> bool {
        let Some(slot) = self.keys.get_mut(&vpn) else {
            return false;
        };
        let old = *slot;
        let new = f(old);
        *slot = new;
        self.order.remove(&(old, vpn));
        self.order.insert((new, vpn));
        true
    }

    pub fn remove(&mut self, vpn: Vpn) -> Option<K> {
        let key = self.keys.remove(&vpn)?;
        self.order.remove(&(key, vpn));
        Some(key)
    }

    /// Remove and return the page with the smallest key
    pub fn pop_min(&mut self) -> Option<Vpn> {
        let (_, vpn) = self.order.pop_first()?;
        self.keys.remove(&vpn);
        Some(vpn)
    }

    pub fn key(&self, vpn: Vpn) -> Option<K> {
        self.keys.get(&vpn).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
