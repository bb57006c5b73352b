use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;

use crate::Result;

/// Value that can be found by name as well as by key.
pub trait CacheItem: Clone {
    /// Names carried by the value, or by any element of a list value.
    fn names(&self) -> Vec<String>;
}

/// Outcome of a key lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cached<V> {
    Hit(V),
    /// The underlying lookup is known to return nothing
    NotFound,
    Miss,
}

#[derive(Debug)]
struct Slot<V> {
    /// `None` for a cached not-found
    value: Option<V>,
    tick: u64,
}

/// Fixed-capacity recency list. Evicting the coldest entry removes it from
/// every index that references it.
#[derive(Debug)]
pub struct MultiIndexCache<V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<String, Slot<V>>,
    recency: BTreeMap<u64, String>,
    names: HashMap<String, HashSet<String>>,
    not_found: HashSet<String>,
}

impl<V: CacheItem> MultiIndexCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            names: HashMap::new(),
            not_found: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up `key`, promoting it to warmest.
    pub fn search(
        &mut self,
        key: &str,
    ) -> Cached<V> {
        if !self.entries.contains_key(key) {
            return Cached::Miss;
        }
        self.touch(key);
        match self.entries.get(key).and_then(|s| s.value.clone()) {
            Some(v) => Cached::Hit(v),
            None => Cached::NotFound,
        }
    }

    /// Every value carrying `name`, each promoted to warmest.
    pub fn search_name(
        &mut self,
        name: &str,
    ) -> Vec<V> {
        let keys: Vec<String> = match self.names.get(name) {
            Some(keys) => keys.iter().cloned().collect(),
            None => return Vec::new(),
        };
        keys.iter()
            .filter_map(|k| match self.search(k) {
                Cached::Hit(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn insert(
        &mut self,
        key: &str,
        value: V,
    ) {
        self.store(key, Some(value));
    }

    /// Remembers that `key` has no value.
    pub fn insert_not_found(
        &mut self,
        key: &str,
    ) {
        self.store(key, None);
    }

    /// Cached value of `key`, falling back to `load` on a miss. A `None` from
    /// `load` is cached as not-found.
    pub fn get_or_load<F>(
        &mut self,
        key: &str,
        load: F,
    ) -> Result<Option<V>>
    where
        F: FnOnce() -> Result<Option<V>>,
    {
        match self.search(key) {
            Cached::Hit(v) => Ok(Some(v)),
            Cached::NotFound => Ok(None),
            Cached::Miss => {
                let loaded = load()?;
                self.store(key, loaded.clone());
                Ok(loaded)
            }
        }
    }

    pub fn flush_all(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.names.clear();
        self.not_found.clear();
    }

    /// Removes every entry carrying `name`, and the entry keyed by `name`.
    /// Returns the removed keys.
    pub fn flush_name(
        &mut self,
        name: &str,
    ) -> Vec<String> {
        let mut keys: Vec<String> = self
            .names
            .get(name)
            .map(|k| k.iter().cloned().collect())
            .unwrap_or_default();
        if self.entries.contains_key(name) && !keys.iter().any(|k| k == name) {
            keys.push(name.to_string());
        }
        for k in &keys {
            self.remove(k);
        }
        keys
    }

    pub fn remove(
        &mut self,
        key: &str,
    ) -> bool {
        let Some(slot) = self.entries.remove(key) else {
            return false;
        };
        self.recency.remove(&slot.tick);
        self.not_found.remove(key);
        if let Some(value) = &slot.value {
            for name in value.names() {
                if let Some(keys) = self.names.get_mut(&name) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.names.remove(&name);
                    }
                }
            }
        }
        true
    }

    fn store(
        &mut self,
        key: &str,
        value: Option<V>,
    ) {
        self.remove(key);
        while self.entries.len() >= self.capacity {
            let Some(coldest) = self.recency.values().next().cloned() else {
                break;
            };
            self.remove(&coldest);
        }

        self.tick += 1;
        match &value {
            Some(v) => {
                for name in v.names() {
                    self.names.entry(name).or_default().insert(key.to_string());
                }
            }
            None => {
                self.not_found.insert(key.to_string());
            }
        }
        self.recency.insert(self.tick, key.to_string());
        self.entries.insert(
            key.to_string(),
            Slot {
                value,
                tick: self.tick,
            },
        );
    }

    fn touch(
        &mut self,
        key: &str,
    ) {
        self.tick += 1;
        let tick = self.tick;
        if let Some(slot) = self.entries.get_mut(key) {
            self.recency.remove(&slot.tick);
            slot.tick = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    #[cfg(test)]
    pub(crate) fn is_not_found(
        &self,
        key: &str,
    ) -> bool {
        self.not_found.contains(key)
    }
}
