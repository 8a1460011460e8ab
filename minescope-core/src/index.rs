//! Three-tier lookup keyed by persistent id, then block id, then label.

use crate::types::BlockKeys;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct KeyedIndex<T> {
    by_persistent_id: HashMap<String, T>,
    by_block_id: HashMap<String, T>,
    by_label: HashMap<String, T>,
}

impl<T> Default for KeyedIndex<T> {
    fn default() -> Self {
        Self {
            by_persistent_id: HashMap::new(),
            by_block_id: HashMap::new(),
            by_label: HashMap::new(),
        }
    }
}

impl<T: Clone> KeyedIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under every key it carries. An occupied slot keeps
    /// its entry unless `replaces(existing, candidate)` says otherwise.
    pub fn insert_with<F>(&mut self, keys: &BlockKeys, value: T, replaces: F)
    where
        F: Fn(&T, &T) -> bool,
    {
        let slots = [
            (&mut self.by_persistent_id, &keys.persistent_id),
            (&mut self.by_block_id, &keys.block_id),
            (&mut self.by_label, &keys.label),
        ];
        for (map, key) in slots {
            let Some(key) = key else { continue };
            let keep = map.get(key).is_some_and(|existing| !replaces(existing, &value));
            if !keep {
                map.insert(key.clone(), value.clone());
            }
        }
    }

    /// Every match in key-priority order.
    pub fn matches<'a>(&'a self, keys: &'a BlockKeys) -> impl Iterator<Item = &'a T> + 'a {
        [
            (&self.by_persistent_id, &keys.persistent_id),
            (&self.by_block_id, &keys.block_id),
            (&self.by_label, &keys.label),
        ]
        .into_iter()
        .filter_map(|(map, key)| key.as_ref().and_then(|k| map.get(k)))
    }

    /// First match by key priority.
    pub fn lookup<'a>(&'a self, keys: &'a BlockKeys) -> Option<&'a T> {
        self.matches(keys).next()
    }

    /// First match satisfying `prefer`, else the first match of any kind.
    pub fn lookup_preferring<'a, F>(&'a self, keys: &'a BlockKeys, prefer: F) -> Option<&'a T>
    where
        F: Fn(&T) -> bool,
    {
        self.matches(keys)
            .find(|v| prefer(v))
            .or_else(|| self.lookup(keys))
    }

    pub fn is_empty(&self) -> bool {
        self.by_persistent_id.is_empty() && self.by_block_id.is_empty() && self.by_label.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(p: Option<&str>, b: Option<&str>, l: Option<&str>) -> BlockKeys {
        BlockKeys::new(p.map(String::from), b.map(String::from), l.map(String::from))
    }

    #[test]
    fn test_priority_order() {
        let mut index = KeyedIndex::new();
        index.insert_with(&keys(Some("p1"), Some("b1"), Some("Pit A")), "by-p1", |_, _| false);
        index.insert_with(&keys(None, Some("b2"), Some("Pit B")), "by-b2", |_, _| false);

        assert_eq!(index.lookup(&keys(Some("p1"), Some("b2"), None)), Some(&"by-p1"));
        assert_eq!(index.lookup(&keys(Some("zz"), Some("b2"), None)), Some(&"by-b2"));
        assert_eq!(index.lookup(&keys(None, None, Some("Pit A"))), Some(&"by-p1"));
        assert_eq!(index.lookup(&keys(Some("zz"), None, None)), None);
    }

    #[test]
    fn test_first_insert_wins_unless_replaced() {
        let mut index = KeyedIndex::new();
        index.insert_with(&keys(Some("p"), None, None), 1, |_, _| false);
        index.insert_with(&keys(Some("p"), None, None), 2, |_, _| false);
        assert_eq!(index.lookup(&keys(Some("p"), None, None)), Some(&1));
        index.insert_with(&keys(Some("p"), None, None), 3, |old, new| new > old);
        assert_eq!(index.lookup(&keys(Some("p"), None, None)), Some(&3));
    }

    #[test]
    fn test_lookup_preferring() {
        let mut index = KeyedIndex::new();
        index.insert_with(&keys(Some("p"), None, None), (false, "bounds-only"), |_, _| false);
        index.insert_with(&keys(None, Some("b"), None), (true, "with-image"), |_, _| false);
        let k = keys(Some("p"), Some("b"), None);
        assert_eq!(index.lookup_preferring(&k, |v| v.0), Some(&(true, "with-image")));
        assert_eq!(index.lookup(&k), Some(&(false, "bounds-only")));
    }
}
