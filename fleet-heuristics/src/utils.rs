//! Small iterator helpers used across the scheduling core.

use hashbrown::HashMap;
use std::hash::Hash;

/// Groups an iterator of items by a derived key, preserving insertion order
/// of first occurrence within each group.
pub trait CollectGroupBy: Iterator {
    /// Groups items of this iterator by `key_fn`, returning a vector of
    /// `(key, items)` pairs.
    fn collect_group_by_key<K, F>(self, key_fn: F) -> Vec<(K, Vec<Self::Item>)>
    where
        Self: Sized,
        K: Eq + Hash + Clone,
        F: Fn(&Self::Item) -> K,
    {
        let mut order: Vec<K> = Vec::new();
        let mut groups: HashMap<K, Vec<Self::Item>> = HashMap::new();

        for item in self {
            let key = key_fn(&item);
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(item);
        }

        order.into_iter().map(|key| { let items = groups.remove(&key).unwrap_or_default(); (key, items) }).collect()
    }
}

impl<T: Iterator> CollectGroupBy for T {}
