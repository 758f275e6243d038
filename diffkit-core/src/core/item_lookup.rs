use std::collections::HashMap;

use crate::core::item_definition::ItemDefinition;
use crate::hash::Algorithm;

/// Lookup key: one algorithm plus its digest bytes.
type HashKey = (Algorithm, Vec<u8>);

/// Shared lookup structure backing both `Cookbook` (`T = Vec<Arc<dyn Recipe>>`)
/// and `Pantry` (`T = Arc<PreparedItem>`): items are found by any hash they
/// carry, with a length-only fallback bucket for items that arrive with no
/// hash at all. Every shared hash algorithm is tried before falling back to
/// size+name matching.
#[derive(Debug)]
pub struct ItemIndex<T> {
    by_hash: HashMap<HashKey, Vec<(ItemDefinition, T)>>,
    by_length: HashMap<u64, Vec<(ItemDefinition, T)>>,
    entries: Vec<(ItemDefinition, T)>,
}

impl<T: Clone> Default for ItemIndex<T> {
    fn default() -> Self {
        Self {
            by_hash: HashMap::new(),
            by_length: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<T: Clone> ItemIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(ItemDefinition, T)] {
        &self.entries
    }

    pub fn insert(&mut self, item: ItemDefinition, value: T) {
        self.entries.push((item.clone(), value.clone()));
        if item.hashes.is_empty() {
            self.by_length
                .entry(item.length)
                .or_default()
                .push((item, value));
            return;
        }
        for hash in &item.hashes {
            let key = (hash.algorithm, hash.bytes.clone());
            self.by_hash
                .entry(key)
                .or_default()
                .push((item.clone(), value.clone()));
        }
    }

    /// Finds the entry matching `query`. A confirmed hash match (per
    /// `ItemDefinition::match_against`) wins; absent any shared algorithm on
    /// either side, falls back to a length-bucket scan using name equality
    /// directly — name is a pantry/cookbook lookup convenience, not part of
    /// `match_against`'s identity contract, so it is never routed through it.
    pub fn find(&self, query: &ItemDefinition) -> crate::error::Result<Option<&T>> {
        for hash in &query.hashes {
            let key = (hash.algorithm, hash.bytes.clone());
            if let Some(candidates) = self.by_hash.get(&key) {
                for (candidate, value) in candidates {
                    if candidate.match_against(query)? == crate::core::item_definition::MatchResult::Match {
                        return Ok(Some(value));
                    }
                }
            }
        }
        if query.hashes.is_empty() {
            if let Some(candidates) = self.by_length.get(&query.length) {
                for (candidate, value) in candidates {
                    if candidate.hashes.is_empty()
                        && candidate.length == query.length
                        && candidate.name.is_some()
                        && candidate.name == query.name
                    {
                        return Ok(Some(value));
                    }
                }
            }
        }
        Ok(None)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;

    #[test]
    fn finds_entry_by_shared_hash() {
        let mut index = ItemIndex::new();
        let item = ItemDefinition::new(3).with_hash(Hash::new(Algorithm::Sha256, vec![1, 2, 3]));
        index.insert(item.clone(), "payload");

        let query = ItemDefinition::new(3).with_hash(Hash::new(Algorithm::Sha256, vec![1, 2, 3]));
        assert_eq!(index.find(&query).unwrap(), Some(&"payload"));
    }

    #[test]
    fn falls_back_to_length_bucket_when_no_hash_present() {
        let mut index = ItemIndex::new();
        let item = ItemDefinition::new(3).with_name("payload");
        index.insert(item, "payload");

        let query = ItemDefinition::new(3).with_name("payload");
        assert_eq!(index.find(&query).unwrap(), Some(&"payload"));
    }

    #[test]
    fn no_match_returns_none() {
        let mut index = ItemIndex::new();
        index.insert(ItemDefinition::new(3).with_name("payload"), "payload");

        let query = ItemDefinition::new(3).with_name("other");
        assert_eq!(index.find(&query).unwrap(), None);
    }
}
