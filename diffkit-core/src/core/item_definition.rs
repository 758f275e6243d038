use std::cmp::Ordering;
use std::fmt;

use crate::error::{DiffError, Result};
use crate::hash::{Algorithm, Hash, verify_hashes_match};

/// Result of comparing two items for identity: two items with no shared
/// hash algorithm can neither be confirmed equal nor confirmed distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Match,
    NoMatch,
    Uncertain,
}

/// Identifies a byte-stream by size, an optional human-readable name, and
/// zero or more hashes. Two items are the *same* item if their hashes agree
/// on every shared algorithm (or, lacking any shared algorithm, if their
/// names and sizes agree exactly).
#[derive(Debug, Clone)]
pub struct ItemDefinition {
    pub length: u64,
    pub name: Option<String>,
    pub hashes: Vec<Hash>,
}

impl ItemDefinition {
    pub fn new(length: u64) -> Self {
        Self {
            length,
            name: None,
            hashes: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_hash(mut self, hash: Hash) -> Self {
        self.hashes.push(hash);
        self
    }

    pub fn hash(&self, algorithm: Algorithm) -> Option<&Hash> {
        self.hashes.iter().find(|h| h.algorithm == algorithm)
    }

    pub fn has_matching_hash(&self, other: &ItemDefinition) -> Result<bool> {
        Ok(matches!(self.match_against(other)?, MatchResult::Match))
    }

    /// `match` per the item identity contract: agreement on every shared
    /// hash algorithm (plus equal length) is a `Match`; any disagreement is
    /// `NoMatch`; lacking any shared algorithm to compare is `Uncertain`,
    /// full stop — name equality is a lookup convenience (see
    /// `ItemIndex::find`'s length-bucket fallback), not part of identity.
    pub fn match_against(&self, other: &ItemDefinition) -> Result<MatchResult> {
        if self.length != other.length {
            return Ok(MatchResult::NoMatch);
        }
        match verify_hashes_match(&self.hashes, &other.hashes) {
            Ok(Some(true)) => Ok(MatchResult::Match),
            Ok(None) => Ok(MatchResult::Uncertain),
            Ok(Some(false)) => unreachable!("verify_hashes_match never returns Some(false)"),
            Err(e) => Err(e),
        }
    }

    pub fn require_sha256(&self) -> Result<&Hash> {
        self.hash(Algorithm::Sha256)
            .ok_or_else(|| DiffError::ItemNoSha256Hash(self.to_string()))
    }

    pub fn to_string_repr(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ItemDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "len={}", self.length)?;
        if let Some(name) = &self.name {
            write!(f, " name={name}")?;
        }
        for h in &self.hashes {
            write!(f, " {h}")?;
        }
        Ok(())
    }
}

impl PartialEq for ItemDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for ItemDefinition {}

impl std::hash::Hash for ItemDefinition {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for h in &self.hashes {
            h.hash(state);
        }
        if self.hashes.is_empty() {
            self.name.hash(state);
        }
    }
}

/// Total ordering over items: by length, then by the first algorithm (in
/// `Algorithm::ALL` order) both items carry, falling back to name.
impl PartialOrd for ItemDefinition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ItemDefinition {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.length.cmp(&other.length) {
            Ordering::Equal => {}
            ord => return ord,
        }
        for algo in Algorithm::ALL {
            if let (Some(a), Some(b)) = (self.hash(algo), other.hash(algo)) {
                let ord = a.cmp(b);
                if ord != Ordering::Equal {
                    return ord;
                }
                return Ordering::Equal;
            }
        }
        self.name.cmp(&other.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_sha256(length: u64, digest: &[u8]) -> ItemDefinition {
        ItemDefinition::new(length).with_hash(Hash::new(Algorithm::Sha256, digest.to_vec()))
    }

    #[test]
    fn items_with_same_hash_match() {
        let a = with_sha256(5, &[1, 2, 3]);
        let b = with_sha256(5, &[1, 2, 3]);
        assert_eq!(a.match_against(&b).unwrap(), MatchResult::Match);
    }

    #[test]
    fn items_with_different_length_never_match() {
        let a = with_sha256(5, &[1, 2, 3]);
        let b = with_sha256(6, &[1, 2, 3]);
        assert_eq!(a.match_against(&b).unwrap(), MatchResult::NoMatch);
    }

    #[test]
    fn items_with_conflicting_hash_of_same_algorithm_is_an_error() {
        let a = with_sha256(5, &[1, 2, 3]);
        let b = with_sha256(5, &[4, 5, 6]);
        assert!(a.match_against(&b).is_err());
    }

    #[test]
    fn items_with_no_shared_hash_and_no_shared_name_are_uncertain() {
        let a = ItemDefinition::new(5);
        let b = ItemDefinition::new(5);
        assert_eq!(a.match_against(&b).unwrap(), MatchResult::Uncertain);
    }

    #[test]
    fn items_with_no_shared_hash_are_uncertain_even_with_matching_name() {
        let a = ItemDefinition::new(5).with_name("payload");
        let b = ItemDefinition::new(5).with_name("payload");
        assert_eq!(a.match_against(&b).unwrap(), MatchResult::Uncertain);
    }
}
