use std::cmp::Ordering;
use std::fmt;

use crate::error::DiffError;
use crate::hash::Algorithm;

/// A single algorithm/digest pair, as carried on an `item_definition`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    pub algorithm: Algorithm,
    pub bytes: Vec<u8>,
}

impl Hash {
    pub fn new(algorithm: Algorithm, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Total ordering used by `ItemDefinition::cmp`: algorithm in `Algorithm::ALL`
/// order first, then the raw digest bytes.
impl PartialOrd for Hash {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hash {
    fn cmp(&self, other: &Self) -> Ordering {
        self.algorithm
            .cmp(&other.algorithm)
            .then_with(|| self.bytes.cmp(&other.bytes))
    }
}

/// Compares two hash sets for the *same* algorithms and raises
/// `item_definition_hash_same_type_different_value` on the first mismatch
/// found for a shared algorithm. Hash sets that share no algorithm are
/// considered uncertain (neither a match nor a conflict) and return `Ok(None)`.
pub fn verify_hashes_match(a: &[Hash], b: &[Hash]) -> Result<Option<bool>, DiffError> {
    let mut shared = false;
    for ha in a {
        for hb in b {
            if ha.algorithm != hb.algorithm {
                continue;
            }
            shared = true;
            if ha.bytes.len() != hb.bytes.len() {
                return Err(DiffError::ItemHashSizeMismatch(format!(
                    "{}: {} vs {} bytes",
                    ha.algorithm,
                    ha.bytes.len(),
                    hb.bytes.len()
                )));
            }
            if ha.bytes != hb.bytes {
                return Err(DiffError::ItemHashConflict(format!(
                    "{}: {} vs {}",
                    ha.algorithm,
                    ha.to_hex(),
                    hb.to_hex()
                )));
            }
        }
    }
    if shared { Ok(Some(true)) } else { Ok(None) }
}

pub fn find<'a>(hashes: &'a [Hash], algorithm: Algorithm) -> Option<&'a Hash> {
    hashes.iter().find(|h| h.algorithm == algorithm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_shared_algorithm_is_uncertain() {
        let a = [Hash::new(Algorithm::Md5, vec![1, 2, 3])];
        let b = [Hash::new(Algorithm::Sha256, vec![4, 5, 6])];
        assert_eq!(verify_hashes_match(&a, &b).unwrap(), None);
    }

    #[test]
    fn shared_algorithm_with_equal_bytes_matches() {
        let a = [Hash::new(Algorithm::Sha256, vec![1, 2, 3])];
        let b = [Hash::new(Algorithm::Sha256, vec![1, 2, 3])];
        assert_eq!(verify_hashes_match(&a, &b).unwrap(), Some(true));
    }

    #[test]
    fn shared_algorithm_with_different_bytes_is_a_conflict() {
        let a = [Hash::new(Algorithm::Sha256, vec![1, 2, 3])];
        let b = [Hash::new(Algorithm::Sha256, vec![9, 9, 9])];
        assert!(verify_hashes_match(&a, &b).is_err());
    }

    #[test]
    fn shared_algorithm_with_different_digest_length_is_a_size_error() {
        let a = [Hash::new(Algorithm::Sha256, vec![1, 2, 3])];
        let b = [Hash::new(Algorithm::Sha256, vec![1, 2])];
        assert!(verify_hashes_match(&a, &b).is_err());
    }
}
