use md5::Md5;
use sha2::{Digest, Sha256};
use std::io::Read;

use crate::error::{DiffError, Result};
use crate::hash::{Algorithm, Hash};

/// Incremental digest, fed chunk by chunk as slices flow through the kitchen
/// and slicer without needing the whole byte-stream buffered at once.
pub trait IncrementalHasher: Send {
    fn algorithm(&self) -> Algorithm;
    fn update(&mut self, data: &[u8]);
    fn finish(self: Box<Self>) -> Hash;
}

struct Sha256Hasher(Sha256);
struct Md5Hasher(Md5);

impl IncrementalHasher for Sha256Hasher {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Sha256
    }
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }
    fn finish(self: Box<Self>) -> Hash {
        Hash::new(Algorithm::Sha256, self.0.finalize().to_vec())
    }
}

impl IncrementalHasher for Md5Hasher {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Md5
    }
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }
    fn finish(self: Box<Self>) -> Hash {
        Hash::new(Algorithm::Md5, self.0.finalize().to_vec())
    }
}

pub fn new_hasher(algorithm: Algorithm) -> Box<dyn IncrementalHasher> {
    match algorithm {
        Algorithm::Sha256 => Box::new(Sha256Hasher(Sha256::new())),
        Algorithm::Md5 => Box::new(Md5Hasher(Md5::new())),
    }
}

/// Hashes an entire reader with every algorithm in `Algorithm::ALL` in one
/// pass, returning the hashes in that fixed order.
pub fn hash_reader<R: Read>(mut reader: R, algorithms: &[Algorithm]) -> Result<Vec<Hash>> {
    let mut hashers: Vec<Box<dyn IncrementalHasher>> =
        algorithms.iter().copied().map(new_hasher).collect();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(DiffError::Io)?;
        if n == 0 {
            break;
        }
        for h in hashers.iter_mut() {
            h.update(&buf[..n]);
        }
    }
    Ok(hashers.into_iter().map(|h| h.finish()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_reader_produces_hashes_in_requested_order() {
        let hashes = hash_reader(b"hello world".as_slice(), &Algorithm::ALL).unwrap();
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[0].algorithm, Algorithm::Md5);
        assert_eq!(hashes[1].algorithm, Algorithm::Sha256);
    }

    #[test]
    fn incremental_hasher_matches_one_shot_hash_reader() {
        let mut hasher = new_hasher(Algorithm::Sha256);
        hasher.update(b"hello ");
        hasher.update(b"world");
        let incremental = hasher.finish();

        let one_shot = hash_reader(b"hello world".as_slice(), &[Algorithm::Sha256]).unwrap();
        assert_eq!(incremental.bytes, one_shot[0].bytes);
    }

    #[test]
    fn empty_input_still_produces_a_digest() {
        let hashes = hash_reader(b"".as_slice(), &Algorithm::ALL).unwrap();
        assert_eq!(hashes.len(), 2);
    }
}
