//! Content hashing
//!
//! Hashes feed names and synthetic ids, so they must be stable across
//! processes and platforms: xxh3 with fixed seeds, never a randomly keyed
//! hasher.

use std::sync::LazyLock;

use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

/// Pluggable hash function. Must be pure.
pub type HashFn = fn(&str) -> u64;

/// Seed derived from the engine version, so two engine versions never
/// produce colliding names for different CSS.
pub static SEED: LazyLock<u64> = LazyLock::new(|| xxh3_64(crate::VERSION.as_bytes()));

/// Default [`HashFn`].
pub fn content_hash(input: &str) -> u64 {
    xxh3_64(input.as_bytes())
}

/// Chain a hash with more input.
pub fn phash(seed: u64, input: &str) -> u64 {
    xxh3_64_with_seed(input.as_bytes(), seed)
}
