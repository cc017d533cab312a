//! The default key hasher: a seeded rotate-xor fold over the key bytes.
//!
//! This is not a cryptographic hash. It is deterministic across runs and
//! platforms, which makes slot placement reproducible for a given buffer
//! length, and it spreads short string keys well enough across prime-sized
//! tables.

use core::hash::BuildHasher;
use core::hash::Hasher;

/// Initial state of the fold. An alternating bit pattern so that short keys
/// do not start from an all-zero word.
pub const SEED: u64 = 0x5555_5555_5555_5555;

const ROTATE: u32 = 5;

#[inline(always)]
fn fold(hash: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(hash, |hash, &byte| (hash ^ u64::from(byte)).rotate_left(ROTATE))
}

/// Hashes `bytes` with the rotate-xor fold.
///
/// Each byte is xor-ed into the running value, which is then rotated left by
/// five bits.
///
/// # Examples
///
/// ```rust
/// use robin_table::hasher::SEED;
/// use robin_table::hasher::hash_bytes;
///
/// assert_eq!(hash_bytes(b""), SEED);
/// assert_eq!(hash_bytes(b"a"), (SEED ^ u64::from(b'a')).rotate_left(5));
/// ```
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    fold(SEED, bytes)
}

/// Streaming form of [`hash_bytes`].
///
/// Feeding the same bytes through any number of `write` calls produces the
/// same result as hashing them in one go.
#[derive(Debug, Clone, Copy)]
pub struct RotXorHasher {
    hash: u64,
}

impl Default for RotXorHasher {
    fn default() -> Self {
        Self { hash: SEED }
    }
}

impl Hasher for RotXorHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.hash = fold(self.hash, bytes);
    }
}

/// The default hash builder for every container in this crate.
///
/// Zero-sized; every hasher it builds starts from [`SEED`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotXorState;

impl BuildHasher for RotXorState {
    type Hasher = RotXorHasher;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        RotXorHasher::default()
    }
}

/// A seedless fast hash builder from `foldhash`, for callers that want better
/// mixing than the rotate-xor fold.
#[cfg(feature = "foldhash")]
pub type FoldHashState = foldhash::fast::FixedState;

/// Hashes raw key bytes with a hasher from `hash_builder`.
///
/// Keys go through [`Hasher::write`] directly rather than through `Hash`, so
/// the result depends only on the key's content and not on how its type
/// frames itself for hashing.
#[inline]
pub(crate) fn hash_key<S: BuildHasher>(hash_builder: &S, key: &[u8]) -> u64 {
    let mut hasher = hash_builder.build_hasher();
    hasher.write(key);
    hasher.finish()
}
