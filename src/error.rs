use thiserror::Error;

/// Failures reported by the table operations.
///
/// A key that is simply not present is never an error; lookups and removals
/// report it through `Option` or `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// An empty key was passed to an operation. The empty byte string is not a
    /// valid key and is rejected before hashing.
    #[error("key must not be empty")]
    EmptyKey,
    /// An insert of a new key found no free slot. The table is left exactly as
    /// it was before the call.
    #[error("table is full: all {capacity} slots are occupied")]
    CapacityExceeded {
        /// Number of slots in the backing buffer.
        capacity: usize,
    },
}

/// Returns the key bytes, rejecting the empty key.
#[inline]
pub(crate) fn checked_key<Q: AsRef<[u8]> + ?Sized>(key: &Q) -> Result<&[u8], Error> {
    let bytes = key.as_ref();
    if bytes.is_empty() {
        return Err(Error::EmptyKey);
    }
    Ok(bytes)
}
