use core::fmt::Debug;
use core::hash::BuildHasher;

use crate::error::Error;
use crate::error::checked_key;
use crate::hash_table::Entry;
use crate::hash_table::HashTable;
use crate::hash_table::Iter;
use crate::hash_table::Slot;
use crate::hasher::RotXorState;
use crate::hasher::hash_key;

/// Key extraction for records stored in a [`RecordTable`].
///
/// A record is any caller-defined value that can name its key. The table
/// hashes and compares only the bytes returned by [`Record::key`]; the rest
/// of the record is opaque payload.
///
/// # Examples
///
/// ```rust
/// use robin_table::Record;
///
/// struct Item {
///     key: &'static str,
///     val: i32,
/// }
///
/// impl Record for Item {
///     fn key(&self) -> &[u8] {
///         self.key.as_bytes()
///     }
/// }
/// ```
pub trait Record {
    /// The record's key bytes. Must be non-empty and must not change while
    /// the record is stored in a table.
    fn key(&self) -> &[u8];
}

impl<K: AsRef<[u8]>, V> Record for (K, V) {
    fn key(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/// A fixed-capacity table of caller-defined records, keyed by [`Record::key`].
///
/// This is the record-oriented face of [`HashTable`]: whole records go in
/// with [`set`](Self::set) and come back by key with [`get`](Self::get).
///
/// # Examples
///
/// ```rust
/// use robin_table::Record;
/// use robin_table::RecordTable;
/// use robin_table::Slot;
///
/// #[derive(Debug, PartialEq)]
/// struct Item {
///     key: &'static str,
///     val: i32,
/// }
///
/// impl Record for Item {
///     fn key(&self) -> &[u8] {
///         self.key.as_bytes()
///     }
/// }
///
/// let mut slots: Vec<Slot<Item>> = (0..997).map(|_| Slot::empty()).collect();
/// let mut items = RecordTable::new(&mut slots);
///
/// items.set(Item { key: "New element", val: 123 })?;
/// assert_eq!(items.get("New element")?.map(|i| i.val), Some(123));
/// assert!(items.remove("New element")?.is_some());
/// assert_eq!(items.get("New element")?, None);
/// # Ok::<(), robin_table::Error>(())
/// ```
pub struct RecordTable<'a, R, S = RotXorState> {
    table: HashTable<'a, R>,
    hash_builder: S,
}

impl<R, S> Debug for RecordTable<'_, R, S>
where
    R: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.table.iter()).finish()
    }
}

impl<'a, R> RecordTable<'a, R> {
    /// Creates a record table over `slots` with the default rotate-xor hasher.
    ///
    /// Every slot is reset to empty first.
    pub fn new(slots: &'a mut [Slot<R>]) -> Self {
        Self::with_hasher(slots, RotXorState)
    }
}

impl<'a, R, S> RecordTable<'a, R, S> {
    /// Creates a record table over `slots` that hashes keys with
    /// `hash_builder`.
    pub fn with_hasher(slots: &'a mut [Slot<R>], hash_builder: S) -> Self {
        Self {
            table: HashTable::new(slots),
            hash_builder,
        }
    }

    /// Returns the number of records in the table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots in the backing buffer.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Iterates over the records in unspecified order.
    pub fn iter(&self) -> Iter<'_, R> {
        self.table.iter()
    }

    /// The underlying table, for displacement and statistics queries.
    pub fn table(&self) -> &HashTable<'a, R> {
        &self.table
    }
}

impl<R, S> RecordTable<'_, R, S>
where
    R: Record,
    S: BuildHasher,
{
    /// Stores `record`, replacing and returning any record with the same key.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if the record's key is empty, and
    /// [`Error::CapacityExceeded`] if the key is new and the table is full.
    /// Neither error modifies the table.
    pub fn set(&mut self, record: R) -> Result<Option<R>, Error> {
        let hash = hash_key(&self.hash_builder, checked_key(record.key())?);
        match self.table.entry(hash, |stored| stored.key() == record.key())? {
            Entry::Occupied(mut entry) => Ok(Some(entry.insert(record))),
            Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(None)
            }
        }
    }

    /// Returns the record stored under `key`.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `key` is empty.
    pub fn get<Q: AsRef<[u8]> + ?Sized>(&self, key: &Q) -> Result<Option<&R>, Error> {
        let key = checked_key(key)?;
        let hash = hash_key(&self.hash_builder, key);
        Ok(self.table.find(hash, |stored| stored.key() == key))
    }

    /// Returns a mutable reference to the record stored under `key`.
    ///
    /// The record's key must not be changed through this reference.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `key` is empty.
    pub fn get_mut<Q: AsRef<[u8]> + ?Sized>(&mut self, key: &Q) -> Result<Option<&mut R>, Error> {
        let key = checked_key(key)?;
        let hash = hash_key(&self.hash_builder, key);
        Ok(self.table.find_mut(hash, |stored| stored.key() == key))
    }

    /// Returns `true` if a record is stored under `key`.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `key` is empty.
    pub fn contains_key<Q: AsRef<[u8]> + ?Sized>(&self, key: &Q) -> Result<bool, Error> {
        Ok(self.get(key)?.is_some())
    }

    /// Removes and returns the record stored under `key`.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `key` is empty.
    pub fn remove<Q: AsRef<[u8]> + ?Sized>(&mut self, key: &Q) -> Result<Option<R>, Error> {
        let key = checked_key(key)?;
        let hash = hash_key(&self.hash_builder, key);
        Ok(self.table.remove(hash, |stored| stored.key() == key))
    }
}
