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

/// A fixed-capacity hash set backed by the Robin Hood [`HashTable`].
///
/// Elements are byte-string keys (`T: AsRef<[u8]>`); membership is decided by
/// the bytes alone. The set lives entirely in the caller's buffer.
///
/// # Examples
///
/// ```rust
/// use robin_table::HashSet;
/// use robin_table::Slot;
///
/// let mut slots: [Slot<&str>; 16] = Slot::array();
/// let mut books = HashSet::new(&mut slots);
///
/// books.insert("A Dance With Dragons")?;
/// books.insert("To Kill a Mockingbird")?;
/// books.insert("The Odyssey")?;
///
/// if !books.contains("The Winds of Winter")? {
///     println!("We have {} books, but The Winds of Winter ain't one.", books.len());
/// }
///
/// books.remove("The Odyssey")?;
/// for book in books.iter() {
///     println!("{book}");
/// }
/// # Ok::<(), robin_table::Error>(())
/// ```
pub struct HashSet<'a, T, S = RotXorState> {
    table: HashTable<'a, T>,
    hash_builder: S,
}

impl<T: Debug, S> Debug for HashSet<'_, T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, T> HashSet<'a, T> {
    /// Creates a set over `slots` with the default rotate-xor hasher.
    pub fn new(slots: &'a mut [Slot<T>]) -> Self {
        Self::with_hasher(slots, RotXorState)
    }
}

impl<'a, T, S> HashSet<'a, T, S> {
    /// Creates a set over `slots` that hashes elements with `hash_builder`.
    pub fn with_hasher(slots: &'a mut [Slot<T>], hash_builder: S) -> Self {
        Self {
            table: HashTable::new(slots),
            hash_builder,
        }
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots in the backing buffer.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Clears the set, removing all values.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// The underlying table.
    pub fn table(&self) -> &HashTable<'a, T> {
        &self.table
    }

    /// An iterator visiting all elements in unspecified order.
    pub fn iter(&self) -> Iter<'_, T> {
        self.table.iter()
    }
}

impl<T, S> HashSet<'_, T, S>
where
    T: AsRef<[u8]>,
    S: BuildHasher,
{
    fn make_hash<'q, Q: AsRef<[u8]> + ?Sized>(&self, value: &'q Q) -> Result<(u64, &'q [u8]), Error> {
        let bytes = checked_key(value)?;
        Ok((hash_key(&self.hash_builder, bytes), bytes))
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. If an equal value is
    /// already present it is left untouched and `value` is dropped.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] for an empty value and [`Error::CapacityExceeded`]
    /// when a new value does not fit.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::HashSet;
    /// use robin_table::Slot;
    ///
    /// let mut slots: [Slot<&str>; 4] = Slot::array();
    /// let mut set = HashSet::new(&mut slots);
    ///
    /// assert_eq!(set.insert("2"), Ok(true));
    /// assert_eq!(set.insert("2"), Ok(false));
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, value: T) -> Result<bool, Error> {
        let (hash, _) = self.make_hash(&value)?;
        match self.table.entry(hash, |stored| stored.as_ref() == value.as_ref())? {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(true)
            }
        }
    }

    /// Adds a value to the set, replacing and returning an existing equal
    /// value.
    ///
    /// # Errors
    ///
    /// Same as [`insert`](Self::insert).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::HashSet;
    /// use robin_table::Slot;
    ///
    /// let mut slots: [Slot<Vec<u8>>; 4] = Slot::array();
    /// let mut set = HashSet::new(&mut slots);
    /// set.insert(b"key".to_vec())?;
    /// assert_eq!(set.replace(b"key".to_vec())?, Some(b"key".to_vec()));
    /// assert_eq!(set.len(), 1);
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn replace(&mut self, value: T) -> Result<Option<T>, Error> {
        let (hash, _) = self.make_hash(&value)?;
        match self.table.entry(hash, |stored| stored.as_ref() == value.as_ref())? {
            Entry::Occupied(mut entry) => Ok(Some(entry.insert(value))),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(None)
            }
        }
    }

    /// Returns `true` if the set contains a value with the same bytes.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `value` is empty.
    pub fn contains<Q: AsRef<[u8]> + ?Sized>(&self, value: &Q) -> Result<bool, Error> {
        Ok(self.get(value)?.is_some())
    }

    /// Returns a reference to the stored value equal to `value`.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `value` is empty.
    pub fn get<Q: AsRef<[u8]> + ?Sized>(&self, value: &Q) -> Result<Option<&T>, Error> {
        let (hash, bytes) = self.make_hash(value)?;
        Ok(self.table.find(hash, |stored| stored.as_ref() == bytes))
    }

    /// Removes a value from the set. Returns whether the value was present.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `value` is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::HashSet;
    /// use robin_table::Slot;
    ///
    /// let mut slots: [Slot<&str>; 4] = Slot::array();
    /// let mut set = HashSet::new(&mut slots);
    /// set.insert("2")?;
    /// assert_eq!(set.remove("2")?, true);
    /// assert_eq!(set.remove("2")?, false);
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn remove<Q: AsRef<[u8]> + ?Sized>(&mut self, value: &Q) -> Result<bool, Error> {
        Ok(self.take(value)?.is_some())
    }

    /// Removes and returns the stored value equal to `value`, if any.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `value` is empty.
    pub fn take<Q: AsRef<[u8]> + ?Sized>(&mut self, value: &Q) -> Result<Option<T>, Error> {
        let (hash, bytes) = self.make_hash(value)?;
        Ok(self.table.remove(hash, |stored| stored.as_ref() == bytes))
    }
}

impl<'s, 'a, T, S> IntoIterator for &'s HashSet<'a, T, S> {
    type Item = &'s T;
    type IntoIter = Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
