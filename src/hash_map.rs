use core::fmt::Debug;
use core::hash::BuildHasher;

use crate::error::Error;
use crate::error::checked_key;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;
use crate::hash_table::Iter as TableIter;
use crate::hash_table::IterMut as TableIterMut;
use crate::hash_table::Slot;
use crate::hasher::RotXorState;
use crate::hasher::hash_key;

/// A fixed-capacity hash map using the Robin Hood [`HashTable`] as the
/// underlying storage.
///
/// `HashMap<K, V, S>` stores key-value pairs in a caller-owned buffer of
/// `Slot<(K, V)>`. Keys are byte strings: any `K: AsRef<[u8]>` works, and
/// lookups accept anything that exposes the same bytes, so a map keyed by
/// `String` can be queried with `&str`. The empty key is rejected.
///
/// # Performance Characteristics
///
/// - **Memory**: the size of `(K, V)` plus a u64 hash and the `Option`
///   discriminant per slot. Nothing is allocated by the map.
///
/// # Examples
///
/// ```rust
/// use robin_table::HashMap;
/// use robin_table::Slot;
///
/// let mut slots: [Slot<(&str, i32)>; 31] = Slot::array();
/// let mut map = HashMap::new(&mut slots);
///
/// map.insert("New element", 123)?;
/// assert_eq!(map.get("New element")?, Some(&123));
/// assert_eq!(map.remove("New element")?, Some(123));
/// assert_eq!(map.get("New element")?, None);
/// # Ok::<(), robin_table::Error>(())
/// ```
pub struct HashMap<'a, K, V, S = RotXorState> {
    table: HashTable<'a, (K, V)>,
    hash_builder: S,
}

impl<K, V, S> Debug for HashMap<'_, K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<'a, K, V> HashMap<'a, K, V> {
    /// Creates a map over `slots` using the default rotate-xor hasher.
    ///
    /// Every slot is reset to empty first. The capacity is `slots.len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::HashMap;
    /// use robin_table::Slot;
    ///
    /// let mut slots: Vec<Slot<(String, u64)>> = (0..997).map(|_| Slot::empty()).collect();
    /// let map = HashMap::new(&mut slots);
    /// assert_eq!(map.capacity(), 997);
    /// assert!(map.is_empty());
    /// ```
    pub fn new(slots: &'a mut [Slot<(K, V)>]) -> Self {
        Self::with_hasher(slots, RotXorState)
    }
}

impl<'a, K, V, S> HashMap<'a, K, V, S> {
    /// Creates a map over `slots` that hashes keys with `hash_builder`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::HashMap;
    /// use robin_table::Slot;
    /// use siphasher::sip::SipHasher;
    /// use std::hash::BuildHasherDefault;
    ///
    /// let mut slots: [Slot<(&str, u8)>; 8] = Slot::array();
    /// let mut map = HashMap::with_hasher(&mut slots, BuildHasherDefault::<SipHasher>::default());
    /// map.insert("k", 1)?;
    /// assert_eq!(map.get("k")?, Some(&1));
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn with_hasher(slots: &'a mut [Slot<(K, V)>], hash_builder: S) -> Self {
        Self {
            table: HashTable::new(slots),
            hash_builder,
        }
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots, which is the most elements the map can
    /// ever hold.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all elements from the map. The buffer keeps its length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::HashMap;
    /// use robin_table::Slot;
    ///
    /// let mut slots: [Slot<(&str, &str)>; 4] = Slot::array();
    /// let mut map = HashMap::new(&mut slots);
    /// map.insert("1", "a")?;
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 4);
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// The underlying table, for displacement and statistics queries.
    pub fn table(&self) -> &HashTable<'a, (K, V)> {
        &self.table
    }

    /// Iterates over all key-value pairs in unspecified order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::HashMap;
    /// use robin_table::Slot;
    ///
    /// let mut slots: [Slot<(&str, i32)>; 8] = Slot::array();
    /// let mut map = HashMap::new(&mut slots);
    /// map.insert("a", 1)?;
    /// map.insert("b", 2)?;
    ///
    /// let mut total = 0;
    /// for (_, value) in map.iter() {
    ///     total += value;
    /// }
    /// assert_eq!(total, 3);
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Iterates over all key-value pairs with mutable references to the
    /// values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Iterates over all keys in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Iterates over all values in unspecified order.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Iterates over mutable references to all values.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }
}

impl<K, V, S> HashMap<'_, K, V, S>
where
    K: AsRef<[u8]>,
    S: BuildHasher,
{
    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, `None` is returned.
    /// If the map did have this key present, the value is updated in place,
    /// and the old value is returned. The stored key is kept.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `key` is empty; [`Error::CapacityExceeded`] if
    /// the key is new and every slot is taken. The map is unchanged on error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::Error;
    /// use robin_table::HashMap;
    /// use robin_table::Slot;
    ///
    /// let mut slots: [Slot<(&str, &str)>; 2] = Slot::array();
    /// let mut map = HashMap::new(&mut slots);
    /// assert_eq!(map.insert("37", "a"), Ok(None));
    /// assert_eq!(map.insert("37", "b"), Ok(Some("a")));
    /// assert_eq!(map.get("37"), Ok(Some(&"b")));
    ///
    /// map.insert("38", "c")?;
    /// assert_eq!(map.insert("39", "d"), Err(Error::CapacityExceeded { capacity: 2 }));
    /// assert_eq!(map.insert("", "e"), Err(Error::EmptyKey));
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, Error> {
        let hash = hash_key(&self.hash_builder, checked_key(&key)?);
        match self
            .table
            .entry(hash, |(k, _)| k.as_ref() == key.as_ref())?
        {
            TableEntry::Occupied(mut entry) => {
                let old_value = core::mem::replace(&mut entry.get_mut().1, value);
                Ok(Some(old_value))
            }
            TableEntry::Vacant(entry) => {
                entry.insert((key, value));
                Ok(None)
            }
        }
    }

    fn make_hash<'q, Q: AsRef<[u8]> + ?Sized>(&self, key: &'q Q) -> Result<(u64, &'q [u8]), Error> {
        let key = checked_key(key)?;
        Ok((hash_key(&self.hash_builder, key), key))
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `key` is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::HashMap;
    /// use robin_table::Slot;
    ///
    /// let mut slots: [Slot<(String, &str)>; 8] = Slot::array();
    /// let mut map = HashMap::new(&mut slots);
    /// map.insert(String::from("1"), "a")?;
    /// assert_eq!(map.get("1")?, Some(&"a"));
    /// assert_eq!(map.get("2")?, None);
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn get<Q: AsRef<[u8]> + ?Sized>(&self, key: &Q) -> Result<Option<&V>, Error> {
        let (hash, key) = self.make_hash(key)?;
        Ok(self
            .table
            .find(hash, |(k, _)| k.as_ref() == key)
            .map(|(_, v)| v))
    }

    /// Returns the stored key and value corresponding to the key.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `key` is empty.
    pub fn get_key_value<Q: AsRef<[u8]> + ?Sized>(&self, key: &Q) -> Result<Option<(&K, &V)>, Error> {
        let (hash, key) = self.make_hash(key)?;
        Ok(self
            .table
            .find(hash, |(k, _)| k.as_ref() == key)
            .map(|(k, v)| (k, v)))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `key` is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::HashMap;
    /// use robin_table::Slot;
    ///
    /// let mut slots: [Slot<(&str, &str)>; 8] = Slot::array();
    /// let mut map = HashMap::new(&mut slots);
    /// map.insert("1", "a")?;
    /// if let Some(x) = map.get_mut("1")? {
    ///     *x = "b";
    /// }
    /// assert_eq!(map.get("1")?, Some(&"b"));
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn get_mut<Q: AsRef<[u8]> + ?Sized>(&mut self, key: &Q) -> Result<Option<&mut V>, Error> {
        let (hash, key) = self.make_hash(key)?;
        Ok(self
            .table
            .find_mut(hash, |(k, _)| k.as_ref() == key)
            .map(|(_, v)| v))
    }

    /// Returns `true` if the map contains a value for the specified key.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `key` is empty.
    pub fn contains_key<Q: AsRef<[u8]> + ?Sized>(&self, key: &Q) -> Result<bool, Error> {
        Ok(self.get(key)?.is_some())
    }

    /// Removes a key from the map, returning the value at the key if the key
    /// was previously in the map.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `key` is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::HashMap;
    /// use robin_table::Slot;
    ///
    /// let mut slots: [Slot<(&str, &str)>; 8] = Slot::array();
    /// let mut map = HashMap::new(&mut slots);
    /// map.insert("1", "a")?;
    /// assert_eq!(map.remove("1")?, Some("a"));
    /// assert_eq!(map.remove("1")?, None);
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn remove<Q: AsRef<[u8]> + ?Sized>(&mut self, key: &Q) -> Result<Option<V>, Error> {
        Ok(self.remove_entry(key)?.map(|(_, v)| v))
    }

    /// Removes a key from the map, returning the stored key and value if the
    /// key was previously in the map.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] if `key` is empty.
    pub fn remove_entry<Q: AsRef<[u8]> + ?Sized>(&mut self, key: &Q) -> Result<Option<(K, V)>, Error> {
        let (hash, key) = self.make_hash(key)?;
        Ok(self.table.remove(hash, |(k, _)| k.as_ref() == key))
    }
}

/// An iterator over the entries of a [`HashMap`].
pub struct Iter<'s, K, V> {
    inner: TableIter<'s, (K, V)>,
}

impl<'s, K, V> Iterator for Iter<'s, K, V> {
    type Item = (&'s K, &'s V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// A mutable iterator over the entries of a [`HashMap`].
pub struct IterMut<'s, K, V> {
    inner: TableIterMut<'s, (K, V)>,
}

impl<'s, K, V> Iterator for IterMut<'s, K, V> {
    type Item = (&'s K, &'s mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<'s, 'a, K, V, S> IntoIterator for &'s HashMap<'a, K, V, S> {
    type Item = (&'s K, &'s V);
    type IntoIter = Iter<'s, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
