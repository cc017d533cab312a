use core::fmt::Debug;
use core::mem;

use crate::error::Error;

/// One storage cell of a table.
///
/// A slot is either empty or holds a value together with the hash of the
/// value's key. The stored hash lets the table compute an occupant's
/// displacement without re-hashing its key.
///
/// Callers own the slot buffer. Build one with [`Slot::empty`] (usable in
/// `const` array initializers), [`Slot::array`], or by collecting
/// `Slot::default()` into a `Vec`.
pub struct Slot<V> {
    hash: u64,
    value: Option<V>,
}

impl<V> Slot<V> {
    /// An empty slot.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::Slot;
    ///
    /// let slots: [Slot<u32>; 4] = [const { Slot::empty() }; 4];
    /// assert!(slots.iter().all(Slot::is_empty));
    /// ```
    pub const fn empty() -> Self {
        Self {
            hash: 0,
            value: None,
        }
    }

    /// A fixed-size array of empty slots.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::Slot;
    ///
    /// let slots: [Slot<String>; 8] = Slot::array();
    /// assert_eq!(slots.len(), 8);
    /// ```
    pub fn array<const N: usize>() -> [Self; N] {
        core::array::from_fn(|_| Self::empty())
    }

    /// Returns `true` if the slot holds no value.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// The value stored in this slot, if any.
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V: Clone> Clone for Slot<V> {
    fn clone(&self) -> Self {
        Self {
            hash: self.hash,
            value: self.value.clone(),
        }
    }
}

impl<V: Debug> Debug for Slot<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.value {
            Some(value) => f
                .debug_struct("Slot")
                .field("hash", &format_args!("{:#018x}", self.hash))
                .field("value", value)
                .finish(),
            None => f.write_str("Slot(empty)"),
        }
    }
}

/// Debug statistics for hash table analysis.
///
/// Available with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Number of slots in the backing buffer
    pub capacity: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Largest displacement of any occupant
    pub max_displacement: usize,
    /// Mean displacement over all occupants
    pub mean_displacement: f64,
    /// Size of a single slot in bytes
    pub slot_bytes: usize,
    /// Total size of the backing buffer in bytes
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Displacement: max {} / mean {:.3}",
            self.max_displacement, self.mean_displacement
        );
        println!(
            "Buffer: {} bytes ({} bytes per slot)",
            self.total_bytes, self.slot_bytes
        );
    }
}

/// A fixed-capacity Robin Hood hash table over a caller-owned slot buffer.
///
/// `HashTable<V>` stores values of type `V` in a borrowed `&mut [Slot<V>]`.
/// It never allocates and never grows: capacity is the length of the buffer.
/// Like other raw tables, it requires you to provide both the hash value and
/// an equality predicate for each operation; [`HashMap`](crate::HashMap),
/// [`HashSet`](crate::HashSet) and [`RecordTable`](crate::RecordTable) build
/// keyed interfaces on top of it.
///
/// Collisions are resolved by linear probing with the Robin Hood rule: an
/// inserted value takes the seat of any occupant that sits closer to its own
/// home slot, and the evicted occupant continues probing. Removal shifts the
/// rest of the probe run back by one slot, so no tombstones are needed and a
/// lookup can stop as soon as it meets an occupant closer to home than the
/// sought key would be.
///
/// ## Example
///
/// ```rust
/// use robin_table::Slot;
/// use robin_table::hash_table::HashTable;
/// use robin_table::hasher::hash_bytes;
///
/// let mut slots: [Slot<(&str, u32)>; 16] = Slot::array();
/// let mut table = HashTable::new(&mut slots);
///
/// let hash = hash_bytes(b"apple");
/// table.insert(hash, ("apple", 3), |&(k, _)| k == "apple")?;
/// assert_eq!(table.find(hash, |&(k, _)| k == "apple"), Some(&("apple", 3)));
/// # Ok::<(), robin_table::Error>(())
/// ```
pub struct HashTable<'a, V> {
    slots: &'a mut [Slot<V>],
    populated: usize,
}

/// Where a probe walk stopped.
enum Probe {
    /// The sought value is stored here.
    Found { index: usize },
    /// The value is absent; a new value for this key belongs here.
    Vacant { index: usize },
    /// Every slot was visited without a match or a seat.
    Exhausted,
}

struct SlotDisplacement(Option<usize>);

impl Debug for SlotDisplacement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            Some(displacement) => write!(f, "{displacement:02}"),
            None => f.write_str(".."),
        }
    }
}

struct Displacements<'t, 'a, V>(&'t HashTable<'a, V>);

impl<V> Debug for Displacements<'_, '_, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries((0..self.0.capacity()).map(|index| SlotDisplacement(self.0.displacement_of(index))))
            .finish()
    }
}

impl<V> Debug for HashTable<'_, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field("populated", &self.populated)
            .field("capacity", &self.capacity())
            .field("displacements", &Displacements(self))
            .finish()
    }
}

impl<'a, V> HashTable<'a, V> {
    /// Creates a table over `slots`.
    ///
    /// Every slot is reset to empty first; values left in the buffer are
    /// dropped. The table's capacity is `slots.len()` and never changes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::Slot;
    /// use robin_table::hash_table::HashTable;
    ///
    /// let mut slots: Vec<Slot<u64>> = (0..997).map(|_| Slot::empty()).collect();
    /// let table = HashTable::new(&mut slots);
    /// assert_eq!(table.capacity(), 997);
    /// assert!(table.is_empty());
    /// ```
    pub fn new(slots: &'a mut [Slot<V>]) -> Self {
        slots.iter_mut().for_each(|slot| *slot = Slot::empty());
        Self {
            slots,
            populated: 0,
        }
    }

    /// Returns the number of values in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no values.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of slots, which is the maximum number of values the
    /// table can hold.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Removes all values from the table. The buffer stays borrowed and keeps
    /// its length.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = Slot::empty());
        self.populated = 0;
    }

    /// Returns an iterator over the values in the table, in slot order.
    ///
    /// Slot order depends on hashes and insertion history and should not be
    /// relied on.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.slots.iter(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator over mutable references to the values in the
    /// table.
    ///
    /// Mutating a value must not change the result of the hash or equality
    /// predicate used to store it.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            inner: self.slots.iter_mut(),
            remaining: self.populated,
        }
    }

    #[inline(always)]
    fn home_index(&self, hash: u64) -> usize {
        (hash % self.slots.len() as u64) as usize
    }

    #[inline(always)]
    fn next_index(&self, index: usize) -> usize {
        if index + 1 == self.slots.len() {
            0
        } else {
            index + 1
        }
    }

    /// Previous slot with wraparound. Written as `(i + capacity - 1) % capacity`
    /// so that index 0 maps to `capacity - 1`.
    #[inline(always)]
    fn prev_index(&self, index: usize) -> usize {
        (index + self.slots.len() - 1) % self.slots.len()
    }

    #[inline(always)]
    fn distance(&self, home: usize, index: usize) -> usize {
        (index + self.slots.len() - home) % self.slots.len()
    }

    /// Displacement of the occupant at `index`. The slot must be occupied.
    #[inline(always)]
    fn displacement(&self, index: usize) -> usize {
        debug_assert!(!self.slots[index].is_empty());
        self.distance(self.home_index(self.slots[index].hash), index)
    }

    /// Returns how far the value at `index` sits from its home slot, or
    /// `None` if the slot is empty or out of range.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::Slot;
    /// use robin_table::hash_table::HashTable;
    ///
    /// let mut slots: [Slot<u32>; 8] = Slot::array();
    /// let mut table = HashTable::new(&mut slots);
    ///
    /// // Two values that share home slot 7: the second wraps to slot 0.
    /// table.insert(7, 1, |&v| v == 1)?;
    /// table.insert(7, 2, |&v| v == 2)?;
    /// assert_eq!(table.displacement_of(7), Some(0));
    /// assert_eq!(table.displacement_of(0), Some(1));
    /// assert_eq!(table.displacement_of(1), None);
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn displacement_of(&self, index: usize) -> Option<usize> {
        match self.slots.get(index) {
            Some(slot) if !slot.is_empty() => Some(self.displacement(index)),
            _ => None,
        }
    }

    /// Returns the largest displacement of any value in the table, or 0 for
    /// an empty table.
    pub fn max_displacement(&self) -> usize {
        (0..self.capacity())
            .filter_map(|index| self.displacement_of(index))
            .max()
            .unwrap_or(0)
    }

    /// Walks the probe run of `hash`.
    ///
    /// Stops on the matching value, on the first empty slot, or on the first
    /// occupant that sits closer to its own home than the sought value would
    /// at that position. By the Robin Hood invariant the value cannot appear
    /// past such an occupant, and that slot is where it would be seated.
    fn probe(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Probe {
        let capacity = self.capacity();
        if capacity == 0 {
            return Probe::Exhausted;
        }

        let mut index = self.home_index(hash);
        for dist in 0..capacity {
            let slot = &self.slots[index];
            let Some(occupant) = &slot.value else {
                return Probe::Vacant { index };
            };
            if slot.hash == hash && eq(occupant) {
                return Probe::Found { index };
            }
            if self.displacement(index) < dist {
                return Probe::Vacant { index };
            }
            index = self.next_index(index);
        }

        Probe::Exhausted
    }

    /// Places a new value at `index`, carrying any evicted occupant forward.
    ///
    /// The table must have at least one empty slot.
    fn seat(&mut self, index: usize, hash: u64, value: V) -> &mut V {
        debug_assert!(self.populated < self.capacity());

        let evicted = mem::take(&mut self.slots[index]);
        if !evicted.is_empty() {
            let dist = self.distance(self.home_index(evicted.hash), index) + 1;
            let next = self.next_index(index);
            self.displace(next, dist, evicted);
        }
        self.populated += 1;

        let slot = &mut self.slots[index];
        slot.hash = hash;
        slot.value.insert(value)
    }

    /// Carries `pending` forward from `index`, swapping it with every
    /// occupant closer to home than itself, until it lands in an empty slot.
    ///
    /// `dist` is the displacement `pending` would have at `index`. Some other
    /// slot must be empty, which bounds the walk to fewer than `capacity`
    /// steps.
    fn displace(&mut self, mut index: usize, mut dist: usize, mut pending: Slot<V>) {
        loop {
            if self.slots[index].is_empty() {
                self.slots[index] = pending;
                return;
            }

            let occupant_dist = self.displacement(index);
            if occupant_dist < dist {
                mem::swap(&mut self.slots[index], &mut pending);
                dist = occupant_dist;
            }

            index = self.next_index(index);
            dist += 1;
        }
    }

    /// Inserts `value`, or replaces the value already stored for the same key.
    ///
    /// `hash` is the hash of the value's key and `eq` returns `true` for a
    /// stored value with the same key. On replacement the previous value is
    /// returned and the table's length is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if the key is new and every slot is
    /// occupied. The table is not modified in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::Error;
    /// use robin_table::Slot;
    /// use robin_table::hash_table::HashTable;
    ///
    /// let mut slots: [Slot<(u64, &str)>; 2] = Slot::array();
    /// let mut table = HashTable::new(&mut slots);
    ///
    /// assert_eq!(table.insert(1, (1, "a"), |&(k, _)| k == 1), Ok(None));
    /// assert_eq!(table.insert(1, (1, "b"), |&(k, _)| k == 1), Ok(Some((1, "a"))));
    /// assert_eq!(table.insert(2, (2, "c"), |&(k, _)| k == 2), Ok(None));
    /// assert_eq!(
    ///     table.insert(3, (3, "d"), |&(k, _)| k == 3),
    ///     Err(Error::CapacityExceeded { capacity: 2 })
    /// );
    /// assert_eq!(table.len(), 2);
    /// ```
    pub fn insert(&mut self, hash: u64, value: V, eq: impl Fn(&V) -> bool) -> Result<Option<V>, Error> {
        match self.entry(hash, eq)? {
            Entry::Occupied(mut entry) => Ok(Some(entry.insert(value))),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(None)
            }
        }
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// The entry API splits lookup from insertion, so the predicate may
    /// borrow from a key that is moved into the table afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if no value matches and every slot
    /// is occupied, since there is no room for a vacant entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::Slot;
    /// use robin_table::hash_table::Entry;
    /// use robin_table::hash_table::HashTable;
    /// use robin_table::hasher::hash_bytes;
    ///
    /// let mut slots: [Slot<(String, u32)>; 8] = Slot::array();
    /// let mut table = HashTable::new(&mut slots);
    /// let key = String::from("hello");
    /// let hash = hash_bytes(key.as_bytes());
    ///
    /// match table.entry(hash, |(k, _)| *k == key)? {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert((key, 1));
    ///     }
    ///     Entry::Occupied(mut entry) => {
    ///         entry.get_mut().1 += 1;
    ///     }
    /// }
    ///
    /// table
    ///     .entry(hash, |(k, _)| k == "hello")?
    ///     .and_modify(|(_, count)| *count += 1);
    /// assert_eq!(table.find(hash, |(k, _)| k == "hello").map(|(_, c)| *c), Some(2));
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Result<Entry<'_, 'a, V>, Error> {
        match self.probe(hash, eq) {
            Probe::Found { index } => match &mut self.slots[index].value {
                Some(value) => Ok(Entry::Occupied(OccupiedEntry { value })),
                None => unreachable!("probe matched an empty slot"),
            },
            Probe::Vacant { index } if self.populated < self.capacity() => {
                Ok(Entry::Vacant(VacantEntry {
                    table: self,
                    hash,
                    index,
                }))
            }
            Probe::Vacant { .. } | Probe::Exhausted => Err(Error::CapacityExceeded {
                capacity: self.capacity(),
            }),
        }
    }

    /// Returns the slot index holding the value matching `eq`, if any.
    ///
    /// The walk starts at the home slot of `hash` and stops at the first
    /// empty slot, or at the first occupant that is closer to its own home
    /// than the sought value would be at that position.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::Slot;
    /// use robin_table::hash_table::HashTable;
    ///
    /// let mut slots: [Slot<u32>; 8] = Slot::array();
    /// let mut table = HashTable::new(&mut slots);
    /// table.insert(3, 30, |&v| v == 30)?;
    ///
    /// assert_eq!(table.find_index(3, |&v| v == 30), Some(3));
    /// assert_eq!(table.find_index(3, |&v| v == 31), None);
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn find_index(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        if self.populated == 0 {
            return None;
        }

        match self.probe(hash, eq) {
            Probe::Found { index } => Some(index),
            Probe::Vacant { .. } | Probe::Exhausted => None,
        }
    }

    /// Finds a value by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::Slot;
    /// use robin_table::hash_table::HashTable;
    /// use robin_table::hasher::hash_bytes;
    ///
    /// let mut slots: [Slot<&str>; 8] = Slot::array();
    /// let mut table = HashTable::new(&mut slots);
    /// table.insert(hash_bytes(b"one"), "one", |&s| s == "one")?;
    ///
    /// assert_eq!(table.find(hash_bytes(b"one"), |&s| s == "one"), Some(&"one"));
    /// assert_eq!(table.find(hash_bytes(b"two"), |&s| s == "two"), None);
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let index = self.find_index(hash, eq)?;
        self.slots[index].value.as_ref()
    }

    /// Finds a value by hash and equality predicate, returning a mutable
    /// reference.
    ///
    /// The mutation must not change the value's key.
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let index = self.find_index(hash, eq)?;
        self.slots[index].value.as_mut()
    }

    /// Removes and returns the value matching `eq`.
    ///
    /// The following values of the probe run are shifted back by one slot
    /// until an empty slot or a value sitting in its home slot is reached,
    /// so every remaining value stays reachable.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_table::Slot;
    /// use robin_table::hash_table::HashTable;
    ///
    /// let mut slots: [Slot<u32>; 8] = Slot::array();
    /// let mut table = HashTable::new(&mut slots);
    /// table.insert(5, 1, |&v| v == 1)?;
    /// table.insert(5, 2, |&v| v == 2)?;
    ///
    /// assert_eq!(table.remove(5, |&v| v == 1), Some(1));
    /// assert_eq!(table.find_index(5, |&v| v == 2), Some(5));
    /// assert_eq!(table.remove(5, |&v| v == 1), None);
    /// # Ok::<(), robin_table::Error>(())
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        let index = self.find_index(hash, eq)?;
        let removed = mem::take(&mut self.slots[index]).value;
        self.populated -= 1;
        self.backward_shift(index);
        removed
    }

    /// Closes the hole at `hole` by pulling each following displaced value
    /// back one slot.
    fn backward_shift(&mut self, hole: usize) {
        let mut next = self.next_index(hole);
        for _ in 1..self.capacity() {
            if self.slots[next].is_empty() || self.displacement(next) == 0 {
                break;
            }
            let prev = self.prev_index(next);
            debug_assert!(self.slots[prev].is_empty());
            self.slots.swap(prev, next);
            next = self.next_index(next);
        }
    }

    /// Computes a histogram of displacements for the current table state.
    ///
    /// Index `d` of the returned vector counts the values sitting `d` slots
    /// past their home slot. The vector has `max_displacement() + 1` bins, or
    /// none for an empty table.
    ///
    /// Available with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> alloc::vec::Vec<usize> {
        if self.populated == 0 {
            return alloc::vec::Vec::new();
        }

        let mut hist = alloc::vec![0usize; self.max_displacement() + 1];
        for displacement in (0..self.capacity()).filter_map(|index| self.displacement_of(index)) {
            hist[displacement] += 1;
        }
        hist
    }

    /// Returns detailed utilization statistics for debugging.
    ///
    /// Available with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let capacity = self.capacity();
        let total_displacement: usize = (0..capacity)
            .filter_map(|index| self.displacement_of(index))
            .sum();
        let slot_bytes = mem::size_of::<Slot<V>>();

        DebugStats {
            populated: self.populated,
            capacity,
            load_factor: if capacity == 0 {
                0.0
            } else {
                self.populated as f64 / capacity as f64
            },
            max_displacement: self.max_displacement(),
            mean_displacement: if self.populated == 0 {
                0.0
            } else {
                total_displacement as f64 / self.populated as f64
            },
            slot_bytes,
            total_bytes: slot_bytes * capacity,
        }
    }

    /// Full linear scan, ignoring the early-exit rule.
    #[cfg(test)]
    pub(crate) fn find_linear(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.hash == hash && slot.value.as_ref().is_some_and(&eq))
    }

    /// Panics unless every displaced value is preceded by an occupied slot
    /// whose displacement is at least one less, and the population count
    /// matches the occupied slots.
    #[cfg(test)]
    pub(crate) fn assert_robin_hood(&self) {
        let mut occupied = 0;
        for index in 0..self.capacity() {
            let Some(displacement) = self.displacement_of(index) else {
                continue;
            };
            occupied += 1;
            if displacement > 0 {
                let prev = self.prev_index(index);
                let prev_displacement = self.displacement_of(prev);
                assert!(
                    prev_displacement.is_some_and(|d| d + 1 >= displacement),
                    "slot {index} (displacement {displacement}) follows {prev_displacement:?}: {:#?}",
                    self
                );
            }
        }
        assert_eq!(occupied, self.populated, "{:#?}", self);
    }
}

/// A view into a single slot of a [`HashTable`], which is either occupied by
/// a matching value or vacant.
///
/// Obtained from [`HashTable::entry`].
pub enum Entry<'t, 'a, V> {
    /// A matching value is stored in the table.
    Occupied(OccupiedEntry<'t, V>),
    /// No value matches; the entry holds the seat where a new value goes.
    Vacant(VacantEntry<'t, 'a, V>),
}

impl<'t, V> Entry<'t, '_, V> {
    /// Ensures a value is in the entry by inserting `default` if vacant, and
    /// returns a mutable reference to the value.
    pub fn or_insert(self, default: V) -> &'t mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Ensures a value is in the entry by inserting the result of `default`
    /// if vacant, and returns a mutable reference to the value.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'t mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Applies `f` to the value if the entry is occupied.
    pub fn and_modify(mut self, f: impl FnOnce(&mut V)) -> Self {
        if let Entry::Occupied(entry) = &mut self {
            f(entry.get_mut());
        }
        self
    }
}

/// An occupied entry, holding the matching value.
pub struct OccupiedEntry<'t, V> {
    value: &'t mut V,
}

impl<'t, V> OccupiedEntry<'t, V> {
    /// Returns a reference to the stored value.
    pub fn get(&self) -> &V {
        &*self.value
    }

    /// Returns a mutable reference to the stored value.
    ///
    /// The mutation must not change the value's key.
    pub fn get_mut(&mut self) -> &mut V {
        &mut *self.value
    }

    /// Converts the entry into a mutable reference bound to the table borrow.
    pub fn into_mut(self) -> &'t mut V {
        self.value
    }

    /// Replaces the stored value, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        mem::replace(self.value, value)
    }
}

/// A vacant entry: the key is absent and the table has room for it.
pub struct VacantEntry<'t, 'a, V> {
    table: &'t mut HashTable<'a, V>,
    hash: u64,
    index: usize,
}

impl<'t, V> VacantEntry<'t, '_, V> {
    /// Inserts `value` and returns a mutable reference to it.
    ///
    /// Occupants that sit closer to their home than the new value are moved
    /// one seat further along the probe run.
    pub fn insert(self, value: V) -> &'t mut V {
        let table = self.table;
        table.seat(self.index, self.hash, value)
    }
}

/// An iterator over the values of a [`HashTable`].
pub struct Iter<'s, V> {
    inner: core::slice::Iter<'s, Slot<V>>,
    remaining: usize,
}

impl<'s, V> Iterator for Iter<'s, V> {
    type Item = &'s V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.inner.find_map(|slot| slot.value.as_ref())?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// An iterator over mutable references to the values of a [`HashTable`].
pub struct IterMut<'s, V> {
    inner: core::slice::IterMut<'s, Slot<V>>,
    remaining: usize,
}

impl<'s, V> Iterator for IterMut<'s, V> {
    type Item = &'s mut V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.inner.find_map(|slot| slot.value.as_mut())?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::vec::Vec;
    use core::hash::Hasher;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    fn buffer<V>(capacity: usize) -> Vec<Slot<V>> {
        (0..capacity).map(|_| Slot::empty()).collect()
    }

    fn item(key: u64) -> Item {
        Item {
            key,
            value: key as i32 * 2,
        }
    }

    fn insert_item(table: &mut HashTable<'_, Item>, hash: u64, key: u64) -> Result<Option<Item>, Error> {
        table.insert(hash, item(key), |v| v.key == key)
    }

    fn snapshot(table: &HashTable<'_, Item>) -> Vec<Option<Item>> {
        table.slots.iter().map(|slot| slot.value.clone()).collect()
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut slots = buffer(128);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);
        for k in 0..96u64 {
            let hash = hash_key(&state, k);
            assert_eq!(insert_item(&mut table, hash, k), Ok(None), "{:#?}", table);
            assert_eq!(table.find(hash, |v| v.key == k), Some(&item(k)), "{:#?}", table);
        }
        assert_eq!(table.len(), 96);
        table.assert_robin_hood();

        for k in 0..96u64 {
            let hash = hash_key(&state, k);
            assert_eq!(table.find(hash, |v| v.key == k), Some(&item(k)), "{:#?}", table);
        }

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
    }

    #[test]
    fn update_in_place_keeps_len() {
        let mut slots = buffer(16);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);
        let k = 42u64;

        assert_eq!(table.insert(9, Item { key: k, value: 7 }, |v| v.key == k), Ok(None));
        let index = table.find_index(9, |v| v.key == k);

        let previous = table.insert(9, Item { key: k, value: 11 }, |v| v.key == k);
        assert_eq!(previous, Ok(Some(Item { key: k, value: 7 })));
        assert_eq!(table.len(), 1);
        assert_eq!(table.find_index(9, |v| v.key == k), index);
        assert_eq!(table.find(9, |v| v.key == k).unwrap().value, 11);
    }

    #[test]
    fn find_mut_and_modify() {
        let mut slots = buffer(8);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);
        for k in 0..5u64 {
            insert_item(&mut table, k % 2, k).unwrap();
        }

        for k in 0..5u64 {
            if let Some(v) = table.find_mut(k % 2, |v| v.key == k) {
                v.value += 9;
            }
        }
        for k in 0..5u64 {
            let v = table.find(k % 2, |v| v.key == k).unwrap();
            assert_eq!(v.value, k as i32 * 2 + 9);
        }
    }

    #[test]
    fn remove_items() {
        let state = HashState::default();
        let mut slots = buffer(16);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);
        for k in 0..12u64 {
            insert_item(&mut table, hash_key(&state, k), k).unwrap();
        }
        assert_eq!(table.len(), 12);

        for k in [0u64, 3, 7] {
            let hash = hash_key(&state, k);
            let removed = table.remove(hash, |v| v.key == k).expect("should remove");
            assert_eq!(removed.key, k);
            assert!(table.find(hash, |v| v.key == k).is_none(), "{:#?}", table);
            table.assert_robin_hood();
        }
        assert_eq!(table.len(), 9);

        for k in (0..12u64).filter(|k| ![0, 3, 7].contains(k)) {
            let hash = hash_key(&state, k);
            assert_eq!(table.find(hash, |v| v.key == k), Some(&item(k)), "{:#?}", table);
        }

        let hash = hash_key(&state, 1000);
        assert!(table.remove(hash, |v| v.key == 1000).is_none());
        assert_eq!(table.len(), 9);
    }

    #[test]
    fn richer_occupant_is_evicted() {
        let mut slots = buffer(8);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);

        insert_item(&mut table, 7, 1).unwrap();
        insert_item(&mut table, 7, 2).unwrap();
        insert_item(&mut table, 0, 3).unwrap();
        assert_eq!(table.find_index(7, |v| v.key == 1), Some(7));
        assert_eq!(table.find_index(7, |v| v.key == 2), Some(0));
        assert_eq!(table.find_index(0, |v| v.key == 3), Some(1));

        // Home 7, reaches slot 1 with distance 2 and evicts key 3 (distance 1).
        insert_item(&mut table, 7, 4).unwrap();
        assert_eq!(table.find_index(7, |v| v.key == 4), Some(1), "{:#?}", table);
        assert_eq!(table.find_index(0, |v| v.key == 3), Some(2), "{:#?}", table);
        assert_eq!(table.displacement_of(1), Some(2));
        assert_eq!(table.displacement_of(2), Some(2));
        table.assert_robin_hood();
    }

    #[test]
    fn equal_displacement_is_not_evicted() {
        let mut slots = buffer(8);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);

        insert_item(&mut table, 2, 1).unwrap();
        insert_item(&mut table, 2, 2).unwrap();
        insert_item(&mut table, 3, 3).unwrap();
        assert_eq!(table.find_index(2, |v| v.key == 2), Some(3));
        assert_eq!(table.find_index(3, |v| v.key == 3), Some(4));

        // Key 4 ties with key 2 at slot 3 and moves on, then evicts key 3.
        insert_item(&mut table, 2, 4).unwrap();
        assert_eq!(table.find_index(2, |v| v.key == 1), Some(2));
        assert_eq!(table.find_index(2, |v| v.key == 2), Some(3), "{:#?}", table);
        assert_eq!(table.find_index(2, |v| v.key == 4), Some(4), "{:#?}", table);
        assert_eq!(table.find_index(3, |v| v.key == 3), Some(5), "{:#?}", table);
        table.assert_robin_hood();
    }

    #[test]
    fn wraparound_probe_and_backward_shift() {
        let mut slots = buffer(8);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);

        insert_item(&mut table, 7, 1).unwrap();
        insert_item(&mut table, 7, 2).unwrap();
        insert_item(&mut table, 7, 3).unwrap();
        insert_item(&mut table, 6, 4).unwrap();
        assert_eq!(table.find_index(7, |v| v.key == 1), Some(7));
        assert_eq!(table.find_index(7, |v| v.key == 2), Some(0));
        assert_eq!(table.find_index(7, |v| v.key == 3), Some(1));
        assert_eq!(table.find_index(6, |v| v.key == 4), Some(6));

        // Removing the value in the last slot pulls the run back across index 0.
        assert_eq!(table.remove(7, |v| v.key == 1), Some(item(1)));
        assert_eq!(table.find_index(7, |v| v.key == 2), Some(7), "{:#?}", table);
        assert_eq!(table.find_index(7, |v| v.key == 3), Some(0), "{:#?}", table);
        assert_eq!(table.displacement_of(1), None);
        assert_eq!(table.find_index(6, |v| v.key == 4), Some(6));
        table.assert_robin_hood();

        // Removing at index 0 must not disturb the value homed at 6.
        assert_eq!(table.remove(7, |v| v.key == 3), Some(item(3)));
        assert_eq!(table.find_index(7, |v| v.key == 2), Some(7));
        assert_eq!(table.find_index(6, |v| v.key == 4), Some(6));
        assert_eq!(table.len(), 2);
        table.assert_robin_hood();
    }

    #[test]
    fn wrapping_cluster_matches_plain_cluster() {
        let capacity = 16;
        let run = |base: u64| -> Vec<usize> {
            let mut slots = buffer(capacity);
            let mut table: HashTable<Item> = HashTable::new(&mut slots);
            let home = |k: u64| (base + k % 2) % capacity as u64;
            let displacements = |table: &HashTable<'_, Item>, keys: &[u64]| -> Vec<usize> {
                keys.iter()
                    .map(|&k| {
                        let index = table.find_index(home(k), |v| v.key == k).unwrap();
                        table.displacement_of(index).unwrap()
                    })
                    .collect()
            };

            for k in 0..6u64 {
                insert_item(&mut table, home(k), k).unwrap();
            }
            table.assert_robin_hood();
            let mut observed = displacements(&table, &[0, 1, 2, 3, 4, 5]);

            for k in [0u64, 3] {
                assert!(table.remove(home(k), |v| v.key == k).is_some());
                table.assert_robin_hood();
            }
            for k in [1u64, 2, 4, 5] {
                assert_eq!(table.find(home(k), |v| v.key == k), Some(&item(k)), "base {base}");
            }
            assert!(table.find(home(0), |v| v.key == 0).is_none());
            assert!(table.find(home(3), |v| v.key == 3).is_none());

            observed.extend(displacements(&table, &[1, 2, 4, 5]));
            observed
        };

        let plain = run(3);
        let wrapping = run(14);
        assert_eq!(plain, wrapping);
        assert!(plain[..6].iter().any(|&d| d >= 3), "{plain:?}");
    }

    #[test]
    fn backward_shift_stops_at_home_slot() {
        let mut slots = buffer(8);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);

        insert_item(&mut table, 2, 1).unwrap();
        insert_item(&mut table, 2, 2).unwrap();
        insert_item(&mut table, 3, 3).unwrap();
        insert_item(&mut table, 4, 4).unwrap();
        insert_item(&mut table, 6, 5).unwrap();
        assert_eq!(table.find_index(4, |v| v.key == 4), Some(5));
        assert_eq!(table.find_index(6, |v| v.key == 5), Some(6));

        table.remove(2, |v| v.key == 1).unwrap();
        assert_eq!(table.find_index(2, |v| v.key == 2), Some(2), "{:#?}", table);
        assert_eq!(table.find_index(3, |v| v.key == 3), Some(3), "{:#?}", table);
        assert_eq!(table.find_index(4, |v| v.key == 4), Some(4), "{:#?}", table);
        assert_eq!(table.displacement_of(5), None);
        assert_eq!(table.find_index(6, |v| v.key == 5), Some(6), "{:#?}", table);
        table.assert_robin_hood();
    }

    #[test]
    fn fill_to_capacity_then_reject() {
        let capacity = 7;
        let mut slots = buffer(capacity);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);

        for k in 0..capacity as u64 {
            assert_eq!(insert_item(&mut table, k % 3, k), Ok(None), "{:#?}", table);
        }
        assert_eq!(table.len(), capacity);
        table.assert_robin_hood();

        let before = snapshot(&table);
        for (hash, key) in [(0u64, 100u64), (1, 101), (2, 102), (6, 103)] {
            assert_eq!(
                insert_item(&mut table, hash, key),
                Err(Error::CapacityExceeded { capacity })
            );
            assert_eq!(snapshot(&table), before);
            assert_eq!(table.len(), capacity);
        }
        for k in 0..capacity as u64 {
            assert_eq!(table.find(k % 3, |v| v.key == k), Some(&item(k)));
        }
        assert!(table.find(0, |v| v.key == 100).is_none());

        // Updating an existing key still works on a full table.
        assert_eq!(
            table.insert(1, Item { key: 4, value: -1 }, |v| v.key == 4),
            Ok(Some(item(4)))
        );
        assert_eq!(table.len(), capacity);

        // Freeing a slot makes room again.
        assert!(table.remove(2, |v| v.key == 5).is_some());
        assert_eq!(insert_item(&mut table, 0, 100), Ok(None));
        assert_eq!(table.find(0, |v| v.key == 100), Some(&item(100)));
        table.assert_robin_hood();
    }

    #[test]
    fn zero_capacity() {
        let mut slots: Vec<Slot<Item>> = Vec::new();
        let mut table = HashTable::new(&mut slots);
        assert_eq!(
            insert_item(&mut table, 0, 1),
            Err(Error::CapacityExceeded { capacity: 0 })
        );
        assert!(table.find(0, |v| v.key == 1).is_none());
        assert!(table.remove(0, |v| v.key == 1).is_none());
        assert_eq!(table.max_displacement(), 0);
        assert!(table.probe_histogram().is_empty());
    }

    #[test]
    fn capacity_one() {
        let mut slots = buffer(1);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);
        assert_eq!(insert_item(&mut table, 12345, 1), Ok(None));
        assert_eq!(
            insert_item(&mut table, 999, 2),
            Err(Error::CapacityExceeded { capacity: 1 })
        );
        assert_eq!(table.remove(12345, |v| v.key == 1), Some(item(1)));
        assert_eq!(insert_item(&mut table, 999, 2), Ok(None));
        assert_eq!(table.find_index(999, |v| v.key == 2), Some(0));
    }

    #[test]
    fn new_resets_buffer() {
        let mut slots = buffer(4);
        {
            let mut table: HashTable<Item> = HashTable::new(&mut slots);
            insert_item(&mut table, 1, 1).unwrap();
        }
        assert!(!slots[1].is_empty());
        assert_eq!(slots[1].value(), Some(&item(1)));

        let table: HashTable<Item> = HashTable::new(&mut slots);
        assert!(table.is_empty());
        assert!(table.find(1, |v| v.key == 1).is_none());
    }

    #[test]
    fn early_exit_agrees_with_linear_scan() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let capacity = 61;
        let mut slots = buffer(capacity);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);
        let home = |k: u64| k.wrapping_mul(0x9e37_79b9_7f4a_7c15) >> 58;

        for _ in 0..5_000 {
            let k = rng.random_range(0..120u64);
            if rng.random_bool(0.55) {
                match insert_item(&mut table, home(k), k) {
                    Ok(_) => {}
                    Err(Error::CapacityExceeded { .. }) => assert_eq!(table.len(), capacity),
                    Err(e) => panic!("unexpected error {e}"),
                }
            } else {
                table.remove(home(k), |v| v.key == k);
            }
        }
        table.assert_robin_hood();

        for k in 0..120u64 {
            assert_eq!(
                table.find_index(home(k), |v| v.key == k),
                table.find_linear(home(k), |v| v.key == k),
                "key {k}: {:#?}",
                table
            );
        }
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn insert_many() {
        let state = HashState::default();
        let mut slots = buffer(16_384);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);
        for k in 0..15_000u64 {
            insert_item(&mut table, hash_key(&state, k), k).unwrap();
        }
        assert_eq!(table.len(), 15_000);
        for k in 0..15_000u64 {
            let found = table.find(hash_key(&state, k), |v| v.key == k);
            assert_eq!(found, Some(&item(k)));
        }
        table.assert_robin_hood();
        for k in (0..15_000u64).step_by(2) {
            assert!(table.remove(hash_key(&state, k), |v| v.key == k).is_some());
        }
        for k in 0..15_000u64 {
            let found = table.find(hash_key(&state, k), |v| v.key == k);
            assert_eq!(found.is_some(), k % 2 == 1);
        }
        table.assert_robin_hood();
    }

    #[test]
    fn iterators_visit_every_value() {
        let mut slots = buffer(8);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);
        for k in 0..5u64 {
            insert_item(&mut table, k * 3, k).unwrap();
        }
        assert_eq!(table.iter().len(), 5);
        let mut keys: Vec<u64> = table.iter().map(|v| v.key).collect();
        keys.sort_unstable();
        assert_eq!(keys, [0, 1, 2, 3, 4]);

        table.iter_mut().for_each(|v| v.value = 0);
        assert!(table.iter().all(|v| v.value == 0));

        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn probe_histogram_and_stats() {
        let mut slots = buffer(8);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);
        for k in 0..4u64 {
            insert_item(&mut table, 1, k).unwrap();
        }
        assert_eq!(table.probe_histogram(), [1, 1, 1, 1]);
        assert_eq!(table.max_displacement(), 3);

        let stats = table.debug_stats();
        assert_eq!(stats.populated, 4);
        assert_eq!(stats.capacity, 8);
        assert!((stats.load_factor - 0.5).abs() < f64::EPSILON);
        assert!((stats.mean_displacement - 1.5).abs() < f64::EPSILON);
        assert_eq!(stats.total_bytes, 8 * stats.slot_bytes);
    }

    #[test]
    fn debug_shows_displacements() {
        let mut slots = buffer(4);
        let mut table: HashTable<Item> = HashTable::new(&mut slots);
        insert_item(&mut table, 1, 1).unwrap();
        insert_item(&mut table, 1, 2).unwrap();
        let rendered = format!("{:?}", table);
        assert!(rendered.contains("[.., 00, 01, ..]"), "{rendered}");
        assert!(rendered.contains("populated: 2"), "{rendered}");
    }
}
