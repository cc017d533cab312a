use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use proptest::prelude::*;

use crate::Error;
use crate::HashTable;
use crate::Slot;
use crate::hash_table::Entry;

#[derive(Clone, Debug)]
enum Op {
    Insert(u8, u32),
    Upsert(u8),
    Remove(u8),
    Find(u8),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<u8>(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        1 => any::<u8>().prop_map(Op::Upsert),
        3 => any::<u8>().prop_map(Op::Remove),
        2 => any::<u8>().prop_map(Op::Find),
        1 => Just(Op::Clear),
    ]
}

// A small `spread` forces many keys onto the same hash.
fn hash_of(key: u8, spread: u64) -> u64 {
    u64::from(key) % spread
}

fn buffer(capacity: usize) -> Vec<Slot<(u8, u32)>> {
    (0..capacity).map(|_| Slot::empty()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn op_sequence_matches_model(
        capacity in 0usize..24,
        spread in 1u64..40,
        ops in proptest::collection::vec(op_strategy(), 0..160),
    ) {
        let mut slots = buffer(capacity);
        let mut table = HashTable::new(&mut slots);
        let mut model: BTreeMap<u8, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let result = table.insert(hash_of(key, spread), (key, value), |&(k, _)| k == key);
                    if let Some(&old) = model.get(&key) {
                        prop_assert_eq!(result, Ok(Some((key, old))));
                        model.insert(key, value);
                    } else if model.len() == capacity {
                        prop_assert_eq!(result, Err(Error::CapacityExceeded { capacity }));
                    } else {
                        prop_assert_eq!(result, Ok(None));
                        model.insert(key, value);
                    }
                }
                Op::Upsert(key) => {
                    match table.entry(hash_of(key, spread), |&(k, _)| k == key) {
                        Ok(entry) => {
                            let (_, count) = entry.and_modify(|(_, v)| *v = v.wrapping_add(1)).or_insert((key, 0));
                            let expected = model.entry(key).and_modify(|v| *v = v.wrapping_add(1)).or_insert(0);
                            prop_assert_eq!(*count, *expected);
                        }
                        Err(err) => {
                            prop_assert_eq!(err, Error::CapacityExceeded { capacity });
                            prop_assert!(!model.contains_key(&key));
                            prop_assert_eq!(model.len(), capacity);
                        }
                    }
                }
                Op::Remove(key) => {
                    let removed = table.remove(hash_of(key, spread), |&(k, _)| k == key);
                    prop_assert_eq!(removed.map(|(_, v)| v), model.remove(&key));
                }
                Op::Find(key) => {
                    let hash = hash_of(key, spread);
                    let fast = table.find_index(hash, |&(k, _)| k == key);
                    let slow = table.find_linear(hash, |&(k, _)| k == key);
                    prop_assert_eq!(fast, slow);
                    prop_assert_eq!(
                        table.find(hash, |&(k, _)| k == key).map(|&(_, v)| v),
                        model.get(&key).copied()
                    );
                }
                Op::Clear => {
                    table.clear();
                    model.clear();
                }
            }

            prop_assert_eq!(table.len(), model.len());
            table.assert_robin_hood();
        }

        for (&key, &value) in &model {
            prop_assert_eq!(
                table.find(hash_of(key, spread), |&(k, _)| k == key),
                Some(&(key, value))
            );
        }
        let mut stored: Vec<(u8, u32)> = table.iter().copied().collect();
        stored.sort_unstable();
        let expected: Vec<(u8, u32)> = model.into_iter().collect();
        prop_assert_eq!(stored, expected);
    }

    #[test]
    fn distinct_keys_fill_exactly_to_capacity(
        capacity in 1usize..32,
        spread in 1u64..8,
    ) {
        let mut slots = buffer(capacity);
        let mut table = HashTable::new(&mut slots);

        for key in 0..capacity as u8 {
            prop_assert_eq!(
                table.insert(hash_of(key, spread), (key, u32::from(key)), |&(k, _)| k == key),
                Ok(None)
            );
        }
        table.assert_robin_hood();

        let extra = capacity as u8;
        prop_assert_eq!(
            table.insert(hash_of(extra, spread), (extra, 0), |&(k, _)| k == extra),
            Err(Error::CapacityExceeded { capacity })
        );
        for key in 0..capacity as u8 {
            prop_assert_eq!(
                table.find(hash_of(key, spread), |&(k, _)| k == key),
                Some(&(key, u32::from(key)))
            );
        }
    }
}
