//! Property-based tests for the tree, using `BTreeMap` as an oracle.

use artree::TreeMap;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for fixed-length keys, which can never be prefixes of each other.
fn fixed_length_key() -> impl Strategy<Value = [u8; 6]> {
    any::<[u8; 6]>()
}

/// Strategy for variable-length keys, which may produce prefix collisions.
fn variable_length_key() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=12)
}

/// Operations for random workload testing.
#[derive(Debug, Clone)]
enum Op {
    Insert([u8; 6], u64),
    Get([u8; 6]),
    Remove([u8; 6]),
}

fn operations(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => (fixed_length_key(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
            1 => fixed_length_key().prop_map(Op::Get),
            2 => fixed_length_key().prop_map(Op::Remove),
        ],
        0..=max_ops,
    )
}

/// Whether one key is a proper prefix of the other, or both are equal in a
/// way that makes the pair prefix-free.
fn has_prefix_relation(a: &[u8], b: &[u8]) -> bool {
    a != b && (a.starts_with(b) || b.starts_with(a))
}

proptest! {
    /// Every inserted key is retrievable with its latest value, and absent
    /// keys stay absent.
    #[test]
    fn round_trip_against_oracle(entries in prop::collection::vec((fixed_length_key(), any::<u64>()), 0..128)) {
        let mut tree = TreeMap::<[u8; 6], u64>::new();
        let mut oracle = BTreeMap::<[u8; 6], u64>::new();

        for (key, value) in entries {
            prop_assert_eq!(tree.insert(key, value), oracle.insert(key, value));
        }

        prop_assert_eq!(tree.len(), oracle.len());
        for (key, value) in &oracle {
            prop_assert_eq!(tree.get(key), Some(value));
        }
    }

    /// Inserting the same key twice updates the value and counts the entry
    /// only once.
    #[test]
    fn update_semantics(key in fixed_length_key(), v1: u64, v2: u64) {
        let mut tree = TreeMap::<[u8; 6], u64>::new();

        prop_assert_eq!(tree.insert(key, v1), None);
        prop_assert_eq!(tree.insert(key, v2), Some(v1));
        prop_assert_eq!(tree.len(), 1);
        prop_assert_eq!(tree.get(&key), Some(&v2));
    }

    /// Removing an absent key is a no-op and does not disturb other entries.
    #[test]
    fn idempotent_removal(
        entries in prop::collection::vec((fixed_length_key(), any::<u64>()), 0..64),
        absent in fixed_length_key(),
    ) {
        let mut tree = TreeMap::<[u8; 6], u64>::new();
        let mut oracle = BTreeMap::<[u8; 6], u64>::new();

        for (key, value) in entries {
            tree.insert(key, value);
            oracle.insert(key, value);
        }

        oracle.remove(&absent);
        tree.remove(&absent);
        let len_after_first = tree.len();
        prop_assert_eq!(len_after_first, oracle.len());

        // A second removal of the same key changes nothing.
        prop_assert_eq!(tree.remove(&absent), None);
        prop_assert_eq!(tree.len(), len_after_first);

        for (key, value) in &oracle {
            prop_assert_eq!(tree.get(key), Some(value));
        }
    }

    /// Any permutation of the same insert sequence produces a tree that
    /// answers every lookup identically.
    #[test]
    fn insertion_order_independence(
        entries in prop::collection::btree_map(fixed_length_key(), any::<u64>(), 0..64),
        seed: u64,
    ) {
        let entries: Vec<_> = entries.into_iter().collect();

        let mut shuffled = entries.clone();
        // Deterministic Fisher-Yates driven by the seed input.
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (state >> 33) as usize % (i + 1);
            shuffled.swap(i, j);
        }

        let mut in_order = TreeMap::<[u8; 6], u64>::new();
        for (key, value) in &entries {
            in_order.insert(*key, *value);
        }
        let mut permuted = TreeMap::<[u8; 6], u64>::new();
        for (key, value) in &shuffled {
            permuted.insert(*key, *value);
        }

        prop_assert_eq!(in_order.len(), permuted.len());
        for (key, _) in &entries {
            prop_assert_eq!(in_order.get(key), permuted.get(key));
        }
    }

    /// A random mixed workload matches the oracle step by step.
    #[test]
    fn mixed_operations_against_oracle(ops in operations(256)) {
        let mut tree = TreeMap::<[u8; 6], u64>::new();
        let mut oracle = BTreeMap::<[u8; 6], u64>::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(tree.insert(key, value), oracle.insert(key, value));
                },
                Op::Get(key) => {
                    prop_assert_eq!(tree.get(&key), oracle.get(&key));
                },
                Op::Remove(key) => {
                    prop_assert_eq!(tree.remove(&key), oracle.remove(&key));
                },
            }

            prop_assert_eq!(tree.len(), oracle.len());
        }
    }

    /// `try_insert` accepts exactly the keys that have no prefix relation
    /// with an already stored key.
    #[test]
    fn try_insert_rejects_exactly_prefix_collisions(keys in prop::collection::vec(variable_length_key(), 0..64)) {
        let mut tree = TreeMap::<Vec<u8>, u64>::new();
        let mut stored: Vec<Vec<u8>> = Vec::new();

        for (value, key) in keys.into_iter().enumerate() {
            let collides = stored.iter().any(|existing| has_prefix_relation(existing, &key));

            match tree.try_insert(key.clone(), value as u64) {
                Ok(_) => {
                    prop_assert!(!collides, "accepted a colliding key {key:?}");
                    if !stored.contains(&key) {
                        stored.push(key);
                    }
                },
                Err(err) => {
                    prop_assert!(collides, "rejected a collision-free key {key:?}");
                    prop_assert_eq!(err.byte_repr.as_ref(), key.as_slice());
                },
            }
        }

        prop_assert_eq!(tree.len(), stored.len());
        for key in &stored {
            prop_assert!(tree.get(key.as_slice()).is_some());
        }
    }
}
