//! Integration tests for the public map API.

use artree::TreeMap;

fn boxed(bytes: &[u8]) -> Box<[u8]> {
    Box::from(bytes)
}

#[test]
fn empty_tree() {
    let map = TreeMap::<Box<[u8]>, Box<[u8]>>::new();

    assert_eq!(map.get(&b"anything"[..]), None);
    assert_eq!(map.len(), 0);
}

#[test]
fn singleton_tree() {
    let mut map = TreeMap::<Box<[u8]>, Box<[u8]>>::new();

    map.try_insert(boxed(b"hello"), boxed(b"world")).unwrap();

    assert_eq!(map.get(&b"hello"[..]).map(|v| &**v), Some(&b"world"[..]));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&b"hell"[..]), None);
    assert_eq!(map.get(&b"hello!"[..]), None);
}

#[test]
fn leaf_split_on_shared_prefix() {
    let mut map = TreeMap::<Box<[u8]>, Box<[u8]>>::new();

    map.try_insert(boxed(b"foobar"), boxed(b"1")).unwrap();
    map.try_insert(boxed(b"foobaz"), boxed(b"2")).unwrap();

    assert_eq!(map.get(&b"foobar"[..]).map(|v| &**v), Some(&b"1"[..]));
    assert_eq!(map.get(&b"foobaz"[..]).map(|v| &**v), Some(&b"2"[..]));
    assert_eq!(map.get(&b"foo"[..]), None);
    assert_eq!(map.len(), 2);
}

#[test]
fn five_children_under_one_parent() {
    let mut map = TreeMap::<Box<[u8]>, u32>::new();

    for (value, key) in [b"Aa", b"Ab", b"Ac", b"Ad", b"Ae"].iter().enumerate() {
        map.try_insert(boxed(&key[..]), value as u32).unwrap();
    }

    assert_eq!(map.len(), 5);
    for (value, key) in [b"Aa", b"Ab", b"Ac", b"Ad", b"Ae"].iter().enumerate() {
        assert_eq!(map.get(&key[..]), Some(&(value as u32)));
    }
}

#[test]
fn seventeen_children_under_one_parent() {
    let mut map = TreeMap::<Box<[u8]>, u32>::new();

    for byte in 0u8..17 {
        map.try_insert(boxed(&[b'A', byte]), u32::from(byte)).unwrap();
    }

    assert_eq!(map.len(), 17);
    for byte in 0u8..17 {
        assert_eq!(map.get(&[b'A', byte][..]), Some(&u32::from(byte)));
    }
}

#[test]
fn full_fanout_under_one_parent() {
    let mut map = TreeMap::<Box<[u8]>, u32>::new();

    for byte in 0u8..=255 {
        map.try_insert(boxed(&[b'A', byte]), u32::from(byte)).unwrap();
    }

    assert_eq!(map.len(), 256);
    for byte in 0u8..=255 {
        assert_eq!(map.get(&[b'A', byte][..]), Some(&u32::from(byte)));
    }
}

#[test]
fn prefix_mismatch_split() {
    let mut map = TreeMap::<Box<[u8]>, Box<[u8]>>::new();

    map.try_insert(boxed(b"aaaaaX"), boxed(b"1")).unwrap();
    map.try_insert(boxed(b"aaaaaY"), boxed(b"2")).unwrap();
    map.try_insert(boxed(b"aaaZ"), boxed(b"3")).unwrap();

    assert_eq!(map.get(&b"aaaaaX"[..]).map(|v| &**v), Some(&b"1"[..]));
    assert_eq!(map.get(&b"aaaaaY"[..]).map(|v| &**v), Some(&b"2"[..]));
    assert_eq!(map.get(&b"aaaZ"[..]).map(|v| &**v), Some(&b"3"[..]));
    assert_eq!(map.len(), 3);
}

#[test]
fn update_then_remove_round_trip() {
    let mut map = TreeMap::<Box<[u8]>, u64>::new();

    assert_eq!(map.try_insert(boxed(b"key"), 1).unwrap(), None);
    assert_eq!(map.try_insert(boxed(b"key"), 2).unwrap(), Some(1));
    assert_eq!(map.len(), 1);

    assert_eq!(map.remove(&b"key"[..]), Some(2));
    assert_eq!(map.remove(&b"key"[..]), None);
    assert_eq!(map.len(), 0);
}

#[test]
fn insertion_order_does_not_change_lookup_results() {
    let keys: Vec<Box<[u8]>> = (0u16..300)
        .map(|i| {
            let spread = i.wrapping_mul(7919);
            boxed(&spread.to_be_bytes())
        })
        .collect();

    let mut forward = TreeMap::<Box<[u8]>, usize>::new();
    for (value, key) in keys.iter().enumerate() {
        forward.try_insert(key.clone(), value).unwrap();
    }

    let mut backward = TreeMap::<Box<[u8]>, usize>::new();
    for (value, key) in keys.iter().enumerate().rev() {
        backward.try_insert(key.clone(), value).unwrap();
    }

    assert_eq!(forward.len(), backward.len());
    for key in &keys {
        assert_eq!(forward.get(key.as_ref()), backward.get(key.as_ref()));
    }
}

#[test]
fn deep_shared_prefixes_stay_searchable() {
    let mut map = TreeMap::<Box<[u8]>, usize>::new();
    let prefix = b"0123456789abcdef";

    let keys: Vec<Box<[u8]>> = (0u8..32)
        .map(|i| {
            let mut key = prefix.to_vec();
            key.push(i);
            key.into_boxed_slice()
        })
        .collect();

    for (value, key) in keys.iter().enumerate() {
        map.try_insert(key.clone(), value).unwrap();
    }

    for (value, key) in keys.iter().enumerate() {
        assert_eq!(map.get(key.as_ref()), Some(&value));
    }

    let mut near_miss = prefix.to_vec();
    near_miss[12] ^= 0xff;
    near_miss.push(0);
    assert_eq!(map.get(near_miss.as_slice()), None);

    for key in &keys {
        assert!(map.remove(key.as_ref()).is_some());
    }
    assert!(map.is_empty());
}

#[test]
fn two_level_fanout_survives_partial_removal() {
    let keys = artree::tests_common::keys_with_two_byte_fanout(20, 20);
    let mut map = TreeMap::<Box<[u8]>, usize>::new();

    for (value, key) in keys.iter().enumerate() {
        map.try_insert(key.clone(), value).unwrap();
    }
    assert_eq!(map.len(), 400);

    for key in keys.iter().step_by(2) {
        assert!(map.remove(key.as_ref()).is_some());
    }
    assert_eq!(map.len(), 200);

    for (value, key) in keys.iter().enumerate() {
        if value % 2 == 0 {
            assert_eq!(map.get(key.as_ref()), None);
        } else {
            assert_eq!(map.get(key.as_ref()), Some(&value));
        }
    }
}

#[test]
fn mixed_workload_against_btreemap_oracle() {
    use std::collections::BTreeMap;

    let mut map = TreeMap::<Box<[u8]>, u64>::new();
    let mut oracle = BTreeMap::<Vec<u8>, u64>::new();

    // Deterministic pseudo-random mixed operations over 4-byte keys.
    let mut state = 0x9e3779b97f4a7c15u64;
    for _ in 0..4096 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let key = ((state >> 16) as u32 & 0x3ff).to_be_bytes();
        let value = state >> 32;

        match state % 3 {
            0 | 1 => {
                let previous = map.try_insert(Box::from(&key[..]), value).unwrap();
                assert_eq!(previous, oracle.insert(key.to_vec(), value));
            },
            _ => {
                assert_eq!(map.remove(&key[..]), oracle.remove(&key[..]));
            },
        }

        assert_eq!(map.len(), oracle.len());
    }

    for (key, value) in &oracle {
        assert_eq!(map.get(key.as_slice()), Some(value));
    }
}
