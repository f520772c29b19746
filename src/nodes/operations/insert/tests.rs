use super::*;
use crate::{
    deallocate_tree, search_unchecked,
    tests_common::{keys_with_shared_prefix, setup_tree_from_entries},
    ConcreteNodePtr, NodeType,
};

fn insert_entry(
    root: OpaqueNodePtr<Box<[u8]>, usize>,
    key: Box<[u8]>,
    value: usize,
) -> OpaqueNodePtr<Box<[u8]>, usize> {
    // SAFETY: The trees in these tests are exclusively owned by the test
    // function, no concurrent access happens.
    let insert_point = unsafe { search_for_insert_point(root, &key) }.unwrap();
    unsafe { insert_point.apply(key, value) }.new_root
}

fn search(root: OpaqueNodePtr<Box<[u8]>, usize>, key: &[u8]) -> Option<usize> {
    // SAFETY: The trees in these tests are not mutated during the search.
    unsafe { search_unchecked(root, key).map(|leaf| *leaf.as_ref().value_ref()) }
}

#[test]
fn insert_grows_node_through_every_size_class() {
    let keys = keys_with_shared_prefix(b"A", 49);

    let mut root = setup_tree_from_entries(
        keys[..2]
            .iter()
            .cloned()
            .enumerate()
            .map(|(value, key)| (key, value)),
    );
    assert_eq!(root.node_type(), NodeType::Node4);

    for (value, key) in keys.iter().cloned().enumerate().skip(2) {
        root = insert_entry(root, key, value);

        let expected = match value + 1 {
            3..=4 => NodeType::Node4,
            5..=16 => NodeType::Node16,
            17..=48 => NodeType::Node48,
            _ => NodeType::Node256,
        };
        assert_eq!(root.node_type(), expected);
    }

    for (value, key) in keys.iter().enumerate() {
        assert_eq!(search(root, key), Some(value));
    }

    // SAFETY: The tree is only deallocated once, at the end of the test.
    unsafe { deallocate_tree(root) };
}

#[test]
fn insert_same_key_replaces_value_in_place() {
    let mut root: OpaqueNodePtr<Box<[u8]>, usize> = setup_tree_from_entries(
        [
            (Box::from(&b"abc"[..]), 0usize),
            (Box::from(&b"abd"[..]), 1),
        ]
        .into_iter(),
    );

    let insert_point =
        // SAFETY: The tree is exclusively owned by this test.
        unsafe { search_for_insert_point(root, &Box::from(&b"abc"[..])) }.unwrap();
    assert!(matches!(
        insert_point.insert_kind,
        InsertKind::Exact { .. }
    ));

    // SAFETY: Same as above.
    let result = unsafe { insert_point.apply(Box::from(&b"abc"[..]), 17usize) };
    let existing = result.existing_leaf.expect("the old leaf should be returned");
    assert_eq!(existing.key_ref().as_ref(), b"abc");
    assert_eq!(*existing.value_ref(), 0);

    root = result.new_root;
    assert_eq!(search(root, b"abc"), Some(17));
    assert_eq!(search(root, b"abd"), Some(1));

    // SAFETY: The tree is only deallocated once, at the end of the test.
    unsafe { deallocate_tree(root) };
}

#[test]
fn split_leaf_creates_inner_node_with_common_prefix() {
    let mut root = setup_tree_from_entries([(Box::from(&b"foobar"[..]), 0usize)].into_iter());

    root = insert_entry(root, Box::from(&b"foobaz"[..]), 1);

    // The two keys share the prefix "fooba" and fork on 'r'/'z'.
    match root.to_node_ptr() {
        ConcreteNodePtr::Node4(inner_ptr) => {
            // SAFETY: The tree is not mutated while this reference lives.
            let inner = unsafe { inner_ptr.as_ref() };
            assert_eq!(inner.header().prefix_len(), 5);
            assert_eq!(inner.header().read_prefix(), b"fooba");
            assert_eq!(inner.header().num_children(), 2);

            let child_bytes: Vec<u8> = inner.iter().map(|(key_byte, _)| key_byte).collect();
            assert_eq!(child_bytes, vec![b'r', b'z']);
        },
        other => panic!("expected a Node4 root, got {other:?}"),
    }

    assert_eq!(search(root, b"foobar"), Some(0));
    assert_eq!(search(root, b"foobaz"), Some(1));
    assert_eq!(search(root, b"foo"), None);

    // SAFETY: The tree is only deallocated once, at the end of the test.
    unsafe { deallocate_tree(root) };
}

#[test]
fn mismatched_prefix_splits_compressed_path() {
    let mut root = setup_tree_from_entries(
        [
            (Box::from(&b"aaaaaX"[..]), 0usize),
            (Box::from(&b"aaaaaY"[..]), 1),
        ]
        .into_iter(),
    );

    root = insert_entry(root, Box::from(&b"aaaZ"[..]), 2);

    // The new root keeps the still-common "aaa" prefix, with the retained
    // inner node holding the "a" remainder of the old compressed path.
    match root.to_node_ptr() {
        ConcreteNodePtr::Node4(inner_ptr) => {
            // SAFETY: The tree is not mutated while this reference lives.
            let inner = unsafe { inner_ptr.as_ref() };
            assert_eq!(inner.header().prefix_len(), 3);
            assert_eq!(inner.header().read_prefix(), b"aaa");
            assert_eq!(inner.header().num_children(), 2);

            let old_inner = inner.lookup_child(b'a').expect("old node under byte 'a'");
            // SAFETY: Same as above.
            let old_inner_header = unsafe { old_inner.header_ref_unchecked() };
            assert_eq!(old_inner.node_type(), NodeType::Node4);
            assert_eq!(old_inner_header.prefix_len(), 1);
            assert_eq!(old_inner_header.read_prefix(), b"a");
        },
        other => panic!("expected a Node4 root, got {other:?}"),
    }

    assert_eq!(search(root, b"aaaaaX"), Some(0));
    assert_eq!(search(root, b"aaaaaY"), Some(1));
    assert_eq!(search(root, b"aaaZ"), Some(2));
    assert_eq!(search(root, b"aaa"), None);
    assert_eq!(search(root, b"aaaa"), None);

    // SAFETY: The tree is only deallocated once, at the end of the test.
    unsafe { deallocate_tree(root) };
}

#[test]
fn mismatch_past_inline_capacity_reconstructs_prefix_from_leaf() {
    // The shared prefix is 12 bytes, spilling past the inline capacity.
    let mut root = setup_tree_from_entries(
        [
            (Box::from(&b"abcdefghijklX"[..]), 0usize),
            (Box::from(&b"abcdefghijklY"[..]), 1),
        ]
        .into_iter(),
    );

    // Diverges at index 9, inside the implicit portion of the prefix.
    root = insert_entry(root, Box::from(&b"abcdefghiZ"[..]), 2);

    match root.to_node_ptr() {
        ConcreteNodePtr::Node4(inner_ptr) => {
            // SAFETY: The tree is not mutated while this reference lives.
            let inner = unsafe { inner_ptr.as_ref() };
            assert_eq!(inner.header().prefix_len(), 9);
            assert_eq!(inner.header().read_prefix(), b"abcdefgh");

            let old_inner = inner.lookup_child(b'j').expect("old node under byte 'j'");
            // SAFETY: Same as above.
            let old_inner_header = unsafe { old_inner.header_ref_unchecked() };
            // "abcdefghij" consumed on the path, "kl" remains compressed.
            assert_eq!(old_inner_header.prefix_len(), 2);
            assert_eq!(old_inner_header.read_prefix(), b"kl");
        },
        other => panic!("expected a Node4 root, got {other:?}"),
    }

    assert_eq!(search(root, b"abcdefghijklX"), Some(0));
    assert_eq!(search(root, b"abcdefghijklY"), Some(1));
    assert_eq!(search(root, b"abcdefghiZ"), Some(2));
    assert_eq!(search(root, b"abcdefghijklZ"), None);

    // SAFETY: The tree is only deallocated once, at the end of the test.
    unsafe { deallocate_tree(root) };
}

#[test]
fn insert_prefix_key_errors_without_mutation() {
    let root = setup_tree_from_entries(
        [
            (Box::from(&b"aaaaaX"[..]), 0usize),
            (Box::from(&b"aaaaaY"[..]), 1),
        ]
        .into_iter(),
    );

    // Key exhausted inside the compressed path.
    // SAFETY: The tree is exclusively owned by this test.
    let result = unsafe { search_for_insert_point(root, &Box::from(&b"aaa"[..])) };
    assert_eq!(
        result.unwrap_err(),
        InsertPrefixError {
            byte_repr: Box::from(&b"aaa"[..])
        }
    );

    // Key exhausted exactly at the inner node.
    // SAFETY: Same as above.
    let result = unsafe { search_for_insert_point(root, &Box::from(&b"aaaaa"[..])) };
    assert!(result.is_err());

    // New key is an extension of an existing key.
    // SAFETY: Same as above.
    let result = unsafe { search_for_insert_point(root, &Box::from(&b"aaaaaXtra"[..])) };
    assert!(result.is_err());

    assert_eq!(search(root, b"aaaaaX"), Some(0));
    assert_eq!(search(root, b"aaaaaY"), Some(1));

    // SAFETY: The tree is only deallocated once, at the end of the test.
    unsafe { deallocate_tree(root) };
}
