//! Helper functions for tests of the tree implementation.

use crate::{search_for_insert_point, AsBytes, LeafNode, NodePtr, OpaqueNodePtr};

/// Generate `count` keys that share the given prefix and differ in a final
/// distinguishing byte.
pub fn keys_with_shared_prefix(prefix: &[u8], count: usize) -> Vec<Box<[u8]>> {
    assert!(count <= 256, "only one distinguishing byte is appended");
    (0..count)
        .map(|index| {
            let mut key = prefix.to_vec();
            key.push(index as u8);
            key.into_boxed_slice()
        })
        .collect()
}

/// Generate every two byte key `[a, b]` with `a < first` and `b < second`,
/// producing a two-level fan-out.
pub fn keys_with_two_byte_fanout(first: usize, second: usize) -> Vec<Box<[u8]>> {
    assert!(first <= 256 && second <= 256, "key bytes must fit in a u8");
    (0..first)
        .flat_map(|a| (0..second).map(move |b| vec![a as u8, b as u8].into_boxed_slice()))
        .collect()
}

/// Build a tree from the given entries, returning the root node.
///
/// The caller is responsible for deallocating the returned tree with
/// [`crate::deallocate_tree`].
///
/// # Panics
///  - Panics if `entries` is empty or contains a key that is a prefix of
///    another key.
pub fn setup_tree_from_entries<K, V>(entries: impl Iterator<Item = (K, V)>) -> OpaqueNodePtr<K, V>
where
    K: AsBytes,
{
    let mut root = None;

    for (key, value) in entries {
        match root {
            None => {
                root = Some(NodePtr::allocate_node_ptr(LeafNode::new(key, value)).to_opaque());
            },
            Some(current_root) => {
                // SAFETY: There are no concurrent operations on the tree
                // being built.
                let insert_point = unsafe { search_for_insert_point(current_root, &key) }
                    .expect("no test key should be a prefix of another");
                // SAFETY: Same as above, the tree is exclusively owned here.
                let result = unsafe { insert_point.apply(key, value) };
                root = Some(result.new_root);
            },
        }
    }

    root.expect("test tree should not be empty")
}
