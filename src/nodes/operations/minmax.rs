use crate::{ConcreteNodePtr, InnerNode, LeafNode, NodePtr, OpaqueNodePtr};

/// Search for the leaf with the minimum key, by lexicographic ordering.
///
/// # Safety
///  - This function cannot be called concurrently with any mutating operation
///    on `root` or any child node of `root`. This function will arbitrarily
///    read to any child in the given tree.
///
/// # Panics
///  - Panics if the tree at the root node is not well-formed: every inner
///    node must have at least one child and there must be no loops.
pub unsafe fn minimum_unchecked<K, V>(root: OpaqueNodePtr<K, V>) -> NodePtr<LeafNode<K, V>> {
    fn get_next_node<N: InnerNode>(inner_ptr: NodePtr<N>) -> OpaqueNodePtr<N::Key, N::Value> {
        // SAFETY: The lifetime produced from this is bounded to this scope
        // and does not escape. Further, no other code mutates the node
        // referenced, which is enforced by the "no concurrent mutation"
        // requirement on `minimum_unchecked`.
        let inner_node = unsafe { inner_ptr.as_ref() };

        inner_node.min().1
    }

    let mut current_node = root;

    loop {
        current_node = match current_node.to_node_ptr() {
            ConcreteNodePtr::Node4(inner_ptr) => get_next_node(inner_ptr),
            ConcreteNodePtr::Node16(inner_ptr) => get_next_node(inner_ptr),
            ConcreteNodePtr::Node48(inner_ptr) => get_next_node(inner_ptr),
            ConcreteNodePtr::Node256(inner_ptr) => get_next_node(inner_ptr),
            ConcreteNodePtr::LeafNode(leaf_ptr) => {
                return leaf_ptr;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{deallocate_tree, tests_common::setup_tree_from_entries};

    #[test]
    fn minimum_of_fixture_tree() {
        let root: crate::OpaqueNodePtr<Box<[u8]>, usize> = setup_tree_from_entries(
            [
                (Box::from(&b"bcd"[..]), 1usize),
                (Box::from(&b"abc"[..]), 2),
                (Box::from(&b"abd"[..]), 3),
                (Box::from(&b"zzz"[..]), 4),
            ]
            .into_iter(),
        );

        // SAFETY: There are no concurrent operations on the tree.
        let min_leaf = unsafe { minimum_unchecked(root) };
        // SAFETY: The tree is not mutated while this reference lives.
        assert_eq!(unsafe { min_leaf.as_ref() }.key_ref().as_ref(), b"abc");

        // SAFETY: The tree is only deallocated once, at the end of the test.
        unsafe { deallocate_tree(root) };
    }
}
