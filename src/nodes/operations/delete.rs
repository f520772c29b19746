use crate::{
    nodes::operations::lookup::{check_prefix_lookup_child, PrefixMatchBehavior},
    AsBytes, ConcreteNodePtr, InnerNode, LeafNode, NodePtr, OpaqueNodePtr,
};

/// Remove a child node from the given inner node, shrinking or collapsing the
/// inner node if its occupancy drops low enough.
///
/// Returns the replacement node pointer if the inner node was replaced, or
/// `None` if the inner node was only modified in place.
///
/// The inner node is collapsed into its remaining child if there is only a
/// single child left after the removal. Collapsing the node involves
/// prepending the inner node key prefix and child key byte to the child's key
/// prefix.
///
/// # Safety
///  - `inner_node_ptr` must be a unique pointer to the node and must not have
///    any other mutable references.
///  - There must not be any mutable references to the children of the given
///    inner node either.
unsafe fn remove_child_from_inner_node_and_compress<N>(
    inner_node_ptr: NodePtr<N>,
    key_fragment: u8,
) -> Option<OpaqueNodePtr<N::Key, N::Value>>
where
    N: InnerNode,
{
    // SAFETY: The `inner_node` reference is scoped to this function and
    // dropped before cases where the inner node is deallocated. It is a
    // unique reference, by the safety requirements of the containing
    // function.
    let inner_node = unsafe { inner_node_ptr.as_mut() };

    inner_node
        .remove_child(key_fragment)
        .expect("child should be present");

    if inner_node.header().num_children() == 1 {
        // need to compress node into the remaining child

        let (child_key_byte, child_node_ptr) = {
            let mut children = inner_node.iter();
            let entry = children.next().expect("expected a single child");
            debug_assert!(
                children.next().is_none(),
                "expected only a single child, not more"
            );
            entry
        };

        // SAFETY: By the safety requirements of the function, there are no
        // other references to this child node. The reference only lasts for
        // the scope of this `if` block.
        if let Some(child_header) = unsafe { child_node_ptr.header_mut() } {
            // Construct the new child prefix by concatenating the parent
            // prefix, the child key byte, and the old child prefix. The
            // inline bytes are truncated at the capacity while the logical
            // lengths are summed, so descendants of a collapsed spilled path
            // still reconstruct correctly from their leaves.
            let parent_header = inner_node.header();
            let parent_prefix = parent_header.read_prefix();
            let parent_len = parent_header.prefix_len();

            let (old_prefix, old_len, old_capped_len) = child_header.clear_prefix();
            child_header.push_prefix(parent_prefix, parent_len);
            child_header.push_prefix(&[child_key_byte], 1);
            child_header.push_prefix(&old_prefix[..old_capped_len], old_len);
        }
        // the else case here is that the child is a leaf and has no
        // compressed path to fix up, since leaves store their full key

        // SAFETY: Since this function requires a unique pointer to the
        // original `inner_node_ptr`, we know that no other code will
        // deallocate the pointer.
        unsafe {
            drop(NodePtr::deallocate_node_ptr(inner_node_ptr));
        }

        Some(child_node_ptr)
    } else if N::TYPE.should_shrink_inner_node(inner_node.header().num_children()) {
        let new_inner_node = inner_node.shrink();

        let new_inner_node_ptr = NodePtr::allocate_node_ptr(new_inner_node).to_opaque();

        // SAFETY: Since this function requires a unique pointer to the
        // original `inner_node_ptr`, we know that no other code will
        // deallocate the pointer.
        unsafe {
            drop(NodePtr::deallocate_node_ptr(inner_node_ptr));
        }

        Some(new_inner_node_ptr)
    } else {
        None
    }
}

/// Delete the given non-root leaf node.
///
/// # Safety
///  - `parent_node_ptr` must be a unique pointer to the node and must not
///    have any other mutable references.
///  - There must not be any other mutable references to any children of the
///    `parent_node_ptr` either.
///  - `grandparent_node_ptr` must be a unique pointer to the node and must
///    not have any other mutable references.
///  - `leaf_node_ptr` must be a unique pointer to the node and not have any
///    other mutable references.
unsafe fn inner_delete_non_root_unchecked<K, V>(
    leaf_node_ptr: NodePtr<LeafNode<K, V>>,
    (parent_node_ptr, parent_key_byte): (OpaqueNodePtr<K, V>, u8),
    grandparent_node_ptr: Option<(OpaqueNodePtr<K, V>, u8)>,
    original_root: OpaqueNodePtr<K, V>,
) -> DeleteResult<K, V>
where
    K: AsBytes,
{
    let new_parent_node_ptr = match parent_node_ptr.to_node_ptr() {
        ConcreteNodePtr::Node4(parent_node_ptr) => unsafe {
            // SAFETY: Covered by the safety doc of the containing function
            remove_child_from_inner_node_and_compress(parent_node_ptr, parent_key_byte)
        },
        ConcreteNodePtr::Node16(parent_node_ptr) => unsafe {
            // SAFETY: Covered by the safety doc of the containing function
            remove_child_from_inner_node_and_compress(parent_node_ptr, parent_key_byte)
        },
        ConcreteNodePtr::Node48(parent_node_ptr) => unsafe {
            // SAFETY: Covered by the safety doc of the containing function
            remove_child_from_inner_node_and_compress(parent_node_ptr, parent_key_byte)
        },
        ConcreteNodePtr::Node256(parent_node_ptr) => unsafe {
            // SAFETY: Covered by the safety doc of the containing function
            remove_child_from_inner_node_and_compress(parent_node_ptr, parent_key_byte)
        },
        ConcreteNodePtr::LeafNode(_) => unreachable!("cannot delete a child from a leaf node"),
    };

    // If the parent node was replaced by another node, the new pointer has to
    // be written into the grandparent
    if let Some(new_parent_node_ptr) = new_parent_node_ptr {
        if let Some((grandparent_node_ptr, grandparent_key_byte)) = grandparent_node_ptr {
            fn write_inner_node<K, V, N>(
                grandparent_node_ptr: NodePtr<N>,
                grandparent_key_byte: u8,
                new_parent_node_ptr: OpaqueNodePtr<K, V>,
            ) where
                N: InnerNode<Key = K, Value = V>,
            {
                // SAFETY: The scope of the mutable reference is limited to
                // this function, and the containing function's safety
                // requirements mean that there are no other references to the
                // same node.
                let grandparent_node = unsafe { grandparent_node_ptr.as_mut() };
                grandparent_node.write_child(grandparent_key_byte, new_parent_node_ptr);
            }

            match grandparent_node_ptr.to_node_ptr() {
                ConcreteNodePtr::Node4(inner_node_ptr) => {
                    write_inner_node(inner_node_ptr, grandparent_key_byte, new_parent_node_ptr)
                },
                ConcreteNodePtr::Node16(inner_node_ptr) => {
                    write_inner_node(inner_node_ptr, grandparent_key_byte, new_parent_node_ptr)
                },
                ConcreteNodePtr::Node48(inner_node_ptr) => {
                    write_inner_node(inner_node_ptr, grandparent_key_byte, new_parent_node_ptr)
                },
                ConcreteNodePtr::Node256(inner_node_ptr) => {
                    write_inner_node(inner_node_ptr, grandparent_key_byte, new_parent_node_ptr)
                },
                ConcreteNodePtr::LeafNode(_) => {
                    unreachable!("cannot modify the children of a leaf node")
                },
            }
        }
    }

    // SAFETY: `leaf_node_ptr` is a unique pointer to the leaf node, no other
    // code will deallocate it.
    let leaf_node = unsafe { NodePtr::deallocate_node_ptr(leaf_node_ptr) };

    let new_root = match (new_parent_node_ptr, grandparent_node_ptr) {
        (Some(new_parent_node_ptr), None) => new_parent_node_ptr,
        _ => original_root,
    };

    DeleteResult {
        new_root: Some(new_root),
        deleted_leaf: leaf_node,
    }
}

/// The results of a successful delete operation
#[derive(Debug)]
pub struct DeleteResult<K, V> {
    /// The new root node for the tree, after the delete has been applied.
    ///
    /// If `None`, that means the tree is now empty.
    pub new_root: Option<OpaqueNodePtr<K, V>>,
    /// The leaf node that was successfully deleted.
    pub deleted_leaf: LeafNode<K, V>,
}

/// All the information needed to delete a leaf that has been located in the
/// tree.
#[derive(Debug)]
pub struct DeletePoint<K, V> {
    /// The grandparent node of the leaf that will be deleted and the key byte
    /// that was used to continue search.
    ///
    /// If there is no grandparent, this value is `None`.
    pub grandparent_ptr_and_parent_key_byte: Option<(OpaqueNodePtr<K, V>, u8)>,
    /// The parent node of the leaf that will be deleted and the key byte that
    /// was used to continue search.
    ///
    /// If the leaf node to delete is also the root, then this value is
    /// `None`. If the grandparent node is present, this value must also be
    /// present.
    pub parent_ptr_and_child_key_byte: Option<(OpaqueNodePtr<K, V>, u8)>,
    /// The leaf node to delete.
    pub leaf_node_ptr: NodePtr<LeafNode<K, V>>,
}

impl<K, V> DeletePoint<K, V> {
    /// Handle the logic of deleting a leaf node from the tree, after it has
    /// been found.
    ///
    /// # Safety
    ///  - The `root` [`OpaqueNodePtr`] must be a unique pointer to the
    ///    underlying tree.
    ///  - This function cannot be called concurrently to any reads or writes
    ///    of the `root` node or any child node of `root`. This function will
    ///    arbitrarily read or write to any child in the given tree.
    pub unsafe fn apply(self, root: OpaqueNodePtr<K, V>) -> DeleteResult<K, V>
    where
        K: AsBytes,
    {
        let DeletePoint {
            grandparent_ptr_and_parent_key_byte: grandparent_node_ptr,
            parent_ptr_and_child_key_byte: parent_node_ptr,
            leaf_node_ptr,
        } = self;

        match (parent_node_ptr, grandparent_node_ptr) {
            (None, None) => {
                // The leaf node was also the root node

                // SAFETY: The original `root` node pointer is a unique
                // pointer to the tree (required by the safety doc), which
                // means that `leaf_node_ptr` is also unique and can be
                // deallocated.
                let leaf_node = unsafe { NodePtr::deallocate_node_ptr(leaf_node_ptr) };

                DeleteResult {
                    new_root: None,
                    deleted_leaf: leaf_node,
                }
            },
            (None, Some(grandparent_node_ptr)) => {
                // search_for_delete_point should maintain this invariant
                panic!(
                    "found a grandparent node [{grandparent_node_ptr:?}] without a parent node, \
                     this should be impossible",
                );
            },
            (Some(parent_node_ptr), grandparent_node_ptr) => unsafe {
                // SAFETY: `root` is a unique pointer to the tree and there
                // will be no concurrent reads or writes to any portion of the
                // tree, so all these child nodes will be unique pointers and
                // not read/written by other code.
                inner_delete_non_root_unchecked(
                    leaf_node_ptr,
                    parent_node_ptr,
                    grandparent_node_ptr,
                    root,
                )
            },
        }
    }
}

/// Search in the given tree for the leaf node to delete, returning `None` if
/// it does not exist.
///
/// This function also returns the parent and grandparent nodes, which are
/// required by the delete process.
///
/// # Safety
///  - This function cannot be called concurrently with any mutating operation
///    on `root` or any child node of `root`. This function will arbitrarily
///    read to any child in the given tree.
pub unsafe fn search_for_delete_point<K, V>(
    root: OpaqueNodePtr<K, V>,
    key_bytes: &[u8],
) -> Option<DeletePoint<K, V>>
where
    K: AsBytes,
{
    let mut current_grandparent = None;
    let mut current_parent = None;
    let mut current_node = root;
    let mut current_depth = 0;
    let mut prefix_match_behavior = PrefixMatchBehavior::default();

    loop {
        let next_node = match current_node.to_node_ptr() {
            ConcreteNodePtr::Node4(inner_ptr) => unsafe {
                // SAFETY: The safety requirement is covered by the safety
                // requirement on the containing function
                check_prefix_lookup_child(
                    inner_ptr,
                    key_bytes,
                    &mut current_depth,
                    &mut prefix_match_behavior,
                )
            },
            ConcreteNodePtr::Node16(inner_ptr) => unsafe {
                // SAFETY: The safety requirement is covered by the safety
                // requirement on the containing function
                check_prefix_lookup_child(
                    inner_ptr,
                    key_bytes,
                    &mut current_depth,
                    &mut prefix_match_behavior,
                )
            },
            ConcreteNodePtr::Node48(inner_ptr) => unsafe {
                // SAFETY: The safety requirement is covered by the safety
                // requirement on the containing function
                check_prefix_lookup_child(
                    inner_ptr,
                    key_bytes,
                    &mut current_depth,
                    &mut prefix_match_behavior,
                )
            },
            ConcreteNodePtr::Node256(inner_ptr) => unsafe {
                // SAFETY: The safety requirement is covered by the safety
                // requirement on the containing function
                check_prefix_lookup_child(
                    inner_ptr,
                    key_bytes,
                    &mut current_depth,
                    &mut prefix_match_behavior,
                )
            },
            ConcreteNodePtr::LeafNode(leaf_node_ptr) => {
                // SAFETY: The shared reference is bounded to this block and
                // there are no concurrent modifications, by the safety
                // conditions of this function.
                let leaf_node = unsafe { leaf_node_ptr.as_ref() };

                if prefix_match_behavior.matches_leaf_key(leaf_node, key_bytes, current_depth) {
                    return Some(DeletePoint {
                        grandparent_ptr_and_parent_key_byte: current_grandparent,
                        parent_ptr_and_child_key_byte: current_parent,
                        leaf_node_ptr,
                    });
                } else {
                    return None;
                }
            },
        }?;

        debug_assert!(
            current_depth > 0,
            "for a non-leaf node, there should be some amount of key used"
        );

        // This will not panic because the current depth is greater than zero
        // after descending into a child.
        let last_key_byte = key_bytes[current_depth - 1];

        current_grandparent = current_parent;
        current_parent = Some((current_node, last_key_byte));
        current_node = next_node;
    }
}
