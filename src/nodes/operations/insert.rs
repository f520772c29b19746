use crate::{
    AsBytes, ConcreteNodePtr, ExplicitMismatch, InnerNode, InnerNode4, LeafNode, NodePtr,
    OpaqueNodePtr, PrefixMatch,
};
use std::{error::Error, fmt, ops::ControlFlow};

/// The results of a successful tree insert
#[derive(Debug)]
pub struct InsertResult<K, V> {
    /// The existing leaf replaced by the insert, if the key was already
    /// present
    pub existing_leaf: Option<LeafNode<K, V>>,
    /// The new tree root after the successful insert
    pub new_root: OpaqueNodePtr<K, V>,
}

/// Attempted to insert a key which was a prefix of an existing key in the
/// tree, or which an existing key is a prefix of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPrefixError {
    /// The key that was the input to the insert operation
    pub byte_repr: Box<[u8]>,
}

impl fmt::Display for InsertPrefixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Attempted to insert a key [{:?}] which is either a prefix of an existing key or an \
             existing key is a prefix of the new key.",
            self.byte_repr
        )
    }
}

impl Error for InsertPrefixError {}

/// This struct contains the results from searching for an insert point for a
/// new node in the tree.
///
/// It contains all the relevant information needed to perform the insert and
/// update the tree.
#[derive(Debug)]
pub struct InsertPoint<K, V> {
    /// The parent node pointer and key byte that points to the main node
    /// insert point.
    ///
    /// In the case that the root node is the main insert point, this will
    /// have a `None` value.
    pub parent_ptr_and_child_key_byte: Option<(OpaqueNodePtr<K, V>, u8)>,
    /// The type of operation that needs to be performed to insert the key
    pub insert_kind: InsertKind<K, V>,
    /// The number of bytes that were read from the key to find the insert
    /// point.
    pub key_bytes_used: usize,
    /// The current root of the tree, used when applying the insert.
    pub root: OpaqueNodePtr<K, V>,
}

/// The kind of mutation the tree needs to absorb a new key.
#[derive(Debug)]
pub enum InsertKind<K, V> {
    /// An insert where an inner node had a differing prefix from the key.
    ///
    /// This insert type will create a new inner node with the portion of the
    /// prefix that did match, and update the existing inner node.
    MismatchPrefix {
        /// Data about how much of the prefix matched
        mismatch: ExplicitMismatch<K, V>,
        /// A pointer to the inner node which had a mismatched prefix
        mismatched_inner_node_ptr: OpaqueNodePtr<K, V>,
    },
    /// An insert where the key exactly matched the key of an existing leaf.
    ///
    /// This insert type will replace the contents of the leaf in place.
    Exact {
        /// A pointer to the leaf node that will be replaced
        leaf_node_ptr: NodePtr<LeafNode<K, V>>,
    },
    /// An insert where the search terminated at an existing leaf with a
    /// different key.
    ///
    /// This insert type will create a new inner node, and assign the existing
    /// leaf and the new leaf as children to that node.
    SplitLeaf {
        /// A pointer to the leaf node that will be split
        leaf_node_ptr: NodePtr<LeafNode<K, V>>,
        /// The number of bytes the two keys share, counted from the root of
        /// the tree.
        new_key_bytes_used: usize,
    },
    /// An insert where the search terminated at an existing inner node that
    /// did not have a child with the key byte.
    ///
    /// If the inner node is full, it will be grown to the next largest size.
    IntoExisting {
        /// A pointer to the existing inner node which will be updated to
        /// contain the new child leaf node
        inner_node_ptr: OpaqueNodePtr<K, V>,
    },
}

impl<K, V> InsertPoint<K, V> {
    /// Use the information in this [`InsertPoint`] to insert the given
    /// key-value pair into the tree.
    ///
    /// # Safety
    ///  - This function cannot be called concurrently with any other read or
    ///    modification of the tree.
    pub unsafe fn apply(self, key: K, value: V) -> InsertResult<K, V>
    where
        K: AsBytes,
    {
        fn write_new_child_in_existing_node<K, V>(
            inner_node_ptr: OpaqueNodePtr<K, V>,
            new_leaf_node: LeafNode<K, V>,
            key_bytes_used: usize,
        ) -> OpaqueNodePtr<K, V>
        where
            K: AsBytes,
        {
            fn write_new_child_in_existing_inner_node<K, V, N>(
                inner_node_ptr: NodePtr<N>,
                new_leaf_node: LeafNode<K, V>,
                key_bytes_used: usize,
            ) -> OpaqueNodePtr<K, V>
            where
                N: InnerNode<Key = K, Value = V>,
                K: AsBytes,
            {
                // SAFETY: The `inner_node` reference lasts only for the
                // duration of this function, and the node will not be read or
                // written via any other source because of the safety
                // requirements on `InsertPoint::apply`.
                let inner_node = unsafe { inner_node_ptr.as_mut() };
                let new_leaf_key_byte = new_leaf_node.key_ref().as_bytes()[key_bytes_used];
                let new_leaf_ptr = NodePtr::allocate_node_ptr(new_leaf_node).to_opaque();

                if inner_node.is_full() {
                    // we will create a new node of the next larger type and
                    // copy all the children over.
                    let mut new_node = inner_node.grow();
                    new_node.write_child(new_leaf_key_byte, new_leaf_ptr);

                    let new_inner_node = NodePtr::allocate_node_ptr(new_node).to_opaque();

                    // SAFETY: The `deallocate_node_ptr` function is only
                    // called a single time. The uniqueness requirement is
                    // passed up to the `InsertPoint::apply` safety
                    // requirements. Do not use the `inner_node` mutable
                    // reference passed this point.
                    unsafe {
                        drop(NodePtr::deallocate_node_ptr(inner_node_ptr));
                    };

                    new_inner_node
                } else {
                    inner_node.write_child(new_leaf_key_byte, new_leaf_ptr);

                    inner_node_ptr.to_opaque()
                }
            }

            match inner_node_ptr.to_node_ptr() {
                ConcreteNodePtr::Node4(inner_ptr) => {
                    write_new_child_in_existing_inner_node(inner_ptr, new_leaf_node, key_bytes_used)
                },
                ConcreteNodePtr::Node16(inner_ptr) => {
                    write_new_child_in_existing_inner_node(inner_ptr, new_leaf_node, key_bytes_used)
                },
                ConcreteNodePtr::Node48(inner_ptr) => {
                    write_new_child_in_existing_inner_node(inner_ptr, new_leaf_node, key_bytes_used)
                },
                ConcreteNodePtr::Node256(inner_ptr) => {
                    write_new_child_in_existing_inner_node(inner_ptr, new_leaf_node, key_bytes_used)
                },
                ConcreteNodePtr::LeafNode(_) => {
                    unreachable!("cannot insert a new child into a leaf node")
                },
            }
        }

        /// Write a new child node to an inner node at the specified key byte.
        fn parent_write_child<K, V>(
            parent_inner_node: OpaqueNodePtr<K, V>,
            key_byte: u8,
            new_child: OpaqueNodePtr<K, V>,
        ) {
            fn write_inner_node<K, V, N>(
                parent_inner_node: NodePtr<N>,
                key_byte: u8,
                new_child: OpaqueNodePtr<K, V>,
            ) where
                N: InnerNode<Key = K, Value = V>,
            {
                // SAFETY: The lifetime produced from this is bounded to this
                // scope and does not escape. Further, no other code mutates
                // the node referenced, which is enforced by the "no concurrent
                // read or write" requirement on the `InsertPoint::apply`
                // function.
                let parent_node = unsafe { parent_inner_node.as_mut() };

                parent_node.write_child(key_byte, new_child);
            }

            match parent_inner_node.to_node_ptr() {
                ConcreteNodePtr::Node4(inner_ptr) => {
                    write_inner_node(inner_ptr, key_byte, new_child)
                },
                ConcreteNodePtr::Node16(inner_ptr) => {
                    write_inner_node(inner_ptr, key_byte, new_child)
                },
                ConcreteNodePtr::Node48(inner_ptr) => {
                    write_inner_node(inner_ptr, key_byte, new_child)
                },
                ConcreteNodePtr::Node256(inner_ptr) => {
                    write_inner_node(inner_ptr, key_byte, new_child)
                },
                ConcreteNodePtr::LeafNode(_) => {
                    unreachable!("a leaf pointer cannot be the parent of another node")
                },
            }
        }

        let InsertPoint {
            parent_ptr_and_child_key_byte,
            insert_kind,
            key_bytes_used,
            root,
        } = self;

        let new_inner_node = match insert_kind {
            InsertKind::MismatchPrefix {
                mismatch,
                mismatched_inner_node_ptr,
            } => {
                // The new key byte is copied out before the key is moved into
                // the new leaf node.
                let key_byte = key.as_bytes()[key_bytes_used + mismatch.matched_bytes];

                // prefix mismatch, need to split the prefix into two separate
                // nodes and take the matched prefix into a new parent node
                let mut new_n4: InnerNode4<K, V> = {
                    // SAFETY: The lifetime of the header reference is bounded
                    // to this block and no mutation happens while it lives. We
                    // know this is an inner node pointer because of the
                    // specific insert case.
                    let header = unsafe { mismatched_inner_node_ptr.header_ref_unchecked() };

                    let prefix = header.read_prefix();
                    let prefix = &prefix[..prefix.len().min(mismatch.matched_bytes)];
                    InnerNode4::from_prefix(prefix, mismatch.matched_bytes)
                };

                let new_leaf_pointer =
                    NodePtr::allocate_node_ptr(LeafNode::new(key, value)).to_opaque();

                new_n4.write_child(mismatch.prefix_byte, mismatched_inner_node_ptr);
                new_n4.write_child(key_byte, new_leaf_pointer);

                {
                    // SAFETY: We have exclusive access to the tree, so
                    // creating a mutable reference to the header is safe. We
                    // know this is an inner node pointer because of the
                    // insert case we're in.
                    let header = unsafe { mismatched_inner_node_ptr.header_mut_unchecked() };

                    // Trim the matched bytes plus one, since one extra byte is
                    // used as the key fragment in the new parent node.
                    let shrink_len = mismatch.matched_bytes + 1;
                    match mismatch.leaf_ptr {
                        Some(leaf_ptr) => {
                            header.ltrim_by_with_leaf(shrink_len, key_bytes_used, leaf_ptr)
                        },
                        None => {
                            header.ltrim_by(shrink_len);
                        },
                    }
                }

                NodePtr::allocate_node_ptr(new_n4).to_opaque()
            },
            InsertKind::Exact { leaf_node_ptr } => {
                let new_leaf_node = LeafNode::new(key, value);

                // SAFETY: The leaf node is not accessed through any other
                // pointer concurrently because of the safety doc on the
                // containing function
                let old_leaf_node = unsafe { NodePtr::replace(leaf_node_ptr, new_leaf_node) };

                return InsertResult {
                    existing_leaf: Some(old_leaf_node),
                    // Because we replaced the leaf in place instead of
                    // creating a new leaf, the root is guaranteed to be
                    // unchanged, even if the old leaf was the root.
                    new_root: root,
                };
            },
            InsertKind::SplitLeaf {
                leaf_node_ptr,
                new_key_bytes_used,
            } => {
                let key_bytes = key.as_bytes();
                // SAFETY: The shared reference is bounded to this block and
                // nothing mutates the leaf while it lives.
                let leaf_bytes = unsafe { leaf_node_ptr.as_ref() }.key_ref().as_bytes();

                let mut new_n4: InnerNode4<K, V> = InnerNode4::from_prefix(
                    &key_bytes[key_bytes_used..new_key_bytes_used],
                    new_key_bytes_used - key_bytes_used,
                );

                let leaf_node_key_byte = leaf_bytes[new_key_bytes_used];
                let new_leaf_node_key_byte = key_bytes[new_key_bytes_used];
                let new_leaf_node_pointer =
                    NodePtr::allocate_node_ptr(LeafNode::new(key, value)).to_opaque();

                new_n4.write_child(leaf_node_key_byte, leaf_node_ptr.to_opaque());
                new_n4.write_child(new_leaf_node_key_byte, new_leaf_node_pointer);

                NodePtr::allocate_node_ptr(new_n4).to_opaque()
            },
            InsertKind::IntoExisting { inner_node_ptr } => write_new_child_in_existing_node(
                inner_node_ptr,
                LeafNode::new(key, value),
                key_bytes_used,
            ),
        };

        if let Some((parent_ptr, parent_key_fragment)) = parent_ptr_and_child_key_byte {
            parent_write_child(parent_ptr, parent_key_fragment, new_inner_node);

            // If there was a parent, then the root is unchanged.
            InsertResult {
                existing_leaf: None,
                new_root: root,
            }
        } else {
            // If there was no parent, then the root node was a leaf or the
            // inner node split occurred at the root, in which case return the
            // new inner node as root.
            InsertResult {
                existing_leaf: None,
                new_root: new_inner_node,
            }
        }
    }
}

/// Perform an iterative search for the insert point for the given key,
/// starting at the given root node.
///
/// # Errors
///  - If the given `key` is a prefix of an existing key, or an existing key
///    is a prefix of the given key, this function returns an
///    [`InsertPrefixError`].
///
/// # Safety
///  - This function cannot be called concurrently with any mutating operation
///    on `root` or any child node of `root`. This function will arbitrarily
///    read to any child in the given tree.
pub unsafe fn search_for_insert_point<K, V>(
    root: OpaqueNodePtr<K, V>,
    key: &K,
) -> Result<InsertPoint<K, V>, InsertPrefixError>
where
    K: AsBytes,
{
    fn test_prefix_identify_insert<K, V, N>(
        inner_ptr: NodePtr<N>,
        key: &K,
        current_depth: &mut usize,
    ) -> Result<ControlFlow<ExplicitMismatch<K, V>, Option<OpaqueNodePtr<K, V>>>, InsertPrefixError>
    where
        N: InnerNode<Key = K, Value = V>,
        K: AsBytes,
    {
        // SAFETY: The lifetime produced from this is bounded to this scope
        // and does not escape. Further, no other code mutates the node
        // referenced, which is enforced by the "no concurrent mutation"
        // requirement on `search_for_insert_point`.
        let inner_node = unsafe { inner_ptr.as_ref() };
        let key_bytes = key.as_bytes();

        let matched_bytes = match inner_node.match_full_prefix(key_bytes, *current_depth) {
            Ok(PrefixMatch { matched_bytes }) => matched_bytes,
            Err(mismatch) => {
                if (*current_depth + mismatch.matched_bytes) >= key_bytes.len() {
                    // The key ran out of bytes inside the compressed path, so
                    // it must be a prefix of an existing key.
                    return Err(InsertPrefixError {
                        byte_repr: key_bytes.into(),
                    });
                }

                return Ok(ControlFlow::Break(mismatch));
            },
        };

        // Since the prefix matched, advance the depth by the size of the
        // prefix
        *current_depth += matched_bytes;

        let next_key_fragment = if *current_depth < key_bytes.len() {
            key_bytes[*current_depth]
        } else {
            // The key stops at this inner node, so it must be a prefix of an
            // existing key.
            return Err(InsertPrefixError {
                byte_repr: key_bytes.into(),
            });
        };

        Ok(ControlFlow::Continue(
            inner_node.lookup_child(next_key_fragment),
        ))
    }

    let mut current_parent = None;
    let mut current_node = root;
    let mut current_depth = 0;

    loop {
        let lookup_result = match current_node.to_node_ptr() {
            ConcreteNodePtr::Node4(inner_ptr) => {
                test_prefix_identify_insert(inner_ptr, key, &mut current_depth)
            },
            ConcreteNodePtr::Node16(inner_ptr) => {
                test_prefix_identify_insert(inner_ptr, key, &mut current_depth)
            },
            ConcreteNodePtr::Node48(inner_ptr) => {
                test_prefix_identify_insert(inner_ptr, key, &mut current_depth)
            },
            ConcreteNodePtr::Node256(inner_ptr) => {
                test_prefix_identify_insert(inner_ptr, key, &mut current_depth)
            },
            ConcreteNodePtr::LeafNode(leaf_node_ptr) => {
                // SAFETY: The shared reference is bounded to this block and
                // there are no concurrent modifications, by the safety
                // conditions of this function.
                let leaf_node = unsafe { leaf_node_ptr.as_ref() };
                let key_bytes = key.as_bytes();

                if leaf_node.matches_full_key(key_bytes) {
                    return Ok(InsertPoint {
                        key_bytes_used: current_depth,
                        parent_ptr_and_child_key_byte: current_parent,
                        insert_kind: InsertKind::Exact { leaf_node_ptr },
                        root,
                    });
                }

                let leaf_bytes = leaf_node.key_ref().as_bytes();
                let prefix_size = leaf_bytes[current_depth..]
                    .iter()
                    .zip(key_bytes[current_depth..].iter())
                    .take_while(|(k1, k2)| k1 == k2)
                    .count();
                let new_key_bytes_used = current_depth + prefix_size;

                if new_key_bytes_used >= key_bytes.len() || new_key_bytes_used >= leaf_bytes.len() {
                    // The key is a prefix of the existing leaf key, or the
                    // existing leaf key is a prefix of the new key.
                    return Err(InsertPrefixError {
                        byte_repr: key_bytes.into(),
                    });
                }

                return Ok(InsertPoint {
                    key_bytes_used: current_depth,
                    parent_ptr_and_child_key_byte: current_parent,
                    insert_kind: InsertKind::SplitLeaf {
                        leaf_node_ptr,
                        new_key_bytes_used,
                    },
                    root,
                });
            },
        }?;

        match lookup_result {
            ControlFlow::Continue(next_child_node) => match next_child_node {
                Some(next_child_node) => {
                    current_parent = Some((current_node, key.as_bytes()[current_depth]));
                    current_node = next_child_node;
                    // Increment by a single byte to account for the child
                    // key fragment.
                    current_depth += 1;
                },
                None => {
                    return Ok(InsertPoint {
                        key_bytes_used: current_depth,
                        insert_kind: InsertKind::IntoExisting {
                            inner_node_ptr: current_node,
                        },
                        parent_ptr_and_child_key_byte: current_parent,
                        root,
                    })
                },
            },
            ControlFlow::Break(mismatch) => {
                return Ok(InsertPoint {
                    key_bytes_used: current_depth,
                    insert_kind: InsertKind::MismatchPrefix {
                        mismatch,
                        mismatched_inner_node_ptr: current_node,
                    },
                    parent_ptr_and_child_key_byte: current_parent,
                    root,
                })
            },
        };
    }
}

#[cfg(test)]
mod tests;
