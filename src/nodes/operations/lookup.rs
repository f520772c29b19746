use crate::{
    AsBytes, AttemptOptimisticPrefixMatch, ConcreteNodePtr, InnerNode, LeafNode, NodePtr,
    OpaqueNodePtr, PessimisticMismatch, PrefixMatch,
};

/// This enum is used to track the prefix match state as a lookup traverses
/// the trie.
///
/// While every compressed prefix on the path has been fully stored inline,
/// the traversal is "pessimistic": every byte of the search key consumed so
/// far has been compared against real key bytes. Once a node with a spilled
/// prefix is crossed, the traversal switches to "optimistic": the implicit
/// bytes are skipped by length only, and the final leaf must be compared
/// against the whole search key to rule out a wrong turn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PrefixMatchBehavior {
    /// All prefix comparisons so far have operated on entirely explicit
    /// prefix bytes.
    ///
    /// This variant is the default starting state for trie lookups.
    #[default]
    Pessimistic,
    /// At least one prefix comparison has skipped implicit bytes.
    Optimistic,
}

impl PrefixMatchBehavior {
    /// Match the prefix of the given inner node against the given key,
    /// choosing the comparison strategy based on the current behavior.
    ///
    /// Updates the behavior when the match crossed implicit prefix bytes.
    #[inline]
    pub fn match_prefix<K, V>(
        &mut self,
        inner_node: &impl InnerNode<Key = K, Value = V>,
        truncated_key: &[u8],
    ) -> Result<AttemptOptimisticPrefixMatch, PessimisticMismatch> {
        let result = match self {
            // If we're still in the pessimistic branch we attempt to stay
            // there
            PrefixMatchBehavior::Pessimistic => {
                inner_node.attempt_pessimistic_match_prefix(truncated_key)
            },
            // If we've hit at least one optimistic prefix check, then all
            // following prefix checks can be optimistic
            PrefixMatchBehavior::Optimistic => inner_node
                .optimistic_match_prefix(truncated_key)
                .map(
                    |PrefixMatch { matched_bytes }| AttemptOptimisticPrefixMatch {
                        matched_bytes,
                        any_implicit_bytes: true,
                    },
                )
                .map_err(Into::into),
        };

        match &result {
            Ok(AttemptOptimisticPrefixMatch {
                any_implicit_bytes, ..
            }) if *any_implicit_bytes => {
                *self = PrefixMatchBehavior::Optimistic;
            },
            Err(PessimisticMismatch { prefix_byte, .. }) if prefix_byte.is_none() => {
                *self = PrefixMatchBehavior::Optimistic;
            },
            _ => {},
        }

        result
    }

    /// Test the given key against the key stored in the given leaf node.
    ///
    /// Specifically:
    ///  - If the current behavior is "optimistic", the entire leaf key is
    ///    compared against the given key bytes, since implicit bytes were
    ///    skipped without comparison on the way down.
    ///  - If the current behavior is "pessimistic", only the key bytes that
    ///    were not consumed during the lookup are compared against the
    ///    corresponding leaf key bytes.
    pub fn matches_leaf_key<K: AsBytes, V>(
        self,
        leaf: &LeafNode<K, V>,
        key_bytes: &[u8],
        current_depth: usize,
    ) -> bool {
        match self {
            PrefixMatchBehavior::Pessimistic => {
                let leaf_key_bytes = leaf.key_ref().as_bytes();
                let current_depth = current_depth.min(leaf_key_bytes.len()).min(key_bytes.len());
                leaf_key_bytes[current_depth..].eq(&key_bytes[current_depth..])
            },
            PrefixMatchBehavior::Optimistic => leaf.matches_full_key(key_bytes),
        }
    }
}

/// Search in the given tree for the leaf storing the given key.
///
/// # Safety
///  - This function cannot be called concurrently with any mutating operation
///    on `root` or any child node of `root`. This function will arbitrarily
///    read to any child in the given tree.
pub unsafe fn search_unchecked<K, V>(
    root: OpaqueNodePtr<K, V>,
    key_bytes: &[u8],
) -> Option<NodePtr<LeafNode<K, V>>>
where
    K: AsBytes,
{
    let mut current_node = root;
    let mut current_depth = 0;
    let mut prefix_match_behavior = PrefixMatchBehavior::default();

    loop {
        current_node = match current_node.to_node_ptr() {
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
                let leaf = unsafe { leaf_node_ptr.as_ref() };

                return prefix_match_behavior
                    .matches_leaf_key(leaf, key_bytes, current_depth)
                    .then_some(leaf_node_ptr);
            },
        }?;
    }
}

/// For the given inner node, check the node prefix, then look up the child
/// for the key byte at the new search depth.
///
/// Returns `None` if the prefix does not match or there is no child for the
/// key byte.
///
/// # Safety
///  - No mutation of the node pointed to by `inner_ptr` or its descendants
///    can happen while this function runs.
pub(crate) unsafe fn check_prefix_lookup_child<K, V, N>(
    inner_ptr: NodePtr<N>,
    key_bytes: &[u8],
    current_depth: &mut usize,
    prefix_match_behavior: &mut PrefixMatchBehavior,
) -> Option<OpaqueNodePtr<K, V>>
where
    N: InnerNode<Key = K, Value = V>,
    K: AsBytes,
{
    // SAFETY: The lifetime produced from this is bounded to this scope and
    // does not escape. Further, no other code mutates the node referenced,
    // which is enforced by the safety requirement on this function.
    let inner_node = unsafe { inner_ptr.as_ref() };

    match prefix_match_behavior.match_prefix(inner_node, &key_bytes[*current_depth..]) {
        Err(_) => None,
        Ok(AttemptOptimisticPrefixMatch { matched_bytes, .. }) => {
            // Since the prefix matched, advance the depth by the size of the
            // prefix
            *current_depth += matched_bytes;

            let next_key_fragment = if *current_depth < key_bytes.len() {
                key_bytes[*current_depth]
            } else {
                // The key stops inside the compressed path, so it cannot be
                // present: no key in the tree is a prefix of any other key.
                return None;
            };

            let child_lookup = inner_node.lookup_child(next_key_fragment);

            if child_lookup.is_some() {
                // The key byte was consumed to choose the child.
                *current_depth += 1;
            }

            child_lookup
        },
    }
}
