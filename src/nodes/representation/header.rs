use crate::{
    nodes::{minimum_unchecked, InnerNode, LeafNode, NodePtr, NodeType},
    AsBytes,
};
use std::fmt;

/// The number of prefix bytes stored inline in each node header for path
/// compression.
///
/// The *logical* prefix of a node may be longer than this; the bytes beyond
/// the cap are implicit and can be recovered from any leaf below the node,
/// since leaves store their full key.
pub const NUM_PREFIX_BYTES: usize = 8;

/// The common header for all nodes.
///
/// This struct is the first field of every node type (which are all
/// `repr(C)`), so a pointer to any node can be read as a pointer to a
/// `Header` to recover the runtime type tag.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct Header {
    /// The runtime type tag of the node this header belongs to.
    pub(crate) node_type: NodeType,
    /// Number of children of this inner node. This field has no meaning for
    /// a leaf node.
    ///
    /// This needs to be a [`u16`], since a node 256 can hold up to 256
    /// children and a [`u8`] would overflow when adding the last element.
    num_children: u16,
    /// Total number of bytes in the compressed prefix, including any bytes
    /// beyond [`NUM_PREFIX_BYTES`] that are not stored inline.
    prefix_len: u32,
    /// The first [`NUM_PREFIX_BYTES`] bytes of the compressed prefix.
    prefix: [u8; NUM_PREFIX_BYTES],
}

impl Header {
    /// Create a new header with the given prefix.
    ///
    /// `prefix_len` is the logical prefix length, which may exceed both
    /// `prefix.len()` and [`NUM_PREFIX_BYTES`]; only the first
    /// `min(prefix.len(), NUM_PREFIX_BYTES)` bytes are stored.
    pub(crate) fn new(node_type: NodeType, prefix: &[u8], prefix_len: usize) -> Self {
        let mut header = Header {
            node_type,
            num_children: 0,
            prefix_len: prefix_len as u32,
            prefix: [0; NUM_PREFIX_BYTES],
        };
        let len = prefix.len().min(NUM_PREFIX_BYTES);
        header.prefix[..len].copy_from_slice(&prefix[..len]);

        header
    }

    /// Create a new header with no prefix and no children.
    pub(crate) fn empty(node_type: NodeType) -> Self {
        Header {
            node_type,
            num_children: 0,
            prefix_len: 0,
            prefix: [0; NUM_PREFIX_BYTES],
        }
    }

    /// The runtime type of the node this header belongs to.
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Return a copy of this header with the node type tag replaced.
    ///
    /// Used when a node changes representation (grow/shrink) but keeps its
    /// prefix and child count.
    pub(crate) fn with_node_type(&self, node_type: NodeType) -> Header {
        Header { node_type, ..*self }
    }

    /// Read the portion of the prefix that is stored inline.
    ///
    /// The returned slice can be shorter than [`Header::prefix_len`] when the
    /// prefix has spilled past [`NUM_PREFIX_BYTES`].
    pub fn read_prefix(&self) -> &[u8] {
        &self.prefix[..self.capped_prefix_len()]
    }

    /// Get the logical number of bytes in the prefix.
    pub fn prefix_len(&self) -> usize {
        self.prefix_len as usize
    }

    /// Minimum between [`Header::prefix_len`] and [`NUM_PREFIX_BYTES`].
    pub fn capped_prefix_len(&self) -> usize {
        (self.prefix_len as usize).min(NUM_PREFIX_BYTES)
    }

    /// Return the number of children of this node.
    pub fn num_children(&self) -> usize {
        usize::from(self.num_children)
    }

    /// Increment the number of children by 1.
    pub(crate) fn inc_num_children(&mut self) {
        self.num_children += 1;
    }

    /// Decrement the number of children by 1.
    pub(crate) fn dec_num_children(&mut self) {
        assert!(
            self.num_children > 0,
            "decrement would underflow the children count"
        );
        self.num_children -= 1;
    }

    /// Remove `len` bytes from the start of the prefix, copying the remaining
    /// inline bytes to the front of the prefix array.
    ///
    /// This is only correct when the whole prefix is stored inline; a spilled
    /// prefix must be trimmed with [`Header::ltrim_by_with_leaf`] instead,
    /// since the bytes shifted into view are not in memory.
    ///
    /// # Panics
    ///  - If `len` is greater than the prefix length.
    pub(crate) fn ltrim_by(&mut self, len: usize) {
        assert!(
            (len as u32) <= self.prefix_len,
            "given length [{len}] must be less than or equal to the prefix length [{}]",
            self.prefix_len
        );
        self.prefix_len -= len as u32;

        let begin = len;
        let end = begin + self.capped_prefix_len();
        self.prefix.copy_within(begin..end, 0);
    }

    /// Remove `len` bytes from the start of the prefix, refilling the inline
    /// bytes from the given descendant leaf.
    ///
    /// `depth` is the number of key bytes consumed on the path from the root
    /// to the node owning this header, so the prefix of this node corresponds
    /// to `leaf_key[depth..depth + prefix_len]`.
    pub(crate) fn ltrim_by_with_leaf<K: AsBytes, V>(
        &mut self,
        len: usize,
        depth: usize,
        leaf_ptr: NodePtr<LeafNode<K, V>>,
    ) {
        assert!(
            (len as u32) <= self.prefix_len,
            "given length [{len}] must be less than or equal to the prefix length [{}]",
            self.prefix_len
        );
        self.prefix_len -= len as u32;

        // SAFETY: The leaf is a descendant of the node owning this header,
        // and the caller of the surrounding operation guarantees exclusive
        // access to the tree, so no mutation of the leaf can be in flight.
        let leaf_key = unsafe { leaf_ptr.as_ref() }.key_ref().as_bytes();

        let begin = depth + len;
        let end = begin + self.capped_prefix_len();
        let source = &leaf_key[begin..end];
        self.prefix[..source.len()].copy_from_slice(source);
    }

    /// Set the length of the prefix to 0 and return a copy of the prefix
    /// array, the logical length, and the capped length.
    pub(crate) fn clear_prefix(&mut self) -> ([u8; NUM_PREFIX_BYTES], usize, usize) {
        let len = self.prefix_len();
        let capped_len = self.capped_prefix_len();
        self.prefix_len = 0;

        (self.prefix, len, capped_len)
    }

    /// Append `new` to the inline prefix bytes (truncating at
    /// [`NUM_PREFIX_BYTES`]) and add `new_len` to the logical prefix length.
    pub(crate) fn push_prefix(&mut self, new: &[u8], new_len: usize) {
        let begin = self.capped_prefix_len();
        let end = (begin + new.len()).min(NUM_PREFIX_BYTES);
        let len = end - begin;
        self.prefix[begin..end].copy_from_slice(&new[..len]);
        self.prefix_len += new_len as u32;
    }

    /// Read the prefix as a whole, reconstructing it from a descendant leaf
    /// if it has spilled past the inline capacity.
    ///
    /// The second element of the returned tuple is `Some(_)` if the prefix
    /// was fetched from a leaf node.
    pub(crate) fn inner_read_full_prefix<'a, N>(
        &'a self,
        node: &'a N,
        current_depth: usize,
    ) -> (&'a [u8], Option<NodePtr<LeafNode<N::Key, N::Value>>>)
    where
        N: InnerNode,
        N::Key: AsBytes,
    {
        let len = self.prefix_len();
        if len <= NUM_PREFIX_BYTES {
            (self.read_prefix(), None)
        } else {
            let (_, min_child) = node.min();

            // SAFETY: Every reachable inner node has at least one child, so
            // the descent terminates at a leaf. The access is covered by the
            // shared borrow of `node`, which owns the subtree.
            let leaf_ptr = unsafe { minimum_unchecked(min_child) };

            // SAFETY: Same shared borrow as above; nothing mutates the leaf
            // while this reference lives.
            let leaf = unsafe { leaf_ptr.as_ref() };
            let leaf_key = leaf.key_ref().as_bytes();

            (
                &leaf_key[current_depth..(current_depth + len)],
                Some(leaf_ptr),
            )
        }
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("node_type", &self.node_type)
            .field("num_children", &self.num_children)
            .field("prefix_len", &self.prefix_len)
            .field("prefix", &self.read_prefix())
            .finish()
    }
}
