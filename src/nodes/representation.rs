//! Trie node representation

use crate::AsBytes;
use std::{
    fmt,
    iter::FusedIterator,
    marker::PhantomData,
    mem,
    ops::Range,
    ptr::{self, NonNull},
};

mod header;
pub use header::*;

mod inner_node_compressed;
pub use inner_node_compressed::*;

mod inner_node_48;
pub use inner_node_48::*;

mod inner_node_256;
pub use inner_node_256::*;

/// The representation of inner nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeType {
    /// Node that references between 2 and 4 children
    Node4,
    /// Node that references between 5 and 16 children
    Node16,
    /// Node that references between 17 and 48 children
    Node48,
    /// Node that references between 49 and 256 children
    Node256,
    /// Node that contains a single value
    Leaf,
}

impl NodeType {
    /// The upper bound on the number of child nodes that this node type can
    /// have.
    pub const fn upper_capacity(self) -> usize {
        match self {
            NodeType::Node4 => 4,
            NodeType::Node16 => 16,
            NodeType::Node48 => 48,
            NodeType::Node256 => 256,
            NodeType::Leaf => 0,
        }
    }

    /// Return the range of number of children that each node type accepts.
    pub const fn capacity_range(self) -> Range<usize> {
        match self {
            NodeType::Node4 => Range { start: 1, end: 5 },
            NodeType::Node16 => Range { start: 5, end: 17 },
            NodeType::Node48 => Range { start: 17, end: 49 },
            NodeType::Node256 => Range {
                start: 49,
                end: 257,
            },
            NodeType::Leaf => Range { start: 0, end: 0 },
        }
    }

    /// Return true if an inner node with the given [`NodeType`] and specified
    /// number of children should be shrunk to the next smaller node type.
    ///
    /// # Panics
    ///  - Panics if `self` equals [`NodeType::Leaf`]
    pub fn should_shrink_inner_node(self, num_children: usize) -> bool {
        match self {
            NodeType::Node4 => false,
            NodeType::Node16 => num_children <= 4,
            NodeType::Node48 => num_children <= 16,
            NodeType::Node256 => num_children <= 48,
            NodeType::Leaf => panic!("cannot shrink leaf"),
        }
    }
}

/// An opaque pointer to a [`Node`].
///
/// Could be any one of the node types, need to check the runtime type tag
/// and then cast to a [`NodePtr`].
#[repr(transparent)]
pub struct OpaqueNodePtr<K, V>(NonNull<Header>, PhantomData<(K, V)>);

impl<K, V> Copy for OpaqueNodePtr<K, V> {}

impl<K, V> Clone for OpaqueNodePtr<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> fmt::Debug for OpaqueNodePtr<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueNodePtr").field(&self.0).finish()
    }
}

impl<K, V> fmt::Pointer for OpaqueNodePtr<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.0, f)
    }
}

impl<K, V> Eq for OpaqueNodePtr<K, V> {}

impl<K, V> PartialEq for OpaqueNodePtr<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<K, V> OpaqueNodePtr<K, V> {
    /// Construct a new opaque node pointer from an existing non-null node
    /// pointer.
    pub(crate) fn new<N>(pointer: NonNull<N>) -> Self
    where
        N: Node<Key = K, Value = V>,
    {
        // Every node type is `repr(C)` with a `Header` as its first field,
        // so the cast is within the same allocated object.
        OpaqueNodePtr(pointer.cast::<Header>(), PhantomData)
    }

    /// Return `true` if this pointer points to the specified concrete
    /// [`NodeType`].
    pub fn is<N: Node<Key = K, Value = V>>(&self) -> bool {
        self.node_type() == N::TYPE
    }

    /// Create a non-opaque node pointer that will eliminate future type
    /// assertions, if the type of the pointed node matches the given node
    /// type.
    pub fn cast<N: Node<Key = K, Value = V>>(self) -> Option<NodePtr<N>> {
        if self.is::<N>() {
            Some(NodePtr(self.0.cast::<N>()))
        } else {
            None
        }
    }

    /// Cast this opaque pointer type to an enum that contains a pointer to
    /// the concrete node type.
    pub fn to_node_ptr(self) -> ConcreteNodePtr<K, V> {
        match self.node_type() {
            NodeType::Node4 => {
                ConcreteNodePtr::Node4(NodePtr(self.0.cast::<InnerNode4<K, V>>()))
            },
            NodeType::Node16 => {
                ConcreteNodePtr::Node16(NodePtr(self.0.cast::<InnerNode16<K, V>>()))
            },
            NodeType::Node48 => {
                ConcreteNodePtr::Node48(NodePtr(self.0.cast::<InnerNode48<K, V>>()))
            },
            NodeType::Node256 => {
                ConcreteNodePtr::Node256(NodePtr(self.0.cast::<InnerNode256<K, V>>()))
            },
            NodeType::Leaf => {
                ConcreteNodePtr::LeafNode(NodePtr(self.0.cast::<LeafNode<K, V>>()))
            },
        }
    }

    /// Retrieve the runtime node type information.
    pub fn node_type(self) -> NodeType {
        // SAFETY: The pointer is non-null, aligned, and points to an
        // initialized node which has the header as its first field. The tag
        // is read through a raw pointer so that no reference to the header is
        // materialized while a mutable reference to the node may be live
        // elsewhere.
        unsafe { ptr::addr_of!((*self.0.as_ptr()).node_type).read() }
    }

    /// Get a mutable reference to the header if the underlying node has one,
    /// otherwise return `None`.
    ///
    /// Leaf nodes carry no compressed path, so they report no header even
    /// though the tag is physically present.
    ///
    /// # Safety
    ///  - You must enforce Rust's aliasing rules, since the returned lifetime
    ///    `'h` is arbitrarily chosen and does not necessarily reflect the
    ///    actual lifetime of the data. In particular, for the duration of
    ///    this lifetime, the memory the pointer points to must not get
    ///    accessed (read or written) through any other pointer.
    pub(crate) unsafe fn header_mut<'h>(self) -> Option<&'h mut Header> {
        match self.node_type() {
            NodeType::Node4 | NodeType::Node16 | NodeType::Node48 | NodeType::Node256 => {
                // SAFETY: Covered by the safety doc of this function
                Some(unsafe { self.header_mut_unchecked() })
            },
            NodeType::Leaf => None,
        }
    }

    /// Get a mutable reference to the header, without checking that the
    /// pointer is to an inner node.
    ///
    /// # Safety
    ///  - The pointer must be to an inner node
    ///  - You must enforce Rust's aliasing rules, since the returned lifetime
    ///    `'h` is arbitrarily chosen and does not necessarily reflect the
    ///    actual lifetime of the data. In particular, for the duration of
    ///    this lifetime, the memory the pointer points to must not get
    ///    accessed (read or written) through any other pointer.
    pub(crate) unsafe fn header_mut_unchecked<'h>(mut self) -> &'h mut Header {
        // SAFETY: Covered by the safety doc of this function
        unsafe { self.0.as_mut() }
    }

    /// Get a shared reference to the header, without checking that the
    /// pointer is to an inner node.
    ///
    /// # Safety
    ///  - The pointer must be to an inner node
    ///  - You must enforce Rust's aliasing rules, since the returned lifetime
    ///    `'h` is arbitrarily chosen and does not necessarily reflect the
    ///    actual lifetime of the data. In particular, for the duration of
    ///    this lifetime, the memory the pointer points to must not be mutated
    ///    through any other pointer.
    pub(crate) unsafe fn header_ref_unchecked<'h>(self) -> &'h Header {
        // SAFETY: Covered by the safety doc of this function
        unsafe { self.0.as_ref() }
    }
}

/// An enum that encapsulates pointers to every type of [`Node`]
pub enum ConcreteNodePtr<K, V> {
    /// Node that references between 2 and 4 children
    Node4(NodePtr<InnerNode4<K, V>>),
    /// Node that references between 5 and 16 children
    Node16(NodePtr<InnerNode16<K, V>>),
    /// Node that references between 17 and 48 children
    Node48(NodePtr<InnerNode48<K, V>>),
    /// Node that references between 49 and 256 children
    Node256(NodePtr<InnerNode256<K, V>>),
    /// Node that contains a single value
    LeafNode(NodePtr<LeafNode<K, V>>),
}

impl<K, V> Copy for ConcreteNodePtr<K, V> {}

impl<K, V> Clone for ConcreteNodePtr<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> fmt::Debug for ConcreteNodePtr<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node4(arg0) => f.debug_tuple("Node4").field(arg0).finish(),
            Self::Node16(arg0) => f.debug_tuple("Node16").field(arg0).finish(),
            Self::Node48(arg0) => f.debug_tuple("Node48").field(arg0).finish(),
            Self::Node256(arg0) => f.debug_tuple("Node256").field(arg0).finish(),
            Self::LeafNode(arg0) => f.debug_tuple("LeafNode").field(arg0).finish(),
        }
    }
}

/// A pointer to a [`Node`].
#[repr(transparent)]
pub struct NodePtr<N>(NonNull<N>);

impl<N: Node> NodePtr<N> {
    /// Create a safe pointer to a [`Node`].
    ///
    /// # Safety
    ///  - Given pointer must be non-null, aligned, and valid for reads or
    ///    writes of a value of N type.
    pub unsafe fn new(ptr: *mut N) -> Self {
        // SAFETY: The safety requirements of this function match the
        // requirements of `NonNull::new_unchecked`.
        unsafe { NodePtr(NonNull::new_unchecked(ptr)) }
    }

    /// Allocate the given [`Node`] on the heap and return a [`NodePtr`] that
    /// wraps the raw pointer.
    pub fn allocate_node_ptr(node: N) -> Self {
        // SAFETY: The pointer from [`Box::into_raw`] is non-null, aligned,
        // and valid for reads and writes of the [`Node`] `N`.
        unsafe { NodePtr::new(Box::into_raw(Box::new(node))) }
    }

    /// Deallocate a [`Node`] object created with the
    /// [`NodePtr::allocate_node_ptr`] function, returning the node value.
    ///
    /// # Safety
    ///  - This function can only be called once for a given node object,
    ///    otherwise a double-free could result.
    ///  - There must be no other live references to the node.
    #[must_use]
    pub unsafe fn deallocate_node_ptr(node: Self) -> N {
        // SAFETY: Covered by the safety doc of this function
        unsafe { *Box::from_raw(node.to_ptr()) }
    }

    /// Moves `new_value` into the referenced `dest`, returning the previous
    /// `dest` value.
    ///
    /// Neither value is dropped.
    ///
    /// # Safety
    ///  - The node the `dest` pointer points to must not get accessed (read
    ///    or written) through any other pointers concurrent to this
    ///    modification.
    pub unsafe fn replace(dest: Self, new_value: N) -> N {
        // SAFETY: The lifetime of the `dest` reference is restricted to this
        // function, and the referenced node is not accessed through any other
        // pointer by the safety doc on this function.
        mem::replace(unsafe { dest.as_mut() }, new_value)
    }

    /// Cast node pointer back to an opaque version, losing type information.
    pub fn to_opaque(self) -> OpaqueNodePtr<N::Key, N::Value> {
        OpaqueNodePtr::new(self.0)
    }

    /// Returns a shared reference to the node.
    ///
    /// # Safety
    ///  - You must enforce Rust's aliasing rules, since the returned lifetime
    ///    `'a` is arbitrarily chosen and does not necessarily reflect the
    ///    actual lifetime of the data. In particular, for the duration of
    ///    this lifetime, the memory the pointer points to must not get
    ///    mutated.
    pub unsafe fn as_ref<'a>(self) -> &'a N {
        // SAFETY: The pointer is properly aligned and points to an
        // initialized instance of N that is dereferenceable. The lifetime
        // safety requirements are passed up to the invoker of this function.
        unsafe { self.0.as_ref() }
    }

    /// Returns a unique mutable reference to the node.
    ///
    /// # Safety
    ///  - You must enforce Rust's aliasing rules, since the returned lifetime
    ///    `'a` is arbitrarily chosen and does not necessarily reflect the
    ///    actual lifetime of the node. In particular, for the duration of
    ///    this lifetime, the node the pointer points to must not get accessed
    ///    (read or written) through any other pointer.
    pub unsafe fn as_mut<'a>(mut self) -> &'a mut N {
        // SAFETY: The pointer is properly aligned and points to an
        // initialized instance of N that is dereferenceable. The lifetime
        // safety requirements are passed up to the invoker of this function.
        unsafe { self.0.as_mut() }
    }

    /// Acquires the underlying `*mut` pointer.
    pub fn to_ptr(self) -> *mut N {
        self.0.as_ptr()
    }
}

impl<K, V> NodePtr<LeafNode<K, V>> {
    /// Returns a shared reference to the key and value of the pointed-to
    /// [`LeafNode`].
    ///
    /// # Safety
    ///  - You must enforce Rust's aliasing rules, since the returned lifetime
    ///    `'a` is arbitrarily chosen and does not necessarily reflect the
    ///    actual lifetime of the data. In particular, for the duration of
    ///    this lifetime, the memory the pointer points to must not get
    ///    mutated.
    pub unsafe fn as_key_value_ref<'a>(self) -> (&'a K, &'a V) {
        // SAFETY: Covered by the safety doc of this function
        let leaf = unsafe { self.as_ref() };

        leaf.entry_ref()
    }

    /// Returns a shared reference to the value of the pointed-to
    /// [`LeafNode`].
    ///
    /// # Safety
    ///  - You must enforce Rust's aliasing rules, since the returned lifetime
    ///    `'a` is arbitrarily chosen and does not necessarily reflect the
    ///    actual lifetime of the data. In particular, for the duration of
    ///    this lifetime, the memory the pointer points to must not get
    ///    mutated.
    pub unsafe fn as_value_ref<'a>(self) -> &'a V
    where
        K: 'a,
    {
        // SAFETY: Covered by the safety doc of this function
        let leaf = unsafe { self.as_ref() };

        leaf.value_ref()
    }

    /// Returns a unique mutable reference to the value of the pointed-to
    /// [`LeafNode`].
    ///
    /// # Safety
    ///  - You must enforce Rust's aliasing rules, since the returned lifetime
    ///    `'a` is arbitrarily chosen and does not necessarily reflect the
    ///    actual lifetime of the node. In particular, for the duration of
    ///    this lifetime, the node the pointer points to must not get accessed
    ///    (read or written) through any other pointer.
    pub unsafe fn as_value_mut<'a>(self) -> &'a mut V
    where
        K: 'a,
    {
        // SAFETY: Covered by the safety doc of this function
        let leaf = unsafe { self.as_mut() };

        leaf.value_mut()
    }

    /// Returns a shared reference to the key of the pointed-to [`LeafNode`].
    ///
    /// # Safety
    ///  - You must enforce Rust's aliasing rules, since the returned lifetime
    ///    `'a` is arbitrarily chosen and does not necessarily reflect the
    ///    actual lifetime of the data. In particular, for the duration of
    ///    this lifetime, the memory the pointer points to must not get
    ///    mutated.
    pub unsafe fn as_key_ref<'a>(self) -> &'a K
    where
        V: 'a,
    {
        // SAFETY: Covered by the safety doc of this function
        let leaf = unsafe { self.as_ref() };

        leaf.key_ref()
    }
}

impl<N> Clone for NodePtr<N> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<N> Copy for NodePtr<N> {}

impl<N: Node> From<&mut N> for NodePtr<N> {
    fn from(node_ref: &mut N) -> Self {
        // SAFETY: Pointer is non-null, aligned, and pointing to a valid
        // instance of N because it was constructed from a mutable reference.
        unsafe { NodePtr::new(node_ref as *mut _) }
    }
}

impl<N> PartialEq for NodePtr<N> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<N> Eq for NodePtr<N> {}

impl<N> fmt::Debug for NodePtr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodePtr").field(&self.0).finish()
    }
}

impl<N> fmt::Pointer for NodePtr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.0, f)
    }
}

/// All nodes which contain a runtime tag that validates their type.
pub trait Node {
    /// The runtime type of the node.
    const TYPE: NodeType;

    /// The key type carried by the leaf nodes
    type Key;

    /// The value type carried by the leaf nodes
    type Value;
}

/// This struct represents a successful match against a node prefix.
#[derive(Debug)]
pub struct PrefixMatch {
    /// How many bytes were matched
    pub matched_bytes: usize,
}

/// This struct represents a successful match against a prefix using the
/// [`InnerNode::attempt_pessimistic_match_prefix`] function.
#[derive(Debug)]
pub struct AttemptOptimisticPrefixMatch {
    /// How many bytes were matched
    pub matched_bytes: usize,
    /// This flag will be true if the match fell back to an optimistic mode,
    /// and assumed a prefix match by key length without comparing the bytes
    /// that are not stored inline.
    pub any_implicit_bytes: bool,
}

/// Represents a prefix mismatch when looking only at the prefix content
/// present in a node header.
#[derive(Debug)]
pub struct PessimisticMismatch {
    /// How many bytes were matched
    pub matched_bytes: usize,
    /// Value of the byte that made it not match.
    ///
    /// If this field is `None`, then the mismatch happened in the implicit
    /// prefix bytes.
    pub prefix_byte: Option<u8>,
}

/// Represents a prefix mismatch when looking only at the prefix length,
/// without comparing any bytes.
#[derive(Debug)]
pub struct OptimisticMismatch {
    /// How many bytes were matched
    pub matched_bytes: usize,
}

impl From<OptimisticMismatch> for PessimisticMismatch {
    fn from(value: OptimisticMismatch) -> Self {
        Self {
            matched_bytes: value.matched_bytes,
            prefix_byte: None,
        }
    }
}

/// Represents a prefix mismatch when looking at the entire prefix, including
/// in cases where it is read from a descendant leaf node.
pub struct ExplicitMismatch<K, V> {
    /// How many bytes were matched
    pub matched_bytes: usize,
    /// Value of the byte that made it not match
    pub prefix_byte: u8,
    /// Pointer to the leaf if the prefix was reconstructed
    pub leaf_ptr: Option<NodePtr<LeafNode<K, V>>>,
}

impl<K, V> Clone for ExplicitMismatch<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for ExplicitMismatch<K, V> {}

impl<K, V> fmt::Debug for ExplicitMismatch<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mismatch")
            .field("matched_bytes", &self.matched_bytes)
            .field("prefix_byte", &self.prefix_byte)
            .field("leaf_ptr", &self.leaf_ptr)
            .finish()
    }
}

/// Common methods implemented by all inner nodes.
pub trait InnerNode: Node + Sized + fmt::Debug {
    /// The type of the next larger node type.
    type GrownNode: InnerNode<Key = Self::Key, Value = Self::Value>;

    /// The type of the next smaller node type.
    type ShrunkNode: InnerNode<Key = Self::Key, Value = Self::Value>;

    /// The type of the iterator over all children of the inner node
    type Iter<'a>: Iterator<Item = (u8, OpaqueNodePtr<Self::Key, Self::Value>)> + FusedIterator
    where
        Self: 'a;

    /// Create an empty inner node, with no children and no prefix.
    fn empty() -> Self {
        Self::from_header(Header::empty(Self::TYPE))
    }

    /// Create a new inner node with the given prefix.
    ///
    /// `prefix_len` is passed separately because the logical prefix length
    /// can be greater than `prefix.len()` when a mismatch was resolved by
    /// reconstructing the prefix from a descendant leaf.
    fn from_prefix(prefix: &[u8], prefix_len: usize) -> Self {
        Self::from_header(Header::new(Self::TYPE, prefix, prefix_len))
    }

    /// Create a new inner node from the given header, restamping its node
    /// type tag.
    fn from_header(header: Header) -> Self;

    /// Get the header of this inner node.
    fn header(&self) -> &Header;

    /// Search through this node for a child node that corresponds to the
    /// given key fragment.
    fn lookup_child(&self, key_fragment: u8) -> Option<OpaqueNodePtr<Self::Key, Self::Value>>;

    /// Write a child pointer with key fragment to this inner node.
    ///
    /// If the key fragment already exists in the node, overwrite the existing
    /// child pointer.
    ///
    /// # Panics
    ///  - Panics when the node is full.
    fn write_child(&mut self, key_fragment: u8, child_pointer: OpaqueNodePtr<Self::Key, Self::Value>);

    /// Attempt to remove a child pointer at the key fragment from this inner
    /// node.
    ///
    /// If the key fragment does not exist in this node, return `None`.
    fn remove_child(&mut self, key_fragment: u8) -> Option<OpaqueNodePtr<Self::Key, Self::Value>>;

    /// Grow this node into the next larger class, copying over children and
    /// prefix information.
    fn grow(&self) -> Self::GrownNode;

    /// Shrink this node into the next smaller class, copying over children
    /// and prefix information.
    ///
    /// # Panics
    ///  - Panics if the new, smaller node size does not have enough capacity
    ///    to hold all the children.
    fn shrink(&self) -> Self::ShrunkNode;

    /// Returns true if this node has no more space to store children.
    fn is_full(&self) -> bool {
        self.header().num_children() >= Self::TYPE.upper_capacity()
    }

    /// Create an iterator over all `(key byte, child pointer)` pairs in this
    /// inner node.
    fn iter(&self) -> Self::Iter<'_>;

    /// Returns the minimum child pointer of this node together with its key
    /// byte.
    ///
    /// # Panics
    ///  - Panics if the node has no children; a reachable inner node always
    ///    has at least two.
    fn min(&self) -> (u8, OpaqueNodePtr<Self::Key, Self::Value>);

    /// Test the given key against the node prefix by checking only that the
    /// key is long enough, without comparing any bytes.
    ///
    /// The `truncated_key` argument should be the overall key bytes
    /// shortened to the current depth.
    ///
    /// This is called "optimistic" matching because it assumes the prefix
    /// content matches. A caller that uses this function must perform a final
    /// check against the full leaf key to make sure that no wrong turn was
    /// taken.
    fn optimistic_match_prefix(
        &self,
        truncated_key: &[u8],
    ) -> Result<PrefixMatch, OptimisticMismatch> {
        if truncated_key.len() < self.header().prefix_len() {
            Err(OptimisticMismatch {
                matched_bytes: truncated_key.len(),
            })
        } else {
            Ok(PrefixMatch {
                matched_bytes: self.header().prefix_len(),
            })
        }
    }

    /// Test the given key against the node prefix by comparing the bytes
    /// that are stored inline.
    ///
    /// The `truncated_key` argument should be the overall key bytes
    /// shortened to the current depth.
    ///
    /// If the prefix has spilled past the inline capacity (there are implicit
    /// bytes), this falls back to
    /// [`optimistic_match_prefix`][InnerNode::optimistic_match_prefix]. In
    /// that case the `any_implicit_bytes` flag is set to `true` in the `Ok`
    /// case and `prefix_byte` is `None` in the `Err` case, and a caller that
    /// reaches a leaf node using these results must perform a final check
    /// against the full leaf key.
    fn attempt_pessimistic_match_prefix(
        &self,
        truncated_key: &[u8],
    ) -> Result<AttemptOptimisticPrefixMatch, PessimisticMismatch> {
        if NUM_PREFIX_BYTES < self.header().prefix_len() {
            let PrefixMatch { matched_bytes } = self.optimistic_match_prefix(truncated_key)?;

            Ok(AttemptOptimisticPrefixMatch {
                matched_bytes,
                any_implicit_bytes: true,
            })
        } else {
            // All bytes are explicit, this can proceed as normal

            let prefix = self.header().read_prefix();

            let matched_bytes = prefix
                .iter()
                .zip(truncated_key)
                .take_while(|(a, b)| **a == **b)
                .count();
            if matched_bytes < self.header().prefix_len() {
                Err(PessimisticMismatch {
                    matched_bytes,
                    prefix_byte: Some(prefix[matched_bytes]),
                })
            } else {
                Ok(AttemptOptimisticPrefixMatch {
                    matched_bytes,
                    any_implicit_bytes: false,
                })
            }
        }
    }

    /// Compares the compressed path of a node with the key and returns the
    /// number of equal bytes.
    ///
    /// This function reads the full prefix for this inner node, descending to
    /// a leaf node to recover the bytes that are not stored inline.
    ///
    /// # Panics
    ///  - Panics if `current_depth` is greater than `key.len()`.
    fn match_full_prefix(
        &self,
        key: &[u8],
        current_depth: usize,
    ) -> Result<PrefixMatch, ExplicitMismatch<Self::Key, Self::Value>>
    where
        Self::Key: AsBytes,
    {
        let (prefix, leaf_ptr) = self.read_full_prefix(current_depth);
        let truncated_key = &key[current_depth..];

        let matched_bytes = prefix
            .iter()
            .zip(truncated_key)
            .take_while(|(a, b)| **a == **b)
            .count();
        if matched_bytes < prefix.len() {
            Err(ExplicitMismatch {
                matched_bytes,
                prefix_byte: prefix[matched_bytes],
                leaf_ptr,
            })
        } else {
            Ok(PrefixMatch { matched_bytes })
        }
    }

    /// Read the prefix as a whole, reconstructing it from a descendant leaf
    /// if it has spilled past the inline capacity.
    fn read_full_prefix(
        &self,
        current_depth: usize,
    ) -> (&[u8], Option<NodePtr<LeafNode<Self::Key, Self::Value>>>)
    where
        Self::Key: AsBytes,
    {
        self.header().inner_read_full_prefix(self, current_depth)
    }
}

/// Node that contains a single leaf value.
#[derive(Debug)]
#[repr(C)]
pub struct LeafNode<K, V> {
    /// The common node fields.
    header: Header,
    /// The leaf value.
    value: V,
    /// The full key that the `value` was stored with.
    key: K,
}

impl<K, V> LeafNode<K, V> {
    /// Create a new leaf node with the given key and value.
    pub fn new(key: K, value: V) -> Self {
        LeafNode {
            header: Header::empty(NodeType::Leaf),
            value,
            key,
        }
    }

    /// Returns a shared reference to the key contained by this leaf node
    pub fn key_ref(&self) -> &K {
        &self.key
    }

    /// Returns a shared reference to the value contained by this leaf node
    pub fn value_ref(&self) -> &V {
        &self.value
    }

    /// Returns a mutable reference to the value contained by this leaf node
    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    /// Return shared references to the key and value contained by this leaf
    /// node
    pub fn entry_ref(&self) -> (&K, &V) {
        (&self.key, &self.value)
    }

    /// Consume the leaf node and return a tuple of the key and value
    pub fn into_entry(self) -> (K, V) {
        (self.key, self.value)
    }

    /// Check that the provided full key is the same one as the stored key.
    pub fn matches_full_key(&self, possible_key: &[u8]) -> bool
    where
        K: AsBytes,
    {
        self.key.as_bytes().eq(possible_key)
    }
}

impl<K, V> Node for LeafNode<K, V> {
    type Key = K;
    type Value = V;

    const TYPE: NodeType = NodeType::Leaf;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_matches_full_key() {
        let leaf = LeafNode::new(Box::<[u8]>::from(*b"hello"), ());

        assert!(leaf.matches_full_key(b"hello"));
        assert!(!leaf.matches_full_key(b"hell"));
        assert!(!leaf.matches_full_key(b"hello!"));
    }

    #[test]
    fn opaque_pointer_node_type_round_trip() {
        let mut n4 = InnerNode4::<Box<[u8]>, ()>::empty();
        let mut n16 = InnerNode16::<Box<[u8]>, ()>::empty();
        let mut n48 = InnerNode48::<Box<[u8]>, ()>::empty();
        let mut n256 = InnerNode256::<Box<[u8]>, ()>::empty();
        let mut leaf = LeafNode::<Box<[u8]>, ()>::new(Box::from(&b"key"[..]), ());

        assert_eq!(NodePtr::from(&mut n4).to_opaque().node_type(), NodeType::Node4);
        assert_eq!(
            NodePtr::from(&mut n16).to_opaque().node_type(),
            NodeType::Node16
        );
        assert_eq!(
            NodePtr::from(&mut n48).to_opaque().node_type(),
            NodeType::Node48
        );
        assert_eq!(
            NodePtr::from(&mut n256).to_opaque().node_type(),
            NodeType::Node256
        );
        assert_eq!(
            NodePtr::from(&mut leaf).to_opaque().node_type(),
            NodeType::Leaf
        );

        let opaque = NodePtr::from(&mut n4).to_opaque();
        assert!(opaque.is::<InnerNode4<Box<[u8]>, ()>>());
        assert!(opaque.cast::<InnerNode16<Box<[u8]>, ()>>().is_none());
        assert!(matches!(opaque.to_node_ptr(), ConcreteNodePtr::Node4(_)));
    }

    #[test]
    fn capacity_ranges_cover_all_sizes() {
        assert_eq!(NodeType::Node4.capacity_range(), 1..5);
        assert_eq!(NodeType::Node16.capacity_range(), 5..17);
        assert_eq!(NodeType::Node48.capacity_range(), 17..49);
        assert_eq!(NodeType::Node256.capacity_range(), 49..257);
    }

    #[test]
    fn shrink_thresholds_mirror_capacity() {
        assert!(!NodeType::Node4.should_shrink_inner_node(1));
        assert!(NodeType::Node16.should_shrink_inner_node(4));
        assert!(!NodeType::Node16.should_shrink_inner_node(5));
        assert!(NodeType::Node48.should_shrink_inner_node(16));
        assert!(!NodeType::Node48.should_shrink_inner_node(17));
        assert!(NodeType::Node256.should_shrink_inner_node(48));
        assert!(!NodeType::Node256.should_shrink_inner_node(49));
    }
}
