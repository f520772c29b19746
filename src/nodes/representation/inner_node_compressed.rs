use crate::{
    rust_nightly_apis::maybe_uninit_slice_assume_init_ref, Header, InnerNode, InnerNode48, Node,
    NodeType, OpaqueNodePtr, RestrictedNodeIndex,
};
use std::{
    fmt,
    iter::{Copied, Zip},
    mem::{self, MaybeUninit},
    slice::Iter,
};

/// Where a write should happen inside the node
enum WritePoint {
    /// In an already existing key fragment
    Existing(usize),
    /// As the last key fragment
    Last(usize),
    /// Shift the key fragments to the right
    Shift(usize),
}

/// Common methods for searching in an [`InnerNodeCompressed`]
trait SearchInnerNodeCompressed {
    /// Get the index of the child if it exists
    fn lookup_child_index(&self, key_fragment: u8) -> Option<usize>;

    /// Find the write point for `key_fragment`
    fn find_write_point(&self, key_fragment: u8) -> WritePoint;
}

/// Node type that has a compact representation for key bytes and children
/// pointers.
///
/// The key bytes are stored in sorted order, with the child pointer for a
/// key byte stored at the same index in the `child_pointers` array.
#[repr(C, align(8))]
pub struct InnerNodeCompressed<K, V, const SIZE: usize> {
    /// The common node fields.
    pub header: Header,
    /// An array that contains single key bytes in the same index as the
    /// `child_pointers` array contains the matching child tree.
    ///
    /// This array will only be initialized for the first
    /// `header.num_children()` values.
    pub keys: [MaybeUninit<u8>; SIZE],
    /// An array that contains the child data.
    ///
    /// This array will only be initialized for the first
    /// `header.num_children()` values.
    pub child_pointers: [MaybeUninit<OpaqueNodePtr<K, V>>; SIZE],
}

impl<K, V, const SIZE: usize> fmt::Debug for InnerNodeCompressed<K, V, SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (keys, child_pointers) = self.initialized_portion();
        f.debug_struct("InnerNodeCompressed")
            .field("SIZE", &SIZE)
            .field("header", &self.header)
            .field("keys", &keys)
            .field("child_pointers", &child_pointers)
            .finish()
    }
}

/// Iterator type for an [`InnerNodeCompressed`]
pub type InnerNodeCompressedIter<'a, K, V> =
    Zip<Copied<Iter<'a, u8>>, Copied<Iter<'a, OpaqueNodePtr<K, V>>>>;

impl<K, V, const SIZE: usize> InnerNodeCompressed<K, V, SIZE> {
    /// Return the initialized portions of the keys and child pointer arrays.
    pub fn initialized_portion(&self) -> (&[u8], &[OpaqueNodePtr<K, V>]) {
        let num_children = self.header.num_children();
        // SAFETY: The array prefix with length `header.num_children()` is
        // guaranteed to be initialized
        unsafe {
            (
                maybe_uninit_slice_assume_init_ref(&self.keys[..num_children]),
                maybe_uninit_slice_assume_init_ref(&self.child_pointers[..num_children]),
            )
        }
    }

    /// Generalized version of [`InnerNode::lookup_child`] for compressed
    /// nodes
    fn lookup_child_inner(&self, key_fragment: u8) -> Option<OpaqueNodePtr<K, V>>
    where
        Self: SearchInnerNodeCompressed,
    {
        let child_index = self.lookup_child_index(key_fragment)?;
        // SAFETY: The value at `child_index` is guaranteed to be initialized
        // because the `lookup_child_index` function will only search in the
        // initialized portion of the `child_pointers` array.
        Some(unsafe { MaybeUninit::assume_init(self.child_pointers[child_index]) })
    }

    /// Write a child to the node, maintaining the sorted order of the key
    /// fragments.
    ///
    /// # Panics
    ///  - Panics if a new key fragment must be written and the node is
    ///    already full.
    fn write_child_inner(&mut self, key_fragment: u8, child_pointer: OpaqueNodePtr<K, V>)
    where
        Self: SearchInnerNodeCompressed,
    {
        let num_children = self.header.num_children();
        let child_index = match self.find_write_point(key_fragment) {
            WritePoint::Existing(child_index) => child_index,
            WritePoint::Last(child_index) => {
                assert!(num_children < SIZE, "node is full");
                self.header.inc_num_children();
                child_index
            },
            WritePoint::Shift(child_index) => {
                assert!(num_children < SIZE, "node is full");
                self.keys
                    .copy_within(child_index..num_children, child_index + 1);
                self.child_pointers
                    .copy_within(child_index..num_children, child_index + 1);
                self.header.inc_num_children();
                child_index
            },
        };
        self.keys[child_index].write(key_fragment);
        self.child_pointers[child_index].write(child_pointer);
    }

    /// Removes the child at the given key fragment, if it exists.
    fn remove_child_inner(&mut self, key_fragment: u8) -> Option<OpaqueNodePtr<K, V>>
    where
        Self: SearchInnerNodeCompressed,
    {
        let child_index = self.lookup_child_index(key_fragment)?;
        let child_ptr = mem::replace(&mut self.child_pointers[child_index], MaybeUninit::uninit());

        // Copy all the child_pointer and key values in higher indices down by
        // one.
        self.keys
            .copy_within((child_index + 1)..self.header.num_children(), child_index);
        self.child_pointers
            .copy_within((child_index + 1)..self.header.num_children(), child_index);

        self.header.dec_num_children();
        // SAFETY: This child pointer value is initialized because we got it
        // by searching through the initialized keys.
        Some(unsafe { MaybeUninit::assume_init(child_ptr) })
    }

    /// Grows or shrinks the node to a different compressed size.
    fn change_block_size<const NEW_SIZE: usize>(&self) -> InnerNodeCompressed<K, V, NEW_SIZE>
    where
        InnerNodeCompressed<K, V, NEW_SIZE>: Node<Key = K, Value = V>,
    {
        let num_children = self.header.num_children();
        assert!(
            num_children <= NEW_SIZE,
            "cannot change InnerNodeCompressed<{SIZE}> to size {NEW_SIZE} when it has [{num_children}] children",
        );

        let header = self
            .header
            .with_node_type(<InnerNodeCompressed<K, V, NEW_SIZE> as Node>::TYPE);
        let mut keys = [MaybeUninit::uninit(); NEW_SIZE];
        let mut child_pointers = [MaybeUninit::uninit(); NEW_SIZE];

        keys[..num_children].copy_from_slice(&self.keys[..num_children]);
        child_pointers[..num_children].copy_from_slice(&self.child_pointers[..num_children]);

        InnerNodeCompressed {
            header,
            keys,
            child_pointers,
        }
    }

    /// Transform this node into an [`InnerNode48`].
    fn grow_node48(&self) -> InnerNode48<K, V> {
        let header = self.header.with_node_type(NodeType::Node48);
        let mut child_indices = [RestrictedNodeIndex::<48>::EMPTY; 256];
        let mut child_pointers = [MaybeUninit::uninit(); 48];

        let (keys, _) = self.initialized_portion();

        for (index, key) in keys.iter().copied().enumerate() {
            // PANIC SAFETY: This `try_from` will not panic because `index` is
            // guaranteed to be 15 or less because of the length of the
            // `InnerNode16.keys` array.
            child_indices[usize::from(key)] = RestrictedNodeIndex::try_from(index).unwrap();
        }

        let num_children = header.num_children();
        child_pointers[..num_children].copy_from_slice(&self.child_pointers[..num_children]);

        InnerNode48 {
            header,
            child_indices,
            child_pointers,
        }
    }

    /// Get an iterator over the keys and children of the node
    fn inner_iter(&self) -> InnerNodeCompressedIter<'_, K, V> {
        let (keys, children) = self.initialized_portion();
        keys.iter().copied().zip(children.iter().copied())
    }

    /// Return the minimum child of this node together with its key byte.
    fn inner_min(&self) -> (u8, OpaqueNodePtr<K, V>) {
        let (keys, children) = self.initialized_portion();
        // The keys are sorted, so the minimum is at the front. Indexing
        // panics on an empty node, which can only occur on a malformed tree.
        (keys[0], children[0])
    }
}

/// Node that references between 2 and 4 children
pub type InnerNode4<K, V> = InnerNodeCompressed<K, V, 4>;

impl<K, V> SearchInnerNodeCompressed for InnerNode4<K, V> {
    fn lookup_child_index(&self, key_fragment: u8) -> Option<usize> {
        let (keys, _) = self.initialized_portion();
        for (child_index, key) in keys.iter().enumerate() {
            if key_fragment == *key {
                return Some(child_index);
            }
        }

        None
    }

    fn find_write_point(&self, key_fragment: u8) -> WritePoint {
        let (keys, _) = self.initialized_portion();

        let mut child_index = 0;
        for key in keys {
            #[allow(clippy::comparison_chain)]
            if key_fragment < *key {
                return WritePoint::Shift(child_index);
            } else if key_fragment == *key {
                return WritePoint::Existing(child_index);
            }
            child_index += 1;
        }
        WritePoint::Last(child_index)
    }
}

impl<K, V> Node for InnerNode4<K, V> {
    type Key = K;
    type Value = V;

    const TYPE: NodeType = NodeType::Node4;
}

impl<K, V> InnerNode for InnerNode4<K, V> {
    type GrownNode = InnerNode16<K, V>;
    type Iter<'a> = InnerNodeCompressedIter<'a, K, V> where Self: 'a;
    type ShrunkNode = InnerNode4<K, V>;

    fn from_header(header: Header) -> Self {
        Self {
            header: header.with_node_type(NodeType::Node4),
            child_pointers: [MaybeUninit::uninit(); 4],
            keys: [MaybeUninit::uninit(); 4],
        }
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn lookup_child(&self, key_fragment: u8) -> Option<OpaqueNodePtr<K, V>> {
        self.lookup_child_inner(key_fragment)
    }

    fn write_child(&mut self, key_fragment: u8, child_pointer: OpaqueNodePtr<K, V>) {
        self.write_child_inner(key_fragment, child_pointer)
    }

    fn remove_child(&mut self, key_fragment: u8) -> Option<OpaqueNodePtr<K, V>> {
        self.remove_child_inner(key_fragment)
    }

    fn grow(&self) -> Self::GrownNode {
        self.change_block_size()
    }

    fn shrink(&self) -> Self::ShrunkNode {
        panic!("unable to shrink a Node4, something went wrong!")
    }

    fn iter(&self) -> Self::Iter<'_> {
        self.inner_iter()
    }

    fn min(&self) -> (u8, OpaqueNodePtr<K, V>) {
        self.inner_min()
    }
}

/// Node that references between 5 and 16 children
pub type InnerNode16<K, V> = InnerNodeCompressed<K, V, 16>;

impl<K, V> SearchInnerNodeCompressed for InnerNode16<K, V> {
    fn lookup_child_index(&self, key_fragment: u8) -> Option<usize> {
        let (keys, _) = self.initialized_portion();
        for (child_index, key) in keys.iter().enumerate() {
            if key_fragment == *key {
                return Some(child_index);
            }
        }

        None
    }

    fn find_write_point(&self, key_fragment: u8) -> WritePoint {
        let (keys, _) = self.initialized_portion();

        let mut child_index = 0;
        for key in keys {
            #[allow(clippy::comparison_chain)]
            if key_fragment < *key {
                return WritePoint::Shift(child_index);
            } else if key_fragment == *key {
                return WritePoint::Existing(child_index);
            }
            child_index += 1;
        }
        WritePoint::Last(child_index)
    }
}

impl<K, V> Node for InnerNode16<K, V> {
    type Key = K;
    type Value = V;

    const TYPE: NodeType = NodeType::Node16;
}

impl<K, V> InnerNode for InnerNode16<K, V> {
    type GrownNode = InnerNode48<K, V>;
    type Iter<'a> = InnerNodeCompressedIter<'a, K, V> where Self: 'a;
    type ShrunkNode = InnerNode4<K, V>;

    fn from_header(header: Header) -> Self {
        Self {
            header: header.with_node_type(NodeType::Node16),
            child_pointers: [MaybeUninit::uninit(); 16],
            keys: [MaybeUninit::uninit(); 16],
        }
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn lookup_child(&self, key_fragment: u8) -> Option<OpaqueNodePtr<K, V>> {
        self.lookup_child_inner(key_fragment)
    }

    fn write_child(&mut self, key_fragment: u8, child_pointer: OpaqueNodePtr<K, V>) {
        self.write_child_inner(key_fragment, child_pointer)
    }

    fn remove_child(&mut self, key_fragment: u8) -> Option<OpaqueNodePtr<K, V>> {
        self.remove_child_inner(key_fragment)
    }

    fn grow(&self) -> Self::GrownNode {
        self.grow_node48()
    }

    fn shrink(&self) -> Self::ShrunkNode {
        self.change_block_size()
    }

    fn iter(&self) -> Self::Iter<'_> {
        self.inner_iter()
    }

    fn min(&self) -> (u8, OpaqueNodePtr<K, V>) {
        self.inner_min()
    }
}
