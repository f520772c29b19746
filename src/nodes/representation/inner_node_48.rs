use crate::{
    rust_nightly_apis::{maybe_uninit_slice_assume_init_mut, maybe_uninit_slice_assume_init_ref},
    Header, InnerNode, InnerNode16, InnerNode256, InnerNodeCompressed, Node, NodeType,
    OpaqueNodePtr,
};
use std::{
    cmp::Ordering,
    error::Error,
    fmt,
    iter::{Enumerate, FusedIterator},
    mem::{self, MaybeUninit},
    slice::Iter,
};

/// A restricted index only valid from 0 to LIMIT - 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct RestrictedNodeIndex<const LIMIT: u8>(u8);

impl<const LIMIT: u8> RestrictedNodeIndex<LIMIT> {
    /// A placeholder index value that indicates that the index is not
    /// occupied
    pub const EMPTY: Self = RestrictedNodeIndex(LIMIT);

    /// Return true if the given index is the empty sentinel value
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

impl<const LIMIT: u8> From<RestrictedNodeIndex<LIMIT>> for u8 {
    fn from(src: RestrictedNodeIndex<LIMIT>) -> Self {
        src.0
    }
}

impl<const LIMIT: u8> From<RestrictedNodeIndex<LIMIT>> for usize {
    fn from(src: RestrictedNodeIndex<LIMIT>) -> Self {
        usize::from(src.0)
    }
}

impl<const LIMIT: u8> TryFrom<usize> for RestrictedNodeIndex<LIMIT> {
    type Error = TryFromByteError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value < usize::from(LIMIT) {
            Ok(RestrictedNodeIndex(value as u8))
        } else {
            Err(TryFromByteError(LIMIT, value))
        }
    }
}

impl<const LIMIT: u8> PartialOrd for RestrictedNodeIndex<LIMIT> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.0 == LIMIT || other.0 == LIMIT {
            None
        } else {
            Some(self.0.cmp(&other.0))
        }
    }
}

/// The error type returned when attempting to construct an index outside the
/// accepted range of a [`RestrictedNodeIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryFromByteError(u8, usize);

impl fmt::Display for TryFromByteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Input value [{}] is greater than the allowed maximum [{}] for RestrictedNodeIndex.",
            self.1, self.0
        )
    }
}

impl Error for TryFromByteError {}

/// Node that references between 17 and 48 children
#[repr(C, align(8))]
pub struct InnerNode48<K, V> {
    /// The common node fields.
    pub header: Header,
    /// An array that maps key bytes (as the index) to the index value in the
    /// `child_pointers` array.
    ///
    /// All the `child_indices` values are guaranteed to be
    /// `RestrictedNodeIndex::<48>::EMPTY` when the node is constructed.
    pub child_indices: [RestrictedNodeIndex<48>; 256],
    /// For each element in this array, it is assumed to be initialized if
    /// there is an index in the `child_indices` array that points to it
    pub child_pointers: [MaybeUninit<OpaqueNodePtr<K, V>>; 48],
}

impl<K, V> fmt::Debug for InnerNode48<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InnerNode48")
            .field("header", &self.header)
            .field("child_indices", &self.child_indices)
            .field("child_pointers", &self.initialized_child_pointers())
            .finish()
    }
}

impl<K, V> InnerNode48<K, V> {
    /// Return the initialized portion of the child pointer array.
    pub fn initialized_child_pointers(&self) -> &[OpaqueNodePtr<K, V>] {
        // SAFETY: The array prefix with length `header.num_children()` is
        // guaranteed to be initialized
        unsafe {
            maybe_uninit_slice_assume_init_ref(&self.child_pointers[..self.header.num_children()])
        }
    }
}

impl<K, V> Node for InnerNode48<K, V> {
    type Key = K;
    type Value = V;

    const TYPE: NodeType = NodeType::Node48;
}

impl<K, V> InnerNode for InnerNode48<K, V> {
    type GrownNode = InnerNode256<K, V>;
    type Iter<'a> = Node48Iter<'a, K, V> where Self: 'a;
    type ShrunkNode = InnerNode16<K, V>;

    fn from_header(header: Header) -> Self {
        InnerNode48 {
            header: header.with_node_type(NodeType::Node48),
            child_indices: [RestrictedNodeIndex::<48>::EMPTY; 256],
            child_pointers: [MaybeUninit::uninit(); 48],
        }
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn lookup_child(&self, key_fragment: u8) -> Option<OpaqueNodePtr<K, V>> {
        let index = self.child_indices[usize::from(key_fragment)];
        if index.is_empty() {
            return None;
        }

        let child_pointers = self.initialized_child_pointers();
        Some(child_pointers[usize::from(index)])
    }

    fn write_child(&mut self, key_fragment: u8, child_pointer: OpaqueNodePtr<K, V>) {
        let key_fragment_idx = usize::from(key_fragment);
        let child_index = if self.child_indices[key_fragment_idx].is_empty() {
            let child_index = self.header.num_children();
            assert!(child_index < self.child_pointers.len(), "node is full");

            // PANIC SAFETY: This `try_from` will not panic because the node
            // is not full, so the next free index is within 0..48.
            self.child_indices[key_fragment_idx] =
                RestrictedNodeIndex::try_from(child_index).unwrap();
            self.header.inc_num_children();
            child_index
        } else {
            // overwrite existing
            usize::from(self.child_indices[key_fragment_idx])
        };

        self.child_pointers[child_index].write(child_pointer);
    }

    fn remove_child(&mut self, key_fragment: u8) -> Option<OpaqueNodePtr<K, V>> {
        let restricted_index = self.child_indices[usize::from(key_fragment)];
        if restricted_index.is_empty() {
            return None;
        }

        // Replace the child pointer with an uninitialized value, even though
        // it may possibly be overwritten by the compaction step
        let child_ptr = mem::replace(
            &mut self.child_pointers[usize::from(restricted_index)],
            MaybeUninit::uninit(),
        );

        // Copy all the child_pointer values in higher indices down by one.
        self.child_pointers.copy_within(
            (usize::from(restricted_index) + 1)..self.header.num_children(),
            usize::from(restricted_index),
        );

        // Take all child indices that are greater than the index we're
        // removing, and subtract one so that they remain valid
        for other_restricted_index in &mut self.child_indices {
            if matches!(
                restricted_index.partial_cmp(other_restricted_index),
                Some(Ordering::Less)
            ) {
                // PANIC SAFETY: This will not underflow because it is
                // guaranteed to be greater than at least 1 other index. The
                // `try_from` will not panic because the new value is derived
                // from an existing restricted index.
                *other_restricted_index =
                    RestrictedNodeIndex::try_from(usize::from(*other_restricted_index) - 1)
                        .unwrap();
            }
        }

        self.child_indices[usize::from(key_fragment)] = RestrictedNodeIndex::EMPTY;
        self.header.dec_num_children();
        // SAFETY: This child pointer value is initialized because we got it
        // by using a non-`EMPTY` index from the child indices array.
        Some(unsafe { MaybeUninit::assume_init(child_ptr) })
    }

    fn grow(&self) -> Self::GrownNode {
        let header = self.header.with_node_type(NodeType::Node256);
        let mut child_pointers = [None; 256];
        let initialized_child_pointers = self.initialized_child_pointers();
        for (key_fragment, index) in self.child_indices.iter().enumerate() {
            if index.is_empty() {
                continue;
            }

            child_pointers[key_fragment] = Some(initialized_child_pointers[usize::from(*index)]);
        }

        InnerNode256 {
            header,
            child_pointers,
        }
    }

    fn shrink(&self) -> Self::ShrunkNode {
        assert!(
            self.header.num_children() <= 16,
            "Cannot shrink a Node48 when it has more than 16 children. Currently has [{}] \
             children.",
            self.header.num_children()
        );

        let header = self.header.with_node_type(NodeType::Node16);

        let mut key_and_child_ptrs: [MaybeUninit<(u8, OpaqueNodePtr<K, V>)>; 16] =
            [MaybeUninit::uninit(); 16];

        for (idx, value) in self.iter().enumerate() {
            key_and_child_ptrs[idx].write(value);
        }

        let init_key_and_child_ptrs = {
            // SAFETY: The first `num_children` values are guaranteed to be
            // initialized in this array because the previous iterator loops
            // through all children of the inner node.
            let init_key_and_child_ptrs = unsafe {
                maybe_uninit_slice_assume_init_mut(
                    &mut key_and_child_ptrs[..header.num_children()],
                )
            };

            init_key_and_child_ptrs.sort_unstable_by_key(|(key_byte, _)| *key_byte);

            init_key_and_child_ptrs
        };

        let mut keys = [MaybeUninit::uninit(); 16];
        let mut child_pointers = [MaybeUninit::uninit(); 16];

        for (idx, (key_byte, child_ptr)) in init_key_and_child_ptrs.iter().copied().enumerate() {
            keys[idx].write(key_byte);
            child_pointers[idx].write(child_ptr);
        }

        InnerNodeCompressed {
            header,
            keys,
            child_pointers,
        }
    }

    fn iter(&self) -> Self::Iter<'_> {
        Node48Iter {
            it: self.child_indices.iter().enumerate(),
            child_pointers: self.initialized_child_pointers(),
        }
    }

    fn min(&self) -> (u8, OpaqueNodePtr<K, V>) {
        for (key, index) in self.child_indices.iter().enumerate() {
            if index.is_empty() {
                continue;
            }
            let child_pointers = self.initialized_child_pointers();
            return (key as u8, child_pointers[usize::from(*index)]);
        }
        unreachable!("inner node must have a non-zero number of children");
    }
}

/// An iterator over the children of an [`InnerNode48`].
pub struct Node48Iter<'a, K, V> {
    it: Enumerate<Iter<'a, RestrictedNodeIndex<48>>>,
    child_pointers: &'a [OpaqueNodePtr<K, V>],
}

impl<K, V> Iterator for Node48Iter<'_, K, V> {
    type Item = (u8, OpaqueNodePtr<K, V>);

    fn next(&mut self) -> Option<Self::Item> {
        for (key, index) in self.it.by_ref() {
            if index.is_empty() {
                continue;
            }
            // The enumeration index ranges over [0, 256), so the cast to u8
            // cannot truncate.
            return Some((key as u8, self.child_pointers[usize::from(*index)]));
        }
        None
    }
}

impl<K, V> FusedIterator for Node48Iter<'_, K, V> {}
