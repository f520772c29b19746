use crate::{
    Header, InnerNode, InnerNode48, Node, NodeType, OpaqueNodePtr, RestrictedNodeIndex,
};
use std::{
    fmt,
    iter::{Enumerate, FusedIterator},
    mem::MaybeUninit,
    slice::Iter,
};

/// Node that references between 49 and 256 children
#[repr(C, align(8))]
pub struct InnerNode256<K, V> {
    /// The common node fields.
    pub header: Header,
    /// An array that directly maps a key byte (as index) to a child node.
    pub child_pointers: [Option<OpaqueNodePtr<K, V>>; 256],
}

impl<K, V> fmt::Debug for InnerNode256<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InnerNode256")
            .field("header", &self.header)
            .field("child_pointers", &self.child_pointers)
            .finish()
    }
}

impl<K, V> Node for InnerNode256<K, V> {
    type Key = K;
    type Value = V;

    const TYPE: NodeType = NodeType::Node256;
}

impl<K, V> InnerNode for InnerNode256<K, V> {
    type GrownNode = InnerNode256<K, V>;
    type Iter<'a> = Node256Iter<'a, K, V> where Self: 'a;
    type ShrunkNode = InnerNode48<K, V>;

    fn from_header(header: Header) -> Self {
        InnerNode256 {
            header: header.with_node_type(NodeType::Node256),
            child_pointers: [None; 256],
        }
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn lookup_child(&self, key_fragment: u8) -> Option<OpaqueNodePtr<K, V>> {
        self.child_pointers[usize::from(key_fragment)]
    }

    fn write_child(&mut self, key_fragment: u8, child_pointer: OpaqueNodePtr<K, V>) {
        let existing =
            self.child_pointers[usize::from(key_fragment)].replace(child_pointer);
        if existing.is_none() {
            self.header.inc_num_children();
        }
    }

    fn remove_child(&mut self, key_fragment: u8) -> Option<OpaqueNodePtr<K, V>> {
        let removed = self.child_pointers[usize::from(key_fragment)].take();
        if removed.is_some() {
            self.header.dec_num_children();
        }
        removed
    }

    fn grow(&self) -> Self::GrownNode {
        panic!("an InnerNode256 cannot grow, it can hold every key byte")
    }

    fn shrink(&self) -> Self::ShrunkNode {
        assert!(
            self.header.num_children() <= 48,
            "Cannot shrink a Node256 when it has more than 48 children. Currently has [{}] \
             children.",
            self.header.num_children()
        );

        let header = self.header.with_node_type(NodeType::Node48);
        let mut child_indices = [RestrictedNodeIndex::<48>::EMPTY; 256];
        let mut child_pointers = [MaybeUninit::uninit(); 48];

        for (child_index, (key_byte, child_ptr)) in self.iter().enumerate() {
            // PANIC SAFETY: This `try_from` will not panic because the number
            // of children is 48 or less, checked above.
            child_indices[usize::from(key_byte)] =
                RestrictedNodeIndex::try_from(child_index).unwrap();
            child_pointers[child_index].write(child_ptr);
        }

        InnerNode48 {
            header,
            child_indices,
            child_pointers,
        }
    }

    fn iter(&self) -> Self::Iter<'_> {
        Node256Iter {
            it: self.child_pointers.iter().enumerate(),
        }
    }

    fn min(&self) -> (u8, OpaqueNodePtr<K, V>) {
        for (key, child_pointer) in self.child_pointers.iter().enumerate() {
            if let Some(child_pointer) = child_pointer {
                return (key as u8, *child_pointer);
            }
        }
        unreachable!("inner node must have a non-zero number of children");
    }
}

/// An iterator over the children of an [`InnerNode256`].
pub struct Node256Iter<'a, K, V> {
    it: Enumerate<Iter<'a, Option<OpaqueNodePtr<K, V>>>>,
}

impl<K, V> Iterator for Node256Iter<'_, K, V> {
    type Item = (u8, OpaqueNodePtr<K, V>);

    fn next(&mut self) -> Option<Self::Item> {
        for (key, child_pointer) in self.it.by_ref() {
            if let Some(child_pointer) = child_pointer {
                // The enumeration index ranges over [0, 256), so the cast to
                // u8 cannot truncate.
                return Some((key as u8, *child_pointer));
            }
        }
        None
    }
}

impl<K, V> FusedIterator for Node256Iter<'_, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LeafNode, NodePtr};

    #[test]
    fn lookup_write_remove() {
        let mut n = InnerNode256::<Box<[u8]>, ()>::empty();
        let mut l1 = LeafNode::new(Box::from(&[][..]), ());
        let mut l2 = LeafNode::new(Box::from(&[][..]), ());
        let l1_ptr = NodePtr::from(&mut l1).to_opaque();
        let l2_ptr = NodePtr::from(&mut l2).to_opaque();

        assert!(n.lookup_child(123).is_none());

        n.write_child(123, l1_ptr);
        n.write_child(0, l2_ptr);

        assert_eq!(n.header.num_children(), 2);
        assert_eq!(n.lookup_child(123), Some(l1_ptr));
        assert_eq!(n.lookup_child(0), Some(l2_ptr));

        // Overwriting does not change the count.
        n.write_child(123, l2_ptr);
        assert_eq!(n.header.num_children(), 2);
        assert_eq!(n.lookup_child(123), Some(l2_ptr));

        assert_eq!(n.remove_child(123), Some(l2_ptr));
        assert_eq!(n.remove_child(123), None);
        assert_eq!(n.header.num_children(), 1);
    }

    #[test]
    fn shrink_node256_to_node48() {
        let mut n256 = InnerNode256::<Box<[u8]>, ()>::empty();
        let mut leaves: Vec<_> = (0..4).map(|_| LeafNode::new(Box::from(&[][..]), ())).collect();
        let leaf_ptrs: Vec<_> = leaves
            .iter_mut()
            .map(|leaf| NodePtr::from(leaf).to_opaque())
            .collect();

        n256.write_child(250, leaf_ptrs[0]);
        n256.write_child(3, leaf_ptrs[1]);
        n256.write_child(123, leaf_ptrs[2]);
        n256.write_child(1, leaf_ptrs[3]);

        let n48 = n256.shrink();

        assert_eq!(n48.header.node_type(), NodeType::Node48);
        assert_eq!(n48.header.num_children(), 4);
        assert_eq!(n48.lookup_child(250), Some(leaf_ptrs[0]));
        assert_eq!(n48.lookup_child(3), Some(leaf_ptrs[1]));
        assert_eq!(n48.lookup_child(123), Some(leaf_ptrs[2]));
        assert_eq!(n48.lookup_child(1), Some(leaf_ptrs[3]));
        assert_eq!(n48.lookup_child(4), None);
    }

    #[test]
    fn iterate_in_key_order() {
        let mut n256 = InnerNode256::<Box<[u8]>, ()>::empty();
        let mut l1 = LeafNode::new(Box::from(&[][..]), ());
        let mut l2 = LeafNode::new(Box::from(&[][..]), ());
        let mut l3 = LeafNode::new(Box::from(&[][..]), ());
        let l1_ptr = NodePtr::from(&mut l1).to_opaque();
        let l2_ptr = NodePtr::from(&mut l2).to_opaque();
        let l3_ptr = NodePtr::from(&mut l3).to_opaque();

        n256.write_child(255, l1_ptr);
        n256.write_child(0, l2_ptr);
        n256.write_child(85, l3_ptr);

        let pairs: Vec<_> = n256.iter().collect();
        assert_eq!(pairs, vec![(0, l2_ptr), (85, l3_ptr), (255, l1_ptr)]);

        assert_eq!(n256.min(), (0, l2_ptr));
    }
}
