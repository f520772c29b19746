//! Trie node lookup and manipulation

use crate::{ConcreteNodePtr, InnerNode, NodePtr, OpaqueNodePtr};

mod insert;
pub use insert::*;

mod delete;
pub use delete::*;

mod lookup;
pub use lookup::*;

mod minmax;
pub use minmax::*;

/// Deallocate the given node and all children of the given node.
///
/// This will also deallocate the leaf nodes with their key and value type
/// data.
///
/// # Safety
///  - This function must only be called once for this root node and all
///    descendants, otherwise a double-free could result.
///  - This function cannot be called concurrently to any read or write of the
///    `root` node or any child node of `root`.
pub unsafe fn deallocate_tree<K, V>(root: OpaqueNodePtr<K, V>) {
    fn deallocate_inner_node<K, V, N>(stack: &mut Vec<OpaqueNodePtr<K, V>>, inner_ptr: NodePtr<N>)
    where
        N: InnerNode<Key = K, Value = V>,
    {
        {
            // SAFETY: The scope of this reference is bounded and we enforce
            // that no mutation of the reference memory takes place within the
            // lifetime. The deallocation of the node happens outside of this
            // block, after the lifetime ends.
            let inner_node = unsafe { inner_ptr.as_ref() };

            stack.extend(inner_node.iter().map(|(_, child)| child));
        }
        // SAFETY: The single call per node requirement is enforced by the
        // safety requirements on this function.
        unsafe {
            drop(NodePtr::deallocate_node_ptr(inner_ptr));
        }
    }

    let mut stack = Vec::new();

    stack.push(root);

    while let Some(next_node_ptr) = stack.pop() {
        match next_node_ptr.to_node_ptr() {
            ConcreteNodePtr::Node4(inner_ptr) => deallocate_inner_node(&mut stack, inner_ptr),
            ConcreteNodePtr::Node16(inner_ptr) => deallocate_inner_node(&mut stack, inner_ptr),
            ConcreteNodePtr::Node48(inner_ptr) => deallocate_inner_node(&mut stack, inner_ptr),
            ConcreteNodePtr::Node256(inner_ptr) => deallocate_inner_node(&mut stack, inner_ptr),
            ConcreteNodePtr::LeafNode(leaf_ptr) => {
                // SAFETY: The single call per node requirement is enforced by
                // the safety requirements on this function.
                unsafe {
                    drop(NodePtr::deallocate_node_ptr(leaf_ptr));
                }
            },
        }
    }
}
