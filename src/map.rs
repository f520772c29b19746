//! Module containing the [`TreeMap`] implementation.

use crate::{
    deallocate_tree, search_for_delete_point, search_for_insert_point, search_unchecked, AsBytes,
    DeleteResult, InsertPrefixError, InsertResult, LeafNode, NoPrefixesBytes, NodePtr,
    OpaqueNodePtr,
};
use std::{borrow::Borrow, fmt};

/// An ordered map based on an adaptive radix tree.
///
/// Keys are stored and compared by their byte representation, as produced by
/// [`AsBytes`]. The tree requires that no key is a proper prefix of another
/// key present in the map; [`TreeMap::try_insert`] reports a violation as an
/// [`InsertPrefixError`], and [`TreeMap::insert`] is available for key types
/// that rule the situation out statically via [`NoPrefixesBytes`].
///
/// All mutation requires `&mut self`, so the map can be shared between
/// threads for concurrent reads (when `K` and `V` allow it) but writes are
/// exclusive. Replaced and removed nodes are freed immediately.
pub struct TreeMap<K, V> {
    /// The number of entries present in the tree.
    num_entries: usize,
    /// A pointer to the tree root, if present.
    root: Option<OpaqueNodePtr<K, V>>,
}

impl<K, V> TreeMap<K, V> {
    /// Create a new, empty [`TreeMap`].
    ///
    /// This function will not pre-allocate anything.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use artree::TreeMap;
    ///
    /// let map = TreeMap::<Box<[u8]>, ()>::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        TreeMap {
            num_entries: 0,
            root: None,
        }
    }

    /// Return the number of key-value pairs in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use artree::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// map.insert(0u16, 'a');
    /// map.insert(1u16, 'b');
    /// assert_eq!(map.len(), 2);
    /// ```
    pub fn len(&self) -> usize {
        self.num_entries
    }

    /// Return true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    /// Clear the map, removing all entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use artree::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// map.insert(0u16, 'a');
    ///
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert_eq!(map.get(&0u16), None);
    /// ```
    pub fn clear(&mut self) {
        if let Some(root) = self.root {
            // SAFETY: The mutable reference to the map guarantees that there
            // are no other references into the tree, and the root is replaced
            // before the borrow ends so the tree is deallocated only once.
            unsafe { deallocate_tree(root) };

            self.num_entries = 0;
            self.root = None;
        }
    }
}

impl<K: AsBytes, V> TreeMap<K, V> {
    /// Return a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use artree::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// map.insert(*b"abcd", 'a');
    ///
    /// assert_eq!(map.get(b"abcd"), Some(&'a'));
    /// assert_eq!(map.get(b"abce"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: AsBytes + ?Sized,
    {
        let root = self.root?;

        // SAFETY: Since we hold a shared reference to the map, there are no
        // mutating operations on the tree while the search runs.
        let leaf_node_ptr = unsafe { search_unchecked(root, key.as_bytes()) }?;

        // SAFETY: The returned reference is bounded by the `&self` borrow, and
        // every mutating operation requires `&mut self`.
        Some(unsafe { leaf_node_ptr.as_value_ref() })
    }

    /// Return a mutable reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use artree::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// map.insert(*b"abcd", 'a');
    ///
    /// *map.get_mut(b"abcd").unwrap() = 'b';
    /// assert_eq!(map.get(b"abcd"), Some(&'b'));
    /// ```
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: AsBytes + ?Sized,
    {
        let root = self.root?;

        // SAFETY: Since we hold a mutable reference to the map, there are no
        // other operations on the tree while the search runs.
        let leaf_node_ptr = unsafe { search_unchecked(root, key.as_bytes()) }?;

        // SAFETY: The returned reference is bounded by the `&mut self`
        // borrow, so no other read or write of the tree can happen while it
        // lives.
        Some(unsafe { leaf_node_ptr.as_value_mut() })
    }

    /// Return true if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: AsBytes + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Insert a key-value pair into the map, returning the value that was
    /// previously stored under the key, if any.
    ///
    /// # Errors
    ///  - Returns an [`InsertPrefixError`] if the given key is a prefix of an
    ///    existing key, or an existing key is a prefix of the given key. The
    ///    map is unchanged in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use artree::TreeMap;
    ///
    /// let mut map = TreeMap::<Box<[u8]>, char>::new();
    ///
    /// assert_eq!(map.try_insert(Box::from(&b"ab"[..]), 'a').unwrap(), None);
    /// assert_eq!(map.try_insert(Box::from(&b"ab"[..]), 'b').unwrap(), Some('a'));
    ///
    /// // "ab" is a prefix of "abc", so this insert is rejected.
    /// assert!(map.try_insert(Box::from(&b"abc"[..]), 'c').is_err());
    /// ```
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, InsertPrefixError> {
        let root = match self.root {
            Some(root) => root,
            None => {
                self.root =
                    Some(NodePtr::allocate_node_ptr(LeafNode::new(key, value)).to_opaque());
                self.num_entries = 1;
                return Ok(None);
            },
        };

        // SAFETY: The mutable reference to the map guarantees that no other
        // operation reads or writes the tree.
        let insert_point = unsafe { search_for_insert_point(root, &key)? };
        // SAFETY: Same as above.
        let InsertResult {
            existing_leaf,
            new_root,
        } = unsafe { insert_point.apply(key, value) };

        self.root = Some(new_root);

        match existing_leaf {
            Some(leaf) => Ok(Some(leaf.into_entry().1)),
            None => {
                self.num_entries += 1;
                Ok(None)
            },
        }
    }

    /// Insert a key-value pair into the map, returning the value that was
    /// previously stored under the key, if any.
    ///
    /// This function is only available for key types that can never be
    /// prefixes of each other, see [`NoPrefixesBytes`]. Use
    /// [`TreeMap::try_insert`] for other key types.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use artree::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    ///
    /// assert_eq!(map.insert(120u32, 'a'), None);
    /// assert_eq!(map.insert(120u32, 'b'), Some('a'));
    /// assert_eq!(map.get(&120u32), Some(&'b'));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V>
    where
        K: NoPrefixesBytes,
    {
        // PANIC SAFETY: This will not panic because the `NoPrefixesBytes`
        // bound guarantees that the prefix collision error cannot occur.
        self.try_insert(key, value)
            .expect("`NoPrefixesBytes` rules out prefix collisions")
    }

    /// Remove a key from the map, returning the stored key and value if the
    /// key was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use artree::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// map.insert(*b"ab", 'a');
    ///
    /// assert_eq!(map.remove_entry(b"ab"), Some((*b"ab", 'a')));
    /// assert_eq!(map.remove_entry(b"ab"), None);
    /// ```
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: AsBytes + ?Sized,
    {
        let root = self.root?;

        // SAFETY: The mutable reference to the map guarantees that no other
        // operation reads or writes the tree.
        let delete_point = unsafe { search_for_delete_point(root, key.as_bytes())? };
        // SAFETY: Same as above, and `root` is the unique pointer to the
        // tree.
        let DeleteResult {
            new_root,
            deleted_leaf,
        } = unsafe { delete_point.apply(root) };

        self.root = new_root;
        self.num_entries -= 1;

        Some(deleted_leaf.into_entry())
    }

    /// Remove a key from the map, returning the stored value if the key was
    /// present.
    ///
    /// Removing a key that is not present is a no-op.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use artree::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// map.insert(*b"ab", 'a');
    ///
    /// assert_eq!(map.remove(b"ab"), Some('a'));
    /// assert_eq!(map.remove(b"ab"), None);
    /// assert!(map.is_empty());
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: AsBytes + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }
}

impl<K, V> Drop for TreeMap<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> Default for TreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for TreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeMap")
            .field("len", &self.num_entries)
            .finish_non_exhaustive()
    }
}

impl<K: NoPrefixesBytes, V> Extend<(K, V)> for TreeMap<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: NoPrefixesBytes, V> FromIterator<(K, V)> for TreeMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = TreeMap::new();
        map.extend(iter);
        map
    }
}

// SAFETY: The `TreeMap` owns all of its data exclusively, the raw pointers
// inside never alias data owned by another value, so it can be sent to
// another thread when the key and value types allow it.
unsafe impl<K: Send, V: Send> Send for TreeMap<K, V> {}

// SAFETY: All methods taking `&self` only perform reads of the tree, so
// sharing references between threads is safe when the key and value types
// allow it.
unsafe impl<K: Sync, V: Sync> Sync for TreeMap<K, V> {}
