//! Ordered key/value container backed by an index-addressed binary search tree.
//!
//! Nodes live in a slot arena and refer to their children by index, so no
//! operation recurses: insert, lookup and removal walk the tree in a loop,
//! and in-order traversal keeps an explicit stack. Freed slots are reused by
//! later inserts.

use std::{borrow::Borrow, cmp::Ordering, fmt, mem};

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    left: Option<usize>,
    right: Option<usize>,
}

/// Position from which a node is referenced.
#[derive(Debug, Clone, Copy)]
enum Link {
    Root,
    Left(usize),
    Right(usize),
}

/// Mapping from unique keys to values with ascending-key iteration.
///
/// Inserting an existing key replaces its value. Callers that must reject
/// duplicates check [`KeyedStore::contains_key`] first.
#[derive(Clone)]
pub struct KeyedStore<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    root: Option<usize>,
    len: usize,
}

impl<K, V> Default for KeyedStore<K, V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
        }
    }
}

impl<K: Ord, V> KeyedStore<K, V> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `value` under `key`, returning the previous value when the key
    /// was already present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (link, found) = self.locate(&key);
        if let Some(index) = found {
            let node = self.node_mut(index)?;
            return Some(mem::replace(&mut node.value, value));
        }

        let index = self.allocate(Node {
            key,
            value,
            left: None,
            right: None,
        });
        self.set_link(link, Some(index));
        self.len += 1;
        None
    }

    /// Mutably borrow the value under `key`, inserting `default()` first when
    /// the key is absent.
    pub fn get_or_insert_with(&mut self, key: K, default: impl FnOnce() -> V) -> &mut V {
        let (link, found) = self.locate(&key);
        let index = match found {
            Some(index) => index,
            None => {
                let index = self.vacant_slot();
                self.set_link(link, Some(index));
                self.len += 1;
                index
            }
        };
        let node = self.slots[index].get_or_insert_with(|| Node {
            key,
            value: default(),
            left: None,
            right: None,
        });
        &mut node.value
    }

    /// Borrow the value stored under `key`.
    pub fn find<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let index = self.locate(key).1?;
        self.node(index).map(|node| &node.value)
    }

    /// Mutably borrow the value stored under `key`.
    pub fn find_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let index = self.locate(key).1?;
        self.node_mut(index).map(|node| &mut node.value)
    }

    /// Whether an entry exists for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.locate(key).1.is_some()
    }

    /// Remove the entry for `key`, reporting whether anything was removed.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.take(key).is_some()
    }

    /// Remove the entry for `key` and return its value.
    pub fn take<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (link, index) = self.locate(key);
        let index = index?;
        let (left, right) = {
            let node = self.node(index)?;
            (node.left, node.right)
        };

        let removed = match (left, right) {
            (None, child) | (child, None) => {
                self.set_link(link, child);
                self.release(index)?
            }
            (Some(_), Some(right)) => {
                // Splice out the in-order successor and move its entry into
                // the removed node's slot, keeping that slot's children.
                let mut successor = right;
                let mut successor_link = Link::Right(index);
                while let Some(next) = self.node(successor)?.left {
                    successor_link = Link::Left(successor);
                    successor = next;
                }
                let successor_right = self.node(successor)?.right;
                self.set_link(successor_link, successor_right);
                let moved = self.release(successor)?;

                let target = self.node_mut(index)?;
                let key = mem::replace(&mut target.key, moved.key);
                let value = mem::replace(&mut target.value, moved.value);
                Node {
                    key,
                    value,
                    left: None,
                    right: None,
                }
            }
        };

        self.len -= 1;
        Some(removed.value)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.root = None;
        self.len = 0;
    }

    /// Walk the entries in ascending key order.
    ///
    /// Each call starts a fresh traversal over the current contents.
    pub fn entries_in_order(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    /// Alias for [`KeyedStore::entries_in_order`].
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.entries_in_order()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Values in ascending key order.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Find the slot holding `key` together with the link that points at it.
    /// When the key is absent, the link is where a new node would attach.
    fn locate<Q>(&self, key: &Q) -> (Link, Option<usize>)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut link = Link::Root;
        let mut cursor = self.root;
        while let Some(index) = cursor {
            let Some(node) = self.node(index) else {
                break;
            };
            match key.cmp(node.key.borrow()) {
                Ordering::Less => {
                    link = Link::Left(index);
                    cursor = node.left;
                }
                Ordering::Greater => {
                    link = Link::Right(index);
                    cursor = node.right;
                }
                Ordering::Equal => return (link, Some(index)),
            }
        }
        (link, None)
    }
}

impl<K, V> KeyedStore<K, V> {
    fn node(&self, index: usize) -> Option<&Node<K, V>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, index: usize) -> Option<&mut Node<K, V>> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    fn set_link(&mut self, link: Link, child: Option<usize>) {
        match link {
            Link::Root => self.root = child,
            Link::Left(parent) => {
                if let Some(node) = self.node_mut(parent) {
                    node.left = child;
                }
            }
            Link::Right(parent) => {
                if let Some(node) = self.node_mut(parent) {
                    node.right = child;
                }
            }
        }
    }

    fn allocate(&mut self, node: Node<K, V>) -> usize {
        let index = self.vacant_slot();
        self.slots[index] = Some(node);
        index
    }

    fn vacant_slot(&mut self) -> usize {
        match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, index: usize) -> Option<Node<K, V>> {
        let node = self.slots.get_mut(index)?.take()?;
        self.free.push(index);
        Some(node)
    }
}

impl<K: Ord, V: PartialEq> PartialEq for KeyedStore<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<K: Ord, V: Eq> Eq for KeyedStore<K, V> {}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for KeyedStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for KeyedStore<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        store.extend(iter);
        store
    }
}

impl<K: Ord, V> Extend<(K, V)> for KeyedStore<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a KeyedStore<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order traversal over a [`KeyedStore`].
pub struct Iter<'a, K, V> {
    store: &'a KeyedStore<K, V>,
    stack: Vec<usize>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(store: &'a KeyedStore<K, V>) -> Self {
        let mut iter = Self {
            store,
            stack: Vec::new(),
            remaining: store.len,
        };
        iter.push_left_spine(store.root);
        iter
    }

    fn push_left_spine(&mut self, mut cursor: Option<usize>) {
        while let Some(index) = cursor {
            self.stack.push(index);
            cursor = self.store.node(index).and_then(|node| node.left);
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let store = self.store;
        let node = store.node(index)?;
        self.push_left_spine(node.right);
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
