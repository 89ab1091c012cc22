//! Growable history that only ever appends.

use std::slice;

/// Ordered values, oldest first. There is no way to remove or replace an
/// element once it has been appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOnlySequence<T> {
    items: Vec<T>,
}

impl<T> Default for AppendOnlySequence<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> AppendOnlySequence<T> {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to the end.
    pub fn append(&mut self, value: T) {
        self.items.push(value);
    }

    /// Number of recorded values.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Most recently appended value.
    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Borrow the values oldest first.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Borrowed view of the current contents.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Clone> AppendOnlySequence<T> {
    /// Copy of the current contents, oldest first.
    pub fn to_ordered_list(&self) -> Vec<T> {
        self.items.clone()
    }
}

impl<T> Extend<T> for AppendOnlySequence<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<T> FromIterator<T> for AppendOnlySequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a AppendOnlySequence<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
