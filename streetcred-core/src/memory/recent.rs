//! Bounded most-recent-first sequence.
//!
//! Backs every capped list in the ledger: pushing to the front is O(1) and
//! evicts from the back once `CAP` is reached.

use std::collections::VecDeque;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A ring buffer holding at most `CAP` items, newest at index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recent<T, const CAP: usize>(VecDeque<T>);

impl<T, const CAP: usize> Recent<T, CAP> {
    /// Maximum number of retained items.
    pub const CAPACITY: usize = CAP;

    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self(VecDeque::with_capacity(CAP))
    }

    /// Insert `item` as the newest entry, returning the evicted oldest entry
    /// if the buffer was full.
    pub fn push_front(&mut self, item: T) -> Option<T> {
        let evicted = if self.0.len() >= CAP {
            self.0.pop_back()
        } else {
            None
        };
        self.0.push_front(item);
        evicted
    }

    /// Number of retained items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing has been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The newest item.
    #[must_use]
    pub fn newest(&self) -> Option<&T> {
        self.0.front()
    }

    /// Item at `index` (0 = newest).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.0.get(index)
    }

    /// Iterate newest to oldest.
    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, T> {
        self.0.iter()
    }

    /// Mutably iterate newest to oldest.
    pub fn iter_mut(&mut self) -> std::collections::vec_deque::IterMut<'_, T> {
        self.0.iter_mut()
    }

    /// Drop everything past the first `len` items.
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len.min(CAP));
    }
}

impl<T, const CAP: usize> Default for Recent<T, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T, const CAP: usize> IntoIterator for &'a Recent<T, CAP> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'a, T, const CAP: usize> IntoIterator for &'a mut Recent<T, CAP> {
    type Item = &'a mut T;
    type IntoIter = std::collections::vec_deque::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter_mut()
    }
}

impl<T: Serialize, const CAP: usize> Serialize for Recent<T, CAP> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>, const CAP: usize> Deserialize<'de> for Recent<T, CAP> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut items = VecDeque::<T>::deserialize(deserializer)?;
        items.truncate(CAP);
        Ok(Self(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first_and_evicts_oldest() {
        let mut recent: Recent<u32, 3> = Recent::new();
        assert_eq!(recent.push_front(1), None);
        assert_eq!(recent.push_front(2), None);
        assert_eq!(recent.push_front(3), None);
        assert_eq!(recent.push_front(4), Some(1));

        let items: Vec<u32> = recent.iter().copied().collect();
        assert_eq!(items, vec![4, 3, 2]);
        assert_eq!(recent.newest(), Some(&4));
    }

    #[test]
    fn deserialize_truncates_to_capacity() {
        let recent: Recent<u32, 2> = serde_json::from_str("[9, 8, 7, 6]").expect("de");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent.get(0), Some(&9));
        assert_eq!(recent.get(1), Some(&8));
    }

    #[test]
    fn serializes_as_plain_array() {
        let mut recent: Recent<&str, 4> = Recent::new();
        recent.push_front("a");
        recent.push_front("b");
        let json = serde_json::to_string(&recent).expect("ser");
        assert_eq!(json, "[\"b\",\"a\"]");
    }

    #[test]
    fn mutable_iteration_is_newest_first() {
        let mut recent: Recent<u32, 3> = Recent::new();
        recent.push_front(1);
        recent.push_front(2);
        for item in &mut recent {
            *item *= 10;
        }
        let items: Vec<u32> = recent.iter().copied().collect();
        assert_eq!(items, vec![20, 10]);
    }
}
