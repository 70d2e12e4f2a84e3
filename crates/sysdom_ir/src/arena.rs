//! Append-only, ID-indexed storage.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Conversion between an ID newtype and its dense index.
pub trait ArenaId: Copy {
    /// Wraps a raw index.
    fn from_raw(index: u32) -> Self;

    /// Unwraps the raw index.
    fn as_raw(self) -> u32;
}

/// Dense storage addressed by typed IDs.
///
/// Items are only ever appended, so an ID stays valid for the arena's whole
/// lifetime. Unchecked accessors panic on a foreign ID; [`Arena::try_get`]
/// is the checked variant for IDs that may come from user code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    #[serde(skip)]
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Stores `item` and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = self.next_id();
        self.items.push(item);
        id
    }

    /// The ID the next [`alloc`](Self::alloc) will return.
    pub fn next_id(&self) -> I {
        I::from_raw(self.items.len() as u32)
    }

    /// # Panics
    ///
    /// Panics if `id` was not allocated by this arena.
    pub fn get(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }

    /// # Panics
    ///
    /// Panics if `id` was not allocated by this arena.
    pub fn get_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.as_raw() as usize]
    }

    /// Checked lookup.
    pub fn try_get(&self, id: I) -> Option<&T> {
        self.items.get(id.as_raw() as usize)
    }

    /// Checked mutable lookup.
    pub fn try_get_mut(&mut self, id: I) -> Option<&mut T> {
        self.items.get_mut(id.as_raw() as usize)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing was allocated.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All IDs in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = I> {
        (0..self.items.len() as u32).map(I::from_raw)
    }

    /// `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// `(ID, &mut T)` pairs in allocation order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> {
        self.items
            .iter_mut()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        self.get(id)
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        self.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SignalId;

    #[test]
    fn ids_are_dense_and_stable() {
        let mut arena: Arena<SignalId, &str> = Arena::new();
        assert_eq!(arena.next_id(), SignalId::from_raw(0));
        let a = arena.alloc("clk");
        let b = arena.alloc("rst");
        assert_eq!(a.as_raw(), 0);
        assert_eq!(b.as_raw(), 1);
        assert_eq!(arena[a], "clk");
        arena[b] = "reset";
        assert_eq!(*arena.get(b), "reset");
        assert_eq!(arena.ids().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn checked_lookup() {
        let mut arena: Arena<SignalId, u8> = Arena::new();
        let id = arena.alloc(1);
        assert_eq!(arena.try_get(id), Some(&1));
        assert_eq!(arena.try_get(SignalId::from_raw(5)), None);
        if let Some(v) = arena.try_get_mut(id) {
            *v = 2;
        }
        assert_eq!(arena[id], 2);
    }

    #[test]
    fn iteration_order() {
        let mut arena: Arena<SignalId, u32> = Arena::default();
        assert!(arena.is_empty());
        for v in [10, 20, 30] {
            arena.alloc(v);
        }
        for (_, v) in arena.iter_mut() {
            *v += 1;
        }
        let seen: Vec<u32> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(seen, vec![11, 21, 31]);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    #[should_panic]
    fn foreign_id_panics() {
        let arena: Arena<SignalId, u8> = Arena::new();
        let _ = arena[SignalId::from_raw(0)];
    }
}
