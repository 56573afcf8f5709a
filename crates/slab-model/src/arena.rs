//! Dense storage for model entities.
//!
//! `Arena<T>` keeps entities in insertion order and maps their external
//! integer id to a typed index `Idx<T>`. Cross-entity links (node → plaque,
//! node → target node, ...) are stored as indices rather than references, so
//! an entity shared by many elements is never aliased mutably.
//!
//! # Determinism
//! - Iteration order is insertion order.
//! - `Idx<T>` ordering is by its inner `u32`, i.e. insertion order.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Index;

use crate::error::{ModelError, Result};

/// An entity that carries a positive external id.
pub trait Keyed {
    /// Human-readable entity kind used in error messages.
    const KIND: &'static str;

    fn key(&self) -> i32;
}

/// Typed index into an `Arena<T>`.
pub struct Idx<T> {
    raw: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Idx<T> {
    #[inline]
    const fn new(raw: u32) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Index of the entity at `index` in its arena. Tables that are laid out
    /// parallel to an arena use this to hand out typed indices.
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self::new(index as u32)
    }

    /// Position of the entity in its arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Idx<T> {}

impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Idx<T> {}

impl<T> PartialOrd for Idx<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Idx<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for Idx<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Idx({})", self.raw)
    }
}

/// Insertion-ordered entity storage with id lookup.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: Vec<T>,
    by_id: HashMap<i32, Idx<T>>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<T: Keyed> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            by_id: HashMap::with_capacity(capacity),
        }
    }

    /// Build an arena from entities, rejecting non-positive and duplicate ids.
    pub fn try_from_iter(items: impl IntoIterator<Item = T>) -> Result<Self> {
        let iter = items.into_iter();
        let mut arena = Self::with_capacity(iter.size_hint().0);
        for item in iter {
            arena.insert(item)?;
        }
        Ok(arena)
    }

    /// Append an entity and return its index.
    pub fn insert(&mut self, item: T) -> Result<Idx<T>> {
        let id = item.key();
        if id <= 0 {
            return Err(ModelError::InvalidId { kind: T::KIND, id });
        }
        if self.by_id.contains_key(&id) {
            return Err(ModelError::DuplicateId { kind: T::KIND, id });
        }
        let idx = Idx::new(self.items.len() as u32);
        self.items.push(item);
        self.by_id.insert(id, idx);
        Ok(idx)
    }

    /// Index of the entity with external id `id`.
    pub fn find(&self, id: i32) -> Option<Idx<T>> {
        self.by_id.get(&id).copied()
    }

    /// Entity with external id `id`.
    pub fn by_id(&self, id: i32) -> Option<&T> {
        self.find(id).map(|idx| &self.items[idx.index()])
    }

    pub fn contains_id(&self, id: i32) -> bool {
        self.by_id.contains_key(&id)
    }
}

impl<T> Arena<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, idx: Idx<T>) -> Option<&T> {
        self.items.get(idx.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Idx<T>, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (Idx::new(i as u32), item))
    }

    pub fn values(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn indices(&self) -> impl Iterator<Item = Idx<T>> {
        (0..self.items.len() as u32).map(Idx::new)
    }
}

impl<T> Index<Idx<T>> for Arena<T> {
    type Output = T;

    fn index(&self, idx: Idx<T>) -> &T {
        &self.items[idx.index()]
    }
}
