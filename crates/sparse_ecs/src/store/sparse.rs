//! Sparse-set storage shared by component payloads and tags. The layout follows
//! <https://docs.rs/bevy_ecs/latest/src/bevy_ecs/storage/sparse_set.rs.html>

use std::{hash::Hash, marker::PhantomData};

/// Something that can be used as a key in a [`SparseSet`]
pub trait SparseSetIndex: Copy + Eq + Hash {
    fn as_usize(&self) -> usize;
    fn from_usize(value: usize) -> Self;
}

macro_rules! impl_sparse_set_index {
    ($($ty:ty),+) => {
        $(impl SparseSetIndex for $ty {
            fn as_usize(&self) -> usize {
                *self as usize
            }
            fn from_usize(value: usize) -> Self {
                value as $ty
            }
        })*
    };
}

impl_sparse_set_index!(u32, usize);

/// Maps a [`SparseSetIndex`] to a value, growing on demand.
#[derive(Clone, Debug)]
pub struct SparseArray<I, V = I> {
    values: Vec<Option<V>>,
    marker: PhantomData<I>,
}

impl<I: SparseSetIndex, V> Default for SparseArray<I, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<I: SparseSetIndex, V> SparseArray<I, V> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            values: Vec::new(),
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn contains(&self, index: I) -> bool {
        let index = index.as_usize();
        self.values.get(index).map(|v| v.is_some()).unwrap_or(false)
    }

    #[inline]
    pub fn get(&self, index: I) -> Option<&V> {
        let index = index.as_usize();
        self.values.get(index).and_then(|v| v.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, index: I) -> Option<&mut V> {
        let index = index.as_usize();
        self.values.get_mut(index).and_then(|v| v.as_mut())
    }

    #[inline]
    pub fn insert(&mut self, index: I, value: V) {
        let index = index.as_usize();
        if index >= self.values.len() {
            self.values.resize_with(index + 1, || None);
        }
        self.values[index] = Some(value);
    }

    #[inline]
    pub fn remove(&mut self, index: I) -> Option<V> {
        let index = index.as_usize();
        self.values.get_mut(index).and_then(|value| value.take())
    }
}


/// Packed storage of `V` keyed by `I`.
///
/// `dense` and `indices` always have the same length, and for every dense slot `n`,
/// `sparse[indices[n]] == n`. Removal swaps the last slot into the hole, so a slot index is only
/// stable until the next removal.
#[derive(Clone, Debug)]
pub struct SparseSet<I, V> {
    dense: Vec<V>,
    indices: Vec<I>,
    sparse: SparseArray<I, usize>,
}

impl<I: SparseSetIndex, V> Default for SparseSet<I, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<I: SparseSetIndex, V> SparseSet<I, V> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            dense: Vec::new(),
            indices: Vec::new(),
            sparse: SparseArray::new(),
        }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            dense: Vec::with_capacity(capacity),
            indices: Vec::with_capacity(capacity),
            sparse: SparseArray::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains(&self, index: I) -> bool {
        self.sparse.contains(index)
    }

    #[inline]
    pub fn get(&self, index: I) -> Option<&V> {
        self.sparse
            .get(index)
            .and_then(|dense_index| self.dense.get(*dense_index))
    }

    #[inline]
    pub fn get_mut(&mut self, index: I) -> Option<&mut V> {
        let dense = &mut self.dense;
        self.sparse
            .get(index)
            .and_then(move |dense_index| dense.get_mut(*dense_index))
    }

    /// Appends `value` for `index`. If `index` already owns a slot, nothing is changed and `value`
    /// is handed back.
    pub fn insert(&mut self, index: I, value: V) -> Result<(), V> {
        if self.sparse.contains(index) {
            return Err(value);
        }

        self.sparse.insert(index, self.dense.len());
        self.indices.push(index);
        self.dense.push(value);
        Ok(())
    }

    /// Swap-and-pop removal. The slot of the last element is re-pointed to the vacated index,
    /// unless the removed slot already was the last one.
    pub fn remove(&mut self, index: I) -> Option<V> {
        let dense_index = self.sparse.remove(index)?;
        let last = self.dense.len() - 1;

        let value = self.dense.swap_remove(dense_index);
        self.indices.swap_remove(dense_index);

        if dense_index != last {
            let swapped = self.indices[dense_index];
            if let Some(slot) = self.sparse.get_mut(swapped) {
                *slot = dense_index;
            }
        }

        Some(value)
    }

    pub fn indices(&self) -> impl Iterator<Item = I> + '_ {
        self.indices.iter().copied()
    }

    /// Verifies the cross-array invariants. Linear in the number of slots.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.dense.len() == self.indices.len()
            && self
                .indices
                .iter()
                .enumerate()
                .all(|(n, index)| self.sparse.get(*index) == Some(&n))
    }
}
