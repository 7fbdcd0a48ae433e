//! Bitsets over [`ComponentId`]s, used as the key of batch-change subscriptions.
//!
//! Bit `id` is set for every id in the set. The words grow on demand, so there is no upper bound
//! on the number of component kinds. Trailing zero words are trimmed after every change, so two
//! masks of the same set always compare and hash equal.

use crate::component::ComponentId;

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ComponentMask {
    words: Vec<u64>,
}

impl ComponentMask {
    #[inline]
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Sets the bit of `id`. Returns `false` if it was already set.
    pub fn insert(&mut self, id: ComponentId) -> bool {
        let (word, bit) = Self::split(id);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }

        let was_set = self.words[word] & bit != 0;
        self.words[word] |= bit;
        !was_set
    }

    /// Clears the bit of `id`. Returns `false` if it was not set.
    pub fn remove(&mut self, id: ComponentId) -> bool {
        let (word, bit) = Self::split(id);
        let Some(value) = self.words.get_mut(word) else {
            return false;
        };

        let was_set = *value & bit != 0;
        *value &= !bit;
        self.trim();
        was_set
    }

    #[inline]
    pub fn contains(&self, id: ComponentId) -> bool {
        let (word, bit) = Self::split(id);
        self.words.get(word).map(|value| value & bit != 0).unwrap_or(false)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterates over every id set in this mask, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(n, &word)| {
                let base = n * 64;
                let mut bits = word;
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let tz = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    Some(ComponentId::new((base + tz) as u32))
                })
            })
    }

    #[inline]
    fn split(id: ComponentId) -> (usize, u64) {
        (id.index() / 64, 1u64 << (id.index() % 64))
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl FromIterator<ComponentId> for ComponentMask {
    fn from_iter<T: IntoIterator<Item = ComponentId>>(iter: T) -> Self {
        let mut mask = Self::new();
        for id in iter {
            mask.insert(id);
        }
        mask
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u32]) -> Vec<ComponentId> {
        values.iter().copied().map(ComponentId::new).collect()
    }

    #[test]
    fn order_does_not_matter() {
        let a: ComponentMask = ids(&[1, 5, 70]).into_iter().collect();
        let b: ComponentMask = ids(&[70, 1, 5]).into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.iter().collect::<Vec<_>>(), ids(&[1, 5, 70]));
    }

    #[test]
    fn subsets_and_supersets_differ() {
        let pair: ComponentMask = ids(&[1, 2]).into_iter().collect();
        let single: ComponentMask = ids(&[1]).into_iter().collect();
        let triple: ComponentMask = ids(&[1, 2, 3]).into_iter().collect();
        assert_ne!(pair, single);
        assert_ne!(pair, triple);
    }

    #[test]
    fn removing_high_bit_trims_words() {
        let mut mask: ComponentMask = ids(&[3]).into_iter().collect();
        let other = mask.clone();

        assert!(mask.insert(ComponentId::new(200)));
        assert!(!mask.insert(ComponentId::new(200)));
        assert_ne!(mask, other);

        assert!(mask.remove(ComponentId::new(200)));
        assert!(!mask.remove(ComponentId::new(200)));
        assert_eq!(mask, other);
        assert!(mask.contains(ComponentId::new(3)));
        assert!(!mask.contains(ComponentId::new(200)));
    }
}
