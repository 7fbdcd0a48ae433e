use sparse_ecs_macros::identifier;

use crate::{entity::EntityId, store::TagStore};

identifier!(TagId, u32);

impl TagId {
    /// Never handed out by [`World::tag_register`](crate::world::World::tag_register)
    pub const RESERVED: Self = Self::new(0);
}

/// Every registered tag, indexed by [`TagId`]. Counted independently of components; id 0 is
/// reserved, so the store of id `n` lives at `stores[n - 1]`. A store stays [`None`] until the tag
/// is first attached.
#[derive(Debug, Default)]
pub struct Tags {
    stores: Vec<Option<TagStore>>,
}

impl Tags {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    pub fn register(&mut self) -> TagId {
        self.stores.push(None);
        TagId::new(self.stores.len() as u32)
    }

    #[inline]
    pub fn is_registered(&self, id: TagId) -> bool {
        id.index()
            .checked_sub(1)
            .map(|index| index < self.stores.len())
            .unwrap_or(false)
    }

    /// Outer [`None`] if unregistered, inner [`None`] if the store was never created.
    #[inline]
    pub fn get(&self, id: TagId) -> Option<Option<&TagStore>> {
        self.stores.get(id.index().checked_sub(1)?).map(Option::as_ref)
    }

    /// Returns [`None`] if `id` is unregistered, else the store, created on first use.
    pub fn get_or_init(&mut self, id: TagId, capacity: usize) -> Option<&mut TagStore> {
        let slot = self.stores.get_mut(id.index().checked_sub(1)?)?;
        Some(slot.get_or_insert_with(|| {
            log::trace!("creating store for tag {id}");
            TagStore::with_capacity(capacity)
        }))
    }

    #[inline]
    pub fn get_mut(&mut self, id: TagId) -> Option<&mut TagStore> {
        self.stores.get_mut(id.index().checked_sub(1)?)?.as_mut()
    }

    #[inline]
    pub fn contains(&self, id: TagId, entity: EntityId) -> bool {
        self.get(id)
            .flatten()
            .map(|store| store.contains(entity))
            .unwrap_or(false)
    }

    /// Drops `entity` from every tag store, calling `func` for each tag it had.
    pub fn remove_entity(&mut self, entity: EntityId, mut func: impl FnMut(TagId)) {
        for (n, store) in self.stores.iter_mut().enumerate() {
            let Some(store) = store else {
                continue;
            };
            if store.remove(entity).is_some() {
                func(TagId::new(n as u32 + 1));
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_ids_start_at_one() {
        let mut tags = Tags::new();
        assert_eq!(tags.register(), TagId::new(1));
        assert_eq!(tags.register(), TagId::new(2));
        assert!(!tags.is_registered(TagId::RESERVED));
        assert!(tags.is_registered(TagId::new(2)));
        assert!(!tags.is_registered(TagId::new(3)));
    }

    #[test]
    fn stores_are_lazy() {
        let mut tags = Tags::new();
        let tag = tags.register();
        assert_eq!(tags.get(tag).map(|store| store.is_some()), Some(false));
        assert!(tags.get_mut(tag).is_none());

        tags.get_or_init(tag, 0).unwrap().insert(EntityId::new(1), ()).unwrap();
        assert!(tags.contains(tag, EntityId::new(1)));
        assert!(tags.get_or_init(TagId::new(9), 0).is_none());
    }

    #[test]
    fn remove_entity_reports_each_tag() {
        let mut tags = Tags::new();
        let a = tags.register();
        let b = tags.register();
        let c = tags.register();
        let entity = EntityId::new(4);
        tags.get_or_init(a, 0).unwrap().insert(entity, ()).unwrap();
        tags.get_or_init(c, 0).unwrap().insert(entity, ()).unwrap();
        tags.get_or_init(b, 0).unwrap().insert(EntityId::new(5), ()).unwrap();

        let mut removed = Vec::new();
        tags.remove_entity(entity, |tag| removed.push(tag));
        assert_eq!(removed, vec![a, c]);
        assert!(tags.contains(b, EntityId::new(5)));
    }
}
