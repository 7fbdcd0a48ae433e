pub mod sparse;

use std::any::Any;

use crate::{component::Component, entity::EntityId};
use sparse::SparseSet;

/// Storage of a single tag: membership only.
pub type TagStore = SparseSet<EntityId, ()>;

/// Type erased interface over a [`SparseSet`] of component payloads, so that the
/// [`World`](crate::world::World) can hold stores of every registered type side by side, and
/// drop an entity's slot without knowing the payload type.
pub trait ComponentStore: 'static {
    fn len(&self) -> usize;

    fn contains(&self, entity: EntityId) -> bool;

    fn get_any(&self, entity: EntityId) -> Option<&dyn Any>;

    fn get_any_mut(&mut self, entity: EntityId) -> Option<&mut dyn Any>;

    /// Inserts a boxed payload. Hands the box back if it does not hold this store's payload type
    /// or if `entity` already owns a slot.
    fn insert_boxed(&mut self, entity: EntityId, value: Box<dyn Any>) -> Result<(), Box<dyn Any>>;

    fn remove_boxed(&mut self, entity: EntityId) -> Option<Box<dyn Any>>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ComponentStore for SparseSet<EntityId, T> {
    #[inline]
    fn len(&self) -> usize {
        SparseSet::len(self)
    }

    #[inline]
    fn contains(&self, entity: EntityId) -> bool {
        SparseSet::contains(self, entity)
    }

    #[inline]
    fn get_any(&self, entity: EntityId) -> Option<&dyn Any> {
        self.get(entity).map(|value| value as &dyn Any)
    }

    #[inline]
    fn get_any_mut(&mut self, entity: EntityId) -> Option<&mut dyn Any> {
        self.get_mut(entity).map(|value| value as &mut dyn Any)
    }

    fn insert_boxed(&mut self, entity: EntityId, value: Box<dyn Any>) -> Result<(), Box<dyn Any>> {
        let value = value.downcast::<T>()?;
        self.insert(entity, *value)
            .map_err(|value| Box::new(value) as Box<dyn Any>)
    }

    fn remove_boxed(&mut self, entity: EntityId) -> Option<Box<dyn Any>> {
        self.remove(entity).map(|value| Box::new(value) as Box<dyn Any>)
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
