use std::{any::{Any, TypeId}, fmt, hash::{Hash, Hasher}, marker::PhantomData};

use sparse_ecs_macros::identifier;

use crate::{
    entity::EntityId,
    error::{EcsError, EcsResult},
    mask::ComponentMask,
    store::{sparse::SparseSet, ComponentStore},
    world::WorldId,
};

/// A [`Component`] is nothing more but data, which can be stored in a given
/// [`World`](crate::world::World) on an [`Entity`](crate::entity::Entity). [`Component`] can
/// be derived via `#[derive(Component)]`.
pub trait Component: 'static {
    /// Used in diagnostics and error messages
    const NAME: &'static str;
}


identifier!(ComponentId, u32);

impl ComponentId {
    /// Never handed out by [`World::component_register`](crate::world::World::component_register)
    pub const RESERVED: Self = Self::new(0);
}


/// Typed handle of a registered component kind, returned by
/// [`World::component_register`](crate::world::World::component_register). Remembers the
/// [`World`](crate::world::World) it belongs to, so it cannot be mixed up with a same-numbered
/// component of another world.
pub struct ComponentType<T> {
    id: ComponentId,
    world: WorldId,
    marker: PhantomData<fn() -> T>,
}

impl<T> ComponentType<T> {
    #[inline]
    pub(crate) const fn new(id: ComponentId, world: WorldId) -> Self {
        Self {
            id,
            world,
            marker: PhantomData,
        }
    }

    #[inline]
    pub const fn id(self) -> ComponentId {
        self.id
    }

    #[inline]
    pub const fn world(self) -> WorldId {
        self.world
    }
}

impl<T> Clone for ComponentType<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentType<T> {}

impl<T> PartialEq for ComponentType<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.world == other.world
    }
}

impl<T> Eq for ComponentType<T> {}

impl<T> Hash for ComponentType<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.world.hash(state);
    }
}

impl<T> fmt::Debug for ComponentType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("id", &self.id)
            .field("world", &self.world)
            .finish()
    }
}

impl<T> From<ComponentType<T>> for ComponentId {
    #[inline]
    fn from(value: ComponentType<T>) -> Self {
        value.id
    }
}


/// Decides if a [`World::component_mutate`](crate::world::World::component_mutate) callback
/// changed the payload. Returning nothing counts as "unchanged".
pub trait Changed {
    fn changed(self) -> bool;
}

impl Changed for bool {
    #[inline]
    fn changed(self) -> bool {
        self
    }
}

impl Changed for () {
    #[inline]
    fn changed(self) -> bool {
        false
    }
}


/// Registry entry of one component kind. The store is only created once the first payload gets
/// attached.
pub struct ComponentInfo {
    name: &'static str,
    type_id: TypeId,
    new_store: fn(usize) -> Box<dyn ComponentStore>,
    store: Option<Box<dyn ComponentStore>>,
}

impl ComponentInfo {
    #[inline]
    pub fn new_from<T: Component>() -> Self {
        fn new_store<T: Component>(capacity: usize) -> Box<dyn ComponentStore> {
            Box::new(SparseSet::<EntityId, T>::with_capacity(capacity))
        }

        Self {
            name: T::NAME,
            type_id: TypeId::of::<T>(),
            new_store: new_store::<T>,
            store: None,
        }
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether `value` is of the payload type this component was registered with
    #[inline]
    pub fn accepts(&self, value: &dyn Any) -> bool {
        Any::type_id(value) == self.type_id
    }

    #[inline]
    pub fn store(&self) -> Option<&dyn ComponentStore> {
        self.store.as_deref()
    }

    #[inline]
    pub fn store_mut(&mut self) -> Option<&mut (dyn ComponentStore + 'static)> {
        self.store.as_deref_mut()
    }

    /// Returns the store, creating it with `capacity` reserved slots on first use.
    pub fn store_or_init(&mut self, capacity: usize) -> &mut (dyn ComponentStore + 'static) {
        let new_store = self.new_store;
        let name = self.name;

        &mut **self.store.get_or_insert_with(|| {
            log::trace!("creating store for component `{name}`");
            new_store(capacity)
        })
    }

    #[inline]
    pub fn typed<T: Component>(&self) -> Option<&SparseSet<EntityId, T>> {
        self.store()?.as_any().downcast_ref()
    }

    #[inline]
    pub fn typed_mut<T: Component>(&mut self) -> Option<&mut SparseSet<EntityId, T>> {
        self.store_mut()?.as_any_mut().downcast_mut()
    }
}

impl fmt::Debug for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInfo")
            .field("name", &self.name)
            .field("len", &self.store().map(|store| store.len()))
            .finish()
    }
}


/// Every registered component kind, indexed by [`ComponentId`]. Id 0 is reserved, so the entry
/// of id `n` lives at `infos[n - 1]`.
#[derive(Debug, Default)]
pub struct Components {
    infos: Vec<ComponentInfo>,
}

impl Components {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    pub fn register<T: Component>(&mut self) -> ComponentId {
        self.infos.push(ComponentInfo::new_from::<T>());
        ComponentId::new(self.infos.len() as u32)
    }

    #[inline]
    pub fn get(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(id.index().checked_sub(1)?)
    }

    #[inline]
    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut ComponentInfo> {
        self.infos.get_mut(id.index().checked_sub(1)?)
    }

    #[inline]
    pub fn is_registered(&self, id: ComponentId) -> bool {
        self.get(id).is_some()
    }

    #[inline]
    pub fn contains(&self, id: ComponentId, entity: EntityId) -> bool {
        self.get(id)
            .and_then(|info| info.store())
            .map(|store| store.contains(entity))
            .unwrap_or(false)
    }

    #[inline]
    pub fn get_any(&self, id: ComponentId, entity: EntityId) -> Option<&dyn Any> {
        self.get(id)?.store()?.get_any(entity)
    }

    /// Builds the mask of `ids`, rejecting unregistered and repeated ids.
    pub fn mask_of(&self, ids: &[ComponentId]) -> EcsResult<ComponentMask> {
        let mut mask = ComponentMask::new();
        for id in ids {
            if !self.is_registered(*id) {
                return Err(EcsError::unregistered_component(*id));
            }
            if !mask.insert(*id) {
                return Err(EcsError::DuplicateBatchType(*id));
            }
        }
        Ok(mask)
    }

    /// Borrows the payloads of `entity` for every id in `ids`, in the order of `ids`. Returns
    /// [`None`] if any of them is missing. `ids` must not repeat.
    pub fn get_many_mut(&mut self, ids: &[ComponentId], entity: EntityId) -> Option<Vec<&mut dyn Any>> {
        let mut slots: Vec<Option<&mut dyn Any>> = ids.iter().map(|_| None).collect();

        for (n, info) in self.infos.iter_mut().enumerate() {
            let id = ComponentId::new(n as u32 + 1);
            let Some(position) = ids.iter().position(|selected| *selected == id) else {
                continue;
            };
            slots[position] = info.store_mut().and_then(|store| store.get_any_mut(entity));
        }

        slots.into_iter().collect()
    }

    /// Drops the slot of `entity` in every store, handing each removed payload to `func`.
    pub fn remove_entity(&mut self, entity: EntityId, mut func: impl FnMut(ComponentId, Box<dyn Any>)) {
        for (n, info) in self.infos.iter_mut().enumerate() {
            let Some(store) = info.store_mut() else {
                continue;
            };
            if let Some(value) = store.remove_boxed(entity) {
                func(ComponentId::new(n as u32 + 1), value);
            }
        }
    }
}
