use std::{
    any::Any,
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::{
    callback::{
        Callbacks, ComponentEvent, ComponentEventKind, TagEvent, TagEventKind, BatchEvent,
    },
    command::{Command, Commands},
    component::{Changed, Component, ComponentId, ComponentType, Components},
    config::WorldConfig,
    diagnostic::{DiagnosticSink, Diagnostics},
    entity::{Entities, Entity, EntityId, Release},
    error::{EcsError, EcsResult, StoreKind},
    store::sparse::SparseSet,
    tag::{TagId, Tags},
};

/// Uniquely identifies a [`World`] within the process. Multiple [`World`]s can also be created from
/// different threads, and they'll still have an unique [`WorldId`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct WorldId(usize);

static WORLD_COUNT: AtomicUsize = AtomicUsize::new(0);

impl WorldId {
    pub fn new() -> Self {
        // Relaxed ordering is sufficient, the counter guards nothing but itself
        Self(WORLD_COUNT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}


/// The allocator, every component and tag store, and the event dispatcher, owned as one unit.
///
/// Every operation on an [`Entity`] first validates the handle, then touches the store, then fires
/// the callbacks registered for the entity. Callbacks only get a [`Commands`] queue, which is
/// applied by [`World::apply_commands`].
///
/// ```
/// use sparse_ecs::prelude::*;
///
/// #[derive(Component)]
/// struct Health(u32);
///
/// let mut world = World::new();
/// let health = world.component_register::<Health>();
///
/// let entity = world.entity_create();
/// world.component_add(entity, health, Health(100)).unwrap();
/// world.component_mutate(entity, health, |health| { health.0 -= 10; true }).unwrap();
/// assert_eq!(world.component_get(entity, health).unwrap().map(|health| health.0), Some(90));
///
/// assert!(world.entity_destroy(entity));
/// assert_eq!(world.component_get(entity, health).err(), Some(EcsError::StaleHandle(entity)));
/// ```
#[derive(Debug)]
pub struct World {
    id: WorldId,
    entities: Entities,
    components: Components,
    tags: Tags,
    callbacks: Callbacks,
    commands: Commands,
    diagnostics: Diagnostics,
    store_capacity: usize,
}

impl Default for World {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    #[inline]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        let id = WorldId::new();
        log::trace!("creating {id} with {config:?}");

        Self {
            id,
            entities: Entities::with_capacity(config.entity_capacity),
            components: Components::new(),
            tags: Tags::new(),
            callbacks: Callbacks::new(),
            commands: Commands::new(),
            diagnostics: Diagnostics::new(config.debug),
            store_capacity: config.store_capacity,
        }
    }

    /// This [`World`]s [`WorldId`]
    #[inline]
    pub fn id(&self) -> WorldId {
        self.id
    }

    /// While enabled, diagnostics are forwarded to the sink set by
    /// [`World::set_diagnostic_sink`]. They always go to the `log` facade.
    #[inline]
    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.diagnostics.set_enabled(enabled)
    }

    #[inline]
    pub fn debug_mode(&self) -> bool {
        self.diagnostics.is_enabled()
    }

    pub fn set_diagnostic_sink(&mut self, sink: impl DiagnosticSink + 'static) {
        self.diagnostics.set_sink(Box::new(sink))
    }


    pub fn entity_create(&mut self) -> Entity {
        let entity = self.entities.create();
        log::trace!("created entity {entity}");
        entity
    }

    /// Drops every component and tag of `entity`, firing its removed callbacks, then forgets its
    /// callbacks and releases the id. Destroying a stale handle does nothing and returns `false`.
    pub fn entity_destroy(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            self.diagnostics
                .report("entity_destroy", format_args!("entity {entity} is already destroyed"));
            return false;
        }

        let Self {
            components,
            tags,
            callbacks,
            commands,
            ..
        } = self;

        components.remove_entity(entity.id(), |component, value| {
            let event = ComponentEvent {
                entity,
                component,
                payload: &*value,
            };
            callbacks.fire_component(ComponentEventKind::Removed, &event, commands);
        });
        tags.remove_entity(entity.id(), |tag| {
            callbacks.fire_tag(TagEventKind::Removed, &TagEvent { entity, tag }, commands);
        });
        callbacks.remove_entity(entity);

        match self.entities.destroy(entity) {
            Some(Release::Recycled(version)) => {
                log::trace!("destroyed entity {entity}, id {} is now at version {version}", entity.id());
            }
            Some(Release::Retired) => {
                self.diagnostics.report(
                    "entity_destroy",
                    format_args!("id {} ran out of versions and is retired", entity.id()),
                );
            }
            None => return false,
        }

        true
    }

    #[inline]
    pub fn entity_is_valid(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }


    /// Registers a new component kind storing `T`. Every call issues a fresh id, even for the same
    /// `T`.
    pub fn component_register<T: Component>(&mut self) -> ComponentType<T> {
        let id = self.components.register::<T>();
        log::trace!("registered component `{}` as {id}", T::NAME);
        ComponentType::new(id, self.id)
    }

    /// Fails with [`EcsError::DuplicateAttachment`] if `entity` already has `component`.
    pub fn component_add<T: Component>(
        &mut self,
        entity: Entity,
        component: ComponentType<T>,
        value: T,
    ) -> EcsResult<()> {
        self.check_alive(entity, "component_add")?;
        let id = self.check_component(component, "component_add")?;

        let capacity = self.store_capacity;
        let store = self
            .components
            .get_mut(id)
            .ok_or_else(|| EcsError::unregistered_component(id))?
            .store_or_init(capacity);
        let Some(store) = store.as_any_mut().downcast_mut::<SparseSet<EntityId, T>>() else {
            return Err(EcsError::PayloadMismatch {
                component: id,
                expected: T::NAME,
            });
        };

        if store.insert(entity.id(), value).is_err() {
            return Err(EcsError::DuplicateAttachment {
                entity,
                kind: StoreKind::Component,
                id: id.id(),
            });
        }

        if let Some(payload) = store.get(entity.id()) {
            let event = ComponentEvent {
                entity,
                component: id,
                payload,
            };
            self.callbacks
                .fire_component(ComponentEventKind::Added, &event, &mut self.commands);
        }
        Ok(())
    }

    /// `Ok(None)` if `entity` does not have `component`.
    pub fn component_get<T: Component>(
        &self,
        entity: Entity,
        component: ComponentType<T>,
    ) -> EcsResult<Option<&T>> {
        self.check_alive(entity, "component_get")?;
        let id = self.check_component(component, "component_get")?;

        let Some(info) = self.components.get(id) else {
            return Err(EcsError::unregistered_component(id));
        };
        if info.store().is_none() {
            self.diagnostics.report(
                "component_get",
                format_args!("no store for component `{}` yet", info.name()),
            );
            return Ok(None);
        }

        Ok(info.typed::<T>().and_then(|store| store.get(entity.id())))
    }

    /// Calls `func` with the payload of `entity`. If `func` reports a change, the changed callback
    /// of `entity` fires. Returns what `func` reported.
    pub fn component_mutate<T: Component, R: Changed>(
        &mut self,
        entity: Entity,
        component: ComponentType<T>,
        func: impl FnOnce(&mut T) -> R,
    ) -> EcsResult<bool> {
        self.check_alive(entity, "component_mutate")?;
        let id = self.check_component(component, "component_mutate")?;

        let Some(value) = self
            .components
            .get_mut(id)
            .and_then(|info| info.typed_mut::<T>())
            .and_then(|store| store.get_mut(entity.id()))
        else {
            self.diagnostics.report(
                "component_mutate",
                format_args!("entity {entity} has no `{}`", T::NAME),
            );
            return Err(EcsError::MissingComponent {
                entity,
                component: id,
            });
        };

        let changed = func(&mut *value).changed();
        if changed {
            let event = ComponentEvent {
                entity,
                component: id,
                payload: &*value,
            };
            self.callbacks
                .fire_component(ComponentEventKind::Changed, &event, &mut self.commands);
        }
        Ok(changed)
    }

    /// Returns `false` if `entity` did not have `component`.
    pub fn component_remove<T: Component>(
        &mut self,
        entity: Entity,
        component: ComponentType<T>,
    ) -> EcsResult<bool> {
        self.check_alive(entity, "component_remove")?;
        let id = self.check_component(component, "component_remove")?;

        let Some(value) = self
            .components
            .get_mut(id)
            .and_then(|info| info.typed_mut::<T>())
            .and_then(|store| store.remove(entity.id()))
        else {
            return Ok(false);
        };

        let event = ComponentEvent {
            entity,
            component: id,
            payload: &value,
        };
        self.callbacks
            .fire_component(ComponentEventKind::Removed, &event, &mut self.commands);
        Ok(true)
    }

    /// Never fails: stale handles, unknown ids, ids of other worlds and absent slots are all
    /// `false`.
    #[inline]
    pub fn component_has<T: Component>(&self, entity: Entity, component: ComponentType<T>) -> bool {
        component.world() == self.id
            && self.entities.is_alive(entity)
            && self.components.contains(component.id(), entity.id())
    }

    /// Number of entities holding `component`, 0 for ids of other worlds
    #[inline]
    pub fn component_len<T: Component>(&self, component: ComponentType<T>) -> usize {
        if component.world() != self.id {
            return 0;
        }

        self.components
            .get(component.id())
            .and_then(|info| info.store())
            .map(|store| store.len())
            .unwrap_or(0)
    }

    /// Mutates several components of `entity` at once. `func` gets the payloads in the order of
    /// `components`; if it reports a change, every batch subscriber of exactly this set of
    /// components fires. Per-entity changed callbacks do not fire.
    pub fn component_batch_mutate<R: Changed>(
        &mut self,
        entity: Entity,
        components: &[ComponentId],
        func: impl FnOnce(&mut [&mut dyn Any]) -> R,
    ) -> EcsResult<bool> {
        self.check_alive(entity, "component_batch_mutate")?;
        let mask = self.components.mask_of(components)?;

        if let Some(missing) = components
            .iter()
            .find(|id| !self.components.contains(**id, entity.id()))
        {
            return Err(EcsError::MissingComponent {
                entity,
                component: *missing,
            });
        }

        let changed = match self.components.get_many_mut(components, entity.id()) {
            Some(mut payloads) => func(&mut payloads[..]).changed(),
            None => false,
        };
        if !changed {
            return Ok(false);
        }

        let store = &self.components;
        let fired = self.callbacks.fire_batch(
            &mask,
            entity,
            |id| store.get_any(id, entity.id()),
            &mut self.commands,
        );
        log::trace!("batch change on {entity} reached {fired} subscribers");
        Ok(true)
    }


    pub fn tag_register(&mut self) -> TagId {
        let id = self.tags.register();
        log::trace!("registered tag {id}");
        id
    }

    /// Fails with [`EcsError::DuplicateAttachment`] if `entity` already has `tag`.
    pub fn tag_add(&mut self, entity: Entity, tag: TagId) -> EcsResult<bool> {
        self.check_alive(entity, "tag_add")?;

        let capacity = self.store_capacity;
        let Some(store) = self.tags.get_or_init(tag, capacity) else {
            return Err(self.unregistered_tag(tag, "tag_add"));
        };
        if store.insert(entity.id(), ()).is_err() {
            return Err(EcsError::DuplicateAttachment {
                entity,
                kind: StoreKind::Tag,
                id: tag.id(),
            });
        }

        self.callbacks
            .fire_tag(TagEventKind::Added, &TagEvent { entity, tag }, &mut self.commands);
        Ok(true)
    }

    /// Never fails: stale handles, unknown ids and absent slots are all `false`.
    #[inline]
    pub fn tag_has(&self, entity: Entity, tag: TagId) -> bool {
        self.entities.is_alive(entity) && self.tags.contains(tag, entity.id())
    }

    /// Returns `false` if `entity` did not have `tag`.
    pub fn tag_remove(&mut self, entity: Entity, tag: TagId) -> EcsResult<bool> {
        self.check_alive(entity, "tag_remove")?;
        if !self.tags.is_registered(tag) {
            return Err(self.unregistered_tag(tag, "tag_remove"));
        }

        let removed = self
            .tags
            .get_mut(tag)
            .and_then(|store| store.remove(entity.id()))
            .is_some();
        if removed {
            self.callbacks
                .fire_tag(TagEventKind::Removed, &TagEvent { entity, tag }, &mut self.commands);
        }
        Ok(removed)
    }

    /// Number of entities holding `tag`
    #[inline]
    pub fn tag_len(&self, tag: TagId) -> usize {
        self.tags.get(tag).flatten().map(SparseSet::len).unwrap_or(0)
    }


    /// Replaces the component added callback of `entity`.
    pub fn on_component_added(
        &mut self,
        entity: Entity,
        callback: impl FnMut(&ComponentEvent<'_>, &mut Commands) + 'static,
    ) -> EcsResult<()> {
        self.check_alive(entity, "on_component_added")?;
        self.callbacks
            .set_component(entity, ComponentEventKind::Added, Box::new(callback));
        Ok(())
    }

    /// Replaces the component removed callback of `entity`.
    pub fn on_component_removed(
        &mut self,
        entity: Entity,
        callback: impl FnMut(&ComponentEvent<'_>, &mut Commands) + 'static,
    ) -> EcsResult<()> {
        self.check_alive(entity, "on_component_removed")?;
        self.callbacks
            .set_component(entity, ComponentEventKind::Removed, Box::new(callback));
        Ok(())
    }

    /// Replaces the component changed callback of `entity`.
    pub fn on_component_changed(
        &mut self,
        entity: Entity,
        callback: impl FnMut(&ComponentEvent<'_>, &mut Commands) + 'static,
    ) -> EcsResult<()> {
        self.check_alive(entity, "on_component_changed")?;
        self.callbacks
            .set_component(entity, ComponentEventKind::Changed, Box::new(callback));
        Ok(())
    }

    pub fn on_tag_added(
        &mut self,
        entity: Entity,
        callback: impl FnMut(&TagEvent, &mut Commands) + 'static,
    ) -> EcsResult<()> {
        self.check_alive(entity, "on_tag_added")?;
        self.callbacks
            .set_tag(entity, TagEventKind::Added, Box::new(callback));
        Ok(())
    }

    pub fn on_tag_removed(
        &mut self,
        entity: Entity,
        callback: impl FnMut(&TagEvent, &mut Commands) + 'static,
    ) -> EcsResult<()> {
        self.check_alive(entity, "on_tag_removed")?;
        self.callbacks
            .set_tag(entity, TagEventKind::Removed, Box::new(callback));
        Ok(())
    }

    /// Subscribes to batch changes of exactly `components`, on any entity. The payloads handed to
    /// `callback` follow the order of `components`.
    pub fn on_batch_change(
        &mut self,
        components: &[ComponentId],
        callback: impl FnMut(&BatchEvent<'_>, &mut Commands) + 'static,
    ) -> EcsResult<()> {
        let mask = self.components.mask_of(components)?;
        self.callbacks
            .subscribe_batch(mask, components, Box::new(callback));
        Ok(())
    }


    /// Applies the commands recorded by callbacks, in recording order, including the ones recorded
    /// while applying. Stops at the first failing command and returns its error; the commands after
    /// it stay queued. Returns the number of applied commands.
    pub fn apply_commands(&mut self) -> EcsResult<usize> {
        let mut applied = 0;
        while let Some(command) = self.commands.pop() {
            log::trace!("applying {command:?}");
            self.apply_command(command)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Number of commands waiting for [`World::apply_commands`]
    #[inline]
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    fn apply_command(&mut self, command: Command) -> EcsResult<()> {
        match command {
            Command::DestroyEntity(entity) => {
                self.entity_destroy(entity);
                Ok(())
            }
            Command::AddComponent {
                entity,
                component,
                value,
            } => self.component_add_boxed(entity, component, value),
            Command::RemoveComponent { entity, component } => {
                self.component_remove_erased(entity, component).map(drop)
            }
            Command::AddTag { entity, tag } => self.tag_add(entity, tag).map(drop),
            Command::RemoveTag { entity, tag } => self.tag_remove(entity, tag).map(drop),
        }
    }

    fn component_add_boxed(
        &mut self,
        entity: Entity,
        component: ComponentId,
        value: Box<dyn Any>,
    ) -> EcsResult<()> {
        self.check_alive(entity, "component_add")?;

        let capacity = self.store_capacity;
        let Some(info) = self.components.get_mut(component) else {
            return Err(EcsError::unregistered_component(component));
        };
        let expected = info.name();

        if info.store().map(|store| store.contains(entity.id())).unwrap_or(false) {
            return Err(EcsError::DuplicateAttachment {
                entity,
                kind: StoreKind::Component,
                id: component.id(),
            });
        }
        // Checked before the store exists, so a rejected payload leaves nothing behind
        if !info.accepts(&*value) {
            return Err(EcsError::PayloadMismatch {
                component,
                expected,
            });
        }

        let store = info.store_or_init(capacity);
        if store.insert_boxed(entity.id(), value).is_err() {
            return Err(EcsError::PayloadMismatch {
                component,
                expected,
            });
        }

        if let Some(payload) = store.get_any(entity.id()) {
            let event = ComponentEvent {
                entity,
                component,
                payload,
            };
            self.callbacks
                .fire_component(ComponentEventKind::Added, &event, &mut self.commands);
        }
        Ok(())
    }

    fn component_remove_erased(&mut self, entity: Entity, component: ComponentId) -> EcsResult<bool> {
        self.check_alive(entity, "component_remove")?;

        let Some(info) = self.components.get_mut(component) else {
            return Err(EcsError::unregistered_component(component));
        };
        let Some(value) = info
            .store_mut()
            .and_then(|store| store.remove_boxed(entity.id()))
        else {
            return Ok(false);
        };

        let event = ComponentEvent {
            entity,
            component,
            payload: &*value,
        };
        self.callbacks
            .fire_component(ComponentEventKind::Removed, &event, &mut self.commands);
        Ok(true)
    }


    fn check_alive(&self, entity: Entity, context: &str) -> EcsResult<()> {
        if self.entities.is_alive(entity) {
            return Ok(());
        }

        self.diagnostics
            .report(context, format_args!("entity {entity} is stale"));
        Err(EcsError::StaleHandle(entity))
    }

    /// Rejects ids of other worlds as unregistered.
    fn check_component<T: Component>(&self, component: ComponentType<T>, context: &str) -> EcsResult<ComponentId> {
        let id = component.id();
        if component.world() == self.id && self.components.is_registered(id) {
            return Ok(id);
        }

        self.diagnostics.report(
            context,
            format_args!("component `{}` ({id}) is not registered in {}", T::NAME, self.id),
        );
        Err(EcsError::unregistered_component(id))
    }

    fn unregistered_tag(&self, tag: TagId, context: &str) -> EcsError {
        self.diagnostics
            .report(context, format_args!("tag {tag} is not registered"));
        EcsError::UnregisteredType {
            kind: StoreKind::Tag,
            id: tag.id(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use std::{cell::RefCell, rc::Rc};

    use crate::entity::Version;

    struct Health(u32);
    impl Component for Health {
        const NAME: &'static str = "Health";
    }

    struct Armor(u8);
    impl Component for Armor {
        const NAME: &'static str = "Armor";
    }

    #[test]
    fn exhausted_version_retires_id() {
        let mut world = World::with_config(WorldConfig::default().debug(true));
        let reports = Rc::new(RefCell::new(Vec::new()));
        {
            let reports = reports.clone();
            world.set_diagnostic_sink(move |context: &str, message: &str| {
                reports.borrow_mut().push((context.to_owned(), message.to_owned()))
            });
        }

        let entity = world.entity_create();
        world.entities.set_version(entity.id(), Version::new(u32::MAX - 1));
        let entity = Entity::new(entity.id().id(), u32::MAX - 1);
        assert!(world.entity_is_valid(entity));

        assert!(world.entity_destroy(entity));
        assert!(!world.entity_is_valid(entity));
        assert_eq!(world.entity_count(), 0);
        assert_eq!(reports.borrow().len(), 1);
        assert_eq!(reports.borrow()[0].0, "entity_destroy");
        assert!(reports.borrow()[0].1.contains("retired"));

        for _ in 0..8 {
            let fresh = world.entity_create();
            assert_ne!(fresh.id(), entity.id());
            assert!(world.entity_destroy(fresh));
        }
    }

    #[test]
    fn rejected_boxed_payload_leaves_no_store() {
        let mut world = World::new();
        let health = world.component_register::<Health>();
        let entity = world.entity_create();

        world.commands.push(Command::AddComponent {
            entity,
            component: health.id(),
            value: Box::new(Armor(3)),
        });
        assert_eq!(
            world.apply_commands(),
            Err(EcsError::PayloadMismatch {
                component: health.id(),
                expected: "Health",
            })
        );
        assert!(world.components.get(health.id()).unwrap().store().is_none());

        world.commands.add_component(entity, health, Health(5));
        assert_eq!(world.apply_commands(), Ok(1));
        assert_eq!(world.component_get(entity, health).unwrap().map(|health| health.0), Some(5));
    }
}
