use std::{any::Any, collections::HashMap, fmt};

use fxhash::FxBuildHasher;

use crate::{
    command::Commands,
    component::{Component, ComponentId},
    entity::Entity,
    mask::ComponentMask,
    tag::TagId,
};

/// Passed to component lifecycle callbacks.
pub struct ComponentEvent<'a> {
    pub entity: Entity,
    pub component: ComponentId,
    /// Added: the inserted payload. Changed: the current payload. Removed: the payload that was
    /// just taken out of the store.
    pub payload: &'a dyn Any,
}

impl<'a> ComponentEvent<'a> {
    #[inline]
    pub fn payload<T: Component>(&self) -> Option<&'a T> {
        self.payload.downcast_ref()
    }
}

/// Passed to tag lifecycle callbacks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TagEvent {
    pub entity: Entity,
    pub tag: TagId,
}

/// Passed to batch-change subscribers. `payloads[n]` belongs to `components[n]`, in the order the
/// subscriber listed them.
pub struct BatchEvent<'a> {
    pub entity: Entity,
    pub components: &'a [ComponentId],
    pub payloads: &'a [&'a dyn Any],
}

impl<'a> BatchEvent<'a> {
    #[inline]
    pub fn get<T: Component>(&self, position: usize) -> Option<&'a T> {
        self.payloads.get(position)?.downcast_ref()
    }
}

pub type ComponentCallback = Box<dyn FnMut(&ComponentEvent<'_>, &mut Commands)>;
pub type TagCallback = Box<dyn FnMut(&TagEvent, &mut Commands)>;
pub type BatchCallback = Box<dyn FnMut(&BatchEvent<'_>, &mut Commands)>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ComponentEventKind {
    Added,
    Removed,
    Changed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TagEventKind {
    Added,
    Removed,
}

/// One slot per event kind. Registering again replaces the previous callback.
#[derive(Default)]
struct EntityCallbacks {
    component_added: Option<ComponentCallback>,
    component_removed: Option<ComponentCallback>,
    component_changed: Option<ComponentCallback>,
    tag_added: Option<TagCallback>,
    tag_removed: Option<TagCallback>,
}

impl EntityCallbacks {
    #[inline]
    fn component(&mut self, kind: ComponentEventKind) -> &mut Option<ComponentCallback> {
        match kind {
            ComponentEventKind::Added => &mut self.component_added,
            ComponentEventKind::Removed => &mut self.component_removed,
            ComponentEventKind::Changed => &mut self.component_changed,
        }
    }

    #[inline]
    fn tag(&mut self, kind: TagEventKind) -> &mut Option<TagCallback> {
        match kind {
            TagEventKind::Added => &mut self.tag_added,
            TagEventKind::Removed => &mut self.tag_removed,
        }
    }
}

struct BatchSubscriber {
    components: Box<[ComponentId]>,
    callback: BatchCallback,
}

/// Routes lifecycle events to the callback registered for the entity, and batch changes to every
/// subscriber of the exact same component set.
#[derive(Default)]
pub struct Callbacks {
    entities: HashMap<Entity, EntityCallbacks, FxBuildHasher>,
    batches: HashMap<ComponentMask, Vec<BatchSubscriber>, FxBuildHasher>,
}

impl Callbacks {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_component(&mut self, entity: Entity, kind: ComponentEventKind, callback: ComponentCallback) {
        *self.entities.entry(entity).or_default().component(kind) = Some(callback);
    }

    pub fn set_tag(&mut self, entity: Entity, kind: TagEventKind, callback: TagCallback) {
        *self.entities.entry(entity).or_default().tag(kind) = Some(callback);
    }

    /// `components` must be the ids `mask` was built from.
    pub fn subscribe_batch(&mut self, mask: ComponentMask, components: &[ComponentId], callback: BatchCallback) {
        self.batches.entry(mask).or_default().push(BatchSubscriber {
            components: components.into(),
            callback,
        });
    }

    /// Forgets every callback registered for `entity`.
    #[inline]
    pub fn remove_entity(&mut self, entity: Entity) {
        self.entities.remove(&entity);
    }

    pub fn fire_component(&mut self, kind: ComponentEventKind, event: &ComponentEvent<'_>, commands: &mut Commands) {
        let Some(callback) = self
            .entities
            .get_mut(&event.entity)
            .and_then(|callbacks| callbacks.component(kind).as_mut())
        else {
            return;
        };
        callback(event, commands)
    }

    pub fn fire_tag(&mut self, kind: TagEventKind, event: &TagEvent, commands: &mut Commands) {
        let Some(callback) = self
            .entities
            .get_mut(&event.entity)
            .and_then(|callbacks| callbacks.tag(kind).as_mut())
        else {
            return;
        };
        callback(event, commands)
    }

    /// Invokes every subscriber of exactly `mask`. `lookup` resolves the current payload of each
    /// component id. Returns the number of subscribers invoked.
    pub fn fire_batch<'a>(
        &mut self,
        mask: &ComponentMask,
        entity: Entity,
        lookup: impl Fn(ComponentId) -> Option<&'a dyn Any>,
        commands: &mut Commands,
    ) -> usize {
        let Some(subscribers) = self.batches.get_mut(mask) else {
            return 0;
        };

        let mut fired = 0;
        for subscriber in subscribers {
            let Some(payloads) = subscriber
                .components
                .iter()
                .map(|id| lookup(*id))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };

            let event = BatchEvent {
                entity,
                components: &subscriber.components,
                payloads: &payloads,
            };
            (subscriber.callback)(&event, commands);
            fired += 1;
        }
        fired
    }

    #[inline]
    pub fn has_entity(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    #[inline]
    pub fn batch_subscribers(&self, mask: &ComponentMask) -> usize {
        self.batches.get(mask).map(Vec::len).unwrap_or(0)
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("entities", &self.entities.len())
            .field("batches", &self.batches.len())
            .finish()
    }
}
