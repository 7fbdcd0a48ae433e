//! Deferred structural changes.
//!
//! Callbacks run while the [`World`](crate::world::World) is in the middle of an operation, so
//! they never get to touch it. Instead they record [`Command`]s, which are applied in recording
//! order by [`World::apply_commands`](crate::world::World::apply_commands).

use std::{any::Any, collections::VecDeque, fmt};

use crate::{
    component::{Component, ComponentId, ComponentType},
    entity::Entity,
    tag::TagId,
};

pub enum Command {
    DestroyEntity(Entity),
    AddComponent {
        entity: Entity,
        component: ComponentId,
        /// Must hold the payload type `component` was registered with
        value: Box<dyn Any>,
    },
    RemoveComponent {
        entity: Entity,
        component: ComponentId,
    },
    AddTag {
        entity: Entity,
        tag: TagId,
    },
    RemoveTag {
        entity: Entity,
        tag: TagId,
    },
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DestroyEntity(entity) => f.debug_tuple("DestroyEntity").field(entity).finish(),
            Self::AddComponent { entity, component, .. } => f
                .debug_struct("AddComponent")
                .field("entity", entity)
                .field("component", component)
                .finish_non_exhaustive(),
            Self::RemoveComponent { entity, component } => f
                .debug_struct("RemoveComponent")
                .field("entity", entity)
                .field("component", component)
                .finish(),
            Self::AddTag { entity, tag } => f
                .debug_struct("AddTag")
                .field("entity", entity)
                .field("tag", tag)
                .finish(),
            Self::RemoveTag { entity, tag } => f
                .debug_struct("RemoveTag")
                .field("entity", entity)
                .field("tag", tag)
                .finish(),
        }
    }
}


#[derive(Debug, Default)]
pub struct Commands {
    queue: VecDeque<Command>,
}

impl Commands {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn push(&mut self, command: Command) {
        self.queue.push_back(command)
    }

    #[inline]
    pub fn destroy_entity(&mut self, entity: Entity) {
        self.push(Command::DestroyEntity(entity))
    }

    #[inline]
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: ComponentType<T>, value: T) {
        self.push(Command::AddComponent {
            entity,
            component: component.id(),
            value: Box::new(value),
        })
    }

    #[inline]
    pub fn remove_component(&mut self, entity: Entity, component: impl Into<ComponentId>) {
        self.push(Command::RemoveComponent {
            entity,
            component: component.into(),
        })
    }

    #[inline]
    pub fn add_tag(&mut self, entity: Entity, tag: TagId) {
        self.push(Command::AddTag { entity, tag })
    }

    #[inline]
    pub fn remove_tag(&mut self, entity: Entity, tag: TagId) {
        self.push(Command::RemoveTag { entity, tag })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<Command> {
        self.queue.pop_front()
    }
}
