use std::fmt;

use thiserror::Error;

use crate::{component::ComponentId, entity::Entity};

pub type EcsResult<T> = Result<T, EcsError>;

/// Which kind of store an id refers to. Component and tag ids are counted separately, so the
/// same number can name one of each.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StoreKind {
    Component,
    Tag,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component => f.write_str("component"),
            Self::Tag => f.write_str("tag"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EcsError {
    #[error("entity {0} was destroyed")]
    StaleHandle(Entity),

    #[error("entity {entity} already has {kind} {id}")]
    DuplicateAttachment {
        entity: Entity,
        kind: StoreKind,
        id: u32,
    },

    #[error("{kind} {id} was never registered")]
    UnregisteredType { kind: StoreKind, id: u32 },

    #[error("entity {entity} has no component {component}")]
    MissingComponent {
        entity: Entity,
        component: ComponentId,
    },

    #[error("component {0} was selected more than once")]
    DuplicateBatchType(ComponentId),

    #[error("payload for component {component} is not a {expected}")]
    PayloadMismatch {
        component: ComponentId,
        expected: &'static str,
    },
}

impl EcsError {
    #[inline]
    pub(crate) fn unregistered_component(id: ComponentId) -> Self {
        Self::UnregisteredType {
            kind: StoreKind::Component,
            id: id.id(),
        }
    }
}
