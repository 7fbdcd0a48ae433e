//! Sparse-set entity/component/tag storage with per-entity lifecycle callbacks and batch-change
//! subscriptions.

pub mod callback;
pub mod command;
pub mod component;
pub mod config;
pub mod diagnostic;
pub mod entity;
pub mod error;
pub mod mask;
pub mod store;
pub mod tag;
pub mod world;


pub mod prelude {
    pub use super::callback::{BatchEvent, ComponentEvent, TagEvent};
    pub use super::command::{Command, Commands};
    pub use super::component::{Changed, Component, ComponentId, ComponentType};
    pub use super::config::WorldConfig;
    pub use super::diagnostic::DiagnosticSink;
    pub use super::entity::Entity;
    pub use super::error::{EcsError, EcsResult, StoreKind};
    pub use super::tag::TagId;
    pub use super::world::World;
    pub use sparse_ecs_macros::Component;
}
