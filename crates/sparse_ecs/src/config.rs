/// Construction parameters of a [`World`](crate::world::World).
///
/// ```
/// use sparse_ecs::prelude::*;
///
/// let world = World::with_config(WorldConfig::default().entity_capacity(1024).debug(true));
/// assert!(world.debug_mode());
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WorldConfig {
    /// Entity slots reserved up front
    pub entity_capacity: usize,
    /// Dense slots reserved by every store when it gets created
    pub store_capacity: usize,
    /// Initial debug mode, see [`World::set_debug_mode`](crate::world::World::set_debug_mode)
    pub debug: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 0,
            store_capacity: 0,
            debug: false,
        }
    }
}

impl WorldConfig {
    #[inline]
    pub const fn entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    #[inline]
    pub const fn store_capacity(mut self, capacity: usize) -> Self {
        self.store_capacity = capacity;
        self
    }

    #[inline]
    pub const fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }
}
