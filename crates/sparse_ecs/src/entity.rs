use std::fmt;

use sparse_ecs_macros::identifier;

identifier!(EntityId, u32);
identifier!(Version, u32);

impl Version {
    /// The last value a [`Version`] can take. An id whose version reaches it is retired.
    pub const LAST: Self = Self::INVALID;

    #[inline]
    pub fn inc(&mut self) {
        self.0 = self.0.saturating_add(1)
    }
}

/// Handle of one entity instance. The [`EntityId`] gets recycled after the entity is destroyed,
/// the [`Version`] tells the instances apart.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Entity(EntityId, Version);

impl Entity {
    pub const INVALID: Self = Self(EntityId::INVALID, Version::INVALID);

    #[inline]
    pub const fn new(id: u32, version: u32) -> Self {
        Self(EntityId::new(id), Version::new(version))
    }

    #[inline]
    pub const fn id(self) -> EntityId {
        self.0
    }

    #[inline]
    pub const fn version(self) -> Version {
        self.1
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.0, self.1)
    }
}


/// Bookkeeping of a single [`EntityId`]. Every time an [`Entity`] gets destroyed, the version gets
/// incremented, which invalidates every [`Entity`] handed out for the old version.
#[derive(Clone, Debug)]
pub struct EntityMeta {
    pub version: Version,
    pub alive: bool,
    /// On dead entities, points to the next dead entity
    next_free: usize,
}

impl EntityMeta {
    #[inline]
    pub const fn new() -> Self {
        Self {
            version: Version::new(0),
            alive: true,
            next_free: 0,
        }
    }
}

/// What happened to the [`EntityId`] of a destroyed [`Entity`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Release {
    /// The id went back to the free pool with a bumped version
    Recycled(Version),
    /// The version ran out, the id will never be handed out again
    Retired,
}

/// Allocates [`Entity`] handles and checks if they are still alive. [`Entity::id()`] directly
/// maps to an [`EntityMeta`], whose version has to match [`Entity::version()`].
///
/// # Links
///
/// [ECS back and forth - Part 3](https://skypjack.github.io/2019-05-06-ecs-baf-part-3)
#[derive(Clone, Debug, Default)]
pub struct Entities {
    meta: Vec<EntityMeta>,
    /// `free_next` is pointing to the next dead [`Entity`] that can get revived, and `free_count`
    /// stores how many of them there are. The `next_free` of dead [`EntityMeta`]s chain the rest,
    /// so recycling never needs a second allocation.
    free_count: usize,
    free_next: usize,
    alive_count: usize,
}

impl Entities {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            meta: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Revives the most recently freed id, or appends a new one with version 0.
    pub fn create(&mut self) -> Entity {
        self.alive_count += 1;

        if self.free_count == 0 {
            let index = self.meta.len();
            self.meta.push(EntityMeta::new());
            return Entity::new(index as u32, 0);
        }

        let index = self.free_next;
        let free = &mut self.meta[index];
        debug_assert!(!free.alive);

        self.free_next = free.next_free;
        self.free_count -= 1;
        free.alive = true;

        Entity::new(index as u32, free.version.id())
    }

    /// Returns [`None`] if the [`Entity`] was already destroyed or revived.
    pub fn destroy(&mut self, entity: Entity) -> Option<Release> {
        let index = entity.id().index();
        let meta = self.meta.get_mut(index)?;

        if !meta.alive || meta.version != entity.version() {
            return None;
        }

        meta.alive = false;
        meta.version.inc();
        self.alive_count -= 1;

        if meta.version == Version::LAST {
            return Some(Release::Retired);
        }

        meta.next_free = self.free_next;
        self.free_next = index;
        self.free_count += 1;

        Some(Release::Recycled(meta.version))
    }

    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.meta
            .get(entity.id().index())
            .map(|meta| meta.alive && meta.version == entity.version())
            .unwrap_or(false)
    }

    /// Number of live entities
    #[inline]
    pub fn len(&self) -> usize {
        self.alive_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how many ids are waiting to be recycled
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    /// Forces the version of a dead id, so that wraparound can be tested without billions of
    /// destroy calls.
    #[cfg(test)]
    pub(crate) fn set_version(&mut self, id: EntityId, version: Version) {
        if let Some(meta) = self.meta.get_mut(id.index()) {
            meta.version = version;
        }
    }
}
