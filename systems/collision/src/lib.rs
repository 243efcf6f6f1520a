#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Categorised overlap detection for the garden simulation.
//!
//! Entities compose a [`Collidable`] that registers their named hit volumes
//! with the [`CollisionManager`] under one [`Category`]. Once per frame the
//! manager runs three fixed rule passes and reports every overlap as a
//! [`CollisionNotice`]. Detection never mutates entities: the caller applies
//! the notices afterwards, so an entity that disposes itself while being
//! notified cannot invalidate a scan in progress. Deregistration leaves a
//! tombstone in the bucket that is swept at the start of the next tick.

use std::collections::HashMap;

use garden_defence_core::{Category, EntityKey, GeometryQuery};
use log::trace;

mod volumes;

pub use volumes::{HitVolumes, DEFAULT_VOLUME, WEAPON_VOLUME};

/// One side of an overlap, addressed to the entity that should react.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CollisionNotice {
    /// Entity being notified.
    pub recipient: EntityKey,
    /// Entity it collided with.
    pub other: EntityKey,
    /// Category the other entity is registered under.
    pub other_category: Category,
}

/// Collision capability composed into entities that take part in hit testing.
///
/// The capability registers on construction and deregisters at most once, so
/// repeated disposal of the owning entity never touches the manager twice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collidable {
    owner: EntityKey,
    category: Category,
    volumes: HitVolumes,
    registered: bool,
}

impl Collidable {
    /// Creates the capability and registers it with `manager`.
    pub fn register(
        owner: EntityKey,
        category: Category,
        volumes: HitVolumes,
        manager: &mut CollisionManager,
    ) -> Self {
        let collidable = Self {
            owner,
            category,
            volumes,
            registered: true,
        };
        manager.register(category, &collidable);
        collidable
    }

    /// Removes the capability from `manager`. Returns `false` when already removed.
    pub fn deregister(&mut self, manager: &mut CollisionManager) -> bool {
        if !self.registered {
            return false;
        }
        self.registered = false;
        manager.deregister(self.category, self.owner)
    }

    /// Entity owning the capability.
    #[must_use]
    pub const fn owner(&self) -> EntityKey {
        self.owner
    }

    /// Category fixed at construction.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Named hit volumes.
    #[must_use]
    pub const fn volumes(&self) -> &HitVolumes {
        &self.volumes
    }

    /// Whether the capability is still registered.
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.registered
    }
}

#[derive(Clone, Debug)]
struct Entry {
    owner: EntityKey,
    volumes: HitVolumes,
}

#[derive(Debug, Default)]
struct Bucket {
    slots: Vec<Option<Entry>>,
    index: HashMap<EntityKey, usize>,
    vacated: usize,
}

impl Bucket {
    fn insert(&mut self, owner: EntityKey, volumes: HitVolumes) {
        if let Some(&slot) = self.index.get(&owner) {
            self.slots[slot] = Some(Entry { owner, volumes });
            return;
        }
        let _ = self.index.insert(owner, self.slots.len());
        self.slots.push(Some(Entry { owner, volumes }));
    }

    fn remove(&mut self, owner: EntityKey) -> bool {
        let Some(slot) = self.index.remove(&owner) else {
            return false;
        };
        self.slots[slot] = None;
        self.vacated += 1;
        true
    }

    fn compact(&mut self) {
        if self.vacated == 0 {
            return;
        }
        self.slots.retain(Option::is_some);
        self.index.clear();
        for (position, entry) in self.slots.iter().flatten().enumerate() {
            let _ = self.index.insert(entry.owner, position);
        }
        self.vacated = 0;
    }

    fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.slots.iter().flatten()
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

/// Owns the per-category buckets and runs the overlap passes.
#[derive(Debug, Default)]
pub struct CollisionManager {
    buckets: [Bucket; 5],
}

impl CollisionManager {
    /// Creates a manager with empty buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `collidable` to the bucket for `category`, refreshing its volumes if present.
    pub fn register(&mut self, category: Category, collidable: &Collidable) {
        trace!("register {:?} as {category:?}", collidable.owner);
        self.bucket_mut(category)
            .insert(collidable.owner, collidable.volumes.clone());
    }

    /// Removes `owner` from the bucket for `category`. Absent owners are a no-op.
    pub fn deregister(&mut self, category: Category, owner: EntityKey) -> bool {
        let removed = self.bucket_mut(category).remove(owner);
        if removed {
            trace!("deregister {owner:?} from {category:?}");
        }
        removed
    }

    /// Whether `owner` is currently registered under `category`.
    #[must_use]
    pub fn contains(&self, category: Category, owner: EntityKey) -> bool {
        self.bucket(category).index.contains_key(&owner)
    }

    /// Number of live collidables registered under `category`.
    #[must_use]
    pub fn len(&self, category: Category) -> usize {
        self.bucket(category).len()
    }

    /// Whether no collidables are registered at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.len() == 0)
    }

    /// Runs the three rule passes and appends every overlap to `out`.
    ///
    /// 1. Each enemy's `"weapon"` volume against each player's default volume;
    ///    only the player is notified.
    /// 2. Each bullet's default volume against every volume of each environment
    ///    entity; the first hit notifies the bullet and resolves it.
    /// 3. Bullets unresolved by pass 2 against each enemy's default volume; the
    ///    first hit notifies both sides.
    pub fn tick<G>(&mut self, geometry: &G, out: &mut Vec<CollisionNotice>) -> usize
    where
        G: GeometryQuery + ?Sized,
    {
        for bucket in &mut self.buckets {
            bucket.compact();
        }

        let before = out.len();
        self.player_versus_weapons(geometry, out);
        self.bullets_versus_world(geometry, out);
        let produced = out.len() - before;
        if produced > 0 {
            trace!("collision tick produced {produced} notices");
        }
        produced
    }

    fn player_versus_weapons<G>(&self, geometry: &G, out: &mut Vec<CollisionNotice>)
    where
        G: GeometryQuery + ?Sized,
    {
        let enemies = self.bucket(Category::Enemy);
        for player in self.bucket(Category::Player).iter() {
            let body = player.volumes.default_volume();
            for enemy in enemies.iter() {
                let Some(weapon) = enemy.volumes.get(WEAPON_VOLUME) else {
                    continue;
                };
                if geometry.intersects(weapon, body) {
                    out.push(CollisionNotice {
                        recipient: player.owner,
                        other: enemy.owner,
                        other_category: Category::Enemy,
                    });
                }
            }
        }
    }

    fn bullets_versus_world<G>(&self, geometry: &G, out: &mut Vec<CollisionNotice>)
    where
        G: GeometryQuery + ?Sized,
    {
        let environment = self.bucket(Category::Environment);
        let enemies = self.bucket(Category::Enemy);

        for bullet in self.bucket(Category::Bullet).iter() {
            let body = bullet.volumes.default_volume();

            let scenery = environment.iter().find(|entity| {
                entity
                    .volumes
                    .iter()
                    .any(|(_, volume)| geometry.intersects(volume, body))
            });
            if let Some(scenery) = scenery {
                out.push(CollisionNotice {
                    recipient: bullet.owner,
                    other: scenery.owner,
                    other_category: Category::Environment,
                });
                continue;
            }

            let target = enemies
                .iter()
                .find(|enemy| geometry.intersects(body, enemy.volumes.default_volume()));
            if let Some(target) = target {
                out.push(CollisionNotice {
                    recipient: bullet.owner,
                    other: target.owner,
                    other_category: Category::Enemy,
                });
                out.push(CollisionNotice {
                    recipient: target.owner,
                    other: bullet.owner,
                    other_category: Category::Bullet,
                });
            }
        }
    }

    fn bucket(&self, category: Category) -> &Bucket {
        &self.buckets[category.index()]
    }

    fn bucket_mut(&mut self, category: Category) -> &mut Bucket {
        &mut self.buckets[category.index()]
    }
}
