#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Projectiles and the farmer's side of combat resolution.

use std::time::Duration;

use garden_defence_core::{
    BulletId, Category, EntityKey, GeometryQuery, NodeHandle, PlayerConfig, Prefab,
    SpawnerService, WeaponStats,
};
use garden_defence_system_collision::{Collidable, CollisionManager, HitVolumes};
use glam::Vec3;
use log::debug;

/// Parameters a bullet is constructed from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BulletSpec {
    /// Speed in world units per second.
    pub speed: f32,
    /// Damage dealt on impact.
    pub damage: f32,
    /// Lifespan before the bullet expires.
    pub ttl: Duration,
}

impl BulletSpec {
    /// Derives a bullet from weapon stats.
    #[must_use]
    pub fn from_weapon(weapon: &WeaponStats) -> Self {
        Self {
            speed: weapon.bullet_speed,
            damage: weapon.damage,
            ttl: weapon.bullet_ttl(),
        }
    }
}

/// Whether a bullet is still in flight after its tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulletStatus {
    /// Still moving.
    Flying,
    /// Lifespan elapsed or already disposed; the owner should dispose it.
    Expired,
}

/// Position of an unobstructed bullet `elapsed` after leaving `origin`.
#[must_use]
pub fn position_at(origin: Vec3, direction: Vec3, speed: f32, elapsed: Duration) -> Vec3 {
    origin + direction * speed * elapsed.as_secs_f32()
}

/// Projectile with a fixed lifespan that stops at its first qualifying collision.
#[derive(Debug)]
pub struct Bullet {
    id: BulletId,
    node: NodeHandle,
    collidable: Option<Collidable>,
    position: Vec3,
    direction: Vec3,
    speed: f32,
    damage: f32,
    spawned_at: Duration,
    expires_at: Duration,
    resolved: bool,
    disposed: bool,
}

impl Bullet {
    /// Instantiates a bullet at `origin` and registers it for collision.
    pub fn spawn<H>(
        id: BulletId,
        origin: Vec3,
        direction: Vec3,
        spec: BulletSpec,
        now: Duration,
        host: &mut H,
        collisions: &mut CollisionManager,
    ) -> Self
    where
        H: SpawnerService + ?Sized,
    {
        let spawned = host.instantiate(Prefab::Bullet, origin);
        let collidable = HitVolumes::from_spawned(&spawned.hit_volumes).map(|volumes| {
            Collidable::register(EntityKey::Bullet(id), Category::Bullet, volumes, collisions)
        });
        debug!("bullet {} spawned at {origin}", id.get());
        Self {
            id,
            node: spawned.root,
            collidable,
            position: origin,
            direction: direction.normalize_or_zero(),
            speed: spec.speed,
            damage: spec.damage,
            spawned_at: now,
            expires_at: now.saturating_add(spec.ttl),
            resolved: false,
            disposed: false,
        }
    }

    /// Expires the bullet once `now` reaches its expiry, otherwise moves it by `dt`.
    ///
    /// Motion never covers time before the bullet existed, so a bullet spawned
    /// at `now` stays at its origin for that tick.
    pub fn tick<H>(&mut self, now: Duration, dt: Duration, host: &mut H) -> BulletStatus
    where
        H: SpawnerService + GeometryQuery + ?Sized,
    {
        if self.disposed || now >= self.expires_at {
            return BulletStatus::Expired;
        }
        let step = dt.min(now.saturating_sub(self.spawned_at));
        if step.is_zero() {
            return BulletStatus::Flying;
        }
        let target = self.position + self.direction * self.speed * step.as_secs_f32();
        self.position = host.sweep(self.position, target);
        host.set_position(self.node, self.position);
        BulletStatus::Flying
    }

    /// Records a collision. Returns `true` only for the first one.
    pub fn on_collide(&mut self, other: EntityKey) -> bool {
        if self.resolved || self.disposed {
            return false;
        }
        debug!("bullet {} struck {other:?}", self.id.get());
        self.resolved = true;
        true
    }

    /// Releases the scene node and collision registration. Safe to call repeatedly.
    pub fn dispose<H>(&mut self, collisions: &mut CollisionManager, host: &mut H) -> bool
    where
        H: SpawnerService + ?Sized,
    {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        if let Some(collidable) = self.collidable.as_mut() {
            let _ = collidable.deregister(collisions);
        }
        host.despawn(self.node);
        true
    }

    /// Identifier of the bullet.
    #[must_use]
    pub const fn id(&self) -> BulletId {
        self.id
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit direction of travel.
    #[must_use]
    pub const fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Damage dealt on impact.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Simulation time at which the bullet was spawned.
    #[must_use]
    pub const fn spawned_at(&self) -> Duration {
        self.spawned_at
    }

    /// Simulation time at which the bullet expires.
    #[must_use]
    pub const fn expires_at(&self) -> Duration {
        self.expires_at
    }

    /// Whether the bullet has been disposed.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// What the farmer needs to know about an enemy touching it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackerContact {
    /// Whether the enemy is mid-strike.
    pub attacking: bool,
    /// Damage the strike deals.
    pub damage: f32,
}

/// Result of an enemy weapon touching the farmer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitOutcome {
    /// The contact did not register.
    Ignored,
    /// Damage was applied.
    Damaged {
        /// Health remaining.
        health: f32,
    },
    /// Health reached zero on this contact.
    Defeated,
}

/// Player character's combat state.
#[derive(Debug)]
pub struct Farmer {
    node: NodeHandle,
    collidable: Option<Collidable>,
    position: Vec3,
    health: f32,
    max_health: f32,
    hit_reaction_window: Duration,
    last_hit: Option<Duration>,
    weapon: WeaponStats,
    last_shot: Option<Duration>,
    disposed: bool,
}

impl Farmer {
    /// Instantiates the farmer at `position` and registers it as the player.
    pub fn spawn<H>(
        config: &PlayerConfig,
        position: Vec3,
        host: &mut H,
        collisions: &mut CollisionManager,
    ) -> Self
    where
        H: SpawnerService + ?Sized,
    {
        let spawned = host.instantiate(Prefab::Farmer, position);
        let collidable = HitVolumes::from_spawned(&spawned.hit_volumes).map(|volumes| {
            Collidable::register(EntityKey::Farmer, Category::Player, volumes, collisions)
        });
        Self {
            node: spawned.root,
            collidable,
            position,
            health: config.health,
            max_health: config.health,
            hit_reaction_window: config.hit_reaction_window(),
            last_hit: None,
            weapon: config.weapon,
            last_shot: None,
            disposed: false,
        }
    }

    /// Applies an enemy strike if the enemy is attacking and the hit-reaction window elapsed.
    pub fn on_collide(&mut self, attacker: AttackerContact, now: Duration) -> HitOutcome {
        if self.is_defeated() || !attacker.attacking {
            return HitOutcome::Ignored;
        }
        if let Some(last) = self.last_hit {
            if now.saturating_sub(last) < self.hit_reaction_window {
                return HitOutcome::Ignored;
            }
        }

        self.last_hit = Some(now);
        self.health = (self.health - attacker.damage.max(0.0)).max(0.0);
        if self.health <= 0.0 {
            debug!("farmer defeated");
            HitOutcome::Defeated
        } else {
            HitOutcome::Damaged {
                health: self.health,
            }
        }
    }

    /// Restores health up to the maximum. Returns the new health.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !self.is_defeated() {
            self.health = (self.health + amount.max(0.0)).min(self.max_health);
        }
        self.health
    }

    /// Consumes one shot if the weapon has cooled down.
    pub fn fire(&mut self, now: Duration) -> Option<BulletSpec> {
        if self.is_defeated() {
            return None;
        }
        if let Some(last) = self.last_shot {
            if now.saturating_sub(last) < self.weapon.cooldown() {
                return None;
            }
        }
        self.last_shot = Some(now);
        Some(BulletSpec::from_weapon(&self.weapon))
    }

    /// Moves the farmer's root node.
    pub fn move_to<H>(&mut self, position: Vec3, host: &mut H)
    where
        H: SpawnerService + ?Sized,
    {
        self.position = position;
        host.set_position(self.node, position);
    }

    /// Releases the scene node and collision registration. Safe to call repeatedly.
    pub fn dispose<H>(&mut self, collisions: &mut CollisionManager, host: &mut H) -> bool
    where
        H: SpawnerService + ?Sized,
    {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        if let Some(collidable) = self.collidable.as_mut() {
            let _ = collidable.deregister(collisions);
        }
        host.despawn(self.node);
        true
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Whether health reached zero.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.health <= 0.0
    }

    /// Weapon stats used to construct bullets.
    #[must_use]
    pub const fn weapon(&self) -> &WeaponStats {
        &self.weapon
    }
}
