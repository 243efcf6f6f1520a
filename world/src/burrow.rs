//! Timed spawn points opened during the defend phase.

use std::time::Duration;

use garden_defence_core::{BurrowId, NodeHandle, Prefab, SpawnerService};
use glam::Vec3;
use log::debug;

/// Outcome of advancing a burrow by one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct BurrowTick {
    /// Number of emissions due this frame.
    pub(crate) spawns: u32,
    /// Whether the lifespan elapsed; the owner must remove and dispose the burrow.
    pub(crate) expired: bool,
}

/// Spawn point that emits on a fixed cadence until its lifespan elapses.
///
/// Emitted entities hold no reference back to the burrow.
#[derive(Debug)]
pub(crate) struct Burrow {
    id: BurrowId,
    node: NodeHandle,
    position: Vec3,
    spawn_frequency: Duration,
    time_limit: Duration,
    age: Duration,
    spawn_timer: Duration,
    disposed: bool,
}

impl Burrow {
    pub(crate) fn open<H>(
        id: BurrowId,
        position: Vec3,
        spawn_frequency: Duration,
        time_limit: Duration,
        host: &mut H,
    ) -> Self
    where
        H: SpawnerService + ?Sized,
    {
        let spawned = host.instantiate(Prefab::Burrow, position);
        debug!(
            "burrow {} opened at {position}, every {spawn_frequency:?} for {time_limit:?}",
            id.get()
        );
        Self {
            id,
            node: spawned.root,
            position,
            spawn_frequency,
            time_limit,
            age: Duration::ZERO,
            spawn_timer: Duration::ZERO,
            disposed: false,
        }
    }

    /// Advances the spawn accumulator, never past the lifespan.
    pub(crate) fn update(&mut self, dt: Duration) -> BurrowTick {
        if self.disposed {
            return BurrowTick {
                spawns: 0,
                expired: true,
            };
        }

        let step = dt.min(self.time_limit.saturating_sub(self.age));
        self.age = self.age.saturating_add(step);
        self.spawn_timer = self.spawn_timer.saturating_add(step);

        let mut spawns = 0;
        if !self.spawn_frequency.is_zero() {
            while self.spawn_timer >= self.spawn_frequency {
                self.spawn_timer -= self.spawn_frequency;
                spawns += 1;
            }
        }

        BurrowTick {
            spawns,
            expired: self.age >= self.time_limit,
        }
    }

    pub(crate) fn dispose<H>(&mut self, host: &mut H) -> bool
    where
        H: SpawnerService + ?Sized,
    {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        host.despawn(self.node);
        debug!("burrow {} closed", self.id.get());
        true
    }

    pub(crate) const fn position(&self) -> Vec3 {
        self.position
    }
}
