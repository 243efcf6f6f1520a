#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Garden Defence simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the entity systems. Adapters submit [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values that adapters
//! and tests observe. Everything the simulation needs from the outside world
//! (crowd steering, clip playback, scene instancing, overlap queries, audio and
//! GUI sinks) is expressed as a collaborator trait in [`services`].

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod difficulty;
pub mod services;

pub use config::{
    BurrowConfig, ConfigError, CropConfig, EnemyStats, GameConfig, PlayerConfig, RangeConfig,
    RoundConfig, SpawnMode, WeaponStats,
};
pub use difficulty::{RandomSource, SeededRandom};
pub use services::{
    AudioCue, AudioService, ClipFinished, GeometryQuery, GuiNotice, GuiService, Host,
    NavigationService, Prefab, PresentationService, SpawnedPrefab, SpawnerService,
};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Garden Defence.";

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident($repr:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name($repr);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: $repr) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> $repr {
                self.0
            }

            /// Returns the identifier that follows this one.
            #[must_use]
            pub const fn next(&self) -> Self {
                Self(self.0.wrapping_add(1))
            }
        }
    };
}

entity_id!(
    /// Unique identifier assigned to a rabbit.
    RabbitId(u32)
);
entity_id!(
    /// Unique identifier assigned to a burrow.
    BurrowId(u32)
);
entity_id!(
    /// Unique identifier assigned to a bullet.
    BulletId(u32)
);
entity_id!(
    /// Unique identifier assigned to a harvestable crop.
    CropId(u32)
);
entity_id!(
    /// Unique identifier assigned to a resource dropped by a dying gatherer.
    DropId(u32)
);
entity_id!(
    /// Unique identifier assigned to a fence.
    FenceId(u32)
);
entity_id!(
    /// Opaque handle to a root node owned by the scene collaborator.
    NodeHandle(u64)
);
entity_id!(
    /// Opaque handle to a hit volume owned by the scene collaborator.
    VolumeHandle(u64)
);
entity_id!(
    /// Opaque handle to an agent owned by the navigation collaborator.
    AgentId(u64)
);

/// Names the entity that owns a collidable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKey {
    /// The player character.
    Farmer,
    /// A live rabbit.
    Rabbit(RabbitId),
    /// A bullet in flight.
    Bullet(BulletId),
    /// A fence placed during the fortify phase.
    Fence(FenceId),
}

/// Collision category a collidable belongs to for its whole lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// The player character.
    Player,
    /// Projectiles.
    Bullet,
    /// Static scenery that stops projectiles.
    Environment,
    /// Rabbits.
    Enemy,
    /// Weapons carried by enemies.
    EnemyWeapon,
}

impl Category {
    /// Every category in bucket order.
    pub const ALL: [Category; 5] = [
        Category::Player,
        Category::Bullet,
        Category::Environment,
        Category::Enemy,
        Category::EnemyWeapon,
    ];

    /// Dense index of the category, suitable for bucket arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Player => 0,
            Self::Bullet => 1,
            Self::Environment => 2,
            Self::Enemy => 3,
            Self::EnemyWeapon => 4,
        }
    }
}

/// Round phase the scheduler is currently in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// The player prepares; nothing spawns.
    Fortify,
    /// Burrows open and rabbits attack.
    Defend,
}

/// Behaviour variant a rabbit is instantiated with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorKind {
    /// Melee rabbit that chases and strikes the farmer.
    Attacker,
    /// Rabbit that steals crops and carries them home.
    Gatherer,
}

/// Top-level state of a rabbit's state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RabbitState {
    /// Playing the spawn presentation; not yet navigating.
    Spawn,
    /// Chasing its target.
    Active,
    /// Heading back to the spawn position.
    Retreat,
    /// Dead, waiting for the death presentation and decay.
    Death,
}

/// Presentation clip tokens understood by the presentation collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clip {
    /// Emerging from the ground.
    Spawn,
    /// Locomotion loop.
    Run,
    /// Melee strike.
    Attack,
    /// Flinch after taking damage.
    Hit,
    /// Collapse.
    Death,
}

/// Reasons a placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// Placement is only allowed during the fortify phase.
    InvalidPhase,
    /// No seeds remain to plant another crop.
    NoSeeds,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that the farmer fire one bullet along the provided direction.
    FireWeapon {
        /// Direction of travel; normalised by the world.
        direction: Vec3,
    },
    /// Moves the farmer to the provided position.
    MoveFarmer {
        /// New world-space position of the farmer.
        position: Vec3,
    },
    /// Requests placement of a fence during the fortify phase.
    PlaceFence {
        /// World-space position of the fence.
        position: Vec3,
    },
    /// Requests planting a crop during the fortify phase.
    PlantCrop {
        /// World-space position of the crop.
        position: Vec3,
    },
    /// Orders every live rabbit to retreat.
    CommandRetreat,
    /// Suspends or resumes every live rabbit.
    SetPaused {
        /// Whether rabbits should be suspended.
        paused: bool,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that the scheduler entered a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: Phase,
        /// Round number the phase belongs to.
        round: u32,
        /// Length of the new phase.
        duration: Duration,
    },
    /// Confirms that a burrow opened.
    BurrowOpened {
        /// Identifier assigned to the burrow.
        burrow: BurrowId,
        /// Location of the burrow.
        position: Vec3,
    },
    /// Confirms that a burrow closed after its lifespan elapsed or the phase ended.
    BurrowClosed {
        /// Identifier of the burrow that closed.
        burrow: BurrowId,
    },
    /// Confirms that a rabbit emerged.
    RabbitSpawned {
        /// Identifier assigned to the rabbit.
        rabbit: RabbitId,
        /// Behaviour variant of the rabbit.
        kind: BehaviorKind,
        /// Location the rabbit emerged at.
        position: Vec3,
    },
    /// Reports a rabbit state machine transition.
    RabbitStateChanged {
        /// Identifier of the rabbit.
        rabbit: RabbitId,
        /// State the rabbit entered.
        state: RabbitState,
    },
    /// Confirms that a rabbit died.
    RabbitDied {
        /// Identifier of the rabbit.
        rabbit: RabbitId,
        /// Behaviour variant of the rabbit.
        kind: BehaviorKind,
    },
    /// Confirms that a rabbit made it back to its burrow.
    RabbitEscaped {
        /// Identifier of the rabbit.
        rabbit: RabbitId,
        /// Whether the rabbit took a crop with it.
        carrying_resource: bool,
    },
    /// Confirms that a rabbit's remains decayed away.
    RabbitDecayed {
        /// Identifier of the rabbit.
        rabbit: RabbitId,
    },
    /// Confirms that a gatherer took a crop from the field.
    ResourceStolen {
        /// Crop that was taken.
        crop: CropId,
        /// Gatherer that took it.
        rabbit: RabbitId,
    },
    /// Confirms that a dying gatherer dropped its crop.
    ResourceDropped {
        /// Identifier assigned to the drop.
        drop: DropId,
        /// Location of the drop.
        position: Vec3,
    },
    /// Confirms that the farmer picked up a dropped crop.
    ResourcePickedUp {
        /// Drop that was collected.
        drop: DropId,
    },
    /// Confirms that a bullet was created.
    BulletFired {
        /// Identifier assigned to the bullet.
        bullet: BulletId,
        /// Origin of the bullet.
        position: Vec3,
        /// Unit direction of travel.
        direction: Vec3,
    },
    /// Reports that a bullet reached the end of its lifespan.
    BulletExpired {
        /// Identifier of the bullet.
        bullet: BulletId,
    },
    /// Reports that a bullet struck something.
    BulletHit {
        /// Identifier of the bullet.
        bullet: BulletId,
        /// Entity that was struck.
        target: EntityKey,
    },
    /// Reports that the weapon is still cooling down.
    WeaponCoolingDown,
    /// Reports that the farmer took damage.
    FarmerDamaged {
        /// Rabbit responsible for the damage.
        attacker: RabbitId,
        /// Health remaining after the hit.
        health: f32,
    },
    /// Terminal event: the farmer's health reached zero.
    FarmerDefeated,
    /// Confirms that a fence was placed.
    FencePlaced {
        /// Identifier assigned to the fence.
        fence: FenceId,
        /// Location of the fence.
        position: Vec3,
    },
    /// Reports that a fence placement request was rejected.
    FenceRejected {
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a crop was planted.
    CropPlanted {
        /// Identifier assigned to the crop.
        crop: CropId,
        /// Location of the crop.
        position: Vec3,
    },
    /// Reports that a planting request was rejected.
    CropRejected {
        /// Specific reason the planting failed.
        reason: PlacementError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_indices_are_dense_and_unique() {
        let mut seen = [false; 5];
        for category in Category::ALL {
            let index = category.index();
            assert!(!seen[index], "duplicate index for {category:?}");
            seen[index] = true;
        }
        assert!(seen.iter().all(|slot| *slot));
    }

    #[test]
    fn identifiers_advance_by_one() {
        assert_eq!(RabbitId::new(4).next(), RabbitId::new(5));
        assert_eq!(NodeHandle::new(u64::MAX).next(), NodeHandle::new(0));
    }
}
