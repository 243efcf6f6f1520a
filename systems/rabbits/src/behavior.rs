//! Behaviour variants and scaled stats shared by every rabbit.

use std::time::Duration;

use garden_defence_core::{difficulty::scale_linear, BehaviorKind, CropId, EnemyStats, Prefab};
use glam::Vec3;

/// Crop storage a gatherer can look into and take from.
pub trait Harvest {
    /// Nearest crop to `from`, if any remain.
    fn nearest(&self, from: Vec3) -> Option<(CropId, Vec3)>;

    /// Removes `crop` from the field. Returns `false` when it is already gone.
    fn take(&mut self, crop: CropId) -> bool;
}

/// Stats of one rabbit after difficulty scaling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RabbitStats {
    /// Maximum health.
    pub max_health: f32,
    /// Damage per strike; zero for gatherers.
    pub damage: f32,
    /// Movement speed while active.
    pub speed: f32,
    /// Movement speed while retreating.
    pub retreat_speed: f32,
    /// Attack range or gather distance.
    pub reach: f32,
    /// Distance to the spawn position at which a retreat completes.
    pub arrival_threshold: f32,
    /// How long the remains linger after the death presentation.
    pub decay: Duration,
}

impl RabbitStats {
    /// Base stats with `modifier` applied once: health, damage and speed each
    /// grow by their base value times the modifier.
    #[must_use]
    pub fn scaled(base: &EnemyStats, kind: BehaviorKind, modifier: f32) -> Self {
        let damage = match kind {
            BehaviorKind::Attacker => scale_linear(base.damage, modifier),
            BehaviorKind::Gatherer => 0.0,
        };
        Self {
            max_health: scale_linear(base.health, modifier),
            damage,
            speed: scale_linear(base.speed, modifier),
            retreat_speed: base.retreat_speed,
            reach: base.reach,
            arrival_threshold: base.arrival_threshold,
            decay: base.decay(),
        }
    }
}

/// Variant-specific state carried inside the shared state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Behavior {
    /// Chases the farmer and strikes when in range.
    Attacker {
        /// Whether a strike presentation is in flight.
        striking: bool,
    },
    /// Goes for the nearest crop, falling back to the farmer.
    Gatherer {
        /// Whether a stolen crop is being carried home.
        carrying: bool,
        /// Crop currently targeted.
        target: Option<CropId>,
    },
}

impl Behavior {
    /// Fresh behaviour state for `kind`.
    #[must_use]
    pub const fn new(kind: BehaviorKind) -> Self {
        match kind {
            BehaviorKind::Attacker => Self::Attacker { striking: false },
            BehaviorKind::Gatherer => Self::Gatherer {
                carrying: false,
                target: None,
            },
        }
    }

    /// Variant tag.
    #[must_use]
    pub const fn kind(&self) -> BehaviorKind {
        match self {
            Self::Attacker { .. } => BehaviorKind::Attacker,
            Self::Gatherer { .. } => BehaviorKind::Gatherer,
        }
    }

    /// Prefab instantiated for the variant.
    #[must_use]
    pub const fn prefab(&self) -> Prefab {
        match self {
            Self::Attacker { .. } => Prefab::Attacker,
            Self::Gatherer { .. } => Prefab::Gatherer,
        }
    }

    /// Whether a strike is in flight.
    #[must_use]
    pub const fn is_striking(&self) -> bool {
        matches!(self, Self::Attacker { striking: true })
    }

    /// Whether a stolen crop is being carried.
    #[must_use]
    pub const fn is_carrying(&self) -> bool {
        matches!(self, Self::Gatherer { carrying: true, .. })
    }

    pub(crate) fn stop_striking(&mut self) -> bool {
        match self {
            Self::Attacker { striking } => std::mem::replace(striking, false),
            Self::Gatherer { .. } => false,
        }
    }

    pub(crate) fn drop_carried(&mut self) -> bool {
        match self {
            Self::Gatherer { carrying, target } => {
                *target = None;
                std::mem::replace(carrying, false)
            }
            Self::Attacker { .. } => false,
        }
    }
}
