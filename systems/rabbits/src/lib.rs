#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy state machine shared by attacker and gatherer rabbits.
//!
//! A rabbit moves through `Spawn → Active → {Retreat | Death}`. Hit reaction
//! is a flag orthogonal to `Active` and decay is a timer inside `Death`.
//! Presentation completions arrive as [`RabbitEvent::PresentationDone`] at an
//! arbitrary later tick; a completion for any clip other than the one the
//! rabbit is waiting on is stale and ignored. Side effects the owner must carry
//! out (removing the rabbit, dropping a crop) are reported as [`RabbitSignal`]
//! values rather than performed here.

use std::time::Duration;

use garden_defence_core::{
    AgentId, BehaviorKind, Category, Clip, CropId, EnemyStats, EntityKey, NavigationService,
    NodeHandle, PresentationService, RabbitId, RabbitState, SpawnerService,
};
use garden_defence_system_collision::{Collidable, CollisionManager, HitVolumes};
use glam::Vec3;
use log::debug;

mod behavior;

pub use behavior::{Behavior, Harvest, RabbitStats};

/// Collaborators a rabbit talks to.
pub trait RabbitHost: NavigationService + PresentationService + SpawnerService {}

impl<T> RabbitHost for T
where
    T: NavigationService + PresentationService + SpawnerService + ?Sized,
{
}

/// Inputs to the state machine's transition function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RabbitEvent {
    /// A non-looping clip finished on the rabbit's node.
    PresentationDone(Clip),
    /// The rabbit was struck for the given amount.
    Damaged(f32),
    /// The rabbit is ordered home.
    Retreat,
    /// Navigation and presentation are suspended (`true`) or resumed (`false`).
    SetDisabled(bool),
}

/// Side effects the owner of a rabbit must carry out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RabbitSignal {
    /// The rabbit entered a new state.
    StateChanged(RabbitState),
    /// A gatherer took a crop from the field.
    Stole(CropId),
    /// The rabbit died; a carried crop must be dropped at `drop_at`.
    Died {
        /// Where to drop the carried crop, if one was carried.
        drop_at: Option<Vec3>,
    },
    /// A retreating rabbit reached its spawn position and must be removed.
    ReachedBurrow {
        /// Whether it took a crop with it.
        carrying_resource: bool,
    },
    /// The remains decayed and must be removed.
    Decayed,
}

impl RabbitSignal {
    /// Whether the owner must remove and dispose of the rabbit.
    #[must_use]
    pub const fn requires_disposal(&self) -> bool {
        matches!(self, Self::ReachedBurrow { .. } | Self::Decayed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Decay {
    Pending,
    Running(Duration),
    Fired,
}

/// One enemy rabbit.
#[derive(Debug)]
pub struct RabbitAgent {
    id: RabbitId,
    behavior: Behavior,
    stats: RabbitStats,
    health: f32,
    spawn_position: Vec3,
    node: NodeHandle,
    collidable: Option<Collidable>,
    state: RabbitState,
    nav_agent: Option<AgentId>,
    hit_reaction_active: bool,
    disabled: bool,
    clip: Option<Clip>,
    decay: Decay,
    departed: bool,
    disposed: bool,
}

impl RabbitAgent {
    /// Instantiates a rabbit at `position` with the round's difficulty `modifier` applied.
    pub fn spawn<H>(
        id: RabbitId,
        kind: BehaviorKind,
        position: Vec3,
        base: &EnemyStats,
        modifier: f32,
        host: &mut H,
        collisions: &mut CollisionManager,
    ) -> Self
    where
        H: RabbitHost + ?Sized,
    {
        let behavior = Behavior::new(kind);
        let stats = RabbitStats::scaled(base, kind, modifier);
        let spawned = host.instantiate(behavior.prefab(), position);
        let collidable = HitVolumes::from_spawned(&spawned.hit_volumes).map(|volumes| {
            Collidable::register(EntityKey::Rabbit(id), Category::Enemy, volumes, collisions)
        });

        let mut rabbit = Self {
            id,
            behavior,
            stats,
            health: stats.max_health,
            spawn_position: position,
            node: spawned.root,
            collidable,
            state: RabbitState::Spawn,
            nav_agent: None,
            hit_reaction_active: false,
            disabled: false,
            clip: None,
            decay: Decay::Pending,
            departed: false,
            disposed: false,
        };
        rabbit.play(host, Clip::Spawn, false);
        debug!("rabbit {} ({kind:?}) spawned at {position}", id.get());
        rabbit
    }

    /// Advances per-tick behaviour: chasing, gathering, retreating, decaying.
    pub fn update<H, C>(
        &mut self,
        dt: Duration,
        player: Vec3,
        crops: &mut C,
        host: &mut H,
        out: &mut Vec<RabbitSignal>,
    ) where
        H: RabbitHost + ?Sized,
        C: Harvest + ?Sized,
    {
        if self.disposed || self.departed {
            return;
        }
        match self.state {
            RabbitState::Spawn => {}
            RabbitState::Active => {
                if self.nav_agent.is_some() {
                    self.on_active_tick(player, crops, host, out);
                }
            }
            RabbitState::Retreat => {
                if let Some(agent) = self.nav_agent {
                    host.go_to(agent, self.spawn_position);
                }
                let position = self.position(host);
                if position.distance(self.spawn_position) < self.stats.arrival_threshold {
                    self.departed = true;
                    out.push(RabbitSignal::ReachedBurrow {
                        carrying_resource: self.behavior.is_carrying(),
                    });
                }
            }
            RabbitState::Death => {
                if let Decay::Running(remaining) = self.decay {
                    let remaining = remaining.saturating_sub(dt);
                    if remaining.is_zero() {
                        self.decay = Decay::Fired;
                        out.push(RabbitSignal::Decayed);
                    } else {
                        self.decay = Decay::Running(remaining);
                    }
                }
            }
        }
    }

    /// Transition function for external events.
    pub fn handle<H>(
        &mut self,
        event: RabbitEvent,
        host: &mut H,
        collisions: &mut CollisionManager,
        out: &mut Vec<RabbitSignal>,
    ) where
        H: RabbitHost + ?Sized,
    {
        if self.disposed {
            return;
        }
        match event {
            RabbitEvent::PresentationDone(clip) => self.on_presentation_done(clip, host, out),
            RabbitEvent::Damaged(amount) => self.on_damaged(amount, host, collisions, out),
            RabbitEvent::Retreat => self.begin_retreat(host, out),
            RabbitEvent::SetDisabled(disabled) => self.set_disabled(disabled, host),
        }
    }

    /// Releases navigation, collision and scene resources. Safe to call repeatedly.
    pub fn dispose<H>(&mut self, collisions: &mut CollisionManager, host: &mut H) -> bool
    where
        H: RabbitHost + ?Sized,
    {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.release_navigation(host);
        if let Some(collidable) = self.collidable.as_mut() {
            let _ = collidable.deregister(collisions);
        }
        host.despawn(self.node);
        debug!("rabbit {} disposed", self.id.get());
        true
    }

    fn on_active_tick<H, C>(
        &mut self,
        player: Vec3,
        crops: &mut C,
        host: &mut H,
        out: &mut Vec<RabbitSignal>,
    ) where
        H: RabbitHost + ?Sized,
        C: Harvest + ?Sized,
    {
        let position = self.position(host);
        match self.behavior {
            Behavior::Attacker { striking } => {
                self.navigate(host, player);
                if !striking && position.distance(player) <= self.stats.reach {
                    self.behavior = Behavior::Attacker { striking: true };
                    self.play(host, Clip::Attack, false);
                }
            }
            Behavior::Gatherer { carrying, .. } => {
                if let Some((crop, at)) = crops.nearest(position) {
                    self.behavior = Behavior::Gatherer {
                        carrying,
                        target: Some(crop),
                    };
                    self.navigate(host, at);
                    if position.distance(at) < self.stats.reach {
                        self.on_reach_target(crop, crops, host, out);
                    }
                } else {
                    self.behavior = Behavior::Gatherer {
                        carrying,
                        target: None,
                    };
                    self.navigate(host, player);
                }
            }
        }
    }

    fn on_reach_target<H, C>(
        &mut self,
        crop: CropId,
        crops: &mut C,
        host: &mut H,
        out: &mut Vec<RabbitSignal>,
    ) where
        H: RabbitHost + ?Sized,
        C: Harvest + ?Sized,
    {
        if !crops.take(crop) {
            return;
        }
        self.behavior = Behavior::Gatherer {
            carrying: true,
            target: None,
        };
        out.push(RabbitSignal::Stole(crop));
        self.begin_retreat(host, out);
    }

    fn on_presentation_done<H>(&mut self, clip: Clip, host: &mut H, out: &mut Vec<RabbitSignal>)
    where
        H: RabbitHost + ?Sized,
    {
        if self.clip != Some(clip) {
            return;
        }
        self.clip = None;

        match clip {
            Clip::Spawn => {
                if self.state == RabbitState::Spawn {
                    self.enter(RabbitState::Active, out);
                }
                self.acquire_navigation(host);
                self.play(host, Clip::Run, true);
            }
            Clip::Hit => {
                if self.hit_reaction_active {
                    self.hit_reaction_active = false;
                    self.acquire_navigation(host);
                    self.play(host, Clip::Run, true);
                }
            }
            Clip::Attack => {
                if self.behavior.stop_striking() && self.state == RabbitState::Active {
                    self.play(host, Clip::Run, true);
                }
            }
            Clip::Death => {
                if self.state == RabbitState::Death && self.decay == Decay::Pending {
                    self.decay = Decay::Running(self.stats.decay);
                }
            }
            Clip::Run => {}
        }
    }

    fn on_damaged<H>(
        &mut self,
        amount: f32,
        host: &mut H,
        collisions: &mut CollisionManager,
        out: &mut Vec<RabbitSignal>,
    ) where
        H: RabbitHost + ?Sized,
    {
        if self.state == RabbitState::Death {
            return;
        }
        self.health = (self.health - amount.max(0.0)).max(0.0);
        if self.health <= 0.0 {
            self.die(host, collisions, out);
            return;
        }
        if self.state == RabbitState::Active && !self.hit_reaction_active {
            self.hit_reaction_active = true;
            let _ = self.behavior.stop_striking();
            self.release_navigation(host);
            self.play(host, Clip::Hit, false);
        }
    }

    fn die<H>(
        &mut self,
        host: &mut H,
        collisions: &mut CollisionManager,
        out: &mut Vec<RabbitSignal>,
    ) where
        H: RabbitHost + ?Sized,
    {
        let position = self.position(host);
        self.enter(RabbitState::Death, out);
        self.hit_reaction_active = false;
        self.release_navigation(host);
        if let Some(collidable) = self.collidable.as_mut() {
            let _ = collidable.deregister(collisions);
        }
        let _ = self.behavior.stop_striking();
        let drop_at = self.behavior.drop_carried().then_some(position);
        out.push(RabbitSignal::Died { drop_at });
        self.play(host, Clip::Death, false);
    }

    fn begin_retreat<H>(&mut self, host: &mut H, out: &mut Vec<RabbitSignal>)
    where
        H: RabbitHost + ?Sized,
    {
        if !matches!(self.state, RabbitState::Spawn | RabbitState::Active) {
            return;
        }
        let was_spawning = self.state == RabbitState::Spawn;
        self.enter(RabbitState::Retreat, out);
        let interrupted = self.behavior.stop_striking();
        if was_spawning {
            return;
        }
        if let Some(agent) = self.nav_agent {
            host.update_speed(agent, self.stats.retreat_speed);
            host.go_to(agent, self.spawn_position);
        }
        if interrupted {
            self.play(host, Clip::Run, true);
        }
    }

    fn set_disabled<H>(&mut self, disabled: bool, host: &mut H)
    where
        H: RabbitHost + ?Sized,
    {
        if self.disabled == disabled {
            return;
        }
        self.disabled = disabled;
        host.pause(self.node, disabled);
        if disabled {
            self.release_navigation(host);
        } else {
            self.acquire_navigation(host);
        }
    }

    fn enter(&mut self, state: RabbitState, out: &mut Vec<RabbitSignal>) {
        debug!("rabbit {} {:?} -> {state:?}", self.id.get(), self.state);
        self.state = state;
        out.push(RabbitSignal::StateChanged(state));
    }

    fn navigate<H>(&mut self, host: &mut H, target: Vec3)
    where
        H: RabbitHost + ?Sized,
    {
        if let Some(agent) = self.nav_agent {
            host.go_to(agent, target);
        }
    }

    fn acquire_navigation<H>(&mut self, host: &mut H)
    where
        H: RabbitHost + ?Sized,
    {
        if self.nav_agent.is_some() || self.disabled || self.hit_reaction_active {
            return;
        }
        let Some(speed) = self.state_speed() else {
            return;
        };
        let position = self.position(host);
        let agent = host.add_agent(position, speed, self.node);
        self.nav_agent = Some(agent);
        if self.state == RabbitState::Retreat {
            host.go_to(agent, self.spawn_position);
        }
    }

    fn release_navigation<H>(&mut self, host: &mut H)
    where
        H: RabbitHost + ?Sized,
    {
        if let Some(agent) = self.nav_agent.take() {
            host.remove_agent(agent);
        }
    }

    fn play<H>(&mut self, host: &mut H, clip: Clip, looping: bool)
    where
        H: RabbitHost + ?Sized,
    {
        if looping && self.clip == Some(clip) {
            return;
        }
        host.play(self.node, clip, looping);
        self.clip = Some(clip);
    }

    fn state_speed(&self) -> Option<f32> {
        match self.state {
            RabbitState::Active => Some(self.stats.speed),
            RabbitState::Retreat => Some(self.stats.retreat_speed),
            RabbitState::Spawn | RabbitState::Death => None,
        }
    }

    /// Current world-space position, falling back to the spawn position.
    pub fn position<H>(&self, host: &H) -> Vec3
    where
        H: SpawnerService + ?Sized,
    {
        host.position(self.node).unwrap_or(self.spawn_position)
    }

    /// Identifier of the rabbit.
    #[must_use]
    pub const fn id(&self) -> RabbitId {
        self.id
    }

    /// Behaviour variant.
    #[must_use]
    pub const fn kind(&self) -> BehaviorKind {
        self.behavior.kind()
    }

    /// Variant-specific state.
    #[must_use]
    pub const fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    /// Scaled stats.
    #[must_use]
    pub const fn stats(&self) -> &RabbitStats {
        &self.stats
    }

    /// Current health, always within `0..=max_health`.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Current top-level state.
    #[must_use]
    pub const fn state(&self) -> RabbitState {
        self.state
    }

    /// Where the rabbit emerged.
    #[must_use]
    pub const fn spawn_position(&self) -> Vec3 {
        self.spawn_position
    }

    /// Root scene node.
    #[must_use]
    pub const fn node(&self) -> NodeHandle {
        self.node
    }

    /// Navigation handle, held only while moving under its own power.
    #[must_use]
    pub const fn nav_agent(&self) -> Option<AgentId> {
        self.nav_agent
    }

    /// Whether the hit reaction is playing.
    #[must_use]
    pub const fn hit_reaction_active(&self) -> bool {
        self.hit_reaction_active
    }

    /// Whether a stolen crop is being carried.
    #[must_use]
    pub const fn carrying_resource(&self) -> bool {
        self.behavior.is_carrying()
    }

    /// Whether the rabbit is mid-strike and able to hurt the farmer.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.state == RabbitState::Active && self.behavior.is_striking()
    }

    /// Damage per strike.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.stats.damage
    }

    /// Remaining decay time once the death presentation finished.
    #[must_use]
    pub const fn death_timer(&self) -> Option<Duration> {
        match self.decay {
            Decay::Running(remaining) => Some(remaining),
            Decay::Pending | Decay::Fired => None,
        }
    }

    /// Whether navigation and presentation are suspended.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Whether the collision capability is still registered.
    #[must_use]
    pub fn is_collidable(&self) -> bool {
        self.collidable
            .as_ref()
            .is_some_and(Collidable::is_registered)
    }

    /// Whether [`RabbitAgent::dispose`] already ran.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }
}
