#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Garden Defence.
//!
//! The [`World`] is the composition root of one game session. It owns the
//! hosting collaborators, the collision manager, the round scheduler with its
//! burrows and rabbits, the farmer, bullets, crops and fences. Every frame runs
//! the same ordered pass: burrows, rabbits, bullets, collisions, pick-ups and
//! finally the phase clock.

use std::time::Duration;

use garden_defence_core::{
    difficulty::{planar_direction, random_point_on_ring, GOLDEN_ANGLE},
    AudioCue, BehaviorKind, BulletId, ClipFinished, Command, EntityKey, Event, GameConfig,
    GuiNotice, Host, Phase, PlacementError, RabbitId, RabbitState, RandomSource, SeededRandom,
    SpawnMode, WELCOME_BANNER,
};
use garden_defence_system_collision::{CollisionManager, CollisionNotice};
use garden_defence_system_combat::{
    AttackerContact, Bullet, BulletSpec, BulletStatus, Farmer, HitOutcome,
};
use garden_defence_system_rabbits::{RabbitAgent, RabbitEvent, RabbitSignal};
use glam::Vec3;
use log::{debug, info};
use serde::Serialize;

mod burrow;
mod garden;
mod registry;
mod scheduler;

use burrow::Burrow;
use garden::{CropField, Drops, Fences};
use registry::Registry;

pub use scheduler::{PhaseChange, RoundScheduler};

const GARDEN_CENTRE: Vec3 = Vec3::ZERO;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Tally {
    rounds_survived: u32,
    rabbits_spawned: u32,
    rabbits_killed: u32,
    rabbits_escaped: u32,
    crops_stolen: u32,
    crops_lost: u32,
    drops_recovered: u32,
    bullets_fired: u32,
}

/// Represents the authoritative Garden Defence world state.
#[derive(Debug)]
pub struct World<H> {
    banner: &'static str,
    config: GameConfig,
    host: H,
    rng: SeededRandom,
    clock: Duration,
    paused: bool,
    defeated: bool,
    collisions: CollisionManager,
    scheduler: RoundScheduler,
    farmer: Farmer,
    bullets: Registry<BulletId, Bullet>,
    crops: CropField,
    drops: Drops,
    fences: Fences,
    volleys: u32,
    tally: Tally,
    finished: Vec<ClipFinished>,
    notices: Vec<CollisionNotice>,
    signals: Vec<RabbitSignal>,
}

impl<H: Host> World<H> {
    /// Starts a session in fortify of round one with the farmer in the garden centre.
    pub fn new(config: GameConfig, seed: u64, mut host: H) -> Self {
        let mut collisions = CollisionManager::new();
        let farmer = Farmer::spawn(&config.player, GARDEN_CENTRE, &mut host, &mut collisions);
        let mut crops = CropField::new(config.crops.seeds_per_round);
        crops.sow(config.crops.initial_count, config.crops.field_radius, &mut host);

        host.notify(GuiNotice::Health {
            current: farmer.health(),
            max: farmer.max_health(),
        });
        host.notify(GuiNotice::PhaseBanner {
            phase: Phase::Fortify,
            round: 1,
        });
        info!("session started with seed {seed:#x}");

        Self {
            banner: WELCOME_BANNER,
            scheduler: RoundScheduler::new(config.rounds),
            config,
            host,
            rng: SeededRandom::new(seed),
            clock: Duration::ZERO,
            paused: false,
            defeated: false,
            collisions,
            farmer,
            bullets: Registry::new(),
            crops,
            drops: Drops::new(),
            fences: Fences::new(),
            volleys: 0,
            tally: Tally::default(),
            finished: Vec::new(),
            notices: Vec::new(),
            signals: Vec::new(),
        }
    }

    /// Mutable access to the hosting collaborators, for adapters that feed them input.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Disposes every live entity, rabbits and burrows first.
    pub fn shutdown(&mut self) {
        for mut rabbit in self.scheduler.rabbits.drain() {
            let _ = rabbit.dispose(&mut self.collisions, &mut self.host);
        }
        for mut burrow in self.scheduler.burrows.drain() {
            let _ = burrow.dispose(&mut self.host);
        }
        for mut bullet in self.bullets.drain() {
            let _ = bullet.dispose(&mut self.collisions, &mut self.host);
        }
        self.fences.clear(&mut self.host, &mut self.collisions);
        self.crops.clear(&mut self.host);
        self.drops.clear(&mut self.host);
        let _ = self.farmer.dispose(&mut self.collisions, &mut self.host);
        info!("session shut down after {:?}", self.clock);
    }

    fn tick(&mut self, dt: Duration, out: &mut Vec<Event>) {
        self.host.advance(dt);
        self.update_burrows(dt, out);
        self.update_rabbits(dt, out);
        self.update_bullets(dt, out);
        self.resolve_collisions(out);
        self.collect_drops(out);
        if self.defeated {
            return;
        }
        if let Some(change) = self.scheduler.advance(dt) {
            self.enter_phase(change, out);
        }
    }

    fn update_burrows(&mut self, dt: Duration, out: &mut Vec<Event>) {
        for id in self.scheduler.burrows.ids() {
            let Some(burrow) = self.scheduler.burrows.get_mut(id) else {
                continue;
            };
            let tick = burrow.update(dt);
            let position = burrow.position();
            for _ in 0..tick.spawns {
                self.emit_from(position, out);
            }
            if tick.expired {
                if let Some(mut burrow) = self.scheduler.burrows.remove(id) {
                    let _ = burrow.dispose(&mut self.host);
                    out.push(Event::BurrowClosed { burrow: id });
                }
            }
        }

        // Burrows opened this frame start ageing on the next one.
        for _ in 0..self.scheduler.burrows_due(dt) {
            self.open_burrow(out);
        }
    }

    fn open_burrow(&mut self, out: &mut Vec<Event>) {
        let ranges = self.config.burrows;
        let position = random_point_on_ring(&mut self.rng, GARDEN_CENTRE, ranges.spawn_radius);
        let frequency = seconds(self.rng.sample(ranges.spawn_frequency));
        let time_limit = seconds(self.rng.sample(ranges.time_limit));

        let id = self.scheduler.burrows.allocate();
        let burrow = Burrow::open(id, position, frequency, time_limit, &mut self.host);
        self.scheduler.burrows.insert(id, burrow);
        out.push(Event::BurrowOpened {
            burrow: id,
            position,
        });
    }

    fn emit_from(&mut self, position: Vec3, out: &mut Vec<Event>) {
        match self.config.burrows.spawn_mode {
            SpawnMode::Rabbits => {
                let kind = if self.rng.range(0.0, 1.0) < self.config.burrows.attacker_share {
                    BehaviorKind::Attacker
                } else {
                    BehaviorKind::Gatherer
                };
                let base = match kind {
                    BehaviorKind::Attacker => self.config.attacker,
                    BehaviorKind::Gatherer => self.config.gatherer,
                };
                let id = self.scheduler.rabbits.allocate();
                let rabbit = RabbitAgent::spawn(
                    id,
                    kind,
                    position,
                    &base,
                    self.scheduler.difficulty_modifier(),
                    &mut self.host,
                    &mut self.collisions,
                );
                self.scheduler.rabbits.insert(id, rabbit);
                self.tally.rabbits_spawned += 1;
                out.push(Event::RabbitSpawned {
                    rabbit: id,
                    kind,
                    position,
                });
            }
            SpawnMode::Bullets => {
                let direction = planar_direction(self.volleys as f32 * GOLDEN_ANGLE);
                self.volleys = self.volleys.wrapping_add(1);
                let spec = BulletSpec::from_weapon(&self.config.player.weapon);
                self.spawn_bullet(position, direction, spec, out);
            }
        }
    }

    fn update_rabbits(&mut self, dt: Duration, out: &mut Vec<Event>) {
        let mut finished = std::mem::take(&mut self.finished);
        finished.clear();
        self.host.drain_finished(&mut finished);
        for done in &finished {
            let owner = self
                .scheduler
                .rabbits
                .find(|rabbit| rabbit.node() == done.node);
            if let Some(rabbit) = owner {
                self.dispatch(rabbit, RabbitEvent::PresentationDone(done.clip), out);
            }
        }
        self.finished = finished;

        let player = self.farmer.position();
        for id in self.scheduler.rabbits.ids() {
            let Some(rabbit) = self.scheduler.rabbits.get_mut(id) else {
                continue;
            };
            rabbit.update(
                dt,
                player,
                &mut self.crops,
                &mut self.host,
                &mut self.signals,
            );
            self.route_signals(id, out);
        }
        self.crops.flush(&mut self.host);
    }

    fn update_bullets(&mut self, dt: Duration, out: &mut Vec<Event>) {
        for id in self.bullets.ids() {
            let Some(bullet) = self.bullets.get_mut(id) else {
                continue;
            };
            if bullet.tick(self.clock, dt, &mut self.host) == BulletStatus::Expired {
                self.retire_bullet(id);
                out.push(Event::BulletExpired { bullet: id });
            }
        }
    }

    fn resolve_collisions(&mut self, out: &mut Vec<Event>) {
        let mut notices = std::mem::take(&mut self.notices);
        notices.clear();
        let _ = self.collisions.tick(&self.host, &mut notices);

        let mut struck: Vec<(BulletId, f32)> = Vec::new();
        for notice in &notices {
            match (notice.recipient, notice.other) {
                (EntityKey::Farmer, EntityKey::Rabbit(rabbit)) => self.strike_farmer(rabbit, out),
                (EntityKey::Bullet(bullet), target) => {
                    let Some(entry) = self.bullets.get_mut(bullet) else {
                        continue;
                    };
                    if entry.on_collide(target) {
                        struck.push((bullet, entry.damage()));
                        self.retire_bullet(bullet);
                        out.push(Event::BulletHit { bullet, target });
                    }
                }
                (EntityKey::Rabbit(rabbit), EntityKey::Bullet(bullet)) => {
                    let Some(&(_, damage)) = struck.iter().find(|(id, _)| *id == bullet) else {
                        continue;
                    };
                    self.host.play_cue(AudioCue::RabbitHit);
                    self.dispatch(rabbit, RabbitEvent::Damaged(damage), out);
                }
                _ => {}
            }
        }
        self.notices = notices;
    }

    fn strike_farmer(&mut self, rabbit: RabbitId, out: &mut Vec<Event>) {
        if self.defeated {
            return;
        }
        let Some(agent) = self.scheduler.rabbits.get(rabbit) else {
            return;
        };
        let contact = AttackerContact {
            attacking: agent.is_attacking(),
            damage: agent.damage(),
        };

        let health = match self.farmer.on_collide(contact, self.clock) {
            HitOutcome::Ignored => return,
            HitOutcome::Damaged { health } => health,
            HitOutcome::Defeated => 0.0,
        };
        self.host.play_cue(AudioCue::FarmerHurt);
        self.host.notify(GuiNotice::Health {
            current: health,
            max: self.farmer.max_health(),
        });
        out.push(Event::FarmerDamaged {
            attacker: rabbit,
            health,
        });

        if self.farmer.is_defeated() {
            self.defeated = true;
            info!(
                "farmer defeated in round {} after {:?}",
                self.scheduler.round(),
                self.clock
            );
            out.push(Event::FarmerDefeated);
        }
    }

    fn collect_drops(&mut self, out: &mut Vec<Event>) {
        let collected = self.drops.collect_within(
            self.farmer.position(),
            self.config.player.pickup_radius,
            &mut self.host,
        );
        for drop in collected {
            self.crops.add_seeds(1);
            self.tally.drops_recovered += 1;
            self.host.play_cue(AudioCue::Pickup);
            self.host.notify(GuiNotice::PickupIcon);
            out.push(Event::ResourcePickedUp { drop });
        }
    }

    fn enter_phase(&mut self, change: PhaseChange, out: &mut Vec<Event>) {
        out.push(Event::PhaseChanged {
            phase: change.phase,
            round: change.round,
            duration: change.duration,
        });
        self.host.play_cue(AudioCue::PhaseStart);
        self.host.notify(GuiNotice::PhaseBanner {
            phase: change.phase,
            round: change.round,
        });

        if change.phase != Phase::Fortify {
            return;
        }
        self.tally.rounds_survived += 1;
        self.broadcast(RabbitEvent::Retreat, out);
        for id in self.scheduler.burrows.ids() {
            if let Some(mut burrow) = self.scheduler.burrows.remove(id) {
                let _ = burrow.dispose(&mut self.host);
                out.push(Event::BurrowClosed { burrow: id });
            }
        }

        let health = self.farmer.heal(self.config.player.heal_per_round);
        self.host.notify(GuiNotice::Health {
            current: health,
            max: self.farmer.max_health(),
        });
        self.crops.add_seeds(self.config.crops.seeds_per_round);
    }

    fn spawn_bullet(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        spec: BulletSpec,
        out: &mut Vec<Event>,
    ) {
        let id = self.bullets.allocate();
        let bullet = Bullet::spawn(
            id,
            origin,
            direction,
            spec,
            self.clock,
            &mut self.host,
            &mut self.collisions,
        );
        out.push(Event::BulletFired {
            bullet: id,
            position: origin,
            direction: bullet.direction(),
        });
        self.bullets.insert(id, bullet);
        self.tally.bullets_fired += 1;
    }

    fn retire_bullet(&mut self, id: BulletId) {
        if let Some(mut bullet) = self.bullets.remove(id) {
            let _ = bullet.dispose(&mut self.collisions, &mut self.host);
        }
    }

    fn broadcast(&mut self, event: RabbitEvent, out: &mut Vec<Event>) {
        for id in self.scheduler.rabbits.ids() {
            self.dispatch(id, event, out);
        }
    }

    fn dispatch(&mut self, rabbit: RabbitId, event: RabbitEvent, out: &mut Vec<Event>) {
        let Some(agent) = self.scheduler.rabbits.get_mut(rabbit) else {
            return;
        };
        agent.handle(event, &mut self.host, &mut self.collisions, &mut self.signals);
        self.route_signals(rabbit, out);
    }

    fn route_signals(&mut self, rabbit: RabbitId, out: &mut Vec<Event>) {
        let mut signals = std::mem::take(&mut self.signals);
        for signal in signals.drain(..) {
            match signal {
                RabbitSignal::StateChanged(state) => {
                    out.push(Event::RabbitStateChanged { rabbit, state });
                }
                RabbitSignal::Stole(crop) => {
                    self.tally.crops_stolen += 1;
                    out.push(Event::ResourceStolen { crop, rabbit });
                }
                RabbitSignal::Died { drop_at } => {
                    let Some(kind) = self.scheduler.rabbits.get(rabbit).map(RabbitAgent::kind)
                    else {
                        continue;
                    };
                    self.tally.rabbits_killed += 1;
                    self.host.play_cue(AudioCue::RabbitDeath);
                    out.push(Event::RabbitDied { rabbit, kind });
                    if let Some(position) = drop_at {
                        let drop = self.drops.drop_at(position, &mut self.host);
                        out.push(Event::ResourceDropped { drop, position });
                    }
                }
                RabbitSignal::ReachedBurrow { carrying_resource } => {
                    self.release_rabbit(rabbit);
                    self.tally.rabbits_escaped += 1;
                    if carrying_resource {
                        self.tally.crops_lost += 1;
                    }
                    out.push(Event::RabbitEscaped {
                        rabbit,
                        carrying_resource,
                    });
                }
                RabbitSignal::Decayed => {
                    self.release_rabbit(rabbit);
                    out.push(Event::RabbitDecayed { rabbit });
                }
            }
        }
        self.signals = signals;
    }

    fn release_rabbit(&mut self, rabbit: RabbitId) {
        if let Some(mut agent) = self.scheduler.rabbits.remove(rabbit) {
            let _ = agent.dispose(&mut self.collisions, &mut self.host);
            debug!("rabbit {} released", rabbit.get());
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Once [`Event::FarmerDefeated`] has been emitted every further command is ignored.
pub fn apply<H: Host>(world: &mut World<H>, command: Command, out_events: &mut Vec<Event>) {
    if world.defeated {
        return;
    }
    match command {
        Command::Tick { dt } => {
            if world.paused {
                return;
            }
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
            world.tick(dt, out_events);
        }
        Command::FireWeapon { direction } => {
            if world.paused || direction.length_squared() <= f32::EPSILON {
                return;
            }
            match world.farmer.fire(world.clock) {
                Some(spec) => {
                    let origin = world.farmer.position();
                    world.spawn_bullet(origin, direction, spec, out_events);
                    world.host.play_cue(AudioCue::Shot);
                }
                None => out_events.push(Event::WeaponCoolingDown),
            }
        }
        Command::MoveFarmer { position } => {
            world.farmer.move_to(position, &mut world.host);
        }
        Command::PlaceFence { position } => {
            if world.scheduler.phase() != Phase::Fortify {
                out_events.push(Event::FenceRejected {
                    reason: PlacementError::InvalidPhase,
                });
                return;
            }
            let fence = world
                .fences
                .place(position, &mut world.host, &mut world.collisions);
            out_events.push(Event::FencePlaced { fence, position });
        }
        Command::PlantCrop { position } => {
            if world.scheduler.phase() != Phase::Fortify {
                out_events.push(Event::CropRejected {
                    reason: PlacementError::InvalidPhase,
                });
                return;
            }
            match world.crops.plant_seed(position, &mut world.host) {
                Ok(crop) => out_events.push(Event::CropPlanted { crop, position }),
                Err(reason) => out_events.push(Event::CropRejected { reason }),
            }
        }
        Command::CommandRetreat => world.broadcast(RabbitEvent::Retreat, out_events),
        Command::SetPaused { paused } => {
            if world.paused == paused {
                return;
            }
            world.paused = paused;
            world.broadcast(RabbitEvent::SetDisabled(paused), out_events);
        }
    }
}

fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Counters describing a session so far.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSummary {
    /// Current round.
    pub round: u32,
    /// Current phase.
    pub phase: Phase,
    /// Simulated time in seconds.
    pub elapsed_secs: f32,
    /// Defend phases completed.
    pub rounds_survived: u32,
    /// Rabbits that emerged from burrows.
    pub rabbits_spawned: u32,
    /// Rabbits shot dead.
    pub rabbits_killed: u32,
    /// Rabbits that made it home.
    pub rabbits_escaped: u32,
    /// Crops taken from the field.
    pub crops_stolen: u32,
    /// Crops carried all the way home.
    pub crops_lost: u32,
    /// Crops still growing.
    pub crops_remaining: usize,
    /// Dropped crops the farmer picked up again.
    pub drops_recovered: u32,
    /// Bullets fired by the farmer and by burrows.
    pub bullets_fired: u32,
    /// Farmer health.
    pub farmer_health: f32,
    /// Whether the session ended with the farmer's defeat.
    pub defeated: bool,
}

/// Snapshot of one rabbit for adapters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RabbitView {
    /// Identifier of the rabbit.
    pub id: RabbitId,
    /// Behaviour variant.
    pub kind: BehaviorKind,
    /// State machine state.
    pub state: RabbitState,
    /// Current health.
    pub health: f32,
    /// Current position.
    pub position: Vec3,
    /// Whether it carries a stolen crop.
    pub carrying_resource: bool,
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use garden_defence_core::{BulletId, Host, Phase, RabbitState};
    use glam::Vec3;

    use super::{Bullet, RabbitView, RoundScheduler, SessionSummary, World};

    /// Reports the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner<H>(world: &World<H>) -> &'static str {
        world.banner
    }

    /// Simulated time elapsed since the session started.
    #[must_use]
    pub fn clock<H>(world: &World<H>) -> Duration {
        world.clock
    }

    /// Round and phase clock.
    #[must_use]
    pub fn scheduler<H>(world: &World<H>) -> &RoundScheduler {
        &world.scheduler
    }

    /// Current phase.
    #[must_use]
    pub fn phase<H>(world: &World<H>) -> Phase {
        world.scheduler.phase()
    }

    /// Current round.
    #[must_use]
    pub fn round<H>(world: &World<H>) -> u32 {
        world.scheduler.round()
    }

    /// Whether the farmer has been defeated.
    #[must_use]
    pub fn is_defeated<H>(world: &World<H>) -> bool {
        world.defeated
    }

    /// Whether the simulation is paused.
    #[must_use]
    pub fn is_paused<H>(world: &World<H>) -> bool {
        world.paused
    }

    /// Farmer position.
    #[must_use]
    pub fn farmer_position<H>(world: &World<H>) -> Vec3 {
        world.farmer.position()
    }

    /// Farmer health.
    #[must_use]
    pub fn farmer_health<H>(world: &World<H>) -> f32 {
        world.farmer.health()
    }

    /// Seeds available for planting.
    #[must_use]
    pub fn seeds<H>(world: &World<H>) -> u32 {
        world.crops.seeds()
    }

    /// Crops still in the field.
    #[must_use]
    pub fn crop_count<H>(world: &World<H>) -> usize {
        world.crops.len()
    }

    /// Dropped crops waiting to be picked up.
    #[must_use]
    pub fn drop_count<H>(world: &World<H>) -> usize {
        world.drops.len()
    }

    /// Fences placed so far.
    #[must_use]
    pub fn fence_count<H>(world: &World<H>) -> usize {
        world.fences.len()
    }

    /// Bullets in flight.
    #[must_use]
    pub fn bullet_count<H>(world: &World<H>) -> usize {
        world.bullets.len()
    }

    /// Position of a bullet still in flight.
    #[must_use]
    pub fn bullet_position<H>(world: &World<H>, bullet: BulletId) -> Option<Vec3> {
        world.bullets.get(bullet).map(Bullet::position)
    }

    /// Live rabbits, in spawn order.
    #[must_use]
    pub fn rabbits<H: Host>(world: &World<H>) -> Vec<RabbitView> {
        world
            .scheduler
            .rabbits
            .values()
            .map(|rabbit| RabbitView {
                id: rabbit.id(),
                kind: rabbit.kind(),
                state: rabbit.state(),
                health: rabbit.health(),
                position: rabbit.position(&world.host),
                carrying_resource: rabbit.carrying_resource(),
            })
            .collect()
    }

    /// Closest rabbit to `from` that is still worth shooting at.
    #[must_use]
    pub fn nearest_target<H: Host>(world: &World<H>, from: Vec3) -> Option<RabbitView> {
        rabbits(world)
            .into_iter()
            .filter(|rabbit| rabbit.state != RabbitState::Death)
            .min_by(|a, b| {
                a.position
                    .distance(from)
                    .total_cmp(&b.position.distance(from))
            })
    }

    /// Session counters.
    #[must_use]
    pub fn summary<H>(world: &World<H>) -> SessionSummary {
        let tally = world.tally;
        SessionSummary {
            round: world.scheduler.round(),
            phase: world.scheduler.phase(),
            elapsed_secs: world.clock.as_secs_f32(),
            rounds_survived: tally.rounds_survived,
            rabbits_spawned: tally.rabbits_spawned,
            rabbits_killed: tally.rabbits_killed,
            rabbits_escaped: tally.rabbits_escaped,
            crops_stolen: tally.crops_stolen,
            crops_lost: tally.crops_lost,
            crops_remaining: world.crops.len(),
            drops_recovered: tally.drops_recovered,
            bullets_fired: tally.bullets_fired,
            farmer_health: world.farmer.health(),
            defeated: world.defeated,
        }
    }

    /// Hosting collaborators, for adapters that render or inspect them.
    #[must_use]
    pub fn host<H>(world: &World<H>) -> &H {
        &world.host
    }
}
