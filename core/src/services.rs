//! Collaborator contracts consumed by the simulation.
//!
//! The simulation never renders, steers, or plays anything itself. It talks to
//! the hosting engine through the traits below. Every call that receives a
//! handle the collaborator no longer knows about must be a silent no-op so
//! that entities can release handles in any order.

use std::time::Duration;

use glam::Vec3;

use crate::{AgentId, Clip, NodeHandle, Phase, VolumeHandle};

/// Crowd steering collaborator.
pub trait NavigationService {
    /// Registers a new agent that moves `movable` and returns its handle.
    fn add_agent(&mut self, position: Vec3, speed: f32, movable: NodeHandle) -> AgentId;

    /// Removes an agent. Unknown handles are ignored.
    fn remove_agent(&mut self, agent: AgentId);

    /// Sets the agent's destination. Unknown handles are ignored.
    fn go_to(&mut self, agent: AgentId, target: Vec3);

    /// Changes the agent's cruising speed. Unknown handles are ignored.
    fn update_speed(&mut self, agent: AgentId, speed: f32);

    /// Current velocity of the agent, if it exists.
    fn velocity(&self, agent: AgentId) -> Option<Vec3>;
}

/// Notification that a non-looping clip finished playing on a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClipFinished {
    /// Node the clip played on.
    pub node: NodeHandle,
    /// Clip that finished.
    pub clip: Clip,
}

/// Animation playback collaborator.
///
/// A non-looping `play` produces exactly one [`ClipFinished`] unless a later
/// `play` on the same node replaces it first, in which case the pending
/// completion is cancelled.
pub trait PresentationService {
    /// Starts playing `clip` on `node`, replacing whatever was playing.
    fn play(&mut self, node: NodeHandle, clip: Clip, looping: bool);

    /// Pauses or resumes playback on `node`.
    fn pause(&mut self, node: NodeHandle, paused: bool);

    /// Moves every completion observed since the last call into `out`.
    fn drain_finished(&mut self, out: &mut Vec<ClipFinished>);
}

/// Prefabs the spawner collaborator knows how to instantiate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Prefab {
    /// Player character with a `default` volume.
    Farmer,
    /// Attacker rabbit with `default` and `weapon` volumes.
    Attacker,
    /// Gatherer rabbit with a `default` volume.
    Gatherer,
    /// Projectile with a `default` volume.
    Bullet,
    /// Burrow mound, no volumes.
    Burrow,
    /// Fence with a `default` rail and several post volumes.
    Fence,
    /// Harvestable crop, no volumes.
    Crop,
    /// Crop dropped by a dying gatherer, no volumes.
    ResourceDrop,
}

/// Result of instantiating a prefab.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnedPrefab {
    /// Root node that carries the transform.
    pub root: NodeHandle,
    /// Named hit volumes attached to the root, in declaration order.
    pub hit_volumes: Vec<(String, VolumeHandle)>,
}

/// Scene instancing collaborator.
pub trait SpawnerService {
    /// Instantiates `prefab` at `position`.
    fn instantiate(&mut self, prefab: Prefab, position: Vec3) -> SpawnedPrefab;

    /// Moves a root node. Unknown handles are ignored.
    fn set_position(&mut self, node: NodeHandle, position: Vec3);

    /// Current position of a root node, if it exists.
    fn position(&self, node: NodeHandle) -> Option<Vec3>;

    /// Destroys a root node and everything attached to it. Unknown handles are ignored.
    fn despawn(&mut self, node: NodeHandle);
}

/// Geometric queries answered by the physics collaborator.
pub trait GeometryQuery {
    /// Whether two hit volumes overlap. Unknown handles never overlap.
    fn intersects(&self, a: VolumeHandle, b: VolumeHandle) -> bool;

    /// Furthest point along the segment `from..to` reachable before blocking geometry.
    fn sweep(&self, from: Vec3, to: Vec3) -> Vec3 {
        let _ = from;
        to
    }
}

/// Audio cues the simulation asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AudioCue {
    /// The farmer fired.
    Shot,
    /// A rabbit was struck.
    RabbitHit,
    /// A rabbit died.
    RabbitDeath,
    /// The farmer was struck.
    FarmerHurt,
    /// A phase started.
    PhaseStart,
    /// A dropped crop was collected.
    Pickup,
}

/// Fire-and-forget audio sink.
pub trait AudioService {
    /// Plays a one-shot cue.
    fn play_cue(&mut self, cue: AudioCue);
}

/// Notices the GUI is told about.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GuiNotice {
    /// The farmer's health bar changed.
    Health {
        /// Current health.
        current: f32,
        /// Maximum health.
        max: f32,
    },
    /// A dropped crop was collected.
    PickupIcon,
    /// A new phase started.
    PhaseBanner {
        /// Phase that started.
        phase: Phase,
        /// Round number.
        round: u32,
    },
}

/// Fire-and-forget GUI sink.
pub trait GuiService {
    /// Posts a notice to the on-screen UI.
    fn notify(&mut self, notice: GuiNotice);
}

/// Everything the world needs from its hosting engine.
pub trait Host:
    NavigationService
    + PresentationService
    + SpawnerService
    + GeometryQuery
    + AudioService
    + GuiService
{
    /// Lets the collaborators advance their own clocks (steering, playback) by `dt`.
    fn advance(&mut self, dt: Duration);
}
