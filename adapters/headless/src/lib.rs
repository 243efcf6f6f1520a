#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! In-memory host for running the garden simulation without an engine.
//!
//! Scene nodes are points, hit volumes are spheres offset from their node,
//! navigation agents walk in a straight line toward their destination, and
//! clips finish after a fixed duration per clip. Audio cues and GUI notices
//! are recorded so tests and the CLI can inspect them.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use garden_defence_core::{
    AgentId, AudioCue, AudioService, Clip, ClipFinished, GeometryQuery, GuiNotice, GuiService,
    Host, NavigationService, NodeHandle, Prefab, PresentationService, SpawnedPrefab,
    SpawnerService, VolumeHandle,
};
use glam::Vec3;
use log::trace;

/// How long each non-looping clip plays before it reports completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipTimings {
    /// Emerging from the burrow.
    pub spawn: Duration,
    /// Melee strike.
    pub attack: Duration,
    /// Hit reaction.
    pub hit: Duration,
    /// Collapse.
    pub death: Duration,
}

impl ClipTimings {
    /// Every clip completes on the next advance.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            spawn: Duration::ZERO,
            attack: Duration::ZERO,
            hit: Duration::ZERO,
            death: Duration::ZERO,
        }
    }

    const fn length(&self, clip: Clip) -> Duration {
        match clip {
            Clip::Spawn => self.spawn,
            Clip::Attack => self.attack,
            Clip::Hit => self.hit,
            Clip::Death => self.death,
            Clip::Run => Duration::ZERO,
        }
    }
}

impl Default for ClipTimings {
    fn default() -> Self {
        Self {
            spawn: Duration::from_millis(600),
            attack: Duration::from_millis(400),
            hit: Duration::from_millis(300),
            death: Duration::from_secs(1),
        }
    }
}

/// Sphere shape of one named hit volume relative to its node.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Sphere {
    node: NodeHandle,
    offset: Vec3,
    radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Node {
    prefab: Prefab,
    position: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Agent {
    node: NodeHandle,
    speed: f32,
    target: Option<Vec3>,
    velocity: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Playback {
    clip: Clip,
    looping: bool,
    remaining: Duration,
}

const LEFT_POST: Vec3 = Vec3::new(-1.2, 0.0, 0.0);
const RIGHT_POST: Vec3 = Vec3::new(1.2, 0.0, 0.0);

fn shapes(prefab: Prefab) -> &'static [(&'static str, Vec3, f32)] {
    match prefab {
        Prefab::Farmer => &[("default", Vec3::ZERO, 0.6)],
        Prefab::Attacker => &[("default", Vec3::ZERO, 0.5), ("weapon", Vec3::ZERO, 0.7)],
        Prefab::Gatherer => &[("default", Vec3::ZERO, 0.5)],
        Prefab::Bullet => &[("default", Vec3::ZERO, 0.15)],
        Prefab::Fence => &[
            ("default", Vec3::ZERO, 1.0),
            ("post_left", LEFT_POST, 0.3),
            ("post_right", RIGHT_POST, 0.3),
        ],
        Prefab::Burrow | Prefab::Crop | Prefab::ResourceDrop => &[],
    }
}

/// Deterministic stand-in for every collaborator the world needs.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    timings: ClipTimings,
    next_node: u64,
    next_volume: u64,
    next_agent: u64,
    nodes: BTreeMap<NodeHandle, Node>,
    volumes: BTreeMap<VolumeHandle, Sphere>,
    agents: BTreeMap<AgentId, Agent>,
    playback: BTreeMap<NodeHandle, Playback>,
    paused: BTreeSet<NodeHandle>,
    finished: Vec<ClipFinished>,
    cues: Vec<AudioCue>,
    notices: Vec<GuiNotice>,
}

impl HeadlessHost {
    /// Creates a host with default clip timings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a host with the provided clip timings.
    #[must_use]
    pub fn with_timings(timings: ClipTimings) -> Self {
        Self {
            timings,
            ..Self::default()
        }
    }

    /// Immediately finishes the non-looping clip playing on `node`.
    ///
    /// Returns the clip that finished, if any.
    pub fn complete(&mut self, node: NodeHandle) -> Option<Clip> {
        let playback = self.playback.get(&node).copied()?;
        if playback.looping {
            return None;
        }
        let _ = self.playback.remove(&node);
        self.finished.push(ClipFinished {
            node,
            clip: playback.clip,
        });
        Some(playback.clip)
    }

    /// Queues a completion regardless of what is playing, as a late engine callback would.
    pub fn inject_finished(&mut self, node: NodeHandle, clip: Clip) {
        self.finished.push(ClipFinished { node, clip });
    }

    /// Clip currently playing on `node`.
    #[must_use]
    pub fn playing(&self, node: NodeHandle) -> Option<Clip> {
        self.playback.get(&node).map(|playback| playback.clip)
    }

    /// Whether playback on `node` is paused.
    #[must_use]
    pub fn is_paused(&self, node: NodeHandle) -> bool {
        self.paused.contains(&node)
    }

    /// Destination of `agent`, if it exists and has one.
    #[must_use]
    pub fn destination(&self, agent: AgentId) -> Option<Vec3> {
        self.agents.get(&agent).and_then(|agent| agent.target)
    }

    /// Cruising speed of `agent`, if it exists.
    #[must_use]
    pub fn speed(&self, agent: AgentId) -> Option<f32> {
        self.agents.get(&agent).map(|agent| agent.speed)
    }

    /// Number of live navigation agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Number of live scene nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live nodes instantiated from `prefab`.
    #[must_use]
    pub fn count(&self, prefab: Prefab) -> usize {
        self.nodes
            .values()
            .filter(|node| node.prefab == prefab)
            .count()
    }

    /// Number of live hit volumes.
    #[must_use]
    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    /// Audio cues requested so far.
    #[must_use]
    pub fn cues(&self) -> &[AudioCue] {
        &self.cues
    }

    /// GUI notices posted so far.
    #[must_use]
    pub fn notices(&self) -> &[GuiNotice] {
        &self.notices
    }

    fn sphere_centre(&self, sphere: &Sphere) -> Option<Vec3> {
        self.nodes
            .get(&sphere.node)
            .map(|node| node.position + sphere.offset)
    }

    fn step_agents(&mut self, seconds: f32) {
        for agent in self.agents.values_mut() {
            if self.paused.contains(&agent.node) {
                agent.velocity = Vec3::ZERO;
                continue;
            }
            let Some(node) = self.nodes.get_mut(&agent.node) else {
                continue;
            };
            let Some(target) = agent.target else {
                agent.velocity = Vec3::ZERO;
                continue;
            };
            let offset = target - node.position;
            let distance = offset.length();
            let stride = agent.speed * seconds;
            if distance <= stride || distance <= f32::EPSILON {
                node.position = target;
                agent.velocity = Vec3::ZERO;
            } else {
                let direction = offset / distance;
                node.position += direction * stride;
                agent.velocity = direction * agent.speed;
            }
        }
    }

    fn step_playback(&mut self, dt: Duration) {
        let mut done = Vec::new();
        for (node, playback) in &mut self.playback {
            if playback.looping || self.paused.contains(node) {
                continue;
            }
            playback.remaining = playback.remaining.saturating_sub(dt);
            if playback.remaining.is_zero() {
                done.push(ClipFinished {
                    node: *node,
                    clip: playback.clip,
                });
            }
        }
        for finished in done {
            let _ = self.playback.remove(&finished.node);
            trace!("clip {:?} finished on node {}", finished.clip, finished.node.get());
            self.finished.push(finished);
        }
    }
}

impl NavigationService for HeadlessHost {
    fn add_agent(&mut self, position: Vec3, speed: f32, movable: NodeHandle) -> AgentId {
        let agent = AgentId::new(self.next_agent);
        self.next_agent += 1;
        if let Some(node) = self.nodes.get_mut(&movable) {
            node.position = position;
        }
        let _ = self.agents.insert(
            agent,
            Agent {
                node: movable,
                speed,
                target: None,
                velocity: Vec3::ZERO,
            },
        );
        agent
    }

    fn remove_agent(&mut self, agent: AgentId) {
        let _ = self.agents.remove(&agent);
    }

    fn go_to(&mut self, agent: AgentId, target: Vec3) {
        if let Some(agent) = self.agents.get_mut(&agent) {
            agent.target = Some(target);
        }
    }

    fn update_speed(&mut self, agent: AgentId, speed: f32) {
        if let Some(agent) = self.agents.get_mut(&agent) {
            agent.speed = speed;
        }
    }

    fn velocity(&self, agent: AgentId) -> Option<Vec3> {
        self.agents.get(&agent).map(|agent| agent.velocity)
    }
}

impl PresentationService for HeadlessHost {
    fn play(&mut self, node: NodeHandle, clip: Clip, looping: bool) {
        if !self.nodes.contains_key(&node) {
            return;
        }
        self.finished.retain(|finished| finished.node != node);
        let _ = self.playback.insert(
            node,
            Playback {
                clip,
                looping,
                remaining: self.timings.length(clip),
            },
        );
    }

    fn pause(&mut self, node: NodeHandle, paused: bool) {
        if paused {
            let _ = self.paused.insert(node);
        } else {
            let _ = self.paused.remove(&node);
        }
    }

    fn drain_finished(&mut self, out: &mut Vec<ClipFinished>) {
        out.append(&mut self.finished);
    }
}

impl SpawnerService for HeadlessHost {
    fn instantiate(&mut self, prefab: Prefab, position: Vec3) -> SpawnedPrefab {
        let root = NodeHandle::new(self.next_node);
        self.next_node += 1;
        let _ = self.nodes.insert(root, Node { prefab, position });

        let mut hit_volumes = Vec::new();
        for (name, offset, radius) in shapes(prefab) {
            let volume = VolumeHandle::new(self.next_volume);
            self.next_volume += 1;
            let _ = self.volumes.insert(
                volume,
                Sphere {
                    node: root,
                    offset: *offset,
                    radius: *radius,
                },
            );
            hit_volumes.push(((*name).to_owned(), volume));
        }
        SpawnedPrefab { root, hit_volumes }
    }

    fn set_position(&mut self, node: NodeHandle, position: Vec3) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.position = position;
        }
    }

    fn position(&self, node: NodeHandle) -> Option<Vec3> {
        self.nodes.get(&node).map(|node| node.position)
    }

    fn despawn(&mut self, node: NodeHandle) {
        if self.nodes.remove(&node).is_none() {
            return;
        }
        self.volumes.retain(|_, sphere| sphere.node != node);
        self.agents.retain(|_, agent| agent.node != node);
        let _ = self.playback.remove(&node);
        let _ = self.paused.remove(&node);
        self.finished.retain(|finished| finished.node != node);
    }
}

impl GeometryQuery for HeadlessHost {
    fn intersects(&self, a: VolumeHandle, b: VolumeHandle) -> bool {
        let (Some(first), Some(second)) = (self.volumes.get(&a), self.volumes.get(&b)) else {
            return false;
        };
        let (Some(first_centre), Some(second_centre)) =
            (self.sphere_centre(first), self.sphere_centre(second))
        else {
            return false;
        };
        first_centre.distance(second_centre) <= first.radius + second.radius
    }
}

impl AudioService for HeadlessHost {
    fn play_cue(&mut self, cue: AudioCue) {
        self.cues.push(cue);
    }
}

impl GuiService for HeadlessHost {
    fn notify(&mut self, notice: GuiNotice) {
        self.notices.push(notice);
    }
}

impl Host for HeadlessHost {
    fn advance(&mut self, dt: Duration) {
        self.step_agents(dt.as_secs_f32());
        self.step_playback(dt);
    }
}
