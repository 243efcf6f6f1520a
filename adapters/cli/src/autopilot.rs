use std::time::Duration;

use garden_defence_core::{
    difficulty::{planar_direction, GOLDEN_ANGLE},
    Command, DropId, Event, Host, Phase,
};
use garden_defence_world::{query, World};
use glam::Vec3;

/// Walking speed of the farmer in units per second.
const WALK_SPEED: f32 = 6.0;
/// Spacing between crops planted by the autopilot.
const ROW_SPACING: f32 = 1.5;

/// Scripted farmer used when no player is attached.
///
/// Shoots the closest rabbit in range, walks over to dropped crops and plants
/// every seed during fortify.
#[derive(Debug)]
pub(crate) struct Autopilot {
    home: Vec3,
    range: f32,
    drops: Vec<(DropId, Vec3)>,
    planted: u32,
}

impl Autopilot {
    pub(crate) fn new(home: Vec3, range: f32) -> Self {
        Self {
            home,
            range,
            drops: Vec::new(),
            planted: 0,
        }
    }

    /// Tracks dropped crops announced by the world.
    pub(crate) fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::ResourceDropped { drop, position } => self.drops.push((*drop, *position)),
                Event::ResourcePickedUp { drop } => self.drops.retain(|(id, _)| id != drop),
                _ => {}
            }
        }
    }

    /// Commands for the next frame.
    pub(crate) fn steer<H: Host>(
        &mut self,
        world: &World<H>,
        dt: Duration,
        out: &mut Vec<Command>,
    ) {
        let farmer = query::farmer_position(world);

        if query::phase(world) == Phase::Fortify {
            for _ in 0..query::seeds(world) {
                out.push(Command::PlantCrop {
                    position: self.next_plot(),
                });
            }
        }

        let goal = self.drops.first().map_or(self.home, |(_, position)| *position);
        let offset = goal - farmer;
        if offset.length_squared() > f32::EPSILON {
            let step = offset.clamp_length_max(WALK_SPEED * dt.as_secs_f32());
            out.push(Command::MoveFarmer {
                position: farmer + step,
            });
        }

        if let Some(target) = query::nearest_target(world, farmer) {
            let aim = target.position - farmer;
            if aim.length() <= self.range {
                out.push(Command::FireWeapon { direction: aim });
            }
        }
    }

    fn next_plot(&mut self) -> Vec3 {
        let index = self.planted as f32;
        self.planted = self.planted.wrapping_add(1);
        let radius = ROW_SPACING * (index + 1.0).sqrt();
        self.home + planar_direction(index * GOLDEN_ANGLE) * radius
    }
}
