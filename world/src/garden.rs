//! Crops, dropped crops and fences: the parts of the garden the farmer tends.

use garden_defence_core::{
    difficulty::planar_direction, difficulty::GOLDEN_ANGLE, Category, CropId, DropId, EntityKey,
    FenceId, NodeHandle, PlacementError, Prefab, SpawnerService,
};
use garden_defence_system_collision::{Collidable, CollisionManager, HitVolumes};
use garden_defence_system_rabbits::Harvest;
use glam::Vec3;

use crate::registry::Registry;

#[derive(Debug)]
struct Planted {
    node: NodeHandle,
    position: Vec3,
}

/// Harvestable crops and the seed budget for planting more.
///
/// Gatherers take crops through [`Harvest`] while the host is borrowed
/// elsewhere, so taken crops queue their nodes until [`CropField::flush`].
#[derive(Debug)]
pub(crate) struct CropField {
    crops: Registry<CropId, Planted>,
    seeds: u32,
    harvested: Vec<NodeHandle>,
}

impl CropField {
    pub(crate) fn new(seeds: u32) -> Self {
        Self {
            crops: Registry::new(),
            seeds,
            harvested: Vec::new(),
        }
    }

    /// Plants `count` crops on a sunflower spiral of the given radius.
    pub(crate) fn sow<H>(&mut self, count: u32, radius: f32, host: &mut H)
    where
        H: SpawnerService + ?Sized,
    {
        for index in 0..count {
            let fraction = ((index as f32 + 0.5) / count as f32).sqrt();
            let position = planar_direction(index as f32 * GOLDEN_ANGLE) * radius * fraction;
            let _ = self.plant(position, host);
        }
    }

    pub(crate) fn plant<H>(&mut self, position: Vec3, host: &mut H) -> CropId
    where
        H: SpawnerService + ?Sized,
    {
        let id = self.crops.allocate();
        let spawned = host.instantiate(Prefab::Crop, position);
        self.crops.insert(
            id,
            Planted {
                node: spawned.root,
                position,
            },
        );
        id
    }

    /// Spends one seed on a new crop.
    pub(crate) fn plant_seed<H>(
        &mut self,
        position: Vec3,
        host: &mut H,
    ) -> Result<CropId, PlacementError>
    where
        H: SpawnerService + ?Sized,
    {
        if self.seeds == 0 {
            return Err(PlacementError::NoSeeds);
        }
        self.seeds -= 1;
        Ok(self.plant(position, host))
    }

    pub(crate) fn add_seeds(&mut self, seeds: u32) {
        self.seeds = self.seeds.saturating_add(seeds);
    }

    /// Despawns the nodes of crops taken since the last flush.
    pub(crate) fn flush<H>(&mut self, host: &mut H)
    where
        H: SpawnerService + ?Sized,
    {
        for node in self.harvested.drain(..) {
            host.despawn(node);
        }
    }

    pub(crate) fn clear<H>(&mut self, host: &mut H)
    where
        H: SpawnerService + ?Sized,
    {
        for crop in self.crops.drain() {
            host.despawn(crop.node);
        }
        self.flush(host);
    }

    pub(crate) const fn seeds(&self) -> u32 {
        self.seeds
    }

    pub(crate) fn len(&self) -> usize {
        self.crops.len()
    }
}

impl Harvest for CropField {
    fn nearest(&self, from: Vec3) -> Option<(CropId, Vec3)> {
        self.crops
            .ids()
            .into_iter()
            .filter_map(|id| self.crops.get(id).map(|crop| (id, crop.position)))
            .min_by(|a, b| a.1.distance(from).total_cmp(&b.1.distance(from)))
    }

    fn take(&mut self, crop: CropId) -> bool {
        match self.crops.remove(crop) {
            Some(planted) => {
                self.harvested.push(planted.node);
                true
            }
            None => false,
        }
    }
}

/// Crops dropped by gatherers that died while carrying one.
#[derive(Debug)]
pub(crate) struct Drops {
    drops: Registry<DropId, Planted>,
}

impl Drops {
    pub(crate) fn new() -> Self {
        Self {
            drops: Registry::new(),
        }
    }

    pub(crate) fn drop_at<H>(&mut self, position: Vec3, host: &mut H) -> DropId
    where
        H: SpawnerService + ?Sized,
    {
        let id = self.drops.allocate();
        let spawned = host.instantiate(Prefab::ResourceDrop, position);
        self.drops.insert(
            id,
            Planted {
                node: spawned.root,
                position,
            },
        );
        id
    }

    /// Removes and despawns every drop within `radius` of `center`.
    pub(crate) fn collect_within<H>(
        &mut self,
        center: Vec3,
        radius: f32,
        host: &mut H,
    ) -> Vec<DropId>
    where
        H: SpawnerService + ?Sized,
    {
        let mut collected = Vec::new();
        for id in self.drops.ids() {
            let within = self
                .drops
                .get(id)
                .is_some_and(|drop| drop.position.distance(center) <= radius);
            if !within {
                continue;
            }
            if let Some(drop) = self.drops.remove(id) {
                host.despawn(drop.node);
                collected.push(id);
            }
        }
        collected
    }

    pub(crate) fn clear<H>(&mut self, host: &mut H)
    where
        H: SpawnerService + ?Sized,
    {
        for drop in self.drops.drain() {
            host.despawn(drop.node);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.drops.len()
    }
}

#[derive(Debug)]
struct Fence {
    node: NodeHandle,
    collidable: Option<Collidable>,
}

/// Fences placed during the fortify phase. Bullets stop on them.
#[derive(Debug)]
pub(crate) struct Fences {
    fences: Registry<FenceId, Fence>,
}

impl Fences {
    pub(crate) fn new() -> Self {
        Self {
            fences: Registry::new(),
        }
    }

    pub(crate) fn place<H>(
        &mut self,
        position: Vec3,
        host: &mut H,
        collisions: &mut CollisionManager,
    ) -> FenceId
    where
        H: SpawnerService + ?Sized,
    {
        let id = self.fences.allocate();
        let spawned = host.instantiate(Prefab::Fence, position);
        let collidable = HitVolumes::from_spawned(&spawned.hit_volumes).map(|volumes| {
            Collidable::register(EntityKey::Fence(id), Category::Environment, volumes, collisions)
        });
        self.fences.insert(
            id,
            Fence {
                node: spawned.root,
                collidable,
            },
        );
        id
    }

    pub(crate) fn clear<H>(&mut self, host: &mut H, collisions: &mut CollisionManager)
    where
        H: SpawnerService + ?Sized,
    {
        for mut fence in self.fences.drain() {
            if let Some(collidable) = fence.collidable.as_mut() {
                let _ = collidable.deregister(collisions);
            }
            host.despawn(fence.node);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.fences.len()
    }
}
