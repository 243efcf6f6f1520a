use std::collections::HashSet;

use garden_defence_core::{
    BulletId, Category, EntityKey, FenceId, GeometryQuery, RabbitId, VolumeHandle,
};
use garden_defence_system_collision::{
    Collidable, CollisionManager, CollisionNotice, HitVolumes, WEAPON_VOLUME,
};

#[derive(Default)]
struct PairGeometry {
    overlapping: HashSet<(u64, u64)>,
    queries: std::cell::Cell<usize>,
}

impl PairGeometry {
    fn overlap(&mut self, a: u64, b: u64) {
        let _ = self.overlapping.insert((a.min(b), a.max(b)));
    }
}

impl GeometryQuery for PairGeometry {
    fn intersects(&self, a: VolumeHandle, b: VolumeHandle) -> bool {
        self.queries.set(self.queries.get() + 1);
        let (a, b) = (a.get(), b.get());
        self.overlapping.contains(&(a.min(b), a.max(b)))
    }
}

fn volumes(pairs: &[(&str, u64)]) -> HitVolumes {
    let named: Vec<_> = pairs
        .iter()
        .map(|(name, id)| ((*name).to_owned(), VolumeHandle::new(*id)))
        .collect();
    HitVolumes::from_spawned(&named).expect("volumes")
}

fn rabbit(id: u32) -> EntityKey {
    EntityKey::Rabbit(RabbitId::new(id))
}

fn bullet(id: u32) -> EntityKey {
    EntityKey::Bullet(BulletId::new(id))
}

#[test]
fn environment_hit_takes_precedence_over_enemy_hit() {
    let mut manager = CollisionManager::new();
    let mut geometry = PairGeometry::default();

    let _bullet = Collidable::register(
        bullet(0),
        Category::Bullet,
        volumes(&[("default", 1)]),
        &mut manager,
    );
    let _fence = Collidable::register(
        EntityKey::Fence(FenceId::new(0)),
        Category::Environment,
        volumes(&[("default", 10), ("post_left", 11)]),
        &mut manager,
    );
    let _enemy = Collidable::register(
        rabbit(0),
        Category::Enemy,
        volumes(&[("default", 20)]),
        &mut manager,
    );
    geometry.overlap(1, 11);
    geometry.overlap(1, 20);

    let mut notices = Vec::new();
    let produced = manager.tick(&geometry, &mut notices);

    assert_eq!(produced, 1);
    assert_eq!(
        notices,
        vec![CollisionNotice {
            recipient: bullet(0),
            other: EntityKey::Fence(FenceId::new(0)),
            other_category: Category::Environment,
        }],
        "only the environment collision may fire"
    );
}

#[test]
fn bullet_enemy_hit_notifies_both_sides_once() {
    let mut manager = CollisionManager::new();
    let mut geometry = PairGeometry::default();

    let _bullet = Collidable::register(
        bullet(3),
        Category::Bullet,
        volumes(&[("default", 1)]),
        &mut manager,
    );
    for (id, volume) in [(0, 20), (1, 21)] {
        let _ = Collidable::register(
            rabbit(id),
            Category::Enemy,
            volumes(&[("default", volume)]),
            &mut manager,
        );
    }
    geometry.overlap(1, 20);
    geometry.overlap(1, 21);

    let mut notices = Vec::new();
    let _ = manager.tick(&geometry, &mut notices);

    assert_eq!(
        notices,
        vec![
            CollisionNotice {
                recipient: bullet(3),
                other: rabbit(0),
                other_category: Category::Enemy,
            },
            CollisionNotice {
                recipient: rabbit(0),
                other: bullet(3),
                other_category: Category::Bullet,
            },
        ],
        "first enemy in registration order wins"
    );
}

#[test]
fn every_enemy_weapon_is_tested_against_the_player() {
    let mut manager = CollisionManager::new();
    let mut geometry = PairGeometry::default();

    let _player = Collidable::register(
        EntityKey::Farmer,
        Category::Player,
        volumes(&[("default", 1)]),
        &mut manager,
    );
    let _gatherer = Collidable::register(
        rabbit(0),
        Category::Enemy,
        volumes(&[("default", 30)]),
        &mut manager,
    );
    let _first = Collidable::register(
        rabbit(1),
        Category::Enemy,
        volumes(&[("default", 40), (WEAPON_VOLUME, 41)]),
        &mut manager,
    );
    let _second = Collidable::register(
        rabbit(2),
        Category::Enemy,
        volumes(&[("default", 50), (WEAPON_VOLUME, 51)]),
        &mut manager,
    );
    geometry.overlap(1, 30);
    geometry.overlap(1, 40);
    geometry.overlap(1, 51);

    let mut notices = Vec::new();
    let _ = manager.tick(&geometry, &mut notices);

    assert_eq!(
        notices,
        vec![CollisionNotice {
            recipient: EntityKey::Farmer,
            other: rabbit(2),
            other_category: Category::Enemy,
        }],
        "only weapon volumes strike the player and the enemy is not notified"
    );
}

#[test]
fn deregistration_is_idempotent_and_removes_from_scans() {
    let mut manager = CollisionManager::new();
    let mut geometry = PairGeometry::default();

    let _bullet = Collidable::register(
        bullet(0),
        Category::Bullet,
        volumes(&[("default", 1)]),
        &mut manager,
    );
    let mut enemy = Collidable::register(
        rabbit(0),
        Category::Enemy,
        volumes(&[("default", 2)]),
        &mut manager,
    );
    geometry.overlap(1, 2);

    assert!(enemy.deregister(&mut manager));
    assert!(!enemy.deregister(&mut manager), "second removal is a no-op");
    assert!(!manager.deregister(Category::Enemy, rabbit(0)));
    assert!(!manager.contains(Category::Enemy, rabbit(0)));

    let mut notices = Vec::new();
    assert_eq!(manager.tick(&geometry, &mut notices), 0);
    assert!(notices.is_empty());
    assert_eq!(manager.len(Category::Enemy), 0);
}

#[test]
fn removal_between_detection_and_dispatch_does_not_disturb_next_tick() {
    let mut manager = CollisionManager::new();
    let mut geometry = PairGeometry::default();

    let mut first = Collidable::register(
        bullet(0),
        Category::Bullet,
        volumes(&[("default", 1)]),
        &mut manager,
    );
    let _second = Collidable::register(
        bullet(1),
        Category::Bullet,
        volumes(&[("default", 2)]),
        &mut manager,
    );
    let _enemy = Collidable::register(
        rabbit(0),
        Category::Enemy,
        volumes(&[("default", 3)]),
        &mut manager,
    );
    geometry.overlap(1, 3);
    geometry.overlap(2, 3);

    let mut notices = Vec::new();
    let _ = manager.tick(&geometry, &mut notices);
    assert_eq!(notices.len(), 4);

    for notice in &notices {
        if notice.recipient == bullet(0) {
            let _ = first.deregister(&mut manager);
        }
    }

    notices.clear();
    let _ = manager.tick(&geometry, &mut notices);
    assert_eq!(
        notices.iter().filter(|n| n.recipient == bullet(1)).count(),
        1
    );
    assert!(notices.iter().all(|n| n.recipient != bullet(0)));
}

#[test]
fn empty_manager_ticks_without_queries() {
    let mut manager = CollisionManager::new();
    let geometry = PairGeometry::default();
    let mut notices = Vec::new();
    assert_eq!(manager.tick(&geometry, &mut notices), 0);
    assert_eq!(geometry.queries.get(), 0);
    assert!(manager.is_empty());
}
