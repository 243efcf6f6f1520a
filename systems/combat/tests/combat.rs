use std::collections::BTreeSet;
use std::time::Duration;

use garden_defence_core::{
    BulletId, Category, EntityKey, NodeHandle, PlayerConfig, Prefab, RabbitId, SpawnedPrefab,
    SpawnerService,
};
use garden_defence_headless::HeadlessHost;
use garden_defence_system_collision::CollisionManager;
use garden_defence_system_combat::{
    position_at, AttackerContact, Bullet, BulletSpec, BulletStatus, Farmer, HitOutcome,
};
use glam::Vec3;

const STRIKE: AttackerContact = AttackerContact {
    attacking: true,
    damage: 10.0,
};

/// Host whose prefabs carry no hit volumes.
#[derive(Default)]
struct BareHost {
    next: u64,
    live: BTreeSet<NodeHandle>,
}

impl SpawnerService for BareHost {
    fn instantiate(&mut self, _prefab: Prefab, _position: Vec3) -> SpawnedPrefab {
        let root = NodeHandle::new(self.next);
        self.next += 1;
        let _ = self.live.insert(root);
        SpawnedPrefab {
            root,
            hit_volumes: Vec::new(),
        }
    }

    fn set_position(&mut self, _node: NodeHandle, _position: Vec3) {}

    fn position(&self, node: NodeHandle) -> Option<Vec3> {
        self.live.contains(&node).then_some(Vec3::ZERO)
    }

    fn despawn(&mut self, node: NodeHandle) {
        let _ = self.live.remove(&node);
    }
}

fn spec(ttl_ms: u64) -> BulletSpec {
    BulletSpec {
        speed: 10.0,
        damage: 10.0,
        ttl: Duration::from_millis(ttl_ms),
    }
}

#[test]
fn bullet_follows_a_straight_line_until_it_expires() {
    let mut host = HeadlessHost::new();
    let mut collisions = CollisionManager::new();
    let origin = Vec3::new(1.0, 0.0, -2.0);
    let direction = Vec3::new(0.0, 0.0, 2.0);
    let mut bullet = Bullet::spawn(
        BulletId::new(0),
        origin,
        direction,
        spec(500),
        Duration::ZERO,
        &mut host,
        &mut collisions,
    );
    assert_eq!(bullet.direction(), Vec3::Z, "direction is normalised");
    assert_eq!(collisions.len(Category::Bullet), 1);

    let dt = Duration::from_millis(100);
    let mut now = Duration::ZERO;
    let mut flying_ticks = 0;
    loop {
        now += dt;
        match bullet.tick(now, dt, &mut host) {
            BulletStatus::Flying => flying_ticks += 1,
            BulletStatus::Expired => break,
        }
        let expected = position_at(origin, Vec3::Z, 10.0, now);
        assert!(
            bullet.position().distance(expected) < 1e-4,
            "bullet drifted at {now:?}"
        );
    }

    assert_eq!(now, bullet.expires_at());
    assert_eq!(flying_ticks, 4, "no tick runs at or beyond the expiry");
}

#[test]
fn bullet_stays_at_its_origin_during_the_tick_it_was_spawned_in() {
    let mut host = HeadlessHost::new();
    let mut collisions = CollisionManager::new();
    let origin = Vec3::new(0.0, 0.0, 3.0);
    let spawned_at = Duration::from_millis(960);
    let mut bullet = Bullet::spawn(
        BulletId::new(3),
        origin,
        Vec3::X,
        spec(1_000),
        spawned_at,
        &mut host,
        &mut collisions,
    );
    let dt = Duration::from_millis(16);

    assert_eq!(bullet.tick(spawned_at, dt, &mut host), BulletStatus::Flying);
    assert_eq!(bullet.position(), origin, "no motion before the bullet existed");

    let mut now = spawned_at;
    for _ in 0..5 {
        now += dt;
        assert_eq!(bullet.tick(now, dt, &mut host), BulletStatus::Flying);
    }
    let expected = position_at(origin, Vec3::X, 10.0, now - bullet.spawned_at());
    assert!(
        bullet.position().distance(expected) < 1e-4,
        "expected {expected}, got {}",
        bullet.position()
    );
}

#[test]
fn bullet_resolves_only_its_first_collision() {
    let mut host = HeadlessHost::new();
    let mut collisions = CollisionManager::new();
    let mut bullet = Bullet::spawn(
        BulletId::new(1),
        Vec3::ZERO,
        Vec3::X,
        spec(1_000),
        Duration::ZERO,
        &mut host,
        &mut collisions,
    );

    assert!(bullet.on_collide(EntityKey::Rabbit(RabbitId::new(0))));
    assert!(!bullet.on_collide(EntityKey::Rabbit(RabbitId::new(1))));
}

#[test]
fn disposing_twice_touches_host_and_manager_once() {
    let mut host = HeadlessHost::new();
    let mut collisions = CollisionManager::new();
    let mut bullet = Bullet::spawn(
        BulletId::new(2),
        Vec3::ZERO,
        Vec3::X,
        spec(1_000),
        Duration::ZERO,
        &mut host,
        &mut collisions,
    );
    let other = host.instantiate(Prefab::Crop, Vec3::ONE);

    assert!(bullet.dispose(&mut collisions, &mut host));
    assert!(!bullet.dispose(&mut collisions, &mut host));
    assert!(collisions.is_empty());
    assert_eq!(host.node_count(), 1);
    assert_eq!(host.position(other.root), Some(Vec3::ONE));
    assert_eq!(
        bullet.tick(Duration::ZERO, Duration::from_millis(16), &mut host),
        BulletStatus::Expired
    );
}

#[test]
fn farmer_hit_reaction_window_blocks_rapid_strikes() {
    let mut host = HeadlessHost::new();
    let mut collisions = CollisionManager::new();
    let mut farmer = Farmer::spawn(
        &PlayerConfig::default(),
        Vec3::ZERO,
        &mut host,
        &mut collisions,
    );

    assert_eq!(
        farmer.on_collide(STRIKE, Duration::ZERO),
        HitOutcome::Damaged { health: 90.0 }
    );
    assert_eq!(
        farmer.on_collide(STRIKE, Duration::from_millis(100)),
        HitOutcome::Ignored,
        "still inside the 0.25s window"
    );
    assert_eq!(
        farmer.on_collide(STRIKE, Duration::from_millis(300)),
        HitOutcome::Damaged { health: 80.0 }
    );
    assert!((farmer.health() - 80.0).abs() < f32::EPSILON);
}

#[test]
fn idle_enemies_do_not_hurt_the_farmer() {
    let mut host = HeadlessHost::new();
    let mut collisions = CollisionManager::new();
    let mut farmer = Farmer::spawn(
        &PlayerConfig::default(),
        Vec3::ZERO,
        &mut host,
        &mut collisions,
    );
    let idle = AttackerContact {
        attacking: false,
        damage: 50.0,
    };
    assert_eq!(farmer.on_collide(idle, Duration::ZERO), HitOutcome::Ignored);
    assert_eq!(
        farmer.on_collide(STRIKE, Duration::from_millis(1)),
        HitOutcome::Damaged { health: 90.0 },
        "ignored contacts do not open a hit window"
    );
}

#[test]
fn farmer_is_defeated_when_health_reaches_zero() {
    let mut host = HeadlessHost::new();
    let mut collisions = CollisionManager::new();
    let config = PlayerConfig {
        health: 15.0,
        ..PlayerConfig::default()
    };
    let mut farmer = Farmer::spawn(&config, Vec3::ZERO, &mut host, &mut collisions);

    let _ = farmer.on_collide(STRIKE, Duration::ZERO);
    assert_eq!(
        farmer.on_collide(STRIKE, Duration::from_secs(1)),
        HitOutcome::Defeated
    );
    assert_eq!(farmer.health(), 0.0);
    assert_eq!(
        farmer.on_collide(STRIKE, Duration::from_secs(2)),
        HitOutcome::Ignored
    );
    assert_eq!(farmer.heal(50.0), 0.0, "defeated farmers cannot be healed");
    assert!(farmer.fire(Duration::from_secs(3)).is_none());
}

#[test]
fn weapon_cooldown_follows_fire_rate() {
    let mut host = HeadlessHost::new();
    let mut collisions = CollisionManager::new();
    let mut farmer = Farmer::spawn(
        &PlayerConfig::default(),
        Vec3::ZERO,
        &mut host,
        &mut collisions,
    );

    assert!(farmer.fire(Duration::ZERO).is_some());
    assert!(farmer.fire(Duration::from_millis(200)).is_none());
    let shot = farmer.fire(Duration::from_millis(250)).expect("cooled down");
    assert_eq!(shot, BulletSpec::from_weapon(farmer.weapon()));
}

#[test]
fn healing_is_capped_at_maximum() {
    let mut host = HeadlessHost::new();
    let mut collisions = CollisionManager::new();
    let mut farmer = Farmer::spawn(
        &PlayerConfig::default(),
        Vec3::ZERO,
        &mut host,
        &mut collisions,
    );
    let _ = farmer.on_collide(STRIKE, Duration::ZERO);
    assert!((farmer.heal(5.0) - 95.0).abs() < f32::EPSILON);
    assert!((farmer.heal(500.0) - farmer.max_health()).abs() < f32::EPSILON);
}

#[test]
fn moving_the_farmer_moves_its_node() {
    let mut host = HeadlessHost::new();
    let mut collisions = CollisionManager::new();
    let mut farmer = Farmer::spawn(
        &PlayerConfig::default(),
        Vec3::ZERO,
        &mut host,
        &mut collisions,
    );
    let target = Vec3::new(3.0, 0.0, 4.0);
    farmer.move_to(target, &mut host);
    assert_eq!(farmer.position(), target);
    assert_eq!(host.count(Prefab::Farmer), 1);

    assert!(farmer.dispose(&mut collisions, &mut host));
    assert!(!farmer.dispose(&mut collisions, &mut host));
    assert_eq!(host.node_count(), 0);
    assert!(collisions.is_empty());
}

#[test]
fn farmer_without_hit_volumes_still_releases_its_node() {
    let mut host = BareHost::default();
    let mut collisions = CollisionManager::new();
    let mut farmer = Farmer::spawn(
        &PlayerConfig::default(),
        Vec3::ZERO,
        &mut host,
        &mut collisions,
    );
    assert!(collisions.is_empty(), "nothing to register without volumes");
    assert_eq!(host.live.len(), 1);

    assert!(farmer.dispose(&mut collisions, &mut host));
    assert!(host.live.is_empty(), "node despawned without a collidable");
    assert!(!farmer.dispose(&mut collisions, &mut host));
}
