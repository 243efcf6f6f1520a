use std::{collections::BTreeMap, time::Duration};

use garden_defence_core::{
    difficulty::GOLDEN_ANGLE, BulletId, BurrowId, Command, Event, GameConfig, RabbitState,
    RangeConfig, SpawnMode,
};
use garden_defence_headless::HeadlessHost;
use garden_defence_world::{self as world, query, World};
use glam::Vec3;

const FRAME: Duration = Duration::from_millis(10);

fn tick(world: &mut World<HeadlessHost>) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt: FRAME }, &mut events);
    events
}

fn fired(events: &[Event]) -> Option<(BulletId, Vec3, Vec3)> {
    events.iter().find_map(|event| match *event {
        Event::BulletFired {
            bullet,
            position,
            direction,
        } => Some((bullet, position, direction)),
        _ => None,
    })
}

fn assert_travelled(
    world: &World<HeadlessHost>,
    (bullet, origin, direction): (BulletId, Vec3, Vec3),
    speed: f32,
    frames: u32,
) {
    let expected = origin + direction * speed * (FRAME * frames).as_secs_f32();
    let actual = query::bullet_position(world, bullet).expect("bullet still in flight");
    assert!(
        actual.distance(expected) < 1e-3,
        "after {frames} frames expected {expected}, got {actual}"
    );
}

#[test]
fn farmer_bullets_travel_from_their_origin_at_weapon_speed() {
    let mut config = GameConfig::default();
    config.crops.initial_count = 0;
    let speed = config.player.weapon.bullet_speed;
    let mut world = World::new(config, 4, HeadlessHost::new());
    let _ = tick(&mut world);

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::FireWeapon {
            direction: Vec3::new(3.0, 0.0, 4.0),
        },
        &mut events,
    );
    let shot = fired(&events).expect("farmer fired");
    assert!((shot.2 - Vec3::new(0.6, 0.0, 0.8)).length() < 1e-5);

    for frames in 1..=20 {
        let _ = tick(&mut world);
        assert_travelled(&world, shot, speed, frames);
    }
}

#[test]
fn burrow_bullets_start_moving_the_frame_after_they_appear() {
    let mut config = GameConfig::default();
    config.crops.initial_count = 0;
    config.rounds.initial_countdown = 0.1;
    config.rounds.burrow_spawn_frequency = 1.0;
    config.burrows.spawn_mode = SpawnMode::Bullets;
    config.burrows.spawn_frequency = RangeConfig::new(0.5, 0.5);
    config.burrows.time_limit = RangeConfig::new(5.0, 5.0);
    let speed = config.player.weapon.bullet_speed;
    let mut world = World::new(config, 8, HeadlessHost::new());

    let shot = (0..500)
        .find_map(|_| fired(&tick(&mut world)))
        .expect("a burrow emitted a bullet");
    assert_travelled(&world, shot, speed, 0);

    for frames in 1..=20 {
        let _ = tick(&mut world);
        assert_travelled(&world, shot, speed, frames);
    }
}

#[test]
fn burrow_emits_five_times_then_closes_after_its_time_limit() {
    let mut config = GameConfig::default();
    config.rounds.initial_countdown = 1.0;
    config.rounds.burrow_spawn_frequency = 1.0;
    config.burrows.spawn_mode = SpawnMode::Bullets;
    config.burrows.spawn_frequency = RangeConfig::new(2.0, 2.0);
    config.burrows.time_limit = RangeConfig::new(10.0, 10.0);
    let mut world = World::new(config, 11, HeadlessHost::new());

    let first = BurrowId::new(0);
    let mut opened: Option<(u32, Vec3)> = None;
    let mut emitted = Vec::new();
    let mut closed = None;
    let mut directions = Vec::new();

    for frame in 1..=1_500u32 {
        for event in tick(&mut world) {
            match event {
                Event::BurrowOpened { burrow, position } if burrow == first => {
                    opened = Some((frame, position));
                }
                Event::BulletFired {
                    position,
                    direction,
                    ..
                } => {
                    directions.push(direction);
                    if opened.is_some_and(|(_, at)| at == position) {
                        emitted.push(frame);
                    }
                }
                Event::BurrowClosed { burrow } if burrow == first => closed = Some(frame),
                _ => {}
            }
        }
    }

    let (opened_at, _) = opened.expect("first burrow opened");
    let offsets: Vec<u32> = emitted.iter().map(|frame| frame - opened_at).collect();
    assert_eq!(offsets, vec![200, 400, 600, 800, 1_000], "one emission every 2s");
    assert_eq!(closed, Some(opened_at + 1_000), "closed exactly 10s after opening");

    let turn = directions[0].dot(directions[1]);
    assert!(
        (turn - GOLDEN_ANGLE.cos()).abs() < 1e-4,
        "consecutive bullets rotate by the golden angle"
    );
}

#[test]
fn gatherer_shot_while_carrying_drops_a_crop_the_farmer_can_recover() {
    let mut config = GameConfig::default();
    config.rounds.initial_countdown = 0.5;
    config.rounds.burrow_spawn_frequency = 30.0;
    config.burrows.attacker_share = 0.0;
    config.burrows.spawn_frequency = RangeConfig::new(1.0, 1.0);
    config.burrows.time_limit = RangeConfig::new(1.0, 1.0);
    config.crops.initial_count = 1;
    config.crops.field_radius = 0.0;
    let mut world = World::new(config, 3, HeadlessHost::new());
    let seeds = query::seeds(&world);

    let mut stolen = false;
    let mut dropped = None;
    for _ in 0..6_000 {
        for event in tick(&mut world) {
            match event {
                Event::ResourceStolen { .. } => stolen = true,
                Event::ResourceDropped { position, .. } => dropped = Some(position),
                _ => {}
            }
        }
        if dropped.is_some() {
            break;
        }
        if !stolen {
            continue;
        }
        let farmer = query::farmer_position(&world);
        let carrier = query::rabbits(&world)
            .into_iter()
            .find(|rabbit| rabbit.carrying_resource && rabbit.state != RabbitState::Death);
        if let Some(carrier) = carrier {
            let mut events = Vec::new();
            world::apply(
                &mut world,
                Command::FireWeapon {
                    direction: carrier.position - farmer,
                },
                &mut events,
            );
        }
    }

    let position = dropped.expect("carrier was shot down");
    assert_eq!(query::crop_count(&world), 0);
    assert_eq!(query::drop_count(&world), 1);

    let mut events = Vec::new();
    world::apply(&mut world, Command::MoveFarmer { position }, &mut events);
    events.extend(tick(&mut world));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::ResourcePickedUp { .. })));
    assert_eq!(query::drop_count(&world), 0);
    assert_eq!(query::seeds(&world), seeds + 1, "a recovered crop returns a seed");

    let summary = query::summary(&world);
    assert_eq!(summary.crops_stolen, 1);
    assert_eq!(summary.rabbits_killed, 1);
    assert_eq!(summary.drops_recovered, 1);
    assert_eq!(summary.crops_lost, 0);
}

#[test]
fn farmer_defeat_is_terminal() {
    let mut config = GameConfig::default();
    config.player.health = 10.0;
    config.rounds.initial_countdown = 0.5;
    config.rounds.burrow_spawn_frequency = 1.0;
    config.burrows.attacker_share = 2.0;
    config.burrows.spawn_radius = RangeConfig::new(3.0, 3.0);
    config.burrows.spawn_frequency = RangeConfig::new(1.0, 1.0);
    config.burrows.time_limit = RangeConfig::new(5.0, 5.0);
    let mut world = World::new(config, 5, HeadlessHost::new());

    let mut defeats = 0;
    for _ in 0..2_000 {
        let events = tick(&mut world);
        defeats += events
            .iter()
            .filter(|event| matches!(event, Event::FarmerDefeated))
            .count();
        if defeats > 0 {
            assert!(events.iter().any(|event| matches!(
                event,
                Event::FarmerDamaged { health, .. } if *health == 0.0
            )));
            break;
        }
    }

    assert_eq!(defeats, 1);
    assert!(query::is_defeated(&world));
    assert!(tick(&mut world).is_empty(), "no frame runs after defeat");
    assert!(query::summary(&world).defeated);
}

#[test]
fn difficulty_is_shared_within_a_round_and_grows_between_rounds() {
    let mut config = GameConfig::default();
    config.rounds.initial_countdown = 0.5;
    config.rounds.defend = 3.0;
    config.rounds.fortify = 0.5;
    config.rounds.burrow_spawn_frequency = 1.0;
    config.rounds.difficulty_step = 0.5;
    config.burrows.attacker_share = 0.0;
    config.burrows.spawn_frequency = RangeConfig::new(1.0, 1.0);
    config.burrows.time_limit = RangeConfig::new(10.0, 10.0);
    let mut world = World::new(config, 9, HeadlessHost::new());

    let mut health_by_round: BTreeMap<u32, Vec<f32>> = BTreeMap::new();
    for _ in 0..750 {
        let round = query::round(&world);
        let events = tick(&mut world);
        let rabbits = query::rabbits(&world);
        for event in events {
            if let Event::RabbitSpawned { rabbit, .. } = event {
                let spawned = rabbits
                    .iter()
                    .find(|view| view.id == rabbit)
                    .expect("fresh rabbit is live");
                health_by_round.entry(round).or_default().push(spawned.health);
            }
        }
    }

    let first = &health_by_round[&1];
    let second = &health_by_round[&2];
    assert!(!first.is_empty() && !second.is_empty());
    assert!(first.iter().all(|health| (health - 30.0).abs() < 1e-4));
    assert!(second.iter().all(|health| (health - 45.0).abs() < 1e-4));
}
