//! Tuning records loaded once at session start.
//!
//! Every record implements [`Default`] with the stock tuning and deserialises
//! with `#[serde(default)]`, so a TOML file only has to mention the values it
//! overrides. Durations are written as seconds and exposed as [`Duration`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a [`GameConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse game config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A range has its bounds inverted.
    #[error("range `{name}` has min {min} greater than max {max}")]
    InvertedRange {
        /// Dotted path of the offending range.
        name: &'static str,
        /// Lower bound that was provided.
        min: f32,
        /// Upper bound that was provided.
        max: f32,
    },
    /// A value that must be strictly positive was zero or negative.
    #[error("`{name}` must be positive, got {value}")]
    NotPositive {
        /// Dotted path of the offending value.
        name: &'static str,
        /// Value that was provided.
        value: f32,
    },
    /// A value, or a time derived from it, is not finite or does not fit a [`Duration`].
    #[error("`{name}` must be finite and fit a duration, got {value}")]
    OutOfRange {
        /// Dotted path of the offending value.
        name: &'static str,
        /// Value that was provided.
        value: f32,
    },
}

/// Inclusive numeric range sampled by the random source.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeConfig {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

impl RangeConfig {
    /// Creates a new range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        finite(name, self.min)?;
        finite(name, self.max)?;
        if self.min > self.max {
            return Err(ConfigError::InvertedRange {
                name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Whether burrows emit rabbits or, in the reduced test configuration, bullets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnMode {
    /// Burrows emit rabbits.
    #[default]
    Rabbits,
    /// Burrows emit outward-radiating bullets.
    Bullets,
}

/// Weapon parameters used when the farmer constructs bullets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponStats {
    /// Damage dealt per bullet.
    pub damage: f32,
    /// Distance a bullet travels before expiring.
    pub range: f32,
    /// Shots per second.
    pub fire_rate: f32,
    /// Bullet speed in world units per second.
    pub bullet_speed: f32,
}

impl WeaponStats {
    /// Minimum time between two shots.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        if self.fire_rate <= 0.0 {
            return Duration::MAX;
        }
        Duration::try_from_secs_f32(1.0 / self.fire_rate).unwrap_or(Duration::MAX)
    }

    /// Time-to-live of a bullet fired with these stats.
    #[must_use]
    pub fn bullet_ttl(&self) -> Duration {
        if self.bullet_speed <= 0.0 {
            return Duration::ZERO;
        }
        secs(self.range / self.bullet_speed)
    }
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self {
            damage: 10.0,
            range: 30.0,
            fire_rate: 4.0,
            bullet_speed: 40.0,
        }
    }
}

/// Base stats of the player character.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Maximum and starting health.
    pub health: f32,
    /// Seconds during which further attacker contact is ignored after a hit.
    pub hit_reaction_window: f32,
    /// Radius within which dropped crops are collected.
    pub pickup_radius: f32,
    /// Health restored on every fortify phase.
    pub heal_per_round: f32,
    /// Weapon used to construct bullets.
    pub weapon: WeaponStats,
}

impl PlayerConfig {
    /// Hit-reaction window as a [`Duration`].
    #[must_use]
    pub fn hit_reaction_window(&self) -> Duration {
        secs(self.hit_reaction_window)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            health: 100.0,
            hit_reaction_window: 0.25,
            pickup_radius: 1.5,
            heal_per_round: 25.0,
            weapon: WeaponStats::default(),
        }
    }
}

/// Base stats of one enemy type before difficulty scaling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyStats {
    /// Base maximum health.
    pub health: f32,
    /// Base damage per strike; ignored by gatherers.
    pub damage: f32,
    /// Base movement speed while active.
    pub speed: f32,
    /// Movement speed while retreating.
    pub retreat_speed: f32,
    /// Attack range for attackers, gather distance for gatherers.
    pub reach: f32,
    /// Distance to the spawn position at which a retreat completes.
    pub arrival_threshold: f32,
    /// Seconds the remains linger after the death presentation.
    pub decay: f32,
}

impl EnemyStats {
    /// Decay duration as a [`Duration`].
    #[must_use]
    pub fn decay(&self) -> Duration {
        secs(self.decay)
    }

    /// Stock attacker tuning.
    #[must_use]
    pub const fn attacker() -> Self {
        Self {
            health: 30.0,
            damage: 10.0,
            speed: 3.5,
            retreat_speed: 5.0,
            reach: 1.2,
            arrival_threshold: 0.5,
            decay: 5.0,
        }
    }

    /// Stock gatherer tuning.
    #[must_use]
    pub const fn gatherer() -> Self {
        Self {
            health: 30.0,
            damage: 0.0,
            speed: 3.0,
            retreat_speed: 4.0,
            reach: 0.8,
            arrival_threshold: 0.5,
            decay: 5.0,
        }
    }
}

impl Default for EnemyStats {
    fn default() -> Self {
        Self::attacker()
    }
}

/// Round timing constants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Length of the first fortify countdown.
    pub initial_countdown: f32,
    /// Length of every later fortify phase.
    pub fortify: f32,
    /// Length of every defend phase.
    pub defend: f32,
    /// Seconds between burrow openings during defend.
    pub burrow_spawn_frequency: f32,
    /// Difficulty modifier gained per survived round.
    pub difficulty_step: f32,
}

impl RoundConfig {
    /// First fortify countdown as a [`Duration`].
    #[must_use]
    pub fn initial_countdown(&self) -> Duration {
        secs(self.initial_countdown)
    }

    /// Fortify length as a [`Duration`].
    #[must_use]
    pub fn fortify(&self) -> Duration {
        secs(self.fortify)
    }

    /// Defend length as a [`Duration`].
    #[must_use]
    pub fn defend(&self) -> Duration {
        secs(self.defend)
    }

    /// Burrow opening cadence as a [`Duration`].
    #[must_use]
    pub fn burrow_spawn_frequency(&self) -> Duration {
        secs(self.burrow_spawn_frequency)
    }
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            initial_countdown: 5.0,
            fortify: 30.0,
            defend: 120.0,
            burrow_spawn_frequency: 15.0,
            difficulty_step: 0.1,
        }
    }
}

/// Burrow placement and cadence ranges.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurrowConfig {
    /// Seconds between two emissions of one burrow.
    pub spawn_frequency: RangeConfig,
    /// Lifespan of one burrow in seconds.
    pub time_limit: RangeConfig,
    /// Distance from the garden centre at which burrows open.
    pub spawn_radius: RangeConfig,
    /// Probability that an emitted rabbit is an attacker.
    pub attacker_share: f32,
    /// What burrows emit.
    pub spawn_mode: SpawnMode,
}

impl Default for BurrowConfig {
    fn default() -> Self {
        Self {
            spawn_frequency: RangeConfig::new(2.0, 5.0),
            time_limit: RangeConfig::new(20.0, 40.0),
            spawn_radius: RangeConfig::new(18.0, 25.0),
            attacker_share: 0.6,
            spawn_mode: SpawnMode::Rabbits,
        }
    }
}

/// Crop field seeding.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Crops planted at session start.
    pub initial_count: u32,
    /// Radius of the ring the initial crops are planted on.
    pub field_radius: f32,
    /// Seeds granted on every fortify phase.
    pub seeds_per_round: u32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            initial_count: 8,
            field_radius: 6.0,
            seeds_per_round: 3,
        }
    }
}

/// Complete tuning for one game session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Player base stats.
    pub player: PlayerConfig,
    /// Attacker base stats.
    pub attacker: EnemyStats,
    /// Gatherer base stats.
    #[serde(default = "EnemyStats::gatherer")]
    pub gatherer: EnemyStats,
    /// Round timing constants.
    pub rounds: RoundConfig,
    /// Burrow ranges.
    pub burrows: BurrowConfig,
    /// Crop field seeding.
    pub crops: CropConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            attacker: EnemyStats::attacker(),
            gatherer: EnemyStats::gatherer(),
            rounds: RoundConfig::default(),
            burrows: BurrowConfig::default(),
            crops: CropConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects inverted ranges, non-positive cadences and times that do not fit a [`Duration`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.burrows
            .spawn_frequency
            .validate("burrows.spawn_frequency")?;
        self.burrows.time_limit.validate("burrows.time_limit")?;
        self.burrows.spawn_radius.validate("burrows.spawn_radius")?;
        positive(
            "burrows.spawn_frequency.min",
            self.burrows.spawn_frequency.min,
        )?;
        positive("rounds.defend", self.rounds.defend)?;
        positive("rounds.fortify", self.rounds.fortify)?;
        positive(
            "rounds.burrow_spawn_frequency",
            self.rounds.burrow_spawn_frequency,
        )?;
        positive("player.health", self.player.health)?;
        let weapon = &self.player.weapon;
        finite("player.weapon.damage", weapon.damage)?;
        positive("player.weapon.fire_rate", weapon.fire_rate)?;
        duration("player.weapon.fire_rate", 1.0 / weapon.fire_rate)?;
        positive("player.weapon.bullet_speed", weapon.bullet_speed)?;
        finite("player.weapon.bullet_speed", weapon.bullet_speed)?;
        finite("player.weapon.range", weapon.range)?;
        duration("player.weapon.range", weapon.range / weapon.bullet_speed)?;

        duration(
            "burrows.spawn_frequency.max",
            self.burrows.spawn_frequency.max,
        )?;
        duration("burrows.time_limit.max", self.burrows.time_limit.max)?;
        duration("rounds.initial_countdown", self.rounds.initial_countdown)?;
        duration("rounds.fortify", self.rounds.fortify)?;
        duration("rounds.defend", self.rounds.defend)?;
        duration(
            "rounds.burrow_spawn_frequency",
            self.rounds.burrow_spawn_frequency,
        )?;
        duration(
            "player.hit_reaction_window",
            self.player.hit_reaction_window,
        )?;
        duration("attacker.decay", self.attacker.decay)?;
        duration("gatherer.decay", self.gatherer.decay)?;
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

fn finite(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value })
    }
}

fn duration(name: &'static str, seconds: f32) -> Result<(), ConfigError> {
    finite(name, seconds)?;
    match Duration::try_from_secs_f32(seconds.max(0.0)) {
        Ok(_) => Ok(()),
        Err(_) => Err(ConfigError::OutOfRange {
            name,
            value: seconds,
        }),
    }
}

/// Seconds as a [`Duration`], clamped to zero below and saturating above.
fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::MAX)
}
