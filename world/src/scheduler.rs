//! Round and phase clock that owns the live burrows and rabbits.

use std::time::Duration;

use garden_defence_core::{difficulty::difficulty_modifier, BurrowId, Phase, RabbitId, RoundConfig};
use garden_defence_system_rabbits::RabbitAgent;
use log::info;

use crate::{burrow::Burrow, registry::Registry};

/// A phase transition produced by [`RoundScheduler::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseChange {
    /// Phase that became active.
    pub phase: Phase,
    /// Round the phase belongs to.
    pub round: u32,
    /// Length of the new phase.
    pub duration: Duration,
}

/// Alternates fortify and defend phases and tracks the difficulty of the round.
///
/// The session starts in fortify of round one with the initial countdown. The
/// round number only increments when a defend phase completes.
#[derive(Debug)]
pub struct RoundScheduler {
    config: RoundConfig,
    round: u32,
    phase: Phase,
    phase_remaining: Duration,
    burrow_timer: Duration,
    difficulty_modifier: f32,
    pub(crate) burrows: Registry<BurrowId, Burrow>,
    pub(crate) rabbits: Registry<RabbitId, RabbitAgent>,
}

impl RoundScheduler {
    /// Creates the scheduler in fortify of round one.
    #[must_use]
    pub fn new(config: RoundConfig) -> Self {
        Self {
            config,
            round: 1,
            phase: Phase::Fortify,
            phase_remaining: config.initial_countdown(),
            burrow_timer: Duration::ZERO,
            difficulty_modifier: difficulty_modifier(1, config.difficulty_step),
            burrows: Registry::new(),
            rabbits: Registry::new(),
        }
    }

    /// Counts down the phase timer and switches phase when it runs out.
    ///
    /// At most one transition happens per call and the new phase always starts
    /// with its full duration; time left over from the old phase is discarded.
    pub fn advance(&mut self, dt: Duration) -> Option<PhaseChange> {
        self.phase_remaining = self.phase_remaining.saturating_sub(dt);
        if !self.phase_remaining.is_zero() {
            return None;
        }

        match self.phase {
            Phase::Fortify => {
                self.phase = Phase::Defend;
                self.phase_remaining = self.config.defend();
            }
            Phase::Defend => {
                self.round = self.round.saturating_add(1);
                self.difficulty_modifier =
                    difficulty_modifier(self.round, self.config.difficulty_step);
                self.phase = Phase::Fortify;
                self.phase_remaining = self.config.fortify();
            }
        }
        self.burrow_timer = Duration::ZERO;
        info!(
            "round {} {:?} for {:?} (difficulty {:.2})",
            self.round, self.phase, self.phase_remaining, self.difficulty_modifier
        );

        Some(PhaseChange {
            phase: self.phase,
            round: self.round,
            duration: self.phase_remaining,
        })
    }

    /// Number of burrows that should open this frame. Always zero outside defend.
    pub fn burrows_due(&mut self, dt: Duration) -> u32 {
        let frequency = self.config.burrow_spawn_frequency();
        if self.phase != Phase::Defend || frequency.is_zero() {
            return 0;
        }
        self.burrow_timer = self.burrow_timer.saturating_add(dt);
        let mut due = 0;
        while self.burrow_timer >= frequency {
            self.burrow_timer -= frequency;
            due += 1;
        }
        due
    }

    /// Current round number, starting at one.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Time left in the current phase.
    #[must_use]
    pub const fn phase_remaining(&self) -> Duration {
        self.phase_remaining
    }

    /// Modifier applied to every rabbit spawned this round.
    #[must_use]
    pub const fn difficulty_modifier(&self) -> f32 {
        self.difficulty_modifier
    }

    /// Number of live burrows.
    #[must_use]
    pub fn burrow_count(&self) -> usize {
        self.burrows.len()
    }

    /// Number of live rabbits.
    #[must_use]
    pub fn rabbit_count(&self) -> usize {
        self.rabbits.len()
    }
}
