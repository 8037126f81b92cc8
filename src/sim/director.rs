//! Enemy director
//!
//! Converts elapsed time into spawns: a fractional budget accumulates every
//! step and each whole unit buys one enemy. Elites, chests and bosses run on
//! their own schedules.

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;
use rand_pcg::Pcg32;

use super::events::GameEvent;
use super::state::{EnemyKind, GameState};
use crate::tuning::Tuning;

/// Chest placement ring around the player
const CHEST_MIN_DISTANCE: f32 = 180.0;
const CHEST_MAX_DISTANCE: f32 = 320.0;
/// Elite placement ring, as fractions of the view width
const ELITE_RING: (f32, f32) = (0.65, 0.85);
/// Boss spawn distance as a multiple of the larger half extent
const BOSS_DISTANCE_FACTOR: f32 = 1.2;
/// Initial spitter shot delay range
const SPITTER_FIRST_SHOT: (f32, f32) = (0.4, 1.1);

/// Spawn scheduler state
#[derive(Debug, Clone, PartialEq)]
pub struct Director {
    budget: f32,
    next_elite: f32,
    next_chest: f32,
    next_boss: usize,
    boss_alive: bool,
}

impl Director {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            budget: 0.0,
            next_elite: tuning.elite_first_secs,
            next_chest: tuning.chest_first_secs,
            next_boss: 0,
            boss_alive: false,
        }
    }

    /// Add budget and return how many whole spawns it buys.
    /// The fractional remainder carries over.
    pub fn drain_budget(&mut self, amount: f32) -> u32 {
        if amount.is_finite() && amount > 0.0 {
            self.budget += amount;
        }
        let mut spawns = 0;
        while self.budget >= 1.0 {
            self.budget -= 1.0;
            spawns += 1;
        }
        spawns
    }

    pub fn budget(&self) -> f32 {
        self.budget
    }

    pub fn next_elite(&self) -> f32 {
        self.next_elite
    }

    pub fn next_chest(&self) -> f32 {
        self.next_chest
    }

    /// Index of the next boss checkpoint
    pub fn next_boss(&self) -> usize {
        self.next_boss
    }

    pub fn boss_alive(&self) -> bool {
        self.boss_alive
    }

    pub fn mark_boss_alive(&mut self) {
        self.boss_alive = true;
    }

    pub fn boss_defeated(&mut self) {
        self.boss_alive = false;
    }

    /// Whether a boss should spawn at `time`
    fn boss_due(&self, time: f32, checkpoints: &[f32]) -> bool {
        !self.boss_alive
            && checkpoints
                .get(self.next_boss)
                .is_some_and(|&checkpoint| time >= checkpoint)
    }
}

/// Difficulty scalar at elapsed `time`
pub fn difficulty_at(time: f32, period: f32) -> f32 {
    if period <= 0.0 {
        return 1.0;
    }
    1.0 + time.max(0.0) / period
}

/// Enemy kinds eligible at elapsed `time`. Duplicates weight the draw.
pub fn enemy_pool(time: f32) -> Vec<EnemyKind> {
    let mut pool = vec![EnemyKind::Grunt, EnemyKind::Runner];
    if time > 40.0 {
        pool.push(EnemyKind::Tank);
    }
    if time > 75.0 {
        pool.push(EnemyKind::Spitter);
    }
    if time > 105.0 {
        pool.extend([EnemyKind::Tank, EnemyKind::Runner]);
    }
    if time > 140.0 {
        pool.extend([EnemyKind::Spitter, EnemyKind::Tank]);
    }
    pool
}

/// A point just outside one of the four viewport edges around `center`
pub fn edge_spawn_point(rng: &mut Pcg32, center: Vec2, half_extents: Vec2, padding: f32) -> Vec2 {
    let hw = half_extents.x.max(1.0);
    let hh = half_extents.y.max(1.0);
    let offset = match rng.random_range(0..4) {
        0 => Vec2::new(rng.random_range(-hw..hw), -hh - padding),
        1 => Vec2::new(hw + padding, rng.random_range(-hh..hh)),
        2 => Vec2::new(rng.random_range(-hw..hw), hh + padding),
        _ => Vec2::new(-hw - padding, rng.random_range(-hh..hh)),
    };
    center + offset
}

/// Spawn scale for regular enemies at `difficulty`
pub fn spawn_scale(difficulty: f32) -> f32 {
    1.0 + 0.12 * (difficulty - 1.0)
}

/// Run the director for one step
pub fn run_director(state: &mut GameState, dt: f32) {
    let rate = state.tuning.spawn_base + state.difficulty * state.tuning.spawn_per_difficulty;
    let spawns = state.director.drain_budget(rate * dt);

    let pool = enemy_pool(state.time);
    let scale = spawn_scale(state.difficulty);
    for _ in 0..spawns {
        if state.enemies.len() >= state.tuning.max_enemies {
            continue;
        }
        let Some(&kind) = pool.choose(&mut state.rng) else {
            break;
        };
        let pos = edge_spawn_point(
            &mut state.rng,
            state.player.pos,
            state.view_half_extents,
            state.tuning.spawn_padding,
        );
        state.spawn_enemy(kind, pos, scale);
        if kind == EnemyKind::Spitter {
            let delay = state
                .rng
                .random_range(SPITTER_FIRST_SHOT.0..SPITTER_FIRST_SHOT.1);
            if let Some(enemy) = state.enemies.last_mut() {
                enemy.shot_cooldown = delay;
            }
        }
    }

    if state.time >= state.director.next_elite {
        spawn_elite(state);
    }

    if state.time >= state.director.next_chest {
        spawn_chest(state);
    }

    if state
        .director
        .boss_due(state.time, &state.tuning.boss_checkpoints)
    {
        spawn_boss(state);
    }
}

fn spawn_elite(state: &mut GameState) {
    let angle = state.rng.random_range(0.0..std::f32::consts::TAU);
    let width = state.view_half_extents.x * 2.0;
    let distance = state
        .rng
        .random_range(width * ELITE_RING.0..=width * ELITE_RING.1);
    let pos = state.player.pos + crate::polar_to_cartesian(distance, angle);
    state.spawn_enemy(EnemyKind::Elite, pos, 1.0 + 0.05 * state.difficulty);

    state.director.next_elite += state.tuning.elite_interval.max(1.0);

    state.events.pop_text("ELITE!", state.player.pos - Vec2::new(0.0, 90.0));
    state.events.push(GameEvent::EliteSpawned { pos });
    log::debug!("Elite spawned at {:.1}s", state.time);
}

fn spawn_chest(state: &mut GameState) {
    let angle = state.rng.random_range(0.0..std::f32::consts::TAU);
    let distance = state
        .rng
        .random_range(CHEST_MIN_DISTANCE..CHEST_MAX_DISTANCE);
    let pos = state.player.pos + crate::polar_to_cartesian(distance, angle);
    state.spawn_enemy(EnemyKind::Chest, pos, 1.0);

    let (lo, hi) = state.tuning.chest_interval;
    let delay = if hi > lo {
        state.rng.random_range(lo..hi)
    } else {
        lo.max(1.0)
    };
    state.director.next_chest = state.time + delay;

    state.events.pop_text("CHEST!", pos - Vec2::new(0.0, 30.0));
    state.events.push(GameEvent::ChestSpawned { pos });
    log::info!("Chest spawned at {:.1}s, next at {:.1}s", state.time, state.director.next_chest);
}

fn spawn_boss(state: &mut GameState) {
    let angle = state.rng.random_range(0.0..std::f32::consts::TAU);
    let distance = state.view_half_extents.max_element() * BOSS_DISTANCE_FACTOR;
    let pos = state.player.pos + crate::polar_to_cartesian(distance, angle);
    state.spawn_enemy(EnemyKind::Boss, pos, 1.0 + 0.05 * state.difficulty);

    state.director.next_boss += 1;
    state.director.mark_boss_alive();

    state.events.pop_text("BOSS!", state.player.pos - Vec2::new(0.0, 80.0));
    state.events.push(GameEvent::BossSpawned { pos });
    state.effects.add_shake(8.0);
    log::info!(
        "Boss {} spawned at {:.1}s",
        state.director.next_boss,
        state.time
    );
}
