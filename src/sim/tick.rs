//! Per-frame simulation step
//!
//! Order: clock, movement, director, weapons, motion, collisions, pickups,
//! progression, effects, then the run-goal check.

use glam::Vec2;
use rand::Rng;

use super::clock::clamp_dt;
use super::collision::{
    Battlefield, reap_dead_enemies, resolve_blasts, resolve_player_hits,
    resolve_player_projectiles,
};
use super::director::{difficulty_at, edge_spawn_point, run_director};
use super::pickup::update_gems;
use super::progression::gain_xp;
use super::state::{
    BOSS_AURA_INTERVAL, EnemyKind, Faction, GamePhase, GameState, Projectile, ProjectileKind,
    RunOutcome,
};
use super::weapons::{SEEKER_TURN_RATE, Shooter};
use crate::consts::*;
use crate::{direction_or_unit, dist2, polar_to_cartesian, rotate_toward};

const SPIT_DAMAGE: f32 = 10.0;
const SPIT_SPEED: f32 = 300.0;
const SPIT_RADIUS: f32 = 4.0;
const SPIT_LIFE: f32 = 2.0;
/// Spitters aim this far ahead along the player's move direction
const SPIT_LEAD: f32 = 20.0;
const SPIT_INTERVAL: (f32, f32) = (1.2, 2.2);

const AURA_SHARDS: u32 = 12;
const AURA_DAMAGE: f32 = 14.0;
const AURA_SPEED: f32 = 200.0;
const AURA_RADIUS: f32 = 5.0;
const AURA_LIFE: f32 = 3.0;

/// Enemies beyond this many view diagonals get pulled back to the screen edge
const LEASH_DIAGONALS: f32 = 3.0;

/// Autopilot threat radius
const AUTOPILOT_THREAT_RANGE: f32 = 220.0;

/// Input for a single step
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Discrete direction, each axis in {-1, 0, 1}
    pub digital: Vec2,
    /// Stick or touch vector, magnitude at most 1
    pub analog: Vec2,
    /// Visible half extents, if the viewport changed
    pub view_half_extents: Option<Vec2>,
    /// Idle/demo mode - AI steers the player
    pub idle_mode: bool,
}

/// Sum digital and analog input, rescaled so the result never exceeds unit length
pub fn combine_movement(digital: Vec2, analog: Vec2) -> Vec2 {
    let digital = if digital.is_finite() {
        digital.clamp(Vec2::NEG_ONE, Vec2::ONE)
    } else {
        Vec2::ZERO
    };
    let analog = if analog.is_finite() {
        analog.clamp_length_max(1.0)
    } else {
        Vec2::ZERO
    };
    (digital + analog).clamp_length_max(1.0)
}

/// Steer away from nearby enemies, otherwise toward the nearest gem
fn autopilot(state: &GameState) -> Vec2 {
    let pos = state.player.pos;
    let mut away = Vec2::ZERO;
    for enemy in state.enemies.iter().filter(|e| e.is_alive()) {
        if !enemy.kind.deals_contact() {
            continue;
        }
        let offset = pos - enemy.pos;
        let d = offset.length();
        if d < AUTOPILOT_THREAT_RANGE {
            away += direction_or_unit(offset) * (1.0 - d / AUTOPILOT_THREAT_RANGE);
        }
    }
    if away.length_squared() > 0.09 {
        return away.normalize_or_zero();
    }

    state
        .gems
        .iter()
        .min_by(|a, b| dist2(pos, a.pos).total_cmp(&dist2(pos, b.pos)))
        .map(|gem| (gem.pos - pos).normalize_or_zero())
        .unwrap_or(Vec2::ZERO)
}

/// Advance the game state by one step
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    // Only active gameplay advances; every timer freezes otherwise
    if state.phase != GamePhase::Playing {
        return;
    }
    let dt = clamp_dt(dt as f64);

    state.time += dt;
    state.difficulty = difficulty_at(state.time, state.tuning.difficulty_period);

    if let Some(half) = input.view_half_extents {
        if half.is_finite() && half.min_element() > 0.0 {
            state.view_half_extents = half;
        }
    }

    // Movement
    let dir = if input.idle_mode {
        autopilot(state)
    } else {
        combine_movement(input.digital, input.analog)
    };
    state.move_dir = dir;
    let player = &mut state.player;
    player.pos += dir * player.speed * player.mods.movement * dt;
    state.camera += (player.pos - state.camera) * CAMERA_SMOOTHING;

    player.iframes = (player.iframes - dt).max(0.0);
    let regen = player.regen * dt;
    player.heal(regen);

    run_director(state, dt);
    fire_weapons(state, dt);
    move_projectiles(state, dt);
    move_enemies(state, dt);

    // Collisions
    resolve_player_projectiles(state);
    let blasts = state.effects.tick_mines(dt);
    resolve_blasts(state, &blasts);
    resolve_player_hits(state);
    reap_dead_enemies(state);
    if state.is_over() {
        return;
    }
    state.projectiles.retain(Projectile::is_live);

    // Pickups and progression
    let xp = update_gems(state, dt);
    if xp > 0 {
        gain_xp(&mut state.player, &mut state.progression, xp, &mut state.events);
    }
    let offer_size = state.tuning.offer_size;
    if state.progression.resolve_pending(
        &mut state.player,
        &mut state.rng,
        &mut state.events,
        offer_size,
    ) {
        state.phase = GamePhase::ChoosingUpgrade;
    }

    state.effects.update_visuals(dt);

    if state.time >= state.tuning.run_goal_secs {
        state.end_run(RunOutcome::Victory);
    }
}

fn fire_weapons(state: &mut GameState, dt: f32) {
    let shooter = Shooter::from_player(&state.player);
    let GameState {
        player,
        enemies,
        projectiles,
        effects,
        events,
        rng,
        ..
    } = state;
    let mut field = Battlefield {
        enemies,
        projectiles,
        effects,
        events,
        rng,
    };
    player.arsenal.update(dt, &shooter, &mut field);
}

fn move_projectiles(state: &mut GameState, dt: f32) {
    let GameState {
        projectiles,
        enemies,
        ..
    } = state;

    for projectile in projectiles.iter_mut() {
        if let Some(target) = projectile.homing_target {
            match enemies.iter().find(|e| e.id == target && e.is_alive()) {
                Some(enemy) => {
                    projectile.vel = rotate_toward(
                        projectile.vel,
                        enemy.pos - projectile.pos,
                        SEEKER_TURN_RATE * dt,
                    );
                }
                None => projectile.homing_target = None,
            }
        }
        projectile.pos += projectile.vel * dt;
        projectile.life = (projectile.life - dt).max(0.0);
    }
}

fn move_enemies(state: &mut GameState, dt: f32) {
    let GameState {
        enemies,
        projectiles,
        rng,
        player,
        difficulty,
        move_dir,
        view_half_extents,
        tuning,
        ..
    } = state;

    let chase = 0.82 + 0.06 * *difficulty;
    let leash = view_half_extents.length() * 2.0 * LEASH_DIAGONALS;

    for enemy in enemies.iter_mut().filter(|e| e.is_alive()) {
        enemy.tick_timers(dt);
        if enemy.kind == EnemyKind::Chest {
            continue;
        }

        let to_player = player.pos - enemy.pos;
        enemy.pos += direction_or_unit(to_player) * enemy.speed * chase * dt;

        match enemy.kind {
            EnemyKind::Spitter => {
                enemy.shot_cooldown -= dt;
                if enemy.shot_cooldown <= 0.0 {
                    enemy.shot_cooldown = rng.random_range(SPIT_INTERVAL.0..SPIT_INTERVAL.1);
                    let aim = player.pos + *move_dir * SPIT_LEAD;
                    let vel = direction_or_unit(aim - enemy.pos) * SPIT_SPEED;
                    projectiles.push(Projectile::new(
                        Faction::Enemy,
                        ProjectileKind::Spit,
                        enemy.pos,
                        vel,
                        SPIT_RADIUS,
                        SPIT_LIFE,
                        SPIT_DAMAGE,
                        0,
                    ));
                }
            }
            EnemyKind::Boss => {
                enemy.aura_cooldown -= dt;
                if enemy.aura_cooldown <= 0.0 {
                    enemy.aura_cooldown += BOSS_AURA_INTERVAL;
                    for i in 0..AURA_SHARDS {
                        let angle = i as f32 * std::f32::consts::TAU / AURA_SHARDS as f32;
                        projectiles.push(Projectile::new(
                            Faction::Enemy,
                            ProjectileKind::AuraShard,
                            enemy.pos,
                            polar_to_cartesian(AURA_SPEED, angle),
                            AURA_RADIUS,
                            AURA_LIFE,
                            AURA_DAMAGE,
                            0,
                        ));
                    }
                }
            }
            _ => {}
        }

        if leash > 0.0 && dist2(enemy.pos, player.pos) > leash * leash {
            enemy.pos = edge_spawn_point(rng, player.pos, *view_half_extents, tuning.spawn_padding);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MetaProgress;
    use crate::sim::state::Enemy;
    use crate::sim::weapons::{Arsenal, WeaponKind};
    use crate::tuning::Tuning;
    use proptest::prelude::*;

    fn state() -> GameState {
        GameState::new(21, Tuning::default(), MetaProgress::default())
    }

    #[test]
    fn movement_never_exceeds_unit_length() {
        let diag = combine_movement(Vec2::new(1.0, 1.0), Vec2::ZERO);
        assert!((diag.length() - 1.0).abs() < 1e-6);

        let both = combine_movement(Vec2::new(1.0, 0.0), Vec2::new(0.5, 0.0));
        assert!((both - Vec2::X).length() < 1e-6);

        let small = combine_movement(Vec2::ZERO, Vec2::new(0.3, 0.0));
        assert_eq!(small, Vec2::new(0.3, 0.0));

        assert_eq!(combine_movement(Vec2::NAN, Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn player_moves_at_speed() {
        let mut state = state();
        let input = TickInput {
            digital: Vec2::new(1.0, 0.0),
            ..Default::default()
        };
        tick(&mut state, &input, 0.02);
        assert!((state.player.pos.x - 165.0 * 0.02).abs() < 1e-3);
        assert!(state.camera.x > 0.0 && state.camera.x < state.player.pos.x);
    }

    #[test]
    fn stalled_frame_is_clamped() {
        let mut state = state();
        tick(&mut state, &TickInput::default(), 5.0);
        assert!((state.time - MAX_DT).abs() < 1e-6);
    }

    #[test]
    fn paused_state_is_frozen() {
        let mut state = state();
        state.set_paused(true);
        tick(&mut state, &TickInput::default(), 0.016);
        assert_eq!(state.time, 0.0);
        state.set_paused(false);
        tick(&mut state, &TickInput::default(), 0.016);
        assert!(state.time > 0.0);
    }

    #[test]
    fn reaching_goal_wins_and_records_time() {
        let mut tuning = Tuning::default();
        tuning.run_goal_secs = 2.0;
        let mut state = GameState::new(4, tuning, MetaProgress::default());

        let mut steps = 0;
        while !state.is_over() && steps < 200 {
            tick(&mut state, &TickInput::default(), 0.033);
            if state.phase == GamePhase::ChoosingUpgrade {
                state.choose_upgrade(0);
            }
            steps += 1;
        }
        assert!(state.player.is_alive());
        assert_eq!(state.outcome, Some(RunOutcome::Victory));
        assert_eq!(state.meta.last_time, 2);
        assert_eq!(state.meta.best_time, 2);
    }

    #[test]
    fn spitter_leads_its_shot() {
        let mut state = state();
        state.move_dir = Vec2::new(0.0, 1.0);
        state.spawn_enemy(EnemyKind::Spitter, Vec2::new(200.0, 0.0), 1.0);
        state.enemies[0].shot_cooldown = 0.01;
        move_enemies(&mut state, 0.02);

        assert_eq!(state.projectiles.len(), 1);
        let spit = &state.projectiles[0];
        assert_eq!(spit.faction, Faction::Enemy);
        assert!(spit.vel.x < 0.0 && spit.vel.y > 0.0);
        assert!(state.enemies[0].shot_cooldown >= SPIT_INTERVAL.0);
    }

    #[test]
    fn boss_aura_fires_radial_volley() {
        let mut state = state();
        state.spawn_enemy(EnemyKind::Boss, Vec2::new(300.0, 0.0), 1.0);
        state.enemies[0].aura_cooldown = 0.01;
        move_enemies(&mut state, 0.02);
        assert_eq!(state.projectiles.len(), AURA_SHARDS as usize);
        assert!(state
            .projectiles
            .iter()
            .all(|p| p.kind == ProjectileKind::AuraShard && p.faction == Faction::Enemy));
    }

    #[test]
    fn chests_stay_put() {
        let mut state = state();
        state.spawn_enemy(EnemyKind::Chest, Vec2::new(200.0, 0.0), 1.0);
        move_enemies(&mut state, 0.033);
        assert_eq!(state.enemies[0].pos, Vec2::new(200.0, 0.0));
    }

    #[test]
    fn stragglers_are_leashed_not_removed() {
        let mut state = state();
        state.spawn_enemy(EnemyKind::Grunt, Vec2::new(50_000.0, 0.0), 1.0);
        move_enemies(&mut state, 0.016);
        assert_eq!(state.enemies.len(), 1);
        let offset = state.enemies[0].pos - state.player.pos;
        assert!(offset.x.abs() <= 640.0 + 70.0 + 1e-3);
        assert!(offset.y.abs() <= 360.0 + 70.0 + 1e-3);
    }

    #[test]
    fn seekers_turn_toward_their_target() {
        let mut state = state();
        let id = state.spawn_enemy(EnemyKind::Tank, Vec2::new(0.0, 300.0), 1.0);
        let mut bolt = Projectile::new(
            Faction::Player,
            ProjectileKind::Seeker,
            Vec2::ZERO,
            Vec2::new(360.0, 0.0),
            4.0,
            1.6,
            16.0,
            0,
        );
        bolt.homing_target = Some(id);
        state.projectiles.push(bolt);

        move_projectiles(&mut state, 0.1);
        let vel = state.projectiles[0].vel;
        assert!((vel.y.atan2(vel.x) - 0.4).abs() < 1e-4);

        state.enemies.clear();
        move_projectiles(&mut state, 0.1);
        assert_eq!(state.projectiles[0].homing_target, None);
    }

    #[test]
    fn autopilot_flees_adjacent_enemy() {
        let mut state = state();
        state.enemies.push(Enemy::new(99, EnemyKind::Grunt, Vec2::new(40.0, 0.0), 1.0));
        let dir = autopilot(&state);
        assert!(dir.x < -0.9);
    }

    #[test]
    fn xp_pickup_opens_an_offer() {
        let mut state = state();
        state.gems.push(crate::sim::state::Gem::new(Vec2::ZERO, Vec2::ZERO, 25));
        tick(&mut state, &TickInput::default(), 0.016);
        assert_eq!(state.player.level, 2);
        assert_eq!(state.phase, GamePhase::ChoosingUpgrade);

        // Frozen until the host chooses
        let t = state.time;
        tick(&mut state, &TickInput::default(), 0.016);
        assert_eq!(state.time, t);

        assert!(state.choose_upgrade(0).is_some());
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn laid_mine_kills_after_arm_and_fuse() {
        let mut state = state();
        state.tuning.max_enemies = 1;
        state.player.crit_chance = 0.0;
        state.player.iframes = 10.0;
        state.player.arsenal = Arsenal::empty();
        state.player.arsenal.get_mut(WeaponKind::Mine).level_up();

        let id = state.spawn_enemy(EnemyKind::Grunt, Vec2::new(60.0, 0.0), 1.0);
        state.enemies[0].hp = 40.0;

        let input = TickInput::default();
        let dt = 1.0 / 60.0;
        for _ in 0..60 {
            tick(&mut state, &input, dt);
        }
        // Armed but the fuse is still burning
        assert!(state.enemies.iter().any(|e| e.id == id));

        for _ in 0..40 {
            tick(&mut state, &input, dt);
        }
        assert!(!state.enemies.iter().any(|e| e.id == id));
        assert_eq!(state.kills, 1);
    }

    proptest! {
        #[test]
        fn hp_stays_in_bounds(dts in prop::collection::vec(0.0f32..0.033, 1..400), seed in 0u64..1000) {
            let mut state = GameState::new(seed, Tuning::default(), MetaProgress::default());
            // Start in the thick of it
            for i in 0..12 {
                let angle = i as f32 * 0.5;
                state.spawn_enemy(EnemyKind::Tank, polar_to_cartesian(30.0 + i as f32 * 8.0, angle), 1.0);
            }
            let input = TickInput::default();
            for dt in dts {
                tick(&mut state, &input, dt);
                if state.phase == GamePhase::ChoosingUpgrade {
                    state.choose_upgrade(0);
                }
                prop_assert!(state.player.hp >= 0.0);
                prop_assert!(state.player.hp <= state.player.hp_max);
            }
        }
    }
}
