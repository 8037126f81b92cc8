//! Game state and core simulation types
//!
//! Every container the step function mutates lives in [`GameState`].

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::director::Director;
use super::effects::{Effects, EffectsBudget};
use super::events::{EventQueue, GameEvent, RunSummary};
use super::progression::{Progression, UpgradeId, xp_for_level};
use super::weapons::{Arsenal, MAX_ORBIT_NODES};
use crate::consts::*;
use crate::meta::MetaProgress;
use crate::tuning::Tuning;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Waiting for the host to pick from an upgrade offer
    ChoosingUpgrade,
    /// Game is paused
    Paused,
    /// Run ended
    RunOver,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Survived until the run goal
    Victory,
    /// Player hp reached zero
    Defeat,
    /// Restarted mid-run
    Abandoned,
}

/// Global multiplicative modifiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    pub damage: f32,
    pub area: f32,
    /// Cooldown rate; cooldowns are divided by this
    pub cooldown: f32,
    pub projectile: f32,
    pub movement: f32,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            damage: 1.0,
            area: 1.0,
            cooldown: 1.0,
            projectile: 1.0,
            movement: 1.0,
        }
    }
}

/// Selector for one of the [`Modifiers`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierKind {
    Damage,
    Area,
    Cooldown,
    ProjectileSpeed,
    Move,
}

impl Modifiers {
    pub fn get(&self, kind: ModifierKind) -> f32 {
        match kind {
            ModifierKind::Damage => self.damage,
            ModifierKind::Area => self.area,
            ModifierKind::Cooldown => self.cooldown,
            ModifierKind::ProjectileSpeed => self.projectile,
            ModifierKind::Move => self.movement,
        }
    }
}

/// The player
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub pos: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub hp: f32,
    pub hp_max: f32,
    /// Hp regenerated per second
    pub regen: f32,
    pub armor: f32,
    /// Gem attraction radius
    pub magnet: f32,
    /// Invulnerability time remaining
    pub iframes: f32,
    pub xp: u32,
    pub level: u32,
    pub xp_to_next: u32,
    pub crit_chance: f32,
    pub crit_mult: f32,
    pub arsenal: Arsenal,
    pub mods: Modifiers,
}

impl Player {
    pub fn new(tuning: &Tuning, meta: &MetaProgress) -> Self {
        let hp_max = PLAYER_HP + meta.hp_bonus();
        Self {
            pos: Vec2::ZERO,
            radius: PLAYER_RADIUS,
            speed: tuning.player_speed,
            hp: hp_max,
            hp_max,
            regen: 0.0,
            armor: 0.0,
            magnet: PLAYER_MAGNET + meta.magnet_bonus(),
            iframes: 0.0,
            xp: 0,
            level: 1,
            xp_to_next: FIRST_LEVEL_XP,
            crit_chance: tuning.crit_chance,
            crit_mult: PLAYER_CRIT_MULT,
            arsenal: Arsenal::starting(),
            mods: Modifiers {
                damage: meta.damage_multiplier(),
                movement: meta.move_multiplier(),
                ..Modifiers::default()
            },
        }
    }

    /// Restore hp without exceeding the maximum
    pub fn heal(&mut self, amount: f32) {
        self.hp = (self.hp + amount.max(0.0)).min(self.hp_max);
    }

    /// Remove hp, flooring at zero. Returns true if the player died.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        self.hp = (self.hp - amount.max(0.0)).max(0.0);
        self.hp <= 0.0
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Progress toward the next level (0-1)
    pub fn xp_fraction(&self) -> f32 {
        if self.xp_to_next == 0 {
            return 0.0;
        }
        (self.xp as f32 / self.xp_to_next as f32).clamp(0.0, 1.0)
    }

    /// Recompute the threshold after reaching `level`
    pub fn set_level(&mut self, level: u32) {
        self.level = level;
        self.xp_to_next = xp_for_level(level);
    }
}

/// Enemy types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyKind {
    Grunt,
    Runner,
    Tank,
    /// Ranged poker
    Spitter,
    Elite,
    /// Stationary loot container
    Chest,
    /// Checkpoint boss with an aura volley
    Boss,
}

/// Base stats of an enemy kind, before difficulty scaling
#[derive(Debug, Clone, Copy)]
pub struct EnemyStats {
    pub radius: f32,
    pub hp: f32,
    pub speed: f32,
    pub damage: f32,
    pub xp: u32,
    pub coins: u64,
}

impl EnemyKind {
    pub fn stats(self) -> EnemyStats {
        let (radius, hp, speed, damage, xp, coins) = match self {
            EnemyKind::Grunt => (13.0, 46.0, 75.0, 12.0, 1, 1),
            EnemyKind::Runner => (11.0, 34.0, 110.0, 10.0, 1, 1),
            EnemyKind::Tank => (18.0, 115.0, 55.0, 18.0, 2, 2),
            EnemyKind::Spitter => (14.0, 58.0, 70.0, 12.0, 2, 2),
            EnemyKind::Elite => (22.0, 260.0, 65.0, 26.0, 8, 5),
            EnemyKind::Chest => (16.0, 60.0, 0.0, 0.0, 0, 10),
            EnemyKind::Boss => (34.0, 2400.0, 58.0, 35.0, 40, 50),
        };
        EnemyStats {
            radius,
            hp,
            speed,
            damage,
            xp,
            coins,
        }
    }

    /// Whether touching this enemy hurts the player
    pub fn deals_contact(self) -> bool {
        self != EnemyKind::Chest
    }

    /// Chests and bosses always pay out their coins
    pub fn guaranteed_coins(self) -> bool {
        matches!(self, EnemyKind::Chest | EnemyKind::Boss)
    }
}

/// Seconds between boss aura volleys
pub const BOSS_AURA_INTERVAL: f32 = 3.5;

/// An enemy entity
#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub pos: Vec2,
    pub radius: f32,
    pub hp: f32,
    pub hp_max: f32,
    pub speed: f32,
    pub damage: f32,
    pub xp: u32,
    pub coins: u64,
    /// Render feedback after a hit
    pub hit_flash: f32,
    /// Ranged shot timer (spitters)
    pub shot_cooldown: f32,
    /// Aura volley timer (bosses)
    pub aura_cooldown: f32,
    /// Per orbit node damage cooldowns
    pub orbit_cooldowns: [f32; MAX_ORBIT_NODES],
}

impl Enemy {
    /// Build an enemy scaled by `scale` (1.0 = base stats)
    pub fn new(id: u32, kind: EnemyKind, pos: Vec2, scale: f32) -> Self {
        let stats = kind.stats();
        let scale = if scale.is_finite() { scale.max(0.1) } else { 1.0 };
        let hp = stats.hp * (1.0 + 0.15 * (scale - 1.0));
        Self {
            id,
            kind,
            pos,
            radius: (stats.radius * scale).max(1.0),
            hp,
            hp_max: hp,
            speed: stats.speed * (1.0 + 0.1 * (scale - 1.0)),
            damage: stats.damage,
            xp: stats.xp,
            coins: stats.coins,
            hit_flash: 0.0,
            shot_cooldown: 0.8,
            aura_cooldown: BOSS_AURA_INTERVAL,
            orbit_cooldowns: [0.0; MAX_ORBIT_NODES],
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Apply damage. Returns true if this hit was the killing blow.
    pub fn take_hit(&mut self, amount: f32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.hp -= amount.max(0.0);
        self.hit_flash = HIT_FLASH;
        !self.is_alive()
    }

    /// Count down per-step timers
    pub fn tick_timers(&mut self, dt: f32) {
        self.hit_flash = (self.hit_flash - dt).max(0.0);
        for cd in &mut self.orbit_cooldowns {
            *cd = (*cd - dt).max(0.0);
        }
    }
}

/// Projectile owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Enemy,
}

/// Projectile visuals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    Bolt,
    Pellet,
    Seeker,
    Spit,
    AuraShard,
}

/// A projectile entity
#[derive(Debug, Clone)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Seconds until expiry
    pub life: f32,
    pub damage: f32,
    /// Extra enemies this projectile may pass through
    pub pierce: u32,
    pub faction: Faction,
    pub kind: ProjectileKind,
    pub crit: bool,
    /// Enemy id a seeker steers toward
    pub homing_target: Option<u32>,
    /// Enemy ids already struck
    pub hits: Vec<u32>,
    /// Consumed by a hit
    pub spent: bool,
}

impl Projectile {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        faction: Faction,
        kind: ProjectileKind,
        pos: Vec2,
        vel: Vec2,
        radius: f32,
        life: f32,
        damage: f32,
        pierce: u32,
    ) -> Self {
        Self {
            pos,
            vel,
            radius: radius.max(0.5),
            life: life.max(0.0),
            damage,
            pierce,
            faction,
            kind,
            crit: false,
            homing_target: None,
            hits: Vec::new(),
            spent: false,
        }
    }

    pub fn is_live(&self) -> bool {
        !self.spent && self.life > 0.0
    }
}

/// An experience gem
#[derive(Debug, Clone)]
pub struct Gem {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub value: u32,
    pub age: f32,
}

impl Gem {
    pub fn new(pos: Vec2, vel: Vec2, value: u32) -> Self {
        Self {
            pos,
            vel,
            radius: GEM_RADIUS,
            value,
            age: 0.0,
        }
    }
}

/// Scalar HUD state for the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HudSnapshot {
    pub elapsed: f32,
    pub hp: f32,
    pub hp_max: f32,
    pub level: u32,
    pub kills: u32,
    pub coins: u64,
    pub xp_fraction: f32,
    pub goal_fraction: f32,
}

/// Complete simulation context
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    /// Copy of the meta record; updated when the run ends
    pub meta: MetaProgress,
    /// Elapsed run time (seconds)
    pub time: f32,
    pub difficulty: f32,
    pub phase: GamePhase,
    pub outcome: Option<RunOutcome>,
    pub kills: u32,
    /// Coins earned this run
    pub coins: u64,
    /// Smoothed camera position (render consumer)
    pub camera: Vec2,
    /// Visible half extents, used for off-screen spawns
    pub view_half_extents: Vec2,
    /// Last applied movement direction
    pub move_dir: Vec2,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub projectiles: Vec<Projectile>,
    pub gems: Vec<Gem>,
    pub effects: Effects,
    pub director: Director,
    pub progression: Progression,
    pub events: EventQueue,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Create a new run
    pub fn new(seed: u64, tuning: Tuning, meta: MetaProgress) -> Self {
        let player = Player::new(&tuning, &meta);
        let director = Director::new(&tuning);
        let view_half_extents = tuning.default_half_extents;
        log::info!("New run (seed {}, goal {}s)", seed, tuning.run_goal_secs);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            meta,
            time: 0.0,
            difficulty: 1.0,
            phase: GamePhase::Playing,
            outcome: None,
            kills: 0,
            coins: 0,
            camera: Vec2::ZERO,
            view_half_extents,
            move_dir: Vec2::ZERO,
            player,
            enemies: Vec::new(),
            projectiles: Vec::new(),
            gems: Vec::new(),
            effects: Effects::new(EffectsBudget::default()),
            director,
            progression: Progression::default(),
            events: EventQueue::default(),
            tuning,
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add an enemy and return its id
    pub fn spawn_enemy(&mut self, kind: EnemyKind, pos: Vec2, scale: f32) -> u32 {
        let id = self.next_entity_id();
        self.enemies.push(Enemy::new(id, kind, pos, scale));
        id
    }

    pub fn set_effects_budget(&mut self, budget: EffectsBudget) {
        self.events.damage_numbers = budget.damage_numbers;
        self.effects.set_budget(budget);
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::RunOver
    }

    /// Fraction of the run goal survived (0-1)
    pub fn goal_fraction(&self) -> f32 {
        if self.tuning.run_goal_secs <= 0.0 {
            return 1.0;
        }
        (self.time / self.tuning.run_goal_secs).clamp(0.0, 1.0)
    }

    pub fn hud(&self) -> HudSnapshot {
        HudSnapshot {
            elapsed: self.time,
            hp: self.player.hp,
            hp_max: self.player.hp_max,
            level: self.player.level,
            kills: self.kills,
            coins: self.coins,
            xp_fraction: self.player.xp_fraction(),
            goal_fraction: self.goal_fraction(),
        }
    }

    /// Take all pending UI events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// Pause gate. Only toggles between active play and paused.
    pub fn set_paused(&mut self, paused: bool) {
        match (self.phase, paused) {
            (GamePhase::Playing, true) => self.phase = GamePhase::Paused,
            (GamePhase::Paused, false) => self.phase = GamePhase::Playing,
            _ => {}
        }
    }

    /// Apply the option at `index` of the active upgrade offer and resume
    /// play, or surface the next queued offer
    pub fn choose_upgrade(&mut self, index: usize) -> Option<UpgradeId> {
        if self.phase != GamePhase::ChoosingUpgrade {
            return None;
        }
        let id = self
            .progression
            .choose(index, &mut self.player, &mut self.events)?;
        let offer_size = self.tuning.offer_size;
        if !self.progression.resolve_pending(
            &mut self.player,
            &mut self.rng,
            &mut self.events,
            offer_size,
        ) {
            self.phase = GamePhase::Playing;
        }
        Some(id)
    }

    /// Terminal transition: finalize the meta record and stop stepping
    pub fn end_run(&mut self, outcome: RunOutcome) {
        if self.is_over() {
            return;
        }
        self.phase = GamePhase::RunOver;
        self.outcome = Some(outcome);
        let update = self.meta.finalize_run(self.time, self.coins);

        let text = match outcome {
            RunOutcome::Victory => "SURVIVED!",
            RunOutcome::Defeat => "DOWN!",
            RunOutcome::Abandoned => "RESTART",
        };
        self.events
            .pop_text(text, self.player.pos - Vec2::new(0.0, 70.0));
        log::info!(
            "Run over: {:?} at {:.1}s, level {}, {} kills, {} coins{}",
            outcome,
            self.time,
            self.player.level,
            self.kills,
            self.coins,
            if update.new_best { " (new best)" } else { "" }
        );
        self.events.push(GameEvent::RunEnded(RunSummary {
            outcome,
            elapsed: self.time,
            level: self.player.level,
            kills: self.kills,
            coins: self.coins,
            new_best: update.new_best,
            best_time: self.meta.best_time,
        }));
    }
}
