//! Weapon subsystem
//!
//! Seven weapon variants, each leveled independently and owning its own
//! cooldown. Dispatch is a plain `match` over [`Weapon`].

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{Battlefield, Impact, circles_overlap};
use super::state::{Faction, Modifiers, Player, Projectile, ProjectileKind};
use crate::{direction_or_unit, dist2, polar_to_cartesian};

/// Upper bound on orbit nodes
pub const MAX_ORBIT_NODES: usize = 8;

/// Shortest allowed firing period (seconds)
const MIN_PERIOD: f32 = 0.05;

const LINE_SHOT_RANGE: f32 = 650.0;
const LINE_SHOT_SPREAD: f32 = 0.14;
const LINE_SHOT_LIFE: f32 = 1.9;
const LINE_SHOT_RADIUS: f32 = 4.5;

const ORBIT_NODE_RADIUS: f32 = 9.0;
const ORBIT_HIT_INTERVAL: f32 = 0.22;
const ORBIT_BASE_SPIN: f32 = 2.2;
const ORBIT_SPIN_PER_LEVEL: f32 = 0.3;

const SCATTER_RANGE: f32 = 420.0;
const SCATTER_LIFE: f32 = 0.35;
const SCATTER_RADIUS: f32 = 3.5;
const SCATTER_JITTER: f32 = 0.04;
const MAX_PELLETS: u32 = 9;

const SEEKER_LIFE: f32 = 1.6;
const SEEKER_RADIUS: f32 = 4.0;
const MAX_SEEKER_TARGETS: u32 = 6;
/// Seeker steering rate (rad/s)
pub const SEEKER_TURN_RATE: f32 = 4.0;

const MINE_ARM: f32 = 0.5;
const MINE_FUSE: f32 = 1.0;

/// Weapon identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Auto-aimed bolts
    LineShot,
    /// Rotating contact nodes
    Orbit,
    /// Periodic shockwave
    Pulse,
    /// Lightning hopping between enemies
    Chain,
    /// Pellet cone
    Scatter,
    /// One homing bolt per nearby enemy
    Seeker,
    /// Timed explosive
    Mine,
}

impl WeaponKind {
    pub const COUNT: usize = 7;

    pub const ALL: [WeaponKind; Self::COUNT] = [
        WeaponKind::LineShot,
        WeaponKind::Orbit,
        WeaponKind::Pulse,
        WeaponKind::Chain,
        WeaponKind::Scatter,
        WeaponKind::Seeker,
        WeaponKind::Mine,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn max_level(self) -> u32 {
        match self {
            WeaponKind::LineShot => 9,
            WeaponKind::Orbit => 7,
            _ => 6,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WeaponKind::LineShot => "Magic Wand",
            WeaponKind::Orbit => "Orbit Blades",
            WeaponKind::Pulse => "Pulse Nova",
            WeaponKind::Chain => "Chain Spark",
            WeaponKind::Scatter => "Scatter Shot",
            WeaponKind::Seeker => "Seeker Swarm",
            WeaponKind::Mine => "Proximity Mine",
        }
    }
}

/// Snapshot of the player stats weapons read while firing
#[derive(Debug, Clone, Copy)]
pub struct Shooter {
    pub pos: Vec2,
    pub mods: Modifiers,
    pub crit_chance: f32,
    pub crit_mult: f32,
}

impl Shooter {
    pub fn from_player(player: &Player) -> Self {
        Self {
            pos: player.pos,
            mods: player.mods,
            crit_chance: player.crit_chance,
            crit_mult: player.crit_mult,
        }
    }

    /// Independent crit roll on an already-scaled amount
    pub fn crit(&self, rng: &mut Pcg32, amount: f32) -> (f32, bool) {
        let crit = self.crit_chance > 0.0 && rng.random::<f32>() < self.crit_chance;
        if crit {
            (amount * self.crit_mult, true)
        } else {
            (amount, false)
        }
    }

    /// Scale base weapon damage by the damage modifier, then roll for a crit
    pub fn roll(&self, rng: &mut Pcg32, base: f32) -> (f32, bool) {
        self.crit(rng, base * self.mods.damage)
    }

    /// Firing period for a base cooldown
    pub fn period(&self, base_cooldown: f32) -> f32 {
        (base_cooldown / self.mods.cooldown.max(0.01)).max(MIN_PERIOD)
    }
}

/// Count down `cooldown` and return how many times it elapsed.
/// A single large `dt` may yield several firings.
pub fn fire_cycles(cooldown: &mut f32, dt: f32, period: f32) -> u32 {
    *cooldown -= dt.max(0.0);
    let mut shots = 0;
    while *cooldown <= 0.0 {
        *cooldown += period;
        shots += 1;
    }
    shots
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineShot {
    pub level: u32,
    pub cooldown: f32,
    pub base_cooldown: f32,
    pub damage: f32,
    pub speed: f32,
    pub pierce: u32,
    pub count: u32,
}

impl Default for LineShot {
    fn default() -> Self {
        Self {
            level: 0,
            cooldown: 0.0,
            base_cooldown: 0.58,
            damage: 18.0,
            speed: 420.0,
            pierce: 0,
            count: 1,
        }
    }
}

impl LineShot {
    fn level_up(&mut self) {
        self.level += 1;
        if self.level > 1 {
            self.damage = (self.damage * 1.15).round();
            self.speed = (self.speed * 1.07).round();
        }
        match self.level {
            3 => self.count = 2,
            6 => self.count = 3,
            8 => self.pierce = self.pierce.max(1),
            _ => {}
        }
    }

    fn fire(&self, shooter: &Shooter, field: &mut Battlefield) {
        let Some(target) = field.nearest(shooter.pos, LINE_SHOT_RANGE, |_, _| false) else {
            return;
        };
        let aim = direction_or_unit(field.enemies[target].pos - shooter.pos);
        let base = aim.y.atan2(aim.x);
        let center = (self.count as f32 - 1.0) / 2.0;

        for i in 0..self.count {
            let angle = base + (i as f32 - center) * LINE_SHOT_SPREAD;
            let vel = polar_to_cartesian(self.speed * shooter.mods.projectile, angle);
            let (damage, crit) = shooter.roll(field.rng, self.damage);
            let mut bolt = Projectile::new(
                Faction::Player,
                ProjectileKind::Bolt,
                shooter.pos,
                vel,
                LINE_SHOT_RADIUS,
                LINE_SHOT_LIFE,
                damage,
                self.pierce,
            );
            bolt.crit = crit;
            field.projectiles.push(bolt);
        }
        field.effects.puff(field.rng, shooter.pos, 6);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Orbit {
    pub level: u32,
    /// Current rotation (radians)
    pub angle: f32,
    pub count: u32,
    pub radius: f32,
    pub damage: f32,
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            level: 0,
            angle: 0.0,
            count: 0,
            radius: 42.0,
            damage: 10.0,
        }
    }
}

impl Orbit {
    fn level_up(&mut self) {
        self.level += 1;
        if self.level == 1 {
            self.count = 2;
        } else {
            self.count = (self.count + 1).min(MAX_ORBIT_NODES as u32);
            self.radius += 6.0;
            self.damage = (self.damage * 1.12).round();
        }
    }

    /// Angular speed in rad/s
    pub fn spin(&self) -> f32 {
        ORBIT_BASE_SPIN + ORBIT_SPIN_PER_LEVEL * self.level.saturating_sub(1) as f32
    }

    /// World positions of every node around `center`
    pub fn node_positions(&self, center: Vec2, area: f32) -> Vec<Vec2> {
        let count = self.count.min(MAX_ORBIT_NODES as u32) as usize;
        let radius = self.radius * area;
        (0..count)
            .map(|i| {
                let angle = self.angle + i as f32 * std::f32::consts::TAU / count as f32;
                center + polar_to_cartesian(radius, angle)
            })
            .collect()
    }

    fn tick(&mut self, dt: f32, shooter: &Shooter, field: &mut Battlefield) {
        if self.level == 0 || self.count == 0 {
            return;
        }
        self.angle = (self.angle + dt * self.spin()) % std::f32::consts::TAU;

        for (node, pos) in self
            .node_positions(shooter.pos, shooter.mods.area)
            .into_iter()
            .enumerate()
        {
            for i in 0..field.enemies.len() {
                let enemy = &field.enemies[i];
                if !enemy.is_alive()
                    || enemy.orbit_cooldowns[node] > 0.0
                    || !circles_overlap(pos, ORBIT_NODE_RADIUS, enemy.pos, enemy.radius)
                {
                    continue;
                }
                field.enemies[i].orbit_cooldowns[node] = ORBIT_HIT_INTERVAL;
                let (amount, crit) = shooter.roll(field.rng, self.damage);
                field.hit(
                    i,
                    Impact {
                        amount,
                        crit,
                        at: pos,
                        soft: true,
                    },
                );
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pulse {
    pub level: u32,
    pub cooldown: f32,
    pub base_cooldown: f32,
    pub damage: f32,
    pub radius: f32,
}

impl Default for Pulse {
    fn default() -> Self {
        Self {
            level: 0,
            cooldown: 0.0,
            base_cooldown: 6.0,
            damage: 28.0,
            radius: 90.0,
        }
    }
}

impl Pulse {
    fn level_up(&mut self) {
        self.level += 1;
        if self.level > 1 {
            self.damage = (self.damage * 1.18).round();
            self.radius = (self.radius * 1.10).round();
            self.base_cooldown = (self.base_cooldown * 0.92).max(2.6);
        }
    }

    fn fire(&self, shooter: &Shooter, field: &mut Battlefield) {
        let radius = self.radius * shooter.mods.area;
        field.hit_area(shooter.pos, radius, self.damage, shooter);
        field.effects.nova(shooter.pos, radius);
        field.effects.add_shake(6.0);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub level: u32,
    pub cooldown: f32,
    pub base_cooldown: f32,
    pub damage: f32,
    /// Hops after the first target
    pub jumps: u32,
    pub range: f32,
}

impl Default for Chain {
    fn default() -> Self {
        Self {
            level: 0,
            cooldown: 0.0,
            base_cooldown: 3.2,
            damage: 22.0,
            jumps: 2,
            range: 170.0,
        }
    }
}

impl Chain {
    fn level_up(&mut self) {
        self.level += 1;
        if self.level > 1 {
            self.damage = (self.damage * 1.14).round();
            self.jumps = (self.jumps + 1).min(6);
            self.base_cooldown = (self.base_cooldown * 0.92).max(1.2);
            self.range = (self.range * 1.07).round();
        }
    }

    /// Strike the nearest enemy, then hop to the nearest unvisited one.
    /// Returns the visited enemy indices in hit order.
    pub fn fire(&self, shooter: &Shooter, field: &mut Battlefield) -> Vec<usize> {
        let range = self.range * shooter.mods.area;
        let mut visited: Vec<usize> = Vec::with_capacity(self.jumps as usize + 1);
        let mut from = shooter.pos;
        let mut current = field.nearest(shooter.pos, range, |_, _| false);

        for _ in 0..=self.jumps {
            let Some(index) = current else { break };
            visited.push(index);
            let at = field.enemies[index].pos;
            let (amount, crit) = shooter.roll(field.rng, self.damage);
            field.hit(
                index,
                Impact {
                    amount,
                    crit,
                    at,
                    soft: false,
                },
            );
            field.effects.zap(from, at);
            from = at;
            current = field.nearest(at, range, |i, _| visited.contains(&i));
        }
        visited
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scatter {
    pub level: u32,
    pub cooldown: f32,
    pub base_cooldown: f32,
    pub pellets: u32,
    /// Full cone width (radians)
    pub cone: f32,
    pub damage: f32,
    pub speed: f32,
}

impl Default for Scatter {
    fn default() -> Self {
        Self {
            level: 0,
            cooldown: 0.0,
            base_cooldown: 1.6,
            pellets: 5,
            cone: 0.6,
            damage: 9.0,
            speed: 480.0,
        }
    }
}

impl Scatter {
    fn level_up(&mut self) {
        self.level += 1;
        if self.level > 1 {
            self.pellets = (self.pellets + 1).min(MAX_PELLETS);
            self.damage = (self.damage * 1.12).round();
            self.base_cooldown = (self.base_cooldown * 0.93).max(0.8);
        }
    }

    fn fire(&self, shooter: &Shooter, field: &mut Battlefield) {
        let Some(target) = field.nearest(shooter.pos, SCATTER_RANGE, |_, _| false) else {
            return;
        };
        let aim = direction_or_unit(field.enemies[target].pos - shooter.pos);
        let base = aim.y.atan2(aim.x);

        for i in 0..self.pellets {
            let t = if self.pellets > 1 {
                i as f32 / (self.pellets - 1) as f32 - 0.5
            } else {
                0.0
            };
            let jitter = field.rng.random_range(-SCATTER_JITTER..SCATTER_JITTER);
            let vel = polar_to_cartesian(
                self.speed * shooter.mods.projectile,
                base + t * self.cone + jitter,
            );
            let (damage, crit) = shooter.roll(field.rng, self.damage);
            let mut pellet = Projectile::new(
                Faction::Player,
                ProjectileKind::Pellet,
                shooter.pos,
                vel,
                SCATTER_RADIUS,
                SCATTER_LIFE,
                damage,
                0,
            );
            pellet.crit = crit;
            field.projectiles.push(pellet);
        }
        field.effects.puff(field.rng, shooter.pos, 4);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Seeker {
    pub level: u32,
    pub cooldown: f32,
    pub base_cooldown: f32,
    /// Enemies targeted per volley
    pub targets: u32,
    pub damage: f32,
    pub speed: f32,
}

impl Default for Seeker {
    fn default() -> Self {
        Self {
            level: 0,
            cooldown: 0.0,
            base_cooldown: 2.4,
            targets: 1,
            damage: 16.0,
            speed: 360.0,
        }
    }
}

impl Seeker {
    fn level_up(&mut self) {
        self.level += 1;
        if self.targets < MAX_SEEKER_TARGETS {
            self.targets += 1;
        }
        if self.level > 1 {
            self.damage = (self.damage * 1.12).round();
            self.base_cooldown = (self.base_cooldown * 0.94).max(1.2);
        }
    }

    /// Fire one homing bolt at each of the nearest enemies.
    /// Returns the targeted enemy ids.
    pub fn fire(&self, shooter: &Shooter, field: &mut Battlefield) -> Vec<u32> {
        let mut order: Vec<(usize, f32)> = field
            .enemies
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_alive())
            .map(|(i, e)| (i, dist2(shooter.pos, e.pos)))
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut targeted = Vec::new();
        for &(index, _) in order.iter().take(self.targets as usize) {
            let enemy = &field.enemies[index];
            let aim = direction_or_unit(enemy.pos - shooter.pos);
            let id = enemy.id;
            let (damage, crit) = shooter.roll(field.rng, self.damage);
            let mut bolt = Projectile::new(
                Faction::Player,
                ProjectileKind::Seeker,
                shooter.pos,
                aim * self.speed * shooter.mods.projectile,
                SEEKER_RADIUS,
                SEEKER_LIFE,
                damage,
                0,
            );
            bolt.crit = crit;
            bolt.homing_target = Some(id);
            field.projectiles.push(bolt);
            targeted.push(id);
        }
        targeted
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MineLayer {
    pub level: u32,
    pub cooldown: f32,
    pub base_cooldown: f32,
    pub damage: f32,
    pub blast_radius: f32,
}

impl Default for MineLayer {
    fn default() -> Self {
        Self {
            level: 0,
            cooldown: 0.0,
            base_cooldown: 4.0,
            damage: 45.0,
            blast_radius: 70.0,
        }
    }
}

impl MineLayer {
    fn level_up(&mut self) {
        self.level += 1;
        if self.level > 1 {
            self.damage = (self.damage * 1.15).round();
            self.blast_radius = (self.blast_radius * 1.08).round();
            self.base_cooldown = (self.base_cooldown * 0.92).max(1.8);
        }
    }

    fn fire(&self, shooter: &Shooter, field: &mut Battlefield) {
        field.effects.lay_mine(
            shooter.pos,
            MINE_ARM,
            MINE_FUSE,
            self.blast_radius * shooter.mods.area,
            self.damage * shooter.mods.damage,
        );
    }
}

/// A weapon slot
#[derive(Debug, Clone, PartialEq)]
pub enum Weapon {
    LineShot(LineShot),
    Orbit(Orbit),
    Pulse(Pulse),
    Chain(Chain),
    Scatter(Scatter),
    Seeker(Seeker),
    Mine(MineLayer),
}

impl Weapon {
    /// A level 0 weapon of the given kind
    pub fn locked(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::LineShot => Weapon::LineShot(LineShot::default()),
            WeaponKind::Orbit => Weapon::Orbit(Orbit::default()),
            WeaponKind::Pulse => Weapon::Pulse(Pulse::default()),
            WeaponKind::Chain => Weapon::Chain(Chain::default()),
            WeaponKind::Scatter => Weapon::Scatter(Scatter::default()),
            WeaponKind::Seeker => Weapon::Seeker(Seeker::default()),
            WeaponKind::Mine => Weapon::Mine(MineLayer::default()),
        }
    }

    pub fn kind(&self) -> WeaponKind {
        match self {
            Weapon::LineShot(_) => WeaponKind::LineShot,
            Weapon::Orbit(_) => WeaponKind::Orbit,
            Weapon::Pulse(_) => WeaponKind::Pulse,
            Weapon::Chain(_) => WeaponKind::Chain,
            Weapon::Scatter(_) => WeaponKind::Scatter,
            Weapon::Seeker(_) => WeaponKind::Seeker,
            Weapon::Mine(_) => WeaponKind::Mine,
        }
    }

    pub fn level(&self) -> u32 {
        match self {
            Weapon::LineShot(w) => w.level,
            Weapon::Orbit(w) => w.level,
            Weapon::Pulse(w) => w.level,
            Weapon::Chain(w) => w.level,
            Weapon::Scatter(w) => w.level,
            Weapon::Seeker(w) => w.level,
            Weapon::Mine(w) => w.level,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.level() > 0
    }

    pub fn can_level(&self) -> bool {
        self.level() < self.kind().max_level()
    }

    /// Gain one level (level 0 -> 1 unlocks at base stats)
    pub fn level_up(&mut self) {
        match self {
            Weapon::LineShot(w) => w.level_up(),
            Weapon::Orbit(w) => w.level_up(),
            Weapon::Pulse(w) => w.level_up(),
            Weapon::Chain(w) => w.level_up(),
            Weapon::Scatter(w) => w.level_up(),
            Weapon::Seeker(w) => w.level_up(),
            Weapon::Mine(w) => w.level_up(),
        }
    }

    /// One-time evolution bonus
    pub fn apply_evolution(&mut self) {
        match self {
            Weapon::LineShot(w) => {
                w.pierce += 2;
                w.damage = (w.damage * 1.5).round();
            }
            Weapon::Orbit(w) => {
                w.count = MAX_ORBIT_NODES as u32;
                w.damage = (w.damage * 1.5).round();
                w.radius += 20.0;
            }
            Weapon::Pulse(w) => {
                w.base_cooldown *= 0.6;
                w.damage = (w.damage * 1.4).round();
            }
            Weapon::Chain(w) => {
                w.jumps += 3;
                w.range = (w.range * 1.2).round();
            }
            Weapon::Scatter(w) => {
                w.pellets += 4;
                w.damage = (w.damage * 1.3).round();
            }
            Weapon::Seeker(w) => w.targets += 3,
            Weapon::Mine(w) => {
                w.blast_radius = (w.blast_radius * 1.5).round();
                w.damage = (w.damage * 1.5).round();
            }
        }
    }

    /// Advance cooldowns and fire as many times as they elapsed
    pub fn update(&mut self, dt: f32, shooter: &Shooter, field: &mut Battlefield) {
        if !self.is_unlocked() {
            return;
        }
        match self {
            Weapon::LineShot(w) => {
                for _ in 0..fire_cycles(&mut w.cooldown, dt, shooter.period(w.base_cooldown)) {
                    w.fire(shooter, field);
                }
            }
            Weapon::Orbit(w) => w.tick(dt, shooter, field),
            Weapon::Pulse(w) => {
                for _ in 0..fire_cycles(&mut w.cooldown, dt, shooter.period(w.base_cooldown)) {
                    w.fire(shooter, field);
                }
            }
            Weapon::Chain(w) => {
                for _ in 0..fire_cycles(&mut w.cooldown, dt, shooter.period(w.base_cooldown)) {
                    w.fire(shooter, field);
                }
            }
            Weapon::Scatter(w) => {
                for _ in 0..fire_cycles(&mut w.cooldown, dt, shooter.period(w.base_cooldown)) {
                    w.fire(shooter, field);
                }
            }
            Weapon::Seeker(w) => {
                for _ in 0..fire_cycles(&mut w.cooldown, dt, shooter.period(w.base_cooldown)) {
                    w.fire(shooter, field);
                }
            }
            Weapon::Mine(w) => {
                for _ in 0..fire_cycles(&mut w.cooldown, dt, shooter.period(w.base_cooldown)) {
                    w.fire(shooter, field);
                }
            }
        }
    }
}

/// The fixed set of weapon slots, one per kind
#[derive(Debug, Clone, PartialEq)]
pub struct Arsenal {
    slots: [Weapon; WeaponKind::COUNT],
}

impl Arsenal {
    /// Every weapon locked
    pub fn empty() -> Self {
        Self {
            slots: WeaponKind::ALL.map(Weapon::locked),
        }
    }

    /// Run start loadout: the line-shot at level 1
    pub fn starting() -> Self {
        let mut arsenal = Self::empty();
        arsenal.get_mut(WeaponKind::LineShot).level_up();
        arsenal
    }

    pub fn get(&self, kind: WeaponKind) -> &Weapon {
        &self.slots[kind.index()]
    }

    pub fn get_mut(&mut self, kind: WeaponKind) -> &mut Weapon {
        &mut self.slots[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Weapon> {
        self.slots.iter()
    }

    pub fn level(&self, kind: WeaponKind) -> u32 {
        self.get(kind).level()
    }

    /// Tick every unlocked weapon
    pub fn update(&mut self, dt: f32, shooter: &Shooter, field: &mut Battlefield) {
        for weapon in &mut self.slots {
            weapon.update(dt, shooter, field);
        }
    }
}
