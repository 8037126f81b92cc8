//! Collision detection and combat resolution
//!
//! Everything is a circle: overlap means the squared center distance is at
//! most the squared sum of radii. No spatial index; every check is a linear
//! scan over the enemy list.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::effects::{Effects, MineBlast};
use super::events::{EventQueue, GameEvent};
use super::progression::LevelUpSource;
use super::state::{Enemy, EnemyKind, Faction, GameState, Gem, Projectile, RunOutcome};
use super::weapons::Shooter;
use crate::consts::*;
use crate::dist2;

/// Fraction of max hp restored when a boss dies
const BOSS_HEAL_FRACTION: f32 = 0.25;
/// Elapsed time over which the coin chance ramps
const COIN_CHANCE_HORIZON: f32 = 600.0;

/// Circle-circle overlap test
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    dist2(a, b) <= r * r
}

/// Where incoming player damage came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageSource {
    /// Body contact with an enemy
    Contact,
    /// Enemy projectile
    Ranged,
}

impl DamageSource {
    pub fn armor_factor(self) -> f32 {
        match self {
            DamageSource::Contact => CONTACT_ARMOR_FACTOR,
            DamageSource::Ranged => RANGED_ARMOR_FACTOR,
        }
    }

    /// Invulnerability granted after a hit
    pub fn iframes(self) -> f32 {
        match self {
            DamageSource::Contact => CONTACT_IFRAMES,
            DamageSource::Ranged => RANGED_IFRAMES,
        }
    }
}

/// Damage the player takes from one hit (never below 1)
pub fn player_damage(incoming: f32, difficulty: f32, armor: f32, source: DamageSource) -> f32 {
    (incoming + DIFFICULTY_DAMAGE * difficulty - armor * source.armor_factor()).max(1.0)
}

/// Gems dropped for an xp value: (count, value per gem)
pub fn gem_drops(xp: u32) -> (u32, u32) {
    match xp {
        0 => (0, 0),
        1 => (1, 1),
        2 => (2, 1),
        3..=7 => (4, 1),
        8..=19 => (4, 6),
        _ => (8, xp / 4),
    }
}

/// Chance that a regular enemy drops its coins
pub fn coin_drop_chance(elapsed: f32) -> f32 {
    (0.06 + 0.14 * elapsed.max(0.0) / COIN_CHANCE_HORIZON).min(0.25)
}

/// One damage instance against an enemy
#[derive(Debug, Clone, Copy)]
pub struct Impact {
    pub amount: f32,
    pub crit: bool,
    /// Where the hit lands (for sparks and numbers)
    pub at: Vec2,
    /// Small spark burst (continuous sources)
    pub soft: bool,
}

/// Apply an impact to a living enemy. Returns true on the killing blow.
pub fn strike(
    enemy: &mut Enemy,
    impact: Impact,
    effects: &mut Effects,
    events: &mut EventQueue,
    rng: &mut Pcg32,
) -> bool {
    if !enemy.is_alive() {
        return false;
    }
    let killed = enemy.take_hit(impact.amount);
    effects.spark(rng, impact.at, if impact.soft { 4 } else { 8 });
    events.damage_number(impact.amount, impact.at, impact.crit);
    killed
}

/// Mutable view of the parts of the state weapons act on
pub struct Battlefield<'a> {
    pub enemies: &'a mut [Enemy],
    pub projectiles: &'a mut Vec<Projectile>,
    pub effects: &'a mut Effects,
    pub events: &'a mut EventQueue,
    pub rng: &'a mut Pcg32,
}

impl Battlefield<'_> {
    /// Index of the nearest living enemy strictly within `range` of `from`
    pub fn nearest(
        &self,
        from: Vec2,
        range: f32,
        skip: impl Fn(usize, &Enemy) -> bool,
    ) -> Option<usize> {
        let mut best = None;
        let mut best_d2 = range * range;
        for (i, enemy) in self.enemies.iter().enumerate() {
            if !enemy.is_alive() || skip(i, enemy) {
                continue;
            }
            let d2 = dist2(from, enemy.pos);
            if d2 < best_d2 {
                best_d2 = d2;
                best = Some(i);
            }
        }
        best
    }

    /// Strike the enemy at `index`
    pub fn hit(&mut self, index: usize, impact: Impact) -> bool {
        match self.enemies.get_mut(index) {
            Some(enemy) => strike(enemy, impact, self.effects, self.events, self.rng),
            None => false,
        }
    }

    /// Strike every living enemy whose body touches the circle.
    /// `base` goes through the damage modifier before the crit roll.
    pub fn hit_area(
        &mut self,
        center: Vec2,
        radius: f32,
        base: f32,
        shooter: &Shooter,
    ) -> usize {
        self.hit_area_with(center, radius, |rng| shooter.roll(rng, base))
    }

    /// Area strike for an amount that already carries the damage modifier
    pub fn hit_area_prescaled(
        &mut self,
        center: Vec2,
        radius: f32,
        amount: f32,
        shooter: &Shooter,
    ) -> usize {
        self.hit_area_with(center, radius, |rng| shooter.crit(rng, amount))
    }

    fn hit_area_with(
        &mut self,
        center: Vec2,
        radius: f32,
        mut roll: impl FnMut(&mut Pcg32) -> (f32, bool),
    ) -> usize {
        let mut struck = 0;
        for i in 0..self.enemies.len() {
            let enemy = &self.enemies[i];
            if !enemy.is_alive() || !circles_overlap(center, radius, enemy.pos, enemy.radius) {
                continue;
            }
            let at = enemy.pos;
            let (amount, crit) = roll(self.rng);
            self.hit(
                i,
                Impact {
                    amount,
                    crit,
                    at,
                    soft: false,
                },
            );
            struck += 1;
        }
        struck
    }
}

/// Player projectiles against enemies
pub fn resolve_player_projectiles(state: &mut GameState) {
    let GameState {
        enemies,
        projectiles,
        effects,
        events,
        rng,
        ..
    } = state;

    for projectile in projectiles
        .iter_mut()
        .filter(|p| p.faction == Faction::Player && p.is_live())
    {
        let target = enemies.iter().position(|e| {
            e.is_alive()
                && !projectile.hits.contains(&e.id)
                && circles_overlap(projectile.pos, projectile.radius, e.pos, e.radius)
        });
        let Some(index) = target else { continue };

        let enemy = &mut enemies[index];
        projectile.hits.push(enemy.id);
        let impact = Impact {
            amount: projectile.damage,
            crit: projectile.crit,
            at: projectile.pos,
            soft: false,
        };
        strike(enemy, impact, effects, events, rng);

        if projectile.pierce > 0 {
            projectile.pierce -= 1;
        } else {
            projectile.spent = true;
        }
    }
}

/// Mine detonations against enemies
pub fn resolve_blasts(state: &mut GameState, blasts: &[MineBlast]) {
    if blasts.is_empty() {
        return;
    }
    let shooter = Shooter::from_player(&state.player);
    let GameState {
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
    for blast in blasts {
        field.hit_area_prescaled(blast.pos, blast.radius, blast.damage, &shooter);
        field.effects.boom(field.rng, blast.pos, blast.radius);
        field.effects.nova(blast.pos, blast.radius);
    }
}

/// Apply one hit to the player, honoring the invulnerability window.
/// Returns the damage dealt, or None if the player was invulnerable.
fn hurt_player(state: &mut GameState, incoming: f32, source: DamageSource) -> Option<f32> {
    if state.player.iframes > 0.0 || !state.player.is_alive() {
        return None;
    }
    let damage = player_damage(incoming, state.difficulty, state.player.armor, source);
    state.player.take_damage(damage);
    state.player.iframes = source.iframes();

    let pos = state.player.pos;
    state.effects.spark(&mut state.rng, pos, 10);
    state.effects.add_shake(match source {
        DamageSource::Contact => 6.0,
        DamageSource::Ranged => 5.0,
    });
    state.events.push(GameEvent::PlayerHit { damage });
    Some(damage)
}

/// Enemy projectiles and body contact against the player
pub fn resolve_player_hits(state: &mut GameState) {
    let player_pos = state.player.pos;
    let player_radius = state.player.radius;

    for i in 0..state.projectiles.len() {
        let p = &state.projectiles[i];
        if p.faction != Faction::Enemy
            || !p.is_live()
            || !circles_overlap(player_pos, player_radius, p.pos, p.radius)
        {
            continue;
        }
        let incoming = p.damage;
        if hurt_player(state, incoming, DamageSource::Ranged).is_some() {
            state.projectiles[i].spent = true;
        }
    }

    for i in 0..state.enemies.len() {
        let e = &state.enemies[i];
        if !e.is_alive()
            || !e.kind.deals_contact()
            || !circles_overlap(player_pos, player_radius, e.pos, e.radius)
        {
            continue;
        }
        let incoming = e.damage;
        hurt_player(state, incoming, DamageSource::Contact);
    }

    if !state.player.is_alive() {
        state.end_run(RunOutcome::Defeat);
    }
}

/// Remove dead enemies, paying out loot and running death hooks.
/// Returns the number of enemies removed.
pub fn reap_dead_enemies(state: &mut GameState) -> u32 {
    if state.enemies.iter().all(Enemy::is_alive) {
        return 0;
    }
    let (alive, dead): (Vec<Enemy>, Vec<Enemy>) =
        std::mem::take(&mut state.enemies).into_iter().partition(Enemy::is_alive);
    state.enemies = alive;

    for enemy in &dead {
        on_enemy_killed(state, enemy);
    }
    dead.len() as u32
}

fn on_enemy_killed(state: &mut GameState, enemy: &Enemy) {
    let (count, value) = gem_drops(enemy.xp);
    for _ in 0..count {
        let offset = Vec2::new(
            state.rng.random_range(-8.0..8.0),
            state.rng.random_range(-8.0..8.0),
        );
        let vel = Vec2::new(
            state.rng.random_range(-25.0..25.0),
            state.rng.random_range(-25.0..25.0),
        );
        state.gems.push(Gem::new(enemy.pos + offset, vel, value));
    }

    state.effects.boom(&mut state.rng, enemy.pos, enemy.radius * 1.25);
    if enemy.kind == EnemyKind::Boss {
        state.director.boss_defeated();
    }

    // The run summary and meta record are already final
    if state.is_over() || !state.player.is_alive() {
        return;
    }

    if enemy.kind.guaranteed_coins()
        || state.rng.random::<f32>() < coin_drop_chance(state.time)
    {
        state.coins += enemy.coins;
    }
    state.kills += 1;

    match enemy.kind {
        EnemyKind::Chest => {
            state.events.pop_text("TREASURE!", enemy.pos - Vec2::new(0.0, 40.0));
            state.progression.queue(LevelUpSource::Chest);
        }
        EnemyKind::Boss => {
            let heal = state.player.hp_max * BOSS_HEAL_FRACTION;
            state.player.heal(heal);
            state.events.pop_text("BOSS DOWN!", enemy.pos - Vec2::new(0.0, 60.0));
            state.events.push(GameEvent::BossDefeated { pos: enemy.pos });
            log::info!("Boss defeated at {:.1}s", state.time);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MetaProgress;
    use crate::sim::state::ProjectileKind;
    use crate::tuning::Tuning;

    fn state() -> GameState {
        let mut state = GameState::new(11, Tuning::default(), MetaProgress::default());
        state.player.crit_chance = 0.0;
        state
    }

    fn bolt(pos: Vec2, damage: f32, pierce: u32) -> Projectile {
        Projectile::new(
            Faction::Player,
            ProjectileKind::Bolt,
            pos,
            Vec2::ZERO,
            4.5,
            1.0,
            damage,
            pierce,
        )
    }

    #[test]
    fn overlap_boundary_is_inclusive() {
        assert!(circles_overlap(Vec2::ZERO, 3.0, Vec2::new(5.0, 0.0), 2.0));
        assert!(!circles_overlap(Vec2::ZERO, 3.0, Vec2::new(5.01, 0.0), 2.0));
    }

    #[test]
    fn damage_formula_floors_at_one() {
        assert_eq!(player_damage(12.0, 1.0, 0.0, DamageSource::Contact), 14.0);
        assert_eq!(player_damage(12.0, 1.0, 4.0, DamageSource::Contact), 8.0);
        assert_eq!(player_damage(12.0, 1.0, 4.0, DamageSource::Ranged), 10.0);
        assert_eq!(player_damage(5.0, 1.0, 10.0, DamageSource::Contact), 1.0);
    }

    #[test]
    fn loot_tiers() {
        assert_eq!(gem_drops(0), (0, 0));
        assert_eq!(gem_drops(1), (1, 1));
        assert_eq!(gem_drops(2), (2, 1));
        assert_eq!(gem_drops(8), (4, 6));
        assert_eq!(gem_drops(40), (8, 10));
        assert!(coin_drop_chance(0.0) < coin_drop_chance(300.0));
        assert_eq!(coin_drop_chance(10_000.0), 0.25);
    }

    #[test]
    fn grunt_dies_on_second_hit_with_one_gem() {
        let mut state = state();
        state.spawn_enemy(EnemyKind::Grunt, Vec2::new(100.0, 0.0), 1.0);
        assert_eq!(state.enemies[0].hp, 46.0);

        state.projectiles.push(bolt(Vec2::new(100.0, 0.0), 30.0, 0));
        resolve_player_projectiles(&mut state);
        assert_eq!(reap_dead_enemies(&mut state), 0);
        assert_eq!(state.enemies[0].hp, 16.0);
        assert!(state.projectiles[0].spent);

        state.projectiles.push(bolt(Vec2::new(100.0, 0.0), 30.0, 0));
        resolve_player_projectiles(&mut state);
        assert_eq!(reap_dead_enemies(&mut state), 1);
        assert!(state.enemies.is_empty());
        assert_eq!(state.gems.len(), 1);
        assert_eq!(state.gems[0].value, 1);
        assert_eq!(state.kills, 1);

        // Nothing left to credit
        assert_eq!(reap_dead_enemies(&mut state), 0);
        assert_eq!(state.kills, 1);
    }

    #[test]
    fn pierce_passes_through_without_rehitting() {
        let mut state = state();
        state.spawn_enemy(EnemyKind::Tank, Vec2::new(0.0, 50.0), 1.0);
        state.spawn_enemy(EnemyKind::Tank, Vec2::new(0.0, 50.0), 1.0);
        state.projectiles.push(bolt(Vec2::new(0.0, 50.0), 10.0, 1));

        resolve_player_projectiles(&mut state);
        assert!(!state.projectiles[0].spent);
        assert_eq!(state.projectiles[0].pierce, 0);

        // Second pass strikes the other tank, not the same one again
        resolve_player_projectiles(&mut state);
        assert!(state.projectiles[0].spent);
        assert_eq!(state.enemies[0].hp, 105.0);
        assert_eq!(state.enemies[1].hp, 105.0);
    }

    #[test]
    fn contact_respects_iframes() {
        let mut state = state();
        state.spawn_enemy(EnemyKind::Grunt, Vec2::new(5.0, 0.0), 1.0);

        resolve_player_hits(&mut state);
        assert_eq!(state.player.hp, 100.0 - 14.0);
        assert_eq!(state.player.iframes, CONTACT_IFRAMES);

        resolve_player_hits(&mut state);
        assert_eq!(state.player.hp, 100.0 - 14.0);
    }

    #[test]
    fn chests_are_harmless_and_force_an_offer() {
        let mut state = state();
        state.spawn_enemy(EnemyKind::Chest, Vec2::ZERO, 1.0);
        resolve_player_hits(&mut state);
        assert_eq!(state.player.hp, 100.0);

        state.enemies[0].take_hit(1000.0);
        reap_dead_enemies(&mut state);
        assert_eq!(state.coins, 10);
        assert!(state.gems.is_empty());
        assert!(state.progression.has_pending());
    }

    #[test]
    fn ranged_hit_consumes_projectile_and_kills() {
        let mut state = state();
        state.player.hp = 5.0;
        state.projectiles.push(Projectile::new(
            Faction::Enemy,
            ProjectileKind::Spit,
            Vec2::new(3.0, 0.0),
            Vec2::ZERO,
            4.0,
            2.0,
            10.0,
            0,
        ));
        resolve_player_hits(&mut state);
        assert!(state.projectiles[0].spent);
        assert_eq!(state.player.hp, 0.0);
        assert_eq!(state.outcome, Some(RunOutcome::Defeat));
    }

    #[test]
    fn boss_death_clears_alive_flag_and_rewards() {
        let mut state = state();
        state.director.mark_boss_alive();
        state.player.hp = 50.0;
        state.spawn_enemy(EnemyKind::Boss, Vec2::new(300.0, 0.0), 1.0);
        state.enemies[0].take_hit(1.0e6);
        reap_dead_enemies(&mut state);
        assert!(!state.director.boss_alive());
        assert_eq!(state.coins, 50);
        assert_eq!(state.player.hp, 75.0);
        assert_eq!(state.gems.len(), 8);
    }

    #[test]
    fn boss_kill_does_not_revive_a_downed_player() {
        let mut state = state();
        state.director.mark_boss_alive();
        state.player.hp = 1.0;
        state.spawn_enemy(EnemyKind::Grunt, Vec2::new(5.0, 0.0), 1.0);
        state.spawn_enemy(EnemyKind::Boss, Vec2::new(300.0, 0.0), 1.0);
        state.enemies[1].take_hit(1.0e6);

        resolve_player_hits(&mut state);
        reap_dead_enemies(&mut state);

        assert_eq!(state.outcome, Some(RunOutcome::Defeat));
        assert_eq!(state.player.hp, 0.0);
        assert_eq!(state.hud().hp, 0.0);
        assert!(!state.director.boss_alive());
        // Nothing lands after the record was finalized
        assert_eq!(state.coins, 0);
        assert_eq!(state.meta.bank, 0);
    }

    #[test]
    fn blast_hits_each_enemy_in_radius_once() {
        let mut state = state();
        state.spawn_enemy(EnemyKind::Tank, Vec2::new(0.0, 40.0), 1.0);
        // Body edge just inside the radius
        state.spawn_enemy(EnemyKind::Tank, Vec2::new(0.0, -85.0), 1.0);
        state.spawn_enemy(EnemyKind::Tank, Vec2::new(200.0, 0.0), 1.0);

        let blast = MineBlast {
            pos: Vec2::ZERO,
            radius: 70.0,
            damage: 45.0,
        };
        resolve_blasts(&mut state, &[blast]);

        assert_eq!(state.enemies[0].hp, 115.0 - 45.0);
        assert_eq!(state.enemies[1].hp, 115.0 - 45.0);
        assert_eq!(state.enemies[2].hp, 115.0);
    }

    #[test]
    fn blast_damage_is_not_scaled_twice() {
        let mut state = state();
        state.player.mods.damage = 2.0;
        state.spawn_enemy(EnemyKind::Tank, Vec2::ZERO, 1.0);
        let blast = MineBlast {
            pos: Vec2::ZERO,
            radius: 50.0,
            damage: 30.0,
        };
        resolve_blasts(&mut state, &[blast]);
        assert_eq!(state.enemies[0].hp, 85.0);
    }
}
