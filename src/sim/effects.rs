//! Particle effects
//!
//! Particles are visual only, with one exception: a deployed mine rides in
//! the same list and detonates for real damage when its life runs out.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::polar_to_cartesian;

/// Velocity retained per second by drifting particles
const PARTICLE_DRAG: f32 = 0.04;
/// Shake decay per second
const SHAKE_DECAY: f32 = 20.0;

/// Host-selected limits on effect output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectsBudget {
    /// Cap on visual particles (mines are exempt)
    pub max_particles: usize,
    pub damage_numbers: bool,
    pub screen_shake: bool,
}

impl Default for EffectsBudget {
    fn default() -> Self {
        Self {
            max_particles: 600,
            damage_numbers: true,
            screen_shake: true,
        }
    }
}

/// Simulation payload of a deployed mine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MineCharge {
    /// Time until armed
    pub arm_timer: f32,
    pub blast_radius: f32,
    /// Damage before the crit roll
    pub damage: f32,
}

impl MineCharge {
    pub fn is_armed(&self) -> bool {
        self.arm_timer <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParticleKind {
    Puff,
    Spark,
    Boom,
    /// Death ring
    Ring,
    /// Pulse shockwave
    Nova,
    /// Chain lightning segment
    Zap { to: Vec2 },
    Mine(MineCharge),
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Seconds remaining
    pub life: f32,
    pub kind: ParticleKind,
}

impl Particle {
    pub fn is_mine(&self) -> bool {
        matches!(self.kind, ParticleKind::Mine(_))
    }
}

/// A mine that reached the end of its fuse this step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MineBlast {
    pub pos: Vec2,
    pub radius: f32,
    pub damage: f32,
}

/// Particle list plus render-only camera shake
#[derive(Debug, Clone)]
pub struct Effects {
    particles: Vec<Particle>,
    mines: usize,
    budget: EffectsBudget,
    shake: f32,
}

impl Effects {
    pub fn new(budget: EffectsBudget) -> Self {
        Self {
            particles: Vec::new(),
            mines: 0,
            budget,
            shake: 0.0,
        }
    }

    pub fn set_budget(&mut self, budget: EffectsBudget) {
        self.budget = budget;
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn mine_count(&self) -> usize {
        self.mines
    }

    pub fn shake(&self) -> f32 {
        self.shake
    }

    pub fn add_shake(&mut self, amount: f32) {
        if self.budget.screen_shake {
            self.shake = self.shake.max(amount);
        }
    }

    fn push_visual(&mut self, particle: Particle) {
        if self.particles.len() - self.mines < self.budget.max_particles {
            self.particles.push(particle);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn scatter(
        &mut self,
        rng: &mut Pcg32,
        kind: ParticleKind,
        pos: Vec2,
        n: usize,
        speed: f32,
        radius: (f32, f32),
        life: (f32, f32),
    ) {
        for _ in 0..n {
            let vel = Vec2::new(
                rng.random_range(-speed..speed),
                rng.random_range(-speed..speed),
            );
            let particle = Particle {
                pos,
                vel,
                radius: rng.random_range(radius.0..radius.1),
                life: rng.random_range(life.0..life.1),
                kind,
            };
            self.push_visual(particle);
        }
    }

    /// Soft smoke (firing, pickups)
    pub fn puff(&mut self, rng: &mut Pcg32, pos: Vec2, n: usize) {
        self.scatter(rng, ParticleKind::Puff, pos, n, 60.0, (2.0, 5.0), (0.25, 0.55));
    }

    /// Hit sparks
    pub fn spark(&mut self, rng: &mut Pcg32, pos: Vec2, n: usize) {
        self.scatter(rng, ParticleKind::Spark, pos, n, 160.0, (1.5, 3.2), (0.18, 0.35));
    }

    /// Death burst with a ring
    pub fn boom(&mut self, rng: &mut Pcg32, pos: Vec2, radius: f32) {
        for _ in 0..18 {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let speed = rng.random_range(70.0..240.0);
            let particle = Particle {
                pos,
                vel: polar_to_cartesian(speed, angle),
                radius: rng.random_range(2.5..5.2),
                life: rng.random_range(0.25..0.6),
                kind: ParticleKind::Boom,
            };
            self.push_visual(particle);
        }
        self.push_visual(Particle {
            pos,
            vel: Vec2::ZERO,
            radius,
            life: 0.25,
            kind: ParticleKind::Ring,
        });
        self.add_shake(4.0);
    }

    /// Pulse shockwave ring
    pub fn nova(&mut self, pos: Vec2, radius: f32) {
        self.push_visual(Particle {
            pos,
            vel: Vec2::ZERO,
            radius,
            life: 0.35,
            kind: ParticleKind::Nova,
        });
    }

    /// Lightning segment between two points
    pub fn zap(&mut self, from: Vec2, to: Vec2) {
        self.push_visual(Particle {
            pos: from,
            vel: Vec2::ZERO,
            radius: 0.0,
            life: 0.08,
            kind: ParticleKind::Zap { to },
        });
    }

    /// Deploy a mine that arms after `arm` seconds and detonates `fuse` seconds later
    pub fn lay_mine(&mut self, pos: Vec2, arm: f32, fuse: f32, blast_radius: f32, damage: f32) {
        self.particles.push(Particle {
            pos,
            vel: Vec2::ZERO,
            radius: 6.0,
            life: arm.max(0.0) + fuse.max(0.0),
            kind: ParticleKind::Mine(MineCharge {
                arm_timer: arm.max(0.0),
                blast_radius,
                damage,
            }),
        });
        self.mines += 1;
    }

    /// Advance mine fuses, removing and returning the ones that detonate
    pub fn tick_mines(&mut self, dt: f32) -> Vec<MineBlast> {
        if self.mines == 0 {
            return Vec::new();
        }
        let mut blasts = Vec::new();
        for particle in &mut self.particles {
            if let ParticleKind::Mine(ref mut charge) = particle.kind {
                charge.arm_timer = (charge.arm_timer - dt).max(0.0);
                particle.life -= dt;
                if particle.life <= 0.0 {
                    blasts.push(MineBlast {
                        pos: particle.pos,
                        radius: charge.blast_radius,
                        damage: charge.damage,
                    });
                }
            }
        }
        if !blasts.is_empty() {
            self.particles.retain(|p| !(p.is_mine() && p.life <= 0.0));
            self.mines -= blasts.len();
        }
        blasts
    }

    /// Advance visual particles and decay shake
    pub fn update_visuals(&mut self, dt: f32) {
        let drag = PARTICLE_DRAG.powf(dt);
        for particle in &mut self.particles {
            match particle.kind {
                ParticleKind::Mine(_) => continue,
                ParticleKind::Puff | ParticleKind::Spark | ParticleKind::Boom => {
                    particle.pos += particle.vel * dt;
                    particle.vel *= drag;
                }
                _ => {}
            }
            particle.life -= dt;
        }
        self.particles.retain(|p| p.is_mine() || p.life > 0.0);
        self.shake = (self.shake - SHAKE_DECAY * dt).max(0.0);
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.mines = 0;
        self.shake = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn mine_detonates_once_after_arm_and_fuse() {
        let mut fx = Effects::new(EffectsBudget::default());
        fx.lay_mine(Vec2::new(5.0, 5.0), 0.5, 1.0, 70.0, 45.0);

        let mut blasts = Vec::new();
        let mut armed_seen = false;
        for _ in 0..100 {
            blasts.extend(fx.tick_mines(0.02));
            if let Some(ParticleKind::Mine(charge)) = fx.particles().first().map(|p| p.kind) {
                armed_seen |= charge.is_armed();
            }
        }
        assert!(armed_seen);
        assert_eq!(blasts.len(), 1);
        assert_eq!(blasts[0].radius, 70.0);
        assert_eq!(fx.mine_count(), 0);
        assert!(fx.particles().is_empty());
    }

    #[test]
    fn visual_cap_exempts_mines() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut fx = Effects::new(EffectsBudget {
            max_particles: 4,
            ..Default::default()
        });
        fx.lay_mine(Vec2::ZERO, 0.5, 1.0, 70.0, 45.0);
        fx.spark(&mut rng, Vec2::ZERO, 10);
        assert_eq!(fx.particles().len(), 5);
        assert_eq!(fx.mine_count(), 1);
    }

    #[test]
    fn visuals_expire_but_mines_wait_for_their_fuse() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut fx = Effects::new(EffectsBudget::default());
        fx.puff(&mut rng, Vec2::ZERO, 6);
        fx.lay_mine(Vec2::ZERO, 0.5, 1.0, 70.0, 45.0);
        for _ in 0..40 {
            fx.update_visuals(0.033);
        }
        assert_eq!(fx.particles().len(), 1);
        assert!(fx.particles()[0].is_mine());
    }

    #[test]
    fn shake_respects_budget_and_decays() {
        let mut fx = Effects::new(EffectsBudget {
            screen_shake: false,
            ..Default::default()
        });
        fx.add_shake(6.0);
        assert_eq!(fx.shake(), 0.0);

        fx.set_budget(EffectsBudget::default());
        fx.add_shake(6.0);
        fx.update_visuals(0.1);
        assert!((fx.shake() - 4.0).abs() < 1e-4);
    }
}
