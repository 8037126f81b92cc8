//! Neon Survivors - An arcade survival simulation core
//!
//! Core modules:
//! - `sim`: Simulation (entities, director, weapons, combat, progression)
//! - `meta`: Persistent meta-progression record and upgrade shop
//! - `persistence`: Save/load of the meta record with a versioned envelope
//! - `settings`: Player preferences
//! - `tuning`: Data-driven game balance
//! - `session`: Host glue driving the simulation frame by frame

pub mod meta;
pub mod persistence;
pub mod session;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use meta::{MetaProgress, MetaUpgrade};
pub use session::Session;
pub use settings::{QualityPreset, Settings};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Largest delta-time a single step may consume (seconds)
    pub const MAX_DT: f32 = 0.033;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 14.0;
    pub const PLAYER_HP: f32 = 100.0;
    pub const PLAYER_MAGNET: f32 = 110.0;
    pub const PLAYER_CRIT_MULT: f32 = 2.0;
    pub const FIRST_LEVEL_XP: u32 = 20;

    /// Camera follow factor per step
    pub const CAMERA_SMOOTHING: f32 = 0.12;

    /// Invulnerability windows after being hit (seconds)
    pub const CONTACT_IFRAMES: f32 = 0.35;
    pub const RANGED_IFRAMES: f32 = 0.25;
    /// Armor effectiveness per damage source
    pub const CONTACT_ARMOR_FACTOR: f32 = 1.5;
    pub const RANGED_ARMOR_FACTOR: f32 = 1.0;
    /// Extra incoming damage per point of difficulty
    pub const DIFFICULTY_DAMAGE: f32 = 2.0;

    /// Gem pickups
    pub const GEM_RADIUS: f32 = 5.0;
    pub const GEM_DAMPING: f32 = 0.12;
    pub const MAGNET_PULL: f32 = 950.0;
    pub const PICKUP_SLACK: f32 = 2.0;

    /// Enemy hit flash duration (render feedback)
    pub const HIT_FLASH: f32 = 0.08;
}

/// Squared distance between two points
#[inline]
pub fn dist2(a: Vec2, b: Vec2) -> f32 {
    a.distance_squared(b)
}

/// Unit vector of `v`, falling back to +X for a zero-length vector
#[inline]
pub fn direction_or_unit(v: Vec2) -> Vec2 {
    let len = v.length();
    if len > f32::EPSILON && len.is_finite() {
        v / len
    } else {
        Vec2::X
    }
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Rotate `from` toward `to` by at most `max_angle` radians, keeping its length
pub fn rotate_toward(from: Vec2, to: Vec2, max_angle: f32) -> Vec2 {
    let speed = from.length();
    let current = from.y.atan2(from.x);
    let target = to.y.atan2(to.x);
    let mut delta = target - current;
    if delta > std::f32::consts::PI {
        delta -= std::f32::consts::TAU;
    } else if delta < -std::f32::consts::PI {
        delta += std::f32::consts::TAU;
    }
    let angle = current + delta.clamp(-max_angle, max_angle);
    polar_to_cartesian(speed, angle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_vector_direction_falls_back_to_unit() {
        assert_eq!(direction_or_unit(Vec2::ZERO), Vec2::X);
        let d = direction_or_unit(Vec2::new(0.0, -4.0));
        assert!((d - Vec2::new(0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn rotate_toward_is_limited() {
        let v = rotate_toward(Vec2::new(10.0, 0.0), Vec2::new(0.0, 1.0), 0.1);
        assert!((v.length() - 10.0).abs() < 1e-4);
        assert!((v.y.atan2(v.x) - 0.1).abs() < 1e-5);

        let v = rotate_toward(Vec2::new(10.0, 0.0), Vec2::new(1.0, 0.01), 0.5);
        assert!((v.y.atan2(v.x) - 0.01).abs() < 1e-4);
    }
}
