//! Gem physics: drift, magnet attraction and collection

use glam::Vec2;

use super::state::GameState;
use crate::consts::*;
use crate::direction_or_unit;

/// Acceleration toward the player for a gem at `distance`.
/// Zero at or beyond the magnet radius, growing linearly inside it.
pub fn magnet_pull(distance: f32, magnet: f32) -> f32 {
    if magnet <= 0.0 || distance >= magnet {
        return 0.0;
    }
    (1.0 - distance.max(0.0) / magnet) * MAGNET_PULL
}

/// Move gems and collect the ones touching the player.
/// Returns the total xp picked up.
pub fn update_gems(state: &mut GameState, dt: f32) -> u32 {
    let player_pos = state.player.pos;
    let magnet = state.player.magnet;
    let reach = state.player.radius + GEM_RADIUS + PICKUP_SLACK;
    let damping = GEM_DAMPING.powf(dt);

    let mut collected = 0u32;
    let mut picked: Vec<Vec2> = Vec::new();
    state.gems.retain_mut(|gem| {
        gem.age += dt;
        let to_player = player_pos - gem.pos;
        let distance = to_player.length();
        let pull = magnet_pull(distance, magnet);
        if pull > 0.0 {
            gem.vel += direction_or_unit(to_player) * pull * dt;
        }
        gem.vel *= damping;
        gem.pos += gem.vel * dt;

        if gem.pos.distance(player_pos) <= reach {
            collected = collected.saturating_add(gem.value);
            picked.push(gem.pos);
            false
        } else {
            true
        }
    });

    for pos in picked {
        state.effects.puff(&mut state.rng, pos, 2);
    }
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MetaProgress;
    use crate::sim::state::Gem;
    use crate::tuning::Tuning;

    #[test]
    fn pull_is_zero_at_the_boundary() {
        assert_eq!(magnet_pull(110.0, 110.0), 0.0);
        assert_eq!(magnet_pull(200.0, 110.0), 0.0);
        assert!((magnet_pull(55.0, 110.0) - 0.5 * MAGNET_PULL).abs() < 1e-3);
        assert_eq!(magnet_pull(0.0, 110.0), MAGNET_PULL);
    }

    #[test]
    fn gem_inside_magnet_drifts_in_and_is_collected() {
        let mut state = GameState::new(2, Tuning::default(), MetaProgress::default());
        state.gems.push(Gem::new(Vec2::new(60.0, 0.0), Vec2::ZERO, 6));
        state.gems.push(Gem::new(Vec2::new(500.0, 0.0), Vec2::ZERO, 1));

        let mut xp = 0;
        for _ in 0..200 {
            xp += update_gems(&mut state, 0.016);
        }
        assert_eq!(xp, 6);
        assert_eq!(state.gems.len(), 1);
        assert_eq!(state.gems[0].pos, Vec2::new(500.0, 0.0));
    }

    #[test]
    fn pickup_reach_includes_slack() {
        let mut state = GameState::new(3, Tuning::default(), MetaProgress::default());
        state.player.magnet = 0.0;
        state.gems.push(Gem::new(Vec2::new(21.0, 0.0), Vec2::ZERO, 1));
        state.gems.push(Gem::new(Vec2::new(21.5, 0.0), Vec2::ZERO, 1));
        assert_eq!(update_gems(&mut state, 0.0), 1);
        assert_eq!(state.gems.len(), 1);
    }
}
