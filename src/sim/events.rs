//! Transient UI events produced by the simulation
//!
//! The host drains these after each frame; the simulation never reads them back.

use glam::Vec2;

use super::progression::{EvolutionId, UpgradeId, UpgradeOffer};
use super::state::RunOutcome;

/// Cosmetic events past this many undrained entries are dropped
pub const MAX_COSMETIC_BACKLOG: usize = 512;

/// Final stats of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub elapsed: f32,
    pub level: u32,
    pub kills: u32,
    pub coins: u64,
    pub new_best: bool,
    pub best_time: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Floating text at a world position
    PopText { text: String, pos: Vec2 },
    /// Floating damage number
    DamageNumber { amount: f32, pos: Vec2, crit: bool },
    LevelUp { level: u32 },
    /// Choices awaiting [`crate::sim::GameState::choose_upgrade`]
    UpgradeOffer(UpgradeOffer),
    UpgradeApplied { id: UpgradeId },
    Evolved { id: EvolutionId },
    EliteSpawned { pos: Vec2 },
    ChestSpawned { pos: Vec2 },
    BossSpawned { pos: Vec2 },
    BossDefeated { pos: Vec2 },
    PlayerHit { damage: f32 },
    RunEnded(RunSummary),
}

/// Event sink owned by the game state
#[derive(Debug, Clone)]
pub struct EventQueue {
    queue: Vec<GameEvent>,
    /// Emit [`GameEvent::DamageNumber`]s
    pub damage_numbers: bool,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            damage_numbers: true,
        }
    }
}

impl EventQueue {
    pub fn push(&mut self, event: GameEvent) {
        self.queue.push(event);
    }

    /// Text and damage numbers are only worth showing if someone drains them
    fn backlogged(&self) -> bool {
        self.queue.len() >= MAX_COSMETIC_BACKLOG
    }

    pub fn pop_text(&mut self, text: impl Into<String>, pos: Vec2) {
        if self.backlogged() {
            return;
        }
        self.queue.push(GameEvent::PopText {
            text: text.into(),
            pos,
        });
    }

    pub fn damage_number(&mut self, amount: f32, pos: Vec2, crit: bool) {
        if self.damage_numbers && !self.backlogged() {
            self.queue.push(GameEvent::DamageNumber { amount, pos, crit });
        }
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.queue)
    }

    pub fn pending(&self) -> &[GameEvent] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_numbers_can_be_muted() {
        let mut events = EventQueue::default();
        events.damage_number(12.0, Vec2::ZERO, false);
        events.damage_numbers = false;
        events.damage_number(12.0, Vec2::ZERO, true);
        events.pop_text("ELITE!", Vec2::ZERO);
        let drained = events.drain();
        assert_eq!(drained.len(), 2);
        assert!(events.is_empty());
    }

    #[test]
    fn undrained_cosmetics_are_capped() {
        let mut events = EventQueue::default();
        for _ in 0..MAX_COSMETIC_BACKLOG * 2 {
            events.damage_number(1.0, Vec2::ZERO, false);
            events.pop_text("x", Vec2::ZERO);
        }
        assert_eq!(events.len(), MAX_COSMETIC_BACKLOG);

        // Gameplay events still get through
        events.push(GameEvent::LevelUp { level: 2 });
        assert_eq!(events.len(), MAX_COSMETIC_BACKLOG + 1);
        assert!(matches!(
            events.pending().last(),
            Some(GameEvent::LevelUp { level: 2 })
        ));
    }
}
