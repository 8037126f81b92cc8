//! Meta-progression record
//!
//! Survives between runs: best/last run time, banked coins and four
//! permanent upgrade ranks bought with those coins.

use serde::{Deserialize, Serialize};

/// Highest purchasable rank per permanent upgrade
pub const MAX_META_RANK: u32 = 5;

/// Coin cost of the first rank; each further rank costs one more step
pub const META_COST_STEP: u64 = 25;

/// Permanent upgrades purchasable between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaUpgrade {
    Hp,
    Damage,
    Move,
    Magnet,
}

impl MetaUpgrade {
    pub const ALL: [MetaUpgrade; 4] = [
        MetaUpgrade::Hp,
        MetaUpgrade::Damage,
        MetaUpgrade::Move,
        MetaUpgrade::Magnet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetaUpgrade::Hp => "Hardened Core",
            MetaUpgrade::Damage => "Overclock",
            MetaUpgrade::Move => "Thrusters",
            MetaUpgrade::Magnet => "Attractor",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MetaError {
    #[error("{0:?} is already at max rank")]
    MaxRank(MetaUpgrade),

    #[error("Need {cost} coins, have {bank}")]
    InsufficientFunds { cost: u64, bank: u64 },
}

/// Ranks bought in each permanent upgrade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaRanks {
    pub hp: u32,
    pub damage: u32,
    #[serde(rename = "move")]
    pub move_speed: u32,
    pub magnet: u32,
}

/// Result of folding a finished run into the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRecordUpdate {
    pub run_time: u32,
    pub new_best: bool,
    pub banked: u64,
}

/// Persistent record loaded once per session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaProgress {
    /// Longest survived run (whole seconds)
    pub best_time: u32,
    /// Most recent run (whole seconds)
    pub last_time: u32,
    /// Banked coins
    pub bank: u64,
    /// Permanent upgrade ranks
    pub ranks: MetaRanks,
}

impl MetaProgress {
    pub fn rank(&self, upgrade: MetaUpgrade) -> u32 {
        match upgrade {
            MetaUpgrade::Hp => self.ranks.hp,
            MetaUpgrade::Damage => self.ranks.damage,
            MetaUpgrade::Move => self.ranks.move_speed,
            MetaUpgrade::Magnet => self.ranks.magnet,
        }
    }

    fn rank_mut(&mut self, upgrade: MetaUpgrade) -> &mut u32 {
        match upgrade {
            MetaUpgrade::Hp => &mut self.ranks.hp,
            MetaUpgrade::Damage => &mut self.ranks.damage,
            MetaUpgrade::Move => &mut self.ranks.move_speed,
            MetaUpgrade::Magnet => &mut self.ranks.magnet,
        }
    }

    /// Cost of the next rank, or None at max rank
    pub fn next_cost(&self, upgrade: MetaUpgrade) -> Option<u64> {
        let rank = self.rank(upgrade);
        (rank < MAX_META_RANK).then(|| META_COST_STEP * (rank as u64 + 1))
    }

    /// Buy the next rank; returns the new rank
    pub fn purchase(&mut self, upgrade: MetaUpgrade) -> Result<u32, MetaError> {
        let cost = self
            .next_cost(upgrade)
            .ok_or(MetaError::MaxRank(upgrade))?;
        if self.bank < cost {
            return Err(MetaError::InsufficientFunds {
                cost,
                bank: self.bank,
            });
        }
        self.bank -= cost;
        let rank = self.rank_mut(upgrade);
        *rank += 1;
        log::info!("Purchased {} rank {}", upgrade.as_str(), *rank);
        Ok(*rank)
    }

    /// Fold a finished run into the record
    pub fn finalize_run(&mut self, elapsed_secs: f32, coins: u64) -> RunRecordUpdate {
        let run_time = elapsed_secs.max(0.0).floor() as u32;
        let new_best = run_time > self.best_time;
        self.last_time = run_time;
        self.best_time = self.best_time.max(run_time);
        self.bank += coins;
        RunRecordUpdate {
            run_time,
            new_best,
            banked: coins,
        }
    }

    /// Clamp ranks loaded from disk into the valid range
    pub fn sanitized(mut self) -> Self {
        for upgrade in MetaUpgrade::ALL {
            let rank = self.rank_mut(upgrade);
            *rank = (*rank).min(MAX_META_RANK);
        }
        self
    }

    /// Extra starting max hp
    pub fn hp_bonus(&self) -> f32 {
        10.0 * self.ranks.hp as f32
    }

    /// Starting damage multiplier
    pub fn damage_multiplier(&self) -> f32 {
        1.0 + 0.05 * self.ranks.damage as f32
    }

    /// Starting move multiplier
    pub fn move_multiplier(&self) -> f32 {
        1.0 + 0.03 * self.ranks.move_speed as f32
    }

    /// Extra starting magnet radius
    pub fn magnet_bonus(&self) -> f32 {
        10.0 * self.ranks.magnet as f32
    }
}

/// Format whole seconds as mm:ss
pub fn format_time(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_tracks_best_and_last() {
        let mut meta = MetaProgress::default();
        let update = meta.finalize_run(95.7, 12);
        assert_eq!(update.run_time, 95);
        assert!(update.new_best);
        assert_eq!(meta.best_time, 95);
        assert_eq!(meta.bank, 12);

        let update = meta.finalize_run(30.0, 3);
        assert!(!update.new_best);
        assert_eq!(meta.best_time, 95);
        assert_eq!(meta.last_time, 30);
        assert_eq!(meta.bank, 15);
    }

    #[test]
    fn purchase_costs_escalate() {
        let mut meta = MetaProgress {
            bank: 80,
            ..Default::default()
        };
        assert_eq!(meta.purchase(MetaUpgrade::Hp), Ok(1));
        assert_eq!(meta.bank, 55);
        assert_eq!(meta.purchase(MetaUpgrade::Hp), Ok(2));
        assert_eq!(meta.bank, 5);
        assert_eq!(
            meta.purchase(MetaUpgrade::Hp),
            Err(MetaError::InsufficientFunds { cost: 75, bank: 5 })
        );
        assert_eq!(meta.hp_bonus(), 20.0);
    }

    #[test]
    fn max_rank_is_enforced() {
        let mut meta = MetaProgress {
            bank: 10_000,
            ..Default::default()
        };
        for _ in 0..MAX_META_RANK {
            meta.purchase(MetaUpgrade::Move).unwrap();
        }
        assert_eq!(
            meta.purchase(MetaUpgrade::Move),
            Err(MetaError::MaxRank(MetaUpgrade::Move))
        );
        assert_eq!(meta.next_cost(MetaUpgrade::Move), None);
    }

    #[test]
    fn sanitize_clamps_ranks() {
        let meta = MetaProgress {
            ranks: MetaRanks {
                damage: 40,
                ..Default::default()
            },
            ..Default::default()
        }
        .sanitized();
        assert_eq!(meta.rank(MetaUpgrade::Damage), MAX_META_RANK);
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(605), "10:05");
    }
}
