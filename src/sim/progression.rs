//! Progression: experience, level-ups, upgrade offers and evolutions

use std::collections::{BTreeSet, VecDeque};

use rand::seq::{IndexedRandom, SliceRandom};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::events::{EventQueue, GameEvent};
use super::state::{ModifierKind, Player};
use super::weapons::WeaponKind;

/// What triggered a pending level-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelUpSource {
    /// Crossed an xp threshold
    Level,
    /// Opened a chest (never evolves)
    Chest,
}

/// Display grouping of an upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeTag {
    Weapon,
    Passive,
}

/// Every upgrade the pool can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeId {
    LineShot,
    Orbit,
    Pulse,
    Chain,
    Scatter,
    Seeker,
    Mine,
    Cooldown,
    Damage,
    Area,
    Move,
    ProjectileSpeed,
    MaxHp,
    Regen,
    Magnet,
    Armor,
    Crit,
}

impl UpgradeId {
    pub const ALL: [UpgradeId; 17] = [
        UpgradeId::LineShot,
        UpgradeId::Orbit,
        UpgradeId::Pulse,
        UpgradeId::Chain,
        UpgradeId::Scatter,
        UpgradeId::Seeker,
        UpgradeId::Mine,
        UpgradeId::Cooldown,
        UpgradeId::Damage,
        UpgradeId::Area,
        UpgradeId::Move,
        UpgradeId::ProjectileSpeed,
        UpgradeId::MaxHp,
        UpgradeId::Regen,
        UpgradeId::Magnet,
        UpgradeId::Armor,
        UpgradeId::Crit,
    ];

    /// The weapon this upgrade levels, if any
    pub fn weapon(self) -> Option<WeaponKind> {
        match self {
            UpgradeId::LineShot => Some(WeaponKind::LineShot),
            UpgradeId::Orbit => Some(WeaponKind::Orbit),
            UpgradeId::Pulse => Some(WeaponKind::Pulse),
            UpgradeId::Chain => Some(WeaponKind::Chain),
            UpgradeId::Scatter => Some(WeaponKind::Scatter),
            UpgradeId::Seeker => Some(WeaponKind::Seeker),
            UpgradeId::Mine => Some(WeaponKind::Mine),
            UpgradeId::Cooldown
            | UpgradeId::Damage
            | UpgradeId::Area
            | UpgradeId::Move
            | UpgradeId::ProjectileSpeed
            | UpgradeId::MaxHp
            | UpgradeId::Regen
            | UpgradeId::Magnet
            | UpgradeId::Armor
            | UpgradeId::Crit => None,
        }
    }

    pub fn tag(self) -> UpgradeTag {
        if self.weapon().is_some() {
            UpgradeTag::Weapon
        } else {
            UpgradeTag::Passive
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            UpgradeId::LineShot
            | UpgradeId::Orbit
            | UpgradeId::Pulse
            | UpgradeId::Chain
            | UpgradeId::Scatter
            | UpgradeId::Seeker
            | UpgradeId::Mine => self.weapon().map_or("", WeaponKind::title),
            UpgradeId::Cooldown => "Haste Core",
            UpgradeId::Damage => "Power Cell",
            UpgradeId::Area => "Amplifier",
            UpgradeId::Move => "Boots",
            UpgradeId::ProjectileSpeed => "Accelerator",
            UpgradeId::MaxHp => "Hull Plating",
            UpgradeId::Regen => "Nanites",
            UpgradeId::Magnet => "Magnet",
            UpgradeId::Armor => "Armor",
            UpgradeId::Crit => "Lucky Charm",
        }
    }

    /// Eligibility doubles as the upgrade's cap
    pub fn is_eligible(self, player: &Player) -> bool {
        match self {
            UpgradeId::LineShot
            | UpgradeId::Orbit
            | UpgradeId::Pulse
            | UpgradeId::Chain
            | UpgradeId::Scatter
            | UpgradeId::Seeker
            | UpgradeId::Mine => self
                .weapon()
                .is_some_and(|kind| player.arsenal.get(kind).can_level()),
            UpgradeId::Cooldown => player.mods.cooldown < 1.75,
            UpgradeId::Damage => player.mods.damage < 3.0,
            UpgradeId::Area => player.mods.area < 2.8,
            UpgradeId::Move => player.mods.movement < 2.0,
            UpgradeId::ProjectileSpeed => player.mods.projectile < 2.0,
            UpgradeId::MaxHp => player.hp_max < 220.0,
            UpgradeId::Regen => player.regen < 3.0,
            UpgradeId::Magnet => player.magnet < 220.0,
            UpgradeId::Armor => player.armor < 10.0,
            UpgradeId::Crit => player.crit_chance < 0.4,
        }
    }

    pub fn apply(self, player: &mut Player) {
        match self {
            UpgradeId::LineShot
            | UpgradeId::Orbit
            | UpgradeId::Pulse
            | UpgradeId::Chain
            | UpgradeId::Scatter
            | UpgradeId::Seeker
            | UpgradeId::Mine => {
                if let Some(kind) = self.weapon() {
                    player.arsenal.get_mut(kind).level_up();
                }
            }
            UpgradeId::Cooldown => player.mods.cooldown *= 1.10,
            UpgradeId::Damage => player.mods.damage *= 1.12,
            UpgradeId::Area => player.mods.area *= 1.10,
            UpgradeId::Move => player.mods.movement *= 1.08,
            UpgradeId::ProjectileSpeed => player.mods.projectile *= 1.10,
            UpgradeId::MaxHp => {
                player.hp_max += 20.0;
                player.heal(20.0);
            }
            UpgradeId::Regen => player.regen += 0.35,
            UpgradeId::Magnet => player.magnet += 18.0,
            UpgradeId::Armor => player.armor += 1.0,
            UpgradeId::Crit => player.crit_chance += 0.04,
        }
    }

    /// Short text for an offer card
    pub fn describe(self, player: &Player) -> String {
        match self {
            UpgradeId::LineShot
            | UpgradeId::Orbit
            | UpgradeId::Pulse
            | UpgradeId::Chain
            | UpgradeId::Scatter
            | UpgradeId::Seeker
            | UpgradeId::Mine => {
                let level = self.weapon().map_or(0, |kind| player.arsenal.level(kind));
                if level == 0 {
                    "New weapon".to_string()
                } else {
                    format!("Lv {} -> {}", level, level + 1)
                }
            }
            UpgradeId::Cooldown => "+10% fire rate".to_string(),
            UpgradeId::Damage => "+12% damage".to_string(),
            UpgradeId::Area => "+10% area".to_string(),
            UpgradeId::Move => "+8% move speed".to_string(),
            UpgradeId::ProjectileSpeed => "+10% projectile speed".to_string(),
            UpgradeId::MaxHp => "+20 max hp".to_string(),
            UpgradeId::Regen => "+0.35 hp/s".to_string(),
            UpgradeId::Magnet => "+18 pickup radius".to_string(),
            UpgradeId::Armor => "+1 armor".to_string(),
            UpgradeId::Crit => "+4% crit chance".to_string(),
        }
    }
}

/// One-time weapon evolutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EvolutionId {
    ArcaneLance,
    HaloSaws,
    Overcharge,
    StormLattice,
    FlechetteStorm,
    SwarmProtocol,
    ClusterCharge,
}

/// Requirements for an evolution
#[derive(Debug, Clone, Copy)]
pub struct Synergy {
    pub id: EvolutionId,
    pub weapon: WeaponKind,
    pub min_level: u32,
    pub modifier: ModifierKind,
    pub min_multiplier: f32,
}

pub const SYNERGIES: [Synergy; 7] = [
    Synergy {
        id: EvolutionId::ArcaneLance,
        weapon: WeaponKind::LineShot,
        min_level: 6,
        modifier: ModifierKind::Damage,
        min_multiplier: 1.3,
    },
    Synergy {
        id: EvolutionId::HaloSaws,
        weapon: WeaponKind::Orbit,
        min_level: 5,
        modifier: ModifierKind::Area,
        min_multiplier: 1.3,
    },
    Synergy {
        id: EvolutionId::Overcharge,
        weapon: WeaponKind::Pulse,
        min_level: 4,
        modifier: ModifierKind::Cooldown,
        min_multiplier: 1.3,
    },
    Synergy {
        id: EvolutionId::StormLattice,
        weapon: WeaponKind::Chain,
        min_level: 4,
        modifier: ModifierKind::Damage,
        min_multiplier: 1.25,
    },
    Synergy {
        id: EvolutionId::FlechetteStorm,
        weapon: WeaponKind::Scatter,
        min_level: 4,
        modifier: ModifierKind::ProjectileSpeed,
        min_multiplier: 1.2,
    },
    Synergy {
        id: EvolutionId::SwarmProtocol,
        weapon: WeaponKind::Seeker,
        min_level: 4,
        modifier: ModifierKind::Cooldown,
        min_multiplier: 1.2,
    },
    Synergy {
        id: EvolutionId::ClusterCharge,
        weapon: WeaponKind::Mine,
        min_level: 4,
        modifier: ModifierKind::Area,
        min_multiplier: 1.25,
    },
];

impl EvolutionId {
    pub fn synergy(self) -> &'static Synergy {
        &SYNERGIES[self as usize]
    }

    pub fn title(self) -> &'static str {
        match self {
            EvolutionId::ArcaneLance => "Arcane Lance",
            EvolutionId::HaloSaws => "Halo Saws",
            EvolutionId::Overcharge => "Overcharge",
            EvolutionId::StormLattice => "Storm Lattice",
            EvolutionId::FlechetteStorm => "Flechette Storm",
            EvolutionId::SwarmProtocol => "Swarm Protocol",
            EvolutionId::ClusterCharge => "Cluster Charge",
        }
    }
}

/// A card in an upgrade offer
#[derive(Debug, Clone, PartialEq)]
pub struct OfferOption {
    pub id: UpgradeId,
    pub title: &'static str,
    pub tag: UpgradeTag,
    pub description: String,
}

/// Choices awaiting the host
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeOffer {
    pub source: LevelUpSource,
    pub options: Vec<OfferOption>,
}

/// Xp needed to advance past `level`
pub fn xp_for_level(level: u32) -> u32 {
    let l = level as f32;
    (18.0 + 8.0 * l + 2.0 * l.powf(1.2)).floor() as u32
}

/// Level-up queue, active offer and consumed evolutions
#[derive(Debug, Clone, Default)]
pub struct Progression {
    consumed: BTreeSet<EvolutionId>,
    pending: VecDeque<LevelUpSource>,
    active_offer: Option<UpgradeOffer>,
}

impl Progression {
    pub fn queue(&mut self, source: LevelUpSource) {
        self.pending.push_back(source);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn active_offer(&self) -> Option<&UpgradeOffer> {
        self.active_offer.as_ref()
    }

    pub fn is_consumed(&self, id: EvolutionId) -> bool {
        self.consumed.contains(&id)
    }

    /// Evolutions whose requirements are met and that have not fired yet
    pub fn qualifying_evolutions(&self, player: &Player) -> Vec<EvolutionId> {
        SYNERGIES
            .iter()
            .filter(|s| !self.consumed.contains(&s.id))
            .filter(|s| player.arsenal.level(s.weapon) >= s.min_level)
            .filter(|s| player.mods.get(s.modifier) >= s.min_multiplier)
            .map(|s| s.id)
            .collect()
    }

    /// Up to `n` distinct eligible upgrades in random order
    pub fn draw_offer(player: &Player, rng: &mut Pcg32, n: usize) -> Vec<UpgradeId> {
        let mut eligible: Vec<UpgradeId> = UpgradeId::ALL
            .into_iter()
            .filter(|id| id.is_eligible(player))
            .collect();
        eligible.shuffle(rng);
        eligible.truncate(n);
        eligible
    }

    /// Work through queued level-ups until one needs a choice.
    /// Returns true while an offer is waiting.
    pub fn resolve_pending(
        &mut self,
        player: &mut Player,
        rng: &mut Pcg32,
        events: &mut EventQueue,
        offer_size: usize,
    ) -> bool {
        while self.active_offer.is_none() {
            let Some(source) = self.pending.pop_front() else {
                return false;
            };

            if source == LevelUpSource::Level {
                let qualifying = self.qualifying_evolutions(player);
                if let Some(&id) = qualifying.choose(rng) {
                    self.consumed.insert(id);
                    player.arsenal.get_mut(id.synergy().weapon).apply_evolution();
                    events.pop_text(format!("EVOLVED: {}", id.title()), player.pos);
                    events.push(GameEvent::Evolved { id });
                    log::info!("Evolution: {}", id.title());
                    continue;
                }
            }

            let ids = Self::draw_offer(player, rng, offer_size);
            if ids.is_empty() {
                log::debug!("No eligible upgrades for {:?} level-up", source);
                continue;
            }
            let offer = UpgradeOffer {
                source,
                options: ids
                    .into_iter()
                    .map(|id| OfferOption {
                        id,
                        title: id.title(),
                        tag: id.tag(),
                        description: id.describe(player),
                    })
                    .collect(),
            };
            log::debug!(
                "Upgrade offer ({:?}): {:?}",
                source,
                offer.options.iter().map(|o| o.id).collect::<Vec<_>>()
            );
            events.push(GameEvent::UpgradeOffer(offer.clone()));
            self.active_offer = Some(offer);
        }
        true
    }

    /// Apply the option at `index` of the active offer.
    /// Out of range (or no offer) leaves everything untouched.
    pub fn choose(
        &mut self,
        index: usize,
        player: &mut Player,
        events: &mut EventQueue,
    ) -> Option<UpgradeId> {
        let id = self.active_offer.as_ref()?.options.get(index)?.id;
        self.active_offer = None;
        id.apply(player);
        events.push(GameEvent::UpgradeApplied { id });
        log::debug!("Upgrade chosen: {:?}", id);
        Some(id)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Add xp, crossing as many thresholds as it covers.
/// Returns the number of levels gained.
pub fn gain_xp(
    player: &mut Player,
    progression: &mut Progression,
    amount: u32,
    events: &mut EventQueue,
) -> u32 {
    player.xp = player.xp.saturating_add(amount);
    let mut gained = 0;
    while player.xp_to_next > 0 && player.xp >= player.xp_to_next {
        player.xp -= player.xp_to_next;
        player.set_level(player.level + 1);
        progression.queue(LevelUpSource::Level);
        events.push(GameEvent::LevelUp {
            level: player.level,
        });
        gained += 1;
    }
    if gained > 0 {
        log::debug!("Level {} (next at {} xp)", player.level, player.xp_to_next);
    }
    gained
}
