//! Simulation module
//!
//! All gameplay logic lives here. This module is pure with respect to I/O:
//! - Delta-time is clamped before it reaches any system
//! - Seeded RNG only
//! - No rendering, input device or persistence dependencies

pub mod clock;
pub mod collision;
pub mod director;
pub mod effects;
pub mod events;
pub mod pickup;
pub mod progression;
pub mod state;
pub mod tick;
pub mod weapons;

pub use clock::{FrameClock, clamp_dt};
pub use collision::{DamageSource, circles_overlap, player_damage};
pub use director::Director;
pub use effects::{Effects, EffectsBudget, Particle, ParticleKind};
pub use events::{EventQueue, GameEvent, RunSummary};
pub use progression::{EvolutionId, LevelUpSource, OfferOption, UpgradeId, UpgradeOffer};
pub use state::{
    Enemy, EnemyKind, Faction, GamePhase, GameState, Gem, HudSnapshot, Modifiers, Player,
    Projectile, ProjectileKind, RunOutcome,
};
pub use tick::{TickInput, combine_movement, tick};
pub use weapons::{Arsenal, Weapon, WeaponKind};
