//! Game settings and preferences
//!
//! Persisted separately from the meta-progression record.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::persistence::PersistenceError;
use crate::sim::EffectsBudget;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum visual particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 150,
            QualityPreset::Medium => 600,
            QualityPreset::High => 2000,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Visual Effects ===
    /// Particle effects (sparks, bursts, rings)
    pub particles: bool,
    /// Floating damage numbers
    pub damage_numbers: bool,
    /// Camera shake on impacts
    pub screen_shake: bool,

    // === Accessibility ===
    /// Reduced motion (no shake)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            particles: true,
            damage_numbers: true,
            screen_shake: true,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Apply a quality preset (updates quality-dependent settings)
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.quality = preset;

        // Damage numbers flood the event stream on low-end hosts
        if preset == QualityPreset::Low {
            self.damage_numbers = false;
        }
    }

    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    /// Project preferences into the simulation's effect limits
    pub fn effects_budget(&self) -> EffectsBudget {
        EffectsBudget {
            max_particles: self.max_particles(),
            damage_numbers: self.damage_numbers,
            screen_shake: self.effective_screen_shake(),
        }
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if let Ok(json) = std::fs::read_to_string(path) {
            if let Ok(settings) = serde_json::from_str(&json) {
                log::info!("Loaded settings from {}", path.display());
                return settings;
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings as JSON
    pub fn save_to(&self, path: &Path) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduced_motion_disables_shake() {
        let mut settings = Settings::default();
        assert!(settings.effects_budget().screen_shake);
        settings.reduced_motion = true;
        assert!(!settings.effects_budget().screen_shake);
    }

    #[test]
    fn particles_off_means_zero_budget() {
        let mut settings = Settings::from_preset(QualityPreset::High);
        assert_eq!(settings.max_particles(), 2000);
        settings.particles = false;
        assert_eq!(settings.effects_budget().max_particles, 0);
    }

    #[test]
    fn low_preset_drops_damage_numbers() {
        let mut settings = Settings::default();
        settings.apply_preset(QualityPreset::Low);
        assert!(!settings.damage_numbers);
        assert_eq!(QualityPreset::parse("MED"), Some(QualityPreset::Medium));
    }

    #[test]
    fn settings_roundtrip_through_file() {
        let path = std::env::temp_dir().join(format!("neon_settings_{}.json", std::process::id()));
        let settings = Settings::from_preset(QualityPreset::Low);
        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.quality, QualityPreset::Low);
        let _ = std::fs::remove_file(&path);
    }
}
