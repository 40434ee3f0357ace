//! Combat tuning configuration.
//!
//! Loaded from TOML. A missing or malformed file falls back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// Which side of a networked session this instance is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetRole {
    /// Authoritative server or standalone game
    #[default]
    Authority,
    /// Replicated client; never resolves damage
    Client,
}

impl NetRole {
    /// Whether this instance may resolve effects.
    #[must_use]
    pub const fn has_authority(self) -> bool {
        matches!(self, Self::Authority)
    }
}

/// Combat tuning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    // === Impulses ===
    /// Pitch applied to the death impulse direction, in degrees
    pub death_impulse_pitch_degrees: f32,
    /// Pitch applied to the knockback direction, in degrees
    pub knockback_pitch_degrees: f32,
    /// Per-component tolerance below which a knockback is ignored
    pub knockback_tolerance: f32,

    // === Mitigation ===
    /// Scales how much armor penetration strips from armor
    pub armor_penetration_coefficient: f32,
    /// Scales how much effective armor reduces damage
    pub effective_armor_coefficient: f32,
    /// Scales how much crit resistance reduces crit chance
    pub crit_resistance_coefficient: f32,

    // === Progression ===
    /// MaxHealth gained per level
    pub max_health_per_level: f32,
    /// MaxMana gained per level
    pub max_mana_per_level: f32,

    // === Runtime ===
    /// Event bus channel capacity
    pub event_bus_capacity: usize,
    /// Seed for outcome rolls (None = random)
    pub rng_seed: Option<u64>,
    /// Network role of this instance
    pub role: NetRole,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            death_impulse_pitch_degrees: 45.0,
            knockback_pitch_degrees: 45.0,
            knockback_tolerance: 1.0,

            armor_penetration_coefficient: 0.25,
            effective_armor_coefficient: 0.333,
            crit_resistance_coefficient: 0.25,

            max_health_per_level: 10.0,
            max_mana_per_level: 5.0,

            event_bus_capacity: 1024,
            rng_seed: None,
            role: NetRole::Authority,
        }
    }
}

impl CombatConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Combat config not found at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).unwrap_or_else(|e| {
                warn!("Failed to parse combat config: {e}");
                Self::default()
            }),
            Err(e) => {
                warn!("Failed to read combat config: {e}");
                Self::default()
            },
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(contents)?;
        config.validate();
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved combat config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.death_impulse_pitch_degrees = self.death_impulse_pitch_degrees.clamp(0.0, 89.0);
        self.knockback_pitch_degrees = self.knockback_pitch_degrees.clamp(0.0, 89.0);
        self.knockback_tolerance = self.knockback_tolerance.max(0.0);

        self.armor_penetration_coefficient = self.armor_penetration_coefficient.clamp(0.0, 1.0);
        self.effective_armor_coefficient = self.effective_armor_coefficient.clamp(0.0, 1.0);
        self.crit_resistance_coefficient = self.crit_resistance_coefficient.clamp(0.0, 1.0);

        self.max_health_per_level = self.max_health_per_level.max(0.0);
        self.max_mana_per_level = self.max_mana_per_level.max(0.0);

        self.event_bus_capacity = self.event_bus_capacity.clamp(16, 65536);
    }

    /// Builds the outcome RNG from the configured seed.
    #[must_use]
    pub fn make_rng(&self) -> fastrand::Rng {
        match self.rng_seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        }
    }
}
