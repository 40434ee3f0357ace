//! Simulator configuration.
//!
//! Wraps the combat tuning with scenario knobs. Loaded from `aura-sim.toml`.

use aura_combat::{CharacterClass, CombatConfig};
use aura_common::SchemaVersion;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "aura-sim.toml";

/// Simulator configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// File format version
    pub version: SchemaVersion,

    // === Timing ===
    /// Fixed simulation ticks per second
    pub tick_rate: u32,
    /// Scenario length in seconds
    pub duration_seconds: f32,

    // === Scenario ===
    /// Player class
    pub player_class: CharacterClass,
    /// Seconds between player casts
    pub cast_interval: f32,
    /// Number of enemies
    pub enemy_count: u32,
    /// Enemy level
    pub enemy_level: u32,
    /// Enemy max health
    pub enemy_health: f32,
    /// Seconds between enemy attacks
    pub enemy_attack_interval: f32,
    /// Damage per enemy attack
    pub enemy_damage: f32,

    // === Output ===
    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Combat tuning
    pub combat: CombatConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            version: SchemaVersion::COMBAT_CONFIG,

            tick_rate: 30,
            duration_seconds: 60.0,

            player_class: CharacterClass::Elementalist,
            cast_interval: 1.0,
            enemy_count: 3,
            enemy_level: 1,
            enemy_health: 60.0,
            enemy_attack_interval: 1.5,
            enemy_damage: 3.0,

            log_json: false,

            combat: CombatConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist, is invalid or
    /// was written by an incompatible version.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut contents = String::new();
        if let Err(e) = fs::File::open(path).and_then(|mut f| f.read_to_string(&mut contents)) {
            warn!("Failed to read config file: {e}");
            return Self::default();
        }

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                if !SchemaVersion::COMBAT_CONFIG.can_read(&config.version) {
                    warn!(
                        "Config version {} is not readable by {}, using defaults",
                        config.version,
                        SchemaVersion::COMBAT_CONFIG
                    );
                    return Self::default();
                }
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(1, 240);
        self.duration_seconds = self.duration_seconds.clamp(0.0, 3600.0);

        self.cast_interval = self.cast_interval.max(0.05);
        self.enemy_count = self.enemy_count.clamp(1, 64);
        self.enemy_level = self.enemy_level.max(1);
        self.enemy_health = self.enemy_health.max(1.0);
        self.enemy_attack_interval = self.enemy_attack_interval.max(0.05);
        self.enemy_damage = self.enemy_damage.max(0.0);

        self.combat.validate();
    }

    /// Fixed timestep in seconds.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Number of fixed ticks in the scenario.
    #[must_use]
    pub fn total_ticks(&self) -> u32 {
        (self.duration_seconds * self.tick_rate as f32).ceil().max(0.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.enemy_count, 3);
        assert_eq!(config.version, SchemaVersion::COMBAT_CONFIG);
        assert_eq!(config.total_ticks(), 1800);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig::default();
        config.tick_rate = 0;
        config.enemy_count = 500;
        config.cast_interval = 0.0;
        config.combat.death_impulse_pitch_degrees = 120.0;

        config.validate();

        assert_eq!(config.tick_rate, 1);
        assert_eq!(config.enemy_count, 64);
        assert!((config.cast_interval - 0.05).abs() < 0.001);
        assert_eq!(config.combat.death_impulse_pitch_degrees, 89.0);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("sim").join(CONFIG_FILE);

        let mut config = SimConfig::default();
        config.tick_rate = 60;
        config.player_class = CharacterClass::Ranger;
        config.combat.rng_seed = Some(99);

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = SimConfig::load_from("/nonexistent/path/aura-sim.toml");
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_config_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "enemy_count = 5\n\n[combat]\nrng_seed = 7\n")
            .expect("Failed to write config");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.enemy_count, 5);
        assert_eq!(loaded.combat.rng_seed, Some(7));
        assert_eq!(loaded.tick_rate, 30);
    }

    #[test]
    fn test_config_rejects_incompatible_version() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(
            &config_path,
            "enemy_count = 9\n\n[version]\nmajor = 2\nminor = 0\npatch = 0\n",
        )
        .expect("Failed to write config");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.enemy_count, 3);
    }
}
