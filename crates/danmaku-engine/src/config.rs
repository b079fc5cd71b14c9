//! Simulation configuration.
//!
//! Provides tick rate, pooling, time scale, playfield and logging settings.
//! Configuration can be loaded from and saved to a TOML file.

use danmaku_common::{DanmakuError, DanmakuResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "danmaku.toml";

/// Simulation configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Timing ===
    /// Fixed simulation ticks per second
    pub tick_rate: u32,
    /// Largest frame delta fed to the fixed-step driver, in seconds
    pub max_frame_delta: f32,
    /// Fixed updates allowed per frame before the backlog is dropped
    pub max_updates_per_frame: u32,
    /// Simulated frame delta of the headless run, in seconds
    pub frame_delta: f32,
    /// Length of the headless run, in seconds
    pub run_seconds: f32,

    // === Pooling ===
    /// Instances created for a prototype that was never registered
    pub default_pool_size: usize,
    /// Instances prefilled per registered bullet prototype
    pub prefill_count: usize,

    // === Time Scale ===
    /// Initial enemy time scale
    pub enemy_time_scale: f32,
    /// Initial player time scale
    pub player_time_scale: f32,

    // === Playfield ===
    /// Playfield width in world units
    pub playfield_width: f32,
    /// Playfield height in world units
    pub playfield_height: f32,
    /// Distance outside the playfield before a bullet is culled
    pub cull_margin: f32,

    // === Events ===
    /// Capacity of the motion event bus
    pub event_capacity: usize,

    // === Logging ===
    /// Default tracing filter directive
    pub log_filter: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            // Timing
            tick_rate: 60,
            max_frame_delta: 0.25,
            max_updates_per_frame: 10,
            frame_delta: 1.0 / 60.0,
            run_seconds: 10.0,

            // Pooling
            default_pool_size: 32,
            prefill_count: 256,

            // Time scale
            enemy_time_scale: 1.0,
            player_time_scale: 1.0,

            // Playfield
            playfield_width: 384.0,
            playfield_height: 448.0,
            cull_margin: 32.0,

            // Events
            event_capacity: 4096,

            // Logging
            log_filter: "danmaku=info".to_string(),
        }
    }
}

impl SimConfig {
    /// Load configuration from `danmaku.toml` in the working directory.
    /// Returns default config if the file doesn't exist.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    #[must_use]
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to load config file: {e}");
                Self::default()
            },
        }
    }

    /// Load and validate configuration, reporting read and parse failures.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> DanmakuResult<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config: Self =
            toml::from_str(&contents).map_err(|e| DanmakuError::Config(e.to_string()))?;
        config.validate();
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> DanmakuResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| DanmakuError::Config(e.to_string()))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // Timing
        self.tick_rate = self.tick_rate.clamp(10, 1000);
        self.max_frame_delta = finite_or(self.max_frame_delta, 0.25).clamp(0.01, 1.0);
        self.max_updates_per_frame = self.max_updates_per_frame.clamp(1, 100);
        self.frame_delta =
            finite_or(self.frame_delta, 1.0 / 60.0).clamp(0.001, self.max_frame_delta);
        self.run_seconds = finite_or(self.run_seconds, 10.0).max(0.0);

        // Pooling
        self.default_pool_size = self.default_pool_size.max(1);

        // Time scale
        self.enemy_time_scale = finite_or(self.enemy_time_scale, 1.0).max(0.0);
        self.player_time_scale = finite_or(self.player_time_scale, 1.0).max(0.0);

        // Playfield
        self.playfield_width = finite_or(self.playfield_width, 384.0).max(1.0);
        self.playfield_height = finite_or(self.playfield_height, 448.0).max(1.0);
        self.cull_margin = finite_or(self.cull_margin, 32.0).max(0.0);

        // Events
        self.event_capacity = self.event_capacity.max(1);

        if self.log_filter.trim().is_empty() {
            self.log_filter = Self::default().log_filter;
        }
    }

    /// Seconds per fixed tick.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.default_pool_size, 32);
        assert_eq!(config.log_filter, "danmaku=info");
        assert!((config.fixed_dt() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig::default();

        // Set invalid values
        config.tick_rate = 0;
        config.enemy_time_scale = -2.0;
        config.max_frame_delta = f32::NAN;
        config.event_capacity = 0;
        config.log_filter = "  ".to_string();

        config.validate();

        // Should be clamped
        assert_eq!(config.tick_rate, 10);
        assert_eq!(config.enemy_time_scale, 0.0);
        assert_eq!(config.max_frame_delta, 0.25);
        assert_eq!(config.event_capacity, 1);
        assert_eq!(config.log_filter, "danmaku=info");
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("danmaku.toml");

        let mut config = SimConfig::default();
        config.tick_rate = 120;
        config.player_time_scale = 0.5;
        config.prefill_count = 16;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.tick_rate, 120);
        assert_eq!(loaded.player_time_scale, 0.5);
        assert_eq!(loaded.prefill_count, 16);
    }

    #[test]
    fn test_config_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("danmaku.toml");
        fs::write(&config_path, "tick_rate = 30\n").expect("Failed to write config");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.tick_rate, 30);
        assert_eq!(loaded.cull_margin, 32.0);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = SimConfig::load_from("/nonexistent/path/danmaku.toml");
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_config_parse_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("danmaku.toml");
        fs::write(&config_path, "tick_rate = \"fast\"").expect("Failed to write config");

        assert!(matches!(
            SimConfig::try_load_from(&config_path),
            Err(DanmakuError::Config(_))
        ));
        assert_eq!(SimConfig::load_from(&config_path), SimConfig::default());
    }

    #[test]
    fn test_config_toml_serialization() {
        let config = SimConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize");

        assert!(toml_str.contains("tick_rate"));
        assert!(toml_str.contains("log_filter"));
    }
}
