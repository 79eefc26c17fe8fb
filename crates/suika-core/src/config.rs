//! Game configuration.
//!
//! [`GameConfig`] gathers the tunables of the container, the physics step, the
//! shake/tumble behaviours and the gameplay timings. `Default` reproduces the
//! stock game; a JSON document may override any subset of fields:
//!
//! ```
//! use suika_core::config::GameConfig;
//!
//! let config = GameConfig::from_json_str(r#"{ "shake": { "amplitude_x": 80.0 } }"#).unwrap();
//! assert_eq!(config.shake.amplitude_x, 80.0);
//! assert_eq!(config.shake.amplitude_y, 50.0);
//! ```

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the simulation cannot run with.
    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Container layout inside the window and wall appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Initial window size in world units; the container is fitted inside it.
    pub window_width: f64,
    pub window_height: f64,
    /// Space kept above the container for the drop line and the preview.
    pub margin_top: f64,
    /// Space between the window bottom and the container floor.
    pub margin_bottom: f64,
    /// Space kept on each side of the container.
    pub margin_side: f64,
    /// The container never shrinks below this size, whatever the window.
    pub min_width: f64,
    pub min_height: f64,
    /// Diameter of the wall capsules.
    pub wall_thickness: f64,
    /// Distance between the container top and the redline.
    pub redline_top_margin: f64,
    /// Diameter of the redline sensor capsule.
    pub redline_thickness: f64,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            window_width: 1400.0,
            window_height: 1800.0,
            margin_top: 200.0,
            margin_bottom: 50.0,
            margin_side: 150.0,
            min_width: 300.0,
            min_height: 400.0,
            wall_thickness: 20.0,
            redline_top_margin: 170.0,
            redline_thickness: 2.0,
        }
    }
}

/// Physics step and material parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Fixed step in seconds. Must be positive and finite.
    pub interval: f64,
    pub gravity: f64,
    pub friction: f64,
    pub elasticity_fruit: f64,
    pub elasticity_walls: f64,
    /// Number of steps a wall takes to close its gap to the target pose
    /// (1 = no damping).
    pub walls_damping: f64,
    /// Typical object size in world units, forwarded to the solver tolerances.
    pub length_unit: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            interval: 1.0 / 120.0,
            gravity: -981.0,
            friction: 1.0,
            elasticity_fruit: 0.05,
            elasticity_walls: 0.05,
            walls_damping: 10.0,
            length_unit: 100.0,
        }
    }
}

/// Shake and tumble behaviour of the container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeConfig {
    /// Oscillation frequency at the start of an automatic shake (Hz).
    pub freq_min: f64,
    /// Oscillation frequency once the acceleration window is over (Hz).
    pub freq_max: f64,
    /// Duration of the frequency ramp (s).
    pub accel_delay: f64,
    pub amplitude_x: f64,
    pub amplitude_y: f64,
    /// Fraction of the remaining offset closed per step while stopping.
    pub return_speed: f64,
    /// Fraction of the remaining offset closed per step in mouse mode.
    pub mouse_speed: f64,
    /// Scale applied to mouse deltas before moving the mouse target.
    pub mouse_gain: f64,
    /// Tumble rotation frequency (Hz). Must be positive.
    pub tumble_freq: f64,
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            freq_min: 1.5,
            freq_max: 5.0,
            accel_delay: 0.5,
            amplitude_x: 50.0,
            amplitude_y: 50.0,
            return_speed: 0.25,
            mouse_speed: 0.5,
            mouse_gain: 1.0 / 3.0,
            tumble_freq: 0.25,
        }
    }
}

/// Gameplay timings and pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Time a fruit rests on the redline before it starts blinking.
    pub blink_delay: f64,
    /// Time an exploding fruit stays in place before removal.
    pub explosion_delay: f64,
    /// Time a merging fruit takes to slide onto its partner.
    pub merge_delay: f64,
    /// Delay between a merge and the spawn of the merged fruit.
    pub spawn_delay: f64,
    /// How long fruit may rest on the redline before the game is over.
    pub gameover_delay: f64,
    /// Autoplay rate when first enabled (fruit per second).
    pub autoplay_initial_rate: u32,
    pub preview_count: usize,
    /// Drop kinds are drawn from the first `drop_kinds` kinds.
    pub drop_kinds: u8,
    /// How long the drop button must be held before autofire starts.
    pub autofire_delay: f64,
    /// Pause between game over and the first fruit of the finale exploding.
    pub gameover_animation_start: f64,
    /// Pause between two finale explosions.
    pub gameover_animation_interval: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            blink_delay: 1.0,
            explosion_delay: 0.3,
            merge_delay: 0.1,
            spawn_delay: 0.3,
            gameover_delay: 4.0,
            autoplay_initial_rate: 5,
            preview_count: 3,
            drop_kinds: 5,
            autofire_delay: 0.5,
            gameover_animation_start: 5.0,
            gameover_animation_interval: 0.3,
        }
    }
}

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Complete configuration of a game.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub container: ContainerConfig,
    pub physics: PhysicsConfig,
    pub shake: ShakeConfig,
    pub timing: TimingConfig,
}

impl GameConfig {
    /// Parse a (possibly partial) JSON document and validate the result.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values the simulation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        if !(p.interval > 0.0 && p.interval.is_finite()) {
            return Err(invalid(
                "physics.interval",
                format!("must be positive and finite, got {}", p.interval),
            ));
        }
        if !(p.walls_damping >= 1.0) {
            return Err(invalid(
                "physics.walls_damping",
                format!("must be at least 1, got {}", p.walls_damping),
            ));
        }
        if !(p.length_unit > 0.0) {
            return Err(invalid("physics.length_unit", "must be positive"));
        }

        let c = &self.container;
        if !(c.min_width > 0.0 && c.min_height > 0.0) {
            return Err(invalid("container.min_width", "minimum size must be positive"));
        }
        if !(c.redline_top_margin >= 0.0 && c.redline_top_margin < c.min_height) {
            return Err(invalid(
                "container.redline_top_margin",
                "must lie inside the minimum container height",
            ));
        }

        let s = &self.shake;
        if s.freq_max < s.freq_min || s.freq_min < 0.0 {
            return Err(invalid("shake.freq_max", "must be >= freq_min >= 0"));
        }
        if !(s.accel_delay > 0.0) {
            return Err(invalid("shake.accel_delay", "must be positive"));
        }
        if !(s.return_speed > 0.0 && s.return_speed <= 1.0) {
            return Err(invalid("shake.return_speed", "must lie in (0, 1]"));
        }
        if !(s.tumble_freq > 0.0) {
            // Tumble completion only triggers for a positive spin.
            return Err(invalid("shake.tumble_freq", "must be positive"));
        }

        let t = &self.timing;
        if t.drop_kinds == 0 || t.drop_kinds > crate::kind::FruitKind::COUNT {
            return Err(invalid(
                "timing.drop_kinds",
                format!("must lie in 1..={}", crate::kind::FruitKind::COUNT),
            ));
        }
        if t.spawn_delay < 0.0
            || t.gameover_delay < 0.0
            || t.autofire_delay < 0.0
            || t.gameover_animation_start < 0.0
        {
            return Err(invalid("timing", "delays must not be negative"));
        }
        if !(t.gameover_animation_interval > 0.0) {
            return Err(invalid(
                "timing.gameover_animation_interval",
                "must be positive",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
