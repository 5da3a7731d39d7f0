//! Tunables for the pet. Velocities and accelerations are per frame,
//! intervals are in seconds.

use bevy::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::PetError;

pub const DEFAULT_CONFIG_PATH: &str = "config/pet.ron";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub max_horizontal_speed: f32,
    /// Slack above a platform top that still counts as "standing on it".
    pub landing_tolerance: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.98,
            max_fall_speed: 25.0,
            max_horizontal_speed: 25.0,
            landing_tolerance: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    /// Apex height of a full jump, in pixels.
    pub height: f32,
    pub time_to_apex: f32,
    pub fps: f32,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            height: 1100.0,
            time_to_apex: 0.7,
            fps: 60.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub decision_interval: f32,
    pub walk_speed: f32,
    pub jump_probability: f32,
    pub jump_attempts: usize,
    pub walk_to_jump_threshold: f32,
    pub max_walk_distance: f32,
    /// Platforms with `top` at or above this line are never jump targets.
    pub screen_top_guard: f32,
    /// A platform must be this many character widths wide to wander on it.
    pub wander_min_width_factor: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            decision_interval: 3.0,
            walk_speed: 2.0,
            jump_probability: 0.4,
            jump_attempts: 10,
            walk_to_jump_threshold: 5.0,
            max_walk_distance: 400.0,
            screen_top_guard: 0.0,
            wander_min_width_factor: 1.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    pub inertia: f32,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self { inertia: 0.25 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub frame_interval: f32,
    pub sheet: String,
    pub columns: usize,
    pub idle_row: usize,
    pub walk_row: usize,
    pub sit_row: usize,
    pub idle_frames: usize,
    pub walk_frames: usize,
    pub sit_frames: usize,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_interval: 0.15,
            sheet: "assets/waifu.png".into(),
            columns: 2,
            idle_row: 0,
            walk_row: 1,
            sit_row: 2,
            idle_frames: 1,
            walk_frames: 2,
            sit_frames: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub platform_interval: f32,
    /// How far below the lowest known edge the pet may fall before it is
    /// teleported back.
    pub recovery_margin: f32,
    pub min_window_width: f32,
    pub min_window_height: f32,
    pub target_titles: Vec<String>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            platform_interval: 2.0,
            recovery_margin: 200.0,
            min_window_width: 150.0,
            min_window_height: 50.0,
            target_titles: vec!["Visual Studio Code".into(), "Visual Studio".into()],
        }
    }
}

#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PetConfig {
    pub width: f32,
    pub height: f32,
    pub spawn: (f32, f32),
    pub physics: PhysicsConfig,
    pub jump: JumpConfig,
    pub ai: AiConfig,
    pub drag: DragConfig,
    pub animation: AnimationConfig,
    pub refresh: RefreshConfig,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            width: 150.0,
            height: 200.0,
            spawn: (500.0, 500.0),
            physics: PhysicsConfig::default(),
            jump: JumpConfig::default(),
            ai: AiConfig::default(),
            drag: DragConfig::default(),
            animation: AnimationConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl PetConfig {
    pub fn from_ron_str(contents: &str) -> Result<Self, PetError> {
        Ok(ron::from_str(contents)?)
    }

    /// Reads `path`, or returns defaults when the file does not exist.
    pub fn read(path: &Path) -> Result<Self, PetError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| PetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&contents)
    }

    /// Like [`PetConfig::read`] but never fails: a broken file is reported
    /// and replaced with defaults.
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(cfg) => {
                info!("Loaded pet config from {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("{e}, using defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), PetError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(PetError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn jump_physics(&self) -> JumpPhysics {
        JumpPhysics::from_config(&self.jump)
    }
}

/// Gravity and takeoff speed of the scripted jump arc, in per-frame units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpPhysics {
    pub gravity: f32,
    pub velocity: f32,
    pub max_height: f32,
}

impl JumpPhysics {
    pub fn from_config(cfg: &JumpConfig) -> Self {
        let frames_to_apex = cfg.time_to_apex * cfg.fps;
        let gravity = 2.0 * cfg.height / (frames_to_apex * frames_to_apex);
        Self {
            gravity,
            velocity: gravity * frames_to_apex,
            max_height: cfg.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_physics_reaches_configured_apex() {
        let jump = JumpPhysics::from_config(&JumpConfig::default());
        // h = v^2 / 2g
        let apex = jump.velocity * jump.velocity / (2.0 * jump.gravity);
        assert!((apex - 1100.0).abs() < 0.01);
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let cfg = PetConfig::from_ron_str("(width: 64.0, ai: (jump_probability: 0.0))").unwrap();
        assert_eq!(cfg.width, 64.0);
        assert_eq!(cfg.height, 200.0);
        assert_eq!(cfg.ai.jump_probability, 0.0);
        assert_eq!(cfg.ai.jump_attempts, 10);
    }

    #[test]
    fn garbage_ron_is_an_error() {
        assert!(matches!(
            PetConfig::from_ron_str("(width: \"wide\")"),
            Err(PetError::Config(_))
        ));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = PetConfig::read(Path::new("does/not/exist.ron")).unwrap();
        assert_eq!(cfg.spawn, (500.0, 500.0));
    }

    #[test]
    fn zero_size_is_rejected() {
        let cfg = PetConfig {
            width: 0.0,
            ..default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(PetError::InvalidDimensions { .. })
        ));
    }
}
