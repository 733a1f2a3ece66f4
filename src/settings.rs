//! Game tuning and configuration
//!
//! Loaded from a JSON file; every field has a default so partial files work.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::effect::PulseEnvelope;

/// Configuration loading errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Road streaming and obstacle placement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Tiles kept in the streaming window (at least 2)
    pub tiles_on_screen: usize,
    pub base_speed: f32,
    /// Speed gained per second
    pub speed_ramp: f32,
    pub max_world_speed: f32,
    /// Distance behind the player where tiles are recycled
    pub despawn_back: f32,
    /// Tiles closer than this to the player spawn without obstacles
    pub obstacle_delay_distance: f32,
    pub tile_length: f32,
    pub tile_width: f32,
    pub rows_per_segment: usize,
    /// Lateral offset of every slot in a row
    pub lanes: Vec<f32>,
    pub obstacle_prefabs: Vec<String>,
    /// Seconds an exploded obstacle lingers before it is destroyed
    pub wreck_destroy_delay: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            tiles_on_screen: TILES_ON_SCREEN,
            base_speed: BASE_SPEED,
            speed_ramp: SPEED_RAMP,
            max_world_speed: MAX_WORLD_SPEED,
            despawn_back: DESPAWN_BACK,
            obstacle_delay_distance: OBSTACLE_DELAY_DISTANCE,
            tile_length: 20.0,
            tile_width: 9.0,
            rows_per_segment: 4,
            lanes: vec![-3.0, 0.0, 3.0],
            obstacle_prefabs: vec!["car".into(), "van".into(), "barrier".into()],
            wreck_destroy_delay: 10.0,
        }
    }
}

/// Buildings scrolling beside the road
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenerySettings {
    pub enabled: bool,
    pub tiles_on_screen: usize,
    pub lateral_offset: f32,
    pub tile_length: f32,
    pub despawn_back: f32,
}

impl Default for ScenerySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tiles_on_screen: TILES_ON_SCREEN,
            lateral_offset: 10.0,
            tile_length: 20.0,
            despawn_back: DESPAWN_BACK,
        }
    }
}

/// Timed phase progression
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseSettings {
    /// Seconds spent in Phase1, Phase2, Phase3
    pub durations: [f32; 3],
    /// Obstacles per segment for Phase1, Phase2, Phase3, End
    pub densities: [usize; 4],
    /// Banner shown on every phase entry
    pub message: String,
    pub banner: PulseEnvelope,
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self {
            durations: [PHASE_DURATION; 3],
            densities: [1, 2, 3, 7],
            message: "HERMES IS MUTATING".into(),
            banner: PulseEnvelope {
                duration: 5.0,
                ramp_time: 1.0,
                min_scale: 0.1,
                peak_scale: 3.0,
                frequency: 2.0,
                amplitude: 0.1,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BankSettings {
    pub max: u32,
    pub initial: u32,
}

impl Default for BankSettings {
    fn default() -> Self {
        Self {
            max: BANK_MAX,
            initial: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilitySettings {
    /// Invulnerability window
    pub cell_phase: PulseEnvelope,
    /// Jump boost window
    pub viral_overclock: PulseEnvelope,
    pub jump_multiplier: f32,
    pub gravity_multiplier: f32,
    /// Seconds between Contagion Spray shots
    pub contagion_cooldown: f32,
}

impl Default for AbilitySettings {
    fn default() -> Self {
        Self {
            cell_phase: PulseEnvelope {
                duration: 10.0,
                ramp_time: 1.0,
                min_scale: 0.0,
                peak_scale: 1.0,
                frequency: 2.0,
                amplitude: 0.1,
            },
            viral_overclock: PulseEnvelope {
                duration: 10.0,
                ramp_time: 1.0,
                min_scale: 0.1,
                peak_scale: 3.0,
                frequency: 2.0,
                amplitude: 0.1,
            },
            jump_multiplier: 3.0,
            gravity_multiplier: 0.5,
            contagion_cooldown: 2.0,
        }
    }
}

/// Collectibles dropped by wrecked obstacles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupSettings {
    pub prefabs: Vec<String>,
    /// Multiplier on the road speed once settled
    pub speed_factor: f32,
    /// Seconds of falling before the pickup starts moving
    pub settle_delay: f32,
    pub despawn_back: f32,
}

impl Default for PickupSettings {
    fn default() -> Self {
        Self {
            prefabs: vec!["cell".into()],
            speed_factor: 1.2,
            settle_delay: 0.4,
            despawn_back: 30.0,
        }
    }
}

/// Ambulance health and the projectiles fired at it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemySettings {
    pub max_hp: u32,
    /// Seconds between reaching zero health and the defeat event
    pub death_delay: f32,
    pub projectile_speed: f32,
    pub projectile_lifetime: f32,
}

impl Default for EnemySettings {
    fn default() -> Self {
        Self {
            max_hp: 5,
            death_delay: 1.0,
            projectile_speed: 20.0,
            projectile_lifetime: 5.0,
        }
    }
}

/// Base movement values the host's controller scales by ability modifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub jump_height: f32,
    pub gravity: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            jump_height: 2.2,
            gravity: -18.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreSettings {
    pub multiplier: f32,
}

impl Default for ScoreSettings {
    fn default() -> Self {
        Self { multiplier: 10.0 }
    }
}

/// Complete game configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Run seed for reproducibility
    pub seed: u64,
    pub world: WorldSettings,
    pub scenery: ScenerySettings,
    pub phases: PhaseSettings,
    pub bank: BankSettings,
    pub abilities: AbilitySettings,
    pub pickups: PickupSettings,
    pub enemy: EnemySettings,
    pub player: PlayerSettings,
    pub score: ScoreSettings,
}

impl Settings {
    /// Defaults with a specific run seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.validate();
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load settings, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Using default settings ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Clamp values the simulation cannot honor
    pub fn validate(&mut self) {
        let world = &mut self.world;
        if world.tiles_on_screen < 2 {
            log::warn!("tiles_on_screen {} raised to 2", world.tiles_on_screen);
            world.tiles_on_screen = 2;
        }
        if world.max_world_speed < world.base_speed {
            log::warn!("max_world_speed below base_speed, raised to {}", world.base_speed);
            world.max_world_speed = world.base_speed;
        }
        if world.tile_length <= 0.0 {
            log::warn!("tile_length must be positive, using 20");
            world.tile_length = 20.0;
        }
        world.speed_ramp = world.speed_ramp.max(0.0);
        world.wreck_destroy_delay = world.wreck_destroy_delay.max(0.0);

        if self.scenery.tiles_on_screen < 2 {
            self.scenery.tiles_on_screen = 2;
        }
        if self.scenery.tile_length <= 0.0 {
            self.scenery.tile_length = 20.0;
        }

        // Densities are capped and must never drop from one phase to the next
        let mut floor = 0;
        for density in &mut self.phases.densities {
            if *density > MAX_OBSTACLES_PER_SEGMENT {
                log::warn!("phase density {} capped to {}", density, MAX_OBSTACLES_PER_SEGMENT);
                *density = MAX_OBSTACLES_PER_SEGMENT;
            }
            if *density < floor {
                log::warn!("phase density {} raised to {} to stay non-decreasing", density, floor);
                *density = floor;
            }
            floor = *density;
        }
        for duration in &mut self.phases.durations {
            *duration = duration.max(0.0);
        }

        if self.bank.max == 0 {
            log::warn!("bank max must be at least 1");
            self.bank.max = 1;
        }
        self.bank.initial = self.bank.initial.min(self.bank.max);

        if self.enemy.max_hp == 0 {
            self.enemy.max_hp = 1;
        }
        self.abilities.contagion_cooldown = self.abilities.contagion_cooldown.max(0.0);
    }
}
