//! Viral Run - an endless-runner simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (world streaming, pooling, phases, abilities)
//! - `settings`: Data-driven tuning loaded from JSON

pub mod settings;
pub mod sim;

pub use settings::{ConfigError, Settings};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Road scrolling
    pub const BASE_SPEED: f32 = 8.0;
    pub const SPEED_RAMP: f32 = 0.15;
    pub const MAX_WORLD_SPEED: f32 = 20.0;
    /// Distance behind the player past which a tile is recycled
    pub const DESPAWN_BACK: f32 = 40.0;
    /// Tiles kept alive in the streaming window
    pub const TILES_ON_SCREEN: usize = 6;
    /// Tiles closer than this to the player are populated empty
    pub const OBSTACLE_DELAY_DISTANCE: f32 = 10.0;

    /// Upper bound on obstacles a single segment may be asked for
    pub const MAX_OBSTACLES_PER_SEGMENT: usize = 8;
    /// At most this many occupied slots per row
    pub const ROW_CAPACITY: usize = 2;

    /// Seconds spent in each timed phase
    pub const PHASE_DURATION: f32 = 60.0;

    /// Resource bar capacity
    pub const BANK_MAX: u32 = 10;
}

/// Linear interpolation clamped to `t` in [0, 1]
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}
