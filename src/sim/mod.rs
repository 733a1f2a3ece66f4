//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Host-supplied timestep only (no wall clock)
//! - Seeded RNG only
//! - Stable iteration order
//! - No rendering or platform dependencies

pub mod ability;
pub mod bank;
pub mod effect;
pub mod enemy;
pub mod events;
pub mod grid;
pub mod phase;
pub mod pickup;
pub mod pool;
pub mod state;
pub mod streamer;
pub mod tick;
pub mod tile;

pub use ability::{Ability, AbilityController, ButtonState, Rejection, SpendPolicy};
pub use bank::ResourceBank;
pub use effect::{Cooldown, PulseEnvelope, PulseRoutine, Retrigger, Stage};
pub use enemy::{EnemyHealth, Projectile, ProjectileId, Projectiles};
pub use events::{EventQueue, GameEvent, Observers, SubscriptionId};
pub use grid::{SlotGrid, SlotRef, row_quotas};
pub use phase::{Phase, PhaseMachine};
pub use pickup::PickupField;
pub use pool::{Category, InstanceId, ObjectPool, Placement, PrefabId};
pub use state::{GameState, PlayerStatus, Wreck};
pub use streamer::{SpeedRamp, StreamerConfig, WorldStreamer};
pub use tick::{Contact, TickInput, tick};
pub use tile::{Bounds, ScrollSpeed, Tile, TileId};
