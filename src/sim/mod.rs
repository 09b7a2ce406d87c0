//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies
//!
//! Per tick: wave check, movement, collision resolution (splitting chains
//! and collecting pickups as it goes), then effect expiry and modifier
//! recomputation for the next tick.

pub mod chain;
pub mod collision;
pub mod driver;
pub mod effects;
pub mod movement;
pub mod resolve;
pub mod state;
pub mod tick;
pub mod wave;

pub use chain::{Split, split, split_chain_at};
pub use collision::{Aabb, Circle};
pub use driver::FixedStepper;
pub use effects::{ActiveEffect, EffectKind, EffectManager, Modifiers};
pub use state::{
    EnemyChain, GameEvent, GamePhase, Obstacle, ObstacleField, Pickup, Player, Projectile,
    RunSummary, Segment, World, WorldSnapshot,
};
pub use tick::{TickInput, tick};
pub use wave::{advance_level, reset_wave, start_run};
