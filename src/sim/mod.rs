//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies
//!
//! Time is variable-step: callers pass the (already capped) frame delta.

pub mod collision;
pub mod player;
pub mod progression;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{Rect, check as check_collision};
pub use player::{JumpKind, JumpPhase, Player, VerticalBounds};
pub use progression::{PickupOutcome, Progression};
pub use state::{
    Coin, CoinTier, CoinWave, Entity, GameEvent, GameState, Obstacle, ObstacleVariant,
    SpawnSchedule,
};
pub use tick::{jump, tick};
