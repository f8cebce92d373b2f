//! Combo Runner - An endless-runner jump-and-collect arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, spawning, collisions, progression)
//! - `session`: Session controller wiring the sim to its collaborators
//! - `platform`: Frame scheduling abstraction (requestAnimationFrame on web)
//! - `audio`: Sound cue sink
//! - `presentation`: Declarative render/UI events
//! - `ranking`: Leaderboard cache and ranking backends
//! - `settings`: Tunables, device profile and preferences

pub mod audio;
pub mod platform;
pub mod presentation;
pub mod ranking;
pub mod session;
pub mod settings;
pub mod sim;

pub use ranking::{Leaderboard, PlayerIdentity};
pub use session::{Session, SessionPhase};
pub use settings::{DeviceProfile, PerformanceMode, Settings, Tuning};

/// Game configuration constants
///
/// Units are play-area pixels and seconds. The play area is y-up with the
/// origin at its bottom-left corner.
pub mod consts {
    /// Reference frame length (60 Hz) used by tests and the headless demo
    pub const FRAME_DT: f32 = 1.0 / 60.0;
    /// Largest frame delta fed to the simulation (absorbs tab-switch spikes)
    pub const MAX_FRAME_DELTA_MS: f64 = 50.0;

    /// Play area dimensions
    pub const PLAY_WIDTH: f32 = 800.0;
    pub const PLAY_HEIGHT: f32 = 400.0;
    /// Height of the floor line the player and obstacles stand on
    pub const GROUND_LEVEL: f32 = 20.0;

    /// Player square - fixed horizontal position
    pub const PLAYER_X: f32 = 50.0;
    pub const PLAYER_SIZE: f32 = 40.0;

    /// Jump physics (12 and 10 units/frame at 60 Hz)
    pub const JUMP_IMPULSE: f32 = 720.0;
    pub const DOUBLE_JUMP_IMPULSE: f32 = 600.0;
    /// 0.5 units/frame² at 60 Hz
    pub const GRAVITY: f32 = 1800.0;
    /// Jump scale applied at combo >= 3 when `Tuning::combo_jump_scaling` is on
    pub const COMBO_JUMP_MULTIPLIER: f32 = 1.15;

    /// Obstacle scroll speed (5 units/frame at 60 Hz)
    pub const BASE_SPEED: f32 = 300.0;

    /// Session timer
    pub const INITIAL_TIMER: f32 = 120.0;
    pub const TIMER_CAP: f32 = 180.0;
    /// Seconds lost per obstacle hit
    pub const HIT_PENALTY: f32 = 1.0;

    /// Collision tolerances (< 1 shrinks hitboxes, > 1 grows them)
    pub const OBSTACLE_TOLERANCE: f32 = 0.85;
    pub const COIN_TOLERANCE: f32 = 1.1;

    /// Combo thresholds
    pub const MID_COMBO: u32 = 3;
    pub const HIGH_COMBO: u32 = 6;
    /// Combo values that trigger a milestone cue
    pub const COMBO_MILESTONES: [u32; 3] = [3, 6, 10];

    /// Speed multipliers
    pub const MID_SPEED: f32 = 1.2;
    pub const HIGH_SPEED: f32 = 1.5;
    /// Temporary speed boost from high-tier coins
    pub const BOOST_MULTIPLIER: f32 = 1.5;
    pub const BOOST_DURATION: f32 = 5.0;

    /// Coin size (square)
    pub const COIN_SIZE: f32 = 30.0;
}
