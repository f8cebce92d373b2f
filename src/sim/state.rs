//! Game state and core simulation types
//!
//! One `GameState` lives for exactly one session. Everything the tick mutates
//! is owned here; nothing is global.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::player::{JumpKind, Player, VerticalBounds};
use super::progression::Progression;
use crate::consts::*;
use crate::settings::Tuning;

/// Obstacle shape families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleVariant {
    Standard,
    Tall,
    Wide,
    /// Upgraded size, more common at high combo
    Large,
    /// Hovers above the ground; can be run under
    Flying,
}

/// A scrolling obstacle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub variant: ObstacleVariant,
    /// Left edge
    pub x: f32,
    /// Height of the bottom edge above the ground line
    pub lift: f32,
    pub width: f32,
    pub height: f32,
    /// Leftward speed (units/s), fixed at spawn
    pub speed: f32,
}

impl Obstacle {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, GROUND_LEVEL + self.lift, self.width, self.height)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Right edge strictly past the left boundary
    #[inline]
    pub fn is_off_screen(&self) -> bool {
        self.right() < 0.0
    }
}

/// Coin tiers (green, blue, yellow)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinTier {
    Low,
    Mid,
    High,
}

impl CoinTier {
    /// Tier of coins spawned at the given combo
    pub fn for_combo(combo: u32) -> Self {
        if combo >= HIGH_COMBO {
            CoinTier::High
        } else if combo >= MID_COMBO {
            CoinTier::Mid
        } else {
            CoinTier::Low
        }
    }

    /// Flat score bonus
    pub fn points(&self) -> u64 {
        match self {
            CoinTier::Low => 10,
            CoinTier::Mid => 15,
            CoinTier::High => 25,
        }
    }

    /// Seconds added to the clock
    pub fn time_bonus(&self) -> f32 {
        match self {
            CoinTier::Low => 1.0,
            CoinTier::Mid => 2.0,
            CoinTier::High => 5.0,
        }
    }

    /// Floating text color
    pub fn color(&self) -> &'static str {
        match self {
            CoinTier::Low => "#4CAF50",
            CoinTier::Mid => "#2196F3",
            CoinTier::High => "#FFC107",
        }
    }
}

/// Sinusoidal vertical motion for a coin
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoinWave {
    pub amplitude: f32,
    /// Radians per second
    pub frequency: f32,
    pub phase: f32,
}

/// A collectible coin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coin {
    pub id: u32,
    pub tier: CoinTier,
    /// Left edge
    pub x: f32,
    /// Bottom edge
    pub y: f32,
    /// Resting height the wave oscillates around
    pub base_y: f32,
    pub size: f32,
    pub wave: Option<CoinWave>,
    pub speed: f32,
}

impl Coin {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }

    #[inline]
    pub fn is_off_screen(&self) -> bool {
        self.x + self.size < 0.0
    }

    /// Scroll left and advance the wave
    pub fn advance(&mut self, dt: f32) {
        self.x -= self.speed * dt;
        if let Some(wave) = &mut self.wave {
            wave.phase += wave.frequency * dt;
            self.y = self.base_y + wave.phase.sin() * wave.amplitude;
        }
    }
}

/// Either kind of transient entity, as seen by presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Entity {
    Obstacle(Obstacle),
    Coin(Coin),
}

impl Entity {
    pub fn id(&self) -> u32 {
        match self {
            Entity::Obstacle(o) => o.id,
            Entity::Coin(c) => c.id,
        }
    }

    pub fn rect(&self) -> Rect {
        match self {
            Entity::Obstacle(o) => o.rect(),
            Entity::Coin(c) => c.rect(),
        }
    }
}

/// Things that happened during a tick, drained by the session
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Jumped(JumpKind),
    ObstacleSpawned { id: u32 },
    CoinSpawned { id: u32 },
    /// Left the screen untouched (+1 score)
    ObstacleDodged { id: u32 },
    /// Scrolled away uncollected
    CoinMissed { id: u32 },
    ObstacleHit { id: u32, pos: Vec2 },
    CoinCollected {
        id: u32,
        tier: CoinTier,
        points: u64,
        time_bonus: f32,
        pos: Vec2,
    },
    ComboChanged { combo: u32, milestone: bool },
    DoubleJumpGranted,
    BoostStarted,
    BoostEnded,
    TimeUp,
}

/// Spawn timers and pacing state, in session seconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnSchedule {
    pub next_obstacle_at: f32,
    pub next_coin_at: f32,
    /// Obstacle spawns since the last breather interval
    pub streak: u32,
}

/// Complete per-session simulation state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Session seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    /// Effective tuning for this session
    pub tuning: Tuning,
    /// Seconds left on the clock
    pub time_remaining: f32,
    /// Seconds of play simulated so far
    pub elapsed: f32,
    pub score: u64,
    pub progression: Progression,
    pub player: Player,
    /// Live obstacles (ascending id)
    pub obstacles: Vec<Obstacle>,
    /// Live coins (ascending id)
    pub coins: Vec<Coin>,
    pub spawns: SpawnSchedule,
    /// Events from the last tick
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        let size = tuning.player_size();
        let mut player = Player::new(size, VerticalBounds::for_area(tuning.play_height, size));
        player.jump_impulse = tuning.jump_impulse;
        player.double_jump_impulse = tuning.double_jump_impulse;

        let spawns = SpawnSchedule {
            next_obstacle_at: tuning.obstacle_interval,
            next_coin_at: tuning.coin_interval,
            streak: 0,
        };

        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            time_remaining: tuning.initial_timer,
            elapsed: 0.0,
            score: 0,
            progression: Progression::default(),
            player,
            obstacles: Vec::new(),
            coins: Vec::new(),
            spawns,
            events: Vec::new(),
            next_id: 1,
            tuning,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Live entities in spawn order, obstacles first
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.obstacles
            .iter()
            .cloned()
            .map(Entity::Obstacle)
            .chain(self.coins.iter().cloned().map(Entity::Coin))
    }

    /// Swap in new tuning mid-session (device resize)
    pub fn retune(&mut self, tuning: Tuning) {
        let size = tuning.player_size();
        self.player.size = size;
        self.player.set_bounds(VerticalBounds::for_area(tuning.play_height, size));
        self.player.jump_impulse = tuning.jump_impulse;
        self.player.double_jump_impulse = tuning.double_jump_impulse;
        self.time_remaining = self.time_remaining.min(tuning.timer_cap);
        self.tuning = tuning;
    }
}
