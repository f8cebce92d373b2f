//! Obstacle and coin spawning, movement and culling
//!
//! Spawns are driven by timers in session time, so pausing freezes them and a
//! restart starts them over. Pacing tightens as the combo grows, with a
//! forced breather interval every few obstacles.

use rand::Rng;

use super::state::{Coin, CoinTier, CoinWave, GameEvent, GameState, Obstacle, ObstacleVariant};
use crate::consts::*;

/// Shortest obstacle interval the combo can push pacing down to
pub const MIN_OBSTACLE_INTERVAL: f32 = 0.9;
/// Interval shrink per combo point (capped at 10 points)
pub const COMBO_PACE_STEP: f32 = 0.06;
/// Every this many obstacles, force one long interval
pub const BREATHER_EVERY: u32 = 5;
pub const BREATHER_FACTOR: f32 = 1.75;

/// Minimum horizontal gap between paired obstacles
pub const MIN_OBSTACLE_GAP: f32 = 200.0;
/// Paired gap also covers this many seconds of travel (one full jump)
pub const PAIR_GAP_SECS: f32 = 0.9;

/// Per combo tier (0, 1, 2)
const PAIR_CHANCE: [f64; 3] = [0.0, 0.15, 0.3];
const LARGE_CHANCE: [f64; 3] = [0.05, 0.15, 0.25];
const FLYING_CHANCE: [f64; 3] = [0.0, 0.2, 0.2];

/// Coins never spawn closer than this to the ground or ceiling
const COIN_FLOOR_MARGIN: f32 = 30.0;
const COIN_CEILING_MARGIN: f32 = 60.0;

/// Run any spawners whose timer has come due
pub fn run_spawners(state: &mut GameState) {
    let now = state.elapsed;
    if now >= state.spawns.next_obstacle_at {
        spawn_obstacle(state, now);
    }
    if now >= state.spawns.next_coin_at {
        spawn_coin(state, now);
    }
}

/// Spawn one obstacle (sometimes two) at the right edge and re-arm the timer
pub fn spawn_obstacle(state: &mut GameState, now: f32) {
    let tier = state.progression.tier() as usize;
    let delay = next_obstacle_delay(state);
    state.spawns.next_obstacle_at = now + delay;

    if state.obstacles.len() >= state.tuning.max_obstacles {
        log::debug!("Obstacle cap ({}) reached, skipping spawn", state.tuning.max_obstacles);
        return;
    }

    let speed_mult = state.progression.speed_multiplier();
    let speed = state.tuning.base_speed * state.rng.random_range(0.8_f32..1.2) * speed_mult;
    let x = state.tuning.play_width;

    let first = build_obstacle(state, tier, x, speed);
    let pair_x = first.right() + (speed * PAIR_GAP_SECS).max(MIN_OBSTACLE_GAP);
    state.events.push(GameEvent::ObstacleSpawned { id: first.id });
    state.obstacles.push(first);

    let wants_pair = state.rng.random_bool(PAIR_CHANCE[tier]);
    if wants_pair && state.obstacles.len() < state.tuning.max_obstacles {
        let jitter: f32 = state.rng.random_range(0.0..80.0);
        // Same speed so the gap holds while both scroll
        let second = build_obstacle(state, tier, pair_x + jitter, speed);
        state.events.push(GameEvent::ObstacleSpawned { id: second.id });
        state.obstacles.push(second);
    }
}

fn build_obstacle(state: &mut GameState, tier: usize, x: f32, speed: f32) -> Obstacle {
    let scale = state.tuning.size_scale;
    let rng = &mut state.rng;

    let flying = rng.random_bool(FLYING_CHANCE[tier]);
    let (variant, width, height, lift) = if flying {
        let lift: f32 = rng.random_range(70.0..100.0);
        (
            ObstacleVariant::Flying,
            rng.random_range(30.0_f32..50.0),
            rng.random_range(20.0_f32..30.0),
            lift,
        )
    } else {
        let (variant, width, height) = match rng.random_range(0..3) {
            0 => (
                ObstacleVariant::Standard,
                rng.random_range(25.0_f32..45.0),
                rng.random_range(30.0_f32..70.0),
            ),
            1 => (
                ObstacleVariant::Tall,
                rng.random_range(20.0_f32..30.0),
                rng.random_range(70.0_f32..100.0),
            ),
            _ => (
                ObstacleVariant::Wide,
                rng.random_range(40.0_f32..50.0),
                rng.random_range(20.0_f32..40.0),
            ),
        };
        if rng.random_bool(LARGE_CHANCE[tier]) {
            (ObstacleVariant::Large, width * 1.3, (height * 1.2).min(110.0), 0.0)
        } else {
            (variant, width, height, 0.0)
        }
    };

    Obstacle {
        id: state.next_entity_id(),
        variant,
        x,
        lift: lift * scale,
        width: width * scale,
        height: height * scale,
        speed,
    }
}

/// Delay until the next obstacle: shorter with combo, floored, jittered,
/// with a long breather every `BREATHER_EVERY` spawns
fn next_obstacle_delay(state: &mut GameState) -> f32 {
    let base = state.tuning.obstacle_interval;
    state.spawns.streak += 1;
    if state.spawns.streak >= BREATHER_EVERY {
        state.spawns.streak = 0;
        return base * BREATHER_FACTOR;
    }

    let combo = state.progression.combo.min(10) as f32;
    let paced = (base * (1.0 - COMBO_PACE_STEP * combo)).max(MIN_OBSTACLE_INTERVAL);
    (paced * state.rng.random_range(0.85_f32..1.15)).max(MIN_OBSTACLE_INTERVAL)
}

/// Spawn one coin at the right edge and re-arm the timer
pub fn spawn_coin(state: &mut GameState, now: f32) {
    let jitter: f32 = state.rng.random_range(0.9..1.1);
    state.spawns.next_coin_at = now + state.tuning.coin_interval * jitter;

    if state.coins.len() >= state.tuning.max_coins {
        log::debug!("Coin cap ({}) reached, skipping spawn", state.tuning.max_coins);
        return;
    }

    let tier = CoinTier::for_combo(state.progression.combo);
    let size = COIN_SIZE * state.tuning.size_scale;
    let speed = state.tuning.base_speed * state.progression.speed_multiplier();
    let rng = &mut state.rng;

    let x = state.tuning.play_width + rng.random_range(0.0_f32..120.0);
    let band_low = GROUND_LEVEL + COIN_FLOOR_MARGIN;
    let band_high = (state.tuning.play_height - size - COIN_CEILING_MARGIN).max(band_low + 1.0);

    // One coin in four flies straight
    let wave = if rng.random_range(0..4) >= 1 {
        let max_amplitude = ((band_high - band_low) / 2.0).max(0.0);
        let amplitude = rng.random_range(20.0..50.0_f32).min(max_amplitude);
        Some(CoinWave {
            amplitude,
            frequency: rng.random_range(0.6_f32..1.8),
            phase: 0.0,
        })
    } else {
        None
    };

    let amplitude = wave.map(|w| w.amplitude).unwrap_or(0.0);
    let (low, high) = (band_low + amplitude, band_high - amplitude);
    let base_y = if high > low {
        rng.random_range(low..high)
    } else {
        (band_low + band_high) / 2.0
    };

    let coin = Coin {
        id: state.next_entity_id(),
        tier,
        x,
        y: base_y,
        base_y,
        size,
        wave,
        speed,
    };
    state.events.push(GameEvent::CoinSpawned { id: coin.id });
    state.coins.push(coin);
}

/// Scroll every entity and cull the ones that left the screen.
///
/// An entity whose right edge sits exactly on the left boundary stays one
/// more tick. Each obstacle that leaves untouched scores a dodge.
pub fn advance(state: &mut GameState, dt: f32) {
    let mut dodged = Vec::new();
    state.obstacles.retain_mut(|obstacle| {
        obstacle.x -= obstacle.speed * dt;
        if obstacle.is_off_screen() {
            dodged.push(obstacle.id);
            false
        } else {
            true
        }
    });
    for id in dodged {
        state.score += 1;
        state.events.push(GameEvent::ObstacleDodged { id });
    }

    let mut missed = Vec::new();
    state.coins.retain_mut(|coin| {
        coin.advance(dt);
        if coin.is_off_screen() {
            missed.push(coin.id);
            false
        } else {
            true
        }
    });
    state
        .events
        .extend(missed.into_iter().map(|id| GameEvent::CoinMissed { id }));
}
