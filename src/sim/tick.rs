//! Simulation tick
//!
//! Advances one frame in a fixed order: clock, player, entities, collisions,
//! progression. Side effects leave the sim only as `GameEvent`s.

use super::collision;
use super::player::JumpKind;
use super::spawn;
use super::state::{Coin, GameEvent, GameState, Obstacle};
use crate::consts::*;

/// Jump command. Illegal jumps are no-ops.
pub fn jump(state: &mut GameState) -> Option<JumpKind> {
    let scale = state
        .progression
        .jump_scale(state.tuning.combo_jump_scaling);
    let kind = state.player.jump(scale)?;
    state.events.push(GameEvent::Jumped(kind));
    Some(kind)
}

/// Advance the game state by `dt` seconds. Returns true once time is up.
pub fn tick(state: &mut GameState, dt: f32) -> bool {
    let dt = dt.max(0.0);

    // Clock
    state.elapsed += dt;
    state.time_remaining -= dt;

    // Player
    state.player.tick(dt, state.tuning.gravity);

    // Entities
    spawn::run_spawners(state);
    spawn::advance(state, dt);

    // Collisions
    resolve_obstacle_hits(state);
    resolve_coin_pickups(state);

    // Progression
    if state.progression.tick(dt) {
        state.events.push(GameEvent::BoostEnded);
    }

    if state.time_remaining <= 0.0 {
        state.time_remaining = 0.0;
        state.events.push(GameEvent::TimeUp);
        return true;
    }
    false
}

fn resolve_obstacle_hits(state: &mut GameState) {
    let player_rect = state.player.rect();
    let mut hits: Vec<Obstacle> = Vec::new();
    state.obstacles.retain(|obstacle| {
        if collision::check(&player_rect, &obstacle.rect(), OBSTACLE_TOLERANCE) {
            hits.push(obstacle.clone());
            false
        } else {
            true
        }
    });

    for obstacle in hits {
        log::debug!("Hit obstacle {} at combo {}", obstacle.id, state.progression.combo);
        state.time_remaining -= state.tuning.hit_penalty;
        state.player.has_double_jump_power = false;

        let had_combo = state.progression.combo > 0;
        let had_boost = state.progression.boost_active();
        state.progression.reset();

        state.events.push(GameEvent::ObstacleHit {
            id: obstacle.id,
            pos: obstacle.rect().center(),
        });
        if had_combo {
            state.events.push(GameEvent::ComboChanged {
                combo: 0,
                milestone: false,
            });
        }
        if had_boost {
            state.events.push(GameEvent::BoostEnded);
        }
    }
}

fn resolve_coin_pickups(state: &mut GameState) {
    let player_rect = state.player.rect();
    let mut collected: Vec<Coin> = Vec::new();
    state.coins.retain(|coin| {
        if collision::check(&player_rect, &coin.rect(), COIN_TOLERANCE) {
            collected.push(coin.clone());
            false
        } else {
            true
        }
    });

    for coin in collected {
        let points = coin.tier.points();
        let time_bonus = coin.tier.time_bonus();
        state.score += points;
        state.time_remaining = (state.time_remaining + time_bonus).min(state.tuning.timer_cap);

        let outcome = state.progression.collect_coin(coin.tier);
        state.events.push(GameEvent::CoinCollected {
            id: coin.id,
            tier: coin.tier,
            points,
            time_bonus,
            pos: coin.rect().center(),
        });
        state.events.push(GameEvent::ComboChanged {
            combo: outcome.combo,
            milestone: outcome.milestone,
        });
        if outcome.boost_started {
            state.events.push(GameEvent::BoostStarted);
        }
        if outcome.grants_double_jump && !state.player.has_double_jump_power {
            state.player.has_double_jump_power = true;
            log::debug!("Double jump granted at combo {}", outcome.combo);
            state.events.push(GameEvent::DoubleJumpGranted);
        }
    }
}
