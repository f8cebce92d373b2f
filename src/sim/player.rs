//! Player square: vertical physics and jump state machine
//!
//! The square never moves horizontally. It stands on the ground line, jumps
//! once from the ground and, while holding the double-jump power, once more
//! in mid-air.

use serde::{Deserialize, Serialize};

use super::collision::Rect;
use crate::consts::*;

/// Where the player is in its jump cycle
///
/// Transitions: `Grounded -> SingleJumped -> DoubleJumped -> Grounded`, or
/// `SingleJumped -> Grounded` when the second jump is never used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JumpPhase {
    #[default]
    Grounded,
    SingleJumped,
    DoubleJumped,
}

/// Which jump a `jump()` call performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpKind {
    Single,
    Double,
}

/// Vertical limits the player is clamped to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerticalBounds {
    pub ground: f32,
    pub ceiling: f32,
}

impl Default for VerticalBounds {
    fn default() -> Self {
        Self::for_area(PLAY_HEIGHT, PLAYER_SIZE)
    }
}

impl VerticalBounds {
    /// Bounds for a container of the given height holding a player of `size`
    pub fn for_area(height: f32, size: f32) -> Self {
        let ceiling = (height - size).max(GROUND_LEVEL);
        Self {
            ground: GROUND_LEVEL,
            ceiling,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Bottom edge height (y-up)
    pub y: f32,
    /// Vertical velocity, positive is upward
    pub vy: f32,
    pub phase: JumpPhase,
    pub has_double_jump_power: bool,
    pub size: f32,
    pub bounds: VerticalBounds,
    pub jump_impulse: f32,
    pub double_jump_impulse: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self::new(PLAYER_SIZE, VerticalBounds::default())
    }
}

impl Player {
    pub fn new(size: f32, bounds: VerticalBounds) -> Self {
        Self {
            y: bounds.ground,
            vy: 0.0,
            phase: JumpPhase::Grounded,
            has_double_jump_power: false,
            size,
            bounds,
            jump_impulse: JUMP_IMPULSE,
            double_jump_impulse: DOUBLE_JUMP_IMPULSE,
        }
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.phase == JumpPhase::Grounded
    }

    pub fn rect(&self) -> Rect {
        Rect::new(PLAYER_X, self.y, self.size, self.size)
    }

    /// Integrate one step. `gravity` is a positive magnitude pulling down.
    pub fn tick(&mut self, dt: f32, gravity: f32) {
        if !self.is_grounded() {
            self.vy -= gravity * dt;
            self.y += self.vy * dt;
        }

        // A fresh jump still sits on the ground until a non-zero step moves it
        if self.y <= self.bounds.ground && self.vy <= 0.0 {
            self.land();
        } else if self.y < self.bounds.ground {
            self.y = self.bounds.ground;
        } else if self.y > self.bounds.ceiling {
            self.y = self.bounds.ceiling;
            self.vy = 0.0;
        }
    }

    fn land(&mut self) {
        self.y = self.bounds.ground;
        self.vy = 0.0;
        self.phase = JumpPhase::Grounded;
    }

    /// Attempt a jump. Illegal jumps are ignored and return `None`.
    ///
    /// `impulse_scale` multiplies both impulses (1.0 unless combo jump
    /// scaling is enabled).
    pub fn jump(&mut self, impulse_scale: f32) -> Option<JumpKind> {
        match self.phase {
            JumpPhase::Grounded => {
                self.vy = self.jump_impulse * impulse_scale;
                self.phase = JumpPhase::SingleJumped;
                Some(JumpKind::Single)
            }
            JumpPhase::SingleJumped if self.has_double_jump_power => {
                self.vy = self.double_jump_impulse * impulse_scale;
                self.phase = JumpPhase::DoubleJumped;
                self.has_double_jump_power = false;
                Some(JumpKind::Double)
            }
            _ => None,
        }
    }

    /// Re-fit to a new container height (device resize)
    pub fn set_bounds(&mut self, bounds: VerticalBounds) {
        self.bounds = bounds;
        self.y = self.y.clamp(bounds.ground, bounds.ceiling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_jump_from_ground() {
        let mut player = Player::default();
        assert_eq!(player.jump(1.0), Some(JumpKind::Single));
        assert_eq!(player.phase, JumpPhase::SingleJumped);
        assert_eq!(player.vy, JUMP_IMPULSE);
    }

    #[test]
    fn test_second_jump_without_power_is_ignored() {
        let mut player = Player::default();
        player.jump(1.0);
        let vy = player.vy;
        assert_eq!(player.jump(1.0), None);
        assert_eq!(player.phase, JumpPhase::SingleJumped);
        assert_eq!(player.vy, vy);
    }

    #[test]
    fn test_double_jump_consumes_power() {
        let mut player = Player::default();
        player.has_double_jump_power = true;
        player.jump(1.0);
        player.tick(FRAME_DT, GRAVITY);
        assert_eq!(player.jump(1.0), Some(JumpKind::Double));
        assert_eq!(player.phase, JumpPhase::DoubleJumped);
        assert_eq!(player.vy, DOUBLE_JUMP_IMPULSE);
        assert!(!player.has_double_jump_power);

        // No third jump
        assert_eq!(player.jump(1.0), None);
    }

    #[test]
    fn test_lands_and_can_jump_again() {
        let mut player = Player::default();
        player.jump(1.0);
        for _ in 0..600 {
            player.tick(FRAME_DT, GRAVITY);
            if player.is_grounded() {
                break;
            }
        }
        assert!(player.is_grounded());
        assert_eq!(player.y, GROUND_LEVEL);
        assert_eq!(player.vy, 0.0);
        assert_eq!(player.jump(1.0), Some(JumpKind::Single));
    }

    #[test]
    fn test_zero_step_keeps_pending_jump() {
        let mut player = Player::default();
        player.jump(1.0);
        player.tick(0.0, GRAVITY);
        assert_eq!(player.phase, JumpPhase::SingleJumped);
        assert_eq!(player.vy, JUMP_IMPULSE);
        assert_eq!(player.y, GROUND_LEVEL);

        player.tick(FRAME_DT, GRAVITY);
        assert!(player.y > GROUND_LEVEL);
    }

    #[test]
    fn test_ceiling_clamp() {
        let mut player = Player::new(PLAYER_SIZE, VerticalBounds::for_area(100.0, PLAYER_SIZE));
        player.jump(3.0);
        player.tick(0.05, GRAVITY);
        assert_eq!(player.y, 60.0);
        assert_eq!(player.vy, 0.0);
    }

    #[test]
    fn test_impulse_scale() {
        let mut player = Player::default();
        player.jump(COMBO_JUMP_MULTIPLIER);
        assert!((player.vy - JUMP_IMPULSE * COMBO_JUMP_MULTIPLIER).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn prop_never_below_ground(
            jumps in proptest::collection::vec(any::<bool>(), 1..400),
            power in any::<bool>(),
            dt in 0.001f32..0.05,
        ) {
            let mut player = Player::default();
            player.has_double_jump_power = power;
            for jump in jumps {
                if jump {
                    player.jump(1.0);
                }
                player.tick(dt, GRAVITY);
                prop_assert!(player.y >= player.bounds.ground);
                prop_assert!(player.y <= player.bounds.ceiling);
            }
        }
    }
}
