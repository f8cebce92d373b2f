//! Combo, speed and power-up progression
//!
//! The combo counts coins collected since the last obstacle hit. It drives
//! the global speed multiplier, the tier of newly spawned coins and the
//! double-jump power-up.

use serde::{Deserialize, Serialize};

use super::state::CoinTier;
use crate::consts::*;

/// What a coin pickup unlocked, for the caller to report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickupOutcome {
    /// Combo value after the pickup
    pub combo: u32,
    /// Combo crossed one of `COMBO_MILESTONES`
    pub milestone: bool,
    /// Double-jump power should be granted
    pub grants_double_jump: bool,
    /// Temporary speed boost was (re)started
    pub boost_started: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Progression {
    pub combo: u32,
    /// Seconds left on the coin speed boost (0 = inactive)
    pub boost_remaining: f32,
}

impl Progression {
    /// Combo tier: 0 below `MID_COMBO`, 1 below `HIGH_COMBO`, else 2
    pub fn tier(&self) -> u32 {
        if self.combo >= HIGH_COMBO {
            2
        } else if self.combo >= MID_COMBO {
            1
        } else {
            0
        }
    }

    pub fn boost_active(&self) -> bool {
        self.boost_remaining > 0.0
    }

    /// Global speed multiplier. An active boost overrides the combo value.
    pub fn speed_multiplier(&self) -> f32 {
        if self.boost_active() {
            return BOOST_MULTIPLIER;
        }
        match self.tier() {
            2 => HIGH_SPEED,
            1 => MID_SPEED,
            _ => 1.0,
        }
    }

    /// Jump impulse scale for the current combo
    pub fn jump_scale(&self, combo_jump_scaling: bool) -> f32 {
        if combo_jump_scaling && self.combo >= MID_COMBO {
            COMBO_JUMP_MULTIPLIER
        } else {
            1.0
        }
    }

    /// Count down the boost. Returns true on the tick it runs out.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.boost_active() {
            return false;
        }
        self.boost_remaining = (self.boost_remaining - dt).max(0.0);
        self.boost_remaining == 0.0
    }

    /// Register a coin pickup. The combo is bumped before tier effects apply.
    pub fn collect_coin(&mut self, tier: CoinTier) -> PickupOutcome {
        self.combo = self.combo.saturating_add(1);

        let mut outcome = PickupOutcome {
            combo: self.combo,
            milestone: COMBO_MILESTONES.contains(&self.combo),
            ..Default::default()
        };

        if tier == CoinTier::High {
            self.boost_remaining = BOOST_DURATION;
            outcome.boost_started = true;
            outcome.grants_double_jump = self.combo >= HIGH_COMBO;
        }

        outcome
    }

    /// Obstacle hit: combo back to zero and any boost cancelled
    pub fn reset(&mut self) {
        self.combo = 0;
        self.boost_remaining = 0.0;
    }
}
