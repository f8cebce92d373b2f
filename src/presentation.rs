//! Declarative render/UI events
//!
//! The session never touches the DOM. It describes what changed and a
//! `PresentationSink` turns that into pixels (or nothing, in tests).

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;

use crate::ranking::Leaderboard;
use crate::session::SessionPhase;
use crate::sim::{Entity, JumpPhase};

/// Timer remaining at or below this shows the low warning
pub const TIMER_LOW_SECS: f32 = 30.0;
/// Timer remaining at or below this shows the critical warning
pub const TIMER_CRITICAL_SECS: f32 = 10.0;

/// Color for time-bonus floating text
pub const TIME_BONUS_COLOR: &str = "#FFFFFF";
/// Color for hit penalty text and the critical timer
pub const HIT_COLOR: &str = "#FF5252";

/// How urgent the timer display should look
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerWarning {
    #[default]
    Normal,
    Low,
    Critical,
}

impl TimerWarning {
    pub fn for_remaining(secs: f32) -> Self {
        if secs <= TIMER_CRITICAL_SECS {
            TimerWarning::Critical
        } else if secs <= TIMER_LOW_SECS {
            TimerWarning::Low
        } else {
            TimerWarning::Normal
        }
    }

    /// Timer text color
    pub fn color(&self) -> &'static str {
        match self {
            TimerWarning::Normal => "#FFFFFF",
            TimerWarning::Low => "#FFC107",
            TimerWarning::Critical => HIT_COLOR,
        }
    }

    /// Only the critical level blinks
    pub fn css_class(&self) -> Option<&'static str> {
        match self {
            TimerWarning::Critical => Some("timer-warning"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum PresentationEvent {
    PlayerMoved { y: f32, phase: JumpPhase },
    EntityCreated(Entity),
    EntityUpdated(Entity),
    EntityDestroyed { id: u32 },
    ScoreChanged(u64),
    TimerChanged { remaining: f32, warning: TimerWarning },
    ComboChanged { combo: u32, milestone: bool },
    /// Short-lived text rising from `pos` (play-area coordinates)
    FloatingText { text: String, pos: Vec2, color: &'static str },
    PhaseChanged(SessionPhase),
    Leaderboard(Rc<Leaderboard>),
}

/// Anything that can display presentation events
pub trait PresentationSink {
    fn emit(&mut self, event: PresentationEvent);
}

/// Records events into a shared buffer the owner can inspect
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Rc<RefCell<Vec<PresentationEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything recorded so far
    pub fn drain(&self) -> Vec<PresentationEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl PresentationSink for EventLog {
    fn emit(&mut self, event: PresentationEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Timer display text, one decimal place
pub fn format_timer(secs: f32) -> String {
    format!("{:.1}", secs.max(0.0))
}

pub fn format_combo(combo: u32) -> String {
    format!("Combo: {}", combo)
}
