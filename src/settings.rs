//! Game settings, tunables and device adaptation
//!
//! Persisted in LocalStorage. The device profile is not persisted: the page
//! recomputes it on load and on every resize.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Performance mode levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PerformanceMode {
    Low,
    Balanced,
    #[default]
    High,
}

impl PerformanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceMode::Low => "low",
            PerformanceMode::Balanced => "balanced",
            PerformanceMode::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(PerformanceMode::Low),
            "balanced" | "medium" | "med" => Some(PerformanceMode::Balanced),
            "high" => Some(PerformanceMode::High),
            _ => None,
        }
    }

    /// Simultaneous obstacle cap for this mode
    pub fn max_obstacles(&self) -> usize {
        match self {
            PerformanceMode::Low => 3,
            PerformanceMode::Balanced => 4,
            PerformanceMode::High => 5,
        }
    }

    /// Simultaneous coin cap for this mode
    pub fn max_coins(&self) -> usize {
        match self {
            PerformanceMode::Low => 3,
            PerformanceMode::Balanced => 5,
            PerformanceMode::High => 7,
        }
    }
}

/// What the device layer knows about the browser it runs in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub is_mobile: bool,
    pub is_tablet: bool,
    pub is_low_end_device: bool,
    pub performance_mode: PerformanceMode,
}

/// Numbers the simulation consumes from the device layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Scales scroll speed and gravity
    pub speed_multiplier: f32,
    /// Scales player and entity sizes
    pub size_scale: f32,
    pub is_low_performance: bool,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            size_scale: 1.0,
            is_low_performance: false,
        }
    }
}

impl DeviceProfile {
    /// Reduce device capabilities to the profile the game uses
    pub fn from_capabilities(caps: &DeviceCapabilities) -> Self {
        let low_end = caps.is_low_end_device || caps.performance_mode == PerformanceMode::Low;

        let size_scale = if caps.is_mobile {
            if caps.is_low_end_device { 0.8 } else { 0.9 }
        } else if caps.is_tablet {
            0.95
        } else {
            1.0
        };

        // Low-end devices get a gentler game (4.5 vs 5 units/frame)
        let speed_multiplier = if low_end { 0.9 } else { 1.0 };

        Self {
            speed_multiplier,
            size_scale,
            is_low_performance: low_end,
        }
    }
}

/// Gameplay tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    /// Seconds on the clock at start
    pub initial_timer: f32,
    /// Coin time bonuses can't push the clock past this
    pub timer_cap: f32,
    /// Seconds lost per obstacle hit
    pub hit_penalty: f32,
    /// Obstacle scroll speed (units/s)
    pub base_speed: f32,
    /// Downward acceleration (units/s²)
    pub gravity: f32,
    pub jump_impulse: f32,
    pub double_jump_impulse: f32,
    /// Scale jumps by `COMBO_JUMP_MULTIPLIER` once combo >= 3
    #[serde(default)]
    pub combo_jump_scaling: bool,
    /// Base seconds between obstacle spawns
    pub obstacle_interval: f32,
    /// Base seconds between coin spawns
    pub coin_interval: f32,
    pub max_obstacles: usize,
    pub max_coins: usize,
    /// Play area size
    pub play_width: f32,
    pub play_height: f32,
    /// Player and entity size multiplier
    #[serde(default = "default_scale")]
    pub size_scale: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            initial_timer: INITIAL_TIMER,
            timer_cap: TIMER_CAP,
            hit_penalty: HIT_PENALTY,
            base_speed: BASE_SPEED,
            gravity: GRAVITY,
            jump_impulse: JUMP_IMPULSE,
            double_jump_impulse: DOUBLE_JUMP_IMPULSE,
            combo_jump_scaling: false,
            obstacle_interval: 2.0,
            coin_interval: 3.0,
            max_obstacles: 5,
            max_coins: 7,
            play_width: PLAY_WIDTH,
            play_height: PLAY_HEIGHT,
            size_scale: 1.0,
        }
    }
}

impl Tuning {
    /// Effective tuning for a device: slower and sparser on weak hardware
    pub fn for_device(&self, profile: &DeviceProfile) -> Self {
        let mut tuning = self.clone();
        let speed = profile.speed_multiplier.clamp(0.25, 2.0);
        tuning.base_speed *= speed;
        tuning.gravity *= speed;
        tuning.size_scale = profile.size_scale.clamp(0.25, 2.0);

        if profile.is_low_performance {
            tuning.obstacle_interval = tuning.obstacle_interval.max(2.5);
            tuning.coin_interval = tuning.coin_interval.max(3.5);
            tuning.max_obstacles = tuning.max_obstacles.min(PerformanceMode::Low.max_obstacles());
            tuning.max_coins = tuning.max_coins.min(PerformanceMode::Low.max_coins());
        }
        tuning
    }

    /// Player square size after device scaling
    pub fn player_size(&self) -> f32 {
        PLAYER_SIZE * self.size_scale
    }
}

/// Audio preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,
    /// Mute when window loses focus
    pub mute_on_blur: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            mute_on_blur: true,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub performance: PerformanceMode,
    pub tuning: Tuning,
    pub audio: AudioSettings,
    /// Reduced motion (skip floating text and shake)
    #[serde(default)]
    pub reduced_motion: bool,
}

impl Settings {
    /// Apply a performance mode (updates the entity caps)
    pub fn apply_performance_mode(&mut self, mode: PerformanceMode) {
        self.performance = mode;
        self.tuning.max_obstacles = mode.max_obstacles();
        self.tuning.max_coins = mode.max_coins();
    }

    /// Tuning with the performance mode's entity caps applied
    pub fn effective_tuning(&self) -> Tuning {
        let mut tuning = self.tuning.clone();
        tuning.max_obstacles = tuning.max_obstacles.min(self.performance.max_obstacles());
        tuning.max_coins = tuning.max_coins.min(self.performance.max_coins());
        tuning
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "combo_runner_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match serde_json::from_str(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring corrupt settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
