//! Sound cues
//!
//! The session only names the cue; sinks decide how (or whether) to play it.
//! On the web the cues are synthesized with the Web Audio API, so there are
//! no sound files to ship.

/// Sound cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Single jump off the ground
    Jump,
    /// Mid-air jump (consumes the power)
    DoubleJump,
    /// Coin collected
    Coin,
    /// Obstacle hit
    Hit,
    /// Combo reached 3, 6 or 10
    ComboMilestone,
    /// Session started
    Start,
    /// Time ran out
    GameOver,
    /// Back to the menu
    Menu,
}

/// Anything that can play sound cues. Playback must never fail the caller.
pub trait AudioSink {
    fn play(&self, effect: SoundEffect);

    /// Mute/unmute all audio
    fn set_muted(&mut self, _muted: bool) {}
}

/// Sink that only logs the cue (native builds and tests)
#[derive(Debug, Default)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play(&self, effect: SoundEffect) {
        log::trace!("audio cue: {:?}", effect);
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{AudioSink, SoundEffect};
    use crate::settings::AudioSettings;

    /// Web Audio synthesizer
    pub struct AudioManager {
        ctx: Option<AudioContext>,
        master_volume: f32,
        sfx_volume: f32,
        muted: bool,
    }

    impl AudioManager {
        pub fn new(settings: &AudioSettings) -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                master_volume: settings.master_volume.clamp(0.0, 1.0),
                sfx_volume: settings.sfx_volume.clamp(0.0, 1.0),
                muted: settings.muted,
            }
        }

        fn effective_volume(&self) -> f32 {
            if self.muted {
                0.0
            } else {
                self.master_volume * self.sfx_volume
            }
        }

        fn create_osc(
            &self,
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        /// One decaying tone, optionally sliding to `slide_to` Hz
        #[allow(clippy::too_many_arguments)]
        fn blip(
            &self,
            ctx: &AudioContext,
            vol: f32,
            freq: f32,
            slide_to: Option<f32>,
            osc_type: OscillatorType,
            start: f64,
            length: f64,
        ) {
            let Some((osc, gain)) = self.create_osc(ctx, freq, osc_type) else {
                return;
            };
            let t = ctx.current_time() + start;

            gain.gain().set_value_at_time(vol, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + length)
                .ok();
            if let Some(target) = slide_to {
                osc.frequency().set_value_at_time(freq, t).ok();
                osc.frequency()
                    .exponential_ramp_to_value_at_time(target, t + length)
                    .ok();
            }

            osc.start_with_when(t).ok();
            osc.stop_with_when(t + length + 0.05).ok();
        }

        /// Notes played one after another
        fn arpeggio(
            &self,
            ctx: &AudioContext,
            vol: f32,
            notes: &[f32],
            step: f64,
            length: f64,
            osc_type: OscillatorType,
        ) {
            for (i, freq) in notes.iter().enumerate() {
                self.blip(ctx, vol, *freq, None, osc_type, i as f64 * step, length);
            }
        }
    }

    impl AudioSink for AudioManager {
        fn play(&self, effect: SoundEffect) {
            let vol = self.effective_volume();
            if vol <= 0.0 {
                return;
            }

            let Some(ctx) = &self.ctx else { return };

            // Browsers keep the context suspended until a user gesture
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            match effect {
                SoundEffect::Jump => {
                    self.blip(ctx, vol * 0.3, 300.0, Some(600.0), OscillatorType::Triangle, 0.0, 0.12)
                }
                SoundEffect::DoubleJump => {
                    self.blip(ctx, vol * 0.3, 450.0, Some(900.0), OscillatorType::Triangle, 0.0, 0.1);
                    self.blip(ctx, vol * 0.2, 900.0, Some(1400.0), OscillatorType::Sine, 0.06, 0.1);
                }
                SoundEffect::Coin => {
                    self.arpeggio(ctx, vol * 0.25, &[800.0, 1200.0], 0.06, 0.12, OscillatorType::Sine)
                }
                SoundEffect::Hit => {
                    self.blip(ctx, vol * 0.5, 150.0, Some(50.0), OscillatorType::Sawtooth, 0.0, 0.25);
                    self.blip(ctx, vol * 0.2, 1200.0, None, OscillatorType::Square, 0.0, 0.06);
                }
                SoundEffect::ComboMilestone => self.arpeggio(
                    ctx,
                    vol * 0.25,
                    &[600.0, 800.0, 1000.0],
                    0.08,
                    0.15,
                    OscillatorType::Sine,
                ),
                SoundEffect::Start => self.arpeggio(
                    ctx,
                    vol * 0.3,
                    &[400.0, 500.0, 600.0, 800.0],
                    0.1,
                    0.3,
                    OscillatorType::Triangle,
                ),
                SoundEffect::GameOver => self.arpeggio(
                    ctx,
                    vol * 0.3,
                    &[400.0, 350.0, 300.0, 200.0],
                    0.2,
                    0.3,
                    OscillatorType::Sine,
                ),
                SoundEffect::Menu => {
                    self.blip(ctx, vol * 0.2, 500.0, None, OscillatorType::Sine, 0.0, 0.08)
                }
            }
        }

        fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_audio_accepts_every_cue() {
        let mut sink = SilentAudio;
        sink.set_muted(true);
        for effect in [
            SoundEffect::Jump,
            SoundEffect::DoubleJump,
            SoundEffect::Coin,
            SoundEffect::Hit,
            SoundEffect::ComboMilestone,
            SoundEffect::Start,
            SoundEffect::GameOver,
            SoundEffect::Menu,
        ] {
            sink.play(effect);
        }
    }
}
