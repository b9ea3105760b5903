use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

pub type SoundKey = &'static str;

/// Loops that must not outlive a game over.
pub const LONG_SOUNDS: [SoundKey; 10] = [
    "run",
    "push",
    "slide",
    "snakes",
    "motorboat",
    "flamethrower",
    "fireworks",
    "ovation",
    "tsunami",
    "background",
];

pub const BACKGROUND_VOLUME: f32 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    Play { key: SoundKey, volume: Option<f32> },
    Stop(SoundKey),
    Pause(SoundKey),
    Resume(SoundKey),
    FadeTo {
        key: SoundKey,
        volume: f32,
        duration: Duration,
    },
    SetMuted(bool),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Playback {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FadeDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    direction: FadeDirection,
    remaining: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    playback: Playback,
    fade: Option<Fade>,
}

/// Keeps per-sound playback bookkeeping so repeated per-tick requests only
/// produce commands on real transitions.
#[derive(Debug, Default)]
pub struct AudioDirector {
    channels: HashMap<SoundKey, Channel>,
    muted: bool,
    pending: Vec<AudioCommand>,
}

impl AudioDirector {
    pub fn new(muted: bool) -> Self {
        Self {
            muted,
            ..Self::default()
        }
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        if self.muted != muted {
            self.muted = muted;
            self.pending.push(AudioCommand::SetMuted(muted));
        }
    }

    pub fn toggle_muted(&mut self) -> bool {
        self.set_muted(!self.muted);
        self.muted
    }

    pub fn is_playing(&self, key: SoundKey) -> bool {
        self.channel(key).playback == Playback::Playing
    }

    /// Starts a tracked loop unless it is already playing.
    pub fn play(&mut self, key: SoundKey) {
        if self.is_playing(key) {
            return;
        }
        self.channel_mut(key).playback = Playback::Playing;
        self.pending.push(AudioCommand::Play { key, volume: None });
    }

    /// Fire-and-forget sound; never tracked.
    pub fn play_effect(&mut self, key: SoundKey) {
        self.pending.push(AudioCommand::Play { key, volume: None });
    }

    pub fn stop(&mut self, key: SoundKey) {
        if !self.is_playing(key) {
            return;
        }
        let channel = self.channel_mut(key);
        channel.playback = Playback::Stopped;
        channel.fade = None;
        self.pending.push(AudioCommand::Stop(key));
    }

    pub fn pause(&mut self, key: SoundKey) {
        if self.is_playing(key) {
            self.channel_mut(key).playback = Playback::Paused;
            self.pending.push(AudioCommand::Pause(key));
        }
    }

    pub fn resume(&mut self, key: SoundKey) {
        match self.channel(key).playback {
            Playback::Playing => {}
            Playback::Paused => {
                self.channel_mut(key).playback = Playback::Playing;
                self.pending.push(AudioCommand::Resume(key));
            }
            Playback::Stopped => self.play(key),
        }
    }

    pub fn fade_in(&mut self, key: SoundKey, volume: f32, duration: Duration) {
        if self.is_playing(key) {
            return;
        }
        let channel = self.channel_mut(key);
        channel.playback = Playback::Playing;
        channel.fade = Some(Fade {
            direction: FadeDirection::In,
            remaining: duration,
        });
        self.pending.push(AudioCommand::Play {
            key,
            volume: Some(0.0),
        });
        self.pending.push(AudioCommand::FadeTo {
            key,
            volume,
            duration,
        });
    }

    pub fn fade_out(&mut self, key: SoundKey, duration: Duration) {
        let channel = self.channel(key);
        let already_fading_out =
            matches!(channel.fade, Some(fade) if fade.direction == FadeDirection::Out);
        if channel.playback != Playback::Playing || already_fading_out {
            return;
        }
        self.channel_mut(key).fade = Some(Fade {
            direction: FadeDirection::Out,
            remaining: duration,
        });
        self.pending.push(AudioCommand::FadeTo {
            key,
            volume: 0.0,
            duration,
        });
    }

    pub fn fade_in_background(&mut self) {
        self.fade_in("background", BACKGROUND_VOLUME, Duration::from_millis(500));
    }

    pub fn fade_out_background(&mut self) {
        self.fade_out("background", Duration::from_millis(500));
    }

    pub fn stop_long_sounds(&mut self) {
        for key in LONG_SOUNDS {
            self.stop(key);
        }
    }

    /// Advances fades; a finished fade-out stops its sound.
    pub fn update(&mut self, dt: Duration) {
        let mut finished_outs = Vec::new();
        for (key, channel) in &mut self.channels {
            let Some(fade) = channel.fade.as_mut() else {
                continue;
            };
            fade.remaining = fade.remaining.saturating_sub(dt);
            if !fade.remaining.is_zero() {
                continue;
            }
            if fade.direction == FadeDirection::Out {
                finished_outs.push(*key);
            }
            channel.fade = None;
        }
        finished_outs.sort_unstable();
        for key in finished_outs {
            debug!(sound = key, "fade_out_finished");
            self.stop(key);
        }
    }

    /// Drops in-flight fades, as when the world is torn down.
    pub fn cancel_fades(&mut self) {
        for channel in self.channels.values_mut() {
            channel.fade = None;
        }
    }

    pub fn drain(&mut self) -> Vec<AudioCommand> {
        std::mem::take(&mut self.pending)
    }

    fn channel(&self, key: SoundKey) -> Channel {
        self.channels.get(key).copied().unwrap_or_default()
    }

    fn channel_mut(&mut self, key: SoundKey) -> &mut Channel {
        self.channels.entry(key).or_default()
    }
}
