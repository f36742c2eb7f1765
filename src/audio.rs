use anyhow::Result;

use crate::alarm::model::ToneId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    /// `None` plays until `stop` is called.
    pub duration_ms: Option<u64>,
    /// 0.0..=1.0; sinks clamp out-of-range input.
    pub volume: f32,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            duration_ms: None,
            volume: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ToneMeta {
    pub id: ToneId,
    pub label: &'static str,
    pub description: &'static str,
}

pub const TONES: [ToneMeta; 4] = [
    ToneMeta {
        id: ToneId::Beep,
        label: "Beep",
        description: "Simple repeating beep",
    },
    ToneMeta {
        id: ToneId::Chime,
        label: "Chime",
        description: "Soft chime-like tone",
    },
    ToneMeta {
        id: ToneId::Digital,
        label: "Digital",
        description: "Digital alarm tone",
    },
    ToneMeta {
        id: ToneId::Bell,
        label: "Bell",
        description: "Bell-like ring",
    },
];

pub fn tone_label(tone: ToneId) -> &'static str {
    TONES
        .iter()
        .find(|meta| meta.id == tone)
        .map(|meta| meta.label)
        .unwrap_or("Tone")
}

/// Playback capability supplied by the host. Failures are an enhancement
/// problem, not a scheduling one; callers surface them without letting them
/// block the ringing state.
pub trait AudioSink {
    fn play(&mut self, tone: ToneId, opts: PlayOptions) -> Result<()>;
    /// Safe to call when nothing is playing.
    fn stop(&mut self);
}

/// Built-in sink for hosts without a synthesis backend: tracks what would be
/// playing so the lifecycle stays exercised, emits nothing.
#[derive(Debug, Default)]
pub struct SilentSink {
    playing: Option<ToneId>,
}

impl SilentSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playing(&self) -> Option<ToneId> {
        self.playing
    }
}

impl AudioSink for SilentSink {
    fn play(&mut self, tone: ToneId, _opts: PlayOptions) -> Result<()> {
        self.playing = Some(tone);
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_tone() {
        for tone in ToneId::ALL {
            assert!(TONES.iter().any(|meta| meta.id == tone));
            assert!(!tone_label(tone).is_empty());
        }
    }

    #[test]
    fn silent_sink_tracks_playback_and_stop_is_idempotent() {
        let mut sink = SilentSink::new();
        sink.stop();
        assert_eq!(sink.playing(), None);

        sink.play(ToneId::Chime, PlayOptions::default()).expect("play");
        assert_eq!(sink.playing(), Some(ToneId::Chime));

        sink.stop();
        sink.stop();
        assert_eq!(sink.playing(), None);
    }
}
