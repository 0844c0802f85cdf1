//! Procedural alert tone.

use std::f32::consts::TAU;
use std::time::Duration;

/// Output sample rate used by the bundled backends.
pub const SAMPLE_RATE: u32 = 44_100;

/// Level the envelope decays to by the end of the tone.
const DECAY_FLOOR: f32 = 0.01;

/// Longest tone that is rendered; longer durations are cut to this.
pub const MAX_DURATION: Duration = Duration::from_secs(10);

/// A sine tone under an exponential decay envelope.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tone {
    /// Oscillator frequency.
    pub frequency_hz: f32,
    /// Length of the tone.
    pub duration: Duration,
    /// Peak amplitude in `0.0..=1.0`.
    pub gain: f32,
}

impl Default for Tone {
    fn default() -> Self {
        Self {
            frequency_hz: 880.0,
            duration: Duration::from_millis(500),
            gain: 0.3,
        }
    }
}

impl Tone {
    /// Render to mono `f32` PCM at `sample_rate`.
    ///
    /// The envelope starts at `gain` and falls exponentially to
    /// [`DECAY_FLOOR`] at the last sample. Durations past [`MAX_DURATION`]
    /// are cut to it.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let duration = self.duration.min(MAX_DURATION);
        let samples = (duration.as_micros() * u128::from(sample_rate) / 1_000_000) as usize;
        if samples == 0 {
            return Vec::new();
        }
        let gain = self.gain.clamp(0.0, 1.0);
        let rate = sample_rate as f32;
        let secs = duration.as_secs_f32();
        let ratio = if gain > DECAY_FLOOR {
            DECAY_FLOOR / gain
        } else {
            1.0
        };

        (0..samples)
            .map(|i| {
                let t = i as f32 / rate;
                let envelope = gain * ratio.powf(t / secs);
                envelope * (TAU * self.frequency_hz * t).sin()
            })
            .collect()
    }

    /// Render as little-endian `f32` bytes, the layout raw-PCM players read.
    pub fn render_le_bytes(&self, sample_rate: u32) -> Vec<u8> {
        self.render(sample_rate)
            .into_iter()
            .flat_map(f32::to_le_bytes)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_count_matches_duration() {
        let tone = Tone::default();
        assert_eq!(tone.render(SAMPLE_RATE).len(), 22_050);
        assert_eq!(tone.render(8_000).len(), 4_000);
    }

    #[test]
    fn zero_duration_is_silent() {
        let tone = Tone {
            duration: Duration::ZERO,
            ..Tone::default()
        };
        assert!(tone.render(SAMPLE_RATE).is_empty());
    }

    #[test]
    fn amplitude_never_exceeds_gain() {
        let tone = Tone::default();
        assert!(tone.render(SAMPLE_RATE).iter().all(|s| s.abs() <= 0.3 + 1e-6));
    }

    #[test]
    fn envelope_decays() {
        let samples = Tone::default().render(SAMPLE_RATE);
        let peak = |range: std::ops::Range<usize>| {
            samples[range].iter().fold(0.0_f32, |m, s| m.max(s.abs()))
        };
        let head = peak(0..2_000);
        let tail = peak(20_000..22_050);
        assert!(head > 0.25, "head peak {head}");
        assert!(tail < 0.02, "tail peak {tail}");
    }

    #[test]
    fn gain_is_clamped() {
        let tone = Tone {
            gain: 4.0,
            ..Tone::default()
        };
        assert!(tone.render(SAMPLE_RATE).iter().all(|s| s.abs() <= 1.0 + 1e-6));
    }

    #[test]
    fn oversized_duration_is_capped() {
        let tone = Tone {
            duration: Duration::from_secs(u64::MAX),
            ..Tone::default()
        };
        assert_eq!(tone.render(8_000).len(), 80_000);
    }

    #[test]
    fn le_bytes_are_four_per_sample() {
        let tone = Tone::default();
        assert_eq!(tone.render_le_bytes(SAMPLE_RATE).len(), 22_050 * 4);
    }
}
