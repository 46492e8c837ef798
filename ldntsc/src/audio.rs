//! Stereo audio kept in lockstep with the video timing.
//!
//! The raw audio capture runs at 1/80th of the video sample rate and carries
//! the FM carrier frequency of each analog channel. Output is resampled to
//! 48 kHz, following the line-by-line speed error of the video so audio and
//! video stay aligned on a disc that is played back slightly too fast or too
//! slow.

use bytemuck::{
    Pod,
    Zeroable,
};
use bytes::BufMut;

use crate::{
    SAMPLE_RATE,
    io::RawSample,
    sink::DecodeSink,
    util::lerp,
};

/// Video samples per raw audio frame.
pub const AUDIO_RATIO: f64 = 80.0;

pub const OUTPUT_SAMPLE_RATE: f64 = 48000.0;

/// Stereo samples per written block.
pub const AUDIO_BLOCK_LENGTH: usize = 256;

/// Raw audio frames advanced per output sample at nominal speed.
pub const NOMINAL_STEP: f64 = SAMPLE_RATE / OUTPUT_SAMPLE_RATE / AUDIO_RATIO;

/// Share of the line length error applied to the audio level.
const LEVEL_TRACKING: f64 = 0.84;

/// One raw audio frame as captured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct RawAudioFrame {
    pub left: f32,
    pub right: f32,
}

impl RawSample for RawAudioFrame {
    fn from_le(self) -> Self {
        Self {
            left: self.left.from_le(),
            right: self.right.from_le(),
        }
    }

    fn encode(&self, buffer: &mut impl BufMut) {
        buffer.put_f32_le(self.left);
        buffer.put_f32_le(self.right);
    }
}

/// One decoded stereo sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct StereoSample {
    pub left: u16,
    pub right: u16,
}

impl RawSample for StereoSample {
    fn from_le(self) -> Self {
        Self {
            left: u16::from_le(self.left),
            right: u16::from_le(self.right),
        }
    }

    fn encode(&self, buffer: &mut impl BufMut) {
        buffer.put_u16_le(self.left);
        buffer.put_u16_le(self.right);
    }
}

/// Carrier window and rest frequency of one audio channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelCalibration {
    pub center: f64,
    pub low: f64,
    pub high: f64,
}

pub const LEFT: ChannelCalibration = ChannelCalibration {
    center: 2_301_136.0,
    low: 2_250_000.0,
    high: 2_350_000.0,
};

pub const RIGHT: ChannelCalibration = ChannelCalibration {
    center: 2_812_499.0,
    low: 2_700_000.0,
    high: 2_900_000.0,
};

/// Carrier deviation mapped onto the full output range.
const DEVIATION: f64 = 300_000.0;

impl ChannelCalibration {
    /// Maps a raw carrier value to an output sample. Values outside the
    /// channel's window are replaced by silence.
    #[inline]
    pub fn recenter(&self, value: f64) -> u16 {
        let value = if (self.low..=self.high).contains(&value) {
            value
        }
        else {
            self.center
        };
        ((value - self.center) * 65535.0 / DEVIATION + 32768.0).clamp(0.0, 65535.0) as u16
    }
}

/// A window onto the raw audio stream.
#[derive(Clone, Copy, Debug)]
pub struct AudioWindow<'a> {
    /// Absolute index of `frames[0]`.
    pub start: u64,
    pub frames: &'a [RawAudioFrame],
}

impl AudioWindow<'_> {
    /// Linearly interpolated frame at absolute position `position`.
    pub fn interpolate(&self, position: f64) -> Option<(f64, f64)> {
        let offset = position - self.start as f64;
        if offset < 0.0 {
            return None;
        }
        let index = offset as usize;
        let a = self.frames.get(index)?;
        let b = self.frames.get(index + 1).unwrap_or(a);
        let t = offset - index as f64;
        Some((
            lerp(t, f64::from(a.left), f64::from(b.left)),
            lerp(t, f64::from(a.right), f64::from(b.right)),
        ))
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.start + self.frames.len() as u64
    }
}

#[derive(Clone, Debug, Default)]
pub struct AudioSynchronizer {
    next: Option<f64>,
    last: Option<f64>,
    block: Vec<StereoSample>,
    emitted: u64,
}

impl AudioSynchronizer {
    pub fn new() -> Self {
        Self {
            block: Vec::with_capacity(AUDIO_BLOCK_LENGTH),
            ..Default::default()
        }
    }

    /// Position of the most recently emitted frame, in absolute audio frames.
    #[inline]
    pub fn cursor(&self) -> Option<f64> {
        self.last
    }

    /// Position of the next frame to be emitted.
    #[inline]
    pub fn next_position(&self) -> Option<f64> {
        self.next
    }

    /// Number of stereo samples emitted so far, including buffered ones.
    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Emits the audio up to the video crosspoint `crosspoint`.
    ///
    /// `previous` is the crosspoint that started the interval, both in absolute
    /// video samples. `scale` is the ratio of the interval to its nominal
    /// length.
    pub fn advance<S: DecodeSink + ?Sized>(
        &mut self,
        previous: f64,
        crosspoint: f64,
        scale: f64,
        window: &AudioWindow,
        sink: &mut S,
    ) -> Result<(), std::io::Error> {
        let gain = (scale - 1.0) * LEVEL_TRACKING + 1.0;
        let mut next = self.next.unwrap_or(previous / AUDIO_RATIO);

        while next * AUDIO_RATIO < crosspoint {
            let Some((left, right)) = window.interpolate(next)
            else {
                tracing::warn!(
                    position = next,
                    start = window.start,
                    end = window.end(),
                    "audio underrun"
                );
                break;
            };

            self.block.push(StereoSample {
                left: LEFT.recenter(left * gain),
                right: RIGHT.recenter(right * gain),
            });
            self.emitted += 1;
            if self.block.len() == AUDIO_BLOCK_LENGTH {
                sink.write_audio(&self.block)?;
                self.block.clear();
            }

            self.last = Some(next);
            next += NOMINAL_STEP * scale;
        }

        self.next = Some(next);
        Ok(())
    }

    /// Writes out the samples of an incomplete block.
    pub fn finish<S: DecodeSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), std::io::Error> {
        if !self.block.is_empty() {
            sink.write_audio(&self.block)?;
            self.block.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::sink::MemorySink;

    fn silence(frames: usize) -> Vec<RawAudioFrame> {
        vec![
            RawAudioFrame {
                left: LEFT.center as f32,
                right: RIGHT.center as f32,
            };
            frames
        ]
    }

    #[test]
    fn recentering() {
        assert_eq!(LEFT.recenter(LEFT.center), 32768);
        assert_eq!(RIGHT.recenter(RIGHT.center), 32768);
        assert_eq!(LEFT.recenter(1_000_000.0), 32768);
        assert_eq!(RIGHT.recenter(3_000_000.0), 32768);
        assert_eq!(LEFT.recenter(LEFT.center + 30_000.0), 39321);
        assert_eq!(RIGHT.recenter(RIGHT.high), 51882);
        assert_eq!(RIGHT.recenter(RIGHT.low), 8192);
        assert_eq!(RIGHT.recenter(RIGHT.low - 1.0), 32768);
    }

    #[test]
    fn cursor_never_passes_the_crosspoint() {
        let frames = silence(4096);
        let window = AudioWindow {
            start: 0,
            frames: &frames,
        };

        for scale in [0.9, 0.95, 1.0, 1.05, 1.1] {
            let mut audio = AudioSynchronizer::new();
            let mut sink = MemorySink::default();
            let mut previous = 1000.0;
            for _ in 0..100 {
                let crosspoint = previous + 1820.0 * scale;
                audio
                    .advance(previous, crosspoint, scale, &window, &mut sink)
                    .unwrap();
                let cursor = audio.cursor().unwrap();
                assert!(cursor * AUDIO_RATIO < crosspoint);
                assert!(audio.next_position().unwrap() * AUDIO_RATIO >= crosspoint);
                previous = crosspoint;
            }
        }
    }

    #[test]
    fn emits_48khz_at_nominal_speed() {
        let frames = silence(8192);
        let window = AudioWindow {
            start: 0,
            frames: &frames,
        };
        let mut audio = AudioSynchronizer::new();
        let mut sink = MemorySink::default();

        let lines = 300;
        for line in 0..lines {
            let previous = line as f64 * 1820.0;
            audio
                .advance(previous, previous + 1820.0, 1.0, &window, &mut sink)
                .unwrap();
        }
        audio.finish(&mut sink).unwrap();

        let expected = lines as f64 * 1820.0 / SAMPLE_RATE * OUTPUT_SAMPLE_RATE;
        assert_abs_diff_eq!(sink.audio.len() as f64, expected, epsilon = 1.0);
        assert_eq!(sink.audio.len() as u64, audio.emitted());
        assert!(sink.audio.iter().all(|s| *s == StereoSample {
            left: 32768,
            right: 32768
        }));
        assert!(
            sink.audio_blocks
                .iter()
                .rev()
                .skip(1)
                .all(|length| *length == AUDIO_BLOCK_LENGTH)
        );
    }

    #[test]
    fn underrun_stops_at_the_window_end() {
        let frames = silence(10);
        let window = AudioWindow {
            start: 100,
            frames: &frames,
        };
        let mut audio = AudioSynchronizer::new();
        let mut sink = MemorySink::default();
        audio
            .advance(8000.0, 20000.0, 1.0, &window, &mut sink)
            .unwrap();
        audio.finish(&mut sink).unwrap();
        assert!(sink.audio.len() <= 2);
        assert!(audio.next_position().unwrap() < 110.0 + NOMINAL_STEP);
    }

    #[test]
    fn interpolates_between_frames() {
        let frames = [
            RawAudioFrame {
                left: 10.0,
                right: 20.0,
            },
            RawAudioFrame {
                left: 30.0,
                right: 60.0,
            },
        ];
        let window = AudioWindow {
            start: 5,
            frames: &frames,
        };
        let (left, right) = window.interpolate(5.25).unwrap();
        assert_abs_diff_eq!(left, 15.0);
        assert_abs_diff_eq!(right, 30.0);
        assert!(window.interpolate(4.5).is_none());
        assert!(window.interpolate(7.0).is_none());
    }
}
