//! Synthetic composite captures.
//!
//! Generates an ideal monochrome NTSC signal at 8x subcarrier with a
//! continuous color burst, a flat luminance level and a complete vertical
//! interval, plus a matching raw audio stream. Timing is laid out on a grid of
//! half-line slots.

use std::{
    f64::consts::TAU,
    ops::Range,
};

use crate::{
    IN_FREQ,
    SAMPLE_RATE,
    audio::{
        AUDIO_RATIO,
        LEFT,
        RIGHT,
        RawAudioFrame,
    },
    level::{
        BLANKING_IRE,
        SYNC_TIP_IRE,
        ire_to_sample,
    },
};

/// Input samples in half a line.
pub const SLOT_LENGTH: usize = 910;

/// Half-line slots in a frame.
pub const FRAME_SLOTS: usize = 1050;

pub const HSYNC_WIDTH: usize = 134;
pub const EQUALIZING_WIDTH: usize = 66;
pub const BROAD_WIDTH: usize = 776;

const BURST_START: usize = 152;
const BURST_END: usize = 224;
const ACTIVE_START: usize = 312;
const FRONT_PORCH: usize = 43;

/// First slot of the lines following the vertical interval of a field.
const FIELD_VIDEO_SLOT: usize = 18;

#[derive(Clone, Debug)]
pub struct SynthConfig {
    /// Flat luminance of active video.
    pub luma_ire: f64,

    /// Peak amplitude of the color burst.
    pub burst_ire: f64,

    /// Subcarrier phase at sample 0.
    pub burst_phase: f64,

    /// Frequency of the test tone on both audio channels, in Hz.
    pub tone_frequency: f64,

    /// Amplitude of the test tone in raw audio units. Zero gives silence.
    pub tone_amplitude: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            luma_ire: 50.0,
            burst_ire: 20.0,
            burst_phase: 0.0,
            tone_frequency: 1000.0,
            tone_amplitude: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Equalizing,
    Broad,
    Blank,
    LineStart { length: usize },
    LineEnd,
}

impl Slot {
    fn at(slot: usize) -> Self {
        let (field, slot) = if slot < FRAME_SLOTS / 2 {
            (0, slot)
        }
        else {
            (1, slot - FRAME_SLOTS / 2)
        };

        match (field, slot) {
            (_, 0..6) | (_, 12..18) => Slot::Equalizing,
            (_, 6..12) => Slot::Broad,
            // the first field ends on half a line
            (0, 524) => Slot::LineStart {
                length: SLOT_LENGTH,
            },
            (0, slot) if (slot - FIELD_VIDEO_SLOT) % 2 == 0 => Slot::LineStart {
                length: 2 * SLOT_LENGTH,
            },
            (0, _) => Slot::LineEnd,
            // the second field starts on half a line
            (_, FIELD_VIDEO_SLOT) => Slot::Blank,
            (_, slot) if (slot - FIELD_VIDEO_SLOT - 1) % 2 == 0 => Slot::LineStart {
                length: 2 * SLOT_LENGTH,
            },
            (_, _) => Slot::LineEnd,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Synthesizer {
    config: SynthConfig,
    position: u64,
    level_sync: f64,
    level_blank: f64,
    level_luma: f64,
    burst_amplitude: f64,
    line_length: usize,
}

impl Synthesizer {
    pub fn new(config: SynthConfig) -> Self {
        let level_blank = f64::from(ire_to_sample(BLANKING_IRE));
        Self {
            level_sync: f64::from(ire_to_sample(SYNC_TIP_IRE)),
            level_blank,
            level_luma: f64::from(ire_to_sample(config.luma_ire)),
            burst_amplitude: f64::from(ire_to_sample(config.burst_ire)) - level_blank,
            line_length: 2 * SLOT_LENGTH,
            config,
            position: 0,
        }
    }

    /// Number of samples generated so far.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Changes the luminance of active video from here on.
    pub fn set_luma_ire(&mut self, ire: f64) {
        self.config.luma_ire = ire;
        self.level_luma = f64::from(ire_to_sample(ire));
    }

    /// Generates `count` ordinary lines.
    pub fn lines(&mut self, count: usize, output: &mut Vec<u16>) {
        for _ in 0..count {
            self.slot(
                Slot::LineStart {
                    length: 2 * SLOT_LENGTH,
                },
                output,
            );
            self.slot(Slot::LineEnd, output);
        }
    }

    /// Generates one complete frame, starting with the vertical interval of the
    /// first field.
    pub fn frame(&mut self, output: &mut Vec<u16>) {
        self.frame_slots(0..FRAME_SLOTS, output);
    }

    /// Generates the half-line slots `slots` of a frame.
    pub fn frame_slots(&mut self, slots: Range<usize>, output: &mut Vec<u16>) {
        assert!(slots.end <= FRAME_SLOTS);
        for slot in slots {
            self.slot(Slot::at(slot), output);
        }
    }

    /// Raw audio matching the first `frames` audio frames of the capture.
    pub fn audio(&self, frames: usize) -> Vec<RawAudioFrame> {
        let audio_rate = SAMPLE_RATE / AUDIO_RATIO;
        (0..frames)
            .map(|i| {
                let tone = self.config.tone_amplitude
                    * (TAU * self.config.tone_frequency * i as f64 / audio_rate).sin();
                RawAudioFrame {
                    left: (LEFT.center + tone) as f32,
                    right: (RIGHT.center + tone) as f32,
                }
            })
            .collect()
    }

    fn slot(&mut self, slot: Slot, output: &mut Vec<u16>) {
        output.reserve(SLOT_LENGTH);

        if let Slot::LineStart { length } = slot {
            self.line_length = length;
        }

        for offset in 0..SLOT_LENGTH {
            let level = match slot {
                Slot::Equalizing => self.pulse(offset, EQUALIZING_WIDTH),
                Slot::Broad => self.pulse(offset, BROAD_WIDTH),
                Slot::Blank => self.level_blank,
                Slot::LineStart { .. } => self.line(offset),
                Slot::LineEnd => self.line(offset + SLOT_LENGTH),
            };
            output.push(level.round().clamp(0.0, 65535.0) as u16);
            self.position += 1;
        }
    }

    fn pulse(&self, offset: usize, width: usize) -> f64 {
        if offset < width {
            self.level_sync
        }
        else {
            self.level_blank
        }
    }

    fn line(&self, offset: usize) -> f64 {
        if offset < HSYNC_WIDTH {
            self.level_sync
        }
        else if (BURST_START..BURST_END).contains(&offset) {
            let phase = TAU * self.position as f64 / IN_FREQ as f64 + self.config.burst_phase;
            self.level_blank + self.burst_amplitude * phase.sin()
        }
        else if (ACTIVE_START..self.line_length - FRONT_PORCH).contains(&offset) {
            self.level_luma
        }
        else {
            self.level_blank
        }
    }
}
