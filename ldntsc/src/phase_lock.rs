//! Locks a line window onto its color burst and compensates playback speed.
//!
//! The window of every line is resampled a few times. The first pass shifts
//! the whole window so the line's own burst lands on the target phase. The
//! following passes stretch the end of the window until the burst of the next
//! line has the same phase, which makes the window exactly one line long in
//! subcarrier cycles. The remaining length error reveals the playback speed,
//! which the FM-encoded luminance has to be corrected for.

use std::f64::consts::{
    FRAC_PI_4,
    PI,
};

use crate::{
    INPUT_WINDOW_LENGTH,
    OUT_FREQ,
    OUTPUT_WINDOW_LENGTH,
    Oversampling,
    SAMPLES_PER_RADIAN,
    burst::{
        BurstDetector,
        BurstMeasurement,
        SECOND_BURST_CYCLES,
    },
    frame::{
        FRAME_WIDTH,
        Frame,
    },
    level::{
        carrier_to_sample,
        sample_to_carrier,
    },
    resample::resample,
    util::wrap_angle,
};

/// First output sample of active video in the line window.
pub const ACTIVE_START: usize = 14 * OUT_FREQ;

/// Corrected samples below this are treated as a dropout.
pub const DROPOUT_LEVEL: f64 = 3000.0;

/// Columns at the start of a row that never start a dropout.
pub const DROPOUT_GUARD: usize = 16;

/// Columns concealed after the most recent dropout sample.
pub const DROPOUT_SPAN: usize = 16;

/// Default line that keeps the target phase of the line before it.
pub const PHASE_HOLD_LINE: f64 = 272.0;

/// Gain of the luminance velocity correction. Laserdisc FM needs the full
/// correction.
const VELOCITY_GAIN: f64 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorPhase {
    #[default]
    Zero,
    Inverted,
}

impl ColorPhase {
    /// Target burst phase in radians.
    #[inline]
    pub fn radians(self) -> f64 {
        match self {
            ColorPhase::Zero => 0.0,
            ColorPhase::Inverted => -PI,
        }
    }

    /// Value written to column 0 of the row.
    #[inline]
    pub fn flag(self) -> u16 {
        match self {
            ColorPhase::Zero => 16384,
            ColorPhase::Inverted => 32768,
        }
    }

    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            ColorPhase::Zero => ColorPhase::Inverted,
            ColorPhase::Inverted => ColorPhase::Zero,
        }
    }
}

/// Burst phase every decoded line is locked to.
///
/// NTSC inverts the subcarrier on consecutive lines, so the target flips on every
/// line once it is known.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseTarget {
    phase: Option<ColorPhase>,
    hold_line: f64,
}

impl Default for PhaseTarget {
    fn default() -> Self {
        Self::new(PHASE_HOLD_LINE)
    }
}

impl PhaseTarget {
    /// Creates a target that is not flipped on line `hold_line`.
    pub fn new(hold_line: f64) -> Self {
        Self {
            phase: None,
            hold_line,
        }
    }

    #[inline]
    pub fn phase(&self) -> Option<ColorPhase> {
        self.phase
    }

    /// Advances the target to the line at `line`, given the measurement of its
    /// own burst.
    pub fn advance(&mut self, burst: &BurstMeasurement, line: f64) -> Option<ColorPhase> {
        match self.phase {
            None if burst.is_present() => {
                let initial = if burst.phase < 0.0 && burst.phase > -3.0 * FRAC_PI_4 {
                    ColorPhase::Zero
                }
                else {
                    ColorPhase::Inverted
                };
                tracing::info!(?initial, phase = burst.phase, "color phase acquired");
                self.phase = Some(initial);
            }
            None => {}
            Some(phase) => {
                if line.floor() != self.hold_line {
                    self.phase = Some(phase.flipped());
                }
            }
        }
        self.phase
    }
}

/// A line window after locking.
#[derive(Debug)]
pub struct LockedLine<'a> {
    /// The resampled window at 4x subcarrier.
    pub samples: &'a [f64],
    pub begin: f64,
    pub end: f64,
    pub first: BurstMeasurement,
    pub second: BurstMeasurement,
}

impl LockedLine<'_> {
    /// Ratio of the locked window length to the nominal window length.
    #[inline]
    pub fn velocity_scale(&self) -> f64 {
        ((self.end - self.begin) / INPUT_WINDOW_LENGTH - 1.0) * VELOCITY_GAIN + 1.0
    }
}

#[derive(Debug)]
pub struct PhaseLock {
    detector: BurstDetector,
    passes: usize,
    samples: Vec<f64>,
}

impl PhaseLock {
    pub fn new(passes: usize) -> Self {
        assert!(passes > 0, "phase lock needs at least one pass");
        Self {
            detector: BurstDetector::new(Oversampling::Fsc4),
            passes,
            samples: Vec::with_capacity(OUTPUT_WINDOW_LENGTH.ceil() as usize),
        }
    }

    /// Locks the window `[begin, end)` of `input` for the line at `line`.
    pub fn lock(
        &mut self,
        input: &[u16],
        mut begin: f64,
        mut end: f64,
        target: &mut PhaseTarget,
        line: f64,
    ) -> LockedLine<'_> {
        let mut first = BurstMeasurement::default();
        let mut second = BurstMeasurement::default();

        for pass in 0..self.passes {
            resample(input, begin, end, OUTPUT_WINDOW_LENGTH, &mut self.samples);
            first = self.detector.detect(&self.samples, 0.0);
            second = self.detector.detect(&self.samples, SECOND_BURST_CYCLES);

            tracing::debug!(
                line,
                pass,
                length = (end - begin) / OUTPUT_WINDOW_LENGTH * 1820.0,
                level = first.level,
                phase = first.phase,
                next_phase = second.phase,
            );

            if pass == 0 {
                target.advance(&first, line);
            }
            if pass + 1 == self.passes {
                break;
            }

            if pass == 0 {
                if let (Some(phase), true) = (target.phase(), first.is_present()) {
                    let shift = wrap_angle(first.phase, phase.radians()) * SAMPLES_PER_RADIAN;
                    begin += shift;
                    end += shift;
                }
            }
            else if first.is_present() && second.is_present() {
                end += wrap_angle(second.phase, first.phase) * SAMPLES_PER_RADIAN;
            }
        }

        LockedLine {
            samples: &self.samples,
            begin,
            end,
            first,
            second,
        }
    }
}

/// Corrects a resampled sample for playback speed `scale`.
#[inline]
pub fn compensate_velocity(sample: f64, scale: f64) -> f64 {
    carrier_to_sample(sample_to_carrier(sample) * scale)
}

/// Writes the active part of `samples` into `row`, rescaled by `scale` and with
/// dropouts concealed from the row two above.
pub fn write_row(frame: &mut Frame, row: usize, samples: &[f64], scale: f64) {
    let mut dropout = None;

    for column in 0..FRAME_WIDTH {
        let sample = samples.get(column + ACTIVE_START).copied().unwrap_or(0.0);
        let mut value = compensate_velocity(sample, scale);

        if value < DROPOUT_LEVEL && column > DROPOUT_GUARD {
            dropout = Some(column);
        }

        let concealed = dropout.is_some_and(|start| column - start < DROPOUT_SPAN);
        if concealed && row >= 2 {
            value = f64::from(frame.get(row - 2, column));
        }

        frame.row_mut(row)[column] = value.clamp(0.0, 65535.0) as u16;
    }
}
