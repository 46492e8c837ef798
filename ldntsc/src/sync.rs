//! Line and field synchronization.
//!
//! [`PulseDetector`] finds sync pulses in the low-passed input. The interval
//! between two consecutive pulses, together with the length of the pulse that
//! ends it, drives the [`SyncState`] machine: ordinary lines are about 1820
//! samples apart and end in a long hsync pulse, while the vertical interval
//! consists of short equalizing and long broad pulses half a line apart.

use crate::{
    config::SyncConfig,
    filter::{
        FirFilter,
        Reset,
        Scanner,
        design::sync_lowpass,
    },
    level::{
        BLACK_IRE,
        ire_to_sample,
    },
};

/// A sync pulse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pulse {
    /// Interpolated position of the falling threshold crossing, relative to
    /// the last reset.
    pub crosspoint: f64,

    /// Number of samples below the threshold.
    pub length: usize,
}

#[derive(Clone, Debug)]
pub struct PulseDetector {
    filter: FirFilter<f64, f64>,
    threshold: f64,
    min_length: usize,
    filtered: f64,
    position: usize,
    start: f64,
    length: usize,
}

impl PulseDetector {
    pub fn new(config: &SyncConfig) -> Self {
        let mut this = Self {
            filter: sync_lowpass(),
            threshold: config.threshold,
            min_length: config.min_pulse_length,
            filtered: 0.0,
            position: 0,
            start: 0.0,
            length: 0,
        };
        this.reset(f64::from(ire_to_sample(BLACK_IRE)));
        this
    }

    /// Number of samples scanned since the last reset.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Reset<f64> for PulseDetector {
    /// Starts a new pass at position 0 with the filter settled on `level`.
    fn reset(&mut self, level: f64) {
        self.filter.reset(level);
        self.filtered = level;
        self.position = 0;
        self.start = 0.0;
        self.length = 0;
    }
}

impl Scanner<u16> for PulseDetector {
    type Output = Option<Pulse>;

    /// Returns the pulse that ended with `sample`.
    fn scan(&mut self, sample: u16) -> Self::Output {
        let previous = self.filtered;
        self.filtered = self.filter.scan(f64::from(sample));
        let position = self.position;
        self.position += 1;

        if self.filtered < self.threshold {
            if self.length == 0 {
                let fraction = (previous - self.threshold) / (previous - self.filtered);
                self.start = (position as f64 - 1.0) + fraction;
            }
            self.length += 1;
            None
        }
        else {
            let length = std::mem::take(&mut self.length);
            (length > self.min_length).then_some(Pulse {
                crosspoint: self.start,
                length,
            })
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SyncState {
    #[default]
    SeekingFirstEdge,
    SeekingFieldStart,
    Locked {
        /// Fractional line position within the frame.
        line: f64,
    },
}

/// The effect of one classified interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transition {
    /// The interval is a line at `line` that should be decoded.
    Line { line: f64 },

    /// Entered the vertical interval while seeking a field.
    FieldEntered,

    /// A new frame starts. `emit` is set if the previous one is complete.
    FieldStart { emit: bool },

    /// Found the first line edge.
    FirstEdge,

    HalfLine,
    FullLine,

    /// The interval did not match any rule.
    Rejected,
}

impl SyncState {
    #[inline]
    pub fn line(&self) -> Option<f64> {
        match self {
            SyncState::Locked { line } => Some(*line),
            _ => None,
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        matches!(self, SyncState::Locked { .. })
    }

    /// Restarts the line count at the start of a frame.
    #[inline]
    pub fn reset_for_new_field(&mut self) {
        *self = SyncState::Locked { line: 1.0 };
    }

    /// Classifies the interval of `length` samples ending in a pulse of
    /// `count` samples. Rules are tried in order, the first match wins.
    pub fn advance(&mut self, config: &SyncConfig, length: f64, count: usize) -> Transition {
        match *self {
            SyncState::Locked { line } if config.is_decodable(length, count) => {
                *self = SyncState::Locked { line: line + 1.0 };
                Transition::Line { line }
            }
            SyncState::SeekingFieldStart
                if config.is_half_line(length) && config.is_hsync_pulse(count) =>
            {
                *self = SyncState::Locked {
                    line: config.vsync_entry_line,
                };
                Transition::FieldEntered
            }
            SyncState::SeekingFieldStart if config.is_field_start(length, count) => {
                self.reset_for_new_field();
                Transition::FieldStart { emit: false }
            }
            SyncState::Locked { line }
                if line > config.field_end_line && config.is_field_start(length, count) =>
            {
                self.reset_for_new_field();
                Transition::FieldStart { emit: true }
            }
            SyncState::SeekingFirstEdge if config.is_first_edge(length, count) => {
                *self = SyncState::SeekingFieldStart;
                Transition::FirstEdge
            }
            SyncState::Locked { line } if config.is_half_line(length) => {
                *self = SyncState::Locked { line: line + 0.5 };
                Transition::HalfLine
            }
            SyncState::Locked { line } if config.is_full_line(length) => {
                *self = SyncState::Locked { line: line + 1.0 };
                Transition::FullLine
            }
            _ => Transition::Rejected,
        }
    }
}
