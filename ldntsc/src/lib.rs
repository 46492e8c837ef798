//! Laserdisc NTSC composite decoder.
//!
//! Turns a raw capture of the composite video signal (sampled at 8 times the
//! color subcarrier frequency) into interlaced, burst-phase corrected frames
//! sampled at 4 times the subcarrier frequency, plus a stereo audio stream
//! that is kept in lockstep with the video timing.
//!
//! The decoder locks onto the signal by itself: it finds the horizontal sync
//! pulses, counts lines through the vertical interval, and refines every line
//! against its color burst before writing it into the [`Frame`].
//!
//! # References
//!
//! - <https://www.ntsc-tv.com/ntsc-index-02.htm>
//! - SMPTE 170M, Composite Analog Video Signal, NTSC for Studio Applications

use std::f64::consts::TAU;

pub mod audio;
pub mod burst;
pub mod config;
pub mod decoder;
pub mod driver;
pub mod filter;
pub mod frame;
pub mod io;
pub mod level;
pub mod phase_lock;
pub mod resample;
pub mod sink;
pub mod sync;
pub mod synth;
mod util;

pub use crate::{
    config::{
        DecoderConfig,
        SyncConfig,
    },
    decoder::{
        DecodeStats,
        Decoder,
    },
    driver::{
        DriveError,
        Driver,
    },
    frame::Frame,
};

/// NTSC color subcarrier frequency in Hz.
pub const SUBCARRIER_FREQUENCY: f64 = 315.0e6 / 88.0;

/// Samples per subcarrier cycle of the captured input.
pub const IN_FREQ: usize = 8;

/// Samples per subcarrier cycle of the decoded output.
pub const OUT_FREQ: usize = 4;

/// Sample rate of the captured input.
pub const SAMPLE_RATE: f64 = SUBCARRIER_FREQUENCY * IN_FREQ as f64;

/// Duration of one line in microseconds.
pub const LINE_DURATION: f64 = 63.5;

/// Duration of horizontal blanking in microseconds.
pub const BLANKING_DURATION: f64 = 9.2;

pub const CYCLES_PER_LINE: f64 = 227.5;

pub const INPUT_LINE_LENGTH: f64 = CYCLES_PER_LINE * IN_FREQ as f64;
pub const OUTPUT_LINE_LENGTH: f64 = CYCLES_PER_LINE * OUT_FREQ as f64;

/// Stretch applied to a line window so it also contains the color burst of the
/// following line.
pub const WINDOW_STRETCH: f64 = (LINE_DURATION + BLANKING_DURATION) / LINE_DURATION;

/// Nominal window length in input samples (one line plus the next blanking).
pub const INPUT_WINDOW_LENGTH: f64 =
    INPUT_LINE_LENGTH + INPUT_LINE_LENGTH * (BLANKING_DURATION / LINE_DURATION);

/// Window length in output samples.
pub const OUTPUT_WINDOW_LENGTH: f64 =
    OUTPUT_LINE_LENGTH + OUTPUT_LINE_LENGTH * (BLANKING_DURATION / LINE_DURATION);

/// Converts a subcarrier phase difference in radians to input samples.
pub const SAMPLES_PER_RADIAN: f64 = IN_FREQ as f64 / TAU;

/// Subcarrier oversampling of a signal handed to the color filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Oversampling {
    Fsc4,
    Fsc8,
}

impl Oversampling {
    #[inline]
    pub fn samples_per_cycle(self) -> usize {
        match self {
            Oversampling::Fsc4 => 4,
            Oversampling::Fsc8 => 8,
        }
    }
}
