use crate::{
    IN_FREQ,
    INPUT_LINE_LENGTH,
    level::{
        BLACK_IRE,
        ire_to_sample,
    },
    util::in_range,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("the phase lock needs at least one pass")]
    NoPhaseLockPasses,

    #[error("half line range {min}..{max} is empty")]
    EmptyHalfLineRange { min: f64, max: f64 },

    #[error("equalizing pulse maximum {equalizing} must be below the hsync pulse maximum {hsync}")]
    PulseOrder { equalizing: usize, hsync: usize },

    #[error("sync threshold {threshold} is not below the black level {black}")]
    ThresholdAboveBlack { threshold: f64, black: f64 },
}

/// Thresholds of the line and field synchronizer.
///
/// Lengths are in input samples, pulse lengths count samples below the
/// threshold.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SyncConfig {
    /// Sync-filtered level below which a pulse starts.
    pub threshold: f64,

    /// Runs this short or shorter are noise.
    pub min_pulse_length: usize,

    pub half_line_min: f64,
    pub half_line_max: f64,

    /// Intervals longer than this are full lines.
    pub full_line_min: f64,

    /// Minimum interval ending in a field start.
    pub field_start_min: f64,

    /// Equalizing pulses are shorter than this, hsync pulses longer.
    pub equalizing_pulse_max: usize,
    pub hsync_pulse_max: usize,

    /// Shortest decodable line as a fraction of a nominal line.
    pub decode_line_ratio: f64,

    /// Shortest pulse that terminates a decodable line.
    pub decode_pulse_min: usize,

    /// A field start is only accepted past this line.
    pub field_end_line: f64,

    /// Line the synchronizer jumps to on a half line while seeking a field.
    pub vsync_entry_line: f64,

    /// Line that keeps the color phase target of the line before it.
    pub phase_hold_line: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let half_line = INPUT_LINE_LENGTH / 2.0;
        Self {
            threshold: 5000.0,
            min_pulse_length: 5 * IN_FREQ,
            half_line_min: half_line - 60.0,
            half_line_max: half_line + 40.0,
            full_line_min: INPUT_LINE_LENGTH - 40.0,
            field_start_min: INPUT_LINE_LENGTH - 20.0,
            equalizing_pulse_max: 10 * IN_FREQ,
            hsync_pulse_max: 20 * IN_FREQ,
            decode_line_ratio: 0.9,
            decode_pulse_min: 11 * IN_FREQ,
            field_end_line: 520.0,
            vsync_entry_line: 262.5,
            phase_hold_line: 272.0,
        }
    }
}

impl SyncConfig {
    #[inline]
    pub fn is_half_line(&self, length: f64) -> bool {
        in_range(length, self.half_line_min, self.half_line_max)
    }

    #[inline]
    pub fn is_full_line(&self, length: f64) -> bool {
        length > self.full_line_min
    }

    #[inline]
    pub fn is_hsync_pulse(&self, count: usize) -> bool {
        in_range(count, self.equalizing_pulse_max, self.hsync_pulse_max)
    }

    #[inline]
    pub fn is_decodable(&self, length: f64, count: usize) -> bool {
        length >= self.decode_line_ratio * INPUT_LINE_LENGTH && count > self.decode_pulse_min
    }

    #[inline]
    pub fn is_field_start(&self, length: f64, count: usize) -> bool {
        length > self.field_start_min && count < self.equalizing_pulse_max
    }

    #[inline]
    pub fn is_first_edge(&self, length: f64, count: usize) -> bool {
        self.is_full_line(length) && count > self.equalizing_pulse_max
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.half_line_min >= self.half_line_max {
            return Err(ConfigError::EmptyHalfLineRange {
                min: self.half_line_min,
                max: self.half_line_max,
            });
        }
        if self.equalizing_pulse_max >= self.hsync_pulse_max {
            return Err(ConfigError::PulseOrder {
                equalizing: self.equalizing_pulse_max,
                hsync: self.hsync_pulse_max,
            });
        }
        let black = f64::from(ire_to_sample(BLACK_IRE));
        if self.threshold >= black {
            return Err(ConfigError::ThresholdAboveBlack {
                threshold: self.threshold,
                black,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DecoderConfig {
    pub sync: SyncConfig,

    /// Decode only the audio. Frames are not emitted.
    pub audio_only: bool,

    /// Resample passes per line. See [`PhaseLock`](crate::phase_lock::PhaseLock).
    pub phase_lock_passes: usize,

    /// Input samples before the last pulse that are carried over to the next
    /// pass.
    pub lookbehind: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            audio_only: false,
            phase_lock_passes: 3,
            lookbehind: 700,
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phase_lock_passes == 0 {
            return Err(ConfigError::NoPhaseLockPasses);
        }
        self.sync.validate()
    }
}
