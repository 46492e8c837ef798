//! Color burst level and phase measurement.

use std::f64::consts::TAU;

use num_complex::Complex;

use crate::{
    Oversampling,
    filter::{
        FirFilter,
        Reset,
        Scanner,
        design::{
            burst_lowpass,
            color_bandpass,
        },
    },
};

/// Cycles from the search origin until the filters have settled.
pub const SETTLE_CYCLES: usize = 14;

/// End of the search region in cycles from the search origin.
pub const SEARCH_CYCLES: usize = 25;

/// Samples past the origin that are never picked as the peak.
pub const ORIGIN_GUARD: usize = 16;

/// Levels at or above this are treated as a non-burst transient.
pub const MAX_LEVEL: f64 = 10000.0;

/// Origin of the second burst in the line window, in cycles.
pub const SECOND_BURST_CYCLES: f64 = 228.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BurstMeasurement {
    /// Peak magnitude of the burst. Zero means no burst was found.
    pub level: f64,

    /// Phase at the peak, in `(-pi, pi]`.
    pub phase: f64,
}

impl BurstMeasurement {
    #[inline]
    pub fn is_present(&self) -> bool {
        self.level > 0.0
    }
}

#[derive(Clone, Debug)]
pub struct BurstDetector {
    bandpass: FirFilter<f64, f64>,
    lowpass_i: FirFilter<f64, f64>,
    lowpass_q: FirFilter<f64, f64>,
    reference: Vec<Complex<f64>>,
}

impl BurstDetector {
    pub fn new(oversampling: Oversampling) -> Self {
        let samples_per_cycle = oversampling.samples_per_cycle();
        let reference = (0..samples_per_cycle)
            .map(|e| Complex::from_polar(1.0, TAU * e as f64 / samples_per_cycle as f64))
            .collect();

        Self {
            bandpass: color_bandpass(oversampling),
            lowpass_i: burst_lowpass(oversampling),
            lowpass_q: burst_lowpass(oversampling),
            reference,
        }
    }

    #[inline]
    pub fn samples_per_cycle(&self) -> usize {
        self.reference.len()
    }

    /// Measures the burst whose search region starts `origin` cycles into
    /// `line`.
    ///
    /// A search region that runs past the end of `line` is cut short.
    pub fn detect(&mut self, line: &[f64], origin: f64) -> BurstMeasurement {
        let samples_per_cycle = self.samples_per_cycle();
        let origin = (origin * samples_per_cycle as f64) as usize;
        let start = origin + SETTLE_CYCLES * samples_per_cycle;
        let end = (origin + SEARCH_CYCLES * samples_per_cycle).min(line.len());

        let mut peak = BurstMeasurement::default();
        if start >= end {
            return peak;
        }

        self.bandpass.reset(line[start]);
        self.lowpass_i.reset(0.0);
        self.lowpass_q.reset(0.0);

        for (l, sample) in line.iter().enumerate().take(end).skip(start) {
            let v = self.bandpass.scan(*sample);
            let reference = self.reference[l % samples_per_cycle];

            let q = self.lowpass_q.scan(v * reference.re);
            let i = self.lowpass_i.scan(-v * reference.im);
            let iq = Complex::new(q, i);
            let level = iq.norm();

            if l - origin > ORIGIN_GUARD && level > peak.level && level < MAX_LEVEL {
                peak = BurstMeasurement {
                    level,
                    phase: iq.arg(),
                };
            }
        }

        peak
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{
        FRAC_PI_2,
        PI,
        TAU,
    };

    use approx::assert_abs_diff_eq;

    use super::*;

    fn line_with_burst(phase: f64, amplitude: f64, origin: usize, length: usize) -> Vec<f64> {
        (0..length)
            .map(|n| {
                let in_burst = n >= origin + 60 && n < origin + 110;
                let burst = if in_burst {
                    amplitude * (TAU * n as f64 / 4.0 + phase).sin()
                }
                else {
                    0.0
                };
                16384.0 + burst
            })
            .collect()
    }

    #[test]
    fn measures_level_and_phase() {
        let mut detector = BurstDetector::new(Oversampling::Fsc4);
        let mut previous = None;
        for phase in [0.0, 0.5, FRAC_PI_2, 2.0, -2.5] {
            let line = line_with_burst(phase, 4000.0, 0, 1042);
            let measurement = detector.detect(&line, 0.0);
            assert!(measurement.is_present());
            assert_abs_diff_eq!(measurement.level, 2000.0, epsilon = 20.0);

            // the measured phase follows the burst phase, up to a fixed offset
            if let Some((previous_phase, previous_measured)) = previous {
                let expected = crate::util::wrap_angle(previous_phase, phase);
                let measured = crate::util::wrap_angle(previous_measured, measurement.phase);
                assert_abs_diff_eq!(measured, expected, epsilon = 0.02);
            }
            previous = Some((phase, measurement.phase));
        }
    }

    #[test]
    fn inverted_burst_flips_the_phase() {
        let mut detector = BurstDetector::new(Oversampling::Fsc4);
        let a = detector.detect(&line_with_burst(0.3, 4000.0, 0, 1042), 0.0);
        let b = detector.detect(&line_with_burst(0.3 + PI, 4000.0, 0, 1042), 0.0);
        assert_abs_diff_eq!(crate::util::wrap_angle(a.phase, b.phase).abs(), PI, epsilon = 0.02);
    }

    #[test]
    fn second_burst_is_searched_at_its_origin() {
        let mut detector = BurstDetector::new(Oversampling::Fsc4);
        let line = line_with_burst(1.0, 4000.0, 912, 1042);
        assert!(detector.detect(&line, 0.0).level < 1.0);
        let second = detector.detect(&line, SECOND_BURST_CYCLES);
        assert_abs_diff_eq!(second.level, 2000.0, epsilon = 20.0);
    }

    #[test]
    fn flat_lines_have_no_burst() {
        let mut detector = BurstDetector::new(Oversampling::Fsc4);
        let flat = vec![30000.0; 1042];
        assert!(detector.detect(&flat, 0.0).level < 1.0);

        let overdriven = line_with_burst(0.0, 40000.0, 0, 1042);
        assert!(detector.detect(&overdriven, 0.0).level < MAX_LEVEL);
    }

    #[test]
    fn truncated_search_region() {
        let mut detector = BurstDetector::new(Oversampling::Fsc4);
        let line = vec![16384.0; 40];
        assert_eq!(detector.detect(&line, 0.0), BurstMeasurement::default());
    }
}
