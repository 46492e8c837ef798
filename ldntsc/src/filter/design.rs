//! Windowed FIR designs used by the decoder.
//!
//! Frequencies are normalized to the sample rate, i.e. `0.5` is Nyquist.

use std::f64::consts::{
    PI,
    TAU,
};

use num_complex::Complex;

use crate::{
    Oversampling,
    filter::fir::{
        FirFilter,
        hann_window,
    },
};

/// Hann-windowed sinc low-pass with unity DC gain.
pub fn lowpass(cutoff: f64, num_taps: usize) -> Vec<f64> {
    assert!(num_taps % 2 == 1, "filter length must be odd");
    assert!(cutoff > 0.0 && cutoff < 0.5);

    let center = (num_taps / 2) as f64;
    let mut coefficients = hann_window::<f64>(num_taps - 1)
        .enumerate()
        .map(|(i, window)| {
            let n = i as f64 - center;
            let sinc = if n == 0.0 {
                2.0 * cutoff
            }
            else {
                (TAU * cutoff * n).sin() / (PI * n)
            };
            window * sinc
        })
        .collect::<Vec<_>>();

    let gain = coefficients.iter().sum::<f64>();
    coefficients.iter_mut().for_each(|c| *c /= gain);
    coefficients
}

/// Hann-windowed cosine band-pass with unity gain at `center_frequency`.
pub fn bandpass(center_frequency: f64, num_taps: usize) -> Vec<f64> {
    assert!(num_taps % 2 == 1, "filter length must be odd");

    let center = (num_taps / 2) as f64;
    let mut coefficients = hann_window::<f64>(num_taps - 1)
        .enumerate()
        .map(|(i, window)| window * (TAU * center_frequency * (i as f64 - center)).cos())
        .collect::<Vec<_>>();

    let gain = frequency_response(&coefficients, center_frequency).norm();
    coefficients.iter_mut().for_each(|c| *c /= gain);
    coefficients
}

pub fn frequency_response(coefficients: &[f64], frequency: f64) -> Complex<f64> {
    coefficients
        .iter()
        .enumerate()
        .map(|(n, c)| *c * Complex::from_polar(1.0, -TAU * frequency * n as f64))
        .sum()
}

/// Smooths the input before the sync threshold is applied.
pub fn sync_lowpass() -> FirFilter<f64, f64> {
    FirFilter::new(lowpass(0.05, 17))
}

/// Smooths the mixed-down burst into in-phase and quadrature levels.
pub fn burst_lowpass(oversampling: Oversampling) -> FirFilter<f64, f64> {
    match oversampling {
        Oversampling::Fsc4 => FirFilter::new(lowpass(0.1, 9)),
        Oversampling::Fsc8 => sync_lowpass(),
    }
}

/// Isolates the color subcarrier.
pub fn color_bandpass(oversampling: Oversampling) -> FirFilter<f64, f64> {
    let samples_per_cycle = oversampling.samples_per_cycle();
    FirFilter::new(bandpass(
        1.0 / samples_per_cycle as f64,
        2 * samples_per_cycle + 1,
    ))
}
