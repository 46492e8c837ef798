//! Cubic resampling of a fractional input window to a fixed output length.

/// Catmull-Rom interpolation between `p[1]` and `p[2]` at `x` in `[0, 1)`.
#[inline]
pub fn cubic_interpolate(p: [f64; 4], x: f64) -> f64 {
    p[1] + 0.5
        * x
        * (p[2] - p[0]
            + x * (2.0 * p[0] - 5.0 * p[1] + 4.0 * p[2] - p[3]
                + x * (3.0 * (p[1] - p[2]) + p[3] - p[0])))
}

/// Resamples `input[start..end]` into `output`.
///
/// `output` is cleared and receives one sample for every integer below
/// `target_length`, each clamped to the 16-bit sample range. Positions past the
/// edges of `input` reuse the outermost interpolation kernel.
///
/// # Panics
///
/// Panics if `input` has fewer than 4 samples.
pub fn resample(input: &[u16], start: f64, end: f64, target_length: f64, output: &mut Vec<f64>) {
    assert!(input.len() >= 4, "resampling needs at least 4 input samples");

    let step = (end - start) / target_length;
    let last_index = input.len() - 3;

    output.clear();

    let mut position = start;
    let mut i = 0;
    while (i as f64) < target_length {
        let index = (position.max(0.0) as usize).clamp(1, last_index);
        let kernel = [
            f64::from(input[index - 1]),
            f64::from(input[index]),
            f64::from(input[index + 1]),
            f64::from(input[index + 2]),
        ];
        let value = cubic_interpolate(kernel, position - index as f64);
        output.push(value.clamp(0.0, 65535.0));

        position += step;
        i += 1;
    }
}
