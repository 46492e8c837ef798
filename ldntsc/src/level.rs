//! Mapping between IRE units, 16-bit samples and FM carrier frequency.
//!
//! Sample value `0` is reserved to mark an absent signal, `1` is the sync tip
//! (-40 IRE) and `65535` is 120 IRE.

const IRE_SPAN: f64 = 160.0;
const SAMPLE_SPAN: f64 = 65534.0;

pub const SYNC_TIP_IRE: f64 = -40.0;
pub const BLANKING_IRE: f64 = 0.0;
pub const BLACK_IRE: f64 = 7.5;

/// Reported for sample value `0`.
pub const ABSENT_IRE: f64 = -100.0;

/// Sample value of 100 IRE used by the velocity compensation.
pub const WHITE_LEVEL: f64 = 57344.0;

/// FM carrier frequency of the sync tip, in Hz.
pub const CARRIER_BASE: f64 = 7_600_000.0;

/// FM carrier deviation from sync tip to 100 IRE, in Hz.
pub const CARRIER_DEVIATION: f64 = 1_700_000.0;

#[inline]
pub fn ire_to_sample(ire: f64) -> u16 {
    if ire <= -60.0 {
        0
    }
    else if ire <= SYNC_TIP_IRE {
        1
    }
    else if ire >= 120.0 {
        65535
    }
    else {
        ((ire - SYNC_TIP_IRE) / IRE_SPAN * SAMPLE_SPAN) as u16 + 1
    }
}

#[inline]
pub fn sample_to_ire(sample: u16) -> f64 {
    if sample == 0 {
        ABSENT_IRE
    }
    else {
        SYNC_TIP_IRE + (f64::from(sample) - 1.0) * IRE_SPAN / SAMPLE_SPAN
    }
}

/// Size of one sample step in IRE.
#[inline]
pub fn quantization_step() -> f64 {
    IRE_SPAN / SAMPLE_SPAN
}

#[inline]
pub fn sample_to_carrier(sample: f64) -> f64 {
    sample / WHITE_LEVEL * CARRIER_DEVIATION + CARRIER_BASE
}

#[inline]
pub fn carrier_to_sample(frequency: f64) -> f64 {
    (frequency - CARRIER_BASE) / CARRIER_DEVIATION * WHITE_LEVEL
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn round_trip_is_within_one_step() {
        let mut ire = -39.99;
        while ire < 119.99 {
            let recovered = sample_to_ire(ire_to_sample(ire));
            assert!(
                (recovered - ire).abs() <= quantization_step(),
                "{ire} came back as {recovered}"
            );
            ire += 0.37;
        }
    }

    #[test]
    fn saturates_at_both_ends() {
        assert_eq!(ire_to_sample(-60.0), 0);
        assert_eq!(ire_to_sample(-90.0), 0);
        assert_eq!(sample_to_ire(ire_to_sample(-75.0)), ABSENT_IRE);
        assert_eq!(ire_to_sample(-50.0), 1);
        assert_eq!(ire_to_sample(-40.0), 1);
        assert_eq!(ire_to_sample(120.0), 65535);
        assert_eq!(ire_to_sample(150.0), 65535);
    }

    #[test]
    fn reference_levels() {
        assert_eq!(ire_to_sample(BLANKING_IRE), 16384);
        assert_eq!(ire_to_sample(100.0), 57343);
        assert_abs_diff_eq!(sample_to_ire(1), SYNC_TIP_IRE);
        assert_abs_diff_eq!(sample_to_ire(65535), 120.0);
    }

    #[test]
    fn carrier_conversion_is_inverse() {
        for sample in [0.0, 3000.0, 16384.0, 57344.0] {
            assert_abs_diff_eq!(
                carrier_to_sample(sample_to_carrier(sample)),
                sample,
                epsilon = 1e-6
            );
        }
        assert_abs_diff_eq!(sample_to_carrier(WHITE_LEVEL), 9_300_000.0);
    }
}
