use std::f64::consts::{
    PI,
    TAU,
};

#[inline(always)]
pub fn lerp(t: f64, a: f64, b: f64) -> f64 {
    (1.0 - t) * a + t * b
}

/// Exclusive range check.
#[inline(always)]
pub fn in_range<T: PartialOrd>(value: T, low: T, high: T) -> bool {
    value > low && value < high
}

/// Angle from `from` to `to`, wrapped into `(-pi, pi]`.
#[inline]
pub fn wrap_angle(from: f64, to: f64) -> f64 {
    let mut angle = to - from;
    if angle > PI {
        angle -= TAU;
    }
    else if angle <= -PI {
        angle += TAU;
    }
    angle
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_abs_diff_eq;

    use super::{
        in_range,
        wrap_angle,
    };

    #[test]
    fn wrap_angle_stays_in_half_open_interval() {
        assert_abs_diff_eq!(wrap_angle(0.0, PI), PI);
        assert_abs_diff_eq!(wrap_angle(PI, 0.0), PI);
        assert_abs_diff_eq!(wrap_angle(-3.0, 3.0), 6.0 - 2.0 * PI, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(0.5, -PI), -PI - 0.5 + 2.0 * PI, epsilon = 1e-12);
    }

    #[test]
    fn in_range_excludes_bounds() {
        assert!(in_range(900.0, 850.0, 950.0));
        assert!(!in_range(850.0, 850.0, 950.0));
        assert!(!in_range(160, 80, 160));
    }
}
