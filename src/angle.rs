//! Degree arithmetic shared by the resolver, the aggregator and both chart layouts.

pub const FULL_CIRCLE: f64 = 360.0;
pub const SIGN_SPAN: f64 = 30.0;

/// Wraps any finite degree value into `[0, 360)`.
///
/// `-10.0` becomes `350.0`; `720.0` becomes `0.0`.
pub fn normalize_degree(degree: f64) -> f64 {
    let wrapped = ((degree % FULL_CIRCLE) + FULL_CIRCLE) % FULL_CIRCLE;
    // -1e-15 % 360 + 360 rounds up to exactly 360.0
    if wrapped >= FULL_CIRCLE {
        0.0
    } else {
        wrapped
    }
}

/// Index 0..=11 of the zodiac sign containing `degree` (Aries = 0).
///
/// Returns `None` for NaN or infinite input; callers decide what to skip.
pub fn zodiac_sign_index(degree: f64) -> Option<usize> {
    if !degree.is_finite() {
        return None;
    }
    Some((normalize_degree(degree) / SIGN_SPAN).floor() as usize % 12)
}

/// Position inside the containing sign, in `[0, 30)`.
pub fn degree_within_sign(degree: f64) -> f64 {
    normalize_degree(degree) % SIGN_SPAN
}

/// Truncates (does not round) to `digits` decimal places, for chart labels.
pub fn decimals(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).floor() / factor
}

/// Smallest separation between two longitudes, in `[0, 180]`.
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = (normalize_degree(a) - normalize_degree(b)).abs();
    if diff > 180.0 {
        FULL_CIRCLE - diff
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(-10.0, 350.0)]
    #[case(0.0, 0.0)]
    #[case(360.0, 0.0)]
    #[case(725.5, 5.5)]
    #[case(-725.5, 354.5)]
    fn normalizes_into_circle(#[case] input: f64, #[case] expected: f64) {
        assert_relative_eq!(normalize_degree(input), expected, epsilon = 1e-9);
    }

    #[test]
    fn normalized_values_stay_in_range_and_ignore_whole_turns() {
        let mut d = -1000.0;
        while d < 1000.0 {
            let n = normalize_degree(d);
            assert!((0.0..360.0).contains(&n), "{} -> {}", d, n);
            for k in [-3.0, -1.0, 1.0, 2.0] {
                assert_relative_eq!(normalize_degree(d + 360.0 * k), n, epsilon = 1e-9);
            }
            d += 7.3;
        }
    }

    #[test]
    fn tiny_negative_does_not_escape_range() {
        let n = normalize_degree(-1e-15);
        assert!(n < 360.0);
    }

    #[rstest]
    #[case(0.0, 0)]
    #[case(359.0, 11)]
    #[case(30.0, 1)]
    #[case(29.999, 0)]
    #[case(-0.5, 11)]
    fn sign_index_examples(#[case] degree: f64, #[case] expected: usize) {
        assert_eq!(zodiac_sign_index(degree), Some(expected));
    }

    #[test]
    fn sign_index_ignores_whole_turns() {
        for step in 0..720 {
            let d = step as f64 * 0.5;
            assert_eq!(zodiac_sign_index(d), zodiac_sign_index(d + 360.0));
        }
    }

    #[test]
    fn sign_index_rejects_non_finite() {
        assert_eq!(zodiac_sign_index(f64::NAN), None);
        assert_eq!(zodiac_sign_index(f64::INFINITY), None);
    }

    #[test]
    fn degree_within_sign_examples() {
        assert_relative_eq!(degree_within_sign(45.25), 15.25, epsilon = 1e-9);
        assert_relative_eq!(degree_within_sign(-1.0), 29.0, epsilon = 1e-9);
    }

    #[test]
    fn decimals_truncates() {
        assert_relative_eq!(decimals(12.3456, 2), 12.34, epsilon = 1e-9);
        assert_relative_eq!(decimals(29.999, 1), 29.9, epsilon = 1e-9);
    }

    #[test]
    fn angular_distance_wraps() {
        assert_relative_eq!(angular_distance(350.0, 10.0), 20.0, epsilon = 1e-9);
        assert_relative_eq!(angular_distance(0.0, 180.0), 180.0, epsilon = 1e-9);
    }
}
