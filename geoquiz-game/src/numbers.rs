//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the u8 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_u8(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    let clamped = value.clamp(0.0, f64::from(u8::MAX)).round();
    cast::<f64, u8>(clamped).unwrap_or(0)
}

/// Round a f64 and clamp it to the u32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_u32(value: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    let clamped = value.clamp(0.0, f64::from(u32::MAX)).round();
    cast::<f64, u32>(clamped).unwrap_or(0)
}

/// Truncate a non-negative f64 to u64, saturating; NaN and negatives become 0.
#[must_use]
pub fn f64_to_u64_saturating(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    cast::<f64, u64>(value.trunc()).unwrap_or(u64::MAX)
}

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Share of `part` in `whole` as a percentage, 0.0 when `whole` is zero.
#[must_use]
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    u64_to_f64(part) / u64_to_f64(whole) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_u8_clamps_and_handles_nan() {
        assert_eq!(round_f64_to_u8(f64::NAN), 0);
        assert_eq!(round_f64_to_u8(-4.0), 0);
        assert_eq!(round_f64_to_u8(300.0), 255);
        assert_eq!(round_f64_to_u8(126.5), 127);
    }

    #[test]
    fn round_to_u32_rounds_half_away_from_zero() {
        assert_eq!(round_f64_to_u32(89.5), 90);
        assert_eq!(round_f64_to_u32(f64::NAN), 0);
    }

    #[test]
    fn f64_to_u64_truncates_and_saturates() {
        assert_eq!(
            f64_to_u64_saturating(1_760_000_000_123.9),
            1_760_000_000_123
        );
        assert_eq!(f64_to_u64_saturating(-3.0), 0);
        assert_eq!(f64_to_u64_saturating(f64::NAN), 0);
        assert_eq!(f64_to_u64_saturating(1e30), u64::MAX);
    }

    #[test]
    fn percentage_of_zero_whole_is_zero() {
        assert!(percentage(3, 0).abs() < f64::EPSILON);
        assert!((percentage(9, 10) - 90.0).abs() < f64::EPSILON);
        assert!((percentage(1, 1) - 100.0).abs() < f64::EPSILON);
    }
}
