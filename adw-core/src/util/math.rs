//! Numeric helpers for the slider.

/// Clamp `value` into `[min, max]`. The lower bound wins if they cross.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Most decimal places an `f64` can carry meaningfully.
pub const MAX_PRECISION: u32 = 15;

/// Truncate `value` to `precision` decimal places (toward negative infinity).
/// Precision is capped at [`MAX_PRECISION`].
pub fn to_precision(value: f64, precision: u32) -> f64 {
    let pow = 10f64.powi(precision.min(MAX_PRECISION) as i32);
    let truncated = (value * pow).floor() / pow;
    if truncated.is_finite() {
        truncated
    } else {
        value
    }
}

/// Move from `old` toward `new` in whole multiples of `step`, counted from
/// `old` rather than from zero. A partial step does not move the value, so
/// repeated small drags stay on the same step grid.
///
/// ```rust
/// use adw_core::util::change_with_step;
///
/// assert_eq!(change_with_step(50.0, 53.0, 5.0), 50.0);
/// assert_eq!(change_with_step(50.0, 61.0, 5.0), 60.0);
/// ```
pub fn change_with_step(old: f64, new: f64, step: f64) -> f64 {
    if step <= 0.0 || !step.is_finite() {
        return new;
    }
    let steps = ((new - old) / step).trunc();
    old + steps * step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp(11.0, 0.0, 10.0), 10.0);
        assert_eq!(clamp(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp(4.0, 0.0, 10.0), 4.0);
    }

    #[test]
    fn precision_truncates() {
        assert_eq!(to_precision(1.23456, 2), 1.23);
        assert_eq!(to_precision(7.9, 0), 7.0);
    }

    #[test]
    fn oversized_precision_keeps_value_finite() {
        assert_eq!(to_precision(42.5, 400), 42.5);
        assert_eq!(to_precision(42.5, u32::MAX), 42.5);
        assert_eq!(to_precision(f64::MAX, 15), f64::MAX);
    }

    #[test]
    fn steps_are_relative_to_old_value() {
        assert_eq!(change_with_step(50.0, 53.0, 5.0), 50.0);
        assert_eq!(change_with_step(3.0, 9.5, 2.0), 9.0);
        assert_eq!(change_with_step(9.0, 4.0, 2.0), 5.0);
    }

    #[test]
    fn degenerate_step_passes_through() {
        assert_eq!(change_with_step(1.0, 4.2, 0.0), 4.2);
    }
}
