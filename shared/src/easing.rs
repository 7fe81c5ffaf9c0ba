/// Cubic ease-in-out over `elapsed` in `[0, duration]`, returning `[0, 1]`.
///
/// Accelerates as `4(t/d)^3` through the first half and mirrors that curve
/// on the way out.
pub fn ease_in_out_cubic(elapsed: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        return 1.0;
    }
    let t = (elapsed / duration).clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::ease_in_out_cubic;

    #[test]
    fn endpoints_are_exact() {
        assert_eq!(ease_in_out_cubic(0.0, 500.0), 0.0);
        assert_eq!(ease_in_out_cubic(500.0, 500.0), 1.0);
        assert_eq!(ease_in_out_cubic(250.0, 500.0), 0.5);
    }

    #[test]
    fn is_monotonic() {
        let mut last = 0.0;
        for step in 0..=100 {
            let value = ease_in_out_cubic(step as f64 * 5.0, 500.0);
            assert!(value >= last, "step {step}: {value} < {last}");
            last = value;
        }
    }

    #[test]
    fn is_point_symmetric_around_midpoint() {
        for step in 0..=50 {
            let t = step as f64 * 5.0;
            let early = ease_in_out_cubic(t, 500.0);
            let late = ease_in_out_cubic(500.0 - t, 500.0);
            assert!((early + late - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn clamps_out_of_range_time() {
        assert_eq!(ease_in_out_cubic(-20.0, 500.0), 0.0);
        assert_eq!(ease_in_out_cubic(900.0, 500.0), 1.0);
        assert_eq!(ease_in_out_cubic(3.0, 0.0), 1.0);
    }
}
