//! Empirical p-values against a null distribution of scores.

/// The add-one empirical p-value of `observed` against `null` draws:
/// `(#{s ≥ observed} + 1) / (n + 1)`.
///
/// This is never zero, and with `n` null draws it is at least `1 / (n + 1)`.
pub fn empirical_p_value(observed: f64, null: &[f64]) -> f64 {
    let at_least = null.iter().filter(|&&s| s >= observed).count();
    (at_least + 1) as f64 / (null.len() + 1) as f64
}

/// The arithmetic mean of the null draws, NaN if there are none.
pub fn null_mean(null: &[f64]) -> f64 {
    if null.is_empty() {
        return f64::NAN;
    }
    null.iter().sum::<f64>() / null.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empirical_p_value() {
        let null = [1.0, 2.0, 3.0, 4.0];
        // none at least as large
        assert_eq!(empirical_p_value(10.0, &null), 0.2);
        // ties count
        assert_eq!(empirical_p_value(3.0, &null), 0.6);
        assert_eq!(empirical_p_value(0.0, &null), 1.0);
        assert_eq!(empirical_p_value(5.0, &[]), 1.0);
    }

    #[test]
    fn test_p_value_floor() {
        let null: Vec<f64> = (0..99).map(|i| i as f64).collect();
        let p = empirical_p_value(1000.0, &null);
        assert_eq!(p, 1.0 / 100.0);
        assert!(p > 0.0 && p <= 1.0);
    }

    #[test]
    fn test_null_mean() {
        assert_eq!(null_mean(&[1.0, 2.0, 6.0]), 3.0);
        assert!(null_mean(&[]).is_nan());
    }
}
