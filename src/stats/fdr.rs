//! Multiple testing correction.

/// Benjamini-Hochberg false discovery rate adjustment.
///
/// Returns the adjusted p-values in the input order. Each adjusted value is the
/// minimum of `p_(k) · m / k` over all ranks `k` at or above its own, clipped to 1.
/// NaN p-values are passed through as NaN and do not count toward `m`.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..p_values.len())
        .filter(|&i| !p_values[i].is_nan())
        .collect();
    let m = order.len();
    let mut adjusted = vec![f64::NAN; p_values.len()];
    if m == 0 {
        return adjusted;
    }
    order.sort_by(|&i, &j| p_values[i].total_cmp(&p_values[j]));

    let mut running_min = f64::INFINITY;
    for (rank0, &i) in order.iter().enumerate().rev() {
        let rank = (rank0 + 1) as f64;
        let value = p_values[i] * m as f64 / rank;
        running_min = running_min.min(value);
        adjusted[i] = running_min.min(1.0);
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_all_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-12, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_against_statsmodels() {
        // statsmodels.stats.multitest.multipletests(p, method='fdr_bh')[1]
        let p = [0.01, 0.04, 0.03, 0.005, 0.5];
        let expected = [0.025, 0.05, 0.05, 0.025, 0.5];
        assert_all_close(&benjamini_hochberg(&p), &expected);
    }

    #[test]
    fn test_monotone_and_bounded() {
        let p = [0.9, 0.001, 0.2, 0.2, 0.04, 0.7, 1.0, 0.0005];
        let adjusted = benjamini_hochberg(&p);
        let mut pairs: Vec<(f64, f64)> = p.iter().copied().zip(adjusted.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for window in pairs.windows(2) {
            assert!(window[0].1 <= window[1].1);
        }
        for (raw, adj) in pairs {
            assert!(adj >= raw && adj <= 1.0);
        }
    }

    #[test]
    fn test_edge_cases() {
        assert!(benjamini_hochberg(&[]).is_empty());
        assert_all_close(&benjamini_hochberg(&[0.3]), &[0.3]);
        let adjusted = benjamini_hochberg(&[f64::NAN, 0.02, 0.04]);
        assert!(adjusted[0].is_nan());
        assert_all_close(&adjusted[1..], &[0.04, 0.04]);
    }
}
