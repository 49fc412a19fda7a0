//! Fisher's exact test on 2×2 contingency tables.

use statrs::function::factorial::ln_binomial;

/// Relative tolerance used when comparing table probabilities to the observed
/// table's probability, so that tables tied up to floating point error are counted.
const RELATIVE_TOLERANCE: f64 = 1e-7;

/// A 2×2 contingency table, `[[a, b], [c, d]]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContingencyTable {
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub d: u64,
}

impl ContingencyTable {
    pub fn new(a: u64, b: u64, c: u64, d: u64) -> Self {
        Self { a, b, c, d }
    }

    /// The sample odds ratio `a·d / (b·c)`. Infinite if only the denominator is
    /// zero, NaN if both are.
    pub fn odds_ratio(&self) -> f64 {
        let numerator = self.a as f64 * self.d as f64;
        let denominator = self.b as f64 * self.c as f64;
        if denominator == 0.0 {
            if numerator == 0.0 {
                f64::NAN
            } else {
                f64::INFINITY
            }
        } else {
            numerator / denominator
        }
    }

    fn has_empty_margin(&self) -> bool {
        self.a + self.b == 0 || self.c + self.d == 0 || self.a + self.c == 0 || self.b + self.d == 0
    }
}

/// The result of a two-sided Fisher's exact test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FisherResult {
    pub odds_ratio: f64,
    pub p_value: f64,
}

/// Two-sided Fisher's exact test.
///
/// The p-value is the total hypergeometric probability (with the table margins
/// fixed) of all tables at most as likely as the observed one. A table with an
/// empty row or column gives an odds ratio of NaN and a p-value of 1.
pub fn fisher_exact(table: &ContingencyTable) -> FisherResult {
    if table.has_empty_margin() {
        return FisherResult {
            odds_ratio: f64::NAN,
            p_value: 1.0,
        };
    }
    let odds_ratio = table.odds_ratio();

    // first row total, second row total, first column total
    let row1 = table.a + table.b;
    let row2 = table.c + table.d;
    let col1 = table.a + table.c;
    let total = row1 + row2;

    let ln_denominator = ln_binomial(total, col1);
    let ln_pmf = |x: u64| ln_binomial(row1, x) + ln_binomial(row2, col1 - x) - ln_denominator;

    let lo = col1.saturating_sub(row2);
    let hi = col1.min(row1);
    let ln_observed = ln_pmf(table.a);
    let threshold = ln_observed + RELATIVE_TOLERANCE.ln_1p();

    let p_value: f64 = (lo..=hi)
        .map(ln_pmf)
        .filter(|&lp| lp <= threshold)
        .map(f64::exp)
        .sum();

    FisherResult {
        odds_ratio,
        p_value: p_value.min(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{} != {} (tol {})", a, b, tol);
    }

    #[test]
    fn test_tea_tasting() {
        // Fisher's lady tasting tea: [[3, 1], [1, 3]]
        let result = fisher_exact(&ContingencyTable::new(3, 1, 1, 3));
        assert_close(result.odds_ratio, 9.0, 1e-12);
        assert_close(result.p_value, 0.4857142857142857, 1e-10);
    }

    #[test]
    fn test_against_scipy() {
        // scipy.stats.fisher_exact([[8, 2], [1, 5]])
        let result = fisher_exact(&ContingencyTable::new(8, 2, 1, 5));
        assert_close(result.odds_ratio, 20.0, 1e-12);
        assert_close(result.p_value, 0.03496503496503495, 1e-10);

        // scipy.stats.fisher_exact([[10, 100], [20, 50]])
        let result = fisher_exact(&ContingencyTable::new(10, 100, 20, 50));
        assert_close(result.odds_ratio, 0.25, 1e-12);
        assert_close(result.p_value, 0.0009135114714321073, 1e-10);
    }

    #[test]
    fn test_symmetric_table_is_one() {
        let result = fisher_exact(&ContingencyTable::new(5, 5, 5, 5));
        assert_close(result.p_value, 1.0, 1e-12);
    }

    #[test]
    fn test_infinite_odds_ratio() {
        let result = fisher_exact(&ContingencyTable::new(4, 0, 0, 4));
        assert!(result.odds_ratio.is_infinite());
        assert_close(result.p_value, 2.0 / 70.0, 1e-12);
    }

    #[test]
    fn test_empty_margin() {
        let result = fisher_exact(&ContingencyTable::new(0, 0, 3, 7));
        assert!(result.odds_ratio.is_nan());
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_p_value_bounds() {
        for a in 0..6 {
            for c in 0..6 {
                let result = fisher_exact(&ContingencyTable::new(a, 6 - a, c, 9 - c));
                assert!(result.p_value > 0.0 && result.p_value <= 1.0);
                assert!(result.odds_ratio.is_nan() || result.odds_ratio >= 0.0);
            }
        }
    }
}
