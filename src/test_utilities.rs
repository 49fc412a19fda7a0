//! Test cases and test utility functions.
//!

use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::{Builder, NamedTempFile};

use crate::expression::InferenceMatrix;
use crate::grn::network::RegulatoryEdge;

// Random network defaults
//
// Importances are drawn uniformly from this range, so that with the default
// threshold of 2.0 roughly half the edges are kept.
pub const MIN_IMPORTANCE: f64 = 0.0;
pub const MAX_IMPORTANCE: f64 = 4.0;

/// Get the path to the `cisgrn` binary built alongside the tests.
pub fn cisgrn_binary_path() -> PathBuf {
    let mut path = std::env::current_exe().expect("could not locate test executable");
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("cisgrn");
    path
}

/// Create a temporary file with the given suffix, e.g. `.csv` or `.fa.gz`.
pub fn temp_file_with_suffix(suffix: &str) -> NamedTempFile {
    Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("could not create temporary file")
}

/// An AGI-style gene ID for the `i`-th random gene.
pub fn random_gene_id(i: usize) -> String {
    format!("AT{}G{:05}", i % 5 + 1, (i + 1) * 10)
}

/// Build a random samples × genes [`InferenceMatrix`] of log-normal-ish
/// expression values.
pub fn random_inference_matrix(n_samples: usize, n_genes: usize, seed: u64) -> InferenceMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let values = Array2::from_shape_fn((n_samples, n_genes), |_| rng.gen_range(0.0..10.0_f64).exp());
    let genes = (0..n_genes).map(random_gene_id).collect();
    let samples = (0..n_samples).map(|i| format!("sample_{}", i + 1)).collect();
    InferenceMatrix::new(genes, samples, values).expect("random matrix has matching dimensions")
}

/// Build a random directed GRN edge list. The first tenth of the genes act as
/// regulators, with hubs more likely than other regulators. Self links are
/// never generated, and a (regulator, target) pair may repeat.
pub fn random_network(n_genes: usize, n_edges: usize, seed: u64) -> Vec<RegulatoryEdge> {
    if n_genes < 2 {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let n_regulators = (n_genes / 10).max(1);
    let mut edges = Vec::with_capacity(n_edges);
    while edges.len() < n_edges {
        // squaring a uniform draw skews toward the first regulators
        let u: f64 = rng.gen();
        let regulator = ((u * u) * n_regulators as f64) as usize;
        let target = rng.gen_range(0..n_genes);
        if regulator == target {
            continue;
        }
        let importance = rng.gen_range(MIN_IMPORTANCE..MAX_IMPORTANCE);
        edges.push(RegulatoryEdge::new(
            random_gene_id(regulator),
            random_gene_id(target),
            importance,
        ));
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_network() {
        let edges = random_network(100, 500, 1);
        assert_eq!(edges.len(), 500);
        assert!(edges.iter().all(|e| e.regulator != e.target));
        assert_eq!(edges, random_network(100, 500, 1));
    }

    #[test]
    fn test_random_gene_ids_are_distinct() {
        let ids: std::collections::HashSet<String> = (0..1000).map(random_gene_id).collect();
        assert_eq!(ids.len(), 1000);
    }
}
