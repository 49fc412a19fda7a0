//! GRNBoost2-style network inference: for every gene, fit a boosted tree
//! ensemble predicting its expression from the transcription factors' and
//! report the ensemble's feature importances as regulatory links.

use indexmap::IndexSet;
use log::{debug, info};
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::CisGrnError;
use crate::expression::{sample_std, InferenceMatrix};
use crate::gene_id::strip_version_suffix;
use crate::grn::boost::{BoostParams, BoostedRegressor};
use crate::grn::network::RegulatoryEdge;
use crate::io::TsvRecordIterator;
use crate::DEFAULT_SEED;

#[derive(Debug, Deserialize)]
struct TranscriptionFactorRecord {
    #[serde(rename = "Gene_ID")]
    gene_id: String,
}

/// Read the `Gene_ID` column of a tab-separated transcription factor list,
/// optionally stripping version suffixes. IDs are de-duplicated in file order.
pub fn read_tf_list(
    filepath: impl Into<PathBuf>,
    strip_versions: bool,
) -> Result<IndexSet<String>, CisGrnError> {
    let iter: TsvRecordIterator<TranscriptionFactorRecord> =
        TsvRecordIterator::with_delimiter(filepath, b'\t')?;
    let mut tfs = IndexSet::new();
    for result in iter {
        let record = result?;
        let id = record.gene_id.trim();
        let id = if strip_versions {
            strip_version_suffix(id)
        } else {
            id
        };
        if !id.is_empty() {
            tfs.insert(id.to_string());
        }
    }
    Ok(tfs)
}

/// The matrix columns of the transcription factors that can act as regulators:
/// those present in the matrix and, with `require_variable`, with non-zero
/// sample standard deviation.
pub fn select_regulators(
    tfs: &IndexSet<String>,
    matrix: &InferenceMatrix,
    require_variable: bool,
) -> Result<Vec<usize>, CisGrnError> {
    let regulators: Vec<usize> = tfs
        .iter()
        .filter_map(|tf| matrix.gene_index(tf))
        .filter(|&j| !require_variable || sample_std(matrix.column(j)) > 0.0)
        .collect();
    if regulators.is_empty() {
        return Err(CisGrnError::NoTranscriptionFactors);
    }
    Ok(regulators)
}

/// Network inference settings.
#[derive(Clone, Debug)]
pub struct InferenceParams {
    pub boost: BoostParams,
    /// Target gene `j` is fit with an RNG seeded with `seed + j`.
    pub seed: u64,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            boost: BoostParams::default(),
            seed: DEFAULT_SEED,
        }
    }
}

/// Fit one target gene against the regulators (excluding the target itself),
/// returning the links with positive importance.
pub fn infer_target(
    matrix: &InferenceMatrix,
    regulators: &[usize],
    target: usize,
    params: &InferenceParams,
) -> Result<Vec<RegulatoryEdge>, CisGrnError> {
    let inputs: Vec<usize> = regulators.iter().copied().filter(|&j| j != target).collect();
    let Some(target_name) = matrix.gene_name(target) else {
        return Ok(Vec::new());
    };
    if inputs.is_empty() {
        return Ok(Vec::new());
    }
    let x = matrix.values().select(Axis(1), &inputs);
    let y = matrix.column(target);
    let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(target as u64));
    let model = BoostedRegressor::fit(x.view(), y, &params.boost, &mut rng)?;
    debug!("{}: {} boosting stages", target_name, model.n_estimators());

    let mut edges = Vec::new();
    for (&regulator, importance) in inputs.iter().zip(model.feature_importances()) {
        if importance > 0.0 {
            let regulator_name = matrix.gene_name(regulator).unwrap_or_default();
            edges.push(RegulatoryEdge::new(regulator_name, target_name, importance));
        }
    }
    Ok(edges)
}

/// Infer regulatory links for every gene in the matrix, in parallel on the
/// current rayon pool. Links are sorted by importance, highest first.
pub fn infer_network(
    matrix: &InferenceMatrix,
    regulators: &[usize],
    params: &InferenceParams,
) -> Result<Vec<RegulatoryEdge>, CisGrnError> {
    params.boost.validate()?;
    info!(
        "Inferring links for {} target genes from {} regulators",
        matrix.n_genes(),
        regulators.len()
    );
    let per_target: Vec<Vec<RegulatoryEdge>> = (0..matrix.n_genes())
        .into_par_iter()
        .map(|target| infer_target(matrix, regulators, target, params))
        .collect::<Result<_, _>>()?;
    let mut edges: Vec<RegulatoryEdge> = per_target.into_iter().flatten().collect();
    edges.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    info!("Inferred {} links", edges.len());
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::random_inference_matrix;
    use ndarray::Array2;
    use std::io::Write;

    fn quick_params() -> InferenceParams {
        InferenceParams {
            boost: BoostParams {
                max_estimators: 50,
                max_features: 1.0,
                ..Default::default()
            },
            seed: 666,
        }
    }

    #[test]
    fn test_read_tf_list() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "Gene_ID\tFamily\nAT1G01010.1\tNAC\nAT1G01010.2\tNAC\nAT1G01030\tB3").unwrap();
        let tfs = read_tf_list(tmp.path(), true).unwrap();
        assert_eq!(tfs.len(), 2);
        assert!(tfs.contains("AT1G01010"));
        let tfs = read_tf_list(tmp.path(), false).unwrap();
        assert_eq!(tfs.len(), 3);
    }

    #[test]
    fn test_select_regulators() {
        let values = Array2::from_shape_vec(
            (3, 3),
            vec![1.0, 5.0, 0.0, 2.0, 5.0, 1.0, 3.0, 5.0, 0.0],
        )
        .unwrap();
        let genes = vec!["TF_A".to_string(), "TF_B".to_string(), "G".to_string()];
        let samples = vec!["s1".to_string(), "s2".to_string(), "s3".to_string()];
        let matrix = InferenceMatrix::new(genes, samples, values).unwrap();

        let tfs: IndexSet<String> = ["TF_A", "TF_B", "TF_missing"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(select_regulators(&tfs, &matrix, false).unwrap(), vec![0, 1]);
        // TF_B is constant
        assert_eq!(select_regulators(&tfs, &matrix, true).unwrap(), vec![0]);

        let none: IndexSet<String> = ["X".to_string()].into_iter().collect();
        assert!(matches!(
            select_regulators(&none, &matrix, false),
            Err(CisGrnError::NoTranscriptionFactors)
        ));
    }

    #[test]
    fn test_target_driven_by_one_tf() {
        // G copies TF_A; TF_B is unrelated
        let n = 40;
        let values = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => i as f64,
            1 => ((i * 7) % 5) as f64,
            _ => i as f64 * 2.0 + 1.0,
        });
        let genes = vec!["TF_A".to_string(), "TF_B".to_string(), "G".to_string()];
        let samples = (0..n).map(|i| format!("s{}", i)).collect();
        let matrix = InferenceMatrix::new(genes, samples, values).unwrap();

        let edges = infer_target(&matrix, &[0, 1], 2, &quick_params()).unwrap();
        assert!(!edges.is_empty());
        assert_eq!(edges[0].target, "G");
        let a = edges.iter().find(|e| e.regulator == "TF_A").unwrap();
        let b_importance = edges
            .iter()
            .find(|e| e.regulator == "TF_B")
            .map_or(0.0, |e| e.importance);
        assert!(a.importance > b_importance);
    }

    #[test]
    fn test_no_self_regulation() {
        let matrix = random_inference_matrix(20, 6, 11);
        let regulators = vec![0, 1, 2];
        let edges = infer_network(&matrix, &regulators, &quick_params()).unwrap();
        assert!(edges.iter().all(|e| e.regulator != e.target));
        for pair in edges.windows(2) {
            assert!(pair[0].importance >= pair[1].importance);
        }
        // a target with only itself as regulator has no inputs
        assert!(infer_target(&matrix, &[0], 0, &quick_params()).unwrap().is_empty());
    }

    #[test]
    fn test_inference_is_reproducible() {
        let matrix = random_inference_matrix(15, 5, 3);
        let regulators = vec![0, 1, 2, 3];
        let a = infer_network(&matrix, &regulators, &quick_params()).unwrap();
        let b = infer_network(&matrix, &regulators, &quick_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_inference_in_local_pools() {
        let matrix = random_inference_matrix(15, 5, 3);
        let regulators = vec![0, 1, 2, 3];
        // pools of different sizes in one process give the same network
        let run = |threads: usize| {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap();
            pool.install(|| infer_network(&matrix, &regulators, &quick_params()))
                .unwrap()
        };
        let single = run(1);
        assert_eq!(single, run(3));
        assert_eq!(single, infer_network(&matrix, &regulators, &quick_params()).unwrap());
    }
}
