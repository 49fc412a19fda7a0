//! The [`ExpressionMatrix`] type: a gene × sample table of expression values
//! with a per-gene cluster label.
//!
//! Expression tables are delimited text with a header row. The layout of the
//! columns is described by an [`ExpressionLayout`]: which column holds the gene
//! ID, which holds the cluster label, and which are samples. Values may use a
//! decimal comma (`12,5`), as exported by spreadsheet tools in many locales.

use indexmap::{IndexMap, IndexSet};
use ndarray::{Array2, ArrayView1, Axis};
use std::path::PathBuf;

use crate::error::CisGrnError;
use crate::gene_id::strip_version_suffix;
use crate::io::tsv::{build_delimited_reader, delimiter_for};
use crate::{DEFAULT_CLUSTER_COLUMN, DEFAULT_FIRST_SAMPLE_COLUMN, DEFAULT_ID_COLUMN};

/// How sample columns are selected from the header.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleColumns {
    /// All columns from index `first` up to, but excluding, the last column.
    Positional { first: usize },
    /// Every column whose name contains one of these substrings.
    Matching(Vec<String>),
}

/// The column layout of an expression table.
#[derive(Clone, Debug)]
pub struct ExpressionLayout {
    pub id_column: String,
    pub cluster_column: Option<String>,
    pub samples: SampleColumns,
}

impl Default for ExpressionLayout {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            cluster_column: Some(DEFAULT_CLUSTER_COLUMN.to_string()),
            samples: SampleColumns::Positional {
                first: DEFAULT_FIRST_SAMPLE_COLUMN,
            },
        }
    }
}

impl ExpressionLayout {
    /// Resolve the sample column indices for a header.
    fn sample_indices(&self, header: &[String]) -> Vec<usize> {
        match &self.samples {
            SampleColumns::Positional { first } => {
                let end = header.len().saturating_sub(1);
                (*first..end).collect()
            }
            SampleColumns::Matching(patterns) => header
                .iter()
                .enumerate()
                .filter(|(_, name)| patterns.iter().any(|p| name.contains(p.as_str())))
                .map(|(i, _)| i)
                .collect(),
        }
    }
}

/// Parse a single expression value. Decimal commas are accepted, and empty,
/// `NA`, and `NaN` cells are missing (NaN).
pub fn parse_expression_value(value: &str) -> Result<f64, CisGrnError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") || trimmed.eq_ignore_ascii_case("nan")
    {
        return Ok(f64::NAN);
    }
    Ok(trimmed.replace(',', ".").parse::<f64>()?)
}

/// Compare a cluster label to a target cluster. Labels that both parse as
/// numbers are compared numerically (so `3` matches `3.0`), otherwise as strings.
pub fn cluster_matches(label: Option<&str>, target: &str) -> bool {
    let Some(label) = label else {
        return false;
    };
    let label = label.trim();
    let target = target.trim();
    match (
        label.replace(',', ".").parse::<f64>(),
        target.replace(',', ".").parse::<f64>(),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => label == target,
    }
}

/// Mean of the non-NaN values; NaN if there are none.
fn nan_mean(values: ArrayView1<f64>) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Sample standard deviation (`ddof = 1`); NaN with fewer than two values.
pub fn sample_std(values: ArrayView1<f64>) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = values.sum() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// A gene × sample expression matrix, in file row order.
#[derive(Clone, Debug)]
pub struct ExpressionMatrix {
    genes: Vec<String>,
    samples: Vec<String>,
    values: Array2<f64>,
    clusters: Option<Vec<Option<String>>>,
}

impl ExpressionMatrix {
    /// Read an expression table. The delimiter is `,` for `.csv` files and tab otherwise.
    pub fn from_path(
        filepath: impl Into<PathBuf>,
        layout: &ExpressionLayout,
    ) -> Result<Self, CisGrnError> {
        let filepath = filepath.into();
        let source = filepath.display().to_string();
        let mut reader = build_delimited_reader(&filepath, delimiter_for(&filepath), true)?;
        let header: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        if header.is_empty() {
            return Err(CisGrnError::MissingHeader(source));
        }
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        }
        Self::from_rows(&header, rows, layout, &source)
    }

    /// Build the matrix from an already-split header and rows.
    pub fn from_rows(
        header: &[String],
        rows: Vec<Vec<String>>,
        layout: &ExpressionLayout,
        source: &str,
    ) -> Result<Self, CisGrnError> {
        let column = |name: &str| header.iter().position(|h| h == name);
        let id_index = column(&layout.id_column)
            .ok_or_else(|| CisGrnError::MissingColumn(layout.id_column.clone(), source.to_string()))?;
        let cluster_index = layout.cluster_column.as_deref().and_then(column);

        let sample_indices: Vec<usize> = layout
            .sample_indices(header)
            .into_iter()
            .filter(|&i| i != id_index && Some(i) != cluster_index)
            .collect();
        if sample_indices.is_empty() {
            return Err(CisGrnError::NoSampleColumns);
        }
        let samples = sample_indices.iter().map(|&i| header[i].clone()).collect();

        fn cell(row: &[String], i: usize) -> &str {
            row.get(i).map(|s| s.trim()).unwrap_or("")
        }
        let mut genes = Vec::with_capacity(rows.len());
        let mut clusters = Vec::with_capacity(rows.len());
        let mut values = Array2::from_elem((rows.len(), sample_indices.len()), f64::NAN);
        for (r, row) in rows.iter().enumerate() {
            genes.push(cell(row, id_index).to_string());
            clusters.push(cluster_index.and_then(|i| {
                let label = cell(row, i);
                (!label.is_empty()).then(|| label.to_string())
            }));
            for (c, &i) in sample_indices.iter().enumerate() {
                values[[r, c]] = parse_expression_value(cell(row, i))?;
            }
        }

        Ok(Self {
            genes,
            samples,
            values,
            clusters: cluster_index.map(|_| clusters),
        })
    }

    /// The raw gene IDs, in row order.
    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    /// The selected sample column names.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// The gene × sample value matrix.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// The cluster labels, if the layout's cluster column was present.
    pub fn clusters(&self) -> Option<&[Option<String>]> {
        self.clusters.as_deref()
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Per-gene mean expression, skipping missing values.
    pub fn average_expression(&self) -> Vec<f64> {
        self.values.axis_iter(Axis(0)).map(nan_mean).collect()
    }

    /// Build a samples × genes matrix ready for network inference.
    ///
    /// With `strip_versions`, gene IDs lose their numeric version suffix. Duplicate
    /// genes keep their first row and genes with missing values are dropped. With
    /// `drop_invariant`, genes with zero or undefined sample standard deviation
    /// are dropped as well.
    pub fn for_inference(
        &self,
        strip_versions: bool,
        drop_invariant: bool,
    ) -> Result<InferenceMatrix, CisGrnError> {
        let mut summary = InferenceFilterSummary::default();
        let mut seen = IndexSet::new();
        let mut kept = Vec::new();
        for (row, gene) in self.genes.iter().enumerate() {
            let gene = if strip_versions {
                strip_version_suffix(gene)
            } else {
                gene.as_str()
            };
            if !seen.insert(gene.to_string()) {
                summary.duplicates += 1;
                continue;
            }
            let values = self.values.row(row);
            if values.iter().any(|v| v.is_nan()) {
                summary.missing_values += 1;
                continue;
            }
            if drop_invariant {
                let sd = sample_std(values);
                if sd.is_nan() || sd <= 0.0 {
                    summary.invariant += 1;
                    continue;
                }
            }
            kept.push((gene.to_string(), row));
        }
        if kept.is_empty() {
            return Err(CisGrnError::EmptyExpressionMatrix);
        }

        let n_samples = self.samples.len();
        let values = Array2::from_shape_fn((n_samples, kept.len()), |(i, j)| {
            self.values[[kept[j].1, i]]
        });
        let genes: IndexMap<String, usize> = kept
            .into_iter()
            .enumerate()
            .map(|(j, (gene, _))| (gene, j))
            .collect();

        Ok(InferenceMatrix {
            genes,
            samples: self.samples.clone(),
            values,
            summary,
        })
    }
}

/// Counts of genes removed while building an [`InferenceMatrix`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InferenceFilterSummary {
    pub duplicates: usize,
    pub missing_values: usize,
    pub invariant: usize,
}

/// A samples × genes matrix for network inference, with gene columns
/// addressable by ID.
#[derive(Clone, Debug)]
pub struct InferenceMatrix {
    genes: IndexMap<String, usize>,
    samples: Vec<String>,
    values: Array2<f64>,
    summary: InferenceFilterSummary,
}

impl InferenceMatrix {
    /// Build directly from a samples × genes array. Gene IDs must be unique,
    /// with one column per gene and one row per sample.
    pub fn new(
        genes: Vec<String>,
        samples: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self, CisGrnError> {
        if values.ncols() != genes.len() || values.nrows() != samples.len() {
            return Err(CisGrnError::InvalidParameter(format!(
                "a {}×{} matrix does not fit {} samples × {} genes",
                values.nrows(),
                values.ncols(),
                samples.len(),
                genes.len()
            )));
        }
        let n_genes = genes.len();
        let genes: IndexMap<String, usize> =
            genes.into_iter().enumerate().map(|(j, g)| (g, j)).collect();
        if genes.len() != n_genes {
            return Err(CisGrnError::InvalidParameter(
                "inference matrix gene IDs must be unique".to_string(),
            ));
        }
        Ok(Self {
            genes,
            samples,
            values,
            summary: InferenceFilterSummary::default(),
        })
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Gene IDs in column order.
    pub fn genes(&self) -> impl Iterator<Item = &String> {
        self.genes.keys()
    }

    pub fn gene_name(&self, index: usize) -> Option<&str> {
        self.genes.get_index(index).map(|(g, _)| g.as_str())
    }

    pub fn gene_index(&self, gene: &str) -> Option<usize> {
        self.genes.get(gene).copied()
    }

    pub fn contains(&self, gene: &str) -> bool {
        self.genes.contains_key(gene)
    }

    /// The expression values of one gene across samples.
    pub fn column(&self, index: usize) -> ArrayView1<f64> {
        self.values.column(index)
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn summary(&self) -> &InferenceFilterSummary {
        &self.summary
    }
}
