//! Expression-matched background gene selection.
//!
//! A foreground cluster's promoters are compared against a background set that
//! has the same expression level distribution, so that motif enrichment is not
//! confounded by expression. Each foreground gene is matched to the background
//! pool gene (any gene outside the cluster) with the nearest average expression.

use indexmap::IndexSet;
use log::{debug, info};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::CisGrnError;
use crate::expression::{cluster_matches, ExpressionMatrix};
use crate::gene_id::normalize_gene_id;
use crate::reporting::Report;
use crate::sequences::nucleotide::{for_each_fasta_record, write_fasta_record};

/// One foreground gene and its matched background gene.
#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundMatch {
    pub foreground: String,
    pub background: String,
    pub foreground_expression: f64,
    pub background_expression: f64,
}

/// The result of background selection.
#[derive(Clone, Debug)]
pub struct BackgroundSelection {
    pub matches: Vec<BackgroundMatch>,
    /// The unique, non-empty background gene IDs, in first-matched order.
    pub background_ids: IndexSet<String>,
}

/// A 1-nearest-neighbour index over one-dimensional values.
///
/// Ties (equal distance) are broken toward the point that was inserted first.
#[derive(Clone, Debug)]
pub struct NearestNeighbor1D {
    // (value, insertion index), sorted by value then index
    points: Vec<(f64, usize)>,
}

impl NearestNeighbor1D {
    /// Build the index. NaN values must be filtered out beforehand.
    pub fn new(values: &[f64]) -> Self {
        let mut points: Vec<(f64, usize)> =
            values.iter().copied().enumerate().map(|(i, v)| (v, i)).collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Return the insertion index of the nearest point to `query`.
    pub fn nearest(&self, query: f64) -> Option<usize> {
        if self.points.is_empty() {
            return None;
        }
        // first point with value >= query
        let upper = self.points.partition_point(|p| p.0 < query);

        // the candidates are the run of equal values just below the query,
        // and the run of equal values at or above it
        let mut best: Option<(f64, usize)> = None;
        let mut consider = |value: f64, index: usize| {
            let distance = (value - query).abs();
            best = match best {
                Some((d, i)) if d < distance || (d == distance && i <= index) => Some((d, i)),
                _ => Some((distance, index)),
            };
        };
        if upper < self.points.len() {
            let value = self.points[upper].0;
            // runs are sorted by insertion index, so the first is the earliest
            consider(value, self.points[upper].1);
        }
        if upper > 0 {
            let value = self.points[upper - 1].0;
            let first_of_run = self.points[..upper].partition_point(|p| p.0 < value);
            consider(value, self.points[first_of_run].1);
        }
        best.map(|(_, i)| i)
    }
}

/// Select an expression-matched background for the genes of `cluster`.
pub fn select_background(
    matrix: &ExpressionMatrix,
    cluster: &str,
    report: &mut Report,
) -> Result<BackgroundSelection, CisGrnError> {
    let clusters = matrix.clusters().ok_or_else(|| {
        CisGrnError::MissingColumn("cluster".to_string(), "expression matrix".to_string())
    })?;
    let averages = matrix.average_expression();

    let mut foreground = Vec::new();
    let mut pool = Vec::new();
    let mut no_expression = 0;
    for (row, label) in clusters.iter().enumerate() {
        if averages[row].is_nan() {
            no_expression += 1;
            continue;
        }
        if cluster_matches(label.as_deref(), cluster) {
            foreground.push(row);
        } else {
            pool.push(row);
        }
    }
    report.add_count_issue(
        no_expression,
        "genes had no expression values and were excluded from matching",
    );

    if foreground.is_empty() {
        return Err(CisGrnError::EmptyForeground(cluster.to_string()));
    }
    if pool.is_empty() {
        return Err(CisGrnError::EmptyBackgroundPool(cluster.to_string()));
    }
    info!(
        "Matching {} foreground genes against a pool of {} genes",
        foreground.len(),
        pool.len()
    );

    let pool_values: Vec<f64> = pool.iter().map(|&row| averages[row]).collect();
    let index = NearestNeighbor1D::new(&pool_values);

    let genes = matrix.genes();
    let mut matches = Vec::with_capacity(foreground.len());
    let mut background_ids = IndexSet::new();
    for &row in foreground.iter() {
        let nearest = index
            .nearest(averages[row])
            .expect("internal error: background pool is non-empty");
        let pool_row = pool[nearest];
        let background = genes[pool_row].clone();
        if !background.is_empty() {
            background_ids.insert(background.clone());
        }
        debug!("{} matched to {}", genes[row], background);
        matches.push(BackgroundMatch {
            foreground: genes[row].clone(),
            background,
            foreground_expression: averages[row],
            background_expression: averages[pool_row],
        });
    }
    info!("Background genes selected: {}", background_ids.len());

    Ok(BackgroundSelection {
        matches,
        background_ids,
    })
}

/// Write the FASTA records whose normalized ID is among the normalized `gene_ids`,
/// in FASTA file order. Returns the names of the written records.
pub fn filter_promoters(
    fasta: impl Into<PathBuf>,
    gene_ids: &IndexSet<String>,
    writer: &mut dyn std::io::Write,
) -> Result<Vec<String>, CisGrnError> {
    let wanted: HashSet<&str> = gene_ids.iter().map(|id| normalize_gene_id(id)).collect();
    let mut written = Vec::new();
    for_each_fasta_record(fasta, |name, seq| {
        if wanted.contains(normalize_gene_id(&name)) {
            write_fasta_record(writer, &name, &seq)?;
            written.push(name);
        }
        Ok(())
    })?;
    Ok(written)
}
