//! Motif enrichment of a foreground promoter set against a background set,
//! with Fisher's exact test on motif hit counts.
//!
//! For each motif, the hit counts of that motif are compared to the hit counts
//! of all other motifs, between foreground and background:
//!
//! |            | this motif | other motifs      |
//! |------------|------------|-------------------|
//! | foreground | `a`        | `total_fg - a`    |
//! | background | `b`        | `total_bg - b`    |
//!
//! P-values are then adjusted with Benjamini-Hochberg across all motifs.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use crate::error::CisGrnError;
use crate::fimo::FimoHit;
use crate::io::tsv::{build_csv_writer, serialize_float};
use crate::io::OutputFile;
use crate::stats::{benjamini_hochberg, fisher_exact, ContingencyTable};

/// Hit counts per motif, in sorted motif order.
pub fn motif_counts(hits: &[FimoHit]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for hit in hits {
        *counts.entry(hit.motif_id.clone()).or_insert(0) += 1;
    }
    counts
}

pub const ENRICHMENT_HEADER: [&str; 6] = [
    "Motif",
    "Foreground_Count",
    "Background_Count",
    "Odds_Ratio",
    "P_Value",
    "Adj_P_Value",
];

/// One row of the enrichment table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MotifEnrichment {
    #[serde(rename = "Motif")]
    pub motif: String,
    #[serde(rename = "Foreground_Count")]
    pub foreground_count: u64,
    #[serde(rename = "Background_Count")]
    pub background_count: u64,
    #[serde(rename = "Odds_Ratio", serialize_with = "serialize_float")]
    pub odds_ratio: f64,
    #[serde(rename = "P_Value", serialize_with = "serialize_float")]
    pub p_value: f64,
    #[serde(rename = "Adj_P_Value", serialize_with = "serialize_float")]
    pub adjusted_p_value: f64,
}

impl MotifEnrichment {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.adjusted_p_value < alpha
    }
}

/// Test every motif seen in either hit set for enrichment in the foreground.
///
/// Motifs are the union of both sides in sorted order; a motif absent from one
/// side has a count of zero there. The totals are the number of hits on each side.
pub fn motif_enrichment(foreground: &[FimoHit], background: &[FimoHit]) -> Vec<MotifEnrichment> {
    let fg_counts = motif_counts(foreground);
    let bg_counts = motif_counts(background);
    let total_fg = foreground.len() as u64;
    let total_bg = background.len() as u64;

    let mut motifs: Vec<&String> = fg_counts.keys().chain(bg_counts.keys()).collect();
    motifs.sort();
    motifs.dedup();

    let mut results: Vec<MotifEnrichment> = motifs
        .into_iter()
        .map(|motif| {
            let a = fg_counts.get(motif).copied().unwrap_or(0);
            let b = bg_counts.get(motif).copied().unwrap_or(0);
            let table = ContingencyTable::new(a, total_fg - a, b, total_bg - b);
            let test = fisher_exact(&table);
            MotifEnrichment {
                motif: motif.clone(),
                foreground_count: a,
                background_count: b,
                odds_ratio: test.odds_ratio,
                p_value: test.p_value,
                adjusted_p_value: f64::NAN,
            }
        })
        .collect();

    let p_values: Vec<f64> = results.iter().map(|r| r.p_value).collect();
    for (result, adjusted) in results.iter_mut().zip(benjamini_hochberg(&p_values)) {
        result.adjusted_p_value = adjusted;
    }
    results
}

/// The significant motifs (`Adj_P_Value < alpha`), by odds ratio, largest first.
/// Motifs with equal odds ratios keep their table order.
pub fn enriched_motifs(results: &[MotifEnrichment], alpha: f64) -> Vec<&MotifEnrichment> {
    let mut significant: Vec<&MotifEnrichment> =
        results.iter().filter(|r| r.is_significant(alpha)).collect();
    significant.sort_by(|a, b| b.odds_ratio.total_cmp(&a.odds_ratio));
    significant
}

/// Write the enrichment table as CSV.
pub fn write_enrichment_table(
    output: &OutputFile,
    results: &[MotifEnrichment],
) -> Result<(), CisGrnError> {
    let mut writer = build_csv_writer(output)?;
    if results.is_empty() {
        writer.write_record(ENRICHMENT_HEADER)?;
    }
    for result in results {
        writer.serialize(result)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write motif IDs one per line.
pub fn write_motif_ids(output: &OutputFile, motifs: &[&MotifEnrichment]) -> Result<(), CisGrnError> {
    let mut writer = output.writer()?;
    for motif in motifs {
        writeln!(writer, "{}", motif.motif)?;
    }
    writer.flush()?;
    Ok(())
}
