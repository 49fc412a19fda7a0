//! Ranking of removed nodes by how much they fragment the network.

use serde::Serialize;
use std::collections::HashSet;

use crate::error::CisGrnError;
use crate::grn::robustness::PerturbationResult;
use crate::io::tsv::{build_csv_writer, serialize_option_float};
use crate::io::OutputFile;

pub const RANKING_HEADER: [&str; 6] = [
    "Removed_TF",
    "Original_Degree",
    "num_components",
    "avg_path_length",
    "largest_component_size",
    "Highlight",
];

/// A perturbation result with its disruption category.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedDisruption {
    #[serde(rename = "Removed_TF")]
    pub removed: String,
    #[serde(rename = "Original_Degree")]
    pub original_degree: usize,
    pub num_components: usize,
    #[serde(serialize_with = "serialize_option_float")]
    pub avg_path_length: Option<f64>,
    pub largest_component_size: usize,
    /// `Top {n}` for the most disruptive removals, `Other` for the rest.
    #[serde(rename = "Highlight")]
    pub highlight: String,
}

/// Sort perturbation results by the number of components left after removal
/// (most first, ties in input order) and label the removals among the first
/// `top` as `Top {top}`.
pub fn rank_disruptions(mut results: Vec<PerturbationResult>, top: usize) -> Vec<RankedDisruption> {
    results.sort_by(|a, b| b.num_components.cmp(&a.num_components));
    let top_label = format!("Top {}", top);
    let top_names: HashSet<String> = results
        .iter()
        .take(top)
        .map(|r| r.removed.clone())
        .collect();
    results
        .into_iter()
        .map(|r| {
            let highlight = if top_names.contains(&r.removed) {
                top_label.clone()
            } else {
                "Other".to_string()
            };
            RankedDisruption {
                removed: r.removed,
                original_degree: r.original_degree,
                num_components: r.num_components,
                avg_path_length: r.avg_path_length,
                largest_component_size: r.largest_component_size,
                highlight,
            }
        })
        .collect()
}

pub fn write_ranked_disruptions(
    output: &OutputFile,
    ranked: &[RankedDisruption],
) -> Result<(), CisGrnError> {
    let mut writer = build_csv_writer(output)?;
    if ranked.is_empty() {
        writer.write_record(RANKING_HEADER)?;
    }
    for row in ranked {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
