//! Network robustness under removal of high-degree nodes.
//!
//! The highest-degree nodes of a network are removed one at a time, each from a
//! fresh copy of the network, and the resulting topology is summarized.

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CisGrnError;
use crate::grn::network::RegulatoryNetwork;
use crate::io::tsv::{build_csv_writer, deserialize_option_float, serialize_option_float};
use crate::io::{OutputFile, TsvRecordIterator};
use crate::{DEFAULT_IMPORTANCE_THRESHOLD, DEFAULT_TOP_REMOVALS};

/// Perturbation analysis settings.
#[derive(Clone, Debug, PartialEq)]
pub struct RobustnessParams {
    /// Only edges with importance strictly above this are part of the network.
    pub threshold: f64,
    /// The number of highest-degree nodes to remove.
    pub top: usize,
}

impl Default for RobustnessParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_IMPORTANCE_THRESHOLD,
            top: DEFAULT_TOP_REMOVALS,
        }
    }
}

/// The topology of the network after removing one node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerturbationResult {
    #[serde(rename = "Removed_TF")]
    pub removed: String,
    #[serde(rename = "Original_Degree")]
    pub original_degree: usize,
    pub num_components: usize,
    #[serde(
        serialize_with = "serialize_option_float",
        deserialize_with = "deserialize_option_float"
    )]
    pub avg_path_length: Option<f64>,
    pub largest_component_size: usize,
}

/// Remove each of the `top` highest-degree nodes in turn and measure the
/// network. Results are in degree rank order.
pub fn perturbation_analysis(network: &RegulatoryNetwork, top: usize) -> Vec<PerturbationResult> {
    let ranked: Vec<(String, usize)> = network.ranked_by_degree().into_iter().take(top).collect();
    info!(
        "Removing the top {} of {} nodes, one at a time",
        ranked.len(),
        network.node_count()
    );
    ranked
        .into_par_iter()
        .map(|(name, degree)| {
            let stats = network.without_node(&name).stats();
            PerturbationResult {
                removed: name,
                original_degree: degree,
                num_components: stats.num_components,
                avg_path_length: stats.avg_path_length,
                largest_component_size: stats.largest_component_size,
            }
        })
        .collect()
}

pub fn write_perturbation_results(
    output: &OutputFile,
    results: &[PerturbationResult],
) -> Result<(), CisGrnError> {
    let mut writer = build_csv_writer(output)?;
    if results.is_empty() {
        writer.write_record([
            "Removed_TF",
            "Original_Degree",
            "num_components",
            "avg_path_length",
            "largest_component_size",
        ])?;
    }
    for result in results {
        writer.serialize(result)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a perturbation table. The delimiter follows the file extension.
pub fn read_perturbation_results(
    filepath: impl Into<PathBuf>,
) -> Result<Vec<PerturbationResult>, CisGrnError> {
    let iter: TsvRecordIterator<PerturbationResult> = TsvRecordIterator::new(filepath)?;
    iter.collect()
}
