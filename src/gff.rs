//! Minimal GFF3 gene feature parsing.
//!
//! Only `gene` features are read, and only their location and `ID` attribute.

use indexmap::IndexMap;
use std::io::BufRead;
use std::path::PathBuf;

use crate::error::CisGrnError;
use crate::gene_id::normalize_gene_id;
use crate::io::InputFile;

/// The genomic location of a gene.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneFeature {
    pub chromosome: String,
    pub start: String,
    pub stop: String,
    pub strand: String,
}

/// Extract the value of the `ID=` attribute from a GFF3 attribute column.
pub fn parse_id_attribute(attributes: &str) -> Option<&str> {
    let (_, rest) = attributes.split_once("ID=")?;
    Some(rest.split(';').next().unwrap_or(rest))
}

/// Parse one GFF3 line into a normalized gene ID and its [`GeneFeature`]. Returns
/// `None` for comments, short lines, non-gene features, and genes without an ID.
pub fn parse_gene_line(line: &str) -> Option<(String, GeneFeature)> {
    if line.starts_with('#') {
        return None;
    }
    let columns: Vec<&str> = line.trim().split('\t').collect();
    if columns.len() < 9 || columns[2] != "gene" {
        return None;
    }
    let id = parse_id_attribute(columns[8])?;
    let feature = GeneFeature {
        chromosome: columns[0].to_string(),
        start: columns[3].to_string(),
        stop: columns[4].to_string(),
        strand: columns[6].to_string(),
    };
    Some((normalize_gene_id(id).to_string(), feature))
}

/// Read all gene features from a (possibly gzipped) GFF3 file, keyed by
/// normalized gene ID. A later feature with the same ID replaces the earlier one.
pub fn read_gene_features(
    filepath: impl Into<PathBuf>,
) -> Result<IndexMap<String, GeneFeature>, CisGrnError> {
    let reader = InputFile::new(filepath).reader()?;
    let mut features = IndexMap::new();
    for line in reader.lines() {
        let line = line?;
        if let Some((id, feature)) = parse_gene_line(&line) {
            features.insert(id, feature);
        }
    }
    Ok(features)
}
