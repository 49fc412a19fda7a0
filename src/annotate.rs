//! Annotation of FIMO motif hits with their promoter sequence and gene location.

use indexmap::IndexMap;
use std::io::Write;

use crate::error::CisGrnError;
use crate::fimo::FimoHit;
use crate::gene_id::normalize_gene_id;
use crate::gff::GeneFeature;
use crate::io::ANNOTATION_CSV;
use crate::sequences::nucleotide::PromoterSequences;

pub const ANNOTATION_HEADER: [&str; 10] = [
    "Motif_ID",
    "Gene_ID",
    "Hit_Start",
    "Hit_Stop",
    "Hit_Strand",
    "Promoter_Sequence",
    "Chromosome",
    "Gene_Start",
    "Gene_Stop",
    "Gene_Strand",
];

/// Counts of hits whose gene had no promoter or annotation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationSummary {
    pub hits: usize,
    pub missing_promoter: usize,
    pub missing_annotation: usize,
}

/// Build one annotation row for a hit.
pub fn annotation_row(
    hit: &FimoHit,
    promoters: &PromoterSequences,
    features: &IndexMap<String, GeneFeature>,
) -> [String; 10] {
    let gene_id = normalize_gene_id(&hit.sequence_name);
    let missing = || ANNOTATION_CSV.no_value_string.clone();
    let sequence = promoters
        .get(gene_id)
        .map_or_else(missing, |seq| String::from_utf8_lossy(seq).into_owned());
    let feature = features.get(gene_id);
    [
        hit.motif_id.clone(),
        gene_id.to_string(),
        hit.start.to_string(),
        hit.stop.to_string(),
        hit.strand.clone(),
        sequence,
        feature.map_or_else(missing, |f| f.chromosome.clone()),
        feature.map_or_else(missing, |f| f.start.clone()),
        feature.map_or_else(missing, |f| f.stop.clone()),
        feature.map_or_else(missing, |f| f.strand.clone()),
    ]
}

/// Write the annotated hits table as CSV, one row per hit in FIMO order.
pub fn write_annotated_hits(
    writer: Box<dyn Write>,
    hits: &[FimoHit],
    promoters: &PromoterSequences,
    features: &IndexMap<String, GeneFeature>,
) -> Result<AnnotationSummary, CisGrnError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(ANNOTATION_HEADER)?;
    let mut summary = AnnotationSummary::default();
    for hit in hits {
        let gene_id = normalize_gene_id(&hit.sequence_name);
        if promoters.get(gene_id).is_none() {
            summary.missing_promoter += 1;
        }
        if !features.contains_key(gene_id) {
            summary.missing_annotation += 1;
        }
        csv_writer.write_record(annotation_row(hit, promoters, features))?;
        summary.hits += 1;
    }
    csv_writer.flush()?;
    Ok(summary)
}
