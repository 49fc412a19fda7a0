//! Extraction of promoter sequences for a list of genes from a genome-wide
//! upstream sequence FASTA (e.g. TAIR10's `upstream_1000` set).

use indexmap::IndexSet;
use log::{debug, info};
use std::path::PathBuf;

use crate::error::CisGrnError;
use crate::gene_id::GeneIdPattern;
use crate::sequences::nucleotide::{for_each_fasta_record, gc_content_strict, write_fasta_record};

/// What was written by [`extract_promoters`].
#[derive(Clone, Debug, Default)]
pub struct PromoterExtraction {
    /// Loci of the written records, in file order (a locus with several
    /// records appears once per record).
    pub written: Vec<String>,
    /// Requested loci with no promoter record, in request order.
    pub missing: Vec<String>,
    /// Mean GC content of the written sequences; NaN if none were written.
    pub mean_gc: f64,
}

/// Write the promoter of every FASTA record whose name starts with one of the
/// requested loci, as `>{locus}` records in file order. Records whose name does
/// not start with a locus are skipped.
pub fn extract_promoters(
    fasta: impl Into<PathBuf>,
    gene_ids: &IndexSet<String>,
    pattern: &GeneIdPattern,
    writer: &mut dyn std::io::Write,
) -> Result<PromoterExtraction, CisGrnError> {
    let mut written = Vec::new();
    let mut found = IndexSet::new();
    let mut gc_total = 0.0;
    for_each_fasta_record(fasta, |name, seq| {
        let Some(locus) = pattern.match_line(&name) else {
            debug!("no locus in FASTA record '{}'", name);
            return Ok(());
        };
        if gene_ids.contains(locus) {
            write_fasta_record(writer, locus, &seq)?;
            gc_total += gc_content_strict(&seq);
            found.insert(locus.to_string());
            written.push(locus.to_string());
        }
        Ok(())
    })?;

    let missing: Vec<String> = gene_ids
        .iter()
        .filter(|id| !found.contains(*id))
        .cloned()
        .collect();
    info!(
        "Found {} of {} requested genes in the promoter FASTA",
        found.len(),
        gene_ids.len()
    );
    let mean_gc = if written.is_empty() {
        f64::NAN
    } else {
        gc_total / written.len() as f64
    };
    Ok(PromoterExtraction {
        written,
        missing,
        mean_gc,
    })
}
