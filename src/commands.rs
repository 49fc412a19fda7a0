//! Command functions that implement each of the `cisgrn` subcommands.
//!
//! Each function runs one pipeline stage from input paths to output files, and
//! returns a [`CommandOutput`] whose [`Report`] lists the recoverable issues
//! that came up along the way.

use indexmap::IndexSet;
use log::{info, warn};
use std::io::Write;
use std::path::PathBuf;

use crate::annotate::write_annotated_hits;
use crate::background::{filter_promoters, select_background};
use crate::enrichment::{enriched_motifs, motif_enrichment, write_enrichment_table, write_motif_ids};
use crate::error::CisGrnError;
use crate::expression::{ExpressionLayout, ExpressionMatrix};
use crate::fimo::{read_fimo_hits, FimoRunner};
use crate::gene_id::{read_gene_ids, GeneIdPattern};
use crate::gff::read_gene_features;
use crate::grn::infer::{infer_network, read_tf_list, select_regulators, InferenceParams};
use crate::grn::network::{read_edges, write_edges, RegulatoryNetwork};
use crate::grn::ranking::{rank_disruptions, write_ranked_disruptions};
use crate::grn::robustness::{
    perturbation_analysis, read_perturbation_results, write_perturbation_results,
    RobustnessParams,
};
use crate::io::OutputFile;
use crate::promoters::extract_promoters;
use crate::reporting::{CommandOutput, Report};
use crate::sequences::nucleotide::PromoterSequences;
use crate::shuffle_control::{
    compute_empirical_results, enriched_over_shuffled, generate_shuffled_controls,
    write_empirical_table,
};

/// The number of promoter headers shown after background filtering.
const SHOWN_HEADERS: usize = 5;

/// Where to write the outputs of background selection.
#[derive(Clone, Debug)]
pub struct BackgroundOutputs {
    /// Background gene IDs, one per line.
    pub gene_ids: PathBuf,
    /// Background promoter FASTA.
    pub promoters: PathBuf,
    /// FIMO output directory; FIMO is run only if this and a motif file are given.
    pub fimo_dir: Option<PathBuf>,
}

/// Select an expression-matched background for a cluster, write its gene IDs
/// and promoters, and optionally scan the promoters with FIMO.
pub fn cisgrn_background(
    expression: &PathBuf,
    layout: &ExpressionLayout,
    cluster: &str,
    promoter_fasta: &PathBuf,
    outputs: &BackgroundOutputs,
    motifs: Option<&PathBuf>,
    runner: &FimoRunner,
) -> Result<CommandOutput<()>, CisGrnError> {
    let mut report = Report::new();
    let matrix = ExpressionMatrix::from_path(expression, layout)?;
    info!(
        "Loaded {} genes × {} samples from '{}'",
        matrix.len(),
        matrix.samples().len(),
        expression.display()
    );
    let selection = select_background(&matrix, cluster, &mut report)?;

    let ids_output = OutputFile::new(&outputs.gene_ids);
    let mut writer = ids_output.writer()?;
    for id in selection.background_ids.iter() {
        writeln!(writer, "{}", id)?;
    }
    writer.flush()?;
    info!("Written gene list to: {}", ids_output.display_name());

    let fasta_output = OutputFile::new(&outputs.promoters);
    let mut writer = fasta_output.writer()?;
    let written = filter_promoters(promoter_fasta, &selection.background_ids, &mut writer)?;
    writer.flush()?;
    drop(writer);
    if written.is_empty() {
        warn!("No matching promoter sequences found. Check FASTA headers and gene ID format.");
        report.add_issue("no background promoter sequences were found".to_string());
    } else {
        let headers: Vec<String> = written
            .iter()
            .take(SHOWN_HEADERS)
            .map(|name| format!(">{}", name))
            .collect();
        info!("Example FASTA headers: {}", headers.join(" "));
        info!(
            "{} promoter sequences matched out of {} genes",
            written.len(),
            selection.background_ids.len()
        );
    }
    info!("Filtered promoter FASTA written to: {}", fasta_output.display_name());

    if let (Some(motifs), Some(fimo_dir)) = (motifs, outputs.fimo_dir.as_ref()) {
        let fimo_tsv = runner.run(motifs, &outputs.promoters, fimo_dir)?;
        info!("FIMO output written to: {}", fimo_tsv.display());
    }
    Ok(CommandOutput::new((), report))
}

/// Extract the promoters of the genes listed in `gene_ids` from a promoter FASTA.
pub fn cisgrn_promoters(
    gene_ids: &PathBuf,
    promoter_fasta: &PathBuf,
    pattern: &GeneIdPattern,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, CisGrnError> {
    let mut report = Report::new();
    let ids: IndexSet<String> = read_gene_ids(gene_ids, pattern)?;
    info!("Extracted {} gene IDs from '{}'", ids.len(), gene_ids.display());

    let output = OutputFile::from_option(output);
    let mut writer = output.writer()?;
    let extraction = extract_promoters(promoter_fasta, &ids, pattern, &mut writer)?;
    writer.flush()?;

    if !extraction.written.is_empty() {
        info!(
            "{} sequences written to {} (mean GC content {:.3})",
            extraction.written.len(),
            output.display_name(),
            extraction.mean_gc
        );
    }
    if !extraction.missing.is_empty() {
        let shown: Vec<&str> = extraction.missing.iter().take(10).map(|s| s.as_str()).collect();
        report.add_issue(format!(
            "{} requested genes had no promoter sequence (first: {})",
            extraction.missing.len(),
            shown.join(", ")
        ));
    }
    Ok(CommandOutput::new((), report))
}

/// Annotate FIMO hits with their promoter sequence and GFF3 gene location.
pub fn cisgrn_annotate(
    fimo_tsv: &PathBuf,
    promoter_fasta: &PathBuf,
    gff: &PathBuf,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, CisGrnError> {
    let mut report = Report::new();
    let hits = read_fimo_hits(fimo_tsv, &mut report)?;
    let promoters = PromoterSequences::from_fasta_normalized(promoter_fasta)?;
    let features = read_gene_features(gff)?;
    info!(
        "{} FIMO hits, {} promoters, {} annotated genes",
        hits.len(),
        promoters.len(),
        features.len()
    );

    let output = OutputFile::from_option(output);
    let summary = write_annotated_hits(output.writer()?, &hits, &promoters, &features)?;
    report.add_count_issue(summary.missing_promoter, "hits had no promoter sequence");
    report.add_count_issue(summary.missing_annotation, "hits had no GFF3 gene annotation");
    info!(
        "Annotated {} hits, written to {}",
        summary.hits,
        output.display_name()
    );
    Ok(CommandOutput::new((), report))
}

/// Test motifs for enrichment in foreground FIMO hits against background hits.
pub fn cisgrn_enrich(
    foreground: &PathBuf,
    background: &PathBuf,
    output: Option<&PathBuf>,
    enriched_ids: Option<&PathBuf>,
    alpha: f64,
) -> Result<CommandOutput<()>, CisGrnError> {
    let mut report = Report::new();
    let fg_hits = read_fimo_hits(foreground, &mut report)?;
    let bg_hits = read_fimo_hits(background, &mut report)?;

    let results = motif_enrichment(&fg_hits, &bg_hits);
    let significant = enriched_motifs(&results, alpha);
    info!(
        "{} motifs tested, {} significant at FDR < {}",
        results.len(),
        significant.len(),
        alpha
    );

    let table = OutputFile::from_option(output);
    write_enrichment_table(&table, &results)?;
    info!("Enrichment results saved to: {}", table.display_name());
    if let Some(path) = enriched_ids {
        let ids = OutputFile::new(path);
        write_motif_ids(&ids, &significant)?;
        info!("Enriched motif list saved to: {}", ids.display_name());
    }
    Ok(CommandOutput::new((), report))
}

/// Write shuffled copies of a promoter FASTA into a control directory, and
/// (unless `skip_fimo`) run FIMO on the real and shuffled sets.
pub fn cisgrn_shuffle(
    promoter_fasta: &PathBuf,
    control_dir: &PathBuf,
    rounds: usize,
    seed: Option<u64>,
    motifs: Option<&PathBuf>,
    runner: &FimoRunner,
    skip_fimo: bool,
) -> Result<CommandOutput<()>, CisGrnError> {
    let report = Report::new();
    let fimo = if skip_fimo {
        None
    } else {
        let motifs = motifs.ok_or_else(|| {
            CisGrnError::InvalidParameter(
                "a motif file (--motifs) is required unless --skip-fimo is set".to_string(),
            )
        })?;
        Some((runner, motifs.as_path()))
    };
    let paths = generate_shuffled_controls(promoter_fasta, control_dir, rounds, seed, fimo)?;
    info!(
        "{} shuffled promoter sets written to '{}'",
        paths.len(),
        control_dir.display()
    );
    Ok(CommandOutput::new((), report))
}

/// Compute empirical p-values of real motif score sums against shuffled controls.
pub fn cisgrn_empirical(
    control_dir: &PathBuf,
    real_fimo: Option<&PathBuf>,
    rounds: usize,
    alpha: f64,
    output: Option<&PathBuf>,
    filtered_output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, CisGrnError> {
    let mut report = Report::new();
    let results = compute_empirical_results(
        control_dir,
        real_fimo.map(|p| p.as_path()),
        rounds,
        alpha,
        &mut report,
    )?;

    let table = OutputFile::from_option(output);
    write_empirical_table(&table, &results)?;
    info!("Empirical p-values saved to: {}", table.display_name());

    let enriched = enriched_over_shuffled(&results);
    info!(
        "{} of {} motifs score significantly higher than in shuffled sequences",
        enriched.len(),
        results.len()
    );
    if let Some(path) = filtered_output {
        let filtered = OutputFile::new(path);
        write_empirical_table(&filtered, enriched)?;
        info!("Filtered significant motifs saved to: {}", filtered.display_name());
    }
    Ok(CommandOutput::new((), report))
}

/// Inputs and settings of network inference.
#[derive(Clone, Debug)]
pub struct InferenceOptions {
    pub layout: ExpressionLayout,
    /// Strip version suffixes from the transcription factor IDs.
    pub strip_versions: bool,
    /// Drop genes (and transcription factors) with zero sample standard deviation.
    pub drop_invariant: bool,
    pub params: InferenceParams,
    pub threads: usize,
}

/// Infer a gene regulatory network from an expression matrix and a list of
/// transcription factors.
pub fn cisgrn_infer(
    expression: &PathBuf,
    tf_list: &PathBuf,
    options: &InferenceOptions,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, CisGrnError> {
    let mut report = Report::new();
    info!("Loading expression matrix...");
    let matrix = ExpressionMatrix::from_path(expression, &options.layout)?;
    // expression IDs lose their version suffixes in both variants
    let matrix = matrix.for_inference(true, options.drop_invariant)?;
    let summary = matrix.summary();
    report.add_count_issue(
        summary.missing_values,
        "genes with missing expression values were excluded",
    );
    report.add_count_issue(summary.duplicates, "duplicate gene rows were excluded");
    report.add_count_issue(summary.invariant, "genes without variation were excluded");
    let first: Vec<&str> = matrix.genes().take(5).map(|g| g.as_str()).collect();
    info!(
        "Expression matrix: {} samples × {} genes (first genes: {})",
        matrix.n_samples(),
        matrix.n_genes(),
        first.join(", ")
    );

    info!("Loading TF list...");
    let tfs = read_tf_list(tf_list, options.strip_versions)?;
    let regulators = select_regulators(&tfs, &matrix, options.drop_invariant)?;
    info!("TFs matched in data: {}", regulators.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .build()?;
    let edges = pool.install(|| infer_network(&matrix, &regulators, &options.params))?;
    if edges.is_empty() {
        warn!("Network inference returned an empty network.");
        report.add_issue("the inferred network has no links".to_string());
    }

    let output = OutputFile::from_option(output);
    write_edges(&output, &edges)?;
    info!("Network written to {}", output.display_name());
    Ok(CommandOutput::new((), report))
}

/// Remove each of the highest-degree nodes of a network in turn and record the
/// resulting topology.
pub fn cisgrn_perturb(
    network: &PathBuf,
    params: &RobustnessParams,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, CisGrnError> {
    let report = Report::new();
    let edges = read_edges(network)?;
    let graph = RegulatoryNetwork::from_edges(&edges, params.threshold);
    info!(
        "Retained {} of {} edges with importance > {}",
        graph.edge_count(),
        edges.len(),
        params.threshold
    );
    info!(
        "Network: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    let results = perturbation_analysis(&graph, params.top);
    let output = OutputFile::from_option(output);
    write_perturbation_results(&output, &results)?;
    info!("Perturbation results written to {}", output.display_name());
    Ok(CommandOutput::new((), report))
}

/// Rank perturbation results by fragmentation and label the top removals.
pub fn cisgrn_rank(
    perturbation: &PathBuf,
    top: usize,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, CisGrnError> {
    let report = Report::new();
    let results = read_perturbation_results(perturbation)?;
    let ranked = rank_disruptions(results, top);
    let output = OutputFile::from_option(output);
    write_ranked_disruptions(&output, &ranked)?;
    info!(
        "{} ranked removals written to {}",
        ranked.len(),
        output.display_name()
    );
    Ok(CommandOutput::new((), report))
}

/// Write a random GRN edge list, for benchmarking.
#[cfg(feature = "dev-commands")]
pub fn cisgrn_random_network(
    num_genes: usize,
    num_edges: usize,
    seed: u64,
    output: Option<impl Into<PathBuf>>,
) -> Result<CommandOutput<()>, CisGrnError> {
    let edges = crate::test_utilities::random_network(num_genes, num_edges, seed);
    let output = OutputFile::from_option(output);
    write_edges(&output, &edges)?;
    Ok(CommandOutput::new((), Report::new()))
}
