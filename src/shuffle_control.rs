//! Shuffled-sequence controls for motif enrichment.
//!
//! The real promoter set is shuffled many times (preserving base composition),
//! FIMO is run on each shuffle, and the per-motif sum of FIMO scores in the real
//! set is compared against the shuffled score sums. The control directory has
//! this layout:
//!
//! ```text
//! control_dir/
//!   fimo_real/fimo.tsv
//!   shuffled_0.fa
//!   fimo_shuffled_0/fimo.tsv
//!   shuffled_1.fa
//!   ...
//! ```

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::CisGrnError;
use crate::fimo::{read_fimo_hits, FimoHit, FimoRunner, FIMO_TSV};
use crate::io::tsv::{build_csv_writer, serialize_float, serialize_pybool};
use crate::io::OutputFile;
use crate::reporting::Report;
use crate::sequences::nucleotide::write_shuffled_fasta;
use crate::stats::{benjamini_hochberg, empirical_p_value, null_mean};

/// The FIMO output directory for the real promoter set.
pub fn real_fimo_dir(control_dir: &Path) -> PathBuf {
    control_dir.join("fimo_real")
}

/// The shuffled FASTA file of round `round`.
pub fn shuffled_fasta_path(control_dir: &Path, round: usize) -> PathBuf {
    control_dir.join(format!("shuffled_{}.fa", round))
}

/// The FIMO output directory of round `round`.
pub fn shuffled_fimo_dir(control_dir: &Path, round: usize) -> PathBuf {
    control_dir.join(format!("fimo_shuffled_{}", round))
}

/// The random number generator for one shuffle round. With a seed, round `i`
/// always uses `seed + i`.
fn round_rng(seed: Option<u64>, round: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(round as u64)),
        None => StdRng::from_entropy(),
    }
}

/// Write `rounds` shuffled copies of `fasta` into `control_dir`. When a FIMO
/// runner and motif file are given, FIMO is run on the real set and then on each
/// shuffle. Returns the shuffled FASTA paths.
pub fn generate_shuffled_controls(
    fasta: &Path,
    control_dir: &Path,
    rounds: usize,
    seed: Option<u64>,
    fimo: Option<(&FimoRunner, &Path)>,
) -> Result<Vec<PathBuf>, CisGrnError> {
    std::fs::create_dir_all(control_dir)?;
    if let Some((runner, motifs)) = fimo {
        runner.run(motifs, fasta, real_fimo_dir(control_dir))?;
    }

    let mut paths = Vec::with_capacity(rounds);
    for round in 0..rounds {
        info!("Shuffle round {}/{}", round + 1, rounds);
        let path = shuffled_fasta_path(control_dir, round);
        let mut rng = round_rng(seed, round);
        let output = OutputFile::new(&path);
        let mut writer = output.writer()?;
        let n = write_shuffled_fasta(fasta, &mut writer, &mut rng)?;
        writer.flush()?;
        drop(writer);
        debug!("wrote {} shuffled sequences to '{}'", n, path.display());

        if let Some((runner, motifs)) = fimo {
            runner.run(motifs, &path, shuffled_fimo_dir(control_dir, round))?;
        }
        paths.push(path);
    }
    Ok(paths)
}

/// The sum of FIMO scores per motif, in sorted motif order. Hits without a score
/// contribute nothing.
pub fn score_sums(hits: &[FimoHit]) -> BTreeMap<String, f64> {
    let mut sums = BTreeMap::new();
    for hit in hits {
        *sums.entry(hit.motif_id.clone()).or_insert(0.0) += hit.score.unwrap_or(0.0);
    }
    sums
}

/// Load the per-motif score sums of every shuffle round in `0..rounds` whose
/// `fimo.tsv` exists. Missing rounds are noted in the report.
pub fn load_shuffled_score_sums(
    control_dir: &Path,
    rounds: usize,
    report: &mut Report,
) -> Result<Vec<BTreeMap<String, f64>>, CisGrnError> {
    let mut sums = Vec::new();
    let mut missing = Vec::new();
    for round in 0..rounds {
        let path = shuffled_fimo_dir(control_dir, round).join(FIMO_TSV);
        if !path.exists() {
            debug!("missing FIMO shuffle file {}", path.display());
            missing.push(round);
            continue;
        }
        let hits = read_fimo_hits(&path, report)?;
        sums.push(score_sums(&hits));
    }
    if !missing.is_empty() {
        let rounds: Vec<String> = missing.iter().map(|r| r.to_string()).collect();
        report.add_issue(format!(
            "{} shuffle rounds had no FIMO output and were skipped: {}",
            missing.len(),
            rounds.join(", ")
        ));
    }
    Ok(sums)
}

pub const EMPIRICAL_HEADER: [&str; 7] = [
    "motif_id",
    "Real_Score_Sum",
    "Shuffled_Mean_Score",
    "P_Value",
    "Adjusted_P",
    "Score_Difference",
    "Significant",
];

/// One row of the empirical comparison table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmpiricalResult {
    pub motif_id: String,
    #[serde(rename = "Real_Score_Sum", serialize_with = "serialize_float")]
    pub real_score_sum: f64,
    #[serde(rename = "Shuffled_Mean_Score", serialize_with = "serialize_float")]
    pub shuffled_mean_score: f64,
    #[serde(rename = "P_Value", serialize_with = "serialize_float")]
    pub p_value: f64,
    #[serde(rename = "Adjusted_P", serialize_with = "serialize_float")]
    pub adjusted_p: f64,
    #[serde(rename = "Score_Difference", serialize_with = "serialize_float")]
    pub score_difference: f64,
    #[serde(rename = "Significant", serialize_with = "serialize_pybool")]
    pub significant: bool,
}

/// Compare real per-motif score sums against the shuffled rounds.
///
/// Each motif's null distribution has one value per round: the round's score sum
/// for that motif, or zero if the motif had no hits in that round. Rows are in
/// sorted motif order, and `Significant` means `Adjusted_P < alpha`.
pub fn empirical_results(
    real: &BTreeMap<String, f64>,
    shuffled: &[BTreeMap<String, f64>],
    alpha: f64,
) -> Vec<EmpiricalResult> {
    let mut results: Vec<EmpiricalResult> = real
        .iter()
        .map(|(motif, &real_score)| {
            let null: Vec<f64> = shuffled
                .iter()
                .map(|round| round.get(motif).copied().unwrap_or(0.0))
                .collect();
            let mean = null_mean(&null);
            EmpiricalResult {
                motif_id: motif.clone(),
                real_score_sum: real_score,
                shuffled_mean_score: mean,
                p_value: empirical_p_value(real_score, &null),
                adjusted_p: f64::NAN,
                score_difference: real_score - mean,
                significant: false,
            }
        })
        .collect();

    let p_values: Vec<f64> = results.iter().map(|r| r.p_value).collect();
    for (result, adjusted) in results.iter_mut().zip(benjamini_hochberg(&p_values)) {
        result.adjusted_p = adjusted;
        result.significant = adjusted < alpha;
    }
    results
}

/// Significant motifs scoring higher in the real set than in the shuffles, by
/// score difference, largest first.
pub fn enriched_over_shuffled(results: &[EmpiricalResult]) -> Vec<&EmpiricalResult> {
    let mut kept: Vec<&EmpiricalResult> = results
        .iter()
        .filter(|r| r.score_difference > 0.0 && r.significant)
        .collect();
    kept.sort_by(|a, b| b.score_difference.total_cmp(&a.score_difference));
    kept
}

/// Run the empirical comparison from the FIMO outputs in a control directory.
///
/// `real_fimo` overrides the default `control_dir/fimo_real/fimo.tsv`. It is an
/// error if none of the shuffle rounds produced output.
pub fn compute_empirical_results(
    control_dir: &Path,
    real_fimo: Option<&Path>,
    rounds: usize,
    alpha: f64,
    report: &mut Report,
) -> Result<Vec<EmpiricalResult>, CisGrnError> {
    let real_path = real_fimo
        .map(Path::to_path_buf)
        .unwrap_or_else(|| real_fimo_dir(control_dir).join(FIMO_TSV));
    let real_hits = read_fimo_hits(&real_path, report)?;
    let real = score_sums(&real_hits);
    info!("Real promoter set: {} motifs with hits", real.len());

    let shuffled = load_shuffled_score_sums(control_dir, rounds, report)?;
    if shuffled.is_empty() {
        return Err(CisGrnError::NoShuffledControls(
            control_dir.display().to_string(),
        ));
    }
    info!("Loaded {} shuffled control rounds", shuffled.len());
    Ok(empirical_results(&real, &shuffled, alpha))
}

/// Write empirical results as CSV.
pub fn write_empirical_table<'a>(
    output: &OutputFile,
    results: impl IntoIterator<Item = &'a EmpiricalResult>,
) -> Result<(), CisGrnError> {
    let mut writer = build_csv_writer(output)?;
    let mut written = 0;
    for result in results {
        writer.serialize(result)?;
        written += 1;
    }
    if written == 0 {
        writer.write_record(EMPIRICAL_HEADER)?;
    }
    writer.flush()?;
    Ok(())
}
