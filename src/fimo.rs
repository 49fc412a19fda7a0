//! FIMO (MEME Suite) motif scan output, and running the external `fimo` binary.
//!
//! FIMO's `fimo.tsv` has a header row, one row per motif occurrence, and a few
//! trailing `#` provenance lines. Only the occurrence rows are parsed here.

use log::{debug, info};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::CisGrnError;
use crate::io::tsv::{deserialize_option_float, TsvRecordIterator};
use crate::reporting::Report;
use crate::DEFAULT_FIMO_BINARY;

/// The name of the results table inside a FIMO output directory.
pub const FIMO_TSV: &str = "fimo.tsv";

/// One motif occurrence reported by FIMO.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FimoHit {
    pub motif_id: String,
    #[serde(default)]
    pub motif_alt_id: String,
    pub sequence_name: String,
    pub start: u64,
    pub stop: u64,
    pub strand: String,
    #[serde(default, deserialize_with = "deserialize_option_float")]
    pub score: Option<f64>,
    #[serde(default, rename = "p-value", deserialize_with = "deserialize_option_float")]
    pub p_value: Option<f64>,
    #[serde(default, rename = "q-value", deserialize_with = "deserialize_option_float")]
    pub q_value: Option<f64>,
    #[serde(default)]
    pub matched_sequence: String,
}

/// Read every motif occurrence in a `fimo.tsv` file, in file order.
///
/// Comment and blank lines are ignored. Rows that cannot be parsed (too few
/// columns, non-numeric positions) are skipped and counted in the `report`.
pub fn read_fimo_hits(
    filepath: impl Into<PathBuf>,
    report: &mut Report,
) -> Result<Vec<FimoHit>, CisGrnError> {
    let filepath = filepath.into();
    let iter: TsvRecordIterator<FimoHit> = TsvRecordIterator::with_delimiter(&filepath, b'\t')?;
    let mut hits = Vec::new();
    let mut malformed = 0;
    for result in iter {
        match result {
            Ok(hit) => hits.push(hit),
            Err(CisGrnError::CsvError(e)) if is_row_error(&e) => {
                debug!("skipping malformed FIMO row: {}", e);
                malformed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    report.add_count_issue(
        malformed,
        &format!("malformed rows were skipped in '{}'", filepath.display()),
    );
    Ok(hits)
}

/// Whether a CSV error concerns a single row (and can be skipped) rather than the
/// underlying stream.
fn is_row_error(error: &csv::Error) -> bool {
    matches!(
        error.kind(),
        csv::ErrorKind::Deserialize { .. } | csv::ErrorKind::UnequalLengths { .. }
    )
}

/// Runs the external `fimo` binary with fixed flags.
#[derive(Clone, Debug)]
pub struct FimoRunner {
    binary: PathBuf,
}

impl Default for FimoRunner {
    fn default() -> Self {
        Self::new(DEFAULT_FIMO_BINARY)
    }
}

impl FimoRunner {
    /// Create a runner for the given binary name (resolved through `PATH`) or path.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// The command line that [`FimoRunner::run`] executes.
    pub fn command(&self, motifs: &Path, fasta: &Path, outdir: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("--oc")
            .arg(outdir)
            .arg("--verbosity")
            .arg("1")
            .arg(motifs)
            .arg(fasta);
        command
    }

    /// Scan `fasta` for the motifs in `motifs` (MEME format), writing FIMO's output
    /// into `outdir`. Returns the path to the resulting `fimo.tsv`.
    pub fn run(
        &self,
        motifs: impl AsRef<Path>,
        fasta: impl AsRef<Path>,
        outdir: impl AsRef<Path>,
    ) -> Result<PathBuf, CisGrnError> {
        let outdir = outdir.as_ref();
        std::fs::create_dir_all(outdir)?;
        info!(
            "Running FIMO on '{}' into '{}'",
            fasta.as_ref().display(),
            outdir.display()
        );
        let name = self.binary.display().to_string();
        let status = self
            .command(motifs.as_ref(), fasta.as_ref(), outdir)
            .status()
            .map_err(|e| CisGrnError::ExternalCommand(name.clone(), e))?;
        if !status.success() {
            return Err(CisGrnError::ExternalCommandFailed(name, status.to_string()));
        }
        Ok(outdir.join(FIMO_TSV))
    }
}
