//! # cisgrn: promoter motif enrichment and gene regulatory network analysis
//!
//! `cisgrn` is a library and command line tool for a sequence of analyses that
//! connect a cluster of co-expressed genes to the transcription factors that may
//! regulate them:
//!
//!  1. [`background`]: select an expression-matched background gene set and its
//!     promoters, to compare a cluster's promoters against.
//!  2. [`promoters`]: extract the promoter sequences of a list of genes.
//!  3. [`grn`]: infer a regulatory network from expression data with
//!     GRNBoost2-style boosted trees, and assess its robustness to node removal.
//!  4. [`annotate`]: join FIMO motif hits with promoter sequences and GFF3 gene
//!     locations.
//!  5. [`enrichment`]: test motifs for enrichment against the background with
//!     Fisher's exact test.
//!  6. [`shuffle_control`]: test motifs against shuffled promoter sequences with
//!     empirical p-values.
//!
//! Motif scanning itself is done by FIMO from the MEME Suite, which is run as an
//! external program (see [`fimo::FimoRunner`]).

pub mod annotate;
pub mod background;
pub mod commands;
pub mod enrichment;
pub mod error;
pub mod expression;
pub mod fimo;
pub mod gene_id;
pub mod gff;
pub mod grn;
pub mod io;
pub mod promoters;
pub mod reporting;
pub mod sequences;
pub mod shuffle_control;
pub mod stats;
pub mod test_utilities;

/// The expression table column holding gene IDs.
pub const DEFAULT_ID_COLUMN: &str = "ID";
/// The expression table column holding cluster labels.
pub const DEFAULT_CLUSTER_COLUMN: &str = "cl";
/// The first sample column (0-indexed) in a positional expression layout.
pub const DEFAULT_FIRST_SAMPLE_COLUMN: usize = 9;
/// The foreground cluster for background selection.
pub const DEFAULT_CLUSTER: &str = "3";
pub const DEFAULT_FIMO_BINARY: &str = "fimo";

pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_SHUFFLE_ROUNDS: usize = 100;

pub const DEFAULT_SEED: u64 = 666;
pub const DEFAULT_THREADS: usize = 4;
/// Network edges must have importance strictly above this.
pub const DEFAULT_IMPORTANCE_THRESHOLD: f64 = 2.0;
pub const DEFAULT_TOP_REMOVALS: usize = 100;
pub const DEFAULT_TOP_HIGHLIGHT: usize = 20;

pub mod prelude {
    pub use crate::error::CisGrnError;
    pub use crate::expression::{ExpressionLayout, ExpressionMatrix, InferenceMatrix, SampleColumns};
    pub use crate::fimo::{read_fimo_hits, FimoHit, FimoRunner};
    pub use crate::gene_id::{normalize_gene_id, strip_version_suffix, GeneIdPattern};
    pub use crate::grn::{
        BoostParams, InferenceParams, RegulatoryEdge, RegulatoryNetwork, RobustnessParams,
    };
    pub use crate::io::{InputFile, OutputFile};
    pub use crate::reporting::{CommandOutput, Report};
    pub use crate::sequences::nucleotide::{Nucleotides, PromoterSequences};
}
