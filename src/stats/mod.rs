//! Statistical tests used by the motif enrichment stages.

pub mod empirical;
pub mod fdr;
pub mod fisher;

pub use empirical::{empirical_p_value, null_mean};
pub use fdr::benjamini_hochberg;
pub use fisher::{fisher_exact, ContingencyTable, FisherResult};
