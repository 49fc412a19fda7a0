//! Functionality for working with promoter nucleotide sequences.
//!
//! Promoter sets are small enough (tens of thousands of ~1 kb records) to be held
//! in memory as [`nucleotide::PromoterSequences`]. Very large FASTA files can be
//! streamed with [`nucleotide::for_each_fasta_record`] instead.

pub mod nucleotide;
