//! Types and methods for working with promoter nucleotide sequences.
//!
//! Currently this requires the [`noodles::fasta`] module, but their API is unstable
//! and may be a source of future pain.

use bytes::Bytes;
use indexmap::IndexMap;
use noodles::fasta;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::io::Write;
use std::ops::Deref;
use std::path::PathBuf;

use crate::error::CisGrnError;
use crate::gene_id::normalize_gene_id;
use crate::io::InputFile;

/// A newtype around raw nucleotide [`Bytes`], for making it more
/// display and other operations more convenient.
#[derive(Clone, Debug, PartialEq)]
pub struct Nucleotides(Bytes);

impl fmt::Display for Nucleotides {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // invalid UTF-8 is written with replacement characters
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl Deref for Nucleotides {
    type Target = Bytes;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<u8>> for Nucleotides {
    fn from(bytes: Vec<u8>) -> Self {
        Nucleotides(Bytes::from(bytes))
    }
}

impl From<String> for Nucleotides {
    fn from(s: String) -> Self {
        let bytes = Bytes::from(s.into_bytes());
        Nucleotides(bytes)
    }
}

impl<'a> From<&'a str> for Nucleotides {
    fn from(s: &'a str) -> Self {
        let bytes = Bytes::from(s.as_bytes().to_vec());
        Nucleotides(bytes)
    }
}

impl Nucleotides {
    /// Get the length of the nucleotide sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return whether this is an empty object.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return a copy with the bases uniformly permuted (Fisher-Yates). Base
    /// composition is preserved, dinucleotide structure is not.
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Nucleotides {
        let mut bases = self.0.to_vec();
        bases.shuffle(rng);
        Nucleotides::from(bases)
    }
}

/// Stream the records of a (possibly compressed) FASTA file, calling `func` with
/// the record name (the first word of the header) and its sequence.
///
/// Records are visited in file order, and the first error returned by `func` stops
/// the iteration.
pub fn for_each_fasta_record<F>(filepath: impl Into<PathBuf>, mut func: F) -> Result<(), CisGrnError>
where
    F: FnMut(String, Nucleotides) -> Result<(), CisGrnError>,
{
    let input = InputFile::new(filepath);
    let mut reader = fasta::Reader::new(input.reader()?);

    for result in reader.records() {
        let record = result?;
        let name = String::from_utf8(record.definition().name().to_vec())?;
        let seq = Nucleotides::from(record.sequence().as_ref().to_vec());
        func(name, seq)?;
    }
    Ok(())
}

/// Write a single FASTA record, with the sequence on one line.
pub fn write_fasta_record(
    writer: &mut dyn Write,
    name: &str,
    seq: &Nucleotides,
) -> Result<(), CisGrnError> {
    writeln!(writer, ">{}", name)?;
    writer.write_all(seq)?;
    writeln!(writer)?;
    Ok(())
}

/// Copy a FASTA file with every sequence shuffled and `_shuffled` appended to
/// each record name. Every record is written, in file order. Returns the number
/// of records written.
pub fn write_shuffled_fasta<R: Rng + ?Sized>(
    fasta: impl Into<PathBuf>,
    writer: &mut dyn Write,
    rng: &mut R,
) -> Result<usize, CisGrnError> {
    let mut written = 0;
    for_each_fasta_record(fasta, |name, seq| {
        let shuffled = seq.shuffled(rng);
        write_fasta_record(writer, &format!("{}_shuffled", name), &shuffled)?;
        written += 1;
        Ok(())
    })?;
    Ok(written)
}

/// [`PromoterSequences`] stores promoter sequences in-memory, keyed by ID,
/// in file order.
#[derive(Clone, Debug, Default)]
pub struct PromoterSequences {
    data: IndexMap<String, Nucleotides>,
}

impl PromoterSequences {
    /// Load a FASTA file keyed by *normalized* gene ID (see [`normalize_gene_id`]).
    /// A later record with the same normalized ID replaces the earlier one, and
    /// records with empty sequences are skipped.
    pub fn from_fasta_normalized(filepath: impl Into<PathBuf>) -> Result<Self, CisGrnError> {
        let mut data = IndexMap::new();
        for_each_fasta_record(filepath, |name, seq| {
            if !seq.is_empty() {
                data.insert(normalize_gene_id(&name).to_string(), seq);
            }
            Ok(())
        })?;
        Ok(Self { data })
    }

    /// Retrieve the [`Nucleotides`] for a particular ID.
    pub fn get(&self, id: &str) -> Option<&Nucleotides> {
        self.data.get(id)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Calculate the GC content of a byte slice, ignoring IUPAC ambiguous codes.
///
/// # Arguments
/// * `seq` - a byte slice.
pub fn gc_content_strict(seq: &[u8]) -> f64 {
    let gc_count = seq
        .iter()
        .filter(|&&base| matches!(base.to_ascii_uppercase(), b'G' | b'C'))
        .count() as f64;
    let total_count = seq
        .iter()
        .filter(|&&base| matches!(base.to_ascii_uppercase(), b'A' | b'T' | b'G' | b'C'))
        .count() as f64;

    if total_count == 0.0 {
        0.0
    } else {
        gc_count / total_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::io::OutputFile;
    use crate::test_utilities::temp_file_with_suffix;

    const PROMOTERS: &str = "tests_data/promoters.fa";

    #[test]
    fn test_promoter_sequences_normalized() {
        let promoters =
            PromoterSequences::from_fasta_normalized(PROMOTERS).expect("could not load FASTA");
        assert_eq!(promoters.len(), 6);
        assert_eq!(
            *promoters.get("AT1G01010").unwrap(),
            Nucleotides::from("ACGTACGTAAGGCCTTACGTATATAAACGTACGT")
        );
        assert!(promoters.get("AT1G01040").is_some());
        assert!(promoters.get("AT1G01040.1").is_none());
        // wrapped sequence lines are joined
        assert_eq!(promoters.get("AT1G01030").unwrap().len(), 48);
    }

    #[test]
    fn test_gzipped_fasta() {
        let tmp = temp_file_with_suffix(".fa.gz");
        {
            let mut writer = OutputFile::new(tmp.path()).writer().unwrap();
            writer.write_all(b">AT1G01010 | chr1\nACGT\nTTGA\n>AT1G01020\nGGCC\n").unwrap();
        }
        let mut records = Vec::new();
        for_each_fasta_record(tmp.path(), |name, seq| {
            records.push((name, seq.to_string()));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            records,
            vec![
                ("AT1G01010".to_string(), "ACGTTTGA".to_string()),
                ("AT1G01020".to_string(), "GGCC".to_string())
            ]
        );
    }

    #[test]
    fn test_display_invalid_utf8() {
        let seq = Nucleotides::from(vec![b'A', b'C', 0xff, b'G', b'T']);
        assert_eq!(seq.to_string(), "AC\u{fffd}GT");
    }

    #[test]
    fn test_shuffle_preserves_composition() {
        let seq = Nucleotides::from("AAAACCCGGT");
        let mut rng = StdRng::seed_from_u64(1);
        let shuffled = seq.shuffled(&mut rng);
        assert_eq!(shuffled.len(), seq.len());
        let mut a = seq.to_vec();
        let mut b = shuffled.to_vec();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shuffle_is_reproducible() {
        let seq = Nucleotides::from("ACGTACGTACGTACGTACGTTTTTGGGG");
        let first = seq.shuffled(&mut StdRng::seed_from_u64(42));
        let second = seq.shuffled(&mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_shuffled_fasta() {
        let mut buffer = Vec::new();
        let mut rng = StdRng::seed_from_u64(7);
        let written = write_shuffled_fasta(PROMOTERS, &mut buffer, &mut rng).unwrap();
        assert_eq!(written, 6);
        let fasta = String::from_utf8(buffer).unwrap();
        assert!(fasta.starts_with(">AT1G01010_shuffled\n"));
        let first_seq = fasta.lines().nth(1).unwrap();
        assert_eq!(first_seq.len(), 34);
    }

    #[test]
    fn test_write_fasta_record() {
        let mut buffer = Vec::new();
        write_fasta_record(&mut buffer, "AT1G01010", &Nucleotides::from("ACGT")).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), ">AT1G01010\nACGT\n");
    }

    #[test]
    fn test_gc_content_strict() {
        assert_eq!(gc_content_strict(b"GGCCAATT"), 0.5);
        assert_eq!(gc_content_strict(b"NNNN"), 0.0);
        assert_eq!(gc_content_strict(b"gcNa"), 2.0 / 3.0);
    }
}
