//! Gene identifier normalization and locus ID matching.
//!
//! Gene IDs in the inputs come in two flavors: bare loci (`AT1G01010`) and
//! transcript/gene model IDs with a version suffix (`AT1G01010.1`). Two
//! normalizations are used throughout:
//!
//!  - [`normalize_gene_id`]: truncate at the first period. Used for joining FIMO
//!    hits, promoter FASTA headers, GFF3 features, and background gene lists.
//!  - [`strip_version_suffix`]: remove only a trailing `.<digits>`. Used when building
//!    the network inference matrix, where IDs may legitimately contain periods.

use indexmap::IndexSet;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;

use crate::error::CisGrnError;
use crate::io::InputFile;

/// The default locus pattern: Arabidopsis Genome Initiative (AGI) gene loci on
/// the five nuclear chromosomes.
pub const AGI_LOCUS_PATTERN: &str = r"AT[1-5]G\d{5}";

lazy_static! {
    static ref VERSION_SUFFIX: Regex = Regex::new(r"\.\d+$").expect("static regex");
}

/// Strip a version suffix by truncating at the first period,
/// e.g. `AT1G01010.1` → `AT1G01010`.
pub fn normalize_gene_id(gene_id: &str) -> &str {
    gene_id.split('.').next().unwrap_or(gene_id)
}

/// Remove a trailing numeric version suffix only,
/// e.g. `AT1G01010.2` → `AT1G01010`, but `Lj.chr1.g1` is untouched.
pub fn strip_version_suffix(gene_id: &str) -> &str {
    match VERSION_SUFFIX.find(gene_id) {
        Some(m) => &gene_id[..m.start()],
        None => gene_id,
    }
}

/// A compiled locus ID pattern, e.g. [`AGI_LOCUS_PATTERN`].
#[derive(Clone, Debug)]
pub struct GeneIdPattern {
    anchored: Regex,
}

impl Default for GeneIdPattern {
    fn default() -> Self {
        Self::new(AGI_LOCUS_PATTERN).expect("static regex")
    }
}

impl GeneIdPattern {
    /// Compile a locus pattern. The pattern should match the bare locus only;
    /// version suffixes are handled here.
    pub fn new(pattern: &str) -> Result<Self, CisGrnError> {
        let anchored = Regex::new(&format!(r"^({})(?:\.\d+)?", pattern))?;
        Ok(Self { anchored })
    }

    /// Match a locus at the start of a (trimmed) line or FASTA record name,
    /// returning the bare locus.
    pub fn match_line<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.anchored
            .captures(line.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Read locus IDs from a text file with one ID per line. Lines that do not begin
/// with a locus are skipped. IDs are returned in first-seen order without duplicates.
pub fn read_gene_ids(
    filepath: impl Into<PathBuf>,
    pattern: &GeneIdPattern,
) -> Result<IndexSet<String>, CisGrnError> {
    let input = InputFile::new(filepath);
    let ids = input
        .lines()?
        .iter()
        .filter_map(|line| pattern.match_line(line))
        .map(|id| id.to_string())
        .collect();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_normalize_gene_id() {
        assert_eq!(normalize_gene_id("AT1G01010.1"), "AT1G01010");
        assert_eq!(normalize_gene_id("AT1G01010"), "AT1G01010");
        assert_eq!(normalize_gene_id("Lj.chr1.g1"), "Lj");
        assert_eq!(normalize_gene_id(""), "");
    }

    #[test]
    fn test_strip_version_suffix() {
        assert_eq!(strip_version_suffix("AT1G01010.12"), "AT1G01010");
        assert_eq!(strip_version_suffix("AT1G01010"), "AT1G01010");
        assert_eq!(strip_version_suffix("Lj.chr1.g1"), "Lj.chr1.g1");
        assert_eq!(strip_version_suffix("LotjaGi1g1v0001.2"), "LotjaGi1g1v0001");
    }

    #[test]
    fn test_pattern_match_line() {
        let pattern = GeneIdPattern::default();
        assert_eq!(pattern.match_line("AT1G01010.1"), Some("AT1G01010"));
        assert_eq!(pattern.match_line("  AT5G67640 \n"), Some("AT5G67640"));
        // chromosome 6 is not a nuclear chromosome
        assert_eq!(pattern.match_line("AT6G01010"), None);
        // anchored at the start of the line
        assert_eq!(pattern.match_line("gene AT1G01010"), None);
        assert_eq!(pattern.match_line("ATMG00010"), None);
    }

    #[test]
    fn test_pattern_match_record_name() {
        let pattern = GeneIdPattern::default();
        assert_eq!(pattern.match_line("AT1G01040.1"), Some("AT1G01040"));
        assert_eq!(pattern.match_line("ATCG00010"), None);
        assert_eq!(pattern.match_line("chr1_AT1G01010"), None);
    }

    #[test]
    fn test_custom_pattern() {
        let pattern = GeneIdPattern::new(r"LotjaGi\dg\dv\d{7}").unwrap();
        assert_eq!(
            pattern.match_line("LotjaGi1g1v0001234.1"),
            Some("LotjaGi1g1v0001234")
        );
        assert!(GeneIdPattern::new("(unclosed").is_err());
    }

    #[test]
    fn test_read_gene_ids() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "AT1G01010.1\nAT1G01010.2\nnot_a_gene\n\nAT2G01020").unwrap();
        let ids = read_gene_ids(tmp.path(), &GeneIdPattern::default()).unwrap();
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec!["AT1G01010".to_string(), "AT2G01020".to_string()]
        );
    }
}
