//! Essential delimited-file functionality, which wraps the blazingly-fast [`csv`] crate's
//! deserialization method using [`serde`].
//!
//! Both TSV (FIMO output, GRN edge lists, GFF-like tables) and CSV (result tables)
//! files pass through here. Input may be gzip-compressed.

use csv::{DeserializeRecordsIntoIter, Reader, ReaderBuilder, Writer, WriterBuilder};
use flate2::read::GzDecoder;
use lazy_static::lazy_static;
use serde::{Deserialize, Serializer};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::CisGrnError;
use crate::io::file::{is_gzipped_file, OutputFile};

lazy_static! {
    /// Result tables: missing values are empty cells, like a pandas `to_csv()`.
    pub static ref RESULT_CSV: TsvConfig = TsvConfig {
        no_value_string: "".to_string(),
    };
    /// Annotation tables: missing lookups are written as `N/A`.
    pub static ref ANNOTATION_CSV: TsvConfig = TsvConfig {
        no_value_string: "N/A".to_string(),
    };
}

/// This is an extensible type to handle common
/// delimited output configurations, e.g. what to print
/// for `None` or NaN.
pub struct TsvConfig {
    pub no_value_string: String,
}

impl TsvConfig {
    /// Format a float, writing NaN as the missing value string and
    /// infinities as `inf`/`-inf`.
    pub fn format_float(&self, value: f64) -> String {
        if value.is_nan() {
            self.no_value_string.clone()
        } else if value == f64::INFINITY {
            "inf".to_string()
        } else if value == f64::NEG_INFINITY {
            "-inf".to_string()
        } else {
            value.to_string()
        }
    }
}

/// [`serde`] serializer for floats in result tables.
pub fn serialize_float<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&RESULT_CSV.format_float(*value))
}

/// [`serde`] serializer for optional floats in result tables.
pub fn serialize_option_float<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&RESULT_CSV.format_float(*v)),
        None => serializer.serialize_str(&RESULT_CSV.no_value_string),
    }
}

/// [`serde`] serializer for booleans, written the way pandas does (`True`/`False`).
pub fn serialize_pybool<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "True" } else { "False" })
}

/// [`serde`] deserializer for an optional float, where an empty cell or `NaN` is `None`.
pub fn deserialize_option_float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|e| serde::de::Error::custom(format!("parsing error: {}", e)))
}

/// Choose the delimiter from the file extension: `,` for `.csv` (or `.csv.gz`),
/// tab for everything else.
pub fn delimiter_for(filepath: impl AsRef<Path>) -> u8 {
    let name = filepath
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    if name.ends_with(".csv") {
        b','
    } else {
        b'\t'
    }
}

/// Build a delimited reader which ignores comment lines, works on gzip-compressed
/// files, and tolerates ragged rows.
pub fn build_delimited_reader(
    filepath: impl Into<PathBuf>,
    delimiter: u8,
    has_headers: bool,
) -> Result<Reader<Box<dyn Read>>, CisGrnError> {
    let filepath = filepath.into();
    let file = File::open(&filepath)?;
    let is_gzipped = is_gzipped_file(&filepath)?;
    let stream: Box<dyn Read> = if is_gzipped {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(stream);
    Ok(reader)
}

/// Build a CSV writer over an [`OutputFile`].
pub fn build_csv_writer(output: &OutputFile) -> Result<Writer<Box<dyn std::io::Write>>, CisGrnError> {
    Ok(WriterBuilder::new().from_writer(output.writer()?))
}

/// Build a TSV writer over an [`OutputFile`].
pub fn build_tsv_writer(output: &OutputFile) -> Result<Writer<Box<dyn std::io::Write>>, CisGrnError> {
    Ok(WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(output.writer()?))
}

/// An iterator over the records of a delimited file with a header row,
/// deserialized by column name into `T`.
pub struct TsvRecordIterator<T> {
    inner: DeserializeRecordsIntoIter<Box<dyn std::io::Read>, T>,
}

impl<T> std::fmt::Debug for TsvRecordIterator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsvRecordIterator").finish_non_exhaustive()
    }
}

impl<T> TsvRecordIterator<T>
where
    for<'de> T: Deserialize<'de>,
{
    /// Create a new reader over a file with a header row. The delimiter is
    /// chosen with [`delimiter_for`]. Lines beginning with `'#'` are skipped.
    pub fn new(filepath: impl Into<PathBuf>) -> Result<Self, CisGrnError> {
        let filepath = filepath.into();
        let delimiter = delimiter_for(&filepath);
        Self::with_delimiter(filepath, delimiter)
    }

    /// Create a new reader with an explicit delimiter.
    pub fn with_delimiter(filepath: impl Into<PathBuf>, delimiter: u8) -> Result<Self, CisGrnError> {
        let reader = build_delimited_reader(filepath, delimiter, true)?;
        let inner = reader.into_deserialize();
        Ok(Self { inner })
    }
}

impl<T> Iterator for TsvRecordIterator<T>
where
    for<'de> T: Deserialize<'de>,
{
    type Item = Result<T, CisGrnError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|res| res.map_err(CisGrnError::from))
    }
}
