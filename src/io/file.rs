//! Input/Output file handling with [`InputFile`] and [`OutputFile`].
//!
//! These types abstract over reading/writing both plaintext and gzip-compressed
//! input/output.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

/// Check if a file is a gzipped by looking for the magic numbers
pub fn is_gzipped_file(file_path: impl AsRef<Path>) -> io::Result<bool> {
    let mut file = File::open(file_path.as_ref())?;
    let mut buffer = [0; 2];
    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        // files shorter than two bytes cannot be gzipped
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Represents an input file.
///
/// This struct is used to handle operations on an input file, such as reading from the file.
/// This abstracts how data is read in, allowing for both plaintext and gzip-compressed input
/// to be read through a common interface.
#[derive(Clone, Debug)]
pub struct InputFile {
    pub filepath: PathBuf,
}

impl InputFile {
    /// Constructs a new `InputFile`.
    ///
    /// # Arguments
    ///
    /// * `filepath` - the path to the file. Gzip-compressed files are detected by their
    /// magic numbers, not their extension.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
        }
    }

    /// Opens the file and returns a buffered reader.
    ///
    /// If the file is gzip-compressed, this method will automatically handle the decompression.
    pub fn reader(&self) -> io::Result<BufReader<Box<dyn Read>>> {
        let file = File::open(&self.filepath)?;
        let is_gzipped = is_gzipped_file(&self.filepath)?;
        let reader: Box<dyn Read> = if is_gzipped {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(BufReader::new(reader))
    }

    /// Read all lines of the file, with trailing whitespace removed.
    pub fn lines(&self) -> io::Result<Vec<String>> {
        self.reader()?
            .lines()
            .map(|line| line.map(|l| l.trim_end().to_string()))
            .collect()
    }
}

enum OutputDestination {
    File(PathBuf),
    Stdout,
}

/// Represents an output file.
///
/// This struct is used to handle operations on an output file, such as writing to the file.
/// This abstracts writing both plaintext and gzip-compressed files.
pub struct OutputFile {
    destination: OutputDestination,
}

impl OutputFile {
    /// Constructs a new `OutputFile`.
    ///
    /// # Arguments
    ///
    /// * `filepath` - the path to the file. If the file extension is
    /// `.gz`, `OutputFile` will automatically write gzip-compressed output.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            destination: OutputDestination::File(filepath.into()),
        }
    }

    /// Constructs a new [`OutputFile`] for standard output.
    pub fn new_stdout() -> Self {
        Self {
            destination: OutputDestination::Stdout,
        }
    }

    /// Build an [`OutputFile`] from an optional path, falling back to standard output.
    pub fn from_option(filepath: Option<impl Into<PathBuf>>) -> Self {
        filepath.map_or_else(Self::new_stdout, |path| Self::new(path))
    }

    /// Opens the file and returns a writer.
    ///
    /// If the file path ends with ".gz", the file is treated as gzip-compressed, and the
    /// function will handle compression automatically.
    pub fn writer(&self) -> io::Result<Box<dyn Write>> {
        let writer: Box<dyn Write> = match &self.destination {
            OutputDestination::File(path) => {
                let is_gzip = path.extension().map_or(false, |ext| ext == "gz");
                if is_gzip {
                    Box::new(BufWriter::new(GzEncoder::new(
                        File::create(path)?,
                        Compression::default(),
                    )))
                } else {
                    Box::new(BufWriter::new(File::create(path)?))
                }
            }
            OutputDestination::Stdout => Box::new(BufWriter::new(io::stdout())),
        };
        Ok(writer)
    }

    /// A displayable destination name for log messages.
    pub fn display_name(&self) -> String {
        match &self.destination {
            OutputDestination::File(path) => path.display().to_string(),
            OutputDestination::Stdout => "standard output".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::temp_file_with_suffix;

    #[test]
    fn test_gzip_roundtrip_through_input_file() {
        let tmp = temp_file_with_suffix(".txt.gz");
        let path = tmp.path().to_path_buf();
        {
            let mut writer = OutputFile::new(&path).writer().unwrap();
            writeln!(writer, "AT1G01010").unwrap();
            writeln!(writer, "AT1G01020.1  ").unwrap();
        }
        assert!(is_gzipped_file(&path).unwrap());
        let lines = InputFile::new(&path).lines().unwrap();
        assert_eq!(lines, vec!["AT1G01010", "AT1G01020.1"]);
    }

    #[test]
    fn test_empty_file_is_not_gzipped() {
        let tmp = temp_file_with_suffix(".txt");
        assert!(!is_gzipped_file(tmp.path()).unwrap());
        assert!(InputFile::new(tmp.path()).lines().unwrap().is_empty());
    }
}
