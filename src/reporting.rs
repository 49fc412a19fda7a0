//! Types for standardized reports to the user about pipeline stages.
//!
//! Every stage can run into inputs that are odd but not fatal: requested
//! genes with no promoter, malformed FIMO rows, shuffle rounds that never
//! produced output. These are collected into a [`Report`] rather than
//! aborting the run, and the command line tool logs them as warnings.
//!

/// The [`CommandOutput<U>`] type output is generic over some data output
/// from a command, and a [`Report`] that reports information to the user.
#[derive(Debug)]
pub struct CommandOutput<U> {
    value: U,
    report: Report,
}

impl<U> CommandOutput<U> {
    pub fn new(value: U, report: Report) -> Self {
        Self { value, report }
    }

    pub fn value(&self) -> &U {
        &self.value
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_parts(self) -> (U, Report) {
        (self.value, self.report)
    }
}

/// A type to (semi) standardize reporting to the user.
#[derive(Debug, Default)]
pub struct Report {
    entries: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, message: String) {
        self.entries.push(message)
    }

    /// Add an issue only if `count` is non-zero, e.g. "12 rows were skipped".
    pub fn add_count_issue(&mut self, count: usize, message: &str) {
        if count > 0 {
            self.entries.push(format!("{} {}", count, message))
        }
    }

    pub fn issues(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_issue_skips_zero() {
        let mut report = Report::new();
        report.add_count_issue(0, "rows skipped");
        assert!(report.is_empty());
        report.add_count_issue(3, "rows skipped");
        assert_eq!(report.issues(), &["3 rows skipped".to_string()]);
    }
}
