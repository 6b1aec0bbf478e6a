use std::fmt;

/// Where a single pull request ended up after one pass of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NotFound,
    Broken,
    /// Looked empty but the diff endpoint still served a diff. Recorded
    /// nowhere except the resume marker.
    Unclassified,
    Healthy,
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::NotFound => "not-found",
            Outcome::Broken => "broken",
            Outcome::Unclassified => "unclassified",
            Outcome::Healthy => "healthy",
            Outcome::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub visited: usize,
    pub not_found: usize,
    pub broken: usize,
    pub unclassified: usize,
    pub healthy: usize,
    pub errors: usize,
    pub last_visited: Option<u64>,
}

impl ScanSummary {
    pub fn record(&mut self, pr_number: u64, outcome: Outcome) {
        self.visited += 1;
        self.last_visited = Some(pr_number);
        match outcome {
            Outcome::NotFound => self.not_found += 1,
            Outcome::Broken => self.broken += 1,
            Outcome::Unclassified => self.unclassified += 1,
            Outcome::Healthy => self.healthy += 1,
            Outcome::Error => self.errors += 1,
        }
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checked, {} broken, {} not found, {} unclassified, {} healthy, {} errors",
            self.visited, self.broken, self.not_found, self.unclassified, self.healthy, self.errors
        )
    }
}
