//! Turns CLI input into the ordered list of pull request numbers to visit.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Explicit identifiers, visited in the order given.
    List(Vec<u64>),
    /// Half-open range `[start, end)`, visited ascending.
    Range { start: u64, end: u64 },
}

impl Selection {
    /// Exactly one of `prs` or the `start`/`end` pair must be supplied.
    pub fn from_args(prs: Option<Vec<u64>>, start: Option<u64>, end: Option<u64>) -> Result<Self> {
        match (prs, start, end) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(Error::Config(
                "Please provide either --pr or --start and --end, not both".to_string(),
            )),
            (Some(prs), None, None) => Ok(Selection::List(prs)),
            (None, Some(start), Some(end)) => {
                if start > end {
                    return Err(Error::Config(format!(
                        "Range start {} is greater than end {}",
                        start, end
                    )));
                }
                Ok(Selection::Range { start, end })
            }
            (None, Some(_), None) | (None, None, Some(_)) => Err(Error::Config(
                "Both --start and --end are required for a range".to_string(),
            )),
            (None, None, None) => Err(Error::Config(
                "Please provide either --pr or --start and --end".to_string(),
            )),
        }
    }

    /// Skips everything up to and including `marker`. Only ranges resume,
    /// so a list is rejected even when there is no marker yet.
    pub fn resume_after(self, marker: Option<u64>) -> Result<Self> {
        match self {
            Selection::Range { start, end } => {
                let start = match marker {
                    Some(marker) => start.max(marker.saturating_add(1)).min(end),
                    None => start,
                };
                Ok(Selection::Range { start, end })
            }
            Selection::List(_) => Err(Error::Config(
                "Resuming is only supported with --start and --end".to_string(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Selection::List(prs) => prs.len(),
            Selection::Range { start, end } => {
                usize::try_from(end.saturating_sub(*start)).unwrap_or(usize::MAX)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Yields identifiers lazily, so a wide range never materialises.
    pub fn iter(&self) -> Box<dyn Iterator<Item = u64> + Send + '_> {
        match self {
            Selection::List(prs) => Box::new(prs.iter().copied()),
            Selection::Range { start, end } => Box::new(*start..*end),
        }
    }
}

/// Parses newline separated identifiers, ignoring blank lines.
pub fn parse_id_lines(input: &str) -> Result<Vec<u64>> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<u64>().map_err(|_| {
                Error::Config(format!("Please provide only integers, got {:?}", line))
            })
        })
        .collect()
}
