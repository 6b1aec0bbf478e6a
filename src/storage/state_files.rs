use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const BROKEN_PRS_FILE: &str = "broken_prs.txt";
pub const PR_NOT_FOUND_FILE: &str = "pr_not_found.txt";
pub const PR_EXCEPTIONS_FILE: &str = "pr_exceptions.txt";
pub const LAST_ISSUE_FILE: &str = "last_issue.txt";

/// Append-only outcome logs kept in the state directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    NotFound,
    Broken,
    Exception,
}

impl LogKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            LogKind::NotFound => PR_NOT_FOUND_FILE,
            LogKind::Broken => BROKEN_PRS_FILE,
            LogKind::Exception => PR_EXCEPTIONS_FILE,
        }
    }
}

/// Flat-file run state: three outcome logs plus the resume marker.
///
/// Logs are newline delimited and never deduplicated, so revisiting a pull
/// request appends another line. The marker holds a single identifier and is
/// replaced on every write. In dry-run mode nothing touches the disk and each
/// intended write is logged instead.
pub struct StateDir {
    root: PathBuf,
    dry_run: bool,
}

impl StateDir {
    pub fn new<P: AsRef<Path>>(root: P, dry_run: bool) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if dry_run {
            tracing::info!("Dry run mode, not creating state files");
        } else {
            fs::create_dir_all(&root)?;
        }
        Ok(Self { root, dry_run })
    }

    pub fn log_path(&self, kind: LogKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn marker_path(&self) -> PathBuf {
        self.root.join(LAST_ISSUE_FILE)
    }

    pub fn append(&self, kind: LogKind, pr_number: u64) -> Result<()> {
        let path = self.log_path(kind);
        if self.dry_run {
            tracing::info!("[dry run] would append {} to {}", pr_number, path.display());
            return Ok(());
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", pr_number)?;
        Ok(())
    }

    /// Replaces the marker through a rename so an interrupted write never
    /// leaves a truncated value behind.
    pub fn write_resume_marker(&self, pr_number: u64) -> Result<()> {
        let path = self.marker_path();
        if self.dry_run {
            tracing::info!("[dry run] would write {} to {}", pr_number, path.display());
            return Ok(());
        }

        let tmp = self.root.join(format!("{}.tmp", LAST_ISSUE_FILE));
        fs::write(&tmp, pr_number.to_string())?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn read_resume_marker(&self) -> Result<Option<u64>> {
        let path = self.marker_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let value = contents.trim();
        if value.is_empty() {
            return Ok(None);
        }

        value.parse().map(Some).map_err(|_| {
            Error::Config(format!(
                "Resume marker {} holds {:?}, expected a pull request number",
                path.display(),
                value
            ))
        })
    }
}
