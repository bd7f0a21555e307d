use crate::error::{KilnError, Result};
use crate::page::{Author, History};
use chrono::{DateTime, FixedOffset};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const PUBLISH_MARKER: &str = "PUBLISH";
const FIELD_SEPARATOR: char = '\u{1f}';

/// Version-control history of source files.
pub trait SourceHistory: Send + Sync {
    fn authors_of(&self, source: &Path) -> Result<BTreeSet<Author>>;
    fn publish_date_of(&self, source: &Path) -> Result<Option<DateTime<FixedOffset>>>;
    fn last_edit_date_of(&self, source: &Path) -> Result<Option<DateTime<FixedOffset>>>;

    fn history_of(&self, source: &Path) -> Result<History> {
        Ok(History {
            authors: self.authors_of(source)?,
            publish_date: self.publish_date_of(source)?,
            last_edit_date: self.last_edit_date_of(source)?,
        })
    }
}

#[derive(Debug, Clone)]
struct Commit {
    author: String,
    date: DateTime<FixedOffset>,
    subject: String,
}

/// Reads history from `git log`, following renames.
#[derive(Debug, Default, Clone)]
pub struct GitHistory;

impl GitHistory {
    pub fn new() -> Self {
        Self
    }

    fn commits(&self, source: &Path) -> Result<Vec<Commit>> {
        let directory = source
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file_name = source.file_name().ok_or_else(|| KilnError::InvalidPath {
            path: source.to_path_buf(),
        })?;

        let output = Command::new("git")
            .arg("log")
            .arg("--follow")
            .arg("--pretty=format:%aN%x1f%cI%x1f%s")
            .arg("--")
            .arg(file_name)
            .current_dir(directory)
            .output()
            .map_err(|error| KilnError::Command {
                command: "git log".to_string(),
                message: error.to_string(),
            })?;

        if !output.status.success() {
            return Err(KilnError::Command {
                command: "git log".to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let commits = parse_log(&stdout);
        debug!(source = %source.display(), commits = commits.len(), "read git history");
        Ok(commits)
    }
}

fn parse_log(log: &str) -> Vec<Commit> {
    log.lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, FIELD_SEPARATOR);
            let author = fields.next()?.trim();
            let date = DateTime::parse_from_rfc3339(fields.next()?.trim()).ok()?;
            let subject = fields.next().unwrap_or_default();
            Some(Commit {
                author: author.to_string(),
                date,
                subject: subject.to_string(),
            })
        })
        .collect()
}

impl SourceHistory for GitHistory {
    fn authors_of(&self, source: &Path) -> Result<BTreeSet<Author>> {
        Ok(self
            .commits(source)?
            .into_iter()
            .filter(|commit| !commit.author.is_empty())
            .map(|commit| Author::new(commit.author))
            .collect())
    }

    fn publish_date_of(&self, source: &Path) -> Result<Option<DateTime<FixedOffset>>> {
        Ok(publish_date(&self.commits(source)?))
    }

    fn last_edit_date_of(&self, source: &Path) -> Result<Option<DateTime<FixedOffset>>> {
        Ok(last_edit_date(&self.commits(source)?))
    }

    fn history_of(&self, source: &Path) -> Result<History> {
        let commits = self.commits(source)?;
        Ok(History {
            authors: commits
                .iter()
                .filter(|commit| !commit.author.is_empty())
                .map(|commit| Author::new(commit.author.clone()))
                .collect(),
            publish_date: publish_date(&commits),
            last_edit_date: last_edit_date(&commits),
        })
    }
}

// `git log` lists newest first.
fn publish_date(commits: &[Commit]) -> Option<DateTime<FixedOffset>> {
    commits
        .iter()
        .find(|commit| commit.subject.trim() == PUBLISH_MARKER)
        .map(|commit| commit.date)
}

fn last_edit_date(commits: &[Commit]) -> Option<DateTime<FixedOffset>> {
    commits.iter().map(|commit| commit.date).max()
}

/// Fixed history table, for sites built outside a repository and for tests.
#[derive(Debug, Default, Clone)]
pub struct StaticHistory {
    entries: HashMap<PathBuf, History>,
}

impl StaticHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl Into<PathBuf>, history: History) -> Self {
        self.entries.insert(source.into(), history);
        self
    }

    fn entry(&self, source: &Path) -> Option<&History> {
        self.entries.get(source)
    }
}

impl SourceHistory for StaticHistory {
    fn authors_of(&self, source: &Path) -> Result<BTreeSet<Author>> {
        Ok(self
            .entry(source)
            .map(|history| history.authors.clone())
            .unwrap_or_default())
    }

    fn publish_date_of(&self, source: &Path) -> Result<Option<DateTime<FixedOffset>>> {
        Ok(self.entry(source).and_then(|history| history.publish_date))
    }

    fn last_edit_date_of(&self, source: &Path) -> Result<Option<DateTime<FixedOffset>>> {
        Ok(self.entry(source).and_then(|history| history.last_edit_date))
    }
}
