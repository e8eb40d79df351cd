//! Question/answer corpus loading
//!
//! The corpus file is a JSON array. Each record has a `question` and either a
//! single `answer` string or an `answers` list:
//!
//! ```json
//! [
//!   { "question": "capital of france", "answer": "Paris" },
//!   { "question": "primary colors", "answers": ["red", "green", "blue"] }
//! ]
//! ```
//!
//! Both shapes are normalized into [`QAEntry::answers`] at load time so no
//! downstream code has to care which one a record used. Records that are
//! unusable on their own are skipped with a warning; a file that cannot be
//! read or parsed fails the whole load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::is_blank;

/// One corpus record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QAEntry {
    pub question: String,
    pub answers: Vec<String>,
}

/// Ordered list of entries, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    entries: Vec<QAEntry>,
}

/// Record shape as it appears on disk
#[derive(Debug, Deserialize)]
struct RawEntry {
    question: String,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    answers: Option<Vec<String>>,
}

impl RawEntry {
    /// Fold both answer shapes into one list. `answer` wins when both exist.
    fn into_entry(self) -> Option<QAEntry> {
        if is_blank(&self.question) {
            return None;
        }

        let answers: Vec<String> = match (self.answer, self.answers) {
            (Some(single), _) if !is_blank(&single) => vec![single.trim().to_string()],
            (_, Some(list)) => list
                .into_iter()
                .filter(|a| !is_blank(a))
                .map(|a| a.trim().to_string())
                .collect(),
            _ => Vec::new(),
        };

        if answers.is_empty() {
            return None;
        }

        Some(QAEntry {
            question: self.question.trim().to_string(),
            answers,
        })
    }
}

impl Corpus {
    pub fn new(entries: Vec<QAEntry>) -> Self {
        Self { entries }
    }

    /// Load and validate a corpus file
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let contents = fs::read_to_string(path).map_err(|e| CorpusError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let report = Self::parse(&contents).map_err(|e| match e {
            ParseFailure::Syntax(source) => CorpusError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::NotAList => CorpusError::NotAList {
                path: path.to_path_buf(),
            },
        })?;

        for skipped in &report.skipped {
            tracing::warn!(
                path = %path.display(),
                index = skipped.index,
                reason = %skipped.reason,
                "Skipping corpus record"
            );
        }
        tracing::info!(
            path = %path.display(),
            loaded = report.corpus.len(),
            skipped = report.skipped.len(),
            "Corpus loaded"
        );

        Ok(report.corpus)
    }

    /// Parse corpus text, collecting per-record problems instead of failing.
    pub fn parse(contents: &str) -> Result<LoadReport, ParseFailure> {
        let value: serde_json::Value =
            serde_json::from_str(contents).map_err(ParseFailure::Syntax)?;
        let serde_json::Value::Array(records) = value else {
            return Err(ParseFailure::NotAList);
        };

        let mut entries = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<RawEntry>(record) {
                Ok(raw) => match raw.into_entry() {
                    Some(entry) => entries.push(entry),
                    None => skipped.push(SkippedRecord {
                        index,
                        reason: "blank question or no usable answer".to_string(),
                    }),
                },
                Err(e) => skipped.push(SkippedRecord {
                    index,
                    reason: e.to_string(),
                }),
            }
        }

        Ok(LoadReport {
            corpus: Corpus::new(entries),
            skipped,
        })
    }

    pub fn entries(&self) -> &[QAEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of parsing a corpus document
#[derive(Debug)]
pub struct LoadReport {
    pub corpus: Corpus,
    pub skipped: Vec<SkippedRecord>,
}

/// A record that was dropped during load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: String,
}

/// Document-level parse failure
#[derive(Debug)]
pub enum ParseFailure {
    Syntax(serde_json::Error),
    NotAList,
}

/// Fatal corpus load errors
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("cannot read corpus file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corpus file {path:?} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("corpus file {path:?} must contain a JSON array of records")]
    NotAList { path: PathBuf },
}
