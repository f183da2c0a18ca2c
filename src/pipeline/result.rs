use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

/// Progress of one image through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Loaded,
    Preprocessed,
    Matted,
    Refined,
    Persisted,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Loaded => "loaded",
            Self::Preprocessed => "preprocessed",
            Self::Matted => "matted",
            Self::Refined => "refined",
            Self::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Outcome for a single input file.
#[derive(Debug)]
pub enum ProcessingResult {
    Succeeded {
        input: PathBuf,
        output: PathBuf,
        elapsed: Duration,
    },
    Failed {
        input: PathBuf,
        /// Last state reached before the failure.
        stage: ItemState,
        error: Error,
        elapsed: Duration,
    },
}

impl ProcessingResult {
    pub fn input(&self) -> &Path {
        match self {
            Self::Succeeded { input, .. } | Self::Failed { input, .. } => input,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Succeeded { elapsed, .. } | Self::Failed { elapsed, .. } => *elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn output(&self) -> Option<&Path> {
        match self {
            Self::Succeeded { output, .. } => Some(output),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

/// Every input of a run, in processing order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    results: Vec<ProcessingResult>,
}

impl BatchSummary {
    pub fn push(&mut self, result: ProcessingResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[ProcessingResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProcessingResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}
