use thiserror::Error;

/// Failures surfaced by the file model. Every variant that can be traced to
/// input carries the 1-based line number of the offending line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("line {line}: {detail}")]
    Structure { line: usize, detail: String },

    #[error("line {line}, field {field}: malformed rhythm code \"{code}\"")]
    MalformedRhythm {
        line: usize,
        field: usize,
        code: String,
    },

    #[error("zero denominator in rational value")]
    Arithmetic,

    #[error("line {line}, field {field}: null token has no predecessor in its spine")]
    TrackResolution { line: usize, field: usize },
}

impl ModelError {
    pub fn structure(line: usize, detail: impl Into<String>) -> Self {
        ModelError::Structure {
            line,
            detail: detail.into(),
        }
    }
}

/// Strict mode fails fast on the first model error; best-effort mode keeps
/// going, leaving the offending line un-analyzed and recording an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Strict,
    BestEffort,
}

/// One recoverable problem found during a best-effort pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}
