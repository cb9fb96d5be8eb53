//! Domain error types.
//!
//! Only snapshot fetch and schema failures (and configuration problems) are
//! fatal to a run. Per-cell parse failures never surface as errors, and
//! per-symbol problems are recorded as a `Verdict` skip reason instead.

use std::fmt;

/// One of the four columns the universe builder must resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticField {
    Code,
    Name,
    Volume,
    Close,
}

impl SemanticField {
    pub const ALL: [SemanticField; 4] = [
        SemanticField::Code,
        SemanticField::Name,
        SemanticField::Volume,
        SemanticField::Close,
    ];
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SemanticField::Code => "code",
            SemanticField::Name => "name",
            SemanticField::Volume => "vol",
            SemanticField::Close => "close",
        };
        f.write_str(s)
    }
}

/// Failures interpreting the raw market snapshot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("no suitable table structure found in snapshot payload")]
    SchemaNotFound,

    #[error("missing columns; found [{}]", join_fields(.resolved))]
    MissingColumns { resolved: Vec<SemanticField> },
}

fn join_fields(fields: &[SemanticField]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Top-level error type for strongscan.
#[derive(Debug, thiserror::Error)]
pub enum StrongscanError {
    #[error("{source_name} fetch failed: {reason}")]
    Fetch { source_name: String, reason: String },

    #[error(transparent)]
    Schema(#[from] UniverseError),

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("notification failed: {reason}")]
    Notify { reason: String },

    #[error("artifact write failed: {reason}")]
    Artifact { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StrongscanError {
    pub fn fetch(source_name: &str, reason: impl fmt::Display) -> Self {
        StrongscanError::Fetch {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<&StrongscanError> for std::process::ExitCode {
    fn from(err: &StrongscanError) -> Self {
        let code: u8 = match err {
            StrongscanError::Io(_) => 1,
            StrongscanError::ConfigParse { .. } | StrongscanError::ConfigInvalid { .. } => 2,
            StrongscanError::Fetch { .. } => 3,
            StrongscanError::Schema(_) => 4,
            StrongscanError::Notify { .. } | StrongscanError::Artifact { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
