use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::{ArtifactFamily, ArtifactKind};

#[derive(Debug, Error, Diagnostic)]
pub enum CryoError {
    #[error("invalid artifact family: {0}")]
    InvalidFamily(String),

    #[error("invalid artifact kind: {0}")]
    InvalidKind(String),

    #[error("empty accession")]
    EmptyAccession,

    #[error("no mirror chain registered for {family} {kind}")]
    UnsupportedKind {
        family: ArtifactFamily,
        kind: ArtifactKind,
    },

    #[error("missing config file cryofetch.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("config sets both `accessions` and `batch_file`")]
    ConflictingAccessionSources,

    #[error("config has no accessions (set `accessions` or `batch_file`)")]
    MissingAccessions,

    #[error("failed to read batch file at {0}")]
    BatchFileRead(PathBuf),

    #[error("HTTP client setup failed: {0}")]
    Http(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
