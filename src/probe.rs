use std::fmt;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::domain::Accession;
use crate::endpoints::{EndpointTemplate, Transport};
use crate::error::CryoError;
use crate::http::HttpMirrorClient;
use crate::rsync::RsyncMirrorClient;

/// Body of a successful attempt. Nothing here lives under a final file name
/// yet; persisting is the output store's job.
#[derive(Debug)]
pub enum Payload {
    /// Binary body spooled into a hidden temporary file inside the output root.
    Staged(NamedTempFile),
    Bytes(Vec<u8>),
    Document(String),
    /// Directory populated in place by an archive synchronisation.
    Synced(Utf8PathBuf),
}

impl Payload {
    /// Best-effort text view used when a document-shaped endpoint hands back a
    /// non-document payload. Never fails; unreadable content becomes empty.
    pub fn into_text(self) -> String {
        match self {
            Payload::Document(text) => text,
            Payload::Bytes(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Payload::Staged(file) => fs::read(file.path())
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default(),
            Payload::Synced(_) => String::new(),
        }
    }
}

#[derive(Debug)]
pub enum FetchOutcome {
    Success {
        payload: Payload,
        source: EndpointTemplate,
    },
    NotFoundAtSource,
    TransientError {
        cause: String,
    },
}

impl FetchOutcome {
    pub fn status(&self) -> AttemptStatus {
        match self {
            FetchOutcome::Success { .. } => AttemptStatus::Success,
            FetchOutcome::NotFoundAtSource => AttemptStatus::NotFoundAtSource,
            FetchOutcome::TransientError { cause } => AttemptStatus::TransientError {
                cause: cause.clone(),
            },
        }
    }
}

/// Payload-free view of a `FetchOutcome`, kept in attempt trails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptStatus {
    Success,
    NotFoundAtSource,
    TransientError { cause: String },
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::Success => write!(f, "found"),
            AttemptStatus::NotFoundAtSource => write!(f, "not found"),
            AttemptStatus::TransientError { cause } => write!(f, "transient ({cause})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    NotFound,
    Failure,
}

pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        404 | 410 => StatusClass::NotFound,
        _ => StatusClass::Failure,
    }
}

pub struct AttemptRequest<'a> {
    pub accession: &'a Accession,
    pub template: &'a EndpointTemplate,
    pub url: String,
    /// Output root; staging files and synchronised directories go here.
    pub workspace: &'a Utf8Path,
}

/// Performs exactly one retrieval attempt against one mirror. Mirror-side
/// problems are classified in the `FetchOutcome`; `Err` is reserved for local
/// storage failures, which no other mirror can fix.
pub trait ProbeClient: Send + Sync {
    fn attempt(&self, request: &AttemptRequest<'_>) -> Result<FetchOutcome, CryoError>;
}

pub struct MirrorClient {
    http: HttpMirrorClient,
    rsync: RsyncMirrorClient,
}

impl MirrorClient {
    pub fn new(http: HttpMirrorClient, rsync: RsyncMirrorClient) -> Self {
        Self { http, rsync }
    }
}

impl ProbeClient for MirrorClient {
    fn attempt(&self, request: &AttemptRequest<'_>) -> Result<FetchOutcome, CryoError> {
        match request.template.transport {
            Transport::Http | Transport::Ftp => self.http.attempt(request),
            Transport::Rsync => self.rsync.attempt(request),
        }
    }
}
