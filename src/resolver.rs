use camino::Utf8Path;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Accession, ArtifactFamily, ArtifactKind};
use crate::endpoints::{EndpointRegistry, EndpointTemplate};
use crate::error::CryoError;
use crate::metadata::{self, MetadataRecord};
use crate::probe::{AttemptRequest, AttemptStatus, FetchOutcome, Payload, ProbeClient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub mirror: String,
    pub url: String,
    #[serde(flatten)]
    pub status: AttemptStatus,
}

#[derive(Debug)]
pub enum ResolvedArtifact {
    Payload(Payload),
    Record(MetadataRecord),
}

#[derive(Debug)]
pub enum ResolvedResult {
    Resolved {
        kind: ArtifactKind,
        accession: Accession,
        artifact: ResolvedArtifact,
        source: EndpointTemplate,
        url: String,
        attempts: Vec<AttemptRecord>,
    },
    ExhaustedAllSources {
        kind: ArtifactKind,
        accession: Accession,
        attempts: Vec<AttemptRecord>,
    },
}

impl ResolvedResult {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolvedResult::Resolved { .. })
    }

    pub fn source(&self) -> Option<&EndpointTemplate> {
        match self {
            ResolvedResult::Resolved { source, .. } => Some(source),
            ResolvedResult::ExhaustedAllSources { .. } => None,
        }
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            ResolvedResult::Resolved { attempts, .. }
            | ResolvedResult::ExhaustedAllSources { attempts, .. } => attempts,
        }
    }
}

/// Walks a mirror chain in priority order and stops at the first success.
/// Not-found and transient failures both move on to the next mirror; no
/// mirror is tried twice. A local storage error ends the walk with `Err`.
pub struct FallbackResolver<C: ProbeClient> {
    registry: EndpointRegistry,
    client: C,
}

impl<C: ProbeClient> FallbackResolver<C> {
    pub fn new(registry: EndpointRegistry, client: C) -> Self {
        Self { registry, client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn resolve(
        &self,
        family: ArtifactFamily,
        accession: &Accession,
        kind: ArtifactKind,
        workspace: &Utf8Path,
    ) -> Result<ResolvedResult, CryoError> {
        let chain = self.registry.chain_for(family, kind)?;
        let mut attempts = Vec::with_capacity(chain.len());

        for template in chain.templates() {
            let url = template.resolve_url(accession);
            debug!(%accession, %kind, mirror = %template.mirror, %url, "probing mirror");
            let request = AttemptRequest {
                accession,
                template,
                url: url.clone(),
                workspace,
            };
            let outcome = self.client.attempt(&request).inspect_err(|err| {
                warn!(%accession, %kind, mirror = %template.mirror, error = %err, "local storage failed, pair abandoned");
            })?;
            attempts.push(AttemptRecord {
                mirror: template.mirror.clone(),
                url: url.clone(),
                status: outcome.status(),
            });

            match outcome {
                FetchOutcome::Success { payload, source } => {
                    info!(%accession, %kind, mirror = %source.mirror, "resolved");
                    let artifact = if source.response_shape.is_document() {
                        let schema = metadata::schema_for(kind, source.response_shape);
                        ResolvedArtifact::Record(metadata::extract(&payload.into_text(), schema))
                    } else {
                        ResolvedArtifact::Payload(payload)
                    };
                    return Ok(ResolvedResult::Resolved {
                        kind,
                        accession: accession.clone(),
                        artifact,
                        source,
                        url,
                        attempts,
                    });
                }
                FetchOutcome::NotFoundAtSource => {
                    debug!(%accession, %kind, mirror = %template.mirror, "not found at mirror");
                }
                FetchOutcome::TransientError { cause } => {
                    warn!(%accession, %kind, mirror = %template.mirror, %cause, "mirror failed, trying next");
                }
            }
        }

        warn!(%accession, %kind, attempts = attempts.len(), "exhausted all mirrors");
        Ok(ResolvedResult::ExhaustedAllSources {
            kind,
            accession: accession.clone(),
            attempts,
        })
    }
}
