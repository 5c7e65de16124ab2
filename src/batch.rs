use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{AccessionRequest, ArtifactFamily, ArtifactKind};
use crate::error::CryoError;
use crate::probe::ProbeClient;
use crate::resolver::{AttemptRecord, FallbackResolver, ResolvedResult};
use crate::store::OutputStore;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub remaining: usize,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Checked before each unstarted pair. In-flight attempts are bounded by
/// their timeouts, not interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PairOutcome {
    Resolved {
        mirror: String,
        url: String,
        saved_to: String,
        attempts: Vec<AttemptRecord>,
    },
    ExhaustedAllSources {
        attempts: Vec<AttemptRecord>,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    pub accession: String,
    pub family: ArtifactFamily,
    pub kind: ArtifactKind,
    #[serde(flatten)]
    pub outcome: PairOutcome,
}

impl PairReport {
    pub fn is_resolved(&self) -> bool {
        matches!(self.outcome, PairOutcome::Resolved { .. })
    }

    pub fn summary_line(&self) -> String {
        let label = format!("{} {} {}", self.family, self.accession, self.kind);
        match &self.outcome {
            PairOutcome::Resolved {
                mirror, saved_to, ..
            } => format!("{label}: resolved from {mirror} -> {saved_to}"),
            PairOutcome::ExhaustedAllSources { attempts } => {
                let trail = attempts
                    .iter()
                    .map(|attempt| format!("{}: {}", attempt.mirror, attempt.status))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{label}: unresolved ({trail})")
            }
            PairOutcome::Failed { error } => format!("{label}: failed: {error}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub items: Vec<PairReport>,
    pub cancelled: bool,
}

impl BatchResult {
    pub fn resolved_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_resolved()).count()
    }

    pub fn unresolved_count(&self) -> usize {
        self.items.len() - self.resolved_count()
    }
}

pub struct BatchRunner<C: ProbeClient> {
    resolver: FallbackResolver<C>,
    store: OutputStore,
}

impl<C: ProbeClient> BatchRunner<C> {
    pub fn new(resolver: FallbackResolver<C>, store: OutputStore) -> Self {
        Self { resolver, store }
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// Resolves every (accession, kind) pair in input order. A pair's failure
    /// is recorded in its report and never stops the rest of the batch.
    pub fn run(
        &self,
        requests: &[AccessionRequest],
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, CryoError> {
        self.store.ensure_root()?;

        let pairs: Vec<(&AccessionRequest, ArtifactKind)> = requests
            .iter()
            .flat_map(|request| request.kinds_requested.iter().map(move |kind| (request, *kind)))
            .collect();
        let total = pairs.len();
        let mut items = Vec::with_capacity(total);
        let mut cancelled = false;

        for (index, (request, kind)) in pairs.into_iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(completed = index, total, "batch cancelled");
                cancelled = true;
                break;
            }
            let start = Instant::now();
            let report = self.resolve_pair(request, kind);
            sink.event(ProgressEvent {
                message: report.summary_line(),
                remaining: total - index - 1,
                elapsed: Some(start.elapsed()),
            });
            items.push(report);
        }

        let result = BatchResult { items, cancelled };
        info!(
            resolved = result.resolved_count(),
            unresolved = result.unresolved_count(),
            "batch finished"
        );
        Ok(result)
    }

    pub fn resolve_pair(&self, request: &AccessionRequest, kind: ArtifactKind) -> PairReport {
        let outcome = match self.resolver.resolve(
            request.family,
            &request.accession,
            kind,
            self.store.root(),
        ) {
            Ok(ResolvedResult::Resolved {
                artifact,
                source,
                url,
                attempts,
                ..
            }) => match self.store.persist(
                request.family,
                &request.accession,
                kind,
                artifact,
                &source,
                &url,
            ) {
                Ok(saved_to) => PairOutcome::Resolved {
                    mirror: source.mirror,
                    url,
                    saved_to: saved_to.to_string(),
                    attempts,
                },
                Err(err) => {
                    warn!(accession = %request.accession, %kind, error = %err, "could not store artifact");
                    PairOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            },
            Ok(ResolvedResult::ExhaustedAllSources { attempts, .. }) => {
                PairOutcome::ExhaustedAllSources { attempts }
            }
            Err(err) => {
                warn!(accession = %request.accession, %kind, error = %err, "pair skipped");
                PairOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };

        PairReport {
            accession: request.accession.as_str().to_string(),
            family: request.family,
            kind,
            outcome,
        }
    }
}
