use std::collections::HashMap;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8Path;

use cryofetch::domain::{Accession, ArtifactFamily, ArtifactKind};
use cryofetch::endpoints::{
    EndpointChain, EndpointRegistry, EndpointTemplate, ResponseShape, Transport,
};
use cryofetch::error::CryoError;
use cryofetch::probe::{AttemptRequest, AttemptStatus, FetchOutcome, Payload, ProbeClient};
use cryofetch::resolver::{FallbackResolver, ResolvedArtifact, ResolvedResult};

#[derive(Clone, Copy)]
enum Scripted {
    Found,
    Missing,
    Broken,
    DiskFull,
}

/// Answers per mirror name; mirrors without a script report not-found.
#[derive(Default)]
struct ScriptedClient {
    script: HashMap<String, Scripted>,
    body: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn with(mut self, mirror: &str, answer: Scripted) -> Self {
        self.script.insert(mirror.to_string(), answer);
        self
    }

    fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProbeClient for ScriptedClient {
    fn attempt(&self, request: &AttemptRequest<'_>) -> Result<FetchOutcome, CryoError> {
        let mirror = request.template.mirror.clone();
        self.calls.lock().unwrap().push(mirror.clone());
        let outcome = match self.script.get(&mirror).copied().unwrap_or(Scripted::Missing) {
            Scripted::Found => {
                let payload = match &self.body {
                    Some(body) => Payload::Document(body.clone()),
                    None => Payload::Bytes(format!("{mirror}:{}", request.url).into_bytes()),
                };
                FetchOutcome::Success {
                    payload,
                    source: request.template.clone(),
                }
            }
            Scripted::Missing => FetchOutcome::NotFoundAtSource,
            Scripted::Broken => FetchOutcome::TransientError {
                cause: "status 503".to_string(),
            },
            Scripted::DiskFull => {
                return Err(CryoError::Filesystem("No space left on device".to_string()));
            }
        };
        Ok(outcome)
    }
}

fn accession(value: &str) -> Accession {
    value.parse().unwrap()
}

fn workspace() -> &'static Utf8Path {
    Utf8Path::new("unused")
}

fn statuses(result: &ResolvedResult) -> Vec<AttemptStatus> {
    result
        .attempts()
        .iter()
        .map(|attempt| attempt.status.clone())
        .collect()
}

#[test]
fn falls_back_until_a_mirror_has_the_entry() {
    let client = ScriptedClient::default().with("pdbj", Scripted::Found);
    let resolver = FallbackResolver::new(EndpointRegistry::builtin(), client);

    let result = resolver
        .resolve(
            ArtifactFamily::Pdb,
            &accession("101d"),
            ArtifactKind::Coordinates,
            workspace(),
        )
        .unwrap();

    assert_eq!(result.source().map(|s| s.mirror.as_str()), Some("pdbj"));
    assert_eq!(
        statuses(&result),
        vec![
            AttemptStatus::NotFoundAtSource,
            AttemptStatus::NotFoundAtSource,
            AttemptStatus::Success,
        ]
    );
    assert_eq!(resolver.client().calls(), vec!["rcsb", "pdbe", "pdbj"]);
    assert_matches!(
        result,
        ResolvedResult::Resolved {
            artifact: ResolvedArtifact::Payload(Payload::Bytes(_)),
            ..
        }
    );
}

#[test]
fn exhausts_every_mirror_for_unknown_entry() {
    let resolver = FallbackResolver::new(EndpointRegistry::builtin(), ScriptedClient::default());

    let result = resolver
        .resolve(
            ArtifactFamily::Pdb,
            &accession("lmao"),
            ArtifactKind::Coordinates,
            workspace(),
        )
        .unwrap();

    assert!(!result.is_resolved());
    assert_eq!(result.attempts().len(), 4);
    assert!(
        result
            .attempts()
            .iter()
            .all(|attempt| attempt.status == AttemptStatus::NotFoundAtSource)
    );
    let mirrors: Vec<&str> = result
        .attempts()
        .iter()
        .map(|attempt| attempt.mirror.as_str())
        .collect();
    assert_eq!(mirrors, vec!["rcsb", "pdbe", "pdbj", "wwpdb"]);
}

#[test]
fn earliest_success_wins() {
    let client = ScriptedClient::default()
        .with("rcsb", Scripted::Found)
        .with("pdbe", Scripted::Found)
        .with("wwpdb", Scripted::Found);
    let resolver = FallbackResolver::new(EndpointRegistry::builtin(), client);

    let result = resolver
        .resolve(
            ArtifactFamily::Pdb,
            &accession("1jdn"),
            ArtifactKind::Cif,
            workspace(),
        )
        .unwrap();

    assert_eq!(result.source().map(|s| s.mirror.as_str()), Some("rcsb"));
    assert_eq!(result.attempts().len(), 1);
    assert_eq!(resolver.client().calls(), vec!["rcsb"]);
}

#[test]
fn transient_failure_moves_to_next_mirror() {
    let client = ScriptedClient::default()
        .with("pdbj", Scripted::Broken)
        .with("wwpdb", Scripted::Found);
    let resolver = FallbackResolver::new(EndpointRegistry::builtin(), client);

    let result = resolver
        .resolve(
            ArtifactFamily::Emdb,
            &accession("11082"),
            ArtifactKind::Map,
            workspace(),
        )
        .unwrap();

    assert_eq!(result.source().map(|s| s.mirror.as_str()), Some("wwpdb"));
    assert_eq!(
        statuses(&result),
        vec![
            AttemptStatus::TransientError {
                cause: "status 503".to_string()
            },
            AttemptStatus::Success,
        ]
    );
}

#[test]
fn transient_failure_on_last_mirror_exhausts_chain() {
    let client = ScriptedClient::default()
        .with("pdbj", Scripted::Broken)
        .with("wwpdb", Scripted::Broken)
        .with("pdbe", Scripted::Broken);
    let resolver = FallbackResolver::new(EndpointRegistry::builtin(), client);

    let result = resolver
        .resolve(
            ArtifactFamily::Emdb,
            &accession("11082"),
            ArtifactKind::Image,
            workspace(),
        )
        .unwrap();

    assert_matches!(result, ResolvedResult::ExhaustedAllSources { ref attempts, .. } if attempts.len() == 3);
    assert_eq!(resolver.client().calls(), vec!["pdbj", "wwpdb", "pdbe"]);
}

#[test]
fn unsupported_pair_is_rejected_without_attempts() {
    let resolver = FallbackResolver::new(EndpointRegistry::builtin(), ScriptedClient::default());

    let err = resolver
        .resolve(
            ArtifactFamily::Empiar,
            &accession("10026"),
            ArtifactKind::Map,
            workspace(),
        )
        .unwrap_err();

    assert_matches!(
        err,
        CryoError::UnsupportedKind {
            family: ArtifactFamily::Empiar,
            kind: ArtifactKind::Map
        }
    );
    assert!(resolver.client().calls().is_empty());
}

#[test]
fn repeated_resolution_is_stable() {
    let client = ScriptedClient::default().with("pdbe", Scripted::Found);
    let resolver = FallbackResolver::new(EndpointRegistry::builtin(), client);
    let id = accession("101d");

    let first = resolver
        .resolve(ArtifactFamily::Pdb, &id, ArtifactKind::Coordinates, workspace())
        .unwrap();
    let second = resolver
        .resolve(ArtifactFamily::Pdb, &id, ArtifactKind::Coordinates, workspace())
        .unwrap();

    assert_eq!(first.source(), second.source());
    assert_eq!(first.attempts(), second.attempts());
}

#[test]
fn document_endpoints_yield_metadata_records() {
    let body = "<emdEntry><deposition><title>Spike</title>\
                <depositionDate>2020-03-24</depositionDate></deposition></emdEntry>";
    let client = ScriptedClient::default()
        .with("pdbj", Scripted::Found)
        .with_body(body);
    let resolver = FallbackResolver::new(EndpointRegistry::builtin(), client);

    let result = resolver
        .resolve(
            ArtifactFamily::Emdb,
            &accession("11082"),
            ArtifactKind::Header,
            workspace(),
        )
        .unwrap();

    match result {
        ResolvedResult::Resolved {
            artifact: ResolvedArtifact::Record(record),
            ..
        } => {
            assert_eq!(record.structure_title, "Spike");
            assert_eq!(record.deposition_date, "2020-03-24");
        }
        other => panic!("expected metadata record, got {other:?}"),
    }
}

#[test]
fn attempt_urls_carry_the_accession() {
    let resolver = FallbackResolver::new(EndpointRegistry::builtin(), ScriptedClient::default());

    let result = resolver
        .resolve(
            ArtifactFamily::Pdb,
            &accession("101d"),
            ArtifactKind::Coordinates,
            workspace(),
        )
        .unwrap();

    let urls: Vec<&str> = result
        .attempts()
        .iter()
        .map(|attempt| attempt.url.as_str())
        .collect();
    assert_eq!(urls[0], "https://files.rcsb.org/download/101d.pdb.gz");
    assert!(urls[1].ends_with("/divided/pdb/01/pdb101d.ent.gz"));
    assert!(urls[2].ends_with("id=101d"));
    assert!(urls[3].ends_with("/pdb101d.ent.gz"));
}

#[test]
fn custom_registry_replaces_builtin_chain() {
    let chain = EndpointChain::new(vec![
        EndpointTemplate::new(
            "local",
            "http://localhost/{accession}.png",
            Transport::Http,
            ResponseShape::Binary,
        ),
        EndpointTemplate::new(
            "backup",
            "http://backup.invalid/{accession}.png",
            Transport::Http,
            ResponseShape::Binary,
        ),
    ])
    .unwrap();
    let registry = EndpointRegistry::empty().with_chain(ArtifactKind::Image, chain);
    let client = ScriptedClient::default().with("backup", Scripted::Found);
    let resolver = FallbackResolver::new(registry, client);

    let result = resolver
        .resolve(
            ArtifactFamily::Emdb,
            &accession("11082"),
            ArtifactKind::Image,
            workspace(),
        )
        .unwrap();

    assert_eq!(result.source().map(|s| s.mirror.as_str()), Some("backup"));
    assert_eq!(result.attempts()[1].url, "http://backup.invalid/11082.png");

    let missing = resolver.resolve(
        ArtifactFamily::Emdb,
        &accession("11082"),
        ArtifactKind::Map,
        workspace(),
    );
    assert_matches!(missing, Err(CryoError::UnsupportedKind { .. }));
}

#[test]
fn local_storage_failure_stops_the_walk() {
    let client = ScriptedClient::default()
        .with("pdbe", Scripted::DiskFull)
        .with("pdbj", Scripted::Found);
    let resolver = FallbackResolver::new(EndpointRegistry::builtin(), client);

    let result = resolver.resolve(
        ArtifactFamily::Pdb,
        &accession("101d"),
        ArtifactKind::Coordinates,
        workspace(),
    );

    assert_matches!(result, Err(CryoError::Filesystem(_)));
    assert_eq!(resolver.client().calls(), vec!["rcsb", "pdbe"]);
}
