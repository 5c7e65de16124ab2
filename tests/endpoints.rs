use assert_matches::assert_matches;

use cryofetch::domain::{Accession, ArtifactFamily, ArtifactKind};
use cryofetch::endpoints::{self, EndpointRegistry, ResponseShape, Transport};
use cryofetch::error::CryoError;

#[test]
fn every_family_kind_has_a_chain() {
    let registry = EndpointRegistry::builtin();
    for family in [ArtifactFamily::Pdb, ArtifactFamily::Emdb, ArtifactFamily::Empiar] {
        for kind in family.kinds() {
            let chain = registry.chain_for(family, *kind).unwrap();
            assert!(!chain.is_empty(), "{family} {kind}");
        }
    }
}

#[test]
fn chain_priority_order() {
    let mirrors = |family, kind| {
        endpoints::chain_for(family, kind)
            .unwrap()
            .mirrors()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
    };

    assert_eq!(
        mirrors(ArtifactFamily::Pdb, ArtifactKind::Coordinates),
        vec!["rcsb", "pdbe", "pdbj", "wwpdb"]
    );
    assert_eq!(
        mirrors(ArtifactFamily::Pdb, ArtifactKind::Metadata),
        vec!["rcsb", "pdbj"]
    );
    assert_eq!(
        mirrors(ArtifactFamily::Emdb, ArtifactKind::Header),
        vec!["pdbj", "wwpdb", "pdbe"]
    );
    assert_eq!(
        mirrors(ArtifactFamily::Empiar, ArtifactKind::RawArchive),
        vec!["pdbj"]
    );
}

#[test]
fn cross_family_pairs_are_unsupported() {
    assert_matches!(
        endpoints::chain_for(ArtifactFamily::Emdb, ArtifactKind::Cif),
        Err(CryoError::UnsupportedKind { .. })
    );
    assert_matches!(
        endpoints::chain_for(ArtifactFamily::Pdb, ArtifactKind::RawArchive),
        Err(CryoError::UnsupportedKind { .. })
    );
}

#[test]
fn emdb_urls() {
    let id: Accession = "11082".parse().unwrap();
    let chain = endpoints::chain_for(ArtifactFamily::Emdb, ArtifactKind::Map).unwrap();
    let first = &chain.templates()[0];

    assert_eq!(first.transport, Transport::Ftp);
    assert_eq!(first.response_shape, ResponseShape::Binary);
    assert_eq!(
        first.resolve_url(&id),
        "https://ftp.pdbj.org/pub/emdb/structures/EMD-11082/map/emd_11082.map.gz"
    );

    let header = endpoints::chain_for(ArtifactFamily::Emdb, ArtifactKind::Header).unwrap();
    assert!(
        header
            .templates()
            .iter()
            .all(|template| template.response_shape == ResponseShape::XmlDocument)
    );
}

#[test]
fn empiar_uses_rsync_module() {
    let id: Accession = "10026".parse().unwrap();
    let chain = endpoints::chain_for(ArtifactFamily::Empiar, ArtifactKind::RawArchive).unwrap();
    let template = &chain.templates()[0];

    assert_eq!(template.transport, Transport::Rsync);
    assert_eq!(
        template.resolve_url(&id),
        "empiar.pdbj.org::empiar/archive/10026"
    );
}
