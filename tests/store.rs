use std::fs;
use std::io::Write;

use camino::Utf8PathBuf;

use cryofetch::domain::{Accession, ArtifactFamily, ArtifactKind};
use cryofetch::endpoints::{EndpointTemplate, ResponseShape, Transport};
use cryofetch::metadata::MetadataRecord;
use cryofetch::probe::Payload;
use cryofetch::resolver::ResolvedArtifact;
use cryofetch::store::OutputStore;

fn temp_store() -> (tempfile::TempDir, OutputStore) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, OutputStore::new(root))
}

fn template(mirror: &str, shape: ResponseShape) -> EndpointTemplate {
    EndpointTemplate::new(mirror, "https://example.org/{accession}", Transport::Http, shape)
}

#[test]
fn layout_paths() {
    let store = OutputStore::new(Utf8PathBuf::from("output"));
    let pdb: Accession = "101d".parse().unwrap();

    assert!(
        store
            .artifact_path(ArtifactKind::ProfileLink, &pdb)
            .ends_with("link_pdb101d.txt")
    );
    assert!(
        store
            .artifact_path(ArtifactKind::Metadata, &pdb)
            .ends_with("metadata_pdb101d.txt")
    );
    assert_eq!(
        store.provenance_path(ArtifactFamily::Pdb, &pdb, ArtifactKind::Cif),
        Utf8PathBuf::from("output/.cryofetch/pdb/101d/cif.json")
    );
}

#[test]
fn staged_payload_is_renamed_into_place() {
    let (_temp, store) = temp_store();
    let id: Accession = "101d".parse().unwrap();
    let mut staged = tempfile::Builder::new()
        .prefix(".cryofetch-")
        .suffix(".part")
        .tempfile_in(store.root())
        .unwrap();
    staged.write_all(b"HEADER    DNA").unwrap();

    let saved = store
        .persist(
            ArtifactFamily::Pdb,
            &id,
            ArtifactKind::Coordinates,
            ResolvedArtifact::Payload(Payload::Staged(staged)),
            &template("pdbj", ResponseShape::Binary),
            "https://example.org/101d",
        )
        .unwrap();

    assert_eq!(saved, store.root().join("pdb101d.ent.gz"));
    assert_eq!(fs::read_to_string(&saved).unwrap(), "HEADER    DNA");
    let leftovers = fs::read_dir(store.root())
        .unwrap()
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".part"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn profile_link_is_written_as_text() {
    let (_temp, store) = temp_store();
    let id: Accession = "101d".parse().unwrap();
    let record = MetadataRecord {
        structure_title: "RCSB PDB - 101D".to_string(),
        ..MetadataRecord::default()
    };

    let saved = store
        .persist(
            ArtifactFamily::Pdb,
            &id,
            ArtifactKind::ProfileLink,
            ResolvedArtifact::Record(record),
            &template("rcsb", ResponseShape::HtmlDocument),
            "https://www.rcsb.org/structure/101d",
        )
        .unwrap();

    assert_eq!(
        fs::read_to_string(&saved).unwrap(),
        "URL: https://www.rcsb.org/structure/101d\nTitle: RCSB PDB - 101D\n"
    );
}

#[test]
fn provenance_records_source() {
    let (_temp, store) = temp_store();
    let id: Accession = "11082".parse().unwrap();

    store
        .persist(
            ArtifactFamily::Emdb,
            &id,
            ArtifactKind::Image,
            ResolvedArtifact::Payload(Payload::Bytes(vec![0x89, b'P', b'N', b'G'])),
            &template("wwpdb", ResponseShape::Binary),
            "https://example.org/11082",
        )
        .unwrap();

    let path = store.provenance_path(ArtifactFamily::Emdb, &id, ArtifactKind::Image);
    let provenance = OutputStore::read_provenance(&path).unwrap();
    assert_eq!(provenance.family, ArtifactFamily::Emdb);
    assert_eq!(provenance.accession, "11082");
    assert_eq!(provenance.mirror, "wwpdb");
    assert_eq!(provenance.url, "https://example.org/11082");
    assert!(provenance.path.ends_with("emd_11082.png"));
    assert!(provenance.tool.starts_with("cryofetch/"));
    assert!(chrono::DateTime::parse_from_rfc3339(&provenance.downloaded_at).is_ok());
}

#[test]
fn synced_archive_keeps_its_directory() {
    let (_temp, store) = temp_store();
    let id: Accession = "10026".parse().unwrap();
    let dir = store.artifact_path(ArtifactKind::RawArchive, &id);
    fs::create_dir_all(&dir).unwrap();

    let saved = store
        .persist(
            ArtifactFamily::Empiar,
            &id,
            ArtifactKind::RawArchive,
            ResolvedArtifact::Payload(Payload::Synced(dir.clone())),
            &EndpointTemplate::new(
                "pdbj",
                "empiar.pdbj.org::empiar/archive/{accession}",
                Transport::Rsync,
                ResponseShape::Binary,
            ),
            "empiar.pdbj.org::empiar/archive/10026",
        )
        .unwrap();

    assert_eq!(saved, dir);
    assert!(
        store
            .provenance_path(ArtifactFamily::Empiar, &id, ArtifactKind::RawArchive)
            .exists()
    );
}
