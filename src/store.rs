use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::{Builder, NamedTempFile};

use crate::domain::{Accession, ArtifactFamily, ArtifactKind};
use crate::endpoints::EndpointTemplate;
use crate::error::CryoError;
use crate::probe::Payload;
use crate::resolver::ResolvedArtifact;

const PROVENANCE_DIR: &str = ".cryofetch";

/// Output directory. Everything is written through a uniquely named temporary
/// file and renamed into place, so a final name never holds a partial file and
/// concurrent writers to distinct names do not collide.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: Utf8PathBuf,
}

impl OutputStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<(), CryoError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| CryoError::Filesystem(err.to_string()))
    }

    pub fn artifact_path(&self, kind: ArtifactKind, accession: &Accession) -> Utf8PathBuf {
        let id = accession.as_str();
        match kind {
            ArtifactKind::Coordinates => self.root.join(format!("pdb{id}.ent.gz")),
            ArtifactKind::Cif => self.root.join(format!("{id}.cif.gz")),
            ArtifactKind::ProfileLink => self.root.join(format!("link_pdb{id}.txt")),
            ArtifactKind::Metadata => self.root.join(format!("metadata_pdb{id}.txt")),
            ArtifactKind::Map => self.root.join(format!("emd_{id}.map.gz")),
            ArtifactKind::Image => self.root.join(format!("emd_{id}.png")),
            ArtifactKind::Header => self.root.join(format!("header_emd_{id}.txt")),
            ArtifactKind::RawArchive => archive_dir(&self.root, accession),
        }
    }

    pub fn provenance_path(
        &self,
        family: ArtifactFamily,
        accession: &Accession,
        kind: ArtifactKind,
    ) -> Utf8PathBuf {
        self.root
            .join(PROVENANCE_DIR)
            .join(family.to_string())
            .join(accession.as_str())
            .join(format!("{kind}.json"))
    }

    /// Moves a resolved artifact under its final name and records where it
    /// came from. Returns the final path.
    pub fn persist(
        &self,
        family: ArtifactFamily,
        accession: &Accession,
        kind: ArtifactKind,
        artifact: ResolvedArtifact,
        source: &EndpointTemplate,
        url: &str,
    ) -> Result<Utf8PathBuf, CryoError> {
        let path = self.artifact_path(kind, accession);
        let saved = match artifact {
            ResolvedArtifact::Payload(Payload::Staged(staged)) => {
                Self::persist_staged(staged, &path)?;
                path
            }
            ResolvedArtifact::Payload(Payload::Bytes(bytes)) => {
                Self::write_bytes_atomic(&path, &bytes)?;
                path
            }
            ResolvedArtifact::Payload(Payload::Document(text)) => {
                Self::write_bytes_atomic(&path, text.as_bytes())?;
                path
            }
            ResolvedArtifact::Payload(Payload::Synced(dir)) => dir,
            ResolvedArtifact::Record(record) => {
                let text = match kind {
                    ArtifactKind::ProfileLink => {
                        format!("URL: {url}\nTitle: {}\n", record.structure_title)
                    }
                    _ => record.to_header_text(),
                };
                Self::write_bytes_atomic(&path, text.as_bytes())?;
                path
            }
        };

        let provenance = Provenance {
            family,
            kind,
            accession: accession.as_str().to_string(),
            mirror: source.mirror.clone(),
            url: url.to_string(),
            path: saved.to_string(),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("cryofetch/{}", env!("CARGO_PKG_VERSION")),
        };
        Self::write_provenance(&self.provenance_path(family, accession, kind), &provenance)?;
        Ok(saved)
    }

    pub fn write_provenance(path: &Utf8Path, provenance: &Provenance) -> Result<(), CryoError> {
        let content = serde_json::to_vec_pretty(provenance)
            .map_err(|err| CryoError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }

    pub fn read_provenance(path: &Utf8Path) -> Result<Provenance, CryoError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| CryoError::Filesystem(err.to_string()))?;
        serde_json::from_str(&content).map_err(|err| CryoError::Filesystem(err.to_string()))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), CryoError> {
        let mut temp = Self::temp_beside(path)?;
        temp.write_all(content)
            .map_err(|err| CryoError::Filesystem(err.to_string()))?;
        Self::persist_staged(temp, path)
    }

    pub fn persist_staged(staged: NamedTempFile, dest: &Utf8Path) -> Result<(), CryoError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| CryoError::Filesystem(err.to_string()))?;
        }
        staged
            .persist(dest.as_std_path())
            .map_err(|err| CryoError::Filesystem(format!("persist {dest}: {}", err.error)))?;
        Ok(())
    }

    fn temp_beside(path: &Utf8Path) -> Result<NamedTempFile, CryoError> {
        let parent = path
            .parent()
            .ok_or_else(|| CryoError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| CryoError::Filesystem(err.to_string()))?;
        Builder::new()
            .prefix(".cryofetch-")
            .suffix(".part")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| CryoError::Filesystem(err.to_string()))
    }
}

/// Directory an archive synchronisation writes into.
pub fn archive_dir(root: &Utf8Path, accession: &Accession) -> Utf8PathBuf {
    root.join(accession.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub family: ArtifactFamily,
    pub kind: ArtifactKind,
    pub accession: String,
    pub mirror: String,
    pub url: String,
    pub path: String,
    pub downloaded_at: String,
    pub tool: String,
}
