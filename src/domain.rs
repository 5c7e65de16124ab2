use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CryoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFamily {
    Pdb,
    Emdb,
    Empiar,
}

impl ArtifactFamily {
    pub fn kinds(self) -> &'static [ArtifactKind] {
        match self {
            ArtifactFamily::Pdb => &[
                ArtifactKind::Coordinates,
                ArtifactKind::Cif,
                ArtifactKind::ProfileLink,
                ArtifactKind::Metadata,
            ],
            ArtifactFamily::Emdb => &[ArtifactKind::Map, ArtifactKind::Image, ArtifactKind::Header],
            ArtifactFamily::Empiar => &[ArtifactKind::RawArchive],
        }
    }

    /// Kinds fetched when a request does not name any.
    pub fn default_kinds(self) -> BTreeSet<ArtifactKind> {
        match self {
            ArtifactFamily::Pdb => [ArtifactKind::Coordinates, ArtifactKind::Cif]
                .into_iter()
                .collect(),
            ArtifactFamily::Emdb | ArtifactFamily::Empiar => self.kinds().iter().copied().collect(),
        }
    }
}

impl fmt::Display for ArtifactFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactFamily::Pdb => write!(f, "pdb"),
            ArtifactFamily::Emdb => write!(f, "emdb"),
            ArtifactFamily::Empiar => write!(f, "empiar"),
        }
    }
}

impl FromStr for ArtifactFamily {
    type Err = CryoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdb" => Ok(ArtifactFamily::Pdb),
            "emdb" => Ok(ArtifactFamily::Emdb),
            "empiar" => Ok(ArtifactFamily::Empiar),
            _ => Err(CryoError::InvalidFamily(value.to_string())),
        }
    }
}

/// Downloadable product of an entry. Ordering follows declaration order, which
/// is also the order pairs are processed in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Coordinates,
    Cif,
    ProfileLink,
    Metadata,
    Map,
    Image,
    Header,
    RawArchive,
}

impl ArtifactKind {
    pub fn family(self) -> ArtifactFamily {
        match self {
            ArtifactKind::Coordinates
            | ArtifactKind::Cif
            | ArtifactKind::ProfileLink
            | ArtifactKind::Metadata => ArtifactFamily::Pdb,
            ArtifactKind::Map | ArtifactKind::Image | ArtifactKind::Header => ArtifactFamily::Emdb,
            ArtifactKind::RawArchive => ArtifactFamily::Empiar,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Coordinates => "coordinates",
            ArtifactKind::Cif => "cif",
            ArtifactKind::ProfileLink => "profile_link",
            ArtifactKind::Metadata => "metadata",
            ArtifactKind::Map => "map",
            ArtifactKind::Image => "image",
            ArtifactKind::Header => "header",
            ArtifactKind::RawArchive => "raw_archive",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ArtifactKind {
    type Err = CryoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "coordinates" | "pdb" => Ok(ArtifactKind::Coordinates),
            "cif" | "mmcif" => Ok(ArtifactKind::Cif),
            "profile_link" | "links" => Ok(ArtifactKind::ProfileLink),
            "metadata" => Ok(ArtifactKind::Metadata),
            "map" => Ok(ArtifactKind::Map),
            "image" => Ok(ArtifactKind::Image),
            "header" => Ok(ArtifactKind::Header),
            "raw_archive" | "archive" => Ok(ArtifactKind::RawArchive),
            _ => Err(CryoError::InvalidKind(value.to_string())),
        }
    }
}

/// Opaque, case-sensitive entry identifier. Only surrounding whitespace is
/// stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = CryoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CryoError::EmptyAccession);
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct AccessionRequest {
    pub accession: Accession,
    pub family: ArtifactFamily,
    pub kinds_requested: BTreeSet<ArtifactKind>,
}

impl AccessionRequest {
    pub fn new(
        accession: Accession,
        family: ArtifactFamily,
        kinds_requested: BTreeSet<ArtifactKind>,
    ) -> Self {
        Self {
            accession,
            family,
            kinds_requested,
        }
    }

    pub fn with_default_kinds(accession: Accession, family: ArtifactFamily) -> Self {
        Self::new(accession, family, family.default_kinds())
    }
}
