use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{Accession, ArtifactFamily, ArtifactKind};
use crate::error::CryoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Http,
    /// Public FTP archive tree, reached through the mirror's HTTPS front.
    Ftp,
    Rsync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    Binary,
    XmlDocument,
    HtmlDocument,
}

impl ResponseShape {
    pub fn is_document(self) -> bool {
        matches!(self, ResponseShape::XmlDocument | ResponseShape::HtmlDocument)
    }
}

/// One mirror location for an artifact. `base_url_pattern` understands the
/// `{accession}` and `{divided}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointTemplate {
    pub mirror: String,
    pub base_url_pattern: String,
    pub transport: Transport,
    pub response_shape: ResponseShape,
}

impl EndpointTemplate {
    pub fn new(
        mirror: &str,
        base_url_pattern: &str,
        transport: Transport,
        response_shape: ResponseShape,
    ) -> Self {
        Self {
            mirror: mirror.to_string(),
            base_url_pattern: base_url_pattern.to_string(),
            transport,
            response_shape,
        }
    }

    pub fn resolve_url(&self, accession: &Accession) -> String {
        self.base_url_pattern
            .replace("{divided}", &divided_segment(accession))
            .replace("{accession}", accession.as_str())
    }
}

/// Directory hash used by the divided PDB layout: `1abc` lives under `ab/`.
fn divided_segment(accession: &Accession) -> String {
    let lower = accession.as_str().to_lowercase();
    let chars: Vec<char> = lower.chars().collect();
    if chars.len() < 3 {
        return lower;
    }
    chars[1..3].iter().collect()
}

/// Priority-ordered mirrors for one (family, kind). Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointChain(Vec<EndpointTemplate>);

impl EndpointChain {
    pub fn new(templates: Vec<EndpointTemplate>) -> Option<Self> {
        if templates.is_empty() {
            return None;
        }
        Some(Self(templates))
    }

    pub fn templates(&self) -> &[EndpointTemplate] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn mirrors(&self) -> Vec<&str> {
        self.0.iter().map(|template| template.mirror.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    chains: HashMap<(ArtifactFamily, ArtifactKind), EndpointChain>,
}

impl EndpointRegistry {
    pub fn empty() -> Self {
        Self {
            chains: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        use ResponseShape::{Binary, HtmlDocument, XmlDocument};
        use Transport::{Ftp, Http, Rsync};

        let emdb = |path: &str, shape: ResponseShape| {
            vec![
                EndpointTemplate::new(
                    "pdbj",
                    &format!("https://ftp.pdbj.org/pub/emdb/structures/EMD-{{accession}}/{path}"),
                    Ftp,
                    shape,
                ),
                EndpointTemplate::new(
                    "wwpdb",
                    &format!("https://ftp.wwpdb.org/pub/emdb/structures/EMD-{{accession}}/{path}"),
                    Ftp,
                    shape,
                ),
            ]
        };

        let mut map = emdb("map/emd_{accession}.map.gz", Binary);
        map.push(EndpointTemplate::new(
            "pdbe",
            "https://ftp.ebi.ac.uk/pub/databases/emdb/structures/EMD-{accession}/map/emd_{accession}.map.gz",
            Ftp,
            Binary,
        ));

        let mut image = emdb("images/emd_{accession}.png", Binary);
        image.push(EndpointTemplate::new(
            "pdbe",
            "https://ftp.ebi.ac.uk/pub/databases/emdb/structures/EMD-{accession}/images/emd_{accession}.png",
            Ftp,
            Binary,
        ));

        let mut header = emdb("header/emd-{accession}.xml", XmlDocument);
        header.push(EndpointTemplate::new(
            "pdbe",
            "https://www.ebi.ac.uk/pdbe/entry/download/EMD-{accession}/xml",
            Http,
            XmlDocument,
        ));

        Self::empty()
            .with_chain(
                ArtifactKind::Coordinates,
                EndpointChain(vec![
                    EndpointTemplate::new(
                        "rcsb",
                        "https://files.rcsb.org/download/{accession}.pdb.gz",
                        Http,
                        Binary,
                    ),
                    EndpointTemplate::new(
                        "pdbe",
                        "http://ftp.ebi.ac.uk/pub/databases/rcsb/pdb-remediated/data/structures/divided/pdb/{divided}/pdb{accession}.ent.gz",
                        Ftp,
                        Binary,
                    ),
                    EndpointTemplate::new(
                        "pdbj",
                        "https://pdbj.org/rest/downloadPDBfile?format=pdb&id={accession}",
                        Http,
                        Binary,
                    ),
                    EndpointTemplate::new(
                        "wwpdb",
                        "https://ftp.wwpdb.org/pub/pdb/data/structures/all/pdb/pdb{accession}.ent.gz",
                        Ftp,
                        Binary,
                    ),
                ]),
            )
            .with_chain(
                ArtifactKind::Cif,
                EndpointChain(vec![
                    EndpointTemplate::new(
                        "rcsb",
                        "https://files.rcsb.org/download/{accession}.cif.gz",
                        Http,
                        Binary,
                    ),
                    EndpointTemplate::new(
                        "pdbe",
                        "https://www.ebi.ac.uk/pdbe/entry-files/{accession}.cif",
                        Http,
                        Binary,
                    ),
                    EndpointTemplate::new(
                        "pdbj",
                        "https://pdbj.org/rest/downloadPDBfile?format=mmcif&id={accession}",
                        Http,
                        Binary,
                    ),
                    EndpointTemplate::new(
                        "wwpdb",
                        "https://ftp.wwpdb.org/pub/pdb/data/structures/all/mmCIF/{accession}.cif.gz",
                        Ftp,
                        Binary,
                    ),
                ]),
            )
            .with_chain(
                ArtifactKind::ProfileLink,
                EndpointChain(vec![
                    EndpointTemplate::new(
                        "rcsb",
                        "https://www.rcsb.org/structure/{accession}",
                        Http,
                        HtmlDocument,
                    ),
                    EndpointTemplate::new(
                        "pdbe",
                        "https://www.ebi.ac.uk/pdbe/entry/pdb/{accession}",
                        Http,
                        HtmlDocument,
                    ),
                    EndpointTemplate::new(
                        "pdbj",
                        "https://pdbj.org/mine/summary/{accession}",
                        Http,
                        HtmlDocument,
                    ),
                ]),
            )
            .with_chain(
                ArtifactKind::Metadata,
                EndpointChain(vec![
                    EndpointTemplate::new(
                        "rcsb",
                        "https://files.rcsb.org/download/{accession}-noatom.xml",
                        Http,
                        XmlDocument,
                    ),
                    EndpointTemplate::new(
                        "pdbj",
                        "https://pdbj.org/rest/downloadPDBfile?format=xml-noatom&id={accession}",
                        Http,
                        XmlDocument,
                    ),
                ]),
            )
            .with_chain(ArtifactKind::Map, EndpointChain(map))
            .with_chain(ArtifactKind::Image, EndpointChain(image))
            .with_chain(ArtifactKind::Header, EndpointChain(header))
            .with_chain(
                ArtifactKind::RawArchive,
                EndpointChain(vec![EndpointTemplate::new(
                    "pdbj",
                    "empiar.pdbj.org::empiar/archive/{accession}",
                    Rsync,
                    Binary,
                )]),
            )
    }

    /// Registers `chain` for `kind` under the kind's own family, replacing any
    /// previous chain.
    pub fn with_chain(mut self, kind: ArtifactKind, chain: EndpointChain) -> Self {
        self.chains.insert((kind.family(), kind), chain);
        self
    }

    pub fn chain_for(
        &self,
        family: ArtifactFamily,
        kind: ArtifactKind,
    ) -> Result<&EndpointChain, CryoError> {
        self.chains
            .get(&(family, kind))
            .ok_or(CryoError::UnsupportedKind { family, kind })
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Looks up the built-in mirror chain for a pair.
pub fn chain_for(family: ArtifactFamily, kind: ArtifactKind) -> Result<EndpointChain, CryoError> {
    EndpointRegistry::builtin().chain_for(family, kind).cloned()
}
