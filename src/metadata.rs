//! Field extraction from EMDB header XML, PDBML and HTML entry pages.
//!
//! Documents are parsed leniently as HTML, so element and attribute names are
//! compared case-insensitively and namespace prefixes (`PDBx:`) are ignored.
//! Extraction is total: anything missing or malformed yields an empty field.

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::domain::ArtifactKind;
use crate::endpoints::ResponseShape;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub structure_title: String,
    pub cross_references: String,
    pub deposition_date: String,
    pub header_release_date: String,
    pub map_release_date: String,
    pub article_title: String,
    pub pubmed_id: String,
    pub doi: String,
    pub issn: String,
}

impl MetadataRecord {
    pub fn to_header_text(&self) -> String {
        let mut text = String::new();
        text.push_str(&format!("Structure Title: {}\n", self.structure_title));
        text.push_str(&format!("Fitted PDBs: {}\n", self.cross_references));
        text.push_str(&format!("Deposition Date: {}\n", self.deposition_date));
        text.push_str(&format!("Header Release Date: {}\n", self.header_release_date));
        text.push_str(&format!("Map Release Date: {}\n", self.map_release_date));
        text.push_str(&format!("Article Title: {}\n", self.article_title));
        text.push_str(&format!("Pubmed ID: {}\n", self.pubmed_id));
        text.push_str(&format!("Article Link: {}\n", self.doi));
        text.push_str(&format!("ISSN: {}\n", self.issn));
        text
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TagSelector {
    pub tag: &'static str,
    pub attribute: Option<(&'static str, &'static str)>,
}

impl TagSelector {
    pub const fn tag(tag: &'static str) -> Self {
        Self {
            tag,
            attribute: None,
        }
    }

    pub const fn with_attribute(tag: &'static str, name: &'static str, value: &'static str) -> Self {
        Self {
            tag,
            attribute: Some((name, value)),
        }
    }

    fn matches(&self, element: &ElementRef<'_>) -> bool {
        let value = element.value();
        if !local_name(value.name()).eq_ignore_ascii_case(self.tag) {
            return false;
        }
        match self.attribute {
            None => true,
            Some((name, expected)) => value.attrs().any(|(attr, actual)| {
                local_name(attr).eq_ignore_ascii_case(name)
                    && actual.trim().eq_ignore_ascii_case(expected)
            }),
        }
    }
}

/// Selects `select` elements, optionally only those nested inside `within`.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub within: Option<TagSelector>,
    pub select: TagSelector,
}

impl FieldRule {
    pub const fn anywhere(select: TagSelector) -> Self {
        Self {
            within: None,
            select,
        }
    }

    pub const fn inside(within: TagSelector, select: TagSelector) -> Self {
        Self {
            within: Some(within),
            select,
        }
    }
}

/// Where each record field lives in one document dialect. Citation fields are
/// only read inside `reference_marker`.
#[derive(Debug, Clone, Copy)]
pub struct MetadataSchema {
    pub structure_title: Option<FieldRule>,
    pub deposition_date: Option<FieldRule>,
    pub header_release_date: Option<FieldRule>,
    pub map_release_date: Option<FieldRule>,
    pub cross_references: Option<FieldRule>,
    pub reference_marker: Option<TagSelector>,
    pub article_title: Option<TagSelector>,
    pub pubmed_id: Option<TagSelector>,
    pub doi: Option<TagSelector>,
    pub issn: Option<TagSelector>,
}

pub const EMDB_HEADER: MetadataSchema = MetadataSchema {
    structure_title: Some(FieldRule::anywhere(TagSelector::tag("title"))),
    deposition_date: Some(FieldRule::anywhere(TagSelector::tag("depositionDate"))),
    header_release_date: Some(FieldRule::anywhere(TagSelector::tag("headerReleaseDate"))),
    map_release_date: Some(FieldRule::anywhere(TagSelector::tag("mapReleaseDate"))),
    cross_references: Some(FieldRule::anywhere(TagSelector::tag("fittedPDBEntryId"))),
    reference_marker: Some(TagSelector::with_attribute(
        "primaryReference",
        "published",
        "true",
    )),
    article_title: Some(TagSelector::tag("articleTitle")),
    pubmed_id: Some(TagSelector::with_attribute("externalReference", "type", "pubmed")),
    doi: Some(TagSelector::with_attribute("externalReference", "type", "doi")),
    issn: Some(TagSelector::with_attribute("externalReference", "type", "issn")),
};

pub const PDBML: MetadataSchema = MetadataSchema {
    structure_title: Some(FieldRule::inside(
        TagSelector::tag("struct"),
        TagSelector::tag("title"),
    )),
    deposition_date: Some(FieldRule::inside(
        TagSelector::tag("pdbx_database_status"),
        TagSelector::tag("recvd_initial_deposition_date"),
    )),
    header_release_date: Some(FieldRule::inside(
        TagSelector::tag("pdbx_audit_revision_history"),
        TagSelector::tag("revision_date"),
    )),
    map_release_date: None,
    cross_references: Some(FieldRule::inside(
        TagSelector::tag("pdbx_database_related"),
        TagSelector::tag("db_id"),
    )),
    reference_marker: Some(TagSelector::with_attribute("citation", "id", "primary")),
    article_title: Some(TagSelector::tag("title")),
    pubmed_id: Some(TagSelector::tag("pdbx_database_id_PubMed")),
    doi: Some(TagSelector::tag("pdbx_database_id_DOI")),
    issn: Some(TagSelector::tag("journal_id_ISSN")),
};

pub const HTML_PAGE: MetadataSchema = MetadataSchema {
    structure_title: Some(FieldRule::anywhere(TagSelector::tag("title"))),
    deposition_date: None,
    header_release_date: None,
    map_release_date: None,
    cross_references: None,
    reference_marker: None,
    article_title: None,
    pubmed_id: None,
    doi: None,
    issn: None,
};

pub fn schema_for(kind: ArtifactKind, shape: ResponseShape) -> &'static MetadataSchema {
    match (kind, shape) {
        (_, ResponseShape::HtmlDocument) => &HTML_PAGE,
        (ArtifactKind::Metadata, _) => &PDBML,
        _ => &EMDB_HEADER,
    }
}

pub fn extract(document: &str, schema: &MetadataSchema) -> MetadataRecord {
    let html = Html::parse_document(document);
    let root = html.root_element();

    let mut record = MetadataRecord {
        structure_title: first_text(root, schema.structure_title),
        cross_references: joined_text(root, schema.cross_references),
        deposition_date: first_text(root, schema.deposition_date),
        header_release_date: first_text(root, schema.header_release_date),
        map_release_date: first_text(root, schema.map_release_date),
        ..MetadataRecord::default()
    };

    let published = schema
        .reference_marker
        .and_then(|marker| find_all(root, marker).next());
    if let Some(reference) = published {
        let within = |selector: Option<TagSelector>| {
            selector
                .and_then(|selector| {
                    find_all(reference, selector)
                        .map(element_text)
                        .find(|text| !text.is_empty())
                })
                .unwrap_or_default()
        };
        record.article_title = within(schema.article_title);
        record.pubmed_id = within(schema.pubmed_id);
        record.doi = within(schema.doi);
        record.issn = within(schema.issn);
    }

    record
}

fn first_text(root: ElementRef<'_>, rule: Option<FieldRule>) -> String {
    rule.and_then(|rule| {
        rule_texts(root, rule)
            .into_iter()
            .find(|text| !text.is_empty())
    })
    .unwrap_or_default()
}

fn joined_text(root: ElementRef<'_>, rule: Option<FieldRule>) -> String {
    let Some(rule) = rule else {
        return String::new();
    };
    rule_texts(root, rule)
        .into_iter()
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn rule_texts(root: ElementRef<'_>, rule: FieldRule) -> Vec<String> {
    match rule.within {
        None => find_all(root, rule.select).map(element_text).collect(),
        Some(scope) => find_all(root, scope)
            .flat_map(|parent| {
                find_all(parent, rule.select)
                    .map(element_text)
                    .collect::<Vec<_>>()
            })
            .collect(),
    }
}

fn find_all<'a>(
    scope: ElementRef<'a>,
    selector: TagSelector,
) -> impl Iterator<Item = ElementRef<'a>> {
    scope
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |element| selector.matches(element))
}

/// Direct text children only. The HTML parser keeps self-closed XML elements
/// open, so descendant text can belong to following siblings.
fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            raw.push_str(text);
        }
    }
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}
