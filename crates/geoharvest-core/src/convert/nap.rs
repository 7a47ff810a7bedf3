//! Converter for the namespaced ISO metadata documents fetched over CSW.
//!
//! One XML document carries both locales: French text lives in
//! `PT_FreeText/textGroup/LocalisedCharacterString` branches next to the
//! English `gco:CharacterString` elements.

use std::sync::Arc;

use roxmltree::{Document, Node};

use crate::convert::{ConversionOutcome, DatasetConverter, RejectReason};
use crate::crosswalk::Crosswalk;
use crate::error::AppError;
use crate::fields::{bbox_polygon, clean_keyword, coerce_date, extract_urls, DateBound};
use crate::model::{
    CanonicalDataset, DatasetResource, RawRecord, RecordState, DEFAULT_BROWSE_GRAPHIC,
};

const GMD: &str = "http://www.isotc211.org/2005/gmd";
const GCO: &str = "http://www.isotc211.org/2005/gco";
const GML: &str = "http://www.opengis.net/gml";
const XLINK: &str = "http://www.w3.org/1999/xlink";

/// One namespaced step along an element path.
type Step<'a> = (&'a str, &'a str);

const IDENT: &[Step] = &[(GMD, "identificationInfo"), (GMD, "MD_DataIdentification")];

/// Builds canonical datasets from ISO metadata documents. The document
/// is rejected when a mandatory bilingual field is absent.
#[derive(Clone)]
pub struct NapConverter {
    crosswalk: Arc<Crosswalk>,
}

impl NapConverter {
    pub fn new(crosswalk: Arc<Crosswalk>) -> Self {
        Self { crosswalk }
    }
}

impl DatasetConverter for NapConverter {
    fn convert(&self, record: &RawRecord) -> Result<ConversionOutcome, AppError> {
        let Some(payload) = &record.payload_en else {
            return Ok(ConversionOutcome::Rejected(RejectReason::MissingEnglishRecord));
        };
        let doc = Document::parse(payload)?;
        let root = doc.root_element();

        let mut ds = CanonicalDataset {
            owner_org: "ec".to_string(),
            catalog_type: "Geo Data | G\u{e9}o".to_string(),
            presentation_form: "Document Digital | Document num\u{e9}rique".to_string(),
            spatial_representation_type: "Vector | Vecteur".to_string(),
            ready_to_publish: true,
            state: RecordState::Active,
            ..Default::default()
        };

        let identifier = first_text(
            root,
            &[(GMD, "fileIdentifier"), (GCO, "CharacterString")],
        );
        ds.id = if identifier.is_empty() {
            record.uuid.clone()
        } else {
            identifier
        };

        let citation_title = join(IDENT, &[(GMD, "citation"), (GMD, "CI_Citation"), (GMD, "title")]);
        ds.title = first_text(root, &join(&citation_title, &[(GCO, "CharacterString")]));
        if ds.title.is_empty() {
            return Ok(ConversionOutcome::Rejected(RejectReason::MissingEnglishTitle));
        }
        ds.title_fra = first_text(root, &join(&citation_title, LOCALISED));
        if ds.title_fra.is_empty() {
            return Ok(ConversionOutcome::Rejected(RejectReason::MissingFrenchTitle));
        }

        let abstract_path = join(IDENT, &[(GMD, "abstract")]);
        ds.notes = first_text(root, &join(&abstract_path, &[(GCO, "CharacterString")]));
        ds.notes_fra = first_text(root, &join(&abstract_path, LOCALISED));

        let temporal = join(
            IDENT,
            &[
                (GMD, "extent"),
                (GMD, "EX_Extent"),
                (GMD, "temporalElement"),
                (GMD, "EX_TemporalExtent"),
                (GMD, "extent"),
                (GML, "TimePeriod"),
            ],
        );
        ds.time_period_coverage_start = coerce_date(
            &first_text(root, &join(&temporal, &[(GML, "beginPosition")])),
            DateBound::Start,
        )
        .unwrap_or_default();
        ds.time_period_coverage_end = coerce_date(
            &first_text(root, &join(&temporal, &[(GML, "endPosition")])),
            DateBound::End,
        )
        .unwrap_or_default();

        // Homepage and endpoint URLs are buried in free-text supplemental
        // information, first URL then second.
        let supplemental = join(IDENT, &[(GMD, "supplementalInformation")]);
        let urls_en = extract_urls(&first_text(
            root,
            &join(&supplemental, &[(GCO, "CharacterString")]),
        ));
        let urls_fr = extract_urls(&first_text(root, &join(&supplemental, LOCALISED)));
        if let Some(url) = urls_en.first() {
            ds.url = url.clone();
        }
        if let Some(url) = urls_fr.first() {
            ds.url_fra = url.clone();
        }
        if let Some(url) = urls_en.get(1) {
            ds.endpoint_url = url.clone();
        }
        if let Some(url) = urls_fr.get(1) {
            ds.endpoint_url_fra = url.clone();
        }

        let topic_path = join(IDENT, &[(GMD, "topicCategory"), (GMD, "MD_TopicCategoryCode")]);
        let raw_topics: Vec<String> = collect_nodes(root, &topic_path)
            .iter()
            .filter_map(|n| n.text())
            .map(str::to_string)
            .collect();
        let resolution = self.crosswalk.resolve_topics(&raw_topics);
        if resolution.topics.is_empty() || resolution.subjects.is_empty() {
            return Ok(ConversionOutcome::Rejected(RejectReason::NoRecognizedTopics));
        }
        ds.topic_category = resolution.topics;
        ds.subject = resolution.subjects;

        let keyword_path = join(
            IDENT,
            &[
                (GMD, "descriptiveKeywords"),
                (GMD, "MD_Keywords"),
                (GMD, "keyword"),
            ],
        );
        ds.keywords = split_keywords(&first_text(
            root,
            &join(&keyword_path, &[(GCO, "CharacterString")]),
        ));
        if ds.keywords.is_empty() {
            return Ok(ConversionOutcome::Rejected(RejectReason::MissingKeywords));
        }
        ds.keywords_fra = split_keywords(&first_text(root, &join(&keyword_path, LOCALISED)));
        if ds.keywords_fra.is_empty() {
            return Ok(ConversionOutcome::Rejected(RejectReason::MissingKeywords));
        }

        let bbox = join(
            IDENT,
            &[
                (GMD, "extent"),
                (GMD, "EX_Extent"),
                (GMD, "geographicElement"),
                (GMD, "EX_GeographicBoundingBox"),
            ],
        );
        let corner = |edge: &'static str| {
            first_text(root, &join(&bbox, &[(GMD, edge), (GCO, "Decimal")]))
        };
        ds.spatial = bbox_polygon(
            &corner("westBoundLongitude"),
            &corner("eastBoundLongitude"),
            &corner("northBoundLatitude"),
            &corner("southBoundLatitude"),
        );

        ds.date_published = first_text(
            root,
            &join(
                &citation_title[..citation_title.len() - 1],
                &[(GMD, "date"), (GMD, "CI_Date"), (GMD, "date"), (GCO, "Date")],
            ),
        );

        let graphic = first_text(
            root,
            &join(
                IDENT,
                &[
                    (GMD, "graphicOverview"),
                    (GMD, "MD_BrowseGraphic"),
                    (GMD, "fileName"),
                    (GCO, "CharacterString"),
                ],
            ),
        );
        ds.browse_graphic_url = if graphic.is_empty() {
            DEFAULT_BROWSE_GRAPHIC.to_string()
        } else {
            graphic
        };

        let frequency_path = join(
            IDENT,
            &[
                (GMD, "resourceMaintenance"),
                (GMD, "MD_MaintenanceInformation"),
                (GMD, "maintenanceAndUpdateFrequency"),
                (GMD, "MD_MaintenanceFrequencyCode"),
            ],
        );
        let frequency_code = collect_nodes(root, &frequency_path)
            .first()
            .and_then(|n| n.attribute("codeListValue"))
            .unwrap_or("");
        ds.maintenance_and_update_frequency = Crosswalk::frequency(frequency_code).to_string();

        let online_path = [
            (GMD, "distributionInfo"),
            (GMD, "MD_Distribution"),
            (GMD, "transferOptions"),
            (GMD, "MD_DigitalTransferOptions"),
            (GMD, "onLine"),
        ];
        for online in collect_nodes(root, &online_path) {
            if let Some(resource) = self.read_resource(online) {
                ds.resources.push(resource);
            }
        }
        ds.resources.sort_by(|a, b| a.url.cmp(&b.url));

        Ok(ConversionOutcome::Converted(Box::new(ds)))
    }
}

const LOCALISED: &[Step] = &[
    (GMD, "PT_FreeText"),
    (GMD, "textGroup"),
    (GMD, "LocalisedCharacterString"),
];

impl NapConverter {
    fn read_resource(&self, online: Node<'_, '_>) -> Option<DatasetResource> {
        let language = match online.attribute((XLINK, "role")) {
            Some("urn:xml:lang:eng-CAN") => "eng; CAN",
            Some("urn:xml:lang:fra-CAN") => "fra; CAN",
            _ => "zxx; CAN",
        };
        let name_text = first_text(
            online,
            &[
                (GMD, "CI_OnlineResource"),
                (GMD, "name"),
                (GCO, "CharacterString"),
            ],
        );
        let name = if name_text.is_empty() {
            if language == "eng; CAN" {
                "Dataset".to_string()
            } else {
                "Donn\u{e9}es".to_string()
            }
        } else {
            name_text
        };
        let url = first_text(
            online,
            &[
                (GMD, "CI_OnlineResource"),
                (GMD, "linkage"),
                (GMD, "URL"),
            ],
        );
        if url.is_empty() {
            return None;
        }
        let format = guess_format(&name);
        Some(DatasetResource {
            name_fra: name.clone(),
            name,
            url,
            format: format.to_string(),
            language: language.to_string(),
            ..Default::default()
        })
    }
}

/// File format guessed from the resource display name.
fn guess_format(name: &str) -> &'static str {
    let lowered = name.to_lowercase();
    if lowered.contains("csv") {
        "CSV"
    } else if lowered.contains("html") {
        "HTML"
    } else {
        "other"
    }
}

fn join(base: &[Step<'static>], tail: &[Step<'static>]) -> Vec<Step<'static>> {
    let mut path = base.to_vec();
    path.extend_from_slice(tail);
    path
}

fn collect_nodes<'a, 'input>(node: Node<'a, 'input>, path: &[Step]) -> Vec<Node<'a, 'input>> {
    let mut out = Vec::new();
    descend(node, path, &mut out);
    out
}

fn descend<'a, 'input>(node: Node<'a, 'input>, path: &[Step], out: &mut Vec<Node<'a, 'input>>) {
    let Some(((ns, name), rest)) = path.split_first() else {
        out.push(node);
        return;
    };
    for child in node.children().filter(Node::is_element) {
        if child.tag_name().name() == *name && child.tag_name().namespace() == Some(*ns) {
            descend(child, rest, out);
        }
    }
}

/// Text of the first matching element in document order, with the
/// provider's right apostrophes and parentheses normalized.
fn first_text(node: Node<'_, '_>, path: &[Step]) -> String {
    let nodes = collect_nodes(node, path);
    let Some(first) = nodes.first() else {
        return String::new();
    };
    match first.text() {
        Some(text) => text
            .replace('\u{2019}', "'")
            .replace('(', " ")
            .replace(')', " "),
        None => String::new(),
    }
}

/// The provider packs a comma-separated keyword list into one element,
/// with stray semicolons standing in for spaces.
fn split_keywords(raw: &str) -> Vec<String> {
    let mut keywords: Vec<String> = raw
        .replace(';', " ")
        .split(',')
        .map(clean_keyword)
        .filter(|k| !k.is_empty())
        .collect();
    keywords.sort();
    keywords.dedup();
    keywords
}
