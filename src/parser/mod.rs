pub mod extract;
pub mod lines;
pub mod normalize;
pub mod sections;

use crate::config::{DocumentKind, Settings};
use crate::db::FetchedDocument;
use extract::projects::{self, ProjectRecord};
use extract::trip::{self, TripRecord};

/// Labels of the sections each document kind is read from.
#[derive(Debug, Clone)]
pub struct SectionLabels {
    pub projects: String,
    pub trip: String,
}

impl Default for SectionLabels {
    fn default() -> Self {
        Self {
            projects: projects::DEFAULT_SECTION.to_string(),
            trip: trip::DEFAULT_SECTION.to_string(),
        }
    }
}

impl From<&Settings> for SectionLabels {
    fn from(settings: &Settings) -> Self {
        Self {
            projects: settings.projects_section.clone(),
            trip: settings.trip_section.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Projects(Vec<ProjectRecord>),
    Trip(Option<TripRecord>),
}

impl Extracted {
    pub fn record_count(&self) -> usize {
        match self {
            Extracted::Projects(p) => p.len(),
            Extracted::Trip(t) => usize::from(t.is_some()),
        }
    }
}

/// Pipeline: text → classified lines → gated section → records.
pub fn extract_text(kind: DocumentKind, text: &str, labels: &SectionLabels) -> Extracted {
    match kind {
        DocumentKind::Projects => Extracted::Projects(projects::parse_projects(text, &labels.projects)),
        DocumentKind::Travel => Extracted::Trip(trip::parse_trip(text, &labels.trip)),
    }
}

pub struct ProcessedDocument {
    pub document_data_id: i64,
    pub extracted: Extracted,
}

pub fn process_document(doc: &FetchedDocument, labels: &SectionLabels) -> ProcessedDocument {
    ProcessedDocument {
        document_data_id: doc.document_data_id,
        extracted: extract_text(doc.kind, &doc.markdown, labels),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_by_kind() {
        let labels = SectionLabels::default();
        let md = std::fs::read_to_string("tests/fixtures/github.md").unwrap();
        assert!(matches!(
            extract_text(DocumentKind::Projects, &md, &labels),
            Extracted::Projects(p) if p.len() == 4
        ));
        // A project list holds no trip section.
        assert_eq!(extract_text(DocumentKind::Travel, &md, &labels), Extracted::Trip(None));
    }

    #[test]
    fn record_counts() {
        assert_eq!(Extracted::Projects(vec![]).record_count(), 0);
        assert_eq!(Extracted::Trip(None).record_count(), 0);
        let md = std::fs::read_to_string("tests/fixtures/travel.md").unwrap();
        assert_eq!(
            extract_text(DocumentKind::Travel, &md, &SectionLabels::default()).record_count(),
            1
        );
    }

    #[test]
    fn shipped_content_parses() {
        let labels = SectionLabels::default();
        let github = std::fs::read_to_string("content/github.md").unwrap();
        match extract_text(DocumentKind::Projects, &github, &labels) {
            Extracted::Projects(p) => {
                assert_eq!(p.len(), 6);
                assert!(p.iter().all(|x| x.title != "three.js"));
            }
            other => panic!("unexpected {:?}", other),
        }
        let travel = std::fs::read_to_string("content/travel.md").unwrap();
        match extract_text(DocumentKind::Travel, &travel, &labels) {
            Extracted::Trip(Some(t)) => {
                assert_eq!(t.name, "Europe_Van_Trip");
                assert_eq!(t.distance.as_deref(), Some("18912"));
                assert_eq!(t.countries.len(), 14);
                assert_eq!(t.countries.first().map(String::as_str), Some("Belgium"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn configured_labels_are_used() {
        let labels = SectionLabels {
            projects: "Popular Repositories".into(),
            trip: "Roadtrip 2016".into(),
        };
        let github = std::fs::read_to_string("tests/fixtures/github.md").unwrap();
        match extract_text(DocumentKind::Projects, &github, &labels) {
            Extracted::Projects(p) => assert_eq!(p[0].title, "old-dotfiles"),
            other => panic!("unexpected {:?}", other),
        }
        let travel = std::fs::read_to_string("tests/fixtures/travel.md").unwrap();
        match extract_text(DocumentKind::Travel, &travel, &labels) {
            Extracted::Trip(Some(t)) => assert_eq!(t.countries, vec!["Croatia", "Slovenia"]),
            other => panic!("unexpected {:?}", other),
        }
    }
}
