use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::{apply_first, Matcher, Rule};
use crate::parser::lines::classify_lines;
use crate::parser::sections::{gate_section, SectionExit};

pub const DEFAULT_SECTION: &str = "Pinned Repositories";

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s+\*\*(.+?)\*\*").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    pub title: String,
    pub description: String,
    pub language: String,
}

#[derive(Default)]
struct Scan {
    done: Vec<ProjectRecord>,
    current: Option<ProjectRecord>,
}

impl Scan {
    fn start(&mut self, title: &str) {
        self.flush();
        self.current = Some(ProjectRecord {
            title: title.to_string(),
            ..Default::default()
        });
    }

    fn flush(&mut self) {
        if let Some(record) = self.current.take() {
            self.done.push(record);
        }
    }
}

static RULES: &[Rule<Scan>] = &[
    Rule {
        matcher: Matcher::Pattern(&TITLE_RE),
        apply: |scan, title| scan.start(title),
    },
    Rule {
        matcher: Matcher::Prefix("- Description:"),
        apply: |scan, text| {
            if let Some(record) = scan.current.as_mut() {
                record.description = text.to_string();
            }
        },
    },
    Rule {
        matcher: Matcher::Prefix("- Language:"),
        apply: |scan, text| {
            if let Some(record) = scan.current.as_mut() {
                record.language = text.to_string();
            }
        },
    },
];

/// Records listed under the `section` heading, in document order. The scan
/// stops at the first heading after that section.
pub fn parse_projects(text: &str, section: &str) -> Vec<ProjectRecord> {
    let lines = classify_lines(text);
    let mut scan = gate_section(&lines, section, SectionExit::StopAtNextHeading)
        .into_iter()
        .fold(Scan::default(), |mut scan, line| {
            apply_first(RULES, &mut scan, line);
            scan
        });
    scan.flush();
    scan.done
}
