use chrono::{Days, NaiveDate};
use serde::Serialize;

use super::{apply_first, Matcher, Rule};
use crate::parser::lines::classify_lines;
use crate::parser::normalize::{parse_leading_int, push_unique, strip_thousands};
use crate::parser::sections::{gate_section, SectionExit};

pub const DEFAULT_SECTION: &str = "Roadtrip 2018";

/// Names whose presence anywhere in a line marks it as a country entry.
const COUNTRIES: &[&str] = &[
    "Albania", "Andorra", "Austria", "Belgium", "Bosnia", "Bulgaria", "Croatia", "Czech",
    "Denmark", "Estonia", "Finland", "France", "Germany", "Greece", "Hungary", "Iceland",
    "Ireland", "Italy", "Latvia", "Liechtenstein", "Lithuania", "Luxembourg", "Monaco",
    "Montenegro", "Netherlands", "Norway", "Poland", "Portugal", "Romania", "Serbia",
    "Slovakia", "Slovenia", "Spain", "Sweden", "Switzerland", "United_Kingdom",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRecord {
    pub name: String,
    pub duration: Option<i64>,
    pub locations: Option<i64>,
    pub distance: Option<String>,
    pub start_date: String,
    pub countries: Vec<String>,
    pub summary: Option<String>,
}

impl TripRecord {
    /// Last day of the trip, when the start date is ISO and the duration known.
    pub fn end_date(&self) -> Option<NaiveDate> {
        let start = NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d").ok()?;
        let days = u64::try_from(self.duration?).ok()?;
        start.checked_add_days(Days::new(days))
    }
}

#[derive(Default)]
struct Draft {
    name: Option<String>,
    duration: Option<i64>,
    locations: Option<i64>,
    distance: Option<String>,
    start_date: Option<String>,
    countries: Vec<String>,
    summary: Option<String>,
}

impl Draft {
    fn finish(self) -> Option<TripRecord> {
        Some(TripRecord {
            name: self.name?,
            duration: self.duration,
            locations: self.locations,
            distance: self.distance,
            start_date: self.start_date?,
            countries: self.countries,
            summary: self.summary,
        })
    }
}

// Field prefixes come before the country rule, so a summary that mentions a
// country is only a summary.
static RULES: &[Rule<Draft>] = &[
    Rule {
        matcher: Matcher::Prefix("- Trip name:"),
        apply: |d, v| d.name = Some(v.to_string()),
    },
    Rule {
        matcher: Matcher::Prefix("- Duration:"),
        apply: |d, v| d.duration = parse_leading_int(v),
    },
    Rule {
        matcher: Matcher::Prefix("- Locations:"),
        apply: |d, v| d.locations = parse_leading_int(v),
    },
    Rule {
        matcher: Matcher::Prefix("- Distance:"),
        apply: |d, v| d.distance = Some(strip_thousands(v)),
    },
    Rule {
        matcher: Matcher::Prefix("- Trip started:"),
        apply: |d, v| d.start_date = Some(v.to_string()),
    },
    Rule {
        matcher: Matcher::Prefix("- Summary:"),
        apply: |d, v| d.summary = Some(v.to_string()),
    },
    Rule {
        matcher: Matcher::AnyOf(COUNTRIES),
        apply: |d, v| push_unique(&mut d.countries, v),
    },
];

/// The trip described under every `section` heading in the document, or
/// `None` when its name or start date is missing.
pub fn parse_trip(text: &str, section: &str) -> Option<TripRecord> {
    let lines = classify_lines(text);
    gate_section(&lines, section, SectionExit::Reassign)
        .into_iter()
        .fold(Draft::default(), |mut draft, line| {
            apply_first(RULES, &mut draft, line);
            draft
        })
        .finish()
}
