use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::parser::extract::{projects, trip};

const DEFAULT_DB_PATH: &str = "data/portfolio.sqlite";
const DEFAULT_CONFIG_FILE: &str = "portfolio";
const ENV_PREFIX: &str = "PORTFOLIO";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Projects,
    Travel,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Projects => "projects",
            DocumentKind::Travel => "travel",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "projects" => Ok(DocumentKind::Projects),
            "travel" => Ok(DocumentKind::Travel),
            other => anyhow::bail!("unknown document kind '{}' (expected projects or travel)", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Source {
    pub kind: DocumentKind,
    /// `http(s)://` URL or local path.
    pub location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_path: PathBuf,
    pub projects_section: String,
    pub trip_section: String,
    pub concurrency: usize,
    pub max_retries: u32,
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
}

fn default_sources() -> Vec<Source> {
    vec![
        Source {
            kind: DocumentKind::Projects,
            location: "content/github.md".into(),
        },
        Source {
            kind: DocumentKind::Travel,
            location: "content/travel.md".into(),
        },
    ]
}

impl Settings {
    /// Defaults, then the config file (if present), then `PORTFOLIO_*` env vars.
    pub fn load(file: Option<&str>) -> Result<Self> {
        let file = file.unwrap_or(DEFAULT_CONFIG_FILE);
        config::Config::builder()
            .set_default("database_path", DEFAULT_DB_PATH)?
            .set_default("projects_section", projects::DEFAULT_SECTION)?
            .set_default("trip_section", trip::DEFAULT_SECTION)?
            .set_default("concurrency", 4)?
            .set_default("max_retries", 3)?
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let s = Settings::load(Some("does/not/exist")).unwrap();
        assert_eq!(s.projects_section, "Pinned Repositories");
        assert_eq!(s.trip_section, "Roadtrip 2018");
        assert_eq!(s.concurrency, 4);
        assert_eq!(s.max_retries, 3);
        assert_eq!(s.sources, default_sources());
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [DocumentKind::Projects, DocumentKind::Travel] {
            assert_eq!(kind.as_str().parse::<DocumentKind>().unwrap(), kind);
        }
        assert!("certs".parse::<DocumentKind>().is_err());
    }
}
