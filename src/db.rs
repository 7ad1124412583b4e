use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::config::{DocumentKind, Source};
use crate::parser::extract::projects::ProjectRecord;
use crate::parser::extract::trip::TripRecord;
use crate::parser::{Extracted, ProcessedDocument};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            id         INTEGER PRIMARY KEY,
            kind       TEXT NOT NULL CHECK(kind IN ('projects','travel')),
            location   TEXT UNIQUE NOT NULL,
            fetched    BOOLEAN NOT NULL DEFAULT 0,
            fetched_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_documents_fetched ON documents(fetched);

        CREATE TABLE IF NOT EXISTS document_data (
            id          INTEGER PRIMARY KEY,
            document_id INTEGER NOT NULL REFERENCES documents(id),
            kind        TEXT NOT NULL,
            location    TEXT NOT NULL,
            markdown    TEXT,
            status      INTEGER,
            error       TEXT,
            latency_ms  INTEGER,
            fetched_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS processed_documents (
            document_data_id INTEGER PRIMARY KEY REFERENCES document_data(id),
            record_count     INTEGER NOT NULL,
            processed_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Extracted records
        CREATE TABLE IF NOT EXISTS projects (
            id               INTEGER PRIMARY KEY,
            document_data_id INTEGER NOT NULL REFERENCES document_data(id),
            position         INTEGER NOT NULL,
            title            TEXT NOT NULL,
            description      TEXT NOT NULL DEFAULT '',
            language         TEXT NOT NULL DEFAULT '',
            UNIQUE(document_data_id, position)
        );
        CREATE INDEX IF NOT EXISTS idx_projects_language ON projects(language);

        CREATE TABLE IF NOT EXISTS trips (
            document_data_id INTEGER PRIMARY KEY REFERENCES document_data(id),
            name             TEXT NOT NULL,
            duration_days    INTEGER,
            locations        INTEGER,
            distance         TEXT,
            start_date       TEXT NOT NULL,
            summary          TEXT
        );

        CREATE TABLE IF NOT EXISTS trip_countries (
            document_data_id INTEGER NOT NULL REFERENCES trips(document_data_id),
            position         INTEGER NOT NULL,
            country          TEXT NOT NULL,
            UNIQUE(document_data_id, position)
        );
        ",
    )?;
    Ok(())
}

// ── Sources ──

pub fn insert_sources(conn: &Connection, sources: &[Source]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt =
            tx.prepare("INSERT OR IGNORE INTO documents (kind, location) VALUES (?1, ?2)")?;
        for s in sources {
            count += stmt.execute(rusqlite::params![s.kind.as_str(), s.location])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub struct PendingDocument {
    pub document_id: i64,
    pub kind: DocumentKind,
    pub location: String,
}

pub fn fetch_unfetched(conn: &Connection, limit: Option<usize>) -> Result<Vec<PendingDocument>> {
    let sql = format!(
        "SELECT id, kind, location FROM documents WHERE fetched = 0 ORDER BY id{}",
        limit_clause(limit)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(document_id, kind, location)| -> Result<PendingDocument> {
            Ok(PendingDocument {
                document_id,
                kind: kind.parse()?,
                location,
            })
        })
        .collect()
}

/// Mark every document unfetched so the next fetch retrieves it again.
pub fn reset_fetched(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("UPDATE documents SET fetched = 0, fetched_at = NULL", [])?)
}

pub struct FetchRow {
    pub document_id: i64,
    pub kind: DocumentKind,
    pub location: String,
    pub markdown: Option<String>,
    pub status: Option<i32>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

pub fn save_fetch(conn: &Connection, row: &FetchRow) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO document_data (document_id, kind, location, markdown, status, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.document_id,
            row.kind.as_str(),
            row.location,
            row.markdown,
            row.status,
            row.error,
            row.latency_ms,
        ],
    )?;
    tx.execute(
        "UPDATE documents SET fetched = 1, fetched_at = datetime('now') WHERE id = ?1",
        rusqlite::params![row.document_id],
    )?;
    tx.commit()?;
    Ok(())
}

// ── Processing ──

pub struct FetchedDocument {
    pub document_data_id: i64,
    pub kind: DocumentKind,
    pub location: String,
    pub markdown: String,
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<FetchedDocument>> {
    let sql = format!(
        "SELECT dd.id, dd.kind, dd.location, dd.markdown
         FROM document_data dd
         LEFT JOIN processed_documents p ON p.document_data_id = dd.id
         WHERE dd.markdown IS NOT NULL AND p.document_data_id IS NULL
         ORDER BY dd.id{}",
        limit_clause(limit)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(document_data_id, kind, location, markdown)| -> Result<FetchedDocument> {
            Ok(FetchedDocument {
                document_data_id,
                kind: kind.parse()?,
                location,
                markdown,
            })
        })
        .collect()
}

/// Store extracted records, replacing whatever an earlier run stored for
/// the same fetched document.
pub fn save_processed(conn: &Connection, docs: &[ProcessedDocument]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut insert_project = tx.prepare(
            "INSERT INTO projects (document_data_id, position, title, description, language)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut insert_trip = tx.prepare(
            "INSERT INTO trips (document_data_id, name, duration_days, locations, distance, start_date, summary)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut insert_country = tx.prepare(
            "INSERT INTO trip_countries (document_data_id, position, country) VALUES (?1, ?2, ?3)",
        )?;
        let mut mark = tx.prepare(
            "INSERT OR REPLACE INTO processed_documents (document_data_id, record_count) VALUES (?1, ?2)",
        )?;

        for doc in docs {
            let id = doc.document_data_id;
            tx.execute("DELETE FROM trip_countries WHERE document_data_id = ?1", [id])?;
            tx.execute("DELETE FROM trips WHERE document_data_id = ?1", [id])?;
            tx.execute("DELETE FROM projects WHERE document_data_id = ?1", [id])?;

            match &doc.extracted {
                Extracted::Projects(projects) => {
                    for (i, p) in projects.iter().enumerate() {
                        insert_project.execute(rusqlite::params![
                            id, i as i64, p.title, p.description, p.language,
                        ])?;
                    }
                }
                Extracted::Trip(Some(t)) => {
                    insert_trip.execute(rusqlite::params![
                        id, t.name, t.duration, t.locations, t.distance, t.start_date, t.summary,
                    ])?;
                    for (i, country) in t.countries.iter().enumerate() {
                        insert_country.execute(rusqlite::params![id, i as i64, country])?;
                    }
                }
                Extracted::Trip(None) => {}
            }
            mark.execute(rusqlite::params![id, doc.extracted.record_count() as i64])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Reading records back ──

const LATEST_PROCESSED: &str = "SELECT MAX(p.document_data_id)
     FROM processed_documents p
     JOIN document_data dd ON dd.id = p.document_data_id
     WHERE dd.kind = ?1";

/// Projects from the most recently processed project document.
pub fn latest_projects(conn: &Connection) -> Result<Vec<ProjectRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT title, description, language FROM projects
         WHERE document_data_id = ({})
         ORDER BY position",
        LATEST_PROCESSED
    ))?;
    let rows = stmt
        .query_map([DocumentKind::Projects.as_str()], |row| {
            Ok(ProjectRecord {
                title: row.get(0)?,
                description: row.get(1)?,
                language: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The trip from the most recently processed travel document. `None` when
/// that document held no complete trip.
pub fn latest_trip(conn: &Connection) -> Result<Option<TripRecord>> {
    let trip = conn
        .query_row(
            &format!(
                "SELECT document_data_id, name, duration_days, locations, distance, start_date, summary
                 FROM trips WHERE document_data_id = ({})",
                LATEST_PROCESSED
            ),
            [DocumentKind::Travel.as_str()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    TripRecord {
                        name: row.get(1)?,
                        duration: row.get(2)?,
                        locations: row.get(3)?,
                        distance: row.get(4)?,
                        start_date: row.get(5)?,
                        countries: Vec::new(),
                        summary: row.get(6)?,
                    },
                ))
            },
        )
        .optional()?;

    let Some((id, mut trip)) = trip else {
        return Ok(None);
    };
    let mut stmt = conn.prepare(
        "SELECT country FROM trip_countries WHERE document_data_id = ?1 ORDER BY position",
    )?;
    trip.countries = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(trip))
}

// ── Stats ──

pub struct Stats {
    pub documents: i64,
    pub fetched: i64,
    pub unfetched: i64,
    pub fetch_errors: i64,
    pub processed: i64,
    pub projects: i64,
    pub trips: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    Ok(Stats {
        documents: count("SELECT COUNT(*) FROM documents")?,
        fetched: count("SELECT COUNT(*) FROM documents WHERE fetched = 1")?,
        unfetched: count("SELECT COUNT(*) FROM documents WHERE fetched = 0")?,
        fetch_errors: count("SELECT COUNT(*) FROM document_data WHERE error IS NOT NULL")?,
        processed: count("SELECT COUNT(*) FROM processed_documents")?,
        projects: count("SELECT COUNT(*) FROM projects")?,
        trips: count("SELECT COUNT(*) FROM trips")?,
    })
}

fn limit_clause(limit: Option<usize>) -> String {
    match limit {
        Some(n) => format!(" LIMIT {}", n),
        None => String::new(),
    }
}
