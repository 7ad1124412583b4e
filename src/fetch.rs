use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::db::{self, FetchRow, PendingDocument};

const BASE_BACKOFF_MS: u64 = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {status} from {location}")]
    Status { location: String, status: u16 },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("cannot read {location}: {source}")]
    Io {
        location: String,
        source: std::io::Error,
    },
}

impl FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Request(e) => e.is_timeout() || e.is_connect(),
            FetchError::Io { .. } => false,
        }
    }

    fn status(&self) -> Option<i32> {
        match self {
            FetchError::Status { status, .. } => Some(i32::from(*status)),
            FetchError::Request(e) => e.status().map(|s| i32::from(s.as_u16())),
            FetchError::Io { .. } => None,
        }
    }
}

pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

pub struct FetchOptions {
    pub concurrency: usize,
    pub max_retries: u32,
}

/// Retrieve documents concurrently, saving each result as it arrives. A
/// failed retrieval is stored as an error row so the document counts as
/// fetched and never reaches the parser.
pub async fn fetch_documents_streaming(
    conn: &Connection,
    docs: Vec<PendingDocument>,
    opts: &FetchOptions,
) -> Result<FetchStats> {
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let semaphore = Arc::new(Semaphore::new(opts.concurrency.max(1)));
    let total = docs.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<FetchRow>(opts.concurrency.max(1) * 2);

    for doc in docs {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();
        let max_retries = opts.max_retries;

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let start = Instant::now();
            let result = fetch_with_retry(&client, &doc.location, max_retries).await;
            let latency_ms = Some(start.elapsed().as_millis() as i64);
            let row = match result {
                Ok((markdown, status)) => FetchRow {
                    document_id: doc.document_id,
                    kind: doc.kind,
                    location: doc.location,
                    markdown: Some(markdown),
                    status,
                    error: None,
                    latency_ms,
                },
                Err(e) => {
                    warn!("Fetch failed for {}: {}", doc.location, e);
                    FetchRow {
                        document_id: doc.document_id,
                        kind: doc.kind,
                        status: e.status(),
                        error: Some(e.to_string()),
                        location: doc.location,
                        markdown: None,
                        latency_ms,
                    }
                }
            };
            let _ = tx.send(row).await;
        });
    }

    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;
    while let Some(row) = rx.recv().await {
        if row.error.is_some() {
            errors += 1;
        } else {
            ok += 1;
        }
        db::save_fetch(conn, &row)?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Fetched {} documents ({} ok, {} errors)", total, ok, errors);

    Ok(FetchStats { total, ok, errors })
}

async fn fetch_with_retry(
    client: &reqwest::Client,
    location: &str,
    max_retries: u32,
) -> Result<(String, Option<i32>), FetchError> {
    let mut attempt = 0;
    loop {
        match fetch_one(client, location).await {
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let backoff = backoff_for(attempt);
                warn!(
                    "{} (attempt {}/{}), backing off {:.1}s",
                    e,
                    attempt + 1,
                    max_retries,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

fn backoff_for(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt)))
}

/// Read one document. HTTP(S) locations go over the network, anything else
/// is a local path.
pub async fn fetch_one(
    client: &reqwest::Client,
    location: &str,
) -> Result<(String, Option<i32>), FetchError> {
    if !(location.starts_with("http://") || location.starts_with("https://")) {
        debug!("Reading local document {}", location);
        let text = tokio::fs::read_to_string(location)
            .await
            .map_err(|source| FetchError::Io {
                location: location.to_string(),
                source,
            })?;
        return Ok((strip_images(&text), None));
    }

    debug!("Requesting {}", location);
    let response = client.get(location).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            location: location.to_string(),
            status: status.as_u16(),
        });
    }
    let text = response.text().await?;
    Ok((strip_images(&text), Some(i32::from(status.as_u16()))))
}

/// Remove markdown image syntax and collapse the blank runs it leaves.
fn strip_images(md: &str) -> String {
    let cleaned = IMAGE_RE.replace_all(md, "");
    BLANKS_RE.replace_all(&cleaned, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DocumentKind, Source};

    #[test]
    fn images_removed() {
        let md = "## Pinned Repositories\n![screenshot](https://x/y.png)\n\n\n\n1. **a**";
        assert_eq!(strip_images(md), "## Pinned Repositories\n\n1. **a**");
    }

    #[test]
    fn retry_policy() {
        let status = |s| FetchError::Status {
            location: "u".into(),
            status: s,
        };
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(404).is_retryable());
        assert_eq!(status(404).status(), Some(404));
    }

    #[test]
    fn backoff_doubles_then_saturates() {
        assert_eq!(backoff_for(0), Duration::from_millis(500));
        assert_eq!(backoff_for(3), Duration::from_millis(4000));
        assert_eq!(backoff_for(64), Duration::from_millis(u64::MAX));
        assert_eq!(backoff_for(u32::MAX), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn local_document() {
        let client = reqwest::Client::new();
        let (text, status) = fetch_one(&client, "tests/fixtures/github.md").await.unwrap();
        assert!(text.contains("## Pinned Repositories"));
        assert_eq!(status, None);
    }

    #[tokio::test]
    async fn missing_local_document_is_io_error() {
        let client = reqwest::Client::new();
        let err = fetch_one(&client, "tests/fixtures/missing.md").await.unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn streaming_saves_every_result() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        db::insert_sources(
            &conn,
            &[
                Source {
                    kind: DocumentKind::Projects,
                    location: "tests/fixtures/github.md".into(),
                },
                Source {
                    kind: DocumentKind::Travel,
                    location: "tests/fixtures/missing.md".into(),
                },
            ],
        )
        .unwrap();
        let pending = db::fetch_unfetched(&conn, None).unwrap();
        let opts = FetchOptions {
            concurrency: 2,
            max_retries: 0,
        };
        let stats = fetch_documents_streaming(&conn, pending, &opts).await.unwrap();
        assert_eq!((stats.total, stats.ok, stats.errors), (2, 1, 1));
        assert!(db::fetch_unfetched(&conn, None).unwrap().is_empty());
        assert_eq!(db::fetch_unprocessed(&conn, None).unwrap().len(), 1);
    }
}
