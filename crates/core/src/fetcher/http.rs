//! Fetcher for HTTP(S) sources and local files.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::error::FetchError;
use super::traits::CatalogFetcher;
use super::types::{FetchKind, FetchLocation, FetchProgress, FetchRequest, FetchedCatalog};
use crate::catalog::{parse_catalog, ParseOptions};
use crate::config::RemoteConfig;

/// Report progress at most once per this many bytes.
const PROGRESS_STEP: u64 = 1024 * 1024;

/// Upper bound for buffer preallocation from an announced length.
const MAX_PREALLOC: u64 = 256 * 1024 * 1024;

/// Build the HTTP client shared by the fetcher and the freshness probe.
///
/// The timeout bounds connecting and each read, so a full list may take as
/// long as it keeps arriving. Callers wanting a total bound set it per request.
pub fn build_client(remote: &RemoteConfig) -> Result<Client, FetchError> {
    Client::builder()
        .connect_timeout(remote.timeout())
        .read_timeout(remote.timeout())
        .user_agent(remote.user_agent.clone())
        .build()
        .map_err(FetchError::from_reqwest)
}

/// Catalog fetcher reading from HTTP(S) or the local filesystem.
pub struct HttpCatalogFetcher {
    client: Client,
}

impl HttpCatalogFetcher {
    pub fn new(remote: &RemoteConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(remote)?,
        })
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn download(
        &self,
        url: &str,
        run_id: &str,
        progress_tx: &mpsc::Sender<FetchProgress>,
    ) -> Result<Vec<u8>, FetchError> {
        debug!("Downloading catalog from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16(), url));
        }

        let total_bytes = response.content_length();
        let mut buffer = Vec::with_capacity(total_bytes.unwrap_or(0).min(MAX_PREALLOC) as usize);
        let mut last_report = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(FetchError::from_reqwest)?;
            buffer.extend_from_slice(&chunk);

            let bytes_read = buffer.len() as u64;
            if bytes_read - last_report >= PROGRESS_STEP {
                report(progress_tx, run_id, bytes_read, total_bytes);
                last_report = bytes_read;
            }
        }
        report(progress_tx, run_id, buffer.len() as u64, total_bytes);

        Ok(buffer)
    }
}

async fn read_file(
    path: &Path,
    run_id: &str,
    progress_tx: &mpsc::Sender<FetchProgress>,
) -> Result<Vec<u8>, FetchError> {
    debug!("Reading catalog from {:?}", path);

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FetchError::NotFound(path.display().to_string())
        } else {
            FetchError::Io(e)
        }
    })?;

    let size = bytes.len() as u64;
    report(progress_tx, run_id, size, Some(size));
    Ok(bytes)
}

fn report(
    progress_tx: &mpsc::Sender<FetchProgress>,
    run_id: &str,
    bytes_read: u64,
    total_bytes: Option<u64>,
) {
    // a slow or absent consumer must not stall the download
    let _ = progress_tx.try_send(FetchProgress {
        run_id: run_id.to_string(),
        bytes_read,
        total_bytes,
    });
}

/// Parse off the async runtime; payloads run to 10^5 entries.
async fn parse(bytes: Vec<u8>, options: ParseOptions) -> Result<FetchedCatalog, FetchError> {
    let size = bytes.len() as u64;
    let (catalog, stats) =
        tokio::task::spawn_blocking(move || parse_catalog(&bytes, &options, Utc::now()))
            .await
            .map_err(|e| FetchError::Malformed(format!("parser task failed: {}", e)))?
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

    Ok(FetchedCatalog {
        catalog,
        stats,
        bytes: size,
    })
}

/// A full list replaces the whole catalog, so it must identify itself and
/// carry entries. Anything else is an error body that happened to be JSON.
fn check_full_list(fetched: &FetchedCatalog) -> Result<(), FetchError> {
    if fetched.catalog.id().is_empty() {
        return Err(FetchError::Malformed("full list without id".to_string()));
    }
    if fetched.stats.read == 0 {
        return Err(FetchError::Malformed("full list without entries".to_string()));
    }
    Ok(())
}

#[async_trait]
impl CatalogFetcher for HttpCatalogFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_with_progress(
        &self,
        request: FetchRequest,
        progress_tx: mpsc::Sender<FetchProgress>,
    ) -> Result<FetchedCatalog, FetchError> {
        let bytes = match &request.target.location {
            FetchLocation::Remote(url) => {
                self.download(url, &request.run_id, &progress_tx).await?
            }
            FetchLocation::File(path) => read_file(path, &request.run_id, &progress_tx).await?,
        };

        let fetched = parse(bytes, request.options).await?;
        if request.target.kind == FetchKind::Full {
            check_full_list(&fetched)?;
        }
        info!(
            "Fetched {} catalog from {}: {} entries ({} bytes, {} dropped as too old)",
            request.target.kind,
            request.target.location,
            fetched.stats.kept,
            fetched.bytes,
            fetched.stats.too_old
        );
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchTarget;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const PAYLOAD: &str = r#"{
        "meta": {"id": "list-1", "generated_at": "2026-10-18T06:00:00Z"},
        "entries": [
            {"channel": "ARD", "topic": "Tagesschau", "title": "20 Uhr", "url": "https://a/1.mp4"},
            {"title": "17 Uhr", "url": "https://a/2.mp4"}
        ]
    }"#;

    fn file_request(path: &Path) -> FetchRequest {
        FetchRequest {
            run_id: "run-1".to_string(),
            target: FetchTarget::full(FetchLocation::File(path.to_path_buf())),
            options: ParseOptions::default(),
        }
    }

    fn fetcher() -> HttpCatalogFetcher {
        HttpCatalogFetcher::new(&RemoteConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(PAYLOAD.as_bytes()).unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let fetched = fetcher()
            .fetch_with_progress(file_request(file.path()), tx)
            .await
            .unwrap();

        assert_eq!(fetched.catalog.id(), "list-1");
        assert_eq!(fetched.catalog.len(), 2);
        assert_eq!(fetched.catalog.entries[1].channel, "ARD");
        assert_eq!(fetched.bytes, PAYLOAD.len() as u64);

        let progress = rx.recv().await.unwrap();
        assert_eq!(progress.run_id, "run-1");
        assert_eq!(progress.bytes_read, PAYLOAD.len() as u64);
        assert_eq!(progress.total_bytes, Some(PAYLOAD.len() as u64));
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_not_found() {
        let err = fetcher()
            .fetch(file_request(Path::new("/nonexistent/filmliste.json")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_fetch_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"entries\": [ {").unwrap();

        let err = fetcher().fetch(file_request(file.path())).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_full_list_without_id_or_entries_is_malformed() {
        for body in [
            r#"{"meta": {"id": ""}, "entries": [{"url": "u1"}]}"#,
            r#"{"meta": {"id": "list-1"}, "entries": []}"#,
        ] {
            let mut file = NamedTempFile::new().unwrap();
            file.write_all(body.as_bytes()).unwrap();

            let err = fetcher().fetch(file_request(file.path())).await.unwrap_err();
            assert!(matches!(err, FetchError::Malformed(_)), "{} gave {:?}", body, err);
        }
    }

    #[tokio::test]
    async fn test_empty_diff_is_accepted() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"meta": {"id": "diff-1"}, "entries": []}"#)
            .unwrap();
        let request = FetchRequest {
            target: FetchTarget::diff(FetchLocation::File(file.path().to_path_buf())),
            ..file_request(file.path())
        };

        let fetched = fetcher().fetch(request).await.unwrap();
        assert!(fetched.catalog.is_empty());
    }

    /// Serve `PAYLOAD` once, in pieces spaced `pause` apart.
    async fn serve_slowly(pause: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;

            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                PAYLOAD.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            for piece in PAYLOAD.as_bytes().chunks(PAYLOAD.len() / 4 + 1) {
                tokio::time::sleep(pause).await;
                socket.write_all(piece).await.unwrap();
                socket.flush().await.unwrap();
            }
        });
        format!("http://{}/Filmliste-akt.json", addr)
    }

    #[tokio::test]
    async fn test_download_outlasting_timeout_succeeds_while_data_flows() {
        let url = serve_slowly(Duration::from_millis(600)).await;
        let remote = RemoteConfig {
            timeout_secs: 1,
            ..Default::default()
        };
        let request = FetchRequest {
            run_id: "run-3".to_string(),
            target: FetchTarget::full(FetchLocation::Remote(url)),
            options: ParseOptions::default(),
        };

        let fetched = HttpCatalogFetcher::new(&remote)
            .unwrap()
            .fetch(request)
            .await
            .unwrap();

        assert_eq!(fetched.catalog.id(), "list-1");
        assert_eq!(fetched.bytes, PAYLOAD.len() as u64);
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_network_error() {
        let request = FetchRequest {
            run_id: "run-2".to_string(),
            target: FetchTarget {
                kind: FetchKind::Diff,
                location: FetchLocation::Remote("http://127.0.0.1:1/diff.json".to_string()),
            },
            options: ParseOptions::default(),
        };

        let err = fetcher().fetch(request).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)), "got {:?}", err);
    }
}
