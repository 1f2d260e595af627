//! Layer source fetching and background loading.
//!
//! Loads run as tokio tasks and report back over a channel, so the UI loop
//! never blocks on I/O and stays the only writer of the feature cache.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use geojson::FeatureCollection;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use super::decode;
use crate::error::LoadError;
use crate::layers::{LayerDef, SourceLocator};

/// Where a source will actually be read from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    Http(String),
    File(PathBuf),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Http(url) => f.write_str(url),
            Location::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Resolves and reads layer sources
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    data_dir: PathBuf,
    base_url: Option<String>,
    offline: bool,
}

impl Fetcher {
    pub fn new(data_dir: impl Into<PathBuf>, base_url: Option<String>, offline: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            data_dir: data_dir.into(),
            base_url,
            offline,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Absolute URLs go over HTTP, root-relative ones too when a base URL
    /// is set. Everything else, and everything when offline, is read from
    /// the data directory by file name.
    pub fn resolve(&self, source: &SourceLocator) -> Location {
        if !self.offline {
            if source.is_remote() {
                return Location::Http(source.url.clone());
            }
            if let Some(base) = &self.base_url {
                if source.url.starts_with('/') {
                    return Location::Http(format!("{}{}", base.trim_end_matches('/'), source.url));
                }
            }
        }
        Location::File(self.data_dir.join(&source.file))
    }

    /// Raw source text
    pub async fn fetch_text(&self, source: &SourceLocator) -> Result<String, LoadError> {
        let location = self.resolve(source);
        debug!(%location, "fetching layer source");

        match location {
            Location::Http(url) => {
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| LoadError::fetch(&url, e))?;

                if !response.status().is_success() {
                    return Err(LoadError::fetch(&url, format!("HTTP {}", response.status())));
                }

                response.text().await.map_err(|e| LoadError::fetch(&url, e))
            }
            Location::File(path) => tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| LoadError::fetch(path.display().to_string(), e)),
        }
    }
}

/// Fetch, parse, normalize and id-stamp one layer
pub async fn load_layer(fetcher: &Fetcher, layer: &LayerDef) -> Result<FeatureCollection, LoadError> {
    let text = fetcher.fetch_text(&layer.source).await?;
    decode(&text, layer.source.format())
}

/// Result of one background load
#[derive(Debug)]
pub struct LoadOutcome {
    pub layer_id: String,
    pub result: Result<FeatureCollection, LoadError>,
}

/// Spawns layer loads on a tokio runtime and collects their outcomes
pub struct Loader {
    handle: Handle,
    fetcher: Arc<Fetcher>,
    tx: UnboundedSender<LoadOutcome>,
    rx: UnboundedReceiver<LoadOutcome>,
}

impl Loader {
    pub fn new(handle: Handle, fetcher: Fetcher) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            handle,
            fetcher: Arc::new(fetcher),
            tx,
            rx,
        }
    }

    /// Start loading `layer` in the background
    pub fn spawn(&self, layer: LayerDef) {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        info!(layer = %layer.id, url = %layer.source.url, "loading layer");

        self.handle.spawn(async move {
            let result = load_layer(&fetcher, &layer).await;
            // The receiver only goes away on shutdown
            let _ = tx.send(LoadOutcome {
                layer_id: layer.id,
                result,
            });
        });
    }

    /// Outcomes that have arrived since the last call, without blocking
    pub fn drain(&mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Wait for the next outcome
    pub async fn recv(&mut self) -> Option<LoadOutcome> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const EMPTY_FC: &str = r#"{"type":"FeatureCollection","features":[]}"#;
    const ONE_POINT: &str = r#"var data = {"type":"FeatureCollection","features":[
        {"type":"Feature","geometry":{"type":"Point","coordinates":[131.5,-1.0]},"properties":{"NAMA":"IPAL"}}
    ]};"#;

    fn layer(url: &str, file: &str) -> LayerDef {
        LayerDef::new("test", "Test", SourceLocator::new(url, file), "#000")
    }

    #[test]
    fn test_resolve_rules() {
        let remote = SourceLocator::new("https://cdn.example.com/a.js", "a.js");
        let relative = SourceLocator::new("/data/b.json", "b.json");

        let plain = Fetcher::new("data", None, false);
        assert_eq!(plain.resolve(&remote), Location::Http("https://cdn.example.com/a.js".into()));
        assert_eq!(plain.resolve(&relative), Location::File(PathBuf::from("data/b.json")));

        let based = Fetcher::new("data", Some("http://localhost:8080/".into()), false);
        assert_eq!(based.resolve(&relative), Location::Http("http://localhost:8080/data/b.json".into()));

        let offline = Fetcher::new("data", Some("http://localhost:8080".into()), true);
        assert_eq!(offline.resolve(&remote), Location::File(PathBuf::from("data/a.js")));
    }

    #[tokio::test]
    async fn test_load_local_wrapped_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ipal.js"), ONE_POINT).unwrap();

        let fetcher = Fetcher::new(dir.path(), None, false);
        let fc = load_layer(&fetcher, &layer("/data/ipal.js", "ipal.js")).await.unwrap();
        assert_eq!(fc.features.len(), 1);
        assert!(fc.features[0].id.is_some());
    }

    #[tokio::test]
    async fn test_missing_local_file_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(dir.path(), None, false);
        let err = load_layer(&fetcher, &layer("/data/none.json", "none.json")).await.unwrap_err();
        match err {
            LoadError::Fetch { location, .. } => assert!(location.ends_with("none.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_http_fetch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/data/a.json")
            .with_status(200)
            .with_body(EMPTY_FC)
            .create_async()
            .await;

        let fetcher = Fetcher::new("unused", Some(server.url()), false);
        let fc = load_layer(&fetcher, &layer("/data/a.json", "a.json")).await.unwrap();
        assert!(fc.features.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/missing.js").with_status(404).create_async().await;

        let fetcher = Fetcher::new("unused", None, false);
        let url = format!("{}/missing.js", server.url());
        let err = load_layer(&fetcher, &layer(&url, "missing.js")).await.unwrap_err();
        match err {
            LoadError::Fetch { location, message } => {
                assert_eq!(location, url);
                assert!(message.contains("404"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_loader_reports_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ok.json"), EMPTY_FC).unwrap();
        fs::write(dir.path().join("bad.json"), "{\"type\": \"Topology\"}").unwrap();

        let mut loader = Loader::new(Handle::current(), Fetcher::new(dir.path(), None, true));
        let mut ok = layer("/data/ok.json", "ok.json");
        ok.id = "ok".into();
        let mut bad = layer("/data/bad.json", "bad.json");
        bad.id = "bad".into();
        loader.spawn(ok);
        loader.spawn(bad);

        let mut outcomes = vec![loader.recv().await.unwrap(), loader.recv().await.unwrap()];
        outcomes.sort_by(|a, b| a.layer_id.cmp(&b.layer_id));
        assert!(matches!(outcomes[0].result, Err(LoadError::UnsupportedFormat(_))));
        assert!(outcomes[1].result.is_ok());
        assert!(loader.drain().is_empty());
    }
}
