//! Webpack Encore extension: inline the sources of an entry.

use std::path::{Path, PathBuf};

use url::Url;

use crate::config::WebpackEncoreConfig;
use crate::encore::{EncoreError, EntrypointLookupCollection};

use super::ExtensionKind;

#[derive(Debug)]
pub struct WebpackEncoreExtension {
    collection: EntrypointLookupCollection,
    build_paths: Vec<PathBuf>,
    client: reqwest::Client,
}

impl WebpackEncoreExtension {
    pub fn new(config: &WebpackEncoreConfig) -> Self {
        Self::with_collection(
            EntrypointLookupCollection::from_config(config),
            config.output_paths.iter().map(PathBuf::from).collect(),
        )
    }

    pub fn with_collection(collection: EntrypointLookupCollection, build_paths: Vec<PathBuf>) -> Self {
        Self {
            collection,
            build_paths,
            client: reqwest::Client::new(),
        }
    }

    pub fn collection(&self) -> &EntrypointLookupCollection {
        &self.collection
    }

    pub fn build_paths(&self) -> &[PathBuf] {
        &self.build_paths
    }

    pub fn functions(&self) -> &'static [&'static str] {
        ExtensionKind::WebpackEncore.info().functions
    }

    /// Every CSS file of `entry`, shared chunks included.
    pub fn css_files(&self, entry: &str, build: Option<&str>) -> Result<Vec<String>, EncoreError> {
        let lookup = self.collection.get(build)?;
        lookup.all_css_files(entry)
    }

    /// Every JavaScript file of `entry`, shared chunks included.
    pub fn js_files(&self, entry: &str, build: Option<&str>) -> Result<Vec<String>, EncoreError> {
        let lookup = self.collection.get(build)?;
        lookup.all_js_files(entry)
    }

    /// `encore_entry_css_source`
    pub async fn css_source(&self, entry: &str, build: Option<&str>) -> Result<String, EncoreError> {
        let files = self.css_files(entry, build)?;
        self.concatenate(&files).await
    }

    /// `encore_entry_js_source`
    pub async fn js_source(&self, entry: &str, build: Option<&str>) -> Result<String, EncoreError> {
        let files = self.js_files(entry, build)?;
        self.concatenate(&files).await
    }

    async fn concatenate(&self, files: &[String]) -> Result<String, EncoreError> {
        let mut source = String::new();
        for file in files {
            source.push_str(&self.read_asset(file).await?);
        }
        Ok(source)
    }

    async fn read_asset(&self, entry: &str) -> Result<String, EncoreError> {
        match Url::parse(entry) {
            Ok(url) => self.read_url(entry, url).await,
            Err(_) => {
                let path = self.locate(entry).await;
                read_file(&path).await
            }
        }
    }

    async fn read_url(&self, entry: &str, url: Url) -> Result<String, EncoreError> {
        match url.scheme() {
            "http" | "https" => {
                tracing::debug!(url = %url, "Fetching Encore asset");
                let fetch = |source| EncoreError::Fetch {
                    url: entry.to_string(),
                    source,
                };
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(fetch)?;
                response.text().await.map_err(fetch)
            }
            "file" => match url.to_file_path() {
                Ok(path) => read_file(&path).await,
                Err(()) => Err(EncoreError::UnsupportedScheme(entry.to_string())),
            },
            _ => Err(EncoreError::UnsupportedScheme(entry.to_string())),
        }
    }

    /// First build path holding `entry`, or `entry` itself.
    async fn locate(&self, entry: &str) -> PathBuf {
        let relative = entry.trim_start_matches('/');
        for base in &self.build_paths {
            let candidate = base.join(relative);
            if tokio::fs::File::open(&candidate).await.is_ok() {
                return candidate;
            }
        }
        PathBuf::from(entry)
    }
}

async fn read_file(path: &Path) -> Result<String, EncoreError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| EncoreError::Asset {
            path: path.to_path_buf(),
            source,
        })
}
