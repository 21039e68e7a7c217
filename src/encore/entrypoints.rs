//! `entrypoints.json` lookups.
//!
//! # Responsibilities
//! - Read the entrypoints file written by Encore
//! - Return the JS/CSS files of an entry
//! - Remember returned files so that shared chunks are only emitted once
//!
//! # Design Decisions
//! - The file is parsed lazily, on first use, and cached
//! - `reset()` forgets returned files but keeps the parsed file
//! - `all_*_files` ignore and keep clean the returned-file memory under a
//!   single lock, so concurrent callers never see a partial list

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;
use thiserror::Error;

use crate::config::WebpackEncoreConfig;

/// Name of the default build.
pub const DEFAULT_BUILD: &str = "_default";

/// File written by Encore into each output path.
pub const ENTRYPOINTS_FILE: &str = "entrypoints.json";

#[derive(Debug, Error)]
pub enum EncoreError {
    #[error("could not read entrypoints file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid entrypoints file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not find the entry \"{entry}\" in {path}; found: {available}")]
    UnknownEntry {
        entry: String,
        path: PathBuf,
        available: String,
    },

    #[error("no entrypoints are configured for build \"{0}\"")]
    UnknownBuild(String),

    #[error("could not read asset {path}: {source}")]
    Asset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not fetch asset {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unsupported asset URL scheme in {0}")]
    UnsupportedScheme(String),
}

#[derive(Debug, Default, Deserialize)]
struct EntrypointsFile {
    #[serde(default)]
    entrypoints: BTreeMap<String, EntryFiles>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EntryFiles {
    js: Vec<String>,
    css: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum FileKind {
    Js,
    Css,
}

#[derive(Debug, Default)]
struct LookupState {
    entries: Option<Arc<EntrypointsFile>>,
    returned: HashSet<String>,
}

/// Lookup over one `entrypoints.json`.
#[derive(Debug)]
pub struct EntrypointLookup {
    path: PathBuf,
    state: Mutex<LookupState>,
}

impl EntrypointLookup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(LookupState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// JavaScript files of `entry` not returned since the last reset.
    pub fn js_files(&self, entry: &str) -> Result<Vec<String>, EncoreError> {
        self.entry_files(entry, FileKind::Js)
    }

    /// CSS files of `entry` not returned since the last reset.
    pub fn css_files(&self, entry: &str) -> Result<Vec<String>, EncoreError> {
        self.entry_files(entry, FileKind::Css)
    }

    /// Every JavaScript file of `entry`, regardless of what was returned before.
    pub fn all_js_files(&self, entry: &str) -> Result<Vec<String>, EncoreError> {
        self.all_entry_files(entry, FileKind::Js)
    }

    /// Every CSS file of `entry`, regardless of what was returned before.
    pub fn all_css_files(&self, entry: &str) -> Result<Vec<String>, EncoreError> {
        self.all_entry_files(entry, FileKind::Css)
    }

    pub fn entry_exists(&self, entry: &str) -> Result<bool, EncoreError> {
        let mut state = self.lock();
        Ok(self.entries(&mut state)?.entrypoints.contains_key(entry))
    }

    /// Forget which files were already returned.
    pub fn reset(&self) {
        self.lock().returned.clear();
    }

    fn entry_files(&self, entry: &str, kind: FileKind) -> Result<Vec<String>, EncoreError> {
        let mut state = self.lock();
        self.collect(&mut state, entry, kind)
    }

    fn all_entry_files(&self, entry: &str, kind: FileKind) -> Result<Vec<String>, EncoreError> {
        let mut state = self.lock();
        state.returned.clear();
        let files = self.collect(&mut state, entry, kind);
        state.returned.clear();
        files
    }

    fn collect(
        &self,
        state: &mut LookupState,
        entry: &str,
        kind: FileKind,
    ) -> Result<Vec<String>, EncoreError> {
        let entries = self.entries(state)?;

        let Some(files) = entries.entrypoints.get(entry) else {
            return Err(EncoreError::UnknownEntry {
                entry: entry.to_string(),
                path: self.path.clone(),
                available: entries
                    .entrypoints
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        };

        let files = match kind {
            FileKind::Js => &files.js,
            FileKind::Css => &files.css,
        };

        let mut fresh = Vec::new();
        for file in files {
            if state.returned.insert(file.clone()) {
                fresh.push(file.clone());
            }
        }
        Ok(fresh)
    }

    fn entries(&self, state: &mut LookupState) -> Result<Arc<EntrypointsFile>, EncoreError> {
        if let Some(entries) = &state.entries {
            return Ok(entries.clone());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| EncoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let entries: EntrypointsFile =
            serde_json::from_str(&content).map_err(|source| EncoreError::Parse {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(
            path = %self.path.display(),
            entries = entries.entrypoints.len(),
            "Loaded Encore entrypoints"
        );

        let entries = Arc::new(entries);
        state.entries = Some(entries.clone());
        Ok(entries)
    }

    fn lock(&self) -> MutexGuard<'_, LookupState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Lookups by build name.
#[derive(Debug, Default)]
pub struct EntrypointLookupCollection {
    lookups: BTreeMap<String, Arc<EntrypointLookup>>,
}

impl EntrypointLookupCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from configuration; `_default` comes from the first output path
    /// unless configured explicitly.
    pub fn from_config(config: &WebpackEncoreConfig) -> Self {
        let mut collection = Self::new();

        if let Some(first) = config.output_paths.first() {
            collection.insert(DEFAULT_BUILD, Path::new(first).join(ENTRYPOINTS_FILE));
        }
        for (name, path) in &config.builds {
            collection.insert(name, path);
        }

        collection
    }

    pub fn insert(&mut self, build: impl Into<String>, path: impl Into<PathBuf>) {
        self.lookups
            .insert(build.into(), Arc::new(EntrypointLookup::new(path)));
    }

    /// Lookup for `build`, or the default build.
    pub fn get(&self, build: Option<&str>) -> Result<Arc<EntrypointLookup>, EncoreError> {
        let build = build.unwrap_or(DEFAULT_BUILD);
        self.lookups
            .get(build)
            .cloned()
            .ok_or_else(|| EncoreError::UnknownBuild(build.to_string()))
    }

    pub fn builds(&self) -> impl Iterator<Item = &str> {
        self.lookups.keys().map(String::as_str)
    }
}
