//! In-memory metadata store, keyed by file name.

use crate::config::CompiledFilters;
use crate::error::{Error, Result};
use crate::extractor::MetadataExtractor;
use crate::history::HISTORY_FILE_NAME;
use indicatif::ProgressBar;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Attribute name to attribute value, for one file.
pub type AttributeMap = BTreeMap<String, String>;

/// Outcome of populating the store from a directory.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Number of files whose metadata was stored.
    pub extracted: usize,
    /// Files the extractor rejected, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// Mapping from file name to that file's attributes.
///
/// Entries are kept ordered by file name, so every reader sees the same
/// iteration order. Writers may insert from several threads at once.
#[derive(Debug, Default)]
pub struct MetadataStore {
    entries: RwLock<BTreeMap<String, AttributeMap>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the attributes of `file_name`.
    pub fn insert(&self, file_name: impl Into<String>, attributes: AttributeMap) {
        self.entries.write().insert(file_name.into(), attributes);
    }

    pub fn get(&self, file_name: &str) -> Option<AttributeMap> {
        self.entries.read().get(file_name).cloned()
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.entries.read().contains_key(file_name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// File names in store order.
    pub fn file_names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Calls `f` for every entry, ordered by file name.
    pub fn for_each(&self, mut f: impl FnMut(&str, &AttributeMap)) {
        for (name, attributes) in self.entries.read().iter() {
            f(name, attributes);
        }
    }

    /// Discards the current contents and extracts metadata for every regular
    /// file directly inside `root` that passes `filters`.
    ///
    /// Files are extracted in parallel. A file the extractor rejects is logged,
    /// reported in the [`ScanReport`] and left out of the store; it never stops
    /// its siblings. Only an unreadable `root` is an error.
    pub fn populate(
        &self,
        root: &Path,
        filters: &CompiledFilters,
        extractor: &dyn MetadataExtractor,
        progress: Option<&ProgressBar>,
    ) -> Result<ScanReport> {
        let (files, unreadable_names) = list_candidate_files(root, filters)?;
        self.clear();

        if let Some(pb) = progress {
            pb.set_length(files.len() as u64);
        }

        let mut failed: Vec<(PathBuf, String)> = files
            .par_iter()
            .filter_map(|(name, path)| {
                let outcome = extractor.extract(path);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                match outcome {
                    Ok(attributes) => {
                        self.insert(name.clone(), attributes);
                        None
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "could not extract metadata");
                        Some((path.clone(), e.to_string()))
                    }
                }
            })
            .collect();
        failed.extend(unreadable_names);

        let report = ScanReport {
            extracted: self.len(),
            failed,
        };
        info!(
            root = %root.display(),
            extracted = report.extracted,
            failed = report.failed.len(),
            "scan complete"
        );
        Ok(report)
    }
}

/// Lists the regular files directly inside `root` that may be scanned,
/// ordered by name. Subdirectories are never entered.
///
/// Names that are not valid UTF-8 cannot be keyed in the store or rebuilt
/// into a path later; they are returned separately with the reason.
fn list_candidate_files(root: &Path, filters: &CompiledFilters) -> Result<CandidateFiles> {
    let entries = fs::read_dir(root).map_err(|e| Error::ListingFailed {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    let mut unreadable_names = Vec::new();
    for entry in entries.flatten() {
        if !entry.file_type().is_ok_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if !filters.should_include(&path) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if name == HISTORY_FILE_NAME => {}
            Ok(name) => files.push((name, path)),
            Err(_) => {
                warn!(path = %path.display(), "skipping file with a non UTF-8 name");
                unreadable_names.push((path, "file name is not valid UTF-8".to_string()));
            }
        }
    }
    files.sort();
    unreadable_names.sort();
    Ok((files, unreadable_names))
}

/// Scannable `(name, path)` pairs and files left out with the reason.
type CandidateFiles = (Vec<(String, PathBuf)>, Vec<(PathBuf, String)>);
