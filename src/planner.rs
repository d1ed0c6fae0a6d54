//! Hierarchical sort planning.
//!
//! Planning turns the metadata store, an ordered list of attribute levels and
//! an optional extension allow-list into a [`SortPlan`]: for each eligible file
//! in the root, the chain of folder names it should live under. Nothing is
//! moved here; the only filesystem access is listing the root.
//!
//! ```
//! use metasort::planner::folder_segment;
//!
//! assert_eq!(folder_segment(Some("AC/DC: Back*?"), "Artist"), "AC_DC__Back__");
//! assert_eq!(folder_segment(Some("   "), "Artist"), "Unknown_Artist");
//! assert_eq!(folder_segment(None, "Album"), "Unknown_Album");
//! ```

use crate::error::{Error, Result};
use crate::store::MetadataStore;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const UNSAFE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Ordered attribute names; the first one is the outermost folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortLevels(Vec<String>);

impl SortLevels {
    /// Builds the level list, rejecting an empty list, blank names and
    /// repeated names.
    pub fn new<I, S>(levels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let levels: Vec<String> = levels.into_iter().map(Into::into).collect();
        if levels.is_empty() {
            return Err(Error::InvalidLevels {
                reason: "at least one level is required".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for level in &levels {
            if level.trim().is_empty() {
                return Err(Error::InvalidLevels {
                    reason: "level names cannot be blank".to_string(),
                });
            }
            if !seen.insert(level.as_str()) {
                return Err(Error::InvalidLevels {
                    reason: format!("'{}' is selected more than once", level),
                });
            }
        }

        Ok(Self(levels))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Allow-list of file extensions. An empty filter lets every file through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    /// Lower-cased, each with a leading dot.
    extensions: Vec<String>,
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = ext.as_ref().trim().to_lowercase();
            if ext.is_empty() || ext == "." {
                continue;
            }
            let ext = if ext.starts_with('.') {
                ext
            } else {
                format!(".{}", ext)
            };
            if !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        Self {
            extensions: normalized,
        }
    }

    /// Parses a user-typed list such as `"mp3, .FLAC ogg"`.
    pub fn parse(input: &str) -> Self {
        Self::new(input.split(|c: char| c == ',' || c.is_whitespace()))
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Returns true if `file_name`, lower-cased, ends with an allowed extension.
    pub fn allows(&self, file_name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let name = file_name.to_lowercase();
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }
}

/// Turns one attribute value into a folder name.
///
/// Missing or blank values become `Unknown_<attribute>`. Otherwise the value
/// is trimmed and each of `\ / : * ? " < > |`, as well as every control
/// character, is replaced by `_`. A name made
/// only of dots has its dots replaced too, so `..` can never climb out of the
/// root.
pub fn folder_segment(value: Option<&str>, attribute: &str) -> String {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return format!("Unknown_{}", attribute);
    }

    let sanitized: String = value
        .chars()
        .map(|c| {
            if UNSAFE_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    if sanitized.chars().all(|c| c == '.') {
        "_".repeat(sanitized.len())
    } else {
        sanitized
    }
}

/// One planned move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    /// File name inside the root.
    pub file_name: String,
    /// Folder names below the root, outermost first.
    pub segments: Vec<String>,
    /// File name at the target; currently always `file_name`.
    pub target_name: String,
}

impl PlanEntry {
    pub fn source(&self, root: &Path) -> PathBuf {
        root.join(&self.file_name)
    }

    pub fn target_dir(&self, root: &Path) -> PathBuf {
        self.segments
            .iter()
            .fold(root.to_path_buf(), |dir, segment| dir.join(segment))
    }

    pub fn target(&self, root: &Path) -> PathBuf {
        self.target_dir(root).join(&self.target_name)
    }
}

/// Every planned move for one root, ordered by file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortPlan {
    pub root: PathBuf,
    pub entries: Vec<PlanEntry>,
}

impl SortPlan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Groups the plan on shared folder prefixes, for previews.
    pub fn tree(&self) -> PlanTree {
        let mut tree = PlanTree::default();
        for entry in &self.entries {
            let node = entry
                .segments
                .iter()
                .fold(&mut tree, |node, segment| {
                    node.folders.entry(segment.clone()).or_default()
                });
            node.files.push(entry.target_name.clone());
        }
        tree
    }
}

/// Folder tree of a plan. Folders are sorted by name; files keep plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanTree {
    pub folders: BTreeMap<String, PlanTree>,
    pub files: Vec<String>,
}

impl PlanTree {
    /// Number of files in this folder and below.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.folders.values().map(PlanTree::file_count).sum::<usize>()
    }
}

/// Plans the move of every eligible regular file directly inside `root`.
///
/// A file is eligible when it passes `filter` and has an entry in `store`.
/// Files without metadata are left where they are.
pub fn plan(
    root: &Path,
    store: &MetadataStore,
    levels: &SortLevels,
    filter: &ExtensionFilter,
) -> Result<SortPlan> {
    let entries = fs::read_dir(root).map_err(|e| Error::ListingFailed {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut file_names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| filter.allows(name))
        .collect();
    file_names.sort();

    let mut planned = Vec::with_capacity(file_names.len());
    for file_name in file_names {
        let Some(attributes) = store.get(&file_name) else {
            debug!(file = %file_name, "no metadata, leaving in place");
            continue;
        };

        let segments = levels
            .iter()
            .map(|level| folder_segment(attributes.get(level).map(String::as_str), level))
            .collect();

        planned.push(PlanEntry {
            target_name: file_name.clone(),
            file_name,
            segments,
        });
    }

    Ok(SortPlan {
        root: root.to_path_buf(),
        entries: planned,
    })
}
