//! Ranking of attribute names by how many files carry them.

use crate::store::MetadataStore;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Attribute-name prefixes hidden from the ranking.
///
/// Matching is a case-sensitive `starts_with`: `"xmp:"` hides
/// `"xmp:CreatorTool"`, `"xmp:Foo"` does not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    prefixes: BTreeSet<String>,
}

impl Blacklist {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.trim().is_empty())
                .collect(),
        }
    }

    /// Parses a line-delimited blacklist. Blank lines are ignored.
    pub fn parse(content: &str) -> Self {
        Self::new(content.lines().map(|line| line.trim_end_matches('\r')))
    }

    /// Loads the blacklist file at `path`.
    ///
    /// A missing file is an empty blacklist. An unreadable one is logged and
    /// also treated as empty, so ranking always has something to show.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read blacklist");
                Self::default()
            }
        }
    }

    pub fn is_blocked(&self, attribute: &str) -> bool {
        self.prefixes.iter().any(|prefix| attribute.starts_with(prefix.as_str()))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

/// One ranked attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedAttribute {
    pub name: String,
    /// Number of files carrying the attribute.
    pub count: usize,
}

/// Attributes ordered by descending file count.
pub type AttributeRanking = Vec<RankedAttribute>;

/// Ranks every attribute in `store` by the number of files that carry it.
///
/// Blacklisted names are dropped. Equal counts keep the order in which the
/// names were first seen, walking files by name and each file's attributes
/// by name.
pub fn rank(store: &MetadataStore, blacklist: &Blacklist) -> AttributeRanking {
    let mut ranking: AttributeRanking = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    store.for_each(|_, attributes| {
        for name in attributes.keys() {
            match positions.get(name) {
                Some(&idx) => ranking[idx].count += 1,
                None => {
                    positions.insert(name.clone(), ranking.len());
                    ranking.push(RankedAttribute {
                        name: name.clone(),
                        count: 1,
                    });
                }
            }
        }
    });

    ranking.retain(|attr| !blacklist.is_blocked(&attr.name));
    // stable: ties stay in first-seen order
    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    ranking
}
