//! metasort - sort a flat directory into nested folders built from file metadata
//!
//! This library reads metadata attributes from every file in a directory,
//! ranks attributes by how many files carry them, plans a folder hierarchy
//! from a chosen list of attributes, moves files into it, and reverts the
//! last sort while cleaning up the folders it left empty.

pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod file_category;
pub mod history;
pub mod mover;
pub mod output;
pub mod planner;
pub mod ranking;
pub mod session;
pub mod store;

pub use config::{CompiledFilters, Config, ConfigError};
pub use error::{Error, Result};
pub use extractor::{ContentExtractor, MetadataExtractor};
pub use file_category::{Category, FileMapper};
pub use history::{MoveRecord, OperationHistory};
pub use mover::{Mover, RevertReport};
pub use planner::{ExtensionFilter, PlanTree, SortLevels, SortPlan, folder_segment, plan};
pub use ranking::{AttributeRanking, Blacklist, RankedAttribute, rank};
pub use session::{SessionTask, SortSession};
pub use store::{AttributeMap, MetadataStore, ScanReport};

pub use cli::{Cli, SortCommand, run_cli};
