//! A sort session: the scan, rank, plan, sort and revert workflow for one root.
//!
//! The session owns its metadata store and its mover, so one root's history
//! is never shared. Work can be pushed onto a worker thread with
//! [`SortSession::spawn_sort`] / [`SortSession::spawn_revert`]; the session
//! travels with the task and comes back from [`SessionTask::join`], which
//! rules out a second sort or revert on the same session while one is running.

use crate::config::CompiledFilters;
use crate::error::{Error, Result};
use crate::extractor::MetadataExtractor;
use crate::history::OperationHistory;
use crate::mover::{Mover, RevertReport};
use crate::planner::{self, ExtensionFilter, SortLevels, SortPlan};
use crate::ranking::{self, AttributeRanking, Blacklist};
use crate::store::{MetadataStore, ScanReport};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

#[derive(Debug)]
pub struct SortSession {
    root: PathBuf,
    filters: CompiledFilters,
    store: MetadataStore,
    mover: Mover,
}

impl SortSession {
    pub fn new(root: impl Into<PathBuf>, filters: CompiledFilters) -> Self {
        let root = root.into();
        Self {
            mover: Mover::new(root.clone()),
            store: MetadataStore::new(),
            filters,
            root,
        }
    }

    /// Resumes a session whose last sort was recorded in `history`.
    pub fn with_history(history: OperationHistory, filters: CompiledFilters) -> Self {
        Self {
            root: history.root.clone(),
            store: MetadataStore::new(),
            filters,
            mover: Mover::with_history(history),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn history(&self) -> &OperationHistory {
        self.mover.history()
    }

    /// True when the last sort moved at least one file that has not been
    /// reverted yet.
    pub fn can_revert(&self) -> bool {
        !self.mover.history().is_empty()
    }

    /// Rebuilds the metadata store from the files currently in the root.
    pub fn scan(
        &mut self,
        extractor: &dyn MetadataExtractor,
        progress: Option<&ProgressBar>,
    ) -> Result<ScanReport> {
        self.store
            .populate(&self.root, &self.filters, extractor, progress)
    }

    pub fn rank(&self, blacklist: &Blacklist) -> AttributeRanking {
        ranking::rank(&self.store, blacklist)
    }

    pub fn plan(&self, levels: &SortLevels, filter: &ExtensionFilter) -> Result<SortPlan> {
        planner::plan(&self.root, &self.store, levels, filter)
    }

    /// Executes a plan made earlier by [`SortSession::plan`].
    pub fn execute(&mut self, plan: &SortPlan) -> Result<&OperationHistory> {
        self.mover.execute(plan)
    }

    /// Plans and executes a sort. See [`Mover::execute`] for partial failures.
    pub fn sort(&mut self, levels: &SortLevels, filter: &ExtensionFilter) -> Result<&OperationHistory> {
        let plan = self.plan(levels, filter)?;
        self.execute(&plan)
    }

    pub fn revert(&mut self) -> RevertReport {
        self.mover.revert()
    }

    /// Runs [`SortSession::sort`] on a worker thread.
    pub fn spawn_sort(
        mut self,
        levels: SortLevels,
        filter: ExtensionFilter,
    ) -> SessionTask<Result<usize>> {
        let handle = thread::spawn(move || {
            let outcome = self.sort(&levels, &filter).map(|history| history.len());
            (self, outcome)
        });
        SessionTask {
            handle,
            name: "sort",
        }
    }

    /// Runs [`SortSession::revert`] on a worker thread.
    pub fn spawn_revert(mut self) -> SessionTask<RevertReport> {
        let handle = thread::spawn(move || {
            let report = self.revert();
            (self, report)
        });
        SessionTask {
            handle,
            name: "revert",
        }
    }
}

/// A sort or revert running in the background.
pub struct SessionTask<T> {
    handle: JoinHandle<(SortSession, T)>,
    name: &'static str,
}

impl<T> SessionTask<T> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task and hands back the session with the outcome.
    pub fn join(self) -> Result<(SortSession, T)> {
        self.handle
            .join()
            .map_err(|_| Error::TaskPanicked { task: self.name })
    }
}
