//! Depth-first walk of one scrape root.
//!
//! The walker runs on a blocking thread. It owns its [`ScrapeRecord`] while
//! it runs and publishes a snapshot through the progress callback whenever
//! the position or the counters change.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use itertools::Itertools;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use encore_core::{
    merge, Catalog, CatalogError, MediaRecord, ScrapeConfig, ScrapeError, ScrapeRecord,
    ScrapeStatus,
};

use crate::extract::{Pipeline, PipelineError};

/// Why a single file was skipped.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Extract(#[from] PipelineError),

    #[error("No content hash was computed for {path}")]
    MissingHash { path: PathBuf },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// What happened to a scraped file in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Created,
    Updated,
}

/// How a walk ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Completed,
    Cancelled,
}

/// Decides which directory entries the walker visits.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    include_hidden: bool,
    follow_symlinks: bool,
    ignore: GlobSet,
}

impl EntryFilter {
    pub fn from_config(config: &ScrapeConfig) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore_patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            include_hidden: config.include_hidden,
            follow_symlinks: config.follow_symlinks,
            ignore: builder.build()?,
        })
    }

    /// Check if an entry with this name should be visited.
    pub fn accepts(&self, name: &OsStr) -> bool {
        let hidden = name.as_encoded_bytes().starts_with(b".");
        if hidden && !self.include_hidden {
            return false;
        }
        !self.ignore.is_match(name)
    }
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self {
            include_hidden: true,
            follow_symlinks: false,
            ignore: GlobSet::empty(),
        }
    }
}

/// Check if the path looks like a video file, by extension.
pub fn is_media_file(path: &Path) -> bool {
    mime_guess::from_path(path)
        .iter()
        .any(|mime| mime.type_() == mime_guess::mime::VIDEO)
}

/// Shared, read-only collaborators of every walk.
#[derive(Clone)]
pub struct WalkContext {
    pub pipeline: Arc<Pipeline>,
    pub catalog: Arc<dyn Catalog>,
    pub filter: Arc<EntryFilter>,
}

enum EntryKind {
    Dir,
    File,
    Other,
}

/// Walks one root and writes what it finds to the catalog.
pub struct TreeWalker<P> {
    ctx: WalkContext,
    record: ScrapeRecord,
    cancel: CancellationToken,
    progress: P,
    visited: HashSet<PathBuf>,
}

impl<P> TreeWalker<P>
where
    P: FnMut(&ScrapeRecord),
{
    pub fn new(ctx: WalkContext, record: ScrapeRecord, cancel: CancellationToken, progress: P) -> Self {
        Self {
            ctx,
            record,
            cancel,
            progress,
            visited: HashSet::new(),
        }
    }

    /// The record as last updated by the walk.
    pub fn record(&self) -> &ScrapeRecord {
        &self.record
    }

    pub fn into_record(self) -> ScrapeRecord {
        self.record
    }

    /// Walk the whole root.
    ///
    /// Fails only if the root itself cannot be read. Unreadable
    /// subdirectories and failing files are logged and skipped.
    pub fn run(&mut self) -> Result<WalkOutcome, ScrapeError> {
        let root = self.record.root_path.clone();
        let meta = fs::metadata(&root).map_err(|e| ScrapeError::root(&root, e))?;
        if !meta.is_dir() {
            return Err(ScrapeError::NotADirectory { path: root });
        }

        self.record.current_path = root.clone();
        self.publish();
        self.enter(&root);

        let outcome = self.walk_dir(&root).map_err(|e| ScrapeError::root(&root, e))?;
        if outcome == WalkOutcome::Cancelled {
            self.record.status = ScrapeStatus::Cancelled;
            self.record.clear_position();
        }
        Ok(outcome)
    }

    fn walk_dir(&mut self, dir: &Path) -> io::Result<WalkOutcome> {
        let entries = read_sorted(dir)?;

        for entry in entries {
            if self.cancel.is_cancelled() {
                info!(dir = %dir.display(), "Stop requested, ending walk");
                return Ok(WalkOutcome::Cancelled);
            }

            if !self.ctx.filter.accepts(&entry.file_name()) {
                continue;
            }
            let path = entry.path();

            match self.kind(&entry) {
                EntryKind::Dir => {
                    if !self.enter(&path) {
                        debug!(dir = %path.display(), "Directory already visited");
                        continue;
                    }
                    self.record.current_path = path.clone();
                    self.record.current_file = PathBuf::new();
                    self.publish();

                    match self.walk_dir(&path) {
                        Ok(WalkOutcome::Cancelled) => return Ok(WalkOutcome::Cancelled),
                        Ok(WalkOutcome::Completed) => {}
                        Err(err) => {
                            warn!(dir = %path.display(), error = %err, "Skipping unreadable directory");
                        }
                    }
                    self.record.current_path = dir.to_path_buf();
                }
                EntryKind::File if is_media_file(&path) => {
                    self.record.current_file = path.clone();
                    self.publish();

                    match self.scrape_file(&path) {
                        Ok(outcome) => {
                            self.record.files_scraped += 1;
                            match outcome {
                                FileOutcome::Created => self.record.new_files += 1,
                                FileOutcome::Updated => self.record.updated_files += 1,
                            }
                        }
                        Err(err) => {
                            warn!(file = %path.display(), error = %err, "Skipping file");
                            self.record.files_skipped += 1;
                        }
                    }
                    self.publish();
                }
                _ => {}
            }
        }

        Ok(WalkOutcome::Completed)
    }

    /// Extract one file and create or merge its catalog entry.
    pub fn scrape_file(&self, path: &Path) -> Result<FileOutcome, FileError> {
        let mut media = MediaRecord::new(path);
        self.ctx.pipeline.run(path, &mut media)?;
        if !media.has_hash() {
            return Err(FileError::MissingHash {
                path: path.to_path_buf(),
            });
        }
        if media.backfill_title() {
            debug!(file = %path.display(), title = %media.title, "Title taken from file name");
        }

        match self.ctx.catalog.lookup(&media.hash)? {
            Some(existing) => {
                self.ctx.catalog.update(merge(&existing, &media))?;
                debug!(file = %path.display(), hash = %media.hash, "Updated catalog entry");
                Ok(FileOutcome::Updated)
            }
            None => {
                debug!(file = %path.display(), hash = %media.hash, "New catalog entry");
                self.ctx.catalog.create(media)?;
                Ok(FileOutcome::Created)
            }
        }
    }

    fn kind(&self, entry: &DirEntry) -> EntryKind {
        let Ok(file_type) = entry.file_type() else {
            return EntryKind::Other;
        };
        // Links to files are always scraped, links to directories only
        // when following symlinks.
        if file_type.is_symlink() {
            return match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_dir() && self.ctx.filter.follow_symlinks => EntryKind::Dir,
                Ok(meta) if meta.is_file() => EntryKind::File,
                Ok(_) => EntryKind::Other,
                Err(err) => {
                    debug!(path = %entry.path().display(), error = %err, "Broken symlink");
                    EntryKind::Other
                }
            };
        }
        if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    // Symlinked directories can form cycles; remember where we have been.
    fn enter(&mut self, dir: &Path) -> bool {
        if !self.ctx.filter.follow_symlinks {
            return true;
        }
        let key = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        self.visited.insert(key)
    }

    fn publish(&mut self) {
        (self.progress)(&self.record);
    }
}

fn read_sorted(dir: &Path) -> io::Result<Vec<DirEntry>> {
    let entries = fs::read_dir(dir)?.collect::<io::Result<Vec<DirEntry>>>()?;
    Ok(entries
        .into_iter()
        .sorted_by_key(|e| e.file_name())
        .collect())
}
