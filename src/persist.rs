//! One JSON file per collection, written through a fixed temp sibling and a
//! rename so a crash never leaves a truncated destination behind.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DATA_DIR: &str = "data";
const IMAGES_DIR: &str = "images";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Classes,
    Students,
    Assignments,
    Submissions,
    Rubrics,
    Tests,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Classes,
        Collection::Students,
        Collection::Assignments,
        Collection::Submissions,
        Collection::Rubrics,
        Collection::Tests,
    ];

    pub fn stem(self) -> &'static str {
        match self {
            Collection::Classes => "classes",
            Collection::Students => "students",
            Collection::Assignments => "assignments",
            Collection::Submissions => "submissions",
            Collection::Rubrics => "rubrics",
            Collection::Tests => "tests",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.stem())
    }

    pub fn temp_file_name(self) -> String {
        format!("{}.tmp.json", self.stem())
    }

    pub fn corrupted_file_name(self) -> String {
        format!("{}.corrupted.json", self.stem())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

/// Where everything lives under an application-data root:
/// `<root>/data/*.json` and `<root>/data/images/<submissionId>/...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir().join(IMAGES_DIR)
    }

    pub fn collection_path(&self, collection: Collection) -> PathBuf {
        self.data_dir().join(collection.file_name())
    }

    /// Creates the data and images directories. Safe to call repeatedly.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.images_dir())
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes `items` to `<dir>/<collection>.json` atomically.
///
/// An empty collection that has never been written stays absent on disk.
pub fn save<T: Serialize>(dir: &Path, collection: Collection, items: &[T]) -> Result<(), PersistError> {
    let dst = dir.join(collection.file_name());
    if items.is_empty() && !dst.exists() {
        return Ok(());
    }
    let tmp = stage(dir, collection, items)?;
    commit(&tmp, &dst)?;
    tracing::debug!(%collection, count = items.len(), "collection saved");
    Ok(())
}

/// Serializes into the fixed temp sibling and flushes it to disk. The
/// destination file is not touched.
pub fn stage<T: Serialize>(dir: &Path, collection: Collection, items: &[T]) -> Result<PathBuf, PersistError> {
    let bytes = serde_json::to_vec_pretty(items)?;
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let tmp = dir.join(collection.temp_file_name());
    let mut f = File::create(&tmp).map_err(io_err(&tmp))?;
    f.write_all(&bytes).map_err(io_err(&tmp))?;
    f.sync_all().map_err(io_err(&tmp))?;
    Ok(tmp)
}

/// Moves a staged temp file over its destination in a single rename.
pub fn commit(tmp: &Path, dst: &Path) -> Result<(), PersistError> {
    // Rename cannot replace an existing file on Windows.
    if cfg!(windows) && dst.exists() {
        fs::remove_file(dst).map_err(io_err(dst))?;
    }
    fs::rename(tmp, dst).map_err(io_err(dst))
}

/// What happened when one collection file was read.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(usize),
    Missing,
    /// The file did not parse and was copied aside to `backup`.
    Quarantined { backup: PathBuf, reason: String },
    Unreadable { reason: String },
}

/// Reads a collection. Never fails: anything other than a clean parse yields an
/// empty collection plus an outcome describing why.
pub fn load<T: DeserializeOwned>(dir: &Path, collection: Collection) -> (Vec<T>, LoadOutcome) {
    let path = dir.join(collection.file_name());
    let bytes = match fs::read(&path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return (Vec::new(), LoadOutcome::Missing);
        }
        Err(e) => {
            tracing::warn!(%collection, error = %e, "collection unreadable, starting empty");
            return (
                Vec::new(),
                LoadOutcome::Unreadable {
                    reason: e.to_string(),
                },
            );
        }
    };

    match serde_json::from_slice::<Vec<T>>(&bytes) {
        Ok(items) => {
            let n = items.len();
            (items, LoadOutcome::Loaded(n))
        }
        Err(parse_err) => {
            let backup = dir.join(collection.corrupted_file_name());
            if let Err(e) = fs::copy(&path, &backup) {
                tracing::warn!(%collection, error = %e, "could not copy corrupted collection aside");
            }
            tracing::warn!(
                %collection,
                backup = %backup.to_string_lossy(),
                error = %parse_err,
                "collection failed to parse, quarantined"
            );
            (
                Vec::new(),
                LoadOutcome::Quarantined {
                    backup,
                    reason: parse_err.to_string(),
                },
            )
        }
    }
}
