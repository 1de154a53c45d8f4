//! Directory layout of a single epoch
//!
//! ```text
//! <base>/<epoch>/objects/<stem>
//! <base>/<epoch>/staging/<stem>.<suffix>
//! <base>/<epoch>/graveyard/<name>.<suffix>
//! ```

use crate::errors::{CacheError, Result};
use crate::keys::{KeyStem, STEM_LEN};
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const OBJECTS_DIR: &str = "objects";
pub const STAGING_DIR: &str = "staging";
pub const GRAVEYARD_DIR: &str = "graveyard";

/// Hex width of epoch ids and unique suffixes
const ID_LEN: usize = 16;

const fn longest(names: &[&str]) -> usize {
    let mut max = 0;
    let mut i = 0;
    while i < names.len() {
        if names[i].len() > max {
            max = names[i].len();
        }
        i += 1;
    }
    max
}

/// Longest suffix the cache appends to its base directory.
///
/// `/<epoch>/<subdir>/<stem>.<suffix>`
pub const MAX_PATH_OVERHEAD: usize = 1
    + ID_LEN
    + 1
    + longest(&[OBJECTS_DIR, STAGING_DIR, GRAVEYARD_DIR])
    + 1
    + STEM_LEN
    + 1
    + ID_LEN;

pub(super) const CREATE_ATTEMPTS: usize = 8;

/// Identifier of an epoch directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EpochId(u64);

impl EpochId {
    pub(crate) fn random() -> Self {
        Self(Uuid::new_v4().as_u64_pair().0)
    }

    /// Recognise an epoch directory name
    pub fn parse(name: &str) -> Option<Self> {
        if name.len() != ID_LEN
            || !name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return None;
        }
        u64::from_str_radix(name, 16).ok().map(Self)
    }
}

impl fmt::Display for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Every random epoch id tried was already taken
pub(super) fn exhausted(base_dir: &Path) -> CacheError {
    CacheError::io(
        base_dir,
        "create epoch directory",
        io::Error::from(io::ErrorKind::AlreadyExists),
    )
}

fn unique_suffix() -> String {
    format!("{:016x}", Uuid::new_v4().as_u64_pair().0)
}

/// One generation of cache content on disk
#[derive(Debug)]
pub struct Epoch {
    id: EpochId,
    root: PathBuf,
}

impl Epoch {
    /// Create a fresh, never before used epoch directory under `base_dir`
    pub(crate) async fn create(base_dir: &Path) -> Result<Self> {
        for _ in 0..CREATE_ATTEMPTS {
            if let Some(epoch) = Self::create_new(base_dir, EpochId::random()).await? {
                return Ok(epoch);
            }
        }
        Err(exhausted(base_dir))
    }

    /// Create the directory of epoch `id` and its layout.
    ///
    /// Returns `None` when a directory with that id already exists.
    pub(crate) async fn create_new(base_dir: &Path, id: EpochId) -> Result<Option<Self>> {
        let root = base_dir.join(id.to_string());
        match tokio::fs::create_dir(&root).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(CacheError::io(root, "create epoch directory", e)),
        }

        let epoch = Self { id, root };
        epoch.ensure_layout().await?;
        Ok(Some(epoch))
    }

    /// Handle to an epoch directory found on disk
    pub(crate) fn existing(base_dir: &Path, id: EpochId) -> Self {
        Self {
            id,
            root: base_dir.join(id.to_string()),
        }
    }

    /// Create any missing layout subdirectories
    pub(crate) async fn ensure_layout(&self) -> Result<()> {
        for dir in [self.objects_dir(), self.staging_dir(), self.graveyard_dir()] {
            match tokio::fs::create_dir_all(&dir).await {
                Ok(()) => {}
                Err(e) => return Err(CacheError::io(dir, "create epoch layout", e)),
            }
        }
        Ok(())
    }

    pub fn id(&self) -> EpochId {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.root.join(OBJECTS_DIR)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn graveyard_dir(&self) -> PathBuf {
        self.root.join(GRAVEYARD_DIR)
    }

    /// Canonical location of a committed entry
    pub fn committed_path(&self, stem: &KeyStem) -> PathBuf {
        self.objects_dir().join(stem.as_str())
    }

    /// Fresh staging location; never collides with concurrent writers
    pub fn staging_path(&self, stem: &KeyStem) -> PathBuf {
        self.staging_dir()
            .join(format!("{}.{}", stem.as_str(), unique_suffix()))
    }

    /// Fresh graveyard location for a file being retired from `objects/`
    pub fn graveyard_path(&self, file_name: &str) -> PathBuf {
        self.graveyard_dir()
            .join(format!("{file_name}.{}", unique_suffix()))
    }
}

/// Graveyard location for a committed file, derived from its own path
pub(crate) fn graveyard_for(committed: &Path) -> Option<PathBuf> {
    let name = committed.file_name()?.to_str()?;
    let epoch_root = committed.parent()?.parent()?;
    Some(
        epoch_root
            .join(GRAVEYARD_DIR)
            .join(format!("{name}.{}", unique_suffix())),
    )
}
