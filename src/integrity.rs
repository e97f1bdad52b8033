/// File integrity checks against a stored digest baseline.
///
/// A baseline is a JSON object mapping canonical absolute paths to hex SHA-256
/// digests. [`IntegrityBaseline::check`] compares a file's current digest with
/// the stored one; [`IntegrityBaseline::trust`] records the current digest as
/// the expected value.
use crate::error::{Error, Result};
use crate::hasher::try_content_digest;
use crate::paths::write_atomic;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the default baseline.
pub const BASELINE_FILE_NAME: &str = "file_hashes.json";

/// Outcome of comparing a file with the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityStatus {
    /// The digest matches the stored one.
    Unchanged,
    /// The content changed since it was trusted.
    Modified { expected: String, actual: String },
    /// The baseline has no entry for this file.
    Untracked { digest: String },
}

/// What [`IntegrityBaseline::verify`] does with a file it has never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstSightPolicy {
    /// Record and save the digest straight away.
    TrustOnFirstSight,
    /// Report the file as untracked and leave the baseline alone.
    #[default]
    RequireConfirmation,
}

/// Stored digests plus the file they live in.
#[derive(Debug, Clone)]
pub struct IntegrityBaseline {
    path: PathBuf,
    digests: BTreeMap<PathBuf, String>,
}

/// `<data dir>/tidyfold/file_hashes.json`, or `./file_hashes.json` when the
/// platform has no data directory.
pub fn default_baseline_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("tidyfold").join(BASELINE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(BASELINE_FILE_NAME))
}

impl IntegrityBaseline {
    /// Loads the baseline at `path`. A missing or malformed file gives an empty one.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let digests = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed baseline {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                log::warn!("Failed to read baseline {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self { path, digests }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// The stored digest for `file`, if any.
    pub fn expected(&self, file: &Path) -> Option<&str> {
        let key = fs::canonicalize(file).ok()?;
        self.digests.get(&key).map(String::as_str)
    }

    /// Compares the current content of `file` with the stored digest.
    pub fn check(&self, file: &Path) -> Result<IntegrityStatus> {
        let (key, actual) = current_digest(file)?;
        let status = match self.digests.get(&key) {
            Some(expected) if *expected == actual => IntegrityStatus::Unchanged,
            Some(expected) => IntegrityStatus::Modified {
                expected: expected.clone(),
                actual,
            },
            None => IntegrityStatus::Untracked { digest: actual },
        };
        Ok(status)
    }

    /// Records the current digest of `file` as trusted and returns it.
    ///
    /// The change is in memory until [`IntegrityBaseline::save`].
    pub fn trust(&mut self, file: &Path) -> Result<String> {
        let (key, digest) = current_digest(file)?;
        log::debug!("Trusting {} ({})", key.display(), digest);
        self.digests.insert(key, digest.clone());
        Ok(digest)
    }

    /// Removes `file` from the baseline. Returns true if it was tracked.
    pub fn forget(&mut self, file: &Path) -> bool {
        let key = fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        self.digests.remove(&key).is_some()
    }

    /// Writes the baseline to its file.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.digests).map_err(|e| Error::Serialize {
            what: "integrity baseline",
            source: e,
        })?;
        write_atomic(&self.path, json.as_bytes()).map_err(|e| Error::BaselineWrite {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Checks `file` and, under [`FirstSightPolicy::TrustOnFirstSight`], records
    /// and saves it when untracked. The returned status is the one seen before
    /// any recording.
    pub fn verify(&mut self, file: &Path, policy: FirstSightPolicy) -> Result<IntegrityStatus> {
        let status = self.check(file)?;
        if let IntegrityStatus::Untracked { digest } = &status
            && policy == FirstSightPolicy::TrustOnFirstSight
        {
            let key = canonical(file)?;
            self.digests.insert(key, digest.clone());
            self.save()?;
        }
        Ok(status)
    }
}

fn canonical(file: &Path) -> Result<PathBuf> {
    fs::canonicalize(file).map_err(|_| Error::Unreadable {
        path: file.to_path_buf(),
    })
}

fn current_digest(file: &Path) -> Result<(PathBuf, String)> {
    let key = canonical(file)?;
    let digest = try_content_digest(&key).map_err(|e| {
        log::debug!("Cannot hash {}: {}", key.display(), e);
        Error::Unreadable {
            path: file.to_path_buf(),
        }
    })?;
    Ok((key, digest))
}
