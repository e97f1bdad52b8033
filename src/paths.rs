//! Destination path allocation and the filesystem primitives that write to it.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Returns true if any filesystem entry (including a dangling symlink) exists at `path`.
pub fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Builds the `counter`-th disambiguated variant of `base`: `stem_<counter>.ext`.
///
/// ```
/// use std::path::Path;
/// use tidyfold::paths::numbered_variant;
///
/// assert_eq!(numbered_variant(Path::new("/a/photo.jpg"), 2), Path::new("/a/photo_2.jpg"));
/// assert_eq!(numbered_variant(Path::new("/a/README"), 1), Path::new("/a/README_1"));
/// ```
pub fn numbered_variant(base: &Path, counter: usize) -> PathBuf {
    let parent = base.parent().unwrap_or_else(|| Path::new(""));

    // Built from the raw OS string so non-UTF-8 names keep their bytes.
    let mut name = OsString::new();
    if let Some(stem) = base.file_stem() {
        name.push(stem);
    }
    name.push(format!("_{}", counter));
    if let Some(ext) = base.extension() {
        name.push(".");
        name.push(ext);
    }
    parent.join(name)
}

/// Returns `desired` if nothing exists there, otherwise the first free
/// `stem_N.ext` sibling, counting up from 1.
///
/// Existence is checked again for every candidate, so any number of collisions
/// is handled. Another process creating the chosen path between this check and
/// its use is not guarded against.
pub fn unique_path(desired: &Path) -> PathBuf {
    unique_path_with(desired, entry_exists)
}

/// [`unique_path`] over a caller-supplied occupancy test.
pub fn unique_path_with<F>(desired: &Path, mut is_taken: F) -> PathBuf
where
    F: FnMut(&Path) -> bool,
{
    if !is_taken(desired) {
        return desired.to_path_buf();
    }

    let mut counter = 1;
    loop {
        let candidate = numbered_variant(desired, counter);
        if !is_taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Moves a file, falling back to copy + delete when a plain rename fails
/// (typically because `from` and `to` are on different filesystems).
///
/// On fallback failure the rename error is reported if the copy never started;
/// a partially written destination is removed.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    let rename_err = match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    if !from.is_file() {
        return Err(rename_err);
    }

    log::debug!(
        "rename {} -> {} failed ({}), copying instead",
        from.display(),
        to.display(),
        rename_err
    );

    if let Err(copy_err) = fs::copy(from, to) {
        let _ = fs::remove_file(to);
        return Err(io::Error::new(
            copy_err.kind(),
            format!("rename: {}, copy: {}", rename_err, copy_err),
        ));
    }

    fs::remove_file(from).inspect_err(|e| {
        log::warn!(
            "Copied {} to {} but failed to remove the source: {}",
            from.display(),
            to.display(),
            e
        );
    })
}

/// Replaces the file at `path` with `contents` by writing a sibling temporary
/// file and renaming it over the target, so readers see either the old or the
/// new content, never a partial write. Missing parent directories are created.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp_path);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_unique_path_without_collision() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let desired = temp_dir.path().join("report.pdf");
        assert_eq!(unique_path(&desired), desired);
    }

    #[test]
    fn test_unique_path_after_n_collisions() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::write(base.join("name.ext"), "0").unwrap();
        for i in 1..=4 {
            fs::write(base.join(format!("name_{}.ext", i)), "x").unwrap();
        }

        assert_eq!(unique_path(&base.join("name.ext")), base.join("name_5.ext"));
    }

    #[test]
    fn test_unique_path_counts_directories_as_taken() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir(base.join("notes")).unwrap();

        assert_eq!(unique_path(&base.join("notes")), base.join("notes_1"));
    }

    #[test]
    fn test_unique_path_with_reserved_set() {
        let mut reserved = HashSet::new();
        reserved.insert(PathBuf::from("/x/a.txt"));
        reserved.insert(PathBuf::from("/x/a_1.txt"));

        let chosen = unique_path_with(Path::new("/x/a.txt"), |p| reserved.contains(p));
        assert_eq!(chosen, PathBuf::from("/x/a_2.txt"));
    }

    #[test]
    fn test_numbered_variant_keeps_inner_dots() {
        assert_eq!(
            numbered_variant(Path::new("/d/archive.tar.gz"), 1),
            PathBuf::from("/d/archive.tar_1.gz")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_numbered_variant_keeps_non_utf8_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let base = Path::new("/d").join(OsStr::from_bytes(b"caf\xE9.txt"));
        let variant = numbered_variant(&base, 1);
        assert_eq!(variant.parent(), Some(Path::new("/d")));
        assert_eq!(variant.file_name().unwrap().as_bytes(), b"caf\xE9_1.txt");

        let bare = Path::new("/d").join(OsStr::from_bytes(b"\xFFdata"));
        assert_eq!(
            numbered_variant(&bare, 3).file_name().unwrap().as_bytes(),
            b"\xFFdata_3"
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unique_path_distinguishes_non_utf8_collisions() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        // Two names that collapse to the same lossy string.
        let first = base.join(OsStr::from_bytes(b"caf\xE9.txt"));
        let second = base.join(OsStr::from_bytes(b"caf\xE8.txt"));
        fs::write(&first, "1").unwrap();
        fs::write(&second, "2").unwrap();
        fs::write(base.join(OsStr::from_bytes(b"caf\xE9_1.txt")), "3").unwrap();

        let chosen = unique_path(&second);
        assert_eq!(chosen.file_name().unwrap().as_bytes(), b"caf\xE8_1.txt");
        assert!(!chosen.exists());
    }

    #[test]
    fn test_move_file_renames() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let from = temp_dir.path().join("a.txt");
        let to = temp_dir.path().join("b.txt");
        fs::write(&from, "content").unwrap();

        move_file(&from, &to).expect("move succeeds");
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "content");
    }

    #[test]
    fn test_move_missing_file_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = move_file(&temp_dir.path().join("gone"), &temp_dir.path().join("x"));
        assert!(result.is_err());
    }

    #[test]
    fn test_write_atomic_replaces_content_and_creates_parent() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("state.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
