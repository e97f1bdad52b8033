//! Streaming content digests for duplicate detection and integrity checks.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size used while streaming file content through the digest.
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Computes the hex SHA-256 digest of a file's content.
///
/// Returns `None` if the file cannot be opened or read; callers skip such files.
pub fn content_digest(path: &Path) -> Option<String> {
    match try_content_digest(path) {
        Ok(digest) => Some(digest),
        Err(e) => {
            log::debug!("Could not hash {}: {}", path.display(), e);
            None
        }
    }
}

/// Like [`content_digest`] but keeps the I/O error.
pub fn try_content_digest(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BLOCK_SIZE];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_digest_of_known_content() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("abc.txt");
        fs::write(&path, "abc").unwrap();

        assert_eq!(
            content_digest(&path).as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_digest_spanning_several_blocks() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let a = temp_dir.path().join("a.bin");
        let b = temp_dir.path().join("b.bin");
        let mut data = vec![7u8; BLOCK_SIZE * 3 + 11];
        fs::write(&a, &data).unwrap();
        *data.last_mut().unwrap() = 8;
        fs::write(&b, &data).unwrap();

        let digest_a = content_digest(&a).unwrap();
        assert_eq!(digest_a.len(), 64);
        assert_ne!(Some(digest_a), content_digest(&b));
    }

    #[test]
    fn test_missing_file_is_absent() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert_eq!(content_digest(&temp_dir.path().join("missing")), None);
    }

    #[test]
    fn test_directory_is_absent() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert_eq!(content_digest(temp_dir.path()), None);
    }
}
