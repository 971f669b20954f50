use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::AuthResult;
use crate::error::AuthError;

/// Permissions applied to files written by [`write_atomic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileMode {
    /// Owner read/write only (private keys).
    Private,
    /// World-readable (public keys, JWK Sets).
    Public,
}

/// Writes `contents` to a temporary file next to `path`, then renames it over
/// `path`. A failed write leaves the previous file (or no file) in place.
pub(crate) fn write_atomic(path: &Path, contents: &[u8], mode: FileMode) -> AuthResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| AuthError::io(path, e))?;
    tmp.write_all(contents).map_err(|e| AuthError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| AuthError::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let bits = match mode {
            FileMode::Private => 0o600,
            FileMode::Public => 0o644,
        };
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(bits))
            .map_err(|e| AuthError::io(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    tmp.persist(path).map_err(|e| AuthError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, b"old").unwrap();

        write_atomic(&path, b"new", FileMode::Public).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        // Only the target remains; the temp file was renamed away.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("out.json");
        let err = write_atomic(&path, b"data", FileMode::Public).unwrap_err();
        assert!(matches!(err, AuthError::Io { .. }));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_private_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.pem");
        write_atomic(&path, b"secret", FileMode::Private).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
