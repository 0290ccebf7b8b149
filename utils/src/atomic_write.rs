//! Atomic file write helpers.
//!
//! Uses a temp file + rename pattern. On Windows, rename-over-existing fails, so we
//! use a backup-and-restore fallback to avoid data loss when overwriting.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistMode {
    /// Allow the file to inherit the default umask.
    Default,
    /// Strictly enforce owner-only read/write permissions (0o600 on Unix).
    /// Storage scopes hold the API key, so this is the default.
    #[default]
    SensitiveOwnerOnly,
}

impl PersistMode {
    #[cfg(unix)]
    fn mode(self) -> Option<u32> {
        match self {
            Self::Default => None,
            Self::SensitiveOwnerOnly => Some(0o600),
        }
    }
}

/// Recover from incomplete atomic writes by restoring `.bak` files.
///
/// If `path` does not exist but `path.bak` does, a crash occurred during the
/// backup-rename window in [`atomic_write`]. Rename the backup back so the
/// caller can proceed.
pub fn recover_bak_file(path: &Path) {
    let backup = path.with_extension("bak");
    if !path.exists() && backup.exists() {
        match fs::rename(&backup, path) {
            Ok(()) => {
                tracing::warn!(
                    path = %path.display(),
                    "Recovered .bak file from interrupted atomic write"
                );
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to recover .bak file: {e}");
            }
        }
    }
}

pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8], mode: PersistMode) -> io::Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    #[cfg(unix)]
    if let Some(mode) = mode.mode() {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(mode))?;
    }

    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    // Persist (rename) - handle Windows where rename fails if target exists.
    if let Err(err) = tmp.persist(path) {
        if !path.exists() {
            return Err(err.error);
        }
        let backup_path = path.with_extension("bak");
        let _ = fs::remove_file(&backup_path);
        fs::rename(path, &backup_path)?;

        if let Err(rename_err) = err.file.persist(path) {
            let _ = fs::rename(&backup_path, path);
            return Err(rename_err.error);
        }
        if let Err(e) = fs::remove_file(&backup_path) {
            tracing::warn!(
                path = %backup_path.display(),
                "Failed to remove .bak after atomic write: {e}"
            );
        }
    }

    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
