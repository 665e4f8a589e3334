//! Filesystem operations
//!
//! Directory and move helpers used by the build pipeline.

use std::path::Path;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents, ignoring a missing directory
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::RemoveDir {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Move a file or directory, falling back to copy+remove across devices
pub fn move_path(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) if from.is_dir() => {
            copy_dir_recursive(from, to)?;
            remove_dir_all(from)
        }
        Err(_) => {
            std::fs::copy(from, to).map_err(|e| FilesystemError::Move {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                error: e.to_string(),
            })?;
            std::fs::remove_file(from).map_err(|e| FilesystemError::Move {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                error: e.to_string(),
            })?;
            Ok(())
        }
    }
}

fn copy_dir_recursive(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    create_dir_all(to)?;
    let entries = std::fs::read_dir(from).map_err(|e| FilesystemError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: e.to_string(),
    })?;
    for entry in entries.filter_map(Result::ok) {
        let src = entry.path();
        let dest = to.join(entry.file_name());
        if src.is_dir() {
            copy_dir_recursive(&src, &dest)?;
        } else {
            std::fs::copy(&src, &dest).map_err(|e| FilesystemError::Move {
                from: src.clone(),
                to: dest.clone(),
                error: e.to_string(),
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_move_path_file() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("a.txt");
        let to = dir.path().join("nested/b.txt");
        std::fs::write(&from, "content").unwrap();

        move_path(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(to).unwrap(), "content");
    }

    #[test]
    fn test_move_path_directory() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("src");
        std::fs::create_dir_all(from.join("sub")).unwrap();
        std::fs::write(from.join("sub/file.txt"), "x").unwrap();

        let to = dir.path().join("dest");
        move_path(&from, &to).unwrap();
        assert!(to.join("sub/file.txt").exists());
    }

    #[test]
    fn test_remove_dir_all_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        remove_dir_all(&dir.path().join("nope")).unwrap();
    }
}
