//! Path utilities for safe file system operations.
//!
//! Provides path normalization and security checks to prevent directory traversal.

use crate::error::{FetchError, FetchResult};
use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {
                // Skip current directory
            },
            Component::ParentDir => {
                match components.last() {
                    Some(Component::Normal(_)) => {
                        components.pop();
                    },
                    // `/..` is still `/`
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {},
                    _ => components.push(component),
                }
            },
            other => {
                components.push(other);
            },
        }
    }

    components.iter().collect()
}

/// Resolve a path against the current directory and normalize it lexically
pub fn absolutize(path: &Path) -> FetchResult<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }

    let cwd = std::env::current_dir()
        .map_err(|e| FetchError::io("Failed to get current directory".to_string(), e))?;
    Ok(normalize_path(&cwd.join(path)))
}

/// Check if a path is safe (no directory traversal)
pub fn is_safe_path(path: &Path) -> bool {
    // Check for absolute paths
    if path.is_absolute() {
        return false;
    }

    // Track depth to detect escaping
    let mut depth = 0i32;

    for component in path.components() {
        match component {
            Component::CurDir => {
                // Current directory is safe
            },
            Component::ParentDir => {
                depth -= 1;
                // If we go negative, we're escaping the base directory
                if depth < 0 {
                    return false;
                }
            },
            Component::Normal(_) => {
                depth += 1;
            },
            _ => {
                // Other components (like RootDir) are not safe in relative paths
                return false;
            },
        }
    }

    true
}

/// Safely join paths, preventing directory traversal
pub fn safe_join(base: &Path, path: &Path) -> FetchResult<PathBuf> {
    if !is_safe_path(path) {
        return Err(FetchError::PermissionDenied {
            permission: "path traversal".to_string(),
            resource: path.display().to_string(),
        });
    }

    Ok(base.join(normalize_path(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        let path = Path::new("./src/../lib/./file.rs");
        let normalized = normalize_path(path);
        assert_eq!(normalized, Path::new("lib/file.rs"));
    }

    #[test]
    fn test_normalize_absolute_path() {
        assert_eq!(normalize_path(Path::new("/tmp/out/../x")), Path::new("/tmp/x"));
        assert_eq!(normalize_path(Path::new("/../tmp")), Path::new("/tmp"));
    }

    #[test]
    fn test_absolutize() {
        let absolute = absolutize(Path::new("/tmp/./out")).unwrap();
        assert_eq!(absolute, Path::new("/tmp/out"));

        let relative = absolutize(Path::new("out")).unwrap();
        assert!(relative.is_absolute());
        assert!(relative.ends_with("out"));
    }

    #[test]
    fn test_is_safe_path() {
        assert!(is_safe_path(Path::new("bower/1.7.7/package.tgz")));
        assert!(is_safe_path(Path::new("@scope/pkg/2.0.0")));
        assert!(!is_safe_path(Path::new("../../../etc/passwd")));
        assert!(!is_safe_path(Path::new("/absolute/path")));
    }

    #[test]
    fn test_safe_join() {
        let base = Path::new("/home/user/.pkgfetch/cache");

        // Safe path
        let result = safe_join(base, Path::new("bower/1.7.7/package.tgz")).unwrap();
        assert_eq!(
            result,
            Path::new("/home/user/.pkgfetch/cache/bower/1.7.7/package.tgz")
        );

        // Unsafe path
        let result = safe_join(base, Path::new("../../../etc/passwd"));
        assert!(matches!(result, Err(FetchError::PermissionDenied { .. })));
    }
}
