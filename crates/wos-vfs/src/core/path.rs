//! Path utilities for the VFS layer.
//!
//! Provides path validation, normalization, and resolution.

use super::error::VfsError;

/// Validate that a path is well-formed.
pub fn validate_path(path: &str) -> Result<(), VfsError> {
    if path.is_empty() {
        return Err(VfsError::invalid_path("empty path"));
    }

    if !path.starts_with('/') {
        return Err(VfsError::invalid_path(format!(
            "{}: path must be absolute (start with /)",
            path
        )));
    }

    if path.contains('\0') {
        return Err(VfsError::invalid_path("path contains null character"));
    }

    Ok(())
}

/// Normalize a path by resolving `.` and `..` components and removing redundant slashes.
pub fn normalize_path(path: &str) -> Result<String, VfsError> {
    validate_path(path)?;

    let mut components: Vec<&str> = Vec::new();

    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                if components.pop().is_none() {
                    return Err(VfsError::invalid_path(format!(
                        "{}: path escapes root directory",
                        path
                    )));
                }
            }
            c => components.push(c),
        }
    }

    if components.is_empty() {
        return Ok(String::from("/"));
    }

    let mut result = String::new();
    for component in components {
        result.push('/');
        result.push_str(component);
    }
    Ok(result)
}

/// Resolve `input` against a base directory and normalize the result.
///
/// Absolute inputs ignore `base`.
pub fn resolve_path(base: &str, input: &str) -> Result<String, VfsError> {
    if input.starts_with('/') {
        normalize_path(input)
    } else {
        normalize_path(&join_path(base, input))
    }
}

/// Get the parent path of a given path.
///
/// The parent is everything before the last `/`, or `/` when that is empty.
pub fn parent_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => String::from("/"),
        Some(pos) => String::from(&path[..pos]),
    }
}

/// Get the filename (last component) of a path. The root is named `/`.
pub fn filename(path: &str) -> &str {
    if path == "/" {
        return "/";
    }

    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Join two path components.
pub fn join_path(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Check whether `path` sits exactly one segment below `dir`.
pub fn is_direct_child(path: &str, dir: &str) -> bool {
    if path == "/" {
        return false;
    }

    let rest = if dir == "/" {
        path.strip_prefix('/')
    } else {
        path.strip_prefix(dir).and_then(|r| r.strip_prefix('/'))
    };

    matches!(rest, Some(r) if !r.is_empty() && !r.contains('/'))
}
