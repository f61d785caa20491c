//! Remote path helpers.
//!
//! Remote paths are `/`-separated strings regardless of the local platform,
//! so [`std::path::Path`] is not used here.

#[cfg(any(test, feature = "mock"))]
use crate::error::{ErrorKind, Result};

const SEPARATOR: char = '/';

/// Normalizes an absolute remote path.
///
/// Empty segments and `.` are dropped, `..` pops the previous segment. The
/// result always starts with `/` and never ends with one (except for the root
/// itself).
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](ErrorKind::InvalidPath)
/// if the path is relative, contains a null byte, or climbs above the root.
#[cfg(any(test, feature = "mock"))]
pub(crate) fn normalize(path: impl AsRef<str>) -> Result<String> {
    let path = path.as_ref();
    if !path.starts_with(SEPARATOR) || path.contains('\0') {
        exn::bail!(ErrorKind::InvalidPath(path.to_string()));
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(SEPARATOR) {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.to_string()));
                }
            },
            s => segments.push(s),
        }
    }
    Ok(format!("{SEPARATOR}{}", segments.join("/")))
}

/// Joins a child name onto a directory.
///
/// An absolute `name` replaces the directory entirely, mirroring how a remote
/// server resolves paths against its working directory.
pub(crate) fn join(directory: &str, name: &str) -> String {
    if name.starts_with(SEPARATOR) {
        return name.to_string();
    }
    match directory.trim_end_matches(SEPARATOR) {
        "" => format!("{SEPARATOR}{name}"),
        dir => format!("{dir}{SEPARATOR}{name}"),
    }
}

/// Returns the parent directory of a normalized path, or `None` for the root.
#[cfg(any(test, feature = "mock"))]
pub(crate) fn parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind(SEPARATOR) {
        Some(0) => Some("/"),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}

/// Returns the last component of a path.
///
/// Some servers answer a name listing with paths instead of bare names.
pub(crate) fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SEPARATOR);
    trimmed.rsplit(SEPARATOR).next().unwrap_or(trimmed)
}
