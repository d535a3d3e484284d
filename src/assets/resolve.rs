//! Request path → filesystem path resolution.
//!
//! Two checks guard the mount root: a lexical one on the decoded request
//! path, and a canonical one on the filesystem path so symlinks cannot lead
//! outside the root either.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::assets::error::AssetError;

/// Decode and normalize the path remainder below a mount prefix.
///
/// Returns the relative path segments. `..` that would climb above the
/// root, NUL bytes, backslashes and drive-letter segments are refused.
pub fn normalize(rest: &str) -> Result<Vec<String>, AssetError> {
    let forbidden = || AssetError::Forbidden {
        path: rest.to_string(),
    };

    let decoded = percent_decode_str(rest)
        .decode_utf8()
        .map_err(|_| AssetError::NotFound)?;

    if decoded.contains(['\0', '\\']) {
        return Err(forbidden());
    }

    let mut segments: Vec<String> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(forbidden());
                }
            }
            s if s.contains(':') && cfg!(windows) => return Err(forbidden()),
            s => segments.push(s.to_string()),
        }
    }

    Ok(segments)
}

/// Join normalized segments onto `root`.
pub fn join(root: &Path, segments: &[String]) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in segments {
        path.push(segment);
    }
    path
}

/// Canonicalize `candidate` and make sure it still lives under `root`.
///
/// `root` must itself be canonical.
pub async fn confine(root: &Path, candidate: &Path) -> Result<PathBuf, AssetError> {
    let canonical = tokio::fs::canonicalize(candidate)
        .await
        .map_err(|e| AssetError::from_io(candidate, e))?;

    if canonical.starts_with(root) {
        Ok(canonical)
    } else {
        Err(AssetError::Forbidden {
            path: candidate.display().to_string(),
        })
    }
}
