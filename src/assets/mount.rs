//! A single asset mount: URL prefix → directory tree.

use std::path::{Path, PathBuf};

use crate::assets::error::AssetError;
use crate::assets::resolve::{confine, join, normalize};
use crate::config::MountConfig;

/// What a request path under a mount resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A regular file to stream.
    File(PathBuf),
    /// A directory to list.
    Listing(PathBuf),
    /// A directory requested without its trailing slash.
    RedirectToDirectory,
}

/// A directory tree served under a URL prefix.
#[derive(Debug, Clone)]
pub struct AssetMount {
    prefix: String,
    /// Canonical when the directory existed at startup.
    root: PathBuf,
    index: bool,
    index_file: String,
    listing: bool,
}

impl AssetMount {
    /// Build a mount, canonicalizing its root.
    ///
    /// A missing root is not fatal: the mount answers 404 until the directory
    /// appears (it is canonicalized per request then).
    pub fn from_config(config: &MountConfig) -> Self {
        let root = match std::fs::canonicalize(&config.root) {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!(
                    prefix = %config.prefix,
                    root = %config.root,
                    error = %e,
                    "Mount root is not accessible"
                );
                PathBuf::from(&config.root)
            }
        };

        Self {
            prefix: config.prefix.clone(),
            root,
            index: config.index,
            index_file: config.index_file.clone(),
            listing: config.listing,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `rest` (the path below the prefix, percent-encoded).
    ///
    /// `trailing_slash` tells whether the full request path ended in '/',
    /// which decides between serving a directory and redirecting to it.
    pub async fn resolve(&self, rest: &str, trailing_slash: bool) -> Result<Resolved, AssetError> {
        let segments = normalize(rest)?;

        let root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|e| AssetError::from_io(&self.root, e))?;
        let candidate = join(&root, &segments);
        let path = confine(&root, &candidate).await?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| AssetError::from_io(&path, e))?;

        if !metadata.is_dir() {
            if trailing_slash && !segments.is_empty() {
                // "/file.js/" names a directory that does not exist.
                return Err(AssetError::NotFound);
            }
            return Ok(Resolved::File(path));
        }

        if !trailing_slash {
            return Ok(Resolved::RedirectToDirectory);
        }

        if self.index {
            let index = path.join(&self.index_file);
            match tokio::fs::metadata(&index).await {
                Ok(m) if m.is_file() => {
                    let index = confine(&root, &index).await?;
                    return Ok(Resolved::File(index));
                }
                Ok(_) => {}
                Err(e) => match AssetError::from_io(&index, e) {
                    AssetError::NotFound => {}
                    other => return Err(other),
                },
            }
        }

        if self.listing {
            Ok(Resolved::Listing(path))
        } else {
            Err(AssetError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("public");
        std::fs::create_dir_all(root.join("docs")).unwrap();
        std::fs::create_dir_all(root.join("empty")).unwrap();
        std::fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(root.join("app.js"), "console.log(1)").unwrap();
        std::fs::write(root.join("docs/index.html"), "docs").unwrap();
        std::fs::write(dir.path().join("secret.txt"), "secret").unwrap();
        Fixture { _dir: dir, root }
    }

    fn mount(root: &Path, index: bool, listing: bool) -> AssetMount {
        let mut config = MountConfig::new("/", root.display().to_string());
        config.index = index;
        config.listing = listing;
        AssetMount::from_config(&config)
    }

    #[tokio::test]
    async fn test_resolves_files_and_index() {
        let fx = fixture();
        let m = mount(&fx.root, true, false);
        let root = m.root().to_path_buf();

        assert_eq!(m.resolve("app.js", false).await.unwrap(), Resolved::File(root.join("app.js")));
        assert_eq!(m.resolve("", true).await.unwrap(), Resolved::File(root.join("index.html")));
        assert_eq!(
            m.resolve("docs/", true).await.unwrap(),
            Resolved::File(root.join("docs/index.html"))
        );
    }

    #[tokio::test]
    async fn test_directory_without_slash_redirects() {
        let fx = fixture();
        let m = mount(&fx.root, true, false);
        assert_eq!(m.resolve("docs", false).await.unwrap(), Resolved::RedirectToDirectory);
    }

    #[tokio::test]
    async fn test_directory_without_index() {
        let fx = fixture();

        let m = mount(&fx.root, true, false);
        assert!(m.resolve("empty/", true).await.unwrap_err().is_not_found());

        let m = mount(&fx.root, true, true);
        assert!(matches!(m.resolve("empty/", true).await.unwrap(), Resolved::Listing(_)));

        // Index serving off: listing even where an index exists.
        let m = mount(&fx.root, false, true);
        assert!(matches!(m.resolve("docs/", true).await.unwrap(), Resolved::Listing(_)));
    }

    #[tokio::test]
    async fn test_missing_and_forbidden() {
        let fx = fixture();
        let m = mount(&fx.root, true, false);

        assert!(m.resolve("nope.js", false).await.unwrap_err().is_not_found());
        assert!(m.resolve("app.js/", true).await.unwrap_err().is_not_found());
        assert!(m.resolve("../secret.txt", false).await.unwrap_err().is_forbidden());
        assert!(m.resolve("docs/../../secret.txt", false).await.unwrap_err().is_forbidden());
    }

    #[tokio::test]
    async fn test_missing_root_is_not_found() {
        let m = mount(Path::new("/definitely/not/a/real/root"), true, true);
        assert!(m.resolve("", true).await.unwrap_err().is_not_found());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_directory_is_io_error() {
        use std::os::unix::fs::PermissionsExt;

        let fx = fixture();
        let locked = fx.root.join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("file.txt"), "hidden").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not bind a privileged user.
        let enforced = std::fs::read_dir(&locked).is_err();
        let m = mount(&fx.root, true, false);
        let result = m.resolve("locked/file.txt", false).await;

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        if !enforced {
            return;
        }

        let err = result.unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }), "{err}");
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
