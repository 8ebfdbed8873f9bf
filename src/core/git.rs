use git2::Repository;
use std::path::{Path, PathBuf};

/// Answers whether a directory lives inside a version-controlled tree.
///
/// The negative-context scenario relies on its temporary directory being
/// outside any repository; this lets it confirm that and lets tests swap in
/// a fixed answer.
pub trait RepositoryProbe {
    /// Root of the repository enclosing `path`, if any.
    fn enclosing_repository(&self, path: &Path) -> Option<PathBuf>;
}

/// Probe using libgit2 discovery for Git plus a `.jj` marker walk for Jujutsu.
pub struct Git2Probe {
    jj_marker: String,
}

impl Git2Probe {
    pub fn new(jj_marker: impl Into<String>) -> Self {
        Self {
            jj_marker: jj_marker.into(),
        }
    }

    fn find_jj_root(&self, path: &Path) -> Option<PathBuf> {
        path.ancestors()
            .find(|dir| dir.join(&self.jj_marker).is_dir())
            .map(Path::to_path_buf)
    }
}

impl RepositoryProbe for Git2Probe {
    fn enclosing_repository(&self, path: &Path) -> Option<PathBuf> {
        if let Some(root) = self.find_jj_root(path) {
            return Some(root);
        }

        let repo = Repository::discover(path).ok()?;
        // `path()` is the .git directory; bare repositories have no workdir.
        repo.workdir()
            .map(Path::to_path_buf)
            .or_else(|| Some(repo.path().to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn git_repository_is_detected_from_a_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let nested = dir.path().join("src");
        std::fs::create_dir(&nested).unwrap();

        let found = Git2Probe::new(".jj").enclosing_repository(&nested);
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(found.map(|p| p.canonicalize().unwrap()), Some(expected));
    }

    #[test]
    fn jj_marker_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".jj")).unwrap();

        let found = Git2Probe::new(".jj").enclosing_repository(dir.path());
        assert_eq!(found.as_deref(), Some(dir.path()));
    }
}
