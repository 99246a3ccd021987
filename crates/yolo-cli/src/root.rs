use std::path::{Path, PathBuf};
use yolo_core::paths;

/// Resolve the project root.
///
/// Priority:
/// 1. `--root` flag / `YOLO_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `yolo/`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upward(&cwd, paths::YOLO_DIR)
        .or_else(|| find_upward(&cwd, ".git"))
        .unwrap_or(cwd)
}

/// The nearest ancestor of `start` (inclusive) containing directory `marker`.
fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_marker_in_an_ancestor() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("yolo")).unwrap();
        let deep = dir.path().join("src/deep");
        std::fs::create_dir_all(&deep).unwrap();

        assert_eq!(find_upward(&deep, "yolo").unwrap(), dir.path());
        assert_eq!(find_upward(dir.path(), "yolo").unwrap(), dir.path());
    }

    #[test]
    fn yolo_dir_is_preferred_over_git() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let project = dir.path().join("app");
        std::fs::create_dir_all(project.join("yolo")).unwrap();

        assert_eq!(find_upward(&project, "yolo").unwrap(), project);
        assert_eq!(find_upward(&project, ".git").unwrap(), dir.path());
    }
}
