//! Identifier allocation by directory scan.
//!
//! IDs are derived from the files on disk, never from a counter, so the
//! directory listing is read immediately before every new file is created.

use crate::error::{Result, YoloError};
use crate::io;
use crate::paths;
use crate::types::{ItemId, ItemKind};
use std::path::{Path, PathBuf};

/// Highest existing id of `kind`, ignoring names that are not `<kind>NNN.md`.
pub fn highest(root: &Path, kind: ItemKind) -> Result<Option<ItemId>> {
    let dir = paths::kind_dir(root, kind);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut max: Option<ItemId> = None;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".md")) else {
            continue;
        };
        match stem.parse::<ItemId>() {
            Ok(id) if id.kind() == kind => max = max.max(Some(id)),
            _ => tracing::debug!(file = %name.to_string_lossy(), "skipping non-conforming file name"),
        }
    }
    Ok(max)
}

/// The id the next new item of `kind` should receive.
pub fn next(root: &Path, kind: ItemKind) -> Result<ItemId> {
    match highest(root, kind)? {
        None => Ok(ItemId::first(kind)),
        Some(id) => id
            .next()
            .ok_or_else(|| YoloError::IdSpaceExhausted(kind.to_string())),
    }
}

/// Allocate an id and claim its file (created empty) in one step. A racing
/// writer that took the name first makes us rescan and try the next one.
pub fn reserve(root: &Path, kind: ItemKind) -> Result<(ItemId, PathBuf)> {
    loop {
        let id = next(root, kind)?;
        let path = paths::item_path(root, &id);
        if io::create_new(&path, b"")? {
            return Ok((id, path));
        }
        tracing::debug!(%id, "id taken between scan and create, rescanning");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn missing_directory_starts_at_one() {
        let dir = TempDir::new().unwrap();
        assert_eq!(next(dir.path(), ItemKind::Epic).unwrap().to_string(), "E001");
    }

    #[test]
    fn continues_after_highest() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "yolo/features/F001.md");
        touch(dir.path(), "yolo/features/F009.md");
        touch(dir.path(), "yolo/features/F003.md");
        assert_eq!(next(dir.path(), ItemKind::Feature).unwrap().to_string(), "F010");
    }

    #[test]
    fn skips_non_conforming_names() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "yolo/tasks/T002.md");
        touch(dir.path(), "yolo/tasks/T900.txt");
        touch(dir.path(), "yolo/tasks/notes.md");
        touch(dir.path(), "yolo/tasks/T12.md");
        touch(dir.path(), "yolo/tasks/F500.md");
        assert_eq!(next(dir.path(), ItemKind::Task).unwrap().to_string(), "T003");
    }

    #[test]
    fn reserving_in_sequence_leaves_no_gaps() {
        let dir = TempDir::new().unwrap();
        let ids: Vec<String> = (0..5)
            .map(|_| reserve(dir.path(), ItemKind::Task).unwrap().0.to_string())
            .collect();
        assert_eq!(ids, ["T001", "T002", "T003", "T004", "T005"]);

        let mut on_disk: Vec<String> = std::fs::read_dir(dir.path().join("yolo/tasks"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        on_disk.sort();
        assert_eq!(on_disk, ["T001.md", "T002.md", "T003.md", "T004.md", "T005.md"]);
    }

    #[test]
    fn exhausted_id_space_is_an_error() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "yolo/epics/E999.md");
        assert!(matches!(
            next(dir.path(), ItemKind::Epic),
            Err(YoloError::IdSpaceExhausted(_))
        ));
    }
}
