use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use campuscal_core::{CalendarStore, MergedCalendar};
use chrono::{DateTime, Utc};

/// A file left by an earlier run.
#[derive(Debug)]
pub struct Existing {
    pub contents: String,
    pub modified: DateTime<Utc>,
}

/// Read the file at `path`, or `None` if it does not exist.
pub async fn read_existing(path: &Path) -> Result<Option<Existing>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };
    let modified = tokio::fs::metadata(path)
        .await
        .and_then(|meta| meta.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    Ok(Some(Existing { contents, modified }))
}

/// Serve the artifact at `path` from `store` until the first pass lands.
///
/// Returns whether a file was found and installed.
pub async fn restore(store: &CalendarStore, path: &Path) -> Result<bool> {
    let Some(existing) = read_existing(path).await? else {
        return Ok(false);
    };
    let merged = MergedCalendar::from_artifact(existing.contents);
    Ok(store.seed(merged, existing.modified).await)
}

/// Replace the file at `path` with `contents`.
///
/// The data goes to a hidden temp file in the same directory first and is
/// then renamed over the target, so readers never see a partial file.
/// Missing parent directories are created.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("Invalid output path: {}", path.display()))?;
    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    tokio::fs::create_dir_all(parent)
        .await
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let mut tmp_name = OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp_path = parent.join(tmp_name);

    tokio::fs::write(&tmp_path, contents)
        .await
        .with_context(|| format!("Failed to write temp file: {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_atomic_creates_parents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("calendar.ics");

        write_atomic(&path, b"BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n")
            .await
            .expect("write succeeds");

        let written = std::fs::read_to_string(&path).expect("file exists");
        assert_eq!(written, "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n");
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_and_cleans_up() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("calendar.ics");

        write_atomic(&path, b"old").await.expect("first write");
        write_atomic(&path, b"new").await.expect("second write");

        assert_eq!(std::fs::read_to_string(&path).expect("file exists"), "new");
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name())
            .collect();
        assert_eq!(entries, vec![OsString::from("calendar.ics")]);
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_stale_temp_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("calendar.ics");
        std::fs::write(&path, "old").expect("write target");
        std::fs::write(dir.path().join(".calendar.ics.tmp"), "half writ").expect("write temp");

        write_atomic(&path, b"new").await.expect("write succeeds");

        assert_eq!(std::fs::read_to_string(&path).expect("file exists"), "new");
        assert!(!dir.path().join(".calendar.ics.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_existing_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let existing = read_existing(&dir.path().join("calendar.ics"))
            .await
            .expect("read succeeds");
        assert!(existing.is_none());
    }

    #[tokio::test]
    async fn test_read_existing_returns_written_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("calendar.ics");
        write_atomic(&path, b"BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n")
            .await
            .expect("write succeeds");

        let existing = read_existing(&path)
            .await
            .expect("read succeeds")
            .expect("file exists");
        assert_eq!(existing.contents, "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n");
        assert!(existing.modified <= Utc::now());
    }

    #[tokio::test]
    async fn test_read_existing_directory_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(read_existing(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_restore_installs_previous_artifact() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("merged_calendar.ics");
        let previous = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:Kolloquium\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        write_atomic(&path, previous.as_bytes()).await.expect("write succeeds");

        let store = CalendarStore::new();
        assert!(restore(&store, &path).await.expect("restore succeeds"));

        let merged = store.merged().await.expect("artifact served");
        assert_eq!(merged.as_str(), previous);
        assert_eq!(merged.event_count(), 1);
        assert_eq!(store.status().await.months_cached, 0);
    }

    #[tokio::test]
    async fn test_restore_without_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = CalendarStore::new();

        let restored = restore(&store, &dir.path().join("merged_calendar.ics"))
            .await
            .expect("restore succeeds");

        assert!(!restored);
        assert!(store.merged().await.is_none());
    }

    #[tokio::test]
    async fn test_write_atomic_rejects_directory_path() {
        assert!(write_atomic(Path::new("/"), b"x").await.is_err());
    }
}
