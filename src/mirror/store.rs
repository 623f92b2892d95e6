use crate::error::{ArchiveError, ArchiveResult};
use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub fn ensure_dir(dir: &Path) -> ArchiveResult<()> {
    fs::create_dir_all(dir).map_err(|err| ArchiveError::io("create", dir, err))
}

/// Replaces `path` with `contents` via a sibling temp file and rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> ArchiveResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;

    let mut tmp =
        NamedTempFile::new_in(parent).map_err(|err| ArchiveError::io("create temp in", parent, err))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|err| ArchiveError::io("write", tmp.path().to_path_buf(), err))?;
    tmp.persist(path)
        .map_err(|err| ArchiveError::io("replace", path, err.error))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> ArchiveResult<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(ArchiveError::io("read", path, err)),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| ArchiveError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> ArchiveResult<()> {
    let data = serde_json::to_string_pretty(value).map_err(|source| ArchiveError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, format!("{data}\n").as_bytes())
}

pub fn read_json_lines<T: DeserializeOwned>(path: &Path) -> ArchiveResult<Option<Vec<T>>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(ArchiveError::io("read", path, err)),
    };
    let mut out = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let entry = serde_json::from_str(trimmed).map_err(|source| ArchiveError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
        out.push(entry);
    }
    Ok(Some(out))
}

pub fn encode_json_line<T: Serialize>(path: &Path, value: &T) -> ArchiveResult<String> {
    serde_json::to_string(value)
        .map(|line| format!("{line}\n"))
        .map_err(|source| ArchiveError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Appends one JSON line to an existing file.
pub fn append_json_line<T: Serialize>(path: &Path, value: &T) -> ArchiveResult<()> {
    let line = encode_json_line(path, value)?;
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|err| ArchiveError::io("open", path, err))?;
    file.write_all(line.as_bytes())
        .map_err(|err| ArchiveError::io("append to", path, err))
}

/// Exclusive single-writer lock over one archive; released on drop.
#[derive(Debug)]
pub struct ArchiveLock {
    file: File,
}

impl ArchiveLock {
    pub fn acquire(path: &Path) -> ArchiveResult<Self> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|err| ArchiveError::io("open", path, err))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if is_contended(&err) => return Err(ArchiveError::Locked(path.to_path_buf())),
            Err(err) => return Err(ArchiveError::io("lock", path, err)),
        }

        file.set_len(0)
            .and_then(|_| writeln!(file, "{}", std::process::id()))
            .map_err(|err| ArchiveError::io("write", path, err))?;

        Ok(Self { file })
    }
}

impl Drop for ArchiveLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        n: u32,
    }

    #[test]
    fn json_roundtrip_and_missing_file() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("nested/state.json");

        assert!(read_json::<Row>(&path).expect("read").is_none());
        write_json(&path, &Row { n: 3 }).expect("write");
        assert_eq!(read_json::<Row>(&path).expect("read"), Some(Row { n: 3 }));
    }

    #[test]
    fn json_lines_skip_blank_and_flag_corruption() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("log.jsonl");
        fs::write(&path, "{\"n\":1}\n\n{\"n\":2}\n").expect("seed");

        append_json_line(&path, &Row { n: 3 }).expect("append");
        let rows = read_json_lines::<Row>(&path).expect("read").expect("some");
        assert_eq!(rows, vec![Row { n: 1 }, Row { n: 2 }, Row { n: 3 }]);

        fs::write(&path, "{\"n\":1}\nnot json\n").expect("corrupt");
        let err = read_json_lines::<Row>(&path).expect_err("corrupt");
        assert_eq!(err.code(), "STORE_CORRUPT");
    }

    #[test]
    fn append_requires_existing_file() {
        let tmp = tempdir().expect("tempdir");
        let err = append_json_line(&tmp.path().join("absent.jsonl"), &Row { n: 1 })
            .expect_err("missing");
        assert_eq!(err.code(), "IO_FAILED");
    }

    #[test]
    fn second_lock_on_same_archive_is_refused() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join(".mirror/archive.lock");

        let first = ArchiveLock::acquire(&path).expect("first lock");
        let err = ArchiveLock::acquire(&path).expect_err("contended");
        assert!(matches!(err, ArchiveError::Locked(_)));

        drop(first);
        ArchiveLock::acquire(&path).expect("relock after release");
        let pid = fs::read_to_string(&path).expect("read lock");
        assert_eq!(pid.trim(), std::process::id().to_string());
    }
}
