use crate::error::{ArchiveError, ArchiveResult};
use crate::mirror::store;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const FOLDER_PREFIX: &str = "chat_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageFolder {
    pub sequence: u32,
    pub name: String,
    pub path: PathBuf,
}

pub fn folder_name(sequence: u32) -> String {
    format!("{FOLDER_PREFIX}{sequence:03}")
}

/// Sequence number of a `chat_<digits>` folder name.
pub fn parse_sequence(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(FOLDER_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub struct FolderAllocator {
    chats_dir: PathBuf,
    high_water_file: PathBuf,
}

impl FolderAllocator {
    pub fn new(chats_dir: &Path, high_water_file: &Path) -> Self {
        Self {
            chats_dir: chats_dir.to_path_buf(),
            high_water_file: high_water_file.to_path_buf(),
        }
    }

    fn unavailable(&self, source: std::io::Error) -> ArchiveError {
        ArchiveError::DirectoryUnavailable {
            path: self.chats_dir.clone(),
            source,
        }
    }

    pub fn scan_max(&self) -> ArchiveResult<u32> {
        let entries = match fs::read_dir(&self.chats_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(self.unavailable(err)),
        };

        let mut max = 0u32;
        for entry in entries {
            let entry = entry.map_err(|err| self.unavailable(err))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name();
            if let Some(seq) = name.to_str().and_then(parse_sequence) {
                max = max.max(seq);
            }
        }
        Ok(max)
    }

    fn high_water(&self) -> ArchiveResult<u32> {
        match fs::read_to_string(&self.high_water_file) {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                ArchiveError::io(
                    "parse",
                    &self.high_water_file,
                    std::io::Error::new(
                        ErrorKind::InvalidData,
                        format!("invalid folder sequence `{}`", raw.trim()),
                    ),
                )
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(0),
            Err(err) => Err(ArchiveError::io("read", &self.high_water_file, err)),
        }
    }

    pub fn allocate_next(&self) -> ArchiveResult<StorageFolder> {
        fs::create_dir_all(&self.chats_dir).map_err(|err| self.unavailable(err))?;

        let sequence = self.scan_max()?.max(self.high_water()?) + 1;
        let name = folder_name(sequence);
        let path = self.chats_dir.join(&name);
        fs::create_dir(&path).map_err(|source| ArchiveError::DirectoryUnavailable {
            path: path.clone(),
            source,
        })?;
        store::write_atomic(&self.high_water_file, format!("{sequence}\n").as_bytes())?;

        Ok(StorageFolder {
            sequence,
            name,
            path,
        })
    }
}
