use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

pub const INDEX_RELATIVE_PATH: &str = "lists/chats.html";
pub const CHATS_DIR_NAME: &str = "chats";
pub const STATE_DIR_NAME: &str = ".mirror";
pub const MESSAGES_FILE_NAME: &str = "messages.html";

#[derive(Debug, Clone)]
pub struct MirrorPaths {
    pub mirror_home: PathBuf,
    pub archive_dir: PathBuf,
    pub index_file: PathBuf,
    pub chats_dir: PathBuf,
    pub state_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub inbound_dir: PathBuf,
}

impl MirrorPaths {
    /// Layout rooted at `archive_dir`, with logs and inbound under `mirror_home`.
    pub fn for_archive(mirror_home: &Path, archive_dir: &Path) -> Self {
        Self {
            mirror_home: mirror_home.to_path_buf(),
            archive_dir: archive_dir.to_path_buf(),
            index_file: archive_dir.join(INDEX_RELATIVE_PATH),
            chats_dir: archive_dir.join(CHATS_DIR_NAME),
            state_dir: archive_dir.join(STATE_DIR_NAME),
            logs_dir: mirror_home.join("logs"),
            inbound_dir: mirror_home.join("inbound"),
        }
    }

    pub fn index_store(&self) -> PathBuf {
        self.state_dir.join("index.json")
    }

    pub fn journals_dir(&self) -> PathBuf {
        self.state_dir.join("chats")
    }

    pub fn journal_for(&self, folder_name: &str) -> PathBuf {
        self.journals_dir().join(format!("{folder_name}.jsonl"))
    }

    pub fn messages_page_for(&self, folder_name: &str) -> PathBuf {
        self.chats_dir.join(folder_name).join(MESSAGES_FILE_NAME)
    }

    pub fn folder_seq_file(&self) -> PathBuf {
        self.state_dir.join("folder_seq")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.state_dir.join("archive.lock")
    }
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_path(var: &str) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    env_path(var).unwrap_or(fallback)
}

pub fn resolve_paths() -> Result<MirrorPaths> {
    let mirror_home = match env_path("MIRROR_HOME") {
        Some(path) => path,
        None => required_home_dir()?.join(".chat-mirror"),
    };
    let archive_dir = env_or_default_path("MIRROR_ARCHIVE_DIR", mirror_home.join("archive"));

    let mut paths = MirrorPaths::for_archive(&mirror_home, &archive_dir);
    paths.logs_dir = env_or_default_path("MIRROR_LOGS_DIR", paths.logs_dir);
    paths.inbound_dir = env_or_default_path("MIRROR_INBOUND_DIR", paths.inbound_dir);
    Ok(paths)
}

#[cfg(test)]
pub(crate) fn test_paths(root: &Path) -> MirrorPaths {
    MirrorPaths::for_archive(&root.join("mirror"), &root.join("mirror/archive"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_export_structure() {
        let paths = MirrorPaths::for_archive(Path::new("/m"), Path::new("/m/archive"));
        assert_eq!(paths.index_file, PathBuf::from("/m/archive/lists/chats.html"));
        assert_eq!(
            paths.messages_page_for("chat_004"),
            PathBuf::from("/m/archive/chats/chat_004/messages.html")
        );
        assert_eq!(
            paths.journal_for("chat_004"),
            PathBuf::from("/m/archive/.mirror/chats/chat_004.jsonl")
        );
        assert_eq!(paths.inbound_dir, PathBuf::from("/m/inbound"));
    }
}
