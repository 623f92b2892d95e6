use crate::error::{ArchiveError, ArchiveResult};
use crate::mirror::paths::{CHATS_DIR_NAME, MESSAGES_FILE_NAME, MirrorPaths};
use crate::mirror::render::{RenderOptions, render_index_entry};
use crate::mirror::store;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const ENTRY_LIST_ANCHOR: &str = "entry_list";
const INDEX_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Channel,
}

impl ChatKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
            Self::Channel => "channel",
        }
    }
}

impl FromStr for ChatKind {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "group" => Ok(Self::Group),
            "channel" => Ok(Self::Channel),
            other => Err(anyhow!(
                "invalid chat kind `{other}`: use `private`, `group` or `channel`"
            )),
        }
    }
}

/// How a display name is matched against index entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    /// Trimmed equality.
    Exact,
    /// Entry name contains the target; "Ann" matches "Anna".
    Contains,
}

impl NameMatch {
    pub fn matches(self, entry_name: &str, target: &str) -> bool {
        let target = target.trim();
        if target.is_empty() {
            return false;
        }
        match self {
            Self::Exact => entry_name.trim() == target,
            Self::Contains => entry_name.trim().contains(target),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
        }
    }
}

impl FromStr for NameMatch {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "contains" => Ok(Self::Contains),
            other => Err(anyhow!(
                "invalid name match `{other}`: use `exact` or `contains`"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationIndexEntry {
    pub display_name: String,
    pub initial: String,
    pub folder_ref: String,
    pub message_count: u64,
    pub kind: ChatKind,
}

/// Conversation folder as linked from the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    pub folder_name: String,
}

impl FolderRef {
    pub fn new(folder_name: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
        }
    }

    /// Link relative to `lists/chats.html`.
    pub fn href(&self) -> String {
        format!("../{CHATS_DIR_NAME}/{}/{MESSAGES_FILE_NAME}", self.folder_name)
    }

    /// Recovers the folder from a stored link: the segment holding the page.
    pub fn parse(href: &str) -> Option<Self> {
        let segments = href
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .collect::<Vec<_>>();
        match segments.as_slice() {
            [.., folder, page] if *page == MESSAGES_FILE_NAME => Some(Self::new(*folder)),
            [.., folder] if !folder.contains('.') => Some(Self::new(*folder)),
            _ => None,
        }
    }
}

impl fmt::Display for FolderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.folder_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyPresent,
}

/// Markup the index page is rendered into.
#[derive(Debug, Clone)]
pub struct IndexShell {
    pub source: String,
    pub markup: String,
}

impl IndexShell {
    pub fn builtin() -> Self {
        Self {
            source: "builtin".to_string(),
            markup: crate::assets::INDEX_SHELL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexStore {
    schema_version: u32,
    entries: Vec<ConversationIndexEntry>,
}

/// Finds the byte offset just inside the first element carrying `class`.
pub fn find_insertion_point(markup: &str, class: &str) -> Option<usize> {
    let mut cursor = 0usize;
    while let Some(rel) = markup[cursor..].find("class=\"") {
        let value_start = cursor + rel + "class=\"".len();
        let value_end = value_start + markup[value_start..].find('"')?;
        let value = &markup[value_start..value_end];
        if value.split_whitespace().any(|c| c == class) {
            let close = markup[value_end..].find('>')?;
            return Some(value_end + close + 1);
        }
        cursor = value_end + 1;
    }
    None
}

pub struct ArchiveIndex {
    store_path: PathBuf,
    page_path: PathBuf,
    shell: IndexShell,
    name_match: NameMatch,
    options: RenderOptions,
    entries: Vec<ConversationIndexEntry>,
}

impl ArchiveIndex {
    pub fn open(
        paths: &MirrorPaths,
        shell: IndexShell,
        name_match: NameMatch,
        options: RenderOptions,
    ) -> ArchiveResult<Self> {
        if find_insertion_point(&shell.markup, ENTRY_LIST_ANCHOR).is_none() {
            return Err(ArchiveError::InsertionPointMissing {
                anchor: ENTRY_LIST_ANCHOR,
                template: shell.source,
            });
        }
        let store_path = paths.index_store();
        let entries = store::read_json::<IndexStore>(&store_path)?
            .map(|s| s.entries)
            .unwrap_or_default();
        Ok(Self {
            store_path,
            page_path: paths.index_file.clone(),
            shell,
            name_match,
            options,
            entries,
        })
    }

    pub fn entries(&self) -> &[ConversationIndexEntry] {
        &self.entries
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| self.name_match.matches(&e.display_name, name))
    }

    fn entry(&self, name: &str) -> ArchiveResult<&ConversationIndexEntry> {
        self.position(name)
            .map(|i| &self.entries[i])
            .ok_or_else(|| ArchiveError::NotFound(name.trim().to_string()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn insert_entry(&mut self, entry: ConversationIndexEntry) -> ArchiveResult<InsertOutcome> {
        if self.exists(&entry.display_name) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        let mut next = self.entries.clone();
        next.push(ConversationIndexEntry {
            display_name: entry.display_name.trim().to_string(),
            ..entry
        });
        self.commit(next)?;
        Ok(InsertOutcome::Inserted)
    }

    pub fn message_count(&self, name: &str) -> ArchiveResult<u64> {
        self.entry(name).map(|e| e.message_count)
    }

    pub fn set_message_count(&mut self, name: &str, count: u64) -> ArchiveResult<()> {
        let pos = self
            .position(name)
            .ok_or_else(|| ArchiveError::NotFound(name.trim().to_string()))?;
        let mut next = self.entries.clone();
        next[pos].message_count = count;
        self.commit(next)
    }

    pub fn resolve_folder(&self, name: &str) -> ArchiveResult<FolderRef> {
        let entry = self.entry(name)?;
        FolderRef::parse(&entry.folder_ref).ok_or_else(|| ArchiveError::MalformedEntry {
            name: entry.display_name.clone(),
            href: entry.folder_ref.clone(),
        })
    }

    pub fn render_document(&self) -> ArchiveResult<String> {
        self.render_entries(&self.entries)
    }

    /// Rewrites the index page from the stored entries.
    pub fn flush(&self) -> ArchiveResult<()> {
        let page = self.render_document()?;
        store::write_atomic(&self.page_path, page.as_bytes())
    }

    fn render_entries(&self, entries: &[ConversationIndexEntry]) -> ArchiveResult<String> {
        let markup = &self.shell.markup;
        let at = find_insertion_point(markup, ENTRY_LIST_ANCHOR).ok_or_else(|| {
            ArchiveError::InsertionPointMissing {
                anchor: ENTRY_LIST_ANCHOR,
                template: self.shell.source.clone(),
            }
        })?;

        let mut out = String::with_capacity(markup.len() + entries.len() * 640);
        out.push_str(&markup[..at]);
        for entry in entries {
            out.push_str(&render_index_entry(entry, self.options));
        }
        out.push_str(&markup[at..]);
        Ok(out)
    }

    fn commit(&mut self, next: Vec<ConversationIndexEntry>) -> ArchiveResult<()> {
        let page = self.render_entries(&next)?;
        let snapshot = IndexStore {
            schema_version: INDEX_SCHEMA_VERSION,
            entries: next,
        };
        store::write_json(&self.store_path, &snapshot)?;
        store::write_atomic(&self.page_path, page.as_bytes())?;
        self.entries = snapshot.entries;
        Ok(())
    }
}
