use crate::error::{ArchiveError, ArchiveResult};
use crate::mirror::clock::{DisplayZone, display_time};
use crate::mirror::config::MirrorConfig;
use crate::mirror::conversation::{ConversationArchive, MessageRecord};
use crate::mirror::folders::FolderAllocator;
use crate::mirror::index::{
    ArchiveIndex, ChatKind, ConversationIndexEntry, FolderRef, IndexShell, InsertOutcome,
    NameMatch,
};
use crate::mirror::paths::MirrorPaths;
use crate::mirror::render::{RenderOptions, initial_for};
use crate::mirror::store::{self, ArchiveLock};
use crate::mirror::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;

/// A message event after transport-specific normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub message_id: i64,
    pub sender_id: i64,
    pub sender_display: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Set when this event rewrites an earlier message; `text` is the new text.
    #[serde(default)]
    pub edited_message_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub name_match: NameMatch,
    pub chat_kind: ChatKind,
    pub zone: DisplayZone,
    pub render: RenderOptions,
    pub index_shell: IndexShell,
}

impl ArchiveSettings {
    pub fn from_config(cfg: &MirrorConfig) -> Result<Self> {
        let index_shell = match cfg.archive.index_template.as_deref() {
            Some(path) => IndexShell {
                source: path.to_string(),
                markup: fs::read_to_string(path)
                    .with_context(|| format!("failed to read index template {path}"))?,
            },
            None => IndexShell::builtin(),
        };
        Ok(Self {
            name_match: cfg.name_match()?,
            chat_kind: cfg.chat_kind()?,
            zone: cfg.display_zone()?,
            render: RenderOptions {
                escape_markup: cfg.archive.escape_markup,
            },
            index_shell,
        })
    }
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            name_match: NameMatch::Exact,
            chat_kind: ChatKind::Private,
            zone: DisplayZone::utc(),
            render: RenderOptions::default(),
            index_shell: IndexShell::builtin(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created {
        conversation: String,
        folder: String,
    },
    Appended {
        conversation: String,
        folder: String,
        count: u64,
    },
    Edited {
        conversation: String,
        folder: String,
        message_id: i64,
    },
}

impl SyncOutcome {
    pub fn folder(&self) -> &str {
        match self {
            Self::Created { folder, .. }
            | Self::Appended { folder, .. }
            | Self::Edited { folder, .. } => folder,
        }
    }
}

#[derive(Debug)]
pub struct SyncFailure {
    pub conversation: String,
    pub stage: &'static str,
    pub action: &'static str,
    pub folder: Option<String>,
    pub error: ArchiveError,
}

/// Result of handling one message; failures are already logged.
pub type SyncResult = Result<SyncOutcome, SyncFailure>;

/// Drives the index, folder allocator and conversation archives for one
/// archive directory. Holds the single-writer lock for its whole lifetime.
pub struct Orchestrator {
    paths: MirrorPaths,
    settings: ArchiveSettings,
    index: ArchiveIndex,
    allocator: FolderAllocator,
    _lock: ArchiveLock,
}

impl Orchestrator {
    pub fn open(paths: &MirrorPaths, settings: ArchiveSettings) -> ArchiveResult<Self> {
        let lock = ArchiveLock::acquire(&paths.lock_file())?;
        ensure_layout(paths)?;
        let index = ArchiveIndex::open(
            paths,
            settings.index_shell.clone(),
            settings.name_match,
            settings.render,
        )?;
        let allocator = FolderAllocator::new(&paths.chats_dir, &paths.folder_seq_file());
        Ok(Self {
            paths: paths.clone(),
            settings,
            index,
            allocator,
            _lock: lock,
        })
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    pub fn conversation(&self, folder: &FolderRef) -> ConversationArchive {
        ConversationArchive::new(&self.paths, &folder.folder_name, self.settings.render)
    }

    /// Applies one message. Never panics or propagates: failures are logged
    /// with the conversation context and handed back to the caller.
    pub fn handle(&mut self, message: &NormalizedMessage) -> SyncResult {
        let result = self.try_handle(message);
        match &result {
            Ok(outcome) => tracing::debug!(
                conversation = %message.sender_display.trim(),
                folder = %outcome.folder(),
                message_id = message.message_id,
                "message mirrored"
            ),
            Err(failure) => warn::emit(WarnEvent {
                code: failure.error.code(),
                stage: failure.stage,
                action: failure.action,
                conversation: &failure.conversation,
                folder: failure.folder.as_deref().unwrap_or(""),
                retry: "none",
                reason: "sync-step-failed",
                err: &failure.error.to_string(),
            }),
        }
        result
    }

    pub fn try_handle(&mut self, message: &NormalizedMessage) -> SyncResult {
        let name = message.sender_display.trim().to_string();
        match message.edited_message_id {
            Some(target) => self.apply_edit(&name, target, message),
            None if self.index.exists(&name) => self.append_existing(&name, message),
            None => self.create_conversation(&name, message),
        }
    }

    fn message_record(&self, name: &str, message: &NormalizedMessage) -> MessageRecord {
        let shown = display_time(&self.settings.zone, message.timestamp);
        MessageRecord {
            id: message.message_id,
            sender_display: name.to_string(),
            text: message.text.clone(),
            timestamp_display: shown.timestamp,
            time_display: shown.time,
            edits: Vec::new(),
            edited_at: None,
        }
    }

    fn apply_edit(&mut self, name: &str, target: i64, message: &NormalizedMessage) -> SyncResult {
        let fail = |action, folder: Option<&FolderRef>, error| SyncFailure {
            conversation: name.to_string(),
            stage: "edit",
            action,
            folder: folder.map(ToString::to_string),
            error,
        };

        let folder = self
            .index
            .resolve_folder(name)
            .map_err(|e| fail("resolve-folder", None, e))?;
        let label = display_time(&self.settings.zone, message.timestamp).timestamp;
        self.conversation(&folder)
            .edit_message(target, &message.text, &label)
            .map_err(|e| fail("edit-message", Some(&folder), e))?;

        Ok(SyncOutcome::Edited {
            conversation: name.to_string(),
            folder: folder.folder_name,
            message_id: target,
        })
    }

    fn append_existing(&mut self, name: &str, message: &NormalizedMessage) -> SyncResult {
        let fail = |action, folder: Option<&FolderRef>, error| SyncFailure {
            conversation: name.to_string(),
            stage: "append",
            action,
            folder: folder.map(ToString::to_string),
            error,
        };

        let folder = self
            .index
            .resolve_folder(name)
            .map_err(|e| fail("resolve-folder", None, e))?;
        let count = self
            .index
            .message_count(name)
            .map_err(|e| fail("read-count", Some(&folder), e))?;

        let record = self.message_record(name, message);
        self.conversation(&folder)
            .append_message(&record)
            .map_err(|e| fail("append-message", Some(&folder), e))?;
        self.index
            .set_message_count(name, count + 1)
            .map_err(|e| fail("write-count", Some(&folder), e))?;

        Ok(SyncOutcome::Appended {
            conversation: name.to_string(),
            folder: folder.folder_name,
            count: count + 1,
        })
    }

    fn create_conversation(&mut self, name: &str, message: &NormalizedMessage) -> SyncResult {
        let fail = |action, folder: Option<&str>, error| SyncFailure {
            conversation: name.to_string(),
            stage: "create",
            action,
            folder: folder.map(ToString::to_string),
            error,
        };

        let allocated = self
            .allocator
            .allocate_next()
            .map_err(|e| fail("allocate-folder", None, e))?;
        let folder = FolderRef::new(&allocated.name);
        let initial = initial_for(name);

        let record = self.message_record(name, message);
        let archive = self.conversation(&folder);
        archive
            .create_document(name, &initial, &[record])
            .map_err(|e| fail("create-document", Some(allocated.name.as_str()), e))?;

        let entry = ConversationIndexEntry {
            display_name: name.to_string(),
            initial,
            folder_ref: folder.href(),
            message_count: 1,
            kind: self.settings.chat_kind,
        };
        match self.index.insert_entry(entry) {
            Ok(InsertOutcome::Inserted) => {}
            Ok(InsertOutcome::AlreadyPresent) => {
                tracing::warn!(conversation = %name, folder = %allocated.name, "conversation registered concurrently");
            }
            Err(e) => return Err(fail("insert-entry", Some(allocated.name.as_str()), e)),
        }

        tracing::info!(
            conversation = %name,
            page = %archive.page_path().display(),
            "new conversation archived"
        );
        Ok(SyncOutcome::Created {
            conversation: name.to_string(),
            folder: allocated.name,
        })
    }

    /// Regenerates the index page and every conversation page.
    pub fn render_all(&self) -> ArchiveResult<RenderSummary> {
        self.index.flush()?;
        let mut summary = RenderSummary::default();
        for entry in self.index.entries() {
            let folder = FolderRef::parse(&entry.folder_ref).ok_or_else(|| {
                ArchiveError::MalformedEntry {
                    name: entry.display_name.clone(),
                    href: entry.folder_ref.clone(),
                }
            })?;
            match self.conversation(&folder).render() {
                Ok(()) => summary.rendered += 1,
                Err(err) => {
                    warn::emit(WarnEvent {
                        code: err.code(),
                        stage: "render",
                        action: "render-conversation",
                        conversation: &entry.display_name,
                        folder: &folder.folder_name,
                        retry: "none",
                        reason: "journal-unreadable",
                        err: &err.to_string(),
                    });
                    summary.failed.push(folder.folder_name);
                }
            }
        }
        Ok(summary)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderSummary {
    pub rendered: usize,
    pub failed: Vec<String>,
}

/// Creates the archive directories and the shared stylesheet.
pub fn ensure_layout(paths: &MirrorPaths) -> ArchiveResult<()> {
    for dir in [&paths.archive_dir, &paths.chats_dir, &paths.state_dir] {
        store::ensure_dir(dir)?;
    }
    store::ensure_dir(&paths.journals_dir())?;
    if let Some(lists) = paths.index_file.parent() {
        store::ensure_dir(lists)?;
    }

    let stylesheet = paths
        .archive_dir
        .join(crate::assets::STYLESHEET_RELATIVE_PATH);
    if !stylesheet.exists() {
        store::write_atomic(&stylesheet, crate::assets::STYLESHEET.as_bytes())?;
    }
    Ok(())
}

pub fn archive_exists(paths: &MirrorPaths) -> bool {
    paths.index_store().exists() || paths.index_file.exists()
}
