use crate::error::{ArchiveError, ArchiveResult};
use crate::mirror::paths::MirrorPaths;
use crate::mirror::render::{RenderOptions, render_conversation_document, render_message};
use crate::mirror::store;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub sender_display: String,
    pub text: String,
    pub timestamp_display: String,
    pub time_display: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
}

/// One line of a conversation journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum JournalEntry {
    Header { title: String, initial: String },
    Append { message: MessageRecord },
    Edit { id: i64, text: String, label: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationDocument {
    pub title: String,
    pub initial: String,
    pub messages: Vec<MessageRecord>,
}

impl ConversationDocument {
    fn apply(&mut self, entry: JournalEntry) -> bool {
        match entry {
            JournalEntry::Header { title, initial } => {
                self.title = title;
                self.initial = initial;
                true
            }
            JournalEntry::Append { message } => {
                self.messages.push(message);
                true
            }
            JournalEntry::Edit { id, text, label } => {
                let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
                    return false;
                };
                message.edits.push(text);
                message.edited_at = Some(label);
                true
            }
        }
    }
}

/// Message history of one conversation folder.
///
/// The journal under `.mirror/chats/` is the record of truth and only ever
/// grows; `messages.html` is regenerated from it after every change.
pub struct ConversationArchive {
    journal: PathBuf,
    page: PathBuf,
    options: RenderOptions,
}

impl ConversationArchive {
    pub fn new(paths: &MirrorPaths, folder_name: &str, options: RenderOptions) -> Self {
        Self {
            journal: paths.journal_for(folder_name),
            page: paths.messages_page_for(folder_name),
            options,
        }
    }

    pub fn page_path(&self) -> &Path {
        &self.page
    }

    pub fn create_document(
        &self,
        title: &str,
        initial: &str,
        messages: &[MessageRecord],
    ) -> ArchiveResult<()> {
        let header = JournalEntry::Header {
            title: title.to_string(),
            initial: initial.to_string(),
        };
        let mut journal = store::encode_json_line(&self.journal, &header)?;
        for message in messages {
            let line = JournalEntry::Append {
                message: message.clone(),
            };
            journal.push_str(&store::encode_json_line(&self.journal, &line)?);
        }
        store::write_atomic(&self.journal, journal.as_bytes())?;

        self.write_page(&ConversationDocument {
            title: title.to_string(),
            initial: initial.to_string(),
            messages: messages.to_vec(),
        })
    }

    pub fn append_message(&self, record: &MessageRecord) -> ArchiveResult<()> {
        if !self.journal.exists() {
            return Err(ArchiveError::DocumentNotFound(self.page.clone()));
        }
        store::append_json_line(
            &self.journal,
            &JournalEntry::Append {
                message: record.clone(),
            },
        )?;
        self.render()
    }

    pub fn edit_message(&self, id: i64, new_text: &str, edit_time_label: &str) -> ArchiveResult<()> {
        let mut doc = self.load()?;
        let edit = JournalEntry::Edit {
            id,
            text: new_text.to_string(),
            label: edit_time_label.to_string(),
        };
        if !doc.apply(edit.clone()) {
            return Err(ArchiveError::MessageNotFound {
                id,
                path: self.page.clone(),
            });
        }
        store::append_json_line(&self.journal, &edit)?;
        self.write_page(&doc)
    }

    pub fn load(&self) -> ArchiveResult<ConversationDocument> {
        let entries = store::read_json_lines::<JournalEntry>(&self.journal)?
            .ok_or_else(|| ArchiveError::DocumentNotFound(self.page.clone()))?;
        let mut doc = ConversationDocument::default();
        for entry in entries {
            doc.apply(entry);
        }
        Ok(doc)
    }

    /// Regenerates `messages.html` from the journal.
    pub fn render(&self) -> ArchiveResult<()> {
        let doc = self.load()?;
        self.write_page(&doc)
    }

    fn write_page(&self, doc: &ConversationDocument) -> ArchiveResult<()> {
        let fragments = doc
            .messages
            .iter()
            .map(|m| render_message(m, self.options))
            .collect::<Vec<_>>();
        let page = render_conversation_document(&doc.title, &doc.initial, &fragments, self.options);
        store::write_atomic(&self.page, page.as_bytes())
    }
}
