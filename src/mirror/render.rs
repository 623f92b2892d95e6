//! Markup for the export-style archive pages.
//!
//! Everything here is string composition over already-resolved values; the
//! index and conversation stores decide what gets rendered and when.

use crate::assets;
use crate::mirror::conversation::MessageRecord;
use crate::mirror::index::ConversationIndexEntry;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub escape_markup: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            escape_markup: true,
        }
    }
}

impl RenderOptions {
    fn text<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if self.escape_markup {
            escape_html(value)
        } else {
            Cow::Borrowed(value)
        }
    }
}

pub fn escape_html(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 16);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// First character of `name`, uppercased; `?` for blank names.
pub fn initial_for(name: &str) -> String {
    match name.trim().chars().next() {
        Some(ch) => ch.to_uppercase().collect(),
        None => "?".to_string(),
    }
}

fn messages_label(count: u64) -> String {
    if count == 1 {
        "1 message".to_string()
    } else {
        format!("{count} messages")
    }
}

pub fn render_index_entry(entry: &ConversationIndexEntry, options: RenderOptions) -> String {
    format!(
        r#"
     <a class="entry block_link clearfix" href="{href}">

      <div class="pull_left userpic_wrap">
       <div class="userpic userpic7" style="width: 48px; height: 48px">
        <div class="initials" style="line-height: 48px">
{initial}
        </div>
       </div>
      </div>

      <div class="body">
       <div class="pull_right info details">{kind}</div>
       <div class="name bold">{name}</div>
       <div class="details_entry details">{count}</div>
      </div>

     </a>
"#,
        href = options.text(&entry.folder_ref),
        initial = options.text(&entry.initial),
        kind = entry.kind.label(),
        name = options.text(&entry.display_name),
        count = messages_label(entry.message_count),
    )
}

pub fn render_message(record: &MessageRecord, options: RenderOptions) -> String {
    let mut text = options.text(&record.text).into_owned();
    for edit in &record.edits {
        text.push_str("<br>edited: ");
        text.push_str(&options.text(edit));
    }

    let marker = match &record.edited_at {
        Some(label) if !record.edits.is_empty() => format!(
            "\n       <div class=\"pull_right edited details\" title=\"{}\">Edited</div>",
            options.text(label)
        ),
        _ if !record.edits.is_empty() => {
            "\n       <div class=\"pull_right edited details\">Edited</div>".to_string()
        }
        _ => String::new(),
    };

    format!(
        r#"
     <div class="message default clearfix" id="message{id}">

      <div class="pull_left userpic_wrap">
       <div class="userpic userpic7" style="width: 42px; height: 42px">
        <div class="initials" style="line-height: 42px">
{initial}
        </div>
       </div>
      </div>

      <div class="body">
       <div class="pull_right date details" title="{timestamp}">
{time}
       </div>{marker}

       <div class="from_name">
{sender}
       </div>

       <div class="text">
{text}
       </div>

      </div>

     </div>
"#,
        id = record.id,
        initial = options.text(&initial_for(&record.sender_display)),
        timestamp = options.text(&record.timestamp_display),
        time = options.text(&record.time_display),
        marker = marker,
        sender = options.text(&record.sender_display),
        text = text,
    )
}

pub fn render_conversation_document(
    title: &str,
    initial: &str,
    fragments: &[String],
    options: RenderOptions,
) -> String {
    let title = options.text(title);
    let initial = options.text(initial);
    let messages = fragments.concat();
    fill_shell(assets::CONVERSATION_SHELL, |name| match name {
        "title" => Some(title.as_ref()),
        "initial" => Some(initial.as_ref()),
        "messages" => Some(messages.as_str()),
        _ => None,
    })
}

/// Substitutes `{{name}}` placeholders of `shell` in one pass; inserted
/// values are never rescanned. Unknown placeholders are kept verbatim.
fn fill_shell<'v>(shell: &str, value: impl Fn(&str) -> Option<&'v str>) -> String {
    let mut out = String::with_capacity(shell.len());
    let mut rest = shell;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        let name = &rest[open + 2..open + 2 + close];
        out.push_str(&rest[..open]);
        match value(name) {
            Some(v) => out.push_str(v),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &rest[open + 2 + close + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::index::ChatKind;

    fn record(id: i64, text: &str) -> MessageRecord {
        MessageRecord {
            id,
            sender_display: "ada lovelace".to_string(),
            text: text.to_string(),
            timestamp_display: "18.10.2026 12:00:00 UTC+00:00".to_string(),
            time_display: "12:00".to_string(),
            edits: Vec::new(),
            edited_at: None,
        }
    }

    #[test]
    fn index_entry_embeds_fields_and_link() {
        let entry = ConversationIndexEntry {
            display_name: "Ada Lovelace".to_string(),
            initial: "A".to_string(),
            folder_ref: "../chats/chat_001/messages.html".to_string(),
            message_count: 3,
            kind: ChatKind::Private,
        };
        let html = render_index_entry(&entry, RenderOptions::default());
        assert!(html.contains(r#"href="../chats/chat_001/messages.html""#));
        assert!(html.contains(r#"<div class="name bold">Ada Lovelace</div>"#));
        assert!(html.contains(r#"<div class="pull_right info details">private</div>"#));
        assert!(html.contains("3 messages"));
    }

    #[test]
    fn message_fragment_carries_id_time_and_sender() {
        let html = render_message(&record(17, "hello"), RenderOptions::default());
        assert!(html.contains(r#"id="message17""#));
        assert!(html.contains(r#"title="18.10.2026 12:00:00 UTC+00:00""#));
        assert!(html.contains("\nA\n"));
        assert!(html.contains("hello"));
        assert!(!html.contains("Edited"));
    }

    #[test]
    fn edits_accumulate_under_one_marker() {
        let mut rec = record(1, "hello");
        rec.edits = vec!["hi".to_string(), "hey".to_string()];
        rec.edited_at = Some("18.10.2026 12:05:00 UTC+00:00".to_string());

        let html = render_message(&rec, RenderOptions::default());
        assert!(html.contains("hello<br>edited: hi<br>edited: hey"));
        assert_eq!(html.matches(">Edited<").count(), 1);
    }

    #[test]
    fn escaping_is_switchable() {
        let rec = record(2, "<b>x</b> & y");
        let escaped = render_message(&rec, RenderOptions::default());
        assert!(escaped.contains("&lt;b&gt;x&lt;/b&gt; &amp; y"));

        let raw = render_message(
            &rec,
            RenderOptions {
                escape_markup: false,
            },
        );
        assert!(raw.contains("<b>x</b> & y"));
    }

    #[test]
    fn initial_handles_blank_and_non_ascii() {
        assert_eq!(initial_for("  ada"), "A");
        assert_eq!(initial_for("éva"), "É");
        assert_eq!(initial_for("   "), "?");
    }

    #[test]
    fn conversation_document_wraps_fragments_in_history() {
        let fragments = vec![
            render_message(&record(5, "five"), RenderOptions::default()),
            render_message(&record(2, "two"), RenderOptions::default()),
        ];
        let doc = render_conversation_document("Ada", "A", &fragments, RenderOptions::default());
        assert!(doc.contains(r#"<div class="history">"#));
        assert!(doc.contains("<title>Exported Data</title>"));
        let five = doc.find("message5").expect("five");
        let two = doc.find("message2").expect("two");
        assert!(five < two);
    }

    #[test]
    fn placeholder_text_in_values_is_not_substituted() {
        let mut rec = record(1, "body mentions {{title}}");
        rec.sender_display = "Eve {{messages}}".to_string();
        let fragments = vec![render_message(&rec, RenderOptions::default())];
        let doc = render_conversation_document(
            "Eve {{messages}}",
            "{{initial}}",
            &fragments,
            RenderOptions::default(),
        );

        assert_eq!(doc.matches("class=\"message default clearfix\"").count(), 1);
        assert!(doc.contains("\nEve {{messages}}\n"));
        assert!(doc.contains("body mentions {{title}}"));
        assert!(doc.contains("\n{{initial}}\n"));
    }

    #[test]
    fn shell_filling_keeps_unknown_and_unclosed_placeholders() {
        let got = fill_shell("a {{x}} b {{y}} c {{open", |name| {
            (name == "x").then_some("X")
        });
        assert_eq!(got, "a X b {{y}} c {{open");
    }
}
