fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if !ch.is_control() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WarnEvent<'a> {
    pub code: &'a str,
    pub stage: &'a str,
    pub action: &'a str,
    pub conversation: &'a str,
    pub folder: &'a str,
    pub retry: &'a str,
    pub reason: &'a str,
    pub err: &'a str,
}

pub fn format_line(event: &WarnEvent<'_>) -> String {
    format!(
        "MIRROR_WARN code={} stage={} action={} conversation={} folder={} retry={} reason={} err={}",
        sanitize_value(event.code),
        sanitize_value(event.stage),
        sanitize_value(event.action),
        sanitize_value(event.conversation),
        sanitize_value(event.folder),
        sanitize_value(event.retry),
        sanitize_value(event.reason),
        sanitize_value(event.err),
    )
}

pub fn emit(event: WarnEvent<'_>) {
    tracing::warn!(target: "chat_mirror::warn", "{}", format_line(&event));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_value_rewrites_whitespace() {
        assert_eq!(sanitize_value("Ada  Lovelace\tjr"), "Ada_Lovelace_jr");
    }

    #[test]
    fn sanitize_value_falls_back_for_empty() {
        assert_eq!(sanitize_value("   "), "na");
    }

    #[test]
    fn line_keeps_key_order_and_non_ascii_names() {
        let line = format_line(&WarnEvent {
            code: "NOT_FOUND",
            stage: "edit",
            action: "resolve-folder",
            conversation: "Влад Петров",
            folder: "",
            retry: "none",
            reason: "conversation-unknown",
            err: "conversation not found: Влад Петров",
        });
        assert_eq!(
            line,
            "MIRROR_WARN code=NOT_FOUND stage=edit action=resolve-folder conversation=Влад_Петров folder=na retry=none reason=conversation-unknown err=conversation_not_found:_Влад_Петров"
        );
    }
}
