//! Page shells and stylesheet bundled into the binary.

pub const INDEX_SHELL: &str = include_str!("../assets/chats.html");
pub const CONVERSATION_SHELL: &str = include_str!("../assets/messages.html");
pub const STYLESHEET: &str = include_str!("../assets/style.css");

/// Where the stylesheet lives relative to the archive root.
pub const STYLESHEET_RELATIVE_PATH: &str = "css/style.css";
