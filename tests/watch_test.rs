use predicates::prelude::*;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn event(id: i64, text: &str) -> String {
    format!(
        "{{\"event\":\"new_message\",\"id\":{id},\"date\":\"2026-10-18T10:00:00Z\",\"sender\":{{\"id\":9,\"first_name\":\"Ada\"}},\"text\":\"{text}\"}}\n"
    )
}

fn watch_once(root: &Path, inbound: &Path) -> assert_cmd::assert::Assert {
    assert_cmd::cargo::cargo_bin_cmd!("chat-mirror")
        .current_dir(root)
        .env("MIRROR_HOME", root.join("mirror"))
        .env("MIRROR_CONFIG_PATH", root.join("absent.toml"))
        .env("MIRROR_INBOUND_PATHS", inbound)
        .env_remove("MIRROR_ARCHIVE_DIR")
        .arg("watch")
        .arg("--once")
        .assert()
}

#[test]
fn watch_once_applies_new_lines_only() {
    let tmp = tempdir().expect("tempdir");
    let inbound = tmp.path().join("feeds");
    fs::create_dir_all(&inbound).expect("mkdir");
    let feed = inbound.join("chat.jsonl");
    fs::write(&feed, event(1, "first")).expect("write");

    watch_once(tmp.path(), &inbound)
        .success()
        .stdout(predicate::str::contains("inbound.applied=1"));
    watch_once(tmp.path(), &inbound)
        .success()
        .stdout(predicate::str::contains("inbound.applied=0"));

    let mut file = OpenOptions::new().append(true).open(&feed).expect("open");
    file.write_all(event(2, "second").as_bytes()).expect("append");
    drop(file);

    watch_once(tmp.path(), &inbound)
        .success()
        .stdout(predicate::str::contains("inbound.applied=1"));

    let page = fs::read_to_string(tmp.path().join("mirror/archive/chats/chat_001/messages.html"))
        .expect("page");
    assert_eq!(page.matches("class=\"message default clearfix\"").count(), 2);

    let state = fs::read_to_string(tmp.path().join("mirror/archive/.mirror/watch_state.json"))
        .expect("state");
    assert!(state.contains("inbound_cursors"));
}

#[test]
fn watch_rejects_conflicting_flags() {
    let tmp = tempdir().expect("tempdir");
    assert_cmd::cargo::cargo_bin_cmd!("chat-mirror")
        .current_dir(tmp.path())
        .env("MIRROR_HOME", tmp.path().join("mirror"))
        .env("MIRROR_CONFIG_PATH", tmp.path().join("absent.toml"))
        .arg("watch")
        .arg("--once")
        .arg("--daemon")
        .assert()
        .failure()
        .stdout(predicate::str::contains("use only one of --once or --daemon"));
}
