use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn mirror_cmd(root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("chat-mirror");
    cmd.current_dir(root)
        .env("MIRROR_HOME", root.join("mirror"))
        .env("MIRROR_CONFIG_PATH", root.join("config.toml"))
        .env_remove("MIRROR_ARCHIVE_DIR");
    cmd
}

#[test]
fn status_flags_missing_archive() {
    let tmp = tempdir().expect("tempdir");
    mirror_cmd(tmp.path())
        .arg("status")
        .assert()
        .failure()
        .stdout(predicate::str::contains("archive not initialized"));
}

#[test]
fn init_then_status_reports_totals() {
    let tmp = tempdir().expect("tempdir");
    mirror_cmd(tmp.path()).arg("init").assert().success();
    assert!(tmp.path().join("mirror/archive/lists/chats.html").exists());

    mirror_cmd(tmp.path())
        .arg("ingest")
        .write_stdin(
            "{\"event\":\"new_message\",\"id\":1,\"date\":\"2026-10-18T09:00:00Z\",\"sender\":{\"id\":1,\"first_name\":\"Ada\"},\"text\":\"x\"}\n",
        )
        .assert()
        .success();

    mirror_cmd(tmp.path())
        .arg("--json")
        .arg("status")
        .env("MIRROR_ESCAPE_MARKUP", "true")
        .assert()
        .success()
        .stdout(predicate::str::contains("conversations=1"))
        .stdout(predicate::str::contains("messages=1"))
        .stdout(predicate::str::contains("MIRROR_ESCAPE_MARKUP"));
}

#[test]
fn render_restores_deleted_pages_using_config_file() {
    let tmp = tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("config.toml"),
        "[archive]\nutc_offset = \"+02:00\"\n",
    )
    .expect("config");

    mirror_cmd(tmp.path())
        .arg("ingest")
        .write_stdin(
            "{\"event\":\"new_message\",\"id\":1,\"date\":\"2026-10-18T09:00:00Z\",\"sender\":{\"id\":1,\"first_name\":\"Ada\"},\"text\":\"<b>bold</b>\"}\n",
        )
        .assert()
        .success();

    let archive = tmp.path().join("mirror/archive");
    let page_path = archive.join("chats/chat_001/messages.html");
    fs::remove_file(&page_path).expect("rm page");
    fs::remove_file(archive.join("lists/chats.html")).expect("rm index");

    mirror_cmd(tmp.path())
        .arg("render")
        .assert()
        .success()
        .stdout(predicate::str::contains("conversations_rendered=1"));

    let page = fs::read_to_string(&page_path).expect("page");
    assert!(page.contains("18.10.2026 11:00:00 UTC+02:00"));
    assert!(page.contains("&lt;b&gt;bold&lt;/b&gt;"));
    assert!(archive.join("lists/chats.html").exists());
}

#[test]
fn invalid_config_is_reported() {
    let tmp = tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("config.toml"),
        "[archive]\nname_match = \"fuzzy\"\n",
    )
    .expect("config");

    mirror_cmd(tmp.path())
        .arg("render")
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:").or(predicate::str::contains("error:")));
}
