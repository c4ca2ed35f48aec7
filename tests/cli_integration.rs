//! Integration tests for the `qc` CLI.
//!
//! Each test runs `qc` as a subprocess inside a temp directory (so the
//! working-directory config lookup sees only what the test writes) and
//! checks stdout, stderr and written files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const TODAY: &str = "2025-05-14";

/// Get the path to the built `qc` binary.
fn qc_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("qc");
    path
}

fn qc_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(qc_bin());
    cmd.args(args).current_dir(dir).env_remove("RUST_LOG");
    cmd
}

/// Run `qc` with the given args in the given directory, returning (stdout, stderr, success).
fn run_qc(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = qc_command(dir, args).output().expect("failed to run qc");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `qc` expecting success, return stdout.
fn run_qc_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_qc(dir, args);
    if !success {
        panic!(
            "qc {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// Run `qc` with `input` on stdin, expecting success
fn run_qc_stdin(dir: &Path, args: &[&str], input: &str) -> String {
    let mut child = qc_command(dir, args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run qc");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(
        output.status.success(),
        "qc {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

// ---------------------------------------------------------------------------
// task
// ---------------------------------------------------------------------------

#[test]
fn test_task_plain_line() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(tmp.path(), &["task", "Call", "mom", "--priority", "3", "--today", TODAY]);
    assert_eq!(out, "- [ ] Call mom 🔼\n");
}

#[test]
fn test_task_existing_checkbox_unchanged() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(tmp.path(), &["task", "- [ ] Buy milk", "--today", TODAY]);
    assert_eq!(out, "- [ ] Buy milk\n");
}

#[test]
fn test_task_from_stdin() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_stdin(
        tmp.path(),
        &["task", "--today", TODAY, "--tag", "errand"],
        "buy stamps tomorrow\n  at the post office\nreturn books ⏫\n",
    );
    assert_eq!(
        out,
        "- [ ] buy stamps 📅 2025-05-15 ⏫ #errand\n  at the post office\n\
         - [ ] return books 📅 2025-05-15 ⏫ #errand\n"
    );
}

#[test]
fn test_task_bracket_vocabulary() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(
        tmp.path(),
        &["task", "pay rent next week", "--project", "home", "--vocab", "bracket", "--today", TODAY],
    );
    assert_eq!(out, "- [ ] pay rent [due:: 2025-05-21] [project:: home]\n");
}

#[test]
fn test_task_vocabulary_from_config() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("quickcap.toml"),
        "[capture]\nvocabulary = \"bracket\"\n",
    )
    .unwrap();
    let out = run_qc_ok(tmp.path(), &["task", "stretch", "--priority", "low", "--today", TODAY]);
    assert_eq!(out, "- [ ] stretch [priority:: low]\n");
}

#[test]
fn test_task_status_flag() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(tmp.path(), &["task", "ship it", "--status", "completed", "--today", TODAY]);
    assert_eq!(out, "- [x] ship it\n");
}

#[test]
fn test_task_pinned_flag_beats_text() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(
        tmp.path(),
        &["task", "renew passport", "by", "tomorrow", "--due", "2025-06-30", "--today", TODAY, "--json"],
    );
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["record"]["dueDate"], "2025-06-30");
    assert_eq!(parsed["mode"], "inline-task");
    assert_eq!(parsed["vocabulary"], "symbol");
    // The line itself still carries its own date
    assert_eq!(parsed["text"], "- [ ] renew passport 📅 2025-05-15");
}

#[test]
fn test_task_invalid_priority() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_qc(tmp.path(), &["task", "x", "--priority", "9"]);
    assert!(!success);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
    assert!(stderr.contains("priority"), "stderr: {stderr}");
}

#[test]
fn test_task_invalid_config() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(tmp.path().join("quickcap.toml"), "[capture]\nvocabulary = \"emoji-ish\"\n").unwrap();
    let (_, stderr, success) = run_qc(tmp.path(), &["task", "x"]);
    assert!(!success);
    assert!(stderr.contains("unknown vocabulary"), "stderr: {stderr}");
}

// ---------------------------------------------------------------------------
// note
// ---------------------------------------------------------------------------

#[test]
fn test_note_preamble() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(
        tmp.path(),
        &["note", "Plant beans", "--project", "garden", "--tag", "spring", "--today", TODAY],
    );
    assert_eq!(
        out,
        "---\nstatus: \"not-started\"\nproject: \"garden\"\ntags: [\"spring\"]\n---\n\nPlant beans\n"
    );
}

#[test]
fn test_note_with_template() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("Templates")).unwrap();
    fs::write(
        tmp.path().join("Templates/Meeting.md"),
        "---\ntype: meeting\n---\n## Notes\n{{ content }}\n",
    )
    .unwrap();

    let out = run_qc_ok(
        tmp.path(),
        &["note", "Agenda first", "--template", "Templates/Meeting", "--today", TODAY],
    );
    assert_eq!(out, "---\ntype: meeting\n---\n## Notes\nAgenda first\n\n");
}

#[test]
fn test_note_missing_template_falls_back() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (stdout, stderr, success) = run_qc(
        tmp.path(),
        &["note", "Body", "--template", "Nope.md", "--today", TODAY],
    );
    assert!(success);
    assert_eq!(stdout, "---\nstatus: \"not-started\"\n---\n\nBody\n");
    assert!(stderr.contains("warning:"), "stderr: {stderr}");
    assert!(stderr.contains("Nope.md"), "stderr: {stderr}");
}

#[test]
fn test_note_missing_template_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(
        tmp.path(),
        &["note", "Body", "--template", "Nope.md", "--today", TODAY, "--json"],
    );
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["mode"], "document");
    assert_eq!(parsed["template_error"]["kind"], "not-found");
    assert!(
        parsed["template_error"]["path"]
            .as_str()
            .unwrap()
            .ends_with("Nope.md")
    );
}

#[test]
fn test_note_file_name() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("quickcap.toml"),
        "[document]\ndefault_folder = \"Inbox\"\n",
    )
    .unwrap();
    let out = run_qc_ok(
        tmp.path(),
        &["note", "Plant beans tomorrow #spring", "--name", "--today", TODAY],
    );
    let first = out.lines().next().unwrap();
    assert_eq!(first, "Inbox/2025-05-14 - Plant beans.md");
    assert!(out.contains("dueDate: \"2025-05-15\""), "{out}");
}

// ---------------------------------------------------------------------------
// scan / extract
// ---------------------------------------------------------------------------

#[test]
fn test_scan() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(tmp.path(), &["scan", "start tomorrow, due next week", "--today", TODAY]);
    assert_eq!(out, "\nstart: 2025-05-15\ndue: 2025-05-21\n");
}

#[test]
fn test_scan_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(tmp.path(), &["scan", "pay rent tomorrow", "--today", TODAY, "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["cleanedLine"], "pay rent");
    assert_eq!(parsed["dueDate"], "2025-05-15");
    assert!(parsed.get("startDate").is_none());
}

#[test]
fn test_scan_nothing_found() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(tmp.path(), &["scan", "just words", "--today", TODAY]);
    assert_eq!(out, "just words\n");
}

#[test]
fn test_extract() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(tmp.path(), &["extract", "#urgent buy milk #urgent 🔼"]);
    assert_eq!(out, "buy milk\n\npriority: 3 (medium)\ntags: #urgent\n");
}

#[test]
fn test_extract_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(tmp.path(), &["extract", "--json", "call @phone #project/home"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["cleaned"], "call");
    assert_eq!(parsed["metadata"]["context"], "phone");
    assert_eq!(parsed["metadata"]["project"], "home");
    assert_eq!(parsed["tags"].as_array().unwrap().len(), 0);
}

// ---------------------------------------------------------------------------
// mode
// ---------------------------------------------------------------------------

#[test]
fn test_mode_default() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_qc_ok(tmp.path(), &["mode"]);
    assert_eq!(out, "inline-task\n");
}

#[test]
fn test_mode_persists_and_keeps_comments() {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = tmp.path().join("quickcap.toml");
    fs::write(
        &config,
        "# my capture setup\n[capture]\nvocabulary = \"symbol\" # icons please\n",
    )
    .unwrap();

    let out = run_qc_ok(tmp.path(), &["mode", "document"]);
    assert_eq!(out, "default mode set to document\n");

    let written = fs::read_to_string(&config).unwrap();
    assert!(written.starts_with("# my capture setup\n"));
    assert!(written.contains("# icons please"));
    assert!(written.contains("default_mode = \"document\""));

    assert_eq!(run_qc_ok(tmp.path(), &["mode"]), "document\n");
}

#[test]
fn test_mode_explicit_config_path() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("conf")).unwrap();
    run_qc_ok(tmp.path(), &["--config", "conf/qc.toml", "mode", "note"]);
    let written = fs::read_to_string(tmp.path().join("conf/qc.toml")).unwrap();
    assert!(written.contains("default_mode = \"document\""));
    assert!(!tmp.path().join("quickcap.toml").exists());
}

#[test]
fn test_mode_invalid() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_qc(tmp.path(), &["mode", "sideways"]);
    assert!(!success);
    assert!(stderr.contains("unknown mode"), "stderr: {stderr}");
}
