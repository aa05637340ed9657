//! Integration tests for the `ff` CLI.
//!
//! Each test points `ff` at a temp data directory with `-C`, runs it as a
//! subprocess, and verifies stdout and/or the JSON files it writes.

use std::fs;
use std::path::{Path, PathBuf};
use std::io::Write;
use std::process::{Command, Stdio};

/// Get the path to the built `ff` binary.
fn ff_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ff"))
}

/// Run `ff -C <dir>` with the given args, returning (stdout, stderr, success).
fn run_ff(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(ff_bin())
        .arg("-C")
        .arg(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run ff");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `ff` expecting success, return stdout.
fn run_ff_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_ff(dir, args);
    if !success {
        panic!(
            "ff {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// Run `ff --json` expecting success, return parsed stdout.
fn run_ff_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = args.to_vec();
    full.push("--json");
    let out = run_ff_ok(dir, &full);
    serde_json::from_str(&out).unwrap_or_else(|e| panic!("bad JSON from {:?}: {}\n{}", args, e, out))
}

/// Create a record with `--json` and return its full ID.
fn create(dir: &Path, args: &[&str]) -> String {
    run_ff_json(dir, args)["id"].as_str().unwrap().to_string()
}

fn read_json(dir: &Path, file: &str) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(dir.join(file)).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Init and config
// ---------------------------------------------------------------------------

#[test]
fn test_init_creates_data_files() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_ff_ok(tmp.path(), &["init"]);
    assert!(out.contains("Initialized"));
    for file in ["config.toml", "tasks.json", "habits.json", "focus.json", "brain-dump.json"] {
        assert!(tmp.path().join(file).exists(), "missing {}", file);
    }

    let again = run_ff_ok(tmp.path(), &["init"]);
    assert!(again.contains("already set up"));
}

#[test]
fn test_default_categories() {
    let tmp = tempfile::TempDir::new().unwrap();
    let cats = run_ff_json(tmp.path(), &["category"]);
    assert_eq!(
        cats,
        serde_json::json!(["Work", "Personal", "Health", "Learning", "Errands"])
    );
}

#[test]
fn test_config_set_and_show() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ff_ok(tmp.path(), &["init"]);
    run_ff_ok(tmp.path(), &["config", "set", "timer.pomodoro_minutes", "50"]);

    let config = run_ff_json(tmp.path(), &["config", "show"]);
    assert_eq!(config["timer"]["pomodoro_minutes"], 50);

    let raw = fs::read_to_string(tmp.path().join("config.toml")).unwrap();
    assert!(raw.contains("pomodoro_minutes = 50"));
    // comments from the template survive the edit
    assert!(raw.contains('#'));
}

#[test]
fn test_config_set_rejects_bad_input() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ff_ok(tmp.path(), &["init"]);

    let (_, stderr, ok) = run_ff(tmp.path(), &["config", "set", "timer.nope", "1"]);
    assert!(!ok);
    assert!(stderr.contains("unknown config key"));

    let (_, _, ok) = run_ff(tmp.path(), &["config", "set", "timer.pomodoro_minutes", "soon"]);
    assert!(!ok);
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[test]
fn test_task_add_and_list() {
    let tmp = tempfile::TempDir::new().unwrap();
    let id = create(
        tmp.path(),
        &["task", "add", "Write report", "--priority", "high", "--tag", "urgent"],
    );
    run_ff_ok(tmp.path(), &["task", "add", "Water plants", "--category", "Personal"]);

    let tasks = run_ff_json(tmp.path(), &["task", "list"]);
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["id"], id.as_str());
    assert_eq!(tasks[0]["priority"], "high");
    assert_eq!(tasks[0]["category"], "Uncategorized");
    assert_eq!(tasks[0]["tags"], serde_json::json!(["urgent"]));

    let filtered = run_ff_json(tmp.path(), &["task", "list", "--category", "Personal"]);
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["title"], "Water plants");

    let text = run_ff_ok(tmp.path(), &["task", "list"]);
    assert!(text.contains("Write report #urgent"));
}

#[test]
fn test_task_done_by_prefix() {
    let tmp = tempfile::TempDir::new().unwrap();
    let id = create(tmp.path(), &["task", "add", "Call dentist"]);

    let out = run_ff_ok(tmp.path(), &["task", "done", &id[..8]]);
    assert!(out.contains("is done"));
    assert!(run_ff_json(tmp.path(), &["task", "list"]).as_array().unwrap().is_empty());

    let all = run_ff_json(tmp.path(), &["task", "list", "--all"]);
    assert_eq!(all[0]["completed"], true);
    assert_eq!(all[0]["completion_streak"], 1);

    // toggling again reopens it
    run_ff_ok(tmp.path(), &["task", "done", &id]);
    let task = run_ff_json(tmp.path(), &["task", "show", &id]);
    assert_eq!(task["completed"], false);
}

#[test]
fn test_task_show_not_found() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, ok) = run_ff(tmp.path(), &["task", "show", "deadbeef"]);
    assert!(!ok);
    assert!(stderr.contains("task not found"));
}

#[test]
fn test_task_edit_clears_with_none() {
    let tmp = tempfile::TempDir::new().unwrap();
    let id = create(
        tmp.path(),
        &["task", "add", "Plan trip", "--notes", "ask Sam", "--estimate", "30"],
    );
    let task = run_ff_json(
        tmp.path(),
        &["task", "edit", &id, "--notes", "none", "--actual", "45", "--title", "Plan the trip"],
    );
    assert_eq!(task["title"], "Plan the trip");
    assert!(task.get("notes").is_none_or(|n| n.is_null()));
    assert_eq!(task["estimated_minutes"], 30);
    assert_eq!(task["actual_minutes"], 45);

    let (_, stderr, ok) = run_ff(tmp.path(), &["task", "edit", &id]);
    assert!(!ok);
    assert!(stderr.contains("nothing to change"));
}

#[test]
fn test_subtasks() {
    let tmp = tempfile::TempDir::new().unwrap();
    let id = create(tmp.path(), &["task", "add", "Move house"]);
    let sub = create(tmp.path(), &["task", "sub", "add", &id, "Book van"]);
    run_ff_ok(tmp.path(), &["task", "sub", "add", &id, "Pack books"]);

    let out = run_ff_ok(tmp.path(), &["task", "sub", "done", &id, &sub[..8]]);
    assert!(out.contains("subtasks: 1/2"));

    run_ff_ok(tmp.path(), &["task", "sub", "rm", &id, &sub]);
    let task = run_ff_json(tmp.path(), &["task", "show", &id]);
    assert_eq!(task["subtasks"].as_array().unwrap().len(), 1);
    assert_eq!(task["subtasks"][0]["title"], "Pack books");
}

#[test]
fn test_delete_category_moves_tasks() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ff_ok(tmp.path(), &["category", "add", "Garden"]);
    let id = create(tmp.path(), &["task", "add", "Weed beds", "--category", "Garden"]);

    let out = run_ff_ok(tmp.path(), &["category", "rm", "Garden"]);
    assert!(out.contains("1 tasks moved"));
    let task = run_ff_json(tmp.path(), &["task", "show", &id]);
    assert_eq!(task["category"], "Uncategorized");
}

#[test]
fn test_delete_tag_strips_tasks() {
    let tmp = tempfile::TempDir::new().unwrap();
    let id = create(tmp.path(), &["task", "add", "Pay rent", "--tag", "admin"]);
    run_ff_ok(tmp.path(), &["tag", "rm", "admin"]);

    let task = run_ff_json(tmp.path(), &["task", "show", &id]);
    assert_eq!(task["tags"], serde_json::json!([]));
    let tags = run_ff_json(tmp.path(), &["tag"]);
    assert!(!tags.as_array().unwrap().contains(&serde_json::json!("admin")));
}

// ---------------------------------------------------------------------------
// Habits
// ---------------------------------------------------------------------------

#[test]
fn test_habit_add_creates_linked_task() {
    let tmp = tempfile::TempDir::new().unwrap();
    let id = create(
        tmp.path(),
        &["habit", "add", "Morning walk", "--start", "07:00", "--end", "07:30"],
    );

    let tasks = read_json(tmp.path(), "tasks.json");
    let linked: Vec<&serde_json::Value> = tasks["tasks"]
        .as_object()
        .unwrap()
        .values()
        .filter(|t| t["habit_id"] == id.as_str())
        .collect();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0]["title"], "Morning walk");
    assert_eq!(linked[0]["estimated_minutes"], 30);
    assert!(linked[0]["tags"].as_array().unwrap().contains(&serde_json::json!("habit")));

    // running again does not duplicate tomorrow's task
    run_ff_ok(tmp.path(), &["habit", "regen"]);
    let tasks = read_json(tmp.path(), "tasks.json");
    assert_eq!(tasks["tasks"].as_object().unwrap().len(), 1);
}

#[test]
fn test_habit_duplicate_title_rejected() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ff_ok(tmp.path(), &["habit", "add", "Stretch"]);
    let (_, stderr, ok) = run_ff(tmp.path(), &["habit", "add", "Stretch"]);
    assert!(!ok);
    assert!(stderr.contains("error: a habit titled \"Stretch\" already exists"));
}

#[test]
fn test_habit_done_and_undo() {
    let tmp = tempfile::TempDir::new().unwrap();
    let id = create(tmp.path(), &["habit", "add", "Read 10 pages"]);

    let habit = run_ff_json(tmp.path(), &["habit", "done", &id]);
    assert_eq!(habit["streak"], 1);

    let list = run_ff_json(tmp.path(), &["habit", "list"]);
    assert_eq!(list[0]["done_today"], true);
    assert_eq!(list[0]["current_run"], 1);

    let out = run_ff_ok(tmp.path(), &["habit", "done", &id]);
    assert!(out.contains("already done"));

    let habit = run_ff_json(tmp.path(), &["habit", "undo", &id]);
    assert_eq!(habit["streak"], 0);
    assert_eq!(habit["completed_dates"], serde_json::json!([]));
}

#[test]
fn test_habit_rm_removes_linked_tasks() {
    let tmp = tempfile::TempDir::new().unwrap();
    let id = create(tmp.path(), &["habit", "add", "Meditate"]);
    create(tmp.path(), &["habit", "convert", &id]);
    run_ff_ok(tmp.path(), &["task", "add", "Unrelated"]);

    let out = run_ff_ok(tmp.path(), &["habit", "rm", &id]);
    assert!(out.contains("2 linked tasks"));

    let tasks = run_ff_json(tmp.path(), &["task", "list", "--all"]);
    assert_eq!(tasks.as_array().unwrap().len(), 1);
    assert_eq!(tasks[0]["title"], "Unrelated");
}

#[test]
fn test_habit_edit_renames_linked_tasks() {
    let tmp = tempfile::TempDir::new().unwrap();
    let id = create(tmp.path(), &["habit", "add", "Journal"]);
    run_ff_ok(tmp.path(), &["habit", "edit", &id, "--title", "Evening journal"]);

    let tasks = run_ff_json(tmp.path(), &["task", "list", "--tag", "habit"]);
    assert_eq!(tasks[0]["title"], "Evening journal");
}

// ---------------------------------------------------------------------------
// Focus
// ---------------------------------------------------------------------------

#[test]
fn test_focus_session_lifecycle() {
    let tmp = tempfile::TempDir::new().unwrap();
    let task = create(tmp.path(), &["task", "add", "Deep work"]);
    run_ff_ok(tmp.path(), &["focus", "start", "--task", &task]);

    let (_, stderr, ok) = run_ff(tmp.path(), &["focus", "start"]);
    assert!(!ok);
    assert!(stderr.contains("already"));

    let out = run_ff_ok(tmp.path(), &["focus", "distract", "checked", "email"]);
    assert!(out.contains("1 this session"));

    let status = run_ff_json(tmp.path(), &["focus", "status"]);
    assert_eq!(status["running"], true);
    assert_eq!(status["session"]["task_id"], task.as_str());

    let ended = run_ff_json(tmp.path(), &["focus", "end", "--rating", "4", "--notes", "ok"]);
    assert_eq!(ended["session"]["rating"], 4);
    assert_eq!(ended["session"]["distractions"][0]["description"], "checked email");
    assert_eq!(ended["achievements"], serde_json::json!([]));

    let status = run_ff_json(tmp.path(), &["focus", "status"]);
    assert_eq!(status["running"], false);

    let stats = run_ff_json(tmp.path(), &["focus", "stats"]);
    assert_eq!(stats["sessions"], 1);
    assert_eq!(stats["average_distractions"], 1.0);

    let today = run_ff_json(tmp.path(), &["focus", "today"]);
    assert_eq!(today.as_array().unwrap().len(), 1);
}

/// Start `ff timer`, type the given lines, and wait for it to exit.
fn run_timer(dir: &Path, args: &[&str], input: &str) -> (String, String, bool) {
    let mut child = Command::new(ff_bin())
        .arg("-C")
        .arg(dir)
        .arg("timer")
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run ff timer");
    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(input.as_bytes()).unwrap();
    drop(stdin);
    let output = child.wait_with_output().unwrap();
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn test_timer_skip_ends_session() {
    let tmp = tempfile::TempDir::new().unwrap();
    let task = create(tmp.path(), &["task", "add", "Write report"]);

    let (stdout, stderr, ok) = run_timer(tmp.path(), &["--task", &task], "p phone call\ns\n");
    assert!(ok, "timer failed:\nstdout: {}\nstderr: {}", stdout, stderr);
    assert!(stderr.contains("focus session started"));
    assert!(stdout.contains("Focus Time skipped"));

    let status = run_ff_json(tmp.path(), &["focus", "status"]);
    assert_eq!(status["running"], false);

    let today = run_ff_json(tmp.path(), &["focus", "today"]);
    let sessions = today.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["task_id"], task.as_str());
    assert_eq!(sessions[0]["pause_reason"], "phone call");
    assert_eq!(sessions[0]["distractions"][0]["description"], "phone call");
}

#[test]
fn test_timer_reset_break_leaves_no_session() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (stdout, _, ok) = run_timer(tmp.path(), &["--mode", "short"], "r\n");
    assert!(ok);
    assert!(stdout.contains("reset"));
    assert_eq!(run_ff_json(tmp.path(), &["focus", "status"])["running"], false);
    assert_eq!(run_ff_json(tmp.path(), &["focus", "today"]), serde_json::json!([]));
}

#[test]
fn test_focus_end_without_session() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, ok) = run_ff(tmp.path(), &["focus", "end"]);
    assert!(!ok);
    assert!(stderr.contains("no focus session running"));

    let (_, _, ok) = run_ff(tmp.path(), &["focus", "distract", "noise"]);
    assert!(!ok);
}

#[test]
fn test_focus_rating_out_of_range() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ff_ok(tmp.path(), &["focus", "start"]);
    let (_, stderr, ok) = run_ff(tmp.path(), &["focus", "end", "--rating", "9"]);
    assert!(!ok);
    assert!(stderr.contains("rating must be 1-5"));
    // the session is still open
    assert_eq!(run_ff_json(tmp.path(), &["focus", "status"])["running"], true);
}

// ---------------------------------------------------------------------------
// Brain dump
// ---------------------------------------------------------------------------

#[test]
fn test_brain_dump_convert() {
    let tmp = tempfile::TempDir::new().unwrap();
    let item = create(tmp.path(), &["dump", "add", "renew", "passport"]);
    run_ff_ok(tmp.path(), &["dump", "add", "idea: bike rack"]);

    let task = create(tmp.path(), &["dump", "convert", &item[..8], "--priority", "high"]);
    let shown = run_ff_json(tmp.path(), &["task", "show", &task]);
    assert_eq!(shown["title"], "renew passport");
    assert_eq!(shown["priority"], "high");

    let pending = run_ff_json(tmp.path(), &["dump", "list"]);
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["content"], "idea: bike rack");

    let done = run_ff_json(tmp.path(), &["dump", "list", "--processed"]);
    assert_eq!(done[0]["converted_to_task_id"], task.as_str());
}

#[test]
fn test_brain_dump_rejects_empty() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, _, ok) = run_ff(tmp.path(), &["dump", "add", "   "]);
    assert!(!ok);
}

// ---------------------------------------------------------------------------
// Search, check, export
// ---------------------------------------------------------------------------

#[test]
fn test_search_across_stores() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ff_ok(tmp.path(), &["task", "add", "Buy groceries"]);
    run_ff_ok(tmp.path(), &["habit", "add", "Cook dinner", "--description", "use groceries"]);
    run_ff_ok(tmp.path(), &["dump", "add", "groceries list on fridge"]);

    let hits = run_ff_json(tmp.path(), &["search", "grocer"]);
    let kinds: Vec<&str> = hits
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"task"));
    assert!(kinds.contains(&"habit"));
    assert!(kinds.contains(&"brain_dump"));

    let (_, stderr, ok) = run_ff(tmp.path(), &["search", "("]);
    assert!(!ok);
    assert!(stderr.contains("invalid regex"));
}

#[test]
fn test_check_clean_data() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ff_ok(tmp.path(), &["habit", "add", "Floss"]);
    let out = run_ff_ok(tmp.path(), &["check"]);
    assert!(out.contains("valid"));

    let result = run_ff_json(tmp.path(), &["check"]);
    assert_eq!(result["valid"], true);
}

#[test]
fn test_check_reports_duplicate_habits() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ff_ok(tmp.path(), &["habit", "add", "Floss"]);
    run_ff_ok(tmp.path(), &["habit", "add", "Brush"]);

    // rename by hand to collide
    let path = tmp.path().join("habits.json");
    let raw = fs::read_to_string(&path).unwrap().replace("\"Brush\"", "\"Floss\"");
    fs::write(&path, raw).unwrap();

    let result = run_ff_json(tmp.path(), &["check"]);
    assert_eq!(result["valid"], false);
    assert_eq!(result["errors"][0]["type"], "duplicate_habit_title");
}

#[test]
fn test_export_calendar() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ff_ok(
        tmp.path(),
        &["habit", "add", "Yoga", "--start", "06:30", "--end", "07:15", "--calendar"],
    );
    run_ff_ok(tmp.path(), &["habit", "add", "Not synced", "--start", "08:00"]);

    let out_file = tmp.path().join("habits.ics");
    let out = run_ff_ok(
        tmp.path(),
        &["export", "--out", out_file.to_str().unwrap(), "--date", "2025-03-01"],
    );
    assert!(out.contains("exported 1 events"));

    let ics = fs::read_to_string(&out_file).unwrap();
    assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics.contains("SUMMARY:Yoga\r\n"));
    assert!(ics.contains("DTSTART:20250301T063000\r\n"));
    assert!(ics.contains("DTEND:20250301T071500\r\n"));
    let stamp = ics.lines().find(|l| l.starts_with("DTSTAMP:")).unwrap();
    assert!(stamp.trim_end().ends_with('Z'));
    assert!(!ics.contains("Not synced"));
}
