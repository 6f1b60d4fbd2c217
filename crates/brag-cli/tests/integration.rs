#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn brag(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("brag").unwrap();
    cmd.current_dir(dir.path())
        .env("BRAG_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn init_project(dir: &TempDir) {
    brag(dir).arg("init").assert().success();
}

fn add_tasks(dir: &TempDir) {
    brag(dir)
        .args([
            "task",
            "add",
            "Migrate",
            "billing",
            "database",
            "--step",
            "Plan cutover (30m)",
            "--step",
            "Run migration (45m)",
            "--outcome",
            "shipped_to_production",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded T1"));
    brag(dir)
        .args(["task", "add", "Write onboarding guide", "--minutes", "90"])
        .assert()
        .success();
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

// ---------------------------------------------------------------------------
// brag init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_ledger() {
    let dir = TempDir::new().unwrap();
    brag(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .brag/config.yaml"));

    assert!(dir.path().join(".brag/config.yaml").exists());
    let ledger = std::fs::read_to_string(dir.path().join(".brag/brag-list.md")).unwrap();
    assert!(ledger.starts_with("# Brag List"));

    let config: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(dir.path().join(".brag/config.yaml")).unwrap())
            .unwrap();
    assert_eq!(config["profile"]["seniority"].as_str(), Some("ic"));
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    brag(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .brag/config.yaml"));
}

#[test]
fn commands_before_init_fail_with_hint() {
    let dir = TempDir::new().unwrap();
    brag(&dir)
        .args(["generate", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("brag init"));
}

// ---------------------------------------------------------------------------
// tasks
// ---------------------------------------------------------------------------

#[test]
fn task_add_list_show() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    add_tasks(&dir);

    brag(&dir)
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Migrate billing database"))
        .stdout(predicate::str::contains("1h 15m"))
        .stdout(predicate::str::contains("shipped_to_production"));

    let task = json_stdout(brag(&dir).args(["task", "show", "T2", "--json"]));
    assert_eq!(task["title"], "Write onboarding guide");
    assert_eq!(task["minutes"], 90);

    brag(&dir)
        .args(["task", "show", "T9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("task not found: T9"));
}

// ---------------------------------------------------------------------------
// generate / show / entry
// ---------------------------------------------------------------------------

#[test]
fn generate_offline_uses_template_synthesis() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    add_tasks(&dir);

    brag(&dir)
        .args(["generate", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("used template synthesis"))
        .stdout(predicate::str::contains("[0] Migrate billing database"))
        .stdout(predicate::str::contains("[1] Write onboarding guide"));

    assert!(dir.path().join(".brag/generated.yaml").exists());

    let batch = json_stdout(brag(&dir).args(["show", "--json"]));
    assert_eq!(batch["source"], "fallback");
    assert_eq!(batch["entries"].as_array().unwrap().len(), 2);
    assert_eq!(batch["task_refs"], serde_json::json!(["T1", "T2"]));
}

#[test]
fn generate_with_no_tasks_is_empty_batch() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    brag(&dir)
        .args(["generate", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No completed tasks"));
}

#[test]
fn generate_rejects_unknown_seniority() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    brag(&dir)
        .args(["generate", "--offline", "--seniority", "principal"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid mode 'principal'"));
}

#[test]
fn generate_single_prints_without_persisting() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    add_tasks(&dir);

    let out = json_stdout(brag(&dir).args([
        "generate",
        "--offline",
        "--single",
        "T1",
        "--seniority",
        "senior",
        "--json",
    ]));
    assert_eq!(out["source"], "fallback");
    assert!(out["entry"]["bullet"].as_str().unwrap().starts_with("Delivered"));
    assert!(!dir.path().join(".brag/generated.yaml").exists());
}

#[test]
fn entry_edit_and_delete() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    add_tasks(&dir);
    brag(&dir).args(["generate", "--offline"]).assert().success();

    brag(&dir)
        .args(["entry", "edit", "0", "--title", "Billing migration", "--tags", "delivery,ownership"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated [0] Billing migration"));

    let batch = json_stdout(brag(&dir).args(["show", "--json"]));
    assert_eq!(batch["entries"][0]["title"], "Billing migration");
    assert_eq!(batch["entries"][0]["tags"], serde_json::json!(["DELIVERY", "OWNERSHIP"]));

    brag(&dir)
        .args(["entry", "edit", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to change"));

    brag(&dir).args(["entry", "delete", "1"]).assert().success();
    brag(&dir)
        .args(["entry", "delete", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ---------------------------------------------------------------------------
// accept / ledger
// ---------------------------------------------------------------------------

#[test]
fn accept_then_prune_ledger() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    add_tasks(&dir);
    brag(&dir).args(["generate", "--offline"]).assert().success();

    let first = json_stdout(brag(&dir).args(["accept", "0", "--json"]));
    assert_eq!(first["batch_marked"], true);
    let first_id = first["ledger_id"].as_str().unwrap().to_string();

    brag(&dir)
        .args(["accept", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already accepted"));
    brag(&dir).args(["accept", "1"]).assert().success();

    brag(&dir)
        .args(["ledger", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Migrate billing database"))
        .stdout(predicate::str::contains("## Write onboarding guide"));

    let list = json_stdout(brag(&dir).args(["ledger", "list", "--json"]));
    assert_eq!(list.as_array().unwrap().len(), 2);
    assert_eq!(list[0]["id"], first_id.as_str());

    brag(&dir)
        .args(["ledger", "delete", "--id", &first_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed #0 Migrate billing database"));
    brag(&dir)
        .args(["ledger", "delete", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Write onboarding guide"));
    brag(&dir)
        .args(["ledger", "delete", "0"])
        .assert()
        .failure();

    let task = json_stdout(brag(&dir).args(["task", "show", "T1", "--json"]));
    assert!(task["accepted_statement"].is_string());
}

#[test]
fn ledger_delete_needs_a_target() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    brag(&dir).args(["ledger", "delete"]).assert().failure();
}

// ---------------------------------------------------------------------------
// review
// ---------------------------------------------------------------------------

#[test]
fn review_loop_reads_commands_from_stdin() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    add_tasks(&dir);

    brag(&dir)
        .args(["review", "--offline"])
        .write_stdin("delete 1\naccept 0\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted [1] Write onboarding guide"))
        .stdout(predicate::str::contains("Accepted [0] Migrate billing database"));

    let list = json_stdout(brag(&dir).args(["ledger", "list", "--json"]));
    assert_eq!(list.as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_default_is_clean() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    brag(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let path = dir.path().join(".brag/config.yaml");
    let text = std::fs::read_to_string(&path).unwrap();
    let mut config: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
    config["generation"]["model"] = serde_yaml::Value::String(String::new());
    std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();

    brag(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] generation.model is empty"))
        .stderr(predicate::str::contains("config validation found errors"));
}
