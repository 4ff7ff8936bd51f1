//! End-to-end CLI tests
//!
//! Each test runs the moveitright binary in a scratch directory holding a
//! moveitright.toml that points at the demo seed and a local snapshot, so
//! records persist between invocations exactly as they would for a user.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::fs::{create_dir_all, write};
use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::Duration;
use tempfile::TempDir;

use moveitright::store::SnapshotLock;

mod fixtures;
use fixtures::{seed_path, ADMIN, CUSTODIAN, HOD, TRANSPORT};

/// Scratch working directory with its own configuration and snapshot
pub struct CliTestEnvironment {
    pub temp_dir: TempDir,
}

impl CliTestEnvironment {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let config = format!(
            r#"
[store]
backend = "memory"
snapshot_path = '{}'
seed_path = '{}'

[observability]
log_level = "warn"
json_logs = false
enable_metrics = false
"#,
            temp_dir.path().join("data/store.json").display(),
            seed_path().display(),
        );
        write(temp_dir.path().join("moveitright.toml"), config)?;
        Ok(Self { temp_dir })
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("moveitright").expect("binary is built");
        cmd.current_dir(self.temp_dir.path());
        cmd
    }

    pub fn snapshot(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("data/store.json")
    }

    /// Create a draft transfer and return its name
    pub fn create_draft(&self, asset: &str) -> String {
        let created = self.json(
            CUSTODIAN,
            &[
                "create",
                "--asset",
                asset,
                "--from",
                "Head Office",
                "--to",
                "Warehouse",
                "--expected-date",
                "2026-11-20",
            ],
        );
        created["data"]["name"].as_str().unwrap().to_string()
    }

    pub fn run_as(&self, user: &str, args: &[&str]) -> Command {
        let mut cmd = self.command();
        cmd.arg("--user").arg(user).args(args);
        cmd
    }

    /// Run a command expected to succeed and parse its envelope
    pub fn json(&self, user: &str, args: &[&str]) -> Value {
        let output = self.run_as(user, args).output().expect("binary runs");
        assert!(
            output.status.success(),
            "{args:?} failed: {}",
            String::from_utf8_lossy(&output.stdout)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is one JSON envelope")
    }
}

#[test]
fn test_whoami_reports_roles() {
    let env = CliTestEnvironment::new().unwrap();
    let response = env.json(ADMIN, &["whoami"]);

    assert_eq!(response["status"], "success");
    assert_eq!(response["data"]["full_name"], "Alex Admin");
    assert_eq!(response["data"]["is_administrator"], true);
}

#[test]
fn test_records_persist_between_invocations() {
    let env = CliTestEnvironment::new().unwrap();

    let created = env.json(
        CUSTODIAN,
        &[
            "create",
            "--asset",
            "AST-0001",
            "--from",
            "Head Office",
            "--to",
            "Warehouse",
            "--expected-date",
            "2026-11-20",
        ],
    );
    let name = created["data"]["name"].as_str().unwrap().to_string();
    assert!(env.temp_dir.path().join("data/store.json").exists());

    let submitted = env.json(CUSTODIAN, &["apply", &name, "Submit"]);
    assert_eq!(
        submitted["message"],
        "Action 'Submit' applied successfully. New state: Awaiting Transport Allocation"
    );

    let actions = env.json(TRANSPORT, &["actions", &name]);
    assert_eq!(actions["data"].as_array().unwrap().len(), 2);

    env.json(
        TRANSPORT,
        &["assign-transport", &name, "--vehicle-type", "Van", "--transporter", "SUP-0002"],
    );
    let listed = env.json(CUSTODIAN, &["movements"]);
    assert_eq!(
        listed["data"][0]["remarks"],
        "Transport Details: Van, Transporter: SUP-0002"
    );
}

#[test]
fn test_refused_action_exits_nonzero() {
    let env = CliTestEnvironment::new().unwrap();
    let created = env.json(
        CUSTODIAN,
        &[
            "create",
            "--asset",
            "AST-0002",
            "--from",
            "Head Office",
            "--to",
            "Branch Office",
            "--expected-date",
            "2026-12-01",
        ],
    );
    let name = created["data"]["name"].as_str().unwrap().to_string();

    env.run_as(HOD, &["apply", &name, "Approve"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "Invalid action 'Approve' for current state 'Draft'",
        ));
}

#[test]
fn test_unknown_user_gets_error_envelope() {
    let env = CliTestEnvironment::new().unwrap();
    env.run_as("nobody@example.com", &["whoami"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"status\": \"error\""))
        .stdout(predicate::str::contains("User nobody@example.com does not exist"));
}

#[test]
fn test_user_flag_is_required() {
    let env = CliTestEnvironment::new().unwrap();
    env.command()
        .arg("locations")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user is required for 'locations'"));
}

#[test]
fn test_show_config_reflects_file() {
    let env = CliTestEnvironment::new().unwrap();
    env.command()
        .arg("show-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("log_level = \"warn\""))
        .stdout(predicate::str::contains("list_page_length = 50"))
        .stdout(predicate::str::contains("[[workflow.transitions]]"));
}

#[test]
fn test_extra_config_file_is_layered() {
    let env = CliTestEnvironment::new().unwrap();
    let extra = env.temp_dir.path().join("narrow.toml");
    write(&extra, "[api]\nsearch_limit = 1\n").unwrap();

    let output = env
        .command()
        .arg("--config")
        .arg(&extra)
        .args(["--user", HOD, "search", "laptop"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let response: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["data"].as_array().unwrap().len(), 1);
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("moveitright")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("dashboard"));
}

#[test]
fn test_failed_save_reports_error_not_success() {
    let env = CliTestEnvironment::new().unwrap();
    // Occupy the temp snapshot path so the save fails
    create_dir_all(env.temp_dir.path().join("data/store.json.tmp")).unwrap();

    env.run_as(
        CUSTODIAN,
        &[
            "create",
            "--asset",
            "AST-0001",
            "--from",
            "Head Office",
            "--to",
            "Warehouse",
            "--expected-date",
            "2026-11-20",
        ],
    )
    .assert()
    .failure()
    .stdout(predicate::str::contains("\"status\": \"error\""))
    .stdout(predicate::str::contains("Changes were not saved"))
    .stdout(predicate::str::contains("created successfully").not());

    assert!(!env.snapshot().exists());
}

#[test]
fn test_waiting_invocations_revalidate_after_lock_release() {
    let env = CliTestEnvironment::new().unwrap();
    let name = env.create_draft("AST-0003");

    let held = SnapshotLock::try_acquire(env.snapshot()).unwrap();
    let mut children: Vec<_> = (0..2)
        .map(|_| {
            env.run_as(CUSTODIAN, &["apply", &name, "Submit"])
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .unwrap()
        })
        .collect();

    sleep(Duration::from_millis(300));
    for child in &mut children {
        assert!(child.try_wait().unwrap().is_none(), "command ran while the snapshot was locked");
    }
    drop(held);

    let outputs: Vec<_> = children
        .into_iter()
        .map(|child| child.wait_with_output().unwrap())
        .collect();
    let (won, lost): (Vec<_>, Vec<_>) = outputs.iter().partition(|o| o.status.success());
    assert_eq!(won.len(), 1);
    assert_eq!(lost.len(), 1);

    let refused: Value = serde_json::from_slice(&lost[0].stdout).unwrap();
    assert_eq!(refused["status"], "error");
    assert_eq!(
        refused["message"],
        "Invalid action 'Submit' for current state 'Awaiting Transport Allocation'"
    );
}
