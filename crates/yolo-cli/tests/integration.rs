#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// A project directory plus isolated per-user config and home directories.
struct Sandbox {
    project: TempDir,
    user: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            project: TempDir::new().unwrap(),
            user: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.project.path()
    }

    fn config_dir(&self) -> std::path::PathBuf {
        self.user.path().join("config")
    }

    fn home_dir(&self) -> std::path::PathBuf {
        self.user.path().join("home")
    }

    fn yolo(&self) -> Command {
        let mut cmd = Command::cargo_bin("yolo").unwrap();
        cmd.current_dir(self.root())
            .env("YOLO_ROOT", self.root())
            .env("YOLO_CONFIG_DIR", self.config_dir())
            .env("YOLO_HOME", self.home_dir())
            .env_remove("RUST_LOG")
            .env_remove("EDITOR");
        for var in [
            "OPENAI_API_KEY",
            "ANTHROPIC_API_KEY",
            "MISTRAL_API_KEY",
            "COMPATIBLE_API_KEY",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root().join(rel)).unwrap()
    }
}

fn git(dir: &Path, args: &[&str]) -> bool {
    std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// yolo init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_layout_and_history() {
    let sb = Sandbox::new();
    sb.yolo()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: HISTORY.yml"));

    for dir in ["yolo/epics", "yolo/features", "yolo/tasks", "yolo/relationships", "yolo/settings"] {
        assert!(sb.root().join(dir).is_dir(), "{dir} missing");
    }
    for file in ["README.md", "WISHES.md", "STRATEGY.md", "LLM_INSTRUCTIONS.md", "yolo/README.md"] {
        assert!(sb.root().join(file).is_file(), "{file} missing");
    }
    assert!(sb.read("HISTORY.yml").contains("0.1.0"));
    assert!(sb.read("CHANGELOG.md").starts_with("# Changelog"));
    assert!(sb.read("yolo/settings/config.yml").contains("ai_provider: openai"));
}

#[test]
fn init_keeps_existing_files() {
    let sb = Sandbox::new();
    std::fs::write(sb.root().join("README.md"), "# Mine\n").unwrap();
    sb.yolo().arg("init").assert().success();
    sb.yolo()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  README.md"))
        .stdout(predicate::str::contains("created:").not());
    assert_eq!(sb.read("README.md"), "# Mine\n");
}

#[test]
fn init_describe_needs_credentials() {
    let sb = Sandbox::new();
    sb.yolo()
        .args(["init", "--describe", "an online shop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
    // The scaffold is written before planning starts.
    assert!(sb.root().join("yolo/epics").is_dir());
}

// ---------------------------------------------------------------------------
// yolo version / dev
// ---------------------------------------------------------------------------

#[test]
fn version_json() {
    let sb = Sandbox::new();
    let output = sb.yolo().args(["version", "--json"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn dev_toggles_persisted_flag() {
    let sb = Sandbox::new();
    sb.yolo()
        .arg("dev")
        .assert()
        .success()
        .stdout(predicate::str::contains("enabled"));
    let state = std::fs::read_to_string(sb.home_dir().join("config.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&state).unwrap();
    assert_eq!(json["dev_mode"], true);

    sb.yolo()
        .arg("dev")
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled"));
}

// ---------------------------------------------------------------------------
// yolo sprint
// ---------------------------------------------------------------------------

#[test]
fn sprint_journal_init_then_update() {
    let sb = Sandbox::new();
    sb.yolo()
        .args(["sprint", "current", "init", "Kick-off", "notes"])
        .assert()
        .success();
    sb.yolo()
        .args(["sprint", "current", "update"])
        .write_stdin("Checkout is done\n")
        .assert()
        .success();

    let journal = sb.read("sprint.current.md");
    assert!(journal.starts_with("## Sprint Update - "));
    assert!(journal.contains("Kick-off notes"));
    assert!(journal.contains(&"-".repeat(80)));
    assert!(journal.contains("Checkout is done"));
    assert_eq!(journal.matches("## Sprint Update - ").count(), 2);

    sb.yolo()
        .args(["sprint", "current", "init", "again"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn sprint_update_without_journal_fails() {
    let sb = Sandbox::new();
    sb.yolo()
        .args(["sprint", "current", "update", "late"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("use 'init'"));
}

// ---------------------------------------------------------------------------
// yolo prompt / rp / explain
// ---------------------------------------------------------------------------

#[test]
fn prompt_list_and_print() {
    let sb = Sandbox::new();
    sb.yolo()
        .args(["prompt", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("methodology"))
        .stdout(predicate::str::contains("changelog"));
    sb.yolo()
        .args(["rp", "methodology"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# The YOLO Methodology"));
    sb.yolo()
        .args(["prompt", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown prompt 'bogus'"));
}

#[test]
fn prompt_overrides_and_reset() {
    let sb = Sandbox::new();
    let file = sb.config_dir().join("methodology_prompts.yml");
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, "task_documentation: Keep tasks tiny.\n").unwrap();

    sb.yolo()
        .args(["prompt", "task"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Keep tasks tiny."));

    sb.yolo().args(["prompt", "reset"]).assert().success();
    sb.yolo()
        .args(["prompt", "task"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Keep tasks tiny.").not());
}

#[test]
fn client_state_prompt_wins() {
    let sb = Sandbox::new();
    std::fs::create_dir_all(sb.home_dir()).unwrap();
    std::fs::write(
        sb.home_dir().join("config.json"),
        r#"{"prompts": {"epic": "Epics from the client state."}}"#,
    )
    .unwrap();
    sb.yolo()
        .args(["rp", "epic"])
        .assert()
        .success()
        .stdout("Epics from the client state.\n");
}

#[test]
fn explain_without_text_prints_methodology() {
    let sb = Sandbox::new();
    sb.yolo()
        .arg("explain")
        .assert()
        .success()
        .stdout(predicate::str::contains("# The YOLO Methodology"));
}

// ---------------------------------------------------------------------------
// yolo ai
// ---------------------------------------------------------------------------

#[test]
fn ai_status_reports_key_source() {
    let sb = Sandbox::new();
    sb.yolo()
        .args(["ai", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Provider:  openai"))
        .stdout(predicate::str::contains("API key:   none"));

    sb.yolo()
        .args(["ai", "config", "--provider", "anthropic", "--api-key", "sk-test"])
        .assert()
        .success();

    let output = sb.yolo().args(["ai", "status", "--json"]).output().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["provider"], "anthropic");
    assert_eq!(json["model"], "claude-3-5-sonnet-latest");
    assert_eq!(json["key_source"], "config");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("sk-test"));

    sb.yolo()
        .args(["ai", "status"])
        .env("ANTHROPIC_API_KEY", "from-env")
        .assert()
        .success()
        .stdout(predicate::str::contains("API key:   environment"));
}

#[test]
fn ai_config_rejects_unknown_provider() {
    let sb = Sandbox::new();
    sb.yolo()
        .args(["ai", "config", "--provider", "gemini", "--api-key", "k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider 'gemini'"));
}

// ---------------------------------------------------------------------------
// Commands that need a model or a project
// ---------------------------------------------------------------------------

#[test]
fn ask_without_key_fails() {
    let sb = Sandbox::new();
    sb.yolo()
        .args(["ask", "what", "is", "left?"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error: no API key configured"));
}

#[test]
fn items_require_an_initialized_project() {
    let sb = Sandbox::new();
    sb.yolo()
        .args(["epic", "Checkout flow"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("run 'yolo init'"));
}

/// A git repository with one commit, or None when git is unavailable.
fn repo_with_one_commit() -> Option<Sandbox> {
    let sb = Sandbox::new();
    let root = sb.root();
    let ready = git(root, &["init", "-q"])
        && git(root, &["config", "user.name", "Test"])
        && git(root, &["config", "user.email", "test@example.com"])
        && git(root, &["config", "commit.gpgsign", "false"]);
    if !ready {
        return None;
    }
    std::fs::write(root.join("main.rs"), "fn main() {}\n").unwrap();
    assert!(git(root, &["add", "-A"]));
    assert!(git(root, &["commit", "-q", "-m", "chore: start"]));
    Some(sb)
}

#[test]
fn commit_on_clean_tree_needs_no_key() {
    let Some(sb) = repo_with_one_commit() else {
        return;
    };
    sb.yolo()
        .arg("commit")
        .assert()
        .success()
        .stdout("Nothing to commit.\n")
        .stderr(predicate::str::contains("API key").not());
}

#[test]
fn commit_with_message_works_offline() {
    let Some(sb) = repo_with_one_commit() else {
        return;
    };

    sb.yolo().arg("init").assert().success();
    sb.yolo()
        .args(["commit", "-m", "feat: add yolo layout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Committed: feat: add yolo layout"))
        .stdout(predicate::str::contains("skipped sync"));

    let history = sb.read("HISTORY.yml");
    assert!(history.contains("add yolo layout"), "{history}");

    sb.yolo()
        .args(["commit", "-m", "feat: nothing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to commit."));
}
