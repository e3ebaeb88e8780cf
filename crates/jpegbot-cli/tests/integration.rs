#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CREDENTIAL_VARS: [&str; 4] = [
    "JPEGBOT_REDDIT_CLIENT_ID",
    "JPEGBOT_REDDIT_CLIENT_SECRET",
    "JPEGBOT_REDDIT_REFRESH_TOKEN",
    "JPEGBOT_IMGUR_CLIENT_ID",
];

fn jpegbot(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("jpegbot").unwrap();
    cmd.current_dir(dir.path())
        .env("JPEGBOT_CONFIG", dir.path().join("jpegbot.yaml"))
        .env_remove("RUST_LOG");
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn write_config(dir: &TempDir, yaml: &str) {
    std::fs::write(dir.path().join("jpegbot.yaml"), yaml).unwrap();
}

// ---------------------------------------------------------------------------
// argument parsing
// ---------------------------------------------------------------------------

#[test]
fn non_numeric_quality_is_rejected() {
    let dir = TempDir::new().unwrap();
    jpegbot(&dir)
        .args(["--quality", "abc", "validate"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn out_of_range_quality_is_rejected() {
    let dir = TempDir::new().unwrap();
    jpegbot(&dir)
        .args(["-q", "101", "run", "--once"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("101"));
}

// ---------------------------------------------------------------------------
// jpegbot init
// ---------------------------------------------------------------------------

#[test]
fn init_writes_default_config() {
    let dir = TempDir::new().unwrap();
    jpegbot(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));

    let text = std::fs::read_to_string(dir.path().join("jpegbot.yaml")).unwrap();
    let yaml: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
    assert_eq!(yaml["quality"].as_u64(), Some(5));
    assert_eq!(yaml["poll_interval_secs"].as_u64(), Some(30));
    assert!(text.contains("NEEDS MORE JPEG COMPRESSION"));
}

#[test]
fn init_keeps_existing_config() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "quality: 40\n");
    jpegbot(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists"));

    let text = std::fs::read_to_string(dir.path().join("jpegbot.yaml")).unwrap();
    assert_eq!(text, "quality: 40\n");
}

// ---------------------------------------------------------------------------
// jpegbot validate
// ---------------------------------------------------------------------------

#[test]
fn validate_default_config_warns_about_credentials() {
    let dir = TempDir::new().unwrap();
    jpegbot(&dir).arg("init").assert().success();
    jpegbot(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("[warning] reddit.client_id is empty"));
}

#[test]
fn validate_picks_up_credentials_from_env() {
    let dir = TempDir::new().unwrap();
    jpegbot(&dir).arg("init").assert().success();
    jpegbot(&dir)
        .args(["validate", "--json"])
        .env("JPEGBOT_REDDIT_CLIENT_ID", "id")
        .env("JPEGBOT_REDDIT_CLIENT_SECRET", "secret")
        .env("JPEGBOT_REDDIT_REFRESH_TOKEN", "token")
        .env("JPEGBOT_IMGUR_CLIENT_ID", "imgur")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""warnings": []"#));
}

#[test]
fn validate_fails_on_template_without_link() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "reply_template: \"no link here\"\n");
    jpegbot(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] reply_template"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn validate_without_config_points_at_init() {
    let dir = TempDir::new().unwrap();
    jpegbot(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("jpegbot init"));
}

// ---------------------------------------------------------------------------
// jpegbot run
// ---------------------------------------------------------------------------

#[test]
fn run_refuses_invalid_config_before_connecting() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "spaces: []\n");
    jpegbot(&dir)
        .args(["run", "--once"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("spaces must name at least one"));
    assert!(!dir.path().join("jpegbot.db").exists());
}

// ---------------------------------------------------------------------------
// jpegbot stats
// ---------------------------------------------------------------------------

#[test]
fn stats_on_fresh_install_is_zero() {
    let dir = TempDir::new().unwrap();
    jpegbot(&dir).arg("init").assert().success();
    jpegbot(&dir)
        .args(["stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""processed": 0"#));
    assert!(!dir.path().join("jpegbot.db").exists());
}

#[test]
fn stats_resolves_db_next_to_config() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("bot")).unwrap();
    std::fs::write(dir.path().join("bot/jpegbot.yaml"), "storage:\n  db_file: seen.db\n").unwrap();
    jpegbot(&dir)
        .args(["stats", "--config"])
        .arg(dir.path().join("bot/jpegbot.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("seen.db"))
        .stdout(predicate::str::contains("0"));
}

#[test]
fn quality_flag_overrides_configured_quality() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "quality: 12\n");
    jpegbot(&dir)
        .args(["validate", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""quality": 12"#));
    jpegbot(&dir)
        .args(["-q", "42", "validate", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""quality": 42"#));
}
