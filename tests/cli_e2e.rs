//! End-to-end CLI tests for the indexer binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use indexer_core::catalog::{NewPart, NewSegment};
use indexer_core::{Catalog, Database};
use predicates::prelude::*;
use tempfile::TempDir;

/// Builds a command isolated from the user's config directory.
fn indexer_cmd(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("indexer").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home).env_remove("RUST_LOG");
    cmd
}

async fn seed_catalog(db_path: &Path) {
    let db = Database::new(db_path).await.unwrap();
    let catalog = Catalog::new(db.clone());
    catalog.create_group("alt.binaries.test", true).await.unwrap();
    for index in 1..=2 {
        let subject = format!(r#"[{index}/2] - "Cli.Run.2021.rar" yEnc"#);
        let part_id = catalog
            .create_part(&NewPart {
                subject: &subject,
                group_name: "alt.binaries.test",
                poster: "cli@example.com",
                posted: 1_600_000_000,
                total_segments: 1,
            })
            .await
            .unwrap();
        let message_id = format!("<cli.{index}@x>");
        catalog
            .add_segment(&NewSegment {
                part_id,
                number: 1,
                size: 1024,
                message_id: &message_id,
            })
            .await
            .unwrap();
    }
    db.close().await;
}

#[test]
fn test_binary_without_subcommand_fails() {
    let temp = TempDir::new().unwrap();
    indexer_cmd(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_binary_help_displays_usage() {
    let temp = TempDir::new().unwrap();
    indexer_cmd(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Group Usenet article parts"))
        .stdout(predicate::str::contains("make-releases"));
}

#[test]
fn test_binary_version_displays_version() {
    let temp = TempDir::new().unwrap();
    indexer_cmd(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("indexer"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let temp = TempDir::new().unwrap();
    indexer_cmd(temp.path())
        .args(["create-db", "--invalid-flag"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_create_db_creates_file() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("catalog.db");

    indexer_cmd(temp.path())
        .arg("--db")
        .arg(&db_path)
        .arg("create-db")
        .assert()
        .success();

    assert!(db_path.exists());
}

#[test]
fn test_binary_make_commands_on_empty_catalog() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("catalog.db");

    indexer_cmd(temp.path())
        .arg("--db")
        .arg(&db_path)
        .arg("make-binaries")
        .assert()
        .success()
        .stdout(predicate::str::contains("into 0 binaries"));

    indexer_cmd(temp.path())
        .arg("--db")
        .arg(&db_path)
        .args(["make-releases", "--threshold", "90"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 0 releases"));
}

#[test]
fn test_binary_threshold_out_of_range_rejected() {
    let temp = TempDir::new().unwrap();
    indexer_cmd(temp.path())
        .args(["make-releases", "--threshold", "0"])
        .assert()
        .failure();
}

#[test]
fn test_binary_invalid_config_file_fails() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("bad.toml");
    fs::write(&config_path, "completion_threshold = 500\n").unwrap();

    indexer_cmd(temp.path())
        .arg("--config")
        .arg(&config_path)
        .arg("create-db")
        .assert()
        .failure()
        .stderr(predicate::str::contains("completion_threshold"));
}

#[test]
fn test_binary_config_file_supplies_database_path() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("from-config.db");
    let config_dir = temp.path().join("usenet-indexer");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        format!("database_path = \"{}\"\n", db_path.display()),
    )
    .unwrap();

    indexer_cmd(temp.path()).arg("create-db").assert().success();

    assert!(db_path.exists());
}

#[tokio::test]
async fn test_binary_process_promotes_seeded_parts() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("catalog.db");
    seed_catalog(&db_path).await;

    indexer_cmd(temp.path())
        .arg("--db")
        .arg(&db_path)
        .args(["list-parts", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"available_segments\": 1"));

    indexer_cmd(temp.path())
        .arg("--db")
        .arg(&db_path)
        .arg("process")
        .assert()
        .success()
        .stdout(predicate::str::contains("created 1 releases"));

    indexer_cmd(temp.path())
        .arg("--db")
        .arg(&db_path)
        .arg("list-groups")
        .assert()
        .success()
        .stdout(predicate::str::contains("alt.binaries.test"));

    let db = Database::new(&db_path).await.unwrap();
    let catalog = Catalog::new(db);
    let release = catalog
        .find_release("Cli.Run.2021", 1_600_000_000)
        .await
        .unwrap()
        .expect("release should exist");
    assert_eq!(release.search_name, "Cli Run 2021");
    assert_eq!(catalog.count_parts().await.unwrap(), 0);
}
