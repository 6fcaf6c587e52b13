//! Integration tests for the daily-report CLI.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A daily-report command isolated from the caller's environment.
fn report(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("daily-report");
    cmd.current_dir(dir.path())
        .env_remove("DATA_SERVICE_URL")
        .env_remove("SLACK_BOT_TOKEN")
        .env_remove("REPORT_LOG");
    cmd
}

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/catalog.json")
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        let dir = TempDir::new().unwrap();
        report(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("preview"))
            .stdout(predicate::str::contains("config"));
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        report(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("daily-report"));
    }

    #[test]
    fn test_unknown_command_fails() {
        let dir = TempDir::new().unwrap();
        report(&dir).arg("frobnicate").assert().failure();
    }
}

// =============================================================================
// Config Command Tests
// =============================================================================

mod config_command {
    use super::*;

    #[test]
    fn test_config_init_writes_defaults() {
        let dir = TempDir::new().unwrap();
        report(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created report.toml"));

        let content = fs::read_to_string(dir.path().join("report.toml")).unwrap();
        assert!(content.contains("[form]"));
        assert!(content.contains("1a_machine"));
        assert!(content.contains("load_budget_ms = 2000"));
    }

    #[test]
    fn test_config_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("report.toml"), "[server]\nport = 4000\n").unwrap();

        report(&dir)
            .args(["config", "init"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));

        let content = fs::read_to_string(dir.path().join("report.toml")).unwrap();
        assert!(content.contains("port = 4000"));
    }

    #[test]
    fn test_config_show_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        report(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("using defaults"))
            .stdout(predicate::str::contains("port = 3000"))
            .stdout(predicate::str::contains("SLACK_BOT_TOKEN: missing"));
    }

    #[test]
    fn test_config_show_reads_custom_path() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("custom.toml"),
            "[form]\nfactories = [\"d2_machine\"]\ndefault_factory = \"d2_machine\"\n",
        )
        .unwrap();

        report(&dir)
            .args(["--config", "custom.toml", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("default_factory = \"d2_machine\""));
    }

    #[test]
    fn test_config_show_reflects_env_override() {
        let dir = TempDir::new().unwrap();
        report(&dir)
            .env("DATA_SERVICE_URL", "http://sheets.invalid/exec")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("http://sheets.invalid/exec"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("report.toml"),
            "[form]\ndefault_factory = \"9z_machine\"\n[catalog]\nload_budget_ms = 5000\n",
        )
        .unwrap();

        report(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings"))
            .stdout(predicate::str::contains("9z_machine"))
            .stdout(predicate::str::contains("load_budget_ms = 5000"));
    }

    #[test]
    fn test_config_validate_clean_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("report.toml"),
            "[data_service]\nurl = \"http://sheets.invalid/exec\"\n",
        )
        .unwrap();

        report(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_config_validate_without_file() {
        let dir = TempDir::new().unwrap();
        report(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config init"));
    }

    #[test]
    fn test_config_rejects_malformed_toml() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("report.toml"), "[server\nport = ").unwrap();

        report(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse report.toml"));
    }
}

// =============================================================================
// Preview Command Tests
// =============================================================================

mod preview_command {
    use super::*;

    fn preview_json(dir: &TempDir, factory: &str) -> serde_json::Value {
        let output = report(dir)
            .args(["preview", "--factory", factory, "--catalog"])
            .arg(fixture())
            .output()
            .unwrap();
        assert!(output.status.success(), "{:?}", output);
        serde_json::from_slice(&output.stdout).unwrap()
    }

    #[test]
    fn test_preview_renders_modal_from_fixture() {
        let dir = TempDir::new().unwrap();
        report(&dir)
            .args(["preview", "--factory", "1a_machine", "--catalog"])
            .arg(fixture())
            .assert()
            .success()
            .stdout(predicate::str::contains("daily_report_modal"))
            .stdout(predicate::str::contains("Press 01"))
            .stdout(predicate::str::contains("machine_select_0"));
    }

    #[test]
    fn test_preview_expands_only_first_section() {
        let dir = TempDir::new().unwrap();
        let view = preview_json(&dir, "1a_machine");
        assert_eq!(view["type"], "modal");
        assert_eq!(view["private_metadata"], "1a_machine");

        let block_ids: Vec<&str> = view["blocks"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|b| b["block_id"].as_str())
            .collect();
        assert!(block_ids.contains(&"machine_0"));
        assert!(!block_ids.contains(&"machine_1"));
        for i in 1..10 {
            let toggle = format!("toggle_{}", i);
            assert!(block_ids.contains(&toggle.as_str()), "missing {}", toggle);
        }
    }

    #[test]
    fn test_preview_unknown_factory_renders_sentinel() {
        let dir = TempDir::new().unwrap();
        report(&dir)
            .args(["preview", "--factory", "d2_machine", "--catalog"])
            .arg(fixture())
            .assert()
            .success()
            .stdout(predicate::str::contains("\"none\""))
            .stdout(predicate::str::contains("Press 01").not());
    }

    #[test]
    fn test_preview_defaults_to_configured_factory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("report.toml"),
            "[form]\nfactories = [\"1b_machine\"]\ndefault_factory = \"1b_machine\"\n",
        )
        .unwrap();

        report(&dir)
            .args(["preview", "--catalog"])
            .arg(fixture())
            .assert()
            .success()
            .stdout(predicate::str::contains("Lathe 7"));
    }

    #[test]
    fn test_preview_without_catalog_or_service_fails() {
        let dir = TempDir::new().unwrap();
        report(&dir)
            .arg("preview")
            .assert()
            .failure()
            .stderr(predicate::str::contains("no data service configured"));
    }

    #[test]
    fn test_preview_missing_fixture_fails() {
        let dir = TempDir::new().unwrap();
        report(&dir)
            .args(["preview", "--catalog", "nope.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read catalog fixture"));
    }
}

// =============================================================================
// Serve Command Tests
// =============================================================================

mod serve_command {
    use super::*;

    #[test]
    fn test_serve_requires_data_service() {
        let dir = TempDir::new().unwrap();
        report(&dir)
            .env("SLACK_BOT_TOKEN", "xoxb-test")
            .arg("serve")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No data service configured"));
    }

    #[test]
    fn test_serve_requires_bot_token() {
        let dir = TempDir::new().unwrap();
        report(&dir)
            .env("DATA_SERVICE_URL", "http://sheets.invalid/exec")
            .arg("serve")
            .assert()
            .failure()
            .stderr(predicate::str::contains("SLACK_BOT_TOKEN is not set"));
    }
}
