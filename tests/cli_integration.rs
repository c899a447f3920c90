//! Integration tests for the `wf` binary.
//!
//! These tests run the real binary against scenario files in a temporary
//! directory. `HOME` and `XDG_CONFIG_HOME` point into the same directory so
//! no user configuration leaks in.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Fixtures
// =============================================================================

const SHOP: &str = r#"{
    "keys": [
        { "type": "shop.Home", "capabilities": ["push"] },
        { "type": "shop.Product", "capabilities": ["push", "present"] },
        { "type": "shop.Cart", "capabilities": ["push"],
          "containers": [ { "key": "items", "root": { "type": "shop.Empty" } } ] },
        { "type": "shop.Empty", "capabilities": ["push"] },
        { "type": "shop.Confirm", "capabilities": ["present", "result"], "result": "bool" }
    ],
    "containers": [
        { "key": "main", "accepts": ["shop.Home", "shop.Cart"], "root": { "type": "shop.Home" } }
    ],
    "steps": [
        { "op": "push", "key": { "type": "shop.Cart" } },
        { "op": "push", "key": { "type": "shop.Product", "params": { "sku": "A-1" } } },
        { "op": "present", "key": { "type": "shop.Confirm" } },
        { "op": "close_with_result", "result": { "type": "bool", "value": true } }
    ]
}"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).expect("failed to write fixture");
        path
    }

    fn wf(&self) -> Command {
        let mut cmd = Command::cargo_bin("wf").expect("binary not built");
        cmd.env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("xdg"))
            .env_remove("WAYFINDER_CONFIG")
            .env_remove("WF_LOG");
        cmd
    }
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

// =============================================================================
// replay
// =============================================================================

mod replay {
    use super::*;

    #[test]
    fn prints_steps_and_tree() {
        let ws = Workspace::new();
        let scenario = ws.write("shop.json", SHOP);

        ws.wf()
            .args(["replay", arg(&scenario)])
            .assert()
            .success()
            .stdout(predicate::str::contains("opened shop.Cart"))
            .stdout(predicate::str::contains("[items] *"))
            .stdout(predicate::str::contains("closed shop.Confirm"))
            .stdout(predicate::str::contains("presented\n  (empty)"));
    }

    #[test]
    fn json_output_has_steps_and_state() {
        let ws = Workspace::new();
        let scenario = ws.write("shop.json", SHOP);

        let output = ws
            .wf()
            .args(["replay", arg(&scenario), "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["steps"].as_array().unwrap().len(), 4);
        assert_eq!(value["steps"][0]["op"], "push");
        assert_eq!(value["root_close_requested"], false);
        assert_eq!(value["state"]["root"]["active"], "main");
    }

    #[test]
    fn saved_state_can_be_inspected() {
        let ws = Workspace::new();
        let scenario = ws.write("shop.json", SHOP);
        let state = ws.path("state.json");

        ws.wf()
            .args(["replay", arg(&scenario), "--save", arg(&state), "-q"])
            .assert()
            .success();
        assert!(state.exists());

        ws.wf()
            .args(["inspect", arg(&state)])
            .assert()
            .success()
            .stdout(predicate::str::contains("shop.Product"))
            .stdout(predicate::str::contains("4 destination(s)"));
    }

    #[test]
    fn failing_step_is_reported() {
        let ws = Workspace::new();
        let scenario = ws.write(
            "bad.json",
            r#"{
                "keys": [ { "type": "shop.Home", "capabilities": ["push"] } ],
                "containers": [ { "key": "main" } ],
                "steps": [ { "op": "present", "key": { "type": "shop.Home" } } ]
            }"#,
        );

        ws.wf()
            .args(["replay", arg(&scenario)])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Step 1 (present) failed"));
    }

    #[test]
    fn strict_flag_rejects_misrouted_push() {
        let ws = Workspace::new();
        let scenario = ws.write(
            "misrouted.json",
            r#"{
                "keys": [
                    { "type": "shop.Home", "capabilities": ["push"] },
                    { "type": "shop.Product", "capabilities": ["push", "present"] }
                ],
                "containers": [ { "key": "main", "accepts": ["shop.Home"], "root": { "type": "shop.Home" } } ],
                "steps": [ { "op": "push", "key": { "type": "shop.Product" } } ]
            }"#,
        );

        ws.wf()
            .args(["replay", arg(&scenario)])
            .assert()
            .success()
            .stdout(predicate::str::contains("no container for push; presented"));

        ws.wf()
            .args(["replay", arg(&scenario), "--strict"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no container accepts key type"));
    }

    #[test]
    fn missing_scenario_file() {
        let ws = Workspace::new();
        ws.wf()
            .args(["replay", arg(&ws.path("nope.json"))])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read scenario"));
    }
}

// =============================================================================
// inspect
// =============================================================================

mod inspect {
    use super::*;

    #[test]
    fn rejects_invalid_state() {
        let ws = Workspace::new();
        let state = ws.write("state.json", "{ \"root\": 3 }");
        ws.wf()
            .args(["inspect", arg(&state)])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid state file"));
    }

    #[test]
    fn empty_state() {
        let ws = Workspace::new();
        let state = ws.write("state.json", r#"{ "root": { "containers": [] } }"#);
        ws.wf()
            .args(["inspect", arg(&state)])
            .assert()
            .success()
            .stdout(predicate::str::contains("0 destination(s)"));
    }
}

// =============================================================================
// config
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn set_then_get() {
        let ws = Workspace::new();
        let config = ws.path("wf.toml");

        ws.wf()
            .args(["--config", arg(&config), "config", "set", "strict", "true"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Set strict = true"));
        assert!(fs::read_to_string(&config).unwrap().contains("strict = true"));

        ws.wf()
            .args(["--config", arg(&config), "config", "get", "strict"])
            .assert()
            .success()
            .stdout("true\n");
    }

    #[test]
    fn list_shows_defaults() {
        let ws = Workspace::new();
        ws.wf()
            .args(["config"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No config file found"))
            .stdout(predicate::str::contains("max_substitutions = 10"))
            .stdout(predicate::str::contains("logging.level = warn"));
    }

    #[test]
    fn default_path_is_under_home() {
        let ws = Workspace::new();
        let expected = ws.dir.path().join(".wayfinder/config.toml");
        ws.wf()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(format!("{}\n", expected.display()));
    }

    #[test]
    fn invalid_values_rejected() {
        let ws = Workspace::new();
        let config = ws.path("wf.toml");

        ws.wf()
            .args(["--config", arg(&config), "config", "set", "max_substitutions", "0"])
            .assert()
            .failure();
        ws.wf()
            .args(["--config", arg(&config), "config", "set", "colour", "blue"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown configuration key"));
        assert!(!config.exists());
    }

    #[test]
    fn configured_strict_applies_to_replay() {
        let ws = Workspace::new();
        let config = ws.write("wf.toml", "strict = true\n");
        let scenario = ws.write(
            "misrouted.json",
            r#"{
                "keys": [ { "type": "shop.Product", "capabilities": ["push", "present"] } ],
                "containers": [ { "key": "main", "accepts": ["shop.Home"] } ],
                "steps": [ { "op": "push", "key": { "type": "shop.Product" } } ]
            }"#,
        );

        ws.wf()
            .args(["--config", arg(&config), "replay", arg(&scenario)])
            .assert()
            .failure();
    }
}
