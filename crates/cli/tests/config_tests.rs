//! Integration tests for the fwfinder binary
//!
//! Covers configuration and rule table parsing, and end-to-end runs of the
//! binary against recorded snapshots.

use common::test_utils::*;
use std::path::Path;
use std::process::Command;

const FULL_CONFIG: &str = r#"
[finder]
log_level = "debug"
descriptor_timeout_ms = 250
max_hops = 3

[rules]
path = "~/.config/fwfinder/badges.toml"
"#;

const BADGE_RULES: &str = r#"
extends_builtin = true

[[classify]]
kind = "SerialMain"
ids = ["0x2e8a:0x1000"]

[[infer]]
kind = "Winky"
requires = ["SerialMain"]
signature = { ids = ["0x2e8a:0x1000"] }
"#;

mod config_files {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: toml::Value = toml::from_str(FULL_CONFIG).unwrap();

        let finder = config.get("finder").unwrap();
        assert_eq!(finder.get("log_level").unwrap().as_str().unwrap(), "debug");
        assert_eq!(
            finder
                .get("descriptor_timeout_ms")
                .unwrap()
                .as_integer()
                .unwrap(),
            250
        );
        assert_eq!(finder.get("max_hops").unwrap().as_integer().unwrap(), 3);

        let rules = config.get("rules").unwrap();
        assert!(rules.get("path").unwrap().as_str().unwrap().starts_with('~'));
    }

    #[test]
    fn test_parse_rule_table() {
        let rules = finder::RuleSet::from_toml_str(BADGE_RULES).unwrap();

        assert_eq!(rules.classify[0].kind, model::UsbDeviceKind::SerialMain);
        assert_eq!(rules.infer[0].kind, model::DeviceKind::Winky);
        assert!(rules.infer.len() > 1);
    }
}

mod binary {
    use super::*;

    fn write(path: &Path, content: &str) {
        std::fs::write(path, content).unwrap();
    }

    fn run(args: &[&str]) -> (bool, String) {
        let output = Command::new(env!("CARGO_BIN_EXE_fwfinder"))
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .unwrap();
        (
            output.status.success(),
            String::from_utf8_lossy(&output.stdout).into_owned(),
        )
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_broken_default_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("fwfinder");
        let snapshot = dir.path().join("bus.json");
        std::fs::create_dir_all(&config_dir).unwrap();
        write(&config_dir.join("config.toml"), "[finder]\nmax_hops = 0\n");
        write(&snapshot, "[]");

        let output = Command::new(env!("CARGO_BIN_EXE_fwfinder"))
            .args(["--replay", snapshot.to_str().unwrap()])
            .env_remove("RUST_LOG")
            .env("XDG_CONFIG_HOME", dir.path())
            .output()
            .unwrap();

        assert!(output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("using defaults"), "stderr: {}", stderr);
        assert!(stderr.contains("max_hops"), "stderr: {}", stderr);
    }

    #[test]
    fn test_replay_lists_board() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        let snapshot = dir.path().join("bus.json");
        write(&config, "[finder]\nlog_level = \"error\"\n");

        let mut nodes = create_mock_freewili("1-4", 1);
        nodes.push(create_mock_hid("1-1"));
        write(&snapshot, &serde_json::to_string(&nodes).unwrap());

        let (ok, stdout) = run(&[
            "--config",
            config.to_str().unwrap(),
            "--replay",
            snapshot.to_str().unwrap(),
            "--json",
        ]);
        assert!(ok);

        let devices: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        let devices = devices.as_array().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0]["kind"], "FreeWili");
        assert_eq!(devices[0]["serial"], "FW-MAIN-0001");
        assert_eq!(devices[0]["usb_devices"].as_array().unwrap().len(), 5);
        assert_eq!(devices[0]["hub"], 4);
        assert_eq!(devices[0]["usb_devices"][4]["location"], "1-4");
    }

    #[test]
    fn test_replay_with_rules_and_all() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        let rules = dir.path().join("rules.toml");
        let snapshot = dir.path().join("bus.json");
        write(&config, "[finder]\nlog_level = \"error\"\n");
        write(&rules, BADGE_RULES);

        let nodes = vec![
            create_mock_raw_node(0x2e8a, 0x1000, "2-1"),
            create_mock_hid("2-2"),
        ];
        write(&snapshot, &serde_json::to_string(&nodes).unwrap());

        let (ok, stdout) = run(&[
            "--config",
            config.to_str().unwrap(),
            "--rules",
            rules.to_str().unwrap(),
            "--replay",
            snapshot.to_str().unwrap(),
            "--all",
            "--json",
        ]);
        assert!(ok);

        let devices: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        let kinds: Vec<_> = devices
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["kind"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(kinds, ["Winky", "Unknown"]);
    }

    #[test]
    fn test_raw_json_lists_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        let snapshot = dir.path().join("bus.json");
        write(&config, "[finder]\nlog_level = \"error\"\n");

        let nodes = create_mock_freewili("3-1", 2);
        write(&snapshot, &serde_json::to_string(&nodes).unwrap());

        let (ok, stdout) = run(&[
            "--config",
            config.to_str().unwrap(),
            "--replay",
            snapshot.to_str().unwrap(),
            "--raw",
            "--json",
        ]);
        assert!(ok);

        let raw: Vec<model::RawUsbNode> = serde_json::from_str(&stdout).unwrap();
        assert_eq!(raw, nodes);
    }

    #[test]
    fn test_invalid_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        write(&config, "[finder]\nmax_hops = 0\n");

        let (ok, _) = run(&["--config", config.to_str().unwrap()]);
        assert!(!ok);
    }

    #[test]
    fn test_corrupt_snapshot_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        let snapshot = dir.path().join("bus.json");
        write(&config, "[finder]\nlog_level = \"error\"\n");
        write(&snapshot, "not json");

        let (ok, _) = run(&[
            "--config",
            config.to_str().unwrap(),
            "--replay",
            snapshot.to_str().unwrap(),
        ]);
        assert!(!ok);
    }
}
