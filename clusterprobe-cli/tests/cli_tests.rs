//! Integration tests for the `clusterprobe` binary.
//!
//! Each test writes a config into a temp dir and runs the real binary.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const CONFIG: &str = r#"
[general]
log_level = "warn"
log_format = "json"

[[infrastructures]]
name = "aws_default"
provider = "aws"
provisioning_path = "/tf/aws"

[infrastructures.environ]
AWS_REGION = "eu-west-1"
AWS_SECRET_ACCESS_KEY = "do-not-print"

[[scenarios]]
name = "upgrade_containerd"
kind = "upgrade"
manifest_template = "manifests/upgrade.yaml"
"#;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("clusterprobe.toml");
    std::fs::write(&path, content).expect("should write config");
    path
}

fn clusterprobe(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_clusterprobe"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("should run clusterprobe binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_config_validate_valid_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = write_config(&dir, CONFIG);

    let output = clusterprobe(&config, &["config", "validate", "--format", "json"]);
    assert!(output.status.success(), "valid config should pass");

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json output");
    assert_eq!(report["valid"], true);
    assert_eq!(report["scenarios"], 1);
    assert_eq!(report["infrastructures"], 1);
}

#[test]
fn test_config_validate_invalid_value_exits_2() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = write_config(
        &dir,
        r#"
[tunnel]
listen_addr = ""
"#,
    );

    let output = clusterprobe(&config, &["config", "validate"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).contains("INVALID"));
}

#[test]
fn test_config_show_redacts_secrets() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = write_config(&dir, CONFIG);

    let output = clusterprobe(&config, &["config", "show", "--section", "infrastructures"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("eu-west-1"));
    assert!(text.contains("***REDACTED***"));
    assert!(!text.contains("do-not-print"));
}

#[test]
fn test_config_show_unknown_section_fails() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = write_config(&dir, CONFIG);

    let output = clusterprobe(&config, &["config", "show", "--section", "bogus"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown section: bogus"));
}

#[test]
fn test_list_json() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = write_config(&dir, CONFIG);

    let output = clusterprobe(&config, &["list", "--format", "json"]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json output");
    assert_eq!(report["scenarios"][0]["name"], "upgrade_containerd");
    assert_eq!(report["scenarios"][0]["kind"], "upgrade");
    assert_eq!(report["infrastructures"][0]["provider"], "aws");
}

#[test]
fn test_generate_source_to_stdout() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = write_config(&dir, CONFIG);

    let output = clusterprobe(
        &config,
        &[
            "generate",
            "--mode",
            "source",
            "--job",
            "aws_default:upgrade_containerd:1.27.5,1.28.0",
        ],
    );
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("// Code generated by clusterprobe generate. DO NOT EDIT."));
    assert!(text.contains("async fn test_aws_default_upgrade_containerd_from_1_27_5_to_1_28_0()"));
}

#[test]
fn test_generate_descriptor_to_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = write_config(&dir, CONFIG);
    let out = dir.path().join("ci/jobs.yaml");

    let output = clusterprobe(
        &config,
        &[
            "generate",
            "--mode",
            "descriptor",
            "--job",
            "aws_default:upgrade_containerd:1.27.5,1.28.0",
            "--output",
            out.to_str().expect("utf-8 path"),
        ],
    );
    assert!(output.status.success());
    assert!(stdout(&output).contains("Generated 1 descriptor artifact(s)"));

    let yaml = std::fs::read_to_string(&out).expect("artifact written");
    assert!(yaml.contains("name: pull-aws-default-upgrade-containerd-from-1.27.5-to-1.28.0"));
    assert!(yaml.contains("TEST_NAME"));
}

#[test]
fn test_generate_unknown_mode_exits_4() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = write_config(&dir, CONFIG);

    let output = clusterprobe(
        &config,
        &[
            "generate",
            "--mode",
            "xml",
            "--job",
            "aws_default:upgrade_containerd:1.27.5,1.28.0",
        ],
    );
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown generator mode 'xml'"));
}

#[test]
fn test_generate_wrong_version_count_writes_nothing() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = write_config(&dir, CONFIG);
    let out = dir.path().join("generated.rs");

    let output = clusterprobe(
        &config,
        &[
            "generate",
            "--mode",
            "source",
            "--job",
            "aws_default:upgrade_containerd:1.26.0,1.27.5,1.28.0",
            "-o",
            out.to_str().expect("utf-8 path"),
        ],
    );
    assert_eq!(output.status.code(), Some(4));
    assert!(!out.exists(), "no artifact should be written on validation failure");
}

#[test]
fn test_run_unknown_infrastructure_exits_2() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = write_config(&dir, CONFIG);

    let output = clusterprobe(
        &config,
        &[
            "run",
            "--infra",
            "missing",
            "--scenario",
            "upgrade_containerd",
            "--versions",
            "1.27.5,1.28.0",
        ],
    );
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown infrastructure 'missing'"));
}

#[test]
fn test_run_single_version_upgrade_exits_2() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = write_config(&dir, CONFIG);

    let output = clusterprobe(
        &config,
        &[
            "run",
            "--infra",
            "aws_default",
            "--scenario",
            "upgrade_containerd",
            "--versions",
            "1.27.5",
        ],
    );
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_generate_repeated_job_exits_4() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = write_config(&dir, CONFIG);
    let out = dir.path().join("generated.rs");

    let output = clusterprobe(
        &config,
        &[
            "generate",
            "--mode",
            "source",
            "--job",
            "aws_default:upgrade_containerd:1.27.5,1.28.0",
            "--job",
            "aws_default:upgrade_containerd:1.27.5,1.28.0",
            "-o",
            out.to_str().expect("utf-8 path"),
        ],
    );
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("both generate test"));
    assert!(!out.exists());
}
