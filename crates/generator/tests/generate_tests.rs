//! 설정 파일 기반 생성기 통합 테스트

use clusterprobe_core::{ClusterprobeConfig, Registry};
use clusterprobe_generator::{
    CiJob, GenerateError, GenerateRequest, Generator, GeneratorMode, test_title,
};
use proptest::prelude::*;

const CONFIG: &str = r#"
[generator]
image = "ghcr.io/example/e2e:v1"
command = ["make", "e2e"]
always_run = true
optional = false

[[infrastructures]]
name = "aws_default"
provider = "aws"
provisioning_path = "/tf/aws"

[infrastructures.environ]
AWS_REGION = "eu-west-1"

[infrastructures.labels]
preset-aws = "true"

[[infrastructures]]
name = "hetzner"
provider = "hetzner"
provisioning_path = "/tf/hetzner"

[[scenarios]]
name = "upgrade_containerd"
kind = "upgrade"
manifest_template = "manifests/upgrade.yaml"

[[scenarios]]
name = "install_containerd"
kind = "install"
manifest_template = "manifests/install.yaml"
"#;

fn config() -> ClusterprobeConfig {
    ClusterprobeConfig::parse(CONFIG).expect("config should parse")
}

fn upgrade_requests() -> Vec<GenerateRequest> {
    vec![
        GenerateRequest::new("aws_default", "upgrade_containerd", ["1.27.5", "1.28.0"]),
        GenerateRequest::new("hetzner", "upgrade_containerd", ["1.27.5", "1.28.0"]),
    ]
}

#[test]
fn source_snapshot() {
    let config = config();
    let registry = Registry::from_config(&config).unwrap();
    let out = Generator::new(&registry, &config.generator)
        .generate(&upgrade_requests(), GeneratorMode::Source)
        .unwrap();

    let expected = r#"// Code generated by clusterprobe generate. DO NOT EDIT.

#[tokio::test]
async fn test_aws_default_upgrade_containerd_from_1_27_5_to_1_28_0() {
    clusterprobe_scenario::run_registered("aws_default", "upgrade_containerd", &["1.27.5", "1.28.0"])
        .await
        .expect("scenario upgrade_containerd on aws_default failed");
}

#[tokio::test]
async fn test_hetzner_upgrade_containerd_from_1_27_5_to_1_28_0() {
    clusterprobe_scenario::run_registered("hetzner", "upgrade_containerd", &["1.27.5", "1.28.0"])
        .await
        .expect("scenario upgrade_containerd on hetzner failed");
}
"#;
    assert_eq!(out, expected);
}

#[test]
fn descriptor_carries_config_and_infra_metadata() {
    let config = config();
    let registry = Registry::from_config(&config).unwrap();
    let out = Generator::new(&registry, &config.generator)
        .generate(&upgrade_requests(), GeneratorMode::Descriptor)
        .unwrap();

    let jobs: Vec<CiJob> = serde_yaml::from_str(&out).unwrap();
    assert_eq!(jobs.len(), 2);

    let aws = &jobs[0];
    assert_eq!(aws.name, "pull-aws-default-upgrade-containerd-from-1.27.5-to-1.28.0");
    assert!(aws.always_run);
    assert!(!aws.optional);
    assert_eq!(aws.labels.get("preset-aws").map(String::as_str), Some("true"));

    let container = &aws.spec.containers[0];
    assert_eq!(container.image, "ghcr.io/example/e2e:v1");
    assert_eq!(container.command, vec!["make", "e2e"]);
    let env: Vec<(&str, &str)> = container
        .env
        .iter()
        .map(|e| (e.name.as_str(), e.value.as_str()))
        .collect();
    assert_eq!(
        env,
        vec![
            ("TEST_NAME", "test_aws_default_upgrade_containerd_from_1_27_5_to_1_28_0"),
            ("PROVIDER", "aws"),
            ("AWS_REGION", "eu-west-1"),
        ]
    );

    assert!(jobs[1].labels.is_empty());
}

#[test]
fn wrong_version_count_is_rejected_in_both_modes() {
    let config = config();
    let registry = Registry::from_config(&config).unwrap();
    let generator = Generator::new(&registry, &config.generator);

    let cases = [
        GenerateRequest::new("aws_default", "upgrade_containerd", ["1.27.5"]),
        GenerateRequest::new("aws_default", "install_containerd", ["1.27.5", "1.28.0"]),
    ];
    for request in cases {
        for mode in [GeneratorMode::Source, GeneratorMode::Descriptor] {
            let err = generator.generate(&[request.clone()], mode).unwrap_err();
            assert!(
                matches!(err, GenerateError::Validation(_)),
                "{request} in {mode} mode: {err}"
            );
        }
    }
}

#[test]
fn invalid_version_is_rejected() {
    let config = config();
    let registry = Registry::from_config(&config).unwrap();
    let err = Generator::new(&registry, &config.generator)
        .generate(
            &[GenerateRequest::new("aws_default", "upgrade_containerd", ["1.27.5", "latest"])],
            GeneratorMode::Source,
        )
        .unwrap_err();
    assert!(matches!(err, GenerateError::Validation(_)));
}

fn version() -> impl Strategy<Value = String> {
    (0u64..3, 0u64..40, 0u64..20, any::<bool>())
        .prop_map(|(major, minor, patch, v)| {
            format!("{}{major}.{minor}.{patch}", if v { "v" } else { "" })
        })
}

proptest! {
    #[test]
    fn generation_is_deterministic(
        from in version(),
        to in version(),
        descriptor in any::<bool>(),
    ) {
        let config = config();
        let registry = Registry::from_config(&config).unwrap();
        let mode = if descriptor { GeneratorMode::Descriptor } else { GeneratorMode::Source };
        let requests = [GenerateRequest::new(
            "aws_default",
            "upgrade_containerd",
            [from.as_str(), to.as_str()],
        )];

        let first = Generator::new(&registry, &config.generator).generate(&requests, mode).unwrap();
        let second = Generator::new(&registry, &config.generator).generate(&requests, mode).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_titles_are_rust_identifiers(
        infra in "[A-Za-z0-9_.-]{1,20}",
        scenario in "[A-Za-z0-9_.-]{1,20}",
        from in version(),
        to in version(),
    ) {
        let title = test_title(&infra, &scenario, &[from.as_str(), to.as_str()]);
        prop_assert!(title.starts_with("test_"));
        prop_assert!(title.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        prop_assert!(!title.contains("__"));
    }
}
