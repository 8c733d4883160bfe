//! 클러스터 검증 단계
//!
//! 터널이 열린 뒤 실행됩니다.
//!
//! ```text
//! 노드 준비 대기 ──> 클라우드 프로바이더 검증 ──> 컨포먼스 스위트
//! ```
//!
//! 어느 단계든 실패하면 시나리오가 실패합니다.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use clusterprobe_core::{ClusterprobeConfig, Provider};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::binary::Invocation;
use crate::client::{ClusterClient, NodeStatus, RetryingClient};
use crate::cloud_provider::{CloudProviderCheck, LoadBalancerCheck, run_with_cleanup};
use crate::conformance::{
    ConformanceMode, ConformanceReport, ConformanceRunner, ConformanceTarget, Sonobuoy,
};
use crate::error::ScenarioError;
use crate::kubectl::{Kubectl, fetch_kubeconfig};
use crate::process::Executor;
use crate::readiness::{ReadinessOptions, wait_for_nodes_ready};

/// 검증 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub nodes: Vec<NodeStatus>,
    pub conformance: ConformanceReport,
}

/// 검증 대상 클러스터 정보
#[derive(Debug, Clone, Copy)]
pub struct ValidationTarget<'a> {
    pub run_id: Uuid,
    /// 터널 프록시 URL
    pub proxy_url: &'a str,
    /// 최종 버전 매니페스트로 만든 관리 바이너리 호출 기술자
    pub invocation: &'a Invocation,
    pub provider: Provider,
}

/// 클러스터 검증 trait
pub trait Validator: Send + Sync {
    fn validate(
        &self,
        target: ValidationTarget<'_>,
    ) -> impl Future<Output = Result<ValidationReport, ScenarioError>> + Send;
}

/// 준비 대기, 클라우드 프로바이더 검증, 컨포먼스를 순서대로 실행합니다.
pub async fn validate_cluster<C, K, R>(
    client: &C,
    cloud_check: &K,
    conformance: &R,
    mode: ConformanceMode,
    conformance_target: ConformanceTarget<'_>,
    readiness: &ReadinessOptions,
) -> Result<ValidationReport, ScenarioError>
where
    C: ClusterClient,
    K: CloudProviderCheck,
    R: ConformanceRunner,
{
    let nodes = wait_for_nodes_ready(client, readiness).await?;
    run_with_cleanup(cloud_check).await?;
    let conformance = conformance.run(mode, conformance_target).await?;
    Ok(ValidationReport { nodes, conformance })
}

/// 운영 검증기 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSettings {
    pub kubectl: PathBuf,
    pub sonobuoy: PathBuf,
    pub work_dir: PathBuf,
    pub readiness: ReadinessOptions,
    pub client_retries: u32,
    pub retry_backoff: Duration,
    pub mode: ConformanceMode,
    pub load_balancer_timeout: Duration,
}

impl ValidatorSettings {
    /// 설정 파일 값으로부터 만듭니다.
    pub fn from_config(config: &ClusterprobeConfig) -> Result<Self, ScenarioError> {
        let mode = config
            .conformance
            .mode
            .parse::<ConformanceMode>()
            .map_err(|e| ScenarioError::Core(e.into()))?;
        Ok(Self {
            kubectl: config.conformance.kubectl_path.clone(),
            sonobuoy: config.conformance.sonobuoy_path.clone(),
            work_dir: config.general.work_dir.clone(),
            readiness: ReadinessOptions::from(&config.readiness),
            client_retries: config.readiness.client_retries,
            retry_backoff: Duration::from_secs(2),
            mode,
            load_balancer_timeout: Duration::from_secs(
                config.conformance.load_balancer_timeout_secs,
            ),
        })
    }
}

/// kubectl + sonobuoy 기반 운영 검증기
pub struct ClusterValidator<E> {
    executor: E,
    settings: ValidatorSettings,
}

impl<E: Executor + Clone> ClusterValidator<E> {
    pub fn new(executor: E, settings: ValidatorSettings) -> Self {
        Self { executor, settings }
    }

    pub fn settings(&self) -> &ValidatorSettings {
        &self.settings
    }
}

impl<E: Executor + Clone> Validator for ClusterValidator<E> {
    async fn validate(
        &self,
        target: ValidationTarget<'_>,
    ) -> Result<ValidationReport, ScenarioError> {
        let settings = &self.settings;
        let kubeconfig =
            fetch_kubeconfig(&self.executor, target.invocation, &settings.work_dir).await?;

        let client = RetryingClient::new(
            Kubectl::new(
                self.executor.clone(),
                &settings.kubectl,
                kubeconfig.path(),
                target.proxy_url,
                &settings.work_dir,
            ),
            settings.client_retries,
            settings.retry_backoff,
        );
        let cloud_check =
            LoadBalancerCheck::new(&client, target.provider, settings.load_balancer_timeout);
        let sonobuoy = Sonobuoy::new(
            self.executor.clone(),
            &settings.sonobuoy,
            settings.work_dir.join(format!("sonobuoy-{}", target.run_id)),
        );

        info!(run_id = %target.run_id, proxy_url = target.proxy_url, "validating cluster");
        validate_cluster(
            &client,
            &cloud_check,
            &sonobuoy,
            settings.mode,
            ConformanceTarget {
                proxy_url: target.proxy_url,
                kubeconfig: kubeconfig.path(),
            },
            &settings.readiness,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, MockClusterClient};
    use crate::process::MockExecutor;
    use clusterprobe_core::Infrastructure;
    use std::path::Path;
    use std::sync::Mutex;

    struct RecordingCheck<'a> {
        log: &'a Mutex<Vec<&'static str>>,
    }

    impl CloudProviderCheck for RecordingCheck<'_> {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn run(&self) -> Result<(), ScenarioError> {
            self.log.lock().unwrap().push("cloud-run");
            Ok(())
        }

        async fn cleanup(&self) -> Result<(), ScenarioError> {
            self.log.lock().unwrap().push("cloud-cleanup");
            Ok(())
        }
    }

    struct RecordingConformance<'a> {
        log: &'a Mutex<Vec<&'static str>>,
        failed: u32,
    }

    impl ConformanceRunner for RecordingConformance<'_> {
        async fn run(
            &self,
            mode: ConformanceMode,
            _target: ConformanceTarget<'_>,
        ) -> Result<ConformanceReport, ScenarioError> {
            self.log.lock().unwrap().push("conformance");
            if self.failed > 0 {
                return Err(ScenarioError::Conformance(format!("{} failed", self.failed)));
            }
            Ok(ConformanceReport {
                mode,
                status: "passed".to_owned(),
                passed: 10,
                failed: 0,
                skipped: 0,
            })
        }
    }

    fn readiness() -> ReadinessOptions {
        ReadinessOptions {
            expected_nodes: 1,
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
        }
    }

    fn conformance_target() -> ConformanceTarget<'static> {
        ConformanceTarget {
            proxy_url: "http://127.0.0.1:8080",
            kubeconfig: Path::new("/tmp/kubeconfig"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_readiness_then_cloud_then_conformance() {
        let log = Mutex::new(Vec::new());
        let client =
            MockClusterClient::with_node_responses(vec![Ok(vec![NodeStatus::new("n0", true)])]);
        let report = validate_cluster(
            &client,
            &RecordingCheck { log: &log },
            &RecordingConformance { log: &log, failed: 0 },
            ConformanceMode::Lite,
            conformance_target(),
            &readiness(),
        )
        .await
        .unwrap();

        assert_eq!(report.nodes.len(), 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["cloud-run", "cloud-cleanup", "conformance"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_timeout_skips_later_checks() {
        let log = Mutex::new(Vec::new());
        let client = MockClusterClient::with_node_responses(vec![Err(ClientError::Transient(
            "connection refused".to_owned(),
        ))]);
        let err = validate_cluster(
            &client,
            &RecordingCheck { log: &log },
            &RecordingConformance { log: &log, failed: 0 },
            ConformanceMode::Lite,
            conformance_target(),
            &readiness(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ScenarioError::ReadinessTimeout { .. }));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn conformance_failure_fails_validation() {
        let log = Mutex::new(Vec::new());
        let client =
            MockClusterClient::with_node_responses(vec![Ok(vec![NodeStatus::new("n0", true)])]);
        let err = validate_cluster(
            &client,
            &RecordingCheck { log: &log },
            &RecordingConformance { log: &log, failed: 3 },
            ConformanceMode::Full,
            conformance_target(),
            &readiness(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScenarioError::Conformance(_)));
    }

    #[test]
    fn settings_from_default_config() {
        let config = ClusterprobeConfig::default();
        let settings = ValidatorSettings::from_config(&config).unwrap();
        assert_eq!(settings.mode, ConformanceMode::Lite);
        assert_eq!(settings.client_retries, 3);
        assert_eq!(settings.load_balancer_timeout, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn cluster_validator_uses_kubeconfig_from_binary() {
        let dir = tempfile::tempdir().unwrap();
        let nodes = r#"{"items": [{"metadata": {"name": "cp-0"}, "status": {"conditions": [{"type": "Ready", "status": "True"}]}}]}"#;
        let exec = std::sync::Arc::new(MockExecutor::with_responder(move |spec| {
            let first = spec.args.first().map(String::as_str).unwrap_or_default();
            match first {
                "kubeconfig" => MockExecutor::stdout("apiVersion: v1\n"),
                "get" => MockExecutor::stdout(nodes),
                "retrieve" => MockExecutor::stdout("results.tar.gz\n"),
                "results" => MockExecutor::stdout("Status: passed\nPassed: 5\nFailed: 0\n"),
                _ => MockExecutor::stdout(""),
            }
        }));

        let mut config = ClusterprobeConfig::default();
        config.general.work_dir = dir.path().to_path_buf();
        config.readiness.expected_nodes = 1;
        let validator =
            ClusterValidator::new(exec.clone(), ValidatorSettings::from_config(&config).unwrap());

        let infra = Infrastructure::new("static", Provider::None, "/tf");
        let invocation = Invocation::new("kubeone", "m.yaml", &infra);
        let report = validator
            .validate(ValidationTarget {
                run_id: Uuid::new_v4(),
                proxy_url: "http://127.0.0.1:8080",
                invocation: &invocation,
                provider: infra.provider,
            })
            .await
            .unwrap();

        assert_eq!(report.conformance.passed, 5);
        let programs: Vec<_> = exec
            .calls()
            .iter()
            .map(|c| format!("{} {}", c.program.display(), c.args[0]))
            .collect();
        assert_eq!(
            programs,
            vec![
                "kubeone kubeconfig",
                "kubectl get",
                "sonobuoy run",
                "sonobuoy retrieve",
                "sonobuoy results",
                "sonobuoy delete",
            ]
        );
    }
}
