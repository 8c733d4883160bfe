//! 시나리오 드라이버 -- 빌드, 오퍼레이션 실행, 터널, 검증을 하나의 실행으로 묶습니다.
//!
//! ```text
//! bound() ──> build ──> install(v0) ──> [reconcile(v0)] ──> upgrade(v1..vn)
//!                                                               │
//!                   ScenarioReport <── validate <── tunnel(vn) <┘
//! ```
//!
//! 바인딩 검증은 어떤 부수 효과보다 먼저 수행됩니다.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clusterprobe_core::metrics as m;
use clusterprobe_core::{BoundScenario, ClusterprobeConfig, Scenario, ValidationError};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::binary::Subcommand;
use crate::error::ScenarioError;
use crate::manifest::render_manifest;
use crate::process::{Executor, ProcessExecutor};
use crate::runner::{BinarySettings, OperationPlan, OperationRunner, build_binary};
use crate::tunnel::{TunnelOptions, with_tunnel};
use crate::validator::{
    ClusterValidator, ValidationReport, ValidationTarget, Validator, ValidatorSettings,
};

/// 드라이버 실행 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSettings {
    /// 관리 바이너리 빌드 명령 (비어 있으면 생략)
    pub build_command: Vec<String>,
    pub binary: BinarySettings,
    pub reconcile_before_upgrade: bool,
    pub tunnel: TunnelOptions,
}

impl DriverSettings {
    pub fn from_config(config: &ClusterprobeConfig) -> Self {
        let non_empty =
            |s: &str| -> Option<PathBuf> { (!s.is_empty()).then(|| PathBuf::from(s)) };
        Self {
            build_command: config.binary.build_command.clone(),
            binary: BinarySettings {
                path: config.binary.path.clone(),
                install_path: non_empty(&config.binary.install_path),
                verbose: config.binary.verbose,
                credentials: non_empty(&config.binary.credentials),
                work_dir: config.general.work_dir.clone(),
            },
            reconcile_before_upgrade: config.runner.reconcile_before_upgrade,
            tunnel: TunnelOptions {
                listen_addr: config.tunnel.listen_addr.clone(),
                settle: Duration::from_secs(config.tunnel.settle_secs),
                probe_timeout: (config.tunnel.probe_timeout_secs > 0)
                    .then(|| Duration::from_secs(config.tunnel.probe_timeout_secs)),
            },
        }
    }
}

/// 실행된 오퍼레이션 기록
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationRecord {
    pub step: usize,
    pub operation: &'static str,
    pub version: String,
}

/// 시나리오 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub run_id: String,
    pub scenario: String,
    pub infra: String,
    pub operations: Vec<OperationRecord>,
    pub final_version: String,
    pub validation: ValidationReport,
    pub elapsed_secs: f64,
}

/// 시나리오 실행 드라이버
pub struct ScenarioDriver<E, V> {
    executor: Arc<E>,
    validator: V,
    settings: DriverSettings,
    cancel: CancellationToken,
}

impl ScenarioDriver<ProcessExecutor, ClusterValidator<Arc<ProcessExecutor>>> {
    /// 실제 프로세스를 실행하는 드라이버를 설정으로부터 만듭니다.
    pub fn from_config(config: &ClusterprobeConfig) -> Result<Self, ScenarioError> {
        let executor = Arc::new(ProcessExecutor);
        let validator = ClusterValidator::new(
            Arc::clone(&executor),
            ValidatorSettings::from_config(config)?,
        );
        Ok(Self::new(
            executor,
            validator,
            DriverSettings::from_config(config),
        ))
    }
}

impl<E: Executor, V: Validator> ScenarioDriver<E, V> {
    pub fn new(executor: Arc<E>, validator: V, settings: DriverSettings) -> Self {
        Self {
            executor,
            validator,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// 상위 취소 토큰을 연결합니다.
    ///
    /// 취소되면 다음 단계로 넘어가지 않고, 검증 중이면 터널을 닫은 뒤
    /// [`ScenarioError::Cancelled`]를 반환합니다.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// install/apply 프로세스는 중간에 끊지 않으므로 단계 경계에서만 취소를 확인합니다.
    fn ensure_active(&self) -> Result<(), ScenarioError> {
        if self.cancel.is_cancelled() {
            Err(ScenarioError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// 시나리오를 끝까지 실행합니다.
    ///
    /// 바인딩이 불완전하면 아무 프로세스도 실행하지 않고 검증 에러를 반환합니다.
    pub async fn run(&self, scenario: &Scenario) -> Result<ScenarioReport, ScenarioError> {
        let bound = scenario.bound()?;
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        info!(
            run_id = %run_id,
            scenario = bound.name,
            kind = %bound.kind,
            infra = %bound.infra.name,
            versions = ?bound.versions.iter().map(|v| v.as_str()).collect::<Vec<_>>(),
            "starting scenario"
        );

        let result = self.run_bound(run_id, &bound, started).await;
        let elapsed = started.elapsed();

        metrics::histogram!(m::SCENARIO_DURATION_SECONDS, m::LABEL_SCENARIO => bound.name.to_owned())
            .record(elapsed.as_secs_f64());

        match &result {
            Ok(report) => {
                metrics::counter!(
                    m::SCENARIOS_TOTAL,
                    m::LABEL_SCENARIO => bound.name.to_owned(),
                    m::LABEL_INFRA => bound.infra.name.clone(),
                    m::LABEL_RESULT => m::RESULT_SUCCESS
                )
                .increment(1);
                info!(
                    run_id = %run_id,
                    scenario = bound.name,
                    final_version = %report.final_version,
                    elapsed_secs = elapsed.as_secs(),
                    "scenario passed"
                );
            }
            Err(e) => {
                metrics::counter!(
                    m::SCENARIOS_TOTAL,
                    m::LABEL_SCENARIO => bound.name.to_owned(),
                    m::LABEL_INFRA => bound.infra.name.clone(),
                    m::LABEL_RESULT => m::RESULT_FAILURE
                )
                .increment(1);
                metrics::counter!(m::SCENARIO_FAILURES_TOTAL, m::LABEL_ERROR_KIND => e.kind_name())
                    .increment(1);
                error!(
                    run_id = %run_id,
                    scenario = bound.name,
                    error = %e,
                    elapsed_secs = elapsed.as_secs(),
                    "scenario failed"
                );
            }
        }
        result
    }

    async fn run_bound(
        &self,
        run_id: Uuid,
        bound: &BoundScenario<'_>,
        started: Instant,
    ) -> Result<ScenarioReport, ScenarioError> {
        self.ensure_active()?;
        build_binary(&*self.executor, &self.settings.build_command, run_id).await?;

        let plan = OperationPlan::for_versions(
            bound.kind,
            bound.versions,
            self.settings.reconcile_before_upgrade,
        );
        let runner = OperationRunner::new(
            Arc::clone(&self.executor),
            self.settings.binary.clone(),
            run_id,
        );
        self.ensure_active()?;
        runner.execute(&plan, bound).await?;
        self.ensure_active()?;

        let final_version = plan
            .final_version()
            .ok_or_else(|| ValidationError::NotBound {
                scenario: bound.name.to_owned(),
                missing: "versions",
            })?;

        // 터널과 kubeconfig는 최종 버전 매니페스트 기준
        let manifest = render_manifest(
            bound.manifest_template,
            final_version,
            &self.settings.binary.work_dir,
        )
        .await?;
        let invocation = self.settings.binary.invocation(manifest.path(), bound);
        let proxy = invocation.command(Subcommand::Proxy {
            listen_addr: &self.settings.tunnel.listen_addr,
        });

        let provider = bound.infra.provider;
        let validation = with_tunnel(
            &proxy,
            &self.settings.tunnel,
            self.cancel.child_token(),
            |proxy_url| {
                let invocation = &invocation;
                async move {
                    self.validator
                        .validate(ValidationTarget {
                            run_id,
                            proxy_url: &proxy_url,
                            invocation,
                            provider,
                        })
                        .await
                }
            },
        )
        .await?;

        Ok(ScenarioReport {
            run_id: run_id.to_string(),
            scenario: bound.name.to_owned(),
            infra: bound.infra.name.clone(),
            operations: plan
                .operations()
                .iter()
                .map(|op| OperationRecord {
                    step: op.step,
                    operation: op.kind.as_str(),
                    version: op.version.to_string(),
                })
                .collect(),
            final_version: final_version.to_string(),
            validation,
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }
}
