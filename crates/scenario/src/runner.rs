//! 버전 순차 오퍼레이션 실행기
//!
//! 버전 시퀀스 `[v0, ..., vn]`을 오퍼레이션 계획으로 바꾸고 순서대로 실행합니다.
//!
//! ```text
//! install(v0) -> [reconcile(v0)] -> upgrade(v1) -> ... -> upgrade(vn)
//! ```
//!
//! 각 오퍼레이션은 대상 버전으로 렌더링된 매니페스트에 대해 관리 바이너리의
//! `apply`를 호출합니다. 첫 실패에서 즉시 중단하며 재시도나 롤백은 없습니다.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clusterprobe_core::metrics as m;
use clusterprobe_core::{BoundScenario, ClusterVersion, ScenarioKind};
use tracing::{error, info};
use uuid::Uuid;

use crate::binary::{Invocation, Subcommand};
use crate::error::ScenarioError;
use crate::manifest::render_manifest;
use crate::process::{CommandSpec, Executor};

/// 오퍼레이션 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// 최초 설치 (설치용 바이너리 사용)
    Install,
    /// 버전 변경 없는 apply (메타데이터 마이그레이션)
    Reconcile,
    /// 다음 버전으로의 apply
    Upgrade,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Reconcile => "reconcile",
            Self::Upgrade => "upgrade",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 계획된 단일 오퍼레이션
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub step: usize,
    pub kind: OperationKind,
    pub version: ClusterVersion,
}

/// 실행 순서가 고정된 오퍼레이션 목록
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPlan {
    operations: Vec<Operation>,
}

impl OperationPlan {
    /// 시나리오 종류와 버전 시퀀스로부터 계획을 만듭니다.
    ///
    /// 업그레이드 시나리오에서 `reconcile`이 true면 첫 버전 변경 전에
    /// 현재 바이너리로 `v0` apply를 한 번 더 수행합니다.
    pub fn for_versions(kind: ScenarioKind, versions: &[ClusterVersion], reconcile: bool) -> Self {
        let mut kinds_and_versions = Vec::with_capacity(versions.len() + 1);

        if let Some((first, rest)) = versions.split_first() {
            kinds_and_versions.push((OperationKind::Install, first.clone()));
            if kind == ScenarioKind::Upgrade {
                if reconcile {
                    kinds_and_versions.push((OperationKind::Reconcile, first.clone()));
                }
                kinds_and_versions.extend(
                    rest.iter()
                        .map(|v| (OperationKind::Upgrade, v.clone())),
                );
            }
        }

        let operations = kinds_and_versions
            .into_iter()
            .enumerate()
            .map(|(step, (kind, version))| Operation {
                step,
                kind,
                version,
            })
            .collect();
        Self { operations }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// 계획이 끝났을 때 클러스터가 도달하는 버전
    pub fn final_version(&self) -> Option<&ClusterVersion> {
        self.operations.last().map(|op| &op.version)
    }
}

/// 관리 바이너리 호출 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarySettings {
    /// apply/proxy/kubeconfig에 쓰는 현재 바이너리
    pub path: PathBuf,
    /// 최초 설치용 바이너리 (없으면 `path`)
    pub install_path: Option<PathBuf>,
    pub verbose: bool,
    pub credentials: Option<PathBuf>,
    /// 렌더링된 매니페스트를 둘 디렉토리
    pub work_dir: PathBuf,
}

impl BinarySettings {
    /// 오퍼레이션 종류에 맞는 바이너리 경로
    pub fn binary_for(&self, kind: OperationKind) -> &Path {
        match (kind, &self.install_path) {
            (OperationKind::Install, Some(install)) => install,
            _ => &self.path,
        }
    }

    /// 현재 바이너리로 호출 기술자를 만듭니다.
    pub fn invocation(
        &self,
        manifest: impl Into<PathBuf>,
        scenario: &BoundScenario<'_>,
    ) -> Invocation {
        self.invocation_with(&self.path, manifest, scenario)
    }

    fn invocation_with(
        &self,
        binary: &Path,
        manifest: impl Into<PathBuf>,
        scenario: &BoundScenario<'_>,
    ) -> Invocation {
        Invocation::new(binary, manifest, scenario.infra)
            .verbose(self.verbose)
            .credentials(self.credentials.as_deref())
    }
}

/// 관리 바이너리를 빌드합니다. 빈 명령이면 건너뜁니다.
pub async fn build_binary<E: Executor>(
    executor: &E,
    build_command: &[String],
    run_id: Uuid,
) -> Result<(), ScenarioError> {
    let Some((program, args)) = build_command.split_first() else {
        info!(run_id = %run_id, "no build command configured, skipping build");
        return Ok(());
    };

    let spec = CommandSpec::new(program).args(args.iter().cloned());
    info!(run_id = %run_id, command = %spec.display(), "building management binary");
    executor.run(&spec).await.map_err(ScenarioError::Build)?;
    Ok(())
}

/// 오퍼레이션 계획 실행기
pub struct OperationRunner<E> {
    executor: E,
    settings: BinarySettings,
    run_id: Uuid,
}

impl<E: Executor> OperationRunner<E> {
    pub fn new(executor: E, settings: BinarySettings, run_id: Uuid) -> Self {
        Self {
            executor,
            settings,
            run_id,
        }
    }

    pub fn settings(&self) -> &BinarySettings {
        &self.settings
    }

    /// 계획을 순서대로 실행합니다.
    ///
    /// 오퍼레이션 i가 실패하면 i+1 이후는 호출되지 않습니다.
    pub async fn execute(
        &self,
        plan: &OperationPlan,
        scenario: &BoundScenario<'_>,
    ) -> Result<(), ScenarioError> {
        for op in plan.operations() {
            self.execute_one(op, scenario).await?;
        }
        Ok(())
    }

    async fn execute_one(
        &self,
        op: &Operation,
        scenario: &BoundScenario<'_>,
    ) -> Result<(), ScenarioError> {
        let manifest = render_manifest(
            scenario.manifest_template,
            &op.version,
            &self.settings.work_dir,
        )
        .await?;

        let binary = self.settings.binary_for(op.kind);
        let spec = self
            .settings
            .invocation_with(binary, manifest.path(), scenario)
            .command(Subcommand::Apply);

        info!(
            run_id = %self.run_id,
            step = op.step,
            operation = %op.kind,
            version = %op.version,
            binary = %binary.display(),
            "running operation"
        );

        let started = Instant::now();
        let result = self.executor.run(&spec).await;
        metrics::histogram!(m::OPERATION_DURATION_SECONDS, m::LABEL_OPERATION => op.kind.as_str())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(_) => {
                metrics::counter!(
                    m::OPERATIONS_TOTAL,
                    m::LABEL_OPERATION => op.kind.as_str(),
                    m::LABEL_RESULT => m::RESULT_SUCCESS
                )
                .increment(1);
                info!(
                    run_id = %self.run_id,
                    step = op.step,
                    operation = %op.kind,
                    version = %op.version,
                    "operation completed"
                );
                Ok(())
            }
            Err(source) => {
                metrics::counter!(
                    m::OPERATIONS_TOTAL,
                    m::LABEL_OPERATION => op.kind.as_str(),
                    m::LABEL_RESULT => m::RESULT_FAILURE
                )
                .increment(1);
                error!(
                    run_id = %self.run_id,
                    step = op.step,
                    operation = %op.kind,
                    version = %op.version,
                    error = %source,
                    "operation failed"
                );
                Err(ScenarioError::Operation {
                    step: op.step,
                    operation: op.kind.as_str(),
                    version: op.version.to_string(),
                    source,
                })
            }
        }
    }
}
