//! 컨포먼스 스위트 실행
//!
//! [`ConformanceRunner`] trait과 sonobuoy 기반 운영 구현 [`Sonobuoy`]를 제공합니다.
//! sonobuoy 실행 순서:
//!
//! ```text
//! run --mode <mode> --wait ──> retrieve <dir> ──> results <tarball>
//!            │
//!            └── 성공/실패와 무관하게 마지막에 delete --wait
//! ```

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clusterprobe_core::ConfigError;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ScenarioError;
use crate::process::{CommandSpec, Executor};

/// 컨포먼스 스위트 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConformanceMode {
    /// 비파괴 컨포먼스 테스트만
    Lite,
    /// 인증용 전체 컨포먼스
    Full,
}

impl ConformanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lite => "lite",
            Self::Full => "full",
        }
    }

    /// sonobuoy `--mode` 값
    pub fn sonobuoy_mode(&self) -> &'static str {
        match self {
            Self::Lite => "non-disruptive-conformance",
            Self::Full => "certified-conformance",
        }
    }
}

impl fmt::Display for ConformanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConformanceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lite" => Ok(Self::Lite),
            "full" => Ok(Self::Full),
            other => Err(ConfigError::InvalidValue {
                field: "conformance.mode".to_owned(),
                reason: format!("unknown mode '{other}', expected lite or full"),
            }),
        }
    }
}

/// 컨포먼스 결과 요약
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConformanceReport {
    pub mode: ConformanceMode,
    /// 플러그인 최종 상태 (`passed`, `failed`)
    pub status: String,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl ConformanceReport {
    pub fn succeeded(&self) -> bool {
        self.failed == 0 && self.status.eq_ignore_ascii_case("passed")
    }
}

/// 컨포먼스 실행에 필요한 접속 정보
#[derive(Debug, Clone, Copy)]
pub struct ConformanceTarget<'a> {
    pub proxy_url: &'a str,
    pub kubeconfig: &'a Path,
}

/// 컨포먼스 스위트 실행 trait
pub trait ConformanceRunner: Send + Sync {
    /// 스위트를 실행하고 결과를 반환합니다. 실패한 테스트가 있으면 에러입니다.
    fn run(
        &self,
        mode: ConformanceMode,
        target: ConformanceTarget<'_>,
    ) -> impl Future<Output = Result<ConformanceReport, ScenarioError>> + Send;
}

/// `sonobuoy results` 출력 파싱 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSummary {
    pub status: String,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
}

/// `sonobuoy results` 텍스트 출력을 파싱합니다.
///
/// ```text
/// Plugin: e2e
/// Status: passed
/// Total: 7052
/// Passed: 356
/// Failed: 0
/// Skipped: 6696
/// ```
pub fn parse_results(output: &str) -> Result<ResultSummary, String> {
    let mut summary = ResultSummary::default();
    let mut saw_status = false;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        let count = || {
            value
                .parse::<u32>()
                .map_err(|e| format!("invalid count '{value}' for {}: {e}", key.trim()))
        };
        match key.trim() {
            "Status" => {
                summary.status = value.to_owned();
                saw_status = true;
            }
            "Passed" => summary.passed = count()?,
            "Failed" => summary.failed = count()?,
            "Skipped" => summary.skipped = count()?,
            _ => {}
        }
    }

    if saw_status {
        Ok(summary)
    } else {
        Err("no plugin status in sonobuoy results output".to_owned())
    }
}

/// sonobuoy CLI 기반 컨포먼스 실행기
pub struct Sonobuoy<E> {
    executor: E,
    sonobuoy: PathBuf,
    work_dir: PathBuf,
}

impl<E: Executor> Sonobuoy<E> {
    pub fn new(executor: E, sonobuoy: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            sonobuoy: sonobuoy.into(),
            work_dir: work_dir.into(),
        }
    }

    fn command<I, S>(&self, target: &ConformanceTarget<'_>, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(&self.sonobuoy)
            .args(args)
            .arg("--kubeconfig")
            .arg(target.kubeconfig.display().to_string())
            .env("HTTPS_PROXY", target.proxy_url)
    }

    async fn step(&self, spec: CommandSpec) -> Result<String, ScenarioError> {
        self.executor
            .run(&spec)
            .await
            .map(|out| out.stdout)
            .map_err(|e| ScenarioError::Conformance(e.to_string()))
    }

    async fn run_and_collect(
        &self,
        mode: ConformanceMode,
        target: &ConformanceTarget<'_>,
    ) -> Result<ConformanceReport, ScenarioError> {
        self.step(self.command(target, ["run", "--mode", mode.sonobuoy_mode(), "--wait"]))
            .await?;

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let work_dir = self.work_dir.display().to_string();
        let retrieved = self
            .step(self.command(target, ["retrieve", work_dir.as_str()]))
            .await?;
        let tarball = retrieved
            .lines()
            .map(str::trim)
            .rfind(|l| !l.is_empty())
            .ok_or_else(|| {
                ScenarioError::Conformance("sonobuoy retrieve printed no tarball path".to_owned())
            })?
            .to_owned();

        let results = self
            .step(self.command(target, ["results", tarball.as_str()]))
            .await?;
        let summary = parse_results(&results).map_err(ScenarioError::Conformance)?;

        Ok(ConformanceReport {
            mode,
            status: summary.status,
            passed: summary.passed,
            failed: summary.failed,
            skipped: summary.skipped,
        })
    }
}

impl<E: Executor> ConformanceRunner for Sonobuoy<E> {
    async fn run(
        &self,
        mode: ConformanceMode,
        target: ConformanceTarget<'_>,
    ) -> Result<ConformanceReport, ScenarioError> {
        info!(mode = %mode, "running conformance suite");
        let result = self.run_and_collect(mode, &target).await;

        if let Err(e) = self.step(self.command(&target, ["delete", "--wait"])).await {
            warn!(error = %e, "sonobuoy cleanup failed");
        }

        let report = result?;
        info!(
            mode = %mode,
            status = %report.status,
            passed = report.passed,
            failed = report.failed,
            skipped = report.skipped,
            "conformance suite finished"
        );
        if report.succeeded() {
            Ok(report)
        } else {
            Err(ScenarioError::Conformance(format!(
                "{} mode: status {}, {} failed, {} passed",
                report.mode, report.status, report.failed, report.passed
            )))
        }
    }
}
