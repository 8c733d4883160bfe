//! 생성된 테스트 코드의 진입점
//!
//! 생성기가 출력하는 `#[tokio::test]` 함수는 [`run_registered`]만 호출합니다.
//! 설정 파일 경로는 `CLUSTERPROBE_CONFIG` 환경변수로 지정하며, 없으면
//! 현재 디렉토리의 `clusterprobe.toml`을 사용합니다.

use std::path::PathBuf;

use clusterprobe_core::{ClusterprobeConfig, Registry};
use tracing::info;

use crate::driver::{ScenarioDriver, ScenarioReport};
use crate::error::ScenarioError;

/// 설정 파일 경로 환경변수
pub const CONFIG_ENV: &str = "CLUSTERPROBE_CONFIG";

/// 기본 설정 파일 경로
pub const DEFAULT_CONFIG_PATH: &str = "clusterprobe.toml";

/// 사용할 설정 파일 경로를 결정합니다.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// 설정에 등록된 시나리오를 인프라/버전에 바인딩해 실행합니다.
pub async fn run_registered(
    infra: &str,
    scenario: &str,
    versions: &[&str],
) -> Result<ScenarioReport, ScenarioError> {
    let path = config_path();
    info!(config = %path.display(), infra, scenario, "running registered scenario");

    let config = ClusterprobeConfig::load(&path).await?;
    let registry = Registry::from_config(&config)?;
    let bound = registry.bind(scenario, infra, versions)?;

    ScenarioDriver::from_config(&config)?.run(&bound).await
}
