//! 설정 관리 -- clusterprobe.toml 파싱 및 런타임 설정
//!
//! [`ClusterprobeConfig`]는 실행 엔진, 생성기, 카탈로그 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`CLUSTERPROBE_TUNNEL_LISTEN_ADDR=127.0.0.1:9090` 형식)
//! 3. 설정 파일 (`clusterprobe.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), clusterprobe_core::error::CoreError> {
//! use clusterprobe_core::config::ClusterprobeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ClusterprobeConfig::load("clusterprobe.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ClusterprobeConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, CoreError};
use crate::infra::Infrastructure;
use crate::scenario::ScenarioKind;

/// 설정 상한값 상수
const MAX_SETTLE_SECS: u64 = 300;
const MAX_PROBE_TIMEOUT_SECS: u64 = 300;
const MAX_POLL_INTERVAL_SECS: u64 = 600;
const MAX_READINESS_TIMEOUT_SECS: u64 = 24 * 3600;
const MAX_CLIENT_RETRIES: u32 = 10;

/// clusterprobe 통합 설정
///
/// `clusterprobe.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterprobeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 관리 바이너리 설정
    #[serde(default)]
    pub binary: BinaryConfig,
    /// 오퍼레이션 러너 설정
    #[serde(default)]
    pub runner: RunnerConfig,
    /// 터널(프록시) 설정
    #[serde(default)]
    pub tunnel: TunnelConfig,
    /// 노드 준비 대기 설정
    #[serde(default)]
    pub readiness: ReadinessConfig,
    /// 컨포먼스 검증 설정
    #[serde(default)]
    pub conformance: ConformanceConfig,
    /// CI 작업 생성 설정
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// 인프라 카탈로그
    #[serde(default)]
    pub infrastructures: Vec<Infrastructure>,
    /// 시나리오 카탈로그
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
}

impl ClusterprobeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CoreError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, CoreError> {
        toml::from_str(toml_str).map_err(|e| {
            CoreError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `CLUSTERPROBE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "CLUSTERPROBE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "CLUSTERPROBE_GENERAL_LOG_FORMAT");
        override_path(&mut self.general.work_dir, "CLUSTERPROBE_GENERAL_WORK_DIR");

        // Binary
        override_path(&mut self.binary.path, "CLUSTERPROBE_BINARY_PATH");
        override_string(&mut self.binary.install_path, "CLUSTERPROBE_BINARY_INSTALL_PATH");
        override_words(
            &mut self.binary.build_command,
            "CLUSTERPROBE_BINARY_BUILD_COMMAND",
        );
        override_bool(&mut self.binary.verbose, "CLUSTERPROBE_BINARY_VERBOSE");
        override_string(&mut self.binary.credentials, "CLUSTERPROBE_BINARY_CREDENTIALS");

        // Runner
        override_bool(
            &mut self.runner.reconcile_before_upgrade,
            "CLUSTERPROBE_RUNNER_RECONCILE_BEFORE_UPGRADE",
        );

        // Tunnel
        override_string(&mut self.tunnel.listen_addr, "CLUSTERPROBE_TUNNEL_LISTEN_ADDR");
        override_u64(&mut self.tunnel.settle_secs, "CLUSTERPROBE_TUNNEL_SETTLE_SECS");
        override_u64(
            &mut self.tunnel.probe_timeout_secs,
            "CLUSTERPROBE_TUNNEL_PROBE_TIMEOUT_SECS",
        );

        // Readiness
        override_usize(
            &mut self.readiness.expected_nodes,
            "CLUSTERPROBE_READINESS_EXPECTED_NODES",
        );
        override_u64(
            &mut self.readiness.poll_interval_secs,
            "CLUSTERPROBE_READINESS_POLL_INTERVAL_SECS",
        );
        override_u64(
            &mut self.readiness.timeout_secs,
            "CLUSTERPROBE_READINESS_TIMEOUT_SECS",
        );
        override_u32(
            &mut self.readiness.client_retries,
            "CLUSTERPROBE_READINESS_CLIENT_RETRIES",
        );

        // Conformance
        override_string(&mut self.conformance.mode, "CLUSTERPROBE_CONFORMANCE_MODE");
        override_path(
            &mut self.conformance.sonobuoy_path,
            "CLUSTERPROBE_CONFORMANCE_SONOBUOY_PATH",
        );
        override_path(
            &mut self.conformance.kubectl_path,
            "CLUSTERPROBE_CONFORMANCE_KUBECTL_PATH",
        );

        // Generator
        override_string(&mut self.generator.image, "CLUSTERPROBE_GENERATOR_IMAGE");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CoreError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.binary.path.as_os_str().is_empty() {
            return Err(invalid("binary.path", "must not be empty".to_owned()));
        }

        if self.tunnel.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(invalid(
                "tunnel.listen_addr",
                format!("'{}' is not a socket address", self.tunnel.listen_addr),
            ));
        }

        if self.tunnel.settle_secs > MAX_SETTLE_SECS {
            return Err(invalid(
                "tunnel.settle_secs",
                format!("must be 0-{MAX_SETTLE_SECS}"),
            ));
        }

        if self.tunnel.probe_timeout_secs > MAX_PROBE_TIMEOUT_SECS {
            return Err(invalid(
                "tunnel.probe_timeout_secs",
                format!("must be 0-{MAX_PROBE_TIMEOUT_SECS}"),
            ));
        }

        if self.readiness.expected_nodes == 0 {
            return Err(invalid(
                "readiness.expected_nodes",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.readiness.poll_interval_secs == 0
            || self.readiness.poll_interval_secs > MAX_POLL_INTERVAL_SECS
        {
            return Err(invalid(
                "readiness.poll_interval_secs",
                format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
            ));
        }

        if self.readiness.timeout_secs < self.readiness.poll_interval_secs
            || self.readiness.timeout_secs > MAX_READINESS_TIMEOUT_SECS
        {
            return Err(invalid(
                "readiness.timeout_secs",
                format!(
                    "must be {}-{MAX_READINESS_TIMEOUT_SECS}",
                    self.readiness.poll_interval_secs
                ),
            ));
        }

        if self.readiness.client_retries > MAX_CLIENT_RETRIES {
            return Err(invalid(
                "readiness.client_retries",
                format!("must be 0-{MAX_CLIENT_RETRIES}"),
            ));
        }

        let valid_modes = ["lite", "full"];
        if !valid_modes.contains(&self.conformance.mode.as_str()) {
            return Err(invalid(
                "conformance.mode",
                format!("must be one of: {}", valid_modes.join(", ")),
            ));
        }

        if self.generator.command.is_empty() {
            return Err(invalid("generator.command", "must not be empty".to_owned()));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> CoreError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 렌더링된 매니페스트, kubeconfig, 결과 파일을 둘 작업 디렉토리
    pub work_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            work_dir: std::env::temp_dir(),
        }
    }
}

/// 관리 바이너리 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryConfig {
    /// 업그레이드/검증 단계에서 사용할 바이너리 경로
    pub path: PathBuf,
    /// 최초 설치에 사용할 바이너리 경로 (비어 있으면 `path` 사용)
    pub install_path: String,
    /// 실행 전 바이너리 빌드 명령 (비어 있으면 빌드 생략)
    pub build_command: Vec<String>,
    /// 상세 로그 플래그 전달 여부
    pub verbose: bool,
    /// 자격 증명 파일 경로 (비어 있으면 전달하지 않음)
    pub credentials: String,
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("dist/kubeone"),
            install_path: String::new(),
            build_command: vec!["make".to_owned(), "build".to_owned()],
            verbose: false,
            credentials: String::new(),
        }
    }
}

/// 오퍼레이션 러너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// 첫 업그레이드 전에 설치 버전으로 한 번 더 apply 할지 여부
    pub reconcile_before_upgrade: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            reconcile_before_upgrade: true,
        }
    }
}

/// 터널(프록시) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// 프록시 로컬 수신 주소
    pub listen_addr: String,
    /// 프록시 시작 후 고정 대기 시간 (초)
    pub settle_secs: u64,
    /// 대기 후 TCP 연결 확인 제한 시간 (초, 0이면 확인 생략)
    pub probe_timeout_secs: u64,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_owned(),
            settle_secs: 5,
            probe_timeout_secs: 0,
        }
    }
}

/// 노드 준비 대기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Ready 상태여야 하는 노드 수
    pub expected_nodes: usize,
    /// 폴링 주기 (초)
    pub poll_interval_secs: u64,
    /// 전체 대기 예산 (초)
    pub timeout_secs: u64,
    /// 일시적 프록시 에러 재시도 횟수
    pub client_retries: u32,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            expected_nodes: 4,
            poll_interval_secs: 10,
            timeout_secs: 900,
            client_retries: 3,
        }
    }
}

/// 컨포먼스 검증 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConformanceConfig {
    /// 실행 모드 (lite, full)
    pub mode: String,
    /// sonobuoy 바이너리 경로
    pub sonobuoy_path: PathBuf,
    /// kubectl 바이너리 경로
    pub kubectl_path: PathBuf,
    /// LoadBalancer 주소 할당 대기 시간 (초)
    pub load_balancer_timeout_secs: u64,
}

impl Default for ConformanceConfig {
    fn default() -> Self {
        Self {
            mode: "lite".to_owned(),
            sonobuoy_path: PathBuf::from("sonobuoy"),
            kubectl_path: PathBuf::from("kubectl"),
            load_balancer_timeout_secs: 300,
        }
    }
}

/// CI 작업 생성 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// 작업 컨테이너 이미지
    pub image: String,
    /// 작업 컨테이너 명령
    pub command: Vec<String>,
    /// 모든 PR에서 실행할지 여부
    pub always_run: bool,
    /// 실패해도 머지를 막지 않을지 여부
    pub optional: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            image: "ghcr.io/clusterprobe/e2e-runner:latest".to_owned(),
            command: vec!["make".to_owned(), "e2e-test".to_owned()],
            always_run: false,
            optional: true,
        }
    }
}

/// 시나리오 카탈로그 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// 레지스트리 키
    pub name: String,
    /// 시나리오 종류 (install, upgrade)
    pub kind: ScenarioKind,
    /// 매니페스트 템플릿 경로
    pub manifest_template: PathBuf,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_path(target: &mut PathBuf, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = PathBuf::from(val);
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_words(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split_whitespace().map(str::to_owned).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = ClusterprobeConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.tunnel.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.tunnel.settle_secs, 5);
        assert!(config.runner.reconcile_before_upgrade);
        assert_eq!(config.conformance.mode, "lite");
        assert!(config.infrastructures.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        ClusterprobeConfig::default().validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = ClusterprobeConfig::parse("").unwrap();
        assert_eq!(config.readiness.expected_nodes, 4);
        assert_eq!(config.binary.build_command, vec!["make", "build"]);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = ClusterprobeConfig::parse("[tunnel]\nsettle_secs = 1\n").unwrap();
        assert_eq!(config.tunnel.settle_secs, 1);
        assert_eq!(config.tunnel.listen_addr, "127.0.0.1:8080");
    }

    #[test]
    fn parses_catalog_entries() {
        let config = ClusterprobeConfig::parse(
            r#"
[[infrastructures]]
name = "aws_default"
provider = "aws"
provisioning_path = "/work/tf/aws"

[[scenarios]]
name = "upgrade_containerd"
kind = "upgrade"
manifest_template = "manifests/upgrade.yaml"
"#,
        )
        .unwrap();
        assert_eq!(config.infrastructures.len(), 1);
        assert_eq!(config.scenarios[0].kind, ScenarioKind::Upgrade);
    }

    #[test]
    fn invalid_toml_returns_parse_error() {
        let err = ClusterprobeConfig::parse("[tunnel\nsettle_secs = 1").unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn rejects_bad_listen_addr() {
        let mut config = ClusterprobeConfig::default();
        config.tunnel.listen_addr = "localhost".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tunnel.listen_addr"));
    }

    #[test]
    fn rejects_zero_expected_nodes() {
        let mut config = ClusterprobeConfig::default();
        config.readiness.expected_nodes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_timeout_shorter_than_poll_interval() {
        let mut config = ClusterprobeConfig::default();
        config.readiness.poll_interval_secs = 30;
        config.readiness.timeout_secs = 10;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("readiness.timeout_secs"));
    }

    #[test]
    fn rejects_unknown_conformance_mode() {
        let mut config = ClusterprobeConfig::default();
        config.conformance.mode = "quick".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_log_format() {
        let mut config = ClusterprobeConfig::default();
        config.general.log_format = "xml".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial_test::serial]
    fn env_override_string_and_number() {
        unsafe {
            std::env::set_var("CLUSTERPROBE_TUNNEL_LISTEN_ADDR", "127.0.0.1:9191");
            std::env::set_var("CLUSTERPROBE_READINESS_EXPECTED_NODES", "6");
        }
        let mut config = ClusterprobeConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("CLUSTERPROBE_TUNNEL_LISTEN_ADDR");
            std::env::remove_var("CLUSTERPROBE_READINESS_EXPECTED_NODES");
        }
        assert_eq!(config.tunnel.listen_addr, "127.0.0.1:9191");
        assert_eq!(config.readiness.expected_nodes, 6);
    }

    #[test]
    #[serial_test::serial]
    fn env_override_ignores_unparseable_values() {
        unsafe { std::env::set_var("CLUSTERPROBE_RUNNER_RECONCILE_BEFORE_UPGRADE", "maybe") };
        let mut config = ClusterprobeConfig::default();
        config.apply_env_overrides();
        unsafe { std::env::remove_var("CLUSTERPROBE_RUNNER_RECONCILE_BEFORE_UPGRADE") };
        assert!(config.runner.reconcile_before_upgrade);
    }

    #[test]
    #[serial_test::serial]
    fn env_override_build_command_splits_words() {
        unsafe { std::env::set_var("CLUSTERPROBE_BINARY_BUILD_COMMAND", "cargo  build --release") };
        let mut config = ClusterprobeConfig::default();
        config.apply_env_overrides();
        unsafe { std::env::remove_var("CLUSTERPROBE_BINARY_BUILD_COMMAND") };
        assert_eq!(config.binary.build_command, vec!["cargo", "build", "--release"]);
    }
}
