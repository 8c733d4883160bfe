//! 시나리오 실행 에러 타입
//!
//! [`ScenarioError`]는 실행 엔진 내부에서 발생하는 모든 에러를 표현합니다.
//! 치명적 에러는 시나리오를 즉시 종료시키며, 단계/버전/원인을 포함해
//! 재실행 없이 진단할 수 있도록 합니다. 터널 종료 에러([`ScenarioError::TunnelExit`])만
//! 로그로 남기고 전파하지 않습니다.

use clusterprobe_core::error::{CoreError, ValidationError};

use crate::client::ClientError;

/// 외부 프로세스 실행 에러
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// 프로세스 생성 실패 (바이너리 없음, 권한 등)
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// 0이 아닌 종료 코드
    #[error("'{program}' exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        /// 표준 에러 출력 끝부분
        stderr: String,
    },
}

/// 시나리오 실행 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// 실행 전 검증 실패 (바인딩 누락, 버전 개수 등)
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// 설정/레지스트리 에러
    #[error(transparent)]
    Core(CoreError),

    /// 관리 바이너리 빌드 실패
    #[error("building management binary failed: {0}")]
    Build(#[source] ProcessError),

    /// install/apply 오퍼레이션 실패
    #[error("operation #{step} ({operation} at {version}) failed: {source}")]
    Operation {
        /// 0부터 시작하는 단계 번호
        step: usize,
        /// 오퍼레이션 종류
        operation: &'static str,
        /// 대상 버전
        version: String,
        #[source]
        source: ProcessError,
    },

    /// 매니페스트 렌더링 실패
    #[error("rendering manifest '{path}' failed: {reason}")]
    Manifest { path: String, reason: String },

    /// 터널 프로세스 시작 실패
    #[error("starting tunnel failed: {0}")]
    TunnelStart(String),

    /// 터널 프로세스 종료 대기 실패 (비치명적)
    #[error("tunnel exit: {0}")]
    TunnelExit(String),

    /// 노드 준비 대기 시간 초과
    #[error(
        "nodes not ready after {elapsed_secs}s: {ready}/{expected} ready ({observed} observed){}",
        last_error.as_ref().map(|e| format!(", last error: {e}")).unwrap_or_default()
    )]
    ReadinessTimeout {
        expected: usize,
        ready: usize,
        observed: usize,
        elapsed_secs: u64,
        last_error: Option<String>,
    },

    /// 클러스터 클라이언트 에러
    #[error("cluster client error: {0}")]
    Client(#[from] ClientError),

    /// 컨포먼스 스위트 실패
    #[error("conformance failed: {0}")]
    Conformance(String),

    /// 클라우드 프로바이더 검증 실패
    #[error("cloud provider check '{check}' failed: {reason}")]
    CloudProvider { check: String, reason: String },

    /// 취소 토큰이 트리거되어 실행을 중단함
    #[error("scenario cancelled")]
    Cancelled,

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for ScenarioError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => Self::Validation(e),
            other => Self::Core(other),
        }
    }
}

impl ScenarioError {
    /// 메트릭 태그용 고정된 에러 분류명
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Core(_) => "config",
            Self::Build(_) => "build",
            Self::Operation { .. } => "operation",
            Self::Manifest { .. } => "manifest",
            Self::TunnelStart(_) => "tunnel_start",
            Self::TunnelExit(_) => "tunnel_exit",
            Self::ReadinessTimeout { .. } => "readiness_timeout",
            Self::Client(_) => "client",
            Self::Conformance(_) => "conformance",
            Self::CloudProvider { .. } => "cloud_provider",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "io",
        }
    }
}
