//! 에러 타입 -- 도메인별 에러 정의

/// clusterprobe 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 시나리오/인프라 검증 에러
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// 레지스트리에 등록되지 않은 이름
    #[error("unknown {kind} '{name}'")]
    NotFound {
        /// 조회 대상 종류 ("scenario", "infrastructure")
        kind: &'static str,
        /// 조회한 이름
        name: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 시나리오 실행/생성 전에 검출되는 검증 에러
///
/// 모두 부수 효과(바이너리 실행, 렌더링) 이전에 반환됩니다.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// 버전 문자열 형식 오류
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// 시나리오 종류에 맞지 않는 버전 개수
    #[error("scenario '{scenario}' expects {expected} version(s), got {actual}")]
    VersionCount {
        scenario: String,
        expected: String,
        actual: usize,
    },

    /// 인프라 또는 버전이 바인딩되지 않음
    #[error("scenario '{scenario}' is not bound: missing {missing}")]
    NotBound {
        scenario: String,
        missing: &'static str,
    },

    /// 식별자로 쓸 수 없는 이름
    #[error("invalid {kind} name '{name}': only [A-Za-z0-9_.-] allowed")]
    InvalidName { kind: &'static str, name: String },

    /// 레지스트리 중복 등록
    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },
}
