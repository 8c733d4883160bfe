//! 생성기 에러 타입

use clusterprobe_core::{CoreError, ValidationError};

/// 코드/CI 기술자 생성 에러
///
/// 검증 에러는 렌더링 전에 반환되므로 부분 출력이 만들어지지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// 버전 개수, 버전 형식, 이름 검증 실패
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// 레지스트리 조회 실패 또는 기타 공통 에러
    #[error(transparent)]
    Registry(CoreError),

    /// 알 수 없는 생성 모드
    #[error("unknown generator mode '{0}', expected source or descriptor")]
    UnknownMode(String),

    /// 서로 다른 요청이 같은 테스트 제목으로 정규화됨
    #[error("requests '{first}' and '{second}' both generate test '{title}'")]
    DuplicateTitle {
        title: String,
        first: String,
        second: String,
    },

    /// 생성 요청 형식 오류
    #[error("invalid generate request '{input}': {reason}")]
    InvalidRequest { input: String, reason: String },

    /// 소스 렌더링 실패
    #[error("render error: {0}")]
    Render(#[from] std::fmt::Error),

    /// YAML 직렬화 실패
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// 출력 파일 쓰기 실패
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for GenerateError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => Self::Validation(e),
            other => Self::Registry(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_validation_is_flattened() {
        let err: GenerateError = CoreError::Validation(ValidationError::InvalidVersion {
            version: "x".to_owned(),
            reason: "bad".to_owned(),
        })
        .into();
        assert!(matches!(err, GenerateError::Validation(_)));
    }

    #[test]
    fn not_found_keeps_message() {
        let err: GenerateError = CoreError::NotFound {
            kind: "scenario",
            name: "missing".to_owned(),
        }
        .into();
        assert_eq!(err.to_string(), "unknown scenario 'missing'");
    }

    #[test]
    fn duplicate_title_names_both_requests() {
        let err = GenerateError::DuplicateTitle {
            title: "test_a_b_1".to_owned(),
            first: "a-x:b:1".to_owned(),
            second: "a_x:b:1".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "requests 'a-x:b:1' and 'a_x:b:1' both generate test 'test_a_b_1'"
        );
    }

    #[test]
    fn unknown_mode_display() {
        let err = GenerateError::UnknownMode("json".to_owned());
        assert!(err.to_string().contains("'json'"));
    }
}
