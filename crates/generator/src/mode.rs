//! 생성 모드

use std::fmt;
use std::str::FromStr;

use crate::error::GenerateError;

/// 생성 결과물 종류. 한 번의 호출에서 하나만 선택합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorMode {
    /// `#[tokio::test]` 함수가 담긴 Rust 소스
    Source,
    /// CI 작업 기술자 YAML 목록
    Descriptor,
}

impl GeneratorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Descriptor => "descriptor",
        }
    }
}

impl fmt::Display for GeneratorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratorMode {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" => Ok(Self::Source),
            "descriptor" => Ok(Self::Descriptor),
            _ => Err(GenerateError::UnknownMode(s.to_owned())),
        }
    }
}
