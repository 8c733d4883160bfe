//! 클러스터 버전 -- 검증된 버전 문자열
//!
//! 사용자가 입력한 원본 문자열(`v1.27.5`, `1.28`)을 그대로 보존하면서
//! `semver`로 파싱 가능한지 미리 검증합니다. 누락된 minor/patch는 0으로 채웁니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 검증된 클러스터 버전
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClusterVersion {
    raw: String,
    parsed: semver::Version,
}

impl ClusterVersion {
    /// 버전 문자열을 파싱합니다.
    ///
    /// 앞의 `v` 접두사는 허용되며, 원본 표기는 그대로 유지됩니다.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidVersion {
                version: raw.to_owned(),
                reason: "version must not be empty".to_owned(),
            });
        }

        let numeric = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let parsed = semver::Version::parse(&pad_components(numeric)).map_err(|e| {
            ValidationError::InvalidVersion {
                version: raw.to_owned(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            raw: trimmed.to_owned(),
            parsed,
        })
    }

    /// 사용자가 입력한 원본 표기
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// 정규화된 semver 값
    pub fn semver(&self) -> &semver::Version {
        &self.parsed
    }
}

/// `1.27` -> `1.27.0`, `1` -> `1.0.0` (pre-release/build 접미사는 유지)
fn pad_components(version: &str) -> String {
    let split_at = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(split_at);
    let dots = core.matches('.').count();
    let padding = match dots {
        0 => ".0.0",
        1 => ".0",
        _ => "",
    };
    format!("{core}{padding}{suffix}")
}

impl fmt::Display for ClusterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for ClusterVersion {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClusterVersion> for String {
    fn from(value: ClusterVersion) -> Self {
        value.raw
    }
}

impl std::str::FromStr for ClusterVersion {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
