//! 시나리오 정의와 바인딩
//!
//! [`Scenario`]는 카탈로그에 등록된 시나리오 정의입니다. 실행 전에
//! 인프라([`Scenario::set_infra`])와 버전([`Scenario::set_versions`])이 바인딩되어야 하며,
//! [`Scenario::bound`]가 바인딩 상태를 검증합니다.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::infra::{Infrastructure, validate_name};
use crate::version::ClusterVersion;

/// 시나리오 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// 단일 버전 설치 후 검증
    Install,
    /// 첫 버전 설치 후 순차 업그레이드, 마지막 버전에서 검증
    Upgrade,
}

impl ScenarioKind {
    /// 실행 시 허용되는 최소 버전 개수
    pub fn min_versions(&self) -> usize {
        match self {
            Self::Install => 1,
            Self::Upgrade => 2,
        }
    }

    /// 실행 시 허용되는 최대 버전 개수 (`None`이면 제한 없음)
    pub fn max_versions(&self) -> Option<usize> {
        match self {
            Self::Install => Some(1),
            Self::Upgrade => None,
        }
    }

    /// 코드/CI 생성 시 요구되는 정확한 버전 개수
    pub fn generated_versions(&self) -> usize {
        match self {
            Self::Install => 1,
            Self::Upgrade => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Upgrade => "upgrade",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 카탈로그 시나리오
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    name: String,
    kind: ScenarioKind,
    manifest_template: PathBuf,
    infra: Option<Infrastructure>,
    versions: Vec<ClusterVersion>,
}

/// 실행 가능한 상태로 검증된 시나리오 뷰
#[derive(Debug, Clone, Copy)]
pub struct BoundScenario<'a> {
    pub name: &'a str,
    pub kind: ScenarioKind,
    pub manifest_template: &'a Path,
    pub infra: &'a Infrastructure,
    pub versions: &'a [ClusterVersion],
}

impl Scenario {
    /// 바인딩되지 않은 시나리오를 생성합니다.
    pub fn new(
        name: impl Into<String>,
        kind: ScenarioKind,
        manifest_template: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            manifest_template: manifest_template.into(),
            infra: None,
            versions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ScenarioKind {
        self.kind
    }

    pub fn manifest_template(&self) -> &Path {
        &self.manifest_template
    }

    pub fn infra(&self) -> Option<&Infrastructure> {
        self.infra.as_ref()
    }

    pub fn versions(&self) -> &[ClusterVersion] {
        &self.versions
    }

    /// 표시용 제목 (`upgrade_containerd` -> `UpgradeContainerd`)
    pub fn title(&self) -> String {
        titleize(&self.name)
    }

    /// 인프라를 바인딩합니다. 이전 바인딩은 대체됩니다.
    pub fn set_infra(&mut self, infra: Infrastructure) {
        self.infra = Some(infra);
    }

    /// 버전 시퀀스를 파싱하여 바인딩합니다.
    ///
    /// 형식 오류가 있으면 기존 바인딩은 변경되지 않습니다.
    pub fn set_versions<I, S>(&mut self, versions: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = versions
            .into_iter()
            .map(|v| ClusterVersion::parse(v.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.versions = parsed;
        Ok(())
    }

    /// 이름 형식을 검증합니다.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("scenario", &self.name)
    }

    /// 실행 전 바인딩 상태를 검증합니다.
    ///
    /// 인프라가 없거나, 버전이 비어 있거나, 종류에 맞지 않는 개수면 에러를 반환합니다.
    pub fn bound(&self) -> Result<BoundScenario<'_>, ValidationError> {
        self.validate()?;

        let infra = self.infra.as_ref().ok_or_else(|| ValidationError::NotBound {
            scenario: self.name.clone(),
            missing: "infrastructure",
        })?;

        if self.versions.is_empty() {
            return Err(ValidationError::NotBound {
                scenario: self.name.clone(),
                missing: "versions",
            });
        }

        let min = self.kind.min_versions();
        let count = self.versions.len();
        let too_many = self.kind.max_versions().is_some_and(|max| count > max);
        if count < min || too_many {
            let expected = match self.kind.max_versions() {
                Some(max) if max == min => min.to_string(),
                Some(max) => format!("{min}-{max}"),
                None => format!("at least {min}"),
            };
            return Err(ValidationError::VersionCount {
                scenario: self.name.clone(),
                expected,
                actual: count,
            });
        }

        Ok(BoundScenario {
            name: &self.name,
            kind: self.kind,
            manifest_template: &self.manifest_template,
            infra,
            versions: &self.versions,
        })
    }
}

/// `_`, `-`, `.` 구분자 기준으로 각 단어의 첫 글자를 대문자로 바꿔 이어 붙입니다.
pub fn titleize(name: &str) -> String {
    name.split(['_', '-', '.', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
