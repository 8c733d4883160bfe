//! 생성 요청 검증과 아티팩트 렌더링

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use clusterprobe_core::config::GeneratorConfig;
use clusterprobe_core::metrics as m;
use clusterprobe_core::{Infrastructure, Registry, ValidationError};
use tracing::{debug, info};

use crate::descriptor::{CiJob, render_descriptors};
use crate::error::GenerateError;
use crate::mode::GeneratorMode;
use crate::source::{SourceCase, render_source};
use crate::title::{job_name, test_title};

/// 생성 요청 하나: 인프라 + 시나리오 + 버전
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub infra: String,
    pub scenario: String,
    pub versions: Vec<String>,
}

impl GenerateRequest {
    pub fn new<S: Into<String>>(
        infra: impl Into<String>,
        scenario: impl Into<String>,
        versions: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            infra: infra.into(),
            scenario: scenario.into(),
            versions: versions.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for GenerateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.infra, self.scenario, self.versions.join(","))
    }
}

/// `<infra>:<scenario>:<v1>[,<v2>...]` 형식을 파싱합니다.
impl FromStr for GenerateRequest {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| GenerateError::InvalidRequest {
            input: s.to_owned(),
            reason: reason.to_owned(),
        };

        let mut parts = s.splitn(3, ':');
        let infra = parts.next().unwrap_or_default().trim();
        let scenario = parts.next().unwrap_or_default().trim();
        let versions = parts.next().unwrap_or_default();

        if infra.is_empty() || scenario.is_empty() {
            return Err(invalid("expected <infra>:<scenario>:<versions>"));
        }
        let versions: Vec<&str> = versions
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        if versions.is_empty() {
            return Err(invalid("at least one version is required"));
        }
        Ok(Self::new(infra, scenario, versions))
    }
}

/// 검증을 마친 생성 케이스
#[derive(Debug, Clone)]
struct PreparedCase {
    request: String,
    infra: Infrastructure,
    scenario: String,
    versions: Vec<String>,
    title: String,
}

impl PreparedCase {
    fn version_refs(&self) -> Vec<&str> {
        self.versions.iter().map(String::as_str).collect()
    }
}

/// 레지스트리 기반 아티팩트 생성기
pub struct Generator<'a> {
    registry: &'a Registry,
    ci: &'a GeneratorConfig,
}

impl<'a> Generator<'a> {
    pub fn new(registry: &'a Registry, ci: &'a GeneratorConfig) -> Self {
        Self { registry, ci }
    }

    /// 요청을 레지스트리에 바인딩하고 생성 가능한 버전 개수인지 확인합니다.
    fn prepare(&self, request: &GenerateRequest) -> Result<PreparedCase, GenerateError> {
        let scenario = self
            .registry
            .bind(&request.scenario, &request.infra, &request.versions)?;

        let expected = scenario.kind().generated_versions();
        let actual = scenario.versions().len();
        if actual != expected {
            return Err(ValidationError::VersionCount {
                scenario: scenario.name().to_owned(),
                expected: expected.to_string(),
                actual,
            }
            .into());
        }

        let infra = self.registry.infrastructure(&request.infra)?.clone();
        let versions: Vec<String> = scenario
            .versions()
            .iter()
            .map(|v| v.as_str().to_owned())
            .collect();
        let refs: Vec<&str> = versions.iter().map(String::as_str).collect();
        let title = test_title(&infra.name, scenario.name(), &refs);

        Ok(PreparedCase {
            request: request.to_string(),
            infra,
            scenario: scenario.name().to_owned(),
            versions,
            title,
        })
    }

    /// 모든 요청을 검증한 뒤 선택한 모드로 렌더링합니다.
    ///
    /// 요청 하나라도 검증에 실패하면 아무것도 렌더링하지 않습니다.
    pub fn generate(
        &self,
        requests: &[GenerateRequest],
        mode: GeneratorMode,
    ) -> Result<String, GenerateError> {
        let cases = requests
            .iter()
            .map(|r| self.prepare(r))
            .collect::<Result<Vec<_>, _>>()?;
        ensure_unique_titles(&cases)?;
        debug!(cases = cases.len(), mode = %mode, "generate requests validated");

        let artifact = match mode {
            GeneratorMode::Source => {
                let sources: Vec<SourceCase> = cases
                    .iter()
                    .map(|c| SourceCase {
                        title: c.title.clone(),
                        infra: c.infra.name.clone(),
                        scenario: c.scenario.clone(),
                        versions: c.versions.clone(),
                    })
                    .collect();
                render_source(&sources)?
            }
            GeneratorMode::Descriptor => {
                let jobs: Vec<CiJob> = cases
                    .iter()
                    .map(|c| {
                        let name = job_name(&c.infra.name, &c.scenario, &c.version_refs());
                        CiJob::new(name, &c.title, &c.infra, self.ci)
                    })
                    .collect();
                render_descriptors(&jobs)?
            }
        };

        for case in &cases {
            metrics::counter!(m::GENERATED_ARTIFACTS_TOTAL, m::LABEL_SCENARIO => case.scenario.clone())
                .increment(1);
        }
        info!(mode = %mode, artifacts = cases.len(), "artifacts generated");
        Ok(artifact)
    }
}

/// 생성된 함수 이름과 `TEST_NAME`이 겹치지 않도록 제목 중복을 거부합니다.
///
/// 이름 정규화로 `aws-default`와 `aws_default`는 같은 제목이 됩니다.
fn ensure_unique_titles(cases: &[PreparedCase]) -> Result<(), GenerateError> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for case in cases {
        if let Some(first) = seen.insert(&case.title, &case.request) {
            return Err(GenerateError::DuplicateTitle {
                title: case.title.clone(),
                first: first.to_owned(),
                second: case.request.clone(),
            });
        }
    }
    Ok(())
}

/// 생성 결과를 파일로 씁니다. 상위 디렉토리가 없으면 만듭니다.
pub fn write_artifact(path: &Path, artifact: &str) -> Result<(), GenerateError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, artifact)?;
    Ok(())
}
