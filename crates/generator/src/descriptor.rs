//! CI 작업 기술자
//!
//! 시나리오/버전 조합 하나당 작업 하나를 만들고 YAML 목록으로 직렬화합니다.

use std::collections::BTreeMap;

use clusterprobe_core::Infrastructure;
use clusterprobe_core::config::GeneratorConfig;
use serde::{Deserialize, Serialize};

/// 작업 환경 변수: 실행할 테스트 함수 이름
pub const ENV_TEST_NAME: &str = "TEST_NAME";

/// 작업 환경 변수: 클라우드 프로바이더
pub const ENV_PROVIDER: &str = "PROVIDER";

/// CI 작업 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiJob {
    pub name: String,
    pub always_run: bool,
    pub optional: bool,
    pub decorate: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub spec: JobSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub containers: Vec<JobContainer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContainer {
    pub image: String,
    pub command: Vec<String>,
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl CiJob {
    /// 인프라 라벨/환경과 생성기 설정으로 작업을 만듭니다.
    ///
    /// 환경 변수는 `TEST_NAME`, `PROVIDER` 다음에 인프라 환경 변수가 키 순서로 옵니다.
    /// 인프라 환경 변수가 같은 키를 쓰면 고정 변수가 우선합니다.
    pub fn new(
        name: String,
        test_title: &str,
        infra: &Infrastructure,
        ci: &GeneratorConfig,
    ) -> Self {
        let mut env = vec![
            EnvVar::new(ENV_TEST_NAME, test_title),
            EnvVar::new(ENV_PROVIDER, infra.provider.as_str()),
        ];
        env.extend(
            infra
                .environ
                .iter()
                .filter(|(k, _)| k.as_str() != ENV_TEST_NAME && k.as_str() != ENV_PROVIDER)
                .map(|(k, v)| EnvVar::new(k.clone(), v.clone())),
        );

        Self {
            name,
            always_run: ci.always_run,
            optional: ci.optional,
            decorate: true,
            labels: infra.labels.clone(),
            spec: JobSpec {
                containers: vec![JobContainer {
                    image: ci.image.clone(),
                    command: ci.command.clone(),
                    env,
                }],
            },
        }
    }
}

/// 작업 목록을 YAML로 직렬화합니다.
pub fn render_descriptors(jobs: &[CiJob]) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(jobs)
}
