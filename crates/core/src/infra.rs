//! 인프라스트럭처 핸들
//!
//! [`Infrastructure`]는 외부에서 프로비저닝된 리소스에 대한 읽기 전용 참조입니다.
//! 프로비저닝 상태 경로는 해석하지 않고 관리 바이너리에 그대로 전달합니다.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 클라우드 프로바이더
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Azure,
    Digitalocean,
    Equinixmetal,
    Gce,
    Hetzner,
    Openstack,
    Vsphere,
    /// 프로바이더 통합이 없는 베어메탈/정적 노드
    None,
}

impl Provider {
    /// 설정/CI 라벨에 사용하는 고정 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Digitalocean => "digitalocean",
            Self::Equinixmetal => "equinixmetal",
            Self::Gce => "gce",
            Self::Hetzner => "hetzner",
            Self::Openstack => "openstack",
            Self::Vsphere => "vsphere",
            Self::None => "none",
        }
    }

    /// 클라우드 컨트롤러가 `LoadBalancer` 서비스를 지원하는지 여부
    pub fn supports_load_balancer(&self) -> bool {
        !matches!(self, Self::Vsphere | Self::None)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 프로비저닝된 인프라 참조
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infrastructure {
    /// 레지스트리 키
    pub name: String,
    /// 클라우드 프로바이더
    pub provider: Provider,
    /// 프로비저닝 도구 상태 경로 (관리 바이너리에 그대로 전달)
    pub provisioning_path: PathBuf,
    /// CI 작업에 주입할 환경 변수
    #[serde(default)]
    pub environ: BTreeMap<String, String>,
    /// CI 스케줄링 라벨
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Infrastructure {
    /// 새 인프라 핸들을 생성합니다.
    pub fn new(
        name: impl Into<String>,
        provider: Provider,
        provisioning_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            provisioning_path: provisioning_path.into(),
            environ: BTreeMap::new(),
            labels: BTreeMap::new(),
        }
    }

    /// 환경 변수를 추가합니다.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environ.insert(key.into(), value.into());
        self
    }

    /// 스케줄링 라벨을 추가합니다.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// 이름 형식을 검증합니다.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("infrastructure", &self.name)
    }
}

/// 레지스트리 키와 생성 코드 식별자로 쓰이는 이름을 검증합니다.
pub(crate) fn validate_name(kind: &'static str, name: &str) -> Result<(), ValidationError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidName {
            kind,
            name: name.to_owned(),
        })
    }
}
