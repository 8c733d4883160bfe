//! 시나리오/인프라 레지스트리
//!
//! 시작 시 한 번 생성되어 참조로 전달되는 카탈로그입니다.
//! 조회 결과는 복제본이므로 바인딩이 레지스트리 상태를 바꾸지 않습니다.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::ClusterprobeConfig;
use crate::error::{CoreError, ValidationError};
use crate::infra::Infrastructure;
use crate::scenario::Scenario;

/// 이름으로 조회 가능한 시나리오/인프라 카탈로그
#[derive(Debug, Clone, Default)]
pub struct Registry {
    scenarios: BTreeMap<String, Scenario>,
    infrastructures: BTreeMap<String, Infrastructure>,
}

impl Registry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 설정의 `[[infrastructures]]`, `[[scenarios]]` 항목으로 레지스트리를 구성합니다.
    pub fn from_config(config: &ClusterprobeConfig) -> Result<Self, CoreError> {
        let mut registry = Self::new();
        for infra in &config.infrastructures {
            registry.register_infrastructure(infra.clone())?;
        }
        for entry in &config.scenarios {
            registry.register_scenario(Scenario::new(
                entry.name.clone(),
                entry.kind,
                entry.manifest_template.clone(),
            ))?;
        }
        debug!(
            scenarios = registry.scenarios.len(),
            infrastructures = registry.infrastructures.len(),
            "registry loaded"
        );
        Ok(registry)
    }

    /// 시나리오를 등록합니다. 같은 이름이 있으면 에러를 반환합니다.
    pub fn register_scenario(&mut self, scenario: Scenario) -> Result<(), CoreError> {
        scenario.validate()?;
        if self.scenarios.contains_key(scenario.name()) {
            return Err(ValidationError::Duplicate {
                kind: "scenario",
                name: scenario.name().to_owned(),
            }
            .into());
        }
        self.scenarios.insert(scenario.name().to_owned(), scenario);
        Ok(())
    }

    /// 인프라를 등록합니다. 같은 이름이 있으면 에러를 반환합니다.
    pub fn register_infrastructure(&mut self, infra: Infrastructure) -> Result<(), CoreError> {
        infra.validate()?;
        if self.infrastructures.contains_key(&infra.name) {
            return Err(ValidationError::Duplicate {
                kind: "infrastructure",
                name: infra.name.clone(),
            }
            .into());
        }
        self.infrastructures.insert(infra.name.clone(), infra);
        Ok(())
    }

    /// 바인딩되지 않은 시나리오 복제본을 반환합니다.
    pub fn scenario(&self, name: &str) -> Result<Scenario, CoreError> {
        self.scenarios
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                kind: "scenario",
                name: name.to_owned(),
            })
    }

    /// 인프라를 조회합니다.
    pub fn infrastructure(&self, name: &str) -> Result<&Infrastructure, CoreError> {
        self.infrastructures
            .get(name)
            .ok_or_else(|| CoreError::NotFound {
                kind: "infrastructure",
                name: name.to_owned(),
            })
    }

    /// 시나리오를 조회하고 인프라와 버전을 바인딩한 복제본을 반환합니다.
    pub fn bind<S: AsRef<str>>(
        &self,
        scenario: &str,
        infra: &str,
        versions: &[S],
    ) -> Result<Scenario, CoreError> {
        let mut bound = self.scenario(scenario)?;
        bound.set_infra(self.infrastructure(infra)?.clone());
        bound.set_versions(versions.iter().map(AsRef::as_ref))?;
        Ok(bound)
    }

    /// 이름순 시나리오 목록
    pub fn scenarios(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.values()
    }

    /// 이름순 인프라 목록
    pub fn infrastructures(&self) -> impl Iterator<Item = &Infrastructure> {
        self.infrastructures.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;
    use crate::infra::Provider;
    use crate::scenario::ScenarioKind;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register_infrastructure(Infrastructure::new("aws_default", Provider::Aws, "/tf/aws"))
            .unwrap();
        registry
            .register_scenario(Scenario::new(
                "upgrade_containerd",
                ScenarioKind::Upgrade,
                "upgrade.yaml",
            ))
            .unwrap();
        registry
    }

    #[test]
    fn bind_returns_bound_copy() {
        let registry = registry();
        let scenario = registry
            .bind("upgrade_containerd", "aws_default", &["1.0", "1.1"])
            .unwrap();
        assert!(scenario.bound().is_ok());

        // 레지스트리의 원본은 바인딩되지 않은 상태로 유지
        let pristine = registry.scenario("upgrade_containerd").unwrap();
        assert!(pristine.infra().is_none());
        assert!(pristine.versions().is_empty());
    }

    #[test]
    fn unknown_names_are_not_found() {
        let registry = registry();
        assert!(matches!(
            registry.bind("missing", "aws_default", &["1.0"]),
            Err(CoreError::NotFound { kind: "scenario", .. })
        ));
        assert!(matches!(
            registry.bind("upgrade_containerd", "gce", &["1.0"]),
            Err(CoreError::NotFound { kind: "infrastructure", .. })
        ));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = registry();
        let err = registry
            .register_infrastructure(Infrastructure::new("aws_default", Provider::Aws, "/x"))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate infrastructure"));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .register_scenario(Scenario::new("bad name", ScenarioKind::Install, "m.yaml"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::InvalidName { .. })));
    }

    #[test]
    fn from_config_loads_catalog() {
        let mut config = ClusterprobeConfig::default();
        config
            .infrastructures
            .push(Infrastructure::new("hetzner", Provider::Hetzner, "/tf/hz"));
        config.scenarios.push(ScenarioConfig {
            name: "install_containerd".to_owned(),
            kind: ScenarioKind::Install,
            manifest_template: "install.yaml".into(),
        });
        let registry = Registry::from_config(&config).unwrap();
        assert_eq!(registry.scenarios().count(), 1);
        assert_eq!(registry.infrastructures().next().map(|i| i.name.as_str()), Some("hetzner"));
    }

    #[test]
    fn bind_rejects_bad_versions() {
        let registry = registry();
        let err = registry
            .bind("upgrade_containerd", "aws_default", &["1.0", "one.two"])
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::InvalidVersion { .. })));
    }
}
