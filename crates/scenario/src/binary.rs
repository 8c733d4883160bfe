//! 관리 바이너리 호출 기술자
//!
//! [`Invocation`]은 바이너리 경로, 프로비저닝 상태 경로, 자격 증명 파일,
//! verbose 플래그를 묶어 서브커맨드별 [`CommandSpec`]을 만듭니다.
//! 버전마다 매니페스트가 달라지므로 단계마다 새로 만들어 씁니다.

use std::path::{Path, PathBuf};

use clusterprobe_core::Infrastructure;

use crate::process::CommandSpec;

/// 관리 바이너리 서브커맨드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand<'a> {
    /// 클러스터를 매니페스트에 맞게 생성/조정
    Apply,
    /// 제어 엔드포인트로 향하는 HTTPS 프록시 터널
    Proxy { listen_addr: &'a str },
    /// 관리자 kubeconfig 출력
    Kubeconfig,
}

impl Subcommand<'_> {
    /// 서브커맨드 이름
    pub fn name(&self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Proxy { .. } => "proxy",
            Self::Kubeconfig => "kubeconfig",
        }
    }
}

/// 관리 바이너리 호출 기술자
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    binary: PathBuf,
    manifest: PathBuf,
    provisioning_path: PathBuf,
    environ: Vec<(String, String)>,
    verbose: bool,
    credentials: Option<PathBuf>,
}

impl Invocation {
    /// 인프라의 프로비저닝 경로와 환경변수를 그대로 넘기는 기술자를 만듭니다.
    pub fn new(
        binary: impl Into<PathBuf>,
        manifest: impl Into<PathBuf>,
        infra: &Infrastructure,
    ) -> Self {
        Self {
            binary: binary.into(),
            manifest: manifest.into(),
            provisioning_path: infra.provisioning_path.clone(),
            environ: infra
                .environ
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            verbose: false,
            credentials: None,
        }
    }

    /// `-v` 플래그를 설정합니다.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// 자격 증명 파일을 지정합니다. 빈 경로는 무시합니다.
    pub fn credentials(mut self, path: Option<&Path>) -> Self {
        self.credentials = path
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    /// 서브커맨드에 대한 실행 명령을 만듭니다.
    pub fn command(&self, subcommand: Subcommand<'_>) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.binary)
            .arg(subcommand.name())
            .arg("--manifest")
            .arg(self.manifest.display().to_string())
            .arg("--tfjson")
            .arg(self.provisioning_path.display().to_string());

        match subcommand {
            Subcommand::Apply => {
                spec = spec.arg("--auto-approve");
            }
            Subcommand::Proxy { listen_addr } => {
                spec = spec.arg("--listen").arg(listen_addr);
            }
            Subcommand::Kubeconfig => {}
        }

        if self.verbose {
            spec = spec.arg("-v");
        }
        if let Some(credentials) = &self.credentials {
            spec = spec
                .arg("--credentials")
                .arg(credentials.display().to_string());
        }

        for (key, value) in &self.environ {
            spec = spec.env(key, value);
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterprobe_core::Provider;

    fn infra() -> Infrastructure {
        Infrastructure::new("aws_default", Provider::Aws, "/tf/aws.json")
            .with_env("AWS_REGION", "eu-west-3")
    }

    #[test]
    fn apply_command_has_manifest_tfjson_and_auto_approve() {
        let inv = Invocation::new("dist/kubeone", "/tmp/m.yaml", &infra());
        let spec = inv.command(Subcommand::Apply);
        assert_eq!(
            spec.display(),
            "dist/kubeone apply --manifest /tmp/m.yaml --tfjson /tf/aws.json --auto-approve"
        );
        assert_eq!(spec.env_value("AWS_REGION"), Some("eu-west-3"));
    }

    #[test]
    fn verbose_and_credentials_are_appended() {
        let inv = Invocation::new("kubeone", "m.yaml", &infra())
            .verbose(true)
            .credentials(Some(Path::new("/secrets/creds.yaml")));
        let args = inv.command(Subcommand::Apply).args;
        assert!(args.contains(&"-v".to_owned()));
        let idx = args.iter().position(|a| a == "--credentials").unwrap();
        assert_eq!(args[idx + 1], "/secrets/creds.yaml");
    }

    #[test]
    fn empty_credentials_path_is_ignored() {
        let inv = Invocation::new("kubeone", "m.yaml", &infra()).credentials(Some(Path::new("")));
        let args = inv.command(Subcommand::Apply).args;
        assert!(!args.contains(&"--credentials".to_owned()));
    }

    #[test]
    fn proxy_command_carries_listen_address() {
        let inv = Invocation::new("kubeone", "m.yaml", &infra());
        let spec = inv.command(Subcommand::Proxy {
            listen_addr: "127.0.0.1:8080",
        });
        assert_eq!(spec.args[0], "proxy");
        assert!(spec.display().ends_with("--listen 127.0.0.1:8080"));
        assert!(!spec.args.contains(&"--auto-approve".to_owned()));
    }

    #[test]
    fn kubeconfig_command_has_no_extra_flags() {
        let inv = Invocation::new("kubeone", "m.yaml", &infra());
        let spec = inv.command(Subcommand::Kubeconfig);
        assert_eq!(spec.args.len(), 5);
        assert_eq!(spec.args[0], "kubeconfig");
    }
}
