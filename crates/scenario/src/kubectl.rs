//! kubectl 기반 [`ClusterClient`] 구현
//!
//! 모든 호출은 `HTTPS_PROXY`를 터널 주소로, `KUBECONFIG`를 관리 바이너리가 출력한
//! kubeconfig로 설정합니다. kubectl 실패는 stderr 내용으로 일시적/치명적 오류를 구분합니다.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::binary::{Invocation, Subcommand};
use crate::client::{ClientError, ClusterClient, NodeStatus};
use crate::error::{ProcessError, ScenarioError};
use crate::manifest::write_temp_file;
use crate::process::{CommandSpec, Executor};

/// 프록시/네트워크 문제로 간주하는 stderr 패턴 (소문자)
const TRANSIENT_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "proxyconnect",
    "i/o timeout",
    "tls handshake timeout",
    "unexpected eof",
    "unable to connect to the server",
    "serviceunavailable",
    "the server is currently unable to handle the request",
    "etcdserver: request timed out",
];

/// kubectl 실패를 클라이언트 에러로 분류합니다.
pub fn classify_failure(err: ProcessError) -> ClientError {
    match err {
        ProcessError::Spawn { program, source } => {
            ClientError::Fatal(format!("failed to spawn '{program}': {source}"))
        }
        ProcessError::Exit { stderr, .. } => {
            let lowered = stderr.to_lowercase();
            if TRANSIENT_PATTERNS.iter().any(|p| lowered.contains(p)) {
                ClientError::Transient(stderr)
            } else {
                ClientError::Fatal(stderr)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct NodeList {
    #[serde(default)]
    items: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Node {
    metadata: Metadata,
    #[serde(default)]
    status: NodeState,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct NodeState {
    #[serde(default)]
    conditions: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(rename = "type")]
    kind: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct Service {
    #[serde(default)]
    status: ServiceState,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceState {
    #[serde(default, rename = "loadBalancer")]
    load_balancer: LoadBalancerState,
}

#[derive(Debug, Default, Deserialize)]
struct LoadBalancerState {
    #[serde(default)]
    ingress: Vec<Ingress>,
}

#[derive(Debug, Deserialize)]
struct Ingress {
    hostname: Option<String>,
    ip: Option<String>,
}

/// `kubectl get nodes -o json` 출력을 파싱합니다.
pub fn parse_node_list(json: &str) -> Result<Vec<NodeStatus>, ClientError> {
    let list: NodeList =
        serde_json::from_str(json).map_err(|e| ClientError::Decode(e.to_string()))?;
    Ok(list
        .items
        .into_iter()
        .map(|node| {
            let ready = node
                .status
                .conditions
                .iter()
                .any(|c| c.kind == "Ready" && c.status == "True");
            NodeStatus::new(node.metadata.name, ready)
        })
        .collect())
}

/// `kubectl get service -o json` 출력에서 첫 로드밸런서 주소를 꺼냅니다.
pub fn parse_service_ingress(json: &str) -> Result<Option<String>, ClientError> {
    let service: Service =
        serde_json::from_str(json).map_err(|e| ClientError::Decode(e.to_string()))?;
    Ok(service
        .status
        .load_balancer
        .ingress
        .into_iter()
        .find_map(|i| i.hostname.or(i.ip))
        .filter(|addr| !addr.is_empty()))
}

/// 관리 바이너리의 `kubeconfig` 서브커맨드 출력을 임시 파일로 저장합니다.
pub async fn fetch_kubeconfig<E: Executor>(
    executor: &E,
    invocation: &Invocation,
    work_dir: &Path,
) -> Result<NamedTempFile, ScenarioError> {
    let spec = invocation.command(Subcommand::Kubeconfig);
    let output = executor
        .run(&spec)
        .await
        .map_err(|e| ScenarioError::Client(classify_failure(e)))?;

    let file = write_temp_file(work_dir, "kubeconfig-", "", output.stdout).await?;
    debug!(path = %file.path().display(), "kubeconfig written");
    Ok(file)
}

/// 프록시를 경유하는 kubectl 클라이언트
pub struct Kubectl<E> {
    executor: E,
    kubectl: PathBuf,
    kubeconfig: PathBuf,
    proxy_url: String,
    work_dir: PathBuf,
}

impl<E: Executor> Kubectl<E> {
    pub fn new(
        executor: E,
        kubectl: impl Into<PathBuf>,
        kubeconfig: impl Into<PathBuf>,
        proxy_url: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            kubectl: kubectl.into(),
            kubeconfig: kubeconfig.into(),
            proxy_url: proxy_url.into(),
            work_dir: work_dir.into(),
        }
    }

    fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(&self.kubectl)
            .args(args)
            .env("HTTPS_PROXY", &self.proxy_url)
            .env("KUBECONFIG", self.kubeconfig.display().to_string())
    }

    async fn run(&self, spec: CommandSpec) -> Result<String, ClientError> {
        self.executor
            .run(&spec)
            .await
            .map(|out| out.stdout)
            .map_err(classify_failure)
    }
}

impl<E: Executor> ClusterClient for Kubectl<E> {
    async fn node_statuses(&self) -> Result<Vec<NodeStatus>, ClientError> {
        let stdout = self.run(self.command(["get", "nodes", "-o", "json"])).await?;
        parse_node_list(&stdout)
    }

    async fn apply(&self, manifest: &str) -> Result<(), ClientError> {
        let file = write_temp_file(&self.work_dir, "apply-", ".yaml", manifest.to_owned())
            .await
            .map_err(|e| ClientError::Fatal(format!("writing manifest file: {e}")))?;

        let path = file.path().display().to_string();
        self.run(self.command(["apply", "-f", path.as_str()])).await?;
        Ok(())
    }

    async fn load_balancer_ingress(
        &self,
        namespace: &str,
        service: &str,
    ) -> Result<Option<String>, ClientError> {
        let stdout = self
            .run(self.command(["get", "service", service, "-n", namespace, "-o", "json"]))
            .await?;
        parse_service_ingress(&stdout)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), ClientError> {
        self.run(self.command([
            "delete",
            "namespace",
            namespace,
            "--ignore-not-found",
            "--wait=true",
        ]))
        .await?;
        Ok(())
    }
}
