//! 클라우드 프로바이더 기능 검증
//!
//! [`CloudProviderCheck`]는 검증에 필요한 자원을 만들고(`run`) 반드시 정리합니다(`cleanup`).
//! [`run_with_cleanup`]은 `run`의 성패와 관계없이 `cleanup`을 호출합니다.

use std::future::Future;
use std::time::Duration;

use clusterprobe_core::Provider;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::ClusterClient;
use crate::error::ScenarioError;

/// 로드밸런서 검증용 네임스페이스
pub const LOAD_BALANCER_NAMESPACE: &str = "clusterprobe-lb";

/// 로드밸런서 검증용 서비스 이름
pub const LOAD_BALANCER_SERVICE: &str = "clusterprobe-lb";

/// 클라우드 프로바이더 검증 trait
pub trait CloudProviderCheck: Send + Sync {
    /// 로그/에러에 쓰는 검증 이름
    fn name(&self) -> &'static str;

    /// 검증 자원을 만들고 기대 동작을 확인합니다.
    fn run(&self) -> impl Future<Output = Result<(), ScenarioError>> + Send;

    /// `run`이 만든 자원을 정리합니다. 만든 것이 없어도 성공해야 합니다.
    fn cleanup(&self) -> impl Future<Output = Result<(), ScenarioError>> + Send;
}

/// 검증을 실행하고 결과와 관계없이 정리합니다.
///
/// `run`이 실패하면 그 에러를 반환하고 정리 실패는 로그로만 남깁니다.
/// `run`이 성공했는데 정리가 실패하면 정리 에러를 반환합니다.
pub async fn run_with_cleanup<K: CloudProviderCheck>(check: &K) -> Result<(), ScenarioError> {
    let result = check.run().await;
    let cleanup = check.cleanup().await;

    match (result, cleanup) {
        (Ok(()), Ok(())) => {
            info!(check = check.name(), "cloud provider check passed");
            Ok(())
        }
        (Ok(()), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            warn!(
                check = check.name(),
                error = %cleanup_err,
                "cleanup after failed cloud provider check also failed"
            );
            Err(e)
        }
    }
}

/// `LoadBalancer` 서비스가 외부 주소를 할당받는지 확인하는 검증
pub struct LoadBalancerCheck<C> {
    client: C,
    provider: Provider,
    timeout: Duration,
    poll_interval: Duration,
}

impl<C: ClusterClient> LoadBalancerCheck<C> {
    pub fn new(client: C, provider: Provider, timeout: Duration) -> Self {
        Self {
            client,
            provider,
            timeout,
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn failure(&self, reason: impl Into<String>) -> ScenarioError {
        ScenarioError::CloudProvider {
            check: self.name().to_owned(),
            reason: reason.into(),
        }
    }

    fn manifest() -> String {
        format!(
            "apiVersion: v1
kind: Namespace
metadata:
  name: {ns}
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: {svc}
  namespace: {ns}
spec:
  replicas: 1
  selector:
    matchLabels:
      app: {svc}
  template:
    metadata:
      labels:
        app: {svc}
    spec:
      containers:
        - name: echo
          image: registry.k8s.io/e2e-test-images/agnhost:2.39
          args: [\"netexec\", \"--http-port=8080\"]
          ports:
            - containerPort: 8080
---
apiVersion: v1
kind: Service
metadata:
  name: {svc}
  namespace: {ns}
spec:
  type: LoadBalancer
  selector:
    app: {svc}
  ports:
    - port: 80
      targetPort: 8080
",
            ns = LOAD_BALANCER_NAMESPACE,
            svc = LOAD_BALANCER_SERVICE,
        )
    }
}

impl<C: ClusterClient> CloudProviderCheck for LoadBalancerCheck<C> {
    fn name(&self) -> &'static str {
        "load-balancer"
    }

    async fn run(&self) -> Result<(), ScenarioError> {
        if !self.provider.supports_load_balancer() {
            info!(provider = %self.provider, "provider has no load balancer integration, skipping");
            return Ok(());
        }

        self.client
            .apply(&Self::manifest())
            .await
            .map_err(|e| self.failure(format!("creating test service: {e}")))?;

        let deadline = Instant::now() + self.timeout;
        loop {
            match self
                .client
                .load_balancer_ingress(LOAD_BALANCER_NAMESPACE, LOAD_BALANCER_SERVICE)
                .await
            {
                Ok(Some(address)) => {
                    info!(provider = %self.provider, address = %address, "load balancer provisioned");
                    return Ok(());
                }
                Ok(None) => debug!("load balancer address not assigned yet"),
                Err(e) if e.is_transient() => debug!(error = %e, "load balancer poll failed"),
                Err(e) => return Err(self.failure(e.to_string())),
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(self.failure(format!(
                    "no load balancer address after {}s",
                    self.timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn cleanup(&self) -> Result<(), ScenarioError> {
        if !self.provider.supports_load_balancer() {
            return Ok(());
        }
        self.client
            .delete_namespace(LOAD_BALANCER_NAMESPACE)
            .await
            .map_err(|e| self.failure(format!("cleanup: {e}")))
    }
}
