//! 클러스터 API 클라이언트 추상화
//!
//! 준비 상태 대기와 클라우드 프로바이더 검증은 [`ClusterClient`]만 사용합니다.
//! 운영 구현은 [`crate::kubectl::Kubectl`]이며, [`RetryingClient`]로 감싸
//! 프록시 터널을 통과할 때의 일시적 오류를 흡수합니다.

use std::future::Future;
use std::time::Duration;

use clusterprobe_core::metrics as m;
use serde::Serialize;
use tracing::warn;

/// 노드 이름과 Ready 조건
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub name: String,
    pub ready: bool,
}

impl NodeStatus {
    pub fn new(name: impl Into<String>, ready: bool) -> Self {
        Self {
            name: name.into(),
            ready,
        }
    }
}

/// 클러스터 클라이언트 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// 재시도로 회복 가능한 오류 (프록시 연결 거부, 타임아웃 등)
    #[error("transient: {0}")]
    Transient(String),

    /// 재시도해도 소용없는 오류 (인증 실패, 바이너리 없음 등)
    #[error("{0}")]
    Fatal(String),

    /// 응답 디코딩 실패
    #[error("decoding response failed: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// 클러스터 API 접근 trait
///
/// # 구현체
///
/// - [`crate::kubectl::Kubectl`]: 프록시를 경유하는 kubectl 호출
/// - [`RetryingClient`]: 일시적 오류 재시도 래퍼
pub trait ClusterClient: Send + Sync {
    /// 모든 노드의 Ready 상태를 조회합니다.
    fn node_statuses(&self) -> impl Future<Output = Result<Vec<NodeStatus>, ClientError>> + Send;

    /// YAML 매니페스트를 적용합니다.
    fn apply(&self, manifest: &str) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// 서비스에 할당된 로드밸런서 주소(hostname 또는 IP)를 조회합니다.
    fn load_balancer_ingress(
        &self,
        namespace: &str,
        service: &str,
    ) -> impl Future<Output = Result<Option<String>, ClientError>> + Send;

    /// 네임스페이스와 그 안의 자원을 삭제합니다. 없으면 성공입니다.
    fn delete_namespace(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}

impl<C: ClusterClient> ClusterClient for &C {
    fn node_statuses(&self) -> impl Future<Output = Result<Vec<NodeStatus>, ClientError>> + Send {
        (**self).node_statuses()
    }

    fn apply(&self, manifest: &str) -> impl Future<Output = Result<(), ClientError>> + Send {
        (**self).apply(manifest)
    }

    fn load_balancer_ingress(
        &self,
        namespace: &str,
        service: &str,
    ) -> impl Future<Output = Result<Option<String>, ClientError>> + Send {
        (**self).load_balancer_ingress(namespace, service)
    }

    fn delete_namespace(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send {
        (**self).delete_namespace(namespace)
    }
}

/// 일시적 오류만 재시도하는 클라이언트 래퍼
///
/// 재시도 간격은 `backoff_base * attempt`로 선형 증가합니다.
pub struct RetryingClient<C> {
    inner: C,
    max_retries: u32,
    backoff_base: Duration,
}

impl<C: ClusterClient> RetryingClient<C> {
    pub fn new(inner: C, max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            inner,
            max_retries,
            backoff_base,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn with_retry<T, F, Fut>(&self, call: &str, mut operation: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = self.backoff_base * attempt;
                    warn!(
                        call,
                        attempt,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "retrying cluster client call"
                    );
                    metrics::counter!(m::CLIENT_RETRIES_TOTAL).increment(1);
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<C: ClusterClient> ClusterClient for RetryingClient<C> {
    async fn node_statuses(&self) -> Result<Vec<NodeStatus>, ClientError> {
        self.with_retry("node_statuses", || self.inner.node_statuses())
            .await
    }

    async fn apply(&self, manifest: &str) -> Result<(), ClientError> {
        self.with_retry("apply", || self.inner.apply(manifest)).await
    }

    async fn load_balancer_ingress(
        &self,
        namespace: &str,
        service: &str,
    ) -> Result<Option<String>, ClientError> {
        self.with_retry("load_balancer_ingress", || {
            self.inner.load_balancer_ingress(namespace, service)
        })
        .await
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), ClientError> {
        self.with_retry("delete_namespace", || self.inner.delete_namespace(namespace))
            .await
    }
}

#[cfg(test)]
type NodeResponses = std::collections::VecDeque<Result<Vec<NodeStatus>, ClientError>>;

/// 테스트용 Mock 클러스터 클라이언트
///
/// `node_statuses` 응답을 순서대로 소비하며, 마지막 응답은 계속 반복됩니다.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MockClusterClient {
    pub(crate) node_responses: std::sync::Mutex<NodeResponses>,
    pub(crate) ingress_after_polls: Option<usize>,
    pub(crate) ingress_polls: std::sync::atomic::AtomicUsize,
    pub(crate) fail_apply: bool,
    pub(crate) fail_delete: bool,
    pub(crate) calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockClusterClient {
    pub(crate) fn with_node_responses(
        responses: Vec<Result<Vec<NodeStatus>, ClientError>>,
    ) -> Self {
        Self {
            node_responses: std::sync::Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[cfg(test)]
impl ClusterClient for MockClusterClient {
    async fn node_statuses(&self) -> Result<Vec<NodeStatus>, ClientError> {
        self.record("node_statuses".to_owned());
        let mut responses = self.node_responses.lock().expect("responses lock");
        if responses.len() > 1 {
            responses.pop_front().unwrap_or(Ok(Vec::new()))
        } else {
            responses.front().cloned().unwrap_or(Ok(Vec::new()))
        }
    }

    async fn apply(&self, _manifest: &str) -> Result<(), ClientError> {
        self.record("apply".to_owned());
        if self.fail_apply {
            return Err(ClientError::Fatal("apply rejected".to_owned()));
        }
        Ok(())
    }

    async fn load_balancer_ingress(
        &self,
        namespace: &str,
        service: &str,
    ) -> Result<Option<String>, ClientError> {
        self.record(format!("ingress {namespace}/{service}"));
        let polls = self
            .ingress_polls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        Ok(self
            .ingress_after_polls
            .filter(|after| polls >= *after)
            .map(|_| "lb.example.com".to_owned()))
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), ClientError> {
        self.record(format!("delete {namespace}"));
        if self.fail_delete {
            return Err(ClientError::Fatal("delete rejected".to_owned()));
        }
        Ok(())
    }
}
