//! 노드 준비 상태 대기
//!
//! 기대 노드 수만큼 노드가 보이고 모두 `Ready`가 될 때까지 폴링합니다.
//! 제한 시간 전에는 실패하지 않고, 제한 시간을 넘겨 대기하지도 않습니다.
//! 개별 폴링은 남은 시간으로 타임아웃이 걸립니다.

use std::time::Duration;

use clusterprobe_core::config::ReadinessConfig;
use clusterprobe_core::metrics as m;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{ClusterClient, NodeStatus};
use crate::error::ScenarioError;

/// 준비 대기 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessOptions {
    pub expected_nodes: usize,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl From<&ReadinessConfig> for ReadinessOptions {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            expected_nodes: config.expected_nodes,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

fn all_ready(nodes: &[NodeStatus], expected: usize) -> bool {
    nodes.len() >= expected && nodes.iter().all(|n| n.ready)
}

/// 모든 노드가 준비될 때까지 기다립니다.
///
/// 일시적 클라이언트 오류는 기록만 하고 계속 폴링하며, 치명적 오류는 즉시 반환합니다.
pub async fn wait_for_nodes_ready<C: ClusterClient>(
    client: &C,
    options: &ReadinessOptions,
) -> Result<Vec<NodeStatus>, ScenarioError> {
    let started = Instant::now();
    let deadline = started + options.timeout;
    let mut last_seen: Vec<NodeStatus> = Vec::new();
    let mut last_error: Option<String> = None;

    info!(
        expected_nodes = options.expected_nodes,
        timeout_secs = options.timeout.as_secs(),
        "waiting for nodes to become ready"
    );

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            let ready = last_seen.iter().filter(|n| n.ready).count();
            warn!(
                ready,
                expected = options.expected_nodes,
                "nodes did not become ready in time"
            );
            return Err(ScenarioError::ReadinessTimeout {
                expected: options.expected_nodes,
                ready,
                observed: last_seen.len(),
                elapsed_secs: started.elapsed().as_secs(),
                last_error,
            });
        }

        metrics::counter!(m::READINESS_POLLS_TOTAL).increment(1);
        match tokio::time::timeout(remaining, client.node_statuses()).await {
            Ok(Ok(nodes)) => {
                if all_ready(&nodes, options.expected_nodes) {
                    let waited = started.elapsed();
                    metrics::histogram!(m::READINESS_WAIT_SECONDS).record(waited.as_secs_f64());
                    info!(
                        nodes = nodes.len(),
                        waited_secs = waited.as_secs(),
                        "all nodes are ready"
                    );
                    return Ok(nodes);
                }
                debug!(
                    ready = nodes.iter().filter(|n| n.ready).count(),
                    observed = nodes.len(),
                    expected = options.expected_nodes,
                    "nodes not ready yet"
                );
                last_seen = nodes;
                last_error = None;
            }
            Ok(Err(e)) if e.is_transient() => {
                debug!(error = %e, "node poll failed, will retry");
                last_error = Some(e.to_string());
            }
            Ok(Err(e)) => return Err(ScenarioError::Client(e)),
            Err(_elapsed) => {
                last_error = Some("node poll timed out".to_owned());
            }
        }

        let wake = (Instant::now() + options.poll_interval).min(deadline);
        tokio::time::sleep_until(wake).await;
    }
}
