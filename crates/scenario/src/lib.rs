//! clusterprobe 시나리오 실행 엔진
//!
//! 관리 바이너리로 클러스터를 설치/업그레이드하고, 프록시 터널을 연 뒤
//! 노드 준비 상태, 클라우드 프로바이더 기능, 컨포먼스를 검증합니다.
//!
//! # 구성
//!
//! - [`runner`]: 버전 순차 오퍼레이션 실행
//! - [`tunnel`]: 프록시 터널 수명 관리 ([`TunnelGuard`], [`with_tunnel`])
//! - [`readiness`], [`conformance`], [`cloud_provider`]: 검증 단계
//! - [`driver`]: 전체 시나리오 실행 ([`ScenarioDriver`])
//! - [`harness`]: 생성된 테스트 코드의 진입점 ([`run_registered`])

pub mod binary;
pub mod client;
pub mod cloud_provider;
pub mod conformance;
pub mod driver;
pub mod error;
pub mod harness;
pub mod kubectl;
pub mod manifest;
pub mod process;
pub mod readiness;
pub mod runner;
pub mod tunnel;
pub mod validator;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ProcessError, ScenarioError};

// 실행
pub use driver::{DriverSettings, OperationRecord, ScenarioDriver, ScenarioReport};
pub use harness::run_registered;
pub use process::{CommandOutput, CommandSpec, Executor, ProcessExecutor};
pub use runner::{BinarySettings, OperationKind, OperationPlan, OperationRunner};
pub use tunnel::{TunnelExit, TunnelGuard, TunnelOptions, TunnelSession, open_tunnel, with_tunnel};

// 검증
pub use client::{ClientError, ClusterClient, NodeStatus, RetryingClient};
pub use cloud_provider::{CloudProviderCheck, LoadBalancerCheck, run_with_cleanup};
pub use conformance::{ConformanceMode, ConformanceReport, ConformanceRunner, Sonobuoy};
pub use kubectl::Kubectl;
pub use readiness::{ReadinessOptions, wait_for_nodes_ready};
pub use validator::{ClusterValidator, ValidationReport, ValidationTarget, Validator};
