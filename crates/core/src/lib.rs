//! clusterprobe 공통 크레이트
//!
//! 실행 엔진(`clusterprobe-scenario`)과 생성기(`clusterprobe-generator`)가 공유하는
//! 시나리오/인프라 모델, 레지스트리, 에러, 설정을 제공합니다.

pub mod config;
pub mod error;
pub mod infra;
pub mod metrics;
pub mod registry;
pub mod scenario;
pub mod version;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, CoreError, ValidationError};

// 설정
pub use config::ClusterprobeConfig;

// 도메인 타입
pub use infra::{Infrastructure, Provider};
pub use registry::Registry;
pub use scenario::{BoundScenario, Scenario, ScenarioKind, titleize};
pub use version::ClusterVersion;
