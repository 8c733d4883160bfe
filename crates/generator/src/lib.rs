//! clusterprobe 생성기
//!
//! 등록된 시나리오/인프라 조합으로부터 두 가지 아티팩트를 만듭니다.
//!
//! - [`GeneratorMode::Source`]: `clusterprobe_scenario::run_registered`를 호출하는
//!   `#[tokio::test]` 함수 소스
//! - [`GeneratorMode::Descriptor`]: CI 작업 기술자 YAML 목록
//!
//! 모든 렌더링은 순수 함수이며 같은 입력에 대해 같은 바이트를 출력합니다.

pub mod artifact;
pub mod descriptor;
pub mod error;
pub mod mode;
pub mod source;
pub mod title;

pub use artifact::{GenerateRequest, Generator, write_artifact};
pub use descriptor::{CiJob, EnvVar, render_descriptors};
pub use error::GenerateError;
pub use mode::GeneratorMode;
pub use source::{SourceCase, render_source};
pub use title::{job_name, test_title};
