//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 실행 엔진은 이 상수로 `metrics::counter!()`, `metrics::histogram!()`을 호출합니다.
//! exporter는 포함하지 않으며, 레코더는 임베딩하는 쪽에서 설치합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `clusterprobe_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 오퍼레이션 종류 레이블 키 (install, reconcile, upgrade)
pub const LABEL_OPERATION: &str = "operation";

/// 시나리오 이름 레이블 키
pub const LABEL_SCENARIO: &str = "scenario";

/// 인프라 이름 레이블 키
pub const LABEL_INFRA: &str = "infra";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 에러 분류 레이블 키
pub const LABEL_ERROR_KIND: &str = "error_kind";

/// 결과 레이블 값
pub const RESULT_SUCCESS: &str = "success";
pub const RESULT_FAILURE: &str = "failure";

// ─── 실행 엔진 메트릭 ──────────────────────────────────────────────

/// 실행된 관리 바이너리 오퍼레이션 수 (counter, label: operation, result)
pub const OPERATIONS_TOTAL: &str = "clusterprobe_operations_total";

/// 오퍼레이션 소요 시간 (histogram, 초, label: operation)
pub const OPERATION_DURATION_SECONDS: &str = "clusterprobe_operation_duration_seconds";

/// 완료된 시나리오 수 (counter, label: scenario, infra, result)
pub const SCENARIOS_TOTAL: &str = "clusterprobe_scenarios_total";

/// 시나리오 전체 소요 시간 (histogram, 초, label: scenario)
pub const SCENARIO_DURATION_SECONDS: &str = "clusterprobe_scenario_duration_seconds";

/// 실패한 시나리오 수 (counter, label: error_kind)
pub const SCENARIO_FAILURES_TOTAL: &str = "clusterprobe_scenario_failures_total";

/// 노드 준비 상태 폴링 횟수 (counter)
pub const READINESS_POLLS_TOTAL: &str = "clusterprobe_readiness_polls_total";

/// 노드 준비까지 걸린 시간 (histogram, 초)
pub const READINESS_WAIT_SECONDS: &str = "clusterprobe_readiness_wait_seconds";

/// 클러스터 클라이언트 재시도 횟수 (counter)
pub const CLIENT_RETRIES_TOTAL: &str = "clusterprobe_client_retries_total";

/// 생성된 아티팩트 수 (counter, label: scenario)
pub const GENERATED_ARTIFACTS_TOTAL: &str = "clusterprobe_generated_artifacts_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        OPERATIONS_TOTAL,
        "Management binary operations executed, by kind and result"
    );
    describe_histogram!(
        OPERATION_DURATION_SECONDS,
        "Duration of a single management binary operation in seconds"
    );
    describe_counter!(SCENARIOS_TOTAL, "Scenario runs completed, by result");
    describe_histogram!(
        SCENARIO_DURATION_SECONDS,
        "End-to-end scenario duration in seconds"
    );
    describe_counter!(
        SCENARIO_FAILURES_TOTAL,
        "Failed scenario runs, by error kind"
    );
    describe_counter!(READINESS_POLLS_TOTAL, "Node readiness polls issued");
    describe_histogram!(
        READINESS_WAIT_SECONDS,
        "Time until all expected nodes reported Ready, in seconds"
    );
    describe_counter!(
        CLIENT_RETRIES_TOTAL,
        "Cluster client calls retried after a transient error"
    );
    describe_counter!(
        GENERATED_ARTIFACTS_TOTAL,
        "Generated test functions or CI job descriptors"
    );
}
