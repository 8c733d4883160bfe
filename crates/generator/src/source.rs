//! Rust 테스트 소스 렌더링
//!
//! 각 케이스는 하나의 `#[tokio::test]` 함수가 됩니다. 함수 본문은 설정에서
//! 레지스트리를 읽어 시나리오를 실행하는 `clusterprobe_scenario::run_registered` 호출뿐입니다.

use std::fmt::Write;

/// 렌더링할 테스트 함수 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCase {
    /// 함수 이름
    pub title: String,
    pub infra: String,
    pub scenario: String,
    pub versions: Vec<String>,
}

/// 생성 파일 머리말
pub const SOURCE_HEADER: &str = "// Code generated by clusterprobe generate. DO NOT EDIT.\n";

/// 테스트 함수들을 렌더링합니다. 입력이 같으면 출력도 바이트 단위로 같습니다.
pub fn render_source(cases: &[SourceCase]) -> Result<String, std::fmt::Error> {
    let mut out = String::from(SOURCE_HEADER);
    for case in cases {
        let versions = case
            .versions
            .iter()
            .map(|v| format!("{v:?}"))
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(out)?;
        writeln!(out, "#[tokio::test]")?;
        writeln!(out, "async fn {}() {{", case.title)?;
        writeln!(
            out,
            "    clusterprobe_scenario::run_registered({:?}, {:?}, &[{versions}])",
            case.infra, case.scenario
        )?;
        writeln!(out, "        .await")?;
        writeln!(
            out,
            "        .expect(\"scenario {} on {} failed\");",
            case.scenario, case.infra
        )?;
        writeln!(out, "}}")?;
    }
    Ok(out)
}
