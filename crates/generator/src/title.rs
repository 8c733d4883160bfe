//! 결정적 테스트 제목과 CI 작업 이름
//!
//! 같은 (인프라, 시나리오, 버전) 조합은 항상 같은 이름을 만듭니다.
//!
//! | 버전 | 테스트 함수 | CI 작업 |
//! |------|-------------|---------|
//! | `1.27.5` | `test_aws_default_install_1_27_5` | `pull-aws-default-install-1.27.5` |
//! | `1.27.5`, `1.28.0` | `test_aws_default_upgrade_from_1_27_5_to_1_28_0` | `pull-aws-default-upgrade-from-1.27.5-to-1.28.0` |

/// Rust 식별자 조각으로 변환합니다.
///
/// 소문자로 바꾸고 영숫자가 아닌 문자는 `_` 하나로 합칩니다. 앞뒤 `_`는 제거합니다.
pub fn ident_fragment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// CI 작업 이름 조각으로 변환합니다. `.`은 유지하고 나머지 구분자는 `-`로 바꿉니다.
fn job_fragment(raw: &str) -> String {
    raw.chars()
        .map(|ch| match ch {
            'a'..='z' | '0'..='9' | '.' => ch,
            'A'..='Z' => ch.to_ascii_lowercase(),
            _ => '-',
        })
        .collect()
}

/// `from_<a>_to_<b>` 형태로 버전 구간을 표현합니다. 버전이 하나면 그 버전만 씁니다.
fn version_segments<F>(versions: &[&str], sep: &str, fragment: F) -> Vec<String>
where
    F: Fn(&str) -> String,
{
    match versions {
        [] => Vec::new(),
        [only] => vec![fragment(only)],
        [first, rest @ ..] => {
            let mut parts = vec!["from".to_owned(), fragment(first)];
            for v in rest {
                parts.push("to".to_owned());
                parts.push(fragment(v));
            }
            vec![parts.join(sep)]
        }
    }
}

/// 생성되는 `#[tokio::test]` 함수 이름
pub fn test_title(infra: &str, scenario: &str, versions: &[&str]) -> String {
    let mut parts = vec![
        "test".to_owned(),
        ident_fragment(infra),
        ident_fragment(scenario),
    ];
    parts.extend(version_segments(versions, "_", ident_fragment));
    parts.retain(|p| !p.is_empty());
    parts.join("_")
}

/// CI 작업 이름 (`pull-<infra>-<scenario>-from-<from>-to-<to>`)
pub fn job_name(infra: &str, scenario: &str, versions: &[&str]) -> String {
    let mut parts = vec!["pull".to_owned(), job_fragment(infra), job_fragment(scenario)];
    parts.extend(version_segments(versions, "-", job_fragment));
    parts.join("-")
}
