//! 매니페스트 템플릿 렌더링
//!
//! 템플릿의 버전 자리표시자(`{{ .VERSION }}`, `{{VERSION}}`)를 대상 버전으로 치환하고
//! 결과를 임시 파일에 씁니다. 임시 파일은 [`RenderedManifest`]가 drop될 때 삭제됩니다.

use std::io::Write;
use std::path::Path;

use clusterprobe_core::ClusterVersion;
use tempfile::NamedTempFile;

use crate::error::ScenarioError;

const PLACEHOLDER: &str = "VERSION";

/// 렌더링된 매니페스트 임시 파일
#[derive(Debug)]
pub struct RenderedManifest {
    file: NamedTempFile,
    version: String,
}

impl RenderedManifest {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// 템플릿 문자열의 버전 자리표시자를 치환합니다.
///
/// `{{ ... }}` 안에 `VERSION` 이외의 이름이 있으면 에러입니다.
pub fn render_template(template: &str, version: &str) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| "unterminated placeholder".to_owned())?;
        let name = after[..end].trim();
        let name = name.strip_prefix('.').unwrap_or(name).trim();
        if name != PLACEHOLDER {
            return Err(format!("unknown placeholder '{name}'"));
        }
        out.push_str(version);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// 템플릿 파일을 읽어 `work_dir` 아래 임시 파일로 렌더링합니다.
pub async fn render_manifest(
    template_path: &Path,
    version: &ClusterVersion,
    work_dir: &Path,
) -> Result<RenderedManifest, ScenarioError> {
    let manifest_err = |reason: String| ScenarioError::Manifest {
        path: template_path.display().to_string(),
        reason,
    };

    let template = tokio::fs::read_to_string(template_path)
        .await
        .map_err(|e| manifest_err(e.to_string()))?;
    let rendered = render_template(&template, version.as_str()).map_err(manifest_err)?;

    let file = write_temp_file(work_dir, "manifest-", ".yaml", rendered).await?;

    Ok(RenderedManifest {
        file,
        version: version.as_str().to_owned(),
    })
}

/// `dir` 아래 임시 파일을 만들고 `contents`를 씁니다. 없는 디렉토리는 만듭니다.
///
/// 파일 생성과 쓰기는 블로킹 스레드 풀에서 수행합니다.
pub(crate) async fn write_temp_file(
    dir: &Path,
    prefix: &'static str,
    suffix: &'static str,
    contents: String,
) -> std::io::Result<NamedTempFile> {
    tokio::fs::create_dir_all(dir).await?;
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(&dir)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(file)
    })
    .await
    .map_err(std::io::Error::other)?
}
