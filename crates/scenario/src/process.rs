//! 외부 프로세스 실행 추상화
//!
//! 관리 바이너리, 빌드 명령, kubectl, sonobuoy 등 모든 외부 프로세스 호출은
//! [`Executor`] trait을 거칩니다. 운영 환경은 [`ProcessExecutor`]를,
//! 테스트는 호출을 기록하는 mock 구현을 사용합니다.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tracing::debug;

use crate::error::ProcessError;

/// 에러 메시지에 포함할 stderr 최대 길이 (바이트)
const STDERR_TAIL_BYTES: usize = 2048;

/// 실행할 명령 기술자
///
/// 상태를 갖지 않으며, 같은 기술자로 여러 번 [`tokio::process::Command`]를 만들 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// 실행 파일 경로
    pub program: PathBuf,
    /// 인자 목록
    pub args: Vec<String>,
    /// 추가 환경변수
    pub envs: Vec<(String, String)>,
    /// 작업 디렉토리
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    /// 인자 없는 명령을 생성합니다.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    /// 인자 하나를 추가합니다.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// 여러 인자를 추가합니다.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// 환경변수를 추가합니다.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// 작업 디렉토리를 지정합니다.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// 로그/에러 메시지용 프로그램 이름
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// 환경변수 값을 조회합니다 (마지막 설정이 우선).
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 사람이 읽을 수 있는 명령줄 표현
    pub fn display(&self) -> String {
        let mut line = self.program_name();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// tokio 명령으로 변환합니다. stdin은 닫혀 있습니다.
    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null());
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// 완료된 프로세스의 출력
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// 외부 프로세스를 끝까지 실행하는 추상화
///
/// 0이 아닌 종료 코드는 [`ProcessError::Exit`]로 반환됩니다.
pub trait Executor: Send + Sync + 'static {
    /// 명령을 실행하고 종료를 기다립니다.
    fn run(
        &self,
        spec: &CommandSpec,
    ) -> impl Future<Output = Result<CommandOutput, ProcessError>> + Send;
}

impl<E: Executor> Executor for Arc<E> {
    fn run(
        &self,
        spec: &CommandSpec,
    ) -> impl Future<Output = Result<CommandOutput, ProcessError>> + Send {
        (**self).run(spec)
    }
}

/// tokio 프로세스 기반 운영 구현
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        debug!(command = %spec.display(), "spawning process");

        let output = spec
            .to_command()
            .output()
            .await
            .map_err(|source| ProcessError::Spawn {
                program: spec.program_name(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ProcessError::Exit {
                program: spec.program_name(),
                status: output.status.to_string(),
                stderr: tail(&stderr, STDERR_TAIL_BYTES).trim().to_owned(),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

/// 문자열의 마지막 `max` 바이트를 문자 경계에 맞춰 반환합니다.
pub(crate) fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

/// 호출을 기록하는 테스트용 Executor
///
/// 응답은 생성 시 지정한 클로저가 결정합니다.
#[cfg(test)]
pub(crate) struct MockExecutor {
    calls: std::sync::Mutex<Vec<CommandSpec>>,
    responder: Box<dyn Fn(&CommandSpec) -> Result<CommandOutput, ProcessError> + Send + Sync>,
}

#[cfg(test)]
impl MockExecutor {
    /// 모든 호출에 빈 출력으로 성공합니다.
    pub(crate) fn succeeding() -> Self {
        Self::with_responder(|_| Ok(CommandOutput::default()))
    }

    pub(crate) fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&CommandSpec) -> Result<CommandOutput, ProcessError> + Send + Sync + 'static,
    {
        Self {
            calls: std::sync::Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    pub(crate) fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn stdout(text: &str) -> Result<CommandOutput, ProcessError> {
        Ok(CommandOutput {
            stdout: text.to_owned(),
            stderr: String::new(),
        })
    }

    pub(crate) fn exit(spec: &CommandSpec, stderr: &str) -> Result<CommandOutput, ProcessError> {
        Err(ProcessError::Exit {
            program: spec.program_name(),
            status: "exit status: 1".to_owned(),
            stderr: stderr.to_owned(),
        })
    }
}

#[cfg(test)]
impl Executor for MockExecutor {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        self.calls.lock().expect("calls lock").push(spec.clone());
        (self.responder)(spec)
    }
}
