//! 프록시 터널 수명 관리
//!
//! 관리 바이너리의 `proxy` 서브커맨드를 백그라운드로 실행해 클러스터 제어 엔드포인트를
//! 로컬 주소로 노출합니다.
//!
//! # 수명 주기
//!
//! ```text
//! open_tunnel ──> settle (고정 지연) ──> [TCP probe] ──> 사용 ──> cancel ──> wait
//!      │                │
//!      │                └─ 프로세스가 먼저 종료되면 TunnelStart 에러
//!      └─ supervisor 태스크: child.wait() vs token.cancelled()
//! ```
//!
//! [`TunnelGuard`]는 `close()`에서 cancel-then-wait를 정확히 한 번 수행하며,
//! `close()` 없이 drop되면 취소만 트리거합니다. 자식 프로세스는 `kill_on_drop`입니다.

use std::future::Future;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ScenarioError;
use crate::process::CommandSpec;

/// TCP probe 재시도 간격
const PROBE_INTERVAL: Duration = Duration::from_millis(200);

/// 터널 옵션
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelOptions {
    /// 프록시가 listen할 로컬 주소 (`host:port`)
    pub listen_addr: String,
    /// 시작 후 고정 대기 시간
    pub settle: Duration,
    /// 고정 대기 후 TCP 연결 확인 제한 시간 (None이면 생략)
    pub probe_timeout: Option<Duration>,
}

impl TunnelOptions {
    /// 클라이언트가 `HTTPS_PROXY`로 쓸 URL
    pub fn proxy_url(&self) -> String {
        format!("http://{}", self.listen_addr)
    }
}

/// supervisor 태스크가 관찰한 프록시 종료 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelExit {
    /// 취소 신호로 종료시킴
    Stopped,
    /// 스스로 종료함
    Exited(ExitStatus),
}

type ExitHandle = JoinHandle<std::io::Result<TunnelExit>>;

/// 실행 중인 터널: 로컬 주소, 취소 토큰, 종료 대기 핸들
#[derive(Debug)]
pub struct TunnelSession {
    proxy_url: String,
    cancel: CancellationToken,
    exit: ExitHandle,
}

impl TunnelSession {
    pub fn proxy_url(&self) -> &str {
        &self.proxy_url
    }

    /// 프록시 프로세스 종료를 요청합니다. 여러 번 호출해도 안전합니다.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 프록시 프로세스 종료를 기다립니다.
    ///
    /// 취소 없이 스스로 실패 종료했거나 대기 자체가 실패하면 [`ScenarioError::TunnelExit`]입니다.
    pub async fn wait(self) -> Result<TunnelExit, ScenarioError> {
        let outcome = self
            .exit
            .await
            .map_err(|e| ScenarioError::TunnelExit(format!("supervisor task failed: {e}")))?
            .map_err(|e| ScenarioError::TunnelExit(format!("waiting for proxy failed: {e}")))?;

        match outcome {
            TunnelExit::Exited(status) if !status.success() => Err(ScenarioError::TunnelExit(
                format!("proxy exited with {status}"),
            )),
            other => Ok(other),
        }
    }
}

/// 프록시를 시작하고 로컬 주소가 사용 가능해지면 반환합니다.
///
/// 고정 대기 중 프로세스가 종료되거나 TCP probe가 실패하면 프로세스를 정리한 뒤
/// [`ScenarioError::TunnelStart`]를 반환합니다.
pub async fn open_tunnel(
    spec: &CommandSpec,
    options: &TunnelOptions,
    cancel: CancellationToken,
) -> Result<TunnelSession, ScenarioError> {
    let mut child = spec
        .to_command()
        .stdout(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ScenarioError::TunnelStart(format!("spawning '{}': {e}", spec.display())))?;

    debug!(pid = ?child.id(), command = %spec.display(), "proxy process spawned");

    let token = cancel.clone();
    let mut exit: ExitHandle = tokio::spawn(async move {
        tokio::select! {
            status = child.wait() => status.map(TunnelExit::Exited),
            () = token.cancelled() => {
                child.kill().await?;
                Ok(TunnelExit::Stopped)
            }
        }
    });

    // 고정 대기: 그 사이 프로세스가 끝나면 시작 실패
    tokio::select! {
        biased;
        early = &mut exit => {
            return Err(ScenarioError::TunnelStart(describe_early_exit(early)));
        }
        () = tokio::time::sleep(options.settle) => {}
    }

    if let Some(timeout) = options.probe_timeout {
        let probe = tokio::select! {
            biased;
            early = &mut exit => Err(describe_early_exit(early)),
            probed = probe_listen_addr(&options.listen_addr, timeout) => probed,
        };
        if let Err(reason) = probe {
            cancel.cancel();
            if !exit.is_finished() {
                let _ = (&mut exit).await;
            }
            return Err(ScenarioError::TunnelStart(reason));
        }
    }

    let proxy_url = options.proxy_url();
    info!(proxy_url = %proxy_url, "proxy tunnel is running");

    Ok(TunnelSession {
        proxy_url,
        cancel,
        exit,
    })
}

fn describe_early_exit(
    result: Result<std::io::Result<TunnelExit>, tokio::task::JoinError>,
) -> String {
    match result {
        Ok(Ok(TunnelExit::Exited(status))) => format!("proxy exited early with {status}"),
        Ok(Ok(TunnelExit::Stopped)) => "proxy cancelled before it became ready".to_owned(),
        Ok(Err(e)) => format!("waiting for proxy failed: {e}"),
        Err(e) => format!("supervisor task failed: {e}"),
    }
}

/// `listen_addr`에 TCP 연결이 될 때까지 재시도합니다.
async fn probe_listen_addr(listen_addr: &str, timeout: Duration) -> Result<(), String> {
    let attempt = async {
        loop {
            match TcpStream::connect(listen_addr).await {
                Ok(_) => return,
                Err(e) => {
                    debug!(listen_addr, error = %e, "proxy not accepting connections yet");
                    tokio::time::sleep(PROBE_INTERVAL).await;
                }
            }
        }
    };

    tokio::time::timeout(timeout, attempt).await.map_err(|_| {
        format!(
            "proxy did not accept connections on {listen_addr} within {}ms",
            timeout.as_millis()
        )
    })
}

/// 터널 스코프 자원
///
/// `close()`가 호출되지 않은 채 drop되면 취소 토큰만 트리거되고,
/// 프로세스 종료와 회수는 supervisor 태스크가 마저 처리합니다.
#[derive(Debug)]
pub struct TunnelGuard {
    session: Option<TunnelSession>,
}

impl TunnelGuard {
    /// 터널을 열고 가드로 감쌉니다.
    pub async fn open(
        spec: &CommandSpec,
        options: &TunnelOptions,
        cancel: CancellationToken,
    ) -> Result<Self, ScenarioError> {
        let session = open_tunnel(spec, options, cancel).await?;
        Ok(Self {
            session: Some(session),
        })
    }

    pub fn proxy_url(&self) -> &str {
        self.session
            .as_ref()
            .map(TunnelSession::proxy_url)
            .unwrap_or_default()
    }

    /// 취소 후 종료를 기다립니다.
    pub async fn close(mut self) -> Result<TunnelExit, ScenarioError> {
        let Some(session) = self.session.take() else {
            return Ok(TunnelExit::Stopped);
        };
        session.cancel();
        session.wait().await
    }
}

impl Drop for TunnelGuard {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            debug!(proxy_url = %session.proxy_url, "tunnel guard dropped without close, cancelling");
            session.cancel();
        }
    }
}

/// 터널을 연 상태에서 `body`를 실행하고, 결과와 관계없이 터널을 닫습니다.
///
/// 터널 종료 에러는 경고로만 기록되고 `body`의 결과가 반환됩니다.
/// `cancel`이 트리거되면 `body`를 버리고 [`ScenarioError::Cancelled`]를 반환하되,
/// 그 전에 프록시 종료를 기다립니다.
pub async fn with_tunnel<F, Fut, T>(
    spec: &CommandSpec,
    options: &TunnelOptions,
    cancel: CancellationToken,
    body: F,
) -> Result<T, ScenarioError>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<T, ScenarioError>>,
{
    let guard = match TunnelGuard::open(spec, options, cancel.clone()).await {
        Ok(guard) => guard,
        Err(_) if cancel.is_cancelled() => return Err(ScenarioError::Cancelled),
        Err(e) => return Err(e),
    };
    let result = tokio::select! {
        result = body(guard.proxy_url().to_owned()) => result,
        () = cancel.cancelled() => {
            info!("tunnel cancelled while in use");
            Err(ScenarioError::Cancelled)
        }
    };

    match guard.close().await {
        Ok(exit) => debug!(?exit, "proxy tunnel closed"),
        Err(e) => warn!(error = %e, "proxy tunnel did not exit cleanly"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn options(settle_ms: u64) -> TunnelOptions {
        TunnelOptions {
            listen_addr: "127.0.0.1:18080".to_owned(),
            settle: Duration::from_millis(settle_ms),
            probe_timeout: None,
        }
    }

    /// pid 파일을 쓰고 오래 잠드는 가짜 프록시
    fn sleeper(pid_file: &Path) -> CommandSpec {
        CommandSpec::new("sh").args([
            "-c".to_owned(),
            format!("echo $$ > {}; exec sleep 300", pid_file.display()),
        ])
    }

    fn process_alive(pid_file: &Path) -> bool {
        let pid = std::fs::read_to_string(pid_file).unwrap();
        std::process::Command::new("sh")
            .args(["-c", &format!("kill -0 {} 2>/dev/null", pid.trim())])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[test]
    fn proxy_url_uses_listen_addr() {
        assert_eq!(options(0).proxy_url(), "http://127.0.0.1:18080");
    }

    #[tokio::test]
    async fn close_cancels_and_reaps_process() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("proxy.pid");
        let cancel = CancellationToken::new();

        let guard = TunnelGuard::open(&sleeper(&pid_file), &options(200), cancel.clone())
            .await
            .unwrap();
        assert_eq!(guard.proxy_url(), "http://127.0.0.1:18080");
        assert!(process_alive(&pid_file));

        let exit = guard.close().await.unwrap();
        assert_eq!(exit, TunnelExit::Stopped);
        assert!(cancel.is_cancelled());
        assert!(!process_alive(&pid_file));
    }

    #[tokio::test]
    async fn early_exit_is_start_error() {
        let spec = CommandSpec::new("sh").args(["-c", "exit 1"]);
        let err = open_tunnel(&spec, &options(1_000), CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            ScenarioError::TunnelStart(reason) => assert!(reason.contains("exited early")),
            other => panic!("expected TunnelStart, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_start_error() {
        let spec = CommandSpec::new("/nonexistent/kubeone").arg("proxy");
        let err = open_tunnel(&spec, &options(10), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::TunnelStart(_)));
    }

    #[tokio::test]
    async fn self_exit_after_settle_is_reported_on_wait() {
        let spec = CommandSpec::new("sh").args(["-c", "sleep 0.3; exit 4"]);
        let session = open_tunnel(&spec, &options(50), CancellationToken::new())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        let err = session.wait().await.unwrap_err();
        assert!(matches!(err, ScenarioError::TunnelExit(_)));
    }

    #[tokio::test]
    async fn probe_succeeds_when_listener_is_up() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let dir = tempfile::tempdir().unwrap();

        let opts = TunnelOptions {
            listen_addr: addr.clone(),
            settle: Duration::from_millis(10),
            probe_timeout: Some(Duration::from_secs(2)),
        };
        let guard = TunnelGuard::open(
            &sleeper(&dir.path().join("pid")),
            &opts,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(guard.proxy_url(), format!("http://{addr}"));
        guard.close().await.unwrap();
    }

    #[tokio::test]
    async fn probe_timeout_stops_process() {
        let free = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = free.local_addr().unwrap().to_string();
        drop(free);

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let opts = TunnelOptions {
            listen_addr: addr,
            settle: Duration::from_millis(100),
            probe_timeout: Some(Duration::from_millis(300)),
        };
        let err = open_tunnel(&sleeper(&pid_file), &opts, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::TunnelStart(_)));
        assert!(!process_alive(&pid_file));
    }

    #[tokio::test]
    async fn drop_without_close_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let cancel = CancellationToken::new();

        let guard = TunnelGuard::open(&sleeper(&pid_file), &options(200), cancel.clone())
            .await
            .unwrap();
        drop(guard);
        assert!(cancel.is_cancelled());

        // supervisor 태스크가 프로세스를 회수할 시간
        let mut alive = true;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            alive = process_alive(&pid_file);
            if !alive {
                break;
            }
        }
        assert!(!alive);
    }

    #[tokio::test]
    async fn with_tunnel_closes_on_error_return() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let cancel = CancellationToken::new();

        let result: Result<(), ScenarioError> =
            with_tunnel(&sleeper(&pid_file), &options(200), cancel.clone(), |url| async move {
                assert_eq!(url, "http://127.0.0.1:18080");
                Err(ScenarioError::Conformance("1 test failed".to_owned()))
            })
            .await;

        assert!(matches!(result, Err(ScenarioError::Conformance(_))));
        assert!(cancel.is_cancelled());
        assert!(!process_alive(&pid_file));
    }

    #[tokio::test]
    async fn with_tunnel_cancelled_mid_body_reaps_before_return() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let result: Result<(), ScenarioError> =
            with_tunnel(&sleeper(&pid_file), &options(200), cancel.clone(), |_| async move {
                trigger.cancel();
                std::future::pending().await
            })
            .await;

        assert!(matches!(result, Err(ScenarioError::Cancelled)));
        assert!(!process_alive(&pid_file));
    }

    #[tokio::test]
    async fn with_tunnel_returns_body_value() {
        let dir = tempfile::tempdir().unwrap();
        let value = with_tunnel(
            &sleeper(&dir.path().join("pid")),
            &options(100),
            CancellationToken::new(),
            |_| async { Ok(7) },
        )
        .await
        .unwrap();
        assert_eq!(value, 7);
    }
}
