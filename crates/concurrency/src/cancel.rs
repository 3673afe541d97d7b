//! Three-level cancellation (§4.2.3, §5): `stop`, `stop_fast`, `quit`,
//! escalating from graceful drain to immediate abort. In the reference these
//! are process-wide globals set by signal handlers; here they are a context
//! value threaded into every worker (§9 "global mutable state").

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct CancelFlags {
    inner: Arc<Inner>,
}

struct Inner {
    stop: AtomicBool,
    stop_fast: AtomicBool,
    quit: AtomicBool,
    /// Cancelled the instant `stop_fast` or `quit` is set, so blocking
    /// primitives (queue receive, semaphore acquire via `select!`) wake
    /// immediately instead of waiting for their next poll.
    fast_token: CancellationToken,
}

impl Default for CancelFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelFlags {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                stop: AtomicBool::new(false),
                stop_fast: AtomicBool::new(false),
                quit: AtomicBool::new(false),
                fast_token: CancellationToken::new(),
            }),
        }
    }

    /// First signal: drain in-flight work, stop enqueuing new work.
    pub fn request_stop(&self) {
        self.inner.stop.store(true, Ordering::SeqCst);
    }

    /// Second signal: broadcast `STOP` to every queue, wait for pool exit.
    pub fn request_stop_fast(&self) {
        self.inner.stop.store(true, Ordering::SeqCst);
        self.inner.stop_fast.store(true, Ordering::SeqCst);
        self.inner.fast_token.cancel();
    }

    /// Third signal: return immediately with a fatal code.
    pub fn request_quit(&self) {
        self.inner.stop.store(true, Ordering::SeqCst);
        self.inner.stop_fast.store(true, Ordering::SeqCst);
        self.inner.quit.store(true, Ordering::SeqCst);
        self.inner.fast_token.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.inner.stop.load(Ordering::SeqCst)
    }

    pub fn is_stop_fast_requested(&self) -> bool {
        self.inner.stop_fast.load(Ordering::SeqCst)
    }

    pub fn is_quit_requested(&self) -> bool {
        self.inner.quit.load(Ordering::SeqCst)
    }

    /// Cancelled once `stop_fast` or `quit` is requested; pass to `select!`
    /// alongside any blocking wait so it wakes immediately.
    pub fn fast_stop_token(&self) -> CancellationToken {
        self.inner.fast_token.clone()
    }
}

/// Installs `SIGINT`/`SIGTERM` handlers that escalate `stop -> stop_fast ->
/// quit` on successive signals, mirroring pgcopydb's own handler escalation.
pub fn install_signal_handlers(flags: CancelFlags) {
    tokio::spawn(async move {
        loop {
            wait_for_signal().await;
            if !flags.is_stop_requested() {
                tracing::info!("received interrupt, draining in-flight work");
                flags.request_stop();
            } else if !flags.is_stop_fast_requested() {
                tracing::warn!("received second interrupt, stopping fast");
                flags.request_stop_fast();
            } else {
                tracing::error!("received third interrupt, quitting immediately");
                flags.request_quit();
                break;
            }
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_sets_every_lower_flag_too() {
        let flags = CancelFlags::new();
        assert!(!flags.is_stop_requested());

        flags.request_stop_fast();
        assert!(flags.is_stop_requested());
        assert!(flags.is_stop_fast_requested());
        assert!(!flags.is_quit_requested());

        flags.request_quit();
        assert!(flags.is_quit_requested());
    }

    #[tokio::test]
    async fn fast_stop_cancels_the_token() {
        let flags = CancelFlags::new();
        let token = flags.fast_stop_token();
        flags.request_stop_fast();
        assert!(token.is_cancelled());
    }
}
