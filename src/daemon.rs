//! Signal-gated daemon re-run loop.
//!
//! In daemon mode the analyzer blocks between runs on a binary semaphore
//! that starts held; `SIGHUP` releases it, coalescing any signals received
//! while a run is in flight into a single subsequent run. `SIGTERM` exits
//! the process immediately, including mid-run.

use std::sync::Arc;

use tokio::sync::Semaphore;

/// Gates successive analysis runs behind `SIGHUP`. One instance is shared
/// between the signal-handling task and the run loop.
pub struct RunGate {
    semaphore: Arc<Semaphore>,
}

impl RunGate {
    /// A gate that is already open for the first run (mirrors the
    /// original's lock starting unlocked for the initial pass).
    pub fn new() -> Self {
        let semaphore = Arc::new(Semaphore::new(0));
        semaphore.add_permits(1);
        RunGate { semaphore }
    }

    /// Blocks until a permit is available, consuming it. One run = one
    /// permit.
    pub async fn wait_for_run(&self) {
        self.semaphore.acquire().await.expect("semaphore never closed").forget();
    }

    /// Releases one permit, requesting another run. Multiple releases
    /// while a run is in flight coalesce, since the semaphore never holds
    /// more than one outstanding permit worth of "run requested" state
    /// that matters here — the original's `BoundedSemaphore(1)` has the
    /// same coalescing property via `release()`'s `ValueError` when
    /// already at capacity.
    pub fn request_run(&self) {
        if self.semaphore.available_permits() == 0 {
            self.semaphore.add_permits(1);
        }
    }
}

impl Default for RunGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the `SIGHUP`/`SIGTERM` listener tasks. `SIGHUP` calls
/// `gate.request_run()`; `SIGTERM` exits the process outright, matching
/// the original's `HUP_signal_handler`/`TERM_signal_handler`.
pub fn spawn_signal_handlers(gate: Arc<RunGate>) -> std::io::Result<()> {
    let mut hup = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())?;
    let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = hup.recv() => {
                    tracing::info!("received SIGHUP, queuing another run");
                    gate.request_run();
                }
                _ = term.recv() => {
                    tracing::info!("received SIGTERM, exiting");
                    std::process::exit(0);
                }
            }
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_wait_does_not_block() {
        let gate = RunGate::new();
        gate.wait_for_run().await;
    }

    #[tokio::test]
    async fn request_run_unblocks_a_subsequent_wait() {
        let gate = RunGate::new();
        gate.wait_for_run().await;
        gate.request_run();
        gate.wait_for_run().await;
    }

    #[tokio::test]
    async fn repeated_requests_while_idle_coalesce() {
        let gate = RunGate::new();
        gate.wait_for_run().await;
        gate.request_run();
        gate.request_run();
        gate.request_run();
        assert_eq!(gate.semaphore.available_permits(), 1);
    }
}
