//! Interrupt handling for the runner: SIGINT or SIGTERM cancels the batch
//! before its next pair.

use std::io;
use std::thread;

use tracing::info;

use crate::batch::CancellationToken;

/// Registers the handlers before returning, then waits for a signal on a
/// background thread. The first signal cancels `token`.
pub fn cancel_on_signal(token: CancellationToken) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let waiter = {
        let _guard = runtime.enter();
        SignalWaiter::register()?
    };

    thread::Builder::new()
        .name("cryofetch-signal".to_string())
        .spawn(move || {
            runtime.block_on(waiter.wait());
            token.cancel();
        })?;
    Ok(())
}

#[cfg(unix)]
struct SignalWaiter {
    terminate: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalWaiter {
    fn register() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
        })
    }

    async fn wait(mut self) {
        tokio::select! {
            _ = self.terminate.recv() => {
                info!("received SIGTERM, stopping after the current pair");
            }
            _ = self.interrupt.recv() => {
                info!("received SIGINT, stopping after the current pair");
            }
        }
    }
}

#[cfg(not(unix))]
struct SignalWaiter;

#[cfg(not(unix))]
impl SignalWaiter {
    fn register() -> io::Result<Self> {
        Ok(Self)
    }

    async fn wait(self) {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, stopping after the current pair");
        }
    }
}
