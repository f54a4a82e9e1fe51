use anyhow::Context;
use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::runtime::Builder;
use tokio::signal;

/// Shared stop request, honoured by the runner at stage boundaries only.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Flips the flag on the first Ctrl+C, from a background signal thread.
    pub fn install_ctrl_c(&self) -> anyhow::Result<()> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        let flag = self.clone();
        thread::spawn(move || {
            runtime.block_on(async move {
                if signal::ctrl_c().await.is_ok() {
                    warn!("Ctrl+C received; stopping at the next stage boundary");
                    flag.cancel();
                }
            });
        });
        Ok(())
    }
}
