//! Ctrl-C handling.
//!
//! The first interrupt raises the run's `CancelFlag`; the workflow notices it
//! at its next state boundary and ends in `Failed`. A second interrupt exits
//! immediately with status 1.

use std::thread;

use tokio::runtime::{Builder, Runtime};

use crate::domain::{AppError, CancelFlag, Result};

/// Starts listening for interrupts on a background thread.
///
/// The handler is registered before this returns, so an interrupt that
/// arrives right after never falls back to the default termination.
///
/// # Errors
/// Returns error if the listener runtime, the signal handler or the
/// listener thread cannot be set up.
pub fn install_interrupt_handler(flag: CancelFlag) -> Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::io("Failed to start the interrupt listener", e))?;

    let listener = listen(&runtime)?;

    thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || runtime.block_on(wait_for_interrupts(listener, flag)))
        .map_err(|e| AppError::io("Failed to spawn the interrupt listener", e))?;

    Ok(())
}

async fn wait_for_interrupts(mut listener: Listener, flag: CancelFlag) {
    if !listener.recv().await {
        return;
    }
    tracing::warn!("Interrupt received, stopping at the next step");
    flag.cancel();

    if listener.recv().await {
        tracing::warn!("Second interrupt received, exiting");
        std::process::exit(1);
    }
}

#[cfg(unix)]
struct Listener(tokio::signal::unix::Signal);

#[cfg(unix)]
fn listen(runtime: &Runtime) -> Result<Listener> {
    use tokio::signal::unix::{signal, SignalKind};

    let _guard = runtime.enter();
    signal(SignalKind::interrupt())
        .map(Listener)
        .map_err(|e| AppError::io("Failed to install the interrupt handler", e))
}

#[cfg(unix)]
impl Listener {
    async fn recv(&mut self) -> bool {
        self.0.recv().await.is_some()
    }
}

#[cfg(not(unix))]
struct Listener;

#[cfg(not(unix))]
fn listen(_runtime: &Runtime) -> Result<Listener> {
    Ok(Listener)
}

#[cfg(not(unix))]
impl Listener {
    async fn recv(&mut self) -> bool {
        tokio::signal::ctrl_c().await.is_ok()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::{Duration, Instant};

    #[test]
    fn test_interrupt_raises_flag() {
        let runtime = Builder::new_current_thread().enable_all().build().unwrap();
        let listener = listen(&runtime).unwrap();
        let flag = CancelFlag::new();
        let observer = flag.clone();

        thread::spawn(move || runtime.block_on(wait_for_interrupts(listener, flag)));

        let status = Command::new("kill")
            .args(["-INT", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let started = Instant::now();
        while !observer.is_cancelled() && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(observer.is_cancelled());
    }
}
