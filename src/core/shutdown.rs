//! OS termination signals for [`Pipeline::cancel_on_shutdown`](crate::Pipeline::cancel_on_shutdown).
//!
//! - unix: `SIGINT`, `SIGTERM`, `SIGQUIT` (plus Ctrl-C)
//! - elsewhere: Ctrl-C only

/// Completes when the process is asked to terminate.
///
/// Fails only if a listener cannot be registered.
#[cfg(unix)]
pub(crate) async fn terminate_requested() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
        _ = quit.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
pub(crate) async fn terminate_requested() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
