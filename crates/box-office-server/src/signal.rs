//! Ctrl-C and SIGTERM handling

use std::io;
use std::thread;

use eyre::{Result, WrapErr};
use tokio::signal;
use tracing::{error, info};

/// Watch for Ctrl-C or SIGTERM on a dedicated thread and report the first
/// one through `stop`
pub fn notify_on_shutdown(stop: flume::Sender<()>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("cannot build the signal runtime")?;
    thread::Builder::new()
        .name("signal".into())
        .spawn(move || match runtime.block_on(shutdown_signal()) {
            Ok(signal) => {
                info!(signal, "shutting down gracefully");
                let _ = stop.send(());
            }
            Err(err) => error!(%err, "cannot listen for shutdown signals"),
        })
        .wrap_err("cannot spawn the signal thread")?;
    Ok(())
}

async fn shutdown_signal() -> io::Result<&'static str> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    #[cfg(unix)]
    let terminate = terminate.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        res = ctrl_c => res.map(|()| "SIGINT"),
        _ = terminate => Ok("SIGTERM"),
    }
}
