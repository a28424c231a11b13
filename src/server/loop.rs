// Server loop module
// Accepts connections until a shutdown is requested, then drains

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

use super::connection::accept_connection;
use super::drain::drain_connections;
use super::signal::SignalHandler;
use crate::config;
use crate::logger;

/// Run the accept loop on `listener`.
///
/// Each accepted stream is handed to [`accept_connection`]. When the signal
/// handler fires, the listener is closed first, every open connection is told
/// to close after its in-flight request, and they get
/// `performance.shutdown_timeout` seconds to finish.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<config::AppState>,
    active_connections: Arc<AtomicUsize>,
    signals: Arc<SignalHandler>,
) {
    let (closing_tx, closing) = watch::channel(false);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, &closing);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = signals.shutdown.notified() => break,
        }
    }

    drop(listener);
    closing_tx.send_replace(true);
    let grace = Duration::from_secs(state.config.performance.shutdown_timeout);
    drain_connections(&active_connections, grace).await;
}
