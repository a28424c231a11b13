use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

mod api;
mod config;
mod http;
mod logger;
mod model;
mod server;
mod store;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;

    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.socket_addr()?;

    let store = match store::connect(&cfg.database).await {
        Ok(store) => store,
        Err(e) => {
            logger::log_store_error("Failed to connect to store", &e);
            return Err(e.into());
        }
    };
    logger::log_store_connected(store.backend_name(), &cfg.database.uri);

    let listener = server::create_reusable_listener(addr)?;
    logger::log_server_start(&addr, &cfg, store.backend_name());

    let state = Arc::new(config::AppState::new(&cfg, store));
    let active_connections = Arc::new(AtomicUsize::new(0));

    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals));

    server::start_server_loop(listener, state, active_connections, signals).await;
    Ok(())
}
