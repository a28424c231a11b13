// Application state module
// Shared, read-only state handed to every connection task

use super::types::Config;
use crate::api::BookHandler;
use crate::http::CorsPolicy;
use crate::store::SharedStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub books: BookHandler,
    pub cors: CorsPolicy,
}

impl AppState {
    /// Wire the handler to an already connected store
    pub fn new(config: &Config, store: SharedStore) -> Self {
        Self {
            config: config.clone(),
            books: BookHandler::new(store, config.store_timeout(), config.http.max_body_size),
            cors: CorsPolicy::new(&config.http.cors),
        }
    }
}
