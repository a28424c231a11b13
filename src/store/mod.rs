//! Document store boundary
//!
//! Book persistence goes through the [`BookStore`] trait. The handler only
//! ever holds a [`SharedStore`], so the MongoDB backend and the in-memory
//! backend are interchangeable.

mod deadline;
mod error;
mod memory;
mod mongo;
mod query;

pub use deadline::{far_future, Deadline};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use query::{Assignment, Field, Filter, Update, Value};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::model::{Book, BookFields, BookId};

/// Collection-scoped book operations
///
/// Every call is bound by the supplied [`Deadline`] and must return
/// [`StoreError::Timeout`] once it passes.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable
    async fn ping(&self, deadline: Deadline) -> StoreResult<()>;

    /// All matching books in storage order
    async fn find(&self, filter: &Filter, deadline: Deadline) -> StoreResult<Vec<Book>>;

    async fn find_one(&self, filter: &Filter, deadline: Deadline) -> StoreResult<Option<Book>>;

    /// Insert a new book; the store assigns the identifier
    async fn insert_one(&self, fields: &BookFields, deadline: Deadline) -> StoreResult<BookId>;

    /// Apply `update` to the first match, returning the matched count
    async fn update_one(
        &self,
        filter: &Filter,
        update: &Update,
        deadline: Deadline,
    ) -> StoreResult<u64>;

    /// Delete the first match, returning the deleted count
    async fn delete_one(&self, filter: &Filter, deadline: Deadline) -> StoreResult<u64>;
}

pub type SharedStore = Arc<dyn BookStore>;

/// Open the configured backend and verify connectivity
pub async fn connect(config: &DatabaseConfig) -> StoreResult<SharedStore> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let store: SharedStore = match config.backend {
        StoreBackend::Mongodb => Arc::new(
            MongoStore::connect(&config.uri, &config.name, &config.collection, timeout).await?,
        ),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    store.ping(Deadline::after(timeout)).await?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let config = DatabaseConfig {
            backend: StoreBackend::Memory,
            uri: String::new(),
            name: "bookstore".to_string(),
            collection: "books".to_string(),
            timeout_secs: 10,
        };
        let store = connect(&config).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }
}
