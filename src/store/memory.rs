//! In-process book store
//!
//! Keeps books in insertion order behind a `RwLock`. Used by tests and by
//! the `memory` backend for running without a database.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::deadline::Deadline;
use super::error::StoreResult;
use super::query::{Filter, Update};
use super::BookStore;
use crate::model::{Book, BookFields, BookId};

#[derive(Debug, Default)]
pub struct MemoryStore {
    books: RwLock<Vec<Book>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self, deadline: Deadline) -> StoreResult<()> {
        deadline.run(async { Ok(()) }).await
    }

    async fn find(&self, filter: &Filter, deadline: Deadline) -> StoreResult<Vec<Book>> {
        deadline
            .run(async {
                let books = self.books.read().await;
                if filter.is_all() {
                    return Ok(books.clone());
                }
                Ok(books.iter().filter(|b| filter.matches(b)).cloned().collect())
            })
            .await
    }

    async fn find_one(&self, filter: &Filter, deadline: Deadline) -> StoreResult<Option<Book>> {
        deadline
            .run(async {
                let books = self.books.read().await;
                Ok(books.iter().find(|b| filter.matches(b)).cloned())
            })
            .await
    }

    async fn insert_one(&self, fields: &BookFields, deadline: Deadline) -> StoreResult<BookId> {
        deadline
            .run(async {
                let id = BookId::generate();
                self.books
                    .write()
                    .await
                    .push(Book::from_fields(id, fields.clone()));
                Ok(id)
            })
            .await
    }

    async fn update_one(
        &self,
        filter: &Filter,
        update: &Update,
        deadline: Deadline,
    ) -> StoreResult<u64> {
        deadline
            .run(async {
                let mut books = self.books.write().await;
                match books.iter_mut().find(|b| filter.matches(b)) {
                    Some(book) => {
                        update.apply(book);
                        Ok(1)
                    }
                    None => Ok(0),
                }
            })
            .await
    }

    async fn delete_one(&self, filter: &Filter, deadline: Deadline) -> StoreResult<u64> {
        deadline
            .run(async {
                let mut books = self.books.write().await;
                match books.iter().position(|b| filter.matches(b)) {
                    Some(index) => {
                        books.remove(index);
                        Ok(1)
                    }
                    None => Ok(0),
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    fn fields(title: &str) -> BookFields {
        BookFields {
            title: title.to_string(),
            author: "Author".to_string(),
            price: 1.0,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_in_order() {
        let store = MemoryStore::new();
        let a = store.insert_one(&fields("A"), deadline()).await.unwrap();
        let b = store.insert_one(&fields("B"), deadline()).await.unwrap();

        let all = store.find(&Filter::all(), deadline()).await.unwrap();
        assert_eq!(all.iter().map(|b| b.id).collect::<Vec<_>>(), vec![a, b]);

        let found = store.find_one(&Filter::by_id(b), deadline()).await.unwrap();
        assert_eq!(found.unwrap().title, "B");
    }

    #[tokio::test]
    async fn test_update_and_delete_counts() {
        let store = MemoryStore::new();
        let id = store.insert_one(&fields("A"), deadline()).await.unwrap();
        let missing = BookId::generate();

        let update = Update::set_fields(&fields("A2"));
        assert_eq!(store.update_one(&Filter::by_id(id), &update, deadline()).await.unwrap(), 1);
        assert_eq!(store.update_one(&Filter::by_id(missing), &update, deadline()).await.unwrap(), 0);

        assert_eq!(store.delete_one(&Filter::by_id(id), deadline()).await.unwrap(), 1);
        assert_eq!(store.delete_one(&Filter::by_id(id), deadline()).await.unwrap(), 0);
        assert!(store.find(&Filter::all(), deadline()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_get_unique_ids() {
        let store = Arc::new(MemoryStore::new());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .insert_one(&fields(&format!("book {i}")), deadline())
                    .await
                    .unwrap()
            }));
        }
        let mut ids = HashSet::new();
        for task in tasks {
            assert!(ids.insert(task.await.unwrap()));
        }
        assert_eq!(ids.len(), 32);
    }
}
