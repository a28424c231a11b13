//! MongoDB book store
//!
//! Books live in one collection as `{_id, title, author, price}` documents.
//! The driver generates `_id` on insert. Dropping an in-flight driver future
//! abandons the operation; reads additionally carry `maxTimeMS` so the server
//! stops work at the same deadline.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures_util::TryStreamExt;
use mongodb::options::{ClientOptions, FindOneOptions, FindOptions};
use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::deadline::Deadline;
use super::error::{StoreError, StoreResult};
use super::query::{Filter, Update};
use super::BookStore;
use crate::model::{Book, BookFields, BookId};

/// Stored document shape
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BookDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    title: String,
    author: String,
    price: f64,
}

impl From<&BookFields> for BookDocument {
    fn from(fields: &BookFields) -> Self {
        Self {
            id: None,
            title: fields.title.clone(),
            author: fields.author.clone(),
            price: fields.price,
        }
    }
}

impl TryFrom<BookDocument> for Book {
    type Error = StoreError;

    fn try_from(document: BookDocument) -> Result<Self, Self::Error> {
        let id = document
            .id
            .ok_or_else(|| StoreError::Corrupt("document without _id".to_string()))?;
        Ok(Self {
            id: BookId::from_object_id(id),
            title: document.title,
            author: document.author,
            price: document.price,
        })
    }
}

pub struct MongoStore {
    database: Database,
    collection: Collection<BookDocument>,
}

impl MongoStore {
    /// Build a client for `uri` scoped to `database.collection`
    ///
    /// The driver connects lazily; call [`BookStore::ping`] to verify.
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client = Client::with_options(options)?;
        let database = client.database(database);
        let collection = database.collection::<BookDocument>(collection);
        Ok(Self {
            database,
            collection,
        })
    }
}

#[async_trait]
impl BookStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self, deadline: Deadline) -> StoreResult<()> {
        deadline
            .run(async {
                self.database.run_command(doc! { "ping": 1 }, None).await?;
                Ok(())
            })
            .await
    }

    async fn find(&self, filter: &Filter, deadline: Deadline) -> StoreResult<Vec<Book>> {
        let options = FindOptions::builder()
            .max_time(deadline.remaining())
            .build();
        deadline
            .run(async {
                let cursor = self.collection.find(filter.to_document(), options).await?;
                let documents: Vec<BookDocument> = cursor.try_collect().await?;
                documents.into_iter().map(Book::try_from).collect()
            })
            .await
    }

    async fn find_one(&self, filter: &Filter, deadline: Deadline) -> StoreResult<Option<Book>> {
        let options = FindOneOptions::builder()
            .max_time(deadline.remaining())
            .build();
        deadline
            .run(async {
                self.collection
                    .find_one(filter.to_document(), options)
                    .await?
                    .map(Book::try_from)
                    .transpose()
            })
            .await
    }

    async fn insert_one(&self, fields: &BookFields, deadline: Deadline) -> StoreResult<BookId> {
        deadline
            .run(async {
                let result = self
                    .collection
                    .insert_one(BookDocument::from(fields), None)
                    .await?;
                result
                    .inserted_id
                    .as_object_id()
                    .map(BookId::from_object_id)
                    .ok_or_else(|| {
                        StoreError::Corrupt(format!(
                            "inserted id is not an ObjectId: {}",
                            result.inserted_id
                        ))
                    })
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
                let result = self
                    .collection
                    .update_one(filter.to_document(), update.to_document(), None)
                    .await?;
                Ok(result.matched_count)
            })
            .await
    }

    async fn delete_one(&self, filter: &Filter, deadline: Deadline) -> StoreResult<u64> {
        deadline
            .run(async {
                let result = self.collection.delete_one(filter.to_document(), None).await?;
                Ok(result.deleted_count)
            })
            .await
    }
}
