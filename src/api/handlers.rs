// Book handlers module
// One store call per request, each bound by the configured deadline

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::error::{ApiError, ApiResult};
use super::response::{json_response, no_content};
use crate::model::{Book, BookFields, BookId};
use crate::store::{Deadline, Filter, SharedStore, Update};

const BOOK_NOT_FOUND: &str = "Book not found";

/// Translates book requests into store calls and store results into responses
pub struct BookHandler {
    store: SharedStore,
    timeout: Duration,
    max_body_size: usize,
}

impl BookHandler {
    pub fn new(store: SharedStore, timeout: Duration, max_body_size: u64) -> Self {
        Self {
            store,
            timeout,
            max_body_size: usize::try_from(max_body_size).unwrap_or(usize::MAX),
        }
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout)
    }

    /// GET /books
    pub async fn list(&self) -> ApiResult<Response<Full<Bytes>>> {
        let books = self
            .store
            .find(&Filter::all(), self.deadline())
            .await
            .map_err(|e| ApiError::store("Failed to fetch books", &e))?;
        Ok(json_response(StatusCode::OK, &books))
    }

    /// POST /books
    pub async fn create<B>(&self, body: B) -> ApiResult<Response<Full<Bytes>>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let fields = self.read_fields(body).await?;
        let id = self
            .store
            .insert_one(&fields, self.deadline())
            .await
            .map_err(|e| ApiError::store("Failed to add book", &e))?;
        Ok(json_response(
            StatusCode::CREATED,
            &Book::from_fields(id, fields),
        ))
    }

    /// GET /book/:id
    pub async fn get(&self, raw_id: &str) -> ApiResult<Response<Full<Bytes>>> {
        let id = parse_id(raw_id)?;
        let book = self
            .store
            .find_one(&Filter::by_id(id), self.deadline())
            .await
            .map_err(|e| ApiError::store("Failed to fetch book", &e))?
            .ok_or_else(|| ApiError::NotFound(BOOK_NOT_FOUND.to_string()))?;
        Ok(json_response(StatusCode::OK, &book))
    }

    /// PUT /book/:id
    pub async fn update<B>(&self, raw_id: &str, body: B) -> ApiResult<Response<Full<Bytes>>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let id = parse_id(raw_id)?;
        let fields = self.read_fields(body).await?;
        let matched = self
            .store
            .update_one(&Filter::by_id(id), &Update::set_fields(&fields), self.deadline())
            .await
            .map_err(|e| ApiError::store("Failed to update book", &e))?;
        if matched == 0 {
            return Err(ApiError::NotFound(BOOK_NOT_FOUND.to_string()));
        }
        Ok(json_response(StatusCode::OK, &Book::from_fields(id, fields)))
    }

    /// DELETE /book/:id
    pub async fn delete(&self, raw_id: &str) -> ApiResult<Response<Full<Bytes>>> {
        let id = parse_id(raw_id)?;
        let deleted = self
            .store
            .delete_one(&Filter::by_id(id), self.deadline())
            .await
            .map_err(|e| ApiError::store("Failed to delete book", &e))?;
        if deleted == 0 {
            return Err(ApiError::NotFound(BOOK_NOT_FOUND.to_string()));
        }
        Ok(no_content())
    }

    /// Readiness: the store answers a ping before the deadline
    pub async fn ready(&self) -> bool {
        match self.store.ping(self.deadline()).await {
            Ok(()) => true,
            Err(e) => {
                crate::logger::log_store_error("Readiness ping failed", &e);
                false
            }
        }
    }

    async fn read_fields<B>(&self, body: B) -> ApiResult<BookFields>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let fields: BookFields = read_json(body, self.max_body_size).await?;
        fields
            .validate()
            .map_err(|e| ApiError::BadRequest(format!("Invalid book data: {e}")))?;
        Ok(fields)
    }
}

fn parse_id(raw: &str) -> ApiResult<BookId> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid book ID".to_string()))
}

/// Collect at most `limit` bytes of body and decode them as JSON
async fn read_json<T, B>(body: B, limit: usize) -> ApiResult<T>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => return Err(ApiError::PayloadTooLarge),
        Err(e) => {
            return Err(ApiError::BadRequest(format!(
                "Failed to read request body: {e}"
            )))
        }
    };
    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("Invalid book data: {e}")))
}
