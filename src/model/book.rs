use bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Store-generated book identifier
///
/// Wraps a 12-byte `ObjectId`; clients only ever see the 24 character hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookId(ObjectId);

/// Returned when a path segment is not a hex-encoded identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid book id: {0:?}")]
pub struct InvalidBookId(pub String);

impl BookId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    pub const fn from_object_id(oid: ObjectId) -> Self {
        Self(oid)
    }

    pub const fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl FromStr for BookId {
    type Err = InvalidBookId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
            .map(Self)
            .map_err(|_| InvalidBookId(s.to_string()))
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl Serialize for BookId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de> Deserialize<'de> for BookId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The mutable part of a book, as submitted by clients
///
/// Any `id` present in the request body is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("author must not be empty")]
    EmptyAuthor,
    #[error("price must be a non-negative number")]
    InvalidPrice,
}

impl BookFields {
    /// Check the field invariants of a persisted book
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.author.trim().is_empty() {
            return Err(ValidationError::EmptyAuthor);
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::InvalidPrice);
        }
        Ok(())
    }
}

/// A persisted book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub price: f64,
}

impl Book {
    pub fn from_fields(id: BookId, fields: BookFields) -> Self {
        Self {
            id,
            title: fields.title,
            author: fields.author,
            price: fields.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: &str, author: &str, price: f64) -> BookFields {
        BookFields {
            title: title.to_string(),
            author: author.to_string(),
            price,
        }
    }

    #[test]
    fn test_parse_book_id() {
        let id: BookId = "65a1f0c2b4d3e5f6a7b8c9d0".parse().unwrap();
        assert_eq!(id.to_string(), "65a1f0c2b4d3e5f6a7b8c9d0");
        assert!("not-an-id".parse::<BookId>().is_err());
        assert!("65a1f0c2b4d3e5f6a7b8c9d".parse::<BookId>().is_err());
        assert!("".parse::<BookId>().is_err());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = BookId::generate();
        let b = BookId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_book_serializes_id_as_hex() {
        let id: BookId = "65a1f0c2b4d3e5f6a7b8c9d0".parse().unwrap();
        let book = Book::from_fields(id, fields("Dune", "Herbert", 9.99));
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["id"], "65a1f0c2b4d3e5f6a7b8c9d0");
        assert_eq!(json["title"], "Dune");
        assert_eq!(json["author"], "Herbert");
        assert_eq!(json["price"], 9.99);
    }

    #[test]
    fn test_fields_ignore_client_id() {
        let parsed: BookFields = serde_json::from_str(
            r#"{"id":"65a1f0c2b4d3e5f6a7b8c9d0","title":"Dune","author":"Herbert","price":12}"#,
        )
        .unwrap();
        assert_eq!(parsed, fields("Dune", "Herbert", 12.0));
    }

    #[test]
    fn test_fields_require_all_members() {
        assert!(serde_json::from_str::<BookFields>(r#"{"title":"Dune","author":"Herbert"}"#).is_err());
        assert!(serde_json::from_str::<BookFields>(r#"{"title":"Dune","price":1.0}"#).is_err());
        assert!(
            serde_json::from_str::<BookFields>(r#"{"title":"Dune","author":"H","price":"1"}"#)
                .is_err()
        );
    }

    #[test]
    fn test_validate() {
        assert_eq!(fields("Dune", "Herbert", 0.0).validate(), Ok(()));
        assert_eq!(
            fields("  ", "Herbert", 1.0).validate(),
            Err(ValidationError::EmptyTitle)
        );
        assert_eq!(
            fields("Dune", "", 1.0).validate(),
            Err(ValidationError::EmptyAuthor)
        );
        assert_eq!(
            fields("Dune", "Herbert", -0.5).validate(),
            Err(ValidationError::InvalidPrice)
        );
        assert_eq!(
            fields("Dune", "Herbert", f64::NAN).validate(),
            Err(ValidationError::InvalidPrice)
        );
    }
}
