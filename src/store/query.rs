//! Typed query builder
//!
//! Filters are conjunctions of field equalities; updates are `$set`
//! assignments restricted to the mutable book fields, so an update can
//! never touch the identifier.

use bson::{doc, Bson, Document};

use crate::model::{Book, BookFields, BookId};

/// Queryable book field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Title,
    Author,
    Price,
}

impl Field {
    /// Document key as stored
    pub const fn key(self) -> &'static str {
        match self {
            Self::Id => "_id",
            Self::Title => "title",
            Self::Author => "author",
            Self::Price => "price",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Id(BookId),
    #[cfg(test)]
    Text(String),
    #[cfg(test)]
    Number(f64),
}

impl From<&Value> for Bson {
    fn from(value: &Value) -> Self {
        match value {
            Value::Id(id) => Self::ObjectId(id.object_id()),
            #[cfg(test)]
            Value::Text(s) => Self::String(s.clone()),
            #[cfg(test)]
            Value::Number(n) => Self::Double(*n),
        }
    }
}

/// Conjunction of `field == value` clauses; empty matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(Field, Value)>,
}

impl Filter {
    pub const fn all() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    pub fn eq(field: Field, value: Value) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn by_id(id: BookId) -> Self {
        Self::eq(Field::Id, Value::Id(id))
    }

    #[must_use]
    pub fn and_eq(mut self, field: Field, value: Value) -> Self {
        self.clauses.push((field, value));
        self
    }

    pub fn is_all(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate against an in-memory book
    #[allow(clippy::float_cmp)]
    pub fn matches(&self, book: &Book) -> bool {
        self.clauses.iter().all(|(field, value)| match (field, value) {
            (Field::Id, Value::Id(id)) => book.id == *id,
            #[cfg(test)]
            (Field::Title, Value::Text(s)) => book.title == *s,
            #[cfg(test)]
            (Field::Author, Value::Text(s)) => book.author == *s,
            #[cfg(test)]
            (Field::Price, Value::Number(n)) => book.price == *n,
            _ => false,
        })
    }

    /// Lower to a BSON query document
    pub fn to_document(&self) -> Document {
        let mut query = Document::new();
        for (field, value) in &self.clauses {
            query.insert(field.key(), Bson::from(value));
        }
        query
    }
}

/// Assignment to one mutable field
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Title(String),
    Author(String),
    Price(f64),
}

impl Assignment {
    const fn field(&self) -> Field {
        match self {
            Self::Title(_) => Field::Title,
            Self::Author(_) => Field::Author,
            Self::Price(_) => Field::Price,
        }
    }

    fn to_bson(&self) -> Bson {
        match self {
            Self::Title(s) | Self::Author(s) => Bson::String(s.clone()),
            Self::Price(n) => Bson::Double(*n),
        }
    }
}

/// `$set` update over the mutable fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    assignments: Vec<Assignment>,
}

impl Update {
    pub const fn new() -> Self {
        Self {
            assignments: Vec::new(),
        }
    }

    /// Set all three mutable fields
    pub fn set_fields(fields: &BookFields) -> Self {
        Self::new()
            .set(Assignment::Title(fields.title.clone()))
            .set(Assignment::Author(fields.author.clone()))
            .set(Assignment::Price(fields.price))
    }

    /// Add an assignment, replacing an earlier one to the same field
    #[must_use]
    pub fn set(mut self, assignment: Assignment) -> Self {
        self.assignments
            .retain(|a| a.field() != assignment.field());
        self.assignments.push(assignment);
        self
    }

    pub fn apply(&self, book: &mut Book) {
        for assignment in &self.assignments {
            match assignment {
                Assignment::Title(s) => book.title.clone_from(s),
                Assignment::Author(s) => book.author.clone_from(s),
                Assignment::Price(n) => book.price = *n,
            }
        }
    }

    /// Lower to a BSON `$set` document
    pub fn to_document(&self) -> Document {
        let mut set = Document::new();
        for assignment in &self.assignments {
            set.insert(assignment.field().key(), assignment.to_bson());
        }
        doc! { "$set": set }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Book {
        Book::from_fields(
            BookId::generate(),
            BookFields {
                title: "Dune".to_string(),
                author: "Herbert".to_string(),
                price: 9.99,
            },
        )
    }

    #[test]
    fn test_filter_all_matches_everything() {
        let filter = Filter::all();
        assert!(filter.is_all());
        assert!(filter.matches(&book()));
        assert_eq!(filter.to_document(), Document::new());
    }

    #[test]
    fn test_filter_by_id() {
        let b = book();
        assert!(Filter::by_id(b.id).matches(&b));
        assert!(!Filter::by_id(BookId::generate()).matches(&b));
        assert_eq!(
            Filter::by_id(b.id).to_document(),
            doc! { "_id": b.id.object_id() }
        );
    }

    #[test]
    fn test_filter_conjunction() {
        let b = book();
        let hit = Filter::eq(Field::Title, Value::Text("Dune".into()))
            .and_eq(Field::Price, Value::Number(9.99));
        let miss = Filter::eq(Field::Title, Value::Text("Dune".into()))
            .and_eq(Field::Author, Value::Text("Asimov".into()));
        assert!(hit.matches(&b));
        assert!(!miss.matches(&b));
    }

    #[test]
    fn test_mismatched_value_kind_never_matches() {
        let b = book();
        assert!(!Filter::eq(Field::Price, Value::Text("9.99".into())).matches(&b));
    }

    #[test]
    fn test_update_sets_only_mutable_fields() {
        let mut b = book();
        let id = b.id;
        let update = Update::set_fields(&BookFields {
            title: "Dune Messiah".to_string(),
            author: "Frank Herbert".to_string(),
            price: 12.5,
        });
        update.apply(&mut b);
        assert_eq!(b.id, id);
        assert_eq!(b.title, "Dune Messiah");
        assert_eq!(b.author, "Frank Herbert");
        assert!((b.price - 12.5).abs() < f64::EPSILON);
        assert_eq!(
            update.to_document(),
            doc! { "$set": { "title": "Dune Messiah", "author": "Frank Herbert", "price": 12.5 } }
        );
    }

    #[test]
    fn test_update_last_assignment_wins() {
        let update = Update::new()
            .set(Assignment::Price(1.0))
            .set(Assignment::Price(2.0));
        assert_eq!(update.to_document(), doc! { "$set": { "price": 2.0 } });
    }
}
