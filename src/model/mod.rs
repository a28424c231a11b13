//! Domain model
//!
//! The single `Book` entity, its store-generated identifier and the
//! client-supplied field set used by create and update.

mod book;

pub use book::{Book, BookFields, BookId, InvalidBookId, ValidationError};
