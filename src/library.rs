//! The book library: authors, their books, and a small fixed dataset.

use crate::{
    errors::{CreateError, SchemaError},
    resolver::Resolver,
    schema::{EntityType, ID, Schema},
    value::Value,
};

/// The author entity type.
pub const AUTHOR: &str = "Author";
/// The book entity type.
pub const BOOK: &str = "Book";

/// The library schema.
///
/// - `Author { id, name, books }`, where `books` lists every book whose `author_id` is the
///   author's key.
/// - `Book { id, title, author_id, author }`, where `author` is the author whose key is the
///   book's `author_id`.
///
/// # Errors
///
/// Never in practice; the declarations are static.
#[inline]
pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder()
        .entity(
            EntityType::builder(AUTHOR)
                .text("name")
                .many("books", BOOK, ID, "author_id"),
        )
        .entity(
            EntityType::builder(BOOK)
                .text("title")
                .int("author_id")
                .one("author", AUTHOR, "author_id", ID),
        )
        .build()
}

/// Load the fixed dataset into a resolver over [`schema`].
///
/// # Errors
///
/// Returns an error if the resolver has a different schema or already holds one of the keys.
#[inline]
pub fn seed(resolver: &Resolver) -> Result<(), CreateError> {
    let authors = [(1, "George Orwell"), (2, "J.K. Rowling")];
    let books = [
        (1, "1984", 1),
        (2, "Animal Farm", 1),
        (3, "Harry Potter and the Philosopher's Stone", 2),
    ];

    for (id, name) in authors {
        drop(resolver.seed(AUTHOR, [("id", Value::Int(id)), ("name", name.into())])?);
    }
    for (id, title, author_id) in books {
        drop(resolver.seed(
            BOOK,
            [
                ("id", Value::Int(id)),
                ("title", title.into()),
                ("author_id", Value::Int(author_id)),
            ],
        )?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selection;
    use serde_json::{json, to_value};

    /// A resolver holding the library dataset.
    fn resolver() -> Resolver {
        let resolver = Resolver::new(schema().expect("library schema is valid"));
        seed(&resolver).expect("library seed is valid");
        resolver
    }

    /// # Panics
    ///
    /// Panics if the dataset is not loaded as declared.
    #[test]
    fn seeded() {
        let resolver = resolver();
        assert_eq!(resolver.len(AUTHOR), Ok(2));
        assert_eq!(resolver.len(BOOK), Ok(3));

        let err = seed(&resolver).expect_err("keys are already in use");
        assert!(matches!(err, CreateError::Validation(_)));
        assert_eq!(resolver.len(AUTHOR), Ok(2));
    }

    /// # Panics
    ///
    /// Panics if relationships do not follow the keys.
    #[test]
    fn relationships() {
        let resolver = resolver();
        let selection = Selection::new()
            .field("name")
            .nested("books", Selection::new().field("title"));

        let orwell = resolver
            .resolve_by_key(AUTHOR, 1, &selection)
            .expect("valid selection")
            .expect("author 1 exists");
        assert_eq!(
            to_value(&orwell).expect("serializable"),
            json!({
                "name": "George Orwell",
                "books": [{ "title": "1984" }, { "title": "Animal Farm" }],
            })
        );

        let selection = Selection::new()
            .field("title")
            .nested("author", Selection::new().field("name"));
        let books = resolver
            .resolve_collection(BOOK, &selection)
            .expect("valid selection");
        assert_eq!(
            to_value(&books).expect("serializable"),
            json!([
                { "title": "1984", "author": { "name": "George Orwell" } },
                { "title": "Animal Farm", "author": { "name": "George Orwell" } },
                {
                    "title": "Harry Potter and the Philosopher's Stone",
                    "author": { "name": "J.K. Rowling" },
                },
            ])
        );
    }
}
