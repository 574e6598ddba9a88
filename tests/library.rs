//! End-to-end queries against the book library.

use config as _;
use either as _;
use nameof as _;
use parking_lot as _;
use serde as _;
use tempfile as _;
use thiserror as _;
use toml as _;
use tracing as _;
use transitive as _;

#[cfg(test)]
mod tests {
    use resolver::{
        Resolved, Resolver, ResultNode, Selection, Value,
        errors::{LookupError, SelectionError},
        library::{self, AUTHOR, BOOK},
    };
    use serde_json::{json, to_value};

    /// A resolver holding the library dataset.
    fn resolver() -> Resolver {
        let resolver = Resolver::new(library::schema().expect("library schema is valid"));
        library::seed(&resolver).expect("library seed is valid");
        resolver
    }

    /// The field names of a node, in order.
    fn names(node: &ResultNode) -> Vec<&str> {
        node.names().collect()
    }

    /// # Panics
    ///
    /// Panics if a result node contains fields other than the requested ones.
    #[test]
    fn exact_field_sets() {
        let resolver = resolver();
        let selections = [
            Selection::new(),
            Selection::new().field("id"),
            Selection::new().field("title").field("id"),
            Selection::new()
                .nested("author", Selection::new().field("name"))
                .field("author_id"),
        ];

        for selection in &selections {
            let expected = selection.fields().map(|f| f.name()).collect::<Vec<_>>();
            let books = resolver
                .resolve_collection(BOOK, selection)
                .expect("valid selection");
            assert_eq!(books.len(), 3);
            for book in &books {
                assert_eq!(names(book), expected);
            }
        }
    }

    /// # Panics
    ///
    /// Panics if the seed relationships resolve incorrectly.
    #[test]
    fn relationship_correctness() {
        let resolver = resolver();

        let orwell = resolver
            .require_by_key(
                AUTHOR,
                1,
                &Selection::new().nested("books", Selection::new().field("title")),
            )
            .expect("author 1 exists");
        assert_eq!(
            to_value(&orwell).expect("serializable"),
            json!({ "books": [{ "title": "1984" }, { "title": "Animal Farm" }] })
        );

        let titles = resolver
            .resolve_collection(BOOK, &Selection::new().field("title"))
            .expect("valid selection");
        assert_eq!(
            to_value(&titles).expect("serializable"),
            json!([
                { "title": "1984" },
                { "title": "Animal Farm" },
                { "title": "Harry Potter and the Philosopher's Stone" },
            ])
        );
    }

    /// # Panics
    ///
    /// Panics if nesting back through a relationship does not follow the keys.
    #[test]
    fn deep_nesting() {
        let resolver = resolver();
        let selection = Selection::new().field("title").nested(
            "author",
            Selection::new()
                .field("name")
                .nested("books", Selection::new().field("id")),
        );

        let book = resolver
            .resolve_by_key(BOOK, 3, &selection)
            .expect("valid selection")
            .expect("book 3 exists");
        assert_eq!(
            to_value(&book).expect("serializable"),
            json!({
                "title": "Harry Potter and the Philosopher's Stone",
                "author": { "name": "J.K. Rowling", "books": [{ "id": 3 }] },
            })
        );
    }

    /// # Panics
    ///
    /// Panics if an absent key is reported as anything but absent.
    #[test]
    fn absent_keys() {
        let resolver = resolver();
        let selection = Selection::new().field("name");

        for key in [0, 3, -1, i64::MAX] {
            assert_eq!(resolver.resolve_by_key(AUTHOR, key, &selection), Ok(None));
        }
        assert_eq!(
            resolver.require_by_key(AUTHOR, 3, &selection),
            Err(LookupError::NotFound {
                entity: AUTHOR.into(),
                key: 3,
            })
        );
        assert!(
            resolver
                .resolve_by_key(AUTHOR, 2, &selection)
                .is_ok_and(|author| author.is_some())
        );
    }

    /// # Panics
    ///
    /// Panics if repeated evaluation differs.
    #[test]
    fn idempotence() {
        let resolver = resolver();
        let selection = Selection::new()
            .field("name")
            .nested("books", Selection::new().field("title").field("id"));

        let first = resolver
            .resolve_collection(AUTHOR, &selection)
            .expect("valid selection");
        let second = resolver
            .resolve_collection(AUTHOR, &selection)
            .expect("valid selection");
        assert_eq!(first, second);
        assert_eq!(
            to_value(&first).expect("serializable"),
            to_value(&second).expect("serializable")
        );
    }

    /// # Panics
    ///
    /// Panics if creating an instance does not append exactly one node with the next key.
    #[test]
    fn mutation_monotonicity() {
        let resolver = resolver();
        let selection = Selection::new().field("id").field("title");
        let before = resolver
            .resolve_collection(BOOK, &selection)
            .expect("valid selection");

        let created = resolver
            .create_instance(
                BOOK,
                [
                    ("title", Value::from("Burmese Days")),
                    ("author_id", Value::Int(1)),
                ],
            )
            .expect("valid book");
        assert_eq!(
            to_value(&created).expect("serializable"),
            json!({ "id": 4, "title": "Burmese Days", "author_id": 1 })
        );

        let after = resolver
            .resolve_collection(BOOK, &selection)
            .expect("valid selection");
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after[..before.len()], before[..]);
        assert_eq!(
            after.last().and_then(|book| book.get("id")),
            Some(&Resolved::Scalar(Value::Int(4)))
        );

        let orwell = resolver
            .require_by_key(
                AUTHOR,
                1,
                &Selection::new().nested("books", Selection::new().field("title")),
            )
            .expect("author 1 exists");
        assert_eq!(
            to_value(&orwell).expect("serializable"),
            json!({
                "books": [
                    { "title": "1984" },
                    { "title": "Animal Farm" },
                    { "title": "Burmese Days" },
                ],
            })
        );
    }

    /// # Panics
    ///
    /// Panics if the first created instance of an empty type does not get key 1.
    #[test]
    fn first_key() {
        let resolver = Resolver::new(library::schema().expect("library schema is valid"));
        let created = resolver
            .create_instance(AUTHOR, [("name", Value::from("George Orwell"))])
            .expect("valid author");
        assert_eq!(created.get("id"), Some(&Resolved::Scalar(Value::Int(1))));
    }

    /// # Panics
    ///
    /// Panics if title lookup is case sensitive or matches other fields.
    #[test]
    fn title_lookup() {
        let resolver = resolver();
        let selection = Selection::new().field("id");

        for needle in ["1984", "ANIMAL FARM", "harry potter and the philosopher's stone"] {
            assert!(
                resolver
                    .find_by_text(BOOK, "title", needle, &selection)
                    .is_ok_and(|book| book.is_some()),
                "{needle} should be found"
            );
        }
        let book = resolver
            .find_by_text(BOOK, "title", "Animal farm", &selection)
            .expect("valid lookup")
            .expect("book exists");
        assert_eq!(book.get("id"), Some(&Resolved::Scalar(Value::Int(2))));

        assert_eq!(
            resolver.find_by_text(BOOK, "title", "Animal", &selection),
            Ok(None)
        );
        assert_eq!(
            resolver.find_by_text(BOOK, "author_id", "1", &selection),
            Err(SelectionError::NotText {
                entity: BOOK.into(),
                field: "author_id".into(),
            })
        );
    }

    /// # Panics
    ///
    /// Panics if unrequested fields appear in a result.
    #[test]
    fn minimality() {
        let resolver = resolver();
        let authors = resolver
            .resolve_collection(AUTHOR, &Selection::new().field("name"))
            .expect("valid selection");

        assert_eq!(
            to_value(&authors).expect("serializable"),
            json!([{ "name": "George Orwell" }, { "name": "J.K. Rowling" }])
        );
        for author in &authors {
            assert!(author.get("id").is_none());
            assert!(author.get("books").is_none());
        }
    }

    /// # Panics
    ///
    /// Panics if invalid selections are not rejected, even against an empty store.
    #[test]
    fn invalid_selections() {
        let resolver = Resolver::new(library::schema().expect("library schema is valid"));

        let cases = [
            (
                AUTHOR,
                Selection::new().field("title"),
                SelectionError::UnknownField {
                    entity: AUTHOR.into(),
                    field: "title".into(),
                },
            ),
            (
                AUTHOR,
                Selection::new().field("books"),
                SelectionError::MissingSubselection {
                    entity: AUTHOR.into(),
                    field: "books".into(),
                },
            ),
            (
                BOOK,
                Selection::new().nested("title", Selection::new().field("id")),
                SelectionError::UnexpectedSubselection {
                    entity: BOOK.into(),
                    field: "title".into(),
                },
            ),
            (
                BOOK,
                Selection::new().nested("author", Selection::new().field("title")),
                SelectionError::UnknownField {
                    entity: AUTHOR.into(),
                    field: "title".into(),
                },
            ),
            (
                "Publisher",
                Selection::new().field("name"),
                SelectionError::UnknownEntity("Publisher".into()),
            ),
        ];

        for (entity, selection, expected) in cases {
            assert_eq!(
                resolver.resolve_collection(entity, &selection),
                Err(expected.clone())
            );
            assert_eq!(
                resolver.resolve_by_key(entity, 1, &selection),
                Err(expected)
            );
        }
    }

    /// # Panics
    ///
    /// Panics if resolving an empty store produces anything but an empty list.
    #[test]
    fn empty_store() {
        let resolver = Resolver::new(library::schema().expect("library schema is valid"));
        assert_eq!(
            resolver.resolve_collection(BOOK, &Selection::new().field("id")),
            Ok(Vec::new())
        );
    }

    /// # Panics
    ///
    /// Panics if relationships without a match do not resolve to `null` and `[]`.
    #[test]
    fn unmatched_relationships() {
        let resolver = resolver();

        let created = resolver
            .create_instance(
                BOOK,
                [
                    ("title", Value::from("Down and Out in Paris and London")),
                    ("author_id", Value::Int(99)),
                ],
            )
            .expect("authors are not checked on create");
        let Some(&Resolved::Scalar(Value::Int(key))) = created.get("id") else {
            panic!("created book should have an integer key");
        };
        let book = resolver
            .require_by_key(
                BOOK,
                key,
                &Selection::new().nested("author", Selection::new().field("name")),
            )
            .expect("book was created");
        assert_eq!(
            to_value(&book).expect("serializable"),
            json!({ "author": null })
        );

        let huxley = resolver
            .create_instance(AUTHOR, [("name", Value::from("Aldous Huxley"))])
            .expect("valid author");
        assert_eq!(huxley.get("id"), Some(&Resolved::Scalar(Value::Int(3))));
        let author = resolver
            .require_by_key(
                AUTHOR,
                3,
                &Selection::new().nested("books", Selection::new().field("title")),
            )
            .expect("author was created");
        assert_eq!(
            to_value(&author).expect("serializable"),
            json!({ "books": [] })
        );
    }
}
