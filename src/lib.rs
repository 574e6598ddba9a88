//! An in-memory graph query resolver.
//!
//! Entity types and the relationships between them are declared once in a [`Schema`]. A
//! [`Resolver`] owns the instances of every entity type and evaluates client-supplied
//! [`Selection`]s against them, producing [`ResultNode`] trees with exactly the requested shape.

pub mod errors;

pub mod schema;
pub use schema::{Cardinality, EntityType, ScalarKind, Schema};

pub mod value;
pub use value::Value;

pub mod store;

pub mod selection;
pub use selection::{FieldSelection, Selection};

pub mod result;
pub use result::{Resolved, ResultNode};

pub mod resolver;
pub use resolver::{Resolver, Snapshot};

pub mod library;

pub mod settings;
pub use settings::Settings;
