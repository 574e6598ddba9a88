//! Error types used by the schema, the resolver and settings loading.

use crate::schema::ScalarKind;
use config::ConfigError;
use std::{io::Error as IoError, path::PathBuf};
use thiserror::Error;
use toml::de::Error as TomlError;
use transitive::Transitive;

/// Errors that may occur when declaring a [`Schema`](crate::Schema).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    /// Two entity types share a name.
    #[error("entity type `{0}` is declared more than once")]
    DuplicateEntity(Box<str>),
    /// Two fields of one entity type share a name. This includes redeclaring the key field.
    #[error("field `{field}` is declared more than once on `{entity}`")]
    DuplicateField {
        /// The entity type declaring the field.
        entity: Box<str>,
        /// The repeated field name.
        field: Box<str>,
    },
    /// A relationship points at an entity type that was never declared.
    #[error("relationship `{entity}.{relationship}` targets undeclared entity type `{target}`")]
    UnknownTarget {
        /// The entity type owning the relationship.
        entity: Box<str>,
        /// The relationship name.
        relationship: Box<str>,
        /// The missing target type.
        target: Box<str>,
    },
    /// A relationship joins on a field that is not a scalar of the entity type it names.
    #[error("`{field}` is not a scalar field of `{entity}`")]
    UnknownKey {
        /// The entity type expected to own the key.
        entity: Box<str>,
        /// The key field name.
        field: Box<str>,
    },
    /// The two sides of a join hold values of different kinds and could never compare equal.
    #[error("relationship `{entity}.{relationship}` joins {local} with {target}")]
    KeyKindMismatch {
        /// The entity type owning the relationship.
        entity: Box<str>,
        /// The relationship name.
        relationship: Box<str>,
        /// The kind of the owner's key.
        local: ScalarKind,
        /// The kind of the target's key.
        target: ScalarKind,
    },
}

/// Errors raised for selections that cannot be evaluated. This is a client-input error: the
/// request names something the schema does not declare, or uses it in the wrong way.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
    /// No entity type has this name.
    #[error("unknown entity type `{0}`")]
    UnknownEntity(Box<str>),
    /// The entity type has no field with this name.
    #[error("`{entity}` has no field `{field}`")]
    UnknownField {
        /// The entity type being selected from.
        entity: Box<str>,
        /// The requested field.
        field: Box<str>,
    },
    /// A relationship was selected without saying which of the related fields to include.
    #[error("relationship `{entity}.{field}` needs a nested selection")]
    MissingSubselection {
        /// The entity type being selected from.
        entity: Box<str>,
        /// The relationship name.
        field: Box<str>,
    },
    /// A scalar was selected with a nested selection.
    #[error("scalar `{entity}.{field}` cannot have a nested selection")]
    UnexpectedSubselection {
        /// The entity type being selected from.
        entity: Box<str>,
        /// The scalar field name.
        field: Box<str>,
    },
    /// A text search was requested on a field that does not hold text.
    #[error("`{entity}.{field}` is not a text field")]
    NotText {
        /// The entity type being searched.
        entity: Box<str>,
        /// The field name.
        field: Box<str>,
    },
}

/// Errors that reject a new instance. These are always raised before the store is touched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    /// A declared scalar field was not given a value.
    #[error("missing value for `{entity}.{field}`")]
    MissingField {
        /// The entity type being created.
        entity: Box<str>,
        /// The missing field.
        field: Box<str>,
    },
    /// A value was given for something that is not a scalar field of the entity type.
    #[error("`{entity}` has no scalar field `{field}`")]
    UnexpectedField {
        /// The entity type being created.
        entity: Box<str>,
        /// The offending field name.
        field: Box<str>,
    },
    /// The same field was given more than once.
    #[error("`{entity}.{field}` was given more than once")]
    RepeatedField {
        /// The entity type being created.
        entity: Box<str>,
        /// The repeated field.
        field: Box<str>,
    },
    /// A value has the wrong kind for its field.
    #[error("`{entity}.{field}` expects {expected}")]
    TypeMismatch {
        /// The entity type being created.
        entity: Box<str>,
        /// The field name.
        field: Box<str>,
        /// The kind the field is declared with.
        expected: ScalarKind,
    },
    /// The caller tried to choose the key of an instance whose key is assigned by the store.
    #[error("the key of a new `{0}` is assigned by the store")]
    AssignedId(Box<str>),
    /// An instance with this key already exists.
    #[error("`{entity}` already has an instance with id {key}")]
    DuplicateKey {
        /// The entity type being created.
        entity: Box<str>,
        /// The conflicting key.
        key: i64,
    },
    /// Keys are positive; this one is not, or no further key can be assigned.
    #[error("{key} is not a valid key for `{entity}`")]
    InvalidKey {
        /// The entity type being created.
        entity: Box<str>,
        /// The rejected key.
        key: i64,
    },
}

/// Errors that may occur when creating an instance. Created by
/// [`Resolver::create_instance`](crate::Resolver::create_instance) and
/// [`Resolver::seed`](crate::Resolver::seed).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CreateError {
    /// The entity type does not exist.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// The field values were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors that may occur when a point lookup is required to find something. Created by
/// [`Resolver::require_by_key`](crate::Resolver::require_by_key).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The selection was invalid.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// There was no instance with the requested key.
    #[error("no `{entity}` with id {key}")]
    NotFound {
        /// The entity type searched.
        entity: Box<str>,
        /// The requested key.
        key: i64,
    },
}

/// Errors that may occur when loading [`Settings`](crate::Settings) or building a resolver from
/// them.
#[derive(Debug, Error, Transitive)]
#[transitive(from(ValidationError, CreateError))]
pub enum SettingsError {
    /// The configuration sources could not be read or deserialized.
    #[error(transparent)]
    Load(#[from] ConfigError),
    /// A seed file could not be read.
    #[error("failed to read seed file {}: {source}", path.display())]
    Read {
        /// The seed file.
        path: PathBuf,
        /// The source error.
        #[source]
        source: IoError,
    },
    /// A seed file is not valid TOML, or does not map entity names to lists of records.
    #[error(transparent)]
    Parse(#[from] TomlError),
    /// The built-in schema was rejected.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A seed record was rejected.
    #[error(transparent)]
    Seed(#[from] CreateError),
}
