//! Statically declared entity types and the relationships between them.
//!
//! A [`Schema`] is built once, validated, and then treated as immutable configuration shared by
//! everything that resolves against it.

use crate::{errors::SchemaError, selection::Selection};
use std::{
    collections::HashMap,
    fmt::{Display, Error as FmtError, Formatter},
};

/// The name of the key field carried by every entity type.
pub const ID: &str = "id";

/// The position of the key among an entity type's scalar fields.
pub(crate) const ID_SLOT: usize = 0;

/// The kind of value a scalar field holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// A signed 64-bit integer.
    Int,
    /// A string.
    Text,
}

impl Display for ScalarKind {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::Int => f.write_str("an integer"),
            Self::Text => f.write_str("text"),
        }
    }
}

/// How many instances a relationship resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// At most one instance. No match resolves to null.
    One,
    /// Any number of instances, in the target's store order. No match resolves to an empty list.
    Many,
}

/// A named field holding a stored value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScalarField {
    /// The field name.
    name: Box<str>,
    /// The kind of value held.
    kind: ScalarKind,
}

impl ScalarField {
    /// The field name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of value held.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        self.kind
    }
}

/// A computed field, resolved by matching a key of the owning instance against a key of the
/// instances of another entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    /// The field name.
    name: Box<str>,
    /// The name of the target entity type.
    target: Box<str>,
    /// The position of the target entity type in the schema.
    target_index: usize,
    /// The position of the joined key among the owner's scalars.
    local_slot: usize,
    /// The position of the joined key among the target's scalars.
    target_slot: usize,
    /// How many instances the relationship resolves to.
    cardinality: Cardinality,
}

impl Relationship {
    /// The field name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name of the target entity type.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// How many instances the relationship resolves to.
    #[inline]
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// The schema position of the target entity type.
    pub(crate) const fn target_index(&self) -> usize {
        self.target_index
    }

    /// The value position of the joined scalar of the owner.
    pub(crate) const fn local_slot(&self) -> usize {
        self.local_slot
    }

    /// The value position of the joined scalar of the target.
    pub(crate) const fn target_slot(&self) -> usize {
        self.target_slot
    }
}

/// A field of an entity type, as found by [`EntityType::field`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldRef<'a> {
    /// A scalar, along with its position in the instance.
    Scalar(usize, &'a ScalarField),
    /// A relationship.
    Relationship(&'a Relationship),
}

/// Where a field name points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    /// Index into `scalars`.
    Scalar(usize),
    /// Index into `relationships`.
    Relationship(usize),
}

/// A named record kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityType {
    /// The type name.
    name: Box<str>,
    /// Scalar fields in declaration order, starting with the key.
    scalars: Box<[ScalarField]>,
    /// Relationships in declaration order.
    relationships: Box<[Relationship]>,
    /// Every field name, scalar or not.
    fields: HashMap<Box<str>, Slot>,
}

impl EntityType {
    /// Start declaring an entity type. The key field [`ID`] is declared implicitly.
    #[inline]
    #[must_use]
    pub fn builder(name: impl Into<Box<str>>) -> EntityTypeBuilder {
        EntityTypeBuilder {
            name: name.into(),
            scalars: vec![ScalarField {
                name: ID.into(),
                kind: ScalarKind::Int,
            }],
            relationships: Vec::new(),
        }
    }

    /// The type name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scalar fields in declaration order. The first is always the key.
    #[inline]
    #[must_use]
    pub fn scalars(&self) -> &[ScalarField] {
        &self.scalars
    }

    /// Relationships in declaration order.
    #[inline]
    #[must_use]
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Look up a field by name.
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        self.fields.get(name).map(|slot| match *slot {
            Slot::Scalar(index) => FieldRef::Scalar(index, &self.scalars[index]),
            Slot::Relationship(index) => FieldRef::Relationship(&self.relationships[index]),
        })
    }

    /// A selection of every scalar field and no relationships.
    #[inline]
    #[must_use]
    pub fn scalar_selection(&self) -> Selection {
        self.scalars
            .iter()
            .fold(Selection::new(), |selection, scalar| selection.field(scalar.name()))
    }
}

/// A relationship as declared, before names are resolved to positions.
#[derive(Clone, Debug)]
struct RelationshipDecl {
    /// The field name.
    name: Box<str>,
    /// The target entity type.
    target: Box<str>,
    /// The joined scalar of the owner.
    local_key: Box<str>,
    /// The joined scalar of the target.
    target_key: Box<str>,
    /// How many instances the relationship resolves to.
    cardinality: Cardinality,
}

/// Declares an [`EntityType`]. Created by [`EntityType::builder`].
#[derive(Clone, Debug)]
pub struct EntityTypeBuilder {
    /// The type name.
    name: Box<str>,
    /// Scalar fields, starting with the key.
    scalars: Vec<ScalarField>,
    /// Relationships, not yet resolved.
    relationships: Vec<RelationshipDecl>,
}

impl EntityTypeBuilder {
    /// Declare a scalar field.
    #[inline]
    #[must_use]
    pub fn scalar(mut self, name: impl Into<Box<str>>, kind: ScalarKind) -> Self {
        self.scalars.push(ScalarField {
            name: name.into(),
            kind,
        });
        self
    }

    /// Declare a text field.
    #[inline]
    #[must_use]
    pub fn text(self, name: impl Into<Box<str>>) -> Self {
        self.scalar(name, ScalarKind::Text)
    }

    /// Declare an integer field.
    #[inline]
    #[must_use]
    pub fn int(self, name: impl Into<Box<str>>) -> Self {
        self.scalar(name, ScalarKind::Int)
    }

    /// Declare a relationship resolving to the one instance of `target` whose `target_key`
    /// equals this instance's `local_key`.
    #[inline]
    #[must_use]
    pub fn one(
        self,
        name: impl Into<Box<str>>,
        target: impl Into<Box<str>>,
        local_key: impl Into<Box<str>>,
        target_key: impl Into<Box<str>>,
    ) -> Self {
        self.relationship(name, target, local_key, target_key, Cardinality::One)
    }

    /// Declare a relationship resolving to every instance of `target` whose `target_key` equals
    /// this instance's `local_key`.
    #[inline]
    #[must_use]
    pub fn many(
        self,
        name: impl Into<Box<str>>,
        target: impl Into<Box<str>>,
        local_key: impl Into<Box<str>>,
        target_key: impl Into<Box<str>>,
    ) -> Self {
        self.relationship(name, target, local_key, target_key, Cardinality::Many)
    }

    /// Shared implementation of [`one`](Self::one) and [`many`](Self::many).
    fn relationship(
        mut self,
        name: impl Into<Box<str>>,
        target: impl Into<Box<str>>,
        local_key: impl Into<Box<str>>,
        target_key: impl Into<Box<str>>,
        cardinality: Cardinality,
    ) -> Self {
        self.relationships.push(RelationshipDecl {
            name: name.into(),
            target: target.into(),
            local_key: local_key.into(),
            target_key: target_key.into(),
            cardinality,
        });
        self
    }

    /// Find a declared scalar by name.
    fn scalar_slot(&self, name: &str) -> Option<(usize, &ScalarField)> {
        self.scalars
            .iter()
            .enumerate()
            .find(|(_, scalar)| scalar.name() == name)
    }

    /// Resolve relationship names against the other declarations of the schema.
    fn resolve(
        &self,
        all: &[Self],
        by_name: &HashMap<Box<str>, usize>,
    ) -> Result<EntityType, SchemaError> {
        let duplicate = |field: &str| SchemaError::DuplicateField {
            entity: self.name.clone(),
            field: field.into(),
        };

        let mut fields = HashMap::with_capacity(self.scalars.len() + self.relationships.len());
        for (index, scalar) in self.scalars.iter().enumerate() {
            if fields
                .insert(scalar.name.clone(), Slot::Scalar(index))
                .is_some()
            {
                return Err(duplicate(&scalar.name));
            }
        }

        let mut relationships = Vec::with_capacity(self.relationships.len());
        for (index, decl) in self.relationships.iter().enumerate() {
            if fields
                .insert(decl.name.clone(), Slot::Relationship(index))
                .is_some()
            {
                return Err(duplicate(&decl.name));
            }
            relationships.push(self.resolve_relationship(decl, all, by_name)?);
        }

        Ok(EntityType {
            name: self.name.clone(),
            scalars: self.scalars.clone().into(),
            relationships: relationships.into(),
            fields,
        })
    }

    /// Resolve a single relationship.
    fn resolve_relationship(
        &self,
        decl: &RelationshipDecl,
        all: &[Self],
        by_name: &HashMap<Box<str>, usize>,
    ) -> Result<Relationship, SchemaError> {
        let target_index = *by_name
            .get(&decl.target)
            .ok_or_else(|| SchemaError::UnknownTarget {
                entity: self.name.clone(),
                relationship: decl.name.clone(),
                target: decl.target.clone(),
            })?;
        let target = &all[target_index];

        let (local_slot, local) = self
            .scalar_slot(&decl.local_key)
            .ok_or_else(|| SchemaError::UnknownKey {
                entity: self.name.clone(),
                field: decl.local_key.clone(),
            })?;
        let (target_slot, remote) = target
            .scalar_slot(&decl.target_key)
            .ok_or_else(|| SchemaError::UnknownKey {
                entity: target.name.clone(),
                field: decl.target_key.clone(),
            })?;

        if local.kind != remote.kind {
            return Err(SchemaError::KeyKindMismatch {
                entity: self.name.clone(),
                relationship: decl.name.clone(),
                local: local.kind,
                target: remote.kind,
            });
        }

        Ok(Relationship {
            name: decl.name.clone(),
            target: decl.target.clone(),
            target_index,
            local_slot,
            target_slot,
            cardinality: decl.cardinality,
        })
    }
}

/// A registry of entity types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    /// Entity types in declaration order.
    entities: Box<[EntityType]>,
    /// Positions in `entities` by name.
    by_name: HashMap<Box<str>, usize>,
}

impl Schema {
    /// Start declaring a schema.
    #[inline]
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Look up an entity type by name.
    #[inline]
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityType> {
        self.position(name).map(|index| &self.entities[index])
    }

    /// Entity types in declaration order.
    #[inline]
    pub fn entities(&self) -> impl ExactSizeIterator<Item = &EntityType> {
        self.entities.iter()
    }

    /// The number of entity types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entity types are declared.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The position of an entity type, which is also the position of its instance store.
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// The entity type at a position obtained from this schema.
    pub(crate) fn entity_at(&self, index: usize) -> &EntityType {
        &self.entities[index]
    }
}

/// Declares a [`Schema`]. Created by [`Schema::builder`].
#[derive(Clone, Debug, Default)]
pub struct SchemaBuilder {
    /// Entity types in declaration order.
    entities: Vec<EntityTypeBuilder>,
}

impl SchemaBuilder {
    /// Declare an entity type.
    #[inline]
    #[must_use]
    pub fn entity(mut self, entity: EntityTypeBuilder) -> Self {
        self.entities.push(entity);
        self
    }

    /// Validate the declarations and build the schema. Relationships may point at entity types
    /// declared after their owner, and may form cycles.
    ///
    /// # Errors
    ///
    /// Returns an error if names are repeated, if a relationship targets an undeclared type, or
    /// if a relationship joins on a missing key or on keys of different kinds.
    #[inline]
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut by_name = HashMap::with_capacity(self.entities.len());
        for (index, entity) in self.entities.iter().enumerate() {
            if by_name.insert(entity.name.clone(), index).is_some() {
                return Err(SchemaError::DuplicateEntity(entity.name.clone()));
            }
        }

        let entities = self
            .entities
            .iter()
            .map(|entity| entity.resolve(&self.entities, &by_name))
            .collect::<Result<Box<_>, _>>()?;

        Ok(Schema { entities, by_name })
    }
}
