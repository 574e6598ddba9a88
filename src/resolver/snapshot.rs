//! Consistent read views of the store.

use crate::{
    errors::SelectionError,
    result::{Resolved, ResultNode},
    schema::{Cardinality, EntityType, FieldRef, ID_SLOT, Relationship, ScalarKind, Schema},
    selection::{FieldSelection, Selection},
    store::{Instance, InstanceStore, Store},
};
use either::Either;
use parking_lot::RwLockReadGuard;
use tracing::debug;

/// A read view of every instance store, holding the resolver's read lock.
///
/// Every read operation of [`Resolver`](crate::Resolver) evaluates against one snapshot, so a
/// concurrent mutation is either entirely visible or not at all. Holding a snapshot blocks
/// writers; drop it as soon as resolution is done.
#[derive(Debug)]
pub struct Snapshot<'a> {
    /// The schema of the resolver.
    schema: &'a Schema,
    /// The read guard over the stores.
    store: RwLockReadGuard<'a, Store>,
}

impl<'a> Snapshot<'a> {
    /// Create a snapshot from an acquired read guard.
    pub(super) fn new(schema: &'a Schema, store: RwLockReadGuard<'a, Store>) -> Self {
        Self { schema, store }
    }

    /// Look up an entity type along with its store position.
    fn entity(&self, name: &str) -> Result<(usize, &'a EntityType), SelectionError> {
        self.schema
            .position(name)
            .map(|index| (index, self.schema.entity_at(index)))
            .ok_or_else(|| SelectionError::UnknownEntity(name.into()))
    }

    /// The instance store of an entity type.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity type does not exist.
    #[inline]
    pub fn store(&self, entity: &str) -> Result<&InstanceStore, SelectionError> {
        let (index, _) = self.entity(entity)?;
        Ok(self.store.get(index))
    }

    /// The instances of an entity type, in store order.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity type does not exist.
    #[inline]
    pub fn instances(&self, entity: &str) -> Result<&[Instance], SelectionError> {
        self.store(entity).map(InstanceStore::as_slice)
    }

    /// Resolve a selection against every instance of an entity type, in store order. An empty
    /// store produces an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity type does not exist or the selection does not fit it. The
    /// selection is checked before any instance is visited.
    #[inline]
    pub fn resolve_collection(
        &self,
        entity: &str,
        selection: &Selection,
    ) -> Result<Vec<ResultNode>, SelectionError> {
        let (index, entity_type) = self.entity(entity)?;
        selection.validate(self.schema, entity_type)?;

        let instances = self.store.get(index);
        debug!(
            entity,
            instances = instances.len(),
            %selection,
            "resolving collection"
        );
        instances
            .iter()
            .map(|instance| self.resolve_node(entity_type, instance, selection))
            .collect()
    }

    /// Resolve a selection against the instance with a given key. A missing instance is not an
    /// error, and produces [`None`].
    ///
    /// # Errors
    ///
    /// Returns an error if the entity type does not exist or the selection does not fit it.
    #[inline]
    pub fn resolve_by_key(
        &self,
        entity: &str,
        key: i64,
        selection: &Selection,
    ) -> Result<Option<ResultNode>, SelectionError> {
        let (index, entity_type) = self.entity(entity)?;
        selection.validate(self.schema, entity_type)?;

        let found = self.store.get(index).get(key);
        debug!(entity, key, found = found.is_some(), "resolving by key");
        found
            .map(|instance| self.resolve_node(entity_type, instance, selection))
            .transpose()
    }

    /// Resolve a selection against the first instance, in store order, whose text field `field`
    /// equals `needle` ignoring case. A missing instance is not an error, and produces [`None`].
    ///
    /// # Errors
    ///
    /// Returns an error if the entity type does not exist, if `field` is not one of its text
    /// fields, or if the selection does not fit it.
    #[inline]
    pub fn find_by_text(
        &self,
        entity: &str,
        field: &str,
        needle: &str,
        selection: &Selection,
    ) -> Result<Option<ResultNode>, SelectionError> {
        let (index, entity_type) = self.entity(entity)?;
        let slot = match entity_type.field(field) {
            Some(FieldRef::Scalar(slot, scalar)) if scalar.kind() == ScalarKind::Text => slot,
            Some(FieldRef::Scalar(..) | FieldRef::Relationship(_)) => {
                return Err(SelectionError::NotText {
                    entity: entity.into(),
                    field: field.into(),
                });
            },
            None => {
                return Err(SelectionError::UnknownField {
                    entity: entity.into(),
                    field: field.into(),
                });
            },
        };
        selection.validate(self.schema, entity_type)?;

        let needle = needle.to_lowercase();
        let found = self.store.get(index).iter().find(|instance| {
            instance
                .value(slot)
                .as_text()
                .is_some_and(|text| text.to_lowercase() == needle)
        });
        debug!(entity, field, found = found.is_some(), "resolving by text");
        found
            .map(|instance| self.resolve_node(entity_type, instance, selection))
            .transpose()
    }

    /// Resolve a selection against one instance of `entity`. The instance must come from the
    /// store of `entity`, and `entity` from this snapshot's schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection does not fit the entity type.
    fn resolve_node(
        &self,
        entity: &EntityType,
        instance: &Instance,
        selection: &Selection,
    ) -> Result<ResultNode, SelectionError> {
        selection
            .fields()
            .map(|field| {
                self.resolve_field(entity, instance, field)
                    .map(|value| (Box::<str>::from(field.name()), value))
            })
            .collect()
    }

    /// Resolve one requested field of an instance of `entity`.
    ///
    /// Scalars resolve to their stored value. Relationships resolve by finding the target
    /// instances whose key equals this instance's key, then resolving the nested selection against
    /// each: a one-to-one relationship produces a node or [`Null`](Resolved::Null), a one-to-many
    /// relationship a list, possibly empty. Nesting depth is bounded only by the selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the field, or any nested field, does not fit the entity type.
    fn resolve_field(
        &self,
        entity: &EntityType,
        instance: &Instance,
        field: &FieldSelection,
    ) -> Result<Resolved, SelectionError> {
        match (entity.field(field.name()), field.selection()) {
            (None, _) => Err(SelectionError::UnknownField {
                entity: entity.name().into(),
                field: field.name().into(),
            }),
            (Some(FieldRef::Scalar(slot, _)), None) => {
                Ok(Resolved::Scalar(instance.value(slot).clone()))
            },
            (Some(FieldRef::Scalar(..)), Some(_)) => Err(SelectionError::UnexpectedSubselection {
                entity: entity.name().into(),
                field: field.name().into(),
            }),
            (Some(FieldRef::Relationship(_)), None) => Err(SelectionError::MissingSubselection {
                entity: entity.name().into(),
                field: field.name().into(),
            }),
            (Some(FieldRef::Relationship(relationship)), Some(nested)) => {
                let target = self.schema.entity_at(relationship.target_index());
                let mut related = self.related(relationship, instance);
                match relationship.cardinality() {
                    Cardinality::One => Ok(related
                        .next()
                        .map(|other| self.resolve_node(target, other, nested))
                        .transpose()?
                        .map_or(Resolved::Null, Resolved::Node)),
                    Cardinality::Many => related
                        .map(|other| self.resolve_node(target, other, nested))
                        .collect::<Result<Vec<_>, _>>()
                        .map(Resolved::List),
                }
            },
        }
    }

    /// The target instances of a relationship from one instance, in target store order.
    ///
    /// Joins on the target's key use the key index; any other join scans the target store.
    fn related<'s>(
        &'s self,
        relationship: &'s Relationship,
        instance: &'s Instance,
    ) -> impl Iterator<Item = &'s Instance> + 's {
        let key = instance.value(relationship.local_slot());
        let target_slot = relationship.target_slot();
        let target = self.store.get(relationship.target_index());

        if target_slot == ID_SLOT {
            Either::Left(key.as_int().and_then(|id| target.get(id)).into_iter())
        } else {
            Either::Right(
                target
                    .iter()
                    .filter(move |other| other.value(target_slot) == key),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Resolver, Selection,
        library::{self, AUTHOR, BOOK},
        result::Resolved,
        value::Value,
    };

    /// # Panics
    ///
    /// Panics if an instance is resolved against an entity type it does not belong to.
    #[test]
    fn instances_resolve_as_their_own_type() {
        let resolver = Resolver::new(library::schema().expect("library schema is valid"));
        library::seed(&resolver).expect("library seed is valid");
        let snapshot = resolver.snapshot();

        // Book 3 exists; author 3 does not.
        assert_eq!(
            snapshot.resolve_by_key(AUTHOR, 3, &Selection::new().field("name")),
            Ok(None)
        );
        let book = snapshot
            .resolve_by_key(BOOK, 3, &Selection::new().field("title"))
            .expect("valid selection")
            .expect("book 3 exists");
        assert_eq!(
            book.get("title"),
            Some(&Resolved::Scalar(Value::from(
                "Harry Potter and the Philosopher's Stone"
            )))
        );

        let authors = snapshot
            .resolve_collection(AUTHOR, &Selection::new().field("name"))
            .expect("valid selection");
        assert_eq!(authors.len(), snapshot.instances(AUTHOR).map_or(0, <[_]>::len));
        assert!(authors.iter().all(|author| author.get("name").is_some()));
    }
}
