//! The resolver: a schema, the instance stores of its entity types, and the operations over them.

use crate::{
    errors::{CreateError, LookupError, SelectionError, ValidationError},
    result::{Resolved, ResultNode},
    schema::{EntityType, FieldRef, ID_SLOT, Schema},
    selection::Selection,
    store::{Instance, InstanceStore, Store},
    value::Value,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

/// Read views of the store.
mod snapshot;
pub use snapshot::Snapshot;

/// Who chooses the key of a new instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Keys {
    /// The store assigns one more than the largest key so far. Supplying a key is an error.
    Assign,
    /// A supplied key is used as is; otherwise the store assigns one.
    Accept,
}

/// Evaluates selections against in-memory instance stores.
///
/// Reads take a shared lock for the duration of one evaluation; creating an instance takes the
/// exclusive lock. Readers therefore observe the store either before or after a creation, never
/// in between.
#[derive(Debug)]
pub struct Resolver {
    /// The schema, immutable for the lifetime of the resolver.
    schema: Arc<Schema>,
    /// One instance store per entity type of `schema`.
    store: RwLock<Store>,
}

impl Resolver {
    /// Create a resolver with empty stores.
    #[inline]
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        let schema = schema.into();
        let store = RwLock::new(Store::new(&schema));
        Self { schema, store }
    }

    /// The schema.
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Take a consistent read view of every store. Writers are blocked until it is dropped.
    #[inline]
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot::new(&self.schema, self.store.read())
    }

    /// The number of instances of an entity type.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity type does not exist.
    #[inline]
    pub fn len(&self, entity: &str) -> Result<usize, SelectionError> {
        self.snapshot().store(entity).map(InstanceStore::len)
    }

    /// Resolve a selection against every instance of an entity type. See
    /// [`Snapshot::resolve_collection`].
    ///
    /// # Errors
    ///
    /// Returns an error if the entity type does not exist or the selection does not fit it.
    #[inline]
    pub fn resolve_collection(
        &self,
        entity: &str,
        selection: &Selection,
    ) -> Result<Vec<ResultNode>, SelectionError> {
        self.snapshot().resolve_collection(entity, selection)
    }

    /// Resolve a selection against the instance with a given key, if one exists. See
    /// [`Snapshot::resolve_by_key`].
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
        self.snapshot().resolve_by_key(entity, key, selection)
    }

    /// Resolve a selection against the instance with a given key. If no such instance exists,
    /// <code>[Err]\([`NotFound`](LookupError::NotFound))</code> is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance is missing, the entity type does not exist, or the
    /// selection does not fit it.
    #[inline]
    pub fn require_by_key(
        &self,
        entity: &str,
        key: i64,
        selection: &Selection,
    ) -> Result<ResultNode, LookupError> {
        self.resolve_by_key(entity, key, selection)?
            .ok_or_else(|| LookupError::NotFound {
                entity: entity.into(),
                key,
            })
    }

    /// Resolve a selection against the first instance whose text field equals `needle`, ignoring
    /// case. See [`Snapshot::find_by_text`].
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
        self.snapshot()
            .find_by_text(entity, field, needle, selection)
    }

    /// Create an instance and return every scalar field of it.
    ///
    /// Every scalar field except the key must be given exactly once with a value of the declared
    /// kind. The key is assigned as one more than the largest key of the entity type so far, or 1
    /// if there are none. This assignment is only unique within one resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity type does not exist or the values are rejected. Nothing is
    /// stored on error.
    #[inline]
    pub fn create_instance<I, K>(&self, entity: &str, fields: I) -> Result<ResultNode, CreateError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.insert(entity, fields, Keys::Assign)
    }

    /// Like [`create_instance`](Self::create_instance), but the key may be given explicitly.
    /// Intended for loading static data.
    ///
    /// # Errors
    ///
    /// As [`create_instance`](Self::create_instance), and additionally if the given key is not
    /// positive or already in use.
    #[inline]
    pub fn seed<I, K>(&self, entity: &str, fields: I) -> Result<ResultNode, CreateError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.insert(entity, fields, Keys::Accept)
    }

    /// Shared implementation of [`create_instance`](Self::create_instance) and
    /// [`seed`](Self::seed).
    fn insert<I, K>(&self, entity: &str, fields: I, keys: Keys) -> Result<ResultNode, CreateError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let index = self
            .schema
            .position(entity)
            .ok_or_else(|| SelectionError::UnknownEntity(entity.into()))?;
        let entity_type = self.schema.entity_at(index);

        let (id, values) = collect_values(entity_type, fields, keys)
            .inspect_err(|err| warn!(entity, %err, "rejected new instance"))?;

        let mut store = self.store.write();
        let instances = store.get_mut(index);
        let id = assign_key(instances, entity, id)
            .inspect_err(|err| warn!(entity, %err, "rejected new instance"))?;

        let instance = instances.push(Instance::new(id, values));
        let node = entity_type
            .scalars()
            .iter()
            .zip(instance.values())
            .map(|(scalar, value)| {
                (
                    Box::<str>::from(scalar.name()),
                    Resolved::Scalar(value.clone()),
                )
            })
            .collect();
        drop(store);

        info!(entity, id, "created instance");
        Ok(node)
    }
}

/// The key of a new instance: the given one if it is unused, otherwise the next free one.
fn assign_key(
    instances: &InstanceStore,
    entity: &str,
    id: Option<i64>,
) -> Result<i64, ValidationError> {
    match id {
        Some(id) if instances.contains(id) => Err(ValidationError::DuplicateKey {
            entity: entity.into(),
            key: id,
        }),
        Some(id) => Ok(id),
        None => instances
            .next_id()
            .ok_or_else(|| ValidationError::InvalidKey {
                entity: entity.into(),
                key: i64::MAX,
            }),
    }
}

/// Check field values against an entity type and put them in declaration order.
///
/// Returns the explicitly given key, if any, and the values with a placeholder at the key
/// position.
fn collect_values<I, K>(
    entity: &EntityType,
    fields: I,
    keys: Keys,
) -> Result<(Option<i64>, Box<[Value]>), ValidationError>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut slots = vec![None; entity.scalars().len()];
    for (name, value) in fields {
        let name = name.as_ref();
        let Some(FieldRef::Scalar(slot, scalar)) = entity.field(name) else {
            return Err(ValidationError::UnexpectedField {
                entity: entity.name().into(),
                field: name.into(),
            });
        };
        if slot == ID_SLOT && keys == Keys::Assign {
            return Err(ValidationError::AssignedId(entity.name().into()));
        }
        if value.kind() != scalar.kind() {
            return Err(ValidationError::TypeMismatch {
                entity: entity.name().into(),
                field: name.into(),
                expected: scalar.kind(),
            });
        }
        if slots[slot].replace(value).is_some() {
            return Err(ValidationError::RepeatedField {
                entity: entity.name().into(),
                field: name.into(),
            });
        }
    }

    let id = slots[ID_SLOT].take().and_then(|key| key.as_int());
    if let Some(key) = id.filter(|&key| key < 1) {
        return Err(ValidationError::InvalidKey {
            entity: entity.name().into(),
            key,
        });
    }

    let mut values = Vec::with_capacity(slots.len());
    // Placeholder, overwritten once the key is known.
    values.push(Value::Int(0));
    for (value, scalar) in slots.into_iter().zip(entity.scalars()).skip(1) {
        let value = value.ok_or_else(|| ValidationError::MissingField {
            entity: entity.name().into(),
            field: scalar.name().into(),
        })?;
        values.push(value);
    }

    Ok((id, values.into()))
}
