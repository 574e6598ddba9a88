//! Selections: the client-specified tree of fields to include in a result.

use crate::{
    errors::SelectionError,
    schema::{EntityType, FieldRef, Schema},
};
use nameof::{name_of, name_of_type};
use serde::{
    Deserialize, Deserializer,
    de::{Error as _, MapAccess, Visitor},
};
use std::{
    fmt::{Debug, Display, Error as FmtError, Formatter},
    slice::Iter,
};

/// A requested field, with the nested selection to apply to related instances.
#[derive(Clone, PartialEq, Eq)]
pub struct FieldSelection {
    /// The field name.
    name: Box<str>,
    /// The fields to include from related instances. [`None`] for scalars.
    selection: Option<Selection>,
}

impl FieldSelection {
    /// Select a scalar.
    #[inline]
    #[must_use]
    pub fn scalar(name: impl Into<Box<str>>) -> Self {
        Self {
            name: name.into(),
            selection: None,
        }
    }

    /// Select a relationship.
    #[inline]
    #[must_use]
    pub fn nested(name: impl Into<Box<str>>, selection: Selection) -> Self {
        Self {
            name: name.into(),
            selection: Some(selection),
        }
    }

    /// The field name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The nested selection, if any.
    #[inline]
    #[must_use]
    pub const fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }
}

/// A finite tree of requested fields.
///
/// Field names are unique within one level. Requesting a field twice merges the two requests,
/// taking the union of their nested selections. Results list fields in the order they were first
/// requested.
///
/// Selections deserialize from a list whose items are either a field name or a map from
/// relationship names to nested selections, e.g. `["name", {"books": ["title"]}]`.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<RawField>")]
pub struct Selection {
    /// The requested fields, in request order.
    fields: Vec<FieldSelection>,
}

impl Selection {
    /// An empty selection.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a scalar.
    #[inline]
    #[must_use]
    pub fn field(mut self, name: impl Into<Box<str>>) -> Self {
        self.insert(FieldSelection::scalar(name));
        self
    }

    /// Add a relationship with a nested selection.
    #[inline]
    #[must_use]
    pub fn nested(mut self, name: impl Into<Box<str>>, selection: Self) -> Self {
        self.insert(FieldSelection::nested(name, selection));
        self
    }

    /// Add a field, merging it into an existing request of the same name.
    #[inline]
    pub fn insert(&mut self, field: FieldSelection) {
        let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) else {
            self.fields.push(field);
            return;
        };
        if let Some(other) = field.selection {
            existing
                .selection
                .get_or_insert_with(Self::new)
                .merge(other);
        }
    }

    /// Merge every field of `other` into this selection.
    #[inline]
    pub fn merge(&mut self, other: Self) {
        for field in other.fields {
            self.insert(field);
        }
    }

    /// The requested fields, in request order.
    #[inline]
    pub fn fields(&self) -> Iter<'_, FieldSelection> {
        self.fields.iter()
    }

    /// The number of fields at this level.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are requested at this level.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check the whole tree against the schema, starting at `entity`.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is not declared, if a scalar has a nested selection, or if a
    /// relationship has none.
    #[inline]
    pub fn validate(&self, schema: &Schema, entity: &EntityType) -> Result<(), SelectionError> {
        for field in &self.fields {
            match (entity.field(&field.name), &field.selection) {
                (None, _) => {
                    return Err(SelectionError::UnknownField {
                        entity: entity.name().into(),
                        field: field.name.clone(),
                    });
                },
                (Some(FieldRef::Scalar(..)), None) => {},
                (Some(FieldRef::Scalar(..)), Some(_)) => {
                    return Err(SelectionError::UnexpectedSubselection {
                        entity: entity.name().into(),
                        field: field.name.clone(),
                    });
                },
                (Some(FieldRef::Relationship(_)), None) => {
                    return Err(SelectionError::MissingSubselection {
                        entity: entity.name().into(),
                        field: field.name.clone(),
                    });
                },
                (Some(FieldRef::Relationship(relationship)), Some(nested)) => {
                    let target = schema.entity_at(relationship.target_index());
                    nested.validate(schema, target)?;
                },
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a FieldSelection;
    type IntoIter = Iter<'a, FieldSelection>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.fields()
    }
}

impl FromIterator<FieldSelection> for Selection {
    #[inline]
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = FieldSelection>,
    {
        let mut selection = Self::new();
        for field in iter {
            selection.insert(field);
        }
        selection
    }
}

/// The serialized form of one list item.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawField {
    /// A bare field name.
    Scalar(Box<str>),
    /// Relationship names mapped to nested selections.
    Nested(NestedFields),
}

/// Relationship names mapped to nested selections, in document order.
struct NestedFields(Vec<FieldSelection>);

impl<'de> Deserialize<'de> for NestedFields {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(NestedFieldsVisitor)
    }
}

/// Reads [`NestedFields`] entry by entry, so the map's order survives.
struct NestedFieldsVisitor;

impl<'de> Visitor<'de> for NestedFieldsVisitor {
    type Value = NestedFields;

    #[inline]
    fn expecting(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str("a map from relationship names to selections")
    }

    #[inline]
    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut fields = Vec::<FieldSelection>::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, selection)) = map.next_entry::<Box<str>, Selection>()? {
            if fields.iter().any(|field| field.name == name) {
                return Err(A::Error::custom(format_args!("duplicate relationship `{name}`")));
            }
            fields.push(FieldSelection::nested(name, selection));
        }
        Ok(NestedFields(fields))
    }
}

impl From<Vec<RawField>> for Selection {
    fn from(value: Vec<RawField>) -> Self {
        value
            .into_iter()
            .flat_map(|raw| match raw {
                RawField::Scalar(name) => vec![FieldSelection::scalar(name)],
                RawField::Nested(NestedFields(fields)) => fields,
            })
            .collect()
    }
}

impl Display for FieldSelection {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match &self.selection {
            Some(selection) => write!(f, "{} {selection}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl Debug for FieldSelection {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let Self { name, selection } = self;
        if f.alternate() {
            Display::fmt(self, f)
        } else {
            f.debug_struct(name_of_type!(Self))
                .field(name_of!(name in Self), name)
                .field(name_of!(selection in Self), selection)
                .finish()
        }
    }
}

impl Display for Selection {
    /// Query syntax, e.g. `{ name books { title } }`.
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str("{")?;
        for field in &self.fields {
            write!(f, " {field}")?;
        }
        f.write_str(" }")
    }
}

impl Debug for Selection {
    /// The alternate form is the [`Display`] form.
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let Self { fields } = self;
        if f.alternate() {
            Display::fmt(self, f)
        } else {
            f.debug_struct(name_of_type!(Self))
                .field(name_of!(fields in Self), fields)
                .finish()
        }
    }
}
