//! Result trees.

use crate::value::Value;
use serde::{Serialize, Serializer, ser::SerializeMap as _};
use std::slice::Iter;

/// The resolved value of one requested field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Resolved {
    /// A one-to-one relationship without a match.
    Null,
    /// A scalar.
    Scalar(Value),
    /// A one-to-one relationship.
    Node(ResultNode),
    /// A one-to-many relationship, in the target's store order.
    List(Vec<ResultNode>),
}

impl Resolved {
    /// The scalar, if this is one.
    #[inline]
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Null | Self::Node(_) | Self::List(_) => None,
        }
    }

    /// The node, if this is one.
    #[inline]
    #[must_use]
    pub const fn as_node(&self) -> Option<&ResultNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Null | Self::Scalar(_) | Self::List(_) => None,
        }
    }

    /// The nodes, if this is a list.
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[ResultNode]> {
        match self {
            Self::List(nodes) => Some(nodes),
            Self::Null | Self::Scalar(_) | Self::Node(_) => None,
        }
    }

    /// Whether this is [`Null`](Self::Null).
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// The result of resolving a selection against one instance: exactly the requested fields, in
/// request order.
///
/// Serializes as a map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultNode {
    /// Field names and their resolved values.
    fields: Vec<(Box<str>, Resolved)>,
}

impl ResultNode {
    /// The resolved value of a field, if it was requested.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Resolved> {
        self.fields
            .iter()
            .find(|(field, _)| **field == *name)
            .map(|(_, value)| value)
    }

    /// The requested field names, in request order.
    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| &**name)
    }

    /// Field names and resolved values, in request order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, (Box<str>, Resolved)> {
        self.fields.iter()
    }

    /// The number of fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(Box<str>, Resolved)> for ResultNode {
    #[inline]
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (Box<str>, Resolved)>,
    {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ResultNode {
    type Item = &'a (Box<str>, Resolved);
    type IntoIter = Iter<'a, (Box<str>, Resolved)>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for ResultNode {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
