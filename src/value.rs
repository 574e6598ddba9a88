//! Scalar values.

use crate::schema::ScalarKind;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Error as FmtError, Formatter};

/// A stored scalar.
///
/// Serialized untagged, i.e. as a bare JSON number or string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// An integer.
    Int(i64),
    /// A string.
    Text(Box<str>),
}

impl Value {
    /// The kind of this value.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        match self {
            Self::Int(_) => ScalarKind::Int,
            Self::Text(_) => ScalarKind::Text,
        }
    }

    /// The integer, if this is one.
    #[inline]
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(int) => Some(*int),
            Self::Text(_) => None,
        }
    }

    /// The string, if this is one.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Text(text) => Some(text),
        }
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for Value {
    #[inline]
    fn from(value: String) -> Self {
        Self::Text(value.into())
    }
}

impl Display for Value {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::Int(int) => write!(f, "{int}"),
            Self::Text(text) => write!(f, "\"{}\"", text.escape_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// # Panics
    ///
    /// Panics if values do not display as literals.
    #[test]
    fn display() {
        assert_eq!(Value::Int(-7).to_string(), "-7");
        assert_eq!(Value::from("1984").to_string(), "\"1984\"");
        assert_eq!(
            Value::from("Philosopher's \"Stone\"").to_string(),
            r#""Philosopher\'s \"Stone\"""#
        );
    }
}
