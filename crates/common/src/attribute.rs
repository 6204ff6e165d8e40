//! The store's typed attribute model.
//!
//! A [`StartKey`] is the last-evaluated key returned by a paginated query or
//! scan. Every attribute in it is a [`TaggedValue`], a discriminated union
//! mirroring the store's attribute types.

use std::collections::BTreeMap;

/// Last-evaluated key of a paginated query, keyed by attribute name.
///
/// Sorted by attribute name, so two equal keys always serialise to the same
/// bytes.
pub type StartKey = BTreeMap<String, TaggedValue>;

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaggedValue {
    /// UTF-8 string.
    String(String),
    /// Decimal number, kept as text so no precision is lost.
    Number(String),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// Boolean.
    Bool(bool),
    /// Explicit null.
    Null,
    /// Set of strings.
    StringSet(Vec<String>),
    /// Set of decimal numbers.
    NumberSet(Vec<String>),
    /// Set of byte strings.
    BinarySet(Vec<Vec<u8>>),
    /// Ordered list of heterogeneous values.
    List(Vec<TaggedValue>),
    /// Nested map of named values.
    Map(BTreeMap<String, TaggedValue>),
}

impl TaggedValue {
    /// Construct a [`TaggedValue::String`].
    pub fn string(value: impl Into<String>) -> Self {
        TaggedValue::String(value.into())
    }

    /// Construct a [`TaggedValue::Number`] from anything that formats as a decimal.
    pub fn number(value: impl ToString) -> Self {
        TaggedValue::Number(value.to_string())
    }

    /// Construct a [`TaggedValue::Binary`].
    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        TaggedValue::Binary(value.into())
    }

    /// The store's type descriptor for this variant (`"S"`, `"N"`, `"BOOL"`, ...).
    pub fn type_tag(&self) -> &'static str {
        match self {
            TaggedValue::String(_) => "S",
            TaggedValue::Number(_) => "N",
            TaggedValue::Binary(_) => "B",
            TaggedValue::Bool(_) => "BOOL",
            TaggedValue::Null => "NULL",
            TaggedValue::StringSet(_) => "SS",
            TaggedValue::NumberSet(_) => "NS",
            TaggedValue::BinarySet(_) => "BS",
            TaggedValue::List(_) => "L",
            TaggedValue::Map(_) => "M",
        }
    }
}

impl From<&str> for TaggedValue {
    fn from(value: &str) -> Self {
        TaggedValue::String(value.to_owned())
    }
}

impl From<String> for TaggedValue {
    fn from(value: String) -> Self {
        TaggedValue::String(value)
    }
}

impl From<bool> for TaggedValue {
    fn from(value: bool) -> Self {
        TaggedValue::Bool(value)
    }
}

impl From<Vec<u8>> for TaggedValue {
    fn from(value: Vec<u8>) -> Self {
        TaggedValue::Binary(value)
    }
}
