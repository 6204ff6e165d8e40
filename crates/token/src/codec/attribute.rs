//! Conversion between [`TaggedValue`] and its JSON form.
//!
//! Every value is a single-entry object keyed by the store's type descriptor:
//!
//! ```text
//! {"S":"user#42"}  {"N":"12.5"}  {"B":"..."}  {"BOOL":true}  {"NULL":true}
//! {"SS":[..]}  {"NS":[..]}  {"BS":[..]}  {"L":[..]}  {"M":{..}}
//! ```
//!
//! Binary values travel as text decoded with the configured [`Charset`] and
//! are re-encoded with the same charset on the way back.

use std::collections::BTreeMap;

use common::{InvalidTokenError, TaggedValue, TokenErrorKind};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Text encoding applied to binary attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Charset {
    /// UTF-8. Binary values that are not valid UTF-8 cannot be encoded.
    #[default]
    #[serde(rename = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
    /// ISO-8859-1. Every byte maps to one code point, so any binary value
    /// is representable.
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl Charset {
    /// Canonical charset name.
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Latin1 => "latin-1",
        }
    }

    /// Decode raw bytes to text, or `None` if the bytes are not valid in this charset.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Charset::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Charset::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Encode text to raw bytes, or `None` if a character is outside this charset.
    pub fn encode(&self, text: &str) -> Option<Vec<u8>> {
        match self {
            Charset::Utf8 => Some(text.as_bytes().to_vec()),
            Charset::Latin1 => text.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect(),
        }
    }
}

/// Encodes and decodes individual attribute values.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeCodec {
    charset: Charset,
}

impl AttributeCodec {
    /// Create a codec that transports binary values in `charset`.
    pub fn new(charset: Charset) -> Self {
        Self { charset }
    }

    /// The charset used for binary values.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Convert a value to its JSON form.
    ///
    /// # Errors
    ///
    /// Returns an `unsupported-value` error if a binary value is not valid in
    /// the configured charset, or a number is not a finite decimal.
    pub fn encode(&self, value: &TaggedValue) -> Result<Value, InvalidTokenError> {
        let node = match value {
            TaggedValue::String(s) => Value::String(s.clone()),
            TaggedValue::Number(n) => Value::String(self.encode_number(n)?),
            TaggedValue::Binary(b) => Value::String(self.encode_binary(b)?),
            TaggedValue::Bool(b) => Value::Bool(*b),
            TaggedValue::Null => Value::Bool(true),
            TaggedValue::StringSet(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            TaggedValue::NumberSet(items) => Value::Array(
                items
                    .iter()
                    .map(|n| self.encode_number(n).map(Value::String))
                    .collect::<Result<_, _>>()?,
            ),
            TaggedValue::BinarySet(items) => Value::Array(
                items
                    .iter()
                    .map(|b| self.encode_binary(b).map(Value::String))
                    .collect::<Result<_, _>>()?,
            ),
            TaggedValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.encode(v))
                    .collect::<Result<_, _>>()?,
            ),
            TaggedValue::Map(entries) => {
                let mut map = Map::new();
                for (name, v) in entries {
                    map.insert(name.clone(), self.encode(v)?);
                }
                Value::Object(map)
            }
        };

        let mut tagged = Map::new();
        tagged.insert(value.type_tag().to_owned(), node);
        Ok(Value::Object(tagged))
    }

    /// Convert a JSON node back into a value.
    ///
    /// # Errors
    ///
    /// Returns a `malformed-structure` error if the node is not a single-entry
    /// object with a known type tag, or its payload has the wrong shape.
    pub fn decode(&self, node: &Value) -> Result<TaggedValue, InvalidTokenError> {
        let Value::Object(tagged) = node else {
            return Err(malformed("attribute value must be an object"));
        };
        let mut entries = tagged.iter();
        let (tag, payload) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => return Err(malformed("attribute value must carry exactly one type tag")),
        };

        match tag.as_str() {
            "S" => expect_str(tag, payload).map(|s| TaggedValue::String(s.to_owned())),
            "N" => self.decode_number(expect_str(tag, payload)?).map(TaggedValue::Number),
            "B" => self.decode_binary(expect_str(tag, payload)?).map(TaggedValue::Binary),
            "BOOL" => match payload {
                Value::Bool(b) => Ok(TaggedValue::Bool(*b)),
                _ => Err(malformed("BOOL attribute must be a boolean")),
            },
            "NULL" => match payload {
                Value::Bool(true) => Ok(TaggedValue::Null),
                _ => Err(malformed("NULL attribute must be `true`")),
            },
            "SS" => expect_array(tag, payload)?
                .iter()
                .map(|item| expect_str(tag, item).map(str::to_owned))
                .collect::<Result<_, _>>()
                .map(TaggedValue::StringSet),
            "NS" => expect_array(tag, payload)?
                .iter()
                .map(|item| self.decode_number(expect_str(tag, item)?))
                .collect::<Result<_, _>>()
                .map(TaggedValue::NumberSet),
            "BS" => expect_array(tag, payload)?
                .iter()
                .map(|item| self.decode_binary(expect_str(tag, item)?))
                .collect::<Result<_, _>>()
                .map(TaggedValue::BinarySet),
            "L" => expect_array(tag, payload)?
                .iter()
                .map(|item| self.decode(item))
                .collect::<Result<_, _>>()
                .map(TaggedValue::List),
            "M" => match payload {
                Value::Object(map) => map
                    .iter()
                    .map(|(name, item)| self.decode(item).map(|v| (name.clone(), v)))
                    .collect::<Result<BTreeMap<_, _>, _>>()
                    .map(TaggedValue::Map),
                _ => Err(malformed("M attribute must be an object")),
            },
            other => Err(malformed(format!("unknown attribute type tag {other:?}"))),
        }
    }

    fn encode_binary(&self, bytes: &[u8]) -> Result<String, InvalidTokenError> {
        self.charset.decode(bytes).ok_or_else(|| {
            InvalidTokenError::new(
                TokenErrorKind::UnsupportedValue,
                "",
                format!("binary value is not representable in {}", self.charset.name()),
            )
        })
    }

    fn decode_binary(&self, text: &str) -> Result<Vec<u8>, InvalidTokenError> {
        self.charset.encode(text).ok_or_else(|| {
            malformed(format!("binary value is not representable in {}", self.charset.name()))
        })
    }

    fn encode_number(&self, text: &str) -> Result<String, InvalidTokenError> {
        if is_decimal(text) {
            Ok(text.to_owned())
        } else {
            Err(InvalidTokenError::new(
                TokenErrorKind::UnsupportedValue,
                "",
                format!("{text:?} is not a decimal number"),
            ))
        }
    }

    fn decode_number(&self, text: &str) -> Result<String, InvalidTokenError> {
        if is_decimal(text) {
            Ok(text.to_owned())
        } else {
            Err(malformed(format!("{text:?} is not a decimal number")))
        }
    }
}

fn is_decimal(text: &str) -> bool {
    text.parse::<serde_json::Number>().is_ok()
}

fn expect_str<'a>(tag: &str, node: &'a Value) -> Result<&'a str, InvalidTokenError> {
    node.as_str()
        .ok_or_else(|| malformed(format!("{tag} attribute must hold strings")))
}

fn expect_array<'a>(tag: &str, node: &'a Value) -> Result<&'a Vec<Value>, InvalidTokenError> {
    node.as_array()
        .ok_or_else(|| malformed(format!("{tag} attribute must be an array")))
}

fn malformed(message: impl Into<String>) -> InvalidTokenError {
    InvalidTokenError::new(TokenErrorKind::MalformedStructure, "", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> AttributeCodec {
        AttributeCodec::new(Charset::Utf8)
    }

    #[test]
    fn scalars_use_type_tags() {
        let c = codec();
        assert_eq!(c.encode(&TaggedValue::string("user#42")).unwrap(), json!({"S": "user#42"}));
        assert_eq!(c.encode(&TaggedValue::number(12.5)).unwrap(), json!({"N": "12.5"}));
        assert_eq!(c.encode(&TaggedValue::Bool(false)).unwrap(), json!({"BOOL": false}));
        assert_eq!(c.encode(&TaggedValue::Null).unwrap(), json!({"NULL": true}));
        assert_eq!(c.encode(&TaggedValue::binary(b"abc".to_vec())).unwrap(), json!({"B": "abc"}));
    }

    #[test]
    fn nested_collections_round_trip() {
        let c = codec();
        let mut inner = BTreeMap::new();
        inner.insert("tags".to_owned(), TaggedValue::StringSet(vec!["a".into(), "b".into()]));
        inner.insert(
            "scores".to_owned(),
            TaggedValue::NumberSet(vec!["1".into(), "-2.5e3".into()]),
        );
        inner.insert("empty".to_owned(), TaggedValue::List(vec![]));
        let value = TaggedValue::List(vec![
            TaggedValue::Map(inner),
            TaggedValue::BinarySet(vec!["héllo".as_bytes().to_vec()]),
            TaggedValue::Null,
        ]);
        let node = c.encode(&value).unwrap();
        assert_eq!(c.decode(&node).unwrap(), value);
    }

    #[test]
    fn utf8_rejects_invalid_binary() {
        let err = codec().encode(&TaggedValue::binary(vec![0xFF, 0xFE])).unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::UnsupportedValue);
    }

    #[test]
    fn latin1_represents_every_byte() {
        let c = AttributeCodec::new(Charset::Latin1);
        assert_eq!(c.charset(), Charset::Latin1);
        let all: Vec<u8> = (0..=255).collect();
        let value = TaggedValue::binary(all);
        let node = c.encode(&value).unwrap();
        assert_eq!(c.decode(&node).unwrap(), value);
    }

    #[test]
    fn latin1_rejects_wide_characters_on_decode() {
        let c = AttributeCodec::new(Charset::Latin1);
        let err = c.decode(&json!({"B": "€"})).unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::MalformedStructure);
    }

    #[test]
    fn charset_names_deserialize() {
        let utf8: Charset = serde_json::from_value(json!("utf-8")).unwrap();
        let latin1: Charset = serde_json::from_value(json!("iso-8859-1")).unwrap();
        assert_eq!(utf8, Charset::Utf8);
        assert_eq!(latin1, Charset::Latin1);
    }

    #[test]
    fn rejects_malformed_nodes() {
        let c = codec();
        for node in [
            json!("bare string"),
            json!({}),
            json!({"S": "a", "N": "1"}),
            json!({"X": "a"}),
            json!({"S": 1}),
            json!({"N": "abc"}),
            json!({"N": "NaN"}),
            json!({"BOOL": "yes"}),
            json!({"NULL": false}),
            json!({"SS": "not-an-array"}),
            json!({"NS": ["1", 2]}),
            json!({"L": [{"S": 1}]}),
            json!({"M": []}),
        ] {
            let err = c.decode(&node).unwrap_err();
            assert_eq!(err.kind(), TokenErrorKind::MalformedStructure, "node: {node}");
        }
    }

    #[test]
    fn rejects_non_decimal_numbers_on_encode() {
        let err = codec().encode(&TaggedValue::Number("12abc".into())).unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::UnsupportedValue);
    }
}
