//! Start key <-> compact JSON document.

use common::{InvalidTokenError, StartKey, TokenErrorKind};
use serde_json::{Map, Value};

use super::attribute::AttributeCodec;

/// Serialises a [`StartKey`] as a JSON object of tagged attribute values.
///
/// Output is compact and ordered by attribute name, so equal keys always
/// produce byte-identical documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartKeyCodec {
    attributes: AttributeCodec,
}

impl StartKeyCodec {
    /// Create a codec using `attributes` for every value.
    pub fn new(attributes: AttributeCodec) -> Self {
        Self { attributes }
    }

    /// Render `start_key` as a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an `unsupported-value` error if any attribute cannot be encoded.
    pub fn serialize(&self, start_key: &StartKey) -> Result<String, InvalidTokenError> {
        let mut doc = Map::new();
        for (name, value) in start_key {
            doc.insert(name.clone(), self.attributes.encode(value)?);
        }
        serde_json::to_string(&Value::Object(doc)).map_err(|e| {
            InvalidTokenError::new(
                TokenErrorKind::UnsupportedValue,
                "",
                "failed to render start key",
            )
            .with_source(e)
        })
    }

    /// Parse a JSON document back into a start key.
    ///
    /// # Errors
    ///
    /// - `blank-input` if `text` is empty or whitespace-only.
    /// - `malformed-structure` if `text` is not a JSON object of tagged values.
    pub fn deserialize(&self, text: &str) -> Result<StartKey, InvalidTokenError> {
        if text.trim().is_empty() {
            return Err(InvalidTokenError::new(
                TokenErrorKind::BlankInput,
                text,
                "the start key document is blank",
            ));
        }

        let doc: Map<String, Value> = serde_json::from_str(text).map_err(|e| {
            InvalidTokenError::new(
                TokenErrorKind::MalformedStructure,
                text,
                "failed to parse start key document",
            )
            .with_source(e)
        })?;

        doc.iter()
            .map(|(name, node)| {
                self.attributes
                    .decode(node)
                    .map(|value| (name.clone(), value))
                    .map_err(|e| e.with_token(text))
            })
            .collect()
    }
}
