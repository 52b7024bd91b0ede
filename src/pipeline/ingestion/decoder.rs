use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::trace;

use super::literal::{parse_literal, LiteralError};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not valid JSON for this record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not a Python literal: {0}")]
    Literal(#[from] LiteralError),

    #[error("literal has the wrong shape for this record: {0}")]
    Shape(serde_json::Error),
}

/// Decodes one line of a data file into a record.
pub trait LineDecoder {
    fn decode<T: DeserializeOwned>(&self, line: &str) -> Result<T, DecodeError>;
}

/// Strict JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

impl LineDecoder for JsonDecoder {
    fn decode<T: DeserializeOwned>(&self, line: &str) -> Result<T, DecodeError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Python literal syntax, mapped onto the same serde shape as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralDecoder;

impl LineDecoder for LiteralDecoder {
    fn decode<T: DeserializeOwned>(&self, line: &str) -> Result<T, DecodeError> {
        let value = parse_literal(line)?;
        serde_json::from_value(value).map_err(DecodeError::Shape)
    }
}

/// Tries JSON first, then the Python-literal form; a line matching neither
/// is discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct DualFormatDecoder {
    strict: JsonDecoder,
    tolerant: LiteralDecoder,
}

impl DualFormatDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` for blank lines and for lines that decode in neither format.
    pub fn decode<T: DeserializeOwned>(&self, line: &str) -> Option<T> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match self.strict.decode(line) {
            Ok(record) => Some(record),
            Err(json_err) => match self.tolerant.decode(line) {
                Ok(record) => Some(record),
                Err(literal_err) => {
                    trace!(%json_err, %literal_err, "discarding undecodable line");
                    None
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BusinessRecord, RawReview};
    use serde_json::json;

    #[test]
    fn strict_decoder_rejects_python_syntax() {
        let line = "{'id': 'g1', 'name': 'Cafe X'}";
        assert!(matches!(
            JsonDecoder.decode::<BusinessRecord>(line),
            Err(DecodeError::Json(_))
        ));
        let record: BusinessRecord = LiteralDecoder.decode(line).unwrap();
        assert_eq!(record.id, "g1");
        assert_eq!(record.name.as_deref(), Some("Cafe X"));
    }

    #[test]
    fn literal_decoder_reports_shape_errors() {
        assert!(matches!(
            LiteralDecoder.decode::<BusinessRecord>("{'name': 'no id here'}"),
            Err(DecodeError::Shape(_))
        ));
        assert!(matches!(
            LiteralDecoder.decode::<BusinessRecord>("{'id': "),
            Err(DecodeError::Literal(_))
        ));
    }

    #[test]
    fn dual_decoder_prefers_json_then_falls_back() {
        let decoder = DualFormatDecoder::new();

        let json_line = r#"{"business_id":"g1","user_name":"Alice","rating":"5","text":"Great   coffee!!"}"#;
        let review: RawReview = decoder.decode(json_line).unwrap();
        assert_eq!(review.rating, Some(json!("5")));

        let literal_line = "{'gmap_id': 'g2', 'name': 'Bob', 'rating': 3, 'text': None}";
        let review: RawReview = decoder.decode(literal_line).unwrap();
        assert_eq!(review.business_id.as_deref(), Some("g2"));
        assert_eq!(review.user_name.as_deref(), Some("Bob"));
        assert_eq!(review.text, None);
    }

    #[test]
    fn lines_with_key_and_alias_are_kept() {
        let decoder = DualFormatDecoder::new();

        let business: BusinessRecord = decoder
            .decode(r#"{"id":"g1","gmap_id":"g1","name":"Cafe X"}"#)
            .unwrap();
        assert_eq!(business.id, "g1");

        let business: BusinessRecord = decoder
            .decode("{'id': 'g1', 'gmap_id': 'g1', 'name': 'Cafe X', 'hours': None}")
            .unwrap();
        assert_eq!(business.name.as_deref(), Some("Cafe X"));

        let review: RawReview = decoder
            .decode(r#"{"business_id":"g1","user_name":"Alice","name":"Alice","rating":5,"text":"ok"}"#)
            .unwrap();
        assert_eq!(review.business_id.as_deref(), Some("g1"));
        assert_eq!(review.user_name.as_deref(), Some("Alice"));

        let review: RawReview = decoder
            .decode("{'business_id': 'g1', 'gmap_id': 'g1', 'name': 'Bob', 'rating': 2}")
            .unwrap();
        assert_eq!(review.user_name.as_deref(), Some("Bob"));
    }

    #[test]
    fn dual_decoder_discards_garbage_and_blank_lines() {
        let decoder = DualFormatDecoder::new();
        assert!(decoder.decode::<BusinessRecord>("   ").is_none());
        assert!(decoder.decode::<BusinessRecord>("not a record").is_none());
        assert!(decoder.decode::<BusinessRecord>("[1, 2, 3]").is_none());
        assert!(decoder.decode::<BusinessRecord>("{\"id\": \"g1\", ").is_none());
    }
}
