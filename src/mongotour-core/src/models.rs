use mongodb::bson::{doc, Bson, Document};
use serde::Serialize;

/// ErrorResponse represents an API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Sample document with a `name` and a numeric `value`
pub fn sample_document(name: &str, value: i32) -> Document {
    doc! { "name": name, "value": value }
}

/// Relaxed extended JSON for a document, `_id` rendered as `{"$oid": ...}`
pub fn document_json(doc: &Document) -> String {
    Bson::Document(doc.clone())
        .into_relaxed_extjson()
        .to_string()
}

/// JSON for an optional lookup result, `null` when nothing matched
pub fn optional_document_json(doc: Option<&Document>) -> String {
    doc.map(document_json).unwrap_or_else(|| "null".to_string())
}
