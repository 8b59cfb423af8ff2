//! Firestore REST API types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FirestoreError, FirestoreResult};

/// Firestore document value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub fields: Option<HashMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }

    /// Document with a full resource name, as used inside commit writes.
    pub fn named(name: impl Into<String>, fields: HashMap<String, Value>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(fields)
        }
    }

    /// Last path segment of the resource name.
    pub fn id(&self) -> Option<&str> {
        self.name.as_deref().and_then(|n| n.rsplit('/').next())
    }

    /// Read and convert a single field.
    pub fn get<T: FromFirestoreValue>(&self, field: &str) -> Option<T> {
        self.fields
            .as_ref()
            .and_then(|f| f.get(field))
            .and_then(T::from_firestore_value)
    }

    /// Like [`Document::get`], but a missing or mistyped field is an error.
    pub fn require<T: FromFirestoreValue>(&self, field: &str) -> FirestoreResult<T> {
        self.get(field).ok_or_else(|| {
            FirestoreError::invalid_response(format!(
                "missing or invalid field '{}' in {}",
                field,
                self.name.as_deref().unwrap_or("<unnamed>")
            ))
        })
    }
}

/// A decoded document together with the `updateTime` it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub value: T,
    pub update_time: Option<String>,
}

/// List documents response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    pub documents: Option<Vec<Document>>,
    pub next_page_token: Option<String>,
}

// ============================================================================
// Commit (atomic multi-document writes)
// ============================================================================

/// A single write inside a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Document>,

    /// Full resource name of a document to delete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mask: Option<DocumentMask>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_document: Option<Precondition>,
}

impl Write {
    /// Replace or insert the whole document.
    pub fn set(name: impl Into<String>, fields: HashMap<String, Value>) -> Self {
        Self {
            update: Some(Document::named(name, fields)),
            delete: None,
            update_mask: None,
            current_document: None,
        }
    }

    /// Insert a document that must not exist yet.
    pub fn create(name: impl Into<String>, fields: HashMap<String, Value>) -> Self {
        Self::set(name, fields).with_precondition(Precondition::exists(false))
    }

    /// Update only the fields present in `fields`.
    pub fn patch(name: impl Into<String>, fields: HashMap<String, Value>) -> Self {
        let mut paths: Vec<String> = fields.keys().cloned().collect();
        paths.sort();
        Self {
            update_mask: Some(DocumentMask { field_paths: paths }),
            ..Self::set(name, fields)
        }
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self {
            update: None,
            delete: Some(name.into()),
            update_mask: None,
            current_document: None,
        }
    }

    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.current_document = Some(precondition);
        self
    }

    /// Guard the write on the document's last observed `updateTime`.
    pub fn if_unchanged_since(self, update_time: Option<&str>) -> Self {
        match update_time {
            Some(ts) => self.with_precondition(Precondition::updated_at(ts)),
            None => self.with_precondition(Precondition::exists(true)),
        }
    }
}

/// Document field mask for partial updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMask {
    pub field_paths: Vec<String>,
}

/// Precondition for a write operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Precondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Precondition {
    pub fn exists(exists: bool) -> Self {
        Self {
            exists: Some(exists),
            update_time: None,
        }
    }

    pub fn updated_at(update_time: impl Into<String>) -> Self {
        Self {
            exists: None,
            update_time: Some(update_time.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub writes: Vec<Write>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub update_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    pub write_results: Option<Vec<WriteResult>>,
    pub commit_time: Option<String>,
}

// ============================================================================
// Structured queries
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#where: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<Order>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<Cursor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

impl StructuredQuery {
    /// Query over a single collection id.
    pub fn collection(collection_id: impl Into<String>) -> Self {
        Self {
            from: vec![CollectionSelector {
                collection_id: collection_id.into(),
                all_descendants: None,
            }],
            ..Default::default()
        }
    }

    /// AND together the given field filters.
    pub fn filter(mut self, filters: Vec<FieldFilter>) -> Self {
        let mut filters: Vec<Filter> = filters
            .into_iter()
            .map(|f| Filter {
                composite_filter: None,
                field_filter: Some(f),
            })
            .collect();
        self.r#where = match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter {
                composite_filter: Some(CompositeFilter {
                    op: "AND".to_string(),
                    filters,
                }),
                field_filter: None,
            }),
        };
        self
    }

    pub fn order_by(mut self, field: &str, descending: bool) -> Self {
        self.order_by.get_or_insert_with(Vec::new).push(Order {
            field: FieldReference {
                field_path: field.to_string(),
            },
            direction: if descending { "DESCENDING" } else { "ASCENDING" }.to_string(),
        });
        self
    }

    /// Resume just after the row whose order-by values are `values`.
    pub fn start_after(mut self, values: Vec<Value>) -> Self {
        self.start_at = Some(Cursor {
            values,
            before: Some(false),
        });
        self
    }

    pub fn offset(mut self, offset: i32) -> Self {
        self.offset = (offset > 0).then_some(offset);
        self
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_descendants: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite_filter: Option<CompositeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_filter: Option<FieldFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeFilter {
    pub op: String,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn new(field: &str, op: &str, value: Value) -> Self {
        Self {
            field: FieldReference {
                field_path: field.to_string(),
            },
            op: op.to_string(),
            value,
        }
    }

    pub fn eq(field: &str, value: Value) -> Self {
        Self::new(field, "EQUAL", value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub field: FieldReference,
    pub direction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub values: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponse {
    pub document: Option<Document>,
    pub read_time: Option<String>,
}

// ============================================================================
// Value conversion
// ============================================================================

/// Convert a Rust value to Firestore Value.
pub trait ToFirestoreValue {
    fn to_firestore_value(&self) -> Value;
}

impl ToFirestoreValue for String {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.clone())
    }
}

impl ToFirestoreValue for &str {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.to_string())
    }
}

impl ToFirestoreValue for i64 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue(self.to_string())
    }
}

impl ToFirestoreValue for u32 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue(self.to_string())
    }
}

impl ToFirestoreValue for bool {
    fn to_firestore_value(&self) -> Value {
        Value::BooleanValue(*self)
    }
}

impl ToFirestoreValue for DateTime<Utc> {
    fn to_firestore_value(&self) -> Value {
        Value::TimestampValue(self.to_rfc3339())
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Option<T> {
    fn to_firestore_value(&self) -> Value {
        match self {
            Some(v) => v.to_firestore_value(),
            None => Value::NullValue(()),
        }
    }
}

/// Convert Firestore Value to Rust type.
pub trait FromFirestoreValue: Sized {
    fn from_firestore_value(value: &Value) -> Option<Self>;
}

impl FromFirestoreValue for String {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromFirestoreValue for i64 {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::IntegerValue(s) => s.parse().ok(),
            Value::DoubleValue(f) => Some(*f as i64),
            _ => None,
        }
    }
}

impl FromFirestoreValue for u32 {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::IntegerValue(s) => s.parse().ok(),
            Value::DoubleValue(f) if *f >= 0.0 => Some(*f as u32),
            _ => None,
        }
    }
}

impl FromFirestoreValue for bool {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromFirestoreValue for DateTime<Utc> {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::TimestampValue(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_wire_format() {
        let v = serde_json::to_value(42i64.to_firestore_value()).unwrap();
        assert_eq!(v, json!({"integerValue": "42"}));
        let v = serde_json::to_value(None::<String>.to_firestore_value()).unwrap();
        assert_eq!(v, json!({"nullValue": null}));
    }

    #[test]
    fn test_document_accessors() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/users/a@b.io",
            "fields": {"coins": {"integerValue": "12"}, "name": {"stringValue": "A"}},
            "updateTime": "2026-01-01T00:00:00.000001Z"
        }))
        .unwrap();
        assert_eq!(doc.id(), Some("a@b.io"));
        assert_eq!(doc.get::<i64>("coins"), Some(12));
        assert_eq!(doc.get::<String>("name").as_deref(), Some("A"));
        assert_eq!(doc.get::<i64>("missing"), None);
    }

    #[test]
    fn test_create_write_serializes_precondition() {
        let mut fields = HashMap::new();
        fields.insert("coins".to_string(), 5i64.to_firestore_value());
        let w = serde_json::to_value(Write::create("projects/p/x/y", fields)).unwrap();
        assert_eq!(w["currentDocument"], json!({"exists": false}));
        assert_eq!(w["update"]["name"], json!("projects/p/x/y"));
        assert!(w.get("updateMask").is_none());
    }

    #[test]
    fn test_patch_write_masks_fields() {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), "approved".to_firestore_value());
        fields.insert("reviewed_at".to_string(), Utc::now().to_firestore_value());
        let w = Write::patch("n", fields).if_unchanged_since(Some("t1"));
        let v = serde_json::to_value(&w).unwrap();
        assert_eq!(v["updateMask"]["fieldPaths"], json!(["reviewed_at", "status"]));
        assert_eq!(v["currentDocument"], json!({"updateTime": "t1"}));
    }

    #[test]
    fn test_query_builder() {
        let q = StructuredQuery::collection("tasks")
            .filter(vec![
                FieldFilter::eq("creator_email", "a@b.io".to_firestore_value()),
                FieldFilter::new("task_quantity", "GREATER_THAN", 0i64.to_firestore_value()),
            ])
            .order_by("created_at", true)
            .limit(6);
        let v = serde_json::to_value(RunQueryRequest { structured_query: q }).unwrap();
        let sq = &v["structuredQuery"];
        assert_eq!(sq["from"][0]["collectionId"], json!("tasks"));
        assert_eq!(sq["where"]["compositeFilter"]["op"], json!("AND"));
        assert_eq!(sq["orderBy"][0]["direction"], json!("DESCENDING"));
        assert_eq!(sq["limit"], json!(6));
        assert!(sq.get("offset").is_none());
    }
}
