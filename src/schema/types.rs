//! Schema types

use serde_json::{json, Map, Value as JsonValue};

/// Logical or primitive type of a schema field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    /// `string` carrying `logicalType: uuid`
    Uuid,
    /// `int` days since the Unix epoch
    Date,
    /// `long` milliseconds since the Unix epoch, UTC
    TimestampMillis,
    /// `long` microseconds since the Unix epoch, UTC
    TimestampMicros,
    /// Fixed-scale decimal on `bytes` (`fixed_size = None`) or `fixed`
    Decimal {
        precision: u32,
        scale: u32,
        fixed_size: Option<usize>,
    },
    /// Raw `fixed` of `size` bytes
    Fixed { size: usize },
}

impl FieldType {
    /// Type name used in messages and summaries
    pub fn type_name(&self) -> String {
        match self {
            FieldType::Null => "null".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Int => "int".to_string(),
            FieldType::Long => "long".to_string(),
            FieldType::Float => "float".to_string(),
            FieldType::Double => "double".to_string(),
            FieldType::Bytes => "bytes".to_string(),
            FieldType::String => "string".to_string(),
            FieldType::Uuid => "uuid".to_string(),
            FieldType::Date => "date".to_string(),
            FieldType::TimestampMillis => "timestamp-millis".to_string(),
            FieldType::TimestampMicros => "timestamp-micros".to_string(),
            FieldType::Decimal {
                precision, scale, ..
            } => format!("decimal({precision},{scale})"),
            FieldType::Fixed { size } => format!("fixed({size})"),
        }
    }

    /// Render the Avro JSON for this type under the given field name
    fn to_json(&self, field_name: &str) -> JsonValue {
        match self {
            FieldType::Null => json!("null"),
            FieldType::Boolean => json!("boolean"),
            FieldType::Int => json!("int"),
            FieldType::Long => json!("long"),
            FieldType::Float => json!("float"),
            FieldType::Double => json!("double"),
            FieldType::Bytes => json!("bytes"),
            FieldType::String => json!("string"),
            FieldType::Uuid => json!({"type": "string", "logicalType": "uuid"}),
            FieldType::Date => json!({"type": "int", "logicalType": "date"}),
            FieldType::TimestampMillis => {
                json!({"type": "long", "logicalType": "timestamp-millis"})
            }
            FieldType::TimestampMicros => {
                json!({"type": "long", "logicalType": "timestamp-micros"})
            }
            FieldType::Decimal {
                precision,
                scale,
                fixed_size: None,
            } => json!({
                "type": "bytes",
                "logicalType": "decimal",
                "precision": precision,
                "scale": scale
            }),
            FieldType::Decimal {
                precision,
                scale,
                fixed_size: Some(size),
            } => json!({
                "type": "fixed",
                "name": field_name,
                "size": size,
                "logicalType": "decimal",
                "precision": precision,
                "scale": scale
            }),
            FieldType::Fixed { size } => json!({
                "type": "fixed",
                "name": field_name,
                "size": size
            }),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Whether a field accepts null, and where the null branch sits in its union
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    /// Plain type, null not allowed
    Required,
    /// `["null", T]`
    NullFirst,
    /// `[T, "null"]`
    NullSecond,
}

impl Nullability {
    /// Check if null is accepted
    pub fn is_nullable(self) -> bool {
        !matches!(self, Nullability::Required)
    }
}

/// A single schema field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Field type
    pub field_type: FieldType,
    /// Null handling
    pub nullability: Nullability,
    /// Documentation (optional)
    pub doc: Option<String>,
    /// Default value as written in the definition (optional)
    pub default: Option<JsonValue>,
}

impl Field {
    /// Create a required field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullability: Nullability::Required,
            doc: None,
            default: None,
        }
    }

    /// Make the field nullable (`["null", T]`)
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullability = Nullability::NullFirst;
        self
    }

    /// Check if null is accepted
    pub fn is_nullable(&self) -> bool {
        self.nullability.is_nullable()
    }

    fn to_json(&self) -> JsonValue {
        let base = self.field_type.to_json(&self.name);
        let type_json = match self.nullability {
            Nullability::Required => base,
            Nullability::NullFirst => json!(["null", base]),
            Nullability::NullSecond => json!([base, "null"]),
        };

        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(self.name));
        obj.insert("type".to_string(), type_json);
        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }
        if let Some(default) = &self.default {
            obj.insert("default".to_string(), default.clone());
        }
        JsonValue::Object(obj)
    }
}

/// A parsed record schema
///
/// Field order is fixed at parse time and determines the on-disk layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    namespace: Option<String>,
    doc: Option<String>,
    fields: Vec<Field>,
}

impl Schema {
    /// Build a schema from validated parts
    pub(crate) fn from_parts(
        name: String,
        namespace: Option<String>,
        doc: Option<String>,
        fields: Vec<Field>,
    ) -> Self {
        Self {
            name,
            namespace,
            doc,
            fields,
        }
    }

    /// Record name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record namespace
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// `namespace.name`, or just the name without a namespace
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{ns}.{}", self.name),
            _ => self.name.clone(),
        }
    }

    /// Fields in schema order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field in schema order
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Avro JSON definition of this schema
    pub fn to_json(&self) -> JsonValue {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!("record"));
        obj.insert("name".to_string(), json!(self.name));
        if let Some(ns) = &self.namespace {
            obj.insert("namespace".to_string(), json!(ns));
        }
        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }
        obj.insert(
            "fields".to_string(),
            JsonValue::Array(self.fields.iter().map(Field::to_json).collect()),
        );
        JsonValue::Object(obj)
    }

    /// Textual definition embedded in container files
    ///
    /// Compact JSON with sorted object keys, so equal schemas always
    /// render byte-identically.
    pub fn canonical_text(&self) -> String {
        self.to_json().to_string()
    }
}
