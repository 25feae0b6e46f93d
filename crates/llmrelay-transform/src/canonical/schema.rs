use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue, json};

/// Canonical tool-parameter schema. Built from JSON-Schema-like input and
/// rendered back to JSON Schema for providers.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub kind: SchemaKind,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Any,
    Null,
    Boolean,
    String {
        min_length: Option<u64>,
        max_length: Option<u64>,
        pattern: Option<String>,
        format: Option<String>,
    },
    Number {
        integer: bool,
        minimum: Option<f64>,
        maximum: Option<f64>,
        exclusive_minimum: Option<f64>,
        exclusive_maximum: Option<f64>,
    },
    Literal(JsonValue),
    Enum(Vec<JsonValue>),
    Array {
        items: Box<Schema>,
        min_items: Option<u64>,
        max_items: Option<u64>,
    },
    Object {
        properties: BTreeMap<String, Schema>,
        required: Vec<String>,
        additional_properties: Option<bool>,
    },
    Nullable(Box<Schema>),
    Union(Vec<Schema>),
}

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    pub fn empty_object() -> Self {
        Self::new(SchemaKind::Object {
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: None,
        })
    }

    pub fn from_json_schema(value: &JsonValue) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::any();
        };
        Self {
            kind: kind_from_object(obj),
            description: obj
                .get("description")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
        }
    }

    /// Tool parameters must be an object; anything else is wrapped as an
    /// empty object so providers that require `properties` accept it.
    pub fn tool_parameters(value: Option<&JsonValue>) -> Self {
        match value.map(Self::from_json_schema) {
            Some(schema) if matches!(schema.kind, SchemaKind::Object { .. }) => schema,
            _ => Self::empty_object(),
        }
    }

    pub fn to_json_schema(&self) -> JsonValue {
        let mut out = Map::new();
        match &self.kind {
            SchemaKind::Any => {}
            SchemaKind::Null => {
                out.insert("type".into(), json!("null"));
            }
            SchemaKind::Boolean => {
                out.insert("type".into(), json!("boolean"));
            }
            SchemaKind::String {
                min_length,
                max_length,
                pattern,
                format,
            } => {
                out.insert("type".into(), json!("string"));
                insert_opt(&mut out, "minLength", min_length.map(JsonValue::from));
                insert_opt(&mut out, "maxLength", max_length.map(JsonValue::from));
                insert_opt(&mut out, "pattern", pattern.clone().map(JsonValue::from));
                insert_opt(&mut out, "format", format.clone().map(JsonValue::from));
            }
            SchemaKind::Number {
                integer,
                minimum,
                maximum,
                exclusive_minimum,
                exclusive_maximum,
            } => {
                let ty = if *integer { "integer" } else { "number" };
                out.insert("type".into(), json!(ty));
                insert_opt(&mut out, "minimum", minimum.map(number_value));
                insert_opt(&mut out, "maximum", maximum.map(number_value));
                insert_opt(
                    &mut out,
                    "exclusiveMinimum",
                    exclusive_minimum.map(number_value),
                );
                insert_opt(
                    &mut out,
                    "exclusiveMaximum",
                    exclusive_maximum.map(number_value),
                );
            }
            SchemaKind::Literal(value) => {
                if let Some(ty) = json_type_name(value) {
                    out.insert("type".into(), json!(ty));
                }
                out.insert("enum".into(), json!([value]));
            }
            SchemaKind::Enum(values) => {
                let mut types = values.iter().map(json_type_name);
                if let Some(Some(first)) = types.next()
                    && types.all(|ty| ty == Some(first))
                {
                    out.insert("type".into(), json!(first));
                }
                out.insert("enum".into(), JsonValue::Array(values.clone()));
            }
            SchemaKind::Array {
                items,
                min_items,
                max_items,
            } => {
                out.insert("type".into(), json!("array"));
                out.insert("items".into(), items.to_json_schema());
                insert_opt(&mut out, "minItems", min_items.map(JsonValue::from));
                insert_opt(&mut out, "maxItems", max_items.map(JsonValue::from));
            }
            SchemaKind::Object {
                properties,
                required,
                additional_properties,
            } => {
                out.insert("type".into(), json!("object"));
                let properties: Map<String, JsonValue> = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
                    .collect();
                out.insert("properties".into(), JsonValue::Object(properties));
                if !required.is_empty() {
                    out.insert("required".into(), json!(required));
                }
                insert_opt(
                    &mut out,
                    "additionalProperties",
                    additional_properties.map(JsonValue::from),
                );
            }
            SchemaKind::Nullable(inner) => {
                let inner_json = inner.to_json_schema();
                match inner_json {
                    JsonValue::Object(mut inner_obj)
                        if !inner_obj.contains_key("enum")
                            && matches!(inner_obj.get("type"), Some(JsonValue::String(_))) =>
                    {
                        if let Some(ty) = inner_obj.remove("type") {
                            inner_obj.insert("type".into(), json!([ty, "null"]));
                        }
                        out = inner_obj;
                    }
                    other => {
                        out.insert("anyOf".into(), json!([other, { "type": "null" }]));
                    }
                }
            }
            SchemaKind::Union(variants) => {
                let variants: Vec<JsonValue> =
                    variants.iter().map(Schema::to_json_schema).collect();
                out.insert("anyOf".into(), JsonValue::Array(variants));
            }
        }
        if let Some(description) = &self.description {
            out.insert("description".into(), json!(description));
        }
        JsonValue::Object(out)
    }
}

fn kind_from_object(obj: &Map<String, JsonValue>) -> SchemaKind {
    if let Some(value) = obj.get("const") {
        return SchemaKind::Literal(value.clone());
    }

    if let Some(values) = obj.get("enum").and_then(JsonValue::as_array) {
        let nullable = values.len() > 1 && values.iter().any(JsonValue::is_null);
        let values: Vec<JsonValue> = values
            .iter()
            .filter(|value| !(nullable && value.is_null()))
            .cloned()
            .collect();
        let kind = match values.as_slice() {
            [single] => SchemaKind::Literal(single.clone()),
            _ => SchemaKind::Enum(values),
        };
        return if nullable {
            SchemaKind::Nullable(Box::new(Schema::new(kind)))
        } else {
            kind
        };
    }

    for key in ["anyOf", "oneOf"] {
        if let Some(variants) = obj.get(key).and_then(JsonValue::as_array) {
            return union_kind(variants.iter().map(Schema::from_json_schema).collect());
        }
    }

    match obj.get("type") {
        Some(JsonValue::String(ty)) => typed_kind(ty, obj),
        Some(JsonValue::Array(types)) => union_kind(
            types
                .iter()
                .filter_map(JsonValue::as_str)
                .map(|ty| Schema::new(typed_kind(ty, obj)))
                .collect(),
        ),
        _ if obj.contains_key("properties") => typed_kind("object", obj),
        _ if obj.contains_key("items") => typed_kind("array", obj),
        _ => SchemaKind::Any,
    }
}

/// Collapses `T | null` into `Nullable(T)`; several non-null variants stay a
/// union.
fn union_kind(variants: Vec<Schema>) -> SchemaKind {
    let has_null = variants.iter().any(|variant| variant.kind == SchemaKind::Null);
    let mut rest: Vec<Schema> = variants
        .into_iter()
        .filter(|variant| variant.kind != SchemaKind::Null)
        .collect();

    let inner = match rest.len() {
        0 => return SchemaKind::Null,
        1 => rest.remove(0),
        _ => Schema::new(SchemaKind::Union(rest)),
    };
    if has_null {
        SchemaKind::Nullable(Box::new(inner))
    } else {
        inner.kind
    }
}

fn typed_kind(ty: &str, obj: &Map<String, JsonValue>) -> SchemaKind {
    let u64_field = |key: &str| obj.get(key).and_then(JsonValue::as_u64);
    let f64_field = |key: &str| obj.get(key).and_then(JsonValue::as_f64);
    let str_field = |key: &str| obj.get(key).and_then(JsonValue::as_str).map(str::to_string);

    match ty {
        "null" => SchemaKind::Null,
        "boolean" => SchemaKind::Boolean,
        "string" => SchemaKind::String {
            min_length: u64_field("minLength"),
            max_length: u64_field("maxLength"),
            pattern: str_field("pattern"),
            format: str_field("format"),
        },
        "integer" | "number" => SchemaKind::Number {
            integer: ty == "integer",
            minimum: f64_field("minimum"),
            maximum: f64_field("maximum"),
            exclusive_minimum: f64_field("exclusiveMinimum"),
            exclusive_maximum: f64_field("exclusiveMaximum"),
        },
        "array" => SchemaKind::Array {
            items: Box::new(
                obj.get("items")
                    .map(Schema::from_json_schema)
                    .unwrap_or_else(Schema::any),
            ),
            min_items: u64_field("minItems"),
            max_items: u64_field("maxItems"),
        },
        "object" => SchemaKind::Object {
            properties: obj
                .get("properties")
                .and_then(JsonValue::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, schema)| (name.clone(), Schema::from_json_schema(schema)))
                        .collect()
                })
                .unwrap_or_default(),
            required: obj
                .get("required")
                .and_then(JsonValue::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(JsonValue::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            additional_properties: obj.get("additionalProperties").and_then(JsonValue::as_bool),
        },
        _ => SchemaKind::Any,
    }
}

fn insert_opt(out: &mut Map<String, JsonValue>, key: &str, value: Option<JsonValue>) {
    if let Some(value) = value {
        out.insert(key.to_string(), value);
    }
}

fn number_value(value: f64) -> JsonValue {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

fn json_type_name(value: &JsonValue) -> Option<&'static str> {
    match value {
        JsonValue::String(_) => Some("string"),
        JsonValue::Bool(_) => Some("boolean"),
        JsonValue::Number(number) if number.is_i64() || number.is_u64() => Some("integer"),
        JsonValue::Number(_) => Some("number"),
        _ => None,
    }
}
