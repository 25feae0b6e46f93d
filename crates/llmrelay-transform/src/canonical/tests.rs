use serde_json::json;

use super::*;
use llmrelay_protocol::claude::create_message::ThinkingConfig;

#[test]
fn model_ref_requires_provider_prefix() {
    let parsed = ModelRef::parse("openai:gpt-4o").unwrap();
    assert_eq!(parsed.provider, "openai");
    assert_eq!(parsed.model, "gpt-4o");
    assert_eq!(parsed.to_string(), "openai:gpt-4o");

    // Only the first colon separates the provider.
    let parsed = ModelRef::parse("ollama:llama3:8b").unwrap();
    assert_eq!(parsed.model, "llama3:8b");

    assert!(ModelRef::parse("gpt-4o").is_none());
    assert!(ModelRef::parse(":gpt-4o").is_none());
    assert!(ModelRef::parse("openai:").is_none());
}

#[test]
fn data_url_parsing() {
    assert_eq!(
        parse_data_url("data:image/png;base64,AAAA"),
        Some(("image/png".to_string(), "AAAA".to_string()))
    );
    assert_eq!(parse_data_url("https://example.com/a.png"), None);
    assert_eq!(parse_data_url("data:text/plain,hello"), None);
}

#[test]
fn reasoning_budget_mapping() {
    assert_eq!(ReasoningEffort::from_budget_tokens(1024), ReasoningEffort::Low);
    assert_eq!(ReasoningEffort::from_budget_tokens(2048), ReasoningEffort::Medium);
    assert_eq!(ReasoningEffort::from_budget_tokens(8191), ReasoningEffort::Medium);
    assert_eq!(ReasoningEffort::from_budget_tokens(8192), ReasoningEffort::High);
    assert_eq!(ReasoningEffort::High.default_budget_tokens(), 16384);

    let config = ReasoningConfig::from_thinking(ThinkingConfig::Enabled {
        budget_tokens: 3000,
    })
    .unwrap();
    assert_eq!(config.effort, ReasoningEffort::Medium);
    assert_eq!(config.budget_tokens(), 3000);
    assert!(ReasoningConfig::from_thinking(ThinkingConfig::Disabled).is_none());

    let config = ReasoningConfig::from_effort(ReasoningEffort::Minimal);
    assert_eq!(config.budget_tokens(), 512);
}

#[test]
fn schema_nullable_type_array() {
    let schema = Schema::from_json_schema(&json!({
        "type": ["string", "null"],
        "maxLength": 10,
        "description": "nickname",
    }));
    let SchemaKind::Nullable(inner) = &schema.kind else {
        panic!("expected nullable, got {:?}", schema.kind);
    };
    assert!(matches!(
        inner.kind,
        SchemaKind::String {
            max_length: Some(10),
            ..
        }
    ));
    assert_eq!(schema.description.as_deref(), Some("nickname"));
    assert_eq!(
        schema.to_json_schema(),
        json!({
            "type": ["string", "null"],
            "maxLength": 10,
            "description": "nickname",
        })
    );
}

#[test]
fn schema_any_of_with_null_collapses() {
    let schema = Schema::from_json_schema(&json!({
        "anyOf": [{ "type": "integer", "minimum": 1 }, { "type": "null" }]
    }));
    let SchemaKind::Nullable(inner) = &schema.kind else {
        panic!("expected nullable");
    };
    assert!(matches!(
        inner.kind,
        SchemaKind::Number {
            integer: true,
            minimum: Some(min),
            ..
        } if min == 1.0
    ));
}

#[test]
fn schema_enums() {
    let single = Schema::from_json_schema(&json!({ "enum": ["only"] }));
    assert_eq!(single.kind, SchemaKind::Literal(json!("only")));
    assert_eq!(
        single.to_json_schema(),
        json!({ "type": "string", "enum": ["only"] })
    );

    let many = Schema::from_json_schema(&json!({ "type": "string", "enum": ["a", "b"] }));
    assert_eq!(many.kind, SchemaKind::Enum(vec![json!("a"), json!("b")]));

    let nullable = Schema::from_json_schema(&json!({ "enum": ["a", "b", null] }));
    assert!(matches!(nullable.kind, SchemaKind::Nullable(_)));
    assert_eq!(
        nullable.to_json_schema(),
        json!({ "anyOf": [{ "type": "string", "enum": ["a", "b"] }, { "type": "null" }] })
    );
}

#[test]
fn schema_object_always_declares_properties() {
    let schema = Schema::from_json_schema(&json!({ "type": "object" }));
    assert_eq!(
        schema.to_json_schema(),
        json!({ "type": "object", "properties": {} })
    );

    assert_eq!(
        Schema::tool_parameters(None).to_json_schema(),
        json!({ "type": "object", "properties": {} })
    );
    assert_eq!(
        Schema::tool_parameters(Some(&json!({ "type": "string" }))).to_json_schema(),
        json!({ "type": "object", "properties": {} })
    );
}

#[test]
fn schema_nested_object_and_array() {
    let input = json!({
        "type": "object",
        "properties": {
            "tags": {
                "type": "array",
                "items": { "type": "string", "pattern": "^[a-z]+$" },
                "minItems": 1,
                "maxItems": 5
            },
            "owner": {
                "type": "object",
                "properties": { "id": { "type": "integer" } },
                "required": ["id"]
            }
        },
        "required": ["tags"],
        "additionalProperties": false
    });
    let schema = Schema::from_json_schema(&input);
    let SchemaKind::Object {
        properties,
        required,
        additional_properties,
    } = &schema.kind
    else {
        panic!("expected object");
    };
    assert_eq!(required, &vec!["tags".to_string()]);
    assert_eq!(*additional_properties, Some(false));
    assert!(matches!(
        properties["tags"].kind,
        SchemaKind::Array {
            min_items: Some(1),
            max_items: Some(5),
            ..
        }
    ));
    assert_eq!(schema.to_json_schema(), input);
}

#[test]
fn signed_reasoning_end_bears_content() {
    assert!(
        SourceEvent::ReasoningEnd {
            signature: Some("sig".to_string())
        }
        .is_content_bearing()
    );
    assert!(!SourceEvent::ReasoningEnd { signature: None }.is_content_bearing());
    assert!(!SourceEvent::finish(None, None).is_content_bearing());
}
