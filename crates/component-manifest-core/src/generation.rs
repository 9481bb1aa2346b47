//! Generation stage contract.
//!
//! The model collaborator is reached through [`CompletionProvider`], an
//! injectable capability that turns a prompt (plus optional tool schemas)
//! into structured JSON. This module builds the request from extracted
//! data and validates the response into [`GeneratedMeta`]; it carries no
//! provider-specific logic. Concrete providers live in the application
//! crate.
//!
//! # Flow
//!
//! ```text
//! ExtractedData ──build_request──▶ CompletionRequest
//!                                      │ provider.complete()
//!                                      ▼
//!                                 serde_json::Value ──parse_generated_meta──▶ GeneratedMeta
//! ```

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::GenerationError;
use crate::models::{ComponentExample, ComponentIdentity, ExtractedData, GeneratedMeta};

/// Name of the tool the model is asked to call.
pub const METADATA_TOOL: &str = "record_component_metadata";

/// A function-calling tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the tool arguments.
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub tools: Vec<ToolSpec>,
}

/// Opaque model capability.
///
/// `complete` returns the structured payload: the arguments of the tool
/// call when tools were offered, otherwise a JSON value parsed from the
/// reply. Provider and model names flow into generation output for
/// traceability.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider identifier (e.g. `"openai"`).
    fn provider_name(&self) -> &str;
    /// Model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest) -> Result<Value>;
}

/// Tool schema describing [`GeneratedMeta`].
pub fn metadata_tool() -> ToolSpec {
    ToolSpec {
        name: METADATA_TOOL.to_string(),
        description: "Record semantic metadata for a UI component.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "description": { "type": "string" },
                "semanticDescription": { "type": "string" },
                "whenToUse": { "type": "string" },
                "whenNotToUse": { "type": "string" },
                "patterns": { "type": "array", "items": { "type": "string" } },
                "examples": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "code": { "type": "string" },
                            "description": { "type": "string" }
                        },
                        "required": ["title", "code"]
                    }
                },
                "relatedComponents": { "type": "array", "items": { "type": "string" } },
                "variantDescriptions": {
                    "type": "object",
                    "additionalProperties": {
                        "type": "object",
                        "additionalProperties": { "type": "string" }
                    }
                }
            },
            "required": [
                "description",
                "semanticDescription",
                "whenToUse",
                "whenNotToUse",
                "patterns",
                "relatedComponents"
            ]
        }),
    }
}

const SYSTEM_PROMPT: &str = "You document UI components for AI coding assistants. \
Describe what the component is for, when to use it and when not to, common \
usage patterns, and short examples. Only describe props, variants, and parts \
that appear in the extracted data. Answer by calling the provided tool.";

/// Build the completion request for one component.
pub fn build_request(identity: &ComponentIdentity, data: &ExtractedData) -> CompletionRequest {
    let props: Vec<Value> = data
        .props
        .iter()
        .map(|p| {
            json!({
                "name": p.name,
                "type": p.type_name,
                "required": p.required,
                "default": p.default_value,
                "description": p.description,
            })
        })
        .collect();

    let facts = json!({
        "name": identity.name,
        "framework": identity.framework,
        "description": data.description,
        "props": props,
        "variants": data.variants,
        "compound": data.compound,
        "subComponents": data.sub_components.iter().map(|s| json!({
            "name": s.name,
            "required": s.required_in_composition,
            "primitive": s.radix_primitive,
        })).collect::<Vec<_>>(),
        "dependencies": data.dependencies,
        "stories": data.stories.iter().map(|s| &s.name).collect::<Vec<_>>(),
    });

    let pretty = serde_json::to_string_pretty(&facts).unwrap_or_else(|_| facts.to_string());
    CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt: format!(
            "Component `{}` ({}). Extracted structure:\n\n{}\n",
            identity.name, identity.framework, pretty
        ),
        tools: vec![metadata_tool()],
    }
}

/// Validate a provider payload into [`GeneratedMeta`].
///
/// Accepts the tool-call arguments object directly, or a string holding
/// JSON (optionally inside a fenced code block). Required text fields must
/// be non-empty; variant descriptions are kept only for variant axes that
/// exist in `data`.
pub fn parse_generated_meta(
    payload: Value,
    data: &ExtractedData,
) -> Result<GeneratedMeta, GenerationError> {
    let payload = match payload {
        Value::String(text) => serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| GenerationError::InvalidOutput(format!("reply is not JSON: {}", e)))?,
        other => other,
    };
    if !payload.is_object() {
        return Err(GenerationError::InvalidOutput(
            "expected a JSON object".to_string(),
        ));
    }

    let mut meta: GeneratedMeta = serde_json::from_value(with_list_defaults(payload))
        .map_err(|e| GenerationError::InvalidOutput(e.to_string()))?;

    for (field, value) in [
        ("description", &meta.description),
        ("semanticDescription", &meta.semantic_description),
        ("whenToUse", &meta.when_to_use),
        ("whenNotToUse", &meta.when_not_to_use),
    ] {
        if value.trim().is_empty() {
            return Err(GenerationError::InvalidOutput(format!(
                "field {} is empty",
                field
            )));
        }
    }

    if let Some(descriptions) = meta.variant_descriptions.as_mut() {
        let axes = data.variant_names();
        descriptions.retain(|axis, _| axes.contains(&axis.as_str()));
    }
    if let Some(examples) = meta.examples.as_mut() {
        examples.retain(|e: &ComponentExample| !e.code.trim().is_empty());
    }

    Ok(meta)
}

/// Generate metadata for one component. No timeout is applied here.
pub async fn generate_meta(
    provider: &dyn CompletionProvider,
    identity: &ComponentIdentity,
    data: &ExtractedData,
) -> Result<GeneratedMeta, GenerationError> {
    let request = build_request(identity, data);
    let payload = provider
        .complete(&request)
        .await
        .map_err(|e| GenerationError::Provider {
            provider: provider.provider_name().to_string(),
            message: format!("{:#}", e),
        })?;
    parse_generated_meta(payload, data)
}

fn with_list_defaults(mut payload: Value) -> Value {
    if let Some(obj) = payload.as_object_mut() {
        for key in ["patterns", "relatedComponents"] {
            if obj.get(key).map_or(true, Value::is_null) {
                obj.insert(key.to_string(), json!([]));
            }
        }
    }
    payload
}

/// Strip a surrounding Markdown code fence, if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}
