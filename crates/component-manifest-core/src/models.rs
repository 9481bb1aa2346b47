//! Core data models used throughout Component Manifest.
//!
//! These types represent the identity, extraction output, generated
//! metadata, and final manifest that flow through the
//! Extract → Generate → Build pipeline. All of them serialize to the
//! camelCase JSON shapes stored in checkpoints and consumed downstream.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a component across re-extractions.
///
/// `id` is generated once at first extraction and never regenerated.
/// `slug` is derived from `name`, `framework`, and the first eight hex
/// characters of `id` (see [`crate::identity::make_slug`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentIdentity {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub framework: String,
}

/// One public property of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedProp {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Populated only for finite-domain (literal union / variant) types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    pub required: bool,
}

impl ExtractedProp {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            description: None,
            default_value: None,
            values: None,
            required,
        }
    }
}

/// A style variant axis declared through a variant table (`cva`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedVariant {
    pub name: String,
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Compound-component shape detected once per extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundComponentInfo {
    pub is_compound: bool,
    pub root_component: String,
    pub sub_components: Vec<String>,
}

/// Per sub-part record of a compound component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedSubComponent {
    pub name: String,
    pub props: Vec<ExtractedProp>,
    pub required_in_composition: bool,
    /// Primitive member this part wraps, e.g. `DialogPrimitive.Trigger`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radix_primitive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<ExtractedVariant>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_variants: Option<BTreeMap<String, String>>,
}

/// Imports a component depends on, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependencies {
    /// Package names (scoped names kept whole, subpaths stripped).
    pub npm: Vec<String>,
    /// PascalCase component names imported from relative or aliased paths.
    pub internal: Vec<String>,
    /// Primitive-library packages (a subset of `npm`).
    pub primitives: Vec<String>,
}

/// A story exported from an accompanying stories file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedStory {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    pub source: String,
}

/// Which analyzer supplied the authoritative prop list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Primary,
    Fallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Primary => "primary",
            ExtractionMethod::Fallback => "fallback",
        }
    }
}

/// How the prop list was obtained for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub method: ExtractionMethod,
    pub fallback_triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Full extraction output for one source snapshot.
///
/// Immutable once produced: a new source hash yields a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    pub component_name: String,
    pub props: Vec<ExtractedProp>,
    pub variants: Vec<ExtractedVariant>,
    pub dependencies: Dependencies,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound: Option<CompoundComponentInfo>,
    pub sub_components: Vec<ExtractedSubComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub stories: Vec<ExtractedStory>,
    pub files: Vec<String>,
    pub source_hash: String,
    pub extraction: ExtractionReport,
}

impl ExtractedData {
    /// Names of all variant axes declared for the root component.
    pub fn variant_names(&self) -> Vec<&str> {
        self.variants.iter().map(|v| v.name.as_str()).collect()
    }
}

/// A usage example produced by the generation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentExample {
    pub title: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Model-produced semantic metadata. Never produced without [`ExtractedData`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedMeta {
    pub description: String,
    pub semantic_description: String,
    pub when_to_use: String,
    pub when_not_to_use: String,
    pub patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<ComponentExample>>,
    pub related_components: Vec<String>,
    /// Variant axis → value → description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_descriptions: Option<BTreeMap<String, BTreeMap<String, String>>>,
}

/// Generation phase output: metadata plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
    pub meta: GeneratedMeta,
    pub provider: String,
    pub model: String,
    /// Hash of the source the metadata was generated from.
    pub source_hash: String,
    pub generated_at: DateTime<Utc>,
}

/// A prop as it appears in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestProp {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    pub required: bool,
}

/// Props partitioned into exactly one category each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedProps {
    pub variants: Vec<ManifestProp>,
    pub behaviors: Vec<ManifestProp>,
    pub events: Vec<ManifestProp>,
    pub slots: Vec<ManifestProp>,
    pub other: Vec<ManifestProp>,
}

impl CategorizedProps {
    pub fn len(&self) -> usize {
        self.variants.len()
            + self.behaviors.len()
            + self.events.len()
            + self.slots.len()
            + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestVariant {
    pub name: String,
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub descriptions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionPart {
    pub name: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive: Option<String>,
    pub props: Vec<String>,
}

/// How the parts of a compound component fit together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionGuide {
    pub root: String,
    pub parts: Vec<CompositionPart>,
    pub required_parts: Vec<String>,
}

/// Traceability of the two upstream phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub extraction_method: ExtractionMethod,
    pub fallback_triggered: bool,
    pub provider: String,
    pub model: String,
}

/// The AI-consumable component description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiManifest {
    pub name: String,
    pub description: String,
    pub semantic_description: String,
    pub when_to_use: String,
    pub when_not_to_use: String,
    pub props: CategorizedProps,
    pub variants: Vec<ManifestVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<CompositionGuide>,
    pub patterns: Vec<String>,
    pub examples: Vec<ComponentExample>,
    pub related_components: Vec<String>,
    pub dependencies: Dependencies,
    pub provenance: Provenance,
}

/// Terminal artifact: one per (identity, source hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub component_name: String,
    pub identity: ComponentIdentity,
    pub manifest: AiManifest,
    pub source_hash: String,
    pub files: Vec<String>,
    pub built_at: DateTime<Utc>,
}
