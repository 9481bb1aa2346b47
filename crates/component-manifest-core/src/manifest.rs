//! Manifest assembly.
//!
//! A pure merge of [`ExtractedData`] and [`GeneratedMeta`] into one
//! [`Manifest`]. Nothing here performs I/O; the build timestamp is passed
//! in so identical inputs produce identical manifests.
//!
//! Props are partitioned by a fixed precedence:
//!
//! ```text
//! events  >  slots  >  variants  >  behaviors  >  other
//! onX        children,  finite      boolean
//!            ReactNode  values or
//!                       variant key
//! ```

use chrono::{DateTime, Utc};

use crate::error::ManifestBuildError;
use crate::models::{
    AiManifest, CategorizedProps, ComponentExample, ComponentIdentity, CompositionGuide,
    CompositionPart, ExtractedData, ExtractedProp, GeneratedMeta, Manifest, ManifestProp,
    ManifestVariant, Provenance,
};

/// Everything [`build_manifest`] needs.
#[derive(Debug, Clone)]
pub struct BuildInput<'a> {
    pub identity: &'a ComponentIdentity,
    pub extracted: &'a ExtractedData,
    pub meta: &'a GeneratedMeta,
    pub source_hash: &'a str,
    /// When set, related components are restricted to these names.
    pub available_components: Option<&'a [String]>,
    pub provider: &'a str,
    pub model: &'a str,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropCategory {
    Variants,
    Behaviors,
    Events,
    Slots,
    Other,
}

const SLOT_TYPES: &[&str] = &["ReactNode", "ReactElement", "JSX.Element"];

/// Place a prop in exactly one category.
pub fn categorize_prop(prop: &ExtractedProp, variant_names: &[&str]) -> PropCategory {
    let ty = prop.type_name.trim();

    let mut chars = prop.name.chars();
    let is_handler = prop.name.starts_with("on")
        && chars.nth(2).is_some_and(|c| c.is_ascii_uppercase());
    if is_handler {
        return PropCategory::Events;
    }
    if prop.name == "children" || SLOT_TYPES.iter().any(|s| ty.contains(s)) {
        return PropCategory::Slots;
    }
    if prop.values.is_some() || variant_names.contains(&prop.name.as_str()) {
        return PropCategory::Variants;
    }
    let bare = ty.trim_end_matches("| undefined").trim();
    if bare == "boolean" {
        return PropCategory::Behaviors;
    }
    PropCategory::Other
}

pub fn build_manifest(input: &BuildInput<'_>) -> Result<Manifest, ManifestBuildError> {
    validate(input)?;

    let extracted = input.extracted;
    let meta = input.meta;
    let variant_names = extracted.variant_names();

    let mut props = CategorizedProps::default();
    for prop in &extracted.props {
        let bucket = match categorize_prop(prop, &variant_names) {
            PropCategory::Variants => &mut props.variants,
            PropCategory::Behaviors => &mut props.behaviors,
            PropCategory::Events => &mut props.events,
            PropCategory::Slots => &mut props.slots,
            PropCategory::Other => &mut props.other,
        };
        bucket.push(manifest_prop(prop));
    }

    let variants = extracted
        .variants
        .iter()
        .map(|v| ManifestVariant {
            name: v.name.clone(),
            values: v.values.clone(),
            default_value: v.default_value.clone(),
            descriptions: meta
                .variant_descriptions
                .as_ref()
                .and_then(|d| d.get(&v.name))
                .cloned()
                .unwrap_or_default(),
        })
        .collect();

    let composition = extracted.compound.as_ref().map(|compound| {
        let parts: Vec<CompositionPart> = extracted
            .sub_components
            .iter()
            .map(|sub| CompositionPart {
                name: sub.name.clone(),
                required: sub.required_in_composition,
                primitive: sub.radix_primitive.clone(),
                props: sub.props.iter().map(|p| p.name.clone()).collect(),
            })
            .collect();
        CompositionGuide {
            root: compound.root_component.clone(),
            required_parts: parts
                .iter()
                .filter(|p| p.required)
                .map(|p| p.name.clone())
                .collect(),
            parts,
        }
    });

    let examples = match &meta.examples {
        Some(examples) if !examples.is_empty() => examples.clone(),
        _ => extracted
            .stories
            .iter()
            .map(|story| ComponentExample {
                title: story.name.clone(),
                code: story.source.clone(),
                description: None,
            })
            .collect(),
    };

    let manifest = AiManifest {
        name: input.identity.name.clone(),
        description: meta.description.clone(),
        semantic_description: meta.semantic_description.clone(),
        when_to_use: meta.when_to_use.clone(),
        when_not_to_use: meta.when_not_to_use.clone(),
        props,
        variants,
        composition,
        patterns: meta.patterns.clone(),
        examples,
        related_components: related_components(
            &meta.related_components,
            input.available_components,
        ),
        dependencies: extracted.dependencies.clone(),
        provenance: Provenance {
            extraction_method: extracted.extraction.method,
            fallback_triggered: extracted.extraction.fallback_triggered,
            provider: input.provider.to_string(),
            model: input.model.to_string(),
        },
    };

    Ok(Manifest {
        component_name: input.identity.name.clone(),
        identity: input.identity.clone(),
        manifest,
        source_hash: input.source_hash.to_string(),
        files: extracted.files.clone(),
        built_at: input.built_at,
    })
}

fn validate(input: &BuildInput<'_>) -> Result<(), ManifestBuildError> {
    let identity = input.identity;
    let extracted = input.extracted;

    if identity.name.trim().is_empty() {
        return Err(ManifestBuildError::MissingField("identity.name".into()));
    }
    if identity.slug.trim().is_empty() {
        return Err(ManifestBuildError::MissingField("identity.slug".into()));
    }
    if input.source_hash.is_empty() {
        return Err(ManifestBuildError::MissingInput("sourceHash".into()));
    }
    if extracted.component_name.trim().is_empty() {
        return Err(ManifestBuildError::MissingField(
            "extracted.componentName".into(),
        ));
    }
    if extracted.component_name != identity.name {
        return Err(ManifestBuildError::Inconsistent(format!(
            "extraction is for {} but identity is {}",
            extracted.component_name, identity.name
        )));
    }
    if extracted.source_hash != input.source_hash {
        return Err(ManifestBuildError::Inconsistent(format!(
            "extraction hash {} does not match source hash {}",
            extracted.source_hash, input.source_hash
        )));
    }
    if let Some(compound) = &extracted.compound {
        for name in &compound.sub_components {
            let records = extracted
                .sub_components
                .iter()
                .filter(|s| &s.name == name)
                .count();
            if records != 1 {
                return Err(ManifestBuildError::Inconsistent(format!(
                    "sub-component {} has {} records",
                    name, records
                )));
            }
        }
    }
    if input.meta.description.trim().is_empty() {
        return Err(ManifestBuildError::MissingField("meta.description".into()));
    }
    Ok(())
}

fn manifest_prop(prop: &ExtractedProp) -> ManifestProp {
    ManifestProp {
        name: prop.name.clone(),
        type_name: prop.type_name.clone(),
        description: prop.description.clone(),
        default_value: prop.default_value.clone(),
        values: prop.values.clone(),
        required: prop.required,
    }
}

fn related_components(related: &[String], available: Option<&[String]>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in related {
        let known = available.map_or(true, |a| a.iter().any(|n| n == name));
        if known && !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::{
        CompoundComponentInfo, Dependencies, ExtractedSubComponent, ExtractedVariant,
        ExtractionMethod, ExtractionReport,
    };

    fn prop(name: &str, ty: &str) -> ExtractedProp {
        ExtractedProp::new(name, ty, false)
    }

    fn extracted() -> ExtractedData {
        let mut variant = prop("variant", "\"default\" | \"ghost\"");
        variant.values = Some(vec!["default".into(), "ghost".into()]);
        ExtractedData {
            component_name: "Button".into(),
            props: vec![
                variant,
                prop("size", "string"),
                prop("disabled", "boolean"),
                prop("onClick", "() => void"),
                prop("children", "React.ReactNode"),
                prop("icon", "ReactElement | null"),
                prop("label", "string"),
            ],
            variants: vec![
                ExtractedVariant {
                    name: "variant".into(),
                    values: vec!["default".into(), "ghost".into()],
                    default_value: Some("default".into()),
                },
                ExtractedVariant {
                    name: "size".into(),
                    values: vec!["sm".into(), "lg".into()],
                    default_value: None,
                },
            ],
            dependencies: Dependencies::default(),
            compound: None,
            sub_components: vec![],
            description: None,
            stories: vec![],
            files: vec!["button.tsx".into()],
            source_hash: "abc".into(),
            extraction: ExtractionReport {
                method: ExtractionMethod::Primary,
                fallback_triggered: false,
                fallback_reason: None,
            },
        }
    }

    fn meta() -> GeneratedMeta {
        let mut descriptions = BTreeMap::new();
        descriptions.insert(
            "variant".to_string(),
            BTreeMap::from([("ghost".to_string(), "No background".to_string())]),
        );
        GeneratedMeta {
            description: "A button".into(),
            semantic_description: "Triggers an action".into(),
            when_to_use: "Actions".into(),
            when_not_to_use: "Navigation".into(),
            patterns: vec!["form submit".into()],
            examples: None,
            related_components: vec!["Button".into(), "Ghost".into(), "Card".into()],
            variant_descriptions: Some(descriptions),
        }
    }

    fn build(
        extracted: &ExtractedData,
        meta: &GeneratedMeta,
        available: Option<&[String]>,
    ) -> Result<Manifest, ManifestBuildError> {
        let identity = ComponentIdentity::resolve("Button", "react", None);
        build_manifest(&BuildInput {
            identity: &identity,
            extracted,
            meta,
            source_hash: "abc",
            available_components: available,
            provider: "test",
            model: "m",
            built_at: Utc::now(),
        })
    }

    #[test]
    fn test_categories_follow_precedence() {
        let m = build(&extracted(), &meta(), None).unwrap().manifest;
        let names = |props: &Vec<ManifestProp>| -> Vec<String> {
            props.iter().map(|p| p.name.clone()).collect()
        };
        assert_eq!(names(&m.props.events), vec!["onClick"]);
        assert_eq!(names(&m.props.slots), vec!["children", "icon"]);
        assert_eq!(names(&m.props.variants), vec!["variant", "size"]);
        assert_eq!(names(&m.props.behaviors), vec!["disabled"]);
        assert_eq!(names(&m.props.other), vec!["label"]);
        assert_eq!(m.props.len(), extracted().props.len());
    }

    #[test]
    fn test_event_beats_slot_and_variant() {
        let mut p = prop("onRender", "() => ReactNode");
        p.values = Some(vec!["a".into()]);
        assert_eq!(categorize_prop(&p, &["onRender"]), PropCategory::Events);
        assert_eq!(categorize_prop(&prop("once", "boolean"), &[]), PropCategory::Behaviors);
    }

    #[test]
    fn test_related_components_filtered_by_available() {
        let mut meta = meta();
        meta.related_components = vec!["Button".into(), "Ghost".into()];
        let available = vec!["Button".to_string(), "Card".to_string()];

        let m = build(&extracted(), &meta, Some(&available)).unwrap().manifest;
        assert_eq!(m.related_components, vec!["Button"]);

        let m = build(&extracted(), &meta, None).unwrap().manifest;
        assert_eq!(m.related_components, vec!["Button", "Ghost"]);
    }

    #[test]
    fn test_variant_descriptions_attach() {
        let m = build(&extracted(), &meta(), None).unwrap().manifest;
        assert_eq!(m.variants[0].descriptions["ghost"], "No background");
        assert_eq!(m.variants[0].default_value.as_deref(), Some("default"));
        assert!(m.variants[1].descriptions.is_empty());
    }

    #[test]
    fn test_fails_on_missing_description() {
        let mut meta = meta();
        meta.description = String::new();
        let err = build(&extracted(), &meta, None).unwrap_err();
        assert!(matches!(err, ManifestBuildError::MissingField(_)));
    }

    #[test]
    fn test_fails_on_hash_mismatch() {
        let mut data = extracted();
        data.source_hash = "other".into();
        let err = build(&data, &meta(), None).unwrap_err();
        assert!(matches!(err, ManifestBuildError::Inconsistent(_)));
    }

    #[test]
    fn test_composition_guide() {
        let mut data = extracted();
        data.compound = Some(CompoundComponentInfo {
            is_compound: true,
            root_component: "Button".into(),
            sub_components: vec!["ButtonIcon".into(), "ButtonGroupItem".into()],
        });
        data.sub_components = vec![
            ExtractedSubComponent {
                name: "ButtonIcon".into(),
                props: vec![prop("src", "string")],
                required_in_composition: false,
                radix_primitive: None,
                variants: None,
                default_variants: None,
            },
            ExtractedSubComponent {
                name: "ButtonGroupItem".into(),
                props: vec![],
                required_in_composition: true,
                radix_primitive: Some("ToggleGroupPrimitive.Item".into()),
                variants: None,
                default_variants: None,
            },
        ];
        let guide = build(&data, &meta(), None).unwrap().manifest.composition.unwrap();
        assert_eq!(guide.root, "Button");
        assert_eq!(guide.required_parts, vec!["ButtonGroupItem"]);
        assert_eq!(guide.parts[0].props, vec!["src"]);

        data.sub_components.pop();
        let err = build(&data, &meta(), None).unwrap_err();
        assert!(matches!(err, ManifestBuildError::Inconsistent(_)));
    }
}
