//! Hybrid extraction coordinator.
//!
//! Runs the [`PrimaryAnalyzer`] first and only falls back to the
//! [`AstAnalyzer`] when the primary result is low-confidence. Exactly one
//! analyzer's prop list is used per run; the two lists are never merged.
//! Composition, dependency, variant, and story facts always come from the
//! syntax tree, whichever analyzer supplied the props.
//!
//! The choice is made by [`select_method`], a plain function over the
//! primary outcome, so it can be tested without either analyzer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ast::{AstAnalyzer, ModuleFacts};
use crate::composition::{part_suffix, CompositionAnalyzer, SubComponentRef};
use crate::error::ExtractionError;
use crate::identity::source_hash;
use crate::models::{
    ComponentIdentity, CompoundComponentInfo, ExtractedData, ExtractedProp, ExtractedSubComponent,
    ExtractionMethod, ExtractionReport,
};
use crate::primary::{PrimaryAnalyzer, PrimaryOutcome};
use crate::syntax::{is_blank_code, is_pascal_case};

/// When a primary result counts as low-confidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPolicy {
    /// Fewer primary props than this on non-trivial source triggers fallback.
    pub min_props: usize,
    /// Components that legitimately declare no props.
    pub propless_components: Vec<String>,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            min_props: 1,
            propless_components: Vec::new(),
        }
    }
}

/// A value tagged with the analyzer that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Analyzed<T> {
    pub method: ExtractionMethod,
    pub value: T,
}

/// Outcome of [`select_method`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Primary,
    Fallback { reason: String },
}

/// Decide whether the primary outcome is authoritative.
pub fn select_method(
    outcome: &PrimaryOutcome,
    source: &str,
    component_name: &str,
    policy: &ExtractionPolicy,
) -> Selection {
    if let Some(diag) = outcome.diagnostics.first() {
        return Selection::Fallback {
            reason: format!(
                "primary analyzer reported a parse diagnostic at offset {}: {}",
                diag.offset, diag.message
            ),
        };
    }

    let propless = policy
        .propless_components
        .iter()
        .any(|c| c == component_name);
    let count = outcome.props.len();
    if count < policy.min_props && !propless && !is_blank_code(source) {
        let reason = if count == 0 {
            match &outcome.declaration {
                Some(decl) => format!("primary analyzer found no props in {}", decl),
                None => format!("no {}Props declaration found", component_name),
            }
        } else {
            format!(
                "primary analyzer returned {} props, below the minimum of {}",
                count, policy.min_props
            )
        };
        return Selection::Fallback { reason };
    }

    Selection::Primary
}

/// Result of [`HybridExtractor::extract`].
#[derive(Debug, Clone, PartialEq)]
pub struct PropExtraction {
    pub props: Analyzed<Vec<ExtractedProp>>,
    pub fallback_triggered: bool,
    pub fallback_reason: Option<String>,
}

impl PropExtraction {
    pub fn report(&self) -> ExtractionReport {
        ExtractionReport {
            method: self.props.method,
            fallback_triggered: self.fallback_triggered,
            fallback_reason: self.fallback_reason.clone(),
        }
    }
}

/// Input to the Extract phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionInput {
    pub org_id: String,
    pub name: String,
    pub source_code: String,
    pub file_path: Option<String>,
    pub framework: String,
    pub existing_id: Option<Uuid>,
    pub stories_code: Option<String>,
    pub stories_file_path: Option<String>,
}

/// Output of the Extract phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutput {
    pub identity: ComponentIdentity,
    pub data: ExtractedData,
}

#[derive(Debug, Clone, Default)]
pub struct HybridExtractor {
    primary: PrimaryAnalyzer,
    ast: AstAnalyzer,
    composition: CompositionAnalyzer,
    policy: ExtractionPolicy,
}

impl HybridExtractor {
    pub fn new(ast: AstAnalyzer, composition: CompositionAnalyzer, policy: ExtractionPolicy) -> Self {
        Self {
            primary: PrimaryAnalyzer::new(),
            ast,
            composition,
            policy,
        }
    }

    /// Extract the authoritative prop list for `component_name`.
    ///
    /// Fails only when fallback is needed and the source does not parse.
    pub fn extract(
        &self,
        source: &str,
        component_name: &str,
        file_path: Option<&str>,
    ) -> Result<PropExtraction, ExtractionError> {
        let path = file_path.unwrap_or("component.tsx");
        self.select_props(source, component_name, || {
            Ok(self.ast.analyze(source, path)?.props_of(component_name))
        })
    }

    fn select_props(
        &self,
        source: &str,
        component_name: &str,
        fallback: impl FnOnce() -> Result<Vec<ExtractedProp>, ExtractionError>,
    ) -> Result<PropExtraction, ExtractionError> {
        let outcome = self.primary.analyze(source, component_name);

        match select_method(&outcome, source, component_name, &self.policy) {
            Selection::Primary => {
                debug!(
                    component = component_name,
                    props = outcome.props.len(),
                    "primary analyzer accepted"
                );
                Ok(PropExtraction {
                    props: Analyzed {
                        method: ExtractionMethod::Primary,
                        value: outcome.props,
                    },
                    fallback_triggered: false,
                    fallback_reason: None,
                })
            }
            Selection::Fallback { reason } => {
                info!(component = component_name, %reason, "falling back to AST analyzer");
                Ok(PropExtraction {
                    props: Analyzed {
                        method: ExtractionMethod::Fallback,
                        value: fallback()?,
                    },
                    fallback_triggered: true,
                    fallback_reason: Some(reason),
                })
            }
        }
    }

    /// Run the full Extract phase for one component.
    pub fn extract_component(
        &self,
        input: &ExtractionInput,
    ) -> Result<ExtractionOutput, ExtractionError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ExtractionError::InvalidInput(
                "component name is empty".to_string(),
            ));
        }
        if input.source_code.trim().is_empty() {
            return Err(ExtractionError::InvalidInput(format!(
                "source for {} is empty",
                name
            )));
        }

        let path = input
            .file_path
            .clone()
            .unwrap_or_else(|| format!("{}.tsx", name));
        let facts = self.ast.analyze(&input.source_code, &path)?;
        let root = facts
            .component(name)
            .ok_or_else(|| ExtractionError::Unobtainable {
                component: name.to_string(),
                reason: format!("no definition named {} in {}", name, path),
            })?;

        let props = self.select_props(&input.source_code, name, || Ok(facts.props_of(name)))?;

        let (compound, sub_components) = self.compound_parts(&facts, name);

        let stories = match &input.stories_code {
            Some(code) => {
                let stories_path = input
                    .stories_file_path
                    .clone()
                    .unwrap_or_else(|| format!("{}.stories.tsx", name));
                self.ast.collect_stories(code, &stories_path)?
            }
            None => Vec::new(),
        };

        let mut files = Vec::new();
        if let Some(path) = &input.file_path {
            files.push(path.clone());
        }
        if let Some(path) = &input.stories_file_path {
            files.push(path.clone());
        }

        let variants = facts
            .variants_of(root)
            .into_iter()
            .flat_map(|t| t.variants.iter().cloned())
            .collect();

        let identity = ComponentIdentity::resolve(name, &input.framework, input.existing_id);
        debug!(
            org = %input.org_id,
            component = name,
            slug = %identity.slug,
            method = props.props.method.as_str(),
            "extraction complete"
        );

        let data = ExtractedData {
            component_name: name.to_string(),
            extraction: props.report(),
            props: props.props.value,
            variants,
            dependencies: facts.dependencies(),
            compound,
            sub_components,
            description: root.doc.clone(),
            stories,
            files,
            source_hash: source_hash(&input.source_code, input.stories_code.as_deref()),
        };

        Ok(ExtractionOutput { identity, data })
    }

    /// Exported definitions named `<Root>…` form the compound parts.
    fn compound_parts(
        &self,
        facts: &ModuleFacts,
        root: &str,
    ) -> (Option<CompoundComponentInfo>, Vec<ExtractedSubComponent>) {
        let defs: Vec<_> = facts
            .exported_components()
            .filter(|d| part_suffix(&d.name, root).is_some() && is_pascal_case(&d.name))
            .collect();
        if defs.is_empty() {
            return (None, Vec::new());
        }

        let refs: Vec<SubComponentRef> = defs
            .iter()
            .map(|d| SubComponentRef::new(d.name.clone(), facts.primitive_of(d)))
            .collect();
        let decisions = self.composition.analyze_facts(facts, root, &refs);

        let subs = defs
            .iter()
            .zip(refs)
            .map(|(def, sub)| {
                let tables = facts.variants_of(def);
                let variants: Vec<_> = tables
                    .iter()
                    .flat_map(|t| t.variants.iter().cloned())
                    .collect();
                let defaults: BTreeMap<String, String> = tables
                    .iter()
                    .flat_map(|t| t.default_variants.clone())
                    .collect();
                ExtractedSubComponent {
                    props: facts.props_of(&def.name),
                    required_in_composition: decisions.get(&def.name).copied().unwrap_or(false),
                    name: sub.name,
                    radix_primitive: sub.primitive_suffix,
                    variants: if variants.is_empty() { None } else { Some(variants) },
                    default_variants: if defaults.is_empty() { None } else { Some(defaults) },
                }
            })
            .collect::<Vec<_>>();

        let info = CompoundComponentInfo {
            is_compound: true,
            root_component: root.to_string(),
            sub_components: subs.iter().map(|s| s.name.clone()).collect(),
        };
        (Some(info), subs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primary::Diagnostic;

    const BADGE: &str = r#"
export interface BadgeProps {
  /** @default "neutral" */
  tone?: "neutral" | "brand"
  label: string
}

export function Badge({ tone = "neutral", label }: BadgeProps) {
  return <span data-tone={tone}>{label}</span>
}
"#;

    const INLINE: &str = r#"
export function Chip({ label, onRemove }: { label: string; onRemove?: () => void }) {
  return <span onClick={onRemove}>{label}</span>
}
"#;

    const DIALOG: &str = r#"
import * as DialogPrimitive from "@radix-ui/react-dialog"

/** Modal dialog. */
export function Dialog(props: { open?: boolean }) { return <DialogPrimitive.Root {...props} /> }
export function DialogTrigger(props: { asChild?: boolean }) { return <DialogPrimitive.Trigger {...props} /> }
export function DialogPortal(props: { container?: HTMLElement }) { return <DialogPrimitive.Portal {...props} /> }
export function DialogContent(props: { forceMount?: boolean }) {
  return <DialogPortal><DialogPrimitive.Content {...props} /></DialogPortal>
}
export function DialogTitle(props: { id?: string }) { return <DialogPrimitive.Title {...props} /> }
"#;

    fn input(name: &str, source: &str) -> ExtractionInput {
        ExtractionInput {
            org_id: "org".to_string(),
            name: name.to_string(),
            source_code: source.to_string(),
            file_path: Some(format!("src/{}.tsx", name.to_lowercase())),
            framework: "react".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_select_method_rules() {
        let policy = ExtractionPolicy::default();
        let accepted = PrimaryOutcome {
            props: vec![ExtractedProp::new("a", "string", true)],
            declaration: Some("XProps".to_string()),
            diagnostics: vec![],
        };
        assert_eq!(select_method(&accepted, "x", "X", &policy), Selection::Primary);

        let empty = PrimaryOutcome::default();
        assert!(matches!(
            select_method(&empty, "export const X = () => null", "X", &policy),
            Selection::Fallback { .. }
        ));
        assert_eq!(select_method(&empty, "// nothing\n", "X", &policy), Selection::Primary);

        let diagnosed = PrimaryOutcome {
            diagnostics: vec![Diagnostic {
                offset: 3,
                message: "unclosed '{'".to_string(),
            }],
            ..accepted
        };
        assert!(matches!(
            select_method(&diagnosed, "x", "X", &policy),
            Selection::Fallback { .. }
        ));
    }

    #[test]
    fn test_propless_components_skip_fallback() {
        let policy = ExtractionPolicy {
            min_props: 1,
            propless_components: vec!["Divider".to_string()],
        };
        let empty = PrimaryOutcome::default();
        assert_eq!(
            select_method(&empty, "export const Divider = () => <hr />", "Divider", &policy),
            Selection::Primary
        );
    }

    #[test]
    fn test_primary_accepted_does_not_fall_back() {
        let result = HybridExtractor::default().extract(BADGE, "Badge", None).unwrap();
        assert_eq!(result.props.method, ExtractionMethod::Primary);
        assert!(!result.fallback_triggered);
        assert!(result.fallback_reason.is_none());
        assert_eq!(result.props.value.len(), 2);
        assert_eq!(result.props.value[0].default_value.as_deref(), Some("neutral"));
    }

    #[test]
    fn test_zero_primary_props_trigger_fallback() {
        let result = HybridExtractor::default().extract(INLINE, "Chip", None).unwrap();
        assert_eq!(result.props.method, ExtractionMethod::Fallback);
        assert!(result.fallback_triggered);
        assert!(result.fallback_reason.is_some());
        let names: Vec<&str> = result.props.value.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["label", "onRemove"]);
    }

    #[test]
    fn test_fallback_parse_failure_is_fatal() {
        let broken = "export function Chip({ label }: { label: string }) { return <span>";
        let err = HybridExtractor::default().extract(broken, "Chip", None).unwrap_err();
        assert!(matches!(err, ExtractionError::Parse { .. }));
    }

    #[test]
    fn test_extract_component_compound() {
        let out = HybridExtractor::default()
            .extract_component(&input("Dialog", DIALOG))
            .unwrap();
        let data = out.data;

        let compound = data.compound.as_ref().unwrap();
        assert!(compound.is_compound);
        assert_eq!(compound.root_component, "Dialog");
        assert_eq!(compound.sub_components.len(), data.sub_components.len());
        for name in &compound.sub_components {
            assert_eq!(
                data.sub_components.iter().filter(|s| &s.name == name).count(),
                1
            );
        }

        let required = |name: &str| {
            data.sub_components
                .iter()
                .find(|s| s.name == name)
                .unwrap()
                .required_in_composition
        };
        assert!(required("DialogTrigger"));
        assert!(required("DialogContent"));
        assert!(!required("DialogPortal"));
        assert!(!required("DialogTitle"));

        let trigger = data
            .sub_components
            .iter()
            .find(|s| s.name == "DialogTrigger")
            .unwrap();
        assert_eq!(trigger.radix_primitive.as_deref(), Some("DialogPrimitive.Trigger"));

        assert_eq!(data.description.as_deref(), Some("Modal dialog."));
        assert_eq!(data.dependencies.primitives, vec!["@radix-ui/react-dialog"]);
        assert_eq!(data.files, vec!["src/dialog.tsx"]);
        assert_eq!(out.identity.name, "Dialog");
    }

    #[test]
    fn test_names_sharing_a_prefix_are_not_parts() {
        let source = r#"
export function Card(props: { elevated?: boolean }) { return <div {...props} /> }
export function CardHeader(props: { title?: string }) { return <div {...props} /> }
export function Cardinal(props: { rank?: number }) { return <div {...props} /> }
"#;
        let out = HybridExtractor::default()
            .extract_component(&input("Card", source))
            .unwrap();
        let names: Vec<_> = out.data.sub_components.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["CardHeader"]);
        assert_eq!(
            out.data.compound.unwrap().sub_components,
            vec!["CardHeader".to_string()]
        );
    }

    #[test]
    fn test_missing_definition_is_unobtainable() {
        let err = HybridExtractor::default()
            .extract_component(&input("Tooltip", BADGE))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Unobtainable { .. }));
    }

    #[test]
    fn test_existing_id_is_reused() {
        let id = Uuid::new_v4();
        let mut req = input("Badge", BADGE);
        req.existing_id = Some(id);
        let out = HybridExtractor::default().extract_component(&req).unwrap();
        assert_eq!(out.identity.id, id);
    }

    #[test]
    fn test_stories_join_hash_and_files() {
        let extractor = HybridExtractor::default();
        let plain = extractor.extract_component(&input("Badge", BADGE)).unwrap();

        let mut req = input("Badge", BADGE);
        req.stories_code = Some("export const Brand = { args: { tone: \"brand\" } }".to_string());
        req.stories_file_path = Some("src/badge.stories.tsx".to_string());
        let with_stories = extractor.extract_component(&req).unwrap();

        assert_ne!(plain.data.source_hash, with_stories.data.source_hash);
        assert_eq!(with_stories.data.stories.len(), 1);
        assert_eq!(with_stories.data.files.len(), 2);

        req.stories_code = Some("export const = {".to_string());
        assert!(extractor.extract_component(&req).is_err());
    }
}
