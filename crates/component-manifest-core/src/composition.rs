//! Required/optional decisions for the parts of a compound component.
//!
//! Each sub-component gets exactly one decision. Rules are tried in order
//! and the first that applies wins:
//!
//! | # | Rule | Outcome |
//! |---|------|---------|
//! | 1 | another definition in the file renders it | optional |
//! | 2 | root has an entry in the override table | required iff listed |
//! | 3 | wrapped primitive name matches a required suffix | required |
//! | 4 | name minus the root prefix matches a required suffix | required |
//! | 5 | otherwise | optional |
//!
//! A configured override entry bypasses both suffix heuristics, so an
//! empty list makes every part of that root optional.

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{AstAnalyzer, ModuleFacts};
use crate::error::ExtractionError;
use crate::syntax::trailing_segment;

pub const DEFAULT_REQUIRED_SUFFIXES: &[&str] = &["Trigger", "Content", "Item", "List"];

/// Immutable rule set handed to [`CompositionAnalyzer::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionRules {
    pub required_suffixes: Vec<String>,
    /// Root name → names of its required sub-components.
    pub overrides: BTreeMap<String, Vec<String>>,
}

impl Default for CompositionRules {
    fn default() -> Self {
        let mut overrides = BTreeMap::new();
        overrides.insert("Card".to_string(), Vec::new());
        overrides.insert("Alert".to_string(), Vec::new());
        overrides.insert(
            "Table".to_string(),
            ["TableHeader", "TableBody", "TableRow", "TableCell"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        Self {
            required_suffixes: DEFAULT_REQUIRED_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            overrides,
        }
    }
}

/// A sub-component to decide on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubComponentRef {
    pub name: String,
    /// Name of the primitive it wraps (`Trigger`, or `DialogPrimitive.Trigger`).
    pub primitive_suffix: Option<String>,
}

impl SubComponentRef {
    pub fn new(name: impl Into<String>, primitive_suffix: Option<String>) -> Self {
        Self {
            name: name.into(),
            primitive_suffix,
        }
    }
}

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    InternallyComposed,
    Override,
    PrimitiveSuffix,
    NameSuffix,
    Default,
}

#[derive(Debug, Clone, Default)]
pub struct CompositionAnalyzer {
    rules: CompositionRules,
}

impl CompositionAnalyzer {
    pub fn new(rules: CompositionRules) -> Self {
        Self { rules }
    }

    /// Decide every sub-component of `root` in one pass over a fresh parse
    /// of `source`.
    pub fn analyze_all(
        &self,
        source: &str,
        root: &str,
        subs: &[SubComponentRef],
    ) -> Result<BTreeMap<String, bool>, ExtractionError> {
        let facts = AstAnalyzer::default().analyze(source, "composition.tsx")?;
        Ok(self.analyze_facts(&facts, root, subs))
    }

    /// Same as [`analyze_all`](Self::analyze_all) over already-collected facts.
    pub fn analyze_facts(
        &self,
        facts: &ModuleFacts,
        root: &str,
        subs: &[SubComponentRef],
    ) -> BTreeMap<String, bool> {
        subs.iter()
            .map(|sub| {
                let (required, rule) = self.decide(facts, root, sub);
                debug!(root, sub = %sub.name, required, ?rule, "composition decision");
                (sub.name.clone(), required)
            })
            .collect()
    }

    pub fn decide(&self, facts: &ModuleFacts, root: &str, sub: &SubComponentRef) -> (bool, Rule) {
        let composed_internally = facts
            .components
            .iter()
            .any(|def| def.name != sub.name && def.renders(&sub.name));
        if composed_internally {
            return (false, Rule::InternallyComposed);
        }

        if let Some(required) = self.rules.overrides.get(root) {
            return (required.contains(&sub.name), Rule::Override);
        }

        if let Some(primitive) = sub.primitive_suffix.as_deref() {
            if self.has_required_suffix(trailing_segment(primitive)) {
                return (true, Rule::PrimitiveSuffix);
            }
        }

        if let Some(suffix) = part_suffix(&sub.name, root) {
            if self.has_required_suffix(suffix) {
                return (true, Rule::NameSuffix);
            }
        }

        (false, Rule::Default)
    }

    /// Equality or suffix match against the required-suffix set
    /// (`SubTrigger` matches `Trigger`).
    pub fn has_required_suffix(&self, name: &str) -> bool {
        !name.is_empty()
            && self
                .rules
                .required_suffixes
                .iter()
                .any(|s| name == s || name.ends_with(s.as_str()))
    }
}

/// The part name after `root` when `name` is `<Root><Upper>…`
/// (`CardHeader` under `Card` is `Header`; `Cardinal` is not a part).
pub fn part_suffix<'a>(name: &'a str, root: &str) -> Option<&'a str> {
    name.strip_prefix(root)
        .filter(|suffix| suffix.starts_with(|c: char| c.is_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIALOG: &str = r#"
import * as DialogPrimitive from "@radix-ui/react-dialog"

export function Dialog(props) { return <DialogPrimitive.Root {...props} /> }
export function DialogPortal(props) { return <DialogPrimitive.Portal {...props} /> }
export function DialogContent({ children, ...props }) {
  return (
    <DialogPortal>
      <DialogPrimitive.Content {...props}>{children}</DialogPrimitive.Content>
    </DialogPortal>
  )
}
export function DialogTitle(props) { return <DialogPrimitive.Title {...props} /> }
"#;

    fn subs(names: &[&str]) -> Vec<SubComponentRef> {
        names
            .iter()
            .map(|n| SubComponentRef::new(*n, None))
            .collect()
    }

    #[test]
    fn test_internal_usage_wins_over_suffixes() {
        let mut rules = CompositionRules::default();
        rules.required_suffixes.push("Portal".to_string());
        let analyzer = CompositionAnalyzer::new(rules);

        let result = analyzer
            .analyze_all(DIALOG, "Dialog", &subs(&["DialogPortal", "DialogContent"]))
            .unwrap();
        assert_eq!(result["DialogPortal"], false);
        assert_eq!(result["DialogContent"], true);
    }

    #[test]
    fn test_name_suffix_heuristic() {
        let analyzer = CompositionAnalyzer::default();
        let source = "export function Accordion() { return null }\nexport function AccordionItem() { return null }";
        let result = analyzer
            .analyze_all(source, "Accordion", &subs(&["AccordionItem"]))
            .unwrap();
        assert_eq!(result["AccordionItem"], true);

        let result = analyzer
            .analyze_all(DIALOG, "Dialog", &subs(&["DialogTitle"]))
            .unwrap();
        assert_eq!(result["DialogTitle"], false);
    }

    #[test]
    fn test_name_suffix_needs_a_word_boundary() {
        let analyzer = CompositionAnalyzer::default();
        let source = "export function Select() { return null }";
        let result = analyzer
            .analyze_all(source, "Select", &subs(&["SelectionItem", "SelectItem"]))
            .unwrap();
        assert_eq!(result["SelectionItem"], false);
        assert_eq!(result["SelectItem"], true);

        assert_eq!(part_suffix("CardHeader", "Card"), Some("Header"));
        assert_eq!(part_suffix("Cardinal", "Card"), None);
        assert_eq!(part_suffix("Card", "Card"), None);
    }

    #[test]
    fn test_primitive_suffix_heuristic() {
        let analyzer = CompositionAnalyzer::default();
        let source = "export function Menu() { return null }\nexport function MenuOpener() { return null }";
        let result = analyzer
            .analyze_all(
                source,
                "Menu",
                &[SubComponentRef::new("MenuOpener", Some("MenuPrimitive.SubTrigger".to_string()))],
            )
            .unwrap();
        assert_eq!(result["MenuOpener"], true);
    }

    #[test]
    fn test_empty_override_makes_everything_optional() {
        let analyzer = CompositionAnalyzer::default();
        let source = r#"
export function Card() { return <div /> }
export function CardTrigger() { return <button /> }
export function CardContent() { return <div /> }
"#;
        let result = analyzer
            .analyze_all(
                source,
                "Card",
                &[
                    SubComponentRef::new("CardTrigger", Some("Trigger".to_string())),
                    SubComponentRef::new("CardContent", None),
                ],
            )
            .unwrap();
        assert!(result.values().all(|required| !required));
    }

    #[test]
    fn test_override_list_marks_listed_parts_required() {
        let analyzer = CompositionAnalyzer::default();
        let source = "export function Table() { return <table /> }";
        let result = analyzer
            .analyze_all(source, "Table", &subs(&["TableRow", "TableCaption"]))
            .unwrap();
        assert_eq!(result["TableRow"], true);
        assert_eq!(result["TableCaption"], false);
    }

    #[test]
    fn test_root_name_is_never_a_suffix_match() {
        let mut rules = CompositionRules::default();
        rules.required_suffixes.push("Tabs".to_string());
        let analyzer = CompositionAnalyzer::new(rules);
        let source = "export function Tabs() { return null }";
        let result = analyzer.analyze_all(source, "Tabs", &subs(&["Tabs"])).unwrap();
        assert_eq!(result["Tabs"], false);
    }

    #[test]
    fn test_deterministic() {
        let analyzer = CompositionAnalyzer::default();
        let parts = subs(&["DialogPortal", "DialogContent", "DialogTitle"]);
        let first = analyzer.analyze_all(DIALOG, "Dialog", &parts).unwrap();
        let second = analyzer.analyze_all(DIALOG, "Dialog", &parts).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unparseable_source_fails() {
        let analyzer = CompositionAnalyzer::default();
        assert!(analyzer
            .analyze_all("export function (", "Dialog", &subs(&["DialogTitle"]))
            .is_err());
    }
}
