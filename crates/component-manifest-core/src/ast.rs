//! Fallback AST analyzer.
//!
//! A general-purpose syntax-tree walk over one TS/TSX/JS/JSX module built
//! on `oxc_parser`. Each call allocates its own arena, copies every fact it
//! needs into owned values, and drops the arena before returning, so calls
//! never share parse state.
//!
//! ```text
//!   source ──parse──▶ Program<'arena>
//!                        │
//!        ┌───────────────┼──────────────────────┐
//!        ▼               ▼                      ▼
//!   top-level stmts   NodeCollector (Visit)   leading JSDoc
//!   components,       JSX tags, identifier    (lexical, before
//!   imports, exports, refs, interfaces,       each statement)
//!   cva tables        type aliases, literals
//!        └───────────────┬──────────────────────┘
//!                        ▼
//!                   ModuleFacts (owned)
//! ```
//!
//! [`ModuleFacts`] answers the questions the rest of the pipeline asks:
//! props of a component, variant tables it uses, the primitive it wraps,
//! the JSX tags it renders, and the module's dependencies.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, CallExpression, Declaration, ExportDefaultDeclarationKind, Expression,
    FormalParameter, FormalParameters, Function, IdentifierReference, ImportDeclaration,
    ImportDeclarationSpecifier, JSXOpeningElement, ObjectExpression, ObjectPropertyKind, Program,
    Statement, TSInterfaceDeclaration, TSSignature, TSTypeAliasDeclaration, TSTypeLiteral,
    VariableDeclaration,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use regex::Regex;

use crate::error::ExtractionError;
use crate::models::{Dependencies, ExtractedProp, ExtractedStory, ExtractedVariant};
use crate::primary::dedupe_props;
use crate::syntax::{
    code_mask, collapse_whitespace, is_pascal_case, literal_union_values, matching_close,
    parse_doc_comment, split_top_level, trailing_segment, unquote, DocComment,
};

/// Import prefixes treated as primitive libraries when none are configured.
pub const DEFAULT_PRIMITIVE_PACKAGES: &[&str] = &["@radix-ui/", "radix-ui"];

const MAX_TYPE_DEPTH: usize = 6;

lazy_static! {
    static ref TYPE_REF_RE: Regex = Regex::new(r"^([A-Za-z_$][\w$]*)\s*(?:<.*>)?$").unwrap();
    static ref VARIANT_PROPS_RE: Regex =
        Regex::new(r"^VariantProps\s*<\s*typeof\s+([A-Za-z_$][\w$]*)\s*>$").unwrap();
    static ref UTILITY_RE: Regex = Regex::new(r"^(Partial|Omit|Pick|Readonly)\s*<").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════
// Owned facts
// ═══════════════════════════════════════════════════════════════════════

/// A top-level component definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDef {
    pub name: String,
    /// Byte range of the defining statement.
    pub start: u32,
    pub end: u32,
    pub exported: bool,
    pub doc: Option<String>,
    /// Tag names rendered inside the definition, source order, deduplicated
    /// (`DialogPortal`, `DialogPrimitive.Content`).
    pub jsx_tags: Vec<String>,
    /// Identifiers referenced inside the definition.
    pub references: BTreeSet<String>,
    /// Set for `const X = Ns.Member` aliases.
    pub alias_of: Option<String>,
    props_type: Option<TypeText>,
    destructured: Vec<DestructuredProp>,
}

impl ComponentDef {
    fn contains(&self, offset: u32) -> bool {
        offset >= self.start && offset < self.end
    }

    /// True when this definition renders `name` (bare or as a member tail).
    pub fn renders(&self, name: &str) -> bool {
        self.jsx_tags.iter().any(|t| trailing_segment(t) == name)
    }
}

/// A `cva(...)` / `tv(...)` style variant table bound to a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantTable {
    pub name: String,
    pub variants: Vec<ExtractedVariant>,
    pub default_variants: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFact {
    pub source: String,
    pub type_only: bool,
    /// Local names bound by value (type-only specifiers excluded).
    pub locals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TypeText {
    start: usize,
    text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DestructuredProp {
    name: String,
    default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct InterfaceDecl {
    extends: Vec<TypeText>,
    members: Vec<ExtractedProp>,
}

/// Everything the AST analyzer learned about one module.
#[derive(Debug, Clone)]
pub struct ModuleFacts {
    pub path: String,
    pub components: Vec<ComponentDef>,
    pub variant_tables: Vec<VariantTable>,
    pub imports: Vec<ImportFact>,
    primitive_packages: Vec<String>,
    interfaces: HashMap<String, InterfaceDecl>,
    aliases: HashMap<String, TypeText>,
    type_literals: HashMap<u32, Vec<ExtractedProp>>,
}

// ═══════════════════════════════════════════════════════════════════════
// Analyzer
// ═══════════════════════════════════════════════════════════════════════

/// Syntax-tree analyzer. Holds configuration only.
#[derive(Debug, Clone)]
pub struct AstAnalyzer {
    primitive_packages: Vec<String>,
}

impl Default for AstAnalyzer {
    fn default() -> Self {
        Self::new(
            DEFAULT_PRIMITIVE_PACKAGES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        )
    }
}

impl AstAnalyzer {
    pub fn new(primitive_packages: Vec<String>) -> Self {
        Self { primitive_packages }
    }

    /// Parse `source` and collect its module facts.
    pub fn analyze(&self, source: &str, path: &str) -> Result<ModuleFacts, ExtractionError> {
        with_program(source, path, |program| {
            let mut stmts = StatementCollector::new(source);
            for stmt in &program.body {
                stmts.collect(stmt);
            }

            let mut nodes = NodeCollector::new(source);
            nodes.visit_program(program);

            stmts.finish(nodes, path, &self.primitive_packages)
        })
    }

    /// Parse a stories module and return its exported stories.
    pub fn collect_stories(
        &self,
        source: &str,
        path: &str,
    ) -> Result<Vec<ExtractedStory>, ExtractionError> {
        with_program(source, path, |program| {
            let mut stories = Vec::new();
            for stmt in &program.body {
                let Statement::ExportNamedDeclaration(export) = stmt else {
                    continue;
                };
                let story_source = slice(source, export.span).to_string();
                match &export.declaration {
                    Some(Declaration::VariableDeclaration(var)) => {
                        for decl in &var.declarations {
                            let BindingPattern::BindingIdentifier(id) = &decl.id else {
                                continue;
                            };
                            if id.name.starts_with('_') {
                                continue;
                            }
                            let args = decl.init.as_ref().and_then(|init| {
                                match unwrap_ts(init) {
                                    Expression::ObjectExpression(obj) => object_entries(source, obj)
                                        .into_iter()
                                        .find(|(key, _)| key == "args")
                                        .map(|(_, value)| {
                                            slice(source, value.span()).to_string()
                                        }),
                                    _ => None,
                                }
                            });
                            stories.push(ExtractedStory {
                                name: id.name.to_string(),
                                args,
                                source: story_source.clone(),
                            });
                        }
                    }
                    Some(Declaration::FunctionDeclaration(func)) => {
                        if let Some(id) = &func.id {
                            stories.push(ExtractedStory {
                                name: id.name.to_string(),
                                args: None,
                                source: story_source.clone(),
                            });
                        }
                    }
                    _ => {}
                }
            }
            stories
        })
    }
}

fn with_program<T>(
    source: &str,
    path: &str,
    f: impl FnOnce(&Program<'_>) -> T,
) -> Result<T, ExtractionError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type_for(path)).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let message = ret
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser aborted".to_string());
        return Err(ExtractionError::Parse {
            path: path.to_string(),
            message,
        });
    }

    Ok(f(&ret.program))
}

fn source_type_for(path: &str) -> SourceType {
    let base = SourceType::default().with_module(true);
    match path.rsplit('.').next() {
        Some("ts") | Some("mts") | Some("cts") => base.with_typescript(true),
        Some("js") | Some("jsx") | Some("mjs") => base.with_jsx(true),
        _ => base.with_typescript(true).with_jsx(true),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Top-level statements
// ═══════════════════════════════════════════════════════════════════════

struct StatementCollector<'s> {
    source: &'s str,
    defs: Vec<ComponentDef>,
    exported: HashSet<String>,
    has_exports: bool,
    imports: Vec<ImportFact>,
    tables: Vec<VariantTable>,
}

impl<'s> StatementCollector<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            defs: Vec::new(),
            exported: HashSet::new(),
            has_exports: false,
            imports: Vec::new(),
            tables: Vec::new(),
        }
    }

    fn collect<'a>(&mut self, stmt: &Statement<'a>) {
        match stmt {
            Statement::ImportDeclaration(decl) => self.collect_import(decl),
            Statement::FunctionDeclaration(func) => self.collect_function(func, stmt.span(), false),
            Statement::VariableDeclaration(var) => self.collect_variables(var, stmt.span(), false),
            Statement::ExportNamedDeclaration(export) => {
                self.has_exports = true;
                match &export.declaration {
                    Some(Declaration::FunctionDeclaration(func)) => {
                        self.collect_function(func, export.span, true)
                    }
                    Some(Declaration::VariableDeclaration(var)) => {
                        self.collect_variables(var, export.span, true)
                    }
                    _ => {}
                }
                for spec in &export.specifiers {
                    self.exported
                        .insert(unquote(slice(self.source, spec.local.span())));
                }
                if let Some(from) = &export.source {
                    self.imports.push(ImportFact {
                        source: from.value.to_string(),
                        type_only: export.export_kind.is_type(),
                        locals: Vec::new(),
                    });
                }
            }
            Statement::ExportDefaultDeclaration(export) => {
                self.has_exports = true;
                match &export.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        self.collect_function(func, export.span, true)
                    }
                    ExportDefaultDeclarationKind::Identifier(id) => {
                        self.exported.insert(id.name.to_string());
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn collect_import<'a>(&mut self, decl: &ImportDeclaration<'a>) {
        let type_only = decl.import_kind.is_type();
        let mut locals = Vec::new();
        if let Some(specifiers) = &decl.specifiers {
            for specifier in specifiers {
                match specifier {
                    ImportDeclarationSpecifier::ImportSpecifier(s) => {
                        if !s.import_kind.is_type() {
                            locals.push(s.local.name.to_string());
                        }
                    }
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                        locals.push(s.local.name.to_string());
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                        locals.push(s.local.name.to_string());
                    }
                }
            }
        }
        self.imports.push(ImportFact {
            source: decl.source.value.to_string(),
            type_only,
            locals,
        });
    }

    fn collect_function<'a>(&mut self, func: &Function<'a>, outer: Span, exported: bool) {
        let Some(id) = &func.id else {
            return;
        };
        let name = id.name.to_string();
        if !is_pascal_case(&name) {
            return;
        }
        let (props_type, destructured) = self.first_param(&func.params);
        self.push_def(name, outer, exported, props_type, destructured, None);
    }

    fn collect_variables<'a>(&mut self, var: &VariableDeclaration<'a>, outer: Span, exported: bool) {
        for decl in &var.declarations {
            let BindingPattern::BindingIdentifier(id) = &decl.id else {
                continue;
            };
            let Some(init) = &decl.init else {
                continue;
            };
            let name = id.name.to_string();
            let init = unwrap_ts(init);

            if let Expression::CallExpression(call) = init {
                if is_variant_factory(call) {
                    self.tables.push(self.variant_table(&name, call));
                    continue;
                }
            }
            if !is_pascal_case(&name) {
                continue;
            }

            if let Expression::StaticMemberExpression(member) = init {
                let alias = slice(self.source, member.span).to_string();
                self.push_def(name, outer, exported, None, Vec::new(), Some(alias));
                continue;
            }

            let Some((params, generic_props)) = self.function_shape(init) else {
                continue;
            };
            let (mut props_type, destructured) = match params {
                Some(params) => self.first_param(params),
                None => (None, Vec::new()),
            };
            if props_type.is_none() {
                props_type = generic_props;
            }
            if props_type.is_none() {
                // `const Button: React.FC<ButtonProps> = ...`
                let between = self.text_between(id.span.end, init.span().start);
                props_type = first_generic_arg(between, id.span.end as usize)
                    .filter(|_| between.trim_start().starts_with(':'));
            }
            self.push_def(name, outer, exported, props_type, destructured, None);
        }
    }

    /// Parameters of a function-like initializer, plus the props generic of
    /// a wrapping `forwardRef<El, Props>(...)`.
    fn function_shape<'b, 'a>(
        &self,
        expr: &'b Expression<'a>,
    ) -> Option<(Option<&'b FormalParameters<'a>>, Option<TypeText>)> {
        match expr {
            Expression::ArrowFunctionExpression(arrow) => Some((Some(&*arrow.params), None)),
            Expression::FunctionExpression(func) => Some((Some(&*func.params), None)),
            Expression::ParenthesizedExpression(paren) => self.function_shape(&paren.expression),
            Expression::CallExpression(call) => {
                let callee = slice(self.source, call.callee.span());
                let wrapper = trailing_segment(callee);
                if wrapper != "forwardRef" && wrapper != "memo" {
                    return None;
                }
                let generic = if wrapper == "forwardRef" {
                    let after_callee = self.text_between(call.callee.span().end, call.span.end);
                    generic_args(after_callee, call.callee.span().end as usize)
                        .and_then(|args| args.into_iter().nth(1))
                } else {
                    None
                };
                let inner = call
                    .arguments
                    .first()
                    .and_then(|arg| arg.as_expression())
                    .and_then(|arg| self.function_shape(unwrap_ts(arg)));
                match inner {
                    Some((params, inner_generic)) => Some((params, generic.or(inner_generic))),
                    None => Some((None, generic)),
                }
            }
            _ => None,
        }
    }

    fn first_param<'a>(
        &self,
        params: &FormalParameters<'a>,
    ) -> (Option<TypeText>, Vec<DestructuredProp>) {
        let Some(param) = params.items.first() else {
            return (None, Vec::new());
        };
        (self.param_annotation(param), self.destructured(&param.pattern))
    }

    /// Type annotation text of a parameter, located lexically after the
    /// binding so it does not depend on where the tree stores it.
    fn param_annotation<'a>(&self, param: &FormalParameter<'a>) -> Option<TypeText> {
        let start = param.span.start as usize;
        let text = slice(self.source, param.span);
        let binding_end = match text.as_bytes().first()? {
            b'{' | b'[' => matching_close(text, 0)? + 1,
            _ => text
                .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
                .unwrap_or(text.len()),
        };
        let rest = &text[binding_end..];
        let rest_trimmed = rest.trim_start().trim_start_matches('?').trim_start();
        let annotation = rest_trimmed.strip_prefix(':')?;
        let annotation = strip_initializer(annotation);
        let offset = start + binding_end + (rest.len() - rest_trimmed.len()) + 1;
        Some(TypeText {
            start: offset,
            text: annotation.to_string(),
        })
    }

    fn destructured<'a>(&self, pattern: &BindingPattern<'a>) -> Vec<DestructuredProp> {
        match pattern {
            BindingPattern::ObjectPattern(obj) => obj
                .properties
                .iter()
                .map(|prop| DestructuredProp {
                    name: unquote(slice(self.source, prop.key.span())),
                    default_value: match &prop.value {
                        BindingPattern::AssignmentPattern(assign) => {
                            Some(unquote(slice(self.source, assign.right.span())))
                        }
                        _ => None,
                    },
                })
                .collect(),
            BindingPattern::AssignmentPattern(assign) => self.destructured(&assign.left),
            _ => Vec::new(),
        }
    }

    fn variant_table<'a>(&self, name: &str, call: &CallExpression<'a>) -> VariantTable {
        let mut variants = Vec::new();
        let mut default_variants = BTreeMap::new();

        for arg in &call.arguments {
            let Some(Expression::ObjectExpression(config)) = arg.as_expression() else {
                continue;
            };
            for (key, value) in object_entries(self.source, config) {
                match (key.as_str(), value) {
                    ("variants", Expression::ObjectExpression(axes)) => {
                        for (axis, values) in object_entries(self.source, axes) {
                            if let Expression::ObjectExpression(values) = values {
                                variants.push(ExtractedVariant {
                                    name: axis,
                                    values: object_entries(self.source, values)
                                        .into_iter()
                                        .map(|(k, _)| k)
                                        .collect(),
                                    default_value: None,
                                });
                            }
                        }
                    }
                    ("defaultVariants", Expression::ObjectExpression(defaults)) => {
                        for (axis, value) in object_entries(self.source, defaults) {
                            default_variants
                                .insert(axis, unquote(slice(self.source, value.span())));
                        }
                    }
                    _ => {}
                }
            }
        }

        for variant in &mut variants {
            variant.default_value = default_variants.get(&variant.name).cloned();
        }

        VariantTable {
            name: name.to_string(),
            variants,
            default_variants,
        }
    }

    fn push_def(
        &mut self,
        name: String,
        outer: Span,
        exported: bool,
        props_type: Option<TypeText>,
        destructured: Vec<DestructuredProp>,
        alias_of: Option<String>,
    ) {
        let doc = leading_doc(self.source, outer.start as usize).and_then(|d| d.text);
        self.defs.push(ComponentDef {
            name,
            start: outer.start,
            end: outer.end,
            exported,
            doc,
            jsx_tags: Vec::new(),
            references: BTreeSet::new(),
            alias_of,
            props_type,
            destructured,
        });
    }

    fn text_between(&self, start: u32, end: u32) -> &'s str {
        self.source.get(start as usize..end as usize).unwrap_or("")
    }

    fn finish(
        mut self,
        nodes: NodeCollector<'_>,
        path: &str,
        primitive_packages: &[String],
    ) -> ModuleFacts {
        for def in &mut self.defs {
            def.exported |= !self.has_exports || self.exported.contains(&def.name);
            for (at, tag) in &nodes.jsx_tags {
                if def.contains(*at) && !def.jsx_tags.contains(tag) {
                    def.jsx_tags.push(tag.clone());
                }
            }
            for (at, name) in &nodes.references {
                if def.contains(*at) {
                    def.references.insert(name.clone());
                }
            }
        }

        ModuleFacts {
            path: path.to_string(),
            components: self.defs,
            variant_tables: self.tables,
            imports: self.imports,
            primitive_packages: primitive_packages.to_vec(),
            interfaces: nodes.interfaces,
            aliases: nodes.aliases,
            type_literals: nodes.type_literals,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Whole-tree visitor
// ═══════════════════════════════════════════════════════════════════════

struct NodeCollector<'s> {
    source: &'s str,
    jsx_tags: Vec<(u32, String)>,
    references: Vec<(u32, String)>,
    interfaces: HashMap<String, InterfaceDecl>,
    aliases: HashMap<String, TypeText>,
    type_literals: HashMap<u32, Vec<ExtractedProp>>,
}

impl<'s> NodeCollector<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            jsx_tags: Vec::new(),
            references: Vec::new(),
            interfaces: HashMap::new(),
            aliases: HashMap::new(),
            type_literals: HashMap::new(),
        }
    }
}

impl<'a, 's> Visit<'a> for NodeCollector<'s> {
    fn visit_jsx_opening_element(&mut self, element: &JSXOpeningElement<'a>) {
        let name = slice(self.source, element.name.span()).to_string();
        self.jsx_tags.push((element.span.start, name));
        walk::walk_jsx_opening_element(self, element);
    }

    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.references.push((ident.span.start, ident.name.to_string()));
    }

    fn visit_ts_type_literal(&mut self, literal: &TSTypeLiteral<'a>) {
        self.type_literals
            .insert(literal.span.start, signature_props(self.source, &literal.members));
        walk::walk_ts_type_literal(self, literal);
    }

    fn visit_ts_interface_declaration(&mut self, decl: &TSInterfaceDeclaration<'a>) {
        let header_start = decl.id.span.end as usize;
        let header = self
            .source
            .get(header_start..decl.body.span.start as usize)
            .unwrap_or("");
        let extends = match header.find("extends") {
            Some(pos) => {
                let list = &header[pos + "extends".len()..];
                split_top_level(list, b',')
                    .into_iter()
                    .map(|part| TypeText {
                        start: header_start + offset_in(header, part),
                        text: part.to_string(),
                    })
                    .collect()
            }
            None => Vec::new(),
        };
        self.interfaces.insert(
            decl.id.name.to_string(),
            InterfaceDecl {
                extends,
                members: signature_props(self.source, &decl.body.body),
            },
        );
        walk::walk_ts_interface_declaration(self, decl);
    }

    fn visit_ts_type_alias_declaration(&mut self, decl: &TSTypeAliasDeclaration<'a>) {
        let span = decl.type_annotation.span();
        self.aliases.insert(
            decl.id.name.to_string(),
            TypeText {
                start: span.start as usize,
                text: slice(self.source, span).to_string(),
            },
        );
        walk::walk_ts_type_alias_declaration(self, decl);
    }
}

fn signature_props(source: &str, members: &[TSSignature<'_>]) -> Vec<ExtractedProp> {
    members
        .iter()
        .filter_map(|sig| {
            let (mut prop, at) = match sig {
                TSSignature::TSPropertySignature(p) => {
                    let type_name = p
                        .type_annotation
                        .as_ref()
                        .map(|a| collapse_whitespace(slice(source, a.type_annotation.span())))
                        .unwrap_or_else(|| "any".to_string());
                    let name = unquote(slice(source, p.key.span()));
                    (ExtractedProp::new(name, type_name, !p.optional), p.span.start)
                }
                TSSignature::TSMethodSignature(m) => {
                    let name = unquote(slice(source, m.key.span()));
                    let rest = source
                        .get(m.key.span().end as usize..m.span.end as usize)
                        .unwrap_or("")
                        .trim_start()
                        .trim_start_matches('?');
                    (ExtractedProp::new(name, method_type(rest), !m.optional), m.span.start)
                }
                _ => return None,
            };
            prop.values = literal_union_values(&prop.type_name);
            if let Some(doc) = leading_doc(source, at as usize) {
                prop.default_value = doc
                    .tag("default")
                    .or_else(|| doc.tag("defaultValue"))
                    .filter(|v| !v.is_empty())
                    .map(unquote);
                prop.description = doc.text;
            }
            Some(prop)
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Queries
// ═══════════════════════════════════════════════════════════════════════

impl ModuleFacts {
    pub fn component(&self, name: &str) -> Option<&ComponentDef> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn exported_components(&self) -> impl Iterator<Item = &ComponentDef> {
        self.components.iter().filter(|c| c.exported)
    }

    /// Props of `name`: its parameter annotation, else the `forwardRef`
    /// props generic, else a `<Name>Props` declaration, else the
    /// destructured parameter names typed `unknown`.
    pub fn props_of(&self, name: &str) -> Vec<ExtractedProp> {
        let Some(def) = self.component(name) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut props = match &def.props_type {
            Some(ty) => self.resolve_type(&ty.text, ty.start, 0, &mut seen),
            None => Vec::new(),
        };
        if props.is_empty() && def.props_type.is_none() {
            props = self.resolve_named(&format!("{}Props", name), 0, &mut seen);
        }
        if props.is_empty() {
            props = def
                .destructured
                .iter()
                .map(|d| ExtractedProp::new(d.name.clone(), "unknown", false))
                .collect();
        }

        let mut props = dedupe_props(props);
        for prop in &mut props {
            let default = def
                .destructured
                .iter()
                .find(|d| d.name == prop.name)
                .and_then(|d| d.default_value.clone());
            if prop.default_value.is_none() && default.is_some() {
                prop.default_value = default;
                prop.required = false;
            }
        }
        props
    }

    /// Variant tables referenced from inside `def`, or via its props type.
    pub fn variants_of(&self, def: &ComponentDef) -> Vec<&VariantTable> {
        let typed = def
            .props_type
            .as_ref()
            .map(|t| t.text.as_str())
            .unwrap_or("");
        self.variant_tables
            .iter()
            .filter(|t| def.references.contains(&t.name) || typed.contains(t.name.as_str()))
            .collect()
    }

    /// Local names imported from primitive packages.
    pub fn primitive_bindings(&self) -> HashSet<&str> {
        self.imports
            .iter()
            .filter(|i| !i.type_only && self.is_primitive_package(&i.source))
            .flat_map(|i| i.locals.iter().map(|l| l.as_str()))
            .collect()
    }

    /// The primitive member a component aliases or renders, preferring the
    /// one whose name matches the component's own suffix.
    pub fn primitive_of(&self, def: &ComponentDef) -> Option<String> {
        let bindings = self.primitive_bindings();
        let is_primitive = |tag: &str| {
            tag.split('.')
                .next()
                .is_some_and(|head| bindings.contains(head))
        };

        if let Some(alias) = def.alias_of.as_deref().filter(|a| is_primitive(*a)) {
            return Some(alias.to_string());
        }

        let candidates: Vec<&String> = def
            .jsx_tags
            .iter()
            .filter(|t| is_primitive(t.as_str()))
            .collect();
        candidates
            .iter()
            .find(|t| def.name.ends_with(trailing_segment(t)))
            .or_else(|| candidates.first())
            .map(|t| t.to_string())
    }

    pub fn is_primitive_package(&self, source: &str) -> bool {
        self.primitive_packages.iter().any(|prefix| {
            source == prefix.trim_end_matches('/')
                || source.starts_with(prefix.as_str())
                || source.starts_with(&format!("{}/", prefix.trim_end_matches('/')))
        })
    }

    /// npm packages, internal component imports, and primitive packages.
    pub fn dependencies(&self) -> Dependencies {
        let mut npm = BTreeSet::new();
        let mut internal = BTreeSet::new();
        let mut primitives = BTreeSet::new();

        for import in self.imports.iter().filter(|i| !i.type_only) {
            if is_local_specifier(&import.source) {
                internal.extend(import.locals.iter().filter(|l| is_pascal_case(l)).cloned());
                continue;
            }
            let Some(package) = package_name(&import.source) else {
                continue;
            };
            if self.is_primitive_package(&import.source) {
                primitives.insert(package.clone());
            }
            npm.insert(package);
        }

        Dependencies {
            npm: npm.into_iter().collect(),
            internal: internal.into_iter().collect(),
            primitives: primitives.into_iter().collect(),
        }
    }

    fn resolve_named(&self, name: &str, depth: usize, seen: &mut HashSet<String>) -> Vec<ExtractedProp> {
        if depth > MAX_TYPE_DEPTH || !seen.insert(name.to_string()) {
            return Vec::new();
        }
        let props = if let Some(iface) = self.interfaces.get(name) {
            let mut props: Vec<ExtractedProp> = iface
                .extends
                .iter()
                .flat_map(|base| self.resolve_type(&base.text, base.start, depth + 1, seen))
                .collect();
            props.extend(iface.members.iter().cloned());
            props
        } else if let Some(alias) = self.aliases.get(name) {
            self.resolve_type(&alias.text, alias.start, depth + 1, seen)
        } else {
            Vec::new()
        };
        seen.remove(name);
        props
    }

    fn resolve_type(
        &self,
        text: &str,
        start: usize,
        depth: usize,
        seen: &mut HashSet<String>,
    ) -> Vec<ExtractedProp> {
        if depth > MAX_TYPE_DEPTH {
            return Vec::new();
        }
        let trimmed = text.trim().trim_start_matches(['|', '&']).trim_start();
        let start = start + offset_in(text, trimmed);

        let branches = split_top_level(trimmed, b'|');
        if branches.len() > 1 {
            return branches
                .into_iter()
                .flat_map(|b| self.resolve_type(b, start + offset_in(trimmed, b), depth + 1, seen))
                .map(|mut p| {
                    p.required = false;
                    p
                })
                .collect();
        }

        let mut props = Vec::new();
        for part in split_top_level(trimmed, b'&') {
            let lead = part.len() - part.trim_start().len();
            let at = start + offset_in(trimmed, part) + lead;
            props.extend(self.resolve_part(part.trim(), at, depth, seen));
        }
        props
    }

    fn resolve_part(
        &self,
        part: &str,
        at: usize,
        depth: usize,
        seen: &mut HashSet<String>,
    ) -> Vec<ExtractedProp> {
        if part.starts_with('{') {
            return self
                .type_literals
                .get(&(at as u32))
                .cloned()
                .unwrap_or_default();
        }
        if part.starts_with('(') && part.ends_with(')') {
            return self.resolve_type(&part[1..part.len() - 1], at + 1, depth + 1, seen);
        }
        if let Some(table) = VARIANT_PROPS_RE
            .captures(part)
            .and_then(|c| c.get(1))
            .and_then(|m| self.variant_tables.iter().find(|t| t.name == m.as_str()))
        {
            return table.variants.iter().map(variant_prop).collect();
        }
        if let Some(utility) = UTILITY_RE.captures(part).and_then(|c| c.get(1)) {
            return self.resolve_utility(utility.as_str(), part, at, depth, seen);
        }
        match TYPE_REF_RE.captures(part).and_then(|c| c.get(1)) {
            Some(name) => self.resolve_named(name.as_str(), depth + 1, seen),
            None => Vec::new(),
        }
    }

    fn resolve_utility(
        &self,
        utility: &str,
        part: &str,
        at: usize,
        depth: usize,
        seen: &mut HashSet<String>,
    ) -> Vec<ExtractedProp> {
        let Some(args) = generic_args(&part[utility.len()..], at + utility.len()) else {
            return Vec::new();
        };
        let Some(target) = args.first() else {
            return Vec::new();
        };
        let props = self.resolve_type(&target.text, target.start, depth + 1, seen);
        let keys: Option<HashSet<String>> = args
            .get(1)
            .and_then(|k| literal_union_values(&k.text))
            .map(|v| v.into_iter().collect());

        match (utility, keys) {
            ("Partial", _) => props
                .into_iter()
                .map(|mut p| {
                    p.required = false;
                    p
                })
                .collect(),
            ("Omit", Some(keys)) => props.into_iter().filter(|p| !keys.contains(&p.name)).collect(),
            ("Pick", Some(keys)) => props.into_iter().filter(|p| keys.contains(&p.name)).collect(),
            _ => props,
        }
    }
}

fn variant_prop(variant: &ExtractedVariant) -> ExtractedProp {
    let is_boolean = variant
        .values
        .iter()
        .all(|v| v == "true" || v == "false");
    let type_name = if is_boolean {
        "boolean".to_string()
    } else {
        variant
            .values
            .iter()
            .map(|v| format!("\"{}\"", v))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    let mut prop = ExtractedProp::new(variant.name.clone(), type_name, false);
    prop.values = Some(variant.values.clone());
    prop.default_value = variant.default_value.clone();
    prop
}

// ═══════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════

fn slice(source: &str, span: Span) -> &str {
    source
        .get(span.start as usize..span.end as usize)
        .unwrap_or("")
}

fn offset_in(outer: &str, inner: &str) -> usize {
    (inner.as_ptr() as usize).saturating_sub(outer.as_ptr() as usize)
}

fn unwrap_ts<'b, 'a>(expr: &'b Expression<'a>) -> &'b Expression<'a> {
    match expr {
        Expression::TSAsExpression(e) => unwrap_ts(&e.expression),
        Expression::TSSatisfiesExpression(e) => unwrap_ts(&e.expression),
        Expression::TSNonNullExpression(e) => unwrap_ts(&e.expression),
        Expression::ParenthesizedExpression(e) => unwrap_ts(&e.expression),
        _ => expr,
    }
}

fn is_variant_factory(call: &CallExpression<'_>) -> bool {
    matches!(&call.callee, Expression::Identifier(id) if id.name == "cva" || id.name == "tv")
}

fn object_entries<'b, 'a>(
    source: &str,
    obj: &'b ObjectExpression<'a>,
) -> Vec<(String, &'b Expression<'a>)> {
    obj.properties
        .iter()
        .filter_map(|prop| match prop {
            ObjectPropertyKind::ObjectProperty(p) => {
                Some((unquote(slice(source, p.key.span())), &p.value))
            }
            ObjectPropertyKind::SpreadProperty(_) => None,
        })
        .collect()
}

/// The last JSDoc block directly preceding `pos`, if nothing but
/// whitespace separates them.
fn leading_doc(source: &str, pos: usize) -> Option<DocComment> {
    let before = source.get(..pos)?.trim_end();
    if !before.ends_with("*/") {
        return None;
    }
    let start = before.rfind("/*")?;
    let block = &before[start..];
    if !block.starts_with("/**") {
        return None;
    }
    Some(parse_doc_comment(block))
}

/// Cut a parameter annotation at its default initializer (`= {}`), leaving
/// arrow types (`=>`) intact.
fn strip_initializer(annotation: &str) -> &str {
    let mask = code_mask(annotation);
    let bytes = annotation.as_bytes();
    let mut depth = 0i32;
    for i in 0..bytes.len() {
        if !mask[i] {
            continue;
        }
        match bytes[i] {
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'>' if i > 0 && bytes[i - 1] != b'=' => depth -= 1,
            b'=' if depth == 0 && bytes.get(i + 1) != Some(&b'>') => {
                return annotation[..i].trim_end();
            }
            _ => {}
        }
    }
    annotation.trim_end()
}

/// Arguments of a leading `<...>` in `text` (which starts at `start`).
fn generic_args(text: &str, start: usize) -> Option<Vec<TypeText>> {
    let open = text.find(|c: char| !c.is_whitespace())?;
    if text.as_bytes()[open] != b'<' {
        return None;
    }
    let close = matching_close(text, open)?;
    let inner = &text[open + 1..close];
    Some(
        split_top_level(inner, b',')
            .into_iter()
            .map(|arg| {
                let trimmed = arg.trim();
                TypeText {
                    start: start + offset_in(text, trimmed),
                    text: trimmed.to_string(),
                }
            })
            .filter(|t| !t.text.is_empty())
            .collect(),
    )
}

/// First generic argument of a variable annotation such as
/// `: React.FC<ButtonProps> =`.
fn first_generic_arg(between: &str, start: usize) -> Option<TypeText> {
    let lt = between.find('<')?;
    generic_args(&between[lt..], start + lt)?.into_iter().next()
}

fn method_type(rest: &str) -> String {
    let sig = collapse_whitespace(rest);
    let Some(open) = sig.find('(') else {
        return sig;
    };
    let Some(close) = matching_close(&sig, open) else {
        return sig;
    };
    let params = &sig[open..=close];
    match sig[close + 1..].trim().strip_prefix(':') {
        Some(ret) => format!("{} => {}", params, ret.trim()),
        None => format!("{} => void", params),
    }
}

fn is_local_specifier(source: &str) -> bool {
    source.starts_with('.')
        || source.starts_with('/')
        || source.starts_with("@/")
        || source.starts_with("~/")
        || source.starts_with('#')
}

/// `@scope/pkg/sub` → `@scope/pkg`, `pkg/sub` → `pkg`. Node builtins yield `None`.
fn package_name(source: &str) -> Option<String> {
    if source.starts_with("node:") || source.is_empty() {
        return None;
    }
    let mut segments = source.split('/');
    let first = segments.next()?;
    if first.starts_with('@') {
        let second = segments.next()?;
        Some(format!("{}/{}", first, second))
    } else {
        Some(first.to_string())
    }
}
