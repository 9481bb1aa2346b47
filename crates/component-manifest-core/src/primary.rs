//! Primary structural analyzer.
//!
//! Fast, declaration-driven prop extraction: finds the component's public
//! props declaration (`interface <Name>Props` or `type <Name>Props = ...`)
//! and reads its members lexically, without building a syntax tree.
//!
//! What it reads per member:
//!
//! | Source | Field |
//! |--------|-------|
//! | `name?:` | `required = false` |
//! | type text | `type` (whitespace-collapsed) |
//! | literal union (`"sm" \| "lg"`) | `values` |
//! | JSDoc text | `description` |
//! | JSDoc `@default` | `defaultValue` |
//!
//! Local `extends` clauses and local type references inside intersections
//! are followed; anything imported (e.g. `React.ComponentProps<"button">`)
//! is outside this analyzer's reach and is skipped. Unbalanced delimiters
//! or an unterminated declaration produce a [`Diagnostic`] and no props.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::ExtractedProp;
use crate::syntax::{
    code_mask, collapse_whitespace, find_unbalanced, literal_union_values, matching_close,
    parse_doc_comment, split_top_level, unquote,
};

lazy_static! {
    /// `interface Name` / `type Name` at the start of a line, optionally exported.
    static ref DECL_RE: Regex = Regex::new(
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:declare[ \t]+)?(interface|type)[ \t]+([A-Za-z_$][\w$]*)"
    )
    .unwrap();

    /// A bare (optionally generic) type reference: `BaseProps` or `BaseProps<T>`.
    static ref TYPE_REF_RE: Regex = Regex::new(r"^([A-Za-z_$][\w$]*)\s*(?:<.*>)?$").unwrap();

    /// Member head: optional `readonly`, a name (bare or quoted), optional `?`.
    static ref MEMBER_RE: Regex = Regex::new(
        r#"^(?:readonly\s+)?([A-Za-z_$][\w$]*|"[^"]+"|'[^']+')\s*(\?)?\s*([:(<])"#
    )
    .unwrap();
}

const MAX_REFERENCE_DEPTH: usize = 4;

/// A parse problem the primary analyzer could not get past.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub offset: usize,
    pub message: String,
}

/// Result of one primary analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryOutcome {
    pub props: Vec<ExtractedProp>,
    /// Name of the declaration the props were read from, if one was found.
    pub declaration: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PrimaryOutcome {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclKind {
    Interface,
    TypeAlias,
}

/// Schema-driven props reader. Stateless; one value can serve many calls.
#[derive(Debug, Clone, Default)]
pub struct PrimaryAnalyzer;

impl PrimaryAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Read the props declared for `component_name` in `source`.
    pub fn analyze(&self, source: &str, component_name: &str) -> PrimaryOutcome {
        if let Some((offset, message)) = find_unbalanced(source) {
            return PrimaryOutcome {
                diagnostics: vec![Diagnostic { offset, message }],
                ..Default::default()
            };
        }

        let decls = collect_declarations(source);
        let target = format!("{}Props", component_name);
        if !decls.contains_key(&target) {
            return PrimaryOutcome::default();
        }

        let mut reader = DeclarationReader {
            source,
            decls: &decls,
            visiting: HashSet::new(),
            diagnostics: Vec::new(),
        };
        let props = reader.read(&target, 0, true);

        PrimaryOutcome {
            props: if reader.diagnostics.is_empty() {
                dedupe_props(props)
            } else {
                Vec::new()
            },
            declaration: Some(target),
            diagnostics: reader.diagnostics,
        }
    }
}

/// Name → (kind, offset just past the declared name). Only code matches count.
fn collect_declarations(source: &str) -> HashMap<String, (DeclKind, usize)> {
    let mask = code_mask(source);
    let mut decls = HashMap::new();

    for caps in DECL_RE.captures_iter(source) {
        let (Some(kind), Some(name)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if !mask[kind.start()] {
            continue;
        }
        let kind = if kind.as_str() == "interface" {
            DeclKind::Interface
        } else {
            DeclKind::TypeAlias
        };
        decls
            .entry(name.as_str().to_string())
            .or_insert((kind, name.end()));
    }

    decls
}

struct DeclarationReader<'s> {
    source: &'s str,
    decls: &'s HashMap<String, (DeclKind, usize)>,
    visiting: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'s> DeclarationReader<'s> {
    fn read(&mut self, name: &str, depth: usize, required_ctx: bool) -> Vec<ExtractedProp> {
        if depth > MAX_REFERENCE_DEPTH || !self.visiting.insert(name.to_string()) {
            return Vec::new();
        }
        let Some(&(kind, after_name)) = self.decls.get(name) else {
            return Vec::new();
        };

        let props = match kind {
            DeclKind::Interface => self.read_interface(name, after_name, depth),
            DeclKind::TypeAlias => self.read_alias(name, after_name, depth),
        };
        self.visiting.remove(name);

        props
            .into_iter()
            .map(|mut p| {
                p.required &= required_ctx;
                p
            })
            .collect()
    }

    fn read_interface(&mut self, name: &str, after_name: usize, depth: usize) -> Vec<ExtractedProp> {
        let source = self.source;
        let Some(open) = find_code_byte(source, after_name, b'{') else {
            self.diagnose(after_name, format!("interface {} has no body", name));
            return Vec::new();
        };
        let Some(close) = matching_close(source, open) else {
            self.diagnose(open, format!("interface {} body is not terminated", name));
            return Vec::new();
        };

        let header = &source[after_name..open];
        let mut props = Vec::new();
        if let Some(pos) = header.find("extends") {
            for base in split_top_level(&header[pos + "extends".len()..], b',') {
                props.extend(self.read_reference(base.trim(), depth, true));
            }
        }
        props.extend(read_members(&source[open + 1..close], true));
        props
    }

    fn read_alias(&mut self, name: &str, after_name: usize, depth: usize) -> Vec<ExtractedProp> {
        let source = self.source;
        let Some(eq) = find_code_byte(source, after_name, b'=') else {
            self.diagnose(after_name, format!("type {} has no '='", name));
            return Vec::new();
        };
        let rhs = alias_rhs(source, eq + 1);
        self.read_type_expression(rhs, depth)
    }

    fn read_type_expression(&mut self, text: &str, depth: usize) -> Vec<ExtractedProp> {
        let text = text.trim().trim_start_matches(['|', '&']).trim();

        let union = split_top_level(text, b'|');
        if union.len() > 1 {
            // Members of a union are only guaranteed on every branch when
            // present in all of them; report them all as optional.
            return union
                .iter()
                .flat_map(|branch| self.read_type_expression(branch, depth))
                .map(|mut p| {
                    p.required = false;
                    p
                })
                .collect();
        }

        let mut props = Vec::new();
        for part in split_top_level(text, b'&') {
            let part = part.trim();
            if part.starts_with('{') {
                if let Some(close) = matching_close(part, 0) {
                    props.extend(read_members(&part[1..close], true));
                } else {
                    self.diagnose(0, "unterminated object type".to_string());
                }
            } else if part.starts_with('(') && part.ends_with(')') {
                props.extend(self.read_type_expression(&part[1..part.len() - 1], depth));
            } else {
                props.extend(self.read_reference(part, depth, true));
            }
        }
        props
    }

    fn read_reference(&mut self, text: &str, depth: usize, required: bool) -> Vec<ExtractedProp> {
        match TYPE_REF_RE.captures(text).and_then(|c| c.get(1)) {
            Some(m) if self.decls.contains_key(m.as_str()) => {
                self.read(m.as_str(), depth + 1, required)
            }
            _ => Vec::new(),
        }
    }

    fn diagnose(&mut self, offset: usize, message: String) {
        self.diagnostics.push(Diagnostic { offset, message });
    }
}

fn find_code_byte(source: &str, from: usize, target: u8) -> Option<usize> {
    let mask = code_mask(source);
    let bytes = source.as_bytes();
    let mut angle = 0i32;
    for i in from..bytes.len() {
        if !mask[i] {
            continue;
        }
        match bytes[i] {
            b'<' => angle += 1,
            b'>' if i > 0 && bytes[i - 1] != b'=' => angle -= 1,
            b if b == target && angle <= 0 => return Some(i),
            b';' => return None,
            _ => {}
        }
    }
    None
}

/// Right-hand side of a type alias starting at `from`: up to a depth-zero `;`
/// or a line break that does not continue the type.
fn alias_rhs(source: &str, from: usize) -> &str {
    let mask = code_mask(source);
    let bytes = source.as_bytes();
    let mut depth = 0i32;
    let mut i = from;

    while i < bytes.len() {
        if mask[i] {
            match bytes[i] {
                b'(' | b'[' | b'{' | b'<' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                b'>' if bytes[i - 1] != b'=' => depth -= 1,
                b';' if depth <= 0 => return &source[from..i],
                b'\n' if depth <= 0 => {
                    let before = source[from..i].trim_end();
                    let after = source[i..].trim_start();
                    let continues = before.is_empty()
                        || before.ends_with(['|', '&', '='])
                        || after.starts_with(['|', '&']);
                    if !continues {
                        return &source[from..i];
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    &source[from..]
}

/// Read the members of an object type body (text between the braces).
fn read_members(body: &str, required_ctx: bool) -> Vec<ExtractedProp> {
    member_segments(body)
        .into_iter()
        .filter_map(|segment| parse_member(segment, required_ctx))
        .collect()
}

/// Split an object type body into member segments, each including its
/// leading comments.
fn member_segments(body: &str) -> Vec<&str> {
    let mask = code_mask(body);
    let bytes = body.as_bytes();
    let mut segments = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for i in 0..bytes.len() {
        if !mask[i] {
            continue;
        }
        match bytes[i] {
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'>' if i > 0 && bytes[i - 1] != b'=' => depth -= 1,
            b';' | b',' if depth == 0 => {
                segments.push(&body[start..i]);
                start = i + 1;
            }
            b'\n' if depth == 0 => {
                let code = strip_leading_comments(&body[start..i]).trim();
                let rest = body[i..].trim_start();
                let complete = !code.is_empty()
                    && (code.contains(':') || code.contains('('))
                    && !code.ends_with(['|', '&', ':', ','])
                    && !code.ends_with("=>")
                    && !rest.starts_with(['|', '&']);
                if complete {
                    segments.push(&body[start..i]);
                    start = i + 1;
                }
            }
            _ => {}
        }
    }
    segments.push(&body[start..]);
    segments
}

/// Drop leading whitespace and comments, returning the code that follows.
fn strip_leading_comments(segment: &str) -> &str {
    let (_, code) = split_leading_docs(segment);
    code
}

/// Separate leading comments from member code. Returns the last JSDoc block
/// (if any) and the remaining code.
fn split_leading_docs(segment: &str) -> (Option<&str>, &str) {
    let mut rest = segment.trim_start();
    let mut doc = None;

    loop {
        if rest.starts_with("/*") {
            match rest.find("*/") {
                Some(end) => {
                    if rest.starts_with("/**") {
                        doc = Some(&rest[..end + 2]);
                    }
                    rest = rest[end + 2..].trim_start();
                }
                None => return (doc, ""),
            }
        } else if rest.starts_with("//") {
            rest = match rest.find('\n') {
                Some(nl) => rest[nl + 1..].trim_start(),
                None => "",
            };
        } else {
            return (doc, rest);
        }
    }
}

fn parse_member(segment: &str, required_ctx: bool) -> Option<ExtractedProp> {
    let (doc, code) = split_leading_docs(segment);
    let code = code.trim();
    if code.is_empty() {
        return None;
    }

    let caps = MEMBER_RE.captures(code)?;
    let raw_name = caps.get(1)?.as_str();
    let optional = caps.get(2).is_some();
    let marker = caps.get(3)?;

    let type_name = if marker.as_str() == ":" {
        collapse_whitespace(&code[marker.end()..])
    } else {
        // Method signature: `onChange(value: string): void` → `(value: string) => void`.
        method_type(&code[marker.start()..])
    };
    if type_name.is_empty() {
        return None;
    }

    let mut prop = ExtractedProp::new(unquote(raw_name), type_name, !optional && required_ctx);
    prop.values = literal_union_values(&prop.type_name);

    if let Some(doc) = doc.map(parse_doc_comment) {
        prop.default_value = doc
            .tag("default")
            .or_else(|| doc.tag("defaultValue"))
            .filter(|v| !v.is_empty())
            .map(unquote);
        prop.description = doc.text;
    }

    Some(prop)
}

fn method_type(signature: &str) -> String {
    let sig = collapse_whitespace(signature);
    let start = sig.find('(').unwrap_or(0);
    let Some(close) = matching_close(&sig, start) else {
        return sig;
    };
    let params = &sig[start..=close];
    let ret = sig[close + 1..].trim().trim_start_matches(':').trim();
    if ret.is_empty() {
        format!("{} => void", params)
    } else {
        format!("{} => {}", params, ret)
    }
}

/// Keep the last declaration of each prop name (overrides from a derived
/// interface win over its base), in first-seen order.
pub(crate) fn dedupe_props(props: Vec<ExtractedProp>) -> Vec<ExtractedProp> {
    let mut order: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, ExtractedProp> = HashMap::new();
    for prop in props {
        if !by_name.contains_key(&prop.name) {
            order.push(prop.name.clone());
        }
        by_name.insert(prop.name.clone(), prop);
    }
    order
        .into_iter()
        .filter_map(|name| by_name.remove(&name))
        .collect()
}
