//! Text-level helpers shared by the primary and fallback analyzers.
//!
//! Both analyzers eventually deal with TypeScript type *text* (a prop's
//! declared type is reported as written), so splitting unions and
//! intersections, reading literal domains, and cleaning JSDoc blocks all
//! live here and operate on `&str`.

/// Marks which bytes of `text` are code, as opposed to string, template
/// literal, or comment content. Delimiters of strings/comments are not code.
pub fn code_mask(text: &str) -> Vec<bool> {
    let bytes = text.as_bytes();
    let mut mask = vec![true; bytes.len()];
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    mask[i] = false;
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                mask[i] = false;
                mask[i + 1] = false;
                i += 2;
                while i < bytes.len() {
                    mask[i] = false;
                    if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        mask[i + 1] = false;
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            quote @ (b'"' | b'\'' | b'`') => {
                mask[i] = false;
                i += 1;
                while i < bytes.len() {
                    mask[i] = false;
                    if bytes[i] == b'\\' {
                        if i + 1 < bytes.len() {
                            mask[i + 1] = false;
                        }
                        i += 2;
                        continue;
                    }
                    if bytes[i] == quote {
                        i += 1;
                        break;
                    }
                    // Plain quotes never span lines; an unterminated one stops here.
                    if quote != b'`' && bytes[i] == b'\n' {
                        mask[i] = true;
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    mask
}

/// First unbalanced `(`, `[`, `{` or stray closer, as a byte offset and message.
pub fn find_unbalanced(text: &str) -> Option<(usize, String)> {
    let mask = code_mask(text);
    let mut stack: Vec<(u8, usize)> = Vec::new();

    for (i, &b) in text.as_bytes().iter().enumerate() {
        if !mask[i] {
            continue;
        }
        match b {
            b'(' | b'[' | b'{' => stack.push((b, i)),
            b')' | b']' | b'}' => {
                let expected = match b {
                    b')' => b'(',
                    b']' => b'[',
                    _ => b'{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, at)) => {
                        return Some((
                            i,
                            format!(
                                "mismatched '{}' closing '{}' opened at offset {}",
                                b as char, open as char, at
                            ),
                        ))
                    }
                    None => return Some((i, format!("unexpected '{}'", b as char))),
                }
            }
            _ => {}
        }
    }

    stack
        .pop()
        .map(|(open, at)| (at, format!("unclosed '{}'", open as char)))
}

/// Offset of the delimiter closing the one opened at `open_at`, if any.
pub fn matching_close(text: &str, open_at: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let open = *bytes.get(open_at)?;
    let close = match open {
        b'(' => b')',
        b'[' => b']',
        b'{' => b'}',
        b'<' => b'>',
        _ => return None,
    };
    let mask = code_mask(text);
    let mut depth = 0usize;
    for i in open_at..bytes.len() {
        if !mask[i] {
            continue;
        }
        if bytes[i] == open {
            depth += 1;
        } else if bytes[i] == close && !(close == b'>' && i > 0 && bytes[i - 1] == b'=') {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split `text` on `sep` occurring at nesting depth zero.
///
/// Angle brackets count as nesting (generics), except the `>` of `=>`.
pub fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mask = code_mask(text);
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if !mask[i] {
            continue;
        }
        match b {
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'>' if i > 0 && bytes[i - 1] != b'=' => depth -= 1,
            _ if b == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Values of a literal union type such as `"sm" | "md" | 'lg'` or `1 | 2`.
///
/// `undefined` and `null` members are ignored. Returns `None` when any other
/// member is not a literal or no literal is present.
pub fn literal_union_values(type_text: &str) -> Option<Vec<String>> {
    let mut values = Vec::new();

    for part in split_top_level(type_text.trim(), b'|') {
        let part = part.trim();
        if part.is_empty() || part == "undefined" || part == "null" {
            continue;
        }
        values.push(literal_value(part)?);
    }

    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn literal_value(part: &str) -> Option<String> {
    let first = part.chars().next()?;
    if (first == '"' || first == '\'' || first == '`') && part.len() >= 2 && part.ends_with(first)
    {
        return Some(part[1..part.len() - 1].to_string());
    }
    if part.parse::<f64>().is_ok() {
        return Some(part.to_string());
    }
    None
}

/// Strip matching quotes from a string literal's source text.
pub fn unquote(text: &str) -> String {
    let t = text.trim();
    literal_value(t)
        .filter(|_| t.starts_with(['"', '\'', '`']))
        .unwrap_or_else(|| t.to_string())
}

/// Collapse runs of whitespace (including newlines) to single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A cleaned JSDoc block: free text plus `@tag value` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    pub text: Option<String>,
    pub tags: Vec<(String, String)>,
}

impl DocComment {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(t, _)| t == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a `/** ... */` block (delimiters optional) into text and tags.
pub fn parse_doc_comment(raw: &str) -> DocComment {
    let body = raw
        .trim()
        .trim_start_matches("/**")
        .trim_start_matches("/*")
        .trim_end_matches("*/");

    let mut text_lines: Vec<String> = Vec::new();
    let mut tags: Vec<(String, String)> = Vec::new();

    for line in body.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        if let Some(rest) = line.strip_prefix('@') {
            let (tag, value) = match rest.find(char::is_whitespace) {
                Some(pos) => (&rest[..pos], rest[pos..].trim()),
                None => (rest, ""),
            };
            tags.push((tag.to_string(), value.to_string()));
        } else if let Some((_, value)) = tags.last_mut() {
            // Continuation of a multi-line tag.
            if !line.is_empty() {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(line);
            }
        } else {
            text_lines.push(line.to_string());
        }
    }

    let text = collapse_whitespace(&text_lines.join(" "));
    DocComment {
        text: if text.is_empty() { None } else { Some(text) },
        tags,
    }
}

/// True when `text` contains nothing but whitespace and comments.
pub fn is_blank_code(text: &str) -> bool {
    let mask = code_mask(text);
    text.bytes()
        .enumerate()
        .all(|(i, b)| !mask[i] || b.is_ascii_whitespace())
}

/// True for identifiers that look like components (`Button`, `DialogTitle`).
pub fn is_pascal_case(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Last segment of a dotted name: `DialogPrimitive.Trigger` → `Trigger`.
pub fn trailing_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_respects_nesting() {
        let parts = split_top_level("A & B<C & D> & { x: E & F }", b'&');
        let parts: Vec<&str> = parts.iter().map(|p| p.trim()).collect();
        assert_eq!(parts, vec!["A", "B<C & D>", "{ x: E & F }"]);
    }

    #[test]
    fn test_split_ignores_arrow() {
        let parts = split_top_level("(a: string) => void | null", b'|');
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_literal_union() {
        assert_eq!(
            literal_union_values(r#""sm" | 'md' | "lg" | undefined"#),
            Some(vec!["sm".to_string(), "md".to_string(), "lg".to_string()])
        );
        assert_eq!(
            literal_union_values("1 | 2"),
            Some(vec!["1".to_string(), "2".to_string()])
        );
        assert_eq!(literal_union_values("string"), None);
        assert_eq!(literal_union_values(r#""a" | string"#), None);
    }

    #[test]
    fn test_unbalanced_detection() {
        assert!(find_unbalanced("function A() { return (1); }").is_none());
        assert!(find_unbalanced("const s = '{'; // }").is_none());
        assert!(find_unbalanced("interface P { a: string;").is_some());
        assert!(find_unbalanced("a)").is_some());
    }

    #[test]
    fn test_matching_close() {
        let text = "{ a: { b: '}' } }";
        assert_eq!(matching_close(text, 0), Some(text.len() - 1));
    }

    #[test]
    fn test_doc_comment() {
        let doc = parse_doc_comment(
            "/**\n * The visual style.\n * Second line.\n * @default \"primary\"\n */",
        );
        assert_eq!(doc.text.as_deref(), Some("The visual style. Second line."));
        assert_eq!(doc.tag("default"), Some("\"primary\""));
    }

    #[test]
    fn test_blank_code() {
        assert!(is_blank_code("  // nothing\n/* here */\n"));
        assert!(!is_blank_code("// x\nexport {}"));
    }

    #[test]
    fn test_trailing_segment() {
        assert_eq!(trailing_segment("DialogPrimitive.Trigger"), "Trigger");
        assert_eq!(trailing_segment("Trigger"), "Trigger");
    }
}
