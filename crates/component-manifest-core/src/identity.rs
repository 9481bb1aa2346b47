//! Component identity, slugs, and source hashing.
//!
//! A component's `id` is a v4 UUID assigned at first extraction and reused
//! on every later extraction when the caller passes it back. The `slug`
//! is derived (`name-framework-id8`) and therefore changes only when one
//! of its inputs changes.
//!
//! Source hashes are SHA-256 over line-ending-normalized text, so a file
//! re-saved with CRLF endings hashes the same as its LF original.
//!
//! # Example
//!
//! ```rust
//! use component_manifest_core::identity::{source_hash, to_kebab_case};
//!
//! assert_eq!(to_kebab_case("AlertDialog"), "alert-dialog");
//! assert_eq!(source_hash("a\r\nb", None), source_hash("a\nb", None));
//! ```

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::ComponentIdentity;

impl ComponentIdentity {
    /// Create an identity, reusing `existing_id` when supplied.
    pub fn resolve(name: &str, framework: &str, existing_id: Option<Uuid>) -> Self {
        let id = existing_id.unwrap_or_else(Uuid::new_v4);
        Self {
            id,
            slug: make_slug(name, framework, &id),
            name: name.to_string(),
            framework: framework.to_string(),
        }
    }

    /// Re-derive the slug after a rename. The `id` is never touched.
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            id: self.id,
            slug: make_slug(name, &self.framework, &self.id),
            name: name.to_string(),
            framework: self.framework.clone(),
        }
    }
}

/// `name-framework-id8`, all kebab-case.
pub fn make_slug(name: &str, framework: &str, id: &Uuid) -> String {
    let simple = id.simple().to_string();
    format!(
        "{}-{}-{}",
        to_kebab_case(name),
        to_kebab_case(framework),
        &simple[..8]
    )
}

/// Convert `PascalCase`, `camelCase`, `snake_case`, or spaced names to kebab-case.
///
/// Acronym runs stay together: `HTMLInput` → `html-input`.
pub fn to_kebab_case(name: &str) -> String {
    let chars: Vec<char> = name.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars
                    .get(i + 1)
                    .map(|n| n.is_ascii_lowercase())
                    .unwrap_or(false);
                let boundary = prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_is_lower);
                if boundary && !out.ends_with('-') {
                    out.push('-');
                }
            }
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }

    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Convert a kebab/snake file stem (`alert-dialog`) to `PascalCase` (`AlertDialog`).
pub fn to_pascal_case(stem: &str) -> String {
    stem.split(|c: char| c == '-' || c == '_' || c == ' ' || c == '.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Replace `\r\n` and lone `\r` with `\n`.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// SHA-256 content hash of a component source (and optional stories source).
pub fn source_hash(source: &str, stories: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_line_endings(source).as_bytes());
    if let Some(stories) = stories {
        hasher.update([0u8]);
        hasher.update(normalize_line_endings(stories).as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kebab_case() {
        assert_eq!(to_kebab_case("Button"), "button");
        assert_eq!(to_kebab_case("AlertDialog"), "alert-dialog");
        assert_eq!(to_kebab_case("HTMLInput"), "html-input");
        assert_eq!(to_kebab_case("my component"), "my-component");
        assert_eq!(to_kebab_case("already-kebab"), "already-kebab");
        assert_eq!(to_kebab_case("snake_case_name"), "snake-case-name");
        assert_eq!(to_kebab_case("Input2Fa"), "input2-fa");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(to_pascal_case("alert-dialog"), "AlertDialog");
        assert_eq!(to_pascal_case("button"), "Button");
        assert_eq!(to_pascal_case("dropdown_menu"), "DropdownMenu");
    }

    #[test]
    fn test_slug_shape() {
        let id = Uuid::parse_str("0f8fad5b-d9cb-469f-a165-70867728950e").unwrap();
        assert_eq!(make_slug("AlertDialog", "react", &id), "alert-dialog-react-0f8fad5b");
    }

    #[test]
    fn test_identity_reuses_existing_id() {
        let first = ComponentIdentity::resolve("Button", "react", None);
        let again = ComponentIdentity::resolve("Button", "react", Some(first.id));
        assert_eq!(first, again);
    }

    #[test]
    fn test_rename_keeps_id() {
        let first = ComponentIdentity::resolve("Button", "react", None);
        let renamed = first.renamed("IconButton");
        assert_eq!(renamed.id, first.id);
        assert!(renamed.slug.starts_with("icon-button-react-"));
    }

    #[test]
    fn test_hash_ignores_line_endings() {
        let lf = "export function A() {\n  return null;\n}\n";
        let crlf = "export function A() {\r\n  return null;\r\n}\r\n";
        assert_eq!(source_hash(lf, None), source_hash(crlf, None));
        assert_ne!(source_hash(lf, None), source_hash(lf, Some("")));
    }
}
