//! Component file discovery for batch runs.
//!
//! Walks `[components].root`, keeps files matching `include_globs` and not
//! matching `exclude_globs`, and pairs each component with a sibling
//! stories file (`button.stories.tsx` next to `button.tsx`). Story files
//! and test files are never components themselves.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use component_manifest_core::identity::to_pascal_case;
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::ComponentsConfig;

/// One discovered component source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentFile {
    /// Component name derived from the file stem (`alert-dialog` → `AlertDialog`).
    pub name: String,
    pub path: PathBuf,
    /// Path relative to the discovery root, `/`-separated.
    pub relative: String,
    pub stories: Option<PathBuf>,
}

const STORY_MARKERS: &[&str] = &[".stories.", ".story.", ".test.", ".spec."];

pub fn discover_components(config: &ComponentsConfig) -> Result<Vec<ComponentFile>> {
    let root = &config.root;
    if !root.exists() {
        bail!("components root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/dist/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut found = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if STORY_MARKERS.iter().any(|m| file_name.contains(m)) {
            continue;
        }
        let Some(name) = component_name(path) else {
            continue;
        };

        found.push(ComponentFile {
            name,
            stories: sibling_stories(path),
            path: path.to_path_buf(),
            relative: rel_str,
        });
    }

    found.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(found)
}

/// Component name for a source path, from its file stem.
pub fn component_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let stem = if stem == "index" {
        path.parent()?.file_name()?.to_str()?
    } else {
        stem
    };
    let name = to_pascal_case(stem);
    (!name.is_empty()).then_some(name)
}

fn sibling_stories(path: &Path) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    let candidate = path.with_file_name(format!("{}.stories.{}", stem, ext));
    candidate.is_file().then_some(candidate)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(root: &Path) -> ComponentsConfig {
        ComponentsConfig {
            root: root.to_path_buf(),
            include_globs: vec!["**/*.tsx".to_string()],
            exclude_globs: vec!["**/internal/**".to_string()],
            follow_symlinks: false,
        }
    }

    #[test]
    fn test_discovers_components_and_pairs_stories() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("ui/internal")).unwrap();
        fs::create_dir_all(root.join("ui/card")).unwrap();
        fs::write(root.join("ui/alert-dialog.tsx"), "").unwrap();
        fs::write(root.join("ui/button.tsx"), "").unwrap();
        fs::write(root.join("ui/button.stories.tsx"), "").unwrap();
        fs::write(root.join("ui/button.test.tsx"), "").unwrap();
        fs::write(root.join("ui/card/index.tsx"), "").unwrap();
        fs::write(root.join("ui/internal/slot.tsx"), "").unwrap();
        fs::write(root.join("ui/readme.md"), "").unwrap();

        let found = discover_components(&config(root)).unwrap();
        let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["AlertDialog", "Button", "Card"]);

        let button = &found[1];
        assert_eq!(button.relative, "ui/button.tsx");
        assert_eq!(button.stories, Some(root.join("ui/button.stories.tsx")));
        assert!(found[0].stories.is_none());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(discover_components(&config(&tmp.path().join("nope"))).is_err());
    }
}
