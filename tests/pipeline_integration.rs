use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use component_manifest::checkpoint::CheckpointStore;
use component_manifest::error::FailureKind;
use component_manifest::pipeline::{Pipeline, RunOptions};
use component_manifest::state_fs::FileStateStore;
use component_manifest_core::error::GenerationError;
use component_manifest_core::extract::{ExtractionInput, HybridExtractor};
use component_manifest_core::generation::{CompletionProvider, CompletionRequest};
use component_manifest_core::models::Manifest;
use component_manifest_core::store::Phase;
use component_manifest_core::store::StateStore;
use serde_json::{json, Value};
use tempfile::TempDir;

const BUTTON: &str = r#"
import { cva, type VariantProps } from "class-variance-authority"
import { Slot } from "@radix-ui/react-slot"

const buttonVariants = cva("btn", {
  variants: {
    variant: { default: "bg", ghost: "ghost" },
    size: { sm: "h-8", lg: "h-10" },
  },
  defaultVariants: { variant: "default", size: "sm" },
})

export interface ButtonProps {
  /** Render as the child element. */
  asChild?: boolean
  variant?: "default" | "ghost"
  size?: "sm" | "lg"
  onClick?: () => void
  children?: React.ReactNode
}

/** Clickable button. */
export function Button({ asChild = false, ...props }: ButtonProps) {
  const Comp = asChild ? Slot : "button"
  return <Comp className={buttonVariants(props)} {...props} />
}
"#;

const BUTTON_STORIES: &str = r#"
import { Button } from "./button"

export default { title: "Button", component: Button }

export const Primary = { args: { variant: "default" } }
export const Ghost = () => <Button variant="ghost">Ghost</Button>
"#;

/// Returns canned metadata and counts calls.
struct Scripted {
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl Scripted {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl CompletionProvider for Scripted {
    fn provider_name(&self) -> &str {
        "scripted"
    }
    fn model_name(&self) -> &str {
        "scripted-1"
    }
    async fn complete(&self, request: &CompletionRequest) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        assert!(request.prompt.contains("Button"));
        Ok(json!({
            "description": "A clickable button.",
            "semanticDescription": "Triggers an action when pressed.",
            "whenToUse": "Submitting forms or confirming dialogs.",
            "whenNotToUse": "Navigating between pages; use a link.",
            "patterns": ["primary action", "icon button"],
            "relatedComponents": ["Card", "Ghost", "Link"],
            "variantDescriptions": { "variant": { "ghost": "No background." } }
        }))
    }
}

fn input(source: &str) -> ExtractionInput {
    ExtractionInput {
        org_id: "org".to_string(),
        name: "Button".to_string(),
        source_code: source.to_string(),
        file_path: Some("ui/button.tsx".to_string()),
        framework: "react".to_string(),
        stories_code: Some(BUTTON_STORIES.to_string()),
        stories_file_path: Some("ui/button.stories.tsx".to_string()),
        ..Default::default()
    }
}

fn pipeline(dir: &TempDir, provider: Arc<dyn CompletionProvider>, timeout: Duration) -> Pipeline {
    let store = CheckpointStore::new(Arc::new(FileStateStore::new(dir.path())));
    Pipeline::new(HybridExtractor::default(), provider, timeout).with_checkpoints(store)
}

fn without_build_time(mut manifest: Manifest) -> Manifest {
    manifest.built_at = Utc.timestamp_opt(0, 0).unwrap();
    manifest
}

#[tokio::test]
async fn test_extraction_checkpoint_round_trip_and_delete() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(Arc::new(FileStateStore::new(dir.path())));
    let p = pipeline(&dir, Arc::new(Scripted::new()), Duration::from_secs(5));

    let extracted = p.extract(&input(BUTTON)).await.unwrap();
    assert!(dir.path().join("button.extraction.json").is_file());

    let saved = store.get_extraction("Button").await.unwrap().unwrap();
    assert_eq!(saved.data, extracted);
    assert_eq!(saved.component_name, "Button");

    store.delete("Button").await.unwrap();
    assert!(store.get_extraction("Button").await.unwrap().is_none());
    assert!(store.get_generation("Button").await.unwrap().is_none());
    assert!(store.get_manifest("Button").await.unwrap().is_none());
}

#[tokio::test]
async fn test_resumed_pipeline_matches_uninterrupted_run() {
    let uninterrupted_dir = TempDir::new().unwrap();
    let resumed_dir = TempDir::new().unwrap();
    let provider: Arc<dyn CompletionProvider> = Arc::new(Scripted::new());
    let options = RunOptions {
        available_components: Some(vec!["Button".to_string(), "Card".to_string()]),
        resume: false,
    };

    let first = pipeline(&uninterrupted_dir, provider.clone(), Duration::from_secs(5));
    let extracted = first.extract(&input(BUTTON)).await.unwrap();
    let generated = first.generate(&extracted).await.unwrap();
    let uninterrupted = first
        .build(&extracted, &generated, options.available_components.as_deref())
        .await
        .unwrap();

    // Extract, then "crash" by dropping the pipeline before Generate.
    let id = {
        let before_crash = pipeline(&resumed_dir, provider.clone(), Duration::from_secs(5));
        let mut extract_input = input(BUTTON);
        extract_input.existing_id = Some(extracted.identity.id);
        before_crash.extract(&extract_input).await.unwrap().identity.id
    };
    assert_eq!(id, extracted.identity.id);

    let after_crash = pipeline(&resumed_dir, provider, Duration::from_secs(5));
    after_crash.generate_from_checkpoint("Button").await.unwrap();
    let resumed = after_crash
        .build_from_checkpoints("Button", options.available_components.as_deref())
        .await
        .unwrap();

    assert_eq!(without_build_time(resumed), without_build_time(uninterrupted.clone()));
    assert_eq!(uninterrupted.manifest.related_components, vec!["Card"]);
    assert_eq!(uninterrupted.files, vec!["ui/button.tsx", "ui/button.stories.tsx"]);
}

#[tokio::test]
async fn test_run_with_resume_skips_generation_when_source_is_unchanged() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(Scripted::new());
    let p = pipeline(&dir, provider.clone(), Duration::from_secs(5));
    let options = RunOptions {
        available_components: None,
        resume: true,
    };

    let first = p.run(&input(BUTTON), &options).await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    // CRLF re-save hashes the same, so both checkpoints are reused.
    let crlf = BUTTON.replace('\n', "\r\n");
    let second = p.run(&input(&crlf), &options).await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.identity.id, second.identity.id);
    assert_eq!(first.source_hash, second.source_hash);

    // A real edit invalidates both.
    let edited = BUTTON.replace("Clickable button.", "Pressable button.");
    let third = p.run(&input(&edited), &options).await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    assert_ne!(third.source_hash, first.source_hash);
    assert_eq!(third.identity.id, first.identity.id);
}

#[tokio::test]
async fn test_timed_out_generation_leaves_no_checkpoint() {
    let dir = TempDir::new().unwrap();
    let p = pipeline(
        &dir,
        Arc::new(Scripted::slow(Duration::from_secs(5))),
        Duration::from_millis(20),
    );

    let extracted = p.extract(&input(BUTTON)).await.unwrap();
    let err = p.generate(&extracted).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::GenerationFailed);
    assert!(matches!(
        err,
        component_manifest::error::PipelineError::GenerationFailed(GenerationError::Timeout(_))
    ));

    let raw = FileStateStore::new(dir.path());
    assert!(raw.get("Button", Phase::Generation).await.unwrap().is_none());
    assert!(raw.get("Button", Phase::Extraction).await.unwrap().is_some());
}

#[tokio::test]
async fn test_missing_upstream_checkpoints_fail_the_downstream_phase() {
    let dir = TempDir::new().unwrap();
    let p = pipeline(&dir, Arc::new(Scripted::new()), Duration::from_secs(5));

    let err = p.generate_from_checkpoint("Button").await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::GenerationFailed);

    p.extract(&input(BUTTON)).await.unwrap();
    let err = p.build_from_checkpoints("Button", None).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::ManifestBuildFailed);
}

#[tokio::test]
async fn test_corrupt_checkpoint_is_a_state_store_failure() {
    let dir = TempDir::new().unwrap();
    let p = pipeline(&dir, Arc::new(Scripted::new()), Duration::from_secs(5));
    std::fs::write(dir.path().join("button.extraction.json"), "not json").unwrap();

    let err = p.generate_from_checkpoint("Button").await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::StateStoreFailed);

    let err = p.build_from_checkpoints("Button", None).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::StateStoreFailed);

    // The corrupt file is left for inspection, not replaced.
    assert_eq!(
        std::fs::read_to_string(dir.path().join("button.extraction.json")).unwrap(),
        "not json"
    );
}

#[tokio::test]
async fn test_unparseable_source_is_an_extraction_failure() {
    let dir = TempDir::new().unwrap();
    let p = pipeline(&dir, Arc::new(Scripted::new()), Duration::from_secs(5));
    let mut bad = input("export function Button( { return <div>");
    bad.stories_code = None;

    let err = p.extract(&bad).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::ExtractionFailed);
    assert!(p.status("Button").await.map(|s| !s.extraction).unwrap());
}

#[tokio::test]
async fn test_manifest_categorizes_button_props() {
    let dir = TempDir::new().unwrap();
    let p = pipeline(&dir, Arc::new(Scripted::new()), Duration::from_secs(5));
    let manifest = p
        .run(&input(BUTTON), &RunOptions::default())
        .await
        .unwrap();

    let props = &manifest.manifest.props;
    let names = |bucket: &[component_manifest_core::models::ManifestProp]| {
        bucket.iter().map(|p| p.name.clone()).collect::<Vec<_>>()
    };
    assert_eq!(names(&props.events), vec!["onClick"]);
    assert_eq!(names(&props.slots), vec!["children"]);
    assert_eq!(names(&props.behaviors), vec!["asChild"]);
    assert_eq!(names(&props.variants), vec!["variant", "size"]);
    assert!(!manifest.manifest.provenance.fallback_triggered);
    assert_eq!(manifest.manifest.provenance.provider, "scripted");
    assert_eq!(manifest.manifest.examples.len(), 2);

    let status = p.status("Button").await.unwrap();
    assert!(status.extraction && status.generation && status.manifest);
}
