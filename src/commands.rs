//! Command handlers behind the `cmx` subcommands.
//!
//! Each handler prints one JSON document on stdout and returns `Ok` on
//! success. Diagnostics go through `tracing` on stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use component_manifest_core::extract::ExtractionInput;
use serde::Serialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::config::Config;
use crate::discover::{component_name, discover_components};
use crate::error::FailureKind;
use crate::pipeline::{Pipeline, RunOptions};
use crate::provider::{create_provider, DisabledProvider};

/// Flags shared by `extract` and `run`.
#[derive(Debug, Clone, Default)]
pub struct SourceArgs {
    pub file: PathBuf,
    pub name: Option<String>,
    pub stories: Option<PathBuf>,
    pub framework: Option<String>,
    pub id: Option<Uuid>,
    pub org: Option<String>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Pipeline for commands that call the model.
fn generating_pipeline(config: &Config) -> Result<Pipeline> {
    let provider = create_provider(&config.generation)?;
    Ok(Pipeline::from_config(config, provider))
}

/// Pipeline for commands that never call the model; no provider is set up.
fn offline_pipeline(config: &Config) -> Pipeline {
    Pipeline::from_config(config, Arc::new(DisabledProvider))
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn extraction_input(config: &Config, args: &SourceArgs) -> Result<ExtractionInput> {
    let name = match &args.name {
        Some(name) => name.clone(),
        None => component_name(&args.file).ok_or_else(|| {
            anyhow!(
                "cannot derive a component name from {}; pass --name",
                args.file.display()
            )
        })?,
    };
    let stories_code = args.stories.as_deref().map(read_source).transpose()?;

    Ok(ExtractionInput {
        org_id: args.org.clone().unwrap_or_else(|| "local".to_string()),
        name,
        source_code: read_source(&args.file)?,
        file_path: Some(args.file.to_string_lossy().to_string()),
        framework: args
            .framework
            .clone()
            .unwrap_or_else(|| config.extraction.framework.clone()),
        existing_id: args.id,
        stories_code,
        stories_file_path: args
            .stories
            .as_ref()
            .map(|p| p.to_string_lossy().to_string()),
    })
}

pub async fn run_extract(config: &Config, args: &SourceArgs) -> Result<()> {
    let input = extraction_input(config, args)?;
    let output = offline_pipeline(config).extract(&input).await?;
    print_json(&output)
}

pub async fn run_generate(config: &Config, name: &str) -> Result<()> {
    let output = generating_pipeline(config)?.generate_from_checkpoint(name).await?;
    print_json(&output)
}

pub async fn run_build(config: &Config, name: &str, available: Option<Vec<String>>) -> Result<()> {
    let manifest = offline_pipeline(config)
        .build_from_checkpoints(name, available.as_deref())
        .await?;
    print_json(&manifest)
}

pub async fn run_one(
    config: &Config,
    args: &SourceArgs,
    available: Option<Vec<String>>,
    resume: bool,
) -> Result<()> {
    let input = extraction_input(config, args)?;
    let options = RunOptions {
        available_components: available,
        resume,
    };
    let manifest = generating_pipeline(config)?.run(&input, &options).await?;
    print_json(&manifest)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    component: String,
    file: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run every discovered component. Failures are reported per component
/// and make the whole command fail after all components were attempted.
pub async fn run_all(config: &Config, resume: bool) -> Result<()> {
    let files = discover_components(&config.components)?;
    let available: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
    let pipeline = generating_pipeline(config)?;
    let options = RunOptions {
        available_components: Some(available),
        resume,
    };

    let mut reports = Vec::with_capacity(files.len());
    for file in &files {
        let args = SourceArgs {
            file: file.path.clone(),
            name: Some(file.name.clone()),
            stories: file.stories.clone(),
            ..SourceArgs::default()
        };
        let input = extraction_input(config, &args)?;
        let result = pipeline.run(&input, &options).await;
        let report = match result {
            Ok(_) => RunReport {
                component: file.name.clone(),
                file: file.relative.clone(),
                ok: true,
                kind: None,
                error: None,
            },
            Err(e) => {
                warn!(component = %file.name, error = %e, "pipeline failed");
                RunReport {
                    component: file.name.clone(),
                    file: file.relative.clone(),
                    ok: false,
                    kind: Some(e.kind()),
                    error: Some(e.to_string()),
                }
            }
        };
        reports.push(report);
    }

    let failed = reports.iter().filter(|r| !r.ok).count();
    print_json(&json!({
        "total": reports.len(),
        "failed": failed,
        "components": reports,
    }))?;
    if failed > 0 {
        bail!("{} of {} components failed", failed, reports.len());
    }
    Ok(())
}

pub async fn run_status(config: &Config, name: Option<&str>) -> Result<()> {
    let pipeline = offline_pipeline(config);
    let names = match name {
        Some(name) => vec![name.to_string()],
        None => match pipeline.checkpoints() {
            Some(store) => store.list().await?,
            None => Vec::new(),
        },
    };
    let mut statuses = Vec::with_capacity(names.len());
    for name in &names {
        statuses.push(pipeline.status(name).await?);
    }
    print_json(&statuses)
}

pub async fn run_clean(config: &Config, name: Option<&str>) -> Result<()> {
    let pipeline = offline_pipeline(config);
    let Some(store) = pipeline.checkpoints() else {
        return print_json(&json!({ "removed": [] }));
    };
    let names = match name {
        Some(name) => vec![name.to_string()],
        None => store.list().await?,
    };
    for name in &names {
        store.delete(name).await?;
    }
    print_json(&json!({ "removed": names }))
}
