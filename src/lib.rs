//! # Component Manifest
//!
//! Turns UI component source files into AI-readable manifests.
//!
//! The pure analysis lives in `component_manifest_core`; this crate adds
//! configuration, the file-backed checkpoint store, completion providers,
//! the pipeline orchestrator, and the `cmx` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌────────────┐
//! │  Extract   │──▶│  Generate  │──▶│   Build    │
//! │ primary/AST│   │ provider   │   │  assemble  │
//! └─────┬──────┘   └─────┬──────┘   └─────┬──────┘
//!       │                │                │
//!       ▼                ▼                ▼
//! ┌──────────────────────────────────────────────┐
//! │      checkpoint store (.ce-state/*.json)     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cmx extract src/components/ui/button.tsx
//! cmx generate Button
//! cmx build Button --available Button,Card
//! cmx run --all --resume
//! cmx status
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`state_fs`] | File-backed state store with atomic writes |
//! | [`checkpoint`] | Typed per-phase checkpoints |
//! | [`provider`] | Completion providers |
//! | [`generate`] | Generation stage with timeout |
//! | [`pipeline`] | Extract → Generate → Build orchestration |
//! | [`discover`] | Component file discovery |
//! | [`error`] | Pipeline failure kinds |

pub mod checkpoint;
pub mod commands;
pub mod config;
pub mod discover;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod provider;
pub mod state_fs;
