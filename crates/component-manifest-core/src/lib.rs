//! # Component Manifest Core
//!
//! Pure logic for Component Manifest: the data model, the two source
//! analyzers, composition heuristics, the hybrid extraction coordinator,
//! manifest assembly, the generation contract, and the state store trait.
//!
//! This crate performs no filesystem or network I/O and carries no async
//! runtime. The application crate supplies the file-backed store, the
//! completion providers, and the pipeline orchestrator.
//!
//! ```text
//!  source ─▶ extract ─▶ ExtractedData ─▶ generation ─▶ GeneratedMeta
//!                 │                                         │
//!                 └──────────────▶ manifest ◀───────────────┘
//!                                     │
//!                                     ▼
//!                                  Manifest
//! ```

pub mod ast;
pub mod composition;
pub mod error;
pub mod extract;
pub mod generation;
pub mod identity;
pub mod manifest;
pub mod models;
pub mod primary;
pub mod store;
pub mod syntax;
