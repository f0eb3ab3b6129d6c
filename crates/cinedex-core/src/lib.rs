//! Cinedex Core - Domain types and the concurrent enrichment pipeline.
//!
//! This crate provides the core functionality for Cinedex, including:
//!
//! - **Domain models**: [`WorkItem`], [`AnnotationResult`], [`CategoryIndex`], [`EnrichmentReport`]
//! - **Pipeline**: [`BoundedAnnotator`] under a [`PermitPool`] and [`RetryPolicy`],
//!   [`aggregate`](aggregate::aggregate), and the [`EnrichmentService`] tying them together
//! - **Traits**: [`CatalogSource`], [`AnnotationOracle`] for dependency injection
//! - **Progress reporting**: [`ProgressReporter`] trait for decoupled logging/UI
//! - **Catalog helpers**: title normalization, field grouping, trope analysis, UI translations,
//!   subtitle conversion
//!
//! # Architecture
//!
//! This crate holds no HTTP code. Collaborators are reached through traits,
//! implemented in `cinedex-client` for production and by mocks in tests:
//!
//! - [`CatalogSource`] - abstracts the video catalog (e.g., a PostgREST table)
//! - [`AnnotationOracle`] - abstracts the generative-AI endpoint (e.g., Gemini)
//!
//! # Example
//!
//! ```ignore
//! use cinedex_core::{EnrichmentService, PipelineConfig, TracingReporter};
//!
//! let service = EnrichmentService::with_config(catalog, oracle, PipelineConfig::from_env()?)?;
//! let report = service.run_with_progress(&TracingReporter).await?;
//! println!("{}", serde_json::to_string_pretty(&report.index)?);
//! ```

pub mod aggregate;
pub mod annotate;
pub mod catalog;
pub mod config;
pub mod enrich;
pub mod error;
pub mod grouping;
pub mod i18n;
pub mod models;
pub mod payload;
pub mod permit;
pub mod progress;
pub mod retry;
pub mod subtitles;
pub mod traits;
pub mod tropes;

// Configuration
pub use config::{
    CatalogEntry, CatalogsConfig, HttpConfig, PipelineConfig, default_config_path,
    load_catalogs_config,
};

// Error handling
pub use error::{AppError, OracleErrorDetails, OracleErrorKind};

// Domain models
pub use catalog::{CatalogRecord, normalize_title};
pub use models::{
    AnnotationResult, AnnotationStatus, CategoryEntry, CategoryIndex, EnrichmentReport,
    EnrichmentStats, UnclassifiedItem, WorkItem,
};
pub use tropes::{Trope, TropeAnalysis};

// Pipeline building blocks
pub use annotate::BoundedAnnotator;
pub use permit::{Permit, PermitPool};
pub use retry::{Jitter, RetryPolicy};

// Progress reporting
pub use progress::{EnrichmentEvent, ProgressReporter, SilentReporter, TracingReporter};

// Traits for dependency injection
pub use traits::{AnnotationOracle, CatalogSource};

// Services
pub use enrich::EnrichmentService;
pub use i18n::TranslationCache;
pub use subtitles::srt_to_vtt;
