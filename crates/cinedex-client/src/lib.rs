//! Cinedex Client - HTTP clients for external APIs
//!
//! This crate provides HTTP clients for interacting with:
//!
//! - [`postgrest`] - the video catalog table behind a PostgREST endpoint
//! - [`gemini`] - Google Gemini, used as the annotation oracle
//!
//! # Overview
//!
//! Both clients implement the collaborator traits from
//! `cinedex_core::traits`, so they plug straight into
//! `cinedex_core::EnrichmentService`.

pub mod gemini;
pub mod postgrest;

// Re-export main client types
pub use gemini::GeminiClient;
pub use postgrest::PostgrestCatalogClient;
