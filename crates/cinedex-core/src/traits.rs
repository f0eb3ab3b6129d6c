//! Trait definitions for external collaborators.
//!
//! The pipeline talks to two outside services: a catalog listing the
//! videos to enrich, and an annotation oracle that classifies them. Both
//! sit behind traits so the core can be driven by mocks in tests and by
//! the HTTP clients in `cinedex-client` in production.
//!
//! # Example
//!
//! ```
//! use cinedex_core::traits::{AnnotationOracle, CatalogSource};
//! use cinedex_core::AppError;
//!
//! async fn first_answer<C, O>(catalog: &C, oracle: &O) -> Result<Option<String>, AppError>
//! where
//!     C: CatalogSource,
//!     O: AnnotationOracle,
//! {
//!     let items = catalog.list_items().await?;
//!     match items.first() {
//!         Some(item) => Ok(Some(oracle.classify(&item.title, &item.source_url).await?)),
//!         None => Ok(None),
//!     }
//! }
//! ```

use std::future::Future;

use crate::catalog::CatalogRecord;
use crate::{AppError, WorkItem};

/// Source of catalog entries to enrich.
pub trait CatalogSource: Send + Sync + Clone {
    /// Lists every catalog row as a raw record.
    ///
    /// Rows without a usable title or URL are skipped by implementations.
    fn list_records(&self) -> impl Future<Output = Result<Vec<CatalogRecord>, AppError>> + Send;

    /// Lists the work items to annotate.
    ///
    /// # Errors
    ///
    /// Implementations report an unreachable catalog as
    /// [`AppError::SourceUnavailable`]. Partial listings are never returned.
    fn list_items(&self) -> impl Future<Output = Result<Vec<WorkItem>, AppError>> + Send {
        async move {
            let records = self.list_records().await?;
            Ok(records.iter().map(CatalogRecord::to_work_item).collect())
        }
    }
}

/// External generative-AI endpoint answering questions about films.
///
/// Both methods return the oracle's free-form text. Callers extract the
/// embedded JSON payload with [`crate::payload`].
pub trait AnnotationOracle: Send + Sync + Clone {
    /// Asks for the category of the film at `url`.
    fn classify(
        &self,
        title: &str,
        url: &str,
    ) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Asks for the narrative tropes used in the film at `url`.
    fn analyze_tropes(
        &self,
        title: &str,
        url: &str,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}
