//! Bounded annotation of work items through the oracle.
//!
//! Every oracle attempt runs under three constraints:
//!
//! - it holds one permit from the injected [`PermitPool`] for the length of
//!   the call, released on every exit path when the guard drops
//! - it is bounded by `call_timeout`; expiry ends the item as
//!   [`AnnotationStatus::TimedOut`](crate::AnnotationStatus::TimedOut)
//! - transient failures are retried per [`RetryPolicy`], with the permit
//!   returned to the pool during the backoff sleep
//!
//! [`BoundedAnnotator::annotate`] never fails: parse errors, timeouts and
//! exhausted retries all become an [`AnnotationResult`] with no category.

use std::time::Duration;

use crate::error::AppError;
use crate::models::{AnnotationResult, WorkItem};
use crate::payload::extract_category;
use crate::permit::PermitPool;
use crate::progress::{EnrichmentEvent, ProgressReporter, SilentReporter};
use crate::retry::RetryPolicy;
use crate::traits::AnnotationOracle;

/// Default deadline for a single oracle attempt.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Which oracle question to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OracleRequest {
    Classify,
    Tropes,
}

/// Text returned by a successful attempt.
#[derive(Debug)]
pub(crate) struct OracleReply {
    pub text: String,
    pub attempts: u32,
}

/// Terminal failure of an oracle call.
///
/// `error` is [`AppError::Timeout`] when the deadline expired and
/// [`AppError::AnnotationFailed`] otherwise.
#[derive(Debug)]
pub(crate) struct CallFailure {
    pub error: AppError,
    pub attempts: u32,
}

/// Annotates work items under a permit pool, retry policy, and deadline.
pub struct BoundedAnnotator<O: AnnotationOracle> {
    oracle: O,
    permits: PermitPool,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl<O: AnnotationOracle> Clone for BoundedAnnotator<O> {
    fn clone(&self) -> Self {
        Self {
            oracle: self.oracle.clone(),
            permits: self.permits.clone(),
            retry: self.retry.clone(),
            call_timeout: self.call_timeout,
        }
    }
}

impl<O: AnnotationOracle> BoundedAnnotator<O> {
    /// Creates an annotator with the default retry policy and deadline.
    pub fn new(oracle: O, permits: PermitPool) -> Self {
        Self {
            oracle,
            permits,
            retry: RetryPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn permits(&self) -> &PermitPool {
        &self.permits
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Annotates one item.
    pub async fn annotate(&self, item: WorkItem) -> AnnotationResult {
        self.annotate_with_progress(item, &SilentReporter).await
    }

    /// Annotates one item, reporting retries through `reporter`.
    pub async fn annotate_with_progress<R: ProgressReporter>(
        &self,
        item: WorkItem,
        reporter: &R,
    ) -> AnnotationResult {
        match self.call(OracleRequest::Classify, &item, reporter).await {
            Ok(reply) => match extract_category(&reply.text) {
                Ok(category) => {
                    AnnotationResult::classified(item, category, reply.text, reply.attempts)
                }
                Err(e) => {
                    tracing::warn!(
                        title = %item.title,
                        error = %e,
                        "Oracle response could not be parsed, dropping item"
                    );
                    AnnotationResult::unparseable(item, reply.text, reply.attempts)
                }
            },
            Err(failure) => {
                tracing::warn!(
                    title = %item.title,
                    attempts = failure.attempts,
                    error = %failure.error,
                    "Annotation abandoned"
                );
                match failure.error {
                    AppError::Timeout(_) => AnnotationResult::timed_out(item, failure.attempts),
                    _ => AnnotationResult::failed(item, String::new(), failure.attempts),
                }
            }
        }
    }

    /// Runs one oracle request to completion under the permit pool,
    /// deadline, and retry policy.
    pub(crate) async fn call<R: ProgressReporter>(
        &self,
        request: OracleRequest,
        item: &WorkItem,
        reporter: &R,
    ) -> Result<OracleReply, CallFailure> {
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            let outcome = {
                let _permit = self.permits.acquire().await.map_err(|e| CallFailure {
                    error: AppError::AnnotationFailed {
                        title: item.title.clone(),
                        attempts: attempts - 1,
                        last_error: e.to_string(),
                    },
                    attempts: attempts - 1,
                })?;

                tokio::time::timeout(self.call_timeout, self.invoke(request, item)).await
            };

            let error = match outcome {
                Ok(Ok(text)) => return Ok(OracleReply { text, attempts }),
                Ok(Err(e)) => e,
                Err(_) => {
                    return Err(CallFailure {
                        error: AppError::Timeout(self.call_timeout.as_secs()),
                        attempts,
                    });
                }
            };

            if !error.is_retryable() || !self.retry.allows_another(attempts) {
                return Err(CallFailure {
                    error: AppError::AnnotationFailed {
                        title: item.title.clone(),
                        attempts,
                        last_error: error.to_string(),
                    },
                    attempts,
                });
            }

            let delay = self.retry.next_delay(attempts);
            let error_text = error.to_string();
            reporter.report(EnrichmentEvent::RetryScheduled {
                title: &item.title,
                attempt: attempts,
                delay,
                error: &error_text,
            });
            tokio::time::sleep(delay).await;
        }
    }

    async fn invoke(&self, request: OracleRequest, item: &WorkItem) -> Result<String, AppError> {
        match request {
            OracleRequest::Classify => {
                self.oracle
                    .classify(&item.title, &item.source_url)
                    .await
            }
            OracleRequest::Tropes => {
                self.oracle
                    .analyze_tropes(&item.title, &item.source_url)
                    .await
            }
        }
    }
}
