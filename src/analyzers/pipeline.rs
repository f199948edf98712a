//! Runs the enabled analyzers for one page

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::Analyzer;
use crate::config::TestOptions;
use crate::errors::{FailureKind, PageError};
use crate::results::{AccessibilityResult, AnalyzerFailure};

/// Ordered set of analyzers for pages of type `P`
pub struct AnalyzerPipeline<P> {
    analyzers: Vec<Arc<dyn Analyzer<P>>>,
}

impl<P> Default for AnalyzerPipeline<P> {
    fn default() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }
}

impl<P> std::fmt::Debug for AnalyzerPipeline<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.analyzers.iter().map(|a| a.name()))
            .finish()
    }
}

impl<P: Send + Sync> AnalyzerPipeline<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an analyzer; analyzers run in registration order
    #[must_use]
    pub fn with(mut self, analyzer: impl Analyzer<P> + 'static) -> Self {
        self.register(Arc::new(analyzer));
        self
    }

    pub fn register(&mut self, analyzer: Arc<dyn Analyzer<P>>) {
        self.analyzers.push(analyzer);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Run every enabled analyzer against `page` and merge their sections
    ///
    /// Optional analyzers degrade: an error or panic leaves their field empty
    /// and is recorded in `analyzer_failures`. The required analyzer failing
    /// fails the whole attempt. A crash-class error from any analyzer is
    /// returned as is so the worker stops retrying.
    pub async fn run(
        &self,
        page: &P,
        url: &str,
        options: &TestOptions,
    ) -> Result<AccessibilityResult, PageError> {
        let flags = *options.flags();
        let mut result = AccessibilityResult::new(url, flags);

        for analyzer in &self.analyzers {
            let field = analyzer.field();
            if !field.enabled_by(&flags) {
                continue;
            }

            let outcome = AssertUnwindSafe(analyzer.analyze(page, url, options))
                .catch_unwind()
                .await;

            let error = match outcome {
                Ok(Ok(analysis)) if analysis.section.field() == field => {
                    result.merge(analysis);
                    continue;
                }
                Ok(Ok(analysis)) => PageError::new(
                    FailureKind::Analyzer,
                    format!(
                        "returned a {} section instead of {}",
                        analysis.section.field(),
                        field
                    ),
                ),
                Ok(Err(e)) if e.is_crash() => return Err(e),
                Ok(Err(e)) => e,
                Err(panic) => PageError::new(
                    FailureKind::Analyzer,
                    format!("panicked: {}", panic_message(panic.as_ref())),
                ),
            };

            if field.is_required() {
                log::warn!("Required analyzer {} failed on {}: {}", analyzer.name(), url, error);
                return Err(PageError::analyzer(analyzer.name(), &error.message));
            }

            log::warn!(
                "Analyzer {} failed on {}, continuing without {}: {}",
                analyzer.name(),
                url,
                field,
                error
            );
            result.record_failure(AnalyzerFailure {
                analyzer: analyzer.name().to_string(),
                field,
                message: error.message,
            });
        }

        Ok(result)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
