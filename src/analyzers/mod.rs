//! Page analyzers and the pipeline that runs them
//!
//! An [`Analyzer`] inspects an already-navigated page and returns one
//! [`AnalysisResult`] section. The [`AnalyzerPipeline`] runs every analyzer
//! whose [`ResultField`] is enabled by the run's options and merges the
//! sections into an `AccessibilityResult`.

pub mod dom;
pub mod pipeline;
pub mod scripts;

use futures::future::BoxFuture;

use crate::config::TestOptions;
use crate::errors::PageError;
use crate::results::{AnalysisResult, ResultField};

pub use dom::{
    AccessibilityAnalyzer, MobileAnalyzer, Pa11yAnalyzer, PerformanceAnalyzer, SecurityAnalyzer,
    SeoAnalyzer, SocialAnalyzer, StructuredDataAnalyzer, TechnicalSeoAnalyzer, default_pipeline,
};
pub use pipeline::AnalyzerPipeline;

/// One analysis pass over a page of type `P`
pub trait Analyzer<P>: Send + Sync {
    /// Short name used in logs and in `AnalyzerFailure` records
    fn name(&self) -> &'static str;

    /// Which result field this analyzer fills
    fn field(&self) -> ResultField;

    fn analyze<'a>(
        &'a self,
        page: &'a P,
        url: &'a str,
        options: &'a TestOptions,
    ) -> BoxFuture<'a, Result<AnalysisResult, PageError>>;
}
