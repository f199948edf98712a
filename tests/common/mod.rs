//! Test utilities shared by the siteaudit integration tests
//!
//! `FakePageSource` hands out in-memory pages whose navigation behavior is
//! scripted per URL, so scheduler scenarios run without a browser.

use futures::future::BoxFuture;
use mockito::{Mock, Server};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use kodegen_tools_siteaudit::analyzers::Analyzer;
use kodegen_tools_siteaudit::results::{
    AccessibilityFindings, AnalysisResult, AnalysisSection, PerformanceMetrics, SeoFindings,
};
use kodegen_tools_siteaudit::{
    AccessibilityResult, AnalyzerPipeline, AuditEventHandler, AuditIssue, AuditPage, PageError,
    PageSource, ProgressStats, ResultField, Severity, TestOptions,
};

/// How navigation to one URL behaves
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed,
    /// Fail the first `n` navigations, then succeed
    FailTimes(u32),
    AlwaysFail,
    Crash,
    RedirectTo(String),
    /// Succeed after sleeping
    Delay(Duration),
    /// Sleep for `hang` on the first `n` navigations, then succeed
    HangTimes(u32, Duration),
}

#[derive(Default)]
pub struct FakeState {
    behaviors: Mutex<HashMap<String, Behavior>>,
    navigations: Mutex<HashMap<String, u32>>,
    pages_by_url: Mutex<HashMap<String, Vec<u64>>>,
    next_id: AtomicU64,
    pub created: AtomicUsize,
    pub closed: AtomicUsize,
    active: AtomicUsize,
    pub peak_active: AtomicUsize,
}

/// Decrements the active counter even when the navigation future is dropped
struct ActiveGuard<'a>(&'a FakeState);

impl<'a> ActiveGuard<'a> {
    fn enter(state: &'a FakeState) -> Self {
        let now = state.active.fetch_add(1, Ordering::SeqCst) + 1;
        state.peak_active.fetch_max(now, Ordering::SeqCst);
        Self(state)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct FakePage {
    id: u64,
    state: Arc<FakeState>,
}

impl FakePage {
    #[allow(dead_code)]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl AuditPage for FakePage {
    fn navigate<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, PageError>> {
        Box::pin(async move {
            let _active = ActiveGuard::enter(&self.state);

            let attempt = {
                let mut navigations = self.state.navigations.lock();
                let count = navigations.entry(url.to_string()).or_insert(0);
                *count += 1;
                *count
            };
            self.state
                .pages_by_url
                .lock()
                .entry(url.to_string())
                .or_default()
                .push(self.id);

            let behavior = self
                .state
                .behaviors
                .lock()
                .get(url)
                .cloned()
                .unwrap_or(Behavior::Succeed);

            // keep the slot busy long enough for overlapping tasks to show up
            tokio::time::sleep(Duration::from_millis(5)).await;

            match behavior {
                Behavior::Succeed => Ok(url.to_string()),
                Behavior::FailTimes(n) if attempt <= n => Err(PageError::navigation(format!(
                    "net::ERR_CONNECTION_RESET (attempt {attempt})"
                ))),
                Behavior::FailTimes(_) => Ok(url.to_string()),
                Behavior::AlwaysFail => Err(PageError::navigation("net::ERR_NAME_NOT_RESOLVED")),
                Behavior::Crash => Err(PageError::crash("Target crashed")),
                Behavior::RedirectTo(target) => Ok(target),
                Behavior::Delay(d) => {
                    tokio::time::sleep(d).await;
                    Ok(url.to_string())
                }
                Behavior::HangTimes(n, hang) if attempt <= n => {
                    tokio::time::sleep(hang).await;
                    Ok(url.to_string())
                }
                Behavior::HangTimes(..) => Ok(url.to_string()),
            }
        })
    }
}

#[derive(Clone, Default)]
pub struct FakePageSource {
    pub state: Arc<FakeState>,
}

#[allow(dead_code)]
impl FakePageSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, url: &str, behavior: Behavior) {
        self.state.behaviors.lock().insert(url.to_string(), behavior);
    }

    pub fn navigations(&self, url: &str) -> u32 {
        self.state.navigations.lock().get(url).copied().unwrap_or(0)
    }

    /// Ids of the pages used for each navigation of `url`, in order
    pub fn pages_for(&self, url: &str) -> Vec<u64> {
        self.state
            .pages_by_url
            .lock()
            .get(url)
            .cloned()
            .unwrap_or_default()
    }

    pub fn created(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn peak_active(&self) -> usize {
        self.state.peak_active.load(Ordering::SeqCst)
    }
}

impl PageSource for FakePageSource {
    type Page = FakePage;

    fn create_page(&self) -> BoxFuture<'_, Result<FakePage, PageError>> {
        Box::pin(async move {
            self.state.created.fetch_add(1, Ordering::SeqCst);
            Ok(FakePage {
                id: self.state.next_id.fetch_add(1, Ordering::SeqCst),
                state: Arc::clone(&self.state),
            })
        })
    }

    fn close_page(&self, _page: FakePage) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.state.closed.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// Required accessibility analyzer with per-URL scripted issues
#[derive(Default)]
pub struct CoreAnalyzer {
    /// url -> (serious errors, warnings); default is (1, 2)
    issues: HashMap<String, (usize, usize)>,
    critical: HashSet<String>,
}

#[allow(dead_code)]
impl CoreAnalyzer {
    pub fn with_issues(mut self, url: &str, errors: usize, warnings: usize) -> Self {
        self.issues.insert(url.to_string(), (errors, warnings));
        self
    }

    pub fn with_critical(mut self, url: &str) -> Self {
        self.critical.insert(url.to_string());
        self
    }
}

impl Analyzer<FakePage> for CoreAnalyzer {
    fn name(&self) -> &'static str {
        "core"
    }

    fn field(&self) -> ResultField {
        ResultField::Accessibility
    }

    fn analyze<'a>(
        &'a self,
        _page: &'a FakePage,
        url: &'a str,
        _options: &'a TestOptions,
    ) -> BoxFuture<'a, Result<AnalysisResult, PageError>> {
        Box::pin(async move {
            let (errors, warnings) = self.issues.get(url).copied().unwrap_or((1, 2));
            let mut error_list: Vec<AuditIssue> = (0..errors)
                .map(|i| AuditIssue::new("image-alt", format!("image {i} has no alt"), Severity::Serious))
                .collect();
            if self.critical.contains(url) {
                error_list.push(AuditIssue::new(
                    "label",
                    "form control has no label",
                    Severity::Critical,
                ));
            }
            let warning_list = (0..warnings)
                .map(|i| AuditIssue::new("heading-order", format!("heading {i} skips a level"), Severity::Minor))
                .collect();

            Ok(AnalysisResult::new(AnalysisSection::Accessibility(AccessibilityFindings {
                score: 90.0,
                images_total: errors + 3,
                images_missing_alt: errors,
                headings_total: 4,
                landmarks_total: 2,
                has_lang: true,
                ..Default::default()
            }))
            .with_errors(error_list)
            .with_warnings(warning_list))
        })
    }
}

/// Optional SEO analyzer that always succeeds
pub struct SeoOk;

impl Analyzer<FakePage> for SeoOk {
    fn name(&self) -> &'static str {
        "seo"
    }

    fn field(&self) -> ResultField {
        ResultField::Seo
    }

    fn analyze<'a>(
        &'a self,
        _page: &'a FakePage,
        _url: &'a str,
        _options: &'a TestOptions,
    ) -> BoxFuture<'a, Result<AnalysisResult, PageError>> {
        Box::pin(async move {
            Ok(AnalysisResult::new(AnalysisSection::Seo(SeoFindings {
                score: 80.0,
                title: Some("Home".to_string()),
                h1_count: 1,
                word_count: 250,
                ..Default::default()
            })))
        })
    }
}

/// Optional performance analyzer that errors
pub struct PerformanceFails;

impl Analyzer<FakePage> for PerformanceFails {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn field(&self) -> ResultField {
        ResultField::Performance
    }

    fn analyze<'a>(
        &'a self,
        _page: &'a FakePage,
        _url: &'a str,
        _options: &'a TestOptions,
    ) -> BoxFuture<'a, Result<AnalysisResult, PageError>> {
        Box::pin(async move { Err(PageError::analyzer("performance", "timing entries missing")) })
    }
}

/// Optional performance analyzer that succeeds
pub struct PerformanceOk;

impl Analyzer<FakePage> for PerformanceOk {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn field(&self) -> ResultField {
        ResultField::Performance
    }

    fn analyze<'a>(
        &'a self,
        _page: &'a FakePage,
        _url: &'a str,
        _options: &'a TestOptions,
    ) -> BoxFuture<'a, Result<AnalysisResult, PageError>> {
        Box::pin(async move {
            Ok(AnalysisResult::new(AnalysisSection::Performance(PerformanceMetrics {
                score: 70.0,
                time_to_first_byte_ms: 120.0,
                dom_content_loaded_ms: 800.0,
                load_complete_ms: 1_400.0,
                ..Default::default()
            })))
        })
    }
}

/// Optional mobile analyzer that panics
pub struct MobilePanics;

impl Analyzer<FakePage> for MobilePanics {
    fn name(&self) -> &'static str {
        "mobile"
    }

    fn field(&self) -> ResultField {
        ResultField::Mobile
    }

    fn analyze<'a>(
        &'a self,
        _page: &'a FakePage,
        _url: &'a str,
        _options: &'a TestOptions,
    ) -> BoxFuture<'a, Result<AnalysisResult, PageError>> {
        Box::pin(async move { panic!("viewport check blew up") })
    }
}

/// Required analyzer that always errors
pub struct CoreFails;

impl Analyzer<FakePage> for CoreFails {
    fn name(&self) -> &'static str {
        "core"
    }

    fn field(&self) -> ResultField {
        ResultField::Accessibility
    }

    fn analyze<'a>(
        &'a self,
        _page: &'a FakePage,
        _url: &'a str,
        _options: &'a TestOptions,
    ) -> BoxFuture<'a, Result<AnalysisResult, PageError>> {
        Box::pin(async move { Err(PageError::analyzer("core", "axe did not load")) })
    }
}

/// Pipeline with only the required analyzer
#[allow(dead_code)]
pub fn core_pipeline() -> AnalyzerPipeline<FakePage> {
    AnalyzerPipeline::new().with(CoreAnalyzer::default())
}

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Started(String),
    Completed { url: String, attempts: u32 },
    Failed { url: String, attempts: u32 },
    Skipped { url: String, target: String },
    Progress(ProgressStats),
}

/// Event handler that keeps every callback in arrival order
#[derive(Default)]
pub struct RecordingHandler {
    pub events: Mutex<Vec<Recorded>>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().clone()
    }

    pub fn progress(&self) -> Vec<ProgressStats> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Progress(stats) => Some(stats),
                _ => None,
            })
            .collect()
    }
}

impl AuditEventHandler for RecordingHandler {
    fn on_url_started(&self, url: &str) {
        self.events.lock().push(Recorded::Started(url.to_string()));
    }

    fn on_url_completed(
        &self,
        url: &str,
        _result: &AccessibilityResult,
        _duration_ms: u64,
        attempts: u32,
    ) {
        self.events.lock().push(Recorded::Completed {
            url: url.to_string(),
            attempts,
        });
    }

    fn on_url_failed(&self, url: &str, _error: &str, attempts: u32) {
        self.events.lock().push(Recorded::Failed {
            url: url.to_string(),
            attempts,
        });
    }

    fn on_url_skipped(&self, url: &str, redirect_target: &str) {
        self.events.lock().push(Recorded::Skipped {
            url: url.to_string(),
            target: redirect_target.to_string(),
        });
    }

    fn on_progress_update(&self, stats: ProgressStats) {
        self.events.lock().push(Recorded::Progress(stats));
    }
}

/// `https://site.test/page-<i>` for `0..n`
#[allow(dead_code)]
pub fn urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://site.test/page-{i}")).collect()
}

/// Creates a mock endpoint that serves XML
#[allow(dead_code)]
pub fn create_xml_mock(server: &mut Server, path: &str, xml: &str) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "application/xml")
        .with_body(xml)
        .create()
}

/// Creates a mock endpoint that returns an error
#[allow(dead_code)]
pub fn create_error_mock(server: &mut Server, path: &str, status: usize) -> Mock {
    server.mock("GET", path).with_status(status).create()
}

/// Helper to create test URLs
#[allow(dead_code)]
pub fn test_url(server: &Server, path: &str) -> String {
    format!("{}{}", server.url(), path)
}
