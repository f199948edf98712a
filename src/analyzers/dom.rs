//! Built-in analyzers for Chromium pages
//!
//! Each analyzer evaluates one script from [`super::scripts`] and turns the raw
//! signals into a scored section plus issues. The heuristics are deliberately
//! shallow; they exist so a run produces real, comparable numbers.

use futures::future::BoxFuture;
use serde::Deserialize;

use super::scripts;
use super::{Analyzer, AnalyzerPipeline};
use crate::browser_pool::ChromiumPage;
use crate::config::TestOptions;
use crate::errors::PageError;
use crate::results::{
    AccessibilityFindings, AnalysisResult, AnalysisSection, AuditIssue, MobileFindings,
    Pa11yFindings, PerformanceMetrics, ResultField, SecurityFindings, SeoFindings, Severity,
    SocialFindings, StructuredDataFindings, TechnicalSeoFindings,
};

/// Pipeline with every built-in analyzer, accessibility first
#[must_use]
pub fn default_pipeline() -> AnalyzerPipeline<ChromiumPage> {
    AnalyzerPipeline::new()
        .with(AccessibilityAnalyzer)
        .with(PerformanceAnalyzer)
        .with(Pa11yAnalyzer)
        .with(SeoAnalyzer)
        .with(SocialAnalyzer)
        .with(TechnicalSeoAnalyzer)
        .with(SecurityAnalyzer)
        .with(StructuredDataAnalyzer)
        .with(MobileAnalyzer)
}

macro_rules! dom_analyzer {
    ($ty:ident, $name:literal, $field:ident, $script:ident, $raw:ty, $assess:ident) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $ty;

        impl Analyzer<ChromiumPage> for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn field(&self) -> ResultField {
                ResultField::$field
            }

            fn analyze<'a>(
                &'a self,
                page: &'a ChromiumPage,
                url: &'a str,
                _options: &'a TestOptions,
            ) -> BoxFuture<'a, Result<AnalysisResult, PageError>> {
                Box::pin(async move {
                    let raw: $raw = page.evaluate_json(scripts::$script).await?;
                    log::debug!("{} signals collected for {}", $name, url);
                    Ok($assess(raw))
                })
            }
        }
    };
}

dom_analyzer!(AccessibilityAnalyzer, "accessibility", Accessibility, ACCESSIBILITY_SCRIPT, AccessibilityRaw, assess_accessibility);
dom_analyzer!(PerformanceAnalyzer, "performance", Performance, PERFORMANCE_SCRIPT, PerformanceMetrics, assess_performance);
dom_analyzer!(Pa11yAnalyzer, "pa11y", Pa11y, PA11Y_SCRIPT, Pa11yRaw, assess_pa11y);
dom_analyzer!(SeoAnalyzer, "seo", Seo, SEO_SCRIPT, SeoFindings, assess_seo);
dom_analyzer!(SocialAnalyzer, "social", Social, SOCIAL_SCRIPT, SocialFindings, assess_social);
dom_analyzer!(TechnicalSeoAnalyzer, "technical_seo", TechnicalSeo, TECHNICAL_SEO_SCRIPT, TechnicalSeoFindings, assess_technical_seo);
dom_analyzer!(SecurityAnalyzer, "security", Security, SECURITY_SCRIPT, SecurityFindings, assess_security);
dom_analyzer!(StructuredDataAnalyzer, "structured_data", StructuredData, STRUCTURED_DATA_SCRIPT, StructuredDataFindings, assess_structured_data);
dom_analyzer!(MobileAnalyzer, "mobile", Mobile, MOBILE_SCRIPT, MobileFindings, assess_mobile);

// =============================================================================
// Raw script payloads that carry more than the section itself
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AccessibilityRaw {
    #[serde(flatten)]
    pub findings: AccessibilityFindings,
    pub missing_alt_selectors: Vec<String>,
    pub unlabeled_selectors: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Pa11yRaw {
    /// `(rule, violating element count)` pairs
    pub rules: Vec<(String, usize)>,
    pub notices: usize,
}

// =============================================================================
// Scoring
// =============================================================================

fn clamp_score(deductions: f32) -> f32 {
    (100.0 - deductions).clamp(0.0, 100.0)
}

fn capped(count: usize, each: f32, cap: f32) -> f32 {
    (count as f32 * each).min(cap)
}

fn flag(condition: bool, points: f32) -> f32 {
    if condition { points } else { 0.0 }
}

/// One issue per offending selector, or a single summary issue without them
fn per_element(
    code: &str,
    message: &str,
    severity: Severity,
    count: usize,
    selectors: Vec<String>,
) -> Vec<AuditIssue> {
    if count == 0 {
        return Vec::new();
    }
    if selectors.is_empty() {
        return vec![AuditIssue::new(
            code,
            format!("{message} ({count} elements)"),
            severity,
        )];
    }
    selectors
        .into_iter()
        .map(|s| AuditIssue::new(code, message, severity).with_selector(s))
        .collect()
}

pub fn assess_accessibility(raw: AccessibilityRaw) -> AnalysisResult {
    let mut f = raw.findings;
    let mut errors = per_element(
        "image-alt",
        "Image has no alt attribute",
        Severity::Serious,
        f.images_missing_alt,
        raw.missing_alt_selectors,
    );
    errors.extend(per_element(
        "label",
        "Form control has no accessible label",
        Severity::Critical,
        f.form_controls_unlabeled,
        raw.unlabeled_selectors,
    ));
    if !f.has_lang {
        errors.push(AuditIssue::new(
            "html-has-lang",
            "<html> element has no lang attribute",
            Severity::Serious,
        ));
    }

    let mut warnings = Vec::new();
    if f.headings_total == 0 {
        warnings.push(AuditIssue::new(
            "page-has-heading",
            "Page has no headings",
            Severity::Moderate,
        ));
    }
    if f.landmarks_total == 0 {
        warnings.push(AuditIssue::new(
            "region",
            "Page has no landmark regions",
            Severity::Minor,
        ));
    }

    f.score = clamp_score(
        capped(f.images_missing_alt, 5.0, 40.0)
            + capped(f.form_controls_unlabeled, 10.0, 30.0)
            + flag(!f.has_lang, 10.0)
            + flag(f.headings_total == 0, 10.0)
            + flag(f.landmarks_total == 0, 5.0),
    );

    AnalysisResult::new(AnalysisSection::Accessibility(f))
        .with_errors(errors)
        .with_warnings(warnings)
}

pub fn assess_performance(mut m: PerformanceMetrics) -> AnalysisResult {
    let load = if m.load_complete_ms > 0.0 {
        m.load_complete_ms
    } else {
        m.dom_content_loaded_ms
    };
    m.score = if load <= 1_000.0 {
        100.0
    } else if load >= 10_000.0 {
        0.0
    } else {
        (100.0 * (10_000.0 - load) / 9_000.0) as f32
    };

    let mut warnings = Vec::new();
    if m.time_to_first_byte_ms > 800.0 {
        warnings.push(AuditIssue::new(
            "slow-ttfb",
            format!("Time to first byte is {:.0} ms", m.time_to_first_byte_ms),
            Severity::Moderate,
        ));
    }
    if let Some(fcp) = m.first_contentful_paint_ms
        && fcp > 3_000.0
    {
        warnings.push(AuditIssue::new(
            "slow-fcp",
            format!("First contentful paint is {fcp:.0} ms"),
            Severity::Moderate,
        ));
    }
    if m.transfer_size_bytes > 5 * 1024 * 1024 {
        warnings.push(AuditIssue::new(
            "page-weight",
            format!("Page transferred {} bytes", m.transfer_size_bytes),
            Severity::Minor,
        ));
    }

    AnalysisResult::new(AnalysisSection::Performance(m)).with_warnings(warnings)
}

pub fn assess_pa11y(raw: Pa11yRaw) -> AnalysisResult {
    let rules_checked = raw.rules.len();
    let failing: Vec<&(String, usize)> = raw.rules.iter().filter(|(_, n)| *n > 0).collect();
    let violations = failing.iter().map(|(_, n)| n).sum();

    let errors = failing
        .iter()
        .map(|(rule, n)| {
            AuditIssue::new(
                rule.as_str(),
                format!("{n} element(s) violate rule {rule}"),
                Severity::Serious,
            )
        })
        .collect();

    let score = if rules_checked == 0 {
        100.0
    } else {
        100.0 * (rules_checked - failing.len()) as f32 / rules_checked as f32
    };

    AnalysisResult::new(AnalysisSection::Pa11y(Pa11yFindings {
        score,
        rules_checked,
        violations,
        notices: raw.notices,
    }))
    .with_errors(errors)
}

pub fn assess_seo(mut f: SeoFindings) -> AnalysisResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let title_len = f.title.as_deref().map_or(0, |t| t.chars().count());
    if f.title.is_none() {
        errors.push(AuditIssue::new(
            "seo-title",
            "Page has no <title>",
            Severity::Serious,
        ));
    } else if title_len > 60 {
        warnings.push(AuditIssue::new(
            "seo-title-length",
            format!("Title is {title_len} characters long"),
            Severity::Minor,
        ));
    }
    if f.meta_description.is_none() {
        warnings.push(AuditIssue::new(
            "seo-meta-description",
            "Page has no meta description",
            Severity::Moderate,
        ));
    }
    if f.h1_count != 1 {
        warnings.push(AuditIssue::new(
            "seo-h1",
            format!("Page has {} <h1> elements, expected 1", f.h1_count),
            Severity::Moderate,
        ));
    }
    if f.word_count < 300 {
        warnings.push(AuditIssue::new(
            "seo-thin-content",
            format!("Page has only {} words", f.word_count),
            Severity::Minor,
        ));
    }

    f.score = clamp_score(
        flag(f.title.is_none(), 30.0)
            + flag(title_len > 60, 5.0)
            + flag(f.meta_description.is_none(), 20.0)
            + flag(f.h1_count != 1, 15.0)
            + flag(f.word_count < 300, 10.0),
    );

    AnalysisResult::new(AnalysisSection::Seo(f))
        .with_errors(errors)
        .with_warnings(warnings)
}

pub fn assess_social(mut f: SocialFindings) -> AnalysisResult {
    let mut warnings = Vec::new();
    if f.open_graph_tags == 0 {
        warnings.push(AuditIssue::new(
            "og-missing",
            "No Open Graph tags",
            Severity::Minor,
        ));
    }
    if !f.has_og_image {
        warnings.push(AuditIssue::new(
            "og-image-missing",
            "No og:image tag",
            Severity::Minor,
        ));
    }
    if f.twitter_tags == 0 {
        warnings.push(AuditIssue::new(
            "twitter-card-missing",
            "No Twitter card tags",
            Severity::Minor,
        ));
    }

    f.score = (f.open_graph_tags.min(4) as f32 * 15.0
        + flag(f.twitter_tags > 0, 20.0)
        + flag(f.has_og_image, 20.0))
    .min(100.0);

    AnalysisResult::new(AnalysisSection::Social(f)).with_warnings(warnings)
}

pub fn assess_technical_seo(mut f: TechnicalSeoFindings) -> AnalysisResult {
    let mut warnings = Vec::new();
    if f.noindex {
        warnings.push(AuditIssue::new(
            "noindex",
            "Page is excluded from indexing by robots meta",
            Severity::Serious,
        ));
    }
    if f.canonical.is_none() {
        warnings.push(AuditIssue::new(
            "canonical-missing",
            "No canonical link",
            Severity::Minor,
        ));
    }
    if f.internal_links == 0 {
        warnings.push(AuditIssue::new(
            "no-internal-links",
            "Page links to no other page on the site",
            Severity::Minor,
        ));
    }

    f.score = clamp_score(
        flag(f.noindex, 40.0) + flag(f.canonical.is_none(), 15.0) + flag(f.internal_links == 0, 10.0),
    );

    AnalysisResult::new(AnalysisSection::TechnicalSeo(f)).with_warnings(warnings)
}

pub fn assess_security(mut f: SecurityFindings) -> AnalysisResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !f.https {
        errors.push(AuditIssue::new(
            "no-https",
            "Page is not served over HTTPS",
            Severity::Serious,
        ));
    }
    if f.mixed_content_count > 0 {
        errors.push(AuditIssue::new(
            "mixed-content",
            format!("{} resources loaded over HTTP", f.mixed_content_count),
            Severity::Serious,
        ));
    }
    if f.insecure_form_actions > 0 {
        errors.push(AuditIssue::new(
            "insecure-form",
            format!("{} forms submit over HTTP", f.insecure_form_actions),
            Severity::Critical,
        ));
    }
    if f.external_scripts_without_integrity > 0 {
        warnings.push(AuditIssue::new(
            "sri-missing",
            format!(
                "{} third-party scripts have no integrity attribute",
                f.external_scripts_without_integrity
            ),
            Severity::Minor,
        ));
    }

    f.score = clamp_score(
        flag(!f.https, 50.0)
            + capped(f.mixed_content_count, 10.0, 30.0)
            + capped(f.insecure_form_actions, 15.0, 30.0)
            + capped(f.external_scripts_without_integrity, 2.0, 10.0),
    );

    AnalysisResult::new(AnalysisSection::Security(f))
        .with_errors(errors)
        .with_warnings(warnings)
}

pub fn assess_structured_data(mut f: StructuredDataFindings) -> AnalysisResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let has_any = f.json_ld_blocks > 0 || f.microdata_items > 0;
    if !has_any {
        warnings.push(AuditIssue::new(
            "no-structured-data",
            "Page has no structured data",
            Severity::Minor,
        ));
    }
    if f.invalid_json_ld_blocks > 0 {
        errors.push(AuditIssue::new(
            "invalid-json-ld",
            format!("{} JSON-LD blocks do not parse", f.invalid_json_ld_blocks),
            Severity::Moderate,
        ));
    }

    f.score = if has_any {
        clamp_score(f.invalid_json_ld_blocks as f32 * 25.0)
    } else {
        50.0
    };

    AnalysisResult::new(AnalysisSection::StructuredData(f))
        .with_errors(errors)
        .with_warnings(warnings)
}

pub fn assess_mobile(mut f: MobileFindings) -> AnalysisResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !f.has_viewport_meta {
        errors.push(AuditIssue::new(
            "meta-viewport",
            "Page has no viewport meta tag",
            Severity::Serious,
        ));
    }
    if f.horizontal_overflow {
        warnings.push(AuditIssue::new(
            "horizontal-overflow",
            "Content is wider than the viewport",
            Severity::Moderate,
        ));
    }
    if f.small_tap_targets > 0 {
        warnings.push(AuditIssue::new(
            "tap-target-size",
            format!("{} tap targets are smaller than 24px", f.small_tap_targets),
            Severity::Minor,
        ));
    }
    let small_font = f.base_font_size_px.is_some_and(|px| px < 12.0);
    if small_font {
        warnings.push(AuditIssue::new(
            "font-size",
            "Base font size is below 12px",
            Severity::Moderate,
        ));
    }

    f.score = clamp_score(
        flag(!f.has_viewport_meta, 40.0)
            + flag(f.horizontal_overflow, 20.0)
            + capped(f.small_tap_targets, 2.0, 20.0)
            + flag(small_font, 10.0),
    );

    AnalysisResult::new(AnalysisSection::Mobile(f))
        .with_errors(errors)
        .with_warnings(warnings)
}
