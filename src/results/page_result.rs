//! Merged per-page audit output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::issue::AuditIssue;
use super::sections::{
    AccessibilityFindings, MobileFindings, Pa11yFindings, PerformanceMetrics, SecurityFindings,
    SeoFindings, SocialFindings, StructuredDataFindings, TechnicalSeoFindings,
};
use crate::config::AnalyzerFlags;

/// One optional analyzer field of [`AccessibilityResult`]
///
/// Lets the completeness checker enumerate the fields a page should carry
/// given its flags, instead of inferring them from whatever happens to be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultField {
    Accessibility,
    Performance,
    Pa11y,
    Seo,
    Social,
    TechnicalSeo,
    Security,
    StructuredData,
    Mobile,
}

impl ResultField {
    pub const ALL: [Self; 9] = [
        Self::Accessibility,
        Self::Performance,
        Self::Pa11y,
        Self::Seo,
        Self::Social,
        Self::TechnicalSeo,
        Self::Security,
        Self::StructuredData,
        Self::Mobile,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Accessibility => "accessibility",
            Self::Performance => "performance",
            Self::Pa11y => "pa11y",
            Self::Seo => "seo",
            Self::Social => "social",
            Self::TechnicalSeo => "technical_seo",
            Self::Security => "security",
            Self::StructuredData => "structured_data",
            Self::Mobile => "mobile",
        }
    }

    /// The accessibility pass is the audit itself; a page without it has not
    /// been audited.
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::Accessibility)
    }

    #[must_use]
    pub const fn enabled_by(self, flags: &AnalyzerFlags) -> bool {
        match self {
            Self::Accessibility => true,
            Self::Performance => flags.collect_performance_metrics,
            Self::Pa11y => flags.use_pa11y,
            Self::Seo => flags.include_seo_analysis,
            Self::Social => flags.include_social_analysis,
            Self::TechnicalSeo => flags.include_technical_seo,
            Self::Security => flags.include_security_analysis,
            Self::StructuredData => flags.include_structured_data,
            Self::Mobile => flags.include_mobile_analysis,
        }
    }

    /// Fields a result produced under `flags` is expected to carry
    #[must_use]
    pub fn expected_for(flags: &AnalyzerFlags) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|field| field.enabled_by(flags))
            .collect()
    }

    #[must_use]
    pub fn is_present(self, result: &AccessibilityResult) -> bool {
        match self {
            Self::Accessibility => result.accessibility.is_some(),
            Self::Performance => result.performance.is_some(),
            Self::Pa11y => result.pa11y.is_some(),
            Self::Seo => result.seo.is_some(),
            Self::Social => result.social.is_some(),
            Self::TechnicalSeo => result.technical_seo.is_some(),
            Self::Security => result.security.is_some(),
            Self::StructuredData => result.structured_data.is_some(),
            Self::Mobile => result.mobile.is_some(),
        }
    }
}

impl std::fmt::Display for ResultField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Output of one analyzer section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalysisSection {
    Accessibility(AccessibilityFindings),
    Performance(PerformanceMetrics),
    Pa11y(Pa11yFindings),
    Seo(SeoFindings),
    Social(SocialFindings),
    TechnicalSeo(TechnicalSeoFindings),
    Security(SecurityFindings),
    StructuredData(StructuredDataFindings),
    Mobile(MobileFindings),
}

impl AnalysisSection {
    #[must_use]
    pub const fn field(&self) -> ResultField {
        match self {
            Self::Accessibility(_) => ResultField::Accessibility,
            Self::Performance(_) => ResultField::Performance,
            Self::Pa11y(_) => ResultField::Pa11y,
            Self::Seo(_) => ResultField::Seo,
            Self::Social(_) => ResultField::Social,
            Self::TechnicalSeo(_) => ResultField::TechnicalSeo,
            Self::Security(_) => ResultField::Security,
            Self::StructuredData(_) => ResultField::StructuredData,
            Self::Mobile(_) => ResultField::Mobile,
        }
    }
}

/// What a single analyzer returns: its section plus the issues it found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub section: AnalysisSection,
    #[serde(default)]
    pub errors: Vec<AuditIssue>,
    #[serde(default)]
    pub warnings: Vec<AuditIssue>,
}

impl AnalysisResult {
    #[must_use]
    pub fn new(section: AnalysisSection) -> Self {
        Self {
            section,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<AuditIssue>) -> Self {
        self.errors = errors;
        self
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<AuditIssue>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// An analyzer that failed without taking the page down with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerFailure {
    pub analyzer: String,
    pub field: ResultField,
    pub message: String,
}

/// Merged output of all enabled analyzers for one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityResult {
    pub url: String,
    pub timestamp: DateTime<Utc>,
    /// Analyzer flags that were active when this result was produced
    pub flags: AnalyzerFlags,
    #[serde(default)]
    pub errors: Vec<AuditIssue>,
    #[serde(default)]
    pub warnings: Vec<AuditIssue>,
    pub error_count: usize,
    pub warning_count: usize,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<AccessibilityFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pa11y: Option<Pa11yFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo: Option<SeoFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social: Option<SocialFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_seo: Option<TechnicalSeoFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<StructuredDataFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<MobileFindings>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analyzer_failures: Vec<AnalyzerFailure>,
}

impl AccessibilityResult {
    /// Empty result for `url`; fields are filled in by [`Self::merge`]
    #[must_use]
    pub fn new(url: impl Into<String>, flags: AnalyzerFlags) -> Self {
        Self {
            url: url.into(),
            timestamp: Utc::now(),
            flags,
            errors: Vec::new(),
            warnings: Vec::new(),
            error_count: 0,
            warning_count: 0,
            duration_ms: 0,
            accessibility: None,
            performance: None,
            pa11y: None,
            seo: None,
            social: None,
            technical_seo: None,
            security: None,
            structured_data: None,
            mobile: None,
            analyzer_failures: Vec::new(),
        }
    }

    /// Fold one analyzer's output into this result
    pub fn merge(&mut self, analysis: AnalysisResult) {
        match analysis.section {
            AnalysisSection::Accessibility(s) => self.accessibility = Some(s),
            AnalysisSection::Performance(s) => self.performance = Some(s),
            AnalysisSection::Pa11y(s) => self.pa11y = Some(s),
            AnalysisSection::Seo(s) => self.seo = Some(s),
            AnalysisSection::Social(s) => self.social = Some(s),
            AnalysisSection::TechnicalSeo(s) => self.technical_seo = Some(s),
            AnalysisSection::Security(s) => self.security = Some(s),
            AnalysisSection::StructuredData(s) => self.structured_data = Some(s),
            AnalysisSection::Mobile(s) => self.mobile = Some(s),
        }
        self.errors.extend(analysis.errors);
        self.warnings.extend(analysis.warnings);
    }

    pub fn record_failure(&mut self, failure: AnalyzerFailure) {
        self.analyzer_failures.push(failure);
    }

    /// Seal the result: derive counts from the issue lists and stamp duration
    pub fn finalize(&mut self, duration_ms: u64) {
        self.error_count = self.errors.len();
        self.warning_count = self.warnings.len();
        self.duration_ms = duration_ms;
    }

    #[must_use]
    pub fn has_blocking_errors(&self) -> bool {
        self.errors.iter().any(|e| e.severity.is_blocking())
    }

    /// Scores of every present section, in [`ResultField::ALL`] order
    #[must_use]
    pub fn section_scores(&self) -> Vec<(ResultField, f32)> {
        let mut scores = Vec::with_capacity(ResultField::ALL.len());
        if let Some(s) = &self.accessibility {
            scores.push((ResultField::Accessibility, s.score));
        }
        if let Some(s) = &self.performance {
            scores.push((ResultField::Performance, s.score));
        }
        if let Some(s) = &self.pa11y {
            scores.push((ResultField::Pa11y, s.score));
        }
        if let Some(s) = &self.seo {
            scores.push((ResultField::Seo, s.score));
        }
        if let Some(s) = &self.social {
            scores.push((ResultField::Social, s.score));
        }
        if let Some(s) = &self.technical_seo {
            scores.push((ResultField::TechnicalSeo, s.score));
        }
        if let Some(s) = &self.security {
            scores.push((ResultField::Security, s.score));
        }
        if let Some(s) = &self.structured_data {
            scores.push((ResultField::StructuredData, s.score));
        }
        if let Some(s) = &self.mobile {
            scores.push((ResultField::Mobile, s.score));
        }
        scores
    }

    /// Mean of all present section scores, `None` when no section is present
    #[must_use]
    pub fn overall_score(&self) -> Option<f32> {
        let scores = self.section_scores();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().map(|(_, s)| s).sum::<f32>() / scores.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Severity;

    #[test]
    fn merge_and_finalize_keep_counts_in_sync() {
        let mut result = AccessibilityResult::new("https://example.com", AnalyzerFlags::default());
        result.merge(
            AnalysisResult::new(AnalysisSection::Accessibility(AccessibilityFindings {
                score: 90.0,
                ..Default::default()
            }))
            .with_errors(vec![AuditIssue::new("img-alt", "missing alt", Severity::Serious)])
            .with_warnings(vec![
                AuditIssue::new("heading-order", "skipped level", Severity::Moderate),
                AuditIssue::new("landmark", "no main landmark", Severity::Minor),
            ]),
        );
        result.finalize(120);

        assert_eq!(result.error_count, 1);
        assert_eq!(result.warning_count, 2);
        assert_eq!(result.duration_ms, 120);
        assert!(!result.has_blocking_errors());
        assert_eq!(result.overall_score(), Some(90.0));
    }

    #[test]
    fn expected_fields_follow_flags() {
        let flags = AnalyzerFlags {
            collect_performance_metrics: true,
            include_mobile_analysis: true,
            ..Default::default()
        };
        assert_eq!(
            ResultField::expected_for(&flags),
            vec![
                ResultField::Accessibility,
                ResultField::Performance,
                ResultField::Mobile
            ]
        );
    }
}
