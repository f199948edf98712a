//! Fixed-schema outputs of the individual analyzers
//!
//! One struct per analyzer. Every section carries a 0-100 `score`; the
//! remaining fields are the raw signals the score was derived from. Missing
//! fields deserialize to their defaults so in-page scripts only report raw
//! signals and leave scoring to Rust.

use serde::{Deserialize, Serialize};

/// Core accessibility signals (always collected)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessibilityFindings {
    pub score: f32,
    pub images_total: usize,
    pub images_missing_alt: usize,
    pub form_controls_unlabeled: usize,
    pub headings_total: usize,
    pub landmarks_total: usize,
    pub has_lang: bool,
}

/// Navigation timing collected from the Performance API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceMetrics {
    pub score: f32,
    pub time_to_first_byte_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_contentful_paint_ms: Option<f64>,
    pub dom_content_loaded_ms: f64,
    pub load_complete_ms: f64,
    pub transfer_size_bytes: u64,
    pub resource_count: usize,
}

/// Extended rule-engine pass (enabled by `use_pa11y`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pa11yFindings {
    pub score: f32,
    pub rules_checked: usize,
    pub violations: usize,
    pub notices: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoFindings {
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    pub h1_count: usize,
    pub word_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialFindings {
    pub score: f32,
    pub open_graph_tags: usize,
    pub twitter_tags: usize,
    pub has_og_image: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalSeoFindings {
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    pub noindex: bool,
    pub hreflang_count: usize,
    pub internal_links: usize,
    pub external_links: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityFindings {
    pub score: f32,
    pub https: bool,
    pub mixed_content_count: usize,
    pub insecure_form_actions: usize,
    pub external_scripts_without_integrity: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredDataFindings {
    pub score: f32,
    pub json_ld_blocks: usize,
    pub invalid_json_ld_blocks: usize,
    pub microdata_items: usize,
    #[serde(default)]
    pub schema_types: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobileFindings {
    pub score: f32,
    pub has_viewport_meta: bool,
    pub small_tap_targets: usize,
    pub horizontal_overflow: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_font_size_px: Option<f64>,
}
