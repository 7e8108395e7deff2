//! Tunables for the extraction cascade.
//!
//! Every field has a default matching the behaviour described in the crate
//! docs, so an empty TOML document (or [`ExtractionConfig::default`]) is a
//! valid configuration. Durations are expressed in milliseconds to keep the
//! TOML form flat.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;
use crate::TocError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Pause after the handle is obtained, before the stability check.
    pub settle_delay_ms: u64,
    pub retry: RetryConfig,
    pub bookmarks: BookmarkConfig,
    pub contents: ContentsConfig,
    pub fonts: FontConfig,
    pub fallback: FallbackConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            settle_delay_ms: 300,
            retry: RetryConfig::default(),
            bookmarks: BookmarkConfig::default(),
            contents: ContentsConfig::default(),
            fonts: FontConfig::default(),
            fallback: FallbackConfig::default(),
        }
    }
}

impl ExtractionConfig {
    pub fn from_toml(text: &str) -> Result<Self, TocError> {
        let config: ExtractionConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, TocError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Reject settings that would make a stage unable to terminate or to
    /// produce anything at all.
    pub fn validate(&self) -> Result<(), TocError> {
        if self.retry.attempts == 0 {
            return Err(TocError::Config("retry.attempts must be at least 1".into()));
        }
        if self.fallback.min_sections == 0 || self.fallback.min_sections > self.fallback.max_sections
        {
            return Err(TocError::Config(format!(
                "fallback sections must satisfy 1 <= min ({}) <= max ({})",
                self.fallback.min_sections, self.fallback.max_sections
            )));
        }
        if self.fallback.pages_per_section == 0 {
            return Err(TocError::Config(
                "fallback.pages_per_section must be positive".into(),
            ));
        }
        if self.contents.line_tolerance <= 0.0 {
            return Err(TocError::Config(
                "contents.line_tolerance must be positive".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.fonts.scoring.medium_percentile) {
            return Err(TocError::Config(
                "fonts.scoring.medium_percentile must be in [0, 1)".into(),
            ));
        }
        Ok(())
    }
}

/// Retry and timeout settings applied to every call into the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    /// Backoff before attempt `n + 1` is `backoff_ms * n`.
    pub backoff_ms: u64,
    pub operation_timeout_ms: u64,
    pub outline_timeout_ms: u64,
    pub load_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            attempts: 3,
            backoff_ms: 200,
            operation_timeout_ms: 5_000,
            outline_timeout_ms: 5_000,
            load_timeout_ms: 30_000,
        }
    }
}

impl RetryConfig {
    fn policy(&self, timeout_ms: u64) -> RetryPolicy {
        RetryPolicy {
            attempts: self.attempts,
            base_delay: Duration::from_millis(self.backoff_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Policy for page, text-content and destination calls.
    pub fn operation(&self) -> RetryPolicy {
        self.policy(self.operation_timeout_ms)
    }

    pub fn outline(&self) -> RetryPolicy {
        self.policy(self.outline_timeout_ms)
    }

    pub fn load(&self) -> RetryPolicy {
        self.policy(self.load_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookmarkConfig {
    pub max_depth: u8,
    pub max_siblings: usize,
    pub min_title_len: usize,
    pub max_title_len: usize,
}

impl Default for BookmarkConfig {
    fn default() -> Self {
        BookmarkConfig {
            max_depth: 5,
            max_siblings: 50,
            min_title_len: 2,
            max_title_len: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentsConfig {
    pub max_pages: usize,
    pub max_entries: usize,
    pub min_title_len: usize,
    pub max_title_len: usize,
    /// Baselines closer than this (in text-space units) share a line.
    pub line_tolerance: f32,
}

impl Default for ContentsConfig {
    fn default() -> Self {
        ContentsConfig {
            max_pages: 15,
            max_entries: 30,
            min_title_len: 3,
            max_title_len: 100,
            line_tolerance: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub max_pages: usize,
    pub baseline_pages: usize,
    pub min_distinct_sizes: usize,
    pub max_entries: usize,
    pub min_confidence: f32,
    pub scoring: ScoringPolicy,
}

impl Default for FontConfig {
    fn default() -> Self {
        FontConfig {
            max_pages: 20,
            baseline_pages: 5,
            min_distinct_sizes: 3,
            max_entries: 15,
            min_confidence: 2.0,
            scoring: ScoringPolicy::default(),
        }
    }
}

/// Weights used to score heading candidates in the font-structure stage.
///
/// The scoring function itself lives next to the analyzer
/// (`extract::fonts`); this type only carries the numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub large_weight: f32,
    pub medium_weight: f32,
    pub above_average_weight: f32,
    pub bold_weight: f32,
    pub pattern_weight: f32,
    /// A size counts as a heading tier when it reaches this share of the tier size.
    pub tier_ratio: f32,
    /// Sizes strictly above `average * above_average_ratio` get the smallest bonus.
    pub above_average_ratio: f32,
    /// Position of the medium heading size in the descending unique-size list.
    pub medium_percentile: f32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        ScoringPolicy {
            large_weight: 3.0,
            medium_weight: 2.0,
            above_average_weight: 1.0,
            bold_weight: 1.0,
            pattern_weight: 2.0,
            tier_ratio: 0.95,
            above_average_ratio: 1.2,
            medium_percentile: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub min_sections: usize,
    pub max_sections: usize,
    pub pages_per_section: usize,
    pub max_label_len: usize,
    /// How many top-of-page lines are tried as a section label.
    pub probe_lines: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        FallbackConfig {
            min_sections: 2,
            max_sections: 6,
            pages_per_section: 20,
            max_label_len: 60,
            probe_lines: 3,
        }
    }
}
