//! Heading rules that pick ToC entries out of the span stream.

use serde::Deserialize;
use thiserror::Error;

use crate::span::Span;
use crate::toc::HeadingLevel;

/// Default absolute tolerance when comparing font sizes.
pub const DEFAULT_SIZE_TOLERANCE: f64 = 1e-5;

#[derive(Debug, Error, PartialEq)]
pub enum RecipeError {
    #[error("heading #{index}: filter's 'level' is not set")]
    MissingLevel { index: usize },
    #[error("heading #{index}: filter's 'level' must be >= 1, got {level}")]
    InvalidLevel { index: usize, level: i64 },
    #[error("heading #{index}: 'font.size_tolerance' must be a finite number >= 0, got {tolerance}")]
    InvalidTolerance { index: usize, tolerance: f64 },
    #[error("invalid recipe: {0}")]
    Toml(String),
}

/// One `[[heading]]` table exactly as written in a recipe.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FilterSpec {
    pub level: Option<i64>,
    #[serde(default)]
    pub greedy: bool,
    #[serde(default)]
    pub font: FontSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FontSpec {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub size_tolerance: Option<f64>,
}

/// A validated heading rule.
///
/// Unset attributes are wildcards, so a filter with neither a font name nor a
/// font size admits every span.
#[derive(Debug, Clone, PartialEq)]
pub struct ToCFilter {
    pub level: HeadingLevel,
    /// Expand a match to the whole enclosing text block.
    pub greedy: bool,
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub size_tolerance: f64,
}

impl ToCFilter {
    /// A non-greedy wildcard filter at `level`.
    pub fn new(level: HeadingLevel) -> Self {
        ToCFilter {
            level,
            greedy: false,
            font_name: None,
            font_size: None,
            size_tolerance: DEFAULT_SIZE_TOLERANCE,
        }
    }

    pub fn greedy(mut self, greedy: bool) -> Self {
        self.greedy = greedy;
        self
    }

    pub fn font_name(mut self, name: impl Into<String>) -> Self {
        self.font_name = Some(name.into());
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn size_tolerance(mut self, tolerance: f64) -> Self {
        self.size_tolerance = tolerance;
        self
    }

    /// Validate the recipe entry at position `index`.
    pub fn from_spec(spec: FilterSpec, index: usize) -> Result<Self, RecipeError> {
        let level = spec.level.ok_or(RecipeError::MissingLevel { index })?;
        let level = HeadingLevel::try_from(level)
            .map_err(|_| RecipeError::InvalidLevel { index, level })?;

        let size_tolerance = spec.font.size_tolerance.unwrap_or(DEFAULT_SIZE_TOLERANCE);
        if !size_tolerance.is_finite() || size_tolerance < 0.0 {
            return Err(RecipeError::InvalidTolerance {
                index,
                tolerance: size_tolerance,
            });
        }

        Ok(ToCFilter {
            level,
            greedy: spec.greedy,
            font_name: spec.font.name,
            font_size: spec.font.size,
            size_tolerance,
        })
    }

    /// Whether this filter admits `span`.
    ///
    /// Font names compare as exact strings, subset prefixes included.
    pub fn admits(&self, span: &Span) -> bool {
        if let Some(name) = &self.font_name {
            if *name != span.font_name {
                return false;
            }
        }
        admits_float(self.font_size, span.font_size, self.size_tolerance)
    }
}

/// Boundary-inclusive tolerance check; an unset expectation always passes.
pub fn admits_float(expect: Option<f64>, actual: f64, tolerance: f64) -> bool {
    match expect {
        None => true,
        Some(expect) => (expect - actual).abs() <= tolerance,
    }
}
