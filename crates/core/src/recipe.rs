//! Recipe loading: an ordered list of [`ToCFilter`]s read from TOML.
//!
//! ```toml
//! [[heading]]
//! level = 1
//! greedy = true
//! font.name = "Times-Bold"
//! font.size = 19.92530059814453
//! ```

use serde::Deserialize;

use crate::filter::{FilterSpec, RecipeError, ToCFilter};
use crate::span::Span;

#[derive(Debug, Default, Deserialize)]
struct RecipeFile {
    #[serde(default)]
    heading: Vec<FilterSpec>,
}

/// An ordered set of heading rules.
///
/// Declaration order only matters for ties: when several filters admit the
/// same span, the one declared first wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipe {
    filters: Vec<ToCFilter>,
}

impl Recipe {
    pub fn new(filters: Vec<ToCFilter>) -> Self {
        Recipe { filters }
    }

    /// Parse and validate a TOML recipe. Every entry is validated before the
    /// recipe is returned, so a bad filter never reaches the span walk.
    pub fn from_toml_str(input: &str) -> Result<Self, RecipeError> {
        let file: RecipeFile =
            toml::from_str(input).map_err(|e| RecipeError::Toml(e.message().to_string()))?;
        Self::from_specs(file.heading)
    }

    pub fn from_specs(specs: Vec<FilterSpec>) -> Result<Self, RecipeError> {
        let filters = specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| ToCFilter::from_spec(spec, index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Recipe { filters })
    }

    pub fn filters(&self) -> &[ToCFilter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// The first declared filter admitting `span`, if any.
    pub fn classify(&self, span: &Span) -> Option<&ToCFilter> {
        self.filters.iter().find(|filter| filter.admits(span))
    }
}
