//! Shared value types for the research pipeline domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! values with invariants (a temperature is within `[0.0, 2.0]`, a credential
//! is never empty and never printed).

use serde::{Deserialize, Serialize};

use crate::SourceLocator;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// A provider credential read from the environment.
///
/// The value never appears in `Debug` output, so configuration structs that
/// hold one can be logged freely.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Creates an [`ApiKey`], returning `None` if the trimmed value is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// Returns the raw credential for use in an outgoing request.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Sampling temperature passed to the generation provider, in `[0.0, 2.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Temperature(f32);

impl Temperature {
    /// Creates a [`Temperature`], returning `None` if `value` is outside
    /// `[0.0, 2.0]` or not finite.
    #[must_use]
    pub fn new(value: f32) -> Option<Self> {
        if value.is_finite() && (0.0..=2.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the temperature as an `f32`.
    pub fn as_f32(self) -> f32 {
        self.0
    }
}

impl Default for Temperature {
    fn default() -> Self {
        Self(0.3)
    }
}

impl std::fmt::Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// One record returned by a [`crate::SearchProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Text content extracted from the result.
    pub content: String,

    /// Where the content came from. `None` when the provider supplied no
    /// usable locator; such hits still contribute content but no source.
    pub locator: Option<SourceLocator>,
}

impl SearchHit {
    /// Creates a hit with a locator.
    pub fn new(content: impl Into<String>, locator: SourceLocator) -> Self {
        Self {
            content: content.into(),
            locator: Some(locator),
        }
    }

    /// Creates a hit that has no locator.
    pub fn without_locator(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            locator: None,
        }
    }
}
