//! Newtype domain identifiers.
//!
//! Every named thing in the pipeline is a distinct newtype wrapping a
//! primitive, so a [`StageName`] can never be passed where a [`PipelineName`]
//! or a [`SourceLocator`] is expected even though all three are strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a validated `String` newtype.
///
/// `new` returns `None` when `$accepts` rejects the input; the value is
/// otherwise stored untouched.
macro_rules! validated_text {
    (
        $(#[$meta:meta])*
        $ty:ident, accepts = $accepts:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $ty(String);

        impl $ty {
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let value = value.into();
                let accepts: fn(&str) -> bool = $accepts;
                accepts(&value).then_some(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

validated_text! {
    /// A stage's registered name, unique within one graph (e.g. `"drafting"`).
    StageName, accepts = |v: &str| !v.is_empty()
}

validated_text! {
    /// Name of a pipeline definition, used in log spans (e.g. `"research"`).
    PipelineName, accepts = |v: &str| !v.is_empty()
}

validated_text! {
    /// Where retrieved content came from, normally a URL.
    ///
    /// Must be non-empty and free of whitespace. Search adapters drop hits
    /// whose locator fails this check rather than failing the whole batch.
    SourceLocator, accepts = |v: &str| !v.is_empty() && !v.contains(char::is_whitespace)
}

/// Identifies a single pipeline invocation.
///
/// Generated fresh by the executor for every run and attached to its tracing
/// span and to any [`crate::StageExecutionError`] it returns, so all activity
/// from one run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineRunId(Uuid);

impl PipelineRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`PipelineRunId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for PipelineRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
