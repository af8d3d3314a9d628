//! The accumulating State Record threaded through a pipeline run.
//!
//! [`StateRecord`] is the contract the graph and executor are written against:
//! a record with a closed set of fields, updated only through a typed partial
//! record and checked for monotonic growth after every stage.
//!
//! [`ResearchState`] is the record for the research pipeline. Its `query` has
//! no update path, and every other field starts unset and is written by
//! exactly one stage:
//!
//! | Field | Written by |
//! |-------|------------|
//! | `query` | caller (initial) |
//! | `raw_results`, `sources` | retrieval |
//! | `research_notes` | summarization |
//! | `drafted_answer` | drafting |
//! | `final_answer`, `review` | critique |

use std::fmt::{Debug, Display};

use serde::Serialize;

use crate::errors::{EmptyQueryError, MissingFieldError, UnknownFieldError};
use crate::SourceLocator;

// ---------------------------------------------------------------------------
// Generic contract
// ---------------------------------------------------------------------------

/// A partial, append-mostly record of named fields.
///
/// Implementations must make [`Self::merge`] overlay exactly the fields an
/// update sets; the executor verifies the result with [`Self::populated`] and
/// [`Self::same_value`] after every stage.
pub trait StateRecord: Clone + Send + Sync + 'static {
    /// The closed set of field names.
    type Field: Copy + Eq + Debug + Display + Send + Sync + 'static;

    /// A typed partial record produced by one stage.
    type Update: Send + 'static;

    /// Fields currently holding a value.
    fn populated(&self) -> Vec<Self::Field>;

    /// Fields `update` would write if merged.
    fn fields_written(update: &Self::Update) -> Vec<Self::Field>;

    /// Returns a new record equal to `self` with `update` overlaid.
    fn merge(&self, update: Self::Update) -> Self;

    /// Whether `field` holds the same value (or is unset) in both records.
    fn same_value(&self, other: &Self, field: Self::Field) -> bool;
}

// ---------------------------------------------------------------------------
// Research state
// ---------------------------------------------------------------------------

/// Field names of [`ResearchState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Query,
    RawResults,
    Sources,
    ResearchNotes,
    DraftedAnswer,
    FinalAnswer,
    Review,
}

impl Field {
    /// Every field, in pipeline order.
    pub const ALL: [Field; 7] = [
        Field::Query,
        Field::RawResults,
        Field::Sources,
        Field::ResearchNotes,
        Field::DraftedAnswer,
        Field::FinalAnswer,
        Field::Review,
    ];

    /// The snake_case name used in templates and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Query => "query",
            Field::RawResults => "raw_results",
            Field::Sources => "sources",
            Field::ResearchNotes => "research_notes",
            Field::DraftedAnswer => "drafted_answer",
            Field::FinalAnswer => "final_answer",
            Field::Review => "review",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Field {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownFieldError(s.to_owned()))
    }
}

/// A borrowed view of one field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Locators(&'a [SourceLocator]),
}

/// The research pipeline's work product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchState {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_results: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sources: Option<Vec<SourceLocator>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    research_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    drafted_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    review: Option<String>,
}

fn require<'a, T: ?Sized>(
    value: Option<&'a T>,
    field: Field,
) -> Result<&'a T, MissingFieldError> {
    value.ok_or_else(|| MissingFieldError::new(field))
}

impl ResearchState {
    /// Creates the initial state for one invocation.
    ///
    /// The query is trimmed; an empty result is rejected.
    pub fn new(query: impl Into<String>) -> Result<Self, EmptyQueryError> {
        let query = query.into();
        let query = query.trim();
        if query.is_empty() {
            return Err(EmptyQueryError);
        }
        Ok(Self {
            query: query.to_owned(),
            raw_results: None,
            sources: None,
            research_notes: None,
            drafted_answer: None,
            final_answer: None,
            review: None,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn raw_results(&self) -> Result<&str, MissingFieldError> {
        require(self.raw_results.as_deref(), Field::RawResults)
    }

    pub fn sources(&self) -> Result<&[SourceLocator], MissingFieldError> {
        require(self.sources.as_deref(), Field::Sources)
    }

    pub fn research_notes(&self) -> Result<&str, MissingFieldError> {
        require(self.research_notes.as_deref(), Field::ResearchNotes)
    }

    pub fn drafted_answer(&self) -> Result<&str, MissingFieldError> {
        require(self.drafted_answer.as_deref(), Field::DraftedAnswer)
    }

    pub fn final_answer(&self) -> Result<&str, MissingFieldError> {
        require(self.final_answer.as_deref(), Field::FinalAnswer)
    }

    pub fn review(&self) -> Result<&str, MissingFieldError> {
        require(self.review.as_deref(), Field::Review)
    }

    /// Reads any field by name.
    pub fn get(&self, field: Field) -> Result<FieldValue<'_>, MissingFieldError> {
        Ok(match field {
            Field::Query => FieldValue::Text(self.query()),
            Field::RawResults => FieldValue::Text(self.raw_results()?),
            Field::Sources => FieldValue::Locators(self.sources()?),
            Field::ResearchNotes => FieldValue::Text(self.research_notes()?),
            Field::DraftedAnswer => FieldValue::Text(self.drafted_answer()?),
            Field::FinalAnswer => FieldValue::Text(self.final_answer()?),
            Field::Review => FieldValue::Text(self.review()?),
        })
    }

    /// Whether `field` currently holds a value.
    pub fn has(&self, field: Field) -> bool {
        self.get(field).is_ok()
    }
}

/// Fields a stage writes into [`ResearchState`].
///
/// There is deliberately no `query` member: the query cannot be replaced once
/// the state exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchUpdate {
    pub raw_results: Option<String>,
    pub sources: Option<Vec<SourceLocator>>,
    pub research_notes: Option<String>,
    pub drafted_answer: Option<String>,
    pub final_answer: Option<String>,
    pub review: Option<String>,
}

impl ResearchUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw_results(mut self, value: impl Into<String>) -> Self {
        self.raw_results = Some(value.into());
        self
    }

    pub fn sources(mut self, value: Vec<SourceLocator>) -> Self {
        self.sources = Some(value);
        self
    }

    pub fn research_notes(mut self, value: impl Into<String>) -> Self {
        self.research_notes = Some(value.into());
        self
    }

    pub fn drafted_answer(mut self, value: impl Into<String>) -> Self {
        self.drafted_answer = Some(value.into());
        self
    }

    pub fn final_answer(mut self, value: impl Into<String>) -> Self {
        self.final_answer = Some(value.into());
        self
    }

    pub fn review(mut self, value: impl Into<String>) -> Self {
        self.review = Some(value.into());
        self
    }
}

impl StateRecord for ResearchState {
    type Field = Field;
    type Update = ResearchUpdate;

    fn populated(&self) -> Vec<Field> {
        Field::ALL.into_iter().filter(|f| self.has(*f)).collect()
    }

    fn fields_written(update: &ResearchUpdate) -> Vec<Field> {
        let mut written = Vec::new();
        if update.raw_results.is_some() {
            written.push(Field::RawResults);
        }
        if update.sources.is_some() {
            written.push(Field::Sources);
        }
        if update.research_notes.is_some() {
            written.push(Field::ResearchNotes);
        }
        if update.drafted_answer.is_some() {
            written.push(Field::DraftedAnswer);
        }
        if update.final_answer.is_some() {
            written.push(Field::FinalAnswer);
        }
        if update.review.is_some() {
            written.push(Field::Review);
        }
        written
    }

    fn merge(&self, update: ResearchUpdate) -> Self {
        let mut next = self.clone();
        // Each `or` keeps the existing value when the update leaves a field unset.
        next.raw_results = update.raw_results.or(next.raw_results);
        next.sources = update.sources.or(next.sources);
        next.research_notes = update.research_notes.or(next.research_notes);
        next.drafted_answer = update.drafted_answer.or(next.drafted_answer);
        next.final_answer = update.final_answer.or(next.final_answer);
        next.review = update.review.or(next.review);
        next
    }

    fn same_value(&self, other: &Self, field: Field) -> bool {
        match (self.get(field), other.get(field)) {
            (Ok(a), Ok(b)) => a == b,
            (Err(_), Err(_)) => true,
            _ => false,
        }
    }
}
