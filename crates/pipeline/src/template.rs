//! Prompt templates: fixed instruction text with `{{field}}` placeholders.
//!
//! Templates are compiled into a [`PromptSet`], a Handlebars registry running
//! in strict mode with HTML escaping turned off. Placeholders name
//! [`ResearchState`] fields; an unset field fails the render instead of
//! producing an empty string, and values are inserted verbatim. `sources`
//! renders one locator per line.

use std::collections::BTreeMap;

use handlebars::{no_escape, Handlebars, RenderError, RenderErrorReason};

use crate::errors::{MissingFieldError, TemplateRenderError};
use crate::identifiers::SourceLocator;
use crate::state::{Field, FieldValue, ResearchState};

const MARK_OPEN: char = '\u{1}';
const MARK_CLOSE: char = '\u{2}';

/// A named instruction template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    name: &'static str,
    text: &'static str,
}

impl PromptTemplate {
    /// Creates a template. The text is checked when registered with a
    /// [`PromptSet`].
    pub const fn new(name: &'static str, text: &'static str) -> Self {
        Self { name, text }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn text(&self) -> &'static str {
        self.text
    }

    /// Returns the fields the template substitutes, in order of appearance.
    ///
    /// # Errors
    ///
    /// [`TemplateRenderError::Syntax`] or
    /// [`TemplateRenderError::UnknownPlaceholder`] if the text is invalid.
    pub fn placeholders(&self) -> Result<Vec<Field>, TemplateRenderError> {
        PromptSet::new().register(self)
    }
}

/// Compiled prompt templates, shared by every stage that renders one.
pub struct PromptSet {
    handlebars: Handlebars<'static>,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PromptSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptSet")
            .field("templates", &self.handlebars.get_templates().keys())
            .finish()
    }
}

impl PromptSet {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(no_escape);
        Self { handlebars }
    }

    /// Compiles `template` and checks that every placeholder names a state
    /// field, returning those fields in order of appearance.
    ///
    /// A template that fails the check is not kept.
    pub fn register(
        &mut self,
        template: &PromptTemplate,
    ) -> Result<Vec<Field>, TemplateRenderError> {
        self.handlebars
            .register_template_string(template.name, template.text)
            .map_err(|e| TemplateRenderError::Syntax {
                template: template.name.to_owned(),
                reason: e.to_string(),
            })?;

        let scanned = self.scan(template.name);
        if scanned.is_err() {
            self.handlebars.unregister_template(template.name);
        }
        scanned
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlebars.has_template(name)
    }

    /// Renders `template` against the populated fields of `state`.
    ///
    /// # Errors
    ///
    /// [`TemplateRenderError::MissingField`] if a placeholder's field is
    /// unset; [`TemplateRenderError::NotRegistered`] if the template was
    /// never registered here.
    pub fn render(
        &self,
        template: &PromptTemplate,
        state: &ResearchState,
    ) -> Result<String, TemplateRenderError> {
        let context: BTreeMap<&str, String> = Field::ALL
            .into_iter()
            .filter_map(|field| Some((field.as_str(), flatten(state.get(field).ok()?))))
            .collect();

        self.handlebars
            .render(template.name, &context)
            .map_err(|e| render_failure(template.name, e))
    }

    /// Renders with a marker for every field and reads back which markers
    /// appear.
    fn scan(&self, name: &str) -> Result<Vec<Field>, TemplateRenderError> {
        let markers: BTreeMap<&str, String> = Field::ALL
            .into_iter()
            .map(|field| (field.as_str(), format!("{MARK_OPEN}{field}{MARK_CLOSE}")))
            .collect();

        let rendered = self
            .handlebars
            .render(name, &markers)
            .map_err(|e| render_failure(name, e))?;

        Ok(rendered
            .split(MARK_OPEN)
            .skip(1)
            .filter_map(|rest| rest.split_once(MARK_CLOSE))
            .filter_map(|(field, _)| field.parse().ok())
            .collect())
    }
}

fn flatten(value: FieldValue<'_>) -> String {
    match value {
        FieldValue::Text(text) => text.to_owned(),
        FieldValue::Locators(locators) => locators
            .iter()
            .map(SourceLocator::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn render_failure(template: &str, err: RenderError) -> TemplateRenderError {
    let template = template.to_owned();
    match err.reason() {
        RenderErrorReason::MissingVariable(Some(path)) => match path.parse::<Field>() {
            Ok(field) => TemplateRenderError::MissingField {
                template,
                source: MissingFieldError::new(field),
            },
            Err(_) => TemplateRenderError::UnknownPlaceholder {
                template,
                placeholder: path.clone(),
            },
        },
        RenderErrorReason::TemplateNotFound(_) => TemplateRenderError::NotRegistered { template },
        _ => TemplateRenderError::Syntax {
            template,
            reason: err.to_string(),
        },
    }
}
