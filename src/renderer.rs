//! Template rendering for railgen.
//! Templates use MiniJinja syntax; referencing a value the context does not
//! provide is an error rather than an empty string.
use crate::error::{Error, Result};
use minijinja::{Environment, UndefinedBehavior, Value};

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string with the given context.
    ///
    /// # Arguments
    /// * `name` - Logical name of the template, used in error messages
    /// * `template` - Template string to render
    /// * `context` - Context variables for rendering
    ///
    /// # Returns
    /// * `Result<String>` - Rendered template string
    fn render(&self, name: &str, template: &str, context: &Value) -> Result<String>;
}

/// MiniJinja-based template rendering engine.
#[derive(Debug)]
pub struct MiniJinjaRenderer {
    /// MiniJinja environment instance
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Creates a new renderer with strict undefined handling.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        Self { env }
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        MiniJinjaRenderer::new()
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    /// Renders a template string using MiniJinja.
    ///
    /// # Errors
    /// * `Error::TemplateRender` if the template fails to parse or references
    ///   an undefined value
    fn render(&self, name: &str, template: &str, context: &Value) -> Result<String> {
        let to_error = |source| Error::TemplateRender { name: name.to_string(), source };

        self.env.render_str(template, context).map_err(to_error)
    }
}
