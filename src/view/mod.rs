//! Template rendering collaborators
//!
//! Drivers never talk to a template language directly. They ask a
//! [`ViewEngine`] for a [`Renderer`] bound to a directory, optionally point it
//! at an override directory, expose a few helper functions, and render named
//! templates with their parameter tree as data.

pub mod jinja;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub use jinja::{JinjaEngine, JinjaRenderer};

/// Zero-argument function callable from templates
pub type Helper = Arc<dyn Fn() -> String + Send + Sync>;

/// Shared, mutable renderer as memoized by drivers
pub type RendererHandle = Rc<RefCell<dyn Renderer>>;

/// Errors raised by a renderer
#[derive(Debug, Error)]
pub enum ViewError {
    /// Neither the override nor the primary directory holds the template
    #[error("template [{name}] not found")]
    TemplateNotFound { name: String },

    /// The engine failed while loading or evaluating the template
    #[error("failed to render template [{name}]: {message}")]
    Render { name: String, message: String },
}

/// A template renderer bound to one primary directory
pub trait Renderer {
    /// Templates found here win over same-named templates in the primary directory
    fn set_override_directory(&mut self, path: &Path);

    /// Template compiled into the binary, used when no directory provides `name`
    fn add_embedded_template(&mut self, name: &str, source: &'static str);

    /// Expose `helper` to templates under `name`, replacing any previous helper
    fn register_helper(&mut self, name: &str, helper: Helper);

    /// Render the template `template` with `data` as its context
    fn render(&self, template: &str, data: &Value) -> Result<String, ViewError>;
}

/// Factory for renderers
pub trait ViewEngine {
    fn create_renderer(&self, directory: &Path) -> RendererHandle;
}
