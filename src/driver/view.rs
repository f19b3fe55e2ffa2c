//! View resolution for drivers
//!
//! The renderer is resolved once per instance. The primary directory comes
//! from the first candidate that exists:
//!
//! 1. `view.directory` from the instance parameters
//! 2. the manager's global `view.directory` joined with the alias
//! 3. the driver type's built-in directory
//!
//! A driver carrying embedded templates falls back to its built-in
//! directory path even when that directory is missing; the renderer then
//! serves the embedded copies.
//!
//! The override directory follows the same order against
//! `view.override_dir` (without a built-in fallback). A renderer handle
//! stored directly under `view` skips directory resolution entirely.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;

use crate::error::PartialError;
use crate::params::Param;
use crate::view::{JinjaEngine, RendererHandle, ViewEngine};

use super::PartialDriver;

/// Helpers exposed to every driver template
pub const HELPER_NAMES: [&str; 5] = ["before", "after", "getAlias", "getId", "getIndex"];

/// Snapshot of driver state read by template helpers
#[derive(Debug, Clone, Default)]
pub struct HelperScope {
    pub before: String,
    pub after: String,
    pub alias: String,
    pub id: String,
    pub index: String,
}

impl HelperScope {
    fn value(&self, helper: &str) -> String {
        match helper {
            "before" => self.before.clone(),
            "after" => self.after.clone(),
            "getAlias" => self.alias.clone(),
            "getId" => self.id.clone(),
            "getIndex" => self.index.clone(),
            _ => String::new(),
        }
    }
}

impl PartialDriver {
    /// Primary template directory for this instance
    pub fn resolve_view_directory(&self, builtin: Option<&Path>) -> Result<PathBuf, PartialError> {
        let configured = self
            .params
            .get_str("view.directory")
            .map(PathBuf::from)
            .filter(|dir| dir.exists());

        let global = || {
            self.manager
                .as_ref()
                .and_then(|m| m.config().view.directory.clone())
                .map(|root| root.join(&self.alias))
                .filter(|dir| dir.exists())
        };

        let directory = configured
            .or_else(global)
            .or_else(|| builtin.map(Path::to_path_buf).filter(|dir| dir.exists()))
            .ok_or_else(|| PartialError::missing_view_directory(&self.alias))?;

        tracing::debug!(alias = %self.alias, directory = %directory.display(), "resolved view directory");
        Ok(directory)
    }

    /// Override template directory for this instance, if any
    pub fn resolve_override_directory(&self) -> Option<PathBuf> {
        let configured = self
            .params
            .get_str("view.override_dir")
            .map(PathBuf::from)
            .filter(|dir| dir.exists());

        configured.or_else(|| {
            self.manager
                .as_ref()
                .and_then(|m| m.config().view.override_dir.clone())
                .map(|root| root.join(&self.alias))
                .filter(|dir| dir.exists())
        })
    }

    /// Memoized renderer, resolving it on first call
    pub fn renderer(&mut self, builtin: Option<&Path>) -> Result<RendererHandle, PartialError> {
        if let Some(renderer) = &self.renderer {
            return Ok(Rc::clone(renderer));
        }

        let renderer = match self.params.get("view") {
            Some(Param::Renderer(handle)) => Rc::clone(handle),
            _ => {
                let directory = match (self.resolve_view_directory(builtin), builtin) {
                    (Ok(directory), _) => directory,
                    (Err(_), Some(builtin)) if !self.embedded.is_empty() => {
                        tracing::debug!(alias = %self.alias, "using embedded templates");
                        builtin.to_path_buf()
                    }
                    (Err(e), _) => return Err(e),
                };
                let engine: Rc<dyn ViewEngine> = match &self.manager {
                    Some(manager) => manager.view_engine(),
                    None => Rc::new(JinjaEngine),
                };
                let renderer = engine.create_renderer(&directory);
                if let Some(override_dir) = self.resolve_override_directory() {
                    tracing::debug!(alias = %self.alias, override_dir = %override_dir.display(), "using override directory");
                    renderer.borrow_mut().set_override_directory(&override_dir);
                }
                for &(name, source) in self.embedded {
                    renderer.borrow_mut().add_embedded_template(name, source);
                }
                renderer
            }
        };

        for name in HELPER_NAMES {
            let scope = Arc::clone(&self.scope);
            renderer
                .borrow_mut()
                .register_helper(name, Arc::new(move || scope.read().value(name)));
        }

        self.renderer = Some(Rc::clone(&renderer));
        Ok(renderer)
    }

    /// Render `view.template_name` (default `index`) with the full parameter tree
    pub fn render_view(&mut self, builtin: Option<&Path>) -> Result<String, PartialError> {
        let template = self
            .params
            .get_str("view.template_name")
            .unwrap_or("index")
            .to_string();
        let data = self.template_data();
        self.render_template(builtin, &template, &data)
    }

    /// Render one named template
    pub fn render_template(
        &mut self,
        builtin: Option<&Path>,
        name: &str,
        data: &Value,
    ) -> Result<String, PartialError> {
        let renderer = self.renderer(builtin)?;
        self.refresh_scope();

        let rendered = renderer.borrow().render(name, data);
        rendered.map_err(|source| PartialError::View {
            alias: self.alias.clone(),
            source,
        })
    }

    fn refresh_scope(&self) {
        let scope = HelperScope {
            before: self.before(),
            after: self.after(),
            alias: self.alias.clone(),
            id: self.id.clone(),
            index: self.index.to_string(),
        };
        *self.scope.write() = scope;
    }
}
