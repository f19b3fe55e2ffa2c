//! Default view engine on top of minijinja
//!
//! Templates live in a directory as `<name>.html` files. An override
//! directory, when set, is searched first; templates compiled into the
//! binary are the last resort.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt::{self, Write};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use minijinja::value::ValueKind;
use minijinja::{Environment, Error, ErrorKind, Value};

use super::{Helper, Renderer, RendererHandle, ViewEngine, ViewError};

/// File extension of template files
pub const TEMPLATE_EXTENSION: &str = "html";

/// Creates [`JinjaRenderer`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct JinjaEngine;

impl ViewEngine for JinjaEngine {
    fn create_renderer(&self, directory: &Path) -> RendererHandle {
        Rc::new(RefCell::new(JinjaRenderer::new(directory)))
    }
}

/// Directory-backed minijinja renderer
///
/// Besides the helpers registered by drivers, templates get an
/// `html_attrs` filter turning a map into ` key="value"` pairs.
pub struct JinjaRenderer {
    env: Environment<'static>,
    directory: PathBuf,
    override_dir: Option<PathBuf>,
    embedded: Vec<(String, &'static str)>,
    helpers: Vec<String>,
}

impl JinjaRenderer {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let mut env = Environment::new();
        env.add_filter("html_attrs", html_attrs);

        let mut renderer = Self {
            env,
            directory: directory.into(),
            override_dir: None,
            embedded: Vec::new(),
            helpers: Vec::new(),
        };
        renderer.install_loader();
        renderer
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn override_directory(&self) -> Option<&Path> {
        self.override_dir.as_deref()
    }

    fn install_loader(&mut self) {
        let mut search = Vec::with_capacity(2);
        if let Some(dir) = &self.override_dir {
            search.push(dir.clone());
        }
        search.push(self.directory.clone());
        let embedded = self.embedded.clone();

        self.env.set_loader(move |name| {
            if let Some(source) = load_template(&search, name)? {
                return Ok(Some(source));
            }
            Ok(embedded
                .iter()
                .find(|(embedded_name, _)| embedded_name == name)
                .map(|(_, source)| source.to_string()))
        });
    }

    /// Template data with entries named like a helper removed
    ///
    /// Context variables shadow global functions in minijinja, so a `before`
    /// param would otherwise hide the `before()` helper.
    fn context<'a>(&self, data: &'a serde_json::Value) -> Cow<'a, serde_json::Value> {
        match data {
            serde_json::Value::Object(map) if self.helpers.iter().any(|h| map.contains_key(h)) => {
                let mut map = map.clone();
                for helper in &self.helpers {
                    map.remove(helper);
                }
                Cow::Owned(serde_json::Value::Object(map))
            }
            _ => Cow::Borrowed(data),
        }
    }
}

impl fmt::Debug for JinjaRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JinjaRenderer")
            .field("directory", &self.directory)
            .field("override_dir", &self.override_dir)
            .finish_non_exhaustive()
    }
}

impl Renderer for JinjaRenderer {
    fn set_override_directory(&mut self, path: &Path) {
        self.override_dir = Some(path.to_path_buf());
        self.install_loader();
    }

    fn add_embedded_template(&mut self, name: &str, source: &'static str) {
        self.embedded.retain(|(existing, _)| existing != name);
        self.embedded.push((name.to_string(), source));
        self.install_loader();
    }

    fn register_helper(&mut self, name: &str, helper: Helper) {
        if !self.helpers.iter().any(|h| h == name) {
            self.helpers.push(name.to_string());
        }
        self.env.add_function(name.to_string(), move || -> String { helper() });
    }

    fn render(&self, template: &str, data: &serde_json::Value) -> Result<String, ViewError> {
        let compiled = self.env.get_template(template).map_err(|e| match e.kind() {
            ErrorKind::TemplateNotFound => ViewError::TemplateNotFound {
                name: template.to_string(),
            },
            _ => ViewError::Render {
                name: template.to_string(),
                message: e.to_string(),
            },
        })?;

        compiled.render(self.context(data).as_ref()).map_err(|e| ViewError::Render {
            name: template.to_string(),
            message: e.to_string(),
        })
    }
}

fn load_template(search: &[PathBuf], name: &str) -> Result<Option<String>, Error> {
    // Names are relative to the template directories
    if name.split('/').any(|segment| segment == "..") {
        return Ok(None);
    }

    for dir in search {
        let path = dir.join(format!("{name}.{TEMPLATE_EXTENSION}"));
        if path.is_file() {
            return fs::read_to_string(&path).map(Some).map_err(|e| {
                Error::new(
                    ErrorKind::InvalidOperation,
                    format!("could not read template {}", path.display()),
                )
                .with_source(e)
            });
        }
    }
    Ok(None)
}

/// Render a map as HTML attributes
///
/// `true` emits a bare attribute, `false` and null entries are skipped.
fn html_attrs(attrs: Value) -> Result<String, Error> {
    let mut out = String::new();
    if attrs.is_undefined() || attrs.is_none() {
        return Ok(out);
    }

    for key in attrs.try_iter()? {
        let value = attrs.get_item(&key)?;
        let name = escape_html(&key.to_string());
        match value.kind() {
            ValueKind::Undefined | ValueKind::None => {}
            ValueKind::Bool => {
                if value.is_true() {
                    let _ = write!(out, " {name}");
                }
            }
            _ => {
                let _ = write!(out, " {name}=\"{}\"", escape_html(&value.to_string()));
            }
        }
    }
    Ok(out)
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
