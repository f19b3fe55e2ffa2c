//! Driver contract shared by every partial
//!
//! A partial is a concrete type implementing [`Partial`] around an embedded
//! [`PartialDriver`]. The embedded driver carries identity (alias, id,
//! index), the parameter store, the memoized renderer and the handle to the
//! manager that created it. The trait supplies the overridable behaviour:
//! defaults, view directory, rendering and HTTP actions.

mod callable;
mod tag;
mod view;

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use heck::ToUpperCamelCase;
use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::config::default_resources_dir;
use crate::error::PartialError;
use crate::http::{Request, Response};
use crate::manager::ManagerHandle;
use crate::params::{Content, Param, Params};
use crate::routing::RouteParams;
use crate::view::RendererHandle;

pub use callable::{CallableDriver, RenderFn};
pub use tag::{TagDriver, VOID_ELEMENTS};
pub use view::{HelperScope, HELPER_NAMES};

/// Name of the fallback HTTP action every driver answers
pub const RESPONSE_CONTROLLER: &str = "responseController";

/// Templates compiled into the binary, as `(name, source)` pairs
pub type EmbeddedTemplates = &'static [(&'static str, &'static str)];

/// Behaviour of a partial component
///
/// Implementors only need [`Partial::driver`] and [`Partial::driver_mut`];
/// every other method has a default built on the embedded [`PartialDriver`].
pub trait Partial: PartialClone {
    fn driver(&self) -> &PartialDriver;

    fn driver_mut(&mut self) -> &mut PartialDriver;

    /// Static defaults; overrides should extend [`PartialDriver::base_defaults`]
    fn default_params(&self) -> Params {
        PartialDriver::base_defaults()
    }

    /// Built-in template directory of this driver type
    fn view_directory(&self) -> Option<PathBuf> {
        None
    }

    /// Normalize parameters once at boot
    fn parse_params(&mut self) {
        self.driver_mut().parse_attr_id().parse_attr_class();
    }

    /// Run [`Partial::parse_params`] once; later calls do nothing
    fn boot(&mut self) {
        if self.driver().is_booted() {
            return;
        }
        self.parse_params();
        self.driver_mut().mark_booted();
    }

    /// Render the `view.template_name` template (default `index`)
    fn render(&mut self) -> Result<String, PartialError> {
        let directory = self.view_directory();
        self.driver_mut().render_view(directory.as_deref())
    }

    /// The memoized renderer, resolved on first use
    fn view(&mut self) -> Result<RendererHandle, PartialError> {
        let directory = self.view_directory();
        self.driver_mut().renderer(directory.as_deref())
    }

    /// Render a named sub-template with explicit data
    fn view_render(&mut self, name: &str, data: &Value) -> Result<String, PartialError> {
        let directory = self.view_directory();
        self.driver_mut()
            .render_template(directory.as_deref(), name, data)
    }

    /// Fallback HTTP action: always 404 with an empty body
    fn response_controller(&mut self, _request: &Request) -> Response {
        Response::not_found()
    }

    /// Run the HTTP action named `action`
    ///
    /// Drivers exposing endpoints match their own action names first and
    /// pass everything else to [`default_handle`].
    fn handle(&mut self, action: &str, request: &Request) -> Result<Response, PartialError> {
        default_handle(self, action, request)
    }

    /// URL of one of this driver's HTTP actions
    fn route_url(
        &self,
        controller: Option<&str>,
        params: &RouteParams,
        method: Option<&str>,
    ) -> Result<String, PartialError> {
        self.driver().route_url(controller, params, method)
    }
}

/// Actions every driver answers: [`RESPONSE_CONTROLLER`] runs
/// [`Partial::response_controller`], any other name is unknown
pub fn default_handle<P>(
    partial: &mut P,
    action: &str,
    request: &Request,
) -> Result<Response, PartialError>
where
    P: Partial + ?Sized,
{
    match action {
        RESPONSE_CONTROLLER => Ok(partial.response_controller(request)),
        _ => Err(PartialError::unknown_action(partial.driver().alias(), action)),
    }
}

/// Object-safe cloning for boxed partials
pub trait PartialClone {
    fn clone_partial(&self) -> Box<dyn Partial>;
}

impl<T> PartialClone for T
where
    T: Partial + Clone + 'static,
{
    fn clone_partial(&self) -> Box<dyn Partial> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Partial> {
    fn clone(&self) -> Self {
        self.clone_partial()
    }
}

/// State shared by all drivers
pub struct PartialDriver {
    alias: String,
    id: String,
    index: usize,
    params: Params,
    booted: bool,
    manager: Option<ManagerHandle>,
    renderer: Option<RendererHandle>,
    scope: Arc<RwLock<HelperScope>>,
    embedded: EmbeddedTemplates,
}

impl PartialDriver {
    pub fn new() -> Self {
        Self {
            alias: String::new(),
            id: String::new(),
            index: 0,
            params: Params::new(),
            booted: false,
            manager: None,
            renderer: None,
            scope: Arc::default(),
            embedded: &[],
        }
    }

    pub fn with_manager(manager: ManagerHandle) -> Self {
        let mut driver = Self::new();
        driver.manager = Some(manager);
        driver
    }

    /// Defaults every driver starts from
    pub fn base_defaults() -> Params {
        Params::from(json!({
            "attrs": {},
            "after": "",
            "before": "",
            "view": {},
        }))
    }

    pub fn manager(&self) -> Option<&ManagerHandle> {
        self.manager.as_ref()
    }

    pub fn set_manager(&mut self, manager: ManagerHandle) -> &mut Self {
        self.manager = Some(manager);
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Assign the alias; it cannot change once set
    pub fn set_alias(&mut self, alias: impl Into<String>) -> &mut Self {
        let alias = alias.into();
        if self.alias.is_empty() {
            self.alias = alias;
        } else if self.alias != alias {
            tracing::warn!(current = %self.alias, requested = %alias, "ignoring alias change");
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = id.into();
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) -> &mut Self {
        self.index = index;
        self
    }

    /// Upper camel case form of the alias, used for CSS classes
    pub fn base_class(&self) -> String {
        self.alias.to_upper_camel_case()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    pub fn set_params(&mut self, params: Params) -> &mut Self {
        self.params = params;
        self
    }

    /// Fallback templates used when the built-in view directory is missing
    pub fn set_embedded_templates(&mut self, templates: EmbeddedTemplates) -> &mut Self {
        self.embedded = templates;
        self
    }

    pub fn embedded_templates(&self) -> EmbeddedTemplates {
        self.embedded
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    pub fn mark_booted(&mut self) {
        self.booted = true;
    }

    /// Drop a falsy `attrs.id` so no empty id attribute is emitted
    pub fn parse_attr_id(&mut self) -> &mut Self {
        let falsy = !self
            .params
            .get("attrs.id")
            .is_some_and(Param::is_truthy);
        if falsy {
            self.params.forget("attrs.id");
        }
        self
    }

    /// Compute the class attribute from the alias and index
    ///
    /// Without a caller value the class is `"Base Base--Index"`. A caller
    /// value has its first `%s` replaced by `"Base--Index"`. An empty result
    /// removes the attribute.
    pub fn parse_attr_class(&mut self) -> &mut Self {
        let base = self.base_class();
        let token = format!("{base}--{}", self.index);

        let class = match self.params.get("attrs.class") {
            None => format!("{base} {token}"),
            Some(value) => value.to_text().replacen("%s", &token, 1),
        };

        if class.is_empty() {
            self.params.forget("attrs.class");
        } else {
            self.params.set("attrs.class", class);
        }
        self
    }

    /// Content emitted before the main element
    pub fn before(&self) -> String {
        self.slot("before")
    }

    /// Content emitted after the main element
    pub fn after(&self) -> String {
        self.slot("after")
    }

    /// Resolve a literal or deferred content slot
    pub fn slot(&self, path: &str) -> String {
        match self.params.get(path) {
            Some(Param::Content(content)) => content.resolve(self),
            Some(other) => other.to_text(),
            None => String::new(),
        }
    }

    /// Parameter tree as template data, with every content slot resolved
    pub fn template_data(&self) -> Value {
        self.params.to_json(&|content: &Content| content.resolve(self))
    }

    /// Directory holding built-in resources such as view templates
    pub fn resources_dir(&self) -> PathBuf {
        self.manager
            .as_ref()
            .map(|m| m.resources_dir())
            .unwrap_or_else(default_resources_dir)
    }

    pub fn route_url(
        &self,
        controller: Option<&str>,
        params: &RouteParams,
        method: Option<&str>,
    ) -> Result<String, PartialError> {
        let manager = self
            .manager
            .as_ref()
            .ok_or_else(|| PartialError::detached(&self.alias))?;
        manager.route_url(&self.alias, controller, params, method)
    }
}

impl Default for PartialDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Clones get their own renderer and helper scope
impl Clone for PartialDriver {
    fn clone(&self) -> Self {
        Self {
            alias: self.alias.clone(),
            id: self.id.clone(),
            index: self.index,
            params: self.params.clone(),
            booted: self.booted,
            manager: self.manager.clone(),
            renderer: None,
            scope: Arc::default(),
            embedded: self.embedded,
        }
    }
}

impl fmt::Debug for PartialDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialDriver")
            .field("alias", &self.alias)
            .field("id", &self.id)
            .field("index", &self.index)
            .field("params", &self.params)
            .field("booted", &self.booted)
            .finish_non_exhaustive()
    }
}

/// Shared handle to a cached driver instance
#[derive(Clone)]
pub struct PartialRef(Rc<RefCell<Box<dyn Partial>>>);

impl PartialRef {
    pub fn new(driver: Box<dyn Partial>) -> Self {
        Self(Rc::new(RefCell::new(driver)))
    }

    pub fn borrow(&self) -> Ref<'_, dyn Partial> {
        Ref::map(self.0.borrow(), |d| &**d)
    }

    pub fn borrow_mut(&self) -> RefMut<'_, dyn Partial> {
        RefMut::map(self.0.borrow_mut(), |d| &mut **d)
    }

    pub fn render(&self) -> Result<String, PartialError> {
        self.borrow_mut().render()
    }

    pub fn alias(&self) -> String {
        self.borrow().driver().alias().to_string()
    }

    pub fn id(&self) -> String {
        self.borrow().driver().id().to_string()
    }

    pub fn index(&self) -> usize {
        self.borrow().driver().index()
    }

    /// Whether both handles point at the same instance
    pub fn ptr_eq(&self, other: &PartialRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for PartialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(driver) => fmt::Debug::fmt(driver.driver(), f),
            Err(_) => f.write_str("PartialRef(<borrowed>)"),
        }
    }
}
