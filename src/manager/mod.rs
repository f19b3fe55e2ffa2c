//! Partial manager: definitions, instance cache, routes and dispatch
//!
//! The manager maps aliases to [`DriverDefinition`]s and turns them into
//! driver instances on demand. Instances are cached per `(alias, id)`; a
//! second `get` with the same id returns the cached instance untouched.
//!
//! Everything drivers need from the manager after creation (configuration,
//! the view engine, route URLs) lives behind a cloneable [`ManagerHandle`],
//! so drivers never point back at the registry that owns them.

mod definition;

use std::cell::OnceCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::config::PartialConfig;
use crate::container::Container;
use crate::driver::{CallableDriver, Partial, PartialRef, TagDriver, RESPONSE_CONTROLLER};
use crate::error::PartialError;
use crate::http::{Request, Response};
use crate::params::Params;
use crate::routing::{RouteChannel, RouteHandle, RouteParams, Router};
use crate::view::{JinjaEngine, ViewEngine};

pub use definition::{DriverDefinition, DriverOptions};
use definition::Registration;

/// Path of the per-verb dispatch routes
pub const ROUTE_PATH: &str = "/_partial/{partial}/{controller}";

/// Path of the XHR dispatch route
pub const API_ROUTE_PATH: &str = "/api/_partial/{partial}/{controller}";

/// Endpoint name the dispatch routes forward to
pub const DISPATCH_ENDPOINT: &str = "partial.dispatch";

/// Definitions installed at boot
const DEFAULT_DRIVERS: [(&str, &str); 1] = [("tag", TagDriver::TYPE_NAME)];

/// Constructor for a known driver type
pub type DriverConstructor = Rc<dyn Fn(ManagerHandle) -> Box<dyn Partial>>;

type RouteTable = IndexMap<RouteChannel, RouteHandle>;

struct ManagerShared {
    config: PartialConfig,
    router: Option<Rc<dyn Router>>,
    routes: OnceCell<RouteTable>,
    engine: Rc<dyn ViewEngine>,
}

/// Read-only view of a manager given to its drivers
#[derive(Clone)]
pub struct ManagerHandle(Rc<ManagerShared>);

impl ManagerHandle {
    pub fn config(&self) -> &PartialConfig {
        &self.0.config
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.0.config.resources_dir()
    }

    pub fn view_engine(&self) -> Rc<dyn ViewEngine> {
        Rc::clone(&self.0.engine)
    }

    pub fn router(&self) -> Option<&Rc<dyn Router>> {
        self.0.router.as_ref()
    }

    /// Build the URL of `partial`'s `controller` action
    ///
    /// `method` names a route channel and defaults to `api`; `controller`
    /// defaults to [`RESPONSE_CONTROLLER`]. `partial` and `controller` win
    /// over same-named entries in `params`.
    pub fn route_url(
        &self,
        partial: &str,
        controller: Option<&str>,
        params: &RouteParams,
        method: Option<&str>,
    ) -> Result<String, PartialError> {
        let method = method.unwrap_or(RouteChannel::Api.as_str());
        let missing = || PartialError::missing_route(partial, method);

        let router = self.0.router.as_ref().ok_or_else(missing)?;
        let channel: RouteChannel = method.parse().map_err(|_| missing())?;
        let route = self
            .0
            .routes
            .get()
            .and_then(|routes| routes.get(&channel))
            .copied()
            .ok_or_else(missing)?;

        let mut url_params = params.clone();
        url_params.insert("partial".to_string(), partial.to_string());
        url_params.insert(
            "controller".to_string(),
            controller.unwrap_or(RESPONSE_CONTROLLER).to_string(),
        );
        Ok(router.build_url(route, &url_params)?)
    }
}

impl fmt::Debug for ManagerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerHandle")
            .field("config", &self.0.config)
            .field("routes", &self.0.routes.get())
            .finish_non_exhaustive()
    }
}

/// Builder for [`PartialManager`]
#[derive(Default)]
pub struct PartialManagerBuilder {
    config: PartialConfig,
    router: Option<Rc<dyn Router>>,
    container: Option<Rc<dyn Container>>,
    engine: Option<Rc<dyn ViewEngine>>,
}

impl PartialManagerBuilder {
    pub fn config(mut self, config: PartialConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a router; dispatch routes are registered at boot
    pub fn router(mut self, router: Rc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn container(mut self, container: Rc<dyn Container>) -> Self {
        self.container = Some(container);
        self
    }

    /// Replace the default minijinja engine
    pub fn view_engine(mut self, engine: Rc<dyn ViewEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn build(self) -> PartialManager {
        let shared = ManagerShared {
            config: self.config,
            router: self.router,
            routes: OnceCell::new(),
            engine: self.engine.unwrap_or_else(|| Rc::new(JinjaEngine)),
        };

        let mut manager = PartialManager {
            shared: ManagerHandle(Rc::new(shared)),
            container: self.container,
            types: IndexMap::new(),
            definitions: IndexMap::new(),
            drivers: IndexMap::new(),
            counters: IndexMap::new(),
            booted: false,
        };
        manager.register_type(TagDriver::TYPE_NAME, |handle| {
            Box::new(TagDriver::with_manager(handle))
        });
        manager
    }

    /// Build and boot in one step
    pub fn build_booted(self) -> PartialManager {
        let mut manager = self.build();
        manager.boot();
        manager
    }
}

/// Registry of partial drivers
pub struct PartialManager {
    shared: ManagerHandle,
    container: Option<Rc<dyn Container>>,
    types: IndexMap<String, DriverConstructor>,
    definitions: IndexMap<String, Registration>,
    drivers: IndexMap<String, IndexMap<String, PartialRef>>,
    counters: IndexMap<String, usize>,
    booted: bool,
}

impl PartialManager {
    /// Unbooted manager without router or container
    pub fn new(config: PartialConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> PartialManagerBuilder {
        PartialManagerBuilder::default()
    }

    pub fn handle(&self) -> ManagerHandle {
        self.shared.clone()
    }

    pub fn config(&self) -> &PartialConfig {
        self.shared.config()
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    /// Register dispatch routes (when a router is attached) and the default definitions
    ///
    /// Only the first call has any effect.
    pub fn boot(&mut self) -> &mut Self {
        if self.booted {
            return self;
        }

        if let Some(router) = self.shared.router() {
            let mut routes = RouteTable::new();
            for channel in RouteChannel::WEB {
                routes.insert(
                    channel,
                    router.register_route(channel, ROUTE_PATH, DISPATCH_ENDPOINT),
                );
            }
            routes.insert(
                RouteChannel::Api,
                router.register_route(RouteChannel::Api, API_ROUTE_PATH, DISPATCH_ENDPOINT),
            );
            tracing::debug!(count = routes.len(), "registered partial dispatch routes");
            let _ = self.shared.0.routes.set(routes);
        }

        for (alias, type_name) in DEFAULT_DRIVERS {
            self.register(alias, DriverDefinition::type_name(type_name));
        }

        self.booted = true;
        self
    }

    /// Make a driver type resolvable by name without a container
    pub fn register_type(
        &mut self,
        name: impl Into<String>,
        constructor: impl Fn(ManagerHandle) -> Box<dyn Partial> + 'static,
    ) -> &mut Self {
        self.types.insert(name.into(), Rc::new(constructor));
        self
    }

    /// Store `definition` under `alias`, replacing any previous one
    pub fn register(&mut self, alias: &str, definition: DriverDefinition) -> &mut Self {
        self.register_with_options(alias, definition, DriverOptions::default())
    }

    /// Register, then hand the manager to `callback` for further setup
    pub fn register_with(
        &mut self,
        alias: &str,
        definition: Option<DriverDefinition>,
        callback: impl FnOnce(&mut Self),
    ) -> &mut Self {
        self.register(alias, definition.unwrap_or_default());
        callback(self);
        self
    }

    /// Register with per-registration defaults
    pub fn register_with_options(
        &mut self,
        alias: &str,
        definition: DriverDefinition,
        options: DriverOptions,
    ) -> &mut Self {
        tracing::debug!(alias, ?definition, "registering partial");
        self.definitions.insert(
            alias.to_string(),
            Registration {
                definition,
                options,
            },
        );
        self
    }

    pub fn has(&self, alias: &str) -> bool {
        self.definitions.contains_key(alias)
    }

    /// New instance of `alias` with a generated id
    pub fn get(&mut self, alias: &str) -> Result<Option<PartialRef>, PartialError> {
        self.get_with(alias, None, Params::new())
    }

    /// Instance of `alias` with the given id, cached after first creation
    pub fn get_id(&mut self, alias: &str, id: &str) -> Result<Option<PartialRef>, PartialError> {
        self.get_with(alias, Some(id), Params::new())
    }

    /// Resolve an instance of `alias`
    ///
    /// A cached instance for `(alias, id)` is returned as is; `params` are
    /// ignored in that case. Otherwise a new instance is created with params
    /// merged from its defaults, the registration defaults, the configured
    /// `driver.<alias>` params and `params`, then booted and cached. Without
    /// an id the instance gets `alias + index`, never one already cached.
    ///
    /// Fails when nothing is registered under `alias`. Returns `Ok(None)`
    /// when the definition cannot produce a driver.
    pub fn get_with(
        &mut self,
        alias: &str,
        id: Option<&str>,
        params: Params,
    ) -> Result<Option<PartialRef>, PartialError> {
        if let Some(id) = id {
            if let Some(cached) = self.drivers.get(alias).and_then(|ids| ids.get(id)) {
                tracing::trace!(alias, id, "partial cache hit");
                return Ok(Some(cached.clone()));
            }
        }

        let registration = self
            .definitions
            .get(alias)
            .ok_or_else(|| PartialError::unregistered(alias))?;

        let Some(mut driver) = self.resolve(&registration.definition) else {
            tracing::warn!(alias, "definition did not resolve to a driver");
            return Ok(None);
        };

        let mut merged = driver.default_params();
        merged.merge(registration.options.defaults.clone());
        merged.merge(self.config().driver_params(alias));
        merged.merge(params);

        // generated ids skip indices whose `alias + index` id is already cached
        let cached = self.drivers.get(alias);
        let counter = self.counters.entry(alias.to_string()).or_insert(0);
        let (index, id) = loop {
            let index = *counter;
            *counter += 1;
            match id {
                Some(id) => break (index, id.to_string()),
                None => {
                    let generated = format!("{alias}{index}");
                    if !cached.is_some_and(|ids| ids.contains_key(&generated)) {
                        break (index, generated);
                    }
                }
            }
        };
        driver
            .driver_mut()
            .set_alias(alias)
            .set_index(index)
            .set_id(id.clone())
            .set_params(merged);
        driver.boot();

        tracing::debug!(alias, %id, index, "created partial instance");
        let instance = PartialRef::new(driver);
        self.drivers
            .entry(alias.to_string())
            .or_default()
            .insert(id, instance.clone());
        Ok(Some(instance))
    }

    /// Every cached instance, by alias then id
    pub fn all(&self) -> &IndexMap<String, IndexMap<String, PartialRef>> {
        &self.drivers
    }

    /// Build a dispatch URL for `partial`
    pub fn route_url(
        &self,
        partial: &str,
        controller: Option<&str>,
        params: &RouteParams,
        method: Option<&str>,
    ) -> Result<String, PartialError> {
        self.shared.route_url(partial, controller, params, method)
    }

    /// Run the `controller` action of `partial` for an HTTP request
    ///
    /// Every failure comes back as [`PartialError::NotFound`] with the
    /// original error as its source.
    pub fn dispatch(
        &mut self,
        partial: &str,
        controller: &str,
        request: &Request,
    ) -> Result<Response, PartialError> {
        let driver = self.get(partial).map_err(|e| {
            tracing::warn!(partial, error = %e, "partial dispatch failed to resolve driver");
            PartialError::not_found(
                format!("partial driver [{partial}] returned an error"),
                Some(e),
            )
        })?;

        let Some(driver) = driver else {
            return Err(PartialError::not_found(
                format!("partial driver [{partial}] unreachable"),
                None,
            ));
        };

        let response = driver.borrow_mut().handle(controller, request);
        response.map_err(|e| {
            tracing::warn!(partial, controller, error = %e, "partial action failed");
            PartialError::not_found(
                format!("partial driver [{partial}] controller [{controller}] call returned an error"),
                Some(e),
            )
        })
    }

    /// Turn a definition into a fresh driver bound to this manager
    fn resolve(&self, definition: &DriverDefinition) -> Option<Box<dyn Partial>> {
        let mut driver: Box<dyn Partial> = match definition {
            DriverDefinition::Instance(prototype) => prototype.clone_partial(),
            DriverDefinition::TypeName(name) => self.instantiate(name)?,
            DriverDefinition::Factory(render) => {
                Box::new(CallableDriver::from_fn(Rc::clone(render)))
            }
        };
        driver.driver_mut().set_manager(self.handle());
        Some(driver)
    }

    fn instantiate(&self, name: &str) -> Option<Box<dyn Partial>> {
        if let Some(container) = &self.container {
            if container.has(name) {
                return container.get(name);
            }
        }
        self.types.get(name).map(|constructor| constructor(self.handle()))
    }
}

impl fmt::Debug for PartialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialManager")
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("booted", &self.booted)
            .finish_non_exhaustive()
    }
}
