//! Dependency container consulted for type-named driver definitions

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::driver::{Partial, TagDriver};

/// Resolves driver type names to fresh instances
pub trait Container {
    fn has(&self, name: &str) -> bool;

    fn get(&self, name: &str) -> Option<Box<dyn Partial>>;
}

/// Factory producing a driver instance
pub type DriverFactory = Rc<dyn Fn() -> Box<dyn Partial>>;

/// Container of named driver factories
#[derive(Clone, Default)]
pub struct DriverContainer {
    factories: IndexMap<String, DriverFactory>,
}

impl DriverContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one under `name`
    pub fn add(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Partial> + 'static,
    ) -> &mut Self {
        self.factories.insert(name.into(), Rc::new(factory));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Container for DriverContainer {
    fn has(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<Box<dyn Partial>> {
        self.factories.get(name).map(|factory| factory())
    }
}

impl fmt::Debug for DriverContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverContainer")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Register the built-in driver services
pub fn register_default_services(container: &mut DriverContainer) {
    container.add(TagDriver::TYPE_NAME, || Box::new(TagDriver::new()));
}
