//! Driver definitions stored by the manager

use std::fmt;
use std::rc::Rc;

use crate::driver::{Partial, PartialDriver, RenderFn, TagDriver};
use crate::params::Params;

/// How an alias turns into a driver instance
pub enum DriverDefinition {
    /// Prototype cloned on every resolution
    Instance(Box<dyn Partial>),
    /// Type name resolved through the container, then the manager's known types
    TypeName(String),
    /// Render function wrapped in a [`crate::CallableDriver`]
    Factory(RenderFn),
}

impl DriverDefinition {
    pub fn instance(driver: impl Partial + 'static) -> Self {
        Self::Instance(Box::new(driver))
    }

    pub fn type_name(name: impl Into<String>) -> Self {
        Self::TypeName(name.into())
    }

    pub fn factory(render: impl Fn(&PartialDriver) -> String + 'static) -> Self {
        Self::Factory(Rc::new(render))
    }
}

/// The tag driver
impl Default for DriverDefinition {
    fn default() -> Self {
        Self::TypeName(TagDriver::TYPE_NAME.to_string())
    }
}

impl fmt::Debug for DriverDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(driver) => f.debug_tuple("Instance").field(driver.driver()).finish(),
            Self::TypeName(name) => f.debug_tuple("TypeName").field(name).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Per-registration settings
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    /// Merged over the driver's own defaults, below manager config
    pub defaults: Params,
}

impl DriverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(mut self, defaults: impl Into<Params>) -> Self {
        self.defaults = defaults.into();
        self
    }
}

/// A stored definition with its options
#[derive(Debug)]
pub(crate) struct Registration {
    pub(crate) definition: DriverDefinition,
    pub(crate) options: DriverOptions,
}
