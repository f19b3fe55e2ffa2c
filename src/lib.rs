//! Partial Kit - reusable UI components ("partials") rendered through templates
//!
//! A [`PartialManager`] maps aliases to driver definitions, creates and caches
//! driver instances, merges their parameters and exposes their HTTP actions
//! through a small dispatcher.
//!
//! # Example
//!
//! ```rust
//! use partial_kit::{Params, PartialManager};
//! use serde_json::json;
//!
//! let mut manager = PartialManager::builder().build_booted();
//! let link = manager
//!     .get_with(
//!         "tag",
//!         None,
//!         Params::from(json!({ "tag": "a", "attrs": { "href": "/next" }, "content": "Go" })),
//!     )
//!     .unwrap()
//!     .unwrap();
//!
//! assert_eq!(link.render().unwrap(), r#"<a href="/next" class="Tag Tag--0">Go</a>"#);
//! ```

pub mod config;
pub mod container;
pub mod driver;
pub mod error;
pub mod http;
pub mod manager;
pub mod params;
pub mod routing;
pub mod view;

pub use config::{ConfigError, PartialConfig, ViewConfig};
pub use container::{register_default_services, Container, DriverContainer};
pub use driver::{
    default_handle, CallableDriver, EmbeddedTemplates, Partial, PartialClone, PartialDriver,
    PartialRef, TagDriver, RESPONSE_CONTROLLER,
};
pub use error::PartialError;
pub use http::{Request, Response};
pub use manager::{
    DriverDefinition, DriverOptions, ManagerHandle, PartialManager, PartialManagerBuilder,
};
pub use params::{Content, Param, ParamMap, Params};
pub use routing::{MemoryRouter, RouteChannel, RouteError, RouteHandle, RouteParams, Router};
pub use view::{JinjaEngine, Renderer, RendererHandle, ViewEngine, ViewError};
