//! Routing collaborator
//!
//! The manager only needs two things from a router: register a route for a
//! channel and get back an opaque handle, and build a URL from that handle.
//! [`MemoryRouter`] is a small in-process implementation that also matches
//! inbound requests, used by the CLI and the tests.

use std::cell::RefCell;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use url::form_urlencoded;

use crate::http::Request;

/// Path and query parameters of a route
pub type RouteParams = IndexMap<String, String>;

/// Bytes escaped in a path segment: everything outside the RFC 3986 unreserved set
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Errors raised by a router
#[derive(Debug, Error)]
pub enum RouteError {
    /// The handle does not belong to this router
    #[error("unknown route handle #{id}")]
    UnknownRoute { id: usize },

    /// A `{placeholder}` in the route path has no value
    #[error("missing parameter '{name}' for route {path}")]
    MissingParameter { path: String, name: String },

    /// Channel name outside the supported set
    #[error("unknown route channel '{name}'")]
    UnknownChannel { name: String },
}

/// Logical route channel: one per HTTP verb plus the XHR-only API channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteChannel {
    Get,
    Post,
    Put,
    Patch,
    Options,
    Delete,
    Api,
}

impl RouteChannel {
    /// Channels bound to a single HTTP verb
    pub const WEB: [RouteChannel; 6] = [
        RouteChannel::Get,
        RouteChannel::Post,
        RouteChannel::Put,
        RouteChannel::Patch,
        RouteChannel::Options,
        RouteChannel::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteChannel::Get => "get",
            RouteChannel::Post => "post",
            RouteChannel::Put => "put",
            RouteChannel::Patch => "patch",
            RouteChannel::Options => "options",
            RouteChannel::Delete => "delete",
            RouteChannel::Api => "api",
        }
    }

    /// Whether a request can be served on this channel
    pub fn accepts(&self, request: &Request) -> bool {
        match self {
            RouteChannel::Api => request.xhr,
            channel => request.method.eq_ignore_ascii_case(channel.as_str()),
        }
    }
}

impl fmt::Display for RouteChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteChannel {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(RouteChannel::Get),
            "post" => Ok(RouteChannel::Post),
            "put" => Ok(RouteChannel::Put),
            "patch" => Ok(RouteChannel::Patch),
            "options" => Ok(RouteChannel::Options),
            "delete" => Ok(RouteChannel::Delete),
            "api" => Ok(RouteChannel::Api),
            _ => Err(RouteError::UnknownChannel {
                name: s.to_string(),
            }),
        }
    }
}

/// Opaque handle to a registered route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteHandle(usize);

impl RouteHandle {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn id(&self) -> usize {
        self.0
    }
}

/// Routing framework as seen by the manager
pub trait Router {
    /// Register `path` on `channel`, forwarding matches to `endpoint`
    fn register_route(&self, channel: RouteChannel, path: &str, endpoint: &str) -> RouteHandle;

    /// Build a URL for `route`, filling placeholders from `params`
    fn build_url(&self, route: RouteHandle, params: &RouteParams) -> Result<String, RouteError>;
}

/// A registered route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEntry {
    pub channel: RouteChannel,
    pub path: String,
    pub endpoint: String,
}

/// A request matched against a registered route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    pub route: RouteHandle,
    pub endpoint: String,
    pub params: RouteParams,
}

/// In-process router with `{name}` path placeholders
#[derive(Debug, Default)]
pub struct MemoryRouter {
    base_url: String,
    routes: RefCell<Vec<RouteEntry>>,
}

impl MemoryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix prepended to every built URL, e.g. `https://example.test`
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn routes(&self) -> Vec<RouteEntry> {
        self.routes.borrow().clone()
    }

    /// Find the first route accepting `request`
    pub fn recognize(&self, request: &Request) -> Option<RouteMatch> {
        let routes = self.routes.borrow();
        routes.iter().enumerate().find_map(|(id, entry)| {
            if !entry.channel.accepts(request) {
                return None;
            }
            match_path(&entry.path, &request.path).map(|params| RouteMatch {
                route: RouteHandle(id),
                endpoint: entry.endpoint.clone(),
                params,
            })
        })
    }
}

impl Router for MemoryRouter {
    fn register_route(&self, channel: RouteChannel, path: &str, endpoint: &str) -> RouteHandle {
        let mut routes = self.routes.borrow_mut();
        routes.push(RouteEntry {
            channel,
            path: path.to_string(),
            endpoint: endpoint.to_string(),
        });
        tracing::trace!(%channel, path, endpoint, "registered route");
        RouteHandle(routes.len() - 1)
    }

    fn build_url(&self, route: RouteHandle, params: &RouteParams) -> Result<String, RouteError> {
        let routes = self.routes.borrow();
        let entry = routes
            .get(route.0)
            .ok_or(RouteError::UnknownRoute { id: route.0 })?;

        let mut used = Vec::new();
        let mut url = self.base_url.clone();
        for segment in entry.path.split('/').filter(|s| !s.is_empty()) {
            url.push('/');
            match placeholder(segment) {
                Some(name) => {
                    let value = params.get(name).ok_or_else(|| RouteError::MissingParameter {
                        path: entry.path.clone(),
                        name: name.to_string(),
                    })?;
                    url.extend(utf8_percent_encode(value, PATH_SEGMENT));
                    used.push(name);
                }
                None => url.push_str(segment),
            }
        }

        let mut query = form_urlencoded::Serializer::new(String::new());
        query.extend_pairs(params.iter().filter(|(k, _)| !used.contains(&k.as_str())));
        let query = query.finish();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        Ok(url)
    }
}

fn placeholder(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

fn match_path(pattern: &str, path: &str) -> Option<RouteParams> {
    let expected: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let actual: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if expected.len() != actual.len() {
        return None;
    }

    let mut params = RouteParams::new();
    for (pattern, value) in expected.iter().zip(actual) {
        match placeholder(pattern) {
            Some(name) => {
                let value = percent_decode_str(value).decode_utf8_lossy();
                params.insert(name.to_string(), value.into_owned());
            }
            None if *pattern == value => {}
            None => return None,
        }
    }
    Some(params)
}
