//! Error types for registration, rendering and dispatch

use thiserror::Error;

use crate::routing::RouteError;
use crate::view::ViewError;

/// Errors raised by the manager and its drivers
#[derive(Debug, Error)]
pub enum PartialError {
    /// No definition registered under the alias
    #[error("partial with alias [{alias}] unavailable")]
    UnregisteredAlias { alias: String },

    /// None of the candidate view directories exists
    #[error("partial [{alias}] must have an accessible view directory")]
    MissingViewDirectory { alias: String },

    /// The route channel was never registered or no router is attached
    #[error("the [{method}] route for the [{partial}] partial driver is not available")]
    MissingRoute { partial: String, method: String },

    /// Normalized error for the HTTP boundary
    #[error("{message}")]
    NotFound {
        message: String,
        #[source]
        source: Option<Box<PartialError>>,
    },

    /// The driver exposes no HTTP action with that name
    #[error("partial [{alias}] has no action [{action}]")]
    UnknownAction { alias: String, action: String },

    /// The driver needs a manager but was created without one
    #[error("partial [{alias}] is not attached to a partial manager")]
    Detached { alias: String },

    /// Template rendering failed
    #[error("partial [{alias}] failed to render: {source}")]
    View {
        alias: String,
        #[source]
        source: ViewError,
    },

    /// URL generation failed in the router
    #[error(transparent)]
    Route(#[from] RouteError),
}

impl PartialError {
    pub fn unregistered(alias: impl Into<String>) -> Self {
        Self::UnregisteredAlias {
            alias: alias.into(),
        }
    }

    pub fn missing_view_directory(alias: impl Into<String>) -> Self {
        Self::MissingViewDirectory {
            alias: alias.into(),
        }
    }

    pub fn missing_route(partial: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MissingRoute {
            partial: partial.into(),
            method: method.into(),
        }
    }

    pub fn not_found(message: impl Into<String>, source: Option<PartialError>) -> Self {
        Self::NotFound {
            message: message.into(),
            source: source.map(Box::new),
        }
    }

    pub fn unknown_action(alias: impl Into<String>, action: impl Into<String>) -> Self {
        Self::UnknownAction {
            alias: alias.into(),
            action: action.into(),
        }
    }

    pub fn detached(alias: impl Into<String>) -> Self {
        Self::Detached {
            alias: alias.into(),
        }
    }

    /// Whether this is the HTTP "not found" kind
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
