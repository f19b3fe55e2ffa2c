//! Integration tests for route registration, URL building and HTTP dispatch

use std::rc::Rc;

use partial_kit::{
    default_handle, DriverDefinition, MemoryRouter, Partial, PartialDriver, PartialError,
    PartialManager, Request, Response, RouteChannel, RouteParams, RESPONSE_CONTROLLER,
};
use pretty_assertions::assert_eq;

/// Driver exposing a `ping` action next to the fallback one
#[derive(Debug, Clone, Default)]
struct Pinger {
    driver: PartialDriver,
}

impl Partial for Pinger {
    fn driver(&self) -> &PartialDriver {
        &self.driver
    }

    fn driver_mut(&mut self) -> &mut PartialDriver {
        &mut self.driver
    }

    fn handle(&mut self, action: &str, request: &Request) -> Result<Response, PartialError> {
        match action {
            "ping" => {
                let who = request.query_param("who").unwrap_or("nobody");
                Ok(Response::ok(format!("pong {who} from {}", self.driver().id()))
                    .with_header("content-type", "text/plain"))
            }
            _ => default_handle(self, action, request),
        }
    }
}

fn routed_manager() -> (PartialManager, Rc<MemoryRouter>) {
    let router = Rc::new(MemoryRouter::new().with_base_url("https://example.test"));
    let manager = PartialManager::builder()
        .router(router.clone())
        .build_booted();
    (manager, router)
}

#[test]
fn test_boot_registers_dispatch_routes() {
    let (_manager, router) = routed_manager();
    let routes = router.routes();

    assert_eq!(routes.len(), 7);
    let channels: Vec<RouteChannel> = routes.iter().map(|r| r.channel).collect();
    assert_eq!(
        channels,
        vec![
            RouteChannel::Get,
            RouteChannel::Post,
            RouteChannel::Put,
            RouteChannel::Patch,
            RouteChannel::Options,
            RouteChannel::Delete,
            RouteChannel::Api,
        ]
    );
    assert_eq!(routes[0].path, "/_partial/{partial}/{controller}");
    assert_eq!(routes[6].path, "/api/_partial/{partial}/{controller}");
}

#[test]
fn test_route_url_defaults_to_api_channel() {
    let (manager, _router) = routed_manager();
    let url = manager
        .route_url("widget", None, &RouteParams::new(), None)
        .unwrap();
    assert_eq!(url, "https://example.test/api/_partial/widget/responseController");
}

#[test]
fn test_route_url_with_method_and_params() {
    let (manager, _router) = routed_manager();
    let mut params = RouteParams::new();
    params.insert("partial".to_string(), "ignored".to_string());
    params.insert("page".to_string(), "2".to_string());

    let url = manager
        .route_url("widget", Some("save"), &params, Some("POST"))
        .unwrap();
    assert_eq!(url, "https://example.test/_partial/widget/save?page=2");
}

#[test]
fn test_route_url_before_boot_fails() {
    let router = Rc::new(MemoryRouter::new());
    let manager = PartialManager::builder().router(router).build();

    let err = manager
        .route_url("widget", None, &RouteParams::new(), Some("put"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "the [put] route for the [widget] partial driver is not available"
    );
}

#[test]
fn test_route_url_without_router_fails() {
    let manager = PartialManager::builder().build_booted();
    let err = manager
        .route_url("widget", None, &RouteParams::new(), None)
        .unwrap_err();
    assert!(matches!(err, PartialError::MissingRoute { method, .. } if method == "api"));
}

#[test]
fn test_route_url_unknown_channel_fails() {
    let (manager, _router) = routed_manager();
    let err = manager
        .route_url("widget", None, &RouteParams::new(), Some("trace"))
        .unwrap_err();
    assert!(matches!(err, PartialError::MissingRoute { .. }));
}

#[test]
fn test_driver_builds_its_own_url() {
    let (mut manager, _router) = routed_manager();
    let tag = manager.get("tag").unwrap().unwrap();
    let url = tag
        .borrow()
        .route_url(Some("refresh"), &RouteParams::new(), Some("get"))
        .unwrap();
    assert_eq!(url, "https://example.test/_partial/tag/refresh");
}

#[test]
fn test_default_controller_is_not_found() {
    let (mut manager, _router) = routed_manager();
    let response = manager
        .dispatch("tag", RESPONSE_CONTROLLER, &Request::new("GET", "/"))
        .unwrap();
    assert_eq!(response, Response::not_found());
    assert_eq!(response.body, "");
}

#[test]
fn test_custom_action() {
    let (mut manager, router) = routed_manager();
    manager.register("pinger", DriverDefinition::instance(Pinger::default()));

    let request = Request::new("GET", "/_partial/pinger/ping?who=alice");
    let matched = router.recognize(&request).unwrap();
    assert_eq!(matched.params["partial"], "pinger");
    assert_eq!(matched.params["controller"], "ping");

    let response = manager
        .dispatch(&matched.params["partial"], &matched.params["controller"], &request)
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "pong alice from pinger0");
    assert_eq!(response.headers["content-type"], "text/plain");
}

#[test]
fn test_custom_driver_keeps_fallback_action() {
    let (mut manager, _router) = routed_manager();
    manager.register("pinger", DriverDefinition::instance(Pinger::default()));

    let response = manager
        .dispatch("pinger", RESPONSE_CONTROLLER, &Request::new("GET", "/"))
        .unwrap();
    assert_eq!(response, Response::not_found());
}

#[test]
fn test_route_url_round_trips_through_dispatch() {
    let (mut manager, router) = routed_manager();
    manager.register("pinger", DriverDefinition::instance(Pinger::default()));

    let mut params = RouteParams::new();
    params.insert("who".to_string(), "bob & eve".to_string());
    let url = manager
        .route_url("pinger", Some("ping"), &params, Some("get"))
        .unwrap();
    assert_eq!(url, "https://example.test/_partial/pinger/ping?who=bob+%26+eve");

    let path = url.trim_start_matches("https://example.test");
    let request = Request::new("GET", path);
    let matched = router.recognize(&request).unwrap();
    let response = manager
        .dispatch(&matched.params["partial"], &matched.params["controller"], &request)
        .unwrap();
    assert_eq!(response.body, "pong bob & eve from pinger0");
}

#[test]
fn test_api_route_requires_xhr() {
    let (_manager, router) = routed_manager();
    let plain = Request::new("POST", "/api/_partial/tag/responseController");
    assert!(router.recognize(&plain).is_none());

    let xhr = plain.with_xhr(true);
    let matched = router.recognize(&xhr).unwrap();
    assert_eq!(matched.params["partial"], "tag");
}

#[test]
fn test_dispatch_unregistered_is_not_found() {
    let (mut manager, _router) = routed_manager();
    let err = manager
        .dispatch("missingAlias", "ping", &Request::new("GET", "/"))
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("missingAlias"));
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "partial with alias [missingAlias] unavailable");
}

#[test]
fn test_dispatch_unknown_action_is_not_found() {
    let (mut manager, _router) = routed_manager();
    manager.register("pinger", DriverDefinition::instance(Pinger::default()));

    let err = manager
        .dispatch("pinger", "explode", &Request::new("GET", "/"))
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("pinger"));
    assert!(err.to_string().contains("explode"));
}

#[test]
fn test_dispatch_unresolvable_is_not_found() {
    let (mut manager, _router) = routed_manager();
    manager.register("ghost", DriverDefinition::type_name("Ghost"));

    let err = manager
        .dispatch("ghost", RESPONSE_CONTROLLER, &Request::new("GET", "/"))
        .unwrap_err();
    assert_eq!(err.to_string(), "partial driver [ghost] unreachable");
}
