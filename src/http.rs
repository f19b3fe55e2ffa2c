//! Minimal HTTP request and response values passed to driver actions

use indexmap::IndexMap;
use url::form_urlencoded;

/// An inbound request forwarded to a driver action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: IndexMap<String, String>,
    pub body: String,
    /// Set for XMLHttpRequest-style calls, required by the API route
    pub xhr: bool,
}

impl Request {
    /// Build a request; a `?query` suffix on `path` is split into `query`
    pub fn new(method: impl Into<String>, path: impl AsRef<str>) -> Self {
        let (path, query) = match path.as_ref().split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query(query)),
            None => (path.as_ref().to_string(), IndexMap::new()),
        };
        Self {
            method: method.into().to_ascii_uppercase(),
            path,
            query,
            body: String::new(),
            xhr: false,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_xhr(mut self, xhr: bool) -> Self {
        self.xhr = xhr;
        self
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Decode an `application/x-www-form-urlencoded` query string
fn parse_query(query: &str) -> IndexMap<String, String> {
    form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

/// Response produced by a driver action
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: IndexMap<String, String>,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: IndexMap::new(),
            body: body.into(),
        }
    }

    /// 200 with a body
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    /// 404 with an empty body
    pub fn not_found() -> Self {
        Self::new(404, "")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_splits_query() {
        let request = Request::new("get", "/_partial/tag/ping?x=1&flag");
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/_partial/tag/ping");
        assert_eq!(request.query_param("x"), Some("1"));
        assert_eq!(request.query_param("flag"), Some(""));
    }

    #[test]
    fn test_query_is_percent_decoded() {
        let request = Request::new("GET", "/search?q=a+b%26c&name=%C3%A9t%C3%A9");
        assert_eq!(request.query_param("q"), Some("a b&c"));
        assert_eq!(request.query_param("name"), Some("été"));
    }

    #[test]
    fn test_not_found_is_empty() {
        let response = Response::not_found();
        assert_eq!(response.status, 404);
        assert!(response.body.is_empty());
        assert!(!response.is_success());
    }
}
