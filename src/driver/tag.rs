//! Reference driver rendering a single HTML element

use std::path::PathBuf;

use serde_json::json;

use crate::error::PartialError;
use crate::manager::ManagerHandle;
use crate::params::{Param, Params};

use super::{EmbeddedTemplates, Partial, PartialDriver};

/// Elements rendered self-closing when `singleton` is left unset
pub const VOID_ELEMENTS: [&str; 12] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
];

/// Copy of `resources/views/tag` compiled into the binary
const TEMPLATES: EmbeddedTemplates = &[(
    "index",
    include_str!("../../resources/views/tag/index.html"),
)];

/// Renders `tag` with `attrs` around `content`, wrapped by `before`/`after`
///
/// `content`, `before` and `after` may be literals or producers; producers
/// run at render time with the driver as argument.
#[derive(Debug, Clone)]
pub struct TagDriver {
    driver: PartialDriver,
}

impl TagDriver {
    /// Type name used in driver definitions and containers
    pub const TYPE_NAME: &'static str = "TagDriver";

    pub fn new() -> Self {
        Self::from_driver(PartialDriver::new())
    }

    pub fn with_manager(manager: ManagerHandle) -> Self {
        Self::from_driver(PartialDriver::with_manager(manager))
    }

    fn from_driver(mut driver: PartialDriver) -> Self {
        driver.set_embedded_templates(TEMPLATES);
        Self { driver }
    }

    pub fn is_void_element(tag: &str) -> bool {
        VOID_ELEMENTS.contains(&tag)
    }

    /// Settle an unset `singleton` from the tag name
    fn resolve_singleton(&mut self) {
        let params = self.driver.params_mut();
        if params.get("singleton").map_or(true, Param::is_null) {
            let singleton = Self::is_void_element(params.get_str("tag").unwrap_or("div"));
            params.set("singleton", singleton);
        }
    }
}

impl Default for TagDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Partial for TagDriver {
    fn driver(&self) -> &PartialDriver {
        &self.driver
    }

    fn driver_mut(&mut self) -> &mut PartialDriver {
        &mut self.driver
    }

    fn default_params(&self) -> Params {
        let mut params = PartialDriver::base_defaults();
        params.merge(json!({
            "tag": "div",
            "content": "",
            "singleton": null,
        }));
        params
    }

    fn view_directory(&self) -> Option<PathBuf> {
        Some(self.driver.resources_dir().join("views").join("tag"))
    }

    fn render(&mut self) -> Result<String, PartialError> {
        self.resolve_singleton();
        let directory = self.view_directory();
        self.driver.render_view(directory.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Content;
    use pretty_assertions::assert_eq;

    fn booted_tag(params: serde_json::Value) -> TagDriver {
        let mut tag = TagDriver::new();
        let mut merged = tag.default_params();
        merged.merge(params);
        tag.driver_mut()
            .set_alias("tag")
            .set_id("tag0")
            .set_params(merged);
        tag.boot();
        tag
    }

    #[test]
    fn test_void_elements() {
        assert!(TagDriver::is_void_element("img"));
        assert!(TagDriver::is_void_element("br"));
        assert!(!TagDriver::is_void_element("div"));
    }

    #[test]
    fn test_default_params_extend_base() {
        let params = TagDriver::new().default_params();
        let keys: Vec<&str> = params.all().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["attrs", "after", "before", "view", "tag", "content", "singleton"]);
    }

    #[test]
    fn test_render_div() {
        let mut tag = booted_tag(json!({ "content": "Hello" }));
        assert_eq!(tag.render().unwrap(), r#"<div class="Tag Tag--0">Hello</div>"#);
    }

    #[test]
    fn test_render_void_element() {
        let mut tag = booted_tag(json!({ "tag": "img", "attrs": { "src": "/a.png" } }));
        insta::assert_snapshot!(tag.render().unwrap(), @r#"<img src="/a.png" class="Tag Tag--0"/>"#);
    }

    #[test]
    fn test_singleton_settled_at_render() {
        let mut tag = booted_tag(json!({ "tag": "hr" }));
        assert!(tag.driver().params().get("singleton").is_some_and(Param::is_null));
        tag.render().unwrap();
        assert_eq!(tag.driver().params().get("singleton").and_then(Param::as_bool), Some(true));
    }

    #[test]
    fn test_explicit_singleton_false() {
        let mut tag = booted_tag(json!({ "tag": "img", "singleton": false }));
        assert_eq!(tag.render().unwrap(), r#"<img class="Tag Tag--0"></img>"#);
    }

    #[test]
    fn test_embedded_template_without_resources() {
        let mut tag = booted_tag(json!({ "tag": "em", "content": "x" }));
        let missing = tempfile::tempdir().unwrap().path().join("gone");
        let out = tag.driver_mut().render_view(Some(&missing)).unwrap();
        assert_eq!(out, r#"<em class="Tag Tag--0">x</em>"#);
    }

    #[test]
    fn test_content_producer_and_wrappers() {
        let mut tag = booted_tag(json!({ "tag": "span", "before": "[", "after": "]" }));
        tag.driver_mut().params_mut().set(
            "content",
            Content::producer(|d: &PartialDriver| format!("#{}", d.id())),
        );
        assert_eq!(
            tag.render().unwrap(),
            r#"[<span class="Tag Tag--0">#tag0</span>]"#
        );
    }
}
