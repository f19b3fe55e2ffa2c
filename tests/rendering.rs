//! Integration tests for template rendering and view-directory resolution

use std::fs;
use std::path::Path;

use partial_kit::{
    Content, DriverDefinition, Params, Partial, PartialConfig, PartialDriver, PartialError,
    PartialManager,
};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Driver with no built-in templates of its own
#[derive(Debug, Clone, Default)]
struct Bare {
    driver: PartialDriver,
}

impl Partial for Bare {
    fn driver(&self) -> &PartialDriver {
        &self.driver
    }

    fn driver_mut(&mut self) -> &mut PartialDriver {
        &mut self.driver
    }
}

fn write_template(dir: &Path, name: &str, body: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(format!("{name}.html")), body).unwrap();
}

fn render(manager: &mut PartialManager, alias: &str, params: serde_json::Value) -> String {
    manager
        .get_with(alias, None, Params::from(params))
        .unwrap()
        .unwrap()
        .render()
        .unwrap()
}

#[test]
fn test_tag_renders_content() {
    let mut manager = PartialManager::builder().build_booted();
    let html = render(
        &mut manager,
        "tag",
        json!({ "tag": "section", "attrs": { "id": "intro" }, "content": "Hi" }),
    );
    assert_eq!(html, r#"<section id="intro" class="Tag Tag--0">Hi</section>"#);
}

#[test]
fn test_void_elements_are_singletons() {
    let mut manager = PartialManager::builder().build_booted();
    let html = render(&mut manager, "tag", json!({ "tag": "br" }));
    insta::assert_snapshot!(html, @r#"<br class="Tag Tag--0"/>"#);

    let html = render(&mut manager, "tag", json!({ "tag": "div", "content": "x" }));
    insta::assert_snapshot!(html, @r#"<div class="Tag Tag--1">x</div>"#);
}

#[test]
fn test_explicit_singleton_wins() {
    let mut manager = PartialManager::builder().build_booted();
    let html = render(&mut manager, "tag", json!({ "tag": "span", "singleton": true }));
    assert_eq!(html, r#"<span class="Tag Tag--0"/>"#);
}

#[test]
fn test_boolean_attributes() {
    let mut manager = PartialManager::builder().build_booted();
    let html = render(
        &mut manager,
        "tag",
        json!({ "tag": "input", "attrs": { "disabled": true, "hidden": false, "value": "a\"b" } }),
    );
    assert_eq!(html, r#"<input disabled value="a&quot;b" class="Tag Tag--0"/>"#);
}

#[test]
fn test_before_after_and_producers() {
    let mut manager = PartialManager::builder().build_booted();
    let mut params = Params::from(json!({ "tag": "p", "before": "<!-- start -->" }));
    params.set(
        "content",
        Content::producer(|driver: &PartialDriver| format!("I am {}", driver.id())),
    );
    params.set(
        "after",
        Content::producer(|driver: &PartialDriver| format!("<!-- end {} -->", driver.index())),
    );

    let tag = manager.get_with("tag", Some("para"), params).unwrap().unwrap();
    assert_eq!(
        tag.render().unwrap(),
        r#"<!-- start --><p class="Tag Tag--0">I am para</p><!-- end 0 -->"#
    );
}

#[test]
fn test_global_view_directory_joined_with_alias() {
    let views = tempfile::tempdir().unwrap();
    write_template(&views.path().join("card"), "index", "card {{ getId() }}");

    let config = PartialConfig::new().with_view_directory(views.path());
    let mut manager = PartialManager::builder().config(config).build_booted();
    manager.register_with("card", None, |_| {});

    // a nonexistent instance directory falls through to the global one
    let html = render(
        &mut manager,
        "card",
        json!({ "view": { "directory": "/definitely/not/here" } }),
    );
    assert_eq!(html, "card card0");
}

#[test]
fn test_instance_view_directory_wins() {
    let views = tempfile::tempdir().unwrap();
    let own = tempfile::tempdir().unwrap();
    write_template(&views.path().join("card"), "index", "global");
    write_template(own.path(), "index", "own {{ getAlias() }}#{{ getIndex() }}");

    let config = PartialConfig::new().with_view_directory(views.path());
    let mut manager = PartialManager::builder().config(config).build_booted();
    manager.register_with("card", None, |_| {});

    let html = render(
        &mut manager,
        "card",
        json!({ "view": { "directory": own.path().to_str().unwrap() } }),
    );
    assert_eq!(html, "own card#0");
}

#[test]
fn test_override_directory_takes_precedence() {
    let overrides = tempfile::tempdir().unwrap();
    write_template(
        &overrides.path().join("tag"),
        "index",
        "<custom-{{ tag }}>{{ content }}</custom-{{ tag }}>",
    );

    let config = PartialConfig::new().with_override_dir(overrides.path());
    let mut manager = PartialManager::builder().config(config).build_booted();
    let html = render(&mut manager, "tag", json!({ "tag": "x", "content": "y" }));
    assert_eq!(html, "<custom-x>y</custom-x>");
}

#[test]
fn test_custom_template_name() {
    let views = tempfile::tempdir().unwrap();
    write_template(views.path(), "index", "index");
    write_template(views.path(), "compact", "compact {{ label }}");

    let mut manager = PartialManager::builder().build_booted();
    manager.register_with("badge", None, |_| {});
    let html = render(
        &mut manager,
        "badge",
        json!({
            "label": "new",
            "view": { "directory": views.path().to_str().unwrap(), "template_name": "compact" }
        }),
    );
    assert_eq!(html, "compact new");
}

#[test]
fn test_instance_override_directory_wins() {
    let global = tempfile::tempdir().unwrap();
    let own = tempfile::tempdir().unwrap();
    write_template(&global.path().join("tag"), "index", "global override");
    write_template(own.path(), "index", "own override {{ getId() }}");

    let config = PartialConfig::new().with_override_dir(global.path());
    let mut manager = PartialManager::builder().config(config).build_booted();
    let html = render(
        &mut manager,
        "tag",
        json!({ "view": { "override_dir": own.path().to_str().unwrap() } }),
    );
    assert_eq!(html, "own override tag0");
}

#[test]
fn test_missing_instance_override_falls_back_to_global() {
    let global = tempfile::tempdir().unwrap();
    write_template(&global.path().join("tag"), "index", "global override");

    let config = PartialConfig::new().with_override_dir(global.path());
    let mut manager = PartialManager::builder().config(config).build_booted();
    let html = render(
        &mut manager,
        "tag",
        json!({ "view": { "override_dir": "/definitely/not/here" } }),
    );
    assert_eq!(html, "global override");
}

#[test]
fn test_override_only_replaces_matching_templates() {
    let overrides = tempfile::tempdir().unwrap();
    write_template(&overrides.path().join("tag"), "other", "unused");

    let config = PartialConfig::new().with_override_dir(overrides.path());
    let mut manager = PartialManager::builder().config(config).build_booted();
    let html = render(&mut manager, "tag", json!({ "content": "kept" }));
    assert_eq!(html, r#"<div class="Tag Tag--0">kept</div>"#);
}

#[test]
fn test_tag_renders_without_resources_dir() {
    let resources = tempfile::tempdir().unwrap();
    let config = PartialConfig::new().with_resources_dir(resources.path());
    let mut manager = PartialManager::builder().config(config).build_booted();

    let html = render(&mut manager, "tag", json!({ "tag": "b", "content": "bold" }));
    assert_eq!(html, r#"<b class="Tag Tag--0">bold</b>"#);
}

#[test]
fn test_missing_view_directory() {
    let mut manager = PartialManager::builder().build_booted();
    manager.register("bare", DriverDefinition::instance(Bare::default()));

    let bare = manager.get("bare").unwrap().unwrap();
    let err = bare.render().unwrap_err();
    assert!(matches!(err, PartialError::MissingViewDirectory { alias } if alias == "bare"));
}

#[test]
fn test_missing_template() {
    let views = tempfile::tempdir().unwrap();
    let mut manager = PartialManager::builder().build_booted();
    manager.register_with("empty", None, |_| {});

    let err = manager
        .get_with(
            "empty",
            None,
            Params::from(json!({ "view": { "directory": views.path().to_str().unwrap() } })),
        )
        .unwrap()
        .unwrap()
        .render()
        .unwrap_err();
    assert!(matches!(err, PartialError::View { .. }));
}
