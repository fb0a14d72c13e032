use ubars::{AssetSource, Handlebars, TemplateError, assets, template_assets};

// Registered at startup, before any test runs.
template_assets!("tests/resources", "**/*.hbs");
template_assets!("tests/resources", "templates/*.html");

#[test]
fn test_embedded_assets_are_registered() {
    assert!(assets::find("/mytemplate.hbs").is_some());
    assert!(assets::find("/templates/home.hbs").is_some());
    assert!(assets::find("/templates/layout/base.hbs").is_some());
    assert!(assets::find("/templates/mytemplate.html").is_some());
}

#[test]
fn test_default_engine_reads_assets() {
    let template = Handlebars::new().compile("mytemplate").unwrap();
    assert_eq!(template.apply(&"Handlebars.rs").unwrap(), "Hello Handlebars.rs!");
}

#[test]
fn test_asset_source_prefix_and_suffix() {
    let handlebars = Handlebars::with_source(
        AssetSource::new()
            .with_prefix("/templates")
            .with_suffix(".html"),
    );
    let template = handlebars.compile("mytemplate").unwrap();
    assert_eq!(template.apply(&"<html>").unwrap(), "Hello &lt;html&gt;!");

    let err = handlebars.compile("home").unwrap_err();
    assert!(matches!(err, TemplateError::NotFound(_)));
}

#[test]
fn test_runtime_load() {
    let count = assets::load("tests/resources", "templates/header.hbs").unwrap();
    assert_eq!(count, 1);
    assert_eq!(
        assets::find("/templates/header.hbs").as_deref(),
        Some("<h1>{{title}}</h1>")
    );
}
