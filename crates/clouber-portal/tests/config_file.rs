//! Loading a portal from a configuration file on disk

use clouber_portal::{Portal, PortalConfig};
use std::fs;
use tempfile::TempDir;

const CONFIG: &str = r#"
[consumer]
name = "intranet"

[logging]
level = "debug"
max_retained_errors = 8

[[producers]]
id = "local"
catalog_file = "demo.catalog"
allowed_consumers = ["intranet"]

[[themes]]
id = "basic"
css = "body{font-family:sans-serif}"

[[pages]]
id = "home"
title = "Intranet"
template = "basic"

[[pages.regions]]
namespace = "main"

[[pages.regions.windows]]
namespace = "w1"
producer = "local"
portlet = "hello"
"#;

const CATALOG: &str = "portletID:hello&title:Hello%20%26%20Welcome\n";

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    fs::write(dir.path().join("demo.catalog"), CATALOG).unwrap();
    let path = dir.path().join("portal.toml");
    fs::write(&path, CONFIG).unwrap();
    path
}

#[tokio::test]
async fn test_portal_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);

    let config = PortalConfig::load(Some(&path)).unwrap();
    assert_eq!(config.logging.max_retained_errors, 8);

    let mut portal = Portal::from_config(&config, Some(dir.path())).unwrap();
    assert_eq!(portal.register_all().await, 1);

    let description = portal.describe("local").await.unwrap();
    assert_eq!(description.offered_portlets.len(), 1);

    portal.navigate("home", Some("Welcome")).await.unwrap();
    let html = portal.render().unwrap();
    assert!(html.contains("<title>Intranet - Welcome</title>"));
    assert!(html.contains("body{font-family:sans-serif}"));
    assert!(html.contains("<div class=\"portlet\">Hello & Welcome</div>"));
}

#[tokio::test]
async fn test_allowlist_refuses_other_consumers() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);

    let mut config = PortalConfig::load(Some(&path)).unwrap();
    config.consumer.name = "extranet".into();
    let portal = Portal::from_config(&config, Some(dir.path())).unwrap();
    assert_eq!(portal.register_all().await, 0);
    assert_eq!(
        portal.reporter().last().map(|e| e.code()),
        Some(clouber_core::ErrorCode::RegistrationRefused)
    );
}

#[test]
fn test_missing_file_is_a_load_error() {
    let dir = TempDir::new().unwrap();
    let err = PortalConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert_eq!(err.code(), clouber_core::ErrorCode::ConfigLoadError);
}
