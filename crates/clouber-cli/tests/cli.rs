//! Runs the `clouber` binary against a configuration on disk

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const CONFIG: &str = r#"
[[producers]]
id = "local"
catalog = [
    "portletID:clock&title:World%20Clock&markupType:text%2Fhtml/view/edit",
    "portletID:notes&title:Notes",
]

[[themes]]
id = "basic"

[[pages]]
id = "home"
title = "Home"
template = "basic"

[[pages.regions]]
namespace = "main"

[[pages.regions.windows]]
namespace = "w1"
producer = "local"
portlet = "clock"
"#;

fn clouber(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_clouber"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("CLOUBER_CONSUMER_NAME")
        .output()
        .unwrap()
}

fn config_file(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("portal.toml");
    fs::write(&path, CONFIG).unwrap();
    path
}

#[test]
fn test_validate_prints_summary() {
    let dir = TempDir::new().unwrap();
    let output = clouber(&config_file(&dir), &["validate"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("1 producer(s), 1 theme(s), 1 page(s)"));
    assert!(stdout.contains("page home [basic]: 1 region(s), 1 window(s)"));
}

#[test]
fn test_describe_lists_portlets() {
    let dir = TempDir::new().unwrap();
    let output = clouber(&config_file(&dir), &["describe", "--producer", "local"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("local: 2 portlet(s)"));
    assert!(stdout.contains("World Clock"));
    assert!(stdout.contains("[view, edit]"));
}

#[test]
fn test_render_prints_page() {
    let dir = TempDir::new().unwrap();
    let output = clouber(&config_file(&dir), &["render", "home", "--title", "Today"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("<title>Home - Today</title>"));
    assert!(stdout.contains("<div class=\"portlet\">World Clock</div>"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("portal.toml");
    fs::write(&path, CONFIG.replace("producer = \"local\"", "producer = \"remote\"")).unwrap();
    let output = clouber(&path, &["validate"]);
    assert!(!output.status.success());
}
