//! Page themes
//!
//! A theme is the page-level skeleton a template id resolves to. Themes are
//! loaded through [`ThemeLoader`] whenever navigation switches templates.

use async_trait::async_trait;
use clouber_core::{ClouberError, ErrorCode, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Skeleton used when a theme does not provide one
pub const DEFAULT_SKELETON: &str = "<!DOCTYPE html>\n<html>\n<head>\n<title>{{title}}</title>\n<style>{{css}}</style>\n</head>\n<body>\n{{regions}}\n</body>\n</html>\n";

fn default_skeleton() -> String {
    DEFAULT_SKELETON.to_string()
}

/// Stylesheet and HTML skeleton of a page template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// Template id pages refer to
    pub id: String,
    /// Stylesheet inlined into the skeleton
    #[serde(default)]
    pub css: String,
    /// HTML with `{{title}}`, `{{css}}` and `{{regions}}` placeholders
    #[serde(default = "default_skeleton")]
    pub skeleton: String,
}

impl Theme {
    /// Theme with the default skeleton
    pub fn new(id: impl Into<String>, css: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            css: css.into(),
            skeleton: default_skeleton(),
        }
    }
}

/// Source of themes
#[async_trait]
pub trait ThemeLoader: Send + Sync {
    /// Load the theme for a template id
    async fn load(&self, template_id: &str) -> Result<Theme>;
}

/// Loader serving themes held in memory
#[derive(Debug, Default)]
pub struct StaticThemeLoader {
    themes: HashMap<String, Theme>,
    loads: AtomicUsize,
}

impl StaticThemeLoader {
    /// Loader serving `themes`
    pub fn new(themes: impl IntoIterator<Item = Theme>) -> Self {
        Self {
            themes: themes.into_iter().map(|t| (t.id.clone(), t)).collect(),
            loads: AtomicUsize::new(0),
        }
    }

    /// Number of successful loads served
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ThemeLoader for StaticThemeLoader {
    async fn load(&self, template_id: &str) -> Result<Theme> {
        let theme = self.themes.get(template_id).cloned().ok_or_else(|| {
            ClouberError::new(
                ErrorCode::ThemeLoadError,
                "StaticThemeLoader::load",
                format!("no theme for template '{template_id}'"),
            )
            .with_context("template", template_id)
        })?;
        self.loads.fetch_add(1, Ordering::SeqCst);
        debug!(template = template_id, "loaded theme");
        Ok(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loads_are_counted() {
        let loader = StaticThemeLoader::new([Theme::new("basic", "body{}")]);
        assert_eq!(loader.load("basic").await.unwrap().css, "body{}");
        assert_eq!(loader.load_count(), 1);

        let err = loader.load("fancy").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ThemeLoadError);
        assert_eq!(loader.load_count(), 1);
    }

    #[test]
    fn test_skeleton_defaults_when_omitted() {
        let theme: Theme = toml::from_str("id = \"basic\"").unwrap();
        assert_eq!(theme.skeleton, DEFAULT_SKELETON);
        assert!(theme.css.is_empty());
    }
}
