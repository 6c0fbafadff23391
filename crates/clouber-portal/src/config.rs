//! Portal configuration file
//!
//! ```toml
//! [consumer]
//! name = "intranet"
//! locale = "zh-CN"
//!
//! [logging]
//! level = "debug"
//!
//! [[producers]]
//! id = "local"
//! catalog = ["portletID:clock&displayName:Clock"]
//!
//! [[themes]]
//! id = "basic"
//!
//! [[pages]]
//! id = "home"
//! template = "basic"
//!
//! [[pages.regions]]
//! namespace = "main"
//!
//! [[pages.regions.windows]]
//! namespace = "w1"
//! producer = "local"
//! portlet = "clock"
//! ```
//!
//! Sources are merged defaults, then file, then environment
//! (`CLOUBER_LOCALE`, `CLOUBER_LOG_LEVEL`, `CLOUBER_CONSUMER_NAME`).

use crate::model::{PageInfo, RegionInfo};
use crate::theme::Theme;
use clouber_core::config::{
    ConfigDefaults, ConfigLoader, ConfigMerge, ConfigValidation, ConfigValidator,
};
use clouber_core::{Locale, LoggingConfig, Result};
use clouber_producer::{
    parse_catalog, load_catalog, LocalProducer, PortletInfo, PortletMode, RegistrationData,
    WindowState,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the consumer locale
pub const ENV_LOCALE: &str = "CLOUBER_LOCALE";
/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "CLOUBER_LOG_LEVEL";
/// Environment variable overriding the consumer name
pub const ENV_CONSUMER_NAME: &str = "CLOUBER_CONSUMER_NAME";

/// How the portal presents itself to producers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerSettings {
    /// Consumer name sent on registration
    pub name: String,
    /// Consumer agent sent on registration
    pub agent: String,
    /// Locale tag for markup and error messages
    pub locale: String,
    /// Mime types requested from producers, in order of preference
    pub mime_types: Vec<String>,
    /// Modes the consumer can render
    pub modes: Vec<PortletMode>,
    /// Window states the consumer can render
    pub window_states: Vec<WindowState>,
    /// Whether the client connection is secure
    pub secure: bool,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            name: "clouber-portal".to_string(),
            agent: concat!("clouber/", env!("CARGO_PKG_VERSION")).to_string(),
            locale: "en".to_string(),
            mime_types: vec!["text/html".to_string()],
            modes: vec![PortletMode::View, PortletMode::Edit, PortletMode::Help],
            window_states: vec![
                WindowState::Normal,
                WindowState::Minimized,
                WindowState::Maximized,
            ],
            secure: false,
        }
    }
}

impl ConsumerSettings {
    /// Parsed locale
    pub fn locale(&self) -> Locale {
        Locale::from_tag(&self.locale)
    }

    /// Registration request built from these settings
    pub fn registration_data(&self) -> RegistrationData {
        let mut data = RegistrationData::new(&self.name, &self.agent);
        data.consumer_modes.clone_from(&self.modes);
        data.consumer_window_states.clone_from(&self.window_states);
        data
    }
}

/// A producer the portal connects to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Id windows refer to
    pub id: String,
    /// Producer location
    #[serde(default)]
    pub url: Option<String>,
    /// Inline catalog lines
    #[serde(default)]
    pub catalog: Vec<String>,
    /// Catalog file, relative to the configuration file
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,
    /// Consumers the producer accepts; absent accepts everyone
    #[serde(default)]
    pub allowed_consumers: Option<Vec<String>>,
}

impl ProducerConfig {
    /// Producer location, `local://<id>` when none was configured
    pub fn url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("local://{}", self.id))
    }

    /// Inline catalog followed by the catalog file
    pub fn portlets(&self, base_dir: Option<&Path>) -> Result<Vec<PortletInfo>> {
        let mut portlets = parse_catalog(&self.catalog.join("\n"))
            .map_err(|err| err.with_context("producer", self.id.clone()))?;
        if let Some(file) = &self.catalog_file {
            let path = match base_dir {
                Some(dir) if file.is_relative() => dir.join(file),
                _ => file.clone(),
            };
            portlets.extend(
                load_catalog(&path).map_err(|err| err.with_context("producer", self.id.clone()))?,
            );
        }
        Ok(portlets)
    }

    /// In-memory producer serving this producer's catalog
    pub fn build_local(&self, base_dir: Option<&Path>) -> Result<LocalProducer> {
        let producer = LocalProducer::new(self.id.clone(), self.portlets(base_dir)?);
        Ok(match &self.allowed_consumers {
            Some(allowed) => producer.with_allowed_consumers(allowed.iter().cloned()),
            None => producer,
        })
    }
}

/// Complete portal configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Consumer identity and capabilities
    pub consumer: ConsumerSettings,
    /// Logging and error retention
    pub logging: LoggingConfig,
    /// Producers
    pub producers: Vec<ProducerConfig>,
    /// Themes by template id
    pub themes: Vec<Theme>,
    /// Pages
    pub pages: Vec<PageInfo>,
}

impl PortalConfig {
    /// Load defaults, then `path` if given, then the environment, and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut loader = ConfigLoader::new().with_defaults(Self::defaults());
        if let Some(path) = path {
            loader = loader.with_file(path)?;
        }
        let loader = loader.with_environment(|config| {
            config.apply_overrides(|key| std::env::var(key).ok())
        });
        debug!(sources = loader.sources().len(), "loading portal configuration");
        loader.build_validated()
    }

    /// Parse configuration text without environment overrides
    pub fn from_toml(raw: &str) -> Result<Self> {
        let mut config = Self::defaults();
        let parsed: Self = toml::from_str(raw)?;
        config.merge_with(&parsed)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up by environment variable name. Returns
    /// whether anything was applied.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = false;
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(locale) = present(ENV_LOCALE) {
            self.consumer.locale = locale;
            applied = true;
        }
        if let Some(level) = present(ENV_LOG_LEVEL) {
            self.logging.level = level;
            applied = true;
        }
        if let Some(name) = present(ENV_CONSUMER_NAME) {
            self.consumer.name = name;
            applied = true;
        }
        applied
    }

    /// Page description by id
    pub fn page(&self, id: &str) -> Option<&PageInfo> {
        self.pages.iter().find(|page| page.id == id)
    }
}

fn upsert<T: Clone>(target: &mut Vec<T>, incoming: &[T], key: impl Fn(&T) -> &str) {
    for item in incoming {
        match target.iter_mut().find(|existing| key(existing) == key(item)) {
            Some(existing) => *existing = item.clone(),
            None => target.push(item.clone()),
        }
    }
}

impl ConfigDefaults for PortalConfig {
    fn defaults() -> Self {
        Self::default()
    }
}

impl ConfigMerge<PortalConfig> for PortalConfig {
    fn merge_with(&mut self, other: &PortalConfig) -> Result<()> {
        if other.consumer != ConsumerSettings::default() {
            self.consumer = other.consumer.clone();
        }
        if other.logging != LoggingConfig::default() {
            self.logging = other.logging.clone();
        }
        upsert(&mut self.producers, &other.producers, |p| &p.id);
        upsert(&mut self.themes, &other.themes, |t| &t.id);
        upsert(&mut self.pages, &other.pages, |p| &p.id);
        Ok(())
    }
}

impl ConfigValidation for PortalConfig {
    fn validate(&self) -> Result<()> {
        let mut validator = ConfigValidator::new();

        let mut consumer = validator.for_field("consumer");
        consumer
            .not_empty("name", &self.consumer.name)
            .custom(
                "mime_types",
                &self.consumer.mime_types,
                |types| !types.is_empty(),
                "at least one mime type is required",
            );
        validator.merge(consumer);

        let retained = u32::try_from(self.logging.max_retained_errors).unwrap_or(u32::MAX);
        validator.range("logging.max_retained_errors", retained, Some(1), Some(65_536));

        validator
            .each("producers", &self.producers, |v, _, producer| {
                v.not_empty("id", &producer.id);
            })
            .unique("producers.id", self.producers.iter().map(|p| p.id.as_str()))
            .each("themes", &self.themes, |v, _, theme| {
                v.not_empty("id", &theme.id);
            })
            .unique("themes.id", self.themes.iter().map(|t| t.id.as_str()))
            .unique("pages.id", self.pages.iter().map(|p| p.id.as_str()));

        let producers: HashSet<&str> = self.producers.iter().map(|p| p.id.as_str()).collect();
        let themes: HashSet<&str> = self.themes.iter().map(|t| t.id.as_str()).collect();

        validator.each("pages", &self.pages, |v, _, page| {
            v.not_empty("id", &page.id).custom(
                "template",
                page.template.as_str(),
                |template| themes.contains(template),
                "template does not name a configured theme",
            );
            v.unique("regions.namespace", page.regions.iter().map(|r| r.namespace.as_str()));
            v.each("regions", &page.regions, |v, _, region| {
                v.not_empty("namespace", &region.namespace);
                v.each("windows", &region.windows, |v, _, window| {
                    v.not_empty("namespace", &window.namespace)
                        .not_empty("portlet", &window.portlet)
                        .custom(
                            "producer",
                            window.producer.as_str(),
                            |producer| producers.contains(producer),
                            "producer is not configured",
                        );
                });
            });
        });

        // Regions sharing a template and namespace are reused across
        // navigation and must host the same windows.
        let mut shared: HashMap<(&str, &str), &RegionInfo> = HashMap::new();
        for (p, page) in self.pages.iter().enumerate() {
            for (r, region) in page.regions.iter().enumerate() {
                let first = *shared
                    .entry((page.template.as_str(), region.namespace.as_str()))
                    .or_insert(region);
                validator.custom(
                    &format!("pages[{p}].regions[{r}].windows"),
                    &region.windows,
                    |windows| *windows == first.windows,
                    "region differs from a same-template page region with this namespace",
                );
            }
        }

        let mut errors = validator.all_errors().into_iter();
        match errors.next() {
            None => Ok(()),
            Some(first) => {
                for other in errors {
                    warn!(%other, "configuration violation");
                }
                Err(first.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clouber_core::ErrorCode;

    const SAMPLE: &str = r#"
        [consumer]
        name = "intranet"
        locale = "zh-CN"

        [[producers]]
        id = "local"
        catalog = ["portletID:clock&displayName:Clock"]

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

    #[test]
    fn test_parse_sample() {
        let config = PortalConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.consumer.name, "intranet");
        assert_eq!(config.consumer.locale(), Locale::Zh);
        assert_eq!(config.consumer.mime_types, vec!["text/html"]);
        assert_eq!(config.logging.max_retained_errors, 256);
        assert_eq!(config.producers[0].url(), "local://local");
        assert_eq!(config.producers[0].portlets(None).unwrap().len(), 1);
        assert_eq!(config.page("home").unwrap().regions[0].windows[0].portlet, "clock");
    }

    #[test]
    fn test_overrides() {
        let mut config = PortalConfig::from_toml(SAMPLE).unwrap();
        let applied = config.apply_overrides(|key| match key {
            ENV_LOG_LEVEL => Some("trace".to_string()),
            ENV_CONSUMER_NAME => Some("  ".to_string()),
            _ => None,
        });
        assert!(applied);
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.consumer.name, "intranet");
        assert!(!config.apply_overrides(|_| None));
    }

    #[test]
    fn test_unknown_producer_is_rejected() {
        let broken = SAMPLE.replace("producer = \"local\"", "producer = \"remote\"");
        let err = PortalConfig::from_toml(&broken).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParameterError);
        assert_eq!(
            err.context().get("field").map(String::as_str),
            Some("pages[0].regions[0].windows[0].producer")
        );
    }

    #[test]
    fn test_unknown_template_and_duplicate_regions() {
        let broken = SAMPLE.replace("template = \"basic\"", "template = \"wide\"");
        let err = PortalConfig::from_toml(&broken).unwrap_err();
        assert_eq!(
            err.context().get("field").map(String::as_str),
            Some("pages[0].template")
        );

        let duplicated = format!("{SAMPLE}\n[[pages.regions]]\nnamespace = \"main\"\n");
        let err = PortalConfig::from_toml(&duplicated).unwrap_err();
        assert_eq!(
            err.context().get("field").map(String::as_str),
            Some("pages[0].regions.namespace")
        );
    }

    #[test]
    fn test_shared_region_must_host_same_windows() {
        let second = |portlet: &str| {
            format!(
                "{SAMPLE}\n[[pages]]\nid = \"news\"\ntemplate = \"basic\"\n\n\
                 [[pages.regions]]\nnamespace = \"main\"\n\n\
                 [[pages.regions.windows]]\nnamespace = \"w1\"\nproducer = \"local\"\nportlet = \"{portlet}\"\n"
            )
        };

        let config = PortalConfig::from_toml(&second("clock")).unwrap();
        assert_eq!(config.pages.len(), 2);

        let err = PortalConfig::from_toml(&second("notes")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParameterError);
        assert_eq!(
            err.context().get("field").map(String::as_str),
            Some("pages[1].regions[0].windows")
        );
    }

    #[test]
    fn test_retention_range() {
        let config = PortalConfig {
            logging: LoggingConfig {
                level: "info".into(),
                max_retained_errors: 0,
            },
            ..PortalConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
