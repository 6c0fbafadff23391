//! Page composition for the Clouber portal
//!
//! Pages are described as regions of windows, each window placing one
//! portlet from a producer. The portal builds a live control tree from the
//! description, keeps it in step across navigations, fetches markup through
//! producer connections and aggregates it into HTML.
//!
//! - `model`: page, region and window descriptions
//! - `controls`: live [`Page`], [`Region`] and [`Window`] instances
//! - `registry`: control id lookup and [`RefreshTarget`] dispatch
//! - `compose`: reconciliation between consecutive pages
//! - `theme`: page skeletons and the [`ThemeLoader`] seam
//! - `render`: HTML aggregation
//! - `config`: the portal configuration file
//! - `consumer`: [`Portal`], which ties everything together

pub mod compose;
pub mod config;
pub mod consumer;
pub mod controls;
pub mod model;
pub mod registry;
pub mod render;
pub mod theme;

pub use compose::{compose_title, reconcile, NavigationOutcome};
pub use config::{ConsumerSettings, PortalConfig, ProducerConfig};
pub use consumer::{ActionOutcome, Portal};
pub use controls::{CachedMarkup, Page, Region, Window};
pub use model::{PageInfo, RegionInfo, WindowInfo};
pub use registry::{ControlPath, ControlRegistry, RefreshTarget, WindowPath};
pub use render::{HtmlRenderer, PageRenderer};
pub use theme::{StaticThemeLoader, Theme, ThemeLoader};
