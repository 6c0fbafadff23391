//! Producer protocol for the Clouber portal
//!
//! A consumer talks to portlet producers through a small WSRP-style
//! contract: register once, ask for a service description, then perform
//! blocking interactions, deliver events and fetch markup fragments.
//!
//! - `types`: request and response types shared by every operation
//! - `portlet_info`: portlet metadata with validated assignment
//! - `catalog`: the `key:value&key:value` producer catalog line format
//! - `producer`: the [`Producer`] trait
//! - `local`: [`LocalProducer`], an in-memory producer driven by a catalog
//! - `connection`: [`ProducerConnection`], the consumer's handle on one producer

pub mod catalog;
pub mod connection;
pub mod error;
pub mod local;
pub mod portlet_info;
pub mod producer;
pub mod types;

pub use catalog::{load_catalog, parse_catalog, parse_catalog_line};
pub use connection::ProducerConnection;
pub use error::ProducerErrorBuilder;
pub use local::{LocalProducer, PortletBehavior, PortletRequest, TemplatePortlet};
pub use portlet_info::{MarkupType, PortletInfo};
pub use producer::Producer;
pub use types::*;
