//! Control lookup and refresh dispatch
//!
//! The registry maps every control id on the current page to its position
//! in the tree. It is rebuilt after each reconciliation, so ids of
//! discarded controls stop resolving.

use crate::controls::Page;
use clouber_core::{ClouberError, ControlId, Result};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Position of a window in the page tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowPath {
    /// Region ordinal
    pub region: usize,
    /// Window ordinal within the region
    pub window: usize,
}

/// Position of any control in the page tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlPath {
    /// The page itself
    Page,
    /// A region by ordinal
    Region {
        /// Region ordinal
        region: usize,
    },
    /// A window
    Window(WindowPath),
}

/// What a refresh applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTarget {
    /// Every window on the page
    All,
    /// One control and everything below it
    Control(ControlId),
    /// Every window hosting the portlet
    Portlet(String),
}

impl RefreshTarget {
    /// Empty text refreshes everything, a decimal integer names a control,
    /// anything else is a portlet handle.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::All;
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = trimmed.parse::<ControlId>() {
                return Self::Control(id);
            }
        }
        Self::Portlet(trimmed.to_string())
    }
}

impl FromStr for RefreshTarget {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for RefreshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Control(id) => write!(f, "control {id}"),
            Self::Portlet(handle) => write!(f, "portlet {handle}"),
        }
    }
}

/// Map from control id to tree position for the current page
#[derive(Debug, Default)]
pub struct ControlRegistry {
    entries: HashMap<ControlId, ControlPath>,
}

impl ControlRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all entries with the controls of `page`
    pub fn rebuild(&mut self, page: &Page) {
        self.entries.clear();
        self.entries.insert(page.id(), ControlPath::Page);
        for (r, region) in page.regions().iter().enumerate() {
            self.entries
                .insert(region.id(), ControlPath::Region { region: r });
        }
        for (region, window, control) in page.windows() {
            self.entries
                .insert(control.id(), ControlPath::Window(WindowPath { region, window }));
        }
        debug!(page = page.page_id(), controls = self.entries.len(), "rebuilt control registry");
    }

    /// Forget every control
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Position of a control
    pub fn lookup(&self, id: ControlId) -> Option<ControlPath> {
        self.entries.get(&id).copied()
    }

    /// Number of registered controls
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no control is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Windows a refresh of `target` touches, in page order
    pub fn resolve(&self, target: &RefreshTarget, page: &Page) -> Result<Vec<WindowPath>> {
        let all = || {
            page.windows()
                .map(|(region, window, _)| WindowPath { region, window })
        };

        let paths = match target {
            RefreshTarget::All => all().collect(),
            RefreshTarget::Control(id) => match self.lookup(*id) {
                Some(ControlPath::Page) => all().collect(),
                Some(ControlPath::Region { region }) => all().filter(|p| p.region == region).collect(),
                Some(ControlPath::Window(path)) => vec![path],
                None => {
                    return Err(ClouberError::control_not_found("ControlRegistry::resolve", id));
                }
            },
            RefreshTarget::Portlet(handle) => page
                .windows()
                .filter(|(_, _, window)| window.portlet_handle() == handle)
                .map(|(region, window, _)| WindowPath { region, window })
                .collect(),
        };
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PageInfo, RegionInfo, WindowInfo};
    use clouber_core::ErrorCode;

    fn page() -> Page {
        Page::new(
            PageInfo::new("home", "Home", "two-column")
                .with_region(
                    RegionInfo::new("left")
                        .with_window(WindowInfo::new("a", "local", "clock"))
                        .with_window(WindowInfo::new("b", "local", "weather")),
                )
                .with_region(RegionInfo::new("right").with_window(WindowInfo::new("c", "local", "clock"))),
        )
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(RefreshTarget::parse(""), RefreshTarget::All);
        assert_eq!(RefreshTarget::parse("  "), RefreshTarget::All);
        assert_eq!(
            RefreshTarget::parse("42"),
            RefreshTarget::Control("42".parse().unwrap())
        );
        assert_eq!(RefreshTarget::parse("clock"), RefreshTarget::Portlet("clock".into()));
        assert_eq!(RefreshTarget::parse("-3"), RefreshTarget::Portlet("-3".into()));
    }

    #[test]
    fn test_resolve_targets() {
        let page = page();
        let mut registry = ControlRegistry::new();
        registry.rebuild(&page);
        assert_eq!(registry.len(), 6);

        let everything = registry.resolve(&RefreshTarget::All, &page).unwrap();
        assert_eq!(everything.len(), 3);
        assert_eq!(
            registry.resolve(&RefreshTarget::Control(page.id()), &page).unwrap(),
            everything
        );

        let left = registry
            .resolve(&RefreshTarget::Control(page.regions()[0].id()), &page)
            .unwrap();
        assert_eq!(
            left,
            vec![WindowPath { region: 0, window: 0 }, WindowPath { region: 0, window: 1 }]
        );

        let single = registry
            .resolve(&RefreshTarget::Control(page.regions()[1].windows()[0].id()), &page)
            .unwrap();
        assert_eq!(single, vec![WindowPath { region: 1, window: 0 }]);

        let clocks = registry
            .resolve(&RefreshTarget::Portlet("clock".into()), &page)
            .unwrap();
        assert_eq!(
            clocks,
            vec![WindowPath { region: 0, window: 0 }, WindowPath { region: 1, window: 0 }]
        );
    }

    #[test]
    fn test_unknown_control_is_an_error() {
        let page = page();
        let mut registry = ControlRegistry::new();
        registry.rebuild(&page);
        let stale = clouber_core::ControlId::next();
        let err = registry
            .resolve(&RefreshTarget::Control(stale), &page)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ControlNotFound);
    }
}
