//! Page reconciliation
//!
//! Navigating between pages that share a template patches the live tree
//! region by region: a region survives when the region at the same ordinal
//! on the new page has the same namespace. Switching templates discards the
//! tree and rebuilds it under a freshly loaded theme.

use crate::controls::{Page, Region};
use crate::model::PageInfo;
use clouber_core::ControlId;
use tracing::{debug, info, warn};

/// What a navigation did to the control tree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationOutcome {
    /// Page navigated to
    pub page_id: String,
    /// Composed page title
    pub title: String,
    /// Whether the page theme was loaded again
    pub theme_reloaded: bool,
    /// Regions constructed from scratch
    pub rebuilt: Vec<ControlId>,
    /// Regions carried over from the previous page
    pub reused: Vec<ControlId>,
    /// Regions torn down
    pub dropped: Vec<ControlId>,
    /// Windows whose markup was fetched during the navigation
    pub fetched: usize,
    /// Fetched windows that ended up with an error fragment
    pub failed: usize,
}

/// Page title with an optional per-refresh override appended
pub fn compose_title(configured: &str, title_override: Option<&str>) -> String {
    let configured = configured.trim();
    match title_override.map(str::trim).filter(|o| !o.is_empty()) {
        Some(extra) if configured.is_empty() => extra.to_string(),
        Some(extra) => format!("{configured} - {extra}"),
        None => configured.to_string(),
    }
}

/// Whether moving from `current` to `next` switches templates
pub fn requires_theme_reload(current: Option<&Page>, next: &PageInfo) -> bool {
    current.map_or(true, |page| page.template() != next.template)
}

/// Bring `current` in line with `next`, reusing what can be reused
pub fn reconcile(
    current: &mut Option<Page>,
    next: PageInfo,
    title_override: Option<&str>,
) -> NavigationOutcome {
    let title = compose_title(&next.title, title_override);
    let mut outcome = NavigationOutcome {
        page_id: next.id.clone(),
        title: title.clone(),
        ..NavigationOutcome::default()
    };

    match current.take() {
        Some(mut page) if page.template() == next.template => {
            let mut previous = std::mem::take(page.regions_mut()).into_iter();
            let mut regions = Vec::with_capacity(next.regions.len());

            for region_info in &next.regions {
                match previous.next() {
                    Some(region) if region.namespace() == region_info.namespace => {
                        if region.info().windows != region_info.windows {
                            warn!(
                                page = %next.id,
                                region = %region_info.namespace,
                                "reused region keeps its windows; the new page declares different ones"
                            );
                        }
                        outcome.reused.push(region.id());
                        regions.push(region);
                    }
                    stale => {
                        if let Some(region) = stale {
                            outcome.dropped.push(region.id());
                        }
                        let fresh = Region::new(region_info);
                        outcome.rebuilt.push(fresh.id());
                        regions.push(fresh);
                    }
                }
            }
            outcome.dropped.extend(previous.map(|region| region.id()));

            *page.regions_mut() = regions;
            page.set_info(next);
            page.set_title(title);
            debug!(
                page = %outcome.page_id,
                reused = outcome.reused.len(),
                rebuilt = outcome.rebuilt.len(),
                dropped = outcome.dropped.len(),
                "patched page under the same template"
            );
            *current = Some(page);
        }
        previous => {
            if let Some(old) = previous {
                outcome.dropped = old.regions().iter().map(Region::id).collect();
            }
            let mut page = Page::new(next);
            page.set_title(title);
            outcome.theme_reloaded = true;
            outcome.rebuilt = page.regions().iter().map(Region::id).collect();
            info!(
                page = %outcome.page_id,
                template = page.template(),
                regions = outcome.rebuilt.len(),
                "built page from scratch"
            );
            *current = Some(page);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RegionInfo, WindowInfo};

    fn page(id: &str, template: &str, regions: &[&str]) -> PageInfo {
        regions.iter().fold(PageInfo::new(id, "Portal", template), |page, ns| {
            page.with_region(
                RegionInfo::new(*ns).with_window(WindowInfo::new(format!("{ns}-w"), "local", "clock")),
            )
        })
    }

    #[test]
    fn test_title_composition() {
        assert_eq!(compose_title("Portal", None), "Portal");
        assert_eq!(compose_title("Portal", Some("")), "Portal");
        assert_eq!(compose_title("Portal", Some("Inbox")), "Portal - Inbox");
        assert_eq!(compose_title("", Some("Inbox")), "Inbox");
        assert_eq!(compose_title("  ", None), "");
    }

    #[test]
    fn test_first_navigation_builds_everything() {
        let mut current = None;
        let outcome = reconcile(&mut current, page("home", "basic", &["a", "b"]), None);
        assert!(outcome.theme_reloaded);
        assert_eq!(outcome.rebuilt.len(), 2);
        assert!(outcome.reused.is_empty());
        assert!(outcome.dropped.is_empty());
        assert_eq!(current.unwrap().title(), "Portal");
    }

    #[test]
    fn test_same_template_patches_by_namespace() {
        let mut current = None;
        reconcile(&mut current, page("home", "basic", &["a", "b", "c"]), None);
        let before: Vec<ControlId> = current
            .as_ref()
            .unwrap()
            .regions()
            .iter()
            .map(Region::id)
            .collect();
        let page_id = current.as_ref().unwrap().id();

        let outcome = reconcile(&mut current, page("news", "basic", &["a", "x"]), Some("Today"));
        let page = current.unwrap();

        assert!(!outcome.theme_reloaded);
        assert_eq!(outcome.reused, vec![before[0]]);
        assert_eq!(outcome.dropped, vec![before[1], before[2]]);
        assert_eq!(outcome.rebuilt, vec![page.regions()[1].id()]);
        assert_eq!(page.id(), page_id);
        assert_eq!(page.page_id(), "news");
        assert_eq!(page.title(), "Portal - Today");
    }

    #[test]
    fn test_reused_region_keeps_its_description() {
        let mut current = None;
        reconcile(&mut current, page("a", "basic", &["main"]), None);

        let other = PageInfo::new("b", "Portal", "basic").with_region(
            RegionInfo::new("main").with_window(WindowInfo::new("main-w", "local", "notes")),
        );
        let outcome = reconcile(&mut current, other, None);
        let page = current.unwrap();

        assert_eq!(outcome.reused.len(), 1);
        assert_eq!(page.page_id(), "b");
        let live: Vec<&str> = page.windows().map(|(_, _, w)| w.portlet_handle()).collect();
        let described: Vec<&str> = page.info().windows().map(|w| w.portlet.as_str()).collect();
        assert_eq!(live, vec!["clock"]);
        assert_eq!(described, live);
    }

    #[test]
    fn test_extra_regions_are_constructed() {
        let mut current = None;
        reconcile(&mut current, page("home", "basic", &["a"]), None);
        let outcome = reconcile(&mut current, page("home", "basic", &["a", "b"]), None);
        assert_eq!(outcome.reused.len(), 1);
        assert_eq!(outcome.rebuilt.len(), 1);
        assert!(outcome.dropped.is_empty());
    }

    #[test]
    fn test_template_switch_discards_tree() {
        let mut current = None;
        reconcile(&mut current, page("home", "basic", &["a", "b"]), None);
        let old_page = current.as_ref().unwrap().id();
        assert!(!requires_theme_reload(current.as_ref(), &page("x", "basic", &[])));
        assert!(requires_theme_reload(current.as_ref(), &page("x", "wide", &[])));

        let outcome = reconcile(&mut current, page("home", "wide", &["a", "b"]), None);
        assert!(outcome.theme_reloaded);
        assert!(outcome.reused.is_empty());
        assert_eq!(outcome.dropped.len(), 2);
        assert_eq!(outcome.rebuilt.len(), 2);
        assert_ne!(current.unwrap().id(), old_page);
    }
}
