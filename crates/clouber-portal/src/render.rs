//! HTML aggregation
//!
//! Regions and windows are rendered into the theme skeleton. Portlet
//! fragments are inserted as-is apart from namespace rewriting.

use crate::controls::{Page, Region, Window};
use crate::theme::Theme;
use clouber_producer::WindowState;
use std::fmt::Write;

/// Token producers place where the window namespace belongs
pub const REWRITE_TOKEN: &str = "wsrp_rewrite_";

/// Rendering of the control tree into markup
pub trait PageRenderer {
    /// Render the page into the theme skeleton
    fn render_page(&self, page: &Page, theme: &Theme) -> String;

    /// Render one region with its windows
    fn render_region(&self, region: &Region) -> String;

    /// Render one window
    fn render_window(&self, window: &Window) -> String;
}

/// Renderer producing the portal's default HTML
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl PageRenderer for HtmlRenderer {
    fn render_page(&self, page: &Page, theme: &Theme) -> String {
        let regions: String = page
            .regions()
            .iter()
            .map(|region| self.render_region(region))
            .collect();
        let title = escape_html(page.title());
        fill_skeleton(
            &theme.skeleton,
            &[
                ("title", title.as_str()),
                ("css", theme.css.as_str()),
                ("regions", regions.as_str()),
            ],
        )
    }

    fn render_region(&self, region: &Region) -> String {
        let mut html = String::new();
        let _ = write!(
            html,
            "<div class=\"clouber-region\" data-namespace=\"{}\" data-control=\"{}\"",
            escape_html(region.namespace()),
            region.id()
        );
        if let Some(name) = region.name() {
            let _ = write!(html, " data-name=\"{}\"", escape_html(name));
        }
        html.push('>');
        for window in region.windows() {
            html.push_str(&self.render_window(window));
        }
        html.push_str("</div>");
        html
    }

    fn render_window(&self, window: &Window) -> String {
        let mut class = String::from("clouber-window");
        if window.shows_border() {
            class.push_str(" bordered");
        }
        if window.shows_thumbnail() {
            class.push_str(" thumbnail");
        }
        if window.is_failed() {
            class.push_str(" failed");
        }

        let mut html = String::new();
        let _ = write!(
            html,
            "<div class=\"{class}\" data-namespace=\"{}\" data-control=\"{}\" data-portlet=\"{}\" data-mode=\"{}\" data-window-state=\"{}\">",
            escape_html(window.namespace()),
            window.id(),
            escape_html(window.portlet_handle()),
            escape_html(window.mode().as_str()),
            escape_html(window.window_state().as_str()),
        );
        if window.shows_title() {
            let _ = write!(
                html,
                "<div class=\"clouber-window-title\">{}</div>",
                escape_html(window.title())
            );
        }
        if *window.window_state() != WindowState::Minimized {
            html.push_str("<div class=\"clouber-window-body\">");
            if let Some(markup) = window.markup() {
                if markup.requires_rewriting {
                    html.push_str(&markup.fragment.replace(REWRITE_TOKEN, window.namespace()));
                } else {
                    html.push_str(&markup.fragment);
                }
            }
            html.push_str("</div>");
        }
        html.push_str("</div>");
        html
    }
}

/// Replace `{{name}}` placeholders in one pass. Substituted text is never
/// scanned again and unknown placeholders are left as they are.
fn fill_skeleton(skeleton: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(skeleton.len());
    let mut rest = skeleton;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let known = after.find("}}").and_then(|end| {
            values
                .iter()
                .find(|(name, _)| *name == &after[..end])
                .map(|(_, value)| (end, *value))
        });
        match known {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape text for use in HTML content and attribute values
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::CachedMarkup;
    use crate::model::{PageInfo, RegionInfo, WindowInfo};
    use std::time::Instant;

    #[test]
    fn test_escape() {
        assert_eq!(escape_html("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_placeholders_in_values_are_not_expanded() {
        let page = Page::new(
            PageInfo::new("home", "{{regions}}", "basic")
                .with_region(RegionInfo::new("main")),
        );
        let theme = Theme::new("basic", "/* {{title}} */");
        let html = HtmlRenderer.render_page(&page, &theme);

        assert!(html.contains("<title>{{regions}}</title>"));
        assert!(html.contains("<style>/* {{title}} */</style>"));
        assert_eq!(html.matches("class=\"clouber-region\"").count(), 1);
    }

    #[test]
    fn test_unknown_placeholder_is_kept() {
        assert_eq!(
            fill_skeleton("{{a}}-{{b}}-{{", &[("a", "1")]),
            "1-{{b}}-{{"
        );
    }

    #[test]
    fn test_window_rewrites_namespace_tokens() {
        let mut window = Window::new(WindowInfo::new("w7_", "local", "form"));
        window.set_markup(CachedMarkup {
            fragment: "<form id=\"wsrp_rewrite_form\"></form>".into(),
            mime_type: "text/html".into(),
            requires_rewriting: true,
            fetched_at: Instant::now(),
            expires: None,
        });
        let html = HtmlRenderer.render_window(&window);
        assert!(html.contains("<form id=\"w7_form\"></form>"));
        assert!(html.contains("class=\"clouber-window bordered\""));
        assert!(html.contains("<div class=\"clouber-window-title\">form</div>"));
    }

    #[test]
    fn test_minimized_window_has_no_body() {
        let mut info = WindowInfo::new("w1", "local", "clock");
        info.window_state = WindowState::Minimized;
        info.title = Some("<Clock>".into());
        let html = HtmlRenderer.render_window(&Window::new(info));
        assert!(!html.contains("clouber-window-body"));
        assert!(html.contains("&lt;Clock&gt;"));
    }
}
