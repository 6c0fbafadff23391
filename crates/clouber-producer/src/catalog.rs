//! Producer catalog line format
//!
//! A producer's portlets are listed one per line. Each line is a list of
//! `key:value` fields separated by `&`:
//!
//! ```text
//! portletID:weather&displayName:Weather%20Now&markupType:text%2Fhtml/view/edit&initParam:city%3DShanghai
//! ```
//!
//! Values are percent-encoded. Multi-valued fields are split on `/` before
//! each piece is decoded, so `%2F` survives as a literal slash inside a piece.

use crate::portlet_info::{MarkupType, PortletFlag, PortletInfo};
use crate::types::{PortletMode, WindowState};
use clouber_core::{ClouberError, Result};
use std::path::Path;
use tracing::{debug, warn};

const CALL: &str = "catalog::parse_catalog_line";

/// Parse a whole catalog, skipping blank lines and `#` comments
pub fn parse_catalog(source: &str) -> Result<Vec<PortletInfo>> {
    let mut portlets = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let info = parse_catalog_line(line)
            .map_err(|err| err.with_context("line", (index + 1).to_string()))?;
        portlets.push(info);
    }
    debug!(count = portlets.len(), "parsed producer catalog");
    Ok(portlets)
}

/// Read and parse a catalog file
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<PortletInfo>> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|err| {
        ClouberError::config_load("catalog::load_catalog", err.to_string())
            .with_context("path", path.display().to_string())
    })?;
    parse_catalog(&source).map_err(|err| err.with_context("path", path.display().to_string()))
}

/// Parse one catalog line into a portlet description
pub fn parse_catalog_line(line: &str) -> Result<PortletInfo> {
    let mut fields = Vec::new();
    for part in line.trim().split('&') {
        if part.is_empty() {
            continue;
        }
        let (key, value) = part.split_once(':').ok_or_else(|| {
            ClouberError::config_parse(CALL, format!("missing ':' in field '{part}'"))
        })?;
        fields.push((percent_decode(key)?, value));
    }

    let mut ids = fields.iter().filter(|(key, _)| key == "portletID");
    let portlet_id = match (ids.next(), ids.next()) {
        (Some((_, raw)), None) => percent_decode(raw)?,
        (None, _) => {
            return Err(ClouberError::parameter(CALL, "missing portletID field"));
        }
        (Some(_), Some(_)) => {
            return Err(ClouberError::config_parse(CALL, "duplicate portletID field"));
        }
    };
    let mut info = PortletInfo::new(portlet_id).map_err(|err| err.with_call(CALL))?;

    let mut window_states: Option<Vec<WindowState>> = None;
    let mut locales: Option<Vec<String>> = None;

    for (key, raw) in &fields {
        match key.as_str() {
            "portletID" => {}
            "displayName" => {
                info.set_display_name(percent_decode(raw)?);
            }
            "title" => {
                info.set_title(percent_decode(raw)?);
            }
            "shortTitle" => {
                info.set_short_title(percent_decode(raw)?);
            }
            "description" => {
                info.set_description(percent_decode(raw)?);
            }
            "groupID" => {
                info.set_group_id(percent_decode(raw)?);
            }
            "keyword" => {
                for keyword in split_multi(raw)? {
                    info.add_keyword(keyword);
                }
            }
            "markupType" => {
                let mut pieces = split_multi(raw)?.into_iter();
                let mime_type = pieces.next().unwrap_or_default();
                let modes = pieces
                    .filter(|piece| !piece.is_empty())
                    .map(PortletMode::from)
                    .collect();
                info.add_markup_type(MarkupType::new(mime_type, modes));
            }
            "windowStates" => {
                window_states = Some(
                    split_multi(raw)?
                        .into_iter()
                        .filter(|piece| !piece.is_empty())
                        .map(WindowState::from)
                        .collect(),
                );
            }
            "locales" => {
                locales = Some(
                    split_multi(raw)?
                        .into_iter()
                        .filter(|piece| !piece.is_empty())
                        .collect(),
                );
            }
            "initParam" => {
                let decoded = percent_decode(raw)?;
                let (name, value) = decoded.split_once('=').unwrap_or((decoded.as_str(), ""));
                info.set_init_param(name, value);
            }
            "handledEvent" => {
                for event in split_multi(raw)? {
                    info.add_handled_event(event);
                }
            }
            "publishedEvent" => {
                for event in split_multi(raw)? {
                    info.add_published_event(event);
                }
            }
            other => match PortletFlag::from_key(other) {
                Some(flag) => {
                    info.set_flag_str(flag, &percent_decode(raw)?);
                }
                None => {
                    warn!(portlet = info.portlet_id(), key = other, "ignoring unknown catalog field");
                }
            },
        }
    }

    if window_states.is_some() || locales.is_some() {
        let mut markup_types = info.markup_types().to_vec();
        for markup_type in &mut markup_types {
            if let Some(states) = &window_states {
                markup_type.window_states.clone_from(states);
            }
            if let Some(locales) = &locales {
                markup_type.locales.clone_from(locales);
            }
        }
        if !markup_types.is_empty() {
            info.set_markup_types(markup_types);
        }
    }

    Ok(info)
}

fn split_multi(raw: &str) -> Result<Vec<String>> {
    raw.split('/').map(percent_decode).collect()
}

fn percent_decode(raw: &str) -> Result<String> {
    fn is_hex(b: u8) -> bool {
        b.is_ascii_hexdigit()
    }

    fn hex_value(b: u8) -> u8 {
        match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            _ => b - b'A' + 10,
        }
    }

    let bytes = raw.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() && is_hex(bytes[i + 1]) && is_hex(bytes[i + 2]) => {
                out.push(hex_value(bytes[i + 1]) << 4 | hex_value(bytes[i + 2]));
                i += 3;
            }
            b => {
                // Malformed percent sequences are kept literally.
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8(out).map_err(|e| {
        ClouberError::config_parse(CALL, format!("invalid utf8 after decoding '{raw}': {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clouber_core::ErrorCode;

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("Weather%20Now").unwrap(), "Weather Now");
        assert_eq!(percent_decode("application/xhtml+xml").unwrap(), "application/xhtml+xml");
        assert_eq!(percent_decode("100%").unwrap(), "100%");
        assert_eq!(percent_decode("%zz").unwrap(), "%zz");
        assert_eq!(percent_decode("%E5%A4%A9%E6%B0%94").unwrap(), "天气");
        assert!(percent_decode("%FF").is_err());
    }

    #[test]
    fn test_multi_values_split_before_decoding() {
        assert_eq!(
            split_multi("text%2Fhtml/view/edit").unwrap(),
            vec!["text/html", "view", "edit"]
        );
    }

    #[test]
    fn test_parse_line() {
        let info = parse_catalog_line(
            "portletID:weather&displayName:Weather%20Now&groupID:news\
             &markupType:text%2Fhtml/view/edit&markupType:text%2Fplain/view\
             &windowStates:normal/maximized&locales:en/zh-CN\
             &initParam:city%3DShanghai&handledEvent:city.changed\
             &publishedEvent:forecast.ready&onlySecure:true&bogus:1",
        )
        .unwrap();

        assert_eq!(info.portlet_id(), "weather");
        assert_eq!(info.display_name(), Some("Weather Now"));
        assert_eq!(info.group_id(), Some("news"));
        assert_eq!(info.markup_types().len(), 2);
        assert_eq!(info.markup_types()[0].mime_type, "text/html");
        assert_eq!(
            info.markup_types()[0].modes,
            vec![PortletMode::View, PortletMode::Edit]
        );
        assert_eq!(
            info.markup_types()[1].window_states,
            vec![WindowState::Normal, WindowState::Maximized]
        );
        assert_eq!(info.markup_types()[1].locales, vec!["en", "zh-CN"]);
        assert_eq!(info.init_param("city"), Some("Shanghai"));
        assert!(info.handles_event("city.changed"));
        assert_eq!(info.published_events(), ["forecast.ready".to_string()]);
        assert!(info.only_secure());
    }

    #[test]
    fn test_invalid_flag_keeps_default() {
        let info = parse_catalog_line("portletID:clock&onlySecure:maybe").unwrap();
        assert!(!info.only_secure());
    }

    #[test]
    fn test_structural_errors() {
        let err = parse_catalog_line("displayName:NoId").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParameterError);

        let err = parse_catalog_line("portletID:").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParameterError);

        let err = parse_catalog_line("portletID:a&portletID:b").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigParseError);

        let err = parse_catalog_line("portletID:a&displayName").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigParseError);
    }

    #[test]
    fn test_catalog_reports_line_numbers() {
        let source = "# demo\nportletID:a\n\nportletID:b&broken\n";
        let err = parse_catalog(source).unwrap_err();
        assert_eq!(err.context().get("line").map(String::as_str), Some("4"));
    }
}
