//! English/Chinese message table for error codes

use crate::errors::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported message locales
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English
    #[default]
    En,
    /// Simplified Chinese
    Zh,
}

impl Locale {
    /// Parse a language tag such as `en`, `en-US`, `zh_CN`.
    ///
    /// Unknown tags fall back to English.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match primary.as_str() {
            "zh" => Self::Zh,
            _ => Self::En,
        }
    }

    /// Canonical language tag
    pub fn tag(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }
}

impl FromStr for Locale {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Look up the localized description of an error code
pub fn message(code: ErrorCode, locale: Locale) -> &'static str {
    let (en, zh) = entry(code);
    match locale {
        Locale::En => en,
        Locale::Zh => zh,
    }
}

fn entry(code: ErrorCode) -> (&'static str, &'static str) {
    match code {
        ErrorCode::ParameterError => ("Invalid parameter", "参数错误"),
        ErrorCode::ConfigLoadError => ("Failed to load configuration", "加载配置失败"),
        ErrorCode::ConfigParseError => ("Failed to parse configuration", "解析配置失败"),
        ErrorCode::RegistrationRefused => ("Producer refused registration", "生产者拒绝注册"),
        ErrorCode::NotRegistered => ("Not registered with producer", "尚未在生产者处注册"),
        ErrorCode::InvalidRegistration => ("Invalid registration handle", "无效的注册句柄"),
        ErrorCode::ProducerUnreachable => ("Producer is unreachable", "无法连接生产者"),
        ErrorCode::PortletNotFound => ("Portlet not found", "找不到门户组件"),
        ErrorCode::InteractionInProgress => {
            ("An interaction is already in progress", "交互正在进行中")
        }
        ErrorCode::InteractionFailed => ("Interaction failed", "交互失败"),
        ErrorCode::EventHandlingFailed => ("Event handling failed", "事件处理失败"),
        ErrorCode::MarkupFailed => ("Failed to retrieve markup", "获取标记失败"),
        ErrorCode::UnsupportedMode => ("Unsupported portlet mode", "不支持的门户组件模式"),
        ErrorCode::UnsupportedMimeType => ("Unsupported markup type", "不支持的标记类型"),
        ErrorCode::PageNotFound => ("Page not found", "找不到页面"),
        ErrorCode::ControlNotFound => ("Control not found", "找不到控件"),
        ErrorCode::ThemeLoadError => ("Failed to load theme", "加载主题失败"),
        ErrorCode::ProducerNotConfigured => ("Producer is not configured", "未配置生产者"),
        ErrorCode::Unknown => ("Unknown error", "未知错误"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_from_tag() {
        assert_eq!(Locale::from_tag("en"), Locale::En);
        assert_eq!(Locale::from_tag("en-US"), Locale::En);
        assert_eq!(Locale::from_tag("ZH_cn"), Locale::Zh);
        assert_eq!(Locale::from_tag("zh-TW"), Locale::Zh);
        assert_eq!(Locale::from_tag("fr"), Locale::En);
        assert_eq!(Locale::from_tag(""), Locale::En);
    }

    #[test]
    fn test_every_code_has_both_languages() {
        for code in ErrorCode::ALL {
            let en = message(code, Locale::En);
            let zh = message(code, Locale::Zh);
            assert!(!en.is_empty(), "{code} has no English message");
            assert!(!zh.is_empty(), "{code} has no Chinese message");
            assert_ne!(en, zh);
        }
    }
}
