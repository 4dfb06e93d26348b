//! Locale value types.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Locale the application runs with unless configured otherwise.
pub const DEFAULT_TARGET_LOCALE: &str = "en-US";

/// Error parsing a locale tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid locale tag: '{0}'")]
pub struct LocaleParseError(pub String);

/// Language + optional region, e.g. `zh-CN`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Locale {
    language: String,
    region: Option<String>,
}

/// Pattern: 2-3 letter language, optional `-`/`_` separated region
/// (2 letters or a 3 digit UN M.49 code).
fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z]{2,3})(?:[-_]([A-Za-z]{2}|[0-9]{3}))?$").unwrap()
    })
}

impl Locale {
    /// Create a locale from already validated parts.
    pub fn new(language: impl Into<String>, region: Option<&str>) -> Self {
        Self {
            language: language.into().to_ascii_lowercase(),
            region: region.map(|r| r.to_ascii_uppercase()),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// BCP 47 style tag, e.g. `zh-CN`.
    pub fn to_tag(&self) -> String {
        self.to_string()
    }
}

impl FromStr for Locale {
    type Err = LocaleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let caps = tag_pattern()
            .captures(trimmed)
            .ok_or_else(|| LocaleParseError(s.to_string()))?;
        let language = &caps[1];
        let region = caps.get(2).map(|m| m.as_str());
        Ok(Locale::new(language, region))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{}", self.language, region),
            None => write!(f, "{}", self.language),
        }
    }
}

/// Ordered locale preference list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocaleList(Vec<Locale>);

impl LocaleList {
    pub fn new(locales: Vec<Locale>) -> Self {
        Self(locales)
    }

    pub fn single(locale: Locale) -> Self {
        Self(vec![locale])
    }

    /// First (most preferred) locale.
    pub fn primary(&self) -> Option<&Locale> {
        self.0.first()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locale> {
        self.0.iter()
    }
}

impl fmt::Display for LocaleList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<String> = self.0.iter().map(Locale::to_tag).collect();
        write!(f, "[{}]", tags.join(","))
    }
}

/// The fixed locale both lifecycle passes converge on.
///
/// Immutable once built; the same value drives the pre-attach and the
/// post-attach pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocaleTarget {
    locale: Locale,
}

impl LocaleTarget {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Parse a target from a tag such as `"zh-CN"`.
    pub fn parse(tag: &str) -> Result<Self, LocaleParseError> {
        Ok(Self::new(tag.parse()?))
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// The target as a one-element preference list.
    pub fn locale_list(&self) -> LocaleList {
        LocaleList::single(self.locale.clone())
    }
}

impl Default for LocaleTarget {
    fn default() -> Self {
        Self::new(Locale::new("en", Some("US")))
    }
}

impl fmt::Display for LocaleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.locale.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_and_region() {
        let locale: Locale = "zh-CN".parse().unwrap();
        assert_eq!(locale.language(), "zh");
        assert_eq!(locale.region(), Some("CN"));
        assert_eq!(locale.to_tag(), "zh-CN");
    }

    #[test]
    fn test_parse_normalizes_case_and_separator() {
        let locale: Locale = " PT_br ".parse().unwrap();
        assert_eq!(locale.to_tag(), "pt-BR");
    }

    #[test]
    fn test_parse_language_only_and_numeric_region() {
        assert_eq!("de".parse::<Locale>().unwrap().region(), None);
        assert_eq!("es-419".parse::<Locale>().unwrap().to_tag(), "es-419");
    }

    #[test]
    fn test_parse_rejects_malformed_tags() {
        for tag in ["", "e", "english", "en-", "en-USA1", "12-US"] {
            assert!(tag.parse::<Locale>().is_err(), "'{}' should not parse", tag);
        }
    }

    #[test]
    fn test_default_target_matches_constant() {
        assert_eq!(LocaleTarget::default().to_string(), DEFAULT_TARGET_LOCALE);
    }

    #[test]
    fn test_target_locale_list_is_single() {
        let target = LocaleTarget::parse("ja-JP").unwrap();
        let list = target.locale_list();
        assert_eq!(list.len(), 1);
        assert_eq!(list.primary(), Some(target.locale()));
        assert_eq!(list.to_string(), "[ja-JP]");
    }
}
