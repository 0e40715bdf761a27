//! Locale handling
//!
//! The storefront is served under a locale prefix (`/ru/books/...`) and every
//! API call carries the active locale in its `Accept-Language` header.

use crate::{Result, StorefrontError};
use std::fmt;

/// A validated language tag such as `en`, `ru` or `pt-BR`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale(String);

impl Locale {
    /// Parse and normalize a language tag.
    ///
    /// The primary subtag is 2-3 ASCII letters (lowercased); an optional
    /// region subtag of 2-8 alphanumerics is uppercased.
    pub fn parse(tag: &str) -> Result<Self> {
        let tag = tag.trim().replace('_', "-");
        let mut parts = tag.splitn(2, '-');
        let primary = parts.next().unwrap_or_default();
        let region = parts.next();

        let primary_ok =
            (2..=3).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_alphabetic());
        let region_ok = region.map_or(true, |r| {
            (2..=8).contains(&r.len()) && r.chars().all(|c| c.is_ascii_alphanumeric())
        });

        if !primary_ok || !region_ok {
            return Err(StorefrontError::Config(format!(
                "Invalid locale tag '{}'",
                tag
            )));
        }

        let mut normalized = primary.to_ascii_lowercase();
        if let Some(region) = region {
            normalized.push('-');
            normalized.push_str(&region.to_ascii_uppercase());
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag (`pt` for `pt-BR`)
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// Value for the `Accept-Language` request header
    pub fn as_header(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The locales the storefront is translated into, plus the fallback
#[derive(Debug, Clone)]
pub struct LocaleSet {
    supported: Vec<Locale>,
    default: Locale,
}

impl LocaleSet {
    pub fn new(supported: Vec<Locale>, default: Locale) -> Result<Self> {
        if !supported.contains(&default) {
            return Err(StorefrontError::Config(format!(
                "Default locale '{}' is not in the supported set",
                default
            )));
        }
        Ok(Self { supported, default })
    }

    pub fn default_locale(&self) -> &Locale {
        &self.default
    }

    pub fn supported(&self) -> &[Locale] {
        &self.supported
    }

    /// Find a supported locale by exact tag, then by primary language
    pub fn find(&self, tag: &str) -> Option<&Locale> {
        let wanted = Locale::parse(tag).ok()?;
        self.supported
            .iter()
            .find(|l| **l == wanted)
            .or_else(|| {
                self.supported
                    .iter()
                    .find(|l| l.language() == wanted.language())
            })
    }

    pub fn is_supported(&self, tag: &str) -> bool {
        self.find(tag).is_some()
    }

    /// Preferred locale if supported, otherwise the default
    pub fn resolve(&self, preferred: Option<&str>) -> Locale {
        preferred
            .and_then(|tag| self.find(tag))
            .unwrap_or(&self.default)
            .clone()
    }

    /// Split a leading locale segment off a storefront path.
    ///
    /// `/ru/books/1` yields `(ru, "/books/1")`. Paths without a supported
    /// prefix resolve to the default locale and are returned unchanged.
    pub fn from_path(&self, path: &str) -> (Locale, String) {
        let trimmed = path.trim_start_matches('/');
        let (first, rest) = match trimmed.find('/') {
            Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
            None => (trimmed, ""),
        };

        match self.supported.iter().find(|l| l.as_str().eq_ignore_ascii_case(first)) {
            Some(locale) => {
                let rest = if rest.is_empty() { "/" } else { rest };
                (locale.clone(), rest.to_string())
            }
            None => (self.default.clone(), path.to_string()),
        }
    }

    /// Pick the best supported locale for an `Accept-Language` header
    pub fn negotiate(&self, accept_language: &str) -> Locale {
        let mut candidates: Vec<(f32, usize, &str)> = accept_language
            .split(',')
            .enumerate()
            .filter_map(|(position, item)| {
                let mut parts = item.trim().split(';');
                let tag = parts.next()?.trim();
                if tag.is_empty() || tag == "*" {
                    return None;
                }
                let quality = parts
                    .filter_map(|p| p.trim().strip_prefix("q="))
                    .find_map(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                (quality > 0.0).then_some((quality, position, tag))
            })
            .collect();

        // Highest quality first; header order breaks ties
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        candidates
            .into_iter()
            .find_map(|(_, _, tag)| self.find(tag))
            .unwrap_or(&self.default)
            .clone()
    }

    /// Storefront route of the login view for a locale
    pub fn login_path(&self, locale: &Locale) -> String {
        format!("/{}/login", locale)
    }
}

impl Default for LocaleSet {
    fn default() -> Self {
        let en = Locale("en".to_string());
        Self {
            supported: vec![en.clone(), Locale("ru".into()), Locale("uz".into())],
            default: en,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(Locale::parse("EN").unwrap().as_str(), "en");
        assert_eq!(Locale::parse("pt_br").unwrap().as_str(), "pt-BR");
        assert_eq!(Locale::parse("pt-BR").unwrap().language(), "pt");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Locale::parse("").is_err());
        assert!(Locale::parse("english").is_err());
        assert!(Locale::parse("e1").is_err());
        assert!(Locale::parse("en-").is_err());
    }

    #[test]
    fn test_new_requires_default_in_set() {
        let en = Locale::parse("en").unwrap();
        let ru = Locale::parse("ru").unwrap();
        assert!(LocaleSet::new(vec![en.clone()], ru).is_err());
        assert!(LocaleSet::new(vec![en.clone()], en).is_ok());
    }

    #[test]
    fn test_resolve() {
        let set = LocaleSet::default();
        assert_eq!(set.resolve(Some("ru")).as_str(), "ru");
        assert_eq!(set.resolve(Some("ru-RU")).as_str(), "ru");
        assert_eq!(set.resolve(Some("fr")).as_str(), "en");
        assert_eq!(set.resolve(None).as_str(), "en");
    }

    #[test]
    fn test_from_path() {
        let set = LocaleSet::default();

        let (locale, rest) = set.from_path("/uz/books/war-and-peace");
        assert_eq!(locale.as_str(), "uz");
        assert_eq!(rest, "/books/war-and-peace");

        let (locale, rest) = set.from_path("/ru");
        assert_eq!(locale.as_str(), "ru");
        assert_eq!(rest, "/");

        let (locale, rest) = set.from_path("/books/1");
        assert_eq!(locale.as_str(), "en");
        assert_eq!(rest, "/books/1");
    }

    #[test]
    fn test_negotiate() {
        let set = LocaleSet::default();
        assert_eq!(set.negotiate("ru-RU,ru;q=0.9,en;q=0.8").as_str(), "ru");
        assert_eq!(set.negotiate("de;q=1.0, uz;q=0.5, en;q=0.4").as_str(), "uz");
        assert_eq!(set.negotiate("en;q=0.2, ru;q=0.7").as_str(), "ru");
        assert_eq!(set.negotiate("ru;q=0, de").as_str(), "en");
        assert_eq!(set.negotiate("").as_str(), "en");
    }

    #[test]
    fn test_login_path() {
        let set = LocaleSet::default();
        let ru = set.resolve(Some("ru"));
        assert_eq!(set.login_path(&ru), "/ru/login");
    }
}
