//! Active locale resolution for outgoing requests.

use tradeflow_core::Locale;

/// Environment variables consulted for the user locale, most specific first.
pub const LOCALE_ENV_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// Supplies the regional context stamped onto every request.
///
/// Precedence: explicit override, then detected user locale, then
/// [`Locale::default`] (`en / US / USD`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleResolver {
    detected: Option<Locale>,
    override_locale: Option<Locale>,
}

impl LocaleResolver {
    pub fn new(detected: Option<Locale>) -> Self {
        Self {
            detected,
            override_locale: None,
        }
    }

    /// Detect from the process environment.
    pub fn from_env() -> Self {
        Self::new(detect_with(|name| std::env::var(name).ok()))
    }

    pub fn with_override(mut self, locale: Locale) -> Self {
        self.override_locale = Some(locale);
        self
    }

    pub fn resolve(&self) -> Locale {
        self.override_locale
            .as_ref()
            .or(self.detected.as_ref())
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `resolve` falls back to the default.
    pub fn is_default(&self) -> bool {
        self.override_locale.is_none() && self.detected.is_none()
    }
}

/// First parseable locale among [`LOCALE_ENV_VARS`], looked up through `lookup`.
///
/// Empty values are skipped, as are `C`/`POSIX` and tags without a known country.
pub fn detect_with(lookup: impl Fn(&str) -> Option<String>) -> Option<Locale> {
    LOCALE_ENV_VARS.iter().find_map(|name| {
        let value = lookup(name)?;
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match Locale::from_tag(value) {
            Ok(locale) => Some(locale),
            Err(e) => {
                tracing::debug!(variable = name, value, error = %e, "ignoring locale variable");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn no_detection_resolves_documented_default() {
        let r = LocaleResolver::new(None);
        assert!(r.is_default());
        assert_eq!(r.resolve(), Locale::new("en", "US", "USD").unwrap());
    }

    #[test]
    fn lc_all_wins_over_lang() {
        let detected = detect_with(env(&[("LC_ALL", "de_DE.UTF-8"), ("LANG", "en_GB.UTF-8")]));
        assert_eq!(detected.unwrap().currency, "EUR");
    }

    #[test]
    fn unusable_values_fall_through() {
        let detected = detect_with(env(&[("LC_ALL", "C"), ("LC_MESSAGES", ""), ("LANG", "en_GB.UTF-8")]));
        assert_eq!(detected.unwrap(), Locale::new("en", "GB", "GBP").unwrap());

        assert_eq!(detect_with(env(&[("LANG", "POSIX")])), None);
    }

    #[test]
    fn override_beats_detection() {
        let r = LocaleResolver::new(Some(Locale::new("de", "DE", "EUR").unwrap()))
            .with_override(Locale::new("en", "NG", "NGN").unwrap());
        assert_eq!(r.resolve().currency, "NGN");
        assert!(!r.is_default());
    }
}
