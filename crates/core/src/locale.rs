//! Regional context attached to every outgoing search request.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Language, country and currency context.
///
/// All three parts are normalized on construction: language is lowercase
/// (ISO 639-1/2), country is uppercase (ISO 3166-1 alpha-2) and currency is
/// uppercase (ISO 4217).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale {
    pub language: String,
    pub country: String,
    pub currency: String,
}

impl Default for Locale {
    /// `en / US / USD`, used whenever no user locale can be detected.
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            country: "US".to_string(),
            currency: "USD".to_string(),
        }
    }
}

impl Locale {
    pub fn new(
        language: impl AsRef<str>,
        country: impl AsRef<str>,
        currency: impl AsRef<str>,
    ) -> CoreResult<Self> {
        let language = language.as_ref().trim().to_ascii_lowercase();
        let country = country.as_ref().trim().to_ascii_uppercase();
        let currency = currency.as_ref().trim().to_ascii_uppercase();

        if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(CoreError::invalid_locale(format!("language code {language:?}")));
        }
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(CoreError::invalid_locale(format!("country code {country:?}")));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(CoreError::invalid_locale(format!("currency code {currency:?}")));
        }

        Ok(Self {
            language,
            country,
            currency,
        })
    }

    /// Parse a BCP 47 style (`en-US`) or POSIX style (`de_DE.UTF-8`, `fr_FR@euro`)
    /// tag. The currency is derived from the country.
    pub fn from_tag(tag: &str) -> CoreResult<Self> {
        let base = tag
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .trim();

        let mut parts = base.split(['-', '_']);
        let language = parts.next().unwrap_or_default();
        let country = parts
            .next()
            .ok_or_else(|| CoreError::invalid_locale(format!("{tag:?} has no country part")))?;

        let currency = currency_for_country(&country.to_ascii_uppercase())
            .ok_or_else(|| CoreError::invalid_locale(format!("no currency known for country {country:?}")))?;

        Self::new(language, country, currency)
    }

    /// Replace the currency, keeping language and country.
    pub fn with_currency(self, currency: impl AsRef<str>) -> CoreResult<Self> {
        Self::new(self.language, self.country, currency)
    }

    /// `en-US` style tag (no currency).
    pub fn tag(&self) -> String {
        format!("{}-{}", self.language, self.country)
    }
}

impl core::fmt::Display for Locale {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{}/{}", self.language, self.country, self.currency)
    }
}

/// ISO 4217 currency for an ISO 3166-1 alpha-2 country code (uppercase).
pub fn currency_for_country(country: &str) -> Option<&'static str> {
    let currency = match country {
        "US" | "EC" | "SV" | "PR" => "USD",
        "GB" => "GBP",
        "DE" | "FR" | "IT" | "ES" | "NL" | "BE" | "AT" | "IE" | "PT" | "FI" | "GR" | "LU"
        | "SK" | "SI" | "EE" | "LV" | "LT" | "CY" | "MT" | "HR" => "EUR",
        "CH" | "LI" => "CHF",
        "SE" => "SEK",
        "NO" => "NOK",
        "DK" => "DKK",
        "PL" => "PLN",
        "CZ" => "CZK",
        "HU" => "HUF",
        "RO" => "RON",
        "TR" => "TRY",
        "RU" => "RUB",
        "UA" => "UAH",
        "IL" => "ILS",
        "AE" => "AED",
        "SA" => "SAR",
        "QA" => "QAR",
        "EG" => "EGP",
        "MA" => "MAD",
        "NG" => "NGN",
        "GH" => "GHS",
        "KE" => "KES",
        "ZA" => "ZAR",
        "CA" => "CAD",
        "MX" => "MXN",
        "BR" => "BRL",
        "AR" => "ARS",
        "CL" => "CLP",
        "CO" => "COP",
        "PE" => "PEN",
        "JP" => "JPY",
        "CN" => "CNY",
        "HK" => "HKD",
        "TW" => "TWD",
        "KR" => "KRW",
        "IN" => "INR",
        "PK" => "PKR",
        "BD" => "BDT",
        "SG" => "SGD",
        "MY" => "MYR",
        "ID" => "IDR",
        "TH" => "THB",
        "VN" => "VND",
        "PH" => "PHP",
        "AU" => "AUD",
        "NZ" => "NZD",
        _ => return None,
    };
    Some(currency)
}
