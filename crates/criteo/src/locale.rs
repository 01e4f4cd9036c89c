//! Regional routing — maps the country segment of the event locale to
//! the submission-host prefix.
//!
//! Resolution always works from the raw normalized event, never from
//! the outbound payload, so mapping-side restructuring of locale
//! fields can never diverge from routing.

use std::collections::HashMap;

use connector_core::config::RoutingConfig;
use connector_core::NormalizedEvent;

/// Regional submission-host prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Us,
    Eu,
    As,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Eu => "eu",
            Region::As => "as",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "us" => Some(Region::Us),
            "eu" => Some(Region::Eu),
            "as" => Some(Region::As),
            _ => None,
        }
    }
}

/// Resolves a routing region from event context. The built-in country
/// table is static configuration data; per-country overrides and the
/// fallback region come from [`RoutingConfig`].
pub struct LocaleResolver {
    overrides: HashMap<String, Region>,
    default_region: Region,
}

impl LocaleResolver {
    pub fn new(config: &RoutingConfig) -> Self {
        let overrides = config
            .overrides
            .iter()
            .filter_map(|(country, region)| {
                Region::parse(region.as_str()).map(|r| (country.to_ascii_lowercase(), r))
            })
            .collect();
        let default_region = Region::parse(&config.default_region).unwrap_or(Region::Us);
        Self {
            overrides,
            default_region,
        }
    }

    /// Region for the given event, from the country segment of
    /// `context.locale`. Events without a parseable locale get the
    /// default region (the validation gate rejects those before
    /// dispatch anyway).
    pub fn resolve(&self, event: &NormalizedEvent) -> Region {
        let Some(locale) = event.locale() else {
            return self.default_region;
        };
        if let Some(region) = self.overrides.get(&locale.country) {
            return *region;
        }
        builtin_region(&locale.country).unwrap_or(self.default_region)
    }
}

impl Default for LocaleResolver {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}

/// Built-in ISO-country → region table.
fn builtin_region(country: &str) -> Option<Region> {
    match country {
        // European Union plus the common non-EU European markets
        "at" | "be" | "bg" | "ch" | "cy" | "cz" | "de" | "dk" | "ee" | "es" | "fi" | "fr"
        | "gb" | "gr" | "hr" | "hu" | "ie" | "it" | "lt" | "lu" | "lv" | "mt" | "nl" | "no"
        | "pl" | "pt" | "ro" | "ru" | "se" | "si" | "sk" | "tr" | "ua" => Some(Region::Eu),
        // Asia-Pacific
        "au" | "cn" | "hk" | "id" | "in" | "jp" | "kr" | "my" | "nz" | "ph" | "sg" | "th"
        | "tw" | "vn" => Some(Region::As),
        // Americas
        "ar" | "br" | "ca" | "cl" | "co" | "mx" | "pe" | "us" => Some(Region::Us),
        _ => None,
    }
}
