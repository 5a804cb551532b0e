//! Name-based country classification
//!
//! Best effort only: the result decides which country bucket a node is
//! grouped into and nothing else.

use std::fmt;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

/// ISO 3166-1 alpha-2 codes.
const ISO_ALPHA2: &[&str] = &[
    "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AX", "AZ",
    "BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ", "BR", "BS",
    "BT", "BV", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK", "CL", "CM", "CN",
    "CO", "CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM", "DO", "DZ", "EC", "EE",
    "EG", "EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR", "GA", "GB", "GD", "GE", "GF",
    "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS", "GT", "GU", "GW", "GY", "HK", "HM",
    "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IM", "IN", "IO", "IQ", "IR", "IS", "IT", "JE", "JM",
    "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN", "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC",
    "LI", "LK", "LR", "LS", "LT", "LU", "LV", "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK",
    "ML", "MM", "MN", "MO", "MP", "MQ", "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA",
    "NC", "NE", "NF", "NG", "NI", "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG",
    "PH", "PK", "PL", "PM", "PN", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW",
    "SA", "SB", "SC", "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS",
    "ST", "SV", "SX", "SY", "SZ", "TC", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO",
    "TR", "TT", "TV", "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI",
    "VN", "VU", "WF", "WS", "YE", "YT", "ZA", "ZM", "ZW",
];

/// Locale substrings for names that carry no latin country code.
const LOCALE_HINTS: &[(&str, &str)] = &[
    ("台湾", "TW"),
    ("日本", "JP"),
    ("狮城", "SG"),
    ("新加坡", "SG"),
    ("美国", "US"),
    ("香港", "HK"),
    ("英国", "GB"),
    ("韩国", "KR"),
    ("德国", "DE"),
    ("法国", "FR"),
];

lazy_static! {
    /// Greedy prefix: captures the last run of two ASCII letters.
    static ref TRAILING_CODE: Regex = Regex::new(r".*([A-Za-z]{2})").unwrap();
}

/// A country, identified by its alpha-2 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Country {
    Code(&'static str),
    Unknown,
}

impl Country {
    pub const HK: Country = Country::Code("HK");
    pub const TW: Country = Country::Code("TW");
    pub const JP: Country = Country::Code("JP");
    pub const SG: Country = Country::Code("SG");
    pub const US: Country = Country::Code("US");
    pub const GB: Country = Country::Code("GB");
    pub const FR: Country = Country::Code("FR");
    pub const DE: Country = Country::Code("DE");
    pub const TH: Country = Country::Code("TH");
    pub const KR: Country = Country::Code("KR");
    pub const IS: Country = Country::Code("IS");

    /// Looks up a code, case-insensitively.
    pub fn by_alpha2(code: &str) -> Country {
        let upper = code.to_ascii_uppercase();
        ISO_ALPHA2
            .iter()
            .find(|c| **c == upper)
            .map(|c| Country::Code(*c))
            .unwrap_or(Country::Unknown)
    }

    pub fn alpha2(&self) -> Option<&'static str> {
        match self {
            Country::Code(code) => Some(*code),
            Country::Unknown => None,
        }
    }

    /// Flag emoji built from regional indicator symbols. Characters outside
    /// `A-Z` are skipped.
    pub fn flag(&self) -> String {
        match self {
            Country::Code(code) => code
                .chars()
                .filter(char::is_ascii_uppercase)
                .filter_map(|c| (c as u32).checked_sub('A' as u32))
                .filter_map(|offset| char::from_u32(0x1F1E6 + offset))
                .collect(),
            Country::Unknown => String::new(),
        }
    }

    /// Canonical group name of the country bucket, e.g. `🇭🇰HK`.
    pub fn group_tag(&self) -> String {
        match self {
            Country::Code(code) => format!("{}{}", self.flag(), code),
            Country::Unknown => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alpha2().unwrap_or("??"))
    }
}

/// Derives a node's country from its display name.
///
/// Tries the trailing two-letter code first, then the locale table, and
/// falls through to [`Country::Unknown`].
pub fn classify(name: &str) -> Country {
    if let Some(code) = TRAILING_CODE.captures(name).and_then(|c| c.get(1)) {
        let country = Country::by_alpha2(code.as_str());
        if country != Country::Unknown {
            return country;
        }
    }

    if let Some((_, code)) = LOCALE_HINTS.iter().find(|(hint, _)| name.contains(hint)) {
        return Country::by_alpha2(code);
    }

    debug!("cannot match country code: {}", name);
    Country::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_node_names() {
        for (name, expected) in [
            ("Na 美国 08 底特律 US 2倍率", Country::US),
            ("As 香港 06 HK 2倍率", Country::HK),
            ("香港 01丨1x HK", Country::HK),
            ("🇭🇰 HK 01", Country::HK),
            ("🇺🇸 US 01", Country::US),
            ("xyz 123", Country::Unknown),
        ] {
            assert_eq!(classify(name), expected, "{}", name);
        }
    }

    #[test]
    fn test_classify_falls_back_to_locale_table() {
        assert_eq!(classify("台湾 01"), Country::TW);
        assert_eq!(classify("狮城 03 1.5x"), Country::SG);
        // "xx" is not a country, the locale hint still applies
        assert_eq!(classify("日本 东京 xx"), Country::JP);
        assert_eq!(classify("节点 42"), Country::Unknown);
    }

    #[test]
    fn test_flag_and_tag() {
        assert_eq!(Country::HK.flag(), "🇭🇰");
        assert_eq!(Country::US.group_tag(), "🇺🇸US");
        assert_eq!(Country::by_alpha2("gb"), Country::GB);
        assert_eq!(Country::by_alpha2("ZZ"), Country::Unknown);
        assert_eq!(Country::Unknown.flag(), "");
    }

    #[test]
    fn test_flag_skips_non_letters() {
        assert_eq!(Country::Code("0K").flag(), "🇰");
        assert_eq!(Country::Code("hk").flag(), "");
        assert_eq!(Country::Code("H-K").group_tag(), "🇭🇰H-K");
    }
}
