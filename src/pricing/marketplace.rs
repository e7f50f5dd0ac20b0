use serde::{Deserialize, Serialize};
use std::fmt;

/// A sales channel. The four built-in channels have fee models in the default
/// schedule; anything else is carried verbatim (lowercased) as `Other` so that
/// a schedule file can price custom channels, or the engine can apply its
/// unknown-marketplace policy.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum Marketplace {
    #[default]
    Shopify,
    Amazon,
    Ebay,
    Walmart,
    Other(String),
}

impl Marketplace {
    pub const BUILT_IN: [Marketplace; 4] = [
        Marketplace::Shopify,
        Marketplace::Amazon,
        Marketplace::Ebay,
        Marketplace::Walmart,
    ];

    pub fn parse(input: &str) -> Self {
        let key = input.trim().to_lowercase();
        match key.as_str() {
            "shopify" => Marketplace::Shopify,
            "amazon" => Marketplace::Amazon,
            "ebay" => Marketplace::Ebay,
            "walmart" => Marketplace::Walmart,
            _ => Marketplace::Other(key),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Marketplace::Shopify => "shopify",
            Marketplace::Amazon => "amazon",
            Marketplace::Ebay => "ebay",
            Marketplace::Walmart => "walmart",
            Marketplace::Other(key) => key,
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Marketplace {
    fn from(value: String) -> Self {
        Marketplace::parse(&value)
    }
}

impl From<&str> for Marketplace {
    fn from(value: &str) -> Self {
        Marketplace::parse(value)
    }
}

impl From<Marketplace> for String {
    fn from(value: Marketplace) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(Marketplace::parse(" Amazon "), Marketplace::Amazon);
        assert_eq!(Marketplace::parse("EBAY"), Marketplace::Ebay);
        assert_eq!(
            Marketplace::parse("Etsy"),
            Marketplace::Other("etsy".to_string())
        );
    }

    #[test]
    fn serde_uses_plain_identifiers() {
        let parsed: Vec<Marketplace> = serde_json::from_str(r#"["Walmart","tiktok"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![Marketplace::Walmart, Marketplace::Other("tiktok".into())]
        );
        let out = serde_json::to_string(&parsed).unwrap();
        assert_eq!(out, r#"["walmart","tiktok"]"#);
    }
}
